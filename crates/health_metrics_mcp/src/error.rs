//! Error types for the MCP and HTTP servers.

use health_metrics_core::MetricsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl McpError {
    /// True when the caller sent something unusable, as opposed to the server
    /// or its collaborators failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            McpError::Validation(_) | McpError::Metrics(MetricsError::InvalidArgument(_))
        )
    }
}

impl From<McpError> for String {
    fn from(err: McpError) -> Self {
        err.to_string()
    }
}

/// Result type alias for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
