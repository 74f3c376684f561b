use rmcp::model::{GetPromptResult, PromptMessage, PromptMessageRole};

use health_metrics_core::NutritionTarget;

pub fn progress_review_prompt(window: &str, metric: &str) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Review my {metric} progress over the last {window}.\n\nSteps:\n1. Normalize my raw logs with normalize_records\n2. Reduce them to one value per day with aggregate_daily (kind={metric})\n3. Bucket the days weekly (or monthly for 6m/12m) with bucket_period, window={window}\n4. Summarize the bucket values with summarize\n\nReport the current value, lowest, highest, average and net change, point out any plateaus or reversals, and keep recommendations short and concrete."
            ),
        )])
    .with_description(format!("{} progress over the last {}", metric, window))
}

pub fn nutrition_check_prompt(date: &str, target: Option<&NutritionTarget>) -> GetPromptResult {
    let target_line = match target {
        Some(t) => format!(
            "My current target: calories {}, carbs {}, protein {}, fats {}.",
            fmt_goal(t.calories),
            fmt_goal(t.carbs),
            fmt_goal(t.protein),
            fmt_goal(t.fats)
        ),
        None => "I have not set a nutrition target yet; suggest one before judging the day.".into(),
    };
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Check my nutrition for {date}.\n\n{target_line}\n\nUse nutrition_dashboard with my logs for the day to get calories consumed, burned and net, macro progress and whether the daily goal was reached. Use get_achievement_history to see how this day compares with the past week. Tell me what is left to eat (if anything) and which macro is furthest behind."
            ),
        )])
    .with_description(format!("Nutrition check for {}", date))
}

fn fmt_goal(goal: Option<f64>) -> String {
    goal.map(|g| format!("{g}"))
        .unwrap_or_else(|| "not set".to_string())
}
