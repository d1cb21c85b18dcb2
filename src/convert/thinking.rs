//! Thinking-mode detection and budget resolution.

use vega_schema::openai::ChatCompletionRequest;

/// Budget applied when neither `thinking_budget` nor `reasoning_effort` is
/// present on a thinking-enabled request.
pub const DEFAULT_THINKING_BUDGET: i64 = 1024;

const EFFORT_LOW_BUDGET: i64 = 1024;
const EFFORT_MEDIUM_BUDGET: i64 = 16_000;
const EFFORT_HIGH_BUDGET: i64 = 32_000;

/// Models that run with thinking even without a `-thinking` suffix.
const THINKING_MODEL_ALLOWLIST: &[&str] = &["gemini-2.5-pro"];
const THINKING_MODEL_PREFIXES: &[&str] = &["gemini-3-pro-"];

pub fn thinking_enabled(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.contains("-thinking")
        || THINKING_MODEL_ALLOWLIST.contains(&model.as_str())
        || THINKING_MODEL_PREFIXES
            .iter()
            .any(|prefix| model.starts_with(prefix))
}

/// Explicit `thinking_budget` wins, then `reasoning_effort`, then the
/// default. A request without thinking gets a zero budget.
pub fn resolve_thinking_budget(req: &ChatCompletionRequest, enabled: bool) -> i64 {
    if !enabled {
        return 0;
    }
    if let Some(budget) = req.thinking_budget {
        return budget;
    }
    match req.reasoning_effort.as_deref() {
        Some("low") => EFFORT_LOW_BUDGET,
        Some("medium") => EFFORT_MEDIUM_BUDGET,
        Some("high") => EFFORT_HIGH_BUDGET,
        _ => DEFAULT_THINKING_BUDGET,
    }
}
