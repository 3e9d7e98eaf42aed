//! Prompt sent to the completion model.

/// Ask for 3-5 Pareto tasks in the `N. Title - Description` shape the parser reads.
pub fn pareto_prompt(goal: &str) -> String {
    format!(
        "Goal: {goal}\n\
         Apply Pareto: 20% effort → 80% results.\n\
         Return 3–5 tasks as:\n\
         1. Title - Description with [ ] checklist\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_goal_and_format() {
        let prompt = pareto_prompt("Grow email list to 1000");
        assert!(prompt.starts_with("Goal: Grow email list to 1000\n"));
        assert!(prompt.contains("20% effort → 80% results"));
        assert!(prompt.contains("1. Title - Description"));
    }
}
