/// Decide whether a query needs comprehensive multi-pass retrieval.
///
/// Case-insensitive substring match against the configured trigger phrases;
/// any single match is enough. An empty query never matches.
pub fn needs_multi_pass(query: &str, triggers: &[String]) -> bool {
    if query.is_empty() {
        return false;
    }
    let query_lower = query.to_lowercase();
    triggers
        .iter()
        .any(|trigger| query_lower.contains(&trigger.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::plan::RetrievalPlan;

    fn default_triggers() -> Vec<String> {
        RetrievalPlan::default().triggers
    }

    #[test]
    fn test_trigger_phrase_matches() {
        let triggers = default_triggers();
        assert!(needs_multi_pass("Please identify projects we could merge", &triggers));
        assert!(needs_multi_pass("Give me a complete list of initiatives", &triggers));
        assert!(needs_multi_pass("What runs enterprise-wide today?", &triggers));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let triggers = default_triggers();
        assert!(needs_multi_pass("COMPREHENSIVE ANALYSIS of the portfolio", &triggers));
        assert!(needs_multi_pass("Portfolio Analysis please", &triggers));
    }

    #[test]
    fn test_match_at_any_position() {
        let triggers = default_triggers();
        assert!(needs_multi_pass("across all capabilities, what overlaps?", &triggers));
        assert!(needs_multi_pass("what overlaps across all capabilities", &triggers));
    }

    #[test]
    fn test_focused_query_stays_single_pass() {
        let triggers = default_triggers();
        assert!(!needs_multi_pass("What is Betty?", &triggers));
        assert!(!needs_multi_pass("Summarize the change control workflow", &triggers));
    }

    #[test]
    fn test_empty_query_never_matches() {
        assert!(!needs_multi_pass("", &default_triggers()));
    }

    #[test]
    fn test_multiple_triggers_in_one_query() {
        let triggers = default_triggers();
        assert!(needs_multi_pass(
            "Compare projects across all capabilities",
            &triggers
        ));
    }

    #[test]
    fn test_custom_trigger_list() {
        let triggers = vec!["audit everything".to_string()];
        assert!(needs_multi_pass("please Audit Everything now", &triggers));
        assert!(!needs_multi_pass("complete list", &triggers));
    }
}
