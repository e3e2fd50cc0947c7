/// Generates conversational fixtures for scenario tests.
///
/// # Example
///
/// ```rust,ignore
/// let turns = TestDataFactory::conversation_turns(6);
/// ```
pub struct TestDataFactory;

impl TestDataFactory {
    /// `n` distinct user turns about a recurring debugging session, so tests
    /// exercising STM→MTM promotion see realistic, non-degenerate content.
    pub fn conversation_turns(n: usize) -> Vec<String> {
        (1..=n)
            .map(|i| format!("turn {i}: investigating a crash in the parser module"))
            .collect()
    }

    /// A turn whose content should classify as `Debug` intent.
    pub fn debug_query() -> &'static str {
        "I'm getting a traceback and the process keeps crashing, what's the bug?"
    }

    /// A turn whose content should classify as `CommitLog` intent.
    pub fn commit_log_query() -> &'static str {
        "show me the commit history and recent diffs for this module"
    }

    /// Two near-duplicate facts (for dedup tests) and one unrelated fact.
    pub fn near_duplicate_facts() -> (String, String, String) {
        (
            "the parser module raises a panic when given malformed input".to_string(),
            "the parser module panics on malformed input".to_string(),
            "the release pipeline publishes artifacts to the registry".to_string(),
        )
    }
}
