//! Context block for the system instruction

/// Substituted when the user gave no usable session summaries.
pub const NO_PREVIOUS_SESSIONS: &str = "No previous sessions";

/// User metadata injected into every system instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub name: String,
    pub duration_seconds: u64,
    pub prior_summaries: String,
}

impl UserContext {
    pub fn new(
        name: impl Into<String>,
        duration_seconds: u64,
        prior_summaries: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            duration_seconds,
            prior_summaries: prior_summaries.into(),
        }
    }

    /// Render the context block
    pub fn block(&self) -> String {
        build_user_context(&self.name, self.duration_seconds, &self.prior_summaries)
    }
}

/// Return the contextual block for the system prompt.
pub fn build_user_context(name: &str, duration_seconds: u64, summaries: &str) -> String {
    let summaries = match summaries.trim() {
        "" => NO_PREVIOUS_SESSIONS,
        s => s,
    };

    format!(
        "## CONTEXTUAL INFORMATION\n\
         - User name: {name}\n\
         - Expected conversation duration: {duration_seconds} seconds\n\
         - Summaries of previous sessions (most recent first):\n\
         {summaries}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_layout() {
        let block = build_user_context("Alice", 300, "Talked about sleep.");
        assert_eq!(
            block,
            "## CONTEXTUAL INFORMATION\n\
             - User name: Alice\n\
             - Expected conversation duration: 300 seconds\n\
             - Summaries of previous sessions (most recent first):\n\
             Talked about sleep.\n"
        );
    }

    #[test]
    fn test_blank_summaries_fall_back() {
        for summaries in ["", "   ", "\n\t \n"] {
            let block = build_user_context("Bob", 60, summaries);
            assert!(block.ends_with("(most recent first):\nNo previous sessions\n"));
        }
    }

    #[test]
    fn test_summaries_are_trimmed() {
        let block = build_user_context("Bob", 0, "\n  first\nsecond  \n");
        assert!(block.ends_with(":\nfirst\nsecond\n"));
        assert!(block.contains("- Expected conversation duration: 0 seconds"));
    }

    #[test]
    fn test_block_method_matches_free_function() {
        let ctx = UserContext::new("Chloé", 7200, "");
        assert_eq!(ctx.block(), build_user_context("Chloé", 7200, ""));
        assert!(ctx.block().contains("- User name: Chloé"));
        assert!(ctx.block().contains("7200 seconds"));
    }
}
