//! Small pure text helpers.

/// Splits a command into tokens on runs of whitespace, dropping empties.
pub fn tokenize(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_runs() {
        assert_eq!(tokenize("git   status\t-sb"), vec!["git", "status", "-sb"]);
    }

    #[test]
    fn blank_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn leading_and_trailing_whitespace_ignored() {
        assert_eq!(tokenize("  ls -la  "), vec!["ls", "-la"]);
    }
}
