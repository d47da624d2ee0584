//! Per-user token transition model for command suggestions.
//!
//! The model records two views of history: a transition graph between
//! consecutive tokens (with a reserved start token preceding the first word
//! of every command) and a frequency table of full command strings. Both use
//! [`IndexMap`] so that equal counts rank in insertion order.

use devrelay_util::tokenize;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved token preceding the first word of every recorded command.
pub const START_TOKEN: &str = "__START__";

/// Default number of suggestions returned by [`SuggestionModel::suggest`].
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Candidates pulled from the transition graph when completing the token
/// the user is currently typing.
const COMPLETION_CANDIDATES: usize = 20;

/// Candidates pulled when extending a seemingly complete input with the
/// next likely token.
const EXTENSION_CANDIDATES: usize = 10;

/// Token transition graph and command frequency table for one user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionModel {
    /// token -> next token -> count.
    pub transitions: IndexMap<String, IndexMap<String, u64>>,
    /// full command -> occurrence count.
    pub command_counts: IndexMap<String, u64>,
}

impl SuggestionModel {
    /// Creates a model with empty transitions and frequency table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new model with `command` recorded. The receiver is left
    /// untouched; callers may still hold references to the prior value.
    ///
    /// Blank input is a no-op. Every recorded command increments exactly one
    /// frequency entry and one transition edge per token (including the
    /// start edge).
    #[must_use]
    pub fn record(&self, command: &str) -> Self {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return self.clone();
        }

        let mut next = self.clone();
        *next.command_counts.entry(trimmed.to_string()).or_insert(0) += 1;

        let tokens = tokenize(trimmed);
        if let Some(first) = tokens.first() {
            *next
                .transitions
                .entry(START_TOKEN.to_string())
                .or_default()
                .entry(first.clone())
                .or_insert(0) += 1;
        }
        for pair in tokens.windows(2) {
            *next
                .transitions
                .entry(pair[0].clone())
                .or_default()
                .entry(pair[1].clone())
                .or_insert(0) += 1;
        }
        next
    }

    /// Up to `limit` tokens reachable from `token`, most frequent first;
    /// ties keep insertion order.
    pub fn next_tokens(&self, token: &str, limit: usize) -> Vec<&str> {
        let Some(edges) = self.transitions.get(token) else {
            return Vec::new();
        };
        let mut ranked: Vec<(&str, u64)> = edges.iter().map(|(next, count)| (next.as_str(), *count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(limit).map(|(next, _)| next).collect()
    }

    fn transition_count(&self, from: &str, to: &str) -> u64 {
        self.transitions.get(from).and_then(|edges| edges.get(to)).copied().unwrap_or(0)
    }

    /// Ranked candidate completions for `input`, at most `limit` entries.
    ///
    /// Three strategies feed one deduplicated list (first insertion wins):
    /// direct prefix matches on recorded full commands (score = frequency x
    /// 100), transition-graph completion of the token being typed (score =
    /// edge count x 10), and next-token extension of a complete-looking
    /// input (score = raw edge count).
    pub fn suggest(&self, input: &str, limit: usize) -> Vec<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        let trimmed_lower = trimmed.to_lowercase();

        let mut candidates: Vec<(String, u64)> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        let mut push = |candidates: &mut Vec<(String, u64)>, seen: &mut Vec<String>, command: String, score: u64| {
            if !seen.iter().any(|existing| *existing == command) {
                seen.push(command.clone());
                candidates.push((command, score));
            }
        };

        // Exact historical recall dominates everything else.
        for (command, count) in &self.command_counts {
            if command.to_lowercase().starts_with(&trimmed_lower) && command != trimmed {
                push(&mut candidates, &mut seen, command.clone(), count * 100);
            }
        }

        let tokens = tokenize(trimmed);
        if let Some(last_token) = tokens.last() {
            let prefix = tokens[..tokens.len() - 1].join(" ");
            let prev_token = if tokens.len() > 1 { tokens[tokens.len() - 2].as_str() } else { START_TOKEN };
            let last_lower = last_token.to_lowercase();

            for candidate in self.next_tokens(prev_token, COMPLETION_CANDIDATES) {
                if candidate.to_lowercase().starts_with(&last_lower) && candidate != last_token {
                    let completion = if prefix.is_empty() {
                        candidate.to_string()
                    } else {
                        format!("{prefix} {candidate}")
                    };
                    let score = self.transition_count(prev_token, candidate) * 10;
                    push(&mut candidates, &mut seen, completion, score);
                }
            }

            // Input looks complete: a trailing space, or the last token is a
            // known transition source.
            if input.ends_with(char::is_whitespace) || self.transitions.contains_key(last_token.as_str()) {
                let extensions: Vec<String> = self
                    .next_tokens(last_token, EXTENSION_CANDIDATES)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                for next_token in extensions {
                    let score = self.transition_count(last_token, &next_token);
                    push(&mut candidates, &mut seen, format!("{trimmed} {next_token}"), score);
                }
            }
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.into_iter().take(limit).map(|(command, _)| command).collect()
    }

    /// Total number of commands recorded into this model.
    pub fn command_count(&self) -> u64 {
        self.command_counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_of(commands: &[&str]) -> SuggestionModel {
        commands
            .iter()
            .fold(SuggestionModel::new(), |model, command| model.record(command))
    }

    #[test]
    fn record_increments_frequency_and_start_edge() {
        let model = SuggestionModel::new().record("git status");
        assert_eq!(model.command_counts.get("git status"), Some(&1));
        assert_eq!(model.transitions[START_TOKEN].get("git"), Some(&1));
        assert_eq!(model.transitions["git"].get("status"), Some(&1));
    }

    #[test]
    fn record_trims_and_ignores_blank() {
        let model = SuggestionModel::new().record("  ls -la  ");
        assert_eq!(model.command_counts.get("ls -la"), Some(&1));

        let unchanged = model.record("   ");
        assert_eq!(unchanged, model);
    }

    #[test]
    fn record_does_not_mutate_receiver() {
        let base = SuggestionModel::new().record("ls");
        let _grown = base.record("ls -la");
        assert_eq!(base.command_count(), 1);
        assert!(!base.command_counts.contains_key("ls -la"));
    }

    #[test]
    fn record_adds_one_edge_per_token() {
        let model = SuggestionModel::new().record("a b c");
        let edges: u64 = model.transitions.values().flat_map(|edges| edges.values()).sum();
        // start->a, a->b, b->c
        assert_eq!(edges, 3);
    }

    #[test]
    fn next_tokens_ranked_by_count_then_insertion_order() {
        let model = model_of(&["git status", "git push", "git status"]);
        assert_eq!(model.next_tokens("git", 5), vec!["status", "push"]);

        let tied = model_of(&["go build", "go test"]);
        assert_eq!(tied.next_tokens("go", 5), vec!["build", "test"]);
    }

    #[test]
    fn direct_prefix_match_outranks_transitions() {
        let mut model = SuggestionModel::new();
        for _ in 0..3 {
            model = model.record("ls -la");
        }
        model = model.record("ls /tmp");
        let suggestions = model.suggest("ls", 5);
        assert_eq!(suggestions.first().map(String::as_str), Some("ls -la"));
    }

    #[test]
    fn trailing_space_extends_with_likely_next_tokens() {
        let model = model_of(&["git status", "git status", "git push"]);
        let suggestions = model.suggest("git ", 5);
        let status_rank = suggestions.iter().position(|s| s.contains("status"));
        let push_rank = suggestions.iter().position(|s| s.contains("push"));
        assert!(status_rank.is_some() && push_rank.is_some());
        assert!(status_rank < push_rank, "status (2x) must rank above push (1x): {suggestions:?}");
    }

    #[test]
    fn completes_partial_last_token_from_transitions() {
        let model = model_of(&["docker ps", "docker pull nginx"]);
        let suggestions = model.suggest("docker p", 5);
        assert!(suggestions.iter().any(|s| s == "docker ps"), "{suggestions:?}");
        assert!(suggestions.iter().any(|s| s == "docker pull"), "{suggestions:?}");
    }

    #[test]
    fn prefix_matching_is_case_insensitive() {
        let model = model_of(&["Get-Process -Name svchost"]);
        let suggestions = model.suggest("get-p", 5);
        // The full-command match (x100) ranks above the token completion (x10).
        assert_eq!(
            suggestions,
            vec!["Get-Process -Name svchost".to_string(), "Get-Process".to_string()]
        );
    }

    #[test]
    fn suggestions_exclude_the_input_itself() {
        let model = model_of(&["uptime"]);
        assert!(model.suggest("uptime", 5).is_empty());
    }

    #[test]
    fn blank_input_yields_nothing() {
        let model = model_of(&["ls -la"]);
        assert!(model.suggest("", 5).is_empty());
        assert!(model.suggest("   ", 5).is_empty());
    }

    #[test]
    fn duplicate_candidates_keep_highest_priority_entry() {
        // "ls -la" is both a direct prefix match and reachable through the
        // transition strategies; it must appear once, ranked by frequency.
        let model = model_of(&["ls -la", "ls -la"]);
        let suggestions = model.suggest("ls", 5);
        assert_eq!(suggestions.iter().filter(|s| *s == "ls -la").count(), 1);
    }

    #[test]
    fn limit_truncates_ranked_results() {
        let model = model_of(&["ls -la", "ls /tmp", "ls /var", "ls /etc"]);
        assert_eq!(model.suggest("ls", 2).len(), 2);
    }

    #[test]
    fn command_count_sums_frequencies() {
        let model = model_of(&["ls", "ls", "pwd"]);
        assert_eq!(model.command_count(), 3);
    }

    #[test]
    fn serde_round_trip_preserves_model() {
        let model = model_of(&["git status", "git push", "docker ps"]);
        let blob = serde_json::to_string(&model).unwrap();
        let back: SuggestionModel = serde_json::from_str(&blob).unwrap();
        assert_eq!(back, model);
    }
}
