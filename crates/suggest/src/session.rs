//! Binds the suggestion model to a live user identity.
//!
//! The session owns a per-user in-memory cache in front of the persistent
//! store and exposes a stable query/record API to the command input widget.
//! State changes go through an explicit two-transition machine
//! ([`SessionEvent::ChangeUser`] and [`SessionEvent::AddCommand`]) so the
//! lifecycle does not depend on any caller-side re-render behavior.

use std::collections::HashMap;
use std::sync::Arc;

use devrelay_types::OsFamily;
use tracing::warn;

use crate::fallback::{SUGGESTED_COMMANDS_LINUX, SUGGESTED_COMMANDS_WINDOWS};
use crate::model::{DEFAULT_SUGGESTION_LIMIT, SuggestionModel};
use crate::store::ModelStore;

/// Recorded commands needed before history outweighs the fallback list.
pub const MIN_COMMANDS_FOR_HISTORY: u64 = 5;

/// State machine input for a [`SuggestionSession`].
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// The signed-in user changed (or signed out).
    ChangeUser(Option<String>),
    /// A command was successfully submitted and should be learned.
    AddCommand(String),
}

/// Per-user suggestion state bound to a changing user identity.
pub struct SuggestionSession {
    store: Arc<dyn ModelStore>,
    cache: HashMap<String, SuggestionModel>,
    user_id: Option<String>,
    os_family: OsFamily,
    max_suggestions: usize,
}

impl SuggestionSession {
    pub fn new(store: Arc<dyn ModelStore>, os_family: OsFamily) -> Self {
        Self {
            store,
            cache: HashMap::new(),
            user_id: None,
            os_family,
            max_suggestions: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    /// Overrides the maximum number of suggestions returned per query.
    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Applies one state machine transition.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ChangeUser(user_id) => self.change_user(user_id),
            SessionEvent::AddCommand(command) => self.record_command(&command),
        }
    }

    /// Points the session at a (possibly absent) user id. Same id is a
    /// no-op; otherwise the working copy is discarded and the new user's
    /// model is served from cache or lazily loaded on first use.
    pub fn change_user(&mut self, user_id: Option<String>) {
        if self.user_id == user_id {
            return;
        }
        self.user_id = user_id;
    }

    /// Learns a successfully submitted command into the current user's
    /// model, updating the cache and persisting the result. No-op without a
    /// user id or on blank input. Persist failure is logged, never surfaced.
    pub fn record_command(&mut self, command: &str) {
        let Some(user_id) = self.user_id.clone() else {
            return;
        };
        if command.trim().is_empty() {
            return;
        }

        // Read-modify-write against the latest cached value so rapid
        // sequential calls never act on a stale snapshot.
        let updated = self.current_model(&user_id).record(command);
        self.cache.insert(user_id.clone(), updated.clone());
        if let Err(error) = self.store.save(&user_id, &updated) {
            warn!(%user_id, "failed to persist suggestion model: {error}");
        }
    }

    /// Ranked suggestions for a partial input, backfilled from the
    /// OS-appropriate fallback list up to the configured maximum. Blank
    /// input yields nothing.
    pub fn suggestions_for_input(&mut self, input: &str) -> Vec<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let max_suggestions = self.max_suggestions;
        let mut results = match self.user_id.clone() {
            Some(user_id) => self.current_model(&user_id).suggest(trimmed, max_suggestions),
            None => Vec::new(),
        };

        if results.len() < self.max_suggestions {
            let trimmed_lower = trimmed.to_lowercase();
            let remaining = self.max_suggestions - results.len();
            let backfill: Vec<String> = self
                .fallback_commands()
                .iter()
                .filter(|cmd| {
                    cmd.to_lowercase().starts_with(&trimmed_lower)
                        && **cmd != trimmed
                        && !results.iter().any(|seen| seen == *cmd)
                })
                .take(remaining)
                .map(|cmd| cmd.to_string())
                .collect();
            results.extend(backfill);
        }

        results.truncate(self.max_suggestions);
        results
    }

    /// Total commands recorded for the current user.
    pub fn command_count(&mut self) -> u64 {
        match self.user_id.clone() {
            Some(user_id) => self.current_model(&user_id).command_count(),
            None => 0,
        }
    }

    /// Whether the model has enough data for meaningful ranked suggestions.
    pub fn has_enough_history(&mut self) -> bool {
        self.command_count() >= MIN_COMMANDS_FOR_HISTORY
    }

    fn fallback_commands(&self) -> &'static [&'static str] {
        match self.os_family {
            OsFamily::Linux => SUGGESTED_COMMANDS_LINUX,
            OsFamily::Windows => SUGGESTED_COMMANDS_WINDOWS,
        }
    }

    fn current_model(&mut self, user_id: &str) -> &SuggestionModel {
        if !self.cache.contains_key(user_id) {
            let loaded = self.store.load(user_id).unwrap_or_else(|error| {
                warn!(%user_id, "failed to load suggestion model, starting empty: {error}");
                SuggestionModel::new()
            });
            self.cache.insert(user_id.to_string(), loaded);
        }
        &self.cache[user_id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryModelStore;

    fn session() -> (SuggestionSession, Arc<InMemoryModelStore>) {
        let store = Arc::new(InMemoryModelStore::new());
        let mut session = SuggestionSession::new(store.clone(), OsFamily::Linux);
        session.change_user(Some("alice".to_string()));
        (session, store)
    }

    #[test]
    fn blank_input_yields_nothing() {
        let (mut session, _) = session();
        session.record_command("ls -la");
        assert!(session.suggestions_for_input("").is_empty());
        assert!(session.suggestions_for_input("   ").is_empty());
    }

    #[test]
    fn record_persists_before_returning() {
        let (mut session, store) = session();
        session.record_command("git status");
        let persisted = store.load("alice").unwrap();
        assert_eq!(persisted.command_counts.get("git status"), Some(&1));
    }

    #[test]
    fn rapid_sequential_records_lose_no_updates() {
        let (mut session, store) = session();
        for _ in 0..10 {
            session.record_command("uptime");
        }
        session.record_command("whoami");
        let persisted = store.load("alice").unwrap();
        assert_eq!(persisted.command_counts.get("uptime"), Some(&10));
        assert_eq!(persisted.command_counts.get("whoami"), Some(&1));
    }

    #[test]
    fn record_without_user_is_a_no_op() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut session = SuggestionSession::new(store.clone(), OsFamily::Linux);
        session.record_command("ls");
        assert_eq!(session.command_count(), 0);
    }

    #[test]
    fn history_ranks_above_fallback_backfill() {
        let (mut session, _) = session();
        session.record_command("ls /var/log");
        let suggestions = session.suggestions_for_input("ls");
        assert_eq!(suggestions.first().map(String::as_str), Some("ls /var/log"));
        // Backfilled from the static Linux list, in list order.
        assert!(suggestions.contains(&"ls -la".to_string()));
    }

    #[test]
    fn fallback_backfill_caps_at_maximum() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut session = SuggestionSession::new(store, OsFamily::Linux).with_max_suggestions(3);
        session.change_user(Some("alice".to_string()));
        for i in 0..4 {
            session.record_command(&format!("cat /tmp/{i}"));
        }
        assert_eq!(session.suggestions_for_input("cat").len(), 3);
    }

    #[test]
    fn fallback_list_matches_os_family() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut session = SuggestionSession::new(store, OsFamily::Windows);
        session.change_user(Some("alice".to_string()));
        let suggestions = session.suggestions_for_input("task");
        assert!(suggestions.contains(&"tasklist".to_string()));
    }

    #[test]
    fn suggestions_without_user_come_from_fallback_only() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut session = SuggestionSession::new(store, OsFamily::Linux);
        let suggestions = session.suggestions_for_input("df");
        assert_eq!(suggestions, vec!["df -h".to_string()]);
    }

    #[test]
    fn changing_user_switches_models() {
        let (mut session, _) = session();
        session.record_command("ls /srv");
        session.apply(SessionEvent::ChangeUser(Some("bob".to_string())));
        assert_eq!(session.command_count(), 0);

        // Alice's working copy is still cached and intact.
        session.apply(SessionEvent::ChangeUser(Some("alice".to_string())));
        assert_eq!(session.command_count(), 1);
    }

    #[test]
    fn changing_to_same_user_keeps_working_copy() {
        let (mut session, _) = session();
        session.record_command("ls");
        session.change_user(Some("alice".to_string()));
        assert_eq!(session.command_count(), 1);
    }

    #[test]
    fn first_access_loads_from_store() {
        let store = Arc::new(InMemoryModelStore::new());
        store.save("carol", &SuggestionModel::new().record("docker ps")).unwrap();

        let mut session = SuggestionSession::new(store, OsFamily::Linux);
        session.change_user(Some("carol".to_string()));
        assert!(session.suggestions_for_input("docker").contains(&"docker ps".to_string()));
    }

    #[test]
    fn enough_history_threshold() {
        let (mut session, _) = session();
        for i in 0..4 {
            session.record_command(&format!("cmd{i}"));
        }
        assert!(!session.has_enough_history());
        session.apply(SessionEvent::AddCommand("cmd4".to_string()));
        assert!(session.has_enough_history());
    }
}
