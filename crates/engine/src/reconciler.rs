//! Optimistic command lifecycle reconciliation.
//!
//! A submitted command is shown immediately as an optimistic entry while the
//! dispatch runs in the background through the retry wrapper. Once the
//! remote store confirms it (a server entry with equal text and an active
//! status), the optimistic entry is retired; it is never shown alongside its
//! remote counterpart, and never silently dropped before confirmation or an
//! explicit dispatch failure.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use devrelay_types::{CommandKind, CommandLog, CommandStatus, OPTIMISTIC_ID_PREFIX};
use devrelay_util::with_retry;
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ConsoleConfig;
use crate::paths::{command_document, commands_collection};
use crate::store::{DocumentStore, StoreError};

/// Events surfaced by background dispatch tasks.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleEvent {
    /// A dispatch failed after retries were exhausted. The only failure the
    /// console ever surfaces to the user synchronously.
    DispatchFailed { command: String, reason: String },
    /// A dispatch landed; a near-term re-fetch should run so the remote copy
    /// appears and the optimistic one can be retired.
    RefreshDue,
}

/// Merges the authoritative server log with the optimistic set.
///
/// An optimistic entry is dropped iff a server entry carries equal text and
/// an active status (the dispatch has been confirmed). The merged view is
/// the surviving optimistic entries (insertion order, most recent first)
/// followed by the server entries in their remote order. Idempotent over
/// repeated application of the same snapshot.
pub fn merge_logs(server: &[CommandLog], optimistic: &[CommandLog]) -> Vec<CommandLog> {
    let mut merged: Vec<CommandLog> = optimistic
        .iter()
        .filter(|entry| !is_confirmed(server, entry))
        .cloned()
        .collect();
    merged.extend(server.iter().cloned());
    merged
}

fn is_confirmed(server: &[CommandLog], optimistic: &CommandLog) -> bool {
    server
        .iter()
        .any(|entry| entry.command == optimistic.command && entry.status.is_active())
}

/// The stateful reconciler: optimistic set, dispatch, and remote-side
/// command operations for one target device.
pub struct CommandConsole {
    device_id: Option<String>,
    store: Arc<dyn DocumentStore>,
    config: ConsoleConfig,
    optimistic: Arc<Mutex<Vec<CommandLog>>>,
    events: UnboundedSender<ConsoleEvent>,
}

impl CommandConsole {
    /// Creates a console and the receiver for its background events.
    pub fn new(
        device_id: Option<String>,
        store: Arc<dyn DocumentStore>,
        config: ConsoleConfig,
    ) -> (Self, UnboundedReceiver<ConsoleEvent>) {
        let (events, receiver) = unbounded_channel();
        (
            Self {
                device_id,
                store,
                config,
                optimistic: Arc::new(Mutex::new(Vec::new())),
                events,
            },
            receiver,
        )
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Current optimistic entries, most recent first.
    pub fn optimistic_snapshot(&self) -> Vec<CommandLog> {
        self.optimistic.lock().expect("optimistic lock poisoned").clone()
    }

    /// Submits a command: synchronously inserts an optimistic entry at the
    /// head of the set, then dispatches to the remote store in a background
    /// task. Blank input or a missing target device is a silent no-op.
    ///
    /// Dispatch success schedules a [`ConsoleEvent::RefreshDue`] after a
    /// short delay; failure (after retries) removes the optimistic entry and
    /// emits [`ConsoleEvent::DispatchFailed`] with the reason.
    pub fn submit(&self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        let Some(device_id) = self.device_id.clone() else {
            return;
        };

        let entry = CommandLog {
            id: optimistic_id(),
            command: trimmed.to_string(),
            kind: CommandKind::Shell,
            status: CommandStatus::Pending,
            output: None,
            error: None,
            created_at: Some(Utc::now()),
            completed_at: None,
            last_activity: None,
        };
        let entry_id = entry.id.clone();
        self.optimistic.lock().expect("optimistic lock poisoned").insert(0, entry);

        let store = Arc::clone(&self.store);
        let optimistic = Arc::clone(&self.optimistic);
        let events = self.events.clone();
        let policy = self.config.retry;
        let refresh_delay = self.config.post_dispatch_refresh_delay;
        let command = trimmed.to_string();
        tokio::spawn(async move {
            let collection = commands_collection(&device_id);
            let fields = json!({
                "command": command,
                "type": "shell",
                "status": "pending",
            });
            let result = with_retry(policy, || {
                let store = Arc::clone(&store);
                let collection = collection.clone();
                let fields = fields.clone();
                async move { store.add(&collection, fields).await }
            })
            .await;

            match result {
                Ok(_) => {
                    tokio::time::sleep(refresh_delay).await;
                    let _ = events.send(ConsoleEvent::RefreshDue);
                }
                Err(error) => {
                    optimistic
                        .lock()
                        .expect("optimistic lock poisoned")
                        .retain(|entry| entry.id != entry_id);
                    let _ = events.send(ConsoleEvent::DispatchFailed {
                        command,
                        reason: error.to_string(),
                    });
                }
            }
        });
    }

    /// Writes a kill marker against a remote command. Optimistic ids are a
    /// no-op (nothing to signal remotely yet); propagation is not awaited
    /// and failures are logged, not surfaced.
    pub async fn kill(&self, command_id: &str) {
        if command_id.starts_with(OPTIMISTIC_ID_PREFIX) {
            return;
        }
        let Some(device_id) = self.device_id.as_deref() else {
            return;
        };
        let document = command_document(device_id, command_id);
        if let Err(error) = self.store.update(&document, json!({"kill_signal": true})).await {
            warn!(%command_id, "failed to signal kill: {error}");
        }
    }

    /// Deletes a command. Optimistic ids are removed locally with no remote
    /// call; remote deletion is not assumed instantaneous, the next fetch
    /// is authoritative.
    pub async fn delete(&self, command_id: &str) -> Result<(), StoreError> {
        if command_id.starts_with(OPTIMISTIC_ID_PREFIX) {
            self.optimistic
                .lock()
                .expect("optimistic lock poisoned")
                .retain(|entry| entry.id != command_id);
            return Ok(());
        }
        let Some(device_id) = self.device_id.as_deref() else {
            return Ok(());
        };
        self.store.delete(&command_document(device_id, command_id)).await
    }

    /// Batch-deletes the terminal entries in one atomic operation. Active
    /// and optimistic entries are skipped even if passed in.
    pub async fn clear_history(&self, entries: &[CommandLog]) -> Result<(), StoreError> {
        let Some(device_id) = self.device_id.as_deref() else {
            return Ok(());
        };
        let documents: Vec<_> = entries
            .iter()
            .filter(|entry| entry.status.is_terminal() && !entry.is_optimistic())
            .map(|entry| command_document(device_id, &entry.id))
            .collect();
        if documents.is_empty() {
            return Ok(());
        }
        self.store.delete_batch(&documents).await
    }

    /// Best-effort asks the agent to push fresh output for every active
    /// remote command within `timeout_secs`. Per-entry failures are
    /// swallowed so one stuck agent cannot block requests to others; the
    /// refresh driver's next cycle is the retry path.
    pub async fn request_output(&self, entries: &[CommandLog], timeout_secs: u32) {
        let Some(device_id) = self.device_id.as_deref() else {
            return;
        };
        for entry in entries.iter().filter(|e| e.is_active() && !e.is_optimistic()) {
            let document = command_document(device_id, &entry.id);
            let fields = json!({
                "output_request": {
                    "seconds": timeout_secs,
                    "request_id": request_id(),
                }
            });
            if let Err(error) = self.store.update(&document, fields).await {
                debug!(command_id = %entry.id, "could not request output: {error}");
            }
        }
    }

    /// Applies a fetched server snapshot: retires confirmed optimistic
    /// entries from the shared set and returns the merged view.
    pub fn merge_snapshot(&self, server: &[CommandLog]) -> Vec<CommandLog> {
        let mut optimistic = self.optimistic.lock().expect("optimistic lock poisoned");
        optimistic.retain(|entry| !is_confirmed(server, entry));
        merge_logs(server, &optimistic)
    }

    /// Fetches the remote log and merges it with the optimistic set.
    pub async fn fetch_merged(&self) -> Result<Vec<CommandLog>, StoreError> {
        let Some(device_id) = self.device_id.as_deref() else {
            return Ok(self.optimistic_snapshot());
        };
        let collection = commands_collection(device_id);
        let documents = self.store.get_many(&collection, "created_at", self.config.fetch_limit).await?;
        let server: Vec<CommandLog> = documents.into_iter().filter_map(decode_log).collect();
        Ok(self.merge_snapshot(&server))
    }
}

fn decode_log(document: crate::store::Document) -> Option<CommandLog> {
    let mut fields = document.fields;
    let Some(map) = fields.as_object_mut() else {
        warn!(id = %document.id, "skipping non-object command document");
        return None;
    };
    map.insert("id".to_string(), Value::String(document.id.clone()));
    match serde_json::from_value(fields) {
        Ok(log) => Some(log),
        Err(error) => {
            warn!(id = %document.id, "skipping undecodable command document: {error}");
            None
        }
    }
}

/// Locally unique optimistic id: reserved prefix + timestamp + random suffix.
fn optimistic_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}-{}", OPTIMISTIC_ID_PREFIX, Utc::now().timestamp_millis(), &suffix[..8])
}

fn request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: &str, command: &str, status: CommandStatus) -> CommandLog {
        CommandLog {
            id: id.to_string(),
            command: command.to_string(),
            kind: CommandKind::Shell,
            status,
            output: None,
            error: None,
            created_at: None,
            completed_at: None,
            last_activity: None,
        }
    }

    #[test]
    fn merge_drops_optimistic_confirmed_by_active_server_entry() {
        let server = vec![log("srv-1", "echo hi", CommandStatus::Processing)];
        let optimistic = vec![log("local-1-aa", "echo hi", CommandStatus::Pending)];
        let merged = merge_logs(&server, &optimistic);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "srv-1");
    }

    #[test]
    fn merge_keeps_optimistic_when_server_match_is_terminal() {
        // A terminal server entry with the same text is an older run, not a
        // confirmation of this dispatch.
        let server = vec![log("srv-1", "echo hi", CommandStatus::Completed)];
        let optimistic = vec![log("local-1-aa", "echo hi", CommandStatus::Pending)];
        let merged = merge_logs(&server, &optimistic);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "local-1-aa");
        assert_eq!(merged[1].id, "srv-1");
    }

    #[test]
    fn merge_places_optimistic_entries_before_server_entries() {
        let server = vec![
            log("srv-2", "uptime", CommandStatus::Completed),
            log("srv-1", "whoami", CommandStatus::Completed),
        ];
        let optimistic = vec![
            log("local-2-bb", "df -h", CommandStatus::Pending),
            log("local-1-aa", "free -m", CommandStatus::Pending),
        ];
        let merged = merge_logs(&server, &optimistic);
        let ids: Vec<&str> = merged.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["local-2-bb", "local-1-aa", "srv-2", "srv-1"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let server = vec![
            log("srv-1", "echo hi", CommandStatus::Processing),
            log("srv-2", "uptime", CommandStatus::Completed),
        ];
        let optimistic = vec![
            log("local-1-aa", "echo hi", CommandStatus::Pending),
            log("local-2-bb", "ls", CommandStatus::Pending),
        ];
        let once = merge_logs(&server, &optimistic);
        let surviving: Vec<CommandLog> = once.iter().filter(|e| e.is_optimistic()).cloned().collect();
        let twice = merge_logs(&server, &surviving);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_shows_two_active_entries_with_same_text() {
        let server = vec![log("srv-1", "sleep 60", CommandStatus::Processing)];
        let optimistic = vec![
            log("local-1-aa", "sleep 60", CommandStatus::Pending),
            log("local-2-bb", "sleep 60", CommandStatus::Pending),
        ];
        let merged = merge_logs(&server, &optimistic);
        let active_sleepers = merged
            .iter()
            .filter(|entry| entry.command == "sleep 60" && entry.is_active())
            .count();
        assert_eq!(active_sleepers, 1);
    }

    #[test]
    fn optimistic_ids_carry_reserved_prefix_and_are_unique() {
        let a = optimistic_id();
        let b = optimistic_id();
        assert!(a.starts_with(OPTIMISTIC_ID_PREFIX));
        assert_ne!(a, b);
    }
}
