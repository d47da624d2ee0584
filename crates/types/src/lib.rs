//! Shared type definitions for the devrelay console.
//!
//! These types mirror the wire shape of the command documents stored in the
//! remote document store; field names are fixed by the agent protocol
//! (`created_at`, `last_activity`, `kill_signal`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved id prefix marking a locally synthesized (optimistic) command
/// that has not yet been confirmed by the remote store.
pub const OPTIMISTIC_ID_PREFIX: &str = "local-";

/// Maximum number of command documents fetched per refresh cycle.
pub const COMMAND_FETCH_LIMIT: usize = 50;

/// Maximum number of trailing output lines shown per log entry.
pub const LOG_OUTPUT_MAX_LINES: usize = 10;

/// Lifecycle state of a dispatched command.
///
/// `Pending` and `Processing` are active; `Completed` and `Cancelled` are
/// terminal and absorbing; the agent never moves a command out of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl CommandStatus {
    /// Whether the command is still running on the agent side.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether the command has reached an absorbing state.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// Kind of instruction carried by a command document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    #[default]
    Shell,
    Api,
    Restart,
}

/// One dispatched command and its accumulated result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandLog {
    /// Remote-assigned document id, or a `local-` prefixed optimistic id.
    pub id: String,
    /// The literal command string, non-empty and trimmed.
    pub command: String,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    pub status: CommandStatus,
    /// Accumulated stdout, populated only by the remote agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Accumulated stderr, populated only by the remote agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server-assigned for remote entries, local clock for optimistic ones.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl CommandLog {
    /// Whether this entry was synthesized locally and is awaiting
    /// confirmation from the remote store.
    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with(OPTIMISTIC_ID_PREFIX)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// OS family of the remote device, used to select fallback suggestions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    #[default]
    Linux,
    Windows,
}

impl OsFamily {
    /// Classify a free-form platform string as reported by the agent.
    /// Anything containing "win" (case-insensitive) is Windows; everything
    /// else is treated as the Linux family.
    pub fn from_platform(platform: &str) -> Self {
        if platform.to_lowercase().contains("win") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

/// Returns the last `max_lines` lines of `text`, or the whole text when it
/// is short enough. Used to bound per-entry output rendering.
pub fn last_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }
    lines[lines.len() - max_lines..].join("\n")
}
