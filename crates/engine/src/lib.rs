//! # Devrelay Engine
//!
//! Command dispatch and reconciliation for the remote-device console.
//!
//! The engine keeps a set of optimistic (locally synthesized) command
//! entries alongside the authoritative remote log, deduplicates them once
//! the remote store confirms a dispatch, and drives kill/delete/rerun and
//! output-request operations. A pull-only refresh driver bounds remote read
//! volume: fetches happen on mount, on regained visibility, and on explicit
//! refresh, never on a standing interval.
//!
//! ## Architecture
//!
//! - **`store`**: the abstract remote document store plus the in-memory and
//!   HTTP-backed implementations
//! - **`paths`**: deterministic collection/document paths per device
//! - **`reconciler`**: the optimistic/authoritative merge and the stateful
//!   [`CommandConsole`]
//! - **`refresh`**: the pull-only [`RefreshDriver`]
//! - **`config`**: tunables shared by the console and the driver

pub mod config;
pub mod paths;
pub mod reconciler;
pub mod refresh;
pub mod store;

pub use config::ConsoleConfig;
pub use paths::{CollectionPath, DocumentPath, command_document, commands_collection};
pub use reconciler::{CommandConsole, ConsoleEvent, merge_logs};
pub use refresh::RefreshDriver;
pub use store::{Document, DocumentStore, HttpDocumentStore, InMemoryDocumentStore, RecordedOp, StoreError};
