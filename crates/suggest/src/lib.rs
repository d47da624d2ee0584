//! Adaptive command suggestions for the devrelay console.
//!
//! A per-user statistical model (token transition graph plus a full-command
//! frequency table) learns from submitted commands and produces ranked
//! autocomplete candidates. The model is persisted per user id and fronted
//! by an in-memory cache; see [`session::SuggestionSession`] for the
//! user-facing API.

pub mod fallback;
pub mod model;
pub mod session;
pub mod store;

pub use fallback::{SUGGESTED_COMMANDS_LINUX, SUGGESTED_COMMANDS_WINDOWS};
pub use model::{DEFAULT_SUGGESTION_LIMIT, START_TOKEN, SuggestionModel};
pub use session::{MIN_COMMANDS_FOR_HISTORY, SessionEvent, SuggestionSession};
pub use store::{InMemoryModelStore, JsonModelStore, ModelStore, ModelStoreError};
