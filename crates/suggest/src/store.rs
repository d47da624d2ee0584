//! Per-user persistence for suggestion models.
//!
//! One serialized model blob per user id. The JSON-backed implementation
//! writes under the standard configuration directory (overridable via an
//! environment variable); a missing or incompatible blob always loads as an
//! empty model rather than failing.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dirs_next::config_dir;
use thiserror::Error;
use tracing::warn;

use crate::model::SuggestionModel;

/// Environment variable overriding the model storage directory.
pub const SUGGEST_DIR_ENV: &str = "DEVRELAY_SUGGEST_DIR";

/// Errors surfaced by model store operations.
#[derive(Debug, Error)]
pub enum ModelStoreError {
    /// I/O failure while reading or writing a model file.
    #[error("suggestion store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure while persisting a model.
    #[error("suggestion store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence backend for per-user suggestion models.
pub trait ModelStore: Send + Sync {
    /// Loads the model for `user_id`, or an empty model when none is stored
    /// or the stored blob has an incompatible shape.
    fn load(&self, user_id: &str) -> Result<SuggestionModel, ModelStoreError>;

    /// Persists the model for `user_id`, replacing any previous blob.
    fn save(&self, user_id: &str, model: &SuggestionModel) -> Result<(), ModelStoreError>;

    /// Removes the persisted model for `user_id`, if any.
    fn clear(&self, user_id: &str) -> Result<(), ModelStoreError>;
}

/// JSON-file store with one `<user_id>.json` blob per user.
pub struct JsonModelStore {
    dir: PathBuf,
}

impl JsonModelStore {
    /// Creates a store rooted at `dir`, or at the default directory when
    /// `None` (`$DEVRELAY_SUGGEST_DIR`, else `<config_dir>/devrelay/suggestions`).
    pub fn new<P: Into<Option<PathBuf>>>(dir: P) -> Self {
        let dir = dir.into().unwrap_or_else(default_suggest_dir);
        Self { dir }
    }

    /// Directory holding the per-user model files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_user_id(user_id)))
    }
}

impl Default for JsonModelStore {
    fn default() -> Self {
        Self::new(None::<PathBuf>)
    }
}

impl ModelStore for JsonModelStore {
    fn load(&self, user_id: &str) -> Result<SuggestionModel, ModelStoreError> {
        let path = self.user_path(user_id);
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<SuggestionModel>(&content) {
                Ok(model) => Ok(model),
                Err(error) => {
                    warn!("discarding unreadable suggestion model at {}: {}", path.display(), error);
                    Ok(SuggestionModel::new())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(SuggestionModel::new()),
            Err(error) => Err(ModelStoreError::Io(error)),
        }
    }

    fn save(&self, user_id: &str, model: &SuggestionModel) -> Result<(), ModelStoreError> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(model)?;
        fs::write(self.user_path(user_id), content)?;
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<(), ModelStoreError> {
        match fs::remove_file(self.user_path(user_id)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ModelStoreError::Io(error)),
        }
    }
}

/// In-memory model store primarily used for unit testing.
#[derive(Default)]
pub struct InMemoryModelStore {
    models: Mutex<HashMap<String, SuggestionModel>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for InMemoryModelStore {
    fn load(&self, user_id: &str) -> Result<SuggestionModel, ModelStoreError> {
        let models = self.models.lock().expect("model store lock poisoned");
        Ok(models.get(user_id).cloned().unwrap_or_default())
    }

    fn save(&self, user_id: &str, model: &SuggestionModel) -> Result<(), ModelStoreError> {
        let mut models = self.models.lock().expect("model store lock poisoned");
        models.insert(user_id.to_string(), model.clone());
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<(), ModelStoreError> {
        let mut models = self.models.lock().expect("model store lock poisoned");
        models.remove(user_id);
        Ok(())
    }
}

/// Maps a user id onto a safe file stem. Ids are opaque remote identifiers;
/// anything outside `[A-Za-z0-9._-]` becomes `_`.
fn sanitize_user_id(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

fn default_suggest_dir() -> PathBuf {
    if let Ok(dir) = env::var(SUGGEST_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir.trim());
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devrelay")
        .join("suggestions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn recorded(commands: &[&str]) -> SuggestionModel {
        commands
            .iter()
            .fold(SuggestionModel::new(), |model, command| model.record(command))
    }

    #[test]
    fn load_save_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        let model = recorded(&["git status", "git push", "ls -la"]);

        store.save("user-a", &model).unwrap();
        assert_eq!(store.load("user-a").unwrap(), model);
    }

    #[test]
    fn missing_blob_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        assert_eq!(store.load("nobody").unwrap(), SuggestionModel::new());
    }

    #[test]
    fn incompatible_blob_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("user-a.json"), "{\"totally\": \"different\"").unwrap();
        assert_eq!(store.load("user-a").unwrap(), SuggestionModel::new());
    }

    #[test]
    fn models_are_isolated_per_user() {
        let dir = tempdir().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        store.save("alice", &recorded(&["ls"])).unwrap();
        store.save("bob", &recorded(&["pwd"])).unwrap();

        assert!(store.load("alice").unwrap().command_counts.contains_key("ls"));
        assert!(!store.load("bob").unwrap().command_counts.contains_key("ls"));
    }

    #[test]
    fn clear_removes_blob() {
        let dir = tempdir().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        store.save("alice", &recorded(&["ls"])).unwrap();
        store.clear("alice").unwrap();
        assert_eq!(store.load("alice").unwrap(), SuggestionModel::new());
        // Clearing an absent user is fine.
        store.clear("alice").unwrap();
    }

    #[test]
    fn hostile_user_ids_become_safe_file_names() {
        assert_eq!(sanitize_user_id("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_user_id("uid|google.com"), "uid_google.com");
    }

    #[test]
    fn default_dir_honors_env_override() {
        temp_env::with_var(SUGGEST_DIR_ENV, Some("/tmp/devrelay-suggest"), || {
            assert_eq!(default_suggest_dir(), PathBuf::from("/tmp/devrelay-suggest"));
        });
    }

    #[test]
    fn in_memory_store_round_trip() {
        let store = InMemoryModelStore::new();
        let model = recorded(&["uptime"]);
        store.save("u", &model).unwrap();
        assert_eq!(store.load("u").unwrap(), model);
        store.clear("u").unwrap();
        assert_eq!(store.load("u").unwrap(), SuggestionModel::new());
    }
}
