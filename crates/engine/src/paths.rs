//! Deterministic document-store paths for command documents.
//!
//! Commands live in a per-device subcollection:
//! `devices/{device_id}/commands[/{command_id}]`.

use std::fmt;

const DEVICES_COLLECTION: &str = "devices";
const COMMANDS_COLLECTION: &str = "commands";

/// Path to a collection of documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a single document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The command log collection for a device.
pub fn commands_collection(device_id: &str) -> CollectionPath {
    CollectionPath(format!("{DEVICES_COLLECTION}/{device_id}/{COMMANDS_COLLECTION}"))
}

/// One command document for a device.
pub fn command_document(device_id: &str, command_id: &str) -> DocumentPath {
    DocumentPath(format!(
        "{DEVICES_COLLECTION}/{device_id}/{COMMANDS_COLLECTION}/{command_id}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_deterministic() {
        assert_eq!(commands_collection("dev-1").as_str(), "devices/dev-1/commands");
        assert_eq!(command_document("dev-1", "abc").as_str(), "devices/dev-1/commands/abc");
    }
}
