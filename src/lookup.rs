use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::stats::FastHasher;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read lookup table {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse lookup table {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One command (ability or action) as carried by the lookup file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommandEntry {
    #[serde(rename = "Name")]
    pub name: String,
    /// Hidden commands exist in the data but are never offered to players;
    /// they are excluded from validity tallies.
    #[serde(rename = "Hidden", default)]
    pub hidden: bool,
}

/// Id-keyed table of known commands, loaded once at startup and shared
/// read-only across workers.
///
/// The source file maps decimal-id strings to entries; ids are normalized to
/// `u32` on load and entries with non-numeric keys are dropped.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: hashbrown::HashMap<u32, CommandEntry, FastHasher>,
}

impl CommandTable {
    #[must_use]
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(|e| e.name.as_str())
    }

    /// Hidden when flagged so; unknown ids are treated as hidden too, since
    /// nothing can be said about them.
    #[must_use]
    pub fn is_hidden(&self, id: u32) -> bool {
        self.entries.get(&id).map_or(true, |e| e.hidden)
    }

    /// Reverse lookup by exact name.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(id, _)| *id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load a command table from a JSON file of the form
/// `{"5003": {"Name": "ability_name", "Hidden": false}, ...}`.
pub fn load_command_table(path: &Path) -> Result<CommandTable, LookupError> {
    let bytes = std::fs::read(path).map_err(|e| LookupError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: std::collections::HashMap<String, CommandEntry> =
        serde_json::from_slice(&bytes).map_err(|e| LookupError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    let entries = raw
        .into_iter()
        .filter_map(|(k, v)| k.parse::<u32>().ok().map(|id| (id, v)))
        .collect();
    Ok(CommandTable { entries })
}
