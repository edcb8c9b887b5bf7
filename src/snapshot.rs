use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// File extension of serialized world-state snapshots inside a replay
/// directory. Lexical ordering of the file names defines snapshot order.
pub const SNAPSHOT_EXT: &str = "bin";

/// One unit (hero, creep, building, ...) as recorded in a snapshot.
///
/// Fields are optional at the wire level; absence is detected by the
/// summarizer, not the decoder, so that a structurally truncated record can be
/// told apart from an unreadable file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldUnit {
    pub unit_type: Option<u32>,
    pub team_id: Option<u32>,
    pub health: Option<i32>,
}

/// One parsed world-state record at a single simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_time: Option<f32>,
    pub team_id: Option<u32>,
    pub units: Vec<WorldUnit>,
}

/// The retained snapshots of one replay: the lexically first and last file
/// (boundary-only sampling), or a single snapshot when the replay holds only
/// one file.
#[derive(Debug, Clone)]
pub struct ReplayData {
    snapshots: Vec<Snapshot>,
}

impl ReplayData {
    #[must_use]
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        debug_assert!(!snapshots.is_empty(), "ReplayData requires >= 1 snapshot");
        Self { snapshots }
    }

    #[must_use]
    pub fn first(&self) -> &Snapshot {
        &self.snapshots[0]
    }

    #[must_use]
    pub fn last(&self) -> &Snapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}

/// List a replay directory's snapshot files sorted by name.
/// Non-snapshot files (wrong extension) are skipped.
pub fn snapshot_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXT)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Decode one snapshot file.
///
/// Trailing bytes after the record are ignored, so records carrying extra
/// fields appended by newer writers still load.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, ReplayError> {
    let bytes = fs::read(path).map_err(|e| ReplayError::SnapshotRead {
        file: path.to_path_buf(),
        source: e,
    })?;
    bincode::deserialize(&bytes).map_err(|e| ReplayError::SnapshotDecode {
        file: path.to_path_buf(),
        source: e,
    })
}

/// Load a replay's boundary snapshots: the lexically first and last file.
///
/// A replay with a single file yields one retained snapshot. Zero snapshot
/// files, or any read/decode failure, abandons the whole unit.
pub fn load_replay(dir: &Path, replay_name: &str) -> Result<ReplayData, ReplayError> {
    let files = snapshot_files(dir).map_err(|e| ReplayError::SnapshotRead {
        file: dir.to_path_buf(),
        source: e,
    })?;
    let (Some(first), Some(last)) = (files.first(), files.last()) else {
        return Err(ReplayError::NoSnapshots {
            replay: replay_name.to_string(),
        });
    };

    let mut snapshots = vec![load_snapshot(first)?];
    if first != last {
        snapshots.push(load_snapshot(last)?);
    }
    Ok(ReplayData::new(snapshots))
}
