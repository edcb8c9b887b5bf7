use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Tagged failure kinds for the replay pipeline.
///
/// The load class (`NoSnapshots`, `SnapshotRead`, `SnapshotDecode`) is
/// recovered inside a worker's loop: the unit is abandoned and counted, the
/// loop continues. `Summarize` and `Crash` are fatal to the worker that hit
/// them but never take down the pool. `Discovery` aborts startup.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay root {path} is unreadable")]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("replay '{replay}' contains no snapshot files")]
    NoSnapshots { replay: String },

    #[error("failed to read snapshot {file}")]
    SnapshotRead {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode snapshot {file}")]
    SnapshotDecode {
        file: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("boundary snapshot of replay '{replay}' is missing field `{field}`")]
    Summarize { replay: String, field: &'static str },

    #[error("unexpected failure while processing replay '{replay}': {reason}")]
    Crash { replay: String, reason: String },

    #[error("failed to spawn {what} thread")]
    Spawn {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to write aggregate report")]
    Report {
        #[source]
        source: io::Error,
    },
}

impl ReplayError {
    /// Recoverable errors abandon the current unit only; fatal errors
    /// terminate the worker that raised them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NoSnapshots { .. } | Self::SnapshotRead { .. } | Self::SnapshotDecode { .. }
        )
    }

    /// Short label identifying the error kind in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "discovery",
            Self::NoSnapshots { .. } | Self::SnapshotRead { .. } | Self::SnapshotDecode { .. } => {
                "load"
            }
            Self::Summarize { .. } => "summarize",
            Self::Crash { .. } => "crash",
            Self::Spawn { .. } => "spawn",
            Self::Report { .. } => "report",
        }
    }
}
