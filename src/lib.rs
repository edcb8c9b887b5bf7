#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // may be revisited

pub mod aggregator;
pub mod error;
pub mod lookup;
pub mod queue;
pub mod snapshot;
pub mod stats;
pub mod summary;
pub mod supervisor;
pub mod validate;
pub mod worker;

// Re-exports: stable minimal API surface for external callers
pub use crate::aggregator::{run_stats_printer, ReporterConfig, StatsMsg};
pub use crate::error::ReplayError;
pub use crate::lookup::{load_command_table, CommandTable};
pub use crate::queue::{DequeueError, EnqueueError, ReplayQueue};
pub use crate::snapshot::{load_snapshot, snapshot_files, ReplayData, Snapshot, WorldUnit};
pub use crate::stats::{ProcessStats, ReplayStats};
pub use crate::summary::{summarize_replay, ReplaySummary, ANCIENT_UNIT_TYPE};
pub use crate::supervisor::{discover_replays, run_pipeline, PipelineConfig};
pub use crate::validate::{AcceptAll, ReplayValidator};
pub use crate::worker::{ReplayWorker, WorkerConfig};
