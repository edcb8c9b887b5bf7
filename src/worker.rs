use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};

use crate::aggregator::StatsMsg;
use crate::error::ReplayError;
use crate::queue::{DequeueError, ReplayQueue};
use crate::snapshot::{load_replay, ReplayData};
use crate::stats::{ProcessStats, ReplayStats};
use crate::summary::{summarize_replay, HERO_UNIT_TYPE};
use crate::validate::ReplayValidator;

/// Per-worker loop tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long one dequeue attempt blocks on an empty queue.
    pub dequeue_timeout: Duration,
    /// Consecutive empty dequeues before the worker concludes the queue is
    /// permanently empty and exits.
    pub dequeue_retries: u32,
    /// Maximum units processed per worker lifetime. Guards against infinite
    /// spin if the queue never signals clean emptiness.
    pub max_replays: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout: Duration::from_secs(1),
            dequeue_retries: 3,
            max_replays: 300,
        }
    }
}

/// Acknowledges the in-flight unit on every exit path out of the processing
/// scope, so `join_all` never stalls on a worker that failed mid-unit.
struct AckGuard<'a> {
    queue: &'a ReplayQueue,
}

impl Drop for AckGuard<'_> {
    fn drop(&mut self) {
        self.queue.acknowledge();
    }
}

/// An isolated unit of parallel execution: owns one stats accumulator, drains
/// replay units from the shared queue, and publishes stats snapshots at every
/// stage transition.
pub struct ReplayWorker {
    stats: ProcessStats,
    queue: Arc<ReplayQueue>,
    stats_tx: Sender<StatsMsg>,
    validator: Arc<dyn ReplayValidator>,
    shutdown: Arc<AtomicBool>,
    cfg: WorkerConfig,
}

impl ReplayWorker {
    #[must_use]
    pub fn new(
        worker_id: usize,
        queue: Arc<ReplayQueue>,
        stats_tx: Sender<StatsMsg>,
        validator: Arc<dyn ReplayValidator>,
        shutdown: Arc<AtomicBool>,
        cfg: WorkerConfig,
    ) -> Self {
        Self {
            stats: ProcessStats::new(worker_id),
            queue,
            stats_tx,
            validator,
            shutdown,
            cfg,
        }
    }

    /// Run the dequeue→load→summarize→validate→process loop to completion.
    ///
    /// Returns the worker's terminal stats on a clean exit. A fatal error
    /// (summarize failure, crash) terminates this worker only; the in-flight
    /// unit has already been acknowledged when this returns.
    pub fn run(mut self) -> Result<ReplayStats, ReplayError> {
        self.update_stage("spawn");

        let mut empty_retries: u32 = 0;
        for _ in 0..self.cfg.max_replays {
            if self.shutdown.load(Ordering::Relaxed) {
                // Termination signal: quiet exit, no further dequeue attempts.
                self.update_stage("done");
                return Ok(self.stats.replay_stats);
            }
            self.update_stage("launch");

            let path = match self.queue.dequeue(self.cfg.dequeue_timeout) {
                Ok(path) => {
                    empty_retries = 0;
                    path
                }
                Err(DequeueError::Closed) => {
                    debug!("[{}] queue closed and drained, exiting", self.stats.worker_id);
                    self.update_stage("done");
                    return Ok(self.stats.replay_stats);
                }
                Err(DequeueError::Empty) => {
                    empty_retries += 1;
                    if empty_retries >= self.cfg.dequeue_retries {
                        debug!("[{}] queue stayed empty, exiting", self.stats.worker_id);
                        self.update_stage("done");
                        return Ok(self.stats.replay_stats);
                    }
                    continue;
                }
            };

            let replay_name = replay_basename(&path);
            self.stats.replay = replay_name.clone();
            info!("[{}] got replay '{}'", self.stats.worker_id, path.display());

            // Stats for this unit must be published before the guard
            // acknowledges it, or a final update could arrive after the
            // aggregator's shutdown sentinel.
            let queue = Arc::clone(&self.queue);
            let fatal = {
                let _ack = AckGuard { queue: &*queue };
                match self.process_unit(&path, &replay_name) {
                    Ok(()) => None,
                    Err(e) if !e.is_fatal() => {
                        warn!(
                            "[{}] abandoning replay '{replay_name}' ({} error): {e:#}",
                            self.stats.worker_id,
                            e.kind()
                        );
                        self.stats.replay_stats.invalid_replays.insert(replay_name);
                        self.publish();
                        None
                    }
                    Err(e) => {
                        error!(
                            "[{}] fatal {} error on replay '{replay_name}': {e:#}",
                            self.stats.worker_id,
                            e.kind()
                        );
                        self.stats.replay_stats.crashing_replays.insert(replay_name);
                        self.publish();
                        Some(e)
                    }
                }
            };
            if let Some(e) = fatal {
                return Err(e);
            }
        }

        self.update_stage("shutdown");
        self.update_stage("done");
        Ok(self.stats.replay_stats)
    }

    /// One unit through the pipeline. The caller acknowledges regardless of
    /// which step this stopped at.
    fn process_unit(&mut self, path: &Path, replay_name: &str) -> Result<(), ReplayError> {
        self.update_stage("open replay directory");
        self.update_stage("loading replay");
        let data = load_replay(path, replay_name)?;

        self.update_stage("summarizing replay");
        let summary = match summarize_replay(replay_name, &data) {
            Ok(summary) => summary,
            Err(e) => {
                // Structural corruption: dump both boundary snapshots for
                // diagnosis before propagating fatally.
                error!(
                    "[{}] summarize failed for '{replay_name}'; first snapshot: {:?}; last snapshot: {:?}",
                    self.stats.worker_id,
                    data.first(),
                    data.last()
                );
                return Err(e);
            }
        };
        info!(
            "[{}] {:-^60}",
            self.stats.worker_id,
            format!(" Replay Info {replay_name} ")
        );
        info!("[{}] {summary}", self.stats.worker_id);

        self.update_stage("validating");
        if !self.validator.is_valid(&summary) {
            self.stats
                .replay_stats
                .invalid_replays
                .insert(replay_name.to_string());
            self.publish();
            return Ok(());
        }

        self.update_stage("processing");
        self.process_replay(&data);
        Ok(())
    }

    /// Processing stub: counts the unit and its retained snapshots and
    /// tallies unit frequencies. The learning computation over the snapshot
    /// sequence hooks in here.
    fn process_replay(&mut self, data: &ReplayData) {
        let stats = &mut self.stats.replay_stats;
        stats.replays += 1;
        for snapshot in data.iter() {
            stats.steps += 1;
            for unit in &snapshot.units {
                if let Some(unit_type) = unit.unit_type {
                    ReplayStats::bump(&mut stats.unit_ids, unit_type);
                    if unit_type == HERO_UNIT_TYPE {
                        ReplayStats::bump(&mut stats.heroes, unit_type);
                    }
                }
            }
        }
        self.publish();
    }

    fn update_stage(&mut self, stage: &'static str) {
        self.stats.update(stage);
        self.publish();
    }

    /// Publish a stats snapshot. The aggregator may already be gone during
    /// shutdown; that is not this worker's problem.
    fn publish(&self) {
        let _ = self.stats_tx.send(StatsMsg::Update(self.stats.clone()));
    }
}

fn replay_basename(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
