use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use log::{info, warn};

use crate::aggregator::{run_stats_printer, ReporterConfig, StatsMsg};
use crate::error::ReplayError;
use crate::queue::ReplayQueue;
use crate::stats::ReplayStats;
use crate::validate::ReplayValidator;
use crate::worker::{ReplayWorker, WorkerConfig};

/// Pipeline-wide configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory containing one subdirectory per replay.
    pub replay_root: PathBuf,
    /// Worker count.
    pub parallel: usize,
    /// Steps-to-game-loops display multiplier.
    pub step_mul: u32,
    /// Aggregate report cadence.
    pub report_interval: Duration,
    /// Delay between worker launches. Simultaneous startups contend for
    /// resources.
    pub stagger: Duration,
    pub worker: WorkerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            replay_root: PathBuf::from("replays"),
            parallel: 1,
            step_mul: 15,
            report_interval: Duration::from_secs(10),
            stagger: Duration::from_secs(1),
            worker: WorkerConfig::default(),
        }
    }
}

/// Discover replay paths: every subdirectory of the root, sorted by name.
pub fn discover_replays(root: &Path) -> Result<Vec<PathBuf>, ReplayError> {
    let entries = fs::read_dir(root).map_err(|e| ReplayError::Discovery {
        path: root.to_path_buf(),
        source: e,
    })?;
    let mut replays: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    replays.sort();
    Ok(replays)
}

/// Run the whole pipeline: discovery, queue fill, staggered worker launch,
/// aggregation, drain, shutdown.
///
/// Returns the final global stats as merged by the aggregator's last report.
/// A raised `interrupt` flag aborts the queue wait but the deterministic
/// shutdown sequence (sentinel to the aggregator, join everything) still
/// runs, and the result is still `Ok`. A worker's fatal error terminates that
/// worker only; the supervisor proceeds with the remainder.
pub fn run_pipeline(
    cfg: &PipelineConfig,
    validator: Arc<dyn ReplayValidator>,
    mut sink: Box<dyn Write + Send>,
    interrupt: Arc<AtomicBool>,
) -> Result<ReplayStats, ReplayError> {
    let parallel = cfg.parallel.max(1);
    let replays = discover_replays(&cfg.replay_root)?;
    info!(
        "{} replays found under {}",
        replays.len(),
        cfg.replay_root.display()
    );

    // Capacity bounds memory and gives the filler backpressure.
    let queue = Arc::new(ReplayQueue::new(parallel * 10, replays.len() as u64));
    let (stats_tx, stats_rx) = unbounded::<StatsMsg>();

    let reporter_cfg = ReporterConfig {
        parallel,
        step_mul: cfg.step_mul,
        interval: cfg.report_interval,
    };
    let aggregator = thread::Builder::new()
        .name("stats-printer".into())
        .spawn(move || run_stats_printer(&stats_rx, &mut *sink, &reporter_cfg))
        .map_err(|e| ReplayError::Spawn {
            what: "stats printer",
            source: e,
        })?;

    // Fill the queue on its own thread so queueing proceeds concurrently with
    // worker startup; the queue's expected count was fixed at discovery time,
    // so join_all cannot complete before the filler has done its part.
    let filler = {
        let queue = Arc::clone(&queue);
        let interrupt = Arc::clone(&interrupt);
        thread::Builder::new()
            .name("queue-filler".into())
            .spawn(move || {
                for path in replays {
                    if let Err(e) = queue.enqueue(path, &interrupt) {
                        info!("queue filler stopping: {e}");
                        break;
                    }
                }
                queue.close();
            })
            .map_err(|e| ReplayError::Spawn {
                what: "queue filler",
                source: e,
            })?
    };

    // At least one unit is in the queue before any worker launches, so the
    // first worker's retry-limited dequeue cannot lose a race with the filler.
    while queue.expected() > 0
        && queue.outstanding() == 0
        && !interrupt.load(Ordering::Relaxed)
    {
        thread::sleep(Duration::from_millis(1));
    }

    let mut workers = Vec::with_capacity(parallel);
    for worker_id in 0..parallel {
        let worker = ReplayWorker::new(
            worker_id,
            Arc::clone(&queue),
            stats_tx.clone(),
            Arc::clone(&validator),
            Arc::clone(&interrupt),
            cfg.worker.clone(),
        );
        let handle = thread::Builder::new()
            .name(format!("replay-worker-{worker_id}"))
            .spawn(move || worker.run())
            .map_err(|e| ReplayError::Spawn {
                what: "replay worker",
                source: e,
            })?;
        workers.push(handle);
        if worker_id + 1 < parallel {
            thread::sleep(cfg.stagger);
        }
    }

    if queue.join_all(&interrupt) {
        info!("all replay units acknowledged");
    } else {
        info!("interrupted while waiting for the queue to drain");
        // Workers share the interrupt flag and exit quietly on their own.
    }

    // Deterministic shutdown: sentinel first, then wait for the final report.
    let _ = stats_tx.send(StatsMsg::Shutdown);
    drop(stats_tx);

    let global = aggregator
        .join()
        .map_err(|_| ReplayError::Crash {
            replay: String::new(),
            reason: "stats printer panicked".into(),
        })?
        .map_err(|e| ReplayError::Report { source: e })?;

    for handle in workers {
        match handle.join() {
            Ok(Ok(_stats)) => {}
            Ok(Err(e)) => warn!("worker terminated with {} error: {e:#}", e.kind()),
            Err(_) => warn!("worker panicked"),
        }
    }
    if filler.join().is_err() {
        warn!("queue filler panicked");
    }

    Ok(global)
}
