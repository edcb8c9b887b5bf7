use std::collections::BTreeMap;
use std::io::Write;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::stats::{ProcessStats, ReplayStats};

/// Messages flowing one way from workers to the aggregation loop.
pub enum StatsMsg {
    /// A worker's latest observability snapshot; overwrites the previous one.
    Update(ProcessStats),
    /// Terminal sentinel: print a final report and stop.
    Shutdown,
}

/// Aggregation loop tuning.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Worker count; pre-seeds one status line per worker id.
    pub parallel: usize,
    /// Steps-to-game-loops display multiplier.
    pub step_mul: u32,
    /// Reporting cadence.
    pub interval: Duration,
}

const REPORT_WIDTH: usize = 107;

/// Merge the latest stats snapshot of every known worker into an
/// instantaneous global total. Merge order does not matter.
#[must_use]
pub fn merge_worker_stats<'a, I>(workers: I) -> ReplayStats
where
    I: IntoIterator<Item = &'a ProcessStats>,
{
    let mut global = ReplayStats::default();
    for s in workers {
        global.merge(&s.replay_stats);
    }
    global
}

fn write_report(
    sink: &mut dyn Write,
    elapsed: Duration,
    workers: &BTreeMap<usize, ProcessStats>,
    step_mul: u32,
) -> std::io::Result<ReplayStats> {
    let global = merge_worker_stats(workers.values());

    let header = format!(" Summary {} secs ", elapsed.as_secs());
    writeln!(sink, "{header:=^REPORT_WIDTH$}")?;
    writeln!(sink, "{global}")?;
    writeln!(sink, "{:-^REPORT_WIDTH$}", " Worker stats ")?;
    for s in workers.values() {
        writeln!(sink, "{}", s.status_line(step_mul))?;
    }
    writeln!(sink, "{}", "=".repeat(REPORT_WIDTH))?;
    sink.flush()?;
    Ok(global)
}

/// Consume worker stats snapshots and print an aggregate report on a fixed
/// cadence until the shutdown sentinel arrives.
///
/// This loop exclusively owns the `worker_id -> latest ProcessStats` mapping;
/// updates are simple overwrites, so no locking is involved anywhere in stats
/// aggregation. The sentinel (or a disconnected channel) triggers one final
/// report; its merged totals are returned as the pipeline's global result.
pub fn run_stats_printer(
    rx: &Receiver<StatsMsg>,
    sink: &mut dyn Write,
    cfg: &ReporterConfig,
) -> std::io::Result<ReplayStats> {
    let mut workers: BTreeMap<usize, ProcessStats> =
        (0..cfg.parallel).map(|i| (i, ProcessStats::new(i))).collect();

    let start = Instant::now();
    let mut deadline = start + cfg.interval;

    loop {
        let mut stop = false;

        // Drain pending messages until the tick deadline.
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(StatsMsg::Update(s)) => {
                    workers.insert(s.worker_id, s);
                }
                Ok(StatsMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    stop = true;
                    break;
                }
                Err(RecvTimeoutError::Timeout) => break,
            }
        }

        let global = write_report(sink, start.elapsed(), &workers, cfg.step_mul)?;
        if stop {
            return Ok(global);
        }
        deadline += cfg.interval;
    }
}
