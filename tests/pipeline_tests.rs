use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use replaymill::snapshot::{Snapshot, WorldUnit};
use replaymill::summary::{ReplaySummary, HERO_UNIT_TYPE};
use replaymill::{
    run_pipeline, AcceptAll, PipelineConfig, ReplayValidator, WorkerConfig,
};
use tempfile::{tempdir, TempDir};

/// Write sink the test can inspect after the pipeline's aggregator thread is
/// done with it.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct RejectAll;

impl ReplayValidator for RejectAll {
    fn is_valid(&self, _summary: &ReplaySummary) -> bool {
        false
    }
}

fn snapshot(game_time: f32) -> Snapshot {
    Snapshot {
        game_time: Some(game_time),
        team_id: Some(2),
        units: vec![WorldUnit {
            unit_type: Some(HERO_UNIT_TYPE),
            team_id: Some(2),
            health: Some(500),
        }],
    }
}

fn write_snapshot(dir: &Path, name: &str, snap: &Snapshot) {
    fs::write(dir.join(name), bincode::serialize(snap).unwrap()).unwrap();
}

fn write_replay(root: &Path, name: &str, snapshots: &[Snapshot]) {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    for (i, snap) in snapshots.iter().enumerate() {
        write_snapshot(&dir, &format!("{i:04}.bin"), snap);
    }
}

fn replay_root(count: usize) -> TempDir {
    let root = tempdir().unwrap();
    for i in 0..count {
        write_replay(
            root.path(),
            &format!("replay_{i:03}"),
            &[snapshot(0.0), snapshot(600.0)],
        );
    }
    root
}

fn test_config(root: &Path, parallel: usize) -> PipelineConfig {
    PipelineConfig {
        replay_root: root.to_path_buf(),
        parallel,
        step_mul: 15,
        report_interval: Duration::from_millis(50),
        stagger: Duration::from_millis(1),
        worker: WorkerConfig {
            dequeue_timeout: Duration::from_millis(25),
            dequeue_retries: 2,
            max_replays: 300,
        },
    }
}

fn run(
    root: &Path,
    parallel: usize,
    validator: Arc<dyn ReplayValidator>,
    interrupted: bool,
) -> (replaymill::ReplayStats, SharedSink) {
    let sink = SharedSink::default();
    let cfg = test_config(root, parallel);
    let interrupt = Arc::new(AtomicBool::new(interrupted));
    let global = run_pipeline(&cfg, validator, Box::new(sink.clone()), interrupt).unwrap();
    (global, sink)
}

#[test]
fn processes_every_replay_with_two_workers() {
    let root = replay_root(5);
    let (global, sink) = run(root.path(), 2, Arc::new(AcceptAll), false);

    assert_eq!(global.replays, 5);
    // Two boundary snapshots retained per replay.
    assert_eq!(global.steps, 10);
    assert!(global.crashing_replays.is_empty());
    assert!(global.invalid_replays.is_empty());
    assert_eq!(global.heroes.get(&HERO_UNIT_TYPE), Some(&10));

    let report = sink.contents();
    assert!(report.contains("Replays: 5, Steps total: 10"));
    assert!(report.contains(" Worker stats "));
    assert!(report.contains("[ 0] replay:"));
    assert!(report.contains("[ 1] replay:"));
}

#[test]
fn empty_root_finishes_immediately_with_zero_stats() {
    let root = tempdir().unwrap();
    let start = Instant::now();
    let (global, sink) = run(root.path(), 2, Arc::new(AcceptAll), false);

    assert_eq!(global.replays, 0);
    assert_eq!(global.steps, 0);
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(sink.contents().contains("Replays: 0, Steps total: 0"));
}

#[test]
fn missing_root_is_a_discovery_error() {
    let root = tempdir().unwrap();
    let cfg = test_config(&root.path().join("absent"), 1);
    let err = run_pipeline(
        &cfg,
        Arc::new(AcceptAll),
        Box::new(SharedSink::default()),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "discovery");
}

#[test]
fn corrupt_replay_is_abandoned_and_the_rest_processed() {
    let root = replay_root(4);
    let dir = root.path().join("replay_zz_garbage");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("0000.bin"), b"definitely not bincode").unwrap();

    let (global, _sink) = run(root.path(), 2, Arc::new(AcceptAll), false);

    assert_eq!(global.replays, 4);
    assert!(global.crashing_replays.is_empty());
    assert_eq!(global.invalid_replays.len(), 1);
    assert!(global.invalid_replays.contains("replay_zz_garbage"));
}

#[test]
fn structurally_broken_replay_crashes_its_worker_only() {
    let root = replay_root(4);
    // Lexically last, so the healthy replays drain first.
    let broken = Snapshot {
        game_time: None,
        team_id: Some(2),
        units: vec![],
    };
    write_replay(root.path(), "replay_zz_broken", &[broken]);

    let (global, _sink) = run(root.path(), 2, Arc::new(AcceptAll), false);

    assert_eq!(global.replays, 4);
    assert_eq!(global.crashing_replays.len(), 1);
    assert!(global.crashing_replays.contains("replay_zz_broken"));
}

#[test]
fn single_snapshot_replay_counts_one_step() {
    let root = tempdir().unwrap();
    write_replay(root.path(), "replay_solo", &[snapshot(42.0)]);

    let (global, _sink) = run(root.path(), 1, Arc::new(AcceptAll), false);

    assert_eq!(global.replays, 1);
    assert_eq!(global.steps, 1);
}

#[test]
fn rejected_replays_are_counted_but_not_processed() {
    let root = replay_root(3);
    let (global, _sink) = run(root.path(), 2, Arc::new(RejectAll), false);

    assert_eq!(global.replays, 0);
    assert_eq!(global.steps, 0);
    assert_eq!(global.invalid_replays.len(), 3);
}

#[test]
fn preexisting_interrupt_exits_promptly() {
    let root = replay_root(8);
    let start = Instant::now();
    let (global, sink) = run(root.path(), 2, Arc::new(AcceptAll), true);

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(global.crashing_replays.len(), 0);
    // A final report is still printed on the way out.
    assert!(sink.contents().contains(" Summary "));
    assert!(global.replays <= 8);
}
