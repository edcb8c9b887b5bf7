use replaymill::stats::{CountMap, ProcessStats, ReplayStats};

fn stats_with(replays: u64, steps: u64, hero_counts: &[(u32, u64)]) -> ReplayStats {
    let mut s = ReplayStats {
        replays,
        steps,
        ..ReplayStats::default()
    };
    for (k, v) in hero_counts {
        *s.heroes.entry(*k).or_insert(0) += v;
    }
    s
}

#[test]
fn merge_sums_counters_and_unions_sets() {
    let mut a = stats_with(2, 10, &[(1, 3), (5, 1)]);
    a.invalid_replays.insert("r1".to_string());
    a.crashing_replays.insert("r9".to_string());

    let mut b = stats_with(1, 4, &[(1, 2), (7, 6)]);
    b.invalid_replays.insert("r1".to_string());
    b.invalid_replays.insert("r2".to_string());

    a.merge(&b);

    assert_eq!(a.replays, 3);
    assert_eq!(a.steps, 14);
    assert_eq!(a.heroes.get(&1), Some(&5));
    assert_eq!(a.heroes.get(&5), Some(&1));
    assert_eq!(a.heroes.get(&7), Some(&6));
    // Duplicate names collapse.
    assert_eq!(a.invalid_replays.len(), 2);
    assert_eq!(a.crashing_replays.len(), 1);
}

#[test]
fn merge_is_commutative() {
    let a = stats_with(2, 10, &[(1, 3), (5, 1)]);
    let b = stats_with(7, 1, &[(1, 2), (9, 4)]);

    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);

    assert_eq!(ab, ba);
}

#[test]
fn merge_is_associative() {
    let a = stats_with(1, 2, &[(1, 1)]);
    let b = stats_with(3, 4, &[(1, 2), (2, 2)]);
    let c = stats_with(5, 6, &[(2, 1), (3, 3)]);

    let mut left = a.clone();
    left.merge(&b);
    left.merge(&c);

    let mut bc = b.clone();
    bc.merge(&c);
    let mut right = a.clone();
    right.merge(&bc);

    assert_eq!(left, right);
}

#[test]
fn merge_with_default_is_identity() {
    let a = stats_with(4, 40, &[(1, 7)]);
    let mut merged = a.clone();
    merged.merge(&ReplayStats::default());
    assert_eq!(merged, a);
}

#[test]
fn display_orders_counts_descending_then_by_key() {
    let mut map = CountMap::default();
    for (k, v) in [(30_u32, 2_u64), (10, 5), (20, 2), (40, 9)] {
        map.insert(k, v);
    }
    let mut s = ReplayStats::default();
    s.unit_ids = map;

    let rendered = s.to_string();
    // Highest count first; ties broken by ascending key.
    assert!(rendered.contains("Unit ids: 4\n{40: 9, 10: 5, 20: 2, 30: 2}"));
}

#[test]
fn display_lists_replay_sets_sorted() {
    let mut s = ReplayStats::default();
    s.invalid_replays.insert("replay_b".to_string());
    s.invalid_replays.insert("replay_a".to_string());

    let rendered = s.to_string();
    assert!(rendered.starts_with("Replays: 0, Steps total: 0"));
    assert!(rendered.contains("Invalid replays: 2\n[replay_a, replay_b]"));
    assert!(rendered.contains("Crashing replays: 0\n[]"));
}

#[test]
fn status_line_reports_stage_and_derived_game_loops() {
    let mut p = ProcessStats::new(3);
    p.update("processing");
    p.replay = "replay_007".to_string();
    p.replay_stats.replays = 2;
    p.replay_stats.steps = 10;

    let line = p.status_line(15);
    assert!(line.starts_with("[ 3] replay: replay_007"));
    assert!(line.contains("replays:     2"));
    assert!(line.contains("steps:      10"));
    assert!(line.contains("game loops:     150"));
    assert!(line.contains("last:   processing"));
}
