use std::collections::BTreeSet;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::time::Instant;

use hashbrown::HashMap as HbHashMap;

pub type FastHasher = BuildHasherDefault<ahash::AHasher>;

/// Frequency table keyed by a numeric game id (hero id, unit type, ability
/// id, action id). Insertion order is irrelevant; display sorts by count.
pub type CountMap = HbHashMap<u32, u64, FastHasher>;

/// Summary stats of the replays seen so far.
///
/// Exclusively owned by one worker for its whole lifetime; the aggregator
/// only ever sees published clones. All counts are monotonically
/// non-decreasing and set membership is append-only, which is what makes
/// [`ReplayStats::merge`] commutative and associative (componentwise sum of
/// counters, union of sets).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayStats {
    pub replays: u64,
    pub steps: u64,

    pub heroes: CountMap,
    pub unit_ids: CountMap,
    pub valid_abilities: CountMap,
    pub made_abilities: CountMap,
    pub valid_actions: CountMap,
    pub made_actions: CountMap,

    pub crashing_replays: BTreeSet<String>,
    pub invalid_replays: BTreeSet<String>,
}

impl ReplayStats {
    /// Merge another `ReplayStats` into this one.
    pub fn merge(&mut self, other: &ReplayStats) {
        fn merge_map(a: &mut CountMap, b: &CountMap) {
            for (k, v) in b {
                *a.entry(*k).or_insert(0) += v;
            }
        }

        self.replays += other.replays;
        self.steps += other.steps;

        merge_map(&mut self.heroes, &other.heroes);
        merge_map(&mut self.unit_ids, &other.unit_ids);
        merge_map(&mut self.valid_abilities, &other.valid_abilities);
        merge_map(&mut self.made_abilities, &other.made_abilities);
        merge_map(&mut self.valid_actions, &other.valid_actions);
        merge_map(&mut self.made_actions, &other.made_actions);

        self.crashing_replays
            .extend(other.crashing_replays.iter().cloned());
        self.invalid_replays
            .extend(other.invalid_replays.iter().cloned());
    }

    #[inline]
    pub fn bump(map: &mut CountMap, key: u32) {
        *map.entry(key).or_insert(0) += 1;
    }
}

/// Render a count map as `{key: count, ...}` sorted by count (descending),
/// then key, so the hottest entries lead.
fn sorted_count_str(map: &CountMap) -> String {
    let mut entries: Vec<(&u32, &u64)> = map.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    let body: Vec<String> = entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", body.join(", "))
}

fn sorted_set_str(set: &BTreeSet<String>) -> String {
    let body: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("[{}]", body.join(", "))
}

impl fmt::Display for ReplayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |name: &str, m: &CountMap| format!("{name}: {}\n{}", m.len(), sorted_count_str(m));
        let sets = |name: &str, s: &BTreeSet<String>| format!("{name}: {}\n{}", s.len(), sorted_set_str(s));
        let blocks = [
            format!("Replays: {}, Steps total: {}", self.replays, self.steps),
            counts("Heroes", &self.heroes),
            counts("Unit ids", &self.unit_ids),
            counts("Valid abilities", &self.valid_abilities),
            counts("Made abilities", &self.made_abilities),
            counts("Valid actions", &self.valid_actions),
            counts("Made actions", &self.made_actions),
            sets("Crashing replays", &self.crashing_replays),
            sets("Invalid replays", &self.invalid_replays),
        ];
        write!(f, "{}", blocks.join("\n\n"))
    }
}

/// Per-worker observability snapshot, published (cloned, never shared) to the
/// aggregator at every stage transition.
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub worker_id: usize,
    pub updated_at: Instant,
    pub stage: &'static str,
    pub replay: String,
    pub replay_stats: ReplayStats,
}

impl ProcessStats {
    #[must_use]
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            updated_at: Instant::now(),
            stage: "",
            replay: String::new(),
            replay_stats: ReplayStats::default(),
        }
    }

    pub fn update(&mut self, stage: &'static str) {
        self.updated_at = Instant::now();
        self.stage = stage;
    }

    /// One status line for the periodic report: id, current replay, counters,
    /// derived game loops, current stage and staleness.
    #[must_use]
    pub fn status_line(&self, step_mul: u32) -> String {
        format!(
            "[{:2}] replay: {:>10}, replays: {:5}, steps: {:7}, game loops: {:7}, last: {:>12}, {:3} s ago",
            self.worker_id,
            self.replay,
            self.replay_stats.replays,
            self.replay_stats.steps,
            self.replay_stats.steps * u64::from(step_mul),
            self.stage,
            self.updated_at.elapsed().as_secs()
        )
    }
}
