use std::collections::BTreeMap;
use std::fmt;

use crate::error::ReplayError;
use crate::snapshot::ReplayData;

/// `unit_type` of a team's core structure ("ancient"). Its health in the last
/// snapshot is used to infer the match outcome.
pub const ANCIENT_UNIT_TYPE: u32 = 9;

/// `unit_type` of a player-controlled hero.
pub const HERO_UNIT_TYPE: u32 = 1;

/// Match-level facts derived from a replay's boundary snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    /// Seconds of game time between the first and last retained snapshot.
    pub game_length: f32,
    /// Team the recording bot played for.
    pub team_id: u32,
    /// Final ancient health per team, keyed by team id.
    pub ancient_hp_by_team: BTreeMap<u32, i32>,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "game_length: {:.1}, team_id: {}, ancient_hp:",
            self.game_length, self.team_id
        )?;
        for (team, hp) in &self.ancient_hp_by_team {
            write!(f, " [team {team}] {hp}")?;
        }
        Ok(())
    }
}

/// Derive a [`ReplaySummary`] from a replay's boundary snapshots.
///
/// A missing field here signals data corruption beyond expected variance and
/// is fatal to the calling worker; callers dump both boundary snapshots for
/// diagnosis before propagating.
pub fn summarize_replay(replay_name: &str, data: &ReplayData) -> Result<ReplaySummary, ReplayError> {
    let missing = |field: &'static str| ReplayError::Summarize {
        replay: replay_name.to_string(),
        field,
    };

    let first = data.first();
    let last = data.last();

    let t0 = first.game_time.ok_or_else(|| missing("game_time"))?;
    let t1 = last.game_time.ok_or_else(|| missing("game_time"))?;
    let team_id = first.team_id.ok_or_else(|| missing("team_id"))?;

    let mut ancient_hp_by_team = BTreeMap::new();
    for unit in &last.units {
        if unit.unit_type == Some(ANCIENT_UNIT_TYPE) {
            let team = unit.team_id.ok_or_else(|| missing("units.team_id"))?;
            let health = unit.health.ok_or_else(|| missing("units.health"))?;
            ancient_hp_by_team.insert(team, health);
        }
    }

    Ok(ReplaySummary {
        game_length: t1 - t0,
        team_id,
        ancient_hp_by_team,
    })
}
