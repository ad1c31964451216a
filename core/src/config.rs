//! Tunable constants consumed by the battle world and its systems.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration_from_secs;

/// Named knobs controlling simulation pacing and tactical heuristics.
///
/// Every field falls back to its default when omitted from a configuration
/// file, so partial TOML documents are valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Fixed simulation step in milliseconds.
    pub timestep_ms: u64,
    /// Simulated seconds after which the battle is cut off.
    pub time_cap_secs: u64,
    /// Radius within which berserkers lock onto hostiles.
    pub berserker_aggro_radius: f64,
    /// Mobile friendlies farther than this from a mover are ignored by its planner.
    pub crowd_planning_radius: f64,
    /// Path cost of stepping into a tile held by an immobile friendly.
    pub immobile_friendly_penalty: f64,
    /// Path cost of stepping into a hostile when the mover has no weapon.
    pub unarmed_hostile_penalty: f64,
    /// Multiplier applied to the octile heuristic; kept below one.
    pub heuristic_fudge: f64,
    /// Total distance budget shared by every hop of a chain weapon.
    pub chain_radius: f64,
    /// Damage multiplier applied after each chain hop.
    pub chain_decay: f64,
    /// Perceived-threat multiplier for chain weapons.
    pub chain_threat_bonus: f64,
    /// Lifetime in seconds of the fire tile nearest the caster.
    pub fire_base_lifetime: f64,
    /// Extra lifetime in seconds per tile of distance along a fire line.
    pub fire_lifetime_step: f64,
    /// Whether a resolved line-hazard attack discards every planned route.
    pub force_repath_on_line_hazard: bool,
    /// Idle seconds, divided by crowd aversion, before a route is discarded.
    pub idle_repath_factor: f64,
}

impl BattleConfig {
    /// Fixed simulation step.
    #[must_use]
    pub fn timestep(&self) -> Duration {
        Duration::from_millis(self.timestep_ms.max(1))
    }

    /// Simulated time after which the battle stops.
    #[must_use]
    pub fn time_cap(&self) -> Duration {
        Duration::from_secs(self.time_cap_secs)
    }

    /// Lifetime of the fire tile at position `step` along a line, counted from zero.
    #[must_use]
    pub fn fire_lifetime(&self, step: usize) -> Duration {
        duration_from_secs(self.fire_lifetime_secs(step))
    }

    /// Lifetime in seconds of the fire tile at position `step` along a line.
    #[must_use]
    pub fn fire_lifetime_secs(&self, step: usize) -> f64 {
        self.fire_base_lifetime + self.fire_lifetime_step * step as f64
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            timestep_ms: 100,
            time_cap_secs: 300,
            berserker_aggro_radius: 8.0,
            crowd_planning_radius: 3.0,
            immobile_friendly_penalty: 10_000.0,
            unarmed_hostile_penalty: 10_000.0,
            heuristic_fudge: 0.999,
            chain_radius: 5.0,
            chain_decay: 2.0 / 3.0,
            chain_threat_bonus: 2.0,
            fire_base_lifetime: 1.0,
            fire_lifetime_step: 0.2,
            force_repath_on_line_hazard: true,
            idle_repath_factor: 0.99,
        }
    }
}
