//! Declarative battle inputs and the resolution produced from them.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{BattleEvent, TeamId, Terrain, TileCoord, UnitCatalog};

/// One scheduled attacker arrival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedSpawn {
    /// Simulated seconds after the battle starts.
    pub time: f64,
    /// Index into the team's spawn point list.
    pub spawn_point: usize,
    /// Catalog name of the unit to spawn.
    pub unit: String,
}

/// Attacker schedule for one team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackPlan {
    /// Team the spawned attackers fight for.
    pub team: TeamId,
    /// Arrivals in declaration order; the scheduler sorts them by time.
    pub spawns: Vec<PlannedSpawn>,
}

/// One defender placed before the battle starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Catalog name of the unit to place.
    pub unit: String,
    /// Tile the defender starts on.
    pub tile: TileCoord,
}

/// Fixed defender deployment for one team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefensePlan {
    /// Team the placed defenders fight for.
    pub team: TeamId,
    /// Units placed at time zero.
    pub placements: Vec<Placement>,
}

/// Optional objective evaluated against a scenario and its resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Challenge {
    /// Every defense plan costs at most `limit` resources.
    MaxDefenderCost {
        /// Highest permitted total cost.
        limit: u32,
    },
    /// At most `limit` attackers reach a goal in total.
    MaxBreaches {
        /// Highest permitted breach count.
        limit: u32,
    },
    /// At most `limit` defenders die in total.
    MaxDefenderCasualties {
        /// Highest permitted casualty count.
        limit: u32,
    },
    /// No defense plan fields the named unit.
    ForbidUnit {
        /// Catalog name of the forbidden unit.
        unit: String,
    },
}

impl Challenge {
    /// Human readable summary of the objective.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Challenge::MaxDefenderCost { limit } => {
                format!("spend at most {limit} on defenders")
            }
            Challenge::MaxBreaches { limit } => {
                format!("allow at most {limit} attackers to reach a goal")
            }
            Challenge::MaxDefenderCasualties { limit } => {
                format!("lose at most {limit} defenders")
            }
            Challenge::ForbidUnit { unit } => format!("win without fielding {unit}"),
        }
    }

    /// Reports whether the challenge can be decided without simulating.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        matches!(
            self,
            Challenge::MaxDefenderCost { .. } | Challenge::ForbidUnit { .. }
        )
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Complete declarative battle description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Battlefield layout.
    pub terrain: Terrain,
    /// Scheduled attacker arrivals per team.
    #[serde(default)]
    pub attack_plans: Vec<AttackPlan>,
    /// Fixed defender placements per team.
    #[serde(default)]
    pub defense_plans: Vec<DefensePlan>,
    /// Optional objectives.
    #[serde(default)]
    pub challenges: Vec<Challenge>,
}

impl Scenario {
    /// Creates a scenario with no plans or challenges.
    #[must_use]
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            attack_plans: Vec::new(),
            defense_plans: Vec::new(),
            challenges: Vec::new(),
        }
    }

    /// Number of team slots any part of the scenario refers to.
    #[must_use]
    pub fn team_count(&self) -> usize {
        let planned = self
            .attack_plans
            .iter()
            .map(|plan| plan.team.index() + 1)
            .chain(self.defense_plans.iter().map(|plan| plan.team.index() + 1))
            .max()
            .unwrap_or(0);
        planned.max(self.terrain.teams().len())
    }
}

/// Immutable outcome of resolving a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Terrain the battle was fought on.
    pub terrain: Terrain,
    /// Unit catalog the battle was resolved with.
    pub units: UnitCatalog,
    /// Ordered, append-only event log.
    pub events: Vec<BattleEvent>,
    /// Goal reaches per team id.
    pub breaches: Vec<u32>,
    /// Attacker deaths per team id.
    pub attacker_casualties: Vec<u32>,
    /// Defender deaths per team id.
    pub defender_casualties: Vec<u32>,
    /// Total cost of every attacker planned per team id.
    pub attacker_resources: Vec<u32>,
    /// Total cost of every defender placed per team id.
    pub defender_resources: Vec<u32>,
    /// Challenges the scenario satisfied.
    pub achieved_challenges: Vec<Challenge>,
    /// Challenges the scenario failed.
    pub failed_challenges: Vec<Challenge>,
    /// Validation failures; non-empty only when no simulation ran.
    pub errors: Vec<String>,
    /// Simulated time when the battle stopped.
    pub elapsed: Duration,
}

impl Resolution {
    /// Creates an empty resolution carrying validation failures.
    #[must_use]
    pub fn rejected(terrain: Terrain, units: UnitCatalog, errors: Vec<String>) -> Self {
        Self {
            terrain,
            units,
            events: Vec::new(),
            breaches: Vec::new(),
            attacker_casualties: Vec::new(),
            defender_casualties: Vec::new(),
            attacker_resources: Vec::new(),
            defender_resources: Vec::new(),
            achieved_challenges: Vec::new(),
            failed_challenges: Vec::new(),
            errors,
            elapsed: Duration::ZERO,
        }
    }

    /// Reports whether validation rejected the scenario.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Goal reaches summed over every team.
    #[must_use]
    pub fn total_breaches(&self) -> u32 {
        self.breaches.iter().sum()
    }

    /// Defender deaths summed over every team.
    #[must_use]
    pub fn total_defender_casualties(&self) -> u32 {
        self.defender_casualties.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_count_covers_plans_and_terrain() {
        let terrain = Terrain::open(4, 1).with_team(Vec::new(), Vec::new());
        let mut scenario = Scenario::new(terrain);
        assert_eq!(scenario.team_count(), 1);
        scenario.defense_plans.push(DefensePlan {
            team: TeamId::new(2),
            placements: Vec::new(),
        });
        assert_eq!(scenario.team_count(), 3);
    }

    #[test]
    fn static_challenges_are_identified() {
        assert!(Challenge::MaxDefenderCost { limit: 3 }.is_static());
        assert!(!Challenge::MaxBreaches { limit: 0 }.is_static());
        assert_eq!(
            Challenge::ForbidUnit {
                unit: "mage".to_owned()
            }
            .to_string(),
            "win without fielding mage"
        );
    }
}
