#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic attacker spawn schedule consumed by the battle world.

use std::{collections::VecDeque, time::Duration};

use skirmish_core::{duration_from_secs, AttackPlan, TeamId, Terrain};
use thiserror::Error;

/// Structural problem found while building a schedule.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// An attack plan names a team the terrain does not declare.
    #[error("attack plan references team {team}, but the terrain declares {declared} teams")]
    UnknownTeam {
        /// Team named by the plan.
        team: u8,
        /// Number of teams the terrain declares.
        declared: usize,
    },
    /// A planned spawn names a spawn point its team does not have.
    #[error("team {team} plans a spawn at point {point}, but only {available} spawn points exist")]
    UnknownSpawnPoint {
        /// Team named by the plan.
        team: u8,
        /// Spawn point index named by the planned spawn.
        point: usize,
        /// Number of spawn points the team declares.
        available: usize,
    },
}

/// Spawn waiting in a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSpawn {
    /// Simulated time at which the spawn becomes due.
    pub time: Duration,
    /// Catalog name of the unit to spawn.
    pub unit: String,
}

/// Per-team, per-spawn-point queues of pending attacker spawns.
#[derive(Clone, Debug, Default)]
pub struct SpawnSchedule {
    queues: Vec<Vec<VecDeque<PendingSpawn>>>,
}

impl SpawnSchedule {
    /// Builds queues for every spawn point the terrain declares and files every
    /// planned spawn into its queue in time order.
    ///
    /// Spawns planned for the same time keep their declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when a plan refers to an undeclared team or
    /// spawn point.
    pub fn new(terrain: &Terrain, plans: &[AttackPlan]) -> Result<Self, ScheduleError> {
        let mut queues: Vec<Vec<Vec<PendingSpawn>>> = terrain
            .teams()
            .iter()
            .map(|layout| vec![Vec::new(); layout.spawn_points.len()])
            .collect();

        for plan in plans {
            let declared = queues.len();
            let team_queues =
                queues
                    .get_mut(plan.team.index())
                    .ok_or(ScheduleError::UnknownTeam {
                        team: plan.team.get(),
                        declared,
                    })?;
            let available = team_queues.len();
            for spawn in &plan.spawns {
                let queue = team_queues.get_mut(spawn.spawn_point).ok_or(
                    ScheduleError::UnknownSpawnPoint {
                        team: plan.team.get(),
                        point: spawn.spawn_point,
                        available,
                    },
                )?;
                queue.push(PendingSpawn {
                    time: duration_from_secs(spawn.time),
                    unit: spawn.unit.clone(),
                });
            }
        }

        let queues = queues
            .into_iter()
            .map(|team| {
                team.into_iter()
                    .map(|mut queue| {
                        queue.sort_by_key(|pending| pending.time);
                        VecDeque::from(queue)
                    })
                    .collect()
            })
            .collect();

        Ok(Self { queues })
    }

    /// Dequeues the head of the queue when it is due at or before `now`.
    pub fn next_due(&mut self, team: TeamId, point: usize, now: Duration) -> Option<PendingSpawn> {
        let queue = self.queues.get_mut(team.index())?.get_mut(point)?;
        if queue.front()?.time <= now {
            queue.pop_front()
        } else {
            None
        }
    }

    /// Head of the queue without dequeuing it.
    #[must_use]
    pub fn peek(&self, team: TeamId, point: usize) -> Option<&PendingSpawn> {
        self.queues.get(team.index())?.get(point)?.front()
    }

    /// Number of teams with queues.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.queues.len()
    }

    /// Number of spawn-point queues the team owns.
    #[must_use]
    pub fn spawn_point_count(&self, team: TeamId) -> usize {
        self.queues.get(team.index()).map_or(0, Vec::len)
    }

    /// Spawns still waiting across every queue.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.iter().flatten().map(VecDeque::len).sum()
    }

    /// Reports whether every queue has been drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.iter().flatten().all(VecDeque::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_terrain_yields_empty_schedule() {
        let schedule = SpawnSchedule::new(&Terrain::open(2, 2), &[]).expect("schedule");
        assert!(schedule.is_empty());
        assert_eq!(schedule.team_count(), 0);
        assert_eq!(schedule.spawn_point_count(TeamId::new(0)), 0);
    }

    #[test]
    fn errors_name_the_offending_reference() {
        let error = ScheduleError::UnknownSpawnPoint {
            team: 1,
            point: 4,
            available: 2,
        };
        assert_eq!(
            error.to_string(),
            "team 1 plans a spawn at point 4, but only 2 spawn points exist"
        );
    }
}
