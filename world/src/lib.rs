#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative battle world for the Skirmish resolver.
//!
//! The world owns every piece of mutable battle state: the roster of live
//! entities, the tile occupancy grid, the cached path graph, the threat field,
//! the spawn schedule and the event log. [`Simulation`] advances it in fixed
//! timesteps; [`resolve`] runs a whole scenario and hands back the finished
//! [`Resolution`].

use std::{sync::Arc, time::Duration};

use skirmish_core::{
    BattleConfig, BattleEvent, Behavior, EntityId, EventKind, Resolution, Scenario, TeamId,
    TileCoord, UnitCatalog, UnitCharacteristics,
};
use skirmish_system_pathing::PathSolver;
use skirmish_system_spawning::SpawnSchedule;
use skirmish_system_threat::{ThreatField, ThreatSource};
use skirmish_system_validation::{attack_cost, defense_cost, evaluate_challenges, find_scenario_errors};
use thiserror::Error;

mod entity;
mod hazards;
mod occupancy;
mod roster;
mod tactical;

use entity::{Battlefield, BattleEntity, FireRequest};
use hazards::HazardMap;
use occupancy::OccupancyGrid;
use roster::Roster;

/// Reasons a scenario cannot be simulated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Structural validation failed; every finding is listed.
    #[error("scenario failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Resolves the scenario with the default configuration.
#[must_use]
pub fn resolve(scenario: &Scenario, units: &UnitCatalog) -> Resolution {
    resolve_with(scenario, units, &BattleConfig::default())
}

/// Resolves the scenario end to end.
///
/// Validation failures produce an otherwise empty resolution listing every
/// problem found.
#[must_use]
pub fn resolve_with(scenario: &Scenario, units: &UnitCatalog, config: &BattleConfig) -> Resolution {
    match Simulation::new(scenario, units, config.clone()) {
        Ok(mut simulation) => {
            simulation.run();
            simulation.finish()
        }
        Err(SimulationError::Invalid(errors)) => {
            tracing::warn!(
                target: "skirmish::world",
                errors = errors.len(),
                "scenario rejected"
            );
            Resolution::rejected(scenario.terrain.clone(), units.clone(), errors)
        }
    }
}

/// Fixed-timestep battle simulation.
#[derive(Debug)]
pub struct Simulation {
    scenario: Scenario,
    units: UnitCatalog,
    config: BattleConfig,
    fire: Arc<UnitCharacteristics>,
    roster: Roster,
    occupancy: OccupancyGrid,
    solver: PathSolver<TileCoord>,
    threat: ThreatField,
    hazards: HazardMap,
    schedule: SpawnSchedule,
    events: Vec<BattleEvent>,
    next_id: u32,
    tick_index: u32,
    now: Duration,
    finished: bool,
    breaches: Vec<u32>,
    attacker_casualties: Vec<u32>,
    defender_casualties: Vec<u32>,
}

impl Simulation {
    /// Validates the scenario and deploys it at time zero: defenders are
    /// placed, spawns due at zero enter, and the threat field is built.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Invalid`] listing every structural problem.
    pub fn new(
        scenario: &Scenario,
        units: &UnitCatalog,
        config: BattleConfig,
    ) -> Result<Self, SimulationError> {
        let errors = find_scenario_errors(scenario, units);
        if !errors.is_empty() {
            return Err(SimulationError::Invalid(errors));
        }
        let schedule = SpawnSchedule::new(&scenario.terrain, &scenario.attack_plans)
            .map_err(|error| SimulationError::Invalid(vec![error.to_string()]))?;

        let terrain = &scenario.terrain;
        let team_count = scenario.team_count().max(1);
        let solver = PathSolver::new(
            &tactical::TerrainTopology::new(terrain),
            &tactical::graph_seeds(terrain),
        );

        let mut simulation = Self {
            scenario: scenario.clone(),
            units: units.clone(),
            fire: Arc::new(fire_archetype()),
            roster: Roster::default(),
            occupancy: OccupancyGrid::new(terrain.width(), terrain.height()),
            solver,
            threat: ThreatField::new(terrain.width(), terrain.height(), team_count),
            hazards: HazardMap::new(terrain.width(), terrain.height()),
            schedule,
            events: Vec::new(),
            next_id: 0,
            tick_index: 0,
            now: Duration::ZERO,
            finished: false,
            breaches: vec![0; team_count],
            attacker_casualties: vec![0; team_count],
            defender_casualties: vec![0; team_count],
            config,
        };
        simulation.deploy();
        Ok(simulation)
    }

    /// Reports whether the battle is over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Steps until the battle is over.
    pub fn run(&mut self) {
        while !self.finished {
            self.step();
        }
    }

    /// Advances the battle by one timestep.
    ///
    /// Does nothing once the battle is over: no attackers remain and nothing
    /// is left to spawn, or the time cap has passed.
    pub fn step(&mut self) {
        if self.finished {
            return;
        }
        if !self.attackers_remain() && self.schedule.is_empty() {
            self.finish_battle("attackers exhausted");
            return;
        }
        let now = self.config.timestep().saturating_mul(self.tick_index);
        if now > self.config.time_cap() {
            self.finish_battle("time cap reached");
            return;
        }
        self.now = now;
        self.tick_index = self.tick_index.saturating_add(1);

        self.hazards.rebuild(&self.roster);

        let dt = self.config.timestep();
        let ids = self.roster.ids();
        let mut field = Battlefield {
            roster: &mut self.roster,
            occupancy: &mut self.occupancy,
            solver: &mut self.solver,
            terrain: &self.scenario.terrain,
            threat: &self.threat,
            hazards: &self.hazards,
            config: &self.config,
            fire_requests: Vec::new(),
            moved_defenders: Vec::new(),
            force_repath: false,
        };
        for id in ids {
            let Some(mut entity) = field.roster.checkout(id) else {
                continue;
            };
            entity.update(&mut field, now, dt, &mut self.events);
            field.roster.checkin(entity);
        }
        let Battlefield {
            fire_requests,
            moved_defenders,
            force_repath,
            ..
        } = field;

        if force_repath {
            tracing::debug!(target: "skirmish::world", at = ?now, "forcing every unit to repath");
            for entity in self.roster.iter_mut() {
                entity.clear_route();
            }
        }
        for team in moved_defenders {
            self.threat.mark_opposition_dirty(team);
        }

        self.resolve_goal_reaches(now);
        self.resolve_deaths(now);
        self.resolve_expiries(now);
        self.drain_spawns(now);
        self.spawn_fires(fire_requests, now);
        self.rebuild_threat();
    }

    /// Consumes the simulation and assembles its resolution.
    #[must_use]
    pub fn finish(self) -> Resolution {
        let team_count = self.breaches.len();
        let teams = || (0..team_count).filter_map(|index| u8::try_from(index).ok().map(TeamId::new));
        let attacker_resources = teams()
            .map(|team| attack_cost(&self.scenario, &self.units, team))
            .collect();
        let defender_resources = teams()
            .map(|team| defense_cost(&self.scenario, &self.units, team))
            .collect();

        let mut resolution = Resolution {
            terrain: self.scenario.terrain.clone(),
            units: self.units.clone(),
            events: self.events,
            breaches: self.breaches,
            attacker_casualties: self.attacker_casualties,
            defender_casualties: self.defender_casualties,
            attacker_resources,
            defender_resources,
            achieved_challenges: Vec::new(),
            failed_challenges: Vec::new(),
            errors: Vec::new(),
            elapsed: self.now,
        };
        let (achieved, failed) = evaluate_challenges(&self.scenario, Some(&resolution), &self.units);
        resolution.achieved_challenges = achieved;
        resolution.failed_challenges = failed;
        resolution
    }

    fn deploy(&mut self) {
        let placements: Vec<(TeamId, String, TileCoord)> = self
            .scenario
            .defense_plans
            .iter()
            .flat_map(|plan| {
                plan.placements
                    .iter()
                    .map(move |placement| (plan.team, placement.unit.clone(), placement.tile))
            })
            .collect();
        for (team, unit, tile) in placements {
            match self.units.get(&unit).cloned() {
                Some(unit) => self.spawn_unit(unit, team, false, tile, Duration::ZERO),
                None => tracing::warn!(target: "skirmish::world", unit = %unit, "unknown defender skipped"),
            }
        }
        self.drain_spawns(Duration::ZERO);
        self.rebuild_threat();

        tracing::info!(
            target: "skirmish::world",
            width = self.scenario.terrain.width(),
            height = self.scenario.terrain.height(),
            entities = self.roster.len(),
            pending_spawns = self.schedule.remaining(),
            "battle deployed"
        );
    }

    fn finish_battle(&mut self, reason: &'static str) {
        self.finished = true;
        tracing::info!(
            target: "skirmish::world",
            elapsed = ?self.now,
            events = self.events.len(),
            breaches = self.breaches.iter().sum::<u32>(),
            reason,
            "battle finished"
        );
    }

    fn attackers_remain(&self) -> bool {
        self.roster.iter().any(BattleEntity::is_attacker)
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn spawn_unit(
        &mut self,
        unit: Arc<UnitCharacteristics>,
        team: TeamId,
        attacker: bool,
        tile: TileCoord,
        now: Duration,
    ) {
        let id = self.allocate_id();
        self.occupancy.claim(id, tile);
        self.roster
            .insert(BattleEntity::spawn_unit(id, unit, team, attacker, tile));
        self.events
            .push(BattleEvent::new(now, EventKind::Spawn, id, team, tile));
    }

    fn spawn_fires(&mut self, requests: Vec<FireRequest>, now: Duration) {
        for request in requests {
            let id = self.allocate_id();
            self.roster
                .insert(BattleEntity::spawn_fire(id, Arc::clone(&self.fire), request));
            self.events.push(BattleEvent::new(
                now,
                EventKind::Spawn,
                id,
                request.team,
                request.tile,
            ));
            self.threat.mark_opposition_dirty(request.team);
        }
    }

    fn drain_spawns(&mut self, now: Duration) {
        for team_index in 0..self.schedule.team_count() {
            let Ok(team) = u8::try_from(team_index).map(TeamId::new) else {
                continue;
            };
            for point in 0..self.schedule.spawn_point_count(team) {
                let Some(tile) = self.scenario.terrain.spawn_points(team).get(point).copied() else {
                    continue;
                };
                if !self.occupancy.is_free(tile) {
                    continue;
                }
                let Some(pending) = self.schedule.next_due(team, point, now) else {
                    continue;
                };
                match self.units.get(&pending.unit).cloned() {
                    Some(unit) => self.spawn_unit(unit, team, true, tile, now),
                    None => tracing::warn!(
                        target: "skirmish::world",
                        unit = %pending.unit,
                        "unknown attacker skipped"
                    ),
                }
            }
        }
    }

    fn resolve_goal_reaches(&mut self, now: Duration) {
        let terrain = &self.scenario.terrain;
        let reached: Vec<EntityId> = self
            .roster
            .iter()
            .filter(|entity| {
                entity.last_event() == Some(EventKind::EndMove)
                    && terrain.goal_points(entity.team()).contains(&entity.position())
            })
            .map(BattleEntity::id)
            .collect();

        for id in reached {
            let Some(entity) = self.roster.remove(id) else {
                continue;
            };
            let (team, tile) = (entity.team(), entity.position());
            self.occupancy.release(id, tile);
            self.events.push(
                BattleEvent::new(now, EventKind::ReachGoal, id, team, tile).with_target_location(tile),
            );
            self.events
                .push(BattleEvent::new(now, EventKind::Despawn, id, team, tile));
            if let Some(count) = self.breaches.get_mut(team.index()) {
                *count += 1;
            }
            tracing::debug!(target: "skirmish::world", entity = id.get(), team = team.get(), at = ?now, "goal reached");
        }
    }

    fn resolve_deaths(&mut self, now: Duration) {
        let fallen: Vec<EntityId> = self
            .roster
            .iter()
            .filter(|entity| entity.is_attackable() && !entity.is_alive())
            .map(BattleEntity::id)
            .collect();

        for id in fallen {
            let Some(entity) = self.roster.remove(id) else {
                continue;
            };
            let (team, tile) = (entity.team(), entity.position());
            self.occupancy.release(id, tile);
            if let Some(destination) = entity.moving_to() {
                self.occupancy.release(id, destination);
            }
            self.events
                .push(BattleEvent::new(now, EventKind::Die, id, team, tile));
            self.events
                .push(BattleEvent::new(now, EventKind::Despawn, id, team, tile));

            let counters = if entity.is_attacker() {
                &mut self.attacker_casualties
            } else {
                &mut self.defender_casualties
            };
            if let Some(count) = counters.get_mut(team.index()) {
                *count += 1;
            }
            self.threat.mark_opposition_dirty(team);
            tracing::debug!(
                target: "skirmish::world",
                entity = id.get(),
                unit = %entity.unit().name,
                team = team.get(),
                at = ?now,
                "entity died"
            );
        }
    }

    fn resolve_expiries(&mut self, now: Duration) {
        let expired: Vec<EntityId> = self
            .roster
            .iter()
            .filter(|entity| entity.has_expired())
            .map(BattleEntity::id)
            .collect();

        for id in expired {
            let Some(entity) = self.roster.remove(id) else {
                continue;
            };
            let (team, tile) = (entity.team(), entity.position());
            if entity.is_blocking() {
                self.occupancy.release(id, tile);
            }
            self.events
                .push(BattleEvent::new(now, EventKind::Despawn, id, team, tile));
            self.threat.mark_opposition_dirty(team);
        }
    }

    fn rebuild_threat(&mut self) {
        let sources: Vec<ThreatSource> = self
            .roster
            .iter()
            .filter(|entity| !entity.is_attacker() && entity.is_blocking() && entity.is_alive())
            .filter_map(|entity| {
                entity.unit().weapon.map(|weapon| ThreatSource {
                    team: entity.team(),
                    tile: entity.position(),
                    weapon,
                })
            })
            .collect();
        self.threat
            .rebuild(&self.scenario.terrain, &sources, &self.config);
    }
}

fn fire_archetype() -> UnitCharacteristics {
    UnitCharacteristics {
        name: "fire".to_owned(),
        speed: 0.0,
        hit_points: 1.0,
        behavior: Behavior::None,
        weapon: None,
        cost: 0,
        crowd_aversion_bias: 0.0,
        hurt_aversion_bias: 0.0,
    }
}

/// Query functions that provide read-only access to a running simulation.
pub mod query {
    use std::time::Duration;

    use skirmish_core::{BattleEvent, EntityId, OccupancyView, TeamId, TileCoord};

    use super::{entity::Action, Simulation};

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(simulation: &Simulation) -> OccupancyView<'_> {
        simulation.occupancy.view()
    }

    /// Events logged so far.
    #[must_use]
    pub fn events(simulation: &Simulation) -> &[BattleEvent] {
        &simulation.events
    }

    /// Simulated time of the most recently processed tick.
    #[must_use]
    pub fn now(simulation: &Simulation) -> Duration {
        simulation.now
    }

    /// Goal reaches so far, per team id.
    #[must_use]
    pub fn breaches(simulation: &Simulation) -> &[u32] {
        &simulation.breaches
    }

    /// Spawns still waiting in the schedule.
    #[must_use]
    pub fn pending_spawns(simulation: &Simulation) -> usize {
        simulation.schedule.remaining()
    }

    /// Threat the team currently faces on the tile.
    #[must_use]
    pub fn threat(simulation: &Simulation, tile: TileCoord, team: TeamId) -> f64 {
        simulation.threat.threat(tile, team)
    }

    /// Tiles burning as of the start of the last tick.
    #[must_use]
    pub fn hazard_tiles(simulation: &Simulation) -> &[TileCoord] {
        simulation.hazards.tiles()
    }

    /// Captures a read-only view of every live entity in roster order.
    #[must_use]
    pub fn entity_view(simulation: &Simulation) -> EntityView {
        let snapshots = simulation
            .roster
            .iter()
            .map(|entity| EntitySnapshot {
                id: entity.id(),
                unit: entity.unit().name.clone(),
                team: entity.team(),
                attacker: entity.is_attacker(),
                blocking: entity.is_blocking(),
                hit_points: entity.hit_points(),
                position: entity.position(),
                moving_to: entity.moving_to(),
                activity: match entity.action() {
                    Action::Idle => Activity::Idle,
                    Action::Moving { .. } => Activity::Moving,
                    Action::Attacking { target, .. } => Activity::Attacking { target },
                },
                activity_elapsed: entity.action_elapsed(),
                lifetime: entity.lifetime(),
                planned_steps: entity.route().len(),
            })
            .collect();
        EntityView { snapshots }
    }

    /// Read-only snapshot of every live entity.
    #[derive(Clone, Debug)]
    pub struct EntityView {
        snapshots: Vec<EntitySnapshot>,
    }

    impl EntityView {
        /// Iterator over the captured snapshots in roster order.
        pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
            self.snapshots.iter()
        }

        /// Number of captured snapshots.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether no entities are alive.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<EntitySnapshot> {
            self.snapshots
        }
    }

    /// What an entity was doing when the snapshot was taken.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Activity {
        /// Waiting for its next decision.
        Idle,
        /// Walking to an adjacent tile.
        Moving,
        /// Using its weapon on the target.
        Attacking {
            /// Entity the attack was aimed at.
            target: EntityId,
        },
    }

    /// Immutable representation of a single entity's state.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EntitySnapshot {
        /// Unique identifier.
        pub id: EntityId,
        /// Catalog name of the unit, or `fire`.
        pub unit: String,
        /// Team the entity fights for.
        pub team: TeamId,
        /// Entered through an attack plan.
        pub attacker: bool,
        /// Holds a tile in the occupancy grid.
        pub blocking: bool,
        /// Remaining hit points.
        pub hit_points: f64,
        /// Tile the entity stands on.
        pub position: TileCoord,
        /// Tile reserved by a move in progress.
        pub moving_to: Option<TileCoord>,
        /// Current activity.
        pub activity: Activity,
        /// Time spent in the current activity.
        pub activity_elapsed: Duration,
        /// Remaining lifetime of hazards.
        pub lifetime: Option<Duration>,
        /// Steps left on the planned route.
        pub planned_steps: usize,
    }
}
