//! Runtime state and decision logic of a single battle entity.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use skirmish_core::{
    direction_between, duration_from_secs, BattleConfig, BattleEvent, Behavior, EntityId,
    EventKind, TeamId, Terrain, TileCoord, UnitCharacteristics, Weapon, WeaponKind,
};
use skirmish_system_pathing::PathSolver;
use skirmish_system_threat::ThreatField;

use crate::{
    hazards::HazardMap,
    occupancy::OccupancyGrid,
    roster::Roster,
    tactical::{plan_route, TacticalCost},
};

/// What an entity is currently doing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Action {
    Idle,
    Moving {
        from: TileCoord,
        to: TileCoord,
        duration: Duration,
    },
    Attacking {
        target: EntityId,
        target_team: TeamId,
        location: TileCoord,
        duration: Duration,
    },
}

/// Fire tile requested by a resolved line-hazard attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FireRequest {
    pub(crate) team: TeamId,
    pub(crate) tile: TileCoord,
    pub(crate) dps: f64,
    pub(crate) lifetime: Duration,
}

/// Mutable battle state an updating entity may touch.
///
/// The entity being updated is checked out of `roster`, so every lookup
/// through it sees the other entities only.
pub(crate) struct Battlefield<'a> {
    pub(crate) roster: &'a mut Roster,
    pub(crate) occupancy: &'a mut OccupancyGrid,
    pub(crate) solver: &'a mut PathSolver<TileCoord>,
    pub(crate) terrain: &'a Terrain,
    pub(crate) threat: &'a ThreatField,
    pub(crate) hazards: &'a HazardMap,
    pub(crate) config: &'a BattleConfig,
    pub(crate) fire_requests: Vec<FireRequest>,
    pub(crate) moved_defenders: Vec<TeamId>,
    pub(crate) force_repath: bool,
}

impl Battlefield<'_> {
    fn route(
        &mut self,
        mover: &BattleEntity,
        destinations: &[TileCoord],
    ) -> Option<VecDeque<TileCoord>> {
        let cost = TacticalCost {
            mover,
            roster: &*self.roster,
            occupancy: &*self.occupancy,
            threat: self.threat,
            hazards: self.hazards,
            config: self.config,
        };
        plan_route(&mut *self.solver, self.terrain, &cost, destinations)
    }

    /// Living, attackable entities of other teams in roster order.
    fn hostiles(&self, team: TeamId) -> impl Iterator<Item = &BattleEntity> + '_ {
        self.roster
            .iter()
            .filter(move |other| other.team != team && other.is_attackable() && other.is_alive())
    }
}

/// Outcome of trying to take the next step along a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Started,
    Blocked(EntityId),
    Stuck,
}

/// Where the current route leads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Heading {
    Goal,
    Prey(EntityId),
}

/// A unit or hazard taking part in the battle.
#[derive(Clone, Debug)]
pub(crate) struct BattleEntity {
    id: EntityId,
    unit: Arc<UnitCharacteristics>,
    team: TeamId,
    attacker: bool,
    hazard_dps: Option<f64>,
    hit_points: f64,
    position: TileCoord,
    action: Action,
    action_elapsed: Duration,
    reload_elapsed: Duration,
    lifetime: Option<Duration>,
    route: VecDeque<TileCoord>,
    heading: Heading,
    chase: Option<EntityId>,
    idle: Duration,
    last_event: Option<EventKind>,
}

impl BattleEntity {
    /// Creates a blocking unit standing on `position` with its weapon ready.
    pub(crate) fn spawn_unit(
        id: EntityId,
        unit: Arc<UnitCharacteristics>,
        team: TeamId,
        attacker: bool,
        position: TileCoord,
    ) -> Self {
        let reload_elapsed = unit
            .weapon
            .as_ref()
            .map_or(Duration::ZERO, |weapon| duration_from_secs(weapon.reload_time));
        Self {
            id,
            hit_points: unit.hit_points,
            unit,
            team,
            attacker,
            hazard_dps: None,
            position,
            action: Action::Idle,
            action_elapsed: Duration::ZERO,
            reload_elapsed,
            lifetime: None,
            route: VecDeque::new(),
            heading: Heading::Goal,
            chase: None,
            idle: Duration::ZERO,
            last_event: None,
        }
    }

    /// Creates a non-blocking, non-attackable fire tile.
    pub(crate) fn spawn_fire(
        id: EntityId,
        archetype: Arc<UnitCharacteristics>,
        request: FireRequest,
    ) -> Self {
        let mut fire = Self::spawn_unit(id, archetype, request.team, false, request.tile);
        fire.hazard_dps = Some(request.dps);
        fire.lifetime = Some(request.lifetime);
        fire
    }

    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn team(&self) -> TeamId {
        self.team
    }

    pub(crate) fn position(&self) -> TileCoord {
        self.position
    }

    pub(crate) fn hit_points(&self) -> f64 {
        self.hit_points
    }

    pub(crate) fn action(&self) -> Action {
        self.action
    }

    pub(crate) fn action_elapsed(&self) -> Duration {
        self.action_elapsed
    }

    pub(crate) fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    pub(crate) fn last_event(&self) -> Option<EventKind> {
        self.last_event
    }

    pub(crate) fn hazard_dps(&self) -> Option<f64> {
        self.hazard_dps
    }

    pub(crate) fn is_attacker(&self) -> bool {
        self.attacker
    }

    /// Hazards neither occupy tiles nor take damage.
    pub(crate) fn is_blocking(&self) -> bool {
        self.hazard_dps.is_none()
    }

    pub(crate) fn is_attackable(&self) -> bool {
        self.is_blocking()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.hit_points > 0.0
    }

    pub(crate) fn has_expired(&self) -> bool {
        self.lifetime == Some(Duration::ZERO)
    }

    /// Tile reserved ahead of a move in progress.
    pub(crate) fn moving_to(&self) -> Option<TileCoord> {
        match self.action {
            Action::Moving { to, .. } => Some(to),
            _ => None,
        }
    }

    pub(crate) fn route(&self) -> &VecDeque<TileCoord> {
        &self.route
    }

    /// Discards the planned route; the next decision plans afresh.
    pub(crate) fn clear_route(&mut self) {
        self.route.clear();
    }

    pub(crate) fn unit(&self) -> &UnitCharacteristics {
        &self.unit
    }

    fn weapon(&self) -> Option<&Weapon> {
        self.unit.weapon.as_ref()
    }

    fn weapon_ready(&self) -> bool {
        self.weapon()
            .map_or(false, |weapon| {
                self.reload_elapsed >= duration_from_secs(weapon.reload_time)
            })
    }

    /// Advances the entity by one timestep: burns, progresses the current
    /// action, then decides what to do next if it became idle.
    pub(crate) fn update(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        dt: Duration,
        out: &mut Vec<BattleEvent>,
    ) {
        self.last_event = None;
        if !self.is_alive() {
            return;
        }

        if let Some(lifetime) = self.lifetime.as_mut() {
            *lifetime = lifetime.saturating_sub(dt);
        }

        if self.is_attackable() {
            let burn = field.hazards.hostile_dps(self.position, self.team);
            if burn > 0.0 {
                self.hit_points -= burn * dt.as_secs_f64();
                if !self.is_alive() {
                    return;
                }
            }
        }

        if !matches!(self.action, Action::Attacking { .. }) {
            if let Some(weapon) = self.weapon() {
                let full = duration_from_secs(weapon.reload_time);
                self.reload_elapsed = self.reload_elapsed.saturating_add(dt).min(full);
            }
        }

        let mut arrived = false;
        match self.action {
            Action::Idle => {}
            Action::Moving { from, to, duration } => {
                self.action_elapsed = self.action_elapsed.saturating_add(dt);
                if self.action_elapsed >= duration {
                    field.occupancy.release(self.id, from);
                    self.position = to;
                    if self.route.front() == Some(&to) {
                        let _ = self.route.pop_front();
                    }
                    self.finish_action();
                    self.emit(
                        out,
                        BattleEvent::new(now, EventKind::EndMove, self.id, self.team, to)
                            .with_target_location(to),
                    );
                    if !self.attacker && self.weapon().is_some() {
                        field.moved_defenders.push(self.team);
                    }
                    arrived = true;
                }
            }
            Action::Attacking {
                target,
                target_team,
                location,
                duration,
            } => {
                self.action_elapsed = self.action_elapsed.saturating_add(dt);
                if self.action_elapsed >= duration {
                    self.finish_action();
                    self.reload_elapsed = Duration::ZERO;
                    self.resolve_attack(field, now, target, target_team, location, out);
                }
            }
        }

        if arrived && field.terrain.goal_points(self.team).contains(&self.position) {
            return;
        }

        if self.action == Action::Idle {
            self.decide(field, now, dt, out);
        }
    }

    fn finish_action(&mut self) {
        self.action = Action::Idle;
        self.action_elapsed = Duration::ZERO;
    }

    fn emit(&mut self, out: &mut Vec<BattleEvent>, event: BattleEvent) {
        self.last_event = Some(event.kind);
        out.push(event);
    }

    fn decide(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        dt: Duration,
        out: &mut Vec<BattleEvent>,
    ) {
        let behavior = self.unit().behavior;
        let acted = match behavior {
            Behavior::None => return,
            Behavior::Marcher => self.decide_marcher(field, now, out),
            Behavior::Rusher => self.decide_rusher(field, now, out),
            Behavior::Berserker => self.decide_berserker(field, now, out),
        };

        if acted {
            self.idle = Duration::ZERO;
            return;
        }

        let ready = self.weapon().is_none() || self.weapon_ready();
        if !ready {
            return;
        }
        self.idle = self.idle.saturating_add(dt);
        let bias = self.unit().crowd_aversion_bias;
        if bias > 0.0 && self.idle.as_secs_f64() > field.config.idle_repath_factor / bias {
            tracing::trace!(
                target: "skirmish::entity",
                entity = self.id.get(),
                idle_secs = self.idle.as_secs_f64(),
                "idle too long, discarding route"
            );
            self.route.clear();
            self.chase = None;
            self.idle = Duration::ZERO;
        }
    }

    fn decide_marcher(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        out: &mut Vec<BattleEvent>,
    ) -> bool {
        if let Some((target, team, location)) = self.attack_target(field) {
            return self.try_attack(target, team, location, now, out);
        }
        self.advance(field, Heading::Goal, now, out) == Step::Started
    }

    fn decide_rusher(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        out: &mut Vec<BattleEvent>,
    ) -> bool {
        match self.advance(field, Heading::Goal, now, out) {
            Step::Started => true,
            Step::Blocked(blocker) => {
                let Some(other) = field.roster.get(blocker) else {
                    return false;
                };
                if other.team == self.team || !other.is_attackable() || !other.is_alive() {
                    return false;
                }
                let in_range = self.weapon().map_or(false, |weapon| {
                    other.position.distance(self.position) <= weapon.range
                });
                if !in_range {
                    return false;
                }
                let (team, location) = (other.team, other.position);
                self.try_attack(blocker, team, location, now, out)
            }
            Step::Stuck => false,
        }
    }

    fn decide_berserker(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        out: &mut Vec<BattleEvent>,
    ) -> bool {
        if let Some((target, team, location)) = self.attack_target(field) {
            return self.try_attack(target, team, location, now, out);
        }
        let heading = match self.chase_target(field) {
            Some(prey) => Heading::Prey(prey),
            None => Heading::Goal,
        };
        self.advance(field, heading, now, out) == Step::Started
    }

    /// Nearest visible hostile within weapon range, ties broken by id.
    fn attack_target(&self, field: &Battlefield<'_>) -> Option<(EntityId, TeamId, TileCoord)> {
        let weapon = self.weapon()?;
        field
            .hostiles(self.team)
            .map(|other| (other.position.distance(self.position), other))
            .filter(|(distance, other)| {
                *distance <= weapon.range && field.terrain.line_of_sight(self.position, other.position)
            })
            .min_by(|(a, left), (b, right)| a.total_cmp(b).then(left.id.cmp(&right.id)))
            .map(|(_, other)| (other.id, other.team, other.position))
    }

    /// Keeps or acquires the hostile a berserker is hunting.
    fn chase_target(&mut self, field: &Battlefield<'_>) -> Option<EntityId> {
        let radius = field.config.berserker_aggro_radius;
        if let Some(locked) = self.chase {
            let still_valid = field.roster.get(locked).map_or(false, |other| {
                other.is_alive() && other.position.distance(self.position) <= radius
            });
            if still_valid {
                return Some(locked);
            }
            self.chase = None;
        }

        let prey = field
            .hostiles(self.team)
            .map(|other| (other.position.distance(self.position), other))
            .filter(|(distance, other)| {
                *distance <= radius && field.terrain.walkable_line(self.position, other.position)
            })
            .min_by(|(a, left), (b, right)| a.total_cmp(b).then(left.id.cmp(&right.id)))
            .map(|(_, other)| other.id)?;
        self.chase = Some(prey);
        Some(prey)
    }

    fn try_attack(
        &mut self,
        target: EntityId,
        target_team: TeamId,
        location: TileCoord,
        now: Duration,
        out: &mut Vec<BattleEvent>,
    ) -> bool {
        if !self.weapon_ready() {
            return false;
        }
        let Some(weapon) = self.weapon() else {
            return false;
        };
        let duration = duration_from_secs(weapon.use_time);
        self.action = Action::Attacking {
            target,
            target_team,
            location,
            duration,
        };
        self.action_elapsed = Duration::ZERO;
        self.emit(
            out,
            BattleEvent::new(now, EventKind::BeginAttack, self.id, self.team, self.position)
                .with_target(target, target_team, location),
        );
        true
    }

    /// Takes the next step toward the heading, planning a route when needed.
    fn advance(
        &mut self,
        field: &mut Battlefield<'_>,
        heading: Heading,
        now: Duration,
        out: &mut Vec<BattleEvent>,
    ) -> Step {
        if !self.unit().is_mobile() {
            return Step::Stuck;
        }

        let destinations = match heading {
            Heading::Goal => field.terrain.goal_points(self.team).to_vec(),
            Heading::Prey(prey) => {
                let Some(tile) = field.roster.get(prey).map(|other| other.position) else {
                    return Step::Stuck;
                };
                field.terrain.neighbors(tile).collect()
            }
        };

        let stale = heading != self.heading
            || self
                .route
                .front()
                .map_or(false, |next| direction_between(self.position, *next).is_none())
            || self
                .route
                .back()
                .map_or(false, |last| !destinations.contains(last));
        if stale {
            self.route.clear();
            self.heading = heading;
        }

        if self.route.is_empty() {
            if destinations.contains(&self.position) {
                return Step::Stuck;
            }
            match field.route(self, &destinations) {
                Some(route) if !route.is_empty() => self.route = route,
                _ => return Step::Stuck,
            }
        }

        let Some(next) = self.route.front().copied() else {
            return Step::Stuck;
        };
        if let Some(occupant) = field.occupancy.occupant(next) {
            return Step::Blocked(occupant);
        }

        let Some(direction) = direction_between(self.position, next) else {
            self.route.clear();
            return Step::Stuck;
        };
        let duration = duration_from_secs(direction.step_length() / self.unit().speed);
        field.occupancy.claim(self.id, next);
        self.action = Action::Moving {
            from: self.position,
            to: next,
            duration,
        };
        self.action_elapsed = Duration::ZERO;
        self.emit(
            out,
            BattleEvent::new(now, EventKind::BeginMove, self.id, self.team, self.position)
                .with_target_location(next),
        );
        Step::Started
    }

    fn resolve_attack(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        target: EntityId,
        target_team: TeamId,
        location: TileCoord,
        out: &mut Vec<BattleEvent>,
    ) {
        let Some(weapon) = self.weapon().copied() else {
            return;
        };
        match weapon.kind {
            WeaponKind::Physical => {
                let mut event = BattleEvent::new(
                    now,
                    EventKind::EndAttack,
                    self.id,
                    self.team,
                    self.position,
                )
                .with_target(target, target_team, location);
                if let Some(victim) = field.roster.get_mut(target) {
                    if victim.is_alive() && victim.position == location {
                        victim.hit_points -= weapon.damage;
                        event = event.with_damage(weapon.damage);
                    }
                }
                self.emit(out, event);
            }
            WeaponKind::LineHazard => self.resolve_line_hazard(field, now, &weapon, location, out),
            WeaponKind::Chain => self.resolve_chain(field, now, &weapon, location, out),
        }
    }

    /// Lays fire along the line crossing the most visible enemies.
    fn resolve_line_hazard(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        weapon: &Weapon,
        sighted: TileCoord,
        out: &mut Vec<BattleEvent>,
    ) {
        let visible: Vec<TileCoord> = field
            .hostiles(self.team)
            .map(|other| other.position)
            .filter(|tile| {
                tile.distance(self.position) <= weapon.range
                    && field.terrain.line_of_sight(self.position, *tile)
            })
            .collect();

        let mut aim = sighted;
        let mut best = 0;
        for candidate in &visible {
            let crossed = field
                .terrain
                .raycast(self.position, *candidate, weapon.range)
                .iter()
                .filter(|tile| visible.contains(tile))
                .count();
            if crossed > best {
                best = crossed;
                aim = *candidate;
            }
        }

        let line = field.terrain.raycast(self.position, aim, weapon.range);
        for (step, tile) in line.into_iter().enumerate() {
            let friendly = field
                .occupancy
                .occupant(tile)
                .and_then(|id| field.roster.get(id))
                .map_or(false, |other| other.team == self.team);
            if friendly {
                continue;
            }
            field.fire_requests.push(FireRequest {
                team: self.team,
                tile,
                dps: weapon.damage,
                lifetime: field.config.fire_lifetime(step),
            });
        }

        self.emit(
            out,
            BattleEvent::new(now, EventKind::EndAttack, self.id, self.team, self.position)
                .with_target_location(aim),
        );
        if field.config.force_repath_on_line_hazard {
            field.force_repath = true;
        }
    }

    /// Hops between nearby hostiles, weakening with every hop.
    fn resolve_chain(
        &mut self,
        field: &mut Battlefield<'_>,
        now: Duration,
        weapon: &Weapon,
        origin: TileCoord,
        out: &mut Vec<BattleEvent>,
    ) {
        let mut budget = field.config.chain_radius;
        let mut damage = weapon.damage;
        let mut from = origin;
        let mut struck: Vec<EntityId> = Vec::new();

        loop {
            let next = field
                .hostiles(self.team)
                .filter(|other| !struck.contains(&other.id))
                .map(|other| (other.position.distance(from), other))
                .filter(|(distance, other)| {
                    *distance <= budget && field.terrain.line_of_sight(from, other.position)
                })
                .min_by(|(a, left), (b, right)| a.total_cmp(b).then(left.id.cmp(&right.id)))
                .map(|(distance, other)| (distance, other.id, other.team, other.position));
            let Some((distance, victim, team, tile)) = next else {
                break;
            };

            if let Some(other) = field.roster.get_mut(victim) {
                other.hit_points -= damage;
            }
            self.emit(
                out,
                BattleEvent::new(now, EventKind::EndAttack, self.id, self.team, self.position)
                    .with_target(victim, team, tile)
                    .with_damage(damage),
            );
            struck.push(victim);
            budget -= distance;
            damage *= field.config.chain_decay;
            from = tile;
        }

        if struck.is_empty() {
            self.emit(
                out,
                BattleEvent::new(now, EventKind::EndAttack, self.id, self.team, self.position)
                    .with_target_location(origin),
            );
        }
    }
}
