//! Binds the generic path solver to the battlefield.
//!
//! Connectivity comes straight from the terrain and is cached by the solver
//! for the whole battle. Everything dynamic (who stands where, how much
//! damage a tile attracts, where fire burns) is folded into the edge cost of
//! each individual query.

use std::collections::VecDeque;

use skirmish_core::{BattleConfig, Terrain, TileCoord};
use skirmish_system_pathing::{PathCost, PathSolver, Topology};
use skirmish_system_threat::ThreatField;

use crate::{entity::BattleEntity, hazards::HazardMap, occupancy::OccupancyGrid, roster::Roster};

/// 8-directional, corner-respecting adjacency over passable tiles.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TerrainTopology<'a> {
    terrain: &'a Terrain,
}

impl<'a> TerrainTopology<'a> {
    pub(crate) fn new(terrain: &'a Terrain) -> Self {
        Self { terrain }
    }
}

impl Topology for TerrainTopology<'_> {
    type Node = TileCoord;

    fn neighbors(&self, node: TileCoord, out: &mut Vec<TileCoord>) {
        out.extend(self.terrain.neighbors(node));
    }
}

/// Every declared spawn and goal point; the solver's graph grows from here.
pub(crate) fn graph_seeds(terrain: &Terrain) -> Vec<TileCoord> {
    terrain
        .teams()
        .iter()
        .flat_map(|layout| layout.spawn_points.iter().chain(layout.goal_points.iter()))
        .copied()
        .filter(|tile| terrain.is_passable(*tile))
        .collect()
}

/// Edge weights as seen by one mover at one instant.
pub(crate) struct TacticalCost<'a> {
    pub(crate) mover: &'a BattleEntity,
    pub(crate) roster: &'a Roster,
    pub(crate) occupancy: &'a OccupancyGrid,
    pub(crate) threat: &'a ThreatField,
    pub(crate) hazards: &'a HazardMap,
    pub(crate) config: &'a BattleConfig,
}

impl TacticalCost<'_> {
    fn occupancy_penalty(&self, tile: TileCoord) -> f64 {
        let Some(occupant) = self
            .occupancy
            .occupant(tile)
            .filter(|id| *id != self.mover.id())
            .and_then(|id| self.roster.get(id))
        else {
            return 0.0;
        };

        if occupant.team() == self.mover.team() {
            let unit = occupant.unit();
            if !unit.is_mobile() {
                return self.config.immobile_friendly_penalty;
            }
            let spacing = occupant.position().distance(self.mover.position());
            if spacing > self.config.crowd_planning_radius {
                return 0.0;
            }
            return self.mover.unit().crowd_aversion_bias / unit.speed;
        }

        let Some(weapon) = self.mover.unit().weapon.as_ref() else {
            return self.config.unarmed_hostile_penalty;
        };
        let dps = weapon.sustained_dps();
        if dps.is_nan() || dps <= 0.0 {
            return self.config.unarmed_hostile_penalty;
        }
        let time_to_kill = occupant.hit_points().max(0.0) / dps;
        if weapon.kind.is_area() {
            time_to_kill / 2.0
        } else {
            time_to_kill
        }
    }

    fn exposure(&self, tile: TileCoord) -> f64 {
        let hurt = self.mover.unit().hurt_aversion_bias;
        if hurt == 0.0 {
            return 0.0;
        }
        let team = self.mover.team();
        let incoming = self.threat.threat(tile, team) + self.hazards.hostile_dps(tile, team);
        hurt * incoming / self.mover.hit_points().max(f64::EPSILON)
    }
}

impl PathCost<TileCoord> for TacticalCost<'_> {
    fn edge_cost(&self, from: TileCoord, to: TileCoord) -> f64 {
        let speed = self.mover.unit().speed;
        from.distance(to) / speed + self.occupancy_penalty(to) + self.exposure(to)
    }

    fn heuristic(&self, from: TileCoord, to: TileCoord) -> f64 {
        from.octile_distance(to) / self.mover.unit().speed * self.config.heuristic_fudge
    }
}

/// Cheapest route for the mover to any destination, excluding its own tile.
pub(crate) fn plan_route(
    solver: &mut PathSolver<TileCoord>,
    terrain: &Terrain,
    cost: &TacticalCost<'_>,
    destinations: &[TileCoord],
) -> Option<VecDeque<TileCoord>> {
    if !cost.mover.unit().is_mobile() || destinations.is_empty() {
        return None;
    }
    let path = solver.solve(
        &TerrainTopology::new(terrain),
        cost,
        cost.mover.position(),
        destinations,
    )?;
    Some(path.into_nodes().into_iter().skip(1).collect())
}
