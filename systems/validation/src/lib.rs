#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Structural scenario checks and challenge evaluation.
//!
//! Every finder collects all problems it can see instead of stopping at the
//! first one, so a rejected scenario reports everything that needs fixing.

use std::collections::{BTreeSet, VecDeque};

use skirmish_core::{
    Challenge, Resolution, Scenario, TeamId, Terrain, TileCoord, UnitCatalog, MAX_TEAMS,
};
use skirmish_system_spawning::ScheduleError;

/// Runs every structural check and concatenates their findings.
#[must_use]
pub fn find_scenario_errors(scenario: &Scenario, units: &UnitCatalog) -> Vec<String> {
    let mut errors = find_terrain_errors(&scenario.terrain);
    errors.extend(find_unit_errors(units));
    errors.extend(find_attack_plan_errors(scenario, units));
    errors.extend(find_defense_plan_errors(scenario, units));
    errors
}

/// Checks grid dimensions, tile-type references and team layouts.
#[must_use]
pub fn find_terrain_errors(terrain: &Terrain) -> Vec<String> {
    let mut errors = Vec::new();

    if terrain.tiles().len() != terrain.tile_count() {
        errors.push(format!(
            "terrain is {}x{} but stores {} tiles",
            terrain.width(),
            terrain.height(),
            terrain.tiles().len()
        ));
        return errors;
    }

    let type_count = terrain.tile_types().len();
    let dangling: BTreeSet<u16> = terrain
        .tiles()
        .iter()
        .copied()
        .filter(|&tile_type| usize::from(tile_type) >= type_count)
        .collect();
    for tile_type in dangling {
        errors.push(format!(
            "tile type {tile_type} is used but only {type_count} tile types are declared"
        ));
    }

    if terrain.teams().len() > MAX_TEAMS {
        errors.push(format!(
            "terrain declares {} teams but at most {MAX_TEAMS} are supported",
            terrain.teams().len()
        ));
    }

    for (index, layout) in terrain.teams().iter().enumerate() {
        let labelled = [("spawn", &layout.spawn_points), ("goal", &layout.goal_points)];
        for (label, points) in labelled {
            for point in points.iter() {
                if !terrain.in_bounds(*point) {
                    errors.push(format!(
                        "team {index} {label} point {} is outside the terrain",
                        describe(*point)
                    ));
                } else if !terrain.is_passable(*point) {
                    errors.push(format!(
                        "team {index} {label} point {} blocks movement",
                        describe(*point)
                    ));
                }
            }
        }

        if layout.spawn_points.is_empty() {
            continue;
        }
        if layout.goal_points.is_empty() {
            errors.push(format!("team {index} has spawn points but no goal points"));
            continue;
        }
        if !goal_reachable(terrain, &layout.spawn_points, &layout.goal_points) {
            errors.push(format!(
                "team {index}: no goal point is reachable from its spawn points"
            ));
        }
    }

    errors
}

/// Checks that every archetype in the catalog carries usable numbers.
///
/// Rates, times and distances must be finite and non-negative; hit points
/// must be finite and positive.
#[must_use]
pub fn find_unit_errors(units: &UnitCatalog) -> Vec<String> {
    let mut errors = Vec::new();

    for unit in units.iter() {
        let mut stats = vec![
            ("speed", unit.speed),
            ("crowd aversion bias", unit.crowd_aversion_bias),
            ("hurt aversion bias", unit.hurt_aversion_bias),
        ];
        if let Some(weapon) = &unit.weapon {
            stats.extend([
                ("weapon use time", weapon.use_time),
                ("weapon reload time", weapon.reload_time),
                ("weapon range", weapon.range),
                ("weapon damage", weapon.damage),
            ]);
        }
        for (label, value) in stats {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("unit {} has invalid {label} {value}", unit.name));
            }
        }
        if !unit.hit_points.is_finite() || unit.hit_points <= 0.0 {
            errors.push(format!(
                "unit {} has invalid hit points {}",
                unit.name, unit.hit_points
            ));
        }
    }

    errors
}

/// Checks that attack plans reference declared teams, spawn points and units.
#[must_use]
pub fn find_attack_plan_errors(scenario: &Scenario, units: &UnitCatalog) -> Vec<String> {
    let mut errors = Vec::new();
    let terrain = &scenario.terrain;

    for plan in &scenario.attack_plans {
        let Some(layout) = terrain.team(plan.team) else {
            errors.push(
                ScheduleError::UnknownTeam {
                    team: plan.team.get(),
                    declared: terrain.teams().len(),
                }
                .to_string(),
            );
            continue;
        };

        for spawn in &plan.spawns {
            if spawn.spawn_point >= layout.spawn_points.len() {
                errors.push(
                    ScheduleError::UnknownSpawnPoint {
                        team: plan.team.get(),
                        point: spawn.spawn_point,
                        available: layout.spawn_points.len(),
                    }
                    .to_string(),
                );
            }
            if !spawn.time.is_finite() || spawn.time < 0.0 {
                errors.push(format!(
                    "team {} plans {} at invalid time {}",
                    plan.team.get(),
                    spawn.unit,
                    spawn.time
                ));
            }
            if units.get(&spawn.unit).is_none() {
                errors.push(format!(
                    "team {} attack plan uses unknown unit {}",
                    plan.team.get(),
                    spawn.unit
                ));
            }
        }
    }

    errors
}

/// Checks that defenders stand on free, walkable tiles and use known units.
#[must_use]
pub fn find_defense_plan_errors(scenario: &Scenario, units: &UnitCatalog) -> Vec<String> {
    let mut errors = Vec::new();
    let terrain = &scenario.terrain;
    let mut claimed = BTreeSet::new();

    for plan in &scenario.defense_plans {
        if plan.team.index() >= MAX_TEAMS {
            errors.push(format!(
                "defense plan references team {} but at most {MAX_TEAMS} are supported",
                plan.team.get()
            ));
            continue;
        }

        for placement in &plan.placements {
            if units.get(&placement.unit).is_none() {
                errors.push(format!(
                    "team {} defense plan uses unknown unit {}",
                    plan.team.get(),
                    placement.unit
                ));
            }
            if !terrain.in_bounds(placement.tile) {
                errors.push(format!(
                    "team {} places {} outside the terrain at {}",
                    plan.team.get(),
                    placement.unit,
                    describe(placement.tile)
                ));
                continue;
            }
            if !terrain.is_passable(placement.tile) {
                errors.push(format!(
                    "team {} places {} on blocked tile {}",
                    plan.team.get(),
                    placement.unit,
                    describe(placement.tile)
                ));
            }
            if !claimed.insert(placement.tile) {
                errors.push(format!(
                    "more than one defender is placed on {}",
                    describe(placement.tile)
                ));
            }
        }
    }

    errors
}

/// Reasons the challenge is not achieved; empty means achieved.
///
/// Without a resolution only plan-level challenges can be judged; outcome
/// challenges report nothing until a resolution is supplied.
#[must_use]
pub fn challenge_disqualifiers(
    scenario: &Scenario,
    resolution: Option<&Resolution>,
    units: &UnitCatalog,
    challenge: &Challenge,
) -> Vec<String> {
    let mut reasons = Vec::new();
    match challenge {
        Challenge::MaxDefenderCost { limit } => {
            let teams: BTreeSet<TeamId> =
                scenario.defense_plans.iter().map(|plan| plan.team).collect();
            for team in teams {
                let cost = defense_cost(scenario, units, team);
                if cost > *limit {
                    reasons.push(format!(
                        "team {} defenders cost {cost}, above the limit of {limit}",
                        team.get()
                    ));
                }
            }
        }
        Challenge::ForbidUnit { unit } => {
            for plan in &scenario.defense_plans {
                if plan.placements.iter().any(|placement| &placement.unit == unit) {
                    reasons.push(format!("team {} fields {unit}", plan.team.get()));
                }
            }
        }
        Challenge::MaxBreaches { limit } => {
            if let Some(resolution) = resolution {
                let breaches = resolution.total_breaches();
                if breaches > *limit {
                    reasons.push(format!(
                        "{breaches} attackers reached a goal, above the limit of {limit}"
                    ));
                }
            }
        }
        Challenge::MaxDefenderCasualties { limit } => {
            if let Some(resolution) = resolution {
                let casualties = resolution.total_defender_casualties();
                if casualties > *limit {
                    reasons.push(format!(
                        "{casualties} defenders died, above the limit of {limit}"
                    ));
                }
            }
        }
    }
    reasons
}

/// Splits the scenario's challenges into achieved and failed lists.
#[must_use]
pub fn evaluate_challenges(
    scenario: &Scenario,
    resolution: Option<&Resolution>,
    units: &UnitCatalog,
) -> (Vec<Challenge>, Vec<Challenge>) {
    scenario.challenges.iter().cloned().partition(|challenge| {
        challenge_disqualifiers(scenario, resolution, units, challenge).is_empty()
    })
}

/// Total cost of every defender the team places.
#[must_use]
pub fn defense_cost(scenario: &Scenario, units: &UnitCatalog, team: TeamId) -> u32 {
    scenario
        .defense_plans
        .iter()
        .filter(|plan| plan.team == team)
        .flat_map(|plan| plan.placements.iter())
        .filter_map(|placement| units.get(&placement.unit))
        .map(|unit| unit.cost)
        .sum()
}

/// Total cost of every attacker the team plans to spawn.
#[must_use]
pub fn attack_cost(scenario: &Scenario, units: &UnitCatalog, team: TeamId) -> u32 {
    scenario
        .attack_plans
        .iter()
        .filter(|plan| plan.team == team)
        .flat_map(|plan| plan.spawns.iter())
        .filter_map(|spawn| units.get(&spawn.unit))
        .map(|unit| unit.cost)
        .sum()
}

fn goal_reachable(terrain: &Terrain, spawns: &[TileCoord], goals: &[TileCoord]) -> bool {
    let mut visited = vec![false; terrain.tile_count()];
    let mut queue = VecDeque::new();

    for &spawn in spawns {
        if !terrain.is_passable(spawn) {
            continue;
        }
        if let Some(index) = terrain.index(spawn) {
            if !visited[index] {
                visited[index] = true;
                queue.push_back(spawn);
            }
        }
    }

    while let Some(tile) = queue.pop_front() {
        if goals.contains(&tile) {
            return true;
        }
        for neighbor in terrain.neighbors(tile) {
            let Some(index) = terrain.index(neighbor) else {
                continue;
            };
            if visited[index] {
                continue;
            }
            visited[index] = true;
            queue.push_back(neighbor);
        }
    }

    false
}

fn describe(tile: TileCoord) -> String {
    format!("({}, {})", tile.column(), tile.row())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walled_corridor_has_no_reachable_goal() {
        let terrain = Terrain::from_rows(&["..#.."])
            .with_team(vec![TileCoord::new(0, 0)], vec![TileCoord::new(4, 0)]);
        let errors = find_terrain_errors(&terrain);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no goal point is reachable"));
    }

    #[test]
    fn diagonal_squeeze_is_not_a_route() {
        let terrain = Terrain::from_rows(&[".#", "#."])
            .with_team(vec![TileCoord::new(0, 0)], vec![TileCoord::new(1, 1)]);
        assert!(!find_terrain_errors(&terrain).is_empty());
    }

    #[test]
    fn dimension_mismatch_is_reported_alone() {
        let terrain = Terrain::new(3, 3, vec![skirmish_core::TileType::floor()], vec![0; 4], Vec::new());
        let errors = find_terrain_errors(&terrain);
        assert_eq!(errors, vec!["terrain is 3x3 but stores 4 tiles".to_owned()]);
    }
}
