use std::collections::{BTreeMap, HashMap};

use skirmish_core::{
    AttackPlan, BattleConfig, Behavior, DefensePlan, EntityId, EventKind, Placement,
    PlannedSpawn, Scenario, TeamId, Terrain, TileCoord, UnitCatalog, UnitCharacteristics, Weapon,
    WeaponKind,
};
use skirmish_world::{query, Simulation};

fn melee(range: f64, damage: f64) -> Weapon {
    Weapon {
        kind: WeaponKind::Physical,
        use_time: 0.3,
        reload_time: 0.7,
        range,
        damage,
    }
}

fn unit(
    name: &str,
    speed: f64,
    hit_points: f64,
    behavior: Behavior,
    weapon: Option<Weapon>,
) -> UnitCharacteristics {
    UnitCharacteristics {
        name: name.to_owned(),
        speed,
        hit_points,
        behavior,
        weapon,
        cost: 2,
        crowd_aversion_bias: 0.5,
        hurt_aversion_bias: 1.0,
    }
}

fn catalog() -> UnitCatalog {
    UnitCatalog::new()
        .with(unit("grunt", 1.0, 12.0, Behavior::Marcher, Some(melee(1.5, 3.0))))
        .with(unit("runner", 2.0, 6.0, Behavior::Rusher, Some(melee(1.5, 2.0))))
        .with(unit("brute", 0.8, 20.0, Behavior::Berserker, Some(melee(1.5, 4.0))))
        .with(unit("scout", 1.5, 4.0, Behavior::Rusher, None))
        .with(unit("tower", 0.0, 30.0, Behavior::Marcher, Some(melee(3.0, 2.0))))
        .with(unit(
            "brazier",
            0.0,
            30.0,
            Behavior::Marcher,
            Some(Weapon {
                kind: WeaponKind::LineHazard,
                use_time: 0.5,
                reload_time: 2.5,
                range: 4.0,
                damage: 1.5,
            }),
        ))
        .with(unit(
            "coil",
            0.0,
            30.0,
            Behavior::Marcher,
            Some(Weapon {
                kind: WeaponKind::Chain,
                use_time: 0.4,
                reload_time: 1.6,
                range: 3.0,
                damage: 4.0,
            }),
        ))
        .with(unit("guard", 1.0, 15.0, Behavior::Marcher, Some(melee(1.5, 2.0))))
}

fn skirmish() -> Scenario {
    let terrain = Terrain::from_rows(&[
        ".........",
        "...#.....",
        ".........",
        "...#.....",
        ".........",
    ])
    .with_team(
        vec![TileCoord::new(0, 1), TileCoord::new(0, 3)],
        vec![TileCoord::new(8, 2)],
    );

    let names = ["grunt", "runner", "brute", "scout", "grunt", "runner", "brute", "grunt"];
    let spawns = names
        .iter()
        .enumerate()
        .map(|(index, name)| PlannedSpawn {
            time: index as f64 * 0.75,
            spawn_point: index % 2,
            unit: (*name).to_owned(),
        })
        .collect();

    let mut scenario = Scenario::new(terrain);
    scenario.attack_plans.push(AttackPlan {
        team: TeamId::new(0),
        spawns,
    });
    scenario.defense_plans.push(DefensePlan {
        team: TeamId::new(1),
        placements: ["tower", "brazier", "coil", "guard"]
            .into_iter()
            .zip([(5, 0), (5, 4), (6, 2), (4, 2)])
            .map(|(unit, (column, row))| Placement {
                unit: unit.to_owned(),
                tile: TileCoord::new(column, row),
            })
            .collect(),
    });
    scenario
}

#[test]
fn occupancy_matches_every_blocking_entity_after_each_tick() {
    let units = catalog();
    let mut simulation =
        Simulation::new(&skirmish(), &units, BattleConfig::default()).expect("valid scenario");
    let mut unit_of: HashMap<EntityId, String> = HashMap::new();

    while !simulation.is_finished() {
        simulation.step();

        let view = query::occupancy_view(&simulation);
        let entities = query::entity_view(&simulation);
        let mut expected = BTreeMap::new();
        for entity in entities.iter() {
            let _ = unit_of.insert(entity.id, entity.unit.clone());
            if !entity.blocking {
                assert!(entity.lifetime.is_some(), "only hazards may stand aside");
                continue;
            }
            assert!(entity.hit_points > 0.0, "dead entity {:?} lingered", entity.id);
            for tile in std::iter::once(entity.position).chain(entity.moving_to) {
                assert_eq!(view.occupant(tile), Some(entity.id));
                assert!(
                    expected.insert(tile, entity.id).is_none(),
                    "tile {tile:?} claimed twice"
                );
            }
        }

        let occupied = view.iter().filter(Option::is_some).count();
        assert_eq!(occupied, expected.len(), "stale reservation left in the grid");
    }

    let events = query::events(&simulation);
    assert!(events.windows(2).all(|pair| pair[0].at <= pair[1].at));

    let mut departures = HashMap::new();
    for event in events {
        match event.kind {
            EventKind::BeginMove => {
                let _ = departures.insert(event.source, event.at);
            }
            EventKind::EndMove => {
                let started = departures.remove(&event.source).expect("move was begun");
                let name = &unit_of[&event.source];
                let speed = units.get(name).expect("known unit").speed;
                let from = events
                    .iter()
                    .rev()
                    .find(|begin| {
                        begin.kind == EventKind::BeginMove
                            && begin.source == event.source
                            && begin.at == started
                    })
                    .map(|begin| begin.source_location)
                    .expect("departure tile");
                let to = event.source_location;
                assert!(from.is_adjacent(to));
                let taken = (event.at - started).as_secs_f64();
                assert!(
                    taken + 1e-9 >= from.distance(to) / speed,
                    "{name} crossed {from:?} -> {to:?} in {taken}s"
                );
            }
            _ => {}
        }
    }
}

#[test]
fn every_spawned_entity_is_accounted_for() {
    let units = catalog();
    let mut simulation =
        Simulation::new(&skirmish(), &units, BattleConfig::default()).expect("valid scenario");
    simulation.run();

    let events = query::events(&simulation);
    let spawned = events.iter().filter(|event| event.kind == EventKind::Spawn).count();
    let despawned = events
        .iter()
        .filter(|event| event.kind == EventKind::Despawn)
        .count();
    let alive = query::entity_view(&simulation).len();
    assert_eq!(spawned, despawned + alive);

    let attackers_left = query::entity_view(&simulation)
        .iter()
        .filter(|entity| entity.attacker)
        .count();
    assert!(attackers_left == 0 || query::now(&simulation) >= BattleConfig::default().time_cap());

    let pending = query::pending_spawns(&simulation);
    let resolution = simulation.finish();
    let attackers_out = resolution.breaches.iter().sum::<u32>()
        + resolution.attacker_casualties.iter().sum::<u32>();
    assert_eq!(attackers_out as usize + attackers_left + pending, 8);
}
