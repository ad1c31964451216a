use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use skirmish_core::{
    AttackPlan, BattleEvent, Behavior, DefensePlan, Placement, PlannedSpawn, Resolution,
    Scenario, TeamId, Terrain, TileCoord, UnitCatalog, UnitCharacteristics, Weapon, WeaponKind,
};
use skirmish_world::resolve;

#[test]
fn repeated_resolution_produces_identical_logs() {
    let (scenario, units) = gauntlet();

    let first = resolve(&scenario, &units);
    let second = resolve(&scenario, &units);

    assert!(first.errors.is_empty(), "{:?}", first.errors);
    assert!(!first.events.is_empty());
    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn resolution_survives_a_bincode_round_trip() {
    let (scenario, units) = gauntlet();
    let resolution = resolve(&scenario, &units);

    let encoded = bincode::serialize(&resolution).expect("serialize resolution");
    let decoded: Resolution = bincode::deserialize(&encoded).expect("deserialize resolution");

    assert_eq!(fingerprint(&decoded), fingerprint(&resolution));
}

fn fingerprint(resolution: &Resolution) -> u64 {
    let mut hasher = DefaultHasher::new();
    for event in &resolution.events {
        EventRecord::from(event).hash(&mut hasher);
    }
    resolution.breaches.hash(&mut hasher);
    resolution.attacker_casualties.hash(&mut hasher);
    resolution.defender_casualties.hash(&mut hasher);
    resolution.elapsed.hash(&mut hasher);
    hasher.finish()
}

#[derive(Hash)]
struct EventRecord {
    at_micros: u128,
    kind: skirmish_core::EventKind,
    source: u32,
    target: Option<u32>,
    target_location: Option<TileCoord>,
    damage_bits: Option<u64>,
}

impl From<&BattleEvent> for EventRecord {
    fn from(event: &BattleEvent) -> Self {
        Self {
            at_micros: event.at.as_micros(),
            kind: event.kind,
            source: event.source.get(),
            target: event.target.map(|target| target.get()),
            target_location: event.target_location,
            damage_bits: event.damage.map(f64::to_bits),
        }
    }
}

fn gauntlet() -> (Scenario, UnitCatalog) {
    let terrain = Terrain::from_rows(&[
        "..........",
        "..#....#..",
        "..#.......",
        ".......#..",
    ])
    .with_team(
        vec![TileCoord::new(0, 0), TileCoord::new(0, 3)],
        vec![TileCoord::new(9, 1), TileCoord::new(9, 2)],
    );

    let strike = |kind, use_time, reload_time, range, damage| Weapon {
        kind,
        use_time,
        reload_time,
        range,
        damage,
    };
    let unit = |name: &str, speed, hit_points, behavior, weapon| UnitCharacteristics {
        name: name.to_owned(),
        speed,
        hit_points,
        behavior,
        weapon,
        cost: 3,
        crowd_aversion_bias: 1.0,
        hurt_aversion_bias: 0.5,
    };
    let units = UnitCatalog::new()
        .with(unit(
            "pikeman",
            1.0,
            10.0,
            Behavior::Marcher,
            Some(strike(WeaponKind::Physical, 0.4, 0.6, 1.5, 3.0)),
        ))
        .with(unit(
            "raider",
            1.6,
            6.0,
            Behavior::Berserker,
            Some(strike(WeaponKind::Physical, 0.3, 0.5, 1.5, 2.0)),
        ))
        .with(unit("courier", 2.0, 4.0, Behavior::Rusher, None))
        .with(unit(
            "flamer",
            0.0,
            25.0,
            Behavior::Marcher,
            Some(strike(WeaponKind::LineHazard, 0.5, 2.0, 5.0, 2.0)),
        ))
        .with(unit(
            "tesla",
            0.0,
            25.0,
            Behavior::Marcher,
            Some(strike(WeaponKind::Chain, 0.5, 1.5, 3.5, 5.0)),
        ));

    let spawns = ["pikeman", "raider", "courier", "pikeman", "raider", "courier"]
        .iter()
        .enumerate()
        .map(|(index, name)| PlannedSpawn {
            time: index as f64 * 0.5,
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
        placements: vec![
            Placement {
                unit: "flamer".to_owned(),
                tile: TileCoord::new(5, 0),
            },
            Placement {
                unit: "tesla".to_owned(),
                tile: TileCoord::new(6, 3),
            },
        ],
    });
    (scenario, units)
}
