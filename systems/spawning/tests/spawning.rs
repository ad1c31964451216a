use std::time::Duration;

use skirmish_core::{AttackPlan, PlannedSpawn, TeamId, Terrain, TileCoord};
use skirmish_system_spawning::{ScheduleError, SpawnSchedule};

fn two_point_terrain() -> Terrain {
    Terrain::open(6, 3).with_team(
        vec![TileCoord::new(0, 0), TileCoord::new(0, 2)],
        vec![TileCoord::new(5, 1)],
    )
}

fn spawn(time: f64, spawn_point: usize, unit: &str) -> PlannedSpawn {
    PlannedSpawn {
        time,
        spawn_point,
        unit: unit.to_owned(),
    }
}

#[test]
fn queues_drain_in_time_order_per_spawn_point() {
    let plan = AttackPlan {
        team: TeamId::new(0),
        spawns: vec![
            spawn(2.0, 0, "late"),
            spawn(0.0, 1, "south"),
            spawn(0.5, 0, "early"),
            spawn(0.5, 0, "early-second"),
        ],
    };
    let mut schedule = SpawnSchedule::new(&two_point_terrain(), &[plan]).expect("schedule");
    let team = TeamId::new(0);
    assert_eq!(schedule.remaining(), 4);
    assert_eq!(schedule.spawn_point_count(team), 2);

    assert_eq!(schedule.next_due(team, 0, Duration::ZERO), None);
    assert_eq!(
        schedule
            .next_due(team, 1, Duration::ZERO)
            .map(|pending| pending.unit),
        Some("south".to_owned())
    );

    let now = Duration::from_millis(500);
    let first = schedule.next_due(team, 0, now).expect("due");
    let second = schedule.next_due(team, 0, now).expect("due");
    assert_eq!(first.unit, "early");
    assert_eq!(second.unit, "early-second");
    assert_eq!(schedule.next_due(team, 0, now), None);
    assert_eq!(
        schedule.peek(team, 0).map(|pending| pending.time),
        Some(Duration::from_secs(2))
    );

    assert!(schedule.next_due(team, 0, Duration::from_secs(3)).is_some());
    assert!(schedule.is_empty());
}

#[test]
fn unknown_team_is_a_structural_error() {
    let plan = AttackPlan {
        team: TeamId::new(3),
        spawns: vec![spawn(0.0, 0, "grunt")],
    };
    let error = SpawnSchedule::new(&two_point_terrain(), &[plan]).expect_err("unknown team");
    assert_eq!(
        error,
        ScheduleError::UnknownTeam {
            team: 3,
            declared: 1
        }
    );
}

#[test]
fn unknown_spawn_point_is_a_structural_error() {
    let plan = AttackPlan {
        team: TeamId::new(0),
        spawns: vec![spawn(1.0, 2, "grunt")],
    };
    let error = SpawnSchedule::new(&two_point_terrain(), &[plan]).expect_err("bad point");
    assert!(matches!(
        error,
        ScheduleError::UnknownSpawnPoint {
            point: 2,
            available: 2,
            ..
        }
    ));
}

#[test]
fn lookups_outside_the_schedule_are_empty() {
    let mut schedule = SpawnSchedule::new(&two_point_terrain(), &[]).expect("schedule");
    assert!(schedule
        .next_due(TeamId::new(5), 0, Duration::from_secs(10))
        .is_none());
    assert!(schedule.peek(TeamId::new(0), 9).is_none());
}
