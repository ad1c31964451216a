#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish battle resolver.
//!
//! This crate defines the value surface that connects the scenario loader, the
//! authoritative battle world, and the pure systems it leans on. Loaders build a
//! [`Scenario`] and a [`UnitCatalog`], the world resolves them tick by tick into
//! an append-only log of [`BattleEvent`] values, and the finished
//! [`Resolution`] is the only thing consumers ever read back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod config;
mod scenario;
mod terrain;
mod units;

pub use config::BattleConfig;
pub use scenario::{
    AttackPlan, Challenge, DefensePlan, Placement, PlannedSpawn, Resolution, Scenario,
};
pub use terrain::{NeighborIter, TeamLayout, Terrain, TileType};
pub use units::{Behavior, UnitCatalog, UnitCharacteristics, Weapon, WeaponKind};

/// Upper bound on the number of teams a scenario may reference.
pub const MAX_TEAMS: usize = 8;

/// Unique identifier assigned to a battle entity when it spawns.
///
/// Identifiers are allocated in strictly increasing order, so sorting by id
/// reproduces roster insertion order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of the side an entity fights for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TeamId(u8);

impl TeamId {
    /// Creates a new team identifier.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the team identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Team identifier widened for indexing per-team tables.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Location of a single terrain tile expressed as column and row coordinates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Shifts the coordinate by the provided signed offset.
    ///
    /// Returns `None` when the result would leave the non-negative quadrant;
    /// upper bounds are the terrain's concern.
    #[must_use]
    pub fn offset(self, columns: i32, rows: i32) -> Option<TileCoord> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(TileCoord::new(column, row))
    }

    /// Steps one tile in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<TileCoord> {
        let (columns, rows) = direction.offset();
        self.offset(columns, rows)
    }

    /// Straight-line distance between tile centers.
    #[must_use]
    pub fn distance(self, other: TileCoord) -> f64 {
        let dx = f64::from(self.column.abs_diff(other.column));
        let dy = f64::from(self.row.abs_diff(other.row));
        dx.hypot(dy)
    }

    /// Length of the shortest 8-directional walk ignoring obstacles.
    #[must_use]
    pub fn octile_distance(self, other: TileCoord) -> f64 {
        let dx = self.column.abs_diff(other.column);
        let dy = self.row.abs_diff(other.row);
        let straight = f64::from(dx.max(dy) - dx.min(dy));
        let diagonal = f64::from(dx.min(dy));
        straight + diagonal * std::f64::consts::SQRT_2
    }

    /// Reports whether the two tiles touch orthogonally or diagonally.
    #[must_use]
    pub fn is_adjacent(self, other: TileCoord) -> bool {
        direction_between(self, other).is_some()
    }
}

/// The eight compass directions available to moving entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward decreasing rows and increasing columns.
    NorthEast,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing rows and columns.
    SouthEast,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward increasing rows and decreasing columns.
    SouthWest,
    /// Movement toward decreasing column indices.
    West,
    /// Movement toward decreasing rows and columns.
    NorthWest,
}

impl Direction {
    /// Every direction in clockwise order starting from north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Column and row delta produced by a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Reports whether the step crosses a tile corner.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast
                | Direction::SouthEast
                | Direction::SouthWest
                | Direction::NorthWest
        )
    }

    /// Distance covered by a single step: 1 or √2.
    #[must_use]
    pub fn step_length(self) -> f64 {
        if self.is_diagonal() {
            std::f64::consts::SQRT_2
        } else {
            1.0
        }
    }
}

/// Determines the direction linking two adjacent tiles.
#[must_use]
pub fn direction_between(from: TileCoord, to: TileCoord) -> Option<Direction> {
    let dx = i64::from(to.column()) - i64::from(from.column());
    let dy = i64::from(to.row()) - i64::from(from.row());
    Direction::ALL.into_iter().find(|direction| {
        let (columns, rows) = direction.offset();
        i64::from(columns) == dx && i64::from(rows) == dy
    })
}

/// Converts fractional seconds into a [`Duration`], rounding up to the next
/// whole microsecond so that timers never complete early.
///
/// Negative and NaN inputs collapse to zero; infinite inputs saturate.
#[must_use]
pub fn duration_from_secs(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }

    let micros = (seconds * 1_000_000.0).ceil();
    if micros >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_micros(micros as u64)
    }
}

/// Kinds of records appended to the battle event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An entity entered the battlefield.
    Spawn,
    /// An entity left the battlefield for any reason.
    Despawn,
    /// An entity started moving toward an adjacent tile.
    BeginMove,
    /// An entity arrived on the tile it was moving to.
    EndMove,
    /// An entity started using its weapon.
    BeginAttack,
    /// A weapon use resolved; chain weapons emit one per hop.
    EndAttack,
    /// An entity ran out of hit points.
    Die,
    /// An attacker stepped onto one of its team's goal tiles.
    ReachGoal,
}

/// Immutable record appended to the battle event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    /// Simulated time at which the event happened.
    pub at: Duration,
    /// What happened.
    pub kind: EventKind,
    /// Entity that caused or experienced the event.
    pub source: EntityId,
    /// Team of the source entity.
    pub source_team: TeamId,
    /// Tile the source entity stood on.
    pub source_location: TileCoord,
    /// Entity on the receiving end, if any.
    pub target: Option<EntityId>,
    /// Team of the receiving entity, if any.
    pub target_team: Option<TeamId>,
    /// Tile the event was aimed at, if any.
    pub target_location: Option<TileCoord>,
    /// Hit points removed from the target, if any were.
    pub damage: Option<f64>,
}

impl BattleEvent {
    /// Creates an event with no target information.
    #[must_use]
    pub fn new(
        at: Duration,
        kind: EventKind,
        source: EntityId,
        source_team: TeamId,
        source_location: TileCoord,
    ) -> Self {
        Self {
            at,
            kind,
            source,
            source_team,
            source_location,
            target: None,
            target_team: None,
            target_location: None,
            damage: None,
        }
    }

    /// Attaches a target entity to the event.
    #[must_use]
    pub fn with_target(mut self, target: EntityId, team: TeamId, location: TileCoord) -> Self {
        self.target = Some(target);
        self.target_team = Some(team);
        self.target_location = Some(location);
        self
    }

    /// Attaches a target tile without a target entity.
    #[must_use]
    pub fn with_target_location(mut self, location: TileCoord) -> Self {
        self.target_location = Some(location);
        self
    }

    /// Records the damage dealt by the event.
    #[must_use]
    pub fn with_damage(mut self, damage: f64) -> Self {
        self.damage = Some(damage);
        self
    }
}

/// Read-only view into the dense occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<EntityId>],
    columns: u32,
    rows: u32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<EntityId>], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the blocking entity claiming the provided tile, if any.
    #[must_use]
    pub fn occupant(&self, tile: TileCoord) -> Option<EntityId> {
        self.index(tile)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Reports whether the tile is currently unclaimed.
    #[must_use]
    pub fn is_free(&self, tile: TileCoord) -> bool {
        self.occupant(tile).is_none()
    }

    /// Returns an iterator over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Option<EntityId>> + 'a {
        self.cells.iter().copied()
    }

    /// Provides the dimensions of the underlying occupancy grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.column() < self.columns && tile.row() < self.rows {
            let row = usize::try_from(tile.row()).ok()?;
            let column = usize::try_from(tile.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn octile_distance_counts_diagonals_as_root_two() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        let expected = 1.0 + 2.0 * std::f64::consts::SQRT_2;
        assert!((origin.octile_distance(destination) - expected).abs() < 1e-12);
        assert!((destination.octile_distance(origin) - expected).abs() < 1e-12);
    }

    #[test]
    fn direction_between_covers_all_neighbors() {
        let origin = TileCoord::new(3, 3);
        for direction in Direction::ALL {
            let neighbor = origin.step(direction).expect("interior step");
            assert_eq!(direction_between(origin, neighbor), Some(direction));
            assert!((direction.step_length() - origin.distance(neighbor)).abs() < 1e-12);
        }
        assert_eq!(direction_between(origin, origin), None);
        assert_eq!(direction_between(origin, TileCoord::new(5, 3)), None);
    }

    #[test]
    fn offset_rejects_negative_coordinates() {
        assert_eq!(TileCoord::new(0, 2).offset(-1, 0), None);
        assert_eq!(
            TileCoord::new(0, 2).offset(1, -2),
            Some(TileCoord::new(1, 0))
        );
    }

    #[test]
    fn duration_from_secs_never_rounds_down() {
        assert_eq!(duration_from_secs(1.0), Duration::from_secs(1));
        assert_eq!(duration_from_secs(0.1), Duration::from_millis(100));
        assert!(duration_from_secs(std::f64::consts::SQRT_2) >= Duration::from_micros(1_414_214));
        assert_eq!(duration_from_secs(-3.0), Duration::ZERO);
        assert_eq!(duration_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn occupancy_view_reports_claimed_tiles() {
        let cells = vec![None, Some(EntityId::new(4)), None, None];
        let view = OccupancyView::new(&cells, 2, 2);
        assert_eq!(view.occupant(TileCoord::new(1, 0)), Some(EntityId::new(4)));
        assert!(view.is_free(TileCoord::new(0, 1)));
        assert!(view.is_free(TileCoord::new(9, 9)));
        assert_eq!(view.dimensions(), (2, 2));
    }

    #[test]
    fn battle_event_round_trips_through_bincode() {
        let event = BattleEvent::new(
            Duration::from_millis(2_300),
            EventKind::EndAttack,
            EntityId::new(3),
            TeamId::new(0),
            TileCoord::new(2, 2),
        )
        .with_target(EntityId::new(9), TeamId::new(1), TileCoord::new(3, 2))
        .with_damage(12.5);
        assert_round_trip(&event);
    }

    #[test]
    fn challenge_round_trips_through_bincode() {
        assert_round_trip(&Challenge::ForbidUnit {
            unit: "pyromancer".to_owned(),
        });
        assert_round_trip(&Challenge::MaxBreaches { limit: 2 });
    }
}
