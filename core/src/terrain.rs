//! Immutable battlefield terrain and the read-only spatial queries over it.

use serde::{Deserialize, Serialize};

use crate::{Direction, TeamId, TileCoord};

/// Catalog entry describing how a tile type interacts with units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileType {
    /// Human readable name of the tile type.
    pub name: String,
    /// Units cannot enter tiles of this type.
    pub blocks_movement: bool,
    /// Line of sight does not pass through tiles of this type.
    pub blocks_vision: bool,
}

impl TileType {
    /// Walkable, see-through ground.
    #[must_use]
    pub fn floor() -> Self {
        Self {
            name: "floor".to_owned(),
            blocks_movement: false,
            blocks_vision: false,
        }
    }

    /// Impassable, opaque obstacle.
    #[must_use]
    pub fn wall() -> Self {
        Self {
            name: "wall".to_owned(),
            blocks_movement: true,
            blocks_vision: true,
        }
    }
}

/// Spawn and goal points declared for a single team.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLayout {
    /// Ordered tiles where the team's attackers enter the battle.
    #[serde(default)]
    pub spawn_points: Vec<TileCoord>,
    /// Tiles the team's attackers try to reach.
    #[serde(default)]
    pub goal_points: Vec<TileCoord>,
}

/// Immutable width×height grid of tile-type indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    width: u32,
    height: u32,
    tile_types: Vec<TileType>,
    tiles: Vec<u16>,
    #[serde(default)]
    teams: Vec<TeamLayout>,
}

impl Terrain {
    /// Creates a terrain from raw row-major tile indices.
    ///
    /// No structural checks run here; scenario validation reports mismatched
    /// dimensions or dangling tile-type indices.
    #[must_use]
    pub fn new(
        width: u32,
        height: u32,
        tile_types: Vec<TileType>,
        tiles: Vec<u16>,
        teams: Vec<TeamLayout>,
    ) -> Self {
        Self {
            width,
            height,
            tile_types,
            tiles,
            teams,
        }
    }

    /// Creates an open field of floor tiles with a wall type registered at index 1.
    #[must_use]
    pub fn open(width: u32, height: u32) -> Self {
        let count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self::new(
            width,
            height,
            vec![TileType::floor(), TileType::wall()],
            vec![0; count],
            Vec::new(),
        )
    }

    /// Parses an ASCII sketch: `#` is a wall, anything else is floor.
    ///
    /// Rows shorter than the widest row are padded with floor.
    #[must_use]
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let width = rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .and_then(|width| u32::try_from(width).ok())
            .unwrap_or(0);
        let mut terrain = Self::open(width, height);
        for (row, line) in rows.iter().enumerate() {
            for (column, symbol) in line.chars().enumerate() {
                if symbol != '#' {
                    continue;
                }
                let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
                    continue;
                };
                terrain.set_tile(TileCoord::new(column, row), 1);
            }
        }
        terrain
    }

    /// Replaces the tile type at the provided coordinate.
    pub fn set_tile(&mut self, tile: TileCoord, tile_type: u16) {
        if let Some(index) = self.index(tile) {
            if let Some(slot) = self.tiles.get_mut(index) {
                *slot = tile_type;
            }
        }
    }

    /// Appends spawn and goal points for the next team id.
    #[must_use]
    pub fn with_team(mut self, spawn_points: Vec<TileCoord>, goal_points: Vec<TileCoord>) -> Self {
        self.teams.push(TeamLayout {
            spawn_points,
            goal_points,
        });
        self
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Catalog of tile types referenced by index.
    #[must_use]
    pub fn tile_types(&self) -> &[TileType] {
        &self.tile_types
    }

    /// Raw row-major tile-type indices.
    #[must_use]
    pub fn tiles(&self) -> &[u16] {
        &self.tiles
    }

    /// Per-team spawn and goal layouts indexed by team id.
    #[must_use]
    pub fn teams(&self) -> &[TeamLayout] {
        &self.teams
    }

    /// Layout declared for the provided team, if any.
    #[must_use]
    pub fn team(&self, team: TeamId) -> Option<&TeamLayout> {
        self.teams.get(team.index())
    }

    /// Goal tiles of the provided team; empty when the team declares none.
    #[must_use]
    pub fn goal_points(&self, team: TeamId) -> &[TileCoord] {
        self.team(team)
            .map_or(&[], |layout| layout.goal_points.as_slice())
    }

    /// Spawn tiles of the provided team; empty when the team declares none.
    #[must_use]
    pub fn spawn_points(&self, team: TeamId) -> &[TileCoord] {
        self.team(team)
            .map_or(&[], |layout| layout.spawn_points.as_slice())
    }

    /// Total number of tiles in the grid.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(0)
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, tile: TileCoord) -> bool {
        tile.column() < self.width && tile.row() < self.height
    }

    /// Row-major index of the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, tile: TileCoord) -> Option<usize> {
        if !self.in_bounds(tile) {
            return None;
        }
        let row = usize::try_from(tile.row()).ok()?;
        let column = usize::try_from(tile.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(row * width + column)
    }

    /// Tile type found at the coordinate, if it is in bounds and indexed.
    #[must_use]
    pub fn tile_type(&self, tile: TileCoord) -> Option<&TileType> {
        let index = self.index(tile)?;
        let type_index = *self.tiles.get(index)?;
        self.tile_types.get(usize::from(type_index))
    }

    /// Reports whether units may stand on the tile.
    #[must_use]
    pub fn is_passable(&self, tile: TileCoord) -> bool {
        self.tile_type(tile)
            .map_or(false, |tile_type| !tile_type.blocks_movement)
    }

    /// Reports whether sight passes through the tile.
    #[must_use]
    pub fn is_transparent(&self, tile: TileCoord) -> bool {
        self.tile_type(tile)
            .map_or(false, |tile_type| !tile_type.blocks_vision)
    }

    /// Passable tiles reachable in one 8-directional step.
    ///
    /// Diagonal steps require both orthogonal tiles they cut past to be
    /// passable, so units never squeeze between two diagonal walls.
    #[must_use]
    pub fn neighbors(&self, tile: TileCoord) -> NeighborIter {
        let mut neighbors = NeighborIter::default();
        if !self.is_passable(tile) {
            return neighbors;
        }

        for direction in Direction::ALL {
            let Some(candidate) = tile.step(direction) else {
                continue;
            };
            if !self.is_passable(candidate) {
                continue;
            }
            if direction.is_diagonal() {
                let (columns, rows) = direction.offset();
                let horizontal = tile.offset(columns, 0);
                let vertical = tile.offset(0, rows);
                let clear = |side: Option<TileCoord>| side.map_or(false, |t| self.is_passable(t));
                if !clear(horizontal) || !clear(vertical) {
                    continue;
                }
            }
            neighbors.push(candidate);
        }

        neighbors
    }

    /// Reports whether an unobstructed sight line joins the two tile centers.
    ///
    /// Endpoints never block their own line. The traced line is canonicalised
    /// so `line_of_sight(a, b) == line_of_sight(b, a)` always holds.
    #[must_use]
    pub fn line_of_sight(&self, from: TileCoord, to: TileCoord) -> bool {
        if from == to {
            return true;
        }
        let (start, end) = if from <= to { (from, to) } else { (to, from) };
        LineTrace::between(start, end)
            .filter_map(|point| self.point_to_tile(point))
            .filter(|tile| *tile != start && *tile != end)
            .all(|tile| self.is_transparent(tile))
    }

    /// Reports whether every tile on the straight line between the two tiles
    /// can be walked on.
    #[must_use]
    pub fn walkable_line(&self, from: TileCoord, to: TileCoord) -> bool {
        LineTrace::between(from, to).all(|point| {
            self.point_to_tile(point)
                .map_or(false, |tile| self.is_passable(tile))
        })
    }

    /// Tiles along the ray from `origin` through `through`, excluding the
    /// origin, stopping before the first movement-blocking tile, the grid edge,
    /// or the first tile farther than `max_distance` from the origin.
    #[must_use]
    pub fn raycast(&self, origin: TileCoord, through: TileCoord, max_distance: f64) -> Vec<TileCoord> {
        let mut tiles = Vec::new();
        if origin == through || max_distance.is_nan() || max_distance <= 0.0 {
            return tiles;
        }

        let dx = i64::from(through.column()) - i64::from(origin.column());
        let dy = i64::from(through.row()) - i64::from(origin.row());
        let major = dx.abs().max(dy.abs());
        let reach = max_distance.min(f64::from(self.width.max(self.height)) * 2.0);
        let scale = (reach / major as f64).ceil().max(1.0) as i64 + 1;
        let end = (
            i64::from(origin.column()) + dx * scale,
            i64::from(origin.row()) + dy * scale,
        );

        for point in LineTrace::new((i64::from(origin.column()), i64::from(origin.row())), end).skip(1) {
            let Some(tile) = self.point_to_tile(point) else {
                break;
            };
            if tile.distance(origin) > max_distance || !self.is_passable(tile) {
                break;
            }
            tiles.push(tile);
        }

        tiles
    }

    fn point_to_tile(&self, (column, row): (i64, i64)) -> Option<TileCoord> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        let tile = TileCoord::new(column, row);
        self.in_bounds(tile).then_some(tile)
    }
}

/// Stack-allocated iterator over at most eight neighboring tiles.
#[derive(Clone, Debug, Default)]
pub struct NeighborIter {
    buffer: [Option<TileCoord>; 8],
    len: usize,
    cursor: usize,
}

impl NeighborIter {
    fn push(&mut self, tile: TileCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(tile);
            self.len += 1;
        }
    }
}

impl Iterator for NeighborIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}

/// Bresenham walk between two integer points, both endpoints included.
#[derive(Clone, Debug)]
struct LineTrace {
    x: i64,
    y: i64,
    end_x: i64,
    end_y: i64,
    dx: i64,
    dy: i64,
    step_x: i64,
    step_y: i64,
    error: i64,
    finished: bool,
}

impl LineTrace {
    fn new(start: (i64, i64), end: (i64, i64)) -> Self {
        let dx = (end.0 - start.0).abs();
        let dy = -(end.1 - start.1).abs();
        Self {
            x: start.0,
            y: start.1,
            end_x: end.0,
            end_y: end.1,
            dx,
            dy,
            step_x: if start.0 < end.0 { 1 } else { -1 },
            step_y: if start.1 < end.1 { 1 } else { -1 },
            error: dx + dy,
            finished: false,
        }
    }

    fn between(start: TileCoord, end: TileCoord) -> Self {
        Self::new(
            (i64::from(start.column()), i64::from(start.row())),
            (i64::from(end.column()), i64::from(end.row())),
        )
    }
}

impl Iterator for LineTrace {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let point = (self.x, self.y);
        if self.x == self.end_x && self.y == self.end_y {
            self.finished = true;
        } else {
            let doubled = 2 * self.error;
            if doubled >= self.dy {
                self.error += self.dy;
                self.x += self.step_x;
            }
            if doubled <= self.dx {
                self.error += self.dx;
                self.y += self.step_y;
            }
        }
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_marks_walls() {
        let terrain = Terrain::from_rows(&["..#", "...", "#.."]);
        assert_eq!(terrain.width(), 3);
        assert_eq!(terrain.height(), 3);
        assert!(!terrain.is_passable(TileCoord::new(2, 0)));
        assert!(!terrain.is_passable(TileCoord::new(0, 2)));
        assert!(terrain.is_passable(TileCoord::new(1, 1)));
        assert!(!terrain.is_passable(TileCoord::new(3, 1)));
    }

    #[test]
    fn neighbors_refuse_to_cut_corners() {
        let terrain = Terrain::from_rows(&["...", ".#.", "..."]);
        let from_corner: Vec<_> = terrain.neighbors(TileCoord::new(0, 0)).collect();
        assert_eq!(from_corner, vec![TileCoord::new(1, 0), TileCoord::new(0, 1)]);

        let open = Terrain::open(3, 3);
        assert_eq!(open.neighbors(TileCoord::new(1, 1)).count(), 8);
        assert_eq!(open.neighbors(TileCoord::new(0, 0)).count(), 3);
    }

    #[test]
    fn walls_block_sight_symmetrically() {
        let terrain = Terrain::from_rows(&[".....", "..#..", "....."]);
        let west = TileCoord::new(0, 1);
        let east = TileCoord::new(4, 1);
        assert!(!terrain.line_of_sight(west, east));
        assert!(!terrain.line_of_sight(east, west));
        assert!(terrain.line_of_sight(TileCoord::new(0, 0), TileCoord::new(4, 0)));

        for a in [TileCoord::new(0, 0), TileCoord::new(1, 2), TileCoord::new(4, 1)] {
            for b in [TileCoord::new(3, 0), TileCoord::new(0, 2), TileCoord::new(2, 2)] {
                assert_eq!(terrain.line_of_sight(a, b), terrain.line_of_sight(b, a));
            }
        }
    }

    #[test]
    fn raycast_stops_at_walls_and_range() {
        let terrain = Terrain::from_rows(&["......#."]);
        let ray = terrain.raycast(TileCoord::new(0, 0), TileCoord::new(1, 0), 10.0);
        assert_eq!(
            ray,
            (1..6).map(|column| TileCoord::new(column, 0)).collect::<Vec<_>>()
        );

        let short = terrain.raycast(TileCoord::new(0, 0), TileCoord::new(1, 0), 2.5);
        assert_eq!(short, vec![TileCoord::new(1, 0), TileCoord::new(2, 0)]);
    }

    #[test]
    fn raycast_extends_past_the_aim_point_until_the_edge() {
        let terrain = Terrain::open(6, 6);
        let ray = terrain.raycast(TileCoord::new(0, 0), TileCoord::new(1, 1), 100.0);
        assert_eq!(ray.last(), Some(&TileCoord::new(5, 5)));
        assert_eq!(ray.len(), 5);
    }

    #[test]
    fn walkable_line_requires_every_tile_passable() {
        let terrain = Terrain::from_rows(&["..#.."]);
        assert!(terrain.walkable_line(TileCoord::new(0, 0), TileCoord::new(1, 0)));
        assert!(!terrain.walkable_line(TileCoord::new(0, 0), TileCoord::new(4, 0)));
    }

    #[test]
    fn team_queries_default_to_empty() {
        let terrain = Terrain::open(3, 1).with_team(vec![TileCoord::new(0, 0)], vec![TileCoord::new(2, 0)]);
        assert_eq!(terrain.goal_points(TeamId::new(0)), &[TileCoord::new(2, 0)]);
        assert!(terrain.goal_points(TeamId::new(3)).is_empty());
        assert!(terrain.spawn_points(TeamId::new(1)).is_empty());
    }
}
