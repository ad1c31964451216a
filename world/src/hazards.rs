//! Standing fire hazards, recomputed at the start of every tick.

use skirmish_core::{TeamId, TileCoord, MAX_TEAMS};

use crate::roster::Roster;

/// Per-tile damage per second of fire, split by the team that lit it.
#[derive(Clone, Debug)]
pub(crate) struct HazardMap {
    columns: u32,
    rows: u32,
    cells: Vec<[f64; MAX_TEAMS]>,
    lit: Vec<TileCoord>,
}

impl HazardMap {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![[0.0; MAX_TEAMS]; capacity],
            lit: Vec::new(),
        }
    }

    /// Replaces the map with the hazards currently in the roster.
    pub(crate) fn rebuild(&mut self, roster: &Roster) {
        for tile in self.lit.drain(..) {
            if let Some(index) = index(self.columns, self.rows, tile) {
                self.cells[index] = [0.0; MAX_TEAMS];
            }
        }

        for entity in roster.iter() {
            let Some(dps) = entity.hazard_dps() else {
                continue;
            };
            let tile = entity.position();
            let Some(index) = index(self.columns, self.rows, tile) else {
                continue;
            };
            let team = entity.team().index().min(MAX_TEAMS - 1);
            self.cells[index][team] += dps;
            self.lit.push(tile);
        }
        self.lit.sort_unstable();
        self.lit.dedup();
    }

    /// Damage per second the team takes on the tile from other teams' fire.
    pub(crate) fn hostile_dps(&self, tile: TileCoord, team: TeamId) -> f64 {
        let Some(index) = index(self.columns, self.rows, tile) else {
            return 0.0;
        };
        self.cells[index]
            .iter()
            .enumerate()
            .filter(|(owner, _)| *owner != team.index())
            .map(|(_, dps)| *dps)
            .sum()
    }

    /// Tiles holding at least one fire, in coordinate order.
    pub(crate) fn tiles(&self) -> &[TileCoord] {
        &self.lit
    }
}

fn index(columns: u32, rows: u32, tile: TileCoord) -> Option<usize> {
    if tile.column() >= columns || tile.row() >= rows {
        return None;
    }
    let width = usize::try_from(columns).ok()?;
    let column = usize::try_from(tile.column()).ok()?;
    let row = usize::try_from(tile.row()).ok()?;
    Some(row * width + column)
}
