//! Dense tile reservations for blocking entities.

use skirmish_core::{EntityId, OccupancyView, TileCoord};

/// Tile → blocking entity map; every mutation checks ownership.
#[derive(Clone, Debug)]
pub(crate) struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<EntityId>>,
}

impl OccupancyGrid {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    pub(crate) fn occupant(&self, tile: TileCoord) -> Option<EntityId> {
        self.index(tile)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    pub(crate) fn is_free(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some() && self.occupant(tile).is_none()
    }

    /// Reserves the tile for the entity.
    ///
    /// # Panics
    ///
    /// Panics when the tile lies outside the grid or another entity holds it.
    pub(crate) fn claim(&mut self, entity: EntityId, tile: TileCoord) {
        let Some(index) = self.index(tile) else {
            panic!(
                "occupancy invariant violated: entity {} claimed out-of-bounds tile ({}, {})",
                entity.get(),
                tile.column(),
                tile.row()
            );
        };
        match self.cells[index] {
            Some(holder) if holder != entity => panic!(
                "occupancy invariant violated: entity {} claimed tile ({}, {}) held by entity {}",
                entity.get(),
                tile.column(),
                tile.row(),
                holder.get()
            ),
            _ => self.cells[index] = Some(entity),
        }
    }

    /// Releases a tile the entity holds.
    ///
    /// # Panics
    ///
    /// Panics when the entity does not hold the tile.
    pub(crate) fn release(&mut self, entity: EntityId, tile: TileCoord) {
        let holder = self.occupant(tile);
        if holder != Some(entity) {
            panic!(
                "occupancy invariant violated: entity {} released tile ({}, {}) held by {:?}",
                entity.get(),
                tile.column(),
                tile.row(),
                holder.map(|id| id.get())
            );
        }
        if let Some(index) = self.index(tile) {
            self.cells[index] = None;
        }
    }

    pub(crate) fn view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.cells, self.columns, self.rows)
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
