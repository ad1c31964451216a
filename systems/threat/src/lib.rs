#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-team estimate of the hostile damage per second reaching every tile.

use skirmish_core::{BattleConfig, TeamId, Terrain, TileCoord, Weapon, WeaponKind, MAX_TEAMS};

/// Armed defender contributing threat to every team but its own.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreatSource {
    /// Team the source fights for.
    pub team: TeamId,
    /// Tile the source stands on.
    pub tile: TileCoord,
    /// Weapon carried by the source.
    pub weapon: Weapon,
}

/// Damage per second a weapon is perceived to project into a tile it covers.
#[must_use]
pub fn threat_dps(weapon: &Weapon, config: &BattleConfig) -> f64 {
    match weapon.kind {
        WeaponKind::Physical => weapon.sustained_dps(),
        WeaponKind::LineHazard => {
            let burn = weapon.damage * config.fire_lifetime_secs(0);
            let cycle = weapon.cycle_time();
            if cycle > 0.0 {
                burn / cycle
            } else {
                burn
            }
        }
        WeaponKind::Chain => weapon.sustained_dps() * config.chain_threat_bonus,
    }
}

#[derive(Clone, Debug)]
struct Layer {
    values: Vec<f64>,
    dirty: bool,
}

/// Lazily rebuilt per-team threat grids.
#[derive(Clone, Debug)]
pub struct ThreatField {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
}

impl ThreatField {
    /// Creates a field with one dirty, all-zero layer per team.
    #[must_use]
    pub fn new(width: u32, height: u32, team_count: usize) -> Self {
        let cells = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        let layers = (0..team_count.min(MAX_TEAMS))
            .map(|_| Layer {
                values: vec![0.0; cells],
                dirty: true,
            })
            .collect();
        Self {
            width,
            height,
            layers,
        }
    }

    /// Schedules every layer except `team`'s for rebuilding.
    ///
    /// Called when something about `team`'s units changes what the other teams
    /// should fear.
    pub fn mark_opposition_dirty(&mut self, team: TeamId) {
        for (index, layer) in self.layers.iter_mut().enumerate() {
            if index != team.index() {
                layer.dirty = true;
            }
        }
    }

    /// Rebuilds every dirty layer from the provided sources.
    pub fn rebuild(&mut self, terrain: &Terrain, sources: &[ThreatSource], config: &BattleConfig) {
        let mut rebuilt = 0;
        for index in 0..self.layers.len() {
            if !self.layers[index].dirty {
                continue;
            }

            let mut values = std::mem::take(&mut self.layers[index].values);
            values.fill(0.0);
            for source in sources.iter().filter(|source| source.team.index() != index) {
                self.splat(terrain, source, threat_dps(&source.weapon, config), &mut values);
            }

            let layer = &mut self.layers[index];
            layer.values = values;
            layer.dirty = false;
            rebuilt += 1;
        }

        if rebuilt > 0 {
            tracing::debug!(
                target: "skirmish::threat",
                layers = rebuilt,
                sources = sources.len(),
                "rebuilt threat layers"
            );
        }
    }

    /// Threat the team faces on the tile; zero outside the grid.
    #[must_use]
    pub fn threat(&self, tile: TileCoord, team: TeamId) -> f64 {
        let Some(index) = self.index(tile) else {
            return 0.0;
        };
        self.layers
            .get(team.index())
            .and_then(|layer| layer.values.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    fn splat(&self, terrain: &Terrain, source: &ThreatSource, dps: f64, values: &mut [f64]) {
        let range = source.weapon.range;
        if dps.is_nan() || dps <= 0.0 || range.is_nan() || range < 0.0 {
            return;
        }

        // No tile lies farther than the longer grid side along either axis.
        let reach = range.min(f64::from(self.width.max(self.height))).floor() as i64;
        let center = (i64::from(source.tile.column()), i64::from(source.tile.row()));
        let columns = (center.0 - reach).max(0)..=(center.0 + reach).min(i64::from(self.width) - 1);
        for column in columns {
            let rows = (center.1 - reach).max(0)..=(center.1 + reach).min(i64::from(self.height) - 1);
            for row in rows {
                let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
                    continue;
                };
                let tile = TileCoord::new(column, row);
                if tile.distance(source.tile) > range {
                    continue;
                }
                if !terrain.line_of_sight(source.tile, tile) {
                    continue;
                }
                if let Some(index) = self.index(tile) {
                    values[index] += dps;
                }
            }
        }
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.column() >= self.width || tile.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(tile.column()).ok()?;
        let row = usize::try_from(tile.row()).ok()?;
        Some(row * width + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bow(range: f64) -> Weapon {
        Weapon {
            kind: WeaponKind::Physical,
            use_time: 1.0,
            reload_time: 1.0,
            range,
            damage: 6.0,
        }
    }

    #[test]
    fn physical_threat_is_damage_over_cycle() {
        let config = BattleConfig::default();
        assert!((threat_dps(&bow(2.0), &config) - 3.0).abs() < 1e-12);

        let chain = Weapon {
            kind: WeaponKind::Chain,
            ..bow(2.0)
        };
        assert!((threat_dps(&chain, &config) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn opposition_dirtying_spares_the_named_team() {
        let config = BattleConfig::default();
        let terrain = Terrain::open(2, 2);
        let mut field = ThreatField::new(2, 2, 3);
        field.rebuild(&terrain, &[], &config);

        let source = ThreatSource {
            team: TeamId::new(0),
            tile: TileCoord::new(0, 0),
            weapon: bow(2.0),
        };
        field.mark_opposition_dirty(TeamId::new(1));
        field.rebuild(&terrain, &[source], &config);

        let corner = TileCoord::new(1, 1);
        assert_eq!(field.threat(corner, TeamId::new(0)), 0.0);
        assert_eq!(field.threat(corner, TeamId::new(1)), 0.0, "clean layer was rebuilt");
        assert!((field.threat(corner, TeamId::new(2)) - 3.0).abs() < 1e-12);

        field.rebuild(&terrain, &[], &config);
        assert!((field.threat(corner, TeamId::new(2)) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn enormous_range_covers_the_grid_without_overflowing() {
        let terrain = Terrain::open(5, 4);
        let mut field = ThreatField::new(terrain.width(), terrain.height(), 2);
        let source = ThreatSource {
            team: TeamId::new(1),
            tile: TileCoord::new(2, 2),
            weapon: bow(1e19),
        };
        field.rebuild(&terrain, &[source], &BattleConfig::default());

        for tile in [TileCoord::new(0, 0), TileCoord::new(4, 0), TileCoord::new(4, 3)] {
            assert!((field.threat(tile, TeamId::new(0)) - 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn threat_respects_range_and_sight() {
        let terrain = Terrain::from_rows(&[".......", "...#...", "......."]);
        let mut field = ThreatField::new(terrain.width(), terrain.height(), 2);
        let source = ThreatSource {
            team: TeamId::new(1),
            tile: TileCoord::new(1, 1),
            weapon: bow(3.0),
        };
        field.rebuild(&terrain, &[source], &BattleConfig::default());

        let attackers = TeamId::new(0);
        assert!((field.threat(TileCoord::new(2, 1), attackers) - 3.0).abs() < 1e-12);
        assert_eq!(field.threat(TileCoord::new(4, 1), attackers), 0.0);
        assert_eq!(field.threat(TileCoord::new(6, 1), attackers), 0.0);
        assert_eq!(field.threat(TileCoord::new(2, 1), TeamId::new(1)), 0.0);
        assert_eq!(field.threat(TileCoord::new(40, 1), attackers), 0.0);
    }
}
