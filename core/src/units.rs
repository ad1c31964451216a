//! Unit archetypes and the catalog they are looked up from.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

/// Decision policy an entity follows while idle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Never acts on its own. Walls, turrets that only shoot when asked.
    #[default]
    None,
    /// Heads for the goal and only fights what blocks its next step.
    Rusher,
    /// Fights anything in range first and walks otherwise.
    Marcher,
    /// Hunts nearby hostiles before heading for the goal.
    Berserker,
}

/// Resolution rule applied when a weapon use completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Single-target hit on the recorded tile.
    Physical,
    /// Line of short-lived fire through the densest visible enemy group.
    LineHazard,
    /// Bolt that hops between nearby enemies with decaying damage.
    Chain,
}

impl WeaponKind {
    /// Reports whether the weapon damages more than one target per use.
    #[must_use]
    pub const fn is_area(self) -> bool {
        matches!(self, WeaponKind::LineHazard | WeaponKind::Chain)
    }
}

/// Timing and damage profile of a weapon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// How the weapon resolves.
    pub kind: WeaponKind,
    /// Seconds between starting and resolving an attack.
    pub use_time: f64,
    /// Seconds the weapon needs after an attack before it is ready again.
    pub reload_time: f64,
    /// Maximum euclidean reach in tiles.
    pub range: f64,
    /// Damage dealt per hit, or per second for fire hazards.
    pub damage: f64,
}

impl Weapon {
    /// Seconds between consecutive attack starts when firing continuously.
    #[must_use]
    pub fn cycle_time(&self) -> f64 {
        self.use_time + self.reload_time
    }

    /// Sustained single-target damage per second.
    #[must_use]
    pub fn sustained_dps(&self) -> f64 {
        let cycle = self.cycle_time();
        if cycle > 0.0 {
            self.damage / cycle
        } else {
            self.damage
        }
    }
}

/// Immutable archetype shared by every entity of a unit type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitCharacteristics {
    /// Unique catalog name.
    pub name: String,
    /// Movement speed in tiles per second; zero means immobile.
    #[serde(default)]
    pub speed: f64,
    /// Starting hit points.
    pub hit_points: f64,
    /// Idle decision policy.
    #[serde(default)]
    pub behavior: Behavior,
    /// Weapon carried by the unit, if any.
    #[serde(default)]
    pub weapon: Option<Weapon>,
    /// Resource cost of fielding the unit.
    #[serde(default)]
    pub cost: u32,
    /// Reluctance to queue behind moving friendlies.
    #[serde(default)]
    pub crowd_aversion_bias: f64,
    /// Reluctance to walk through threatened tiles.
    #[serde(default)]
    pub hurt_aversion_bias: f64,
}

impl UnitCharacteristics {
    /// Reports whether the unit can move at all.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.speed > 0.0
    }
}

/// Name-keyed lookup of unit archetypes.
///
/// Serialized as a plain list of characteristics; later duplicates replace
/// earlier entries on load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "Vec<UnitCharacteristics>",
    into = "Vec<UnitCharacteristics>"
)]
pub struct UnitCatalog {
    units: BTreeMap<String, Arc<UnitCharacteristics>>,
}

impl UnitCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit archetype, replacing any previous entry with that name.
    pub fn insert(&mut self, unit: UnitCharacteristics) {
        let _ = self.units.insert(unit.name.clone(), Arc::new(unit));
    }

    /// Builder-style variant of [`UnitCatalog::insert`].
    #[must_use]
    pub fn with(mut self, unit: UnitCharacteristics) -> Self {
        self.insert(unit);
        self
    }

    /// Looks up an archetype by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<UnitCharacteristics>> {
        self.units.get(name)
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Reports whether no archetypes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterates over the archetypes in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<UnitCharacteristics>> {
        self.units.values()
    }
}

impl From<Vec<UnitCharacteristics>> for UnitCatalog {
    fn from(units: Vec<UnitCharacteristics>) -> Self {
        units.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<UnitCatalog> for Vec<UnitCharacteristics> {
    fn from(catalog: UnitCatalog) -> Self {
        catalog
            .units
            .into_values()
            .map(|unit| (*unit).clone())
            .collect()
    }
}
