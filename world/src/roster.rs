//! Id-ordered arena of live entities.

use skirmish_core::EntityId;

use crate::entity::BattleEntity;

#[derive(Debug)]
struct RosterEntry {
    id: EntityId,
    entity: Option<BattleEntity>,
}

/// Live entities sorted by id, which is also their insertion order.
///
/// An entity being updated is checked out of its slot so the rest of the
/// roster stays readable; lookups skip the empty slot until it is checked back
/// in.
#[derive(Debug, Default)]
pub(crate) struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub(crate) fn insert(&mut self, entity: BattleEntity) {
        let id = entity.id();
        debug_assert!(
            self.entries.last().map_or(true, |last| last.id < id),
            "entity ids must be allocated in increasing order"
        );
        self.entries.push(RosterEntry {
            id,
            entity: Some(entity),
        });
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&BattleEntity> {
        let position = self.position(id)?;
        self.entries[position].entity.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut BattleEntity> {
        let position = self.position(id)?;
        self.entries[position].entity.as_mut()
    }

    pub(crate) fn checkout(&mut self, id: EntityId) -> Option<BattleEntity> {
        let position = self.position(id)?;
        self.entries[position].entity.take()
    }

    pub(crate) fn checkin(&mut self, entity: BattleEntity) {
        match self.position(entity.id()) {
            Some(position) => self.entries[position].entity = Some(entity),
            None => self.insert(entity),
        }
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<BattleEntity> {
        let position = self.position(id)?;
        self.entries.remove(position).entity
    }

    pub(crate) fn ids(&self) -> Vec<EntityId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BattleEntity> {
        self.entries.iter().filter_map(|entry| entry.entity.as_ref())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut BattleEntity> {
        self.entries
            .iter_mut()
            .filter_map(|entry| entry.entity.as_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.entries
            .binary_search_by_key(&id, |entry| entry.id)
            .ok()
    }
}
