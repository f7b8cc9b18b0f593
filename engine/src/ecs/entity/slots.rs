//! The entity slot table.
//!
//! Maps entity handles to block pointers and detects stale handles. Freed
//! slots go into a dead pool for reuse with a bumped generation, which keeps
//! the index space compact and makes old handles to the slot observably
//! invalid.

use std::ptr::NonNull;

use crate::ecs::entity::{Entity, EntityData, Generation};

struct Slot {
    generation: Generation,
    /// The live entity in this slot, or None while the slot is in the dead pool.
    block: Option<NonNull<EntityData>>,
}

/// Handle allocation and validation for one controller.
#[derive(Default)]
pub(crate) struct SlotTable {
    slots: Vec<Slot>,
    dead: Vec<u32>,
}

impl SlotTable {
    /// Claim a slot for a new entity block and return its handle.
    pub(crate) fn insert(&mut self, block: NonNull<EntityData>) -> Entity {
        match self.dead.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.block.is_none());
                slot.block = Some(block);
                Entity::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: Generation::FIRST,
                    block: Some(block),
                });
                Entity::new(index, Generation::FIRST)
            }
        }
    }

    /// Resolve a handle to its block, if the entity is still alive.
    pub(crate) fn get(&self, entity: Entity) -> Option<NonNull<EntityData>> {
        let slot = self.slots.get(entity.index())?;
        if slot.generation != entity.generation() {
            return None;
        }
        slot.block
    }

    /// Release a handle's slot, returning the block it pointed at.
    ///
    /// The generation is bumped before the slot enters the dead pool, so any
    /// remaining copies of the handle turn stale.
    pub(crate) fn remove(&mut self, entity: Entity) -> Option<NonNull<EntityData>> {
        let slot = self.slots.get_mut(entity.index())?;
        if slot.generation != entity.generation() {
            return None;
        }
        let block = slot.block.take()?;
        slot.generation = slot.generation.next();
        self.dead.push(entity.index() as u32);
        Some(block)
    }
}
