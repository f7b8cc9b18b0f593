//! The entity storage block.
//!
//! One contiguous allocation holds the [`EntityData`] header, the component
//! values, and the per-list nodes, at offsets computed by the entity's
//! [`Shape`](super::Shape). All access goes through the block pointer handed
//! out at allocation time; the header is only ever a view at offset zero.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::ecs::component::{Component, registry};
use crate::ecs::entity::{Entity, Shape};
use crate::ecs::list::ListNode;
use crate::ecs::{Error, Result};

/// The fixed header at the start of every entity block.
#[repr(C)]
pub(crate) struct EntityData {
    /// The shape shared by all entities of this component combination.
    shape: Arc<Shape>,

    /// This entity's own handle, assigned right after slot allocation.
    entity: Entity,

    /// The number of nodes following the components in this block, equal to
    /// the number of lists this entity is part of.
    node_count: u32,
}

impl EntityData {
    /// Write a header into a freshly allocated block.
    ///
    /// # Safety
    /// `block` must be a live allocation of at least
    /// `shape.block_layout(node_count)` bytes, properly aligned.
    pub(crate) unsafe fn write_header(
        block: NonNull<EntityData>,
        shape: Arc<Shape>,
        node_count: u32,
    ) {
        unsafe {
            block.write(EntityData {
                shape,
                entity: Entity::PLACEHOLDER,
                node_count,
            });
        }
    }

    /// Assign the entity's slot handle.
    ///
    /// # Safety
    /// `block` must point at a live entity block.
    pub(crate) unsafe fn set_handle(block: NonNull<EntityData>, entity: Entity) {
        unsafe {
            (*block.as_ptr()).entity = entity;
        }
    }

    /// # Safety
    /// `block` must point at a live entity block.
    #[inline]
    pub(crate) unsafe fn handle(block: NonNull<EntityData>) -> Entity {
        unsafe { (*block.as_ptr()).entity }
    }

    /// # Safety
    /// `block` must point at a live entity block.
    #[inline]
    pub(crate) unsafe fn shape(block: NonNull<EntityData>) -> Arc<Shape> {
        unsafe { Arc::clone(&(*block.as_ptr()).shape) }
    }

    /// # Safety
    /// `block` must point at a live entity block.
    #[inline]
    pub(crate) unsafe fn has<C: Component>(block: NonNull<EntityData>) -> bool {
        registry()
            .get::<C>()
            .is_some_and(|id| unsafe { (*block.as_ptr()).shape.contains(id) })
    }

    /// A typed pointer to the component `C` in the block. Fails with
    /// [`Error::ComponentNotFound`] if the entity's shape lacks it.
    ///
    /// # Safety
    /// `block` must point at a live entity block; the caller is responsible
    /// for honoring Rust aliasing when turning the pointer into a reference.
    pub(crate) unsafe fn component<C: Component>(
        block: NonNull<EntityData>,
    ) -> Result<NonNull<C>> {
        let offset = registry()
            .get::<C>()
            .and_then(|id| unsafe { (*block.as_ptr()).shape.offset_of(id) })
            .ok_or(Error::ComponentNotFound(C::NAME))?;
        // Safety: the offset was computed by the shape for this very block.
        unsafe { Ok(block.cast::<u8>().add(offset).cast::<C>()) }
    }

    /// The storage of node `index`.
    ///
    /// # Safety
    /// `block` must point at a live entity block and `index` must be below the
    /// block's node count.
    #[inline]
    pub(crate) unsafe fn node_ptr(block: NonNull<EntityData>, index: usize) -> NonNull<ListNode> {
        unsafe {
            debug_assert!(index < (*block.as_ptr()).node_count as usize);
            let offset = (*block.as_ptr()).shape.node_offset(index);
            block.cast::<u8>().add(offset).cast::<ListNode>()
        }
    }

    /// Tear the entity down: unlink every node, drop the components (in
    /// reverse construction order), drop the header. Returns the block layout
    /// so the caller can release the storage.
    ///
    /// # Safety
    /// `block` must point at a live, fully constructed entity block. The block
    /// must not be used afterwards except to deallocate it.
    pub(crate) unsafe fn destroy(block: NonNull<EntityData>) -> Layout {
        unsafe {
            let node_count = (*block.as_ptr()).node_count as usize;
            let layout = (*block.as_ptr()).shape.block_layout(node_count);

            for index in 0..node_count {
                ListNode::unlink(Self::node_ptr(block, index));
            }

            {
                let shape = &(*block.as_ptr()).shape;
                for (info, offset) in shape.components().rev() {
                    info.drop_value(block.cast::<u8>().add(offset));
                }
            }

            // Drops the shape Arc; the handle and counters are plain values.
            std::ptr::drop_in_place(block.as_ptr());

            layout
        }
    }
}
