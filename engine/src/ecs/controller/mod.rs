//! The entity controller.
//!
//! A controller owns a fixed, ordered set of entity lists and, transitively
//! through them, every entity it creates. It is configured exactly once from
//! a [`ControllerConfig`], which fixes the list predicates and the default
//! components added to every entity.
//!
//! # Ownership
//!
//! The controller never stores entities by pointer outside the lists and the
//! slot table. Every entity belongs to at least one list (creation refuses
//! anything else), so walking the lists in handle order visits every entity -
//! that is how [`Controller::destroy_all_entities`] and the destructor
//! guarantee no leaks and no double destruction.

mod template;

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;

use log::debug;

use crate::ecs::component::{Component, Id, IntoSpec, Set, Target, registry};
use crate::ecs::entity::{Entity, EntityData, Ref, RefMut, Shape, SlotTable};
use crate::ecs::list::{IterMut, List, ListHandle, ListNode};
use crate::ecs::{Error, Result};

pub use template::{Template, TemplateCache, register_named_entity};

/// The allocator used for entity storage blocks.
///
/// Allocation may fail; deallocation must not. The returned storage must
/// satisfy the requested layout (which never asks for more than
/// [`MAX_COMPONENT_ALIGN`](crate::ecs::component::MAX_COMPONENT_ALIGN)
/// alignment).
pub trait Allocator {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>>;

    /// # Safety
    /// `ptr` must come from `allocate` on this same allocator with the same
    /// `layout`, and must not be used afterwards. Null is a no-op.
    unsafe fn deallocate(&mut self, ptr: *mut u8, layout: Layout);
}

/// The default allocator: the global Rust allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl Allocator for DefaultAllocator {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>> {
        // Safety: entity block layouts always have non-zero size (the header
        // alone is bigger than zero).
        debug_assert!(layout.size() > 0);
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(Error::AllocationFailed)
    }

    unsafe fn deallocate(&mut self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() {
            unsafe { std::alloc::dealloc(ptr, layout) };
        }
    }
}

/// The component-membership oracle handed to list predicates.
///
/// Answers "does the entity type under consideration contain this component"
/// in O(1) from the shape's bitset.
pub struct Membership<'a> {
    shape: &'a Shape,
}

impl Membership<'_> {
    /// Whether the component type is part of the entity's full component set.
    #[inline]
    pub fn has<C: Component>(&self) -> bool {
        registry().get::<C>().is_some_and(|id| self.shape.contains(id))
    }

    /// Id-based form of [`Membership::has`].
    #[inline]
    pub fn has_id(&self, id: Id) -> bool {
        self.shape.contains(id)
    }
}

/// A list predicate: a pure function of the membership oracle.
///
/// The result must depend only on the oracle - it is evaluated once per
/// component combination and cached in templates.
pub type Predicate = Arc<dyn Fn(&Membership<'_>) -> bool>;

/// The standard predicate: true if the entity has all of the components in
/// `S`. Use a closure for more complex conditions.
pub fn has_components<S: IntoSpec>() -> Predicate {
    let spec = S::into_spec(registry());
    Arc::new(move |membership| spec.ids().iter().all(|&id| membership.has_id(id)))
}

struct ListEntry {
    list: Box<List>,
    predicate: Predicate,
}

/// The entity controller. Owns several entity lists, and the entities
/// included in them.
///
/// Default-constructible, but must be configured with a [`ControllerConfig`]
/// before use.
pub struct Controller<A: Allocator = DefaultAllocator> {
    allocator: A,
    lists: Vec<ListEntry>,
    defaults: Vec<Id>,
    slots: SlotTable,
    entity_count: usize,
}

impl Default for Controller<DefaultAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller<DefaultAllocator> {
    /// Create an unconfigured controller with the default allocator.
    pub fn new() -> Self {
        Self::with_allocator(DefaultAllocator)
    }
}

impl<A: Allocator> Controller<A> {
    /// Create an unconfigured controller with a custom allocator.
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            lists: Vec::new(),
            defaults: Vec::new(),
            slots: SlotTable::default(),
            entity_count: 0,
        }
    }

    /// Whether the controller has been configured.
    #[inline]
    pub fn is_configured(&self) -> bool {
        !self.lists.is_empty()
    }

    /// The current entity count.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// The allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// The allocator, mutably.
    #[inline]
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    pub(crate) fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.lists.iter().map(|entry| &entry.predicate)
    }

    pub(crate) fn default_ids(&self) -> &[Id] {
        &self.defaults
    }

    fn check_handle(&self, handle: ListHandle) -> Result<usize> {
        if handle.is_null() {
            return Err(Error::NullHandle);
        }
        if handle.index() >= self.lists.len() {
            return Err(Error::InvalidHandle);
        }
        Ok(handle.index())
    }

    /// The entity list with the specified handle.
    pub fn list(&self, handle: ListHandle) -> Result<&List> {
        let index = self.check_handle(handle)?;
        Ok(&self.lists[index].list)
    }

    /// Same as [`Controller::list`], but fails if the list has more than one entity.
    pub fn get_at_most_one(&self, handle: ListHandle) -> Result<&List> {
        let list = self.list(handle)?;
        if list.iter().nth(1).is_some() {
            return Err(Error::ExpectedAtMostOne);
        }
        Ok(list)
    }

    /// Same as [`Controller::list`], but fails if the list is empty.
    pub fn get_at_least_one(&self, handle: ListHandle) -> Result<&List> {
        let list = self.list(handle)?;
        if list.is_empty() {
            return Err(Error::ExpectedAtLeastOne);
        }
        Ok(list)
    }

    /// If the list contains a single entity, return it, otherwise fail.
    pub fn get_one(&self, handle: ListHandle) -> Result<Ref<'_>> {
        let list = self.list(handle)?;
        let mut iter = list.iter();
        let entity = iter.next().ok_or(Error::ExpectedOneGotNone)?;
        if iter.next().is_some() {
            return Err(Error::ExpectedOneGotMore);
        }
        Ok(entity)
    }

    /// Iterate a list with mutable access to the entities.
    pub fn iter_mut(&mut self, handle: ListHandle) -> Result<IterMut<'_>> {
        let index = self.check_handle(handle)?;
        Ok(self.lists[index].list.iter_mut())
    }

    /// Shared access to a live entity.
    pub fn entity(&self, entity: Entity) -> Result<Ref<'_>> {
        let block = self.slots.get(entity).ok_or(Error::EntityNotAlive)?;
        // Safety: the slot table only hands out live blocks, and the returned
        // borrow is tied to `&self`.
        Ok(unsafe { Ref::from_ptr(block) })
    }

    /// Exclusive access to a live entity.
    pub fn entity_mut(&mut self, entity: Entity) -> Result<RefMut<'_>> {
        let block = self.slots.get(entity).ok_or(Error::EntityNotAlive)?;
        // Safety: as above, with uniqueness from `&mut self`.
        Ok(unsafe { RefMut::from_ptr(block) })
    }

    /// Create an entity from a template.
    ///
    /// `overrides` is a component value, or a (nested) tuple of component
    /// values, for a subset of the entity's full component set. The matching
    /// components are initialized from the overrides; every other component is
    /// value-initialized via `Default`. The entity is spliced at the tail of
    /// each list its template matched, in template order.
    pub fn create(&mut self, template: &Template, overrides: impl Set) -> Result<Entity> {
        // An entity outside every list could never be cleaned up by the
        // list-walking destructor.
        let handles = template.handles();
        if handles.is_empty() {
            return Err(Error::TemplateMatchesNoLists);
        }
        for &handle in handles {
            self.check_handle(handle)?;
        }

        let shape_arc = template.shape_arc();
        let shape: &Shape = shape_arc;
        let node_count = handles.len();
        let layout = shape.block_layout(node_count);
        let raw = self.allocator.allocate(layout)?;
        let block = raw.cast::<EntityData>();

        {
            // Until the guard is disarmed, any failure tears down whatever
            // has been constructed and returns the storage.
            let mut guard = CreateGuard {
                allocator: &mut self.allocator,
                raw,
                layout,
                shape,
                constructed: 0,
                armed: true,
            };

            // Safety: the block was just allocated with the shape's layout.
            unsafe {
                EntityData::write_header(block, Arc::clone(shape_arc), node_count as u32);
            }

            for (index, (info, offset)) in shape.components().enumerate() {
                // Safety: the offset is within the block and properly aligned.
                unsafe {
                    info.write_default(raw.add(offset));
                }
                guard.constructed = index + 1;
            }

            let mut target = OverrideTarget {
                raw,
                shape,
                seen: Vec::new(),
            };
            overrides.apply(registry(), &mut target)?;

            guard.armed = false;
        }

        // Nothing can fail from here on. Splice one node per matching list,
        // tail insertion, in template order.
        for (index, &handle) in handles.iter().enumerate() {
            let head = self.lists[handle.index()].list.head_ptr();
            // Safety: node `index` is unconstructed storage inside the block.
            unsafe {
                ListNode::link_before(EntityData::node_ptr(block, index), head, block);
            }
        }

        let entity = self.slots.insert(block);
        // Safety: the block is live; only the handle field is touched.
        unsafe {
            EntityData::set_handle(block, entity);
        }
        self.entity_count += 1;

        Ok(entity)
    }

    /// Destroy a single entity.
    ///
    /// The entity is unlinked from every list it belongs to; iterators
    /// pointing at it are invalidated.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        let block = self.slots.remove(entity).ok_or(Error::EntityNotAlive)?;
        // Safety: the slot table only holds live blocks, and the handle was
        // just invalidated so nothing can reach the block anymore.
        unsafe {
            let layout = EntityData::destroy(block);
            self.allocator.deallocate(block.cast::<u8>().as_ptr(), layout);
        }
        self.entity_count -= 1;
        Ok(())
    }

    /// Destroy all entities in the specified list.
    pub fn destroy_listed(&mut self, handle: ListHandle) -> Result<()> {
        let index = self.check_handle(handle)?;
        self.destroy_listed_at(index);
        Ok(())
    }

    /// Destroy all entities owned by this controller.
    pub fn destroy_all_entities(&mut self) {
        // Each entity belongs to at least one list, so walking every list and
        // destroying on sight covers everything; destruction unlinks the
        // entity from the later lists it is also part of, so nothing is
        // visited twice.
        for index in 0..self.lists.len() {
            self.destroy_listed_at(index);
        }
        debug_assert_eq!(self.entity_count, 0);
    }

    fn destroy_listed_at(&mut self, index: usize) {
        let head = self.lists[index].list.head_ptr().as_ptr();
        // Safety: the walk advances before destroying, since destruction
        // invalidates the current node.
        unsafe {
            let mut node = (*head).next();
            while !std::ptr::eq(node, head) {
                let next = (*node).next();
                let entity_ptr = (*node).entity();
                debug_assert!(!entity_ptr.is_null());
                let entity = EntityData::handle(NonNull::new_unchecked(entity_ptr));
                node = next;
                // The handle came from a live node, so this cannot fail.
                let _ = self.destroy(entity);
            }
        }
    }
}

impl<A: Allocator> Drop for Controller<A> {
    /// Destroys all entities owned by this controller.
    fn drop(&mut self) {
        self.destroy_all_entities();
    }
}

struct CreateGuard<'a, A: Allocator> {
    allocator: &'a mut A,
    raw: NonNull<u8>,
    layout: Layout,
    shape: &'a Shape,
    /// Number of components already default-constructed.
    constructed: usize,
    armed: bool,
}

impl<A: Allocator> Drop for CreateGuard<'_, A> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Safety: exactly `constructed` components and the header were
        // written; tear them down in reverse and release the block.
        unsafe {
            for (info, offset) in self.shape.components().take(self.constructed).rev() {
                info.drop_value(self.raw.add(offset));
            }
            std::ptr::drop_in_place(self.raw.cast::<EntityData>().as_ptr());
            self.allocator.deallocate(self.raw.as_ptr(), self.layout);
        }
    }
}

/// Applies override values into a freshly default-initialized block.
struct OverrideTarget<'a> {
    raw: NonNull<u8>,
    shape: &'a Shape,
    seen: Vec<Id>,
}

impl Target for OverrideTarget<'_> {
    fn apply<C: Component>(&mut self, id: Id, value: C) -> Result<()> {
        if self.seen.contains(&id) {
            return Err(Error::DuplicateOverride(C::NAME));
        }
        let offset = self
            .shape
            .offset_of(id)
            .ok_or(Error::OverrideForAbsentComponent(C::NAME))?;
        // Safety: the offset addresses a live default-initialized `C`;
        // assignment drops that default.
        unsafe {
            *self.raw.add(offset).cast::<C>().as_mut() = value;
        }
        self.seen.push(id);
        Ok(())
    }
}

/// A configurator for [`Controller`]s.
///
/// Lists are registered first; the returned handles work with any controller
/// configured from this config. The first successful `configure` freezes the
/// config: it can still configure more controllers, but not change.
#[derive(Default)]
pub struct ControllerConfig {
    predicates: Vec<Predicate>,
    defaults: Vec<Id>,
    finalized: bool,
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_not_finalized(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::ConfigFrozen);
        }
        Ok(())
    }

    /// Register a list for the specified predicate and get its handle.
    pub fn add_list(&mut self, predicate: Predicate) -> Result<ListHandle> {
        self.check_not_finalized()?;
        let handle = ListHandle::from_index(self.predicates.len());
        self.predicates.push(predicate);
        Ok(handle)
    }

    /// Add a default component, included in every entity of every controller
    /// configured from this config.
    pub fn add_default<C: Component>(&mut self) -> Result<()> {
        self.check_not_finalized()?;
        let id = registry().register::<C>();
        if !self.defaults.contains(&id) {
            self.defaults.push(id);
        }
        Ok(())
    }

    /// Configure a controller using the stored data.
    ///
    /// Fails if the controller is already configured or if no lists were
    /// registered. After the first success the config is frozen.
    pub fn configure<A: Allocator>(&mut self, controller: &mut Controller<A>) -> Result<()> {
        if controller.is_configured() {
            return Err(Error::AlreadyConfigured);
        }
        if self.predicates.is_empty() {
            return Err(Error::NoLists);
        }

        controller.lists = self
            .predicates
            .iter()
            .map(|predicate| ListEntry {
                list: List::new_boxed(),
                // The predicate is shared, not moved: the config can
                // configure several separate controllers.
                predicate: Arc::clone(predicate),
            })
            .collect();
        controller.defaults = self.defaults.clone();

        self.finalized = true;
        debug!(
            "configured entity controller with {} lists",
            controller.lists.len()
        );
        Ok(())
    }
}
