use std::{
    alloc::Layout,
    any::TypeId,
    ptr::NonNull,
    sync::{
        Arc, OnceLock, RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use dashmap::DashMap;

use crate::ecs::component::{Component, Id, IntoSpec, Spec};

/// The process-wide component registry.
///
/// Ids are global so that templates and shapes can be shared between
/// controllers with the same configuration.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::new)
}

/// Metadata about a registered component type.
///
/// Contains what the type-erased entity storage needs: memory layout, drop and
/// default-construct functions, plus the registration details.
#[derive(Debug)]
pub struct Info {
    /// The unique component id.
    id: Id,

    /// The component's declared name.
    name: &'static str,

    /// The Rust TypeId, for runtime type checks.
    type_id: TypeId,

    /// The memory layout of the component value.
    layout: Layout,

    /// The drop function for the type (may be a no-op).
    drop_fn: unsafe fn(NonNull<u8>),

    /// Writes a default-constructed value into uninitialized storage.
    default_fn: unsafe fn(NonNull<u8>),
}

impl Info {
    fn new<C: Component>(id: Id) -> Self {
        let drop_fn = if std::mem::needs_drop::<C>() {
            Self::drop_impl::<C>
        } else {
            Self::drop_noop
        };
        Self {
            id,
            name: C::NAME,
            type_id: TypeId::of::<C>(),
            layout: Layout::new::<C>(),
            drop_fn,
            default_fn: Self::default_impl::<C>,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Drop the component value at `ptr`.
    ///
    /// # Safety
    /// `ptr` must point at a live, properly aligned value of this component type.
    #[inline]
    pub unsafe fn drop_value(&self, ptr: NonNull<u8>) {
        unsafe { (self.drop_fn)(ptr) }
    }

    /// Write a default-constructed value into the uninitialized storage at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be properly aligned for this component type and provide
    /// `layout().size()` bytes of writable storage.
    #[inline]
    pub unsafe fn write_default(&self, ptr: NonNull<u8>) {
        unsafe { (self.default_fn)(ptr) }
    }

    unsafe fn drop_impl<T>(ptr: NonNull<u8>) {
        unsafe { std::ptr::drop_in_place(ptr.cast::<T>().as_ptr()) }
    }

    unsafe fn drop_noop(_ptr: NonNull<u8>) {}

    unsafe fn default_impl<T: Default>(ptr: NonNull<u8>) {
        unsafe { ptr.cast::<T>().as_ptr().write(T::default()) }
    }
}

/// The resolved relation tables of a component type.
#[derive(Debug, Default, Clone)]
pub struct Relations {
    pub requires: Vec<Id>,
    pub implies: Vec<Id>,
    pub conflicts: Vec<Id>,
}

/// Relation resolution happens after the component's own entry exists, so a
/// component can (transitively) relate back to itself without recursing
/// forever. The slot tracks that window.
#[derive(Debug)]
enum RelationSlot {
    Unresolved,
    InProgress,
    Done(Arc<Relations>),
}

/// A thread-safe component registry. Assigns ids and keeps per-type metadata
/// and relation tables.
///
/// Reads of the TypeId -> Id map are lock-free via `DashMap`; registration
/// takes a single shard plus a short write lock on the info vector.
pub struct Registry {
    /// Map from TypeId to component Id. Lock-free reads via sharded concurrent hashmap.
    type_map: DashMap<TypeId, Id>,

    /// List of registered component entries. Protected by RwLock for rare writes.
    components: RwLock<Vec<Option<Arc<Info>>>>,

    /// Relation tables, parallel to `components`.
    relations: RwLock<Vec<RelationSlot>>,

    /// Next available component identifier.
    next_id: AtomicU32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new component registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            components: RwLock::new(Vec::new()),
            relations: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type and get its unique identifier.
    ///
    /// Registration is idempotent: if the type is already registered, the
    /// existing id is returned. Registering a type also registers everything
    /// it relates to (requires/implies/conflicts), transitively.
    pub fn register<C: Component>(&self) -> Id {
        let type_id = TypeId::of::<C>();

        // Fast path: check if already registered (lock-free read)
        if let Some(id) = self.type_map.get(&type_id) {
            return *id;
        }

        // Slow path: use the entry API to avoid a race where two threads both
        // miss the cache.
        let id = *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let id_value = self.next_id.fetch_add(1, Ordering::Relaxed);
                let comp_id = Id::new(id_value);
                let index = id_value as usize;

                let mut components = self.components.write().unwrap();
                let mut relations = self.relations.write().unwrap();
                if index >= components.len() {
                    components.resize_with(index + 1, || None);
                    relations.resize_with(index + 1, || RelationSlot::Unresolved);
                }
                components[index] = Some(Arc::new(Info::new::<C>(comp_id)));

                comp_id
            })
            .value();

        // Resolve the relation tables outside the map lock. Nested `register`
        // calls for related components terminate because this entry already
        // exists, and re-entrant resolution of this same type is cut off by
        // the `InProgress` slot state.
        if self.begin_resolve(id) {
            let resolved = Relations {
                requires: C::requires(self),
                implies: C::implies(self),
                conflicts: C::conflicts(self),
            };
            self.finish_resolve(id, resolved);
        }

        id
    }

    /// Get the component id for type `C`, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        let type_id = TypeId::of::<C>();
        self.type_map.get(&type_id).map(|entry| *entry.value())
    }

    /// Get the component info for an id, if registered.
    #[inline]
    pub fn info(&self, id: Id) -> Option<Arc<Info>> {
        let components = self.components.read().unwrap();
        components.get(id.index()).and_then(|i| i.clone())
    }

    /// Get the component name for an id. Unregistered ids report as `<unknown>`.
    #[inline]
    pub fn name_of(&self, id: Id) -> &'static str {
        self.info(id).map_or("<unknown>", |info| info.name())
    }

    /// Get the resolved relation tables for an id.
    ///
    /// Ids whose resolution hasn't completed report empty tables; that can
    /// only be observed mid-registration.
    pub fn relations(&self, id: Id) -> Arc<Relations> {
        static EMPTY: OnceLock<Arc<Relations>> = OnceLock::new();
        let relations = self.relations.read().unwrap();
        match relations.get(id.index()) {
            Some(RelationSlot::Done(resolved)) => Arc::clone(resolved),
            _ => Arc::clone(EMPTY.get_or_init(|| Arc::new(Relations::default()))),
        }
    }

    /// Get a component specification for a generic type `S` which implements [`IntoSpec`].
    #[inline]
    pub fn spec<S: IntoSpec>(&self) -> Spec {
        S::into_spec(self)
    }

    fn begin_resolve(&self, id: Id) -> bool {
        let mut relations = self.relations.write().unwrap();
        match relations.get_mut(id.index()) {
            Some(slot @ RelationSlot::Unresolved) => {
                *slot = RelationSlot::InProgress;
                true
            }
            _ => false,
        }
    }

    fn finish_resolve(&self, id: Id, resolved: Relations) {
        let mut relations = self.relations.write().unwrap();
        relations[id.index()] = RelationSlot::Done(Arc::new(resolved));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_macros::Component;

    #[derive(Component, Default, Debug)]
    struct Position {
        _x: f32,
        _y: f32,
    }

    #[derive(Component, Default, Debug)]
    struct Velocity {
        _dx: f32,
        _dy: f32,
    }

    #[derive(Component, Default, Debug)]
    #[component(implies(Position))]
    struct Mover;

    #[derive(Component, Default, Debug)]
    #[component(implies(Pong))]
    struct Ping;

    #[derive(Component, Default, Debug)]
    #[component(implies(Ping))]
    struct Pong;

    #[test]
    fn component_registration() {
        // Given
        let registry = Registry::new();

        // When
        let pos_id = registry.register::<Position>();
        let vel_id = registry.register::<Velocity>();

        // Then
        assert_ne!(pos_id, vel_id);
        assert_eq!(registry.get::<Position>(), Some(pos_id));
        assert_eq!(registry.get::<Velocity>(), Some(vel_id));

        // Then - Registering the same type again should result in the same id
        assert_eq!(registry.register::<Position>(), pos_id);
    }

    #[test]
    fn component_info() {
        // Given
        let registry = Registry::new();
        let id = registry.register::<Position>();

        // When
        let info = registry.info(id).unwrap();

        // Then
        assert_eq!(info.id(), id);
        assert_eq!(info.name(), "Position");
        assert_eq!(info.layout(), std::alloc::Layout::new::<Position>());
        assert_eq!(registry.name_of(id), "Position");
    }

    #[test]
    fn unregistered_component_lookup() {
        // Given
        let registry = Registry::new();

        // Then
        assert!(registry.get::<Position>().is_none());
        assert_eq!(registry.name_of(Id::new(42)), "<unknown>");
    }

    #[test]
    fn relations_resolve_transitively() {
        // Given
        let registry = Registry::new();

        // When - Registering Mover also registers Position via the relation.
        let mover_id = registry.register::<Mover>();

        // Then
        let pos_id = registry.get::<Position>().expect("implied component registered");
        assert_eq!(registry.relations(mover_id).implies, vec![pos_id]);
        assert!(registry.relations(pos_id).implies.is_empty());
    }

    #[test]
    fn relation_cycles_terminate() {
        // Given
        let registry = Registry::new();

        // When - Ping implies Pong implies Ping.
        let ping_id = registry.register::<Ping>();
        let pong_id = registry.get::<Pong>().expect("implied component registered");

        // Then - Both ends resolved, both point at each other.
        assert_eq!(registry.relations(ping_id).implies, vec![pong_id]);
        assert_eq!(registry.relations(pong_id).implies, vec![ping_id]);
    }
}
