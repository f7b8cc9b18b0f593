use crate::{
    all_tuples,
    ecs::component::{Component, Id, Registry},
};

/// A specification for a set of component types: a sorted, de-duplicated
/// vector of component ids. Usable as a hash key identifying a unique
/// component combination, and for membership queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    ids: Vec<Id>,
}

impl Spec {
    /// An empty component specification.
    pub const EMPTY: Self = Spec { ids: Vec::new() };

    /// Construct a new Spec from the given component ids.
    #[inline]
    pub fn new(ids: impl Into<Vec<Id>>) -> Self {
        let mut ids = ids.into();
        ids.sort();
        ids.dedup();
        ids.shrink_to_fit();

        Self { ids }
    }

    /// Get the component ids in this specification.
    #[inline]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Determine if this specification contains the given component id.
    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        // Binary search since the ids are sorted.
        self.ids.binary_search(&id).is_ok()
    }

    /// Determine if this specification contains all ids of the other specification.
    #[inline]
    pub fn contains_all(&self, other: &Spec) -> bool {
        other.ids.iter().all(|id| self.contains(*id))
    }
}

impl From<Vec<Id>> for Spec {
    #[inline]
    fn from(value: Vec<Id>) -> Self {
        Spec::new(value)
    }
}

/// Trait for converting a type-level list of components into component ids.
///
/// Implemented for single component types and for (arbitrarily nested) tuples
/// of them. The `TypeId` of the implementing type doubles as the template
/// cache key for the combination.
pub trait IntoSpec: 'static {
    /// The declared component ids, in declaration order. May contain duplicates.
    fn component_ids(registry: &Registry) -> Vec<Id>;

    /// Convert into a sorted, de-duplicated specification.
    fn into_spec(registry: &Registry) -> Spec {
        Spec::new(Self::component_ids(registry))
    }
}

/// [`IntoSpec`] implementation for the empty tuple.
impl IntoSpec for () {
    fn component_ids(_registry: &Registry) -> Vec<Id> {
        Vec::new()
    }
}

/// [`IntoSpec`] implementation for single component types.
impl<C: Component> IntoSpec for C {
    fn component_ids(registry: &Registry) -> Vec<Id> {
        vec![registry.register::<C>()]
    }
}

/// [`IntoSpec`] implementation for tuples of other [`IntoSpec`] types.
macro_rules! tuple_spec {
    ($($name: ident),*) => {
        impl<$($name: IntoSpec),*> IntoSpec for ($($name,)*) {
            fn component_ids(registry: &Registry) -> Vec<Id> {
                let mut ids = Vec::new();
                $(
                    ids.extend(<$name>::component_ids(registry));
                )*
                ids
            }
        }
    }
}

// Implement the tuple -> Spec conversion for all supported tuple arities.
all_tuples!(tuple_spec);

#[cfg(test)]
mod tests {
    use std::hash::{DefaultHasher, Hash, Hasher};

    use ember_macros::Component;

    use super::*;

    // Given
    #[derive(Component, Default)]
    pub struct Comp1;
    #[derive(Component, Default)]
    pub struct Comp2;
    #[derive(Component, Default)]
    pub struct Comp3;
    #[derive(Component, Default)]
    pub struct Comp4;

    #[test]
    fn component_id_order() {
        // Given
        let registry = Registry::new();

        let id1 = registry.register::<Comp1>();
        let id2 = registry.register::<Comp2>();
        let id3 = registry.register::<Comp3>();

        // When
        let spec1 = Spec::new(vec![id2, id1, id3]);
        let spec2 = Spec::new(vec![id1, id2, id3]);

        // Then
        assert_eq!(spec1, spec2);
        let mut hasher1 = DefaultHasher::new();
        spec1.hash(&mut hasher1);
        let mut hasher2 = DefaultHasher::new();
        spec2.hash(&mut hasher2);
        assert_eq!(hasher1.finish(), hasher2.finish());
    }

    #[test]
    fn component_id_dedupe() {
        // Given
        let registry = Registry::new();
        let id1 = registry.register::<Comp1>();
        let id2 = registry.register::<Comp2>();
        let id3 = registry.register::<Comp3>();

        // When
        let spec = Spec::new(vec![id2, id1, id3, id2, id1]);

        // Then
        assert_eq!(spec.ids(), &[id1, id2, id3]);
    }

    #[test]
    fn declared_order_is_preserved() {
        // Given
        let registry = Registry::new();

        // When - Tuples keep declaration order, including nesting.
        let ids = <(Comp2, (Comp1, Comp3)) as IntoSpec>::component_ids(&registry);

        // Then
        assert_eq!(
            ids,
            vec![
                registry.get::<Comp2>().unwrap(),
                registry.get::<Comp1>().unwrap(),
                registry.get::<Comp3>().unwrap(),
            ]
        );
    }

    #[test]
    fn contains() {
        // Given
        let registry = Registry::new();
        let id1 = registry.register::<Comp1>();
        let id2 = registry.register::<Comp2>();
        let id3 = registry.register::<Comp3>();

        let spec = Spec::new(vec![id2, id1]);

        // Then
        assert!(spec.contains(id1));
        assert!(spec.contains(id2));
        assert!(!spec.contains(id3));
    }

    #[test]
    fn contains_all() {
        // Given
        let registry = Registry::new();
        let id1 = registry.register::<Comp1>();
        let id2 = registry.register::<Comp2>();
        let id3 = registry.register::<Comp3>();
        let id4 = registry.register::<Comp4>();

        let spec1 = Spec::new(vec![id1, id2, id3]);
        let spec2 = Spec::new(vec![id1, id2]);
        let spec3 = Spec::new(vec![id1, id4]);

        // Then
        assert!(spec1.contains_all(&spec2));
        assert!(spec1.contains_all(&spec1));
        assert!(!spec1.contains_all(&spec3));
    }
}
