use crate::{
    all_tuples,
    ecs::{
        Result,
        component::{Component, Id, Registry},
    },
};

/// A target that component override values can be applied to.
///
/// The target decides what "apply" means and reports the override errors it
/// can detect (a value for a component the entity doesn't have, or two values
/// for the same component).
pub trait Target {
    fn apply<C: Component>(&mut self, id: Id, value: C) -> Result<()>;
}

/// A set of component values owned by the caller, applied to a [`Target`] one
/// value at a time in declaration order.
///
/// Implemented for single components and (nested) tuples of sets; this is how
/// entity creation accepts its overrides.
pub trait Set: Sized + 'static {
    /// Apply the component values in this set to the given target. This takes ownership of self.
    fn apply<T: Target>(self, registry: &Registry, target: &mut T) -> Result<()>;
}

/// Implement Set for single component types.
impl<C: Component> Set for C {
    fn apply<T: Target>(self, registry: &Registry, target: &mut T) -> Result<()> {
        target.apply::<C>(registry.register::<C>(), self)
    }
}

impl Set for () {
    fn apply<T: Target>(self, _registry: &Registry, _target: &mut T) -> Result<()> {
        // No components to apply.
        Ok(())
    }
}

/// Implement Set for tuples of component types.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {
            /// Apply each component in the tuple to the target.
            fn apply<CT: Target>(self, registry: &Registry, target: &mut CT) -> Result<()> {
                #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                $(<$name as Set>::apply($name, registry, target)?;)*
                Ok(())
            }
        }
    }
}

// Implement the tuple Set for all supported tuple arities.
all_tuples!(tuple_set);

#[cfg(test)]
mod tests {
    use std::any::Any;

    use ember_macros::Component;

    use super::*;

    struct MockTarget {
        ids: Vec<Id>,
        vals: Vec<Box<dyn Any>>,
    }

    impl Target for MockTarget {
        fn apply<C: Component>(&mut self, id: Id, value: C) -> Result<()> {
            self.ids.push(id);
            self.vals.push(Box::new(value));
            Ok(())
        }
    }

    fn apply_set<S: Set>(set: S, registry: &Registry) -> (Vec<Id>, Vec<Box<dyn Any>>) {
        let mut target = MockTarget {
            ids: Vec::new(),
            vals: Vec::new(),
        };

        set.apply(registry, &mut target).unwrap();

        (target.ids, target.vals)
    }

    #[derive(Component, Default, Debug, PartialEq)]
    struct Health {
        value: u32,
    }

    #[derive(Component, Default, Debug, PartialEq)]
    struct Mana {
        value: u32,
    }

    #[test]
    fn single_component_set() {
        // Given
        let registry = Registry::new();

        // When
        let (ids, vals) = apply_set(Health { value: 42 }, &registry);

        // Then
        assert_eq!(ids, vec![registry.get::<Health>().unwrap()]);
        assert_eq!(
            vals[0].downcast_ref::<Health>(),
            Some(&Health { value: 42 })
        );
    }

    #[test]
    fn tuple_component_set() {
        // Given
        let registry = Registry::new();

        // When - Nesting flattens in declaration order.
        let (ids, vals) = apply_set((Health { value: 42 }, (Mana { value: 67 },)), &registry);

        // Then
        assert_eq!(
            ids,
            vec![
                registry.get::<Health>().unwrap(),
                registry.get::<Mana>().unwrap(),
            ]
        );
        assert_eq!(vals.len(), 2);
        assert_eq!(
            vals[0].downcast_ref::<Health>(),
            Some(&Health { value: 42 })
        );
        assert_eq!(vals[1].downcast_ref::<Mana>(), Some(&Mana { value: 67 }));
    }
}
