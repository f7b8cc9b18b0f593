//! Component management for the ECS.
//!
//! Components are the data containers attached to entities. Besides its value,
//! every component type declares three relations over other component types:
//!
//! - **requires**: components that must also be present in the same entity.
//! - **implies**: components that are automatically added alongside it.
//! - **conflicts**: components that must not share an entity with it.
//!
//! The relations are declared on the derive:
//!
//! ```ignore
//! #[derive(Component, Default)]
//! #[component(implies(Position), conflicts(Static))]
//! struct Velocity { dx: f32, dy: f32 }
//! ```
//!
//! The [`Registry`] assigns each component type a process-wide [`Id`] and
//! stores its metadata (layout, erased constructors, resolved relations). The
//! dependency solver in [`solver`] closes declared component sets over the
//! `implies` relation and validates `requires`/`conflicts` once per unique
//! combination.

use std::hash::Hash;

mod registry;
mod set;
mod spec;

pub mod solver;

pub use registry::{Info, Registry, Relations, registry};
pub use set::{Set, Target};
pub use spec::{IntoSpec, Spec};

/// Re-export of the derive macro, so `use ember_engine::ecs::component::Component`
/// brings both the trait and the derive into scope.
pub use ember_macros::Component;

/// The maximum alignment a component type may have. The entity storage blocks
/// are allocated with this alignment; the derive rejects over-aligned
/// components at compile time.
pub const MAX_COMPONENT_ALIGN: usize = 16;

/// A component identifier. A unique identifier for a component type, shared by
/// all controllers in the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for Id {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// A trait representing a component in the ECS.
///
/// Components are plain values. `Default` supplies the value-initialization
/// used for components created without an override. The relation hooks are
/// normally generated by the derive; they register the related component types
/// and return their ids.
pub trait Component: Default + 'static {
    /// The component's name, used in diagnostics and by-name creation.
    const NAME: &'static str;

    /// Components that must be present in any entity containing this one.
    fn requires(_registry: &Registry) -> Vec<Id> {
        Vec::new()
    }

    /// Components automatically added to any entity containing this one.
    fn implies(_registry: &Registry) -> Vec<Id> {
        Vec::new()
    }

    /// Components that may not share an entity with this one.
    fn conflicts(_registry: &Registry) -> Vec<Id> {
        Vec::new()
    }
}
