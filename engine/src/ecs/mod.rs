//! The entity-component system.
//!
//! The top-level owner is the [`controller::Controller`]: it holds a fixed set
//! of entity lists (established once via [`controller::ControllerConfig`]) and
//! owns every entity transitively through those lists. Entities are created
//! from [`controller::Template`]s, which cache the "which lists match this
//! component set" decision per component combination.

pub mod component;
pub mod controller;
pub mod entity;
pub mod list;
pub(crate) mod util;

mod error;

pub use error::Error;

/// Convenience alias used across the ECS surface.
pub type Result<T> = std::result::Result<T, Error>;
