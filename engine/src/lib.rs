//! An entity controller with multi-indexed intrusive list storage, plus the
//! reflection subsystem that drives text/binary serialization of components,
//! states and arbitrary data.
//!
//! The crate is split into three cooperating modules:
//!
//! - [`ecs`]: the entity controller. Entities are single-allocation blocks of
//!   components, linked into every configured list whose predicate matches
//!   their component set.
//! - [`reflect`]: the reflection registry and the uniform
//!   to-text / from-text / to-binary / from-binary protocol.
//! - [`state`]: a thin state-machine driver that loads the next state from a
//!   string through the polymorphic reflection registry.

// Allow macro-generated `::ember_engine::...` paths to resolve inside this
// crate as well as in downstream crates.
extern crate self as ember_engine;

pub mod ecs;
pub mod reflect;
pub mod state;
