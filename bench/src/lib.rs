//! Shared component fixtures for the benchmarks.

use ember_macros::Component;

#[derive(Component, Default, Debug, Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Component, Default, Debug, Clone, Copy)]
#[component(implies(Position))]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Component, Default, Debug, Clone, Copy)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}
