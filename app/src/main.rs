//! A small demo of the engine: a state machine driving a handful of entities.
//!
//! `Launch` burns fuel, then hands over (as text) to `Cruise`, which coasts
//! until the journey is over and the null state stops the loop. Meanwhile the
//! entity controller drifts a couple of probes every tick.

use std::error::Error;

use log::{Level, LevelFilter, Metadata, Record, info};

use ember_engine::ecs::controller::{Controller, ControllerConfig, TemplateCache, has_components};
use ember_engine::poly_register;
use ember_engine::state::{Manager, State};
use ember_macros::{Component, Reflect};

/// Minimal logger printing straight to stdout.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[derive(Component, Default, Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

/// Anything that moves also has a position.
#[derive(Component, Default, Debug, Clone, Copy)]
#[component(implies(Position))]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Reflect, Default, Debug)]
struct Launch {
    fuel: u32,
}

impl State for Launch {
    fn init(&mut self) {
        info!("launch: ignition with {} fuel", self.fuel);
    }

    fn tick(&mut self, next_state: &mut String) {
        if self.fuel == 0 {
            *next_state = "Cruise{journey=4}".to_string();
            return;
        }
        self.fuel -= 1;
        info!("launch: burning, {} fuel left", self.fuel);
    }
}

#[derive(Reflect, Default, Debug)]
struct Cruise {
    journey: u32,
}

impl State for Cruise {
    fn init(&mut self) {
        info!("cruise: coasting for {} ticks", self.journey);
    }

    fn tick(&mut self, next_state: &mut String) {
        if self.journey == 0 {
            info!("cruise: arrived");
            *next_state = "0".to_string();
            return;
        }
        self.journey -= 1;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LevelFilter::Debug);

    poly_register!(State { Launch, Cruise });

    // A controller with one list of everything positioned and one of the
    // movers only.
    let mut config = ControllerConfig::new();
    let positioned = config.add_list(has_components::<Position>())?;
    let movers = config.add_list(has_components::<Velocity>())?;
    let mut controller = Controller::new();
    config.configure(&mut controller)?;
    let mut cache = TemplateCache::new();

    // A fixed beacon, and two probes; Velocity implies Position.
    controller.create_cached::<Position>(&mut cache, Position { x: 0.0, y: 0.0 })?;
    controller.create_cached::<Velocity>(&mut cache, Velocity { dx: 1.0, dy: 0.0 })?;
    controller.create_cached::<Velocity>(&mut cache, Velocity { dx: 0.0, dy: -2.0 })?;
    info!(
        "created {} entities ({} movers)",
        controller.entity_count(),
        controller.list(movers)?.len()
    );

    let mut manager = Manager::new();
    manager.set_state("Launch{fuel=2}")?;

    while manager.is_running() {
        manager.tick()?;

        // Drift the movers each tick.
        for mut entity in controller.iter_mut(movers)? {
            let velocity = *entity.get::<Velocity>()?;
            let position = entity.get_mut::<Position>()?;
            position.x += velocity.dx;
            position.y += velocity.dy;
        }
    }

    for entity in controller.list(positioned)? {
        let position = entity.get::<Position>()?;
        info!("entity settled at ({}, {})", position.x, position.y);
    }

    Ok(())
}
