//! Microbenchmarks for the hot entity-controller paths: creation through a
//! cached template, destruction, and list iteration.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ember_bench::{Health, Position, Velocity};
use ember_engine::ecs::controller::{
    Controller, ControllerConfig, Template, TemplateCache, has_components,
};
use ember_engine::ecs::list::ListHandle;

fn configured() -> (Controller, ListHandle, Template) {
    let mut config = ControllerConfig::new();
    let positioned = config.add_list(has_components::<Position>()).unwrap();
    config.add_list(has_components::<Velocity>()).unwrap();
    let mut controller = Controller::new();
    config.configure(&mut controller).unwrap();
    let template = controller
        .make_template::<(Velocity, Health)>()
        .unwrap();
    (controller, positioned, template)
}

fn create_destroy(c: &mut Criterion) {
    let (mut controller, _, template) = configured();

    c.bench_function("create_destroy", |b| {
        b.iter(|| {
            let entity = controller
                .create(&template, Velocity { dx: 1.0, dy: 2.0 })
                .unwrap();
            controller.destroy(black_box(entity)).unwrap();
        });
    });
}

fn create_cached(c: &mut Criterion) {
    let (mut controller, _, _) = configured();
    let mut cache = TemplateCache::new();

    c.bench_function("create_cached", |b| {
        b.iter(|| {
            let entity = controller
                .create_cached::<(Velocity, Health)>(&mut cache, ())
                .unwrap();
            controller.destroy(black_box(entity)).unwrap();
        });
    });
}

fn iterate(c: &mut Criterion) {
    let (mut controller, positioned, template) = configured();
    for _ in 0..1_000 {
        controller
            .create(&template, Velocity { dx: 1.0, dy: 0.0 })
            .unwrap();
    }

    c.bench_function("iterate_1000", |b| {
        b.iter(|| {
            let mut total = 0.0f32;
            for entity in controller.list(positioned).unwrap() {
                total += entity.get::<Position>().unwrap().x;
            }
            black_box(total)
        });
    });
}

criterion_group!(benches, create_destroy, create_cached, iterate);
criterion_main!(benches);
