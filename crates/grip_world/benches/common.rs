#![allow(dead_code)]

use std::time::Duration;

use criterion::{Criterion, Throughput};
use grip_world::prelude::{Action, Generator, GeneratorConfig, GridConfig, Scene, SceneConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SEED: u64 = 0xC0FFEE;

/// One of each action kind, with moves in all four directions.
pub const ACTIONS: [Action; 7] = [
    Action::Move { x_steps: 1.0, y_steps: 0.0 },
    Action::Move { x_steps: 0.0, y_steps: 1.0 },
    Action::Move { x_steps: -1.0, y_steps: 0.0 },
    Action::Move { x_steps: 0.0, y_steps: -1.0 },
    Action::Rotate { direction: 1.0, step: 90.0 },
    Action::Flip,
    Action::Grip,
];

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(30)
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(3))
}

/// Throughput measured in scene operations per iteration.
pub fn operations(count: usize) -> Throughput {
    Throughput::Elements(count.max(1) as u64)
}

pub fn gripper_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("g{i}")).collect()
}

/// A 60×60 half-step scene filled by the generator with a fixed seed.
pub fn populated_scene(objects: usize, grippers: usize) -> Scene {
    let config = SceneConfig::new(GridConfig::new(60, 60).with_move_step(0.5));
    let mut scene = Scene::new(config).expect("valid scene config");
    Generator::try_new(GeneratorConfig::new(objects).with_grippers(gripper_ids(grippers)))
        .expect("valid generator config")
        .populate(&mut scene, &mut StdRng::seed_from_u64(SEED))
        .expect("populate");
    scene
}
