mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use grip_world::prelude::{GridConfig, Object, OccupancyGrid, ShapeLibrary};

fn filled_grid(size: u32, step: f32) -> (OccupancyGrid, Vec<Object>) {
    let library = ShapeLibrary::pentominoes();
    let mut grid = OccupancyGrid::try_new(GridConfig::new(size, size).with_move_step(step))
        .expect("valid grid config");
    let mut objects = Vec::new();
    for (i, kind) in library.kinds().enumerate() {
        let matrix = library.get(kind).expect("known kind").clone();
        let x = (i as u32 * 6) % (size - 5);
        let y = ((i as u32 * 6) / (size - 5)) * 6;
        let obj = Object::new(i.to_string(), kind.clone(), matrix).at(Vec2::new(x as f32, y as f32));
        grid.add(&obj);
        objects.push(obj);
    }
    (grid, objects)
}

fn legality_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/is_legal_position");

    for &step in &[1.0f32, 0.5, 0.25] {
        let (grid, objects) = filled_grid(40, step);
        group.throughput(common::operations(objects.len()));

        group.bench_with_input(BenchmarkId::from_parameter(step), &step, |b, _| {
            b.iter(|| {
                for obj in &objects {
                    let shifted = obj.block_matrix().occupied(obj.position() + Vec2::X);
                    black_box(grid.is_legal_position(shifted, Some(&obj.id)));
                }
            });
        });
    }

    group.finish();
}

fn reindex_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/remove_add");

    for &step in &[1.0f32, 0.5] {
        let (mut grid, objects) = filled_grid(40, step);
        group.throughput(common::operations(objects.len()));

        group.bench_with_input(BenchmarkId::from_parameter(step), &step, |b, _| {
            b.iter(|| {
                for obj in &objects {
                    grid.remove(obj).expect("indexed object");
                    grid.add(obj);
                }
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = legality_benches, reindex_benches
}
criterion_main!(benches);
