use glam::Vec2;
use grip_world::prelude::*;
use grip_world_examples::{init_tracing, render_ascii, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SceneConfig::new(GridConfig::new(10, 6).with_move_step(0.5)).with_snap_to_grid(true);
    let mut scene = Scene::new(config)?;
    let library = ShapeLibrary::pentominoes();

    scene.add_object(
        Object::new("a", "L", library.get("L")?.clone())
            .with_color("red")
            .at(Vec2::new(1.0, 1.0)),
        true,
    )?;
    scene.add_object(
        Object::new("b", "P", library.get("P")?.clone())
            .with_color("blue")
            .at(Vec2::new(5.0, 1.0)),
        true,
    )?;
    scene.add_gripper(Gripper::new("player", Vec2::new(1.0, 1.0)))?;

    let rc = RenderConfig::new();
    let mut sink = FnSink::new(|event: SceneEvent| {
        if let SceneEvent::StateChanged { delta } = event {
            tracing::info!(
                "update: {} object(s), {} gripper(s)",
                delta.objects.len(),
                delta.grippers.len()
            );
        }
    });

    let script = [
        Action::Grip,
        Action::translate(1.0, 0.0),
        Action::translate(1.0, 0.0),
        Action::translate(1.0, 1.0),
        // Blocked by "b": rejected without side effects.
        Action::translate(4.0, 0.0),
        Action::rotate(1.0),
        // Release at a half-cell position snaps to a whole cell.
        Action::Grip,
    ];
    for action in &script {
        let outcome = apply_movement(&mut scene, "player", action, &mut sink)?;
        println!("{action:?} -> {outcome:?}");
        print!("{}", render_ascii(&scene, &rc));
        println!();
    }

    scene.check_consistency()?;
    Ok(())
}
