use std::time::Duration;

use glam::Vec2;
use grip_world::prelude::*;
use grip_world_examples::{init_tracing, render_ascii, RenderConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SceneConfig::new(GridConfig::new(12, 4))
        .with_action_interval(Duration::from_millis(100));
    let (mut registry, rx) = RoomRegistry::with_channel(config)?;
    let room = registry.join("lobby", "alice")?;

    let library = ShapeLibrary::pentominoes();
    room.add_object(
        Object::new("bar", "I", library.get("I")?.rotated(90.0).into_owned())
            .with_color("green")
            .at(Vec2::new(0.0, 1.0)),
        true,
    )?;
    room.add_gripper("alice", Some(Vec2::new(0.0, 1.0)))?;
    room.grip("alice")?;

    // Drag the bar right until it hits the wall, then stop the loop.
    room.start_loop("alice", Action::translate(1.0, 0.0))?;
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    room.stop_loop("alice", ActionKind::Move)?;

    let rendered = room.with_scene(|s| render_ascii(s, &RenderConfig::new()))?;
    print!("{rendered}");

    let updates = rx.try_iter().count();
    tracing::info!("Room produced {} events.", updates);

    registry.leave("lobby", "alice")?;
    Ok(())
}
