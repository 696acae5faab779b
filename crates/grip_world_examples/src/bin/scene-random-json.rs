use grip_world::prelude::*;
use grip_world_examples::{init_tracing, render_ascii, RenderConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // A 16×12 board with half-cell steps and matching targets for every piece.
    let config = SceneConfig::new(GridConfig::new(16, 12).with_move_step(0.5))
        .with_snap_to_grid(true)
        .with_lock_on_target(true);
    let mut scene = Scene::new(config)?;

    let generator = Generator::try_new(
        GeneratorConfig::new(6)
            .with_targets(true)
            .with_grippers(["player"]),
    )?;
    let mut rng = StdRng::seed_from_u64(2025);
    let report = generator.populate(&mut scene, &mut rng)?;
    tracing::info!(
        "Placed {} objects and {} targets.",
        report.objects.len(),
        report.targets.len()
    );

    print!("{}", render_ascii(&scene, &RenderConfig::new()));

    // The same state a transport layer would push to clients.
    let json = serde_json::to_string_pretty(&scene.snapshot())?;
    println!("{json}");

    // And back: a fresh scene restored from the serialized snapshot.
    let restored: SceneSnapshot = serde_json::from_str(&json)?;
    let mut copy = Scene::new(SceneConfig::default())?;
    copy.load_state(&restored)?;
    copy.check_consistency()?;

    Ok(())
}
