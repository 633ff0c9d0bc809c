use mitosis::prelude::*;
use mitosis_examples::{init_tracing, print_timeline};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut scene = MemoryScene::new();
    let cube = scene.spawn_template("Cube", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);

    let config = ReplicatorConfig::new(Strategy::Appear)
        .with_frame_start(1)
        .with_frames_to_spawn(10);

    let mut replicator = Replicator::try_new(config, RootSeed::existing(cube), &mut scene)?;
    replicator.generate(2, &mut scene)?;

    for generation in 1..=2 {
        if let Some(record) = replicator.generation(generation).next() {
            println!(
                "{} (generation {}) hidden during {:?}",
                record.id(),
                generation,
                record.visibility_window()
            );
            print_timeline(&scene, record.entity(), (0..=24).step_by(4));
        }
    }
    Ok(())
}
