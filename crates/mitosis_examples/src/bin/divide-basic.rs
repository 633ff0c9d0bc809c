use mitosis::prelude::*;
use mitosis_examples::{init_tracing, print_lineage};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut scene = MemoryScene::new();
    let cube = scene.spawn_template("Cube", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);

    let config = ReplicatorConfig::new(Strategy::Divide)
        .with_spawn_offset(4.0)
        .with_frames_to_spawn(12)
        .with_scale_start([0.25, 0.25, 0.25])
        .with_axes(true, true, false);

    let mut replicator = Replicator::try_new(config, RootSeed::existing(cube), &mut scene)?;
    let report = replicator.generate(3, &mut scene)?;

    print_lineage(&replicator, &report);
    Ok(())
}
