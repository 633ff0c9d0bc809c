use std::collections::HashMap;

use mitosis::prelude::*;
use mitosis_examples::init_tracing;

const GENERATIONS: u32 = 4;

fn main() -> anyhow::Result<()> {
    init_tracing();

    for strategy in [Strategy::Divide, Strategy::DivideAndMerge] {
        let mut scene = MemoryScene::new();
        let cube = scene.spawn_template("Cube", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let config = ReplicatorConfig::new(strategy).with_axes(true, true, false);

        let mut replicator = Replicator::try_new(config, RootSeed::existing(cube), &mut scene)?;
        let report = replicator.generate(GENERATIONS, &mut scene)?;

        let mut stacked: HashMap<_, usize> = HashMap::new();
        for record in replicator.records() {
            let key = replicator.occupancy().key_for(record.location_end());
            *stacked.entry(key).or_default() += 1;
        }
        let shared = stacked.values().filter(|n| **n > 1).count();

        println!("{strategy}:");
        for generation in &report.generations {
            println!(
                "  gen {}: spawned {}",
                generation.generation, generation.spawned
            );
        }
        println!(
            "  {} records on {} cells, {} cells shared",
            replicator.len(),
            stacked.len(),
            shared
        );
    }
    Ok(())
}
