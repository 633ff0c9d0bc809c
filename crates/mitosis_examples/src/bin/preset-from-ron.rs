use mitosis::prelude::*;
use mitosis_examples::{init_tracing, load_preset, print_lineage, print_timeline};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        format!(
            "{}/presets/rotating-divide.ron",
            env!("CARGO_MANIFEST_DIR")
        )
    });
    let preset = load_preset(&path)?;

    let mut events = VecSink::only([ReplicationEventKind::Surrounded]);
    let run = preset.run_with_events(&mut events)?;

    print_lineage(&run.replicator, &run.report);
    println!("{} records surrounded", events.len());

    for spec in run.replicator.behaviors_sorted_by_delay() {
        println!(
            "behavior {}[{}] -> {} over {} frames, delay {}",
            spec.channel(),
            spec.axis(),
            spec.value(),
            spec.duration(),
            spec.delay()
        );
    }

    if let Some(record) = run.replicator.generation(1).next() {
        let end = run.replicator.frame_cursor();
        print_timeline(&run.scene, record.entity(), (0..=end).step_by(5));
    }
    Ok(())
}
