use mitosis::prelude::*;

/// Print per-generation counts and every record of a run.
pub fn print_lineage(replicator: &Replicator, report: &RunReport) {
    println!(
        "{} | strategy={} | records={} | frame cursor={}",
        replicator.lineage(),
        replicator.config().strategy,
        replicator.len(),
        replicator.frame_cursor()
    );
    for generation in &report.generations {
        println!(
            "  gen {:>2}: frames {:>4}..{:<4} sources={:<4} spawned={:<4} surrounded={}",
            generation.generation,
            generation.frame_start,
            generation.frame_end,
            generation.sources,
            generation.spawned,
            generation.surrounded
        );
    }
    for record in replicator.records() {
        let parent = record
            .parent()
            .map_or_else(|| "-".to_owned(), |p| p.to_string());
        println!(
            "  {:>5} gen={} parent={:>5} {} -> {}",
            record.id().to_string(),
            record.spawn_generation(),
            parent,
            record.location_start(),
            record.location_end()
        );
    }
}

/// Print sampled location, scale and visibility of one entity over `frames`.
pub fn print_timeline(
    scene: &MemoryScene,
    entity: EntityRef,
    frames: impl IntoIterator<Item = Frame>,
) {
    for frame in frames {
        println!(
            "  frame {:>4}: visible={:<5} location={} scale={}",
            frame,
            scene.is_visible_at(entity, frame),
            scene.location_at(entity, frame),
            scene.scale_at(entity, frame)
        );
    }
}
