//! The replication engine: owns one lineage and grows it generation by generation.
use glam::Vec3;
use tracing::{debug, info, warn};

use crate::behavior::{self, BehaviorDraft, BehaviorSpec};
use crate::entity::{
    EntityRecord, LineageId, MotionPath, RecordId, SpawnTiming, VisibilityWindow,
};
use crate::error::{Error, Result};
use crate::host::{Channel, CloneRequest, EntityRef, Frame, Host};
use crate::policy::occupancy::OccupancyIndex;
use crate::policy::{self, Direction, PathKind, Reveal, SpawnProfile, StartScale};
use crate::replicate::config::{check_scale, ReplicatorConfig, RootSeed};
use crate::replicate::events::{EventSink, ReplicationEvent, ReplicationEventKind};

/// Summary of one generation.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// 1-based generation index.
    pub generation: u32,
    /// Frame the spawn animations started on.
    pub frame_start: Frame,
    /// Frame the spawned records settled on.
    pub frame_end: Frame,
    /// Records that were eligible to spawn.
    pub sources: usize,
    pub spawned: usize,
    /// Sources left without any open side afterwards.
    pub surrounded: usize,
}

/// Summary of a [`Replicator::generate`] call.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub generations: Vec<GenerationReport>,
    /// Records spawned across all generations of the run.
    pub spawned: usize,
    /// Records in the lineage after the run, root included.
    pub total_records: usize,
}

/// A record created by [`Replicator::spawn`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spawned {
    pub record: RecordId,
    pub direction: Direction,
    /// Where the new record settles.
    pub location: Vec3,
}

/// Replication engine for one lineage.
///
/// The engine owns every [`EntityRecord`] it creates. Host entities are only ever
/// touched through the [`Host`] passed into each call. An engine cannot be
/// cloned, so no two engines ever share a lineage.
///
/// ```compile_fail
/// fn needs_clone<T: Clone>() {}
/// needs_clone::<mitosis::replicate::Replicator>();
/// ```
#[derive(Debug)]
pub struct Replicator {
    config: ReplicatorConfig,
    lineage: LineageId,
    template: EntityRef,
    name_prefix: String,
    scale_end: Vec3,
    records: Vec<EntityRecord>,
    frontier: Vec<RecordId>,
    occupancy: OccupancyIndex,
    behaviors: Vec<BehaviorSpec>,
    frame_cursor: Frame,
    generations_run: u32,
}

impl Replicator {
    /// Create an engine and its generation-0 record.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] if `config` does not validate, the seed's template is
    ///   unknown to `host` or the root location is not finite.
    pub fn try_new<H: Host + ?Sized>(
        config: ReplicatorConfig,
        seed: RootSeed,
        host: &mut H,
    ) -> Result<Self> {
        config.validate()?;

        let template = seed.template();
        if !host.contains(template) {
            return Err(Error::InvalidConfig(format!(
                "root seed references unknown {template}"
            )));
        }

        let origin = match seed {
            RootSeed::Existing(entity) => host.location(entity),
            RootSeed::Fresh { location, .. } => location,
        };
        if !origin.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "root location must be finite, got {origin}"
            )));
        }

        let scale_end = if config.use_template_scale {
            let scale = host.scale(template);
            check_scale("template scale", scale)?;
            scale
        } else {
            config.scale_end
        };

        let name_prefix = match (&config.name_prefix, host.name(template)) {
            (Some(prefix), _) => prefix.clone(),
            (None, Some(name)) => format!("{name}_Replicant"),
            (None, None) => "Replicant".to_owned(),
        };

        let lineage = LineageId::next();
        let mut replicator = Self {
            occupancy: OccupancyIndex::new(origin, config.spawn_offset),
            frame_cursor: config.frame_start,
            config,
            lineage,
            template,
            name_prefix,
            scale_end,
            records: Vec::new(),
            frontier: Vec::new(),
            behaviors: Vec::new(),
            generations_run: 0,
        };

        let root = match seed {
            RootSeed::Existing(entity) => EntityRecord::existing_root(
                lineage,
                entity,
                origin,
                host.scale(entity),
                replicator.frame_cursor,
            ),
            RootSeed::Fresh { .. } => {
                let path = replicator.spawn_path(origin, origin);
                let timing = replicator.spawn_timing()?;
                let entity = replicator.clone_template(RecordId(0), path.location_start, host);
                let root = EntityRecord::fresh_root(lineage, entity, path, timing);
                begin_animation(&root, host);
                replicator.frontier.push(root.id());
                root
            }
        };
        replicator.occupancy.settle(origin);

        info!(
            "{} seeded from {} at {} | strategy={} offset={} axes={}.",
            lineage,
            template,
            origin,
            replicator.config.strategy,
            replicator.config.spawn_offset,
            replicator.config.axis_mask.max_children()
        );

        replicator.records.push(root);
        Ok(replicator)
    }

    /// Spawn one child from `source` into its first free side.
    ///
    /// Returns `Ok(None)` when `source` has no free side left; that is the normal
    /// terminal state for a record. The child settles with the rest of the frontier
    /// at the end of the next [`Replicator::run_generation`].
    ///
    /// # Errors
    /// - [`Error::UnknownRecord`] if `source` is not part of this lineage.
    /// - [`Error::InvalidParent`] if `source` was spawned for the generation that has
    ///   not run yet.
    /// - [`Error::InvalidConfig`] if the settle frame does not fit a [`Frame`].
    pub fn spawn<H: Host + ?Sized>(
        &mut self,
        source: RecordId,
        host: &mut H,
    ) -> Result<Option<Spawned>> {
        let idx = self.index_of(source)?;
        self.spawn_from(idx, host, &mut ())
    }

    /// Run one generation: every record present beforehand spawns into all of its
    /// free sides, then all unsettled records settle and receive behaviors.
    pub fn run_generation<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<GenerationReport> {
        self.run_generation_with_events(host, &mut ())
    }

    /// Like [`Replicator::run_generation`] but reports progress to `sink`.
    pub fn run_generation_with_events<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        sink: &mut dyn EventSink,
    ) -> Result<GenerationReport> {
        let generation = self.generations_run + 1;
        let frame_start = self.frame_cursor;
        let frame_end = self.settle_frame()?;
        // Records spawned below, or by `spawn` ahead of this call, settle at the end of
        // this generation and are not sources until the next one.
        let source_count = self.records.len();
        let is_source =
            |r: &EntityRecord| r.spawn_generation() < generation && !r.is_surrounded();
        let sources = self.records[..source_count]
            .iter()
            .filter(|r| is_source(*r))
            .count();

        if sink.wants(ReplicationEventKind::GenerationStarted) {
            sink.send(ReplicationEvent::GenerationStarted {
                generation,
                frame: frame_start,
                sources,
            });
        }

        let mut spawned = 0;
        let mut surrounded = 0;
        for idx in 0..source_count {
            if !is_source(&self.records[idx]) {
                continue;
            }
            while self.spawn_from(idx, host, sink)?.is_some() {
                spawned += 1;
            }
            surrounded += 1;
            let record = self.records[idx].id();
            debug!("{} {}: surrounded.", self.lineage, record);
            if sink.wants(ReplicationEventKind::Surrounded) {
                sink.send(ReplicationEvent::Surrounded { generation, record });
            }
        }

        self.frame_cursor = frame_end;
        self.settle_frontier(host);
        self.generations_run = generation;

        let report = GenerationReport {
            generation,
            frame_start,
            frame_end: self.frame_cursor,
            sources,
            spawned,
            surrounded,
        };
        info!(
            "{} generation {}: {} spawned from {} sources | frames {}..{} | records={}.",
            self.lineage,
            generation,
            spawned,
            sources,
            frame_start,
            self.frame_cursor,
            self.records.len()
        );
        if sink.wants(ReplicationEventKind::GenerationFinished) {
            sink.send(ReplicationEvent::GenerationFinished {
                report: report.clone(),
            });
        }
        Ok(report)
    }

    /// Run `generations` generations back to back.
    pub fn generate<H: Host + ?Sized>(
        &mut self,
        generations: u32,
        host: &mut H,
    ) -> Result<RunReport> {
        self.generate_with_events(generations, host, &mut ())
    }

    /// Like [`Replicator::generate`] but reports progress to `sink`.
    pub fn generate_with_events<H: Host + ?Sized>(
        &mut self,
        generations: u32,
        host: &mut H,
        sink: &mut dyn EventSink,
    ) -> Result<RunReport> {
        if sink.wants(ReplicationEventKind::RunStarted) {
            sink.send(ReplicationEvent::RunStarted {
                lineage: self.lineage,
                generations,
                strategy: self.config.strategy,
                frame: self.frame_cursor,
            });
        }
        if generations == 0 {
            let message = "generate called with zero generations".to_owned();
            warn!("{}: {}.", self.lineage, message);
            if sink.wants(ReplicationEventKind::Warning) {
                sink.send(ReplicationEvent::Warning {
                    context: self.lineage.to_string(),
                    message,
                });
            }
        }

        let mut report = RunReport::default();
        for _ in 0..generations {
            let generation = self.run_generation_with_events(host, sink)?;
            report.spawned += generation.spawned;
            report.generations.push(generation);
        }
        report.total_records = self.records.len();

        if sink.wants(ReplicationEventKind::RunFinished) {
            sink.send(ReplicationEvent::RunFinished {
                report: report.clone(),
            });
        }
        Ok(report)
    }

    /// Append a behavior applied to every record that settles from now on.
    pub fn add_behavior(&mut self, draft: BehaviorDraft) -> Result<&BehaviorSpec> {
        let spec = draft.build()?;
        let idx = self.behaviors.len();
        self.behaviors.push(spec);
        Ok(&self.behaviors[idx])
    }

    /// Replace all behaviors. Nothing changes if any draft is invalid.
    pub fn set_behaviors(&mut self, drafts: impl IntoIterator<Item = BehaviorDraft>) -> Result<()> {
        let specs = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| {
                draft.build().map_err(|e| match e {
                    Error::InvalidBehaviorSpec(msg) => {
                        Error::InvalidBehaviorSpec(format!("behavior {i}: {msg}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if specs.is_empty() {
            warn!("{}: behavior list set to empty.", self.lineage);
        } else {
            debug!("{}: {} behaviors set.", self.lineage, specs.len());
        }
        self.behaviors = specs;
        Ok(())
    }

    pub fn clear_behaviors(&mut self) {
        self.behaviors.clear();
    }

    pub fn behaviors(&self) -> &[BehaviorSpec] {
        &self.behaviors
    }

    /// Behaviors ordered by delay; equal delays keep insertion order.
    pub fn behaviors_sorted_by_delay(&self) -> Vec<&BehaviorSpec> {
        let mut sorted: Vec<_> = self.behaviors.iter().collect();
        sorted.sort_by_key(|b| b.delay());
        sorted
    }

    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    pub fn lineage(&self) -> LineageId {
        self.lineage
    }

    /// Entity every record is cloned from.
    pub fn template(&self) -> EntityRef {
        self.template
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub fn root(&self) -> &EntityRecord {
        &self.records[0]
    }

    pub fn record(&self, id: RecordId) -> Option<&EntityRecord> {
        self.records.get(id.0 as usize)
    }

    /// All records in creation order; a record's id is its index.
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: a lineage has at least its root.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records spawned but not yet settled.
    pub fn frontier(&self) -> &[RecordId] {
        &self.frontier
    }

    pub fn children_of(&self, id: RecordId) -> impl Iterator<Item = &EntityRecord> + '_ {
        self.records.iter().filter(move |r| r.parent() == Some(id))
    }

    /// Records spawned in generation `generation`; `0` is the root.
    pub fn generation(&self, generation: u32) -> impl Iterator<Item = &EntityRecord> + '_ {
        self.records
            .iter()
            .filter(move |r| r.spawn_generation() == generation)
    }

    /// Frame the next generation starts on.
    pub fn frame_cursor(&self) -> Frame {
        self.frame_cursor
    }

    pub fn generations_run(&self) -> u32 {
        self.generations_run
    }

    pub fn occupancy(&self) -> &OccupancyIndex {
        &self.occupancy
    }

    fn profile(&self) -> SpawnProfile {
        self.config.strategy.profile()
    }

    fn index_of(&self, id: RecordId) -> Result<usize> {
        let idx = id.0 as usize;
        if idx < self.records.len() {
            Ok(idx)
        } else {
            Err(Error::UnknownRecord { id })
        }
    }

    fn spawn_from<H: Host + ?Sized>(
        &mut self,
        idx: usize,
        host: &mut H,
        sink: &mut dyn EventSink,
    ) -> Result<Option<Spawned>> {
        let generation = self.generations_run + 1;
        let source = &self.records[idx];
        let parent = source.id();
        if source.spawn_generation() >= generation {
            return Err(Error::InvalidParent(format!(
                "{parent} settles at the end of generation {generation} and cannot spawn before"
            )));
        }
        let timing = self.spawn_timing()?;
        let source = &self.records[idx];
        let source_location = source.current_location();
        let probe = policy::probe(
            source_location,
            self.config.spawn_offset,
            self.config.axis_mask,
            source.open_sides(),
            &self.occupancy,
            self.profile().collision,
        );
        self.records[idx].close_sides(probe.examined);

        let Some((direction, location)) = probe.found else {
            return Ok(None);
        };

        let record = self.add_child(idx, generation, timing, source_location, location, host)?;
        debug!(
            "{} {} -> {} {} at {}.",
            self.lineage, parent, record, direction, location
        );
        if sink.wants(ReplicationEventKind::Spawned) {
            sink.send(ReplicationEvent::Spawned {
                generation,
                parent,
                record,
                direction,
                location,
            });
        }
        Ok(Some(Spawned {
            record,
            direction,
            location,
        }))
    }

    fn add_child<H: Host + ?Sized>(
        &mut self,
        parent_idx: usize,
        generation: u32,
        timing: SpawnTiming,
        parent_location: Vec3,
        location: Vec3,
        host: &mut H,
    ) -> Result<RecordId> {
        let id = RecordId(self.records.len() as u64);
        let path = self.spawn_path(parent_location, location);
        let entity = self.clone_template(id, path.location_start, host);
        let record = EntityRecord::child(
            id,
            Some(&self.records[parent_idx]),
            entity,
            generation,
            path,
            timing,
        )?;
        begin_animation(&record, host);

        self.occupancy.claim(path.location_start);
        self.occupancy.claim(path.location_end);
        self.records.push(record);
        self.frontier.push(id);
        Ok(id)
    }

    fn spawn_path(&self, parent_location: Vec3, location: Vec3) -> MotionPath {
        let profile = self.profile();
        let location_start = match profile.path {
            PathKind::Travel => parent_location,
            PathKind::InPlace => location,
        };
        let scale_start = match profile.start_scale {
            StartScale::Configured => self.config.scale_start,
            StartScale::Zero => Vec3::ZERO,
        };
        MotionPath {
            location_start,
            location_end: location,
            scale_start,
            scale_end: self.scale_end,
        }
    }

    /// Frame records spawned at the cursor come to rest on.
    fn settle_frame(&self) -> Result<Frame> {
        Frame::try_from(self.config.frames_to_spawn)
            .ok()
            .and_then(|frames| self.frame_cursor.checked_add(frames))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "frame {} + frames_to_spawn {} overflows the frame range",
                    self.frame_cursor, self.config.frames_to_spawn
                ))
            })
    }

    fn spawn_timing(&self) -> Result<SpawnTiming> {
        let spawn_frame = self.frame_cursor;
        let settle_frame = self.settle_frame()?;
        let visible_from = match self.profile().reveal {
            Reveal::OnSpawn => spawn_frame,
            Reveal::OnSettle => settle_frame,
        };
        Ok(SpawnTiming {
            spawn_frame,
            settle_frame,
            visibility: Some(VisibilityWindow::new(self.config.frame_start, visible_from)),
        })
    }

    fn clone_template<H: Host + ?Sized>(
        &self,
        id: RecordId,
        location: Vec3,
        host: &mut H,
    ) -> EntityRef {
        let name = format!("{}{}", self.name_prefix, id.0);
        host.clone_entity(CloneRequest {
            template: self.template,
            location,
            linked: self.config.linked,
            name: &name,
        })
    }

    fn settle_frontier<H: Host + ?Sized>(&mut self, host: &mut H) {
        let frame = self.frame_cursor;
        for id in std::mem::take(&mut self.frontier) {
            let record = &mut self.records[id.0 as usize];
            record.settle();
            let entity = record.entity();
            let location = record.location_end();
            let scale = record.scale_end();

            host.set_location(entity, location);
            host.set_scale(entity, scale);
            host.record_vec3(entity, &Channel::Location, frame, location);
            host.record_vec3(entity, &Channel::Scale, frame, scale);
            self.occupancy.settle(location);

            for spec in &self.behaviors {
                behavior::apply(spec, entity, frame, host);
            }
        }
    }
}

/// Place a freshly cloned record on its start pose and key it.
fn begin_animation<H: Host + ?Sized>(record: &EntityRecord, host: &mut H) {
    let entity = record.entity();
    let frame = record.timing().spawn_frame;
    host.set_location(entity, record.location_start());
    host.set_scale(entity, record.scale_start());
    host.record_vec3(entity, &Channel::Location, frame, record.location_start());
    host.record_vec3(entity, &Channel::Scale, frame, record.scale_start());
    if let Some(window) = record.visibility_window() {
        record_visibility(entity, window, host);
    }
}

fn record_visibility<H: Host + ?Sized>(entity: EntityRef, window: VisibilityWindow, host: &mut H) {
    if !window.is_empty() {
        host.record_keyframe(entity, &Channel::Visibility, None, window.hidden_from, 0.0);
        let last_hidden = window.visible_from - 1;
        if last_hidden > window.hidden_from {
            host.record_keyframe(entity, &Channel::Visibility, None, last_hidden, 0.0);
        }
    }
    host.record_keyframe(entity, &Channel::Visibility, None, window.visible_from, 1.0);
}
