//! Event types and sinks for observing replication runs.
//!
//! This module defines [`ReplicationEvent`] and a set of sinks to emit, collect, or
//! forward events while running generations via
//! [`crate::replicate::Replicator::generate_with_events`].
use glam::Vec3;

use crate::entity::{LineageId, RecordId};
use crate::host::Frame;
use crate::policy::{Direction, Strategy};
use crate::replicate::engine::{GenerationReport, RunReport};

/// Describes events emitted by replication.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ReplicationEvent {
    /// Emitted when `generate` starts.
    RunStarted {
        lineage: LineageId,
        /// Number of generations requested.
        generations: u32,
        strategy: Strategy,
        /// Frame the first requested generation starts on.
        frame: Frame,
    },

    /// Emitted when `generate` finishes.
    RunFinished {
        /// Aggregated result for all generations of the run.
        report: RunReport,
    },

    /// Emitted before any record of a generation spawns.
    GenerationStarted {
        /// 1-based generation index.
        generation: u32,
        /// Frame the spawn animations start on.
        frame: Frame,
        /// Records eligible as spawn sources in this generation.
        sources: usize,
    },

    /// Emitted after a generation's records have settled.
    GenerationFinished { report: GenerationReport },

    /// Emitted for every new record.
    Spawned {
        generation: u32,
        parent: RecordId,
        record: RecordId,
        direction: Direction,
        /// Position the new record settles on.
        location: Vec3,
    },

    /// Emitted when a record runs out of open sides. This is a normal terminal state.
    Surrounded { generation: u32, record: RecordId },

    /// Non-fatal warning generated during replication.
    Warning {
        /// Context string (e.g. lineage or record id).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// Discriminant of [`ReplicationEvent`], used for sink filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicationEventKind {
    RunStarted,
    RunFinished,
    GenerationStarted,
    GenerationFinished,
    Spawned,
    Surrounded,
    Warning,
}

impl ReplicationEvent {
    pub fn kind(&self) -> ReplicationEventKind {
        match self {
            ReplicationEvent::RunStarted { .. } => ReplicationEventKind::RunStarted,
            ReplicationEvent::RunFinished { .. } => ReplicationEventKind::RunFinished,
            ReplicationEvent::GenerationStarted { .. } => ReplicationEventKind::GenerationStarted,
            ReplicationEvent::GenerationFinished { .. } => {
                ReplicationEventKind::GenerationFinished
            }
            ReplicationEvent::Spawned { .. } => ReplicationEventKind::Spawned,
            ReplicationEvent::Surrounded { .. } => ReplicationEventKind::Surrounded,
            ReplicationEvent::Warning { .. } => ReplicationEventKind::Warning,
        }
    }
}

/// A generic event sink that accepts [`ReplicationEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: ReplicationEvent);

    /// Whether events of `kind` should be built and sent at all.
    fn wants(&self, _kind: ReplicationEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = ReplicationEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: ReplicationEvent) {}

    #[inline]
    fn wants(&self, _kind: ReplicationEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(ReplicationEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(ReplicationEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(ReplicationEvent),
{
    #[inline]
    fn send(&mut self, event: ReplicationEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects events in a `Vec`, optionally only some kinds.
#[derive(Default)]
pub struct VecSink {
    events: Vec<ReplicationEvent>,
    only: Option<Vec<ReplicationEventKind>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
            only: None,
        }
    }

    /// Collect only the listed kinds.
    pub fn only(kinds: impl IntoIterator<Item = ReplicationEventKind>) -> Self {
        Self {
            events: Vec::new(),
            only: Some(kinds.into_iter().collect()),
        }
    }

    pub fn into_inner(self) -> Vec<ReplicationEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[ReplicationEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: ReplicationEvent) {
        if self.wants(event.kind()) {
            self.events.push(event);
        }
    }

    fn wants(&self, kind: ReplicationEventKind) -> bool {
        self.only.as_ref().map_or(true, |kinds| kinds.contains(&kind))
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn into_inner(self) -> Vec<S> {
        self.sinks
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: ReplicationEvent) {
        let kind = event.kind();
        let Some(last_idx) = self.sinks.iter().rposition(|s| s.wants(kind)) else {
            return;
        };
        for i in 0..last_idx {
            if self.sinks[i].wants(kind) {
                self.sinks[i].send(event.clone());
            }
        }
        self.sinks[last_idx].send(event);
    }

    fn wants(&self, kind: ReplicationEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(context: &str) -> ReplicationEvent {
        ReplicationEvent::Warning {
            context: context.into(),
            message: "msg".into(),
        }
    }

    fn surrounded(record: u64) -> ReplicationEvent {
        ReplicationEvent::Surrounded {
            generation: 1,
            record: RecordId(record),
        }
    }

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::with_capacity(2);
        assert!(sink.is_empty());
        sink.send(warning("a"));
        sink.send(warning("b"));
        assert_eq!(sink.len(), 2);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn filtered_vec_sink_drops_other_kinds() {
        let mut sink = VecSink::only([ReplicationEventKind::Surrounded]);
        assert!(!sink.wants(ReplicationEventKind::Warning));
        sink.send(warning("a"));
        sink.send(surrounded(4));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.as_slice()[0].kind(), ReplicationEventKind::Surrounded);
    }

    #[test]
    fn unit_sink_wants_nothing() {
        assert!(!().wants(ReplicationEventKind::Spawned));
    }

    #[test]
    fn multi_sink_fans_out_events() {
        let mut multi = MultiSink::with_sinks(vec![VecSink::new(), VecSink::new()]);
        multi.send(warning("ctx"));
        assert_eq!(multi.len(), 2);
        assert_eq!(multi.sinks[0].len(), 1);
        assert_eq!(multi.sinks[1].len(), 1);
    }

    #[test]
    fn multi_sink_respects_member_filters() {
        let mut multi = MultiSink::with_sinks(vec![
            VecSink::only([ReplicationEventKind::Warning]),
            VecSink::only([ReplicationEventKind::Surrounded]),
        ]);
        multi.send(surrounded(1));
        multi.send(warning("x"));
        let sinks = multi.into_inner();
        assert_eq!(sinks[0].len(), 1);
        assert_eq!(sinks[1].len(), 1);
        assert_eq!(sinks[1].as_slice()[0].kind(), ReplicationEventKind::Surrounded);
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(warning("ctx"));
        sink.send_many([warning("a"), warning("b")]);
        assert_eq!(count, 3);
    }
}
