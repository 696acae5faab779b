//! Event types and sinks for observing scene changes.
//!
//! Every committed mutation of a [`crate::scene::Scene`] made through
//! [`crate::scene::mover`] or a [`crate::room::Room`] is reported as a [`SceneEvent`].
//! A transport layer decides how to frame them: [`SceneEvent::StateChanged`] carries only
//! what changed, [`SceneEvent::StateReplaced`] the full state.
use crate::model::GripperId;
use crate::scene::mover::ActionKind;
use crate::scene::snapshot::{SceneDelta, SceneSnapshot};

/// Describes events emitted by scene operations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// Emitted once per committed mutation.
    StateChanged {
        /// Added or modified entries and removed ids.
        delta: SceneDelta,
    },

    /// Emitted when the whole state was replaced (configure, reset, load, generate).
    StateReplaced {
        /// The new state.
        state: SceneSnapshot,
    },

    /// Emitted when a looped action was (re)started.
    LoopStarted {
        /// Action being repeated.
        action: ActionKind,
        /// Gripper driving the loop.
        gripper: GripperId,
    },

    /// Emitted when a looped action was stopped explicitly.
    LoopStopped {
        /// Action that was repeated.
        action: ActionKind,
        /// Gripper that drove the loop.
        gripper: GripperId,
    },

    /// Non-fatal warning.
    Warning {
        /// Context string (e.g. gripper id, generator).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

impl SceneEvent {
    pub fn kind(&self) -> SceneEventKind {
        match self {
            SceneEvent::StateChanged { .. } => SceneEventKind::StateChanged,
            SceneEvent::StateReplaced { .. } => SceneEventKind::StateReplaced,
            SceneEvent::LoopStarted { .. } => SceneEventKind::LoopStarted,
            SceneEvent::LoopStopped { .. } => SceneEventKind::LoopStopped,
            SceneEvent::Warning { .. } => SceneEventKind::Warning,
        }
    }
}

/// Discriminant of [`SceneEvent`], used by sinks to skip building unwanted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventKind {
    StateChanged,
    StateReplaced,
    LoopStarted,
    LoopStopped,
    Warning,
}

/// A generic event sink that accepts [`SceneEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: SceneEvent);

    /// Whether events of `kind` should be built at all.
    fn wants(&self, _kind: SceneEventKind) -> bool {
        true
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: SceneEvent) {}

    #[inline]
    fn wants(&self, _kind: SceneEventKind) -> bool {
        false
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    #[inline]
    fn send(&mut self, event: SceneEvent) {
        (**self).send(event);
    }

    #[inline]
    fn wants(&self, kind: SceneEventKind) -> bool {
        (**self).wants(kind)
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(SceneEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(SceneEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(SceneEvent),
{
    #[inline]
    fn send(&mut self, event: SceneEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<SceneEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<SceneEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[SceneEvent] {
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

    /// Number of collected events of `kind`.
    pub fn count(&self, kind: SceneEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: SceneEvent) {
        self.events.push(event);
    }
}
