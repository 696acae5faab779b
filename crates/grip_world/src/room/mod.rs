//! Rooms: one scene, its loops and its observers behind a single lock.
//!
//! A [`Room`] is the serialized mutation context of one scene. Every public call takes
//! the room lock for its whole duration, so movements, grips, additions and loop ticks
//! never interleave. Rooms are independent of each other; [`RoomRegistry`] creates and
//! destroys them as members join and leave.
//!
//! An [`Error::Inconsistent`] from any operation halts the room: loops are cancelled and
//! every later mutation fails with [`Error::Halted`] until `configure`, `reset` or
//! `load_state` replaces the scene.
use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec2;
use rand::Rng as RngCore;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::model::{Gripper, Object};
use crate::scene::events::{EventSink, SceneEvent, SceneEventKind};
use crate::scene::generator::{GenerationReport, Generator};
use crate::scene::mover::{self, Action, ActionKind, ActionOutcome};
use crate::scene::snapshot::{SceneDelta, SceneSnapshot};
use crate::scene::{Scene, SceneConfig};

pub mod channel;
pub mod loops;
pub mod registry;

pub use channel::{ChannelSink, RoomMessage};
pub use loops::{LoopKey, LoopRegistry};
pub use registry::RoomRegistry;

pub type RoomId = String;
pub type MemberId = String;

pub(crate) struct RoomCore {
    scene: Scene,
    loops: LoopRegistry,
    sink: Box<dyn EventSink + Send>,
    halted: Option<String>,
}

impl RoomCore {
    pub(crate) fn new(scene: Scene, sink: Box<dyn EventSink + Send>) -> Self {
        Self {
            scene,
            loops: LoopRegistry::new(),
            sink,
            halted: None,
        }
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Halts the room when `result` reports a consistency violation.
    pub(crate) fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(Error::Inconsistent(reason)) = &result {
            self.halt(reason.clone());
        }
        result
    }

    fn halt(&mut self, reason: String) {
        error!("Scene halted: {}", reason);
        self.loops.reset();
        if self.sink.wants(SceneEventKind::Warning) {
            self.sink.send(SceneEvent::Warning {
                context: "consistency".into(),
                message: reason.clone(),
            });
        }
        self.halted = Some(reason);
    }

    /// Cancels all loops and lifts a halt; called once the scene has been replaced.
    fn restart(&mut self) {
        self.loops.reset();
        self.halted = None;
    }

    fn emit_delta(&mut self, build: impl FnOnce(&Scene) -> SceneDelta) {
        if self.sink.wants(SceneEventKind::StateChanged) {
            let delta = build(&self.scene);
            self.sink.send(SceneEvent::StateChanged { delta });
        }
    }

    fn emit_replaced(&mut self) {
        if self.sink.wants(SceneEventKind::StateReplaced) {
            let state = self.scene.snapshot();
            self.sink.send(SceneEvent::StateReplaced { state });
        }
    }
}

/// A shared scene with its action loops and event sink.
pub struct Room {
    id: RoomId,
    core: Arc<Mutex<RoomCore>>,
}

impl Room {
    /// Creates a room with an empty scene. Invalid configuration is fatal.
    pub fn new(
        id: impl Into<RoomId>,
        config: SceneConfig,
        sink: Box<dyn EventSink + Send>,
    ) -> Result<Self> {
        let scene = Scene::new(config)?;
        Ok(Self {
            id: id.into(),
            core: Arc::new(Mutex::new(RoomCore::new(scene, sink))),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> Result<MutexGuard<'_, RoomCore>> {
        self.core.lock().map_err(|_| Error::Poisoned)
    }

    /// Locks for a mutation, refusing when the room is halted.
    fn lock_live(&self) -> Result<MutexGuard<'_, RoomCore>> {
        let core = self.lock()?;
        if let Some(reason) = &core.halted {
            return Err(Error::Halted {
                reason: reason.clone(),
            });
        }
        Ok(core)
    }

    pub fn is_halted(&self) -> Result<bool> {
        Ok(self.lock()?.is_halted())
    }

    /// Runs `f` against the current scene under the room lock.
    pub fn with_scene<T>(&self, f: impl FnOnce(&Scene) -> T) -> Result<T> {
        Ok(f(&self.lock()?.scene))
    }

    pub fn get_state(&self) -> Result<SceneSnapshot> {
        self.with_scene(Scene::snapshot)
    }

    pub fn config(&self) -> Result<SceneConfig> {
        self.with_scene(|s| s.config().clone())
    }

    /// Replaces the scene with an empty one using `config`. Cancels all loops.
    pub fn configure(&self, config: SceneConfig) -> Result<()> {
        let scene = Scene::new(config)?;
        let mut core = self.lock()?;
        core.scene = scene;
        core.restart();
        info!(
            "Room '{}' configured: {}x{} grid, step {}.",
            self.id,
            core.scene.config().grid.width,
            core.scene.config().grid.height,
            core.scene.config().grid.move_step
        );
        core.emit_replaced();
        Ok(())
    }

    /// Clears all objects, targets and grippers. Cancels all loops.
    pub fn reset(&self) -> Result<()> {
        let mut core = self.lock()?;
        core.scene.reset();
        core.restart();
        core.emit_replaced();
        Ok(())
    }

    /// Replaces the state with `snapshot`. Cancels all loops; on error nothing changes.
    pub fn load_state(&self, snapshot: &SceneSnapshot) -> Result<()> {
        let mut core = self.lock()?;
        core.scene.load_state(snapshot)?;
        core.restart();
        core.emit_replaced();
        Ok(())
    }

    pub fn add_object(&self, object: Object, check_position: bool) -> Result<()> {
        let id = object.id.clone();
        let mut core = self.lock_live()?;
        let result = core.scene.add_object(object, check_position);
        core.settle(result)?;
        core.emit_delta(|scene| match scene.object(&id) {
            Some(obj) => SceneDelta::new().with_object(obj),
            None => SceneDelta::new(),
        });
        Ok(())
    }

    pub fn add_target(&self, target: Object, check_position: bool) -> Result<()> {
        let id = target.id.clone();
        let mut core = self.lock_live()?;
        let result = core.scene.add_target(target, check_position);
        core.settle(result)?;
        core.emit_delta(|scene| match scene.target(&id) {
            Some(t) => SceneDelta::new().with_target(t),
            None => SceneDelta::new(),
        });
        Ok(())
    }

    /// Removes an object, releasing the gripper that held it.
    pub fn remove_object(&self, id: &str) -> Result<Object> {
        let mut core = self.lock_live()?;
        let holder = core.scene.holder_of(id).cloned();
        let result = core.scene.remove_object(id);
        let object = core.settle(result)?;
        core.emit_delta(|scene| {
            let mut delta = SceneDelta::new();
            delta.removed_objects.push(object.id.clone());
            if let Some(gripper) = holder.as_deref().and_then(|g| scene.gripper(g)) {
                delta = delta.with_gripper(gripper);
            }
            delta
        });
        Ok(object)
    }

    pub fn remove_target(&self, id: &str) -> Result<Object> {
        let mut core = self.lock_live()?;
        let result = core.scene.remove_target(id);
        let target = core.settle(result)?;
        core.emit_delta(|_| {
            let mut delta = SceneDelta::new();
            delta.removed_targets.push(target.id.clone());
            delta
        });
        Ok(target)
    }

    /// Adds a gripper at `position`, or at the grid center when `None`.
    pub fn add_gripper(&self, id: &str, position: Option<Vec2>) -> Result<Vec2> {
        let mut core = self.lock_live()?;
        let position = position.unwrap_or_else(|| core.scene.default_gripper_position());
        let result = core.scene.add_gripper(Gripper::new(id, position));
        core.settle(result)?;
        core.emit_delta(|scene| match scene.gripper(id) {
            Some(g) => SceneDelta::new().with_gripper(g),
            None => SceneDelta::new(),
        });
        Ok(position)
    }

    /// Removes a gripper and stops its loops. A held object stays where it is.
    pub fn remove_gripper(&self, id: &str) -> Result<()> {
        let mut core = self.lock_live()?;
        let held = core.scene.gripper(id).and_then(|g| g.gripped().cloned());
        let result = core.scene.remove_gripper(id);
        core.settle(result)?;
        let stopped = core.loops.stop_gripper(id);
        if stopped > 0 {
            info!("Stopped {} loop(s) of removed gripper '{}'.", stopped, id);
        }
        core.emit_delta(|scene| {
            let mut delta = SceneDelta::new();
            delta.removed_grippers.push(id.to_owned());
            if let Some(obj) = held.as_deref().and_then(|o| scene.object(o)) {
                delta = delta.with_object(obj);
            }
            delta
        });
        Ok(())
    }

    /// Applies a single action; see [`mover::apply_movement`].
    pub fn apply_movement(&self, gripper_id: &str, action: &Action) -> Result<ActionOutcome> {
        let mut core = self.lock_live()?;
        let core = &mut *core;
        let result =
            mover::apply_movement(&mut core.scene, gripper_id, action, core.sink.as_mut());
        core.settle(result)
    }

    /// Grips or releases; see [`mover::toggle_grip`].
    pub fn grip(&self, gripper_id: &str) -> Result<ActionOutcome> {
        let mut core = self.lock_live()?;
        let core = &mut *core;
        let result = mover::toggle_grip(&mut core.scene, gripper_id, core.sink.as_mut());
        core.settle(result)
    }

    /// Repeats `action` for `gripper_id`: once now, then every
    /// [`loops::interval_for`] until stopped. Replaces a loop of the same kind.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_loop(&self, gripper_id: &str, action: Action) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let mut core = self.lock_live()?;
        if core.scene.gripper(gripper_id).is_none() {
            return Err(Error::UnknownGripper {
                id: gripper_id.to_owned(),
            });
        }
        let kind = action.kind();
        let period = loops::interval_for(kind, core.scene.config());
        let generation = core.loops.next_generation();
        let key = LoopKey::new(kind, gripper_id);
        let handle = runtime.spawn(loops::run(
            Arc::downgrade(&self.core),
            key.clone(),
            action,
            period,
            generation,
        ));
        core.loops.start(key, generation, handle);
        if core.sink.wants(SceneEventKind::LoopStarted) {
            core.sink.send(SceneEvent::LoopStarted {
                action: kind,
                gripper: gripper_id.to_owned(),
            });
        }
        Ok(())
    }

    /// Stops the loop for `(kind, gripper_id)`. Returns whether one was running.
    pub fn stop_loop(&self, gripper_id: &str, kind: ActionKind) -> Result<bool> {
        let mut core = self.lock()?;
        let stopped = core.loops.stop(kind, gripper_id);
        if stopped && core.sink.wants(SceneEventKind::LoopStopped) {
            core.sink.send(SceneEvent::LoopStopped {
                action: kind,
                gripper: gripper_id.to_owned(),
            });
        }
        Ok(stopped)
    }

    pub fn reset_loops(&self) -> Result<()> {
        self.lock()?.loops.reset();
        Ok(())
    }

    pub fn is_looping(&self, gripper_id: &str, kind: ActionKind) -> Result<bool> {
        Ok(self.lock()?.loops.is_running(kind, gripper_id))
    }

    /// Populates the scene with `generator` and announces the new state.
    pub fn generate<R: RngCore>(&self, generator: &Generator, rng: &mut R) -> Result<GenerationReport> {
        let mut core = self.lock_live()?;
        let result = generator.populate(&mut core.scene, rng);
        let report = core.settle(result)?;
        if report.skipped > 0 && core.sink.wants(SceneEventKind::Warning) {
            core.sink.send(SceneEvent::Warning {
                context: "generator".into(),
                message: format!("{} placement(s) skipped", report.skipped),
            });
        }
        core.emit_replaced();
        Ok(report)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room").field("id", &self.id).finish_non_exhaustive()
    }
}
