//! Repeating actions driven by tokio timers.
//!
//! A loop is identified by `(ActionKind, GripperId)`; starting one for a pair that
//! already loops replaces it. Every handle carries a generation so a loop that ends
//! on its own only ever clears its own entry.
use std::collections::HashMap;
use std::sync::{Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::Error;
use crate::model::GripperId;
use crate::room::RoomCore;
use crate::scene::mover::{apply_movement, Action, ActionKind};
use crate::scene::SceneConfig;

/// Tick interval of looped rotate, flip and grip actions.
pub const AUXILIARY_INTERVAL: Duration = Duration::from_millis(500);

/// How often a looped action of `kind` fires.
pub fn interval_for(kind: ActionKind, config: &SceneConfig) -> Duration {
    match kind {
        ActionKind::Move => config.action_interval,
        ActionKind::Rotate | ActionKind::Flip | ActionKind::Grip => AUXILIARY_INTERVAL,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoopKey {
    pub kind: ActionKind,
    pub gripper: GripperId,
}

impl LoopKey {
    pub fn new(kind: ActionKind, gripper: impl Into<GripperId>) -> Self {
        Self {
            kind,
            gripper: gripper.into(),
        }
    }
}

#[derive(Debug)]
struct LoopHandle {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Active loops of one room.
#[derive(Debug, Default)]
pub struct LoopRegistry {
    loops: HashMap<LoopKey, LoopHandle>,
    next_generation: u64,
}

impl LoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn is_running(&self, kind: ActionKind, gripper: &str) -> bool {
        self.loops
            .get(&LoopKey::new(kind, gripper))
            .is_some_and(|l| !l.handle.is_finished())
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Registers `handle`, aborting any loop previously registered for `key`.
    pub(crate) fn start(&mut self, key: LoopKey, generation: u64, handle: JoinHandle<()>) {
        if let Some(prior) = self.loops.insert(key, LoopHandle { generation, handle }) {
            prior.handle.abort();
        }
    }

    /// Aborts the loop for `(kind, gripper)`. Returns whether one was registered.
    pub fn stop(&mut self, kind: ActionKind, gripper: &str) -> bool {
        match self.loops.remove(&LoopKey::new(kind, gripper)) {
            Some(l) => {
                l.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every loop driven by `gripper`, returning how many were stopped.
    pub fn stop_gripper(&mut self, gripper: &str) -> usize {
        let keys: Vec<LoopKey> = self
            .loops
            .keys()
            .filter(|k| k.gripper == gripper)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(l) = self.loops.remove(key) {
                l.handle.abort();
            }
        }
        keys.len()
    }

    /// Aborts every loop.
    pub fn reset(&mut self) {
        for (_, l) in self.loops.drain() {
            l.handle.abort();
        }
    }

    fn is_current(&self, key: &LoopKey, generation: u64) -> bool {
        self.loops
            .get(key)
            .is_some_and(|l| l.generation == generation)
    }

    /// Drops the entry for `key` if it still belongs to `generation`.
    fn forget(&mut self, key: &LoopKey, generation: u64) {
        if self.is_current(key, generation) {
            self.loops.remove(key);
        }
    }
}

impl Drop for LoopRegistry {
    fn drop(&mut self) {
        self.reset();
    }
}

enum Tick {
    Continue,
    Stop,
}

/// Body of a loop task: tick immediately, then every `period` until aborted or the
/// room is gone.
pub(crate) async fn run(
    core: Weak<Mutex<RoomCore>>,
    key: LoopKey,
    action: Action,
    period: Duration,
    generation: u64,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(core) = core.upgrade() else {
            debug!("Room of loop {:?} is gone; stopping.", key);
            break;
        };
        if let Tick::Stop = tick(&core, &key, &action, generation) {
            break;
        }
    }
}

fn tick(core: &Mutex<RoomCore>, key: &LoopKey, action: &Action, generation: u64) -> Tick {
    let Ok(mut guard) = core.lock() else {
        warn!("Room lock poisoned; loop {:?} stops.", key);
        return Tick::Stop;
    };
    let core = &mut *guard;
    // Replaced or stopped while waiting for the lock.
    if !core.loops.is_current(key, generation) {
        return Tick::Stop;
    }
    let result = apply_movement(&mut core.scene, &key.gripper, action, core.sink.as_mut());
    match core.settle(result) {
        Ok(_) => Tick::Continue,
        // The room is halted and its loops are already cancelled.
        Err(Error::Inconsistent(_)) => Tick::Stop,
        Err(err) => {
            warn!(
                "Loop {:?} of gripper '{}' stopped: {}",
                key.kind, key.gripper, err
            );
            core.loops.forget(key, generation);
            Tick::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::grid::GridConfig;
    use crate::scene::events::VecSink;
    use crate::scene::Scene;

    #[test]
    fn intervals_depend_on_action_kind() {
        let config = SceneConfig::new(GridConfig::default())
            .with_action_interval(Duration::from_millis(40));
        assert_eq!(
            interval_for(ActionKind::Move, &config),
            Duration::from_millis(40)
        );
        for kind in [ActionKind::Rotate, ActionKind::Flip, ActionKind::Grip] {
            assert_eq!(interval_for(kind, &config), AUXILIARY_INTERVAL);
        }
    }

    #[tokio::test]
    async fn start_replaces_and_stop_is_idempotent() {
        let mut registry = LoopRegistry::new();
        let first = tokio::spawn(std::future::pending::<()>());
        let g1 = registry.next_generation();
        registry.start(LoopKey::new(ActionKind::Move, "g"), g1, first);
        let second = tokio::spawn(std::future::pending::<()>());
        let g2 = registry.next_generation();
        registry.start(LoopKey::new(ActionKind::Move, "g"), g2, second);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_running(ActionKind::Move, "g"));

        assert!(registry.stop(ActionKind::Move, "g"));
        assert!(!registry.stop(ActionKind::Move, "g"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stop_gripper_only_touches_that_gripper() {
        let mut registry = LoopRegistry::new();
        for (kind, gripper) in [
            (ActionKind::Move, "a"),
            (ActionKind::Flip, "a"),
            (ActionKind::Move, "b"),
        ] {
            let generation = registry.next_generation();
            let handle = tokio::spawn(std::future::pending::<()>());
            registry.start(LoopKey::new(kind, gripper), generation, handle);
        }
        assert_eq!(registry.stop_gripper("a"), 2);
        assert!(registry.is_running(ActionKind::Move, "b"));
        registry.reset();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn lookup_miss_ends_loop_and_clears_its_entry() {
        let scene = Scene::new(SceneConfig::default()).unwrap();
        let core = Arc::new(Mutex::new(RoomCore::new(scene, Box::new(VecSink::new()))));
        let key = LoopKey::new(ActionKind::Move, "ghost");
        let generation = {
            let mut guard = core.lock().unwrap();
            let generation = guard.loops.next_generation();
            let placeholder = tokio::spawn(std::future::pending::<()>());
            guard.loops.start(key.clone(), generation, placeholder);
            generation
        };

        let outcome = tick(&core, &key, &Action::translate(1.0, 0.0), generation);
        assert!(matches!(outcome, Tick::Stop));
        assert!(core.lock().unwrap().loops.is_empty());
    }

    #[tokio::test]
    async fn desync_during_a_tick_halts_the_room() {
        use crate::model::{BlockMatrix, Gripper, Object};
        use glam::Vec2;

        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let dot = BlockMatrix::from_bits(&[[1u8]]).unwrap();
        scene
            .add_object(Object::new("1", "dot", dot).at(Vec2::ONE), true)
            .unwrap();
        scene.add_gripper(Gripper::new("g", Vec2::ONE)).unwrap();
        scene.grip("g", "1").unwrap();
        scene.object_grid_mut().clear();

        let core = Arc::new(Mutex::new(RoomCore::new(scene, Box::new(VecSink::new()))));
        let key = LoopKey::new(ActionKind::Move, "g");
        let generation = {
            let mut guard = core.lock().unwrap();
            let generation = guard.loops.next_generation();
            let placeholder = tokio::spawn(std::future::pending::<()>());
            guard.loops.start(key.clone(), generation, placeholder);
            generation
        };

        let outcome = tick(&core, &key, &Action::translate(1.0, 0.0), generation);
        assert!(matches!(outcome, Tick::Stop));
        let guard = core.lock().unwrap();
        assert!(guard.is_halted());
        assert!(guard.loops.is_empty());
    }

    #[tokio::test]
    async fn stale_generation_does_not_tick() {
        let scene = Scene::new(SceneConfig::default()).unwrap();
        let core = Arc::new(Mutex::new(RoomCore::new(scene, Box::new(VecSink::new()))));
        let key = LoopKey::new(ActionKind::Move, "g");
        let outcome = tick(&core, &key, &Action::translate(1.0, 0.0), 7);
        assert!(matches!(outcome, Tick::Stop));
    }
}
