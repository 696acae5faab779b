//! Validated movement of grippers and held objects.
//!
//! [`apply_movement`] is the only place game rules are enforced: bounds, overlap,
//! target locking and snapping. It checks the hypothetical result first and commits
//! through the raw [`Scene`] mutators only when the whole action is legal, so a
//! rejected action leaves the scene untouched.
use glam::Vec2;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::convert::round5_vec;
use crate::model::{Object, ObjectId};
use crate::scene::events::{EventSink, SceneEvent, SceneEventKind};
use crate::scene::snapshot::SceneDelta;
use crate::scene::Scene;

/// Rotation applied per step when none is given.
pub const DEFAULT_ROTATION_STEP: f32 = 90.0;

/// A single player action.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type", rename_all = "snake_case")
)]
pub enum Action {
    /// Translate the gripper (and its held object) by whole steps.
    Move { x_steps: f32, y_steps: f32 },
    /// Rotate the held object by `direction × step` degrees.
    Rotate {
        direction: f32,
        #[cfg_attr(feature = "serde", serde(default = "default_rotation_step"))]
        step: f32,
    },
    /// Mirror the held object.
    Flip,
    /// Grip the topmost object under the gripper, or release the held one.
    Grip,
}

#[cfg(feature = "serde")]
fn default_rotation_step() -> f32 {
    DEFAULT_ROTATION_STEP
}

impl Action {
    /// Whether every numeric parameter is finite.
    pub fn is_finite(&self) -> bool {
        match *self {
            Action::Move { x_steps, y_steps } => x_steps.is_finite() && y_steps.is_finite(),
            Action::Rotate { direction, step } => (direction * step).is_finite(),
            Action::Flip | Action::Grip => true,
        }
    }

    pub fn translate(x_steps: f32, y_steps: f32) -> Self {
        Action::Move { x_steps, y_steps }
    }

    /// Rotation by one default step; `direction` is usually `1.0` or `-1.0`.
    pub fn rotate(direction: f32) -> Self {
        Action::Rotate {
            direction,
            step: DEFAULT_ROTATION_STEP,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move { .. } => ActionKind::Move,
            Action::Rotate { .. } => ActionKind::Rotate,
            Action::Flip => ActionKind::Flip,
            Action::Grip => ActionKind::Grip,
        }
    }
}

/// Discriminant of [`Action`]; loops are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ActionKind {
    Move,
    Rotate,
    Flip,
    Grip,
}

/// Why an action was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Rejection {
    /// Steps, direction or angle are NaN or infinite.
    NonFinite,
    /// The gripper would leave the grid.
    GripperOutOfBounds,
    /// The held object would leave the grid or overlap another object.
    Blocked,
    /// The held object sits on its matching target and may not move.
    LockedOnTarget,
    /// No whole-cell position next to the object is free for snapping.
    NoSnapPosition,
    /// The object under the gripper is held by someone else.
    AlreadyHeld,
}

/// Result of [`apply_movement`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ActionOutcome {
    /// A move, rotate or flip was committed.
    Applied,
    /// The gripper picked up the object.
    Gripped(ObjectId),
    /// The gripper released the object.
    Released(ObjectId),
    /// Grip with nothing under the gripper.
    Idle,
    Rejected(Rejection),
}

impl ActionOutcome {
    /// Whether the scene was mutated.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            ActionOutcome::Applied | ActionOutcome::Gripped(_) | ActionOutcome::Released(_)
        )
    }
}

enum Motion {
    Translate(Vec2),
    Rotate(f32),
    Flip,
}

impl Motion {
    fn delta(&self) -> Vec2 {
        match self {
            Motion::Translate(delta) => *delta,
            Motion::Rotate(_) | Motion::Flip => Vec2::ZERO,
        }
    }
}

/// Applies `action` on behalf of `gripper_id`.
///
/// Illegal actions are not errors: they return [`ActionOutcome::Rejected`] and leave the
/// scene untouched. Errors are reserved for unknown ids and broken internal state.
/// Every applied action emits exactly one [`SceneEvent::StateChanged`].
pub fn apply_movement(
    scene: &mut Scene,
    gripper_id: &str,
    action: &Action,
    sink: &mut dyn EventSink,
) -> Result<ActionOutcome> {
    if !action.is_finite() {
        debug!(
            "Action {:?} of gripper '{}' has non-finite parameters.",
            action, gripper_id
        );
        return Ok(ActionOutcome::Rejected(Rejection::NonFinite));
    }
    let motion = match *action {
        Action::Grip => return toggle_grip(scene, gripper_id, sink),
        Action::Move { x_steps, y_steps } => {
            let step = scene.config().grid.move_step;
            Motion::Translate(Vec2::new(x_steps.round() * step, y_steps.round() * step))
        }
        Action::Rotate { direction, step } => Motion::Rotate(direction * step),
        Action::Flip => Motion::Flip,
    };

    let gripper = scene
        .gripper(gripper_id)
        .ok_or_else(|| Error::UnknownGripper {
            id: gripper_id.to_owned(),
        })?;
    let delta = motion.delta();
    let target = round5_vec(gripper.position() + delta);
    if !scene.object_grid().contains(target) {
        debug!(
            "Gripper '{}' cannot move to ({}, {}): out of bounds.",
            gripper_id, target.x, target.y
        );
        return Ok(ActionOutcome::Rejected(Rejection::GripperOutOfBounds));
    }

    let Some(object_id) = gripper.gripped().cloned() else {
        if delta != Vec2::ZERO {
            scene.move_gripper(gripper_id, delta)?;
        }
        emit_changed(scene, sink, gripper_id, None);
        return Ok(ActionOutcome::Applied);
    };

    if let Some(rejection) = held_rejection(scene, &object_id, &motion)? {
        debug!(
            "Action {:?} of gripper '{}' on '{}' rejected: {:?}.",
            action.kind(),
            gripper_id,
            object_id,
            rejection
        );
        return Ok(ActionOutcome::Rejected(rejection));
    }

    match motion {
        Motion::Translate(delta) => {
            scene.move_gripper(gripper_id, delta)?;
            scene.move_object(&object_id, delta)?;
        }
        Motion::Rotate(angle) => scene.rotate_object(&object_id, angle)?,
        Motion::Flip => scene.flip_object(&object_id)?,
    }
    emit_changed(scene, sink, gripper_id, Some(&object_id));
    Ok(ActionOutcome::Applied)
}

/// Grips the topmost object under the gripper, or releases the held one.
///
/// With `snap_to_grid`, a released object at a fractional position is first moved to
/// the first legal whole-cell candidate (see [`snap_candidates`]); when none is legal the
/// release is rejected and the object stays gripped.
pub fn toggle_grip(
    scene: &mut Scene,
    gripper_id: &str,
    sink: &mut dyn EventSink,
) -> Result<ActionOutcome> {
    let gripper = scene
        .gripper(gripper_id)
        .ok_or_else(|| Error::UnknownGripper {
            id: gripper_id.to_owned(),
        })?;
    let position = gripper.position();

    if let Some(object_id) = gripper.gripped().cloned() {
        if scene.config().snap_to_grid {
            match snap_target(scene, &object_id)? {
                Snap::InPlace => {}
                Snap::To(anchor) => scene.move_object_to(&object_id, anchor)?,
                Snap::Impossible => {
                    debug!(
                        "No free whole-cell position to snap '{}' to; keeping it gripped.",
                        object_id
                    );
                    return Ok(ActionOutcome::Rejected(Rejection::NoSnapPosition));
                }
            }
        }
        let released = scene.ungrip(gripper_id)?;
        emit_changed(scene, sink, gripper_id, Some(&released));
        return Ok(ActionOutcome::Released(released));
    }

    let Some(object_id) = scene.object_grid().topmost(position).cloned() else {
        return Ok(ActionOutcome::Idle);
    };
    if scene.holder_of(&object_id).is_some() {
        debug!(
            "Object '{}' under gripper '{}' is already held.",
            object_id, gripper_id
        );
        return Ok(ActionOutcome::Rejected(Rejection::AlreadyHeld));
    }
    scene.grip(gripper_id, &object_id)?;
    emit_changed(scene, sink, gripper_id, Some(&object_id));
    Ok(ActionOutcome::Gripped(object_id))
}

/// Whole-cell anchors tried when snapping `position`, in order:
/// (⌊x⌋,⌊y⌋), (⌊x⌋,⌈y⌉), (⌈x⌉,⌊y⌋), (⌈x⌉,⌈y⌉), without duplicates.
pub fn snap_candidates(position: Vec2) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(4);
    for x in [position.x.floor(), position.x.ceil()] {
        for y in [position.y.floor(), position.y.ceil()] {
            let candidate = Vec2::new(x, y);
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
    }
    out
}

enum Snap {
    InPlace,
    To(Vec2),
    Impossible,
}

fn snap_target(scene: &Scene, object_id: &str) -> Result<Snap> {
    let object = held_object(scene, object_id)?;
    let position = object.position();
    if position.x.fract() == 0.0 && position.y.fract() == 0.0 {
        return Ok(Snap::InPlace);
    }
    let grid = scene.object_grid();
    Ok(snap_candidates(position)
        .into_iter()
        .find(|anchor| {
            grid.is_legal_position(object.block_matrix().occupied(*anchor), Some(object_id))
        })
        .map_or(Snap::Impossible, Snap::To))
}

fn held_rejection(scene: &Scene, object_id: &str, motion: &Motion) -> Result<Option<Rejection>> {
    let object = held_object(scene, object_id)?;
    if scene.config().lock_on_target && scene.is_on_target(object_id) {
        return Ok(Some(Rejection::LockedOnTarget));
    }
    let grid = scene.object_grid();
    let matrix = object.block_matrix();
    let legal = match motion {
        Motion::Translate(delta) => grid.is_legal_position(
            matrix.occupied(round5_vec(object.position() + *delta)),
            Some(object_id),
        ),
        Motion::Rotate(angle) => grid.is_legal_position(
            matrix.rotated(*angle).occupied(object.position()),
            Some(object_id),
        ),
        Motion::Flip => grid.is_legal_position(
            matrix.flipped().occupied(object.position()),
            Some(object_id),
        ),
    };
    Ok((!legal).then_some(Rejection::Blocked))
}

fn held_object<'a>(scene: &'a Scene, object_id: &str) -> Result<&'a Object> {
    scene.object(object_id).ok_or_else(|| {
        Error::Inconsistent(format!("held object '{object_id}' is not in the scene"))
    })
}

fn emit_changed(
    scene: &Scene,
    sink: &mut dyn EventSink,
    gripper_id: &str,
    object_id: Option<&str>,
) {
    if !sink.wants(SceneEventKind::StateChanged) {
        return;
    }
    let mut delta = SceneDelta::new();
    if let Some(gripper) = scene.gripper(gripper_id) {
        delta = delta.with_gripper(gripper);
    }
    if let Some(object) = object_id.and_then(|id| scene.object(id)) {
        delta = delta.with_object(object);
    }
    sink.send(SceneEvent::StateChanged { delta });
}
