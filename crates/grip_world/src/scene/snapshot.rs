//! Plain-data views of a scene, used for state notifications and `load_state`.
//!
//! The shape mirrors what a transport layer serializes:
//! `{objects: {id → {type, x, y, rotation, mirrored, color, block_matrix, gripped}},
//! grippers: {id → {x, y, gripped}}, targets: {id → …}, grid_config}`.
use std::collections::BTreeMap;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::GridConfig;
use crate::model::{BlockMatrix, Gripper, GripperId, Kind, Object, ObjectId};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectSnapshot {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: Kind,
    pub x: f32,
    pub y: f32,
    pub rotation: u16,
    pub mirrored: bool,
    pub color: String,
    pub block_matrix: Vec<Vec<u8>>,
    pub gripped: bool,
}

impl From<&Object> for ObjectSnapshot {
    fn from(obj: &Object) -> Self {
        Self {
            kind: obj.kind.clone(),
            x: obj.position().x,
            y: obj.position().y,
            rotation: obj.rotation(),
            mirrored: obj.mirrored(),
            color: obj.color.clone(),
            block_matrix: obj.block_matrix().to_bits(),
            gripped: obj.gripped(),
        }
    }
}

impl ObjectSnapshot {
    /// Rebuilds the object. The `gripped` flag is not restored; it follows the grippers.
    pub fn to_object(&self, id: &str) -> Result<Object> {
        let matrix = BlockMatrix::from_bits(self.block_matrix.as_slice())?;
        Ok(Object::from_parts(
            id.to_owned(),
            self.kind.clone(),
            self.color.clone(),
            Vec2::new(self.x, self.y),
            self.rotation,
            self.mirrored,
            matrix,
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GripperSnapshot {
    pub x: f32,
    pub y: f32,
    pub gripped: Option<ObjectId>,
}

impl From<&Gripper> for GripperSnapshot {
    fn from(gr: &Gripper) -> Self {
        Self {
            x: gr.position().x,
            y: gr.position().y,
            gripped: gr.gripped().cloned(),
        }
    }
}

/// Full serializable state of a scene.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneSnapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub objects: BTreeMap<ObjectId, ObjectSnapshot>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub grippers: BTreeMap<GripperId, GripperSnapshot>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: BTreeMap<ObjectId, ObjectSnapshot>,
    pub grid_config: GridConfig,
}

impl SceneSnapshot {
    pub fn empty(grid_config: GridConfig) -> Self {
        Self {
            objects: BTreeMap::new(),
            grippers: BTreeMap::new(),
            targets: BTreeMap::new(),
            grid_config,
        }
    }
}

/// Incremental change set: entries that were added or modified, and ids that were removed.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneDelta {
    pub objects: BTreeMap<ObjectId, ObjectSnapshot>,
    pub grippers: BTreeMap<GripperId, GripperSnapshot>,
    pub targets: BTreeMap<ObjectId, ObjectSnapshot>,
    pub removed_objects: Vec<ObjectId>,
    pub removed_grippers: Vec<GripperId>,
    pub removed_targets: Vec<ObjectId>,
}

impl SceneDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, obj: &Object) -> Self {
        self.objects.insert(obj.id.clone(), obj.into());
        self
    }

    pub fn with_target(mut self, target: &Object) -> Self {
        self.targets.insert(target.id.clone(), target.into());
        self
    }

    pub fn with_gripper(mut self, gr: &Gripper) -> Self {
        self.grippers.insert(gr.id.clone(), gr.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.grippers.is_empty()
            && self.targets.is_empty()
            && self.removed_objects.is_empty()
            && self.removed_grippers.is_empty()
            && self.removed_targets.is_empty()
    }
}
