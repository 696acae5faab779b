//! Objects and grippers placed in a scene.
use glam::Vec2;

use crate::grid::convert::round5_vec;
use crate::model::shape::{normalize_rotation, quarter_turns, BlockMatrix};
use crate::model::{GripperId, Kind, ObjectId};

/// A polyomino-like object: an immutable type plus a mutable pose.
///
/// `position` is the top-left anchor of the block matrix's bounding box in cell units.
/// The block matrix always reflects the current rotation and mirroring, so width and
/// height are derived from it rather than stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub id: ObjectId,
    pub kind: Kind,
    pub color: String,
    position: Vec2,
    rotation: u16,
    mirrored: bool,
    block_matrix: BlockMatrix,
    gripped: bool,
}

impl Object {
    /// Creates an unrotated, unmirrored object at the origin.
    pub fn new(id: impl Into<ObjectId>, kind: impl Into<Kind>, block_matrix: BlockMatrix) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            color: String::new(),
            position: Vec2::ZERO,
            rotation: 0,
            mirrored: false,
            block_matrix,
            gripped: false,
        }
    }

    /// Restores an object whose matrix already reflects `rotation` and `mirrored`.
    pub(crate) fn from_parts(
        id: ObjectId,
        kind: Kind,
        color: String,
        position: Vec2,
        rotation: u16,
        mirrored: bool,
        block_matrix: BlockMatrix,
    ) -> Self {
        Self {
            id,
            kind,
            color,
            position,
            rotation: normalize_rotation(rotation as f32),
            mirrored,
            block_matrix,
            gripped: false,
        }
    }

    /// Sets the anchor position.
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = round5_vec(position);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Rotates the shape clockwise by `angle` degrees.
    pub fn rotated(mut self, angle: f32) -> Self {
        self.rotate(angle);
        self
    }

    /// Mirrors the shape.
    pub fn flipped(mut self) -> Self {
        self.flip();
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn block_matrix(&self) -> &BlockMatrix {
        &self.block_matrix
    }

    pub fn gripped(&self) -> bool {
        self.gripped
    }

    pub fn width(&self) -> usize {
        self.block_matrix.width()
    }

    pub fn height(&self) -> usize {
        self.block_matrix.height()
    }

    /// Cells covered at the current pose.
    pub fn occupied(&self) -> impl Iterator<Item = Vec2> + Clone + '_ {
        self.block_matrix.occupied(self.position)
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.position = round5_vec(self.position + delta);
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = round5_vec(position);
    }

    pub(crate) fn set_gripped(&mut self, gripped: bool) {
        self.gripped = gripped;
    }

    /// Rotates matrix and bookkeeping together.
    pub(crate) fn rotate(&mut self, angle: f32) {
        let turns = quarter_turns(angle);
        if turns == 0 {
            return;
        }
        self.block_matrix = self.block_matrix.rotated(angle).into_owned();
        self.rotation = (self.rotation + turns as u16 * 90) % 360;
    }

    /// Flips matrix and bookkeeping together.
    pub(crate) fn flip(&mut self) {
        self.block_matrix = self.block_matrix.flipped();
        self.mirrored = !self.mirrored;
    }
}

/// A point-like actuator with a fixed 1×1 footprint that holds at most one object.
#[derive(Clone, Debug, PartialEq)]
pub struct Gripper {
    pub id: GripperId,
    position: Vec2,
    gripped: Option<ObjectId>,
}

impl Gripper {
    pub fn new(id: impl Into<GripperId>, position: Vec2) -> Self {
        Self {
            id: id.into(),
            position: round5_vec(position),
            gripped: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Id of the held object, if any.
    pub fn gripped(&self) -> Option<&ObjectId> {
        self.gripped.as_ref()
    }

    /// The single cell covered by the gripper.
    pub fn occupied(&self) -> impl Iterator<Item = Vec2> {
        std::iter::once(self.position)
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.position = round5_vec(self.position + delta);
    }

    pub(crate) fn set_gripped(&mut self, gripped: Option<ObjectId>) {
        self.gripped = gripped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_object() -> Object {
        let matrix = BlockMatrix::from_bits(&[[1u8, 0], [1, 0], [1, 1]]).unwrap();
        Object::new("1", "L", matrix).at(Vec2::new(2.0, 3.0))
    }

    #[test]
    fn rotation_updates_matrix_and_angle_together() {
        let mut obj = l_object();
        let original = obj.block_matrix().clone();
        obj.rotate(-90.0);
        assert_eq!(obj.rotation(), 270);
        assert_eq!(obj.block_matrix(), &*original.rotated(-90.0));
        assert_eq!((obj.width(), obj.height()), (3, 2));

        for _ in 0..3 {
            obj.rotate(-90.0);
        }
        assert_eq!(obj.rotation(), 0);
        assert_eq!(obj.block_matrix(), &original);
    }

    #[test]
    fn flip_toggles_mirrored() {
        let mut obj = l_object();
        obj.flip();
        assert!(obj.mirrored());
        obj.flip();
        assert!(!obj.mirrored());
        assert_eq!(obj.block_matrix(), l_object().block_matrix());
    }

    #[test]
    fn occupied_uses_current_pose() {
        let obj = l_object();
        let cells: Vec<Vec2> = obj.occupied().collect();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], Vec2::new(2.0, 3.0));
        assert_eq!(cells[3], Vec2::new(3.0, 5.0));
    }

    #[test]
    fn gripper_occupies_its_point() {
        let gripper = Gripper::new("g", Vec2::new(1.5, 2.0));
        assert_eq!(gripper.occupied().collect::<Vec<_>>(), vec![Vec2::new(1.5, 2.0)]);
        assert!(gripper.gripped().is_none());
    }
}
