//! Scene state: the authoritative collections of objects, grippers and targets.
//!
//! [`Scene`] owns two [`OccupancyGrid`]s (objects and targets) and mediates every
//! structural mutation so that the grids always index exactly the current objects.
//! The raw mutators here do not check game-rule legality; that is the job of
//! [`mover`], which validates before it calls them.
use std::collections::BTreeMap;

use glam::Vec2;

use crate::error::{Error, Result};
use crate::grid::OccupancyGrid;
use crate::model::{Gripper, GripperId, Object, ObjectId};

pub mod config;
pub mod events;
pub mod generator;
pub mod mover;
pub mod snapshot;

pub use config::SceneConfig;
use snapshot::{GripperSnapshot, ObjectSnapshot, SceneSnapshot};

#[derive(Clone, Debug)]
pub struct Scene {
    config: SceneConfig,
    objects: BTreeMap<ObjectId, Object>,
    grippers: BTreeMap<GripperId, Gripper>,
    targets: BTreeMap<ObjectId, Object>,
    object_grid: OccupancyGrid,
    target_grid: OccupancyGrid,
}

impl Scene {
    /// Creates an empty scene. Configuration errors are fatal here.
    pub fn new(config: SceneConfig) -> Result<Self> {
        config.validate()?;
        let object_grid = OccupancyGrid::try_new(config.grid)?;
        let target_grid = OccupancyGrid::try_new(config.grid)?;
        Ok(Self {
            config,
            objects: BTreeMap::new(),
            grippers: BTreeMap::new(),
            targets: BTreeMap::new(),
            object_grid,
            target_grid,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn object(&self, id: &str) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn gripper(&self, id: &str) -> Option<&Gripper> {
        self.grippers.get(id)
    }

    pub fn grippers(&self) -> impl Iterator<Item = &Gripper> {
        self.grippers.values()
    }

    pub fn target(&self, id: &str) -> Option<&Object> {
        self.targets.get(id)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Object> {
        self.targets.values()
    }

    pub fn object_grid(&self) -> &OccupancyGrid {
        &self.object_grid
    }

    #[cfg(test)]
    pub(crate) fn object_grid_mut(&mut self) -> &mut OccupancyGrid {
        &mut self.object_grid
    }

    pub fn target_grid(&self) -> &OccupancyGrid {
        &self.target_grid
    }

    /// The gripper currently holding `object_id`, if any.
    pub fn holder_of(&self, object_id: &str) -> Option<&GripperId> {
        self.grippers
            .values()
            .find(|g| g.gripped().is_some_and(|o| o == object_id))
            .map(|g| &g.id)
    }

    /// Adds an object, optionally rejecting it when its cells are not a legal position.
    pub fn add_object(&mut self, mut object: Object, check_position: bool) -> Result<()> {
        if self.objects.contains_key(&object.id) {
            return Err(Error::DuplicateId { id: object.id });
        }
        if !object.position().is_finite() {
            return Err(Error::OutOfBounds { id: object.id });
        }
        if check_position
            && !self
                .object_grid
                .is_legal_position(object.occupied(), Some(&object.id))
        {
            return Err(Error::PositionOccupied { id: object.id });
        }
        object.set_gripped(false);
        self.object_grid.add(&object);
        self.objects.insert(object.id.clone(), object);
        Ok(())
    }

    /// Adds a target to the target layer.
    pub fn add_target(&mut self, mut target: Object, check_position: bool) -> Result<()> {
        if self.targets.contains_key(&target.id) {
            return Err(Error::DuplicateId { id: target.id });
        }
        if !target.position().is_finite() {
            return Err(Error::OutOfBounds { id: target.id });
        }
        if check_position
            && !self
                .target_grid
                .is_legal_position(target.occupied(), Some(&target.id))
        {
            return Err(Error::PositionOccupied { id: target.id });
        }
        target.set_gripped(false);
        self.target_grid.add(&target);
        self.targets.insert(target.id.clone(), target);
        Ok(())
    }

    /// Removes an object. A gripper holding it is released.
    pub fn remove_object(&mut self, id: &str) -> Result<Object> {
        let object = self
            .objects
            .get(id)
            .ok_or_else(|| Error::UnknownObject { id: id.to_owned() })?;
        self.object_grid.remove(object)?;
        let mut object = self
            .objects
            .remove(id)
            .ok_or_else(|| Error::UnknownObject { id: id.to_owned() })?;
        for gripper in self.grippers.values_mut() {
            if gripper.gripped().is_some_and(|o| o == id) {
                gripper.set_gripped(None);
            }
        }
        object.set_gripped(false);
        Ok(object)
    }

    pub fn remove_target(&mut self, id: &str) -> Result<Object> {
        let target = self
            .targets
            .get(id)
            .ok_or_else(|| Error::UnknownTarget { id: id.to_owned() })?;
        self.target_grid.remove(target)?;
        self.targets
            .remove(id)
            .ok_or_else(|| Error::UnknownTarget { id: id.to_owned() })
    }

    /// Grid center, snapped down to the step lattice.
    pub fn default_gripper_position(&self) -> Vec2 {
        let grid = &self.config.grid;
        let step = grid.move_step;
        Vec2::new(
            (grid.width as f32 / 2.0 / step).floor() * step,
            (grid.height as f32 / 2.0 / step).floor() * step,
        )
    }

    pub fn add_gripper(&mut self, gripper: Gripper) -> Result<()> {
        if self.grippers.contains_key(&gripper.id) {
            return Err(Error::DuplicateId { id: gripper.id });
        }
        if !self.object_grid.contains(gripper.position()) {
            return Err(Error::OutOfBounds { id: gripper.id });
        }
        self.grippers.insert(gripper.id.clone(), gripper);
        Ok(())
    }

    /// Removes a gripper, detaching any object it holds.
    pub fn remove_gripper(&mut self, id: &str) -> Result<Gripper> {
        let mut gripper = self
            .grippers
            .remove(id)
            .ok_or_else(|| Error::UnknownGripper { id: id.to_owned() })?;
        if let Some(held) = gripper.gripped() {
            if let Some(object) = self.objects.get_mut(held) {
                object.set_gripped(false);
            }
        }
        gripper.set_gripped(None);
        Ok(gripper)
    }

    /// Attaches `object_id` to `gripper_id`. Both must currently be free.
    pub fn grip(&mut self, gripper_id: &str, object_id: &str) -> Result<()> {
        let object = self
            .objects
            .get_mut(object_id)
            .ok_or_else(|| Error::UnknownObject {
                id: object_id.to_owned(),
            })?;
        let gripper = self
            .grippers
            .get_mut(gripper_id)
            .ok_or_else(|| Error::UnknownGripper {
                id: gripper_id.to_owned(),
            })?;
        if let Some(held) = gripper.gripped() {
            return Err(Error::Inconsistent(format!(
                "gripper '{gripper_id}' already holds '{held}'"
            )));
        }
        if object.gripped() {
            return Err(Error::Inconsistent(format!(
                "object '{object_id}' is already held"
            )));
        }
        object.set_gripped(true);
        gripper.set_gripped(Some(object_id.to_owned()));
        Ok(())
    }

    /// Detaches the held object from `gripper_id`, returning its id.
    pub fn ungrip(&mut self, gripper_id: &str) -> Result<ObjectId> {
        let gripper = self
            .grippers
            .get_mut(gripper_id)
            .ok_or_else(|| Error::UnknownGripper {
                id: gripper_id.to_owned(),
            })?;
        let Some(held) = gripper.gripped().cloned() else {
            return Err(Error::Inconsistent(format!(
                "gripper '{gripper_id}' holds nothing"
            )));
        };
        gripper.set_gripped(None);
        if let Some(object) = self.objects.get_mut(&held) {
            object.set_gripped(false);
        }
        Ok(held)
    }

    pub fn move_gripper(&mut self, id: &str, delta: Vec2) -> Result<()> {
        let gripper = self
            .grippers
            .get_mut(id)
            .ok_or_else(|| Error::UnknownGripper { id: id.to_owned() })?;
        gripper.translate(delta);
        Ok(())
    }

    pub fn move_object(&mut self, id: &str, delta: Vec2) -> Result<()> {
        self.reindex_object(id, |obj| obj.translate(delta))
    }

    pub fn move_object_to(&mut self, id: &str, position: Vec2) -> Result<()> {
        self.reindex_object(id, |obj| obj.set_position(position))
    }

    pub fn rotate_object(&mut self, id: &str, angle: f32) -> Result<()> {
        self.reindex_object(id, |obj| obj.rotate(angle))
    }

    pub fn flip_object(&mut self, id: &str) -> Result<()> {
        self.reindex_object(id, Object::flip)
    }

    /// Remove from the grid, mutate, reinsert. The object is never mutated while indexed.
    fn reindex_object(&mut self, id: &str, mutate: impl FnOnce(&mut Object)) -> Result<()> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| Error::UnknownObject { id: id.to_owned() })?;
        self.object_grid.remove(object)?;
        mutate(object);
        self.object_grid.add(object);
        Ok(())
    }

    /// Whether `object_id` exactly covers a target of the same kind and color.
    pub fn is_on_target(&self, object_id: &str) -> bool {
        let Some(object) = self.objects.get(object_id) else {
            return false;
        };
        let cells = self.object_grid.tile_indices(object.occupied());
        self.targets
            .values()
            .filter(|t| t.kind == object.kind && t.color == object.color)
            .any(|t| self.target_grid.tile_indices(t.occupied()) == cells)
    }

    /// Removes everything, keeping the configuration.
    pub fn reset(&mut self) {
        self.objects.clear();
        self.grippers.clear();
        self.targets.clear();
        self.object_grid.clear();
        self.target_grid.clear();
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            objects: self
                .objects
                .iter()
                .map(|(id, o)| (id.clone(), ObjectSnapshot::from(o)))
                .collect(),
            grippers: self
                .grippers
                .iter()
                .map(|(id, g)| (id.clone(), GripperSnapshot::from(g)))
                .collect(),
            targets: self
                .targets
                .iter()
                .map(|(id, t)| (id.clone(), ObjectSnapshot::from(t)))
                .collect(),
            grid_config: self.config.grid,
        }
    }

    /// Replaces the whole state with `snapshot`, keeping the gameplay rules.
    ///
    /// All or nothing: on error the current state is left untouched.
    pub fn load_state(&mut self, snapshot: &SceneSnapshot) -> Result<()> {
        let config = SceneConfig {
            grid: snapshot.grid_config,
            ..self.config.clone()
        };
        let mut scene = Scene::new(config)?;
        for (id, obj) in &snapshot.objects {
            scene.add_object(obj.to_object(id)?, false)?;
        }
        for (id, target) in &snapshot.targets {
            scene.add_target(target.to_object(id)?, false)?;
        }
        for (id, gr) in &snapshot.grippers {
            scene.add_gripper(Gripper::new(id.clone(), Vec2::new(gr.x, gr.y)))?;
            if let Some(held) = &gr.gripped {
                scene.grip(id, held)?;
            }
        }
        *self = scene;
        Ok(())
    }

    /// Verifies that both grids index exactly the current objects and that grip
    /// references are exclusive and mirrored by the objects' `gripped` flags.
    pub fn check_consistency(&self) -> Result<()> {
        check_layer(&self.object_grid, &self.objects)?;
        check_layer(&self.target_grid, &self.targets)?;

        let mut holders: BTreeMap<&str, &str> = BTreeMap::new();
        for gripper in self.grippers.values() {
            let Some(held) = gripper.gripped() else {
                continue;
            };
            let object = self.objects.get(held).ok_or_else(|| {
                Error::Inconsistent(format!(
                    "gripper '{}' holds unknown object '{held}'",
                    gripper.id
                ))
            })?;
            if !object.gripped() {
                return Err(Error::Inconsistent(format!(
                    "object '{held}' is held by '{}' but not flagged as gripped",
                    gripper.id
                )));
            }
            if let Some(other) = holders.insert(held, &gripper.id) {
                return Err(Error::Inconsistent(format!(
                    "object '{held}' is held by both '{other}' and '{}'",
                    gripper.id
                )));
            }
        }
        if let Some(orphan) = self
            .objects
            .values()
            .find(|o| o.gripped() && !holders.contains_key(o.id.as_str()))
        {
            return Err(Error::Inconsistent(format!(
                "object '{}' is flagged as gripped but no gripper holds it",
                orphan.id
            )));
        }
        Ok(())
    }
}

fn check_layer(grid: &OccupancyGrid, objects: &BTreeMap<ObjectId, Object>) -> Result<()> {
    let (fine_width, _) = grid.fine_size();
    for object in objects.values() {
        let expected: Vec<(usize, usize)> = grid
            .tile_indices(object.occupied())
            .into_iter()
            .map(|idx| (idx % fine_width, idx / fine_width))
            .collect();
        if grid.tiles_of(&object.id) != expected {
            return Err(Error::Inconsistent(format!(
                "grid tiles of '{}' do not match its occupied cells",
                object.id
            )));
        }
    }
    for tile in grid.tiles() {
        if let Some(stray) = tile.objects().iter().find(|id| !objects.contains_key(*id)) {
            return Err(Error::Inconsistent(format!(
                "tile ({}, {}) references unknown object '{stray}'",
                tile.x, tile.y
            )));
        }
    }
    Ok(())
}
