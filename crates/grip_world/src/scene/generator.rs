//! Random scene population.
//!
//! [`Generator`] places randomly chosen shapes at free whole-step positions, optionally
//! mirrors each placed object as a matching target elsewhere, and drops grippers at
//! random in-bounds points. All randomness flows through the caller's [`RngCore`], so a
//! seeded generator reproduces the same scene.
use glam::Vec2;
use rand::Rng as RngCore;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::grid::GridConfig;
use crate::model::{BlockMatrix, Gripper, GripperId, Kind, Object, ObjectId, ShapeLibrary};
use crate::scene::Scene;

/// Colors used when none are configured.
pub const DEFAULT_COLORS: [&str; 8] = [
    "red", "orange", "yellow", "green", "blue", "purple", "pink", "grey",
];

/// Configuration of a [`Generator`].
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Shapes available for placement.
    pub shapes: ShapeLibrary,
    /// Kinds to draw from; empty means every kind in `shapes`.
    pub kinds: Vec<Kind>,
    pub colors: Vec<String>,
    /// Number of objects to place.
    pub object_count: usize,
    /// Ids of grippers to create.
    pub grippers: Vec<GripperId>,
    pub allow_rotation: bool,
    pub allow_mirroring: bool,
    /// Also place a matching target for every placed object.
    pub with_targets: bool,
    /// Placement attempts per object before it is skipped.
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            shapes: ShapeLibrary::pentominoes(),
            kinds: Vec::new(),
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
            object_count: 5,
            grippers: Vec::new(),
            allow_rotation: true,
            allow_mirroring: true,
            with_targets: false,
            max_attempts: 100,
        }
    }
}

impl GeneratorConfig {
    pub fn new(object_count: usize) -> Self {
        Self {
            object_count,
            ..Default::default()
        }
    }

    pub fn with_shapes(mut self, shapes: ShapeLibrary) -> Self {
        self.shapes = shapes;
        self
    }

    pub fn with_kinds<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Kind>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_colors<I, C>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_grippers<I, G>(mut self, grippers: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GripperId>,
    {
        self.grippers = grippers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rotation(mut self, allow_rotation: bool) -> Self {
        self.allow_rotation = allow_rotation;
        self
    }

    pub fn with_mirroring(mut self, allow_mirroring: bool) -> Self {
        self.allow_mirroring = allow_mirroring;
        self
    }

    pub fn with_targets(mut self, with_targets: bool) -> Self {
        self.with_targets = with_targets;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.shapes.is_empty() {
            return Err(Error::InvalidConfig("shape library is empty".into()));
        }
        if let Some(kind) = self.kinds.iter().find(|k| !self.shapes.contains(k)) {
            return Err(Error::MissingShape { kind: kind.clone() });
        }
        if self.colors.is_empty() {
            return Err(Error::InvalidConfig("at least one color is required".into()));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be > 0".into()));
        }
        Ok(())
    }
}

/// What [`Generator::populate`] actually placed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub objects: Vec<ObjectId>,
    pub targets: Vec<ObjectId>,
    pub grippers: Vec<GripperId>,
    /// Objects or targets that found no free position.
    pub skipped: usize,
}

/// Random scene populator.
#[derive(Clone, Debug)]
pub struct Generator {
    config: GeneratorConfig,
    kinds: Vec<Kind>,
}

impl Generator {
    pub fn try_new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let kinds = if config.kinds.is_empty() {
            config.shapes.kinds().cloned().collect()
        } else {
            config.kinds.clone()
        };
        Ok(Self { config, kinds })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Adds objects, targets and grippers to `scene` without removing anything.
    ///
    /// Objects that find no free position within `max_attempts` are skipped with a
    /// warning rather than failing the whole run.
    pub fn populate<R: RngCore>(&self, scene: &mut Scene, rng: &mut R) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        let mut next_id = 0usize;

        for _ in 0..self.config.object_count {
            let id = next_free_id(scene, &mut next_id);
            let object = self.random_object(id, rng)?;

            let Some(anchor) = self.find_anchor(scene, &object, false, rng) else {
                warn!(
                    "Could not place object '{}' ({}) after {} attempts; skipping.",
                    object.id, object.kind, self.config.max_attempts
                );
                report.skipped += 1;
                continue;
            };
            let object = object.at(anchor);

            if self.config.with_targets {
                match self.find_anchor(scene, &object, true, rng) {
                    Some(target_anchor) => {
                        scene.add_target(object.clone().at(target_anchor), true)?;
                        report.targets.push(object.id.clone());
                    }
                    None => {
                        warn!(
                            "Could not place target for '{}' after {} attempts; skipping.",
                            object.id, self.config.max_attempts
                        );
                        report.skipped += 1;
                    }
                }
            }

            report.objects.push(object.id.clone());
            scene.add_object(object, true)?;
        }

        for id in &self.config.grippers {
            if scene.gripper(id).is_some() {
                warn!("Gripper '{}' already exists; not regenerated.", id);
                continue;
            }
            let position = random_lattice_point(scene.config().grid, rng);
            scene.add_gripper(Gripper::new(id.clone(), position))?;
            report.grippers.push(id.clone());
        }

        info!(
            "Generated {} objects, {} targets, {} grippers ({} skipped).",
            report.objects.len(),
            report.targets.len(),
            report.grippers.len(),
            report.skipped
        );
        Ok(report)
    }

    fn random_object(&self, id: ObjectId, rng: &mut dyn RngCore) -> Result<Object> {
        let kind = &self.kinds[pick_index(rng, self.kinds.len())];
        let color = &self.config.colors[pick_index(rng, self.config.colors.len())];
        let matrix: BlockMatrix = self.config.shapes.get(kind)?.clone();
        let mut object = Object::new(id, kind.clone(), matrix).with_color(color.clone());
        if self.config.allow_rotation {
            object = object.rotated(pick_index(rng, 4) as f32 * 90.0);
        }
        if self.config.allow_mirroring && rand01(rng) < 0.5 {
            object = object.flipped();
        }
        Ok(object)
    }

    fn find_anchor(
        &self,
        scene: &Scene,
        object: &Object,
        target_layer: bool,
        rng: &mut dyn RngCore,
    ) -> Option<Vec2> {
        let grid = scene.config().grid;
        let layer = if target_layer {
            scene.target_grid()
        } else {
            scene.object_grid()
        };
        let matrix = object.block_matrix();
        let xs = anchor_count(grid.width, matrix.width(), grid.move_step)?;
        let ys = anchor_count(grid.height, matrix.height(), grid.move_step)?;
        (0..self.config.max_attempts)
            .map(|_| {
                Vec2::new(
                    pick_index(rng, xs) as f32 * grid.move_step,
                    pick_index(rng, ys) as f32 * grid.move_step,
                )
            })
            .find(|anchor| layer.is_legal_position(matrix.occupied(*anchor), None))
    }
}

/// Number of step-lattice anchors at which an extent of `size` cells fits in `cells`.
fn anchor_count(cells: u32, size: usize, step: f32) -> Option<usize> {
    let room = cells as f32 - size as f32;
    if room < 0.0 {
        return None;
    }
    Some((room / step).floor() as usize + 1)
}

fn random_lattice_point(grid: GridConfig, rng: &mut dyn RngCore) -> Vec2 {
    let xs = (grid.width as f32 / grid.move_step).ceil() as usize;
    let ys = (grid.height as f32 / grid.move_step).ceil() as usize;
    Vec2::new(
        pick_index(rng, xs) as f32 * grid.move_step,
        pick_index(rng, ys) as f32 * grid.move_step,
    )
}

fn next_free_id(scene: &Scene, next: &mut usize) -> ObjectId {
    loop {
        let id = next.to_string();
        *next += 1;
        if scene.object(&id).is_none() && scene.target(&id).is_none() {
            return id;
        }
    }
}

#[inline]
fn rand01(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

#[inline]
fn pick_index(rng: &mut dyn RngCore, len: usize) -> usize {
    ((rand01(rng) * len as f32) as usize).min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneConfig;
    use rand::{rngs::StdRng, SeedableRng};

    fn scene(width: u32, height: u32) -> Scene {
        Scene::new(SceneConfig::new(GridConfig::new(width, height))).unwrap()
    }

    #[test]
    fn validate_rejects_unknown_kinds_and_empty_colors() {
        let missing = GeneratorConfig::new(3).with_kinds(["Q"]);
        assert!(matches!(
            Generator::try_new(missing),
            Err(Error::MissingShape { ref kind }) if kind == "Q"
        ));
        let no_colors = GeneratorConfig::new(3).with_colors(Vec::<String>::new());
        assert!(Generator::try_new(no_colors).is_err());
        let no_attempts = GeneratorConfig::new(3).with_max_attempts(0);
        assert!(Generator::try_new(no_attempts).is_err());
    }

    #[test]
    fn populate_places_non_overlapping_objects() {
        let generator = Generator::try_new(
            GeneratorConfig::new(6)
                .with_targets(true)
                .with_grippers(["p1", "p2"]),
        )
        .unwrap();
        let mut s = scene(20, 20);
        let mut rng = StdRng::seed_from_u64(7);
        let report = generator.populate(&mut s, &mut rng).unwrap();

        assert_eq!(report.objects.len(), 6);
        assert_eq!(s.objects().count(), report.objects.len());
        assert_eq!(s.targets().count(), report.targets.len());
        assert_eq!(report.grippers, vec!["p1".to_string(), "p2".to_string()]);
        for object in s.objects() {
            assert_eq!(object.position().x.fract(), 0.0);
            assert_eq!(object.position().y.fract(), 0.0);
            if let Some(target) = s.target(&object.id) {
                assert_eq!(target.kind, object.kind);
                assert_eq!(target.color, object.color);
                assert_eq!(target.block_matrix(), object.block_matrix());
            }
        }
        for gripper in s.grippers() {
            assert!(s.object_grid().contains(gripper.position()));
        }
        s.check_consistency().unwrap();
    }

    #[test]
    fn same_seed_same_scene() {
        let generator = Generator::try_new(GeneratorConfig::new(4).with_grippers(["g"])).unwrap();
        let mut a = scene(15, 15);
        let mut b = scene(15, 15);
        generator
            .populate(&mut a, &mut StdRng::seed_from_u64(42))
            .unwrap();
        generator
            .populate(&mut b, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn objects_that_do_not_fit_are_skipped() {
        let generator = Generator::try_new(GeneratorConfig::new(2).with_kinds(["I"])).unwrap();
        // "I" is five cells long and cannot fit a 3×3 grid in any orientation.
        let mut s = scene(3, 3);
        let report = generator
            .populate(&mut s, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(report.objects.is_empty());
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn ids_skip_existing_objects() {
        let generator = Generator::try_new(
            GeneratorConfig::new(1)
                .with_kinds(["X"])
                .with_rotation(false)
                .with_mirroring(false),
        )
        .unwrap();
        let mut s = scene(10, 10);
        let mut rng = StdRng::seed_from_u64(3);
        generator.populate(&mut s, &mut rng).unwrap();
        let report = generator.populate(&mut s, &mut rng).unwrap();
        assert_eq!(report.objects, vec!["1".to_string()]);
        assert_eq!(s.objects().count(), 2);
    }

    #[test]
    fn anchor_count_respects_extent_and_step() {
        assert_eq!(anchor_count(10, 3, 1.0), Some(8));
        assert_eq!(anchor_count(10, 3, 0.5), Some(15));
        assert_eq!(anchor_count(2, 3, 1.0), None);
    }
}
