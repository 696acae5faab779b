//! Occupancy grid indexing which objects cover which tiles.
//!
//! This module defines [`GridConfig`], [`Tile`] and [`OccupancyGrid`]. The grid works at
//! fine resolution (see [`convert::Resolution`]): a `width × height` grid with a step of
//! `0.5` holds `2·width × 2·height` tiles. It is a pure index over the objects placed in a
//! [`crate::scene::Scene`] and never the source of truth for positions.
use glam::Vec2;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Object, ObjectId};

pub mod convert;

use convert::{round5, Resolution};

/// Upper bound on the fine tiles of one grid layer (`width·m × height·m`).
pub const MAX_FINE_TILES: usize = 1 << 24;

/// Dimensions and rules of a grid. Immutable for the lifetime of a scene.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// Width in whole cells.
    pub width: u32,
    /// Height in whole cells.
    pub height: u32,
    /// Distance moved per step; values below 1 subdivide cells.
    pub move_step: f32,
    /// Reject positions where objects would share a tile.
    pub prevent_overlap: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            move_step: 1.0,
            prevent_overlap: true,
        }
    }
}

impl GridConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_move_step(mut self, move_step: f32) -> Self {
        self.move_step = move_step;
        self
    }

    pub fn with_prevent_overlap(mut self, prevent_overlap: bool) -> Self {
        self.prevent_overlap = prevent_overlap;
        self
    }

    /// Validates the configuration, returning the resolution it implies.
    ///
    /// Grids whose fine tile count exceeds [`MAX_FINE_TILES`] are rejected.
    pub fn validate(&self) -> Result<Resolution> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(
                "grid width and height must be > 0".into(),
            ));
        }
        let resolution = Resolution::try_new(self.move_step)?;
        self.fine_tile_count(resolution)
            .filter(|&n| n <= MAX_FINE_TILES)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "{}x{} grid with move_step {} exceeds {} fine tiles",
                    self.width, self.height, self.move_step, MAX_FINE_TILES
                ))
            })?;
        Ok(resolution)
    }

    fn fine_tile_count(&self, resolution: Resolution) -> Option<usize> {
        let m = resolution.multiplier() as usize;
        let w = (self.width as usize).checked_mul(m)?;
        let h = (self.height as usize).checked_mul(m)?;
        w.checked_mul(h)
    }
}

/// One fine-resolution tile and the objects covering it, bottom to top.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    objects: Vec<ObjectId>,
}

impl Tile {
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The most recently added object.
    pub fn topmost(&self) -> Option<&ObjectId> {
        self.objects.last()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.iter().any(|o| o == id)
    }
}

/// Fine-resolution tile index of a scene layer.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    config: GridConfig,
    resolution: Resolution,
    fine_width: usize,
    fine_height: usize,
    tiles: Vec<Tile>,
}

impl OccupancyGrid {
    pub fn try_new(config: GridConfig) -> Result<Self> {
        let resolution = config.validate()?;
        let m = resolution.multiplier() as usize;
        let fine_width = config.width as usize * m;
        let fine_height = config.height as usize * m;
        let tiles = (0..fine_height)
            .flat_map(|y| {
                (0..fine_width).map(move |x| Tile {
                    x,
                    y,
                    objects: Vec::new(),
                })
            })
            .collect();
        Ok(Self {
            config,
            resolution,
            fine_width,
            fine_height,
            tiles,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Size in fine tiles (width, height).
    pub fn fine_size(&self) -> (usize, usize) {
        (self.fine_width, self.fine_height)
    }

    /// Appends `object` to every tile its occupied cells cover. No legality check.
    pub fn add(&mut self, object: &Object) {
        for idx in self.covered(object.occupied(), &object.id) {
            self.tiles[idx].objects.push(object.id.clone());
        }
    }

    /// Removes `object` from every tile its occupied cells cover.
    ///
    /// A covered tile that does not list the object means the grid has desynchronized
    /// from the scene and yields [`Error::Inconsistent`].
    pub fn remove(&mut self, object: &Object) -> Result<()> {
        let indices = self.covered(object.occupied(), &object.id);
        if let Some(&missing) = indices
            .iter()
            .find(|&&idx| !self.tiles[idx].contains(&object.id))
        {
            let tile = &self.tiles[missing];
            return Err(Error::Inconsistent(format!(
                "object '{}' missing from tile ({}, {})",
                object.id, tile.x, tile.y
            )));
        }
        for idx in indices {
            let objects = &mut self.tiles[idx].objects;
            if let Some(pos) = objects.iter().rposition(|o| *o == object.id) {
                objects.remove(pos);
            }
        }
        Ok(())
    }

    /// Whether the cells are in bounds and, with overlap prevention, free of any object
    /// other than `excluded`. Never mutates.
    pub fn is_legal_position<I>(&self, cells: I, excluded: Option<&str>) -> bool
    where
        I: IntoIterator<Item = Vec2>,
    {
        for cell in cells {
            for fine in self.resolution.fine_coords(cell) {
                let Some(idx) = self.fine_index(fine) else {
                    return false;
                };
                if self.config.prevent_overlap {
                    let objects = &self.tiles[idx].objects;
                    let blocked = match excluded {
                        Some(ex) => objects.iter().any(|o| o != ex),
                        None => !objects.is_empty(),
                    };
                    if blocked {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// The tile containing the logical point `p`.
    pub fn get_single_tile(&self, p: Vec2) -> Option<&Tile> {
        self.point_index(p).map(|idx| &self.tiles[idx])
    }

    /// Whether the logical point `p` lies inside the grid.
    pub fn contains(&self, p: Vec2) -> bool {
        self.point_index(p).is_some()
    }

    /// The topmost object at `p`, i.e. the one added last.
    pub fn topmost(&self, p: Vec2) -> Option<&ObjectId> {
        self.get_single_tile(p).and_then(Tile::topmost)
    }

    /// Sorted, deduplicated tile indices covered by `cells`, skipping out-of-bounds cells.
    pub fn tile_indices<I>(&self, cells: I) -> Vec<usize>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut out: Vec<usize> = cells
            .into_iter()
            .flat_map(|cell| self.resolution.fine_coords(cell))
            .filter_map(|fine| self.fine_index(fine))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Coordinates of every tile that references `id`, in row-major order.
    pub fn tiles_of(&self, id: &str) -> Vec<(usize, usize)> {
        self.tiles
            .iter()
            .filter(|t| t.contains(id))
            .map(|t| (t.x, t.y))
            .collect()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn clear(&mut self) {
        for tile in &mut self.tiles {
            tile.objects.clear();
        }
    }

    fn covered<I>(&self, cells: I, id: &str) -> Vec<usize>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut out = Vec::new();
        for cell in cells {
            for fine in self.resolution.fine_coords(cell) {
                match self.fine_index(fine) {
                    Some(idx) => out.push(idx),
                    None => debug!(
                        "Cell ({}, {}) of object '{}' lies outside the grid; not indexed.",
                        cell.x, cell.y, id
                    ),
                }
            }
        }
        out
    }

    fn point_index(&self, p: Vec2) -> Option<usize> {
        self.fine_index(self.resolution.fine_point(p))
    }

    fn fine_index(&self, fine: Vec2) -> Option<usize> {
        let x = round5(fine.x);
        let y = round5(fine.y);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        if x < 0.0 || y < 0.0 || x >= self.fine_width as f32 || y >= self.fine_height as f32 {
            return None;
        }
        Some(y.floor() as usize * self.fine_width + x.floor() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockMatrix;

    fn l_object(id: &str, x: f32, y: f32) -> Object {
        let matrix = BlockMatrix::from_bits(&[[1u8, 0], [1, 0], [1, 1]]).unwrap();
        Object::new(id, "L", matrix).at(Vec2::new(x, y))
    }

    fn grid(prevent_overlap: bool) -> OccupancyGrid {
        OccupancyGrid::try_new(
            GridConfig::new(5, 5)
                .with_move_step(0.5)
                .with_prevent_overlap(prevent_overlap),
        )
        .unwrap()
    }

    #[test]
    fn fractional_step_subdivides_tiles() {
        let g = grid(true);
        assert_eq!(g.fine_size(), (10, 10));
        assert_eq!(g.tiles().len(), 100);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(OccupancyGrid::try_new(GridConfig::new(0, 5)).is_err());
        assert!(OccupancyGrid::try_new(GridConfig::new(5, 5).with_move_step(0.0)).is_err());
    }

    #[test]
    fn oversized_fine_grids_are_rejected() {
        let tiny = GridConfig::new(10, 10).with_move_step(0.00001);
        assert!(matches!(tiny.validate(), Err(Error::InvalidConfig(_))));
        assert!(OccupancyGrid::try_new(tiny).is_err());
        let huge = GridConfig::new(u32::MAX, u32::MAX);
        assert!(huge.validate().is_err());
        assert!(GridConfig::new(100, 100).with_move_step(0.5).validate().is_ok());
    }

    #[test]
    fn non_finite_points_are_outside() {
        let g = grid(false);
        for p in [Vec2::NAN, Vec2::new(f32::NAN, 1.0), Vec2::new(1.0, f32::INFINITY)] {
            assert!(!g.contains(p));
            assert!(g.get_single_tile(p).is_none());
            assert!(!g.is_legal_position([p], None));
            assert!(g.tile_indices([p]).is_empty());
        }
    }

    #[test]
    fn overlap_is_illegal_when_prevented() {
        let mut g = grid(true);
        let o1 = l_object("1", 0.0, 0.0);
        g.add(&o1);
        let o2 = l_object("2", 0.0, 0.0);
        assert!(!g.is_legal_position(o2.occupied(), Some("2")));
        assert!(g.is_legal_position(o1.occupied(), Some("1")));
    }

    #[test]
    fn overlap_is_legal_when_allowed() {
        let mut g = grid(false);
        let o1 = l_object("1", 0.0, 0.0);
        g.add(&o1);
        let o2 = l_object("2", 0.0, 0.0);
        assert!(g.is_legal_position(o2.occupied(), Some("2")));
        g.add(&o2);
        assert_eq!(g.topmost(Vec2::new(0.0, 0.0)), Some(&"2".to_string()));
    }

    #[test]
    fn out_of_bounds_is_illegal() {
        let g = grid(false);
        assert!(!g.is_legal_position(l_object("1", 4.0, 0.0).occupied(), None));
        assert!(!g.is_legal_position(l_object("1", -0.5, 0.0).occupied(), None));
        assert!(g.is_legal_position(l_object("1", 3.0, 2.0).occupied(), None));
    }

    #[test]
    fn add_and_remove_are_symmetric() {
        let mut g = grid(true);
        let obj = l_object("1", 1.5, 1.0);
        g.add(&obj);
        // 4 cells × 4 sub-tiles
        assert_eq!(g.tiles_of("1").len(), 16);
        g.remove(&obj).unwrap();
        assert!(g.tiles_of("1").is_empty());
    }

    #[test]
    fn removing_unindexed_object_is_inconsistent() {
        let mut g = grid(true);
        let obj = l_object("1", 0.0, 0.0);
        assert!(matches!(g.remove(&obj), Err(Error::Inconsistent(_))));
    }

    #[test]
    fn point_queries_resolve_fine_tiles() {
        let mut g = grid(true);
        g.add(&l_object("1", 1.0, 1.0));
        let tile = g.get_single_tile(Vec2::new(1.5, 1.0)).unwrap();
        assert_eq!((tile.x, tile.y), (3, 2));
        assert!(tile.contains("1"));
        assert!(g.topmost(Vec2::new(2.0, 1.0)).is_none());
        assert!(g.contains(Vec2::new(4.5, 4.5)));
        assert!(!g.contains(Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn tile_indices_dedup_and_skip_outside() {
        let g = grid(true);
        let idx = g.tile_indices([Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(9.0, 0.0)]);
        assert_eq!(idx, vec![0, 1, 10, 11]);
    }
}
