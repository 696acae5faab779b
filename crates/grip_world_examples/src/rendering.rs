use std::collections::BTreeMap;

use grip_world::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs a compact fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .try_init();
}

/// How [`render_ascii`] draws a scene.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Character for empty cells.
    pub empty: char,
    /// Character for cells covered only by a target.
    pub target: char,
    /// Character for a gripper position.
    pub gripper: char,
    /// Per-object characters; unlisted objects use the first letter of their kind.
    pub object_glyphs: BTreeMap<ObjectId, char>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            empty: '.',
            target: '+',
            gripper: '@',
            object_glyphs: BTreeMap::new(),
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_glyph(mut self, id: impl Into<ObjectId>, glyph: char) -> Self {
        self.object_glyphs.insert(id.into(), glyph);
        self
    }
}

/// Draws the scene at whole-cell resolution, one text row per grid row.
///
/// Grippers are drawn over objects, objects over targets. Held objects are upper-case.
pub fn render_ascii(scene: &Scene, rc: &RenderConfig) -> String {
    let grid = scene.config().grid;
    let (w, h) = (grid.width as usize, grid.height as usize);
    let mut cells = vec![vec![rc.empty; w]; h];

    let mut put = |x: f32, y: f32, c: char| {
        let (cx, cy) = (x.floor(), y.floor());
        if cx >= 0.0 && cy >= 0.0 && (cx as usize) < w && (cy as usize) < h {
            cells[cy as usize][cx as usize] = c;
        }
    };

    for target in scene.targets() {
        for cell in target.occupied() {
            put(cell.x, cell.y, rc.target);
        }
    }
    for object in scene.objects() {
        let glyph = rc
            .object_glyphs
            .get(&object.id)
            .copied()
            .or_else(|| object.kind.chars().next())
            .unwrap_or('#');
        let glyph = if object.gripped() {
            glyph.to_ascii_uppercase()
        } else {
            glyph.to_ascii_lowercase()
        };
        for cell in object.occupied() {
            put(cell.x, cell.y, glyph);
        }
    }
    for gripper in scene.grippers() {
        let p = gripper.position();
        put(p.x, p.y, rc.gripper);
    }

    let mut out = String::with_capacity((w + 1) * h);
    for row in cells {
        out.extend(row);
        out.push('\n');
    }
    out
}
