#![forbid(unsafe_code)]
//! grip_world: a shared 2D block world manipulated by grippers.
//!
//! Modules:
//! - grid: fine-resolution occupancy index and coordinate conversion for fractional steps
//! - model: block matrices, shape library, objects and grippers
//! - scene: scene state, validated movement, random generation, events and snapshots
//! - room: per-room serialization, repeating action loops and the room registry
//!
//! For examples, see the `grip_world_examples` crate.
pub mod error;
pub mod grid;
pub mod model;
pub mod room;
pub mod scene;

/// Convenient re-exports for common types. Import with `use grip_world::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::convert::{fine_coords, round5, Resolution};
    pub use crate::grid::{GridConfig, OccupancyGrid, Tile, MAX_FINE_TILES};
    pub use crate::model::shape::{normalize_rotation, quarter_turns};
    pub use crate::model::{
        BlockMatrix, Gripper, GripperId, Kind, Object, ObjectId, ShapeLibrary,
    };
    pub use crate::room::loops::interval_for;
    pub use crate::room::{
        ChannelSink, LoopRegistry, MemberId, Room, RoomId, RoomMessage, RoomRegistry,
    };
    pub use crate::scene::events::{
        EventSink, FnSink, SceneEvent, SceneEventKind, VecSink,
    };
    pub use crate::scene::generator::{GenerationReport, Generator, GeneratorConfig};
    pub use crate::scene::mover::{
        apply_movement, toggle_grip, Action, ActionKind, ActionOutcome, Rejection,
    };
    pub use crate::scene::snapshot::{
        GripperSnapshot, ObjectSnapshot, SceneDelta, SceneSnapshot,
    };
    pub use crate::scene::{Scene, SceneConfig};
}
