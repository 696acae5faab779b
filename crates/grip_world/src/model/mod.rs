//! Data model: block matrices, objects, grippers and the shape library.
pub mod library;
pub mod object;
pub mod shape;

pub use library::ShapeLibrary;
pub use object::{Gripper, Object};
pub use shape::BlockMatrix;

/// Identifier of an object or target. Targets share ids with the objects they belong to.
pub type ObjectId = String;

pub type GripperId = String;

/// Object type name, e.g. a pentomino letter.
pub type Kind = String;
