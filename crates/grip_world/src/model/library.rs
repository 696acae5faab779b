//! Named canonical shapes that objects are instantiated from.
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::shape::BlockMatrix;
use crate::model::Kind;

/// Registry of canonical block matrices keyed by object type name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeLibrary {
    shapes: BTreeMap<Kind, BlockMatrix>,
}

impl ShapeLibrary {
    pub fn new() -> Self {
        Self {
            shapes: BTreeMap::new(),
        }
    }

    /// The twelve pentominoes, named by their conventional letters.
    pub fn pentominoes() -> Self {
        const PENTOMINOES: [(&str, &[&[u8]]); 12] = [
            ("F", &[&[0, 1, 1], &[1, 1, 0], &[0, 1, 0]]),
            ("I", &[&[1], &[1], &[1], &[1], &[1]]),
            ("L", &[&[1, 0], &[1, 0], &[1, 0], &[1, 1]]),
            ("N", &[&[0, 1], &[1, 1], &[1, 0], &[1, 0]]),
            ("P", &[&[1, 1], &[1, 1], &[1, 0]]),
            ("T", &[&[1, 1, 1], &[0, 1, 0], &[0, 1, 0]]),
            ("U", &[&[1, 0, 1], &[1, 1, 1]]),
            ("V", &[&[1, 0, 0], &[1, 0, 0], &[1, 1, 1]]),
            ("W", &[&[1, 0, 0], &[1, 1, 0], &[0, 1, 1]]),
            ("X", &[&[0, 1, 0], &[1, 1, 1], &[0, 1, 0]]),
            ("Y", &[&[0, 1], &[1, 1], &[0, 1], &[0, 1]]),
            ("Z", &[&[1, 1, 0], &[0, 1, 0], &[0, 1, 1]]),
        ];

        let shapes = PENTOMINOES
            .iter()
            .filter_map(|(name, rows)| {
                BlockMatrix::from_bits(*rows)
                    .ok()
                    .map(|matrix| (name.to_string(), matrix))
            })
            .collect();
        Self { shapes }
    }

    /// Registers (or replaces) the canonical shape for `kind`.
    pub fn insert(&mut self, kind: impl Into<Kind>, matrix: BlockMatrix) -> Option<BlockMatrix> {
        self.shapes.insert(kind.into(), matrix)
    }

    pub fn with_shape(mut self, kind: impl Into<Kind>, matrix: BlockMatrix) -> Self {
        self.insert(kind, matrix);
        self
    }

    /// Looks up the canonical shape for `kind`.
    pub fn get(&self, kind: &str) -> Result<&BlockMatrix> {
        self.shapes.get(kind).ok_or_else(|| Error::MissingShape {
            kind: kind.to_owned(),
        })
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.shapes.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.shapes.keys()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
