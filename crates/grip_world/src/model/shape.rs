//! Block matrices describing which cells of an object's bounding box are filled.
use std::borrow::Cow;

use glam::Vec2;

use crate::error::{Error, Result};

/// Number of clockwise quarter turns closest to `angle` degrees, in `0..4`.
///
/// The angle is normalized into `[0, 360)` and rounded to the nearest multiple of 90.
pub fn quarter_turns(angle: f32) -> u8 {
    let normalized = angle.rem_euclid(360.0);
    ((normalized / 90.0).round() as u32 % 4) as u8
}

/// Normalizes any angle to one of `0`, `90`, `180` or `270`.
pub fn normalize_rotation(angle: f32) -> u16 {
    quarter_turns(angle) as u16 * 90
}

/// Counter-clockwise quarter turns that realize a clockwise rotation of `cw` quarters.
fn ccw_turns_for(cw: u8) -> u8 {
    match cw {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => 0,
    }
}

/// Non-empty rectangular matrix of filled/empty cells, stored row by row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockMatrix {
    rows: Vec<Vec<bool>>,
}

impl BlockMatrix {
    /// Creates a matrix, rejecting empty and ragged inputs.
    pub fn try_new(rows: Vec<Vec<bool>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::InvalidShape("block matrix has no rows".into()));
        };
        let width = first.len();
        if width == 0 {
            return Err(Error::InvalidShape("block matrix has empty rows".into()));
        }
        if let Some(idx) = rows.iter().position(|r| r.len() != width) {
            return Err(Error::InvalidShape(format!(
                "row {idx} has length {} but row 0 has length {width}",
                rows[idx].len()
            )));
        }
        Ok(Self { rows })
    }

    /// Creates a matrix from rows of `0`/`1` values; any non-zero value counts as filled.
    pub fn from_bits<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        Self::try_new(
            rows.iter()
                .map(|r| r.as_ref().iter().map(|&b| b != 0).collect())
                .collect(),
        )
    }

    /// Rows as `0`/`1` values.
    pub fn to_bits(&self) -> Vec<Vec<u8>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(|&b| u8::from(b)).collect())
            .collect()
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    pub fn is_filled(&self, col: usize, row: usize) -> bool {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn filled_count(&self) -> usize {
        self.rows.iter().flatten().filter(|&&b| b).count()
    }

    /// Rotates clockwise by `angle` degrees, rounded to the nearest quarter turn.
    ///
    /// A rotation that rounds to 0° borrows `self`.
    pub fn rotated(&self, angle: f32) -> Cow<'_, BlockMatrix> {
        let turns = ccw_turns_for(quarter_turns(angle));
        if turns == 0 {
            return Cow::Borrowed(self);
        }
        let mut out = self.rotate_ccw();
        for _ in 1..turns {
            out = out.rotate_ccw();
        }
        Cow::Owned(out)
    }

    /// Mirrors across the horizontal axis by reversing row order.
    pub fn flipped(&self) -> BlockMatrix {
        let mut rows = self.rows.clone();
        rows.reverse();
        BlockMatrix { rows }
    }

    /// Cells covered by this matrix with its top-left corner at `anchor`.
    pub fn occupied(&self, anchor: Vec2) -> impl Iterator<Item = Vec2> + Clone + '_ {
        self.rows.iter().enumerate().flat_map(move |(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, &filled)| {
                filled.then(|| Vec2::new(anchor.x + col as f32, anchor.y + row as f32))
            })
        })
    }

    fn rotate_ccw(&self) -> BlockMatrix {
        let width = self.width();
        let height = self.height();
        let rows = (0..width)
            .map(|i| (0..height).map(|j| self.rows[j][width - 1 - i]).collect())
            .collect();
        BlockMatrix { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> BlockMatrix {
        BlockMatrix::from_bits(&[[1u8, 1, 1], [1, 0, 0]]).unwrap()
    }

    #[test]
    fn rejects_empty_and_ragged_rows() {
        assert!(BlockMatrix::try_new(Vec::new()).is_err());
        assert!(BlockMatrix::try_new(vec![Vec::new()]).is_err());
        assert!(BlockMatrix::try_new(vec![vec![true, true], vec![true]]).is_err());
    }

    #[test]
    fn dimensions_follow_the_current_rows() {
        let m = l_shape();
        assert_eq!((m.width(), m.height()), (3, 2));
        let r = m.rotated(90.0);
        assert_eq!((r.width(), r.height()), (2, 3));
    }

    #[test]
    fn clockwise_quarter_turn() {
        let rotated = l_shape().rotated(90.0).into_owned();
        let expected = BlockMatrix::from_bits(&[[1u8, 1], [0, 1], [0, 1]]).unwrap();
        assert_eq!(rotated, expected);
    }

    #[test]
    fn negative_angle_is_counter_clockwise() {
        let m = l_shape();
        assert_eq!(m.rotated(-90.0).into_owned(), *m.rotated(270.0));
        let expected = BlockMatrix::from_bits(&[[1u8, 0], [1, 0], [1, 1]]).unwrap();
        assert_eq!(m.rotated(-90.0).into_owned(), expected);
    }

    #[test]
    fn zero_rotation_borrows_input() {
        let m = l_shape();
        assert!(matches!(m.rotated(0.0), Cow::Borrowed(_)));
        assert!(matches!(m.rotated(360.0), Cow::Borrowed(_)));
        assert!(matches!(m.rotated(20.0), Cow::Borrowed(_)));
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let m = l_shape();
        let mut current = m.clone();
        for _ in 0..4 {
            current = current.rotated(90.0).into_owned();
        }
        assert_eq!(current, m);
    }

    #[test]
    fn flip_is_an_involution() {
        let m = l_shape();
        let flipped = m.flipped();
        assert_eq!(flipped.rows()[0], vec![true, false, false]);
        assert_eq!(flipped.flipped(), m);
    }

    #[test]
    fn occupied_offsets_by_anchor() {
        let cells: Vec<Vec2> = l_shape().occupied(Vec2::new(2.0, 0.5)).collect();
        assert_eq!(
            cells,
            vec![
                Vec2::new(2.0, 0.5),
                Vec2::new(3.0, 0.5),
                Vec2::new(4.0, 0.5),
                Vec2::new(2.0, 1.5),
            ]
        );
    }

    #[test]
    fn angles_round_to_quarter_turns() {
        assert_eq!(quarter_turns(-90.0), 3);
        assert_eq!(quarter_turns(100.0), 1);
        assert_eq!(quarter_turns(350.0), 0);
        assert_eq!(normalize_rotation(540.0), 180);
    }

    #[test]
    fn bits_round_trip() {
        let bits = vec![vec![0u8, 1], vec![1, 1]];
        assert_eq!(BlockMatrix::from_bits(bits.as_slice()).unwrap().to_bits(), bits);
    }
}
