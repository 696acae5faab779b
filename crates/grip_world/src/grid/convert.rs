//! Conversion between logical grid positions and fine tile coordinates.
//!
//! A step size below `1.0` subdivides every cell into `multiplier × multiplier`
//! addressable sub-cells. [`Resolution`] captures that multiplier once per grid and
//! [`FineCoords`] enumerates the fine coordinates a logical cell covers.
use glam::Vec2;

use crate::error::{Error, Result};

const ROUND_SCALE: f32 = 100_000.0;

/// Rounds to 5 decimal places to absorb float drift from step arithmetic.
#[inline]
pub fn round5(value: f32) -> f32 {
    (value * ROUND_SCALE).round() / ROUND_SCALE
}

/// Rounds both components of a position to 5 decimal places.
#[inline]
pub fn round5_vec(p: Vec2) -> Vec2 {
    Vec2::new(round5(p.x), round5(p.y))
}

/// Number of fine sub-cells per logical cell along each axis, derived from a step size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    step: f32,
    multiplier: u32,
}

impl Resolution {
    /// Derives the resolution for `step`.
    ///
    /// Whole-number steps map one cell to one tile. Steps in `(0, 1)` use
    /// `floor(1 / step)` sub-cells per axis. Zero, negative, non-finite and
    /// non-integral steps above one are configuration errors.
    pub fn try_new(step: f32) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "move_step must be a finite value > 0, got {step}"
            )));
        }
        let multiplier = if step.fract() == 0.0 {
            1
        } else if step < 1.0 {
            (1.0 / step).floor() as u32
        } else {
            return Err(Error::InvalidConfig(format!(
                "move_step above 1 must be a whole number, got {step}"
            )));
        };
        Ok(Self { step, multiplier })
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Enumerates the fine coordinates covered by the logical cell at `p`.
    pub fn fine_coords(&self, p: Vec2) -> FineCoords {
        FineCoords {
            origin: p * self.multiplier as f32,
            multiplier: self.multiplier as usize,
            next: 0,
        }
    }

    /// Fine coordinate of a single logical point (the first sub-cell of its cell).
    pub fn fine_point(&self, p: Vec2) -> Vec2 {
        round5_vec(p * self.multiplier as f32)
    }
}

/// Finite, restartable iterator over the fine coordinates of one logical cell.
#[derive(Clone, Debug)]
pub struct FineCoords {
    origin: Vec2,
    multiplier: usize,
    next: usize,
}

impl FineCoords {
    fn total(&self) -> usize {
        self.multiplier.saturating_mul(self.multiplier)
    }
}

impl Iterator for FineCoords {
    type Item = Vec2;

    fn next(&mut self) -> Option<Vec2> {
        if self.next >= self.total() {
            return None;
        }
        let i = self.next / self.multiplier;
        let j = self.next % self.multiplier;
        self.next += 1;
        Some(Vec2::new(
            round5(self.origin.x + i as f32),
            round5(self.origin.y + j as f32),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FineCoords {}

/// Convenience form of [`Resolution::fine_coords`] that validates `step` on every call.
pub fn fine_coords(step: f32, p: Vec2) -> Result<FineCoords> {
    Ok(Resolution::try_new(step)?.fine_coords(p))
}
