// src/registration.rs
//
// Translational image registration between consecutive frames.
//
// The gate only needs a (dx, dy) per frame pair, so registration sits
// behind the MotionSampleSource trait. BlockMatchRegistration is the
// built-in implementation: a grid of blocks from the previous frame is
// searched for in the current frame with SAD (Sum of Absolute
// Differences), and the per-axis median of the block displacements is
// reported when enough blocks agree on it.

use crate::types::{FrameHandle, GrayFrame, RegistrationConfig, TranslationSample};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("frame size changed from {previous:?} to {current:?}")]
    DimensionMismatch {
        previous: (usize, usize),
        current: (usize, usize),
    },

    #[error("frame {width}x{height} is too small for the block grid")]
    FrameTooSmall { width: usize, height: usize },

    #[error("block grid {blocks_x}x{blocks_y} has no blocks")]
    EmptyGrid { blocks_x: usize, blocks_y: usize },

    #[error("only {ratio:.2} of blocks agree on a displacement")]
    NoConsensus { ratio: f32 },
}

/// Produces the translation between a baseline frame and the next one.
pub trait MotionSampleSource {
    type Frame: Clone;

    fn register(
        &mut self,
        previous: &Self::Frame,
        current: &Self::Frame,
    ) -> Result<TranslationSample, RegistrationError>;
}

// ============================================================================
// BLOCK MATCHER
// ============================================================================

/// SAD between a `size`×`size` block of `reference` at (rx, ry) and a block
/// of `current` at (cx, cy). Both blocks must be in bounds.
#[inline]
fn sad_block(
    reference: &GrayFrame,
    current: &GrayFrame,
    (rx, ry): (usize, usize),
    (cx, cy): (usize, usize),
    size: usize,
) -> u32 {
    let mut sum: u32 = 0;
    for row in 0..size {
        let r = (ry + row) * reference.width + rx;
        let c = (cy + row) * current.width + cx;
        let r_row = &reference.data[r..r + size];
        let c_row = &current.data[c..c + size];
        for (a, b) in r_row.iter().zip(c_row) {
            sum += (*a as i32 - *b as i32).unsigned_abs();
        }
    }
    sum
}

/// Best displacement of the block at (bx, by) within ±range on both axes.
/// Ties keep the smallest |dx| + |dy| so flat regions report no motion.
fn match_block(
    previous: &GrayFrame,
    current: &GrayFrame,
    (bx, by): (usize, usize),
    size: usize,
    range: usize,
) -> (i32, i32) {
    let min_x = bx.saturating_sub(range);
    let max_x = (bx + range).min(current.width - size);
    let min_y = by.saturating_sub(range);
    let max_y = (by + range).min(current.height - size);

    let mut best = (u32::MAX, 0i32, 0i32);
    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            let score = sad_block(previous, current, (bx, by), (cx, cy), size);
            let dx = cx as i32 - bx as i32;
            let dy = cy as i32 - by as i32;
            let better = score < best.0
                || (score == best.0 && dx.abs() + dy.abs() < best.1.abs() + best.2.abs());
            if better {
                best = (score, dx, dy);
            }
        }
    }
    (best.1, best.2)
}

fn median(values: &mut [i32]) -> i32 {
    values.sort_unstable();
    values[values.len() / 2]
}

pub struct BlockMatchRegistration {
    config: RegistrationConfig,
}

impl BlockMatchRegistration {
    pub fn new(config: RegistrationConfig) -> Self {
        Self { config }
    }

    /// Displacement that maps `previous` onto `current`: a feature at (x, y)
    /// in the previous frame is found at (x + dx, y + dy) in the current one.
    pub fn register_images(
        &self,
        previous: &GrayFrame,
        current: &GrayFrame,
    ) -> Result<TranslationSample, RegistrationError> {
        if previous.width != current.width || previous.height != current.height {
            return Err(RegistrationError::DimensionMismatch {
                previous: (previous.width, previous.height),
                current: (current.width, current.height),
            });
        }

        let cfg = &self.config;
        if cfg.blocks_x == 0 || cfg.blocks_y == 0 {
            return Err(RegistrationError::EmptyGrid {
                blocks_x: cfg.blocks_x,
                blocks_y: cfg.blocks_y,
            });
        }

        let bs = cfg.block_size;
        let sr = cfg.search_range;
        let (width, height) = (current.width, current.height);

        // Every block needs a full search window inside the frame
        let span_x = width.checked_sub(bs + 2 * sr);
        let span_y = height.checked_sub(bs + 2 * sr);
        let (span_x, span_y) = match (span_x, span_y) {
            (Some(x), Some(y)) if bs > 0 => (x, y),
            _ => return Err(RegistrationError::FrameTooSmall { width, height }),
        };

        let step_x = if cfg.blocks_x > 1 {
            span_x / (cfg.blocks_x - 1)
        } else {
            0
        };
        let step_y = if cfg.blocks_y > 1 {
            span_y / (cfg.blocks_y - 1)
        } else {
            0
        };

        let total = cfg.blocks_x * cfg.blocks_y;
        let mut dxs = Vec::with_capacity(total);
        let mut dys = Vec::with_capacity(total);

        for iy in 0..cfg.blocks_y {
            let by = sr + iy * step_y;
            for ix in 0..cfg.blocks_x {
                let bx = sr + ix * step_x;
                let (dx, dy) = match_block(previous, current, (bx, by), bs, sr);
                dxs.push(dx);
                dys.push(dy);
            }
        }

        let displacements: Vec<(i32, i32)> =
            dxs.iter().copied().zip(dys.iter().copied()).collect();
        let mdx = median(&mut dxs);
        let mdy = median(&mut dys);

        // Blocks within ±1px of the median on both axes count as agreeing
        let agreeing = displacements
            .iter()
            .filter(|(dx, dy)| (dx - mdx).abs() <= 1 && (dy - mdy).abs() <= 1)
            .count();
        let ratio = agreeing as f32 / total as f32;

        if ratio < cfg.min_consensus {
            return Err(RegistrationError::NoConsensus { ratio });
        }

        debug!(
            "Registration: dx={}, dy={} ({}/{} blocks agree)",
            mdx, mdy, agreeing, total
        );

        Ok(TranslationSample::new(mdx as f64, mdy as f64))
    }
}

impl MotionSampleSource for BlockMatchRegistration {
    type Frame = FrameHandle;

    fn register(
        &mut self,
        previous: &FrameHandle,
        current: &FrameHandle,
    ) -> Result<TranslationSample, RegistrationError> {
        self.register_images(&previous.image, &current.image)
    }
}
