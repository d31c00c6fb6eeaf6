// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluator.
//!
//! A point `c` belongs to the Mandelbrot set when the sequence
//! `z -> z^2 + c`, started at zero, never goes to infinity.  Once the
//! modulus of `z` passes 2 it is certain to diverge, so we iterate
//! until `|z|^2 >= 4` or until the iteration cap runs out.  Reaching
//! the cap is only an approximation of membership; the count it
//! produces is the "interior" value, which the image later shows as 0.

use itertools::iproduct;
use log::debug;

use crate::error::MandelError;
use crate::partition::Entry;
use crate::planes::{Pixel, PlaneMapper};

/// The squared modulus past which the recurrence is known to diverge.
pub const DIVERGENCE_THRESHOLD: f64 = 4.0;

/// Operations charged for mapping a pixel onto the complex plane.
pub const MAPPING_OPS: u64 = 4;
/// Operations charged for one step of the recurrence.
pub const ITERATION_OPS: u64 = 10;

/// Iterate the pixel's point and return the number of steps taken,
/// in `[1, max_iterations]`, together with the operation cost.  The
/// cost is bookkeeping only and never affects the count.
pub fn evaluate(plane: &PlaneMapper, pixel: Pixel, max_iterations: u32) -> (u32, u64) {
    let c = plane.pixel_to_point(pixel);
    let mut ops = MAPPING_OPS;
    let (mut re, mut im) = (0.0_f64, 0.0_f64);
    let mut k = 0;
    loop {
        let next_re = re * re - im * im + c.re;
        im = 2.0 * re * im + c.im;
        re = next_re;
        k += 1;
        ops += ITERATION_OPS;
        if re * re + im * im >= DIVERGENCE_THRESHOLD || k >= max_iterations {
            break;
        }
    }
    (k, ops)
}

/// True when `count` is the cap, i.e. the point never escaped.
#[inline]
pub fn is_interior(count: u32, max_iterations: u32) -> bool {
    count >= max_iterations
}

/// The display convention: interior points become 0, escaped points
/// keep their count.
#[inline]
pub fn remap(count: u32, max_iterations: u32) -> u32 {
    if is_interior(count, max_iterations) {
        0
    } else {
        count
    }
}

/// A worker's locally computed rows, exactly `entry.element_count`
/// raw iteration counts long.
#[derive(Clone, Debug, PartialEq)]
pub struct RowBlock {
    /// Raw counts, row-major.
    pub pixels: Vec<u32>,
    /// Operations spent producing them.
    pub ops: u64,
}

/// Run the evaluator over every pixel of the entry's rows, top to
/// bottom and left to right.  Fails if the local block cannot be
/// allocated.
pub fn render_rows(
    plane: &PlaneMapper,
    entry: &Entry,
    max_iterations: u32,
) -> Result<RowBlock, MandelError> {
    let mut pixels: Vec<u32> = Vec::new();
    pixels
        .try_reserve_exact(entry.element_count)
        .map_err(|_| MandelError::Allocation {
            elements: entry.element_count,
        })?;
    let mut ops = 0;
    for (row, col) in iproduct!(entry.rows(), 0..plane.width) {
        let (k, cost) = evaluate(plane, Pixel::new(row, col), max_iterations);
        pixels.push(k);
        ops += cost;
    }
    debug!(
        "rendered rows {:?} ({} pixels, {} ops)",
        entry.rows(),
        pixels.len(),
        ops
    );
    Ok(RowBlock { pixels, ops })
}
