// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The fixed parameters of a single render.  A `Config` is decided
//! before launch and every worker receives an identical copy.

use num::Complex;

use crate::error::MandelError;

/// Default image width, in pixels.
pub const DEFAULT_WIDTH: usize = 1024;
/// Default image height, in pixels.
pub const DEFAULT_HEIGHT: usize = 1024;
/// Default iteration cap.  More iterations give a more detailed border
/// at a higher cost.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Describes one render: the size of the raster, the rectangle of the
/// complex plane it covers, the iteration cap, and how many workers
/// share the rows.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    /// Columns in the image.
    pub width: usize,
    /// Rows in the image.
    pub height: usize,
    /// The `(x_min, y_min)` corner of the complex plane.
    pub leftlower: Complex<f64>,
    /// The `(x_max, y_max)` corner of the complex plane.
    pub rightupper: Complex<f64>,
    /// The most iterations any one point receives.
    pub max_iterations: u32,
    /// The number of workers in the group.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            leftlower: Complex::new(-2.0, -2.0),
            rightupper: Complex::new(2.0, 2.0),
            max_iterations: DEFAULT_ITERATIONS,
            workers: num_cpus::get(),
        }
    }
}

impl Config {
    /// A configuration over the given raster and iteration cap, with
    /// the default domain and worker count.
    pub fn new(width: usize, height: usize, max_iterations: u32) -> Self {
        Config {
            width,
            height,
            max_iterations,
            ..Config::default()
        }
    }

    /// Builder-style override of the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder-style override of the complex-plane rectangle.
    pub fn with_bounds(mut self, leftlower: Complex<f64>, rightupper: Complex<f64>) -> Self {
        self.leftlower = leftlower;
        self.rightupper = rightupper;
        self
    }

    /// Reject anything that cannot describe a render.  Called by every
    /// worker before it computes, so a bad configuration stops all of
    /// them at the same point.
    pub fn validate(&self) -> Result<(), MandelError> {
        if self.width == 0 {
            return Err(MandelError::config("image width must be positive"));
        }
        if self.height == 0 {
            return Err(MandelError::config("image height must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(MandelError::config("iteration cap must be positive"));
        }
        if self.workers == 0 {
            return Err(MandelError::config("worker count must be positive"));
        }
        pixel_count(self.width, self.height)?;
        check_bounds(self.leftlower, self.rightupper)
    }
}

/// `width * height`, or a configuration error when that does not fit
/// in a `usize`.
pub(crate) fn pixel_count(width: usize, height: usize) -> Result<usize, MandelError> {
    width.checked_mul(height).ok_or_else(|| {
        MandelError::config(format!("an image of {}x{} pixels is too large", width, height))
    })
}

pub(crate) fn check_bounds(
    leftlower: Complex<f64>,
    rightupper: Complex<f64>,
) -> Result<(), MandelError> {
    let corners = [leftlower.re, leftlower.im, rightupper.re, rightupper.im];
    if corners.iter().any(|v| !v.is_finite()) {
        return Err(MandelError::config("plane bounds must be finite"));
    }
    if rightupper.re <= leftlower.re {
        return Err(MandelError::config(
            "the left lower corner is not to the left of the right upper corner",
        ));
    }
    if rightupper.im <= leftlower.im {
        return Err(MandelError::config(
            "the left lower corner is not lower than the right upper corner",
        ));
    }
    Ok(())
}
