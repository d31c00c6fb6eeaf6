//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0 in
//! the upper-left corner, and a rectangle on the complex plane with
//! an arbitrary pair of corners defining the leftlower and rightupper
//! corners.  Rows grow downward on the integral plane while the
//! imaginary axis grows upward, so row 0 maps to the top edge.
use num::Complex;

use crate::config::check_bounds;
use crate::error::MandelError;

/// Describes the row and column of a point on the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel {
    /// Counted from the top of the image.
    pub row: usize,
    /// Counted from the left of the image.
    pub col: usize,
}

impl Pixel {
    /// Constructor.
    pub fn new(row: usize, col: usize) -> Self {
        Pixel { row, col }
    }
}

/// Contains the definitions of two planes: an integral cartesian
/// plane, and a complex cartesian plane.  Maps pixels from the first
/// onto points in the second.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// Columns and rows of the integral plane.
    pub width: usize,
    /// Rows of the integral plane.
    pub height: usize,
    /// The two corners of the complex plane, left-lower and
    /// right-upper.
    pub complex_plane: (Complex<f64>, Complex<f64>),
    // The distance on the complex plane between neighbouring pixels,
    // horizontally and vertically.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Takes the size of the integral plane and the two corners of the
    /// complex plane.  Fails if either plane is empty or the corners
    /// are not left-lower and right-upper.
    pub fn new(
        width: usize,
        height: usize,
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
    ) -> Result<PlaneMapper, MandelError> {
        if width == 0 || height == 0 {
            return Err(MandelError::config("the integral plane is empty"));
        }
        check_bounds(leftlower, rightupper)?;

        let steps = (
            (rightupper.re - leftlower.re) / (width as f64),
            (rightupper.im - leftlower.im) / (height as f64),
        );

        Ok(PlaneMapper {
            width,
            height,
            complex_plane: (leftlower, rightupper),
            steps,
        })
    }

    /// Given a pixel on the integral plane, return the complex number
    /// at the equivalent location on the complex plane.
    pub fn pixel_to_point(&self, pixel: Pixel) -> Complex<f64> {
        let (leftlower, rightupper) = self.complex_plane;
        Complex::new(
            leftlower.re + (pixel.col as f64) * self.steps.0,
            rightupper.im - (pixel.row as f64) * self.steps.1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-1.0, 1.0), Complex::new(1.0, -1.0));
        assert!(pm.is_err());
        let pm = PlaneMapper::new(0, 4, Complex::new(-1.0, -1.0), Complex::new(1.0, 1.0));
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-1.0, -1.0), Complex::new(1.0, 1.0));
        assert!(pm.is_ok());
    }

    #[test]
    fn top_left_pixel_is_the_upper_left_corner() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-2.0, -2.0), Complex::new(2.0, 2.0)).unwrap();
        assert_eq!(pm.pixel_to_point(Pixel::new(0, 0)), Complex::new(-2.0, 2.0));
    }

    #[test]
    fn rows_descend_the_imaginary_axis() {
        let pm = PlaneMapper::new(4, 4, Complex::new(-2.0, -2.0), Complex::new(2.0, 2.0)).unwrap();
        assert_eq!(pm.pixel_to_point(Pixel::new(2, 2)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(Pixel::new(3, 0)), Complex::new(-2.0, -1.0));
        assert_eq!(pm.pixel_to_point(Pixel::new(0, 3)), Complex::new(1.0, 2.0));
    }

    #[test]
    fn pixel_to_point_on_positive_planes() {
        let pm = PlaneMapper::new(5, 5, Complex::new(0.0, 0.0), Complex::new(5.0, 5.0)).unwrap();
        assert_eq!(pm.pixel_to_point(Pixel::new(0, 0)), Complex::new(0.0, 5.0));
        assert_eq!(pm.pixel_to_point(Pixel::new(2, 2)), Complex::new(2.0, 3.0));
        assert_eq!(pm.pixel_to_point(Pixel::new(4, 4)), Complex::new(4.0, 1.0));
    }
}
