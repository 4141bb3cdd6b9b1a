//! In-memory georeferenced raster.

use crate::error::RasterIoError;
use crate::geometry::{Crs, Envelope};

/// A georeferenced 2-D pixel grid.
///
/// Pixels are `f32`, band-interleaved (`R,G,B,R,G,B,...`) and stored row
/// by row with row 0 at the top (max Y) of `envelope`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// Pixel values (interleaved if multi-band)
    pub pixels: Vec<f32>,
    /// Number of bands
    pub bands: usize,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Outer bounds of the pixel grid
    pub envelope: Envelope,
}

impl Raster {
    /// Wrap a pixel buffer, checking that it matches the dimensions.
    ///
    /// # Errors
    /// Returns [`RasterIoError::InvalidData`] for zero dimensions or a
    /// buffer of the wrong length.
    pub fn new(
        width: usize,
        height: usize,
        bands: usize,
        envelope: Envelope,
        pixels: Vec<f32>,
    ) -> Result<Self, RasterIoError> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(RasterIoError::InvalidData(format!(
                "Raster has zero dimensions ({width}x{height}x{bands})"
            )));
        }
        let expected = width * height * bands;
        if pixels.len() != expected {
            return Err(RasterIoError::InvalidData(format!(
                "Expected {expected} samples for {width}x{height}x{bands}, got {}",
                pixels.len()
            )));
        }
        Ok(Self { pixels, bands, width, height, envelope })
    }

    /// A raster where every pixel holds `fill` (one value per band).
    #[must_use]
    pub fn filled(width: usize, height: usize, envelope: Envelope, fill: &[f32]) -> Self {
        let bands = fill.len().max(1);
        let mut pixels = Vec::with_capacity(width * height * bands);
        for _ in 0..width * height {
            if fill.is_empty() {
                pixels.push(0.0);
            } else {
                pixels.extend_from_slice(fill);
            }
        }
        Self { pixels, bands, width, height, envelope }
    }

    #[inline]
    #[must_use]
    pub fn crs(&self) -> Crs {
        self.envelope.crs
    }

    /// Ground units per pixel along X and Y.
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.envelope.width() / self.width as f64,
            self.envelope.height() / self.height as f64,
        )
    }

    /// Retag the raster with another CRS without touching coordinates.
    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.envelope.crs = crs;
        self
    }

    /// All band values of one pixel.
    #[inline]
    #[must_use]
    pub fn pixel(&self, col: usize, row: usize) -> &[f32] {
        let start = (row * self.width + col) * self.bands;
        &self.pixels[start..start + self.bands]
    }

    #[inline]
    pub fn pixel_mut(&mut self, col: usize, row: usize) -> &mut [f32] {
        let start = (row * self.width + col) * self.bands;
        &mut self.pixels[start..start + self.bands]
    }

    /// World coordinate to fractional pixel coordinate, corner based:
    /// pixel `(0, 0)` spans `[0, 1) x [0, 1)`.
    #[inline]
    #[must_use]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let (res_x, res_y) = self.resolution();
        (
            (x - self.envelope.min_x) / res_x,
            (self.envelope.max_y - y) / res_y,
        )
    }

    /// World coordinate of a pixel center.
    #[inline]
    #[must_use]
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let (res_x, res_y) = self.resolution();
        (
            self.envelope.min_x + (col as f64 + 0.5) * res_x,
            self.envelope.max_y - (row as f64 + 0.5) * res_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn env() -> Envelope {
        Envelope::from_corners(0.0, 0.0, 40.0, 20.0, Crs::from_epsg(32633).unwrap())
    }

    #[test]
    fn test_new_checks_length() {
        assert!(Raster::new(4, 2, 1, env(), vec![0.0; 8]).is_ok());
        assert!(Raster::new(4, 2, 3, env(), vec![0.0; 8]).is_err());
        assert!(Raster::new(0, 2, 1, env(), vec![]).is_err());
    }

    #[test]
    fn test_filled_and_pixel_access() {
        let mut raster = Raster::filled(4, 2, env(), &[1.0, 2.0]);
        assert_eq!(raster.bands, 2);
        assert_eq!(raster.pixels.len(), 16);
        assert_eq!(raster.pixel(3, 1), &[1.0, 2.0]);

        raster.pixel_mut(1, 0)[1] = 9.0;
        assert_eq!(raster.pixel(1, 0), &[1.0, 9.0]);
        assert_eq!(raster.pixels[3], 9.0);
    }

    #[test]
    fn test_resolution_and_coordinates() {
        let raster = Raster::filled(4, 2, env(), &[0.0]);
        assert_eq!(raster.resolution(), (10.0, 10.0));

        let (x, y) = raster.pixel_center(0, 0);
        assert_relative_eq!(x, 5.0);
        assert_relative_eq!(y, 15.0);

        let (col, row) = raster.world_to_pixel(x, y);
        assert_relative_eq!(col, 0.5);
        assert_relative_eq!(row, 0.5);

        let (col, row) = raster.world_to_pixel(40.0, 0.0);
        assert_relative_eq!(col, 4.0);
        assert_relative_eq!(row, 2.0);
    }
}
