//! Envelopes, pixel origin conventions and CRS handling.

pub mod projection;

pub use projection::{Crs, CrsTransform};

use crate::error::{ProjError, PyramidError};

/// Number of sample points per edge when reprojecting an envelope.
const EDGE_SAMPLES: usize = 21;

/// Whether a pixel's georeferenced coordinate refers to its center or its
/// outer (upper-left) corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OriginLocation {
    /// Coordinates name the pixel center (GeoTIFF `PixelIsPoint`).
    Center,
    /// Coordinates name the pixel's outer corner (GeoTIFF `PixelIsArea`).
    #[default]
    Outer,
}

impl OriginLocation {
    /// Georeferenced anchor of the first (upper-left) pixel of a raster
    /// covering `envelope` at the given resolution.
    #[must_use]
    pub fn anchor(self, envelope: &Envelope, res_x: f64, res_y: f64) -> (f64, f64) {
        match self {
            Self::Outer => (envelope.min_x, envelope.max_y),
            Self::Center => (envelope.min_x + res_x / 2.0, envelope.max_y - res_y / 2.0),
        }
    }

    /// Outer envelope of a `width` x `height` raster whose first pixel is
    /// anchored at `(x, y)` under this convention.
    #[must_use]
    pub fn envelope_from_anchor(
        self,
        (x, y): (f64, f64),
        res_x: f64,
        res_y: f64,
        width: usize,
        height: usize,
        crs: Crs,
    ) -> Envelope {
        let (min_x, max_y) = match self {
            Self::Outer => (x, y),
            Self::Center => (x - res_x / 2.0, y + res_y / 2.0),
        };
        Envelope::from_corners(
            min_x,
            max_y - res_y * height as f64,
            min_x + res_x * width as f64,
            max_y,
            crs,
        )
    }
}

/// Axis-aligned bounding rectangle in a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub crs: Crs,
}

impl Envelope {
    /// Create an envelope, rejecting inverted or non-finite bounds.
    ///
    /// # Errors
    /// Returns [`PyramidError::Geometry`] if `min > max` on either axis or a
    /// bound is not finite.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Crs) -> Result<Self, PyramidError> {
        let bounds = [min_x, min_y, max_x, max_y];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(PyramidError::Geometry(format!(
                "non-finite envelope bounds {bounds:?}"
            )));
        }
        if min_x > max_x || min_y > max_y {
            return Err(PyramidError::Geometry(format!(
                "inverted envelope [{min_x}, {min_y}, {max_x}, {max_y}]"
            )));
        }
        Ok(Self { min_x, min_y, max_x, max_y, crs })
    }

    /// Create an envelope from any two opposite corners.
    #[must_use]
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, crs: Crs) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
            crs,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Smallest envelope containing both. Keeps the CRS of `self`.
    #[must_use]
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
            crs: self.crs,
        }
    }

    /// True if the two envelopes share an area of positive size.
    #[must_use]
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Closed containment test.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Reproject into `target`, bounding a densified outline so that curved
    /// edges stay inside the result.
    ///
    /// # Errors
    /// Returns a [`ProjError`] if the CRS pair is unsupported or no outline
    /// point could be transformed.
    pub fn reproject(&self, target: Crs) -> Result<Envelope, ProjError> {
        if self.crs == target {
            return Ok(*self);
        }
        let transform = CrsTransform::new(self.crs, target)?;
        self.reproject_with(&transform)
    }

    /// Reproject using an already constructed transform.
    ///
    /// # Errors
    /// Returns [`ProjError::TransformFailed`] if no outline point could be
    /// transformed.
    pub fn reproject_with(&self, transform: &CrsTransform) -> Result<Envelope, ProjError> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut valid = 0usize;

        for (x, y) in self.outline(EDGE_SAMPLES) {
            if let Ok((tx, ty)) = transform.transform(x, y) {
                if tx.is_finite() && ty.is_finite() {
                    min_x = min_x.min(tx);
                    min_y = min_y.min(ty);
                    max_x = max_x.max(tx);
                    max_y = max_y.max(ty);
                    valid += 1;
                }
            }
        }

        if valid == 0 {
            return Err(ProjError::TransformFailed(format!(
                "no point of {self:?} could be transformed to {}",
                transform.target()
            )));
        }
        Ok(Envelope { min_x, min_y, max_x, max_y, crs: transform.target() })
    }

    /// Points along the four edges, corners included once.
    fn outline(&self, per_edge: usize) -> Vec<(f64, f64)> {
        let pts = per_edge.max(2);
        let step_x = self.width() / (pts - 1) as f64;
        let step_y = self.height() / (pts - 1) as f64;
        let mut points = Vec::with_capacity(pts * 4);

        for i in 0..pts {
            let x = self.min_x + step_x * i as f64;
            points.push((x, self.max_y));
            points.push((x, self.min_y));
        }
        for i in 1..pts - 1 {
            let y = self.min_y + step_y * i as f64;
            points.push((self.min_x, y));
            points.push((self.max_x, y));
        }
        points
    }
}
