//! Mosaics: many rasters addressed as one surface.
//!
//! A level is assembled in a [`MosaicBuilder`], which worker tasks append to
//! concurrently. [`MosaicBuilder::finish`] freezes it into a [`Mosaic`]
//! that the next level reads from without locking.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::casting::{cell_count, f64_to_pixel_index};
use crate::geometry::{Crs, Envelope};
use crate::raster::Raster;

/// Append-only collection of rasters, safe for concurrent `add`.
#[derive(Debug)]
pub struct MosaicBuilder {
    crs: Crs,
    rasters: Mutex<Vec<Arc<Raster>>>,
}

impl MosaicBuilder {
    #[must_use]
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            rasters: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Add a raster. Insertion order does not matter.
    pub fn add(&self, raster: Raster) {
        self.rasters.lock().push(Arc::new(raster));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rasters.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze into a read-only mosaic.
    ///
    /// Rasters are put in a fixed spatial order (top to bottom, then left to
    /// right) so that lookups in overlapping areas do not depend on which
    /// task finished first.
    #[must_use]
    pub fn finish(self) -> Mosaic {
        let mut rasters = self.rasters.into_inner();
        rasters.sort_by(|a, b| spatial_order(&a.envelope, &b.envelope));
        Mosaic::from_rasters(self.crs, rasters)
    }
}

fn spatial_order(a: &Envelope, b: &Envelope) -> Ordering {
    b.max_y
        .total_cmp(&a.max_y)
        .then(a.min_x.total_cmp(&b.min_x))
        .then(b.min_y.total_cmp(&a.min_y))
        .then(a.max_x.total_cmp(&b.max_x))
}

/// Read-only surface over a set of rasters in one CRS.
#[derive(Debug, Clone)]
pub struct Mosaic {
    crs: Crs,
    rasters: Vec<Arc<Raster>>,
    envelope: Option<Envelope>,
}

impl Mosaic {
    fn from_rasters(crs: Crs, rasters: Vec<Arc<Raster>>) -> Self {
        let envelope = rasters
            .iter()
            .map(|r| Envelope { crs, ..r.envelope })
            .reduce(|acc, e| acc.union(&e));
        Self { crs, rasters, envelope }
    }

    #[must_use]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }

    #[must_use]
    pub fn rasters(&self) -> &[Arc<Raster>] {
        &self.rasters
    }

    /// Union of all constituent envelopes, `None` when empty.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        self.envelope
    }

    /// Finest (smallest) resolution along X and Y over all rasters.
    #[must_use]
    pub fn finest_resolution(&self) -> Option<(f64, f64)> {
        self.rasters.iter().map(|r| r.resolution()).reduce(|(ax, ay), (bx, by)| {
            (ax.min(bx), ay.min(by))
        })
    }

    /// Coarsest resolution over all rasters, on either axis.
    #[must_use]
    pub fn coarsest_resolution(&self) -> Option<f64> {
        self.rasters
            .iter()
            .map(|r| {
                let (x, y) = r.resolution();
                x.max(y)
            })
            .reduce(f64::max)
    }

    /// Pixel span `(columns, rows)` of the whole mosaic at its finest resolution.
    #[must_use]
    pub fn pixel_span(&self) -> Option<(usize, usize)> {
        let envelope = self.envelope?;
        let (res_x, res_y) = self.finest_resolution()?;
        Some((
            cell_count(envelope.width(), res_x)?,
            cell_count(envelope.height(), res_y)?,
        ))
    }

    /// The rasters overlapping `footprint` (given in the mosaic CRS).
    #[must_use]
    pub fn window(&self, footprint: &Envelope) -> MosaicWindow<'_> {
        let rasters = self
            .rasters
            .iter()
            .map(AsRef::as_ref)
            .filter(|r| r.envelope.intersects(footprint))
            .collect();
        MosaicWindow { rasters }
    }

    /// A window over every raster.
    #[must_use]
    pub fn full_window(&self) -> MosaicWindow<'_> {
        MosaicWindow {
            rasters: self.rasters.iter().map(AsRef::as_ref).collect(),
        }
    }
}

/// A subset of a mosaic's rasters, used for point lookups while
/// resampling one tile.
#[derive(Debug, Clone)]
pub struct MosaicWindow<'a> {
    rasters: Vec<&'a Raster>,
}

impl<'a> MosaicWindow<'a> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    /// The raster and pixel that contain world point `(x, y)`.
    ///
    /// Pixels are half-open so a point on a shared tile edge belongs to
    /// exactly one raster.
    #[must_use]
    pub fn locate(&self, x: f64, y: f64) -> Option<(&'a Raster, usize, usize)> {
        self.rasters.iter().find_map(|&raster| {
            let (fx, fy) = raster.world_to_pixel(x, y);
            let col = f64_to_pixel_index(fx, raster.width)?;
            let row = f64_to_pixel_index(fy, raster.height)?;
            Some((raster, col, row))
        })
    }

    /// Band values at world point `(x, y)`, if any raster covers it.
    #[must_use]
    pub fn value_at(&self, x: f64, y: f64) -> Option<&'a [f32]> {
        self.locate(x, y).map(|(raster, col, row)| raster.pixel(col, row))
    }
}
