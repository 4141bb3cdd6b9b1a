//! Resampling of tile footprints out of a mosaic.
//!
//! For each output pixel the center is projected back into the mosaic CRS
//! and sampled with the configured kernel. Output pixels that no source
//! raster covers keep the background value.

pub mod bilinear;
pub mod nearest;

use crate::error::RenderError;
use crate::geometry::{CrsTransform, Envelope};
use crate::mosaic::{Mosaic, MosaicWindow};
use crate::raster::Raster;

/// Available interpolation kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    NearestNeighbor,
    Bilinear,
}

impl Interpolation {
    /// Parse from a string name.
    #[must_use]
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nearest" | "nearest_neighbor" | "nearestneighbor" | "nearest-neighbor" => {
                Some(Self::NearestNeighbor)
            }
            "bilinear" => Some(Self::Bilinear),
            _ => None,
        }
    }
}

/// Resample `target` out of `mosaic` into a `columns` x `rows` raster in
/// the target's CRS.
///
/// The output has one band per `background` value. Source bands beyond that
/// are dropped; missing source bands keep the background.
///
/// # Errors
/// Returns a [`RenderError`] if the CRS pair is unsupported or the target
/// is degenerate.
pub fn resample_tile(
    mosaic: &Mosaic,
    target: &Envelope,
    columns: usize,
    rows: usize,
    interpolation: Interpolation,
    background: &[f32],
) -> Result<Raster, RenderError> {
    if columns == 0 || rows == 0 || background.is_empty() {
        return Err(RenderError::Geometry(format!(
            "cannot resample into {columns}x{rows} pixels with {} bands",
            background.len()
        )));
    }

    let mut out = Raster::filled(columns, rows, *target, background);
    if mosaic.is_empty() {
        return Ok(out);
    }

    // Output pixel centers are projected target -> source
    let transform = CrsTransform::new(target.crs, mosaic.crs())?;
    let window = source_window(mosaic, target, &transform);
    if window.is_empty() {
        return Ok(out);
    }

    let bands = background.len();
    for row in 0..rows {
        for col in 0..columns {
            let (x, y) = out.pixel_center(col, row);
            let Ok((sx, sy)) = transform.transform(x, y) else {
                continue;
            };

            let pixel = out.pixel_mut(col, row);
            let covered = match interpolation {
                Interpolation::NearestNeighbor => nearest::sample(&window, sx, sy, pixel),
                Interpolation::Bilinear => bilinear::sample(&window, sx, sy, pixel),
            };
            if !covered {
                pixel.copy_from_slice(&background[..bands]);
            }
        }
    }

    Ok(out)
}

/// Rasters that can contribute to `target`, padded by one coarse source
/// pixel so bilinear neighbours across the footprint edge are found.
fn source_window<'a>(
    mosaic: &'a Mosaic,
    target: &Envelope,
    transform: &CrsTransform,
) -> MosaicWindow<'a> {
    let Ok(footprint) = target.reproject_with(transform) else {
        return mosaic.full_window();
    };
    let pad = mosaic.coarsest_resolution().unwrap_or(0.0);
    let padded = Envelope::from_corners(
        footprint.min_x - pad,
        footprint.min_y - pad,
        footprint.max_x + pad,
        footprint.max_y + pad,
        footprint.crs,
    );
    mosaic.window(&padded)
}
