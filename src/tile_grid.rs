//! Regular tile grids over a destination envelope.
//!
//! A grid partitions an envelope into `columns x rows` square tiles of
//! `tile_size` pixels at a fixed ground resolution. Row 0 is at the top
//! (max Y) and tiles are enumerated row-major, column varying fastest.
//! All tiles share the same ground size, so the last column and row may
//! reach past the envelope; that margin is filled with background when the
//! tile is rendered.

use crate::casting::cell_count;
use crate::error::PyramidError;
use crate::geometry::{Envelope, OriginLocation};

/// One cell of a [`TileGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub column: usize,
    pub row: usize,
    pub envelope: Envelope,
}

impl Tile {
    /// `<col>-<row>.<extension>`
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}-{}.{extension}", self.column, self.row)
    }
}

/// A regular array of tiles covering an envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    envelope: Envelope,
    tile_size: usize,
    resolution: f64,
    origin: OriginLocation,
    columns: usize,
    rows: usize,
}

impl TileGrid {
    /// # Errors
    /// Returns [`PyramidError::Geometry`] for a zero tile size or a
    /// non-positive or non-finite resolution.
    pub fn new(
        envelope: Envelope,
        tile_size: usize,
        resolution: f64,
        origin: OriginLocation,
    ) -> Result<Self, PyramidError> {
        if tile_size == 0 {
            return Err(PyramidError::Geometry("tile size must be > 0".into()));
        }
        let span = tile_size as f64 * resolution;
        let (Some(columns), Some(rows)) = (
            cell_count(envelope.width(), span),
            cell_count(envelope.height(), span),
        ) else {
            return Err(PyramidError::Geometry(format!(
                "cannot tile {envelope:?} with {tile_size} px at resolution {resolution}"
            )));
        };
        Ok(Self { envelope, tile_size, resolution, origin, columns, rows })
    }

    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    #[must_use]
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    #[must_use]
    pub fn origin(&self) -> OriginLocation {
        self.origin
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Ground size of one tile edge.
    #[must_use]
    pub fn tile_span(&self) -> f64 {
        self.tile_size as f64 * self.resolution
    }

    #[must_use]
    pub fn is_single_tile(&self) -> bool {
        self.columns == 1 && self.rows == 1
    }

    /// The tile at `(column, row)`. Indices past the grid extend it.
    #[must_use]
    pub fn tile(&self, column: usize, row: usize) -> Tile {
        let span = self.tile_span();
        let min_x = self.envelope.min_x + column as f64 * span;
        let max_y = self.envelope.max_y - row as f64 * span;
        Tile {
            column,
            row,
            envelope: Envelope {
                min_x,
                min_y: max_y - span,
                max_x: min_x + span,
                max_y,
                crs: self.envelope.crs,
            },
        }
    }

    /// All tiles, row-major.
    #[must_use]
    pub fn tiles(&self) -> Vec<Tile> {
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |column| (column, row)))
            .map(|(column, row)| self.tile(column, row))
            .collect()
    }

    /// Georeferenced anchor of a tile's first pixel under the grid's
    /// origin convention.
    #[must_use]
    pub fn tile_origin(&self, tile: &Tile) -> (f64, f64) {
        self.origin.anchor(&tile.envelope, self.resolution, self.resolution)
    }

    /// Envelope covered by all tiles together.
    #[must_use]
    pub fn coverage(&self) -> Envelope {
        let span = self.tile_span();
        Envelope {
            max_x: self.envelope.min_x + self.columns as f64 * span,
            min_y: self.envelope.max_y - self.rows as f64 * span,
            ..self.envelope
        }
    }
}

/// Partition `envelope` into tiles of `tile_size` pixels at `resolution`.
///
/// # Errors
/// See [`TileGrid::new`].
pub fn compute_grid(
    envelope: Envelope,
    tile_size: usize,
    resolution: f64,
    origin: OriginLocation,
) -> Result<Vec<Tile>, PyramidError> {
    Ok(TileGrid::new(envelope, tile_size, resolution, origin)?.tiles())
}

/// Resolution of pyramid level `level` (1-based): each level doubles the
/// ground size of a pixel.
#[must_use]
pub fn level_resolution(base_resolution: f64, level: u32) -> f64 {
    base_resolution * 2f64.powi(level.saturating_sub(1).min(1023) as i32)
}

/// The coarsest resolution that still gives the destination at least the
/// source's pixel density along each axis.
///
/// # Errors
/// Returns [`PyramidError::Geometry`] for zero source dimensions, a zero
/// tile size or a degenerate envelope.
pub fn compute_base_resolution(
    source_columns: usize,
    source_rows: usize,
    dest_envelope: &Envelope,
    tile_size: usize,
) -> Result<f64, PyramidError> {
    if source_columns == 0 || source_rows == 0 || tile_size == 0 {
        return Err(PyramidError::Geometry(format!(
            "cannot derive a resolution from {source_columns}x{source_rows} source pixels \
             and tile size {tile_size}"
        )));
    }
    let resolution = (dest_envelope.width() / source_columns as f64)
        .max(dest_envelope.height() / source_rows as f64);
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(PyramidError::Geometry(format!(
            "degenerate destination envelope {dest_envelope:?}"
        )));
    }
    Ok(resolution)
}

/// The tile size `<= max_tile_size` that wastes the fewest background
/// pixels at the grid's outer edge, at one destination pixel per source
/// pixel.
///
/// A destination that fits in one tile gets a tile exactly its size.
/// Otherwise sizes from `max_tile_size` down to half of it are scored by
/// `ceil(w/t) * ceil(h/t) * t^2 - w * h`; ties go to the larger size.
///
/// # Errors
/// Returns [`PyramidError::Geometry`] if the base resolution cannot be
/// derived or `max_tile_size` is zero.
pub fn compute_optimal_tile_size(
    source_columns: usize,
    source_rows: usize,
    dest_envelope: &Envelope,
    max_tile_size: usize,
) -> Result<usize, PyramidError> {
    if max_tile_size == 0 {
        return Err(PyramidError::Geometry("maximum tile size must be > 0".into()));
    }
    let resolution = compute_base_resolution(source_columns, source_rows, dest_envelope, max_tile_size)?;
    let (Some(width), Some(height)) = (
        cell_count(dest_envelope.width(), resolution),
        cell_count(dest_envelope.height(), resolution),
    ) else {
        return Err(PyramidError::Geometry(format!(
            "degenerate destination envelope {dest_envelope:?}"
        )));
    };

    let largest = width.max(height);
    if largest <= max_tile_size {
        return Ok(largest);
    }

    let waste = |t: usize| -> u128 {
        let covered = (width.div_ceil(t) * height.div_ceil(t)) as u128 * (t as u128) * (t as u128);
        covered - (width as u128) * (height as u128)
    };

    let smallest = (max_tile_size / 2).max(1);
    let mut best = max_tile_size;
    let mut best_waste = waste(best);
    for size in (smallest..max_tile_size).rev() {
        let w = waste(size);
        if w < best_waste {
            best = size;
            best_waste = w;
        }
    }
    Ok(best)
}
