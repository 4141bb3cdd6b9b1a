//! Rendering of a single pyramid tile.
//!
//! A render task resamples one tile footprint out of the previous level,
//! writes it to disk and registers the written raster in the next level's
//! mosaic. Failures stay inside the task and come back as
//! [`TileOutcome::Failed`].

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::RenderError;
use crate::geometry::OriginLocation;
use crate::mosaic::{Mosaic, MosaicBuilder};
use crate::raster_io::{LoadOptions, OutputFormat, RasterIo};
use crate::resample::{resample_tile, Interpolation};
use crate::tile_grid::Tile;

/// Level-wide settings shared by every render task of a level.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub level: u32,
    pub source: &'a Mosaic,
    pub target: &'a MosaicBuilder,
    pub io: &'a dyn RasterIo,
    pub tile_size: usize,
    pub interpolation: Interpolation,
    pub background: &'a [f32],
    pub output_format: &'a OutputFormat,
    pub overwrite: bool,
    pub origin: OriginLocation,
}

/// What happened to one tile.
#[derive(Debug)]
pub enum TileOutcome {
    /// Written and registered for the next level.
    Rendered,
    /// The file already existed; it was reloaded and registered.
    Skipped,
    Failed(RenderError),
}

/// Path of `tile` inside `directory`.
#[must_use]
pub fn tile_path(directory: &Path, tile: &Tile, format: &OutputFormat) -> PathBuf {
    directory.join(tile.file_name(format.extension()))
}

/// Produce `tile` at `path` and register it in `ctx.target`.
///
/// An existing file is reused unless `ctx.overwrite` is set.
pub fn render_tile(ctx: &RenderContext<'_>, tile: &Tile, path: &Path) -> TileOutcome {
    if !ctx.overwrite && path.exists() {
        return match reload(ctx, path) {
            Ok(()) => {
                debug!(level = ctx.level, column = tile.column, row = tile.row, "Reused existing tile");
                TileOutcome::Skipped
            }
            Err(e) => {
                warn!(
                    level = ctx.level,
                    column = tile.column,
                    row = tile.row,
                    path = %path.display(),
                    error = %e,
                    "Failed to reload existing tile"
                );
                TileOutcome::Failed(e)
            }
        };
    }

    match render_and_register(ctx, tile, path) {
        Ok(()) => {
            debug!(level = ctx.level, column = tile.column, row = tile.row, "Rendered tile");
            TileOutcome::Rendered
        }
        Err(e) => {
            warn!(
                level = ctx.level,
                column = tile.column,
                row = tile.row,
                path = %path.display(),
                error = %e,
                "Failed to render tile"
            );
            TileOutcome::Failed(e)
        }
    }
}

fn render_and_register(ctx: &RenderContext<'_>, tile: &Tile, path: &Path) -> Result<(), RenderError> {
    let raster = resample_tile(
        ctx.source,
        &tile.envelope,
        ctx.tile_size,
        ctx.tile_size,
        ctx.interpolation,
        ctx.background,
    )?;
    ctx.io.save(&raster, path, ctx.output_format, ctx.origin)?;
    reload(ctx, path)
}

/// Read a tile back from disk into the next level's mosaic.
fn reload(ctx: &RenderContext<'_>, path: &Path) -> Result<(), RenderError> {
    let options = LoadOptions {
        origin: ctx.origin,
        crs: Some(ctx.target.crs()),
    };
    let raster = ctx.io.load(path, &options)?;
    ctx.target.add(raster);
    Ok(())
}
