//! Level-by-level pyramid orchestration.
//!
//! ```text
//! inputs ─load─▶ level 1 source ─render─▶ level 1 tiles ─reload─▶ level 2 source ─▶ ...
//! ```
//!
//! Every phase runs on its own [`WorkerPool`] and finishes completely
//! before the next one starts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PyramidBuildConfig;
use crate::error::{PyramidError, Result};
use crate::geometry::Envelope;
use crate::loader::{load_base_mosaic, LoadReport};
use crate::mosaic::{Mosaic, MosaicBuilder};
use crate::pool::{JobOutcome, WorkerPool};
use crate::raster_io::{GeoTiffIo, LoadOptions, RasterIo};
use crate::render::{render_tile, tile_path, RenderContext, TileOutcome};
use crate::tile_grid::{
    compute_base_resolution, compute_optimal_tile_size, level_resolution, Tile, TileGrid,
};

/// Geometry shared by all levels of a pyramid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PyramidGeometry {
    /// Area covered by the pyramid, in the destination CRS
    pub dest_envelope: Envelope,
    pub tile_size: usize,
    /// Pixel size of level 1
    pub base_resolution: f64,
}

/// A tile that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFailure {
    pub column: usize,
    pub row: usize,
    pub path: PathBuf,
    pub error: String,
}

/// Summary of one pyramid level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    pub level: u32,
    pub resolution: f64,
    pub columns: usize,
    pub rows: usize,
    pub directory: PathBuf,
    pub requested: usize,
    pub rendered: usize,
    pub skipped: usize,
    pub failed: Vec<TileFailure>,
    /// Tiles not attempted because the build was cancelled
    pub cancelled: usize,
}

impl LevelReport {
    /// Tiles available to the next level.
    #[must_use]
    pub fn produced(&self) -> usize {
        self.rendered + self.skipped
    }
}

/// Outcome of [`PyramidBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub load: LoadReport,
    /// `None` when the build was cancelled before any input loaded
    pub geometry: Option<PyramidGeometry>,
    pub levels: Vec<LevelReport>,
    pub cancelled: bool,
}

impl BuildResult {
    #[must_use]
    pub fn tiles_rendered(&self) -> usize {
        self.levels.iter().map(|l| l.rendered).sum()
    }

    #[must_use]
    pub fn tiles_skipped(&self) -> usize {
        self.levels.iter().map(|l| l.skipped).sum()
    }

    #[must_use]
    pub fn tiles_failed(&self) -> usize {
        self.levels.iter().map(|l| l.failed.len()).sum()
    }
}

/// Builds a tile pyramid from a set of input rasters.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::PathBuf;
/// use rastertree::{PyramidBuildConfig, PyramidBuilder};
///
/// # fn main() -> Result<(), rastertree::PyramidError> {
/// let config = PyramidBuildConfig::from_names("EPSG:32633", "EPSG:32633", "/data/pyramid")?
///     .with_max_tile_size(512)
///     .with_force_tile_size(true);
///
/// let inputs = vec![PathBuf::from("/data/in/a.tif"), PathBuf::from("/data/in/b.tif")];
/// let result = PyramidBuilder::new(config).build(&inputs)?;
/// for level in &result.levels {
///     println!("level {}: {}x{} tiles", level.level, level.columns, level.rows);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PyramidBuilder {
    config: PyramidBuildConfig,
    io: Arc<dyn RasterIo>,
    cancel: CancellationToken,
}

impl PyramidBuilder {
    #[must_use]
    pub fn new(config: PyramidBuildConfig) -> Self {
        Self {
            config,
            io: Arc::new(GeoTiffIo),
            cancel: CancellationToken::new(),
        }
    }

    /// Use another raster codec for reading inputs and writing tiles.
    #[must_use]
    pub fn with_io(mut self, io: Arc<dyn RasterIo>) -> Self {
        self.io = io;
        self
    }

    /// Stop scheduling work once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn config(&self) -> &PyramidBuildConfig {
        &self.config
    }

    /// Build the pyramid from `inputs`.
    ///
    /// Inputs and tiles that fail are reported in the result; only
    /// configuration problems, unwritable output directories and a
    /// complete lack of source data abort the build.
    ///
    /// # Errors
    /// Returns a [`PyramidError`] for the fatal cases above.
    pub fn build(&self, inputs: &[PathBuf]) -> Result<BuildResult> {
        if inputs.is_empty() {
            return Err(PyramidError::EmptyInput);
        }
        self.config.validate()?;
        create_dir(self.config.output_root())?;

        let options = LoadOptions {
            origin: self.config.origin_location,
            crs: Some(self.config.source_crs),
        };
        let loaded = load_base_mosaic(
            inputs,
            self.config.source_crs,
            self.config.num_threads,
            self.io.as_ref(),
            &options,
            &self.cancel,
        )?;
        if !loaded.report.failed.is_empty() {
            warn!(failed = loaded.report.failed.len(), "Some inputs could not be loaded");
        }

        if loaded.mosaic.is_empty() {
            if self.cancel.is_cancelled() {
                return Ok(BuildResult {
                    load: loaded.report,
                    geometry: None,
                    levels: Vec::new(),
                    cancelled: true,
                });
            }
            return Err(PyramidError::NoSourceData(inputs.len()));
        }

        let geometry = self.determine_geometry(&loaded.mosaic)?;
        let (center_x, center_y) = geometry.dest_envelope.center();
        info!(
            tile_size = geometry.tile_size,
            base_resolution = geometry.base_resolution,
            min_x = geometry.dest_envelope.min_x,
            min_y = geometry.dest_envelope.min_y,
            max_x = geometry.dest_envelope.max_x,
            max_y = geometry.dest_envelope.max_y,
            center_x,
            center_y,
            crs = %self.config.dest_crs,
            "Pyramid geometry"
        );

        let mut result = BuildResult {
            load: loaded.report,
            geometry: Some(geometry),
            levels: Vec::new(),
            cancelled: false,
        };
        let mut source = loaded.mosaic;
        let mut level = 1;
        loop {
            let grid = TileGrid::new(
                geometry.dest_envelope,
                geometry.tile_size,
                level_resolution(geometry.base_resolution, level),
                self.config.origin_location,
            )?;
            let (report, next) = self.render_level(level, &grid, &source)?;
            let produced = report.produced();
            result.levels.push(report);

            if self.cancel.is_cancelled() {
                info!(level, "Build cancelled");
                result.cancelled = true;
                break;
            }
            let done = match self.config.num_levels {
                Some(n) => level >= n,
                None => grid.is_single_tile(),
            };
            if done {
                break;
            }
            if produced == 0 {
                warn!(level, "Level produced no tiles, stopping");
                break;
            }
            source = next;
            level += 1;
        }

        info!(
            levels = result.levels.len(),
            rendered = result.tiles_rendered(),
            skipped = result.tiles_skipped(),
            failed = result.tiles_failed(),
            "Pyramid build finished"
        );
        Ok(result)
    }

    fn determine_geometry(&self, mosaic: &Mosaic) -> Result<PyramidGeometry> {
        let (Some(source_envelope), Some((columns, rows))) = (mosaic.envelope(), mosaic.pixel_span())
        else {
            return Err(PyramidError::Geometry("source mosaic has no extent".into()));
        };

        let dest_envelope = match self.config.base_envelope {
            Some(envelope) => envelope,
            None => source_envelope.reproject(self.config.dest_crs)?,
        };
        let tile_size = if self.config.force_tile_size {
            self.config.max_tile_size
        } else {
            compute_optimal_tile_size(columns, rows, &dest_envelope, self.config.max_tile_size)?
        };
        let base_resolution = match self.config.base_resolution {
            Some(resolution) => resolution,
            None => compute_base_resolution(columns, rows, &dest_envelope, tile_size)?,
        };

        Ok(PyramidGeometry {
            dest_envelope,
            tile_size,
            base_resolution,
        })
    }

    /// Render every tile of `grid` out of `source`; the returned mosaic
    /// holds the tiles that made it to disk.
    fn render_level(&self, level: u32, grid: &TileGrid, source: &Mosaic) -> Result<(LevelReport, Mosaic)> {
        let directory = self.config.level_directory(level);
        create_dir(&directory)?;
        info!(
            level,
            columns = grid.columns(),
            rows = grid.rows(),
            tiles = grid.tile_count(),
            resolution = grid.resolution(),
            "Rendering level"
        );

        let pool = WorkerPool::new(self.config.num_threads, &format!("rastertree-level{level}"))?;
        let target = MosaicBuilder::new(self.config.dest_crs);
        let ctx = RenderContext {
            level,
            source,
            target: &target,
            io: self.io.as_ref(),
            tile_size: grid.tile_size(),
            interpolation: self.config.interpolation,
            background: &self.config.background_value,
            output_format: &self.config.output_format,
            overwrite: self.config.overwrite_existing_files,
            origin: grid.origin(),
        };

        let tiles = grid.tiles();
        let outcomes = pool.run_all(tiles.clone(), &self.cancel, |tile: Tile| {
            let path = tile_path(&directory, &tile, ctx.output_format);
            render_tile(&ctx, &tile, &path)
        });

        let mut report = LevelReport {
            level,
            resolution: grid.resolution(),
            columns: grid.columns(),
            rows: grid.rows(),
            directory: directory.clone(),
            requested: tiles.len(),
            rendered: 0,
            skipped: 0,
            failed: Vec::new(),
            cancelled: 0,
        };
        for (tile, outcome) in tiles.iter().zip(outcomes) {
            match outcome {
                JobOutcome::Completed(TileOutcome::Rendered) => report.rendered += 1,
                JobOutcome::Completed(TileOutcome::Skipped) => report.skipped += 1,
                JobOutcome::Completed(TileOutcome::Failed(e)) => report.failed.push(TileFailure {
                    column: tile.column,
                    row: tile.row,
                    path: tile_path(&directory, tile, ctx.output_format),
                    error: e.to_string(),
                }),
                JobOutcome::Cancelled => report.cancelled += 1,
            }
        }

        info!(
            level,
            requested = report.requested,
            rendered = report.rendered,
            skipped = report.skipped,
            failed = report.failed.len(),
            "Finished level"
        );
        Ok((report, target.finish()))
    }
}

/// Build a pyramid with the default GeoTIFF codec.
///
/// # Errors
/// See [`PyramidBuilder::build`].
pub fn build_pyramid(inputs: &[PathBuf], config: PyramidBuildConfig) -> Result<BuildResult> {
    PyramidBuilder::new(config).build(inputs)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| PyramidError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
