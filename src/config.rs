//! Pyramid build configuration.

use std::path::{Path, PathBuf};

use crate::error::PyramidError;
use crate::geometry::{Crs, Envelope, OriginLocation};
use crate::geotiff_writer::GeoTiffCompression;
use crate::raster_io::OutputFormat;
use crate::resample::Interpolation;

/// Default upper bound on the tile edge in pixels.
pub const DEFAULT_MAX_TILE_SIZE: usize = 512;

/// Everything a [`PyramidBuilder`](crate::PyramidBuilder) needs besides the
/// input files.
///
/// # Example
///
/// ```rust
/// use rastertree::{Interpolation, PyramidBuildConfig};
///
/// # fn main() -> Result<(), rastertree::PyramidError> {
/// let config = PyramidBuildConfig::from_names("EPSG:32633", "EPSG:3857", "/tmp/pyramid")?
///     .with_max_tile_size(256)
///     .with_interpolation(Interpolation::Bilinear)
///     .with_num_threads(4);
/// config.validate()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidBuildConfig {
    /// CRS of the input rasters
    pub source_crs: Crs,
    /// CRS of the produced tiles
    pub dest_crs: Crs,
    /// Directory that receives one sub-directory per level
    pub output_root: PathBuf,
    /// Upper bound on the tile edge in pixels
    pub max_tile_size: usize,
    /// Use `max_tile_size` as is instead of searching for a better fit
    pub force_tile_size: bool,
    /// Area to tile, in `dest_crs` (default: the reprojected input extent)
    pub base_envelope: Option<Envelope>,
    /// Ground size of a level 1 pixel (default: derived from the inputs)
    pub base_resolution: Option<f64>,
    pub interpolation: Interpolation,
    /// Fill value for uncovered pixels, one per output band
    pub background_value: Vec<f32>,
    pub output_format: OutputFormat,
    /// Re-render tiles whose file already exists
    pub overwrite_existing_files: bool,
    /// Worker threads per phase
    pub num_threads: usize,
    /// Stop after this many levels instead of at the first single-tile level
    pub num_levels: Option<u32>,
    /// Pixel convention for reading inputs and writing tiles
    pub origin_location: OriginLocation,
}

impl PyramidBuildConfig {
    /// A configuration with default settings.
    pub fn new(source_crs: Crs, dest_crs: Crs, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_crs,
            dest_crs,
            output_root: output_root.into(),
            max_tile_size: DEFAULT_MAX_TILE_SIZE,
            force_tile_size: false,
            base_envelope: None,
            base_resolution: None,
            interpolation: Interpolation::default(),
            background_value: vec![0.0],
            output_format: OutputFormat::default(),
            overwrite_existing_files: false,
            num_threads: default_num_threads(),
            num_levels: None,
            origin_location: OriginLocation::default(),
        }
    }

    /// Like [`new`](Self::new), with the CRSs given by name (`EPSG:4326`,
    /// `4326`, or an OGC URN).
    ///
    /// # Errors
    /// Returns [`PyramidError::Projection`] for an unknown CRS name.
    pub fn from_names(
        source_crs: &str,
        dest_crs: &str,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self, PyramidError> {
        Ok(Self::new(
            Crs::from_name(source_crs)?,
            Crs::from_name(dest_crs)?,
            output_root,
        ))
    }

    #[must_use]
    pub fn with_max_tile_size(mut self, size: usize) -> Self {
        self.max_tile_size = size;
        self
    }

    #[must_use]
    pub fn with_force_tile_size(mut self, force: bool) -> Self {
        self.force_tile_size = force;
        self
    }

    #[must_use]
    pub fn with_base_envelope(mut self, envelope: Envelope) -> Self {
        self.base_envelope = Some(envelope);
        self
    }

    #[must_use]
    pub fn with_base_resolution(mut self, resolution: f64) -> Self {
        self.base_resolution = Some(resolution);
        self
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub fn with_background_value(mut self, values: Vec<f32>) -> Self {
        self.background_value = values;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Shorthand for a GeoTIFF output format with `compression`.
    #[must_use]
    pub fn with_compression(self, compression: GeoTiffCompression) -> Self {
        self.with_output_format(OutputFormat::GeoTiff { compression })
    }

    #[must_use]
    pub fn with_overwrite_existing_files(mut self, overwrite: bool) -> Self {
        self.overwrite_existing_files = overwrite;
        self
    }

    #[must_use]
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    #[must_use]
    pub fn with_num_levels(mut self, levels: u32) -> Self {
        self.num_levels = Some(levels);
        self
    }

    #[must_use]
    pub fn with_origin_location(mut self, origin: OriginLocation) -> Self {
        self.origin_location = origin;
        self
    }

    /// Directory of pyramid level `level`.
    #[must_use]
    pub fn level_directory(&self, level: u32) -> PathBuf {
        self.output_root.join(level.to_string())
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Check the settings that do not depend on the inputs.
    ///
    /// # Errors
    /// Returns [`PyramidError::InvalidConfig`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), PyramidError> {
        let invalid = |msg: &str| Err(PyramidError::InvalidConfig(msg.to_string()));

        if self.max_tile_size == 0 {
            return invalid("max_tile_size must be > 0");
        }
        if self.num_threads == 0 {
            return invalid("num_threads must be > 0");
        }
        if self.num_levels == Some(0) {
            return invalid("num_levels must be > 0");
        }
        if self.background_value.is_empty() {
            return invalid("background_value needs at least one band");
        }
        if let Some(res) = self.base_resolution {
            if !(res.is_finite() && res > 0.0) {
                return invalid("base_resolution must be positive and finite");
            }
        }
        if let Some(env) = &self.base_envelope {
            if env.crs != self.dest_crs {
                return Err(PyramidError::InvalidConfig(format!(
                    "base_envelope is in {} but dest_crs is {}",
                    env.crs, self.dest_crs
                )));
            }
            if !(env.width() > 0.0 && env.height() > 0.0) {
                return invalid("base_envelope must have a positive area");
            }
        }
        if self.output_root.as_os_str().is_empty() {
            return invalid("output_root must not be empty");
        }
        Ok(())
    }
}

fn default_num_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
