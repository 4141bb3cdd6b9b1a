#![doc = include_str!("../README.md")]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`builder`]: Level-by-level orchestration via [`PyramidBuilder`]
//! - [`loader`]: Concurrent loading of input files into the base [`Mosaic`]
//! - [`render`]: Resample, persist and reload a single tile
//! - [`tile_grid`]: Regular tile grids, tile size and resolution selection
//! - [`mosaic`]: Many rasters addressed as one surface
//! - [`resample`]: Nearest and bilinear resampling of tile footprints
//! - [`geometry`]: Envelopes, origin conventions and CRS transforms
//! - [`raster_io`]: Codec abstraction via the [`RasterIo`] trait
//! - [`geotiff_reader`] / [`geotiff_writer`]: Pure Rust GeoTIFF codec
//! - [`source`]: Input discovery from local directories
//! - [`pool`]: Bounded worker pools with cancellation

// ============================================================================
// Public modules
// ============================================================================

pub mod builder;
pub mod casting;
pub mod config;
pub mod error;
pub mod geometry;
pub mod geotiff_reader;
pub mod geotiff_writer;
pub mod loader;
pub mod mosaic;
pub mod pool;
pub mod raster;
pub mod raster_io;
pub mod render;
pub mod resample;
pub mod source;
pub mod tile_grid;

// ============================================================================
// Pyramid Building
// ============================================================================
// Primary API: PyramidBuilder::new(config).build(&inputs)

pub use builder::{
    build_pyramid,
    BuildResult,
    LevelReport,
    PyramidBuilder,
    PyramidGeometry,
    TileFailure,
};

pub use config::PyramidBuildConfig;

pub use loader::{
    load_base_mosaic,
    LoadFailure,
    LoadOutcome,
    LoadReport,
};

pub use render::TileOutcome;

// ============================================================================
// Tile Grids
// ============================================================================

pub use tile_grid::{
    compute_base_resolution,
    compute_grid,
    compute_optimal_tile_size,
    level_resolution,
    Tile,
    TileGrid,
};

// ============================================================================
// Rasters & Mosaics
// ============================================================================

pub use raster::Raster;
pub use mosaic::{Mosaic, MosaicBuilder, MosaicWindow};
pub use resample::{resample_tile, Interpolation};

// ============================================================================
// Geometry & Projections
// ============================================================================

pub use geometry::{Crs, CrsTransform, Envelope, OriginLocation};

// ============================================================================
// Raster I/O
// ============================================================================

pub use raster_io::{
    GeoTiffIo,
    LoadOptions,
    OutputFormat,
    RasterIo,
};

pub use geotiff_reader::{read_geotiff, read_geotiff_from};

pub use geotiff_writer::{
    GeoTiffCompression,
    GeoTiffWriter,
};

// ============================================================================
// Source Discovery
// ============================================================================

pub use source::{
    LocalInputSource,
    LocalScanOptions,
    LocalSourceStats,
};

// ============================================================================
// Errors & Concurrency
// ============================================================================

pub use error::{ProjError, PyramidError, RasterIoError, RenderError};

pub use pool::{JobOutcome, WorkerPool};

pub use tokio_util::sync::CancellationToken;
