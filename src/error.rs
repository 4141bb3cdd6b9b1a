//! Error types.
//!
//! [`PyramidError`] is the only error that aborts a build. Codec and
//! projection errors raised inside worker tasks are caught at the task
//! boundary and recorded in the build reports instead.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors for a pyramid build.
#[derive(Error, Debug)]
pub enum PyramidError {
    #[error("No input files were given")]
    EmptyInput,

    #[error("Input directory does not exist: {}", .0.display())]
    MissingInputDirectory(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjError),

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("None of the {0} input files could be loaded")]
    NoSourceData(usize),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Errors raised by a raster codec.
#[derive(Error, Debug)]
pub enum RasterIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Missing georeferencing: {0}")]
    MissingGeoreference(String),

    #[error("No CRS declared: {0}")]
    MissingCrs(String),

    #[error("Unsupported sample layout: {0}")]
    Unsupported(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Errors raised by CRS lookups and coordinate transforms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjError {
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),

    #[error("Transform failed: {0}")]
    TransformFailed(String),
}

/// Errors raised while rendering a single tile.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] RasterIoError),

    #[error(transparent)]
    Projection(#[from] ProjError),

    #[error("Geometry error: {0}")]
    Geometry(String),
}

pub type Result<T, E = PyramidError> = std::result::Result<T, E>;
