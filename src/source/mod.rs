//! Input raster discovery.
//!
//! # Example
//!
//! ```rust,no_run
//! use rastertree::source::{LocalInputSource, LocalScanOptions};
//!
//! fn main() -> Result<(), rastertree::PyramidError> {
//!     // Every GeoTIFF below the directory, recursively
//!     let source = LocalInputSource::scan("/path/to/tiles", &LocalScanOptions::default())?;
//!
//!     // Only files directly inside it
//!     let flat = LocalInputSource::scan("/path/to/tiles", &LocalScanOptions::flat())?;
//!
//!     println!("{} inputs, {:.1} MB", source.len(), source.stats().total_size_mb());
//!     println!("{} top-level inputs", flat.len());
//!     Ok(())
//! }
//! ```

pub mod local;

pub use local::{LocalInputSource, LocalScanOptions, LocalSourceStats};
