//! Raster codec abstraction.
//!
//! The builder only talks to rasters on disk through [`RasterIo`], so the
//! GeoTIFF codec can be swapped for another format or a test double.

use std::path::Path;

use crate::error::RasterIoError;
use crate::geometry::{Crs, OriginLocation};
use crate::geotiff_reader::read_geotiff;
use crate::geotiff_writer::{GeoTiffCompression, GeoTiffWriter};
use crate::raster::Raster;

/// How to interpret a raster file while loading it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Pixel convention for files that do not declare one.
    pub origin: OriginLocation,
    /// Forces the CRS of the loaded raster.
    pub crs: Option<Crs>,
}

/// Output encoding of pyramid tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    GeoTiff { compression: GeoTiffCompression },
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::GeoTiff { compression: GeoTiffCompression::None }
    }
}

impl OutputFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoTiff { .. } => "tif",
        }
    }
}

/// Loads and saves rasters. Implementations must be shareable across the
/// worker threads of a build.
pub trait RasterIo: Send + Sync {
    /// Load a raster file.
    ///
    /// # Errors
    /// Returns a [`RasterIoError`] if the file cannot be read or decoded.
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Raster, RasterIoError>;

    /// Save a raster in `format`, using `origin` for its georeferencing.
    ///
    /// # Errors
    /// Returns a [`RasterIoError`] if the file cannot be written.
    fn save(
        &self,
        raster: &Raster,
        path: &Path,
        format: &OutputFormat,
        origin: OriginLocation,
    ) -> Result<(), RasterIoError>;
}

/// [`RasterIo`] backed by the pure Rust GeoTIFF codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffIo;

impl RasterIo for GeoTiffIo {
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Raster, RasterIoError> {
        read_geotiff(path, options)
    }

    fn save(
        &self,
        raster: &Raster,
        path: &Path,
        format: &OutputFormat,
        origin: OriginLocation,
    ) -> Result<(), RasterIoError> {
        match format {
            OutputFormat::GeoTiff { compression } => GeoTiffWriter::new(raster)
                .compression(*compression)
                .origin(origin)
                .write(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Envelope;

    #[test]
    fn test_geotiff_io_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tif");
        let crs = Crs::from_epsg(3857).unwrap();
        let raster = Raster::filled(
            16,
            16,
            Envelope::from_corners(0.0, 0.0, 160.0, 160.0, crs),
            &[7.0],
        );

        let format = OutputFormat::GeoTiff { compression: GeoTiffCompression::Deflate };
        GeoTiffIo.save(&raster, &path, &format, OriginLocation::Outer).unwrap();
        let back = GeoTiffIo.load(&path, &LoadOptions::default()).unwrap();

        assert_eq!(back, raster);
    }

    #[test]
    fn test_multiband_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let crs = Crs::from_epsg(32633).unwrap();
        let envelope = Envelope::from_corners(0.0, 0.0, 80.0, 40.0, crs);

        for bands in [2, 5] {
            let path = dir.path().join(format!("bands-{bands}.tif"));
            let pixels = (0..8 * 4 * bands).map(|i| i as f32 - 3.5).collect();
            let raster = Raster::new(8, 4, bands, envelope, pixels).unwrap();

            GeoTiffIo
                .save(&raster, &path, &OutputFormat::default(), OriginLocation::Outer)
                .unwrap();
            let back = GeoTiffIo.load(&path, &LoadOptions::default()).unwrap();

            assert_eq!(back.bands, bands);
            assert_eq!(back, raster);
        }
    }

    #[test]
    fn test_missing_file() {
        let result = GeoTiffIo.load(Path::new("/nonexistent/file.tif"), &LoadOptions::default());
        assert!(matches!(result, Err(RasterIoError::Io(_))));
    }

    #[test]
    fn test_extension() {
        assert_eq!(OutputFormat::default().extension(), "tif");
    }
}
