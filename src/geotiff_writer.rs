//! GeoTIFF writer for pyramid tiles.
//!
//! Pure Rust (no GDAL): pixel data goes through the `tiff` encoder and the
//! georeferencing is written as ModelPixelScale, ModelTiepoint and
//! GeoKeyDirectory tags. The tiepoint and `GTRasterTypeGeoKey` follow the
//! requested [`OriginLocation`], so a reader can recover the outer envelope
//! under either convention.
//!
//! # Example
//!
//! ```rust,no_run
//! use rastertree::{Crs, Envelope, Raster};
//! use rastertree::geotiff_writer::{GeoTiffCompression, GeoTiffWriter};
//!
//! let crs = Crs::from_name("EPSG:32633")?;
//! let envelope = Envelope::new(500000.0, 5000000.0, 505120.0, 5005120.0, crs)?;
//! let tile = Raster::filled(512, 512, envelope, &[0.0]);
//!
//! GeoTiffWriter::new(&tile)
//!     .compression(GeoTiffCompression::Lzw)
//!     .write("tile.tif")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::colortype::{Gray32Float, RGB32Float, RGBA32Float};
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder};
use tiff::tags::Tag;

use crate::casting::{usize_to_u16, usize_to_u32};
use crate::error::RasterIoError;
use crate::geometry::OriginLocation;
use crate::raster::Raster;

// GeoKey IDs
pub(crate) const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub(crate) const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub(crate) const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub(crate) const RASTER_PIXEL_IS_AREA: u16 = 1;
pub(crate) const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Compression method for GeoTIFF output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeoTiffCompression {
    /// No compression - fastest but largest files
    #[default]
    None,
    /// LZW compression - good balance of speed and size
    Lzw,
    /// Deflate (zlib) compression - better compression, slower
    Deflate,
}

/// Builder for configuring GeoTIFF output
pub struct GeoTiffWriter<'a> {
    raster: &'a Raster,
    compression: GeoTiffCompression,
    origin: OriginLocation,
}

impl<'a> GeoTiffWriter<'a> {
    #[must_use]
    pub fn new(raster: &'a Raster) -> Self {
        Self {
            raster,
            compression: GeoTiffCompression::default(),
            origin: OriginLocation::default(),
        }
    }

    #[must_use]
    pub fn compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Georeferencing convention for the tiepoint.
    #[must_use]
    pub fn origin(mut self, origin: OriginLocation) -> Self {
        self.origin = origin;
        self
    }

    /// Write to a file path
    ///
    /// # Errors
    /// Returns a [`RasterIoError`] if the file cannot be created or encoded.
    pub fn write<P: AsRef<Path>>(self, path: P) -> Result<(), RasterIoError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write to any writer that implements Write + Seek
    ///
    /// # Errors
    /// Returns a [`RasterIoError`] if the raster is empty or encoding fails.
    pub fn write_to<W: Write + Seek>(self, writer: W) -> Result<(), RasterIoError> {
        let raster = self.raster;

        if raster.pixels.is_empty() || raster.width == 0 || raster.height == 0 {
            return Err(RasterIoError::InvalidData(
                "Raster has no pixel data".to_string(),
            ));
        }

        let width = usize_to_u32(raster.width).map_err(RasterIoError::InvalidData)?;
        let height = usize_to_u32(raster.height).map_err(RasterIoError::InvalidData)?;

        let compression = match self.compression {
            GeoTiffCompression::None => Compression::Uncompressed,
            GeoTiffCompression::Lzw => Compression::Lzw,
            GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Fast),
        };

        let encoder = TiffEncoder::new(writer)?.with_compression(compression);
        self.write_image(encoder, width, height)
    }

    fn write_image<W: Write + Seek>(
        &self,
        mut encoder: TiffEncoder<W>,
        width: u32,
        height: u32,
    ) -> Result<(), RasterIoError> {
        // 1, 3 and 4 bands go through the typed API; anything else through
        // the low-level directory encoder.
        match self.raster.bands {
            1 => {
                let mut image = encoder.new_image::<Gray32Float>(width, height)?;
                self.write_geotiff_tags(image.encoder())?;
                image.write_data(&self.raster.pixels)?;
            }
            3 => {
                let mut image = encoder.new_image::<RGB32Float>(width, height)?;
                self.write_geotiff_tags(image.encoder())?;
                image.write_data(&self.raster.pixels)?;
            }
            4 => {
                let mut image = encoder.new_image::<RGBA32Float>(width, height)?;
                self.write_geotiff_tags(image.encoder())?;
                image.write_data(&self.raster.pixels)?;
            }
            _ => self.write_multiband_image(encoder, width, height)?,
        }
        Ok(())
    }

    /// Arbitrary band counts as a single uncompressed strip.
    fn write_multiband_image<W: Write + Seek>(
        &self,
        mut encoder: TiffEncoder<W>,
        width: u32,
        height: u32,
    ) -> Result<(), RasterIoError> {
        let bands = self.raster.bands;
        let samples = usize_to_u16(bands).map_err(RasterIoError::InvalidData)?;

        let mut dir = encoder.image_directory()?;

        dir.write_tag(Tag::ImageWidth, width)?;
        dir.write_tag(Tag::ImageLength, height)?;

        let bits_per_sample: Vec<u16> = vec![32; bands];
        dir.write_tag(Tag::BitsPerSample, bits_per_sample.as_slice())?;

        // 1 = no compression
        dir.write_tag(Tag::Compression, 1u16)?;

        // 1 = BlackIsZero
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
        dir.write_tag(Tag::SamplesPerPixel, samples)?;

        // 3 = IEEE floating point
        let sample_format: Vec<u16> = vec![3; bands];
        dir.write_tag(Tag::SampleFormat, sample_format.as_slice())?;

        // 1 = chunky (interleaved)
        dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
        dir.write_tag(Tag::RowsPerStrip, height)?;

        if bands > 1 {
            let extra_samples: Vec<u16> = vec![0; bands - 1];
            dir.write_tag(Tag::ExtraSamples, extra_samples.as_slice())?;
        }

        self.write_geotiff_tags(&mut dir)?;

        let pixel_bytes: Vec<u8> = self
            .raster
            .pixels
            .iter()
            .flat_map(|&f| f.to_le_bytes())
            .collect();

        // Classic TIFF wants a LONG offset, not the LONG8 `write_data` returns
        let strip_offset = u32::try_from(dir.write_data(pixel_bytes.as_slice())?)
            .map_err(|_| RasterIoError::InvalidData("strip offset exceeds 4 GiB".into()))?;
        dir.write_tag(Tag::StripOffsets, strip_offset)?;

        let strip_byte_count = usize_to_u32(pixel_bytes.len()).map_err(RasterIoError::InvalidData)?;
        dir.write_tag(Tag::StripByteCounts, strip_byte_count)?;

        dir.finish()?;
        Ok(())
    }

    fn write_geotiff_tags<W: Write + Seek, K: tiff::encoder::TiffKind>(
        &self,
        dir: &mut tiff::encoder::DirectoryEncoder<W, K>,
    ) -> Result<(), RasterIoError> {
        let raster = self.raster;
        let (res_x, res_y) = raster.resolution();

        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
        let pixel_scale = [res_x, res_y, 0.0];
        dir.write_tag(Tag::ModelPixelScaleTag, pixel_scale.as_slice())?;

        // ModelTiepoint: [I, J, K, X, Y, Z], pixel (0, 0) to its anchor
        let (x, y) = self.origin.anchor(&raster.envelope, res_x, res_y);
        let tiepoint = [0.0, 0.0, 0.0, x, y, 0.0];
        dir.write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())?;

        let geokeys = self.build_geokey_directory();
        dir.write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())?;

        // GeoAsciiParams are pipe terminated
        let ascii_params = format!("{}|", raster.crs().proj_string());
        dir.write_tag(Tag::GeoAsciiParamsTag, ascii_params.as_bytes())?;

        Ok(())
    }

    fn build_geokey_directory(&self) -> Vec<u16> {
        // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys,
        //  KeyID1, TIFFTagLocation1, Count1, Value_Offset1, ...]
        let crs = self.raster.crs();
        let is_geographic = crs.is_geographic();

        let mut keys = vec![1, 1, 0, 3];

        keys.extend_from_slice(&[
            GT_MODEL_TYPE_GEO_KEY,
            0,
            1,
            if is_geographic {
                MODEL_TYPE_GEOGRAPHIC
            } else {
                MODEL_TYPE_PROJECTED
            },
        ]);

        let raster_type = match self.origin {
            OriginLocation::Outer => RASTER_PIXEL_IS_AREA,
            OriginLocation::Center => RASTER_PIXEL_IS_POINT,
        };
        keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, raster_type]);

        if is_geographic {
            keys.extend_from_slice(&[GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, crs.epsg()]);
        } else {
            keys.extend_from_slice(&[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, crs.epsg()]);
        }

        keys
    }
}

/// Encode a raster as GeoTIFF bytes.
///
/// # Errors
/// Returns a [`RasterIoError`] if encoding fails.
pub fn to_geotiff_bytes(
    raster: &Raster,
    compression: GeoTiffCompression,
    origin: OriginLocation,
) -> Result<Vec<u8>, RasterIoError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    GeoTiffWriter::new(raster)
        .compression(compression)
        .origin(origin)
        .write_to(&mut buffer)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Crs, Envelope};

    fn create_test_raster(bands: usize, width: usize, height: usize) -> Raster {
        let pixels: Vec<f32> = (0..width * height * bands)
            .map(|i| (i % 256) as f32)
            .collect();
        let envelope = Envelope::from_corners(
            500000.0,
            4000000.0,
            500000.0 + 10.0 * width as f64,
            4000000.0 + 10.0 * height as f64,
            Crs::from_epsg(32610).unwrap(),
        );
        Raster::new(width, height, bands, envelope, pixels).unwrap()
    }

    #[test]
    fn test_write_grayscale_geotiff() {
        let raster = create_test_raster(1, 64, 64);
        let bytes = to_geotiff_bytes(&raster, GeoTiffCompression::None, OriginLocation::Outer)
            .unwrap();

        assert!(bytes.len() > 8);
        assert!(bytes[0] == b'I' && bytes[1] == b'I' || bytes[0] == b'M' && bytes[1] == b'M');
    }

    #[test]
    fn test_write_rgb_and_rgba() {
        for bands in [3, 4] {
            let raster = create_test_raster(bands, 16, 16);
            let bytes = to_geotiff_bytes(&raster, GeoTiffCompression::None, OriginLocation::Outer)
                .unwrap();
            assert!(bytes.len() > 16 * 16 * bands * 4);
        }
    }

    #[test]
    fn test_write_compressed() {
        let raster = create_test_raster(1, 128, 128);
        for compression in [GeoTiffCompression::Lzw, GeoTiffCompression::Deflate] {
            let bytes = to_geotiff_bytes(&raster, compression, OriginLocation::Outer).unwrap();
            assert!(bytes.len() > 8);
        }
    }

    #[test]
    fn test_multiband_geotiff() {
        for bands in [2, 5] {
            let raster = create_test_raster(bands, 10, 10);
            let bytes = to_geotiff_bytes(&raster, GeoTiffCompression::None, OriginLocation::Outer)
                .unwrap();

            let cursor = std::io::Cursor::new(bytes);
            let mut decoder = tiff::decoder::Decoder::new(cursor).unwrap();
            assert_eq!(decoder.dimensions().unwrap(), (10, 10));
            match decoder.read_image().unwrap() {
                tiff::decoder::DecodingResult::F32(samples) => assert_eq!(samples, raster.pixels),
                other => panic!("{bands} bands decoded as {other:?}"),
            }
        }
    }

    #[test]
    fn test_geokey_directory_projected() {
        let raster = create_test_raster(1, 10, 10);
        let geokeys = GeoTiffWriter::new(&raster).build_geokey_directory();

        assert_eq!(&geokeys[..4], &[1, 1, 0, 3]);
        assert_eq!(geokeys[4], GT_MODEL_TYPE_GEO_KEY);
        assert_eq!(geokeys[7], MODEL_TYPE_PROJECTED);
        assert_eq!(geokeys[8], GT_RASTER_TYPE_GEO_KEY);
        assert_eq!(geokeys[11], RASTER_PIXEL_IS_AREA);
        assert_eq!(geokeys[12], PROJECTED_CS_TYPE_GEO_KEY);
        assert_eq!(geokeys[15], 32610);
    }

    #[test]
    fn test_geokey_directory_geographic_center() {
        let mut raster = create_test_raster(1, 10, 10);
        raster.envelope = Envelope::from_corners(
            -122.5,
            37.0,
            -122.0,
            37.5,
            Crs::from_epsg(4326).unwrap(),
        );

        let geokeys = GeoTiffWriter::new(&raster)
            .origin(OriginLocation::Center)
            .build_geokey_directory();

        assert_eq!(geokeys[7], MODEL_TYPE_GEOGRAPHIC);
        assert_eq!(geokeys[11], RASTER_PIXEL_IS_POINT);
        assert_eq!(geokeys[12], GEOGRAPHIC_TYPE_GEO_KEY);
        assert_eq!(geokeys[15], 4326);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.tif");

        GeoTiffWriter::new(&create_test_raster(1, 32, 32))
            .write(&path)
            .unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
