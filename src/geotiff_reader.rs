//! GeoTIFF reader for pyramid inputs and written tiles.
//!
//! Decodes the first image of a TIFF into a [`Raster`] with `f32` samples
//! and recovers its envelope from the ModelPixelScale and ModelTiepoint
//! tags. `GTRasterTypeGeoKey` decides whether the tiepoint names a pixel
//! center or a pixel corner; files without the key fall back to the
//! convention given in [`LoadOptions`].

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::error::RasterIoError;
use crate::geometry::{Crs, OriginLocation};
use crate::geotiff_writer::{
    GEOGRAPHIC_TYPE_GEO_KEY, GT_RASTER_TYPE_GEO_KEY, PROJECTED_CS_TYPE_GEO_KEY,
    RASTER_PIXEL_IS_AREA, RASTER_PIXEL_IS_POINT,
};
use crate::raster::Raster;
use crate::raster_io::LoadOptions;

/// GeoKey value for a user-defined CRS.
const USER_DEFINED: u16 = 32767;

/// Read a GeoTIFF file.
///
/// # Errors
/// Returns a [`RasterIoError`] if the file cannot be opened or decoded, or
/// if it carries no usable georeferencing.
pub fn read_geotiff<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Raster, RasterIoError> {
    let file = File::open(path)?;
    read_geotiff_from(BufReader::new(file), options)
}

/// Read a GeoTIFF from any seekable reader.
///
/// # Errors
/// See [`read_geotiff`].
pub fn read_geotiff_from<R: Read + Seek>(reader: R, options: &LoadOptions) -> Result<Raster, RasterIoError> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let pixel_scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .ok_or_else(|| RasterIoError::MissingGeoreference("no ModelPixelScale tag".into()))?
        .into_f64_vec()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .ok_or_else(|| RasterIoError::MissingGeoreference("no ModelTiepoint tag".into()))?
        .into_f64_vec()?;
    let geokeys = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(value) => value.into_u16_vec()?,
        None => Vec::new(),
    };

    if pixel_scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterIoError::MissingGeoreference(format!(
            "malformed georeferencing: scale {pixel_scale:?}, tiepoint {tiepoint:?}"
        )));
    }
    let (res_x, res_y) = (pixel_scale[0], pixel_scale[1].abs());
    if !(res_x > 0.0 && res_y > 0.0) {
        return Err(RasterIoError::MissingGeoreference(format!(
            "non-positive pixel scale {pixel_scale:?}"
        )));
    }

    let origin = match geokey_value(&geokeys, GT_RASTER_TYPE_GEO_KEY) {
        Some(RASTER_PIXEL_IS_POINT) => OriginLocation::Center,
        Some(RASTER_PIXEL_IS_AREA) => OriginLocation::Outer,
        _ => options.origin,
    };

    let crs = match options.crs {
        Some(crs) => crs,
        None => embedded_crs(&geokeys)?,
    };

    let samples = decode_samples(decoder.read_image()?)?;
    let pixel_count = width * height;
    if pixel_count == 0 || samples.len() % pixel_count != 0 {
        return Err(RasterIoError::InvalidData(format!(
            "{} samples do not fill a {width}x{height} image",
            samples.len()
        )));
    }
    let bands = samples.len() / pixel_count;

    // Move the tiepoint (I, J) -> (X, Y) to pixel (0, 0)
    let anchor = (
        tiepoint[3] - tiepoint[0] * res_x,
        tiepoint[4] + tiepoint[1] * res_y,
    );
    let envelope = origin.envelope_from_anchor(anchor, res_x, res_y, width, height, crs);

    Raster::new(width, height, bands, envelope, samples)
}

/// Value of a GeoKey stored inline in the directory.
fn geokey_value(geokeys: &[u16], key: u16) -> Option<u16> {
    geokeys
        .get(4..)?
        .chunks_exact(4)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

fn embedded_crs(geokeys: &[u16]) -> Result<Crs, RasterIoError> {
    let code = geokey_value(geokeys, PROJECTED_CS_TYPE_GEO_KEY)
        .filter(|&c| c != USER_DEFINED)
        .or_else(|| geokey_value(geokeys, GEOGRAPHIC_TYPE_GEO_KEY).filter(|&c| c != USER_DEFINED))
        .ok_or_else(|| RasterIoError::MissingCrs("no EPSG code in GeoKeyDirectory".into()))?;
    Crs::from_epsg(u32::from(code)).map_err(|e| RasterIoError::MissingCrs(e.to_string()))
}

/// Widen decoded samples to `f32`. Values above 2^24 lose precision.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn decode_samples(result: DecodingResult) -> Result<Vec<f32>, RasterIoError> {
    let samples = match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        _ => {
            return Err(RasterIoError::Unsupported(
                "sample type is not one of u8, u16, i16, u32, i32, f32, f64".into(),
            ))
        }
    };
    Ok(samples)
}
