//! Checked numeric conversions for raster geometry.
//!
//! # Assumptions
//!
//! ## Image Dimensions (`usize` ↔ `f64`)
//! `usize` to `f64` conversions are done without checks: `f64` represents
//! every integer up to 2^53 exactly and no raster gets close.
//!
//! ## Pixel Coordinates (`f64` → `usize`)
//! Float-to-index conversions are bounds checked because world coordinates
//! outside a raster map to negative or oversized indices.
//!
//! ## Cell Counts
//! Grid cell counts are ceilings of float ratios. A ratio that is an exact
//! integer up to floating error (`1.0000000000000002`) must not round up to
//! an extra, entirely empty, row or column.

use std::convert::TryFrom;

/// Relative tolerance applied before taking the ceiling of a cell count.
const CEIL_TOLERANCE: f64 = 1e-9;

/// Convert a `usize` to `u32`, failing on 64-bit overflow.
///
/// # Errors
/// Returns an error string if the value exceeds `u32::MAX`.
#[inline]
pub fn usize_to_u32(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("Value {value} exceeds u32 maximum"))
}

/// Convert a `usize` to `u16`, failing on overflow.
///
/// # Errors
/// Returns an error string if the value exceeds `u16::MAX`.
#[inline]
pub fn usize_to_u16(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("Value {value} exceeds u16 maximum (65535)"))
}

/// Convert a float to a pixel index, returning `None` if out of bounds.
///
/// Negative, NaN and `>= max_value` inputs map to `None`.
#[inline]
#[must_use]
pub fn f64_to_pixel_index(value: f64, max_value: usize) -> Option<usize> {
    if value.is_nan() || value < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = value as usize;
    if index >= max_value {
        None
    } else {
        Some(index)
    }
}

/// Number of cells of size `cell` needed to cover `span`, at least one.
///
/// Returns `None` for non-finite or non-positive inputs.
#[must_use]
pub fn cell_count(span: f64, cell: f64) -> Option<usize> {
    if !span.is_finite() || !cell.is_finite() || cell <= 0.0 || span < 0.0 {
        return None;
    }
    let ratio = span / cell;
    let snapped = if (ratio - ratio.round()).abs() <= CEIL_TOLERANCE * ratio.max(1.0) {
        ratio.round()
    } else {
        ratio.ceil()
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((snapped as usize).max(1))
}
