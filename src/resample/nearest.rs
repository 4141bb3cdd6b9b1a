//! Nearest-neighbor resampling kernel.

use crate::mosaic::MosaicWindow;

/// Copy the values of the source pixel containing `(x, y)` into `out`.
///
/// Uses the corner-based pixel convention: a pixel owns `[col, col + 1)`,
/// so the containing pixel is the floor of the fractional coordinate.
/// Returns `false`, leaving `out` untouched, when no raster covers the point.
pub fn sample(window: &MosaicWindow<'_>, x: f64, y: f64, out: &mut [f32]) -> bool {
    let Some(values) = window.value_at(x, y) else {
        return false;
    };
    let n = values.len().min(out.len());
    out[..n].copy_from_slice(&values[..n]);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Crs, Envelope};
    use crate::mosaic::MosaicBuilder;
    use crate::raster::Raster;

    fn two_by_two() -> crate::mosaic::Mosaic {
        let crs = Crs::from_epsg(3857).unwrap();
        let raster = Raster::new(
            2,
            2,
            1,
            Envelope::from_corners(0.0, 0.0, 2.0, 2.0, crs),
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let builder = MosaicBuilder::new(crs);
        builder.add(raster);
        builder.finish()
    }

    #[test]
    fn test_center_of_pixel() {
        let mosaic = two_by_two();
        let window = mosaic.full_window();
        let mut out = [0.0];

        // Row 0 is the top of the envelope
        assert!(sample(&window, 0.5, 1.5, &mut out));
        assert_eq!(out, [1.0]);
        assert!(sample(&window, 1.5, 1.5, &mut out));
        assert_eq!(out, [2.0]);
        assert!(sample(&window, 0.5, 0.5, &mut out));
        assert_eq!(out, [3.0]);
        assert!(sample(&window, 1.5, 0.5, &mut out));
        assert_eq!(out, [4.0]);
    }

    #[test]
    fn test_upper_left_corner() {
        let mosaic = two_by_two();
        let mut out = [0.0];
        assert!(sample(&mosaic.full_window(), 0.0, 2.0, &mut out));
        assert_eq!(out, [1.0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mosaic = two_by_two();
        let window = mosaic.full_window();
        let mut out = [-1.0];

        assert!(!sample(&window, -0.1, 0.5, &mut out));
        assert!(!sample(&window, 2.0, 0.5, &mut out));
        assert!(!sample(&window, 0.5, 2.1, &mut out));
        assert_eq!(out, [-1.0]);
    }
}
