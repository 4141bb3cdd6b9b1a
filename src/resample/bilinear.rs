//! Bilinear interpolation resampling kernel.

use crate::casting::f64_to_pixel_index;
use crate::mosaic::MosaicWindow;
use crate::raster::Raster;

/// Interpolate the four source pixel centers around `(x, y)` into `out`.
///
/// Neighbours that fall outside the raster containing the point are looked
/// up in the rest of the window, so interpolation is seamless across tile
/// edges. Where a neighbour is missing (outer mosaic edge) or NaN, the
/// containing pixel's value is used instead. Returns `false`, leaving `out`
/// untouched, when no raster covers the point.
pub fn sample(window: &MosaicWindow<'_>, x: f64, y: f64, out: &mut [f32]) -> bool {
    let Some((raster, col, row)) = window.locate(x, y) else {
        return false;
    };
    let nearest = raster.pixel(col, row);

    // Shift from corner-based to center-based coordinates
    let (fx, fy) = raster.world_to_pixel(x, y);
    let cx = fx - 0.5;
    let cy = fy - 0.5;
    let x0 = cx.floor();
    let y0 = cy.floor();
    let dx = cx - x0;
    let dy = cy - y0;

    let neighbours = (
        neighbour(window, raster, x0, y0),
        neighbour(window, raster, x0 + 1.0, y0),
        neighbour(window, raster, x0, y0 + 1.0),
        neighbour(window, raster, x0 + 1.0, y0 + 1.0),
    );

    let (Some(v00), Some(v10), Some(v01), Some(v11)) = neighbours else {
        let n = nearest.len().min(out.len());
        out[..n].copy_from_slice(&nearest[..n]);
        return true;
    };

    let n = [nearest.len(), v00.len(), v10.len(), v01.len(), v11.len(), out.len()]
        .into_iter()
        .min()
        .unwrap_or(0);

    for band in 0..n {
        let (f00, f10, f01, f11) = (
            f64::from(v00[band]),
            f64::from(v10[band]),
            f64::from(v01[band]),
            f64::from(v11[band]),
        );
        if f00.is_nan() || f10.is_nan() || f01.is_nan() || f11.is_nan() {
            out[band] = nearest[band];
            continue;
        }
        let value = f00 * (1.0 - dx) * (1.0 - dy)
            + f10 * dx * (1.0 - dy)
            + f01 * (1.0 - dx) * dy
            + f11 * dx * dy;
        #[allow(clippy::cast_possible_truncation)]
        {
            out[band] = value as f32;
        }
    }
    true
}

/// Values of pixel `(col, row)` in `raster`'s grid, which may lie outside
/// `raster` itself.
fn neighbour<'a>(
    window: &MosaicWindow<'a>,
    raster: &'a Raster,
    col: f64,
    row: f64,
) -> Option<&'a [f32]> {
    if let (Some(c), Some(r)) = (
        f64_to_pixel_index(col, raster.width),
        f64_to_pixel_index(row, raster.height),
    ) {
        return Some(raster.pixel(c, r));
    }
    let (res_x, res_y) = raster.resolution();
    let wx = raster.envelope.min_x + (col + 0.5) * res_x;
    let wy = raster.envelope.max_y - (row + 0.5) * res_y;
    window.value_at(wx, wy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Crs, Envelope};
    use crate::mosaic::{Mosaic, MosaicBuilder};
    use approx::assert_relative_eq;

    fn crs() -> Crs {
        Crs::from_epsg(3857).unwrap()
    }

    fn mosaic(rasters: Vec<Raster>) -> Mosaic {
        let builder = MosaicBuilder::new(crs());
        for r in rasters {
            builder.add(r);
        }
        builder.finish()
    }

    /// `size` x `size` raster at 1 unit/pixel whose values are `a*x + b*y + c`
    /// evaluated at pixel centers.
    fn plane(min_x: f64, size: usize, a: f64, b: f64, c: f64) -> Raster {
        let env = Envelope::from_corners(min_x, 0.0, min_x + size as f64, size as f64, crs());
        let mut raster = Raster::filled(size, size, env, &[0.0]);
        for row in 0..size {
            for col in 0..size {
                let (x, y) = raster.pixel_center(col, row);
                raster.pixel_mut(col, row)[0] = (a * x + b * y + c) as f32;
            }
        }
        raster
    }

    #[test]
    fn test_pixel_center_exact() {
        let m = mosaic(vec![plane(0.0, 3, 1.0, 10.0, 0.0)]);
        let mut out = [0.0];
        assert!(sample(&m.full_window(), 1.5, 1.5, &mut out));
        assert_relative_eq!(out[0], 16.5, epsilon = 1e-5);
    }

    #[test]
    fn test_linear_plane_is_reproduced() {
        let (a, b, c) = (3.0, -2.0, 7.0);
        let m = mosaic(vec![plane(0.0, 10, a, b, c)]);
        let window = m.full_window();

        for x in [1.0, 2.25, 4.75, 7.5] {
            for y in [1.0, 3.25, 6.5, 8.75] {
                let mut out = [0.0];
                assert!(sample(&window, x, y, &mut out));
                let expected = (a * x + b * y + c) as f32;
                assert_relative_eq!(out[0], expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_seamless_across_tiles() {
        let (a, b, c) = (2.0, 1.0, 0.0);
        let m = mosaic(vec![plane(0.0, 4, a, b, c), plane(4.0, 4, a, b, c)]);
        let mut out = [0.0];
        // Between the last center of the left tile and the first of the right
        assert!(sample(&m.full_window(), 4.2, 2.0, &mut out));
        assert_relative_eq!(out[0], (a * 4.2 + b * 2.0 + c) as f32, epsilon = 1e-4);
    }

    #[test]
    fn test_outer_edge_falls_back_to_nearest() {
        let m = mosaic(vec![plane(0.0, 2, 1.0, 0.0, 0.0)]);
        let mut out = [0.0];
        assert!(sample(&m.full_window(), 0.1, 1.0, &mut out));
        assert_relative_eq!(out[0], 0.5);
    }

    #[test]
    fn test_nan_neighbour_uses_nearest() {
        let mut raster = plane(0.0, 2, 1.0, 0.0, 0.0);
        raster.pixel_mut(1, 0)[0] = f32::NAN;
        let m = mosaic(vec![raster]);
        let mut out = [0.0];
        assert!(sample(&m.full_window(), 0.9, 1.0, &mut out));
        assert_relative_eq!(out[0], 0.5);
    }

    #[test]
    fn test_uncovered_point() {
        let m = mosaic(vec![plane(0.0, 2, 1.0, 0.0, 0.0)]);
        let mut out = [9.0];
        assert!(!sample(&m.full_window(), 5.0, 1.0, &mut out));
        assert_eq!(out, [9.0]);
    }
}
