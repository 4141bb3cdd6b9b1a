//! Concurrent loading of input rasters into the level 1 source mosaic.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PyramidError, RasterIoError};
use crate::geometry::Crs;
use crate::mosaic::{Mosaic, MosaicBuilder};
use crate::pool::{JobOutcome, WorkerPool};
use crate::raster::Raster;
use crate::raster_io::{LoadOptions, RasterIo};

/// An input file that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What happened to each input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub requested: usize,
    pub loaded: usize,
    pub failed: Vec<LoadFailure>,
    /// Files skipped because the build was cancelled
    pub cancelled: usize,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub mosaic: Mosaic,
    pub report: LoadReport,
}

/// Load `files` on a pool of `num_threads` workers into one mosaic tagged
/// with `source_crs`.
///
/// A file that fails to load is logged and reported; the rest still load.
/// A file that declares a different CRS is kept, retagged and logged.
/// `options.crs` only applies to files that declare no CRS.
///
/// # Errors
/// Returns [`PyramidError::WorkerPool`] if the pool cannot be created.
pub fn load_base_mosaic(
    files: &[PathBuf],
    source_crs: Crs,
    num_threads: usize,
    io: &dyn RasterIo,
    options: &LoadOptions,
    cancel: &CancellationToken,
) -> Result<LoadOutcome, PyramidError> {
    let pool = WorkerPool::new(num_threads, "rastertree-load")?;
    let builder = MosaicBuilder::new(source_crs);

    let outcomes = pool.run_all(files.iter().collect(), cancel, |path: &PathBuf| {
        load_one(path, source_crs, io, options, &builder)
    });

    let mut report = LoadReport {
        requested: files.len(),
        ..LoadReport::default()
    };
    for (path, outcome) in files.iter().zip(outcomes) {
        match outcome {
            JobOutcome::Completed(Ok(())) => report.loaded += 1,
            JobOutcome::Completed(Err(e)) => report.failed.push(LoadFailure {
                path: path.clone(),
                error: e.to_string(),
            }),
            JobOutcome::Cancelled => report.cancelled += 1,
        }
    }

    info!(
        requested = report.requested,
        loaded = report.loaded,
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "Loaded base mosaic"
    );

    Ok(LoadOutcome {
        mosaic: builder.finish(),
        report,
    })
}

fn load_one(
    path: &Path,
    source_crs: Crs,
    io: &dyn RasterIo,
    options: &LoadOptions,
    builder: &MosaicBuilder,
) -> Result<(), RasterIoError> {
    let raster = match load_declared(path, io, options) {
        Ok(raster) => raster,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load input raster");
            return Err(e);
        }
    };
    if raster.crs() != source_crs {
        warn!(
            path = %path.display(),
            declared = %raster.crs(),
            configured = %source_crs,
            "Input CRS differs from the configured source CRS, using the configured one"
        );
    }
    debug!(
        path = %path.display(),
        width = raster.width,
        height = raster.height,
        bands = raster.bands,
        "Loaded input raster"
    );
    builder.add(raster.with_crs(source_crs));
    Ok(())
}

/// Load `path` under the CRS it declares, falling back to `options.crs`.
fn load_declared(path: &Path, io: &dyn RasterIo, options: &LoadOptions) -> Result<Raster, RasterIoError> {
    let declared = LoadOptions { crs: None, ..*options };
    match io.load(path, &declared) {
        Err(RasterIoError::MissingCrs(reason)) if options.crs.is_some() => {
            debug!(path = %path.display(), reason = %reason, "Input declares no CRS");
            io.load(path, options)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Envelope, OriginLocation};
    use crate::geotiff_writer::GeoTiffWriter;
    use crate::raster_io::{GeoTiffIo, OutputFormat};
    use parking_lot::Mutex;

    /// Serves 4x4 rasters declaring `declares`, and records the CRS each
    /// load asked for.
    struct DeclaringIo {
        declares: Option<Crs>,
        requested: Mutex<Vec<Option<Crs>>>,
    }

    impl DeclaringIo {
        fn new(declares: Option<Crs>) -> Self {
            Self { declares, requested: Mutex::new(Vec::new()) }
        }
    }

    impl RasterIo for DeclaringIo {
        fn load(&self, _path: &Path, options: &LoadOptions) -> Result<Raster, RasterIoError> {
            self.requested.lock().push(options.crs);
            let crs = options
                .crs
                .or(self.declares)
                .ok_or_else(|| RasterIoError::MissingCrs("none".into()))?;
            Ok(Raster::filled(4, 4, Envelope::from_corners(0.0, 0.0, 4.0, 4.0, crs), &[1.0]))
        }

        fn save(
            &self,
            _raster: &Raster,
            _path: &Path,
            _format: &OutputFormat,
            _origin: OriginLocation,
        ) -> Result<(), RasterIoError> {
            unimplemented!("loads only")
        }
    }

    fn write_tile(dir: &Path, name: &str, min_x: f64, crs: Crs) -> PathBuf {
        let path = dir.join(name);
        let raster = Raster::filled(8, 8, Envelope::from_corners(min_x, 0.0, min_x + 8.0, 8.0, crs), &[1.0]);
        GeoTiffWriter::new(&raster).origin(OriginLocation::Outer).write(&path).unwrap();
        path
    }

    #[test]
    fn test_loads_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let crs = Crs::from_epsg(32633).unwrap();
        let files: Vec<_> = (0..4)
            .map(|i| write_tile(dir.path(), &format!("{i}.tif"), f64::from(i) * 8.0, crs))
            .collect();

        let outcome = load_base_mosaic(
            &files,
            crs,
            2,
            &GeoTiffIo,
            &LoadOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(outcome.report.loaded, 4);
        assert!(outcome.report.failed.is_empty());
        assert_eq!(outcome.mosaic.len(), 4);
        let env = outcome.mosaic.envelope().unwrap();
        assert_eq!((env.min_x, env.max_x), (0.0, 32.0));
    }

    #[test]
    fn test_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let crs = Crs::from_epsg(32633).unwrap();
        let good = write_tile(dir.path(), "good.tif", 0.0, crs);
        let bad = dir.path().join("bad.tif");
        std::fs::write(&bad, b"definitely not a tiff").unwrap();
        let missing = dir.path().join("missing.tif");

        let files = vec![good, bad.clone(), missing.clone()];
        let outcome = load_base_mosaic(
            &files,
            crs,
            3,
            &GeoTiffIo,
            &LoadOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(outcome.mosaic.len(), 1);
        assert_eq!(outcome.report.loaded, 1);
        let failed: Vec<_> = outcome.report.failed.iter().map(|f| f.path.clone()).collect();
        assert_eq!(failed, vec![bad, missing]);
    }

    #[test]
    fn test_configured_crs_wins() {
        let dir = tempfile::tempdir().unwrap();
        let declared = Crs::from_epsg(3857).unwrap();
        let configured = Crs::from_epsg(32633).unwrap();
        let file = write_tile(dir.path(), "a.tif", 0.0, declared);

        let outcome = load_base_mosaic(
            &[file],
            configured,
            1,
            &GeoTiffIo,
            &LoadOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(outcome.mosaic.crs(), configured);
        assert_eq!(outcome.mosaic.rasters()[0].crs(), configured);
    }

    #[test]
    fn test_declared_crs_is_read_before_override() {
        let configured = Crs::from_epsg(32633).unwrap();
        let io = DeclaringIo::new(Some(Crs::from_epsg(3857).unwrap()));
        let options = LoadOptions { crs: Some(configured), ..LoadOptions::default() };

        let outcome = load_base_mosaic(
            &[PathBuf::from("a.tif")],
            configured,
            1,
            &io,
            &options,
            &CancellationToken::new(),
        )
        .unwrap();

        // One load under the declared CRS, then retagged
        assert_eq!(*io.requested.lock(), vec![None]);
        assert_eq!(outcome.mosaic.rasters()[0].crs(), configured);
    }

    #[test]
    fn test_undeclared_crs_falls_back() {
        let configured = Crs::from_epsg(32633).unwrap();
        let io = DeclaringIo::new(None);
        let options = LoadOptions { crs: Some(configured), ..LoadOptions::default() };

        let outcome = load_base_mosaic(
            &[PathBuf::from("a.tif")],
            configured,
            1,
            &io,
            &options,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(*io.requested.lock(), vec![None, Some(configured)]);
        assert_eq!(outcome.report.loaded, 1);

        // Without a configured fallback the file fails
        let outcome = load_base_mosaic(
            &[PathBuf::from("a.tif")],
            configured,
            1,
            &DeclaringIo::new(None),
            &LoadOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(outcome.report.failed.len(), 1);
    }

    #[test]
    fn test_cancelled_load() {
        let dir = tempfile::tempdir().unwrap();
        let crs = Crs::from_epsg(32633).unwrap();
        let file = write_tile(dir.path(), "a.tif", 0.0, crs);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome =
            load_base_mosaic(&[file], crs, 1, &GeoTiffIo, &LoadOptions::default(), &cancel).unwrap();
        assert!(outcome.mosaic.is_empty());
        assert_eq!(outcome.report.cancelled, 1);
    }
}
