//! CRS handles and point transforms using pure Rust (proj4rs + crs-definitions).
//!
//! A [`Crs`] is an EPSG code that is known to the crs-definitions database;
//! constructing one is the only place where an unknown CRS name is reported.

use std::fmt;
use std::str::FromStr;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::ProjError;

/// An EPSG coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u16,
    proj4: &'static str,
}

impl Crs {
    /// Look up an EPSG code.
    ///
    /// # Errors
    /// Returns [`ProjError::UnknownCrs`] if the code is not in the
    /// crs-definitions database.
    pub fn from_epsg(code: u32) -> Result<Self, ProjError> {
        let epsg = u16::try_from(code)
            .map_err(|_| ProjError::UnknownCrs(format!("EPSG:{code}")))?;
        let proj4 = get_proj_string(epsg)
            .ok_or_else(|| ProjError::UnknownCrs(format!("EPSG:{code}")))?;
        Ok(Self { epsg, proj4 })
    }

    /// Parse a CRS name.
    ///
    /// Accepts `EPSG:4326`, a bare code (`4326`), OGC URNs
    /// (`urn:ogc:def:crs:EPSG::4326`) and OGC HTTP URIs
    /// (`http://www.opengis.net/def/crs/EPSG/0/4326`).
    ///
    /// # Errors
    /// Returns [`ProjError::UnknownCrs`] if the name is not recognised.
    pub fn from_name(name: &str) -> Result<Self, ProjError> {
        let trimmed = name.trim();
        let lower = trimmed.to_ascii_lowercase();
        let is_epsg = trimmed.chars().all(|c| c.is_ascii_digit())
            || lower.starts_with("epsg:")
            || lower.starts_with("urn:ogc:def:crs:epsg:")
            || lower.contains("/def/crs/epsg/");
        if !is_epsg {
            return Err(ProjError::UnknownCrs(name.to_string()));
        }

        let code = trimmed
            .rsplit(|c| c == ':' || c == '/')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| ProjError::UnknownCrs(name.to_string()))?;
        Self::from_epsg(code)
    }

    #[inline]
    #[must_use]
    pub fn epsg(self) -> u16 {
        self.epsg
    }

    #[inline]
    #[must_use]
    pub fn proj_string(self) -> &'static str {
        self.proj4
    }

    /// True for lon/lat systems, which proj4rs handles in radians.
    #[must_use]
    pub fn is_geographic(self) -> bool {
        self.proj4.contains("+proj=longlat")
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = ProjError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Get PROJ4 string for an EPSG code using the crs-definitions database
#[inline]
fn get_proj_string(epsg: u16) -> Option<&'static str> {
    crs_definitions::from_code(epsg).map(|def| def.proj4)
}

/// Point transform between two CRSs. Identical CRSs short-circuit.
pub struct CrsTransform {
    source: Crs,
    target: Crs,
    projs: Option<(Proj, Proj)>,
}

impl CrsTransform {
    /// Build a transform from `source` to `target`.
    ///
    /// # Errors
    /// Returns [`ProjError::UnknownCrs`] if proj4rs rejects either definition.
    pub fn new(source: Crs, target: Crs) -> Result<Self, ProjError> {
        if source == target {
            return Ok(Self { source, target, projs: None });
        }
        let source_proj = Proj::from_proj_string(source.proj_string())
            .map_err(|e| ProjError::UnknownCrs(format!("{source}: {e:?}")))?;
        let target_proj = Proj::from_proj_string(target.proj_string())
            .map_err(|e| ProjError::UnknownCrs(format!("{target}: {e:?}")))?;
        Ok(Self {
            source,
            target,
            projs: Some((source_proj, target_proj)),
        })
    }

    #[must_use]
    pub fn source(&self) -> Crs {
        self.source
    }

    #[must_use]
    pub fn target(&self) -> Crs {
        self.target
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.projs.is_none()
    }

    /// Transform a point. Coordinates are in CRS native units (degrees for
    /// geographic systems, metres for projected ones).
    ///
    /// # Errors
    /// Returns [`ProjError::TransformFailed`] if proj4rs cannot transform the point.
    #[inline]
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let Some((source_proj, target_proj)) = &self.projs else {
            return Ok((x, y));
        };

        let mut point = if self.source.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(source_proj, target_proj, &mut point).map_err(|e| {
            ProjError::TransformFailed(format!(
                "({x}, {y}) from {} to {}: {e:?}",
                self.source, self.target
            ))
        })?;

        if self.target.is_geographic() {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}
