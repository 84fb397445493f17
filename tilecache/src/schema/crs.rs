//! Coordinate reference system identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::TileError;

/// Authority/version/code triple naming a coordinate reference system.
///
/// Accepts the short `EPSG:3857` form as well as OGC URNs with or without
/// a version, e.g. `urn:ogc:def:crs:EPSG::3857`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrsIdentifier {
    authority: String,
    version: String,
    identifier: String,
}

impl CrsIdentifier {
    pub fn new(
        authority: impl Into<String>,
        version: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            version: version.into(),
            identifier: identifier.into(),
        }
    }

    /// Spherical Mercator, `EPSG:3857`.
    pub fn web_mercator() -> Self {
        Self::new("EPSG", "", "3857")
    }

    pub fn parse(s: &str) -> Result<Self, TileError> {
        let parts: Vec<&str> = s.split(':').collect();
        let crs = match parts.as_slice() {
            [authority, identifier] => Self::new(*authority, "", *identifier),
            [_, _, _, _, authority, identifier] => Self::new(*authority, "", *identifier),
            [_, _, _, _, authority, version, identifier] => {
                Self::new(*authority, *version, *identifier)
            }
            _ => return Err(TileError::config(format!("unrecognized CRS '{}'", s))),
        };

        if crs.authority.is_empty() || crs.identifier.is_empty() {
            return Err(TileError::config(format!("unrecognized CRS '{}'", s)));
        }
        Ok(crs)
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl FromStr for CrsIdentifier {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CrsIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "urn:ogc:def:crs:{}:{}:{}",
            self.authority, self.version, self.identifier
        )
    }
}
