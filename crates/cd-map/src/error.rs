//! Map-subsystem error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `cd-map`.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("no map data found at {0} (expected a .roads.db file or a directory of them)")]
    Absent(PathBuf),

    #[error("no region covers {lat:.4}, {lon:.4}")]
    NoRegion { lat: f64, lon: f64 },

    #[error("map database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OSM ingest error: {0}")]
    Osm(String),
}

pub type MapResult<T> = Result<T, MapError>;
