//! Engine error type.
//!
//! Inside the update cycle nothing propagates: every failure becomes a
//! snapshot status and the loop carries on.  `EngineError` covers the edges
//! — construction, route loading, explicit start/stop.

use thiserror::Error;

use cd_map::MapError;

/// Errors produced by `cd-engine`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("map error: {0}")]
    Map(#[from] MapError),

    #[error("route error: {0}")]
    Route(String),

    #[error("GPS source error: {0}")]
    Gps(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
