//! `cd-map` — road-network persistence and spatial queries for the codriver
//! engine.
//!
//! # What lives here
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | [`network`] | `RoadNetwork` and its entities, segment R-tree          |
//! | [`store`]   | `MapStore` — one region's SQLite database               |
//! | [`loader`]  | `MapLoader` — region detection, merging, query cache    |
//! | [`ingest`]  | OSM PBF → store (feature `osm`)                         |
//! | [`error`]   | `MapError`, `MapResult`                                 |
//!
//! # Feature flags
//!
//! | Flag  | Effect                                      |
//! |-------|---------------------------------------------|
//! | `osm` | Enable PBF ingest via `osmpbf`.             |

pub mod error;
#[cfg(feature = "osm")]
pub mod ingest;
pub mod loader;
pub mod network;
pub mod store;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{MapError, MapResult};
#[cfg(feature = "osm")]
pub use ingest::{IngestStats, ingest_pbf};
pub use loader::MapLoader;
pub use network::{
    Barrier, BarrierKind, Junction, Node, RailwayCrossing, RoadNetwork, Way,
};
pub use store::{Bounds, MapStore, RegionData};
