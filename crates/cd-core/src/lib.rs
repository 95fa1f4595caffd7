//! `cd-core` — foundational types for the codriver rally co-driver engine.
//!
//! This crate is a dependency of every other `cd-*` crate.  It intentionally
//! has no `cd-*` dependencies and minimal external ones (only optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module   | Contents                                                  |
//! |----------|-----------------------------------------------------------|
//! | [`geo`]  | `GeoPoint`, `LatLon`, haversine/bearing/curvature helpers |
//! | [`ids`]  | `NodeId`, `WayId`                                         |
//! | [`fix`]  | `Position` — one GPS fix                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod fix;
pub mod geo;
pub mod ids;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use fix::Position;
pub use geo::{
    GeoPoint, LatLon, angle_diff_deg, closest_point_on_segment, cumulative_distances,
    curvature_1pm, haversine_m, initial_bearing_deg, offset,
};
pub use ids::{NodeId, WayId};
