//! `cd-path` — path projection for the codriver engine.
//!
//! Given the current fix and a borrowed road network, produce the polyline
//! the driver is about to cover plus an ordered list of features along it
//! (junctions, bridges, crossings, surface changes, …).
//!
//! | Module        | Contents                                       |
//! |---------------|------------------------------------------------|
//! | [`feature`]   | `ProjectedPath`, `PathPoint`, `FeatureAhead`   |
//! | [`projector`] | `PathProjector` and its tunables               |

pub mod feature;
pub mod projector;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use feature::{FeatureAhead, PathPoint, ProjectedPath, Turn};
pub use projector::{PathProjector, ProjectorParams};
