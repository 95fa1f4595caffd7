//! `cd-corner` — corner detection over a projected drive path.
//!
//! Segmentation places "cuts" along the polyline in five phases:
//!
//! 1. **Peak detection** — a cut at every strict local maximum of absolute
//!    curvature above the peak threshold.
//! 2. **Redundancy reduction** — groups of cuts closer than the minimum cut
//!    distance collapse to their median member.
//! 3. **Straight filling** — long cut-less stretches get equidistant filler
//!    cuts so no segment grows unbounded.
//! 4. **Sign changes** — a cut wherever curvature flips sign between cuts,
//!    marking left/right transitions.
//! 5. **Final filtering** — phase 2 again over the combined set.
//!
//! Segments between cuts are then classified corner/straight, graded on the
//! rally severity scale, and optionally merged into chicanes.

mod detector;

#[cfg(test)]
mod tests;

pub use detector::{Corner, CornerDetector, DetectorParams, Direction, severity_for_radius};
