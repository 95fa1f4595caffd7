//! The projected path and the features found along it.
//!
//! Features ahead of the driver form **one ordered list** of tagged
//! variants.  Downstream consumers walk a single sequence in distance order
//! instead of juggling a collection per feature kind.

use cd_core::{GeoPoint, LatLon, NodeId, WayId};
use cd_map::BarrierKind;

// ── Path geometry ─────────────────────────────────────────────────────────────

/// One point along the projected path.
#[derive(Copy, Clone, Debug)]
pub struct PathPoint {
    pub lat: f64,
    pub lon: f64,
    /// Metres from the driver's position along the path.
    pub distance_m: f64,
    pub way_id: WayId,
    /// Index of this node within its way.
    pub node_index: usize,
}

impl LatLon for PathPoint {
    #[inline]
    fn lat(&self) -> f64 {
        self.lat
    }
    #[inline]
    fn lon(&self) -> f64 {
        self.lon
    }
}

/// The projected path ahead: geometry plus everything worth calling out.
#[derive(Default)]
pub struct ProjectedPath {
    /// Strictly increasing in `distance_m`.
    pub points: Vec<PathPoint>,
    /// Ordered by distance, same frame as `points`.
    pub features: Vec<FeatureAhead>,
    pub total_distance: f64,
}

impl ProjectedPath {
    /// The path geometry as bare coordinates, for the corner detector.
    pub fn polyline(&self) -> Vec<GeoPoint> {
        self.points.iter().map(|p| GeoPoint::new(p.lat, p.lon)).collect()
    }
}

// ── Features ──────────────────────────────────────────────────────────────────

/// Which way the driver turns at a junction exit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
    Straight,
}

/// Something ahead on the projected path.
#[derive(Clone, Debug)]
pub enum FeatureAhead {
    Junction {
        point: GeoPoint,
        distance_m: f64,
        node_id: NodeId,
        is_t_junction: bool,
        /// Bearings of every road leaving the junction (arrival way excluded).
        exit_bearings: Vec<f64>,
        /// The exit the projector chose to continue along, if any.
        chosen_bearing: Option<f64>,
        /// Turn relative to the arrival bearing; `None` when no exit was chosen.
        turn: Option<Turn>,
    },
    Bridge {
        point: GeoPoint,
        distance_m: f64,
        way_id: WayId,
    },
    Tunnel {
        point: GeoPoint,
        distance_m: f64,
        way_id: WayId,
    },
    Ford {
        point: GeoPoint,
        distance_m: f64,
        way_id: WayId,
    },
    SpeedBump {
        point: GeoPoint,
        distance_m: f64,
        way_id: WayId,
        /// Traffic-calming kind from the map (`bump`, `hump`, `table`, …).
        kind: String,
    },
    SurfaceChange {
        point: GeoPoint,
        distance_m: f64,
        way_id: WayId,
        from: String,
        to: String,
    },
    RailwayCrossing {
        point: GeoPoint,
        distance_m: f64,
        node_id: NodeId,
    },
    Barrier {
        point: GeoPoint,
        distance_m: f64,
        node_id: NodeId,
        kind: BarrierKind,
    },
    Narrow {
        point: GeoPoint,
        distance_m: f64,
        way_id: WayId,
        /// Tagged width in metres; 0 when only flagged narrow.
        width_m: f64,
    },
}

impl FeatureAhead {
    /// Distance from the driver, whatever the variant.
    pub fn distance_m(&self) -> f64 {
        match self {
            Self::Junction { distance_m, .. }
            | Self::Bridge { distance_m, .. }
            | Self::Tunnel { distance_m, .. }
            | Self::Ford { distance_m, .. }
            | Self::SpeedBump { distance_m, .. }
            | Self::SurfaceChange { distance_m, .. }
            | Self::RailwayCrossing { distance_m, .. }
            | Self::Barrier { distance_m, .. }
            | Self::Narrow { distance_m, .. } => *distance_m,
        }
    }
}
