//! In-memory road network for one loaded region (or several merged ones).
//!
//! # Data layout
//!
//! Entities are keyed by the source map's stable 64-bit ids in `FxHashMap`s:
//! ways reference nodes by id, junctions and point features sit on node ids,
//! and a reverse `node id → way ids` index answers "which roads meet here".
//! Ids stay stable across reloads, which the pacenote layer relies on for
//! deduplication keys.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over way *segments* answers the projector's
//! "which roads pass near this fix" query without scanning the whole region.
//! The index is rebuilt once per load/merge, not maintained incrementally —
//! a network is immutable once handed to the engine.

use rstar::{AABB, RTree, RTreeObject};
use rustc_hash::FxHashMap;

use cd_core::{GeoPoint, LatLon, NodeId, WayId};

// ── Entities ──────────────────────────────────────────────────────────────────

/// A node of the road graph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    #[inline]
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

impl LatLon for Node {
    #[inline]
    fn lat(&self) -> f64 {
        self.lat
    }
    #[inline]
    fn lon(&self) -> f64 {
        self.lon
    }
}

/// A way: one road segment with its attributes.
#[derive(Clone, Debug, Default)]
pub struct Way {
    pub id: WayId,
    /// Ordered node references; length ≥ 2 for any usable way.
    pub nodes: Vec<NodeId>,
    pub name: String,
    /// Road class (`motorway`, `primary`, `residential`, …).
    pub highway: String,
    pub oneway: bool,
    /// Posted limit in km/h; 0 = unknown.
    pub maxspeed_kmh: u32,
    pub bridge: bool,
    pub tunnel: bool,
    /// Surface tag (`asphalt`, `gravel`, …); empty = untagged.
    pub surface: String,
    pub ford: bool,
    /// Traffic-calming kind (`bump`, `hump`, `table`, …); empty = none.
    pub traffic_calming: String,
    /// Carriageway width in metres; 0 = unknown.
    pub width_m: f64,
    pub narrow: bool,
}

/// A junction: a node where two or more ways meet.
#[derive(Clone, Debug)]
pub struct Junction {
    pub node_id: NodeId,
    pub point: GeoPoint,
    pub connected_ways: Vec<WayId>,
    /// True when the incident bearings form a T: the through road ends here.
    pub is_t_junction: bool,
}

/// A railway level crossing on a road node.
#[derive(Copy, Clone, Debug)]
pub struct RailwayCrossing {
    pub node_id: NodeId,
    pub point: GeoPoint,
}

/// Kinds of road barrier worth calling out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BarrierKind {
    CattleGrid,
    Gate,
}

impl BarrierKind {
    /// Parse the source map's barrier tag; anything else is not kept.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "cattle_grid" => Some(Self::CattleGrid),
            "gate" => Some(Self::Gate),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::CattleGrid => "cattle_grid",
            Self::Gate => "gate",
        }
    }
}

/// A barrier on a road node.
#[derive(Copy, Clone, Debug)]
pub struct Barrier {
    pub node_id: NodeId,
    pub point: GeoPoint,
    pub kind: BarrierKind,
}

// ── Segment R-tree entry ──────────────────────────────────────────────────────

/// One way segment in the spatial index, with its bounding rectangle in
/// (lat, lon) space.
#[derive(Clone)]
struct SegmentEntry {
    way_id: WayId,
    /// Index of the segment's start node within the way.
    seg_index: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// A road network loaded from one or more map stores.
///
/// Immutable once handed out by the loader; the engine swaps whole networks
/// atomically rather than mutating one in place.
#[derive(Default)]
pub struct RoadNetwork {
    pub nodes: FxHashMap<NodeId, Node>,
    pub ways: FxHashMap<WayId, Way>,
    pub junctions: FxHashMap<NodeId, Junction>,
    /// Reverse index: node id → ways containing that node.
    pub node_ways: FxHashMap<NodeId, Vec<WayId>>,
    pub railway_crossings: FxHashMap<NodeId, RailwayCrossing>,
    pub barriers: FxHashMap<NodeId, Barrier>,
    segment_index: RTree<SegmentEntry>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ways.is_empty()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    /// Ordered geometry of a way.  Node ids that fail to resolve are skipped;
    /// a well-formed store never produces any.
    pub fn way_geometry(&self, way_id: WayId) -> Vec<GeoPoint> {
        let Some(way) = self.ways.get(&way_id) else {
            return Vec::new();
        };
        way.nodes
            .iter()
            .filter_map(|nid| self.nodes.get(nid).map(Node::point))
            .collect()
    }

    #[inline]
    pub fn node_point(&self, node_id: NodeId) -> Option<GeoPoint> {
        self.nodes.get(&node_id).map(Node::point)
    }

    /// Merge another region's data into this network.
    ///
    /// Call [`rebuild_segment_index`](Self::rebuild_segment_index) once after
    /// the last merge.
    pub fn merge(&mut self, other: RoadNetwork) {
        self.nodes.extend(other.nodes);
        self.ways.extend(other.ways);
        self.junctions.extend(other.junctions);
        self.railway_crossings.extend(other.railway_crossings);
        self.barriers.extend(other.barriers);
        for (nid, way_ids) in other.node_ways {
            let entry = self.node_ways.entry(nid).or_default();
            for wid in way_ids {
                if !entry.contains(&wid) {
                    entry.push(wid);
                }
            }
        }
    }

    /// Bulk-load the segment R-tree from the current way geometry.
    pub fn rebuild_segment_index(&mut self) {
        let mut entries = Vec::new();
        for way in self.ways.values() {
            for (i, pair) in way.nodes.windows(2).enumerate() {
                let (Some(a), Some(b)) = (self.nodes.get(&pair[0]), self.nodes.get(&pair[1]))
                else {
                    continue;
                };
                entries.push(SegmentEntry {
                    way_id: way.id,
                    seg_index: i,
                    min: [a.lat.min(b.lat), a.lon.min(b.lon)],
                    max: [a.lat.max(b.lat), a.lon.max(b.lon)],
                });
            }
        }
        self.segment_index = RTree::bulk_load(entries);
    }

    /// Way segments whose bounding box comes within `radius_m` of `p`.
    ///
    /// Candidates only — the caller still measures exact perpendicular
    /// distance per segment.
    pub fn segments_near(&self, p: &impl LatLon, radius_m: f64) -> Vec<(WayId, usize)> {
        let lat_delta = radius_m / 111_000.0;
        let lon_delta = radius_m / (111_000.0 * p.lat().to_radians().cos());
        let query = AABB::from_corners(
            [p.lat() - lat_delta, p.lon() - lon_delta],
            [p.lat() + lat_delta, p.lon() + lon_delta],
        );
        self.segment_index
            .locate_in_envelope_intersecting(&query)
            .map(|e| (e.way_id, e.seg_index))
            .collect()
    }
}
