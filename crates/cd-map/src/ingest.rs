//! OSM PBF ingest — enabled with the `osm` Cargo feature.
//!
//! A one-off build step: stream a `.osm.pbf` extract twice (ways first to
//! learn which node ids matter, then nodes), and write the result into a
//! [`MapStore`].  The engine itself only ever reads the resulting store.
//!
//! # What is kept
//!
//! Only drivable `highway=*` ways (see [`DRIVABLE_HIGHWAYS`]).  Node tags
//! are scanned for `railway=level_crossing` and `barrier=cattle_grid|gate`;
//! everything else (footways, buildings, POIs, relations) is ignored.

use std::path::Path;

use osmpbf::{Element, ElementReader};
use rustc_hash::FxHashSet;
use tracing::info;

use cd_core::{GeoPoint, NodeId, WayId};

use crate::error::{MapError, MapResult};
use crate::network::{Barrier, BarrierKind, Node, RailwayCrossing, Way};
use crate::store::{MapStore, RegionData};

/// Road classes a car can drive.
const DRIVABLE_HIGHWAYS: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "service",
];

/// Counts reported after a successful ingest.
#[derive(Copy, Clone, Debug, Default)]
pub struct IngestStats {
    pub nodes: usize,
    pub ways: usize,
    pub railway_crossings: usize,
    pub barriers: usize,
}

/// Ingest `pbf_path` into `store`, replacing its contents.
pub fn ingest_pbf(store: &MapStore, pbf_path: &Path) -> MapResult<IngestStats> {
    // ── Pass 1: roads, and the node ids they reference ────────────────────
    let mut ways: Vec<Way> = Vec::new();
    let mut needed: FxHashSet<i64> = FxHashSet::default();

    ElementReader::from_path(pbf_path)?
        .for_each(|elem| {
            if let Element::Way(w) = elem {
                let tags: Vec<(&str, &str)> = w.tags().collect();
                let highway = tag(&tags, "highway").unwrap_or("");
                if !DRIVABLE_HIGHWAYS.contains(&highway) {
                    return;
                }
                let refs: Vec<NodeId> = w.refs().map(NodeId).collect();
                needed.extend(refs.iter().map(|n| n.raw()));
                ways.push(Way {
                    id: WayId(w.id()),
                    nodes: refs,
                    name: tag(&tags, "name").unwrap_or("").to_owned(),
                    highway: highway.to_owned(),
                    oneway: matches!(tag(&tags, "oneway"), Some("yes" | "true" | "1")),
                    maxspeed_kmh: parse_maxspeed(tag(&tags, "maxspeed").unwrap_or("")),
                    bridge: flag_tag(&tags, "bridge"),
                    tunnel: flag_tag(&tags, "tunnel"),
                    surface: tag(&tags, "surface").unwrap_or("").to_owned(),
                    ford: flag_tag(&tags, "ford"),
                    traffic_calming: tag(&tags, "traffic_calming").unwrap_or("").to_owned(),
                    width_m: parse_width(tag(&tags, "width").unwrap_or("")),
                    narrow: flag_tag(&tags, "narrow"),
                });
            }
        })
        .map_err(|e| MapError::Osm(e.to_string()))?;

    info!(roads = ways.len(), nodes_needed = needed.len(), "ingest pass 1 complete");

    // ── Pass 2: coordinates and point features for referenced nodes ───────
    let mut region = RegionData { ways, ..Default::default() };

    ElementReader::from_path(pbf_path)?
        .for_each(|elem| {
            let (id, lat, lon, tags): (i64, f64, f64, Vec<(String, String)>) = match elem {
                Element::Node(n) => (
                    n.id(),
                    n.lat(),
                    n.lon(),
                    n.tags().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
                ),
                Element::DenseNode(n) => (
                    n.id(),
                    n.lat(),
                    n.lon(),
                    n.tags().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
                ),
                _ => return,
            };
            if !needed.contains(&id) {
                return;
            }
            region.nodes.push(Node { id: NodeId(id), lat, lon });

            let point = GeoPoint::new(lat, lon);
            if tags.iter().any(|(k, v)| k == "railway" && v == "level_crossing") {
                region
                    .railway_crossings
                    .push(RailwayCrossing { node_id: NodeId(id), point });
            }
            if let Some((_, v)) = tags.iter().find(|(k, _)| k == "barrier")
                && let Some(kind) = BarrierKind::from_tag(v)
            {
                region.barriers.push(Barrier { node_id: NodeId(id), point, kind });
            }
        })
        .map_err(|e| MapError::Osm(e.to_string()))?;

    let stats = IngestStats {
        nodes: region.nodes.len(),
        ways: region.ways.len(),
        railway_crossings: region.railway_crossings.len(),
        barriers: region.barriers.len(),
    };
    info!(
        nodes = stats.nodes,
        crossings = stats.railway_crossings,
        barriers = stats.barriers,
        "ingest pass 2 complete"
    );

    store.populate(&region)?;
    Ok(stats)
}

// ── Tag helpers ───────────────────────────────────────────────────────────────

fn tag<'a>(tags: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// OSM truthy convention: any value other than absent/"no" means present.
fn flag_tag(tags: &[(&str, &str)], key: &str) -> bool {
    matches!(tag(tags, key), Some(v) if !v.is_empty() && v != "no")
}

/// Posted limit in km/h; handles the "NN mph" form.  0 when unparseable.
fn parse_maxspeed(value: &str) -> u32 {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }
    if let Some(mph) = value.strip_suffix("mph") {
        return mph
            .trim()
            .parse::<f64>()
            .map(|v| (v * 1.60934) as u32)
            .unwrap_or(0);
    }
    value.parse().unwrap_or(0)
}

/// Width in metres; handles "3", "3.5", "3 m", "3.5m".  0 when unparseable.
fn parse_width(value: &str) -> f64 {
    let cleaned = value.to_lowercase().replace('m', "");
    cleaned.trim().parse().unwrap_or(0.0)
}
