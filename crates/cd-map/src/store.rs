//! SQLite-backed road-network store for one region.
//!
//! One `.roads.db` file holds the whole region: nodes, ways, precomputed
//! junctions, railway crossings, barriers, and R-tree spatial indices over
//! the point tables.  Queries pull only the bounding box they need, so a
//! country-scale file works on a single-board computer without ever being
//! resident in memory.
//!
//! The connection opens lazily and is guarded by a mutex: SQLite in WAL mode
//! is happy with concurrent readers, but `rusqlite::Connection` itself is
//! not `Sync`, and the background prefetch thread shares this store with the
//! engine thread.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, params, params_from_iter};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use cd_core::{GeoPoint, NodeId, WayId, initial_bearing_deg};

use crate::error::{MapError, MapResult};
use crate::network::{Barrier, BarrierKind, Junction, Node, RailwayCrossing, RoadNetwork, Way};

/// Bump when the table layout changes; a mismatched store is rebuilt.
const SCHEMA_VERSION: u32 = 1;

/// SQLite's default variable limit is 999; stay well under it when chunking
/// `id IN (…)` queries.
const CHUNK_SIZE: usize = 500;

/// Geographic bounding box as (min_lat, min_lon, max_lat, max_lon).
pub type Bounds = (f64, f64, f64, f64);

// ── RegionData ────────────────────────────────────────────────────────────────

/// Raw parsed content of one region, ready to be written to a store.
///
/// Produced by the OSM ingest (feature `osm`) or built by hand for synthetic
/// regions in demos and tests.  Junctions are not part of it — the store
/// derives them while writing.
#[derive(Default)]
pub struct RegionData {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
    pub railway_crossings: Vec<RailwayCrossing>,
    pub barriers: Vec<Barrier>,
}

// ── MapStore ──────────────────────────────────────────────────────────────────

/// One region's spatial database.
pub struct MapStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl MapStore {
    /// Open (or create) the store at `path`.  The connection itself is opened
    /// on first use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), conn: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the (lazily opened) connection.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> MapResult<T>) -> MapResult<T> {
        let mut guard = self.conn.lock().expect("map store mutex poisoned");
        if guard.is_none() {
            let conn = Connection::open(&self.path)?;
            // WAL for concurrent reads; generous cache and mmap for the
            // read-heavy bbox queries; temp tables in RAM.
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous  = NORMAL;
                 PRAGMA cache_size   = -100000;
                 PRAGMA mmap_size    = 1073741824;
                 PRAGMA temp_store   = MEMORY;",
            )?;
            ensure_schema(&conn)?;
            *guard = Some(conn);
        }
        f(guard.as_ref().expect("connection just opened"))
    }

    // ── Bounds ────────────────────────────────────────────────────────────

    /// Bounding box of all data, or `None` for an empty store.
    ///
    /// Reads the metadata cache first; on a miss, aggregates the node R-tree
    /// and writes the cache back.
    pub fn get_bounds(&self) -> MapResult<Option<Bounds>> {
        self.with_conn(|conn| {
            let cached: Option<String> = conn
                .query_row(
                    "SELECT value FROM metadata WHERE key = 'bounds'",
                    [],
                    |row| row.get(0),
                )
                .ok();
            if let Some(text) = cached
                && let Some(bounds) = parse_bounds(&text)
            {
                return Ok(Some(bounds));
            }

            let row: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = conn.query_row(
                "SELECT MIN(min_lat), MIN(min_lon), MAX(max_lat), MAX(max_lon) FROM node_rtree",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
            let (Some(min_lat), Some(min_lon), Some(max_lat), Some(max_lon)) = row else {
                return Ok(None);
            };
            let bounds = (min_lat, min_lon, max_lat, max_lon);
            conn.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES ('bounds', ?1)",
                params![format_bounds(bounds)],
            )?;
            Ok(Some(bounds))
        })
    }

    // ── Region query ──────────────────────────────────────────────────────

    /// Load the road network within `radius_m` of a centre point.
    ///
    /// Ways straddling the bounding box are loaded whole, junctions are kept
    /// only where at least two loaded ways meet, and point features only
    /// where they sit on a loaded way.  The returned network has no segment
    /// index yet — the loader builds it after any merging.
    pub fn load_region(&self, lat: f64, lon: f64, radius_m: f64) -> MapResult<RoadNetwork> {
        let lat_delta = radius_m / 111_000.0;
        let lon_delta = radius_m / (111_000.0 * lat.to_radians().cos());
        let (min_lat, max_lat) = (lat - lat_delta, lat + lat_delta);
        let (min_lon, max_lon) = (lon - lon_delta, lon + lon_delta);

        self.with_conn(|conn| {
            let mut network = RoadNetwork::new();

            // Nodes inside the box, via the R-tree.
            let mut stmt = conn.prepare_cached(
                "SELECT n.id, n.lat, n.lon
                 FROM nodes n
                 INNER JOIN node_rtree r ON n.id = r.id
                 WHERE r.min_lat >= ?1 AND r.max_lat <= ?2
                   AND r.min_lon >= ?3 AND r.max_lon <= ?4",
            )?;
            let mut rows = stmt.query(params![min_lat, max_lat, min_lon, max_lon])?;
            while let Some(row) = rows.next()? {
                let node = Node { id: NodeId(row.get(0)?), lat: row.get(1)?, lon: row.get(2)? };
                network.nodes.insert(node.id, node);
            }
            drop(rows);
            drop(stmt);

            if network.nodes.is_empty() {
                return Ok(network);
            }

            // Ways referencing any in-box node.
            let node_ids: Vec<i64> = network.nodes.keys().map(|n| n.raw()).collect();
            let mut way_ids: Vec<i64> = Vec::new();
            for chunk in node_ids.chunks(CHUNK_SIZE) {
                let sql = format!(
                    "SELECT DISTINCT way_id FROM way_nodes WHERE node_id IN ({})",
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
                while let Some(row) = rows.next()? {
                    way_ids.push(row.get(0)?);
                }
            }
            way_ids.sort_unstable();
            way_ids.dedup();

            if way_ids.is_empty() {
                return Ok(network);
            }

            // Ordered node lists per way, in one batched pass.
            let mut way_node_lists: FxHashMap<i64, Vec<(i64, i64)>> = FxHashMap::default();
            for chunk in way_ids.chunks(CHUNK_SIZE) {
                let sql = format!(
                    "SELECT way_id, idx, node_id FROM way_nodes WHERE way_id IN ({})",
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
                while let Some(row) = rows.next()? {
                    way_node_lists
                        .entry(row.get(0)?)
                        .or_default()
                        .push((row.get(1)?, row.get(2)?));
                }
            }
            for list in way_node_lists.values_mut() {
                list.sort_unstable_by_key(|&(idx, _)| idx);
            }

            // Way attribute rows.
            for chunk in way_ids.chunks(CHUNK_SIZE) {
                let sql = format!(
                    "SELECT id, name, highway, oneway, maxspeed_kmh, bridge, tunnel,
                            surface, ford, traffic_calming, width_m, narrow
                     FROM ways WHERE id IN ({})",
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
                while let Some(row) = rows.next()? {
                    let id: i64 = row.get(0)?;
                    let way = Way {
                        id: WayId(id),
                        nodes: way_node_lists
                            .get(&id)
                            .map(|list| list.iter().map(|&(_, nid)| NodeId(nid)).collect())
                            .unwrap_or_default(),
                        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        highway: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        oneway: row.get::<_, i64>(3)? != 0,
                        maxspeed_kmh: row.get::<_, i64>(4)? as u32,
                        bridge: row.get::<_, i64>(5)? != 0,
                        tunnel: row.get::<_, i64>(6)? != 0,
                        surface: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                        ford: row.get::<_, i64>(8)? != 0,
                        traffic_calming: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                        width_m: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
                        narrow: row.get::<_, i64>(11)? != 0,
                    };
                    network.ways.insert(way.id, way);
                }
            }

            // Pull in the out-of-box nodes of straddling ways so every way
            // resolves whole.
            let mut missing: Vec<i64> = network
                .ways
                .values()
                .flat_map(|w| w.nodes.iter())
                .filter(|nid| !network.nodes.contains_key(nid))
                .map(|nid| nid.raw())
                .collect();
            missing.sort_unstable();
            missing.dedup();
            for chunk in missing.chunks(CHUNK_SIZE) {
                let sql = format!(
                    "SELECT id, lat, lon FROM nodes WHERE id IN ({})",
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
                while let Some(row) = rows.next()? {
                    let node = Node { id: NodeId(row.get(0)?), lat: row.get(1)?, lon: row.get(2)? };
                    network.nodes.insert(node.id, node);
                }
            }

            // Reverse node → ways index over the loaded ways.
            for way in network.ways.values() {
                for nid in &way.nodes {
                    network.node_ways.entry(*nid).or_default().push(way.id);
                }
            }

            // Junctions where ≥ 2 loaded ways meet.
            let junction_ids: Vec<i64> = network
                .node_ways
                .iter()
                .filter(|(_, ways)| ways.len() >= 2)
                .map(|(nid, _)| nid.raw())
                .collect();
            let mut jw_stmt = conn
                .prepare_cached("SELECT way_id FROM junction_ways WHERE junction_id = ?1")?;
            for chunk in junction_ids.chunks(CHUNK_SIZE) {
                let sql = format!(
                    "SELECT node_id, lat, lon, is_t_junction FROM junctions WHERE node_id IN ({})",
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
                while let Some(row) = rows.next()? {
                    let node_id: i64 = row.get(0)?;
                    let connected: Vec<WayId> = jw_stmt
                        .query_map(params![node_id], |r| r.get::<_, i64>(0))?
                        .filter_map(|r| r.ok())
                        .map(WayId)
                        .collect();
                    network.junctions.insert(
                        NodeId(node_id),
                        Junction {
                            node_id: NodeId(node_id),
                            point: GeoPoint::new(row.get(1)?, row.get(2)?),
                            connected_ways: connected,
                            is_t_junction: row.get::<_, i64>(3)? != 0,
                        },
                    );
                }
            }
            drop(jw_stmt);

            // Point features in the box, kept only when on a loaded way.
            let mut stmt = conn.prepare_cached(
                "SELECT rc.node_id, rc.lat, rc.lon
                 FROM railway_crossings rc
                 INNER JOIN railway_rtree r ON rc.node_id = r.id
                 WHERE r.min_lat >= ?1 AND r.max_lat <= ?2
                   AND r.min_lon >= ?3 AND r.max_lon <= ?4",
            )?;
            let mut rows = stmt.query(params![min_lat, max_lat, min_lon, max_lon])?;
            while let Some(row) = rows.next()? {
                let node_id = NodeId(row.get(0)?);
                if network.node_ways.contains_key(&node_id) {
                    network.railway_crossings.insert(
                        node_id,
                        RailwayCrossing {
                            node_id,
                            point: GeoPoint::new(row.get(1)?, row.get(2)?),
                        },
                    );
                }
            }
            drop(rows);
            drop(stmt);

            let mut stmt = conn.prepare_cached(
                "SELECT b.node_id, b.lat, b.lon, b.kind
                 FROM barriers b
                 INNER JOIN barrier_rtree r ON b.node_id = r.id
                 WHERE r.min_lat >= ?1 AND r.max_lat <= ?2
                   AND r.min_lon >= ?3 AND r.max_lon <= ?4",
            )?;
            let mut rows = stmt.query(params![min_lat, max_lat, min_lon, max_lon])?;
            while let Some(row) = rows.next()? {
                let node_id = NodeId(row.get(0)?);
                let kind: String = row.get(3)?;
                if network.node_ways.contains_key(&node_id)
                    && let Some(kind) = BarrierKind::from_tag(&kind)
                {
                    network.barriers.insert(
                        node_id,
                        Barrier {
                            node_id,
                            point: GeoPoint::new(row.get(1)?, row.get(2)?),
                            kind,
                        },
                    );
                }
            }
            drop(rows);
            drop(stmt);

            debug!(
                ways = network.way_count(),
                junctions = network.junction_count(),
                "region query complete"
            );
            Ok(network)
        })
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Replace the store's contents with `region`, deriving junctions and
    /// caching bounds.  Used by the OSM ingest and by synthetic regions.
    pub fn populate(&self, region: &RegionData) -> MapResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "DELETE FROM nodes;
                 DELETE FROM ways;
                 DELETE FROM way_nodes;
                 DELETE FROM railway_crossings;
                 DELETE FROM barriers;
                 DELETE FROM junctions;
                 DELETE FROM junction_ways;
                 DELETE FROM node_rtree;
                 DELETE FROM railway_rtree;
                 DELETE FROM barrier_rtree;
                 DELETE FROM metadata WHERE key = 'bounds';",
            )?;

            let tx = conn.unchecked_transaction()?;
            {
                let mut node_stmt = tx
                    .prepare_cached("INSERT INTO nodes (id, lat, lon) VALUES (?1, ?2, ?3)")?;
                let mut node_rtree_stmt = tx.prepare_cached(
                    "INSERT INTO node_rtree (id, min_lat, max_lat, min_lon, max_lon)
                     VALUES (?1, ?2, ?2, ?3, ?3)",
                )?;
                for node in &region.nodes {
                    node_stmt.execute(params![node.id.raw(), node.lat, node.lon])?;
                    node_rtree_stmt.execute(params![node.id.raw(), node.lat, node.lon])?;
                }

                let mut way_stmt = tx.prepare_cached(
                    "INSERT INTO ways (id, name, highway, oneway, maxspeed_kmh, bridge,
                                       tunnel, surface, ford, traffic_calming, width_m, narrow)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                )?;
                let mut wn_stmt = tx.prepare_cached(
                    "INSERT INTO way_nodes (way_id, idx, node_id) VALUES (?1, ?2, ?3)",
                )?;
                for way in &region.ways {
                    way_stmt.execute(params![
                        way.id.raw(),
                        way.name,
                        way.highway,
                        way.oneway as i64,
                        way.maxspeed_kmh as i64,
                        way.bridge as i64,
                        way.tunnel as i64,
                        way.surface,
                        way.ford as i64,
                        way.traffic_calming,
                        way.width_m,
                        way.narrow as i64,
                    ])?;
                    for (idx, nid) in way.nodes.iter().enumerate() {
                        wn_stmt.execute(params![way.id.raw(), idx as i64, nid.raw()])?;
                    }
                }

                let mut rc_stmt = tx.prepare_cached(
                    "INSERT INTO railway_crossings (node_id, lat, lon) VALUES (?1, ?2, ?3)",
                )?;
                let mut rc_rtree_stmt = tx.prepare_cached(
                    "INSERT INTO railway_rtree (id, min_lat, max_lat, min_lon, max_lon)
                     VALUES (?1, ?2, ?2, ?3, ?3)",
                )?;
                for rc in &region.railway_crossings {
                    rc_stmt.execute(params![rc.node_id.raw(), rc.point.lat, rc.point.lon])?;
                    rc_rtree_stmt.execute(params![rc.node_id.raw(), rc.point.lat, rc.point.lon])?;
                }

                let mut b_stmt = tx.prepare_cached(
                    "INSERT INTO barriers (node_id, lat, lon, kind) VALUES (?1, ?2, ?3, ?4)",
                )?;
                let mut b_rtree_stmt = tx.prepare_cached(
                    "INSERT INTO barrier_rtree (id, min_lat, max_lat, min_lon, max_lon)
                     VALUES (?1, ?2, ?2, ?3, ?3)",
                )?;
                for b in &region.barriers {
                    b_stmt.execute(params![
                        b.node_id.raw(),
                        b.point.lat,
                        b.point.lon,
                        b.kind.as_tag()
                    ])?;
                    b_rtree_stmt.execute(params![b.node_id.raw(), b.point.lat, b.point.lon])?;
                }

                // Derive junctions: any node referenced by ≥ 2 distinct ways.
                let nodes_by_id: FxHashMap<NodeId, &Node> =
                    region.nodes.iter().map(|n| (n.id, n)).collect();
                let ways_by_id: FxHashMap<WayId, &Way> =
                    region.ways.iter().map(|w| (w.id, w)).collect();
                let mut node_way_ids: FxHashMap<NodeId, Vec<WayId>> = FxHashMap::default();
                for way in &region.ways {
                    for nid in &way.nodes {
                        let entry = node_way_ids.entry(*nid).or_default();
                        // A node can repeat inside one way (loops); count it once.
                        if !entry.contains(&way.id) {
                            entry.push(way.id);
                        }
                    }
                }

                let mut junction_stmt = tx.prepare_cached(
                    "INSERT INTO junctions (node_id, lat, lon, is_t_junction)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                let mut jw_stmt = tx.prepare_cached(
                    "INSERT INTO junction_ways (junction_id, way_id) VALUES (?1, ?2)",
                )?;
                let mut junction_count = 0usize;
                for (nid, way_ids) in &node_way_ids {
                    if way_ids.len() < 2 {
                        continue;
                    }
                    let Some(node) = nodes_by_id.get(nid) else {
                        continue;
                    };
                    let is_t = is_t_junction(node, way_ids, &nodes_by_id, &ways_by_id);
                    junction_stmt.execute(params![
                        nid.raw(),
                        node.lat,
                        node.lon,
                        is_t as i64
                    ])?;
                    for wid in way_ids {
                        jw_stmt.execute(params![nid.raw(), wid.raw()])?;
                    }
                    junction_count += 1;
                }
                info!(
                    nodes = region.nodes.len(),
                    ways = region.ways.len(),
                    junctions = junction_count,
                    "store populated"
                );
            }
            tx.commit()?;

            // Refresh query-planner statistics after a bulk rewrite.
            conn.execute_batch("ANALYZE;")?;
            Ok(())
        })?;

        // Re-derive and cache the bounds for the region index.
        self.get_bounds()?;
        Ok(())
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

fn ensure_schema(conn: &Connection) -> MapResult<()> {
    let version: Option<u32> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .ok()
        .and_then(|v| v.parse().ok());

    match version {
        Some(v) if v == SCHEMA_VERSION => return Ok(()),
        Some(v) => {
            warn!(found = v, expected = SCHEMA_VERSION, "stale map schema, rebuilding");
            conn.execute_batch(
                "DROP TABLE IF EXISTS metadata;
                 DROP TABLE IF EXISTS nodes;
                 DROP TABLE IF EXISTS ways;
                 DROP TABLE IF EXISTS way_nodes;
                 DROP TABLE IF EXISTS railway_crossings;
                 DROP TABLE IF EXISTS barriers;
                 DROP TABLE IF EXISTS junctions;
                 DROP TABLE IF EXISTS junction_ways;
                 DROP TABLE IF EXISTS node_rtree;
                 DROP TABLE IF EXISTS railway_rtree;
                 DROP TABLE IF EXISTS barrier_rtree;",
            )?;
        }
        None => {}
    }

    conn.execute_batch(
        "-- Key-value store for schema version, cached bounds, source file.
         CREATE TABLE IF NOT EXISTS metadata (
             key   TEXT PRIMARY KEY,
             value TEXT
         );

         CREATE TABLE IF NOT EXISTS nodes (
             id  INTEGER PRIMARY KEY,
             lat REAL NOT NULL,
             lon REAL NOT NULL
         );

         CREATE TABLE IF NOT EXISTS ways (
             id              INTEGER PRIMARY KEY,
             name            TEXT,
             highway         TEXT,
             oneway          INTEGER DEFAULT 0,
             maxspeed_kmh    INTEGER DEFAULT 0,
             bridge          INTEGER DEFAULT 0,
             tunnel          INTEGER DEFAULT 0,
             surface         TEXT DEFAULT '',
             ford            INTEGER DEFAULT 0,
             traffic_calming TEXT DEFAULT '',
             width_m         REAL DEFAULT 0.0,
             narrow          INTEGER DEFAULT 0
         );

         -- Ordered node reference list per way.
         CREATE TABLE IF NOT EXISTS way_nodes (
             way_id  INTEGER,
             idx     INTEGER,
             node_id INTEGER,
             PRIMARY KEY (way_id, idx)
         );

         CREATE TABLE IF NOT EXISTS railway_crossings (
             node_id INTEGER PRIMARY KEY,
             lat     REAL NOT NULL,
             lon     REAL NOT NULL
         );

         CREATE TABLE IF NOT EXISTS barriers (
             node_id INTEGER PRIMARY KEY,
             lat     REAL NOT NULL,
             lon     REAL NOT NULL,
             kind    TEXT NOT NULL
         );

         -- Precomputed at ingest: nodes where >= 2 ways meet.
         CREATE TABLE IF NOT EXISTS junctions (
             node_id       INTEGER PRIMARY KEY,
             lat           REAL NOT NULL,
             lon           REAL NOT NULL,
             is_t_junction INTEGER DEFAULT 0
         );

         CREATE TABLE IF NOT EXISTS junction_ways (
             junction_id INTEGER,
             way_id      INTEGER,
             PRIMARY KEY (junction_id, way_id)
         );

         CREATE VIRTUAL TABLE IF NOT EXISTS node_rtree USING rtree(
             id, min_lat, max_lat, min_lon, max_lon
         );

         CREATE VIRTUAL TABLE IF NOT EXISTS railway_rtree USING rtree(
             id, min_lat, max_lat, min_lon, max_lon
         );

         CREATE VIRTUAL TABLE IF NOT EXISTS barrier_rtree USING rtree(
             id, min_lat, max_lat, min_lon, max_lon
         );

         CREATE INDEX IF NOT EXISTS idx_way_nodes_node ON way_nodes(node_id);
         CREATE INDEX IF NOT EXISTS idx_way_nodes_way  ON way_nodes(way_id);",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

// ── T-junction detection ──────────────────────────────────────────────────────

/// A junction is a T when two incident bearings are roughly aligned (the
/// through road) and a third sits between 60° and 120° off them (the side
/// road).
fn is_t_junction(
    node: &Node,
    way_ids: &[WayId],
    nodes: &FxHashMap<NodeId, &Node>,
    ways: &FxHashMap<WayId, &Way>,
) -> bool {
    if way_ids.len() < 2 {
        return false;
    }

    let mut bearings: Vec<f64> = Vec::new();
    for wid in way_ids {
        let Some(way) = ways.get(wid) else { continue };
        let Some(idx) = way.nodes.iter().position(|n| *n == node.id) else {
            continue;
        };
        if idx > 0
            && let Some(prev) = nodes.get(&way.nodes[idx - 1])
        {
            bearings.push(initial_bearing_deg(node, *prev));
        }
        if idx + 1 < way.nodes.len()
            && let Some(next) = nodes.get(&way.nodes[idx + 1])
        {
            bearings.push(initial_bearing_deg(node, *next));
        }
    }

    if bearings.len() < 3 {
        return false;
    }

    for (i, &b1) in bearings.iter().enumerate() {
        for (j, &b2) in bearings.iter().enumerate() {
            if i >= j {
                continue;
            }
            let diff = ((b1 - b2 + 180.0).rem_euclid(360.0) - 180.0).abs();
            let aligned = diff > 150.0 || diff < 30.0;
            if !aligned {
                continue;
            }
            for (k, &b3) in bearings.iter().enumerate() {
                if k == i || k == j {
                    continue;
                }
                let side = ((b3 - b1 + 180.0).rem_euclid(360.0) - 180.0).abs();
                if (60.0..120.0).contains(&side) {
                    return true;
                }
            }
        }
    }
    false
}

// ── Small helpers ─────────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

fn format_bounds((min_lat, min_lon, max_lat, max_lon): Bounds) -> String {
    format!("{min_lat},{min_lon},{max_lat},{max_lon}")
}

fn parse_bounds(text: &str) -> Option<Bounds> {
    let mut parts = text.split(',').map(|p| p.parse::<f64>().ok());
    let (a, b, c, d) = (parts.next()??, parts.next()??, parts.next()??, parts.next()??);
    Some((a, b, c, d))
}
