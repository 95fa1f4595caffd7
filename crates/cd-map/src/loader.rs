//! Map loader: owns the region stores and answers "roads around here".
//!
//! Three layouts are detected from the configured path:
//!
//! 1. A single `.roads.db` file — queried directly.
//! 2. A directory holding several `.roads.db` region files — a bounds index
//!    is built from each store's cached bounds; queries hit the containing
//!    region plus any region within the boundary-preload band, and results
//!    are merged.
//! 3. A raw `.osm.pbf` extract (feature `osm`) — ingested once into a
//!    sibling `.roads.db`, then treated as layout 1.
//!
//! The last query is cached: a new request is served from it when the new
//! centre is within half the cached radius of the cached centre and the new
//! radius fits inside the cached one.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use cd_core::{GeoPoint, haversine_m};

use crate::error::{MapError, MapResult};
use crate::network::RoadNetwork;
use crate::store::{Bounds, MapStore};

/// Regions whose boundary lies within this distance of the query point are
/// merged in, so driving across a region seam never drops the road ahead.
const BOUNDARY_PRELOAD_M: f64 = 5_000.0;

struct Region {
    name: String,
    store: MapStore,
    bounds: Option<Bounds>,
}

struct QueryCache {
    centre: GeoPoint,
    radius_m: f64,
    network: Arc<RoadNetwork>,
}

/// Owns one or more [`MapStore`]s and serves merged bounding-box queries.
pub struct MapLoader {
    regions: Vec<Region>,
    cache: Mutex<Option<QueryCache>>,
}

impl MapLoader {
    /// Detect the layout at `path` and open the stores.
    pub fn open(path: impl AsRef<Path>) -> MapResult<Self> {
        let path = path.as_ref();

        if path.is_dir() {
            let mut db_files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.to_string_lossy().ends_with(".roads.db"))
                .collect();
            db_files.sort();

            if !db_files.is_empty() {
                return Self::from_db_files(db_files);
            }

            let pbf_files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.to_string_lossy().ends_with(".osm.pbf"))
                .collect();
            if let Some(pbf) = pbf_files.into_iter().max_by_key(|p| {
                p.metadata().and_then(|m| m.modified()).ok()
            }) {
                return Self::from_pbf(&pbf);
            }

            return Err(MapError::Absent(path.to_path_buf()));
        }

        let name = path.to_string_lossy();
        if name.ends_with(".roads.db") {
            if !path.exists() {
                return Err(MapError::Absent(path.to_path_buf()));
            }
            return Self::from_db_files(vec![path.to_path_buf()]);
        }
        if name.ends_with(".osm.pbf") {
            return Self::from_pbf(path);
        }

        Err(MapError::Absent(path.to_path_buf()))
    }

    fn from_db_files(db_files: Vec<PathBuf>) -> MapResult<Self> {
        let mut regions = Vec::with_capacity(db_files.len());
        for db_path in db_files {
            let name = region_name(&db_path);
            let store = MapStore::open(&db_path);
            // A region with unreadable bounds is kept but never matched by
            // the index; a single-region loader queries it regardless.
            let bounds = match store.get_bounds() {
                Ok(b) => b,
                Err(e) => {
                    warn!(region = %name, error = %e, "could not read region bounds");
                    None
                }
            };
            regions.push(Region { name, store, bounds });
        }
        info!(regions = regions.len(), "map loader ready");
        Ok(Self { regions, cache: Mutex::new(None) })
    }

    #[cfg(feature = "osm")]
    fn from_pbf(pbf_path: &Path) -> MapResult<Self> {
        if !pbf_path.exists() {
            return Err(MapError::Absent(pbf_path.to_path_buf()));
        }
        let db_path = PathBuf::from(
            pbf_path.to_string_lossy().replace(".osm.pbf", ".roads.db"),
        );
        if !db_path.exists() {
            info!(source = %pbf_path.display(), "no store yet, running one-off ingest");
            let store = MapStore::open(&db_path);
            crate::ingest::ingest_pbf(&store, pbf_path)?;
        }
        Self::from_db_files(vec![db_path])
    }

    #[cfg(not(feature = "osm"))]
    fn from_pbf(pbf_path: &Path) -> MapResult<Self> {
        Err(MapError::Osm(format!(
            "{} is a raw extract and this build has no ingest support (enable the `osm` feature)",
            pbf_path.display()
        )))
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Load the road network within `radius_m` of a point, merged across
    /// whichever regions cover it.
    pub fn load_around(&self, lat: f64, lon: f64, radius_m: f64) -> MapResult<Arc<RoadNetwork>> {
        {
            let cache = self.cache.lock().expect("loader cache mutex poisoned");
            if let Some(cached) = cache.as_ref() {
                let moved = haversine_m(&GeoPoint::new(lat, lon), &cached.centre);
                if moved < cached.radius_m / 2.0 && radius_m <= cached.radius_m {
                    return Ok(Arc::clone(&cached.network));
                }
            }
        }

        let selected: Vec<&Region> = if self.regions.len() == 1 {
            self.regions.iter().collect()
        } else {
            self.regions_for(lat, lon)
        };

        let mut merged = RoadNetwork::new();
        if selected.is_empty() {
            warn!(lat, lon, "no region covers this position");
        }
        for region in &selected {
            let part = region.store.load_region(lat, lon, radius_m)?;
            merged.merge(part);
        }
        merged.rebuild_segment_index();

        info!(
            ways = merged.way_count(),
            junctions = merged.junction_count(),
            regions = selected.len(),
            "loaded roads"
        );

        let network = Arc::new(merged);
        *self.cache.lock().expect("loader cache mutex poisoned") = Some(QueryCache {
            centre: GeoPoint::new(lat, lon),
            radius_m,
            network: Arc::clone(&network),
        });
        Ok(network)
    }

    /// Regions containing the point, then regions within the preload band.
    fn regions_for(&self, lat: f64, lon: f64) -> Vec<&Region> {
        let mut containing = Vec::new();
        let mut nearby = Vec::new();
        for region in &self.regions {
            let Some(bounds) = region.bounds else { continue };
            let (min_lat, min_lon, max_lat, max_lon) = bounds;
            if (min_lat..=max_lat).contains(&lat) && (min_lon..=max_lon).contains(&lon) {
                containing.push(region);
            } else if distance_to_bounds(lat, lon, bounds) < BOUNDARY_PRELOAD_M {
                nearby.push(region);
            }
        }
        containing.extend(nearby);
        containing
    }
}

/// Approximate distance from a point to the edge of a bounding box; 0 inside.
fn distance_to_bounds(lat: f64, lon: f64, (min_lat, min_lon, max_lat, max_lon): Bounds) -> f64 {
    let nearest_lat = lat.clamp(min_lat, max_lat);
    let nearest_lon = lon.clamp(min_lon, max_lon);
    let lat_m = (lat - nearest_lat).abs() * 111_000.0;
    let lon_m = (lon - nearest_lon).abs() * 111_000.0 * lat.to_radians().cos();
    (lat_m * lat_m + lon_m * lon_m).sqrt()
}

fn region_name(db_path: &Path) -> String {
    db_path
        .file_name()
        .map(|n| n.to_string_lossy().trim_end_matches(".roads.db").to_owned())
        .unwrap_or_else(|| db_path.to_string_lossy().into_owned())
}
