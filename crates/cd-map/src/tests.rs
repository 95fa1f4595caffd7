//! Unit tests for cd-map.
//!
//! All tests populate temporary stores with a small hand-crafted region, so
//! no real map extract is needed.

#[cfg(test)]
mod helpers {
    use cd_core::{GeoPoint, NodeId, WayId};

    use crate::network::{Barrier, BarrierKind, Node, RailwayCrossing, Way};
    use crate::store::RegionData;

    /// A T-shaped mini region around (51.5000, -0.1000):
    ///
    /// ```text
    ///                      n5 (51.5010)
    ///                      |
    ///  n1 —— n2 —— n3 —— n4          High Street, west → east
    ///              └ junction (T)
    /// ```
    ///
    /// Extras: railway crossing on n2, gate on n5, and n6 — a node on no way
    /// at all — carrying a barrier that must never survive a region load.
    pub fn t_region() -> RegionData {
        let node = |id: i64, lat: f64, lon: f64| Node { id: NodeId(id), lat, lon };
        let nodes = vec![
            node(1, 51.5000, -0.1020),
            node(2, 51.5000, -0.1010),
            node(3, 51.5000, -0.1000),
            node(4, 51.5000, -0.0990),
            node(5, 51.5010, -0.1000),
            node(6, 51.5020, -0.1050),
        ];

        let high_street = Way {
            id: WayId(100),
            nodes: vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)],
            name: "High Street".into(),
            highway: "residential".into(),
            surface: "asphalt".into(),
            ..Default::default()
        };
        let side_road = Way {
            id: WayId(200),
            nodes: vec![NodeId(3), NodeId(5)],
            name: "Side Road".into(),
            highway: "residential".into(),
            bridge: true,
            ..Default::default()
        };

        RegionData {
            nodes,
            ways: vec![high_street, side_road],
            railway_crossings: vec![RailwayCrossing {
                node_id: NodeId(2),
                point: GeoPoint::new(51.5000, -0.1010),
            }],
            barriers: vec![
                Barrier {
                    node_id: NodeId(5),
                    point: GeoPoint::new(51.5010, -0.1000),
                    kind: BarrierKind::Gate,
                },
                Barrier {
                    node_id: NodeId(6),
                    point: GeoPoint::new(51.5020, -0.1050),
                    kind: BarrierKind::CattleGrid,
                },
            ],
        }
    }
}

#[cfg(test)]
mod store {
    use cd_core::{NodeId, WayId};

    use crate::store::MapStore;

    use super::helpers::t_region;

    fn temp_store() -> (tempfile::TempDir, MapStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = MapStore::open(dir.path().join("test.roads.db"));
        store.populate(&t_region()).expect("populate");
        (dir, store)
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let (_dir, store) = temp_store();
        let (min_lat, min_lon, max_lat, max_lon) =
            store.get_bounds().unwrap().expect("bounds");
        assert!(min_lat <= 51.5000 && max_lat >= 51.5020);
        assert!(min_lon <= -0.1050 && max_lon >= -0.0990);
        // Second read comes from the metadata cache and must agree.
        assert_eq!(store.get_bounds().unwrap().unwrap(), (min_lat, min_lon, max_lat, max_lon));
    }

    #[test]
    fn load_region_returns_whole_ways() {
        let (_dir, store) = temp_store();
        // 80 m radius: n1 (~140 m west) and n5 (~110 m north) fall outside the
        // box, but both ways touch in-box nodes and must resolve whole.
        let network = store.load_region(51.5000, -0.1000, 80.0).unwrap();

        assert_eq!(network.way_count(), 2);
        let high_street = &network.ways[&WayId(100)];
        assert_eq!(high_street.nodes.len(), 4);
        for nid in &high_street.nodes {
            assert!(network.nodes.contains_key(nid), "missing {nid}");
        }
        assert_eq!(network.way_geometry(WayId(100)).len(), 4);
    }

    #[test]
    fn junction_is_derived_with_t_flag() {
        let (_dir, store) = temp_store();
        let network = store.load_region(51.5000, -0.1000, 500.0).unwrap();

        assert_eq!(network.junction_count(), 1);
        let junction = &network.junctions[&NodeId(3)];
        assert!(junction.is_t_junction);
        let mut connected = junction.connected_ways.clone();
        connected.sort();
        assert_eq!(connected, vec![WayId(100), WayId(200)]);
    }

    #[test]
    fn features_only_on_loaded_ways() {
        let (_dir, store) = temp_store();
        let network = store.load_region(51.5000, -0.1000, 800.0).unwrap();

        assert!(network.railway_crossings.contains_key(&NodeId(2)));
        assert!(network.barriers.contains_key(&NodeId(5)));
        // n6 is inside the box but sits on no way.
        assert!(!network.barriers.contains_key(&NodeId(6)));
    }

    #[test]
    fn empty_area_yields_empty_network() {
        let (_dir, store) = temp_store();
        let network = store.load_region(55.0, -3.0, 1_000.0).unwrap();
        assert!(network.is_empty());
    }

    #[test]
    fn repopulate_replaces_contents() {
        let (_dir, store) = temp_store();
        let mut region = t_region();
        region.ways.truncate(1);
        store.populate(&region).unwrap();
        let network = store.load_region(51.5000, -0.1000, 500.0).unwrap();
        assert_eq!(network.way_count(), 1);
        // With one way there is no junction any more.
        assert_eq!(network.junction_count(), 0);
    }

    #[test]
    fn segment_index_finds_nearby_ways() {
        let (_dir, store) = temp_store();
        let mut network = store.load_region(51.5000, -0.1000, 500.0).unwrap();
        network.rebuild_segment_index();

        let hits = network.segments_near(&(51.5001, -0.1005), 50.0);
        assert!(hits.iter().any(|(wid, _)| *wid == WayId(100)));

        let far = network.segments_near(&(51.6, -0.2), 50.0);
        assert!(far.is_empty());
    }
}

#[cfg(test)]
mod loader {
    use std::sync::Arc;

    use cd_core::{NodeId, WayId};

    use crate::loader::MapLoader;
    use crate::network::{Node, Way};
    use crate::store::{MapStore, RegionData};

    use super::helpers::t_region;

    #[test]
    fn single_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("test.roads.db");
        MapStore::open(&db).populate(&t_region()).unwrap();

        let loader = MapLoader::open(&db).unwrap();
        assert_eq!(loader.region_count(), 1);
        let network = loader.load_around(51.5000, -0.1000, 1_000.0).unwrap();
        assert_eq!(network.way_count(), 2);
    }

    #[test]
    fn missing_path_is_absent() {
        assert!(MapLoader::open("/nonexistent/nowhere.roads.db").is_err());
    }

    #[test]
    fn query_cache_hit_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("test.roads.db");
        MapStore::open(&db).populate(&t_region()).unwrap();
        let loader = MapLoader::open(&db).unwrap();

        let first = loader.load_around(51.5000, -0.1000, 1_000.0).unwrap();
        // Same centre, smaller radius: served from cache.
        let second = loader.load_around(51.5001, -0.1001, 500.0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Larger radius cannot be served from a smaller cached area.
        let third = loader.load_around(51.5000, -0.1000, 2_000.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));

        // Moving more than half the cached radius invalidates it.
        let far = loader.load_around(51.5200, -0.1000, 2_000.0).unwrap();
        assert!(!Arc::ptr_eq(&third, &far));
    }

    #[test]
    fn directory_of_regions_merges_results() {
        let dir = tempfile::tempdir().unwrap();

        // Region A: the T-shaped network around (51.50, -0.10).
        MapStore::open(dir.path().join("south.roads.db"))
            .populate(&t_region())
            .unwrap();

        // Region B: one road far to the north.
        let node = |id: i64, lat: f64, lon: f64| Node { id: NodeId(id), lat, lon };
        let north = RegionData {
            nodes: vec![node(10, 53.0000, -0.1000), node(11, 53.0000, -0.0990)],
            ways: vec![Way {
                id: WayId(900),
                nodes: vec![NodeId(10), NodeId(11)],
                highway: "primary".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        MapStore::open(dir.path().join("north.roads.db")).populate(&north).unwrap();

        let loader = MapLoader::open(dir.path()).unwrap();
        assert_eq!(loader.region_count(), 2);

        let south = loader.load_around(51.5000, -0.1000, 1_000.0).unwrap();
        assert!(south.ways.contains_key(&WayId(100)));
        assert!(!south.ways.contains_key(&WayId(900)));

        let north = loader.load_around(53.0000, -0.1000, 1_000.0).unwrap();
        assert!(north.ways.contains_key(&WayId(900)));
    }
}
