//! drive — smallest runnable demo of the codriver engine.
//!
//! Builds a synthetic rally stage into a temporary map store, then lets the
//! GPS simulator drive it while the engine calls the corners.  No hardware,
//! no map download; swap the store path for a real regional `.roads.db` to
//! drive actual roads.

use std::path::Path;

use anyhow::Result;

use cd_core::{GeoPoint, NodeId, WayId, offset};
use cd_engine::{CoPilot, EngineConfig, GpsSimulator};
use cd_map::{MapStore, Node, RailwayCrossing, RegionData, Way};

// ── Constants ─────────────────────────────────────────────────────────────────

const START_LAT: f64 = 51.5000;
const START_LON: f64 = -0.1000;
const SPEED_MPS: f64 = 18.0; // ~65 km/h
const STEP_S: f64 = 0.5;
const CYCLES: usize = 240; // two simulated minutes

// ── Stage geometry ────────────────────────────────────────────────────────────

/// One made-up stage: a fast straight, a 90° left over a bridge section, a
/// northbound straight with a level crossing, and a tight right to finish.
fn build_stage() -> (RegionData, Vec<GeoPoint>) {
    let mut points = vec![GeoPoint::new(START_LAT, START_LON)];

    let extend_straight = |points: &mut Vec<GeoPoint>, heading: f64, length: f64, step: f64| {
        let from = *points.last().expect("seeded");
        let steps = (length / step) as usize;
        for i in 1..=steps {
            points.push(offset(&from, heading, i as f64 * step));
        }
    };
    let extend_arc = |points: &mut Vec<GeoPoint>,
                      entry_heading: f64,
                      radius: f64,
                      total_deg: f64,
                      left: bool| {
        let entry = *points.last().expect("seeded");
        let to_centre = if left { entry_heading - 90.0 } else { entry_heading + 90.0 };
        let centre = offset(&entry, to_centre, radius);
        let spoke0 = entry_heading + if left { 90.0 } else { -90.0 };
        let steps = (total_deg / 10.0) as usize;
        for i in 1..=steps {
            let phi = i as f64 * 10.0;
            let spoke = if left { spoke0 - phi } else { spoke0 + phi };
            points.push(offset(&centre, spoke, radius));
        }
    };

    extend_straight(&mut points, 90.0, 540.0, 30.0);
    extend_arc(&mut points, 90.0, 25.0, 90.0, true); // left onto north
    extend_straight(&mut points, 0.0, 360.0, 30.0);
    extend_arc(&mut points, 0.0, 12.0, 100.0, false); // tight right
    extend_straight(&mut points, 100.0, 240.0, 30.0);

    let nodes: Vec<Node> = points
        .iter()
        .enumerate()
        .map(|(i, p)| Node { id: NodeId(i as i64 + 1), lat: p.lat, lon: p.lon })
        .collect();

    // Split into three ways of one road so the bridge flag covers only the
    // corner section; shared end nodes become junctions in the store.
    let n = nodes.len();
    let first_cut = 18; // just before the left-hander
    let second_cut = 24; // just after it
    let make_way = |id: i64, range: std::ops::Range<usize>, bridge: bool| Way {
        id: WayId(id),
        nodes: nodes[range].iter().map(|node| node.id).collect(),
        name: "Stage Road".into(),
        highway: "tertiary".into(),
        surface: if bridge { "concrete".into() } else { "asphalt".into() },
        bridge,
        ..Default::default()
    };
    let ways = vec![
        make_way(1, 0..first_cut + 1, false),
        make_way(2, first_cut..second_cut + 1, true),
        make_way(3, second_cut..n, false),
    ];

    // A level crossing halfway up the northbound straight.
    let crossing_node = &nodes[32.min(n - 1)];
    let region = RegionData {
        railway_crossings: vec![RailwayCrossing {
            node_id: crossing_node.id,
            point: GeoPoint::new(crossing_node.lat, crossing_node.lon),
        }],
        nodes,
        ways,
        ..Default::default()
    };
    (region, points)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== drive — codriver demo stage ===");

    // 1. Build the stage into a map store.
    std::fs::create_dir_all("output/drive")?;
    let db_path = Path::new("output/drive/stage.roads.db");
    let (region, route) = build_stage();
    MapStore::open(db_path).populate(&region)?;
    let stage_length = cd_core::cumulative_distances(&route).last().copied().unwrap_or(0.0);
    println!(
        "Stage: {} nodes, {} ways, {:.0} m",
        region.nodes.len(),
        region.ways.len(),
        stage_length
    );

    // 2. Engine over the store, simulator on the stage centreline.
    let mut config = EngineConfig::new(db_path);
    config.simulation_mode = true;
    let gps = GpsSimulator::along_route(route, SPEED_MPS).with_fixed_step(STEP_S);
    let mut copilot = CoPilot::new(config, gps);
    let reader = copilot.snapshot_reader();
    copilot.start()?;

    // 3. Drive.
    let mut spoken = String::new();
    for cycle in 0..CYCLES {
        copilot.update_cycle();
        let snap = reader.get();
        if snap.last_callout != spoken {
            spoken = snap.last_callout.clone();
            println!("  [{:>5.1} s]  {spoken}", cycle as f64 * STEP_S);
        }
    }

    // 4. Summary.
    let snap = reader.get();
    println!();
    println!("Final status  : {:?}", snap.status);
    println!("Corners ahead : {}", snap.corners_ahead);
    println!("Path ahead    : {:.0} m", snap.path_distance);
    copilot.stop();

    Ok(())
}
