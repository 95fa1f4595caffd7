//! The CoPilot orchestrator.
//!
//! # Update cycle
//!
//! ```text
//! every interval (default 0.5 s):
//!   ① read one GPS fix                 — none → publish no-gps
//!   ② adopt a finished background load — atomic network swap
//!   ③ (re)load roads if needed        — sync when nothing loaded yet,
//!                                        async prefetch otherwise
//!   ④ project the path ahead          — < 5 points → publish no-path
//!   ⑤ detect corners                  — curvature segmentation
//!   ⑥ generate pacenotes              — brackets, blocking, merging
//!   ⑦ speak fresh notes               — dedup + speed-scaled timing
//!   ⑧ publish the snapshot, tidy the callout memory
//! ```
//!
//! # Map-loading states
//!
//! `NO_DATA` (no network) → synchronous load → `READY`; moving past the
//! refetch threshold kicks a background `LOADING` thread whose result is
//! adopted at the top of a later cycle.  At most one load is in flight —
//! the flag is checked-and-set on this thread only, and the pending slot is
//! written exactly once per load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::SystemTime;

use tracing::{debug, error, info, warn};

use cd_audio::AudioPlayer;
use cd_core::{GeoPoint, Position, haversine_m};
use cd_corner::CornerDetector;
use cd_map::{MapLoader, RoadNetwork};
use cd_note::PacenoteGenerator;
use cd_path::PathProjector;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::gps::GpsSource;
use crate::route::{GpxRoute, RouteSource};
use crate::snapshot::{CoPilotSnapshot, Mode, SnapshotReader, Status};

/// Result of a background road load, parked for the engine thread.
struct PendingLoad {
    network: Arc<RoadNetwork>,
    centre: GeoPoint,
}

/// The rally co-driver engine.
pub struct CoPilot<G: GpsSource> {
    config: EngineConfig,
    gps: G,

    loader: Option<Arc<MapLoader>>,
    network: Option<Arc<RoadNetwork>>,
    last_load_centre: Option<GeoPoint>,
    pending: Arc<Mutex<Option<PendingLoad>>>,
    load_in_flight: Arc<AtomicBool>,

    detector: CornerDetector,
    notes: PacenoteGenerator,
    audio: Option<AudioPlayer>,

    mode: Mode,
    route: Option<Arc<dyn RouteSource>>,

    last_callout: String,
    last_callout_at: Option<SystemTime>,

    snapshot: Arc<Mutex<Arc<CoPilotSnapshot>>>,
    running: Arc<AtomicBool>,
}

impl<G: GpsSource> CoPilot<G> {
    pub fn new(config: EngineConfig, gps: G) -> Self {
        let detector = CornerDetector::new(config.detector);
        let notes = PacenoteGenerator::new(config.notes);
        let audio = config.audio_enabled.then(|| AudioPlayer::new(config.audio.clone()));

        Self {
            config,
            gps,
            loader: None,
            network: None,
            last_load_centre: None,
            pending: Arc::new(Mutex::new(None)),
            load_in_flight: Arc::new(AtomicBool::new(false)),
            detector,
            notes,
            audio,
            mode: Mode::JustDrive,
            route: None,
            last_callout: String::new(),
            last_callout_at: None,
            snapshot: Arc::new(Mutex::new(Arc::new(CoPilotSnapshot::default()))),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Connect the GPS and start the audio worker.
    pub fn start(&mut self) -> EngineResult<()> {
        self.gps.connect()?;
        if let Some(audio) = &mut self.audio {
            audio.start();
        }
        self.running.store(true, Ordering::SeqCst);
        info!(lookahead_m = self.config.lookahead_m, "copilot started");
        Ok(())
    }

    /// Run update cycles until [`stop`](Self::stop) is called (from a
    /// [`stop_flag`](Self::stop_flag) clone on another thread).
    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.update_cycle();
            thread::sleep(self.config.update_interval);
        }
    }

    /// Stop the loop first, then the audio worker, then the GPS.  A load
    /// still in flight finishes on its own; its result is simply never
    /// adopted.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(audio) = &mut self.audio {
            audio.stop();
        }
        self.gps.disconnect();
        info!("copilot stopped");
    }

    /// A flag another thread may clear to end [`run`](Self::run).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Cloneable handle for snapshot consumers (UI, logging).
    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader { slot: Arc::clone(&self.snapshot) }
    }

    // ── Mode and route ────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes; route-follow requires a loaded route.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if mode == Mode::RouteFollow && self.route.is_none() {
            warn!("cannot enter route-follow mode without a route");
            return false;
        }
        self.mode = mode;
        info!(?mode, "mode changed");
        true
    }

    /// Load a GPX route file for route-follow mode.
    pub fn load_route(&mut self, path: impl AsRef<std::path::Path>) -> EngineResult<()> {
        let route = GpxRoute::load(path)?;
        self.route = Some(Arc::new(route));
        Ok(())
    }

    /// Use any route source (e.g. a lap-timing centerline).
    pub fn set_route(&mut self, route: Arc<dyn RouteSource>) {
        self.route = Some(route);
    }

    /// Drop the route and fall back to just-drive.
    pub fn clear_route(&mut self) {
        self.route = None;
        self.mode = Mode::JustDrive;
        info!("route cleared");
    }

    // ── The cycle ─────────────────────────────────────────────────────────

    /// One pass of the pipeline.  Never panics, never propagates: every
    /// failure ends as a snapshot status.
    pub fn update_cycle(&mut self) {
        let Some(pos) = self.gps.read_position() else {
            self.publish(Status::NoGps, None);
            return;
        };

        self.adopt_pending_load();

        if self.loader.is_none() {
            // Keep trying: the map file may appear (USB stick, first sync).
            match MapLoader::open(&self.config.map_path) {
                Ok(loader) => self.loader = Some(Arc::new(loader)),
                Err(e) => debug!(error = %e, "map not available yet"),
            }
        }

        if self.loader.is_some() && self.should_refetch(&pos) {
            if self.network.is_none() {
                self.load_roads_sync(&pos);
            } else {
                self.load_roads_async(&pos);
            }
        }

        let Some(network) = self.network.clone() else {
            self.publish(Status::NoMap, Some(&pos));
            return;
        };

        let route_waypoints: Option<Vec<GeoPoint>> =
            if self.mode == Mode::RouteFollow {
                self.route.as_ref().map(|route| {
                    route.upcoming_waypoints(pos.lat, pos.lon, self.config.lookahead_m)
                })
            } else {
                None
            };

        let projector = PathProjector::new(&network);
        let path = projector.project(
            pos.lat,
            pos.lon,
            pos.heading_deg,
            self.config.lookahead_m,
            route_waypoints.as_deref(),
        );
        let Some(path) = path.filter(|p| p.points.len() >= 5) else {
            self.publish(Status::NoPath, Some(&pos));
            return;
        };

        let polyline = path.polyline();
        let corners = self.detector.detect(&polyline, 0.0);
        let notes = self.notes.generate(&corners, &path.features);

        for note in &notes {
            if let Some(spoken) = self.notes.should_call(note, pos.speed_mps) {
                self.last_callout = spoken.text.clone();
                self.last_callout_at = Some(SystemTime::now());
                if let Some(audio) = &self.audio {
                    audio.say(&spoken.text, spoken.priority);
                }
                debug!(distance_m = spoken.distance_m as i64, text = %spoken.text, "callout");
            }
        }

        let mut snap = self.base_snapshot(Status::Active, Some(&pos));
        snap.corners_ahead = corners.len();
        if let Some(next) = corners.first() {
            snap.next_corner_distance = next.entry_distance;
            snap.next_corner_direction = Some(next.direction);
            snap.next_corner_severity = next.severity;
        }
        snap.path_distance = path.total_distance;
        *self.snapshot.lock().expect("snapshot slot poisoned") = Arc::new(snap);

        self.notes.maintain();
    }

    // ── Map loading ───────────────────────────────────────────────────────

    /// Adopt a background load, swapping the network atomically.
    fn adopt_pending_load(&mut self) {
        let pending = self.pending.lock().expect("pending slot poisoned").take();
        if let Some(load) = pending {
            info!(ways = load.network.way_count(), "adopting prefetched roads");
            self.network = Some(load.network);
            self.last_load_centre = Some(load.centre);
        }
    }

    /// Do we need fresh roads for this position?
    fn should_refetch(&self, pos: &Position) -> bool {
        if self.load_in_flight.load(Ordering::SeqCst) {
            return false;
        }
        let (Some(centre), Some(_)) = (self.last_load_centre, self.network.as_ref()) else {
            return true;
        };
        haversine_m(pos, &centre) > self.config.effective_refetch_distance()
    }

    /// First load: block the cycle, there is nothing to navigate with yet.
    fn load_roads_sync(&mut self, pos: &Position) {
        let Some(loader) = self.loader.as_ref() else { return };
        let radius = self.config.effective_load_radius();
        info!(lat = pos.lat, lon = pos.lon, radius, "loading roads");
        match loader.load_around(pos.lat, pos.lon, radius) {
            Ok(network) => {
                self.network = Some(network);
                self.last_load_centre = Some(GeoPoint::new(pos.lat, pos.lon));
            }
            Err(e) => error!(error = %e, "road load failed"),
        }
    }

    /// Later loads: prefetch on a worker thread, never blocking the cycle.
    fn load_roads_async(&mut self, pos: &Position) {
        let Some(loader) = self.loader.as_ref() else { return };
        // `should_refetch` already saw the flag clear; this store is the
        // only place it is set, and only from the engine thread.
        self.load_in_flight.store(true, Ordering::SeqCst);

        let loader = Arc::clone(loader);
        let pending = Arc::clone(&self.pending);
        let in_flight = Arc::clone(&self.load_in_flight);
        let radius = self.config.effective_load_radius();
        let centre = GeoPoint::new(pos.lat, pos.lon);

        thread::spawn(move || {
            match loader.load_around(centre.lat, centre.lon, radius) {
                Ok(network) => {
                    *pending.lock().expect("pending slot poisoned") =
                        Some(PendingLoad { network, centre });
                }
                Err(e) => error!(error = %e, "background road load failed"),
            }
            in_flight.store(false, Ordering::SeqCst);
        });
    }

    // ── Snapshot plumbing ─────────────────────────────────────────────────

    fn base_snapshot(&self, status: Status, pos: Option<&Position>) -> CoPilotSnapshot {
        let mut snap = CoPilotSnapshot {
            status,
            last_callout: self.last_callout.clone(),
            last_callout_at: self.last_callout_at,
            mode: self.mode,
            route_name: self.route.as_ref().map(|r| r.name().to_owned()).unwrap_or_default(),
            ..Default::default()
        };
        if let Some(pos) = pos {
            snap.lat = pos.lat;
            snap.lon = pos.lon;
            snap.speed_mps = pos.speed_mps;
            snap.heading_deg = pos.heading_deg;
        }
        snap
    }

    fn publish(&self, status: Status, pos: Option<&Position>) {
        let snap = self.base_snapshot(status, pos);
        *self.snapshot.lock().expect("snapshot slot poisoned") = Arc::new(snap);
    }

    // ── Test hooks ────────────────────────────────────────────────────────

    #[cfg(test)]
    pub(crate) fn test_set_in_flight(&self, value: bool) {
        self.load_in_flight.store(value, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn test_should_refetch(&self, pos: &Position) -> bool {
        self.should_refetch(pos)
    }

    #[cfg(test)]
    pub(crate) fn test_network_ways(&self) -> Option<usize> {
        self.network.as_ref().map(|n| n.way_count())
    }

    #[cfg(test)]
    pub(crate) fn test_push_pending(&self, network: Arc<RoadNetwork>, centre: GeoPoint) {
        *self.pending.lock().expect("pending slot poisoned") =
            Some(PendingLoad { network, centre });
    }
}
