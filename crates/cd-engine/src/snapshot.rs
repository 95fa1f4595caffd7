//! The per-cycle snapshot consumers read.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use cd_corner::Direction;

/// Engine operating mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Follow whatever road the driver is on.
    JustDrive,
    /// Bias junction exits toward a loaded route.
    RouteFollow,
}

/// Coarse engine state for status displays.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    NoGps,
    NoMap,
    NoPath,
    Active,
}

/// Immutable per-cycle state for UI consumers.
///
/// Published whole behind an `Arc` swap; a reader never observes a
/// half-updated cycle.
#[derive(Clone, Debug)]
pub struct CoPilotSnapshot {
    pub status: Status,
    pub lat: f64,
    pub lon: f64,
    pub speed_mps: f64,
    pub heading_deg: f64,
    pub last_callout: String,
    pub last_callout_at: Option<SystemTime>,
    pub corners_ahead: usize,
    pub next_corner_distance: f64,
    pub next_corner_direction: Option<Direction>,
    /// 1–7, or 0 when no corner is ahead.
    pub next_corner_severity: u8,
    pub path_distance: f64,
    pub mode: Mode,
    pub route_name: String,
}

impl Default for CoPilotSnapshot {
    fn default() -> Self {
        Self {
            status: Status::NoGps,
            lat: 0.0,
            lon: 0.0,
            speed_mps: 0.0,
            heading_deg: 0.0,
            last_callout: String::new(),
            last_callout_at: None,
            corners_ahead: 0,
            next_corner_distance: 0.0,
            next_corner_direction: None,
            next_corner_severity: 0,
            path_distance: 0.0,
            mode: Mode::JustDrive,
            route_name: String::new(),
        }
    }
}

/// Cloneable read handle onto the latest snapshot.
#[derive(Clone)]
pub struct SnapshotReader {
    pub(crate) slot: Arc<Mutex<Arc<CoPilotSnapshot>>>,
}

impl SnapshotReader {
    /// The most recently published snapshot.
    pub fn get(&self) -> Arc<CoPilotSnapshot> {
        Arc::clone(&self.slot.lock().expect("snapshot slot poisoned"))
    }
}
