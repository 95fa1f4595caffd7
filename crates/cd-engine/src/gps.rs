//! GPS source contract and the built-in simulator.
//!
//! Real receiver drivers live outside this crate; anything that can produce
//! a [`Position`] per poll plugs in here — hardware NMEA readers, log
//! replay, or the dead-reckoning simulator below.

use std::time::Instant;

use cd_core::{GeoPoint, Position, haversine_m, initial_bearing_deg, offset};

use crate::error::EngineResult;

/// A source of position fixes.
pub trait GpsSource: Send {
    fn connect(&mut self) -> EngineResult<()>;
    fn disconnect(&mut self);
    /// The current fix, or `None` while there is no valid one.
    fn read_position(&mut self) -> Option<Position>;
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// Dead-reckoning GPS for demos and tests: a fixed heading, or a polyline
/// to follow waypoint by waypoint.
pub struct GpsSimulator {
    position: GeoPoint,
    heading_deg: f64,
    speed_mps: f64,
    route: Vec<GeoPoint>,
    route_index: usize,
    /// `Some(dt)` steps a fixed interval per poll (deterministic tests);
    /// `None` follows the wall clock.
    fixed_step_s: Option<f64>,
    last_poll: Option<Instant>,
}

impl GpsSimulator {
    /// Drive from a point along a constant heading.
    pub fn new(lat: f64, lon: f64, heading_deg: f64, speed_mps: f64) -> Self {
        Self {
            position: GeoPoint::new(lat, lon),
            heading_deg,
            speed_mps,
            route: Vec::new(),
            route_index: 0,
            fixed_step_s: None,
            last_poll: None,
        }
    }

    /// Drive along `route`, waypoint to waypoint, at `speed_mps`.
    pub fn along_route(route: Vec<GeoPoint>, speed_mps: f64) -> Self {
        let position = route.first().copied().unwrap_or(GeoPoint::new(0.0, 0.0));
        let heading_deg = match (route.first(), route.get(1)) {
            (Some(a), Some(b)) => initial_bearing_deg(a, b),
            _ => 0.0,
        };
        Self {
            position,
            heading_deg,
            speed_mps,
            route,
            route_index: 0,
            fixed_step_s: None,
            last_poll: None,
        }
    }

    /// Advance a fixed simulated interval per poll instead of wall time.
    pub fn with_fixed_step(mut self, step_s: f64) -> Self {
        self.fixed_step_s = Some(step_s);
        self
    }

    fn elapsed_s(&mut self) -> f64 {
        if let Some(step) = self.fixed_step_s {
            return step;
        }
        let now = Instant::now();
        let dt = self
            .last_poll
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_poll = Some(now);
        dt
    }

    /// Move along the loaded route, consuming waypoints as they are passed.
    fn advance_on_route(&mut self, mut remaining_m: f64) {
        while remaining_m > 0.0 {
            let Some(target) = self.route.get(self.route_index + 1).copied() else {
                return; // end of route: park
            };
            let to_target = haversine_m(&self.position, &target);
            self.heading_deg = initial_bearing_deg(&self.position, &target);

            if to_target <= remaining_m {
                self.position = target;
                self.route_index += 1;
                remaining_m -= to_target;
            } else {
                self.position = offset(&self.position, self.heading_deg, remaining_m);
                return;
            }
        }
    }
}

impl GpsSource for GpsSimulator {
    fn connect(&mut self) -> EngineResult<()> {
        self.last_poll = None;
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn read_position(&mut self) -> Option<Position> {
        let step_m = self.speed_mps * self.elapsed_s();
        if self.route.is_empty() {
            self.position = offset(&self.position, self.heading_deg, step_m);
        } else {
            self.advance_on_route(step_m);
        }
        Some(Position::new(
            self.position.lat,
            self.position.lon,
            self.heading_deg,
            self.speed_mps,
        ))
    }
}

/// A source that never has a fix; handy for exercising the no-GPS path.
pub struct NoFixGps;

impl GpsSource for NoFixGps {
    fn connect(&mut self) -> EngineResult<()> {
        Ok(())
    }
    fn disconnect(&mut self) {}
    fn read_position(&mut self) -> Option<Position> {
        None
    }
}
