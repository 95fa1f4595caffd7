//! Route guidance sources.
//!
//! In route-follow mode the projector biases junction exits toward the
//! route.  A route source only has to answer "which of your points lie
//! ahead of this position" — a GPX file does, and so does a lap-timing
//! centerline fed in as bare points.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use cd_core::{GeoPoint, haversine_m};

use crate::error::{EngineError, EngineResult};

/// Something the engine can follow.
pub trait RouteSource: Send + Sync {
    fn name(&self) -> &str;

    /// Route points ahead of `(lat, lon)` along the route, covering up to
    /// `max_distance_m` of it.
    fn upcoming_waypoints(&self, lat: f64, lon: f64, max_distance_m: f64) -> Vec<GeoPoint>;
}

// ── GpxRoute ──────────────────────────────────────────────────────────────────

/// A route loaded from a GPX file (tracks preferred, routes as fallback).
pub struct GpxRoute {
    name: String,
    points: Vec<GeoPoint>,
}

impl GpxRoute {
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| EngineError::Route(format!("{}: {e}", path.display())))?;
        let gpx = gpx::read(BufReader::new(file))
            .map_err(|e| EngineError::Route(format!("{}: {e}", path.display())))?;

        let mut points: Vec<GeoPoint> = gpx
            .tracks
            .iter()
            .flat_map(|track| track.segments.iter())
            .flat_map(|segment| segment.points.iter())
            .map(|wp| GeoPoint::new(wp.point().y(), wp.point().x()))
            .collect();
        if points.is_empty() {
            points = gpx
                .routes
                .iter()
                .flat_map(|route| route.points.iter())
                .map(|wp| GeoPoint::new(wp.point().y(), wp.point().x()))
                .collect();
        }
        if points.is_empty() {
            return Err(EngineError::Route(format!("{}: no points", path.display())));
        }

        let name = gpx
            .tracks
            .first()
            .and_then(|t| t.name.clone())
            .or_else(|| {
                path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_default();

        info!(route = %name, points = points.len(), "route loaded");
        Ok(Self { name, points })
    }

    /// Build a route from bare points (lap-timing centerlines, tests).
    pub fn from_points(name: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        Self { name: name.into(), points }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

impl RouteSource for GpxRoute {
    fn name(&self) -> &str {
        &self.name
    }

    fn upcoming_waypoints(&self, lat: f64, lon: f64, max_distance_m: f64) -> Vec<GeoPoint> {
        if self.points.is_empty() {
            return Vec::new();
        }
        let here = GeoPoint::new(lat, lon);

        // Sync onto the route at the nearest point, then hand back the
        // stretch ahead up to the requested length.
        let mut nearest_idx = 0;
        let mut nearest = f64::INFINITY;
        for (i, p) in self.points.iter().enumerate() {
            let d = haversine_m(&here, p);
            if d < nearest {
                nearest = d;
                nearest_idx = i;
            }
        }

        let mut out = Vec::new();
        let mut covered = 0.0;
        let mut prev = self.points[nearest_idx];
        for &p in &self.points[nearest_idx..] {
            covered += haversine_m(&prev, &p);
            if covered > max_distance_m {
                break;
            }
            out.push(p);
            prev = p;
        }
        out
    }
}
