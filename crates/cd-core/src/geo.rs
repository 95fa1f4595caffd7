//! Geographic coordinate type and the geometry helpers the pipeline is built
//! on.
//!
//! Everything here is a pure function of its inputs.  Coordinates are
//! double-precision WGS-84 degrees: the corner pipeline keys apexes by
//! 4-decimal positions (~11 m) and measures radii down to 10 m, which is
//! beyond what `f32` can hold at UK longitudes.
//!
//! # Local metric plane
//!
//! Segment projection and curvature work in a locally linearised plane with
//! the longitude axis scaled by cos(lat) at the point of interest.  At the
//! sub-kilometre scales of a projected drive path the flat-plane error is
//! negligible against GPS noise.

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per degree of latitude / cos-scaled longitude in the local plane.
const M_PER_DEG_LAT: f64 = 110_540.0;
const M_PER_DEG_LON: f64 = 111_320.0;

// ── LatLon capability ─────────────────────────────────────────────────────────

/// Read access to a latitude/longitude pair, in degrees.
///
/// The geometry functions are generic over this so they accept bare
/// coordinate pairs, `GeoPoint`, and richer records (path points) alike.
pub trait LatLon {
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;
}

impl LatLon for (f64, f64) {
    #[inline]
    fn lat(&self) -> f64 {
        self.0
    }
    #[inline]
    fn lon(&self) -> f64 {
        self.1
    }
}

impl<T: LatLon> LatLon for &T {
    #[inline]
    fn lat(&self) -> f64 {
        (**self).lat()
    }
    #[inline]
    fn lon(&self) -> f64 {
        (**self).lon()
    }
}

// ── GeoPoint ──────────────────────────────────────────────────────────────────

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance to `other` in metres.
    #[inline]
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        haversine_m(&self, &other)
    }
}

impl LatLon for GeoPoint {
    #[inline]
    fn lat(&self) -> f64 {
        self.lat
    }
    #[inline]
    fn lon(&self) -> f64 {
        self.lon
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── Distances and bearings ────────────────────────────────────────────────────

/// Haversine great-circle distance between two points, in metres.
///
/// Commutative; zero at coincident points.
pub fn haversine_m(a: &impl LatLon, b: &impl LatLon) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let d_phi = (b.lat() - a.lat()).to_radians();
    let d_lambda = (b.lon() - a.lon()).to_radians();

    let h = (d_phi * 0.5).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda * 0.5).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial (forward-azimuth) bearing from `a` to `b` in degrees `[0, 360)`.
///
/// Coincident points yield 0.
pub fn initial_bearing_deg(a: &impl LatLon, b: &impl LatLon) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let d_lambda = (b.lon() - a.lon()).to_radians();

    let x = d_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Smallest signed rotation taking bearing `a` to bearing `b`, in degrees
/// `[-180, 180]`.
#[inline]
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    (b - a + 180.0).rem_euclid(360.0) - 180.0
}

/// The point `distance_m` metres from `p` along `bearing_deg` (forward
/// geodesic on a sphere).
pub fn offset(p: &impl LatLon, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let phi1 = p.lat().to_radians();
    let lambda1 = p.lon().to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos())
            .atan2(delta.cos() - phi1.sin() * phi2.sin());

    GeoPoint::new(phi2.to_degrees(), lambda2.to_degrees())
}

// ── Segment projection ────────────────────────────────────────────────────────

/// Closest point on the segment `a`–`b` to `p`, plus the parameter
/// `t ∈ [0, 1]` along the segment.
///
/// Computed in the local metric plane at `p`.  A degenerate (zero-length)
/// segment returns `(a, 0.0)`.
pub fn closest_point_on_segment(
    p: &impl LatLon,
    a: &impl LatLon,
    b: &impl LatLon,
) -> (GeoPoint, f64) {
    let lon_scale = M_PER_DEG_LON * p.lat().to_radians().cos();

    let x1 = (a.lon() - p.lon()) * lon_scale;
    let y1 = (a.lat() - p.lat()) * M_PER_DEG_LAT;
    let x2 = (b.lon() - p.lon()) * lon_scale;
    let y2 = (b.lat() - p.lat()) * M_PER_DEG_LAT;

    let dx = x2 - x1;
    let dy = y2 - y1;

    if dx == 0.0 && dy == 0.0 {
        return (GeoPoint::new(a.lat(), a.lon()), 0.0);
    }

    let t = (-(x1 * dx + y1 * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);

    let closest = GeoPoint::new(
        a.lat() + t * (b.lat() - a.lat()),
        a.lon() + t * (b.lon() - a.lon()),
    );
    (closest, t)
}

// ── Curvature ─────────────────────────────────────────────────────────────────

/// Signed curvature at `p2` from the circle through three points, in 1/metres.
///
/// Sign convention: positive when the turn at `p2` is anti-clockwise in
/// (lat, lon) space — the driver's left when travelling p1 → p2 → p3.  This
/// sign flows unchanged through corner direction to the spoken callout.
///
/// Collinear or sub-millimetre triangles return 0, as do radii below 0.1 m
/// (GPS jitter, not road geometry).
pub fn curvature_1pm(p1: &impl LatLon, p2: &impl LatLon, p3: &impl LatLon) -> f64 {
    // Local plane with p2 as origin.
    let lon_scale = M_PER_DEG_LON * p2.lat().to_radians().cos();

    let x1 = (p1.lon() - p2.lon()) * lon_scale;
    let y1 = (p1.lat() - p2.lat()) * M_PER_DEG_LAT;
    let x2 = 0.0;
    let y2 = 0.0;
    let x3 = (p3.lon() - p2.lon()) * lon_scale;
    let y3 = (p3.lat() - p2.lat()) * M_PER_DEG_LAT;

    let area = ((x1 * (y2 - y3) + x2 * (y3 - y1) + x3 * (y1 - y2)) / 2.0).abs();
    if area < 1e-6 {
        return 0.0;
    }

    let a = ((x2 - x3).powi(2) + (y2 - y3).powi(2)).sqrt();
    let b = ((x1 - x3).powi(2) + (y1 - y3).powi(2)).sqrt();
    let c = ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt();

    let radius = (a * b * c) / (4.0 * area);
    if radius < 0.1 {
        return 0.0;
    }

    // 2-D cross product of (p2 − p1) × (p3 − p1): positive = anti-clockwise.
    let cross = (x2 - x1) * (y3 - y1) - (y2 - y1) * (x3 - x1);
    let sign = if cross > 0.0 { 1.0 } else { -1.0 };

    sign / radius
}

// ── Path length ───────────────────────────────────────────────────────────────

/// Cumulative along-path distance for a polyline, starting at 0.
///
/// Returns one entry per input point; empty input yields an empty vec.
pub fn cumulative_distances<P: LatLon>(points: &[P]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    if points.is_empty() {
        return distances;
    }
    distances.push(0.0);
    for pair in points.windows(2) {
        let d = haversine_m(&pair[0], &pair[1]);
        distances.push(distances.last().copied().unwrap_or(0.0) + d);
    }
    distances
}
