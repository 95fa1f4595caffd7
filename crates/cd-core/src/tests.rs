//! Unit tests for cd-core primitives.

#[cfg(test)]
mod ids {
    use crate::{NodeId, WayId};

    #[test]
    fn raw_roundtrip() {
        let id = NodeId(1_234_567_890_123);
        assert_eq!(id.raw(), 1_234_567_890_123);
        assert_eq!(NodeId::from(1_234_567_890_123), id);
    }

    #[test]
    fn ordering() {
        assert!(NodeId(0) < NodeId(1));
        assert!(WayId(100) > WayId(99));
    }

    #[test]
    fn display() {
        assert_eq!(WayId(7).to_string(), "WayId(7)");
    }
}

#[cfg(test)]
mod haversine {
    use crate::{GeoPoint, haversine_m};

    #[test]
    fn zero_at_identity() {
        let p = GeoPoint::new(51.5000, -0.1000);
        assert_eq!(haversine_m(&p, &p), 0.0);
    }

    #[test]
    fn commutative() {
        let a = GeoPoint::new(51.5, -0.1);
        let b = GeoPoint::new(52.3, -1.7);
        assert!((haversine_m(&a, &b) - haversine_m(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn one_degree_latitude() {
        // ~1 degree of latitude ≈ 111 km
        let a = GeoPoint::new(51.0, -0.1);
        let b = GeoPoint::new(52.0, -0.1);
        let d = haversine_m(&a, &b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn accepts_tuples_and_points() {
        let p = GeoPoint::new(51.5, -0.1);
        let t = (51.5, -0.1);
        assert!(haversine_m(&p, &t) < 0.01);
    }
}

#[cfg(test)]
mod bearing {
    use crate::{GeoPoint, initial_bearing_deg, offset};

    #[test]
    fn cardinal_directions() {
        let p = GeoPoint::new(51.5, -0.1);
        for (heading, expected) in [(0.0, 0.0), (90.0, 90.0), (180.0, 180.0), (270.0, 270.0)] {
            let q = offset(&p, heading, 1_000.0);
            let b = initial_bearing_deg(&p, &q);
            let err = (b - expected).abs().min(360.0 - (b - expected).abs());
            assert!(err < 0.1, "heading {heading}: got {b}");
        }
    }

    #[test]
    fn coincident_points_are_zero() {
        let p = GeoPoint::new(51.5, -0.1);
        assert_eq!(initial_bearing_deg(&p, &p), 0.0);
    }

    #[test]
    fn range_is_0_to_360() {
        let p = GeoPoint::new(51.5, -0.1);
        for heading in (0..360).step_by(15) {
            let q = offset(&p, heading as f64, 500.0);
            let b = initial_bearing_deg(&p, &q);
            assert!((0.0..360.0).contains(&b), "got {b}");
        }
    }
}

#[cfg(test)]
mod angle_diff {
    use crate::angle_diff_deg;

    #[test]
    fn in_signed_half_range() {
        let mut a = 0.0;
        while a < 360.0 {
            let mut b = 0.0;
            while b < 360.0 {
                let d = angle_diff_deg(a, b);
                assert!((-180.0..=180.0).contains(&d), "diff({a}, {b}) = {d}");
                b += 7.5;
            }
            a += 7.5;
        }
    }

    #[test]
    fn wraps_through_north() {
        assert!((angle_diff_deg(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((angle_diff_deg(10.0, 350.0) + 20.0).abs() < 1e-9);
    }

    #[test]
    fn signed_left_right() {
        // Rotating from north to west is negative (left), to east positive.
        assert!(angle_diff_deg(0.0, 270.0) < 0.0);
        assert!(angle_diff_deg(0.0, 90.0) > 0.0);
    }
}

#[cfg(test)]
mod offset {
    use crate::{GeoPoint, haversine_m, offset};

    #[test]
    fn roundtrip_distance() {
        let p = GeoPoint::new(51.5, -0.1);
        for d in [10.0, 250.0, 1_000.0, 10_000.0] {
            for heading in [0.0, 45.0, 133.0, 290.0] {
                let q = offset(&p, heading, d);
                let back = haversine_m(&p, &q);
                assert!(
                    (back - d).abs() / d < 0.001,
                    "d={d} heading={heading}: got {back}"
                );
            }
        }
    }
}

#[cfg(test)]
mod segment {
    use crate::{GeoPoint, closest_point_on_segment, haversine_m};

    #[test]
    fn midpoint_projection() {
        let a = GeoPoint::new(51.5000, -0.1000);
        let b = GeoPoint::new(51.5000, -0.0900);
        // Point due north of the segment midpoint.
        let p = GeoPoint::new(51.5010, -0.0950);
        let (closest, t) = closest_point_on_segment(&p, &a, &b);
        assert!((t - 0.5).abs() < 0.01, "t = {t}");
        assert!(haversine_m(&closest, &GeoPoint::new(51.5000, -0.0950)) < 5.0);
    }

    #[test]
    fn clamps_to_endpoints() {
        let a = GeoPoint::new(51.5, -0.10);
        let b = GeoPoint::new(51.5, -0.09);
        let before = GeoPoint::new(51.5, -0.12);
        let after = GeoPoint::new(51.5, -0.07);
        assert_eq!(closest_point_on_segment(&before, &a, &b).1, 0.0);
        assert_eq!(closest_point_on_segment(&after, &a, &b).1, 1.0);
    }

    #[test]
    fn degenerate_segment_returns_start() {
        let a = GeoPoint::new(51.5, -0.1);
        let p = GeoPoint::new(51.6, -0.2);
        let (closest, t) = closest_point_on_segment(&p, &a, &a);
        assert_eq!(t, 0.0);
        assert_eq!(closest, a);
    }
}

#[cfg(test)]
mod curvature {
    use crate::{GeoPoint, curvature_1pm, offset};

    #[test]
    fn collinear_is_zero() {
        let p1 = GeoPoint::new(51.5000, -0.1000);
        let p2 = offset(&p1, 0.0, 10.0);
        let p3 = offset(&p1, 0.0, 20.0);
        assert_eq!(curvature_1pm(&p1, &p2, &p3), 0.0);
    }

    #[test]
    fn sign_flips_under_mirror() {
        // Travelling north, bending west (left) vs east (right).  Mirroring
        // p3 across the p1→p2 meridian must flip the sign.
        let p1 = GeoPoint::new(51.5000, -0.1000);
        let p2 = GeoPoint::new(51.5002, -0.1000);
        let left = GeoPoint::new(51.5004, -0.1001);
        let right = GeoPoint::new(51.5004, -0.0999);

        let c_left = curvature_1pm(&p1, &p2, &left);
        let c_right = curvature_1pm(&p1, &p2, &right);

        assert!(c_left > 0.0, "left turn should be positive, got {c_left}");
        assert!(c_right < 0.0, "right turn should be negative, got {c_right}");
        assert!((c_left + c_right).abs() < 1e-9);
    }

    #[test]
    fn recovers_circle_radius() {
        // Three points on a 50 m circle → |curvature| ≈ 1/50.
        let centre = GeoPoint::new(51.5, -0.1);
        let on_circle = |deg: f64| {
            let lat = centre.lat + 50.0 * deg.to_radians().sin() / 110_540.0;
            let lon = centre.lon
                + 50.0 * deg.to_radians().cos() / (111_320.0 * centre.lat.to_radians().cos());
            GeoPoint::new(lat, lon)
        };
        let c = curvature_1pm(&on_circle(80.0), &on_circle(90.0), &on_circle(100.0));
        assert!((c.abs() - 1.0 / 50.0).abs() < 0.002, "got {c}");
    }
}

#[cfg(test)]
mod cumulative {
    use crate::{GeoPoint, cumulative_distances, offset};

    #[test]
    fn starts_at_zero_and_is_monotonic() {
        let start = GeoPoint::new(51.5, -0.1);
        let points: Vec<GeoPoint> = (0..20).map(|i| offset(&start, 37.0, i as f64 * 10.0)).collect();
        let dist = cumulative_distances(&points);
        assert_eq!(dist.len(), points.len());
        assert_eq!(dist[0], 0.0);
        for pair in dist.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!((dist[19] - 190.0).abs() < 1.0);
    }

    #[test]
    fn single_point() {
        assert_eq!(cumulative_distances(&[GeoPoint::new(51.5, -0.1)]), vec![0.0]);
    }

    #[test]
    fn empty() {
        let none: [GeoPoint; 0] = [];
        assert!(cumulative_distances(&none).is_empty());
    }
}
