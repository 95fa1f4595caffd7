//! Unit tests for cd-corner.
//!
//! End-to-end detection runs over synthetic geometry generated with the
//! forward-geodesic helper: straights plus circular arcs of known radius.

#[cfg(test)]
mod helpers {
    use cd_core::{GeoPoint, offset};

    use crate::detector::Direction;

    /// Append a straight run to `path`, advancing `heading` metres at a time.
    pub fn straight(path: &mut Vec<GeoPoint>, heading: f64, length_m: f64, step_m: f64) {
        let start = *path.last().expect("path seeded");
        let steps = (length_m / step_m) as usize;
        for i in 1..=steps {
            path.push(offset(&start, heading, i as f64 * step_m));
        }
    }

    /// Append a circular arc of `radius_m` turning `total_deg` degrees in
    /// `turn` direction.  Returns the exit heading.
    pub fn arc(
        path: &mut Vec<GeoPoint>,
        entry_heading: f64,
        radius_m: f64,
        total_deg: f64,
        turn: Direction,
        step_deg: f64,
    ) -> f64 {
        let start = *path.last().expect("path seeded");
        let (centre_bearing, spoke_sign) = match turn {
            Direction::Left => (entry_heading - 90.0, 1.0),
            Direction::Right => (entry_heading + 90.0, -1.0),
        };
        let centre = offset(&start, centre_bearing, radius_m);
        // Bearing from the centre back out to the entry point.
        let spoke0 = entry_heading + spoke_sign * 90.0;

        let steps = (total_deg / step_deg) as usize;
        for i in 1..=steps {
            let phi = i as f64 * step_deg;
            path.push(offset(&centre, spoke0 - spoke_sign * phi, radius_m));
        }
        match turn {
            Direction::Left => entry_heading - total_deg,
            Direction::Right => entry_heading + total_deg,
        }
    }

    pub fn seed() -> Vec<GeoPoint> {
        vec![GeoPoint::new(51.5000, -0.1000)]
    }
}

#[cfg(test)]
mod severity {
    use crate::detector::severity_for_radius;

    #[test]
    fn bucket_thresholds() {
        for (radius, expected) in [
            (5.0, 1),
            (14.9, 1),
            (15.0, 2),
            (29.0, 2),
            (30.0, 3),
            (49.0, 3),
            (50.0, 4),
            (79.0, 4),
            (80.0, 5),
            (119.0, 5),
            (120.0, 6),
            (199.0, 6),
            (200.0, 7),
            (1_000.0, 7),
        ] {
            assert_eq!(severity_for_radius(radius), expected, "radius {radius}");
        }
    }

    #[test]
    fn non_decreasing_in_radius() {
        let mut last = 0;
        let mut r = 1.0;
        while r <= 1_000.0 {
            let s = severity_for_radius(r);
            assert!(s >= last, "severity dropped at radius {r}");
            last = s;
            r += 1.0;
        }
    }
}

#[cfg(test)]
mod phases {
    use crate::detector::{CornerDetector, DetectorParams};

    fn detector() -> CornerDetector {
        CornerDetector::new(DetectorParams::default())
    }

    #[test]
    fn peaks_require_threshold_and_local_maximum() {
        let d = detector();
        assert!(d.phase1_peaks(&[0.0, 0.001, 0.002, 0.001, 0.0]).is_empty());
        assert_eq!(d.phase1_peaks(&[0.0, 0.002, 0.01, 0.002, 0.0]), vec![2]);
        assert_eq!(
            d.phase1_peaks(&[0.0, 0.01, 0.002, 0.015, 0.002, 0.008, 0.0]),
            vec![1, 3, 5]
        );
    }

    #[test]
    fn close_cuts_collapse_to_median() {
        let d = detector();
        let distances: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(d.phase2_reduce(vec![5, 6, 7], &distances), vec![6]);

        let spread: Vec<f64> = (0..500).map(|i| i as f64).collect();
        assert_eq!(d.phase2_reduce(vec![50, 200, 400], &spread), vec![50, 200, 400]);
    }

    #[test]
    fn straight_filling_seeds_empty_cut_lists() {
        let d = detector();
        // 500 m of 10 m spacing and no cuts: fillers roughly every 100 m.
        let distances: Vec<f64> = (0..51).map(|i| i as f64 * 10.0).collect();
        let cuts = d.phase3_fill_straights(Vec::new(), &distances);
        assert_eq!(cuts.len(), 4);
    }

    #[test]
    fn sign_change_adds_cut_between_far_cuts() {
        let d = detector();
        let distances: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let mut curvatures = vec![0.01; 100];
        for c in curvatures.iter_mut().skip(50) {
            *c = -0.01;
        }
        let cuts = d.phase4_sign_changes(vec![10, 90], &distances, &curvatures);
        assert!(cuts.contains(&50), "sign flip at 50 should gain a cut, got {cuts:?}");
    }
}

#[cfg(test)]
mod profile {
    use crate::detector::curvature_profile;

    #[test]
    fn constant_profile_is_neutral() {
        assert_eq!(curvature_profile(&[0.01, 0.01, 0.01, 0.01, 0.01]), (false, false));
    }

    #[test]
    fn increasing_curvature_tightens() {
        assert_eq!(curvature_profile(&[0.005, 0.008, 0.02, 0.025, 0.03]), (true, false));
    }

    #[test]
    fn decreasing_curvature_opens() {
        assert_eq!(curvature_profile(&[0.025, 0.028, 0.03, 0.008, 0.005]), (false, true));
    }

    #[test]
    fn short_profile_infers_nothing() {
        assert_eq!(curvature_profile(&[0.01, 0.02]), (false, false));
    }
}

#[cfg(test)]
mod chicanes {
    use cd_core::GeoPoint;

    use crate::detector::{Corner, CornerDetector, DetectorParams, Direction};

    fn corner(entry: f64, exit: f64, direction: Direction) -> Corner {
        Corner {
            entry_distance: entry,
            apex_distance: (entry + exit) / 2.0,
            exit_distance: exit,
            apex: GeoPoint::new(51.5, -0.1),
            direction,
            severity: 3,
            total_angle_deg: 45.0,
            min_radius_m: 40.0,
            tightens: false,
            opens: false,
            long: false,
            is_chicane: false,
            exit_direction: None,
        }
    }

    #[test]
    fn opposite_corners_close_together_merge() {
        let detector = CornerDetector::new(DetectorParams {
            max_chicane_gap_m: 15.0,
            ..Default::default()
        });
        // Left 80–90, right 100–115: 10 m gap, 35 m span.
        let merged = detector.merge_chicanes(vec![
            corner(80.0, 90.0, Direction::Left),
            corner(100.0, 115.0, Direction::Right),
        ]);

        assert_eq!(merged.len(), 1);
        let chicane = &merged[0];
        assert!(chicane.is_chicane);
        assert_eq!(chicane.direction, Direction::Left);
        assert_eq!(chicane.exit_direction, Some(Direction::Right));
        assert_eq!(chicane.entry_distance, 80.0);
        assert_eq!(chicane.exit_distance, 115.0);
        assert!((chicane.total_angle_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn same_direction_corners_do_not_merge() {
        let detector = CornerDetector::default();
        let merged = detector.merge_chicanes(vec![
            corner(50.0, 70.0, Direction::Left),
            corner(80.0, 100.0, Direction::Left),
        ]);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|c| !c.is_chicane));
    }

    #[test]
    fn wide_gap_does_not_merge() {
        let detector = CornerDetector::default();
        let merged = detector.merge_chicanes(vec![
            corner(50.0, 70.0, Direction::Left),
            corner(150.0, 170.0, Direction::Right),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn chicane_apex_comes_from_the_tighter_corner() {
        let detector = CornerDetector::default();
        let mut tight = corner(80.0, 90.0, Direction::Left);
        tight.min_radius_m = 20.0;
        tight.apex = GeoPoint::new(51.51, -0.11);
        let loose = corner(95.0, 110.0, Direction::Right);

        let merged = detector.merge_chicanes(vec![tight.clone(), loose]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].apex, tight.apex);
        assert_eq!(merged[0].min_radius_m, 20.0);
        // Severity re-derived from the tighter radius.
        assert_eq!(merged[0].severity, 2);
    }

    #[test]
    fn empty_and_single_pass_through() {
        let detector = CornerDetector::default();
        assert!(detector.merge_chicanes(vec![]).is_empty());
        assert_eq!(detector.merge_chicanes(vec![corner(50.0, 70.0, Direction::Left)]).len(), 1);
    }
}

#[cfg(test)]
mod scenarios {
    use crate::detector::{CornerDetector, Direction};

    use super::helpers::{arc, seed, straight};

    #[test]
    fn straight_road_has_no_corners() {
        let mut path = seed();
        straight(&mut path, 37.0, 190.0, 10.0);

        let corners = CornerDetector::default().detect(&path, 0.0);
        assert!(corners.is_empty(), "got {corners:?}");
    }

    #[test]
    fn too_few_points_yield_nothing() {
        let mut path = seed();
        straight(&mut path, 0.0, 30.0, 10.0);
        assert!(path.len() < 5);
        assert!(CornerDetector::default().detect(&path, 0.0).is_empty());
    }

    /// A physically left-hand 90° turn (north onto west) must come out as a
    /// LEFT corner: this pins the sign convention end to end.
    #[test]
    fn left_arc_is_called_left() {
        let mut path = seed();
        straight(&mut path, 0.0, 120.0, 10.0);
        let exit_heading = arc(&mut path, 0.0, 18.0, 90.0, Direction::Left, 10.0);
        straight(&mut path, exit_heading, 100.0, 10.0);

        let corners = CornerDetector::default().detect(&path, 0.0);
        assert!(!corners.is_empty());

        let tightest = corners
            .iter()
            .min_by(|a, b| a.min_radius_m.total_cmp(&b.min_radius_m))
            .unwrap();
        assert_eq!(tightest.direction, Direction::Left);
        assert_eq!(tightest.severity, 2, "18 m radius is severity 2, got {tightest:?}");
        assert!((15.0..30.0).contains(&tightest.min_radius_m));

        // However segmentation splits the arc, the pieces that carry its
        // curvature must together account for roughly the 90° turned.
        let arc_angle: f64 = corners
            .iter()
            .filter(|c| c.min_radius_m < 30.0)
            .map(|c| c.total_angle_deg)
            .sum();
        assert!((50.0..=130.0).contains(&arc_angle), "got {arc_angle}");
        assert!(
            corners.iter().filter(|c| c.min_radius_m < 30.0).all(|c| c.direction == Direction::Left)
        );
    }

    #[test]
    fn right_arc_is_called_right() {
        let mut path = seed();
        straight(&mut path, 0.0, 120.0, 10.0);
        let exit_heading = arc(&mut path, 0.0, 18.0, 90.0, Direction::Right, 10.0);
        straight(&mut path, exit_heading, 100.0, 10.0);

        let corners = CornerDetector::default().detect(&path, 0.0);
        let tightest = corners
            .iter()
            .min_by(|a, b| a.min_radius_m.total_cmp(&b.min_radius_m))
            .expect("a corner");
        assert_eq!(tightest.direction, Direction::Right);
    }

    #[test]
    fn tight_switchback_grades_as_hairpin() {
        let mut path = seed();
        straight(&mut path, 0.0, 60.0, 10.0);
        let exit_heading = arc(&mut path, 0.0, 10.0, 170.0, Direction::Left, 10.0);
        straight(&mut path, exit_heading, 50.0, 10.0);

        let corners = CornerDetector::default().detect(&path, 0.0);
        let tightest = corners
            .iter()
            .min_by(|a, b| a.min_radius_m.total_cmp(&b.min_radius_m))
            .expect("a corner");
        assert_eq!(tightest.severity, 1, "got {tightest:?}");
        assert!(tightest.min_radius_m < 15.0);
        assert_eq!(tightest.direction, Direction::Left);

        let arc_angle: f64 = corners
            .iter()
            .filter(|c| c.min_radius_m < 15.0)
            .map(|c| c.total_angle_deg)
            .sum();
        assert!(arc_angle > 100.0, "170° switchback, got {arc_angle}");
    }

    #[test]
    fn start_distance_offsets_every_corner() {
        let mut path = seed();
        straight(&mut path, 0.0, 120.0, 10.0);
        let exit_heading = arc(&mut path, 0.0, 18.0, 90.0, Direction::Left, 10.0);
        straight(&mut path, exit_heading, 100.0, 10.0);

        let detector = CornerDetector::default();
        let base = detector.detect(&path, 0.0);
        let shifted = detector.detect(&path, 500.0);
        assert_eq!(base.len(), shifted.len());
        for (a, b) in base.iter().zip(&shifted) {
            assert!((b.entry_distance - a.entry_distance - 500.0).abs() < 1e-6);
        }
    }
}
