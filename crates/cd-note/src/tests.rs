//! Unit tests for cd-note.

#[cfg(test)]
mod helpers {
    use cd_core::{GeoPoint, NodeId, WayId};
    use cd_corner::{Corner, Direction};
    use cd_path::{FeatureAhead, Turn};

    /// A plain corner with a unique apex derived from its entry distance.
    pub fn corner(entry: f64, severity: u8, direction: Direction) -> Corner {
        Corner {
            entry_distance: entry,
            apex_distance: entry + 10.0,
            exit_distance: entry + 20.0,
            apex: GeoPoint::new(51.5 + entry * 1e-5, -0.1),
            direction,
            severity,
            total_angle_deg: 45.0,
            min_radius_m: 40.0,
            tightens: false,
            opens: false,
            long: false,
            is_chicane: false,
            exit_direction: None,
        }
    }

    pub fn point() -> GeoPoint {
        GeoPoint::new(51.5, -0.1)
    }

    pub fn bridge(distance: f64, way: i64) -> FeatureAhead {
        FeatureAhead::Bridge { point: point(), distance_m: distance, way_id: WayId(way) }
    }

    pub fn tunnel(distance: f64, way: i64) -> FeatureAhead {
        FeatureAhead::Tunnel { point: point(), distance_m: distance, way_id: WayId(way) }
    }

    pub fn junction(distance: f64, node: i64, chosen: Option<f64>, turn: Option<Turn>) -> FeatureAhead {
        FeatureAhead::Junction {
            point: point(),
            distance_m: distance,
            node_id: NodeId(node),
            is_t_junction: chosen.is_none(),
            exit_bearings: vec![90.0, 180.0],
            chosen_bearing: chosen,
            turn,
        }
    }
}

#[cfg(test)]
mod brackets {
    use cd_corner::Direction;

    use crate::generator::PacenoteGenerator;

    use super::helpers::{corner, tunnel};

    #[test]
    fn corner_between_brackets_is_silent() {
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[corner(800.0, 3, Direction::Left)], &[]);
        assert!(notes.is_empty(), "800 m sits in no bracket: {notes:?}");
    }

    #[test]
    fn corner_at_five_hundred_emits_once() {
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[corner(500.0, 3, Direction::Left)], &[]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "five hundred left three");
        assert!(notes[0].key.ends_with("_500"));
    }

    #[test]
    fn corner_at_one_fifty_uses_the_two_hundred_bracket() {
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[corner(150.0, 4, Direction::Right)], &[]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "two hundred right four");
        assert!(notes[0].key.ends_with("_200"));
    }

    #[test]
    fn corner_on_top_of_the_driver_is_silent() {
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[corner(10.0, 2, Direction::Left)], &[]);
        assert!(notes.is_empty());
    }

    #[test]
    fn hazard_windows() {
        let mut generator = PacenoteGenerator::default();
        assert_eq!(generator.generate(&[], &[tunnel(450.0, 7)]).len(), 1, "500 bracket");
        assert!(generator.generate(&[], &[tunnel(350.0, 8)]).is_empty(), "between brackets");
        assert_eq!(generator.generate(&[], &[tunnel(250.0, 9)]).len(), 1, "300 bracket");
        assert_eq!(generator.generate(&[], &[tunnel(90.0, 10)]).len(), 1, "100 bracket");
    }
}

#[cfg(test)]
mod text {
    use cd_corner::Direction;
    use cd_path::{FeatureAhead, Turn};

    use crate::generator::PacenoteGenerator;
    use crate::note::NoteKind;

    use super::helpers::{corner, junction, point};

    #[test]
    fn tight_close_corner_reads_distance_then_body() {
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[corner(120.0, 2, Direction::Left)], &[]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "one hundred left two");
        assert!(notes[0].priority <= 5);
    }

    #[test]
    fn hairpin_and_flat_lead_with_the_severity_word() {
        let mut generator = PacenoteGenerator::default();
        let mut hairpin = corner(60.0, 1, Direction::Left);
        hairpin.total_angle_deg = 170.0;
        let notes = generator.generate(&[hairpin], &[]);
        // The spoken distance is the bracket anchor, not the raw 60 m.
        assert_eq!(notes[0].text, "one hundred hairpin left");
        assert!(notes[0].priority <= 3);

        let mut generator = PacenoteGenerator::default();
        let kink = corner(120.0, 7, Direction::Right);
        let notes = generator.generate(&[kink], &[]);
        assert_eq!(notes[0].text, "one hundred flat right");
    }

    #[test]
    fn ninety_degree_severity_two_reads_square() {
        let mut generator = PacenoteGenerator::default();
        let mut square = corner(120.0, 2, Direction::Left);
        square.total_angle_deg = 90.0;
        let notes = generator.generate(&[square], &[]);
        assert_eq!(notes[0].text, "one hundred square left");
    }

    #[test]
    fn modifiers_append_in_order() {
        let mut generator = PacenoteGenerator::default();
        let mut c = corner(120.0, 3, Direction::Left);
        c.tightens = true;
        c.long = true;
        let notes = generator.generate(&[c], &[]);
        assert_eq!(notes[0].text, "one hundred left three tightens long");
    }

    #[test]
    fn chicane_reads_both_directions_and_skips_modifiers() {
        let mut generator = PacenoteGenerator::default();
        let mut c = corner(120.0, 3, Direction::Left);
        c.is_chicane = true;
        c.exit_direction = Some(Direction::Right);
        c.tightens = true;
        let notes = generator.generate(&[c], &[]);
        assert_eq!(notes[0].text, "one hundred chicane left right");
    }

    #[test]
    fn surface_words_map_and_unknowns_stay_silent() {
        let mut generator = PacenoteGenerator::default();
        let gravel = FeatureAhead::SurfaceChange {
            point: point(),
            distance_m: 90.0,
            way_id: cd_core::WayId(3),
            from: "asphalt".into(),
            to: "dirt".into(),
        };
        let notes = generator.generate(&[], &[gravel]);
        assert!(notes[0].text.ends_with("onto gravel"), "got {:?}", notes[0].text);

        let mut generator = PacenoteGenerator::default();
        let odd = FeatureAhead::SurfaceChange {
            point: point(),
            distance_m: 90.0,
            way_id: cd_core::WayId(4),
            from: "asphalt".into(),
            to: "cobblestone".into(),
        };
        assert!(generator.generate(&[], &[odd]).is_empty());
    }

    #[test]
    fn tables_and_humps_are_plural() {
        let mut generator = PacenoteGenerator::default();
        let table = FeatureAhead::SpeedBump {
            point: point(),
            distance_m: 90.0,
            way_id: cd_core::WayId(5),
            kind: "table".into(),
        };
        let single = FeatureAhead::SpeedBump {
            point: point(),
            distance_m: 250.0,
            way_id: cd_core::WayId(6),
            kind: "bump".into(),
        };
        let notes = generator.generate(&[], &[table, single]);
        assert!(notes[0].text.ends_with("bumps"), "got {:?}", notes[0].text);
        assert_eq!(notes[1].text, "bump");
    }

    #[test]
    fn junction_notes_depend_on_the_turn() {
        let mut generator = PacenoteGenerator::default();

        // Route-guided right turn: named direction, top priority.
        let notes = generator.generate(&[], &[junction(180.0, 42, Some(180.0), Some(Turn::Right))]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "two hundred junction right");
        assert_eq!(notes[0].priority, 1);
        assert_eq!(notes[0].kind, NoteKind::Junction);

        // Dead end: plain warning.
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[], &[junction(150.0, 43, None, None)]);
        assert_eq!(notes[0].text, "one fifty junction");

        // Straight through on a chosen exit: nothing to say.
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[], &[junction(150.0, 44, Some(90.0), Some(Turn::Straight))]);
        assert!(notes.is_empty());

        // Beyond the warn distance: silent.
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[], &[junction(250.0, 45, None, None)]);
        assert!(notes.is_empty());
    }
}

#[cfg(test)]
mod blocking_and_merging {
    use cd_corner::Direction;

    use crate::generator::PacenoteGenerator;

    use super::helpers::{bridge, corner};

    #[test]
    fn closer_corner_blocks_the_long_range_call() {
        let mut generator = PacenoteGenerator::default();
        let near = corner(300.0, 3, Direction::Left);
        let far = corner(900.0, 3, Direction::Right);
        let notes = generator.generate(&[near, far], &[]);

        assert_eq!(notes.len(), 1, "the 900 m call is blocked: {notes:?}");
        assert!((notes[0].distance_m - 300.0).abs() < 1e-9);
    }

    #[test]
    fn final_bracket_is_never_blocked() {
        let mut generator = PacenoteGenerator::default();
        let first = corner(100.0, 3, Direction::Left);
        let second = corner(140.0, 4, Direction::Right);
        let notes = generator.generate(&[first, second], &[]);
        assert_eq!(notes.len(), 2, "both 100-bracket calls survive: {notes:?}");
    }

    #[test]
    fn adjacent_notes_chain_with_into() {
        let mut generator = PacenoteGenerator::default();
        let c = corner(60.0, 3, Direction::Left);
        let notes = generator.generate(&[c], &[bridge(50.0, 7)]);

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "fifty over bridge into left three");
        assert!((notes[0].distance_m - 50.0).abs() < 1e-9);
        assert!(notes[0].key.starts_with("bridge_7|"));
        // Merged priority is the most urgent component.
        assert_eq!(notes[0].priority, 4);
    }

    #[test]
    fn distant_notes_stay_separate() {
        let mut generator = PacenoteGenerator::default();
        let c = corner(100.0, 3, Direction::Left);
        let notes = generator.generate(&[c], &[bridge(50.0, 7)]);
        assert_eq!(notes.len(), 2);
    }
}

#[cfg(test)]
mod call_decision {
    use cd_corner::Direction;

    use crate::generator::PacenoteGenerator;
    use crate::note::{NoteKind, Pacenote};

    use super::helpers::corner;

    fn note(kind: NoteKind, distance: f64, key: &str, text: &str) -> Pacenote {
        Pacenote { text: text.into(), distance_m: distance, kind, priority: 3, key: key.into() }
    }

    #[test]
    fn each_key_is_spoken_exactly_once() {
        let mut generator = PacenoteGenerator::default();
        let notes = generator.generate(&[corner(120.0, 2, Direction::Left)], &[]);
        let n = &notes[0];

        assert!(generator.should_call(n, 0.0).is_some());
        assert!(generator.should_call(n, 0.0).is_none(), "second cycle is silent");
    }

    #[test]
    fn too_close_is_suppressed() {
        let mut generator = PacenoteGenerator::default();
        let n = note(NoteKind::Corner, 15.0, "x_100", "left two");
        assert!(generator.should_call(&n, 0.0).is_none());
    }

    #[test]
    fn kind_limits_the_maximum_distance() {
        let mut generator = PacenoteGenerator::default();

        // Corners carry to the 1000 bracket.
        let far_corner = note(NoteKind::Corner, 990.0, "y_1000", "one thousand left two");
        assert!(generator.should_call(&far_corner, 0.0).is_some());

        // A bridge is single-bracket: 150 m is out of range at a crawl…
        let far_bridge = note(NoteKind::Bridge, 150.0, "bridge_1", "over bridge");
        assert!(generator.should_call(&far_bridge, 0.0).is_none());

        // …but at 35 m/s the 5 s warning rule stretches the limit to 175 m.
        assert!(generator.should_call(&far_bridge, 35.0).is_some());
    }

    #[test]
    fn merged_notes_drop_already_spoken_components() {
        let mut generator = PacenoteGenerator::default();
        generator.memory_mut().mark("bridge_7");

        let merged = note(
            NoteKind::Bridge,
            50.0,
            "bridge_7|51.5006,-0.1000_100",
            "fifty over bridge into left three",
        );
        let spoken = generator.should_call(&merged, 0.0).expect("fresh component remains");
        assert_eq!(spoken.text, "fifty left three");
        assert_eq!(spoken.key, "51.5006,-0.1000_100");

        // Every component spoken now: the chain is silent.
        assert!(generator.should_call(&merged, 0.0).is_none());
    }

    #[test]
    fn memory_clears_only_past_its_bound() {
        let mut generator = PacenoteGenerator::default();
        let n = note(NoteKind::Corner, 120.0, "stable_100", "left two");
        assert!(generator.should_call(&n, 0.0).is_some());

        // Below the bound, maintenance keeps everything.
        generator.maintain();
        assert!(generator.should_call(&n, 0.0).is_none());

        for i in 0..101 {
            generator.memory_mut().mark(&format!("filler_{i}"));
        }
        generator.maintain();
        assert!(generator.memory_mut().is_empty());
        assert!(generator.should_call(&n, 0.0).is_some(), "fresh after the purge");
    }
}

#[cfg(test)]
mod descriptor_cache {
    use cd_corner::Direction;

    use crate::generator::PacenoteGenerator;

    use super::helpers::corner;

    #[test]
    fn reclassification_cannot_change_a_spoken_descriptor() {
        let mut generator = PacenoteGenerator::default();

        let far = corner(300.0, 3, Direction::Left);
        let notes = generator.generate(&[far.clone()], &[]);
        assert_eq!(notes[0].text, "three hundred left three");

        // Same apex seen closer, and the detector now grades it a four:
        // the cached descriptor wins, only the distance word moves.
        let mut near = far;
        near.entry_distance = 120.0;
        near.severity = 4;
        let notes = generator.generate(&[near], &[]);
        assert_eq!(notes[0].text, "one hundred left three");
        assert!(notes[0].key.ends_with("_100"));
    }
}
