//! Pacenote generation from corners and path features.
//!
//! A feature is spoken when it enters one of its distance brackets; the
//! unique key carries the bracket so each bracket fires once.  Within one
//! cycle the generator converts, sorts, filters blocked long-range corner
//! calls, and merges adjacent notes — strictly in that order, since the
//! block filter must see pre-merge distances and the merge must see the
//! surviving set.

use rustc_hash::{FxHashMap, FxHashSet};

use cd_corner::Corner;
use cd_path::{FeatureAhead, Turn};

use crate::note::{NoteConfig, NoteKind, Pacenote};

// ── Fixed vocabulary ──────────────────────────────────────────────────────────

/// Spoken distance anchors, furthest first; a distance matches the first
/// anchor within ±25 m.
const DISTANCE_CALLS: [(f64, &str); 10] = [
    (1_000.0, "one thousand"),
    (500.0, "five hundred"),
    (400.0, "four hundred"),
    (300.0, "three hundred"),
    (200.0, "two hundred"),
    (150.0, "one fifty"),
    (100.0, "one hundred"),
    (80.0, "eighty"),
    (50.0, "fifty"),
    (30.0, "thirty"),
];

/// Severity names indexed by severity (0 unused).
const SEVERITY_WORDS: [&str; 8] =
    ["", "hairpin", "two", "three", "four", "five", "six", "flat"];

/// Corner announcement brackets, furthest first.
const CORNER_BRACKETS: [u32; 5] = [1_000, 500, 300, 200, 100];

/// Hazard announcement brackets (tunnels, crossings, fords, bumps,
/// surfaces, barriers, narrows).
const HAZARD_BRACKETS: [u32; 3] = [500, 300, 100];

fn distance_call(distance_m: f64) -> Option<&'static str> {
    DISTANCE_CALLS
        .iter()
        .find(|(anchor, _)| (distance_m - anchor).abs() <= 25.0)
        .map(|(_, word)| *word)
}

fn surface_word(surface: &str) -> Option<&'static str> {
    match surface {
        "asphalt" | "paved" => Some("tarmac"),
        "concrete" => Some("concrete"),
        "gravel" | "unpaved" | "dirt" | "ground" | "grass" | "sand" | "mud" => Some("gravel"),
        _ => None,
    }
}

// ── Callout memory ────────────────────────────────────────────────────────────

/// Keys already spoken plus cached corner descriptors, bounded so a long
/// drive cannot grow it without limit.
#[derive(Default)]
pub struct CalloutMemory {
    called: FxHashSet<String>,
    descriptors: FxHashMap<String, String>,
}

impl CalloutMemory {
    const BOUND: usize = 100;

    pub fn contains(&self, key: &str) -> bool {
        self.called.contains(key)
    }

    pub fn mark(&mut self, key: &str) {
        self.called.insert(key.to_owned());
    }

    pub fn len(&self) -> usize {
        self.called.len()
    }

    pub fn is_empty(&self) -> bool {
        self.called.is_empty()
    }

    /// Drop everything once the key set outgrows the bound.  Clearing the
    /// descriptor cache together with the keys keeps text and dedup in step.
    pub fn maintain(&mut self) {
        if self.called.len() > Self::BOUND {
            self.called.clear();
            self.descriptors.clear();
        }
    }
}

// ── PacenoteGenerator ─────────────────────────────────────────────────────────

/// Turns corners and path features into ordered, deduplicated callouts.
pub struct PacenoteGenerator {
    config: NoteConfig,
    memory: CalloutMemory,
}

impl Default for PacenoteGenerator {
    fn default() -> Self {
        Self::new(NoteConfig::default())
    }
}

impl PacenoteGenerator {
    pub fn new(config: NoteConfig) -> Self {
        Self { config, memory: CalloutMemory::default() }
    }

    /// Notes for one cycle, sorted by distance, blocked-and-merged.
    pub fn generate(&mut self, corners: &[Corner], features: &[FeatureAhead]) -> Vec<Pacenote> {
        let mut notes: Vec<Pacenote> = Vec::new();

        for corner in corners {
            if corner.entry_distance <= self.config.lookahead_m
                && let Some(note) = self.corner_note(corner)
            {
                notes.push(note);
            }
        }

        for feature in features {
            if let Some(note) = self.feature_note(feature) {
                notes.push(note);
            }
        }

        notes.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        let notes = self.filter_blocked_corners(notes, corners);
        self.merge_adjacent(notes)
    }

    /// Periodic memory upkeep; call once per cycle.
    pub fn maintain(&mut self) {
        self.memory.maintain();
    }

    #[cfg(test)]
    pub(crate) fn memory_mut(&mut self) -> &mut CalloutMemory {
        &mut self.memory
    }

    // ── Corner notes ──────────────────────────────────────────────────────

    fn corner_note(&mut self, corner: &Corner) -> Option<Pacenote> {
        let bracket = corner_bracket(corner.entry_distance, self.config.min_callout_distance_m)?;

        // Key the descriptor by the apex position (4 decimals ≈ 11 m) so a
        // re-detected corner keeps one stable reading across cycles.
        let position_key = format!("{:.4},{:.4}", corner.apex.lat, corner.apex.lon);
        let key = format!("{position_key}_{bracket}");

        let descriptor = match self.memory.descriptors.get(&position_key) {
            Some(cached) => cached.clone(),
            None => {
                let fresh = corner_descriptor(corner);
                self.memory.descriptors.insert(position_key, fresh.clone());
                fresh
            }
        };

        // Spoken distance comes from the bracket anchor, not the raw range.
        let text = match distance_call(bracket as f64) {
            Some(call) => format!("{call} {descriptor}"),
            None => descriptor,
        };

        let distance_factor = ((corner.entry_distance / 100.0) as u8).max(1);
        Some(Pacenote {
            text,
            distance_m: corner.entry_distance,
            kind: NoteKind::Corner,
            priority: corner.severity + distance_factor,
            key,
        })
    }

    // ── Feature notes ─────────────────────────────────────────────────────

    fn feature_note(&mut self, feature: &FeatureAhead) -> Option<Pacenote> {
        let distance = feature.distance_m();

        match feature {
            FeatureAhead::Junction { distance_m, node_id, chosen_bearing, turn, .. } => {
                if *distance_m > self.config.junction_warn_m {
                    return None;
                }
                // Warn when the driver must act: a dead end ahead, or a
                // route-guided turn off the current road.
                let turning = matches!(turn, Some(Turn::Left) | Some(Turn::Right));
                if chosen_bearing.is_some() && !turning {
                    return None;
                }
                let body = match turn {
                    Some(Turn::Left) => "junction left".to_owned(),
                    Some(Turn::Right) => "junction right".to_owned(),
                    _ => "junction".to_owned(),
                };
                Some(Pacenote {
                    text: prefixed(*distance_m, &body),
                    distance_m: *distance_m,
                    kind: NoteKind::Junction,
                    priority: 1,
                    key: node_id.raw().to_string(),
                })
            }

            FeatureAhead::Bridge { distance_m, way_id, .. } => {
                if *distance_m > self.config.lookahead_m {
                    return None;
                }
                Some(Pacenote {
                    text: prefixed(*distance_m, "over bridge"),
                    distance_m: *distance_m,
                    kind: NoteKind::Bridge,
                    priority: 5,
                    key: format!("bridge_{}", way_id.raw()),
                })
            }

            FeatureAhead::Tunnel { way_id, .. } => self.hazard_note(
                distance,
                NoteKind::Tunnel,
                4,
                "tunnel".to_owned(),
                format!("tunnel_{}", way_id.raw()),
            ),

            FeatureAhead::RailwayCrossing { node_id, .. } => self.hazard_note(
                distance,
                NoteKind::Railway,
                3,
                "over rails".to_owned(),
                format!("railway_{}", node_id.raw()),
            ),

            FeatureAhead::Ford { way_id, .. } => self.hazard_note(
                distance,
                NoteKind::Ford,
                3,
                "water".to_owned(),
                format!("ford_{}", way_id.raw()),
            ),

            FeatureAhead::SpeedBump { way_id, kind, .. } => {
                // Tables and humps usually come in runs.
                let body = if kind == "table" || kind == "hump" { "bumps" } else { "bump" };
                self.hazard_note(
                    distance,
                    NoteKind::SpeedBump,
                    4,
                    body.to_owned(),
                    format!("bump_{}", way_id.raw()),
                )
            }

            FeatureAhead::SurfaceChange { way_id, to, .. } => {
                let word = surface_word(to)?;
                self.hazard_note(
                    distance,
                    NoteKind::Surface,
                    4,
                    format!("onto {word}"),
                    format!("surface_{}", way_id.raw()),
                )
            }

            FeatureAhead::Barrier { node_id, kind, .. } => {
                let body = match kind {
                    cd_map::BarrierKind::CattleGrid => "cattle grid",
                    cd_map::BarrierKind::Gate => "gate",
                };
                self.hazard_note(
                    distance,
                    NoteKind::Barrier,
                    3,
                    body.to_owned(),
                    format!("barrier_{}", node_id.raw()),
                )
            }

            FeatureAhead::Narrow { way_id, .. } => self.hazard_note(
                distance,
                NoteKind::Narrow,
                4,
                "narrows".to_owned(),
                format!("narrow_{}", way_id.raw()),
            ),
        }
    }

    /// Multi-bracket hazard note; the bracket lands in the key.
    fn hazard_note(
        &self,
        distance_m: f64,
        kind: NoteKind,
        priority: u8,
        body: String,
        key_base: String,
    ) -> Option<Pacenote> {
        if distance_m > self.config.lookahead_m {
            return None;
        }
        let bracket = hazard_bracket(distance_m)?;
        Some(Pacenote {
            text: prefixed(distance_m, &body),
            distance_m,
            kind,
            priority,
            key: format!("{key_base}_{bracket}"),
        })
    }

    // ── Block filter ──────────────────────────────────────────────────────

    /// Drop long-range corner callouts when any detected corner sits closer.
    ///
    /// Checks the raw corner list, not just bracketed notes: a corner at
    /// 300 m that hasn't entered a bracket yet must still silence a 900 m
    /// call.  The 100 bracket always passes — the final call before the
    /// corner.
    fn filter_blocked_corners(
        &self,
        notes: Vec<Pacenote>,
        all_corners: &[Corner],
    ) -> Vec<Pacenote> {
        if notes.is_empty() {
            return notes;
        }

        let mut corner_distances: Vec<f64> =
            all_corners.iter().map(|c| c.entry_distance).collect();
        corner_distances.sort_by(f64::total_cmp);

        notes
            .into_iter()
            .filter(|note| {
                if note.kind != NoteKind::Corner || note.key.ends_with("_100") {
                    return true;
                }
                for &corner_dist in &corner_distances {
                    if corner_dist >= note.distance_m {
                        break;
                    }
                    if note.distance_m - corner_dist > self.config.merge_distance_m {
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    // ── Adjacent-note merging ─────────────────────────────────────────────

    /// Collapse runs of notes within the merge distance into one "into"
    /// chain, prefixed by the earliest note's distance word.
    fn merge_adjacent(&self, notes: Vec<Pacenote>) -> Vec<Pacenote> {
        if notes.len() < 2 {
            return notes;
        }

        let mut merged = Vec::with_capacity(notes.len());
        let mut i = 0;
        while i < notes.len() {
            let first = &notes[i];
            let mut bodies = vec![strip_distance(&first.text).to_owned()];
            let mut keys = vec![first.key.clone()];
            let mut priority = first.priority;

            let mut j = i + 1;
            while j < notes.len()
                && notes[j].distance_m - first.distance_m <= self.config.merge_distance_m
            {
                bodies.push(strip_distance(&notes[j].text).to_owned());
                keys.push(notes[j].key.clone());
                priority = priority.min(notes[j].priority);
                j += 1;
            }

            if bodies.len() > 1 {
                let chain = bodies.join(" into ");
                merged.push(Pacenote {
                    text: prefixed(first.distance_m, &chain),
                    distance_m: first.distance_m,
                    kind: first.kind,
                    priority,
                    key: keys.join("|"),
                });
            } else {
                merged.push(first.clone());
            }
            i = j;
        }
        merged
    }

    // ── Call decision ─────────────────────────────────────────────────────

    /// Should this note be spoken now?  Returns the note to speak — possibly
    /// trimmed, for a merged note whose components were partly spoken
    /// already — and records what it returns as spoken.
    pub fn should_call(&mut self, note: &Pacenote, speed_mps: f64) -> Option<Pacenote> {
        let mut max_distance = match note.kind {
            NoteKind::Corner => 1_025.0,
            NoteKind::Tunnel
            | NoteKind::Railway
            | NoteKind::Ford
            | NoteKind::SpeedBump
            | NoteKind::Surface
            | NoteKind::Barrier
            | NoteKind::Narrow => 525.0,
            _ => self.config.callout_distance_m,
        };

        // Fast approach: guarantee the minimum spoken-warning time.
        if speed_mps > self.config.speed_scale_threshold_mps {
            max_distance = max_distance.max(speed_mps * self.config.min_warning_time_s);
        }

        if note.distance_m > max_distance {
            return None;
        }
        if note.distance_m < self.config.min_callout_distance_m {
            return None;
        }

        let key = if note.key.is_empty() { note.text.as_str() } else { note.key.as_str() };

        if key.contains('|') {
            return self.should_call_merged(note, key);
        }

        if self.memory.contains(key) {
            return None;
        }
        self.memory.mark(key);
        Some(note.clone())
    }

    /// Merged notes re-check each component: speak only the parts not yet
    /// called, re-prefixed for the current distance.
    fn should_call_merged(&mut self, note: &Pacenote, key: &str) -> Option<Pacenote> {
        let component_keys: Vec<&str> = key.split('|').collect();
        let body = strip_distance(&note.text);
        let bodies: Vec<&str> = body.split(" into ").collect();

        let mut fresh_keys = Vec::new();
        let mut fresh_bodies = Vec::new();
        for (k, b) in component_keys.iter().zip(&bodies) {
            if !self.memory.contains(k) {
                fresh_keys.push(*k);
                fresh_bodies.push(*b);
            }
        }
        if fresh_keys.is_empty() {
            return None;
        }
        for k in &fresh_keys {
            self.memory.mark(k);
        }

        if fresh_keys.len() == component_keys.len() {
            return Some(note.clone());
        }

        let chain = fresh_bodies.join(" into ");
        Some(Pacenote {
            text: prefixed(note.distance_m, &chain),
            distance_m: note.distance_m,
            kind: note.kind,
            priority: note.priority,
            key: fresh_keys.join("|"),
        })
    }
}

// ── Brackets ──────────────────────────────────────────────────────────────────

/// The corner bracket containing `distance`, if any.
///
/// Windows: 1000 → [900, 1025]; 500 → [400, 525]; 300 → [250, 325];
/// 200 → [150, 225]; 100 → [min_callout, 150].
fn corner_bracket(distance_m: f64, min_callout_m: f64) -> Option<u32> {
    for bracket in CORNER_BRACKETS {
        let hit = match bracket {
            1_000 => (900.0..=1_025.0).contains(&distance_m),
            500 => (400.0..=525.0).contains(&distance_m),
            300 => (250.0..=325.0).contains(&distance_m),
            200 => (150.0..=225.0).contains(&distance_m),
            _ => (min_callout_m..=150.0).contains(&distance_m),
        };
        if hit {
            return Some(bracket);
        }
    }
    None
}

/// The hazard bracket containing `distance`: [max(0, B − 100), B + 25].
fn hazard_bracket(distance_m: f64) -> Option<u32> {
    HAZARD_BRACKETS.into_iter().find(|&bracket| {
        let lower = (bracket as f64 - 100.0).max(0.0);
        (lower..=bracket as f64 + 25.0).contains(&distance_m)
    })
}

// ── Text helpers ──────────────────────────────────────────────────────────────

/// The descriptor (body without distance) for a corner.
fn corner_descriptor(corner: &Corner) -> String {
    if corner.is_chicane
        && let Some(exit) = corner.exit_direction
    {
        return format!("chicane {} {}", corner.direction.as_str(), exit.as_str());
    }

    let direction = corner.direction.as_str();
    let severity_word = SEVERITY_WORDS[usize::from(corner.severity).min(7)];

    // A ~90° tight corner reads "square", not by its number.
    let is_square =
        corner.severity <= 2 && (60.0..=120.0).contains(&corner.total_angle_deg.abs());

    let mut parts = vec![if is_square {
        format!("square {direction}")
    } else if corner.severity == 1 || corner.severity == 7 {
        format!("{severity_word} {direction}")
    } else {
        format!("{direction} {severity_word}")
    }];

    if corner.tightens {
        parts.push("tightens".to_owned());
    }
    if corner.opens {
        parts.push("opens".to_owned());
    }
    if corner.long {
        parts.push("long".to_owned());
    }
    parts.join(" ")
}

/// Prepend the spoken distance word when the distance sits near an anchor.
fn prefixed(distance_m: f64, body: &str) -> String {
    match distance_call(distance_m) {
        Some(call) => format!("{call} {body}"),
        None => body.to_owned(),
    }
}

/// Remove a leading distance word, if present.
fn strip_distance(text: &str) -> &str {
    for (_, call) in DISTANCE_CALLS {
        if let Some(rest) = text.strip_prefix(call)
            && let Some(rest) = rest.strip_prefix(' ')
        {
            return rest;
        }
    }
    text
}
