//! The corner detector and its supporting types.

use cd_core::{GeoPoint, LatLon, cumulative_distances, curvature_1pm};

// ── Public types ──────────────────────────────────────────────────────────────

/// Driver-relative turn direction.
///
/// Positive (anti-clockwise) curvature is the driver's left; the sign flows
/// straight through from the geometry layer with no inversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A detected corner with rally-style classification.
#[derive(Clone, Debug)]
pub struct Corner {
    /// Distance from the path start to the corner entry.
    pub entry_distance: f64,
    /// Distance to the apex (tightest point).
    pub apex_distance: f64,
    /// Distance to the exit.
    pub exit_distance: f64,
    pub apex: GeoPoint,
    /// Entry direction (first turn direction for a chicane).
    pub direction: Direction,
    /// 1 (hairpin) … 7 (kink).
    pub severity: u8,
    /// Total degrees turned through the corner.
    pub total_angle_deg: f64,
    /// Tightest radius in metres.
    pub min_radius_m: f64,
    pub tightens: bool,
    pub opens: bool,
    pub long: bool,
    pub is_chicane: bool,
    /// The second turn direction, for chicanes only.
    pub exit_direction: Option<Direction>,
}

/// Rally severity from minimum radius.
///
/// 1 = hairpin (< 15 m), 2 = very tight (< 30 m), 3 = tight (< 50 m),
/// 4 = medium (< 80 m), 5 = fast (< 120 m), 6 = (< 200 m), 7 = kink.
pub fn severity_for_radius(radius_m: f64) -> u8 {
    const BUCKETS: [(f64, u8); 6] =
        [(15.0, 1), (30.0, 2), (50.0, 3), (80.0, 4), (120.0, 5), (200.0, 6)];
    for (threshold, severity) in BUCKETS {
        if radius_m < threshold {
            return severity;
        }
    }
    7
}

/// Tunables for segmentation and classification.
#[derive(Copy, Clone, Debug)]
pub struct DetectorParams {
    /// Curvature above this is a candidate peak (0.005 ≈ 200 m radius).
    pub curvature_peak_threshold: f64,
    /// Cuts closer than this along the path collapse together.
    pub min_cut_distance_m: f64,
    /// Filler-cut interval through long straights.
    pub straight_fill_distance_m: f64,
    /// Below this total angle a gentle segment stays a straight.
    pub min_corner_angle_deg: f64,
    /// Above this min radius a small-angle segment stays a straight.
    pub min_corner_radius_m: f64,
    /// Merge consecutive same-direction corner segments.
    pub merge_same_direction: bool,
    pub merge_chicanes: bool,
    /// Maximum gap between opposite corners merged as a chicane.
    pub max_chicane_gap_m: f64,
    /// Maximum total span of a merged chicane.
    pub max_chicane_length_m: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            curvature_peak_threshold: 0.005,
            min_cut_distance_m: 15.0,
            straight_fill_distance_m: 100.0,
            min_corner_angle_deg: 10.0,
            min_corner_radius_m: 300.0,
            merge_same_direction: true,
            merge_chicanes: true,
            max_chicane_gap_m: 30.0,
            max_chicane_length_m: 100.0,
        }
    }
}

// ── Internal segment model ────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq)]
enum SegmentKind {
    Corner,
    Straight,
}

#[derive(Clone)]
struct Segment {
    start_idx: usize,
    end_idx: usize,
    start_distance: f64,
    end_distance: f64,
    kind: SegmentKind,
    direction: Option<Direction>,
}

// ── CornerDetector ────────────────────────────────────────────────────────────

/// Detects corners in an ordered polyline.
#[derive(Default)]
pub struct CornerDetector {
    params: DetectorParams,
}

impl CornerDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// Detect all corners in `points`, with distances offset by
    /// `start_distance`.  Fewer than 5 points yield nothing.
    pub fn detect<P: LatLon>(&self, points: &[P], start_distance: f64) -> Vec<Corner> {
        if points.len() < 5 {
            return Vec::new();
        }

        let curvatures = point_curvatures(points);
        let mut distances = cumulative_distances(points);
        for d in &mut distances {
            *d += start_distance;
        }

        let cuts = self.phase1_peaks(&curvatures);
        let cuts = self.phase2_reduce(cuts, &distances);
        let cuts = self.phase3_fill_straights(cuts, &distances);
        let cuts = self.phase4_sign_changes(cuts, &distances, &curvatures);
        let cuts = self.phase2_reduce(cuts, &distances); // final filtering

        let mut segments = self.create_segments(&cuts, &curvatures, &distances);
        if self.params.merge_same_direction {
            segments = self.merge_same_direction(segments, &curvatures, &distances);
        }

        let mut corners = self.segments_to_corners(&segments, points, &curvatures, &distances);
        if self.params.merge_chicanes {
            corners = self.merge_chicanes(corners);
        }
        corners
    }

    // ── Phase 1: curvature peaks ──────────────────────────────────────────

    pub(crate) fn phase1_peaks(&self, curvatures: &[f64]) -> Vec<usize> {
        let mut cuts = Vec::new();
        for i in 1..curvatures.len().saturating_sub(1) {
            let curr = curvatures[i].abs();
            if curr > curvatures[i - 1].abs()
                && curr > curvatures[i + 1].abs()
                && curr > self.params.curvature_peak_threshold
            {
                cuts.push(i);
            }
        }
        cuts
    }

    // ── Phase 2 / 5: redundancy reduction ─────────────────────────────────

    /// Collapse runs of cuts closer than the minimum cut distance to their
    /// median member.
    pub(crate) fn phase2_reduce(&self, mut cuts: Vec<usize>, distances: &[f64]) -> Vec<usize> {
        if cuts.len() <= 1 {
            return cuts;
        }
        cuts.sort_by(|a, b| distances[*a].total_cmp(&distances[*b]));

        let mut merged = Vec::new();
        let mut i = 0;
        while i < cuts.len() {
            let anchor = cuts[i];
            let mut j = i + 1;
            while j < cuts.len()
                && (distances[cuts[j]] - distances[anchor]).abs() < self.params.min_cut_distance_m
            {
                j += 1;
            }
            let group = &cuts[i..j];
            merged.push(group[group.len() / 2]);
            i = j;
        }
        merged
    }

    // ── Phase 3: straight filling ─────────────────────────────────────────

    pub(crate) fn phase3_fill_straights(
        &self,
        cuts: Vec<usize>,
        distances: &[f64],
    ) -> Vec<usize> {
        let Some(&last_distance) = distances.last() else { return cuts };
        let first_distance = distances[0];
        let fill = self.params.straight_fill_distance_m;

        if cuts.is_empty() {
            // Seed regular cuts over the whole path.
            let count = ((last_distance - first_distance) / fill) as usize;
            let mut seeded: Vec<usize> = (1..count)
                .filter_map(|i| index_at_distance(distances, first_distance + i as f64 * fill))
                .collect();
            seeded.sort_unstable();
            seeded.dedup();
            return seeded;
        }

        let mut cuts = cuts;
        cuts.sort_by(|a, b| distances[*a].total_cmp(&distances[*b]));
        let mut filled = cuts.clone();

        let fill_gap = |start: f64, end: f64, out: &mut Vec<usize>| {
            let gap = end - start;
            if gap <= fill * 1.5 {
                return;
            }
            let count = ((gap / fill) as usize).max(1);
            for j in 1..=count {
                let target = start + j as f64 * (gap / (count + 1) as f64);
                if let Some(idx) = index_at_distance(distances, target)
                    && !out.contains(&idx)
                {
                    out.push(idx);
                }
            }
        };

        for pair in cuts.windows(2) {
            fill_gap(distances[pair[0]], distances[pair[1]], &mut filled);
        }
        fill_gap(first_distance, distances[cuts[0]], &mut filled);
        fill_gap(distances[*cuts.last().expect("nonempty")], last_distance, &mut filled);

        filled.sort_unstable();
        filled.dedup();
        filled
    }

    // ── Phase 4: sign changes ─────────────────────────────────────────────

    pub(crate) fn phase4_sign_changes(
        &self,
        cuts: Vec<usize>,
        distances: &[f64],
        curvatures: &[f64],
    ) -> Vec<usize> {
        let mut out = cuts.clone();

        for i in 1..curvatures.len() {
            // Ignore magnitudes that are noise rather than a real direction.
            if curvatures[i - 1].abs() < 0.001 || curvatures[i].abs() < 0.001 {
                continue;
            }
            if curvatures[i - 1].signum() == curvatures[i].signum() {
                continue;
            }

            let dist = distances[i];
            let mut prev_cut_dist = distances[0];
            let mut next_cut_dist = *distances.last().expect("nonempty");
            for &cut in &cuts {
                let cut_dist = distances[cut];
                if cut_dist < dist {
                    prev_cut_dist = prev_cut_dist.max(cut_dist);
                } else {
                    next_cut_dist = next_cut_dist.min(cut_dist);
                }
            }

            if dist - prev_cut_dist > self.params.min_cut_distance_m
                && next_cut_dist - dist > self.params.min_cut_distance_m
                && !out.contains(&i)
            {
                out.push(i);
            }
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    // ── Segmentation ──────────────────────────────────────────────────────

    fn create_segments(
        &self,
        cuts: &[usize],
        curvatures: &[f64],
        distances: &[f64],
    ) -> Vec<Segment> {
        let last = distances.len() - 1;
        if cuts.is_empty() {
            return vec![self.analyze_segment(0, last, curvatures, distances)];
        }

        let mut segments = Vec::with_capacity(cuts.len() + 1);
        if cuts[0] > 0 {
            segments.push(self.analyze_segment(0, cuts[0], curvatures, distances));
        }
        for pair in cuts.windows(2) {
            segments.push(self.analyze_segment(pair[0], pair[1], curvatures, distances));
        }
        let last_cut = *cuts.last().expect("nonempty");
        if last_cut < last {
            segments.push(self.analyze_segment(last_cut, last, curvatures, distances));
        }
        segments
    }

    fn analyze_segment(
        &self,
        start_idx: usize,
        end_idx: usize,
        curvatures: &[f64],
        distances: &[f64],
    ) -> Segment {
        let last = distances.len() - 1;
        let (start_idx, end_idx) = if start_idx >= end_idx {
            let end = (start_idx + 1).min(last);
            (end.saturating_sub(1), end)
        } else {
            (start_idx, end_idx)
        };

        let window = &curvatures[start_idx..=end_idx.min(curvatures.len() - 1)];
        let avg: f64 = window.iter().sum::<f64>() / window.len().max(1) as f64;
        let max_abs = window.iter().fold(0.0f64, |m, c| m.max(c.abs()));

        let total_angle = segment_angle_deg(start_idx, end_idx, curvatures, distances);

        let direction = if avg > 0.001 {
            Some(Direction::Left)
        } else if avg < -0.001 {
            Some(Direction::Right)
        } else {
            None
        };

        let min_radius = if max_abs > 1e-4 { 1.0 / max_abs } else { f64::INFINITY };

        // Lenient thresholds: sparse map geometry understates angles, so a
        // genuinely tight radius warns even with a tiny measured angle, and
        // a big angle warns even on a gentle radius.
        let is_tight = min_radius <= self.params.min_corner_radius_m;
        let is_medium_tight = min_radius < 250.0;
        let is_very_tight = min_radius < 150.0;
        let significant_angle = total_angle >= self.params.min_corner_angle_deg;
        let any_turn = total_angle >= 5.0;
        let major_turn = total_angle >= 30.0;

        let kind = if (significant_angle && is_tight)
            || (any_turn && is_medium_tight)
            || is_very_tight
            || major_turn
        {
            SegmentKind::Corner
        } else {
            SegmentKind::Straight
        };

        Segment {
            start_idx,
            end_idx,
            start_distance: distances[start_idx],
            end_distance: distances[end_idx],
            kind,
            direction,
        }
    }

    // ── Same-direction merging ────────────────────────────────────────────

    /// Join consecutive same-direction corner segments, optionally bridging
    /// one short straight, while the merged span stays small.
    fn merge_same_direction(
        &self,
        segments: Vec<Segment>,
        curvatures: &[f64],
        distances: &[f64],
    ) -> Vec<Segment> {
        const MAX_STRAIGHT_GAP_M: f64 = 30.0;
        const MAX_CORNER_SPAN_M: f64 = 80.0;

        if segments.len() <= 1 {
            return segments;
        }

        let mut merged = Vec::with_capacity(segments.len());
        let mut i = 0;
        while i < segments.len() {
            let current = &segments[i];
            if current.kind != SegmentKind::Corner {
                merged.push(current.clone());
                i += 1;
                continue;
            }

            let mut merge_end_idx = current.end_idx;
            let mut j = i + 1;
            while j < segments.len() {
                let next = &segments[j];
                match next.kind {
                    SegmentKind::Corner if next.direction == current.direction => {
                        merge_end_idx = next.end_idx;
                        j += 1;
                    }
                    SegmentKind::Corner => break,
                    SegmentKind::Straight => {
                        let straight_len = next.end_distance - next.start_distance;
                        let bridgeable = straight_len <= MAX_STRAIGHT_GAP_M
                            && j + 1 < segments.len()
                            && segments[j + 1].kind == SegmentKind::Corner
                            && segments[j + 1].direction == current.direction
                            && segments[j + 1].end_distance - current.start_distance
                                <= MAX_CORNER_SPAN_M;
                        if bridgeable {
                            j += 1;
                        } else {
                            break;
                        }
                    }
                }
            }

            if j > i + 1 {
                let mut seg =
                    self.analyze_segment(current.start_idx, merge_end_idx, curvatures, distances);
                seg.kind = SegmentKind::Corner;
                seg.direction = current.direction;
                merged.push(seg);
            } else {
                merged.push(current.clone());
            }
            i = j;
        }
        merged
    }

    // ── Corner records ────────────────────────────────────────────────────

    fn segments_to_corners<P: LatLon>(
        &self,
        segments: &[Segment],
        points: &[P],
        curvatures: &[f64],
        distances: &[f64],
    ) -> Vec<Corner> {
        let mut corners = Vec::new();

        for seg in segments {
            if seg.kind != SegmentKind::Corner {
                continue;
            }

            // Apex: the tightest point of the segment.
            let mut apex_idx = seg.start_idx;
            let mut max_abs = 0.0f64;
            for i in seg.start_idx..=seg.end_idx.min(curvatures.len() - 1) {
                if curvatures[i].abs() > max_abs {
                    max_abs = curvatures[i].abs();
                    apex_idx = i;
                }
            }

            let min_radius = if max_abs > 0.0 { 1.0 / max_abs } else { f64::INFINITY };
            let total_angle =
                segment_angle_deg(seg.start_idx, seg.end_idx, curvatures, distances);

            // A near-balanced segment has no meaningful mean sign; fall back
            // to the apex.
            let direction = seg.direction.unwrap_or(if curvatures[apex_idx] >= 0.0 {
                Direction::Left
            } else {
                Direction::Right
            });

            let window = &curvatures[seg.start_idx..=seg.end_idx.min(curvatures.len() - 1)];
            let (tightens, opens) = curvature_profile(window);

            let apex_point = &points[apex_idx];

            corners.push(Corner {
                entry_distance: seg.start_distance,
                apex_distance: distances[apex_idx],
                exit_distance: seg.end_distance,
                apex: GeoPoint::new(apex_point.lat(), apex_point.lon()),
                direction,
                severity: severity_for_radius(min_radius),
                total_angle_deg: total_angle,
                min_radius_m: min_radius,
                tightens,
                opens,
                long: seg.end_distance - seg.start_distance > 50.0,
                is_chicane: false,
                exit_direction: None,
            });
        }
        corners
    }

    // ── Chicane merging ───────────────────────────────────────────────────

    /// Merge consecutive opposite-direction corners into chicanes when the
    /// gap and total span are small enough.
    pub(crate) fn merge_chicanes(&self, corners: Vec<Corner>) -> Vec<Corner> {
        if corners.len() < 2 {
            return corners;
        }

        let mut merged = Vec::with_capacity(corners.len());
        let mut i = 0;
        while i < corners.len() {
            let current = &corners[i];

            if let Some(next) = corners.get(i + 1) {
                let gap = next.entry_distance - current.exit_distance;
                let span = next.exit_distance - current.entry_distance;
                let opposite = current.direction != next.direction;

                if opposite
                    && gap <= self.params.max_chicane_gap_m
                    && span <= self.params.max_chicane_length_m
                {
                    let min_radius = current.min_radius_m.min(next.min_radius_m);
                    // Apex from the tighter of the two constituents: keeps
                    // the position key stable across cycles.
                    let (apex_distance, apex) = if current.min_radius_m <= next.min_radius_m {
                        (current.apex_distance, current.apex)
                    } else {
                        (next.apex_distance, next.apex)
                    };

                    merged.push(Corner {
                        entry_distance: current.entry_distance,
                        apex_distance,
                        exit_distance: next.exit_distance,
                        apex,
                        direction: current.direction,
                        severity: severity_for_radius(min_radius),
                        total_angle_deg: current.total_angle_deg + next.total_angle_deg,
                        min_radius_m: min_radius,
                        tightens: false,
                        opens: false,
                        long: span > 50.0,
                        is_chicane: true,
                        exit_direction: Some(next.direction),
                    });
                    i += 2;
                    continue;
                }
            }

            merged.push(current.clone());
            i += 1;
        }
        merged
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Three-point curvature at each interior point; endpoints are zero.
pub(crate) fn point_curvatures<P: LatLon>(points: &[P]) -> Vec<f64> {
    let mut curvatures = Vec::with_capacity(points.len());
    curvatures.push(0.0);
    for i in 1..points.len() - 1 {
        curvatures.push(curvature_1pm(&points[i - 1], &points[i], &points[i + 1]));
    }
    curvatures.push(0.0);
    curvatures
}

/// Total angle turned across `[start_idx, end_idx]`, in degrees:
/// Σ |curvature| · arc length.
fn segment_angle_deg(
    start_idx: usize,
    end_idx: usize,
    curvatures: &[f64],
    distances: &[f64],
) -> f64 {
    let mut total = 0.0;
    for i in start_idx..end_idx.min(distances.len() - 1) {
        total += curvatures[i].abs() * (distances[i + 1] - distances[i]).abs();
    }
    total.to_degrees()
}

/// (tightens, opens) from the absolute-curvature profile: entry average vs
/// exit average around the apex.  Fewer than 3 samples infer nothing.
pub(crate) fn curvature_profile(curvatures: &[f64]) -> (bool, bool) {
    if curvatures.len() < 3 {
        return (false, false);
    }

    let abs: Vec<f64> = curvatures.iter().map(|c| c.abs()).collect();
    let max_idx = abs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let entry: f64 = abs[..max_idx].iter().sum::<f64>() / max_idx.max(1) as f64;
    let exit: f64 = abs[max_idx..].iter().sum::<f64>() / (abs.len() - max_idx).max(1) as f64;

    if entry > 0.0 && exit > 0.0 {
        let ratio = exit / entry;
        if ratio > 1.5 {
            return (true, false);
        }
        if ratio < 0.67 {
            return (false, true);
        }
    }
    (false, false)
}

/// Index whose distance is closest to `target`.
fn index_at_distance(distances: &[f64], target: f64) -> Option<usize> {
    distances
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
        .map(|(i, _)| i)
}
