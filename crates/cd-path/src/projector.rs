//! Project the likely drive path ahead along the road graph.
//!
//! Starting from the way the driver is on, the projector walks node to node
//! in the direction of travel, crossing plain way joins and junctions, until
//! the lookahead distance is reached or the road genuinely ends.  At each
//! junction the continuation is chosen by, in order: the supplied route
//! polyline, a same-road continuation when the current way ends there, or
//! the best-aligned exit.

use rustc_hash::FxHashSet;
use tracing::trace;

use cd_core::{
    GeoPoint, NodeId, WayId, angle_diff_deg, closest_point_on_segment, haversine_m,
    initial_bearing_deg,
};
use cd_map::{Junction, RoadNetwork, Way};

use crate::feature::{FeatureAhead, PathPoint, ProjectedPath, Turn};

// ── Parameters ────────────────────────────────────────────────────────────────

/// Tunables for way matching and junction decisions.
#[derive(Copy, Clone, Debug)]
pub struct ProjectorParams {
    /// Exits within this angle of the arrival bearing count as "straight on".
    pub heading_tolerance_deg: f64,
    /// How far from the fix a way may be and still be a candidate.
    pub search_radius_m: f64,
}

impl Default for ProjectorParams {
    fn default() -> Self {
        Self { heading_tolerance_deg: 30.0, search_radius_m: 50.0 }
    }
}

/// Road-class preference when several ways pass near the fix; lower wins.
/// Weighted heavily against distance so a primary road 100 m away beats a
/// service road 30 m away.
fn road_priority(highway: &str) -> u32 {
    match highway {
        "motorway" | "motorway_link" => 1,
        "trunk" | "trunk_link" => 2,
        "primary" | "primary_link" => 3,
        "secondary" | "secondary_link" => 4,
        "tertiary" | "tertiary_link" => 5,
        "unclassified" => 6,
        "residential" => 7,
        "living_street" => 8,
        "service" => 9,
        _ => 10,
    }
}

// ── PathProjector ─────────────────────────────────────────────────────────────

/// Projects the path ahead over a borrowed [`RoadNetwork`].
pub struct PathProjector<'a> {
    network: &'a RoadNetwork,
    params: ProjectorParams,
}

impl<'a> PathProjector<'a> {
    pub fn new(network: &'a RoadNetwork) -> Self {
        Self { network, params: ProjectorParams::default() }
    }

    pub fn with_params(network: &'a RoadNetwork, params: ProjectorParams) -> Self {
        Self { network, params }
    }

    // ── Way matching ──────────────────────────────────────────────────────

    /// Find the way the vehicle is currently on.
    ///
    /// Returns `(way id, node index at the segment start, forward)` where
    /// `forward` is the direction of travel along the way's node order.
    pub fn find_current_way(
        &self,
        lat: f64,
        lon: f64,
        heading: f64,
    ) -> Option<(WayId, usize, bool)> {
        let here = GeoPoint::new(lat, lon);
        let mut best: Option<(f64, WayId, usize, bool)> = None;
        let mut fallback: Option<(f64, WayId, usize, bool)> = None;

        for (way_id, seg_index) in self.network.segments_near(&here, self.params.search_radius_m) {
            let Some(way) = self.network.ways.get(&way_id) else { continue };
            let (Some(a), Some(b)) = (
                way.nodes.get(seg_index).and_then(|n| self.network.node_point(*n)),
                way.nodes.get(seg_index + 1).and_then(|n| self.network.node_point(*n)),
            ) else {
                continue;
            };

            let (closest, _t) = closest_point_on_segment(&here, &a, &b);
            let dist = haversine_m(&here, &closest);
            if dist > self.params.search_radius_m {
                continue;
            }

            let seg_bearing = initial_bearing_deg(&a, &b);
            let mut heading_err = angle_diff_deg(heading, seg_bearing).abs();
            let forward = heading_err < 90.0;
            if !forward {
                heading_err = 180.0 - heading_err;
            }

            let score = road_priority(&way.highway) as f64 * 50.0 + dist;
            let candidate = (score, way_id, seg_index, forward);

            if heading_err > self.params.heading_tolerance_deg {
                // Misaligned roads only matter when we're right on top of one.
                if dist < 30.0 {
                    let demoted = (score + 500.0, way_id, seg_index, forward);
                    if fallback.is_none_or(|f| demoted.0 < f.0) {
                        fallback = Some(demoted);
                    }
                }
                continue;
            }

            if best.is_none_or(|b| candidate.0 < b.0) {
                best = Some(candidate);
            }
        }

        best.or(fallback).map(|(_, way_id, seg_index, forward)| (way_id, seg_index, forward))
    }

    // ── Projection ────────────────────────────────────────────────────────

    /// Walk the graph from the current fix and return the path ahead, or
    /// `None` when no way matches the fix.
    pub fn project(
        &self,
        lat: f64,
        lon: f64,
        heading: f64,
        max_distance: f64,
        route: Option<&[GeoPoint]>,
    ) -> Option<ProjectedPath> {
        let (mut way_id, mut node_idx, mut forward) = self.find_current_way(lat, lon, heading)?;
        trace!(%way_id, node_idx, forward, "matched current way");

        let mut path = ProjectedPath::default();
        let mut total_distance = 0.0f64;

        let mut visited_ways: FxHashSet<WayId> = FxHashSet::default();
        visited_ways.insert(way_id);
        let mut seen_bridges: FxHashSet<WayId> = FxHashSet::default();
        let mut seen_tunnels: FxHashSet<WayId> = FxHashSet::default();
        let mut seen_fords: FxHashSet<WayId> = FxHashSet::default();
        let mut seen_bumps: FxHashSet<WayId> = FxHashSet::default();
        let mut seen_narrows: FxHashSet<WayId> = FxHashSet::default();
        let mut seen_crossings: FxHashSet<NodeId> = FxHashSet::default();
        let mut seen_barriers: FxHashSet<NodeId> = FxHashSet::default();
        let mut current_surface = String::new();

        // The point we travelled from, one step behind `prev_point`; feeds
        // the arrival bearing at junctions.
        let mut prev_point = GeoPoint::new(lat, lon);
        let mut approach_point = prev_point;

        'walk: while total_distance < max_distance {
            let Some(way) = self.network.ways.get(&way_id) else { break };
            let geometry = self.network.way_geometry(way_id);
            if geometry.len() < 2 || geometry.len() != way.nodes.len() {
                break;
            }

            let feature_pt = geometry.get(node_idx).copied().unwrap_or(geometry[0]);
            self.emit_way_features(
                way,
                feature_pt,
                total_distance,
                &mut path.features,
                &mut seen_bridges,
                &mut seen_tunnels,
                &mut seen_fords,
                &mut seen_bumps,
                &mut seen_narrows,
                &mut current_surface,
            );

            // Walk the way's nodes in the direction of travel.
            let indices: Vec<usize> = if forward {
                (node_idx..geometry.len()).collect()
            } else {
                (0..=node_idx).rev().collect()
            };

            let mut exceeded = false;
            for i in indices {
                let pt = geometry[i];
                let step = haversine_m(&prev_point, &pt);
                // A way join re-visits the shared node; don't emit it twice.
                if step < 1e-9 && !path.points.is_empty() {
                    continue;
                }
                total_distance += step;
                if total_distance > max_distance {
                    exceeded = true;
                    break;
                }

                path.points.push(PathPoint {
                    lat: pt.lat,
                    lon: pt.lon,
                    distance_m: total_distance,
                    way_id,
                    node_index: i,
                });

                let node_id = way.nodes[i];
                if let Some(crossing) = self.network.railway_crossings.get(&node_id)
                    && seen_crossings.insert(node_id)
                {
                    path.features.push(FeatureAhead::RailwayCrossing {
                        point: crossing.point,
                        distance_m: total_distance,
                        node_id,
                    });
                }
                if let Some(barrier) = self.network.barriers.get(&node_id)
                    && seen_barriers.insert(node_id)
                {
                    path.features.push(FeatureAhead::Barrier {
                        point: barrier.point,
                        distance_m: total_distance,
                        node_id,
                        kind: barrier.kind,
                    });
                }

                approach_point = prev_point;
                prev_point = pt;
            }
            if exceeded {
                break;
            }

            // End of way: decide the continuation.
            let end_node_id = if forward { *way.nodes.last()? } else { way.nodes[0] };
            let end_point = self.network.node_point(end_node_id)?;

            if let Some(junction) = self.network.junctions.get(&end_node_id) {
                let exit_bearings = self.exit_bearings(junction, way_id);
                let arrival = if approach_point != end_point {
                    initial_bearing_deg(&approach_point, &end_point)
                } else {
                    heading
                };

                let mut chosen: Option<f64> = None;
                let mut turn: Option<Turn> = None;

                if let Some(route) = route
                    && let Some((bearing, t)) =
                        self.route_guided_exit(junction, arrival, &exit_bearings, route)
                {
                    chosen = Some(bearing);
                    turn = Some(t);
                }
                if chosen.is_none()
                    && let Some(bearing) =
                        self.straight_on_exit(arrival, &exit_bearings, way, junction)
                {
                    chosen = Some(bearing);
                    turn = Some(Turn::Straight);
                }

                path.features.push(FeatureAhead::Junction {
                    point: junction.point,
                    distance_m: total_distance,
                    node_id: junction.node_id,
                    is_t_junction: junction.is_t_junction,
                    exit_bearings: exit_bearings.clone(),
                    chosen_bearing: chosen,
                    turn,
                });

                if let Some(bearing) = chosen
                    && let Some((next_way, next_forward)) =
                        self.way_with_bearing(junction, bearing, way_id)
                    && visited_ways.insert(next_way)
                {
                    way_id = next_way;
                    forward = next_forward;
                    node_idx = if next_forward {
                        0
                    } else {
                        self.network.ways[&next_way].nodes.len() - 1
                    };
                    continue 'walk;
                }
                break; // no continuation through this junction
            }

            // Plain join of two ways: continue onto the other one.
            let Some(connected) = self.network.node_ways.get(&end_node_id) else { break };
            let Some(next_way_id) = connected
                .iter()
                .find(|wid| **wid != way_id && !visited_ways.contains(wid))
                .copied()
            else {
                break;
            };

            let next_way = &self.network.ways[&next_way_id];
            if next_way.nodes.first() == Some(&end_node_id) {
                forward = true;
                node_idx = 0;
            } else if next_way.nodes.last() == Some(&end_node_id) {
                forward = false;
                node_idx = next_way.nodes.len() - 1;
            } else {
                break;
            }
            visited_ways.insert(next_way_id);
            way_id = next_way_id;
        }

        path.total_distance = path.points.last().map(|p| p.distance_m).unwrap_or(0.0);
        path.features
            .sort_by(|a, b| a.distance_m().total_cmp(&b.distance_m()));
        Some(path)
    }

    // ── Way-level features ────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn emit_way_features(
        &self,
        way: &Way,
        point: GeoPoint,
        distance_m: f64,
        features: &mut Vec<FeatureAhead>,
        seen_bridges: &mut FxHashSet<WayId>,
        seen_tunnels: &mut FxHashSet<WayId>,
        seen_fords: &mut FxHashSet<WayId>,
        seen_bumps: &mut FxHashSet<WayId>,
        seen_narrows: &mut FxHashSet<WayId>,
        current_surface: &mut String,
    ) {
        if way.bridge && seen_bridges.insert(way.id) {
            features.push(FeatureAhead::Bridge { point, distance_m, way_id: way.id });
        }
        if way.tunnel && seen_tunnels.insert(way.id) {
            features.push(FeatureAhead::Tunnel { point, distance_m, way_id: way.id });
        }
        if way.ford && seen_fords.insert(way.id) {
            features.push(FeatureAhead::Ford { point, distance_m, way_id: way.id });
        }
        if !way.traffic_calming.is_empty() && seen_bumps.insert(way.id) {
            features.push(FeatureAhead::SpeedBump {
                point,
                distance_m,
                way_id: way.id,
                kind: way.traffic_calming.clone(),
            });
        }
        if !way.surface.is_empty() && way.surface != *current_surface {
            if !current_surface.is_empty() {
                features.push(FeatureAhead::SurfaceChange {
                    point,
                    distance_m,
                    way_id: way.id,
                    from: current_surface.clone(),
                    to: way.surface.clone(),
                });
            }
            *current_surface = way.surface.clone();
        }
        let is_narrow = way.narrow || (way.width_m > 0.0 && way.width_m < 3.0);
        if is_narrow && seen_narrows.insert(way.id) {
            features.push(FeatureAhead::Narrow {
                point,
                distance_m,
                way_id: way.id,
                width_m: way.width_m,
            });
        }
    }

    // ── Junction helpers ──────────────────────────────────────────────────

    /// Bearings of every road leaving the junction, arrival way excluded.
    fn exit_bearings(&self, junction: &Junction, arrival_way_id: WayId) -> Vec<f64> {
        let mut bearings = Vec::new();
        for way_id in &junction.connected_ways {
            if *way_id == arrival_way_id {
                continue;
            }
            let Some(way) = self.network.ways.get(way_id) else { continue };
            let Some(idx) = way.nodes.iter().position(|n| *n == junction.node_id) else {
                continue;
            };
            if idx > 0
                && let Some(prev) = self.network.node_point(way.nodes[idx - 1])
            {
                bearings.push(initial_bearing_deg(&junction.point, &prev));
            }
            if idx + 1 < way.nodes.len()
                && let Some(next) = self.network.node_point(way.nodes[idx + 1])
            {
                bearings.push(initial_bearing_deg(&junction.point, &next));
            }
        }
        bearings
    }

    /// The "straight on" exit, honouring same-road continuation rules.
    ///
    /// When the current way ends at this junction, only a way with the same
    /// name (or the same class when both are unnamed) within the heading
    /// tolerance counts as a continuation; with none, the junction is a true
    /// T and the projection stops here.
    fn straight_on_exit(
        &self,
        arrival_bearing: f64,
        exit_bearings: &[f64],
        current_way: &Way,
        junction: &Junction,
    ) -> Option<f64> {
        if exit_bearings.is_empty() {
            return None;
        }

        if let Some(idx) = current_way.nodes.iter().position(|n| *n == junction.node_id) {
            let road_continues = idx > 0 && idx < current_way.nodes.len() - 1;
            if !road_continues {
                return self.same_road_exit(current_way, junction, arrival_bearing);
            }
        }

        let mut best: Option<f64> = None;
        let mut best_diff = f64::INFINITY;
        for &bearing in exit_bearings {
            let diff = angle_diff_deg(arrival_bearing, bearing).abs();
            if diff < best_diff && diff < self.params.heading_tolerance_deg {
                best_diff = diff;
                best = Some(bearing);
            }
        }
        best
    }

    /// Exit bearing continuing the same road by name (or class when both
    /// ways are unnamed).
    fn same_road_exit(
        &self,
        current_way: &Way,
        junction: &Junction,
        arrival_bearing: f64,
    ) -> Option<f64> {
        for way_id in &junction.connected_ways {
            if *way_id == current_way.id {
                continue;
            }
            let Some(other) = self.network.ways.get(way_id) else { continue };

            let same_road = if !current_way.name.is_empty() && !other.name.is_empty() {
                current_way.name == other.name
            } else if current_way.name.is_empty() && other.name.is_empty() {
                current_way.highway == other.highway
            } else {
                false
            };
            if !same_road {
                continue;
            }

            let Some(idx) = other.nodes.iter().position(|n| *n == junction.node_id) else {
                continue;
            };
            if idx + 1 < other.nodes.len()
                && let Some(next) = self.network.node_point(other.nodes[idx + 1])
            {
                let bearing = initial_bearing_deg(&junction.point, &next);
                if angle_diff_deg(arrival_bearing, bearing).abs()
                    < self.params.heading_tolerance_deg
                {
                    return Some(bearing);
                }
            }
            if idx > 0
                && let Some(prev) = self.network.node_point(other.nodes[idx - 1])
            {
                let bearing = initial_bearing_deg(&junction.point, &prev);
                if angle_diff_deg(arrival_bearing, bearing).abs()
                    < self.params.heading_tolerance_deg
                {
                    return Some(bearing);
                }
            }
        }
        None
    }

    /// The way (and travel direction) leaving the junction along `target`.
    fn way_with_bearing(
        &self,
        junction: &Junction,
        target_bearing: f64,
        exclude_way_id: WayId,
    ) -> Option<(WayId, bool)> {
        for way_id in &junction.connected_ways {
            if *way_id == exclude_way_id {
                continue;
            }
            let Some(way) = self.network.ways.get(way_id) else { continue };
            let Some(idx) = way.nodes.iter().position(|n| *n == junction.node_id) else {
                continue;
            };
            if idx + 1 < way.nodes.len()
                && let Some(next) = self.network.node_point(way.nodes[idx + 1])
            {
                let bearing = initial_bearing_deg(&junction.point, &next);
                if angle_diff_deg(target_bearing, bearing).abs()
                    < self.params.heading_tolerance_deg
                {
                    return Some((*way_id, true));
                }
            }
            if idx > 0
                && let Some(prev) = self.network.node_point(way.nodes[idx - 1])
            {
                let bearing = initial_bearing_deg(&junction.point, &prev);
                if angle_diff_deg(target_bearing, bearing).abs()
                    < self.params.heading_tolerance_deg
                {
                    return Some((*way_id, false));
                }
            }
        }
        None
    }

    /// Pick the exit leading toward the route, per the supplied polyline.
    ///
    /// Looks past the waypoint nearest the junction for the first one more
    /// than 50 m on, takes the bearing to it, and accepts the closest exit
    /// within 60°.
    fn route_guided_exit(
        &self,
        junction: &Junction,
        arrival_bearing: f64,
        exit_bearings: &[f64],
        route: &[GeoPoint],
    ) -> Option<(f64, Turn)> {
        if exit_bearings.is_empty() || route.is_empty() {
            return None;
        }

        let mut nearest_idx = 0;
        let mut nearest_dist = f64::INFINITY;
        for (i, wp) in route.iter().enumerate() {
            let d = haversine_m(&junction.point, wp);
            if d < nearest_dist {
                nearest_dist = d;
                nearest_idx = i;
            }
        }

        let mut target: Option<GeoPoint> = None;
        for wp in route.iter().skip(nearest_idx + 1).take(19) {
            if haversine_m(&junction.point, wp) > 50.0 {
                target = Some(*wp);
                break;
            }
        }
        let target = match target {
            Some(t) => t,
            None => *route.get(nearest_idx + 1)?,
        };

        let route_bearing = initial_bearing_deg(&junction.point, &target);

        let mut best: Option<f64> = None;
        let mut best_diff = f64::INFINITY;
        for &exit in exit_bearings {
            let diff = angle_diff_deg(route_bearing, exit).abs();
            if diff < best_diff {
                best_diff = diff;
                best = Some(exit);
            }
        }
        let best = best?;
        if best_diff > 60.0 {
            return None;
        }

        let turn_angle = angle_diff_deg(arrival_bearing, best);
        let turn = if turn_angle.abs() < 30.0 {
            Turn::Straight
        } else if turn_angle < 0.0 {
            Turn::Left
        } else {
            Turn::Right
        };
        Some((best, turn))
    }
}
