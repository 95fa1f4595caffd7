//! The pacenote record and generator configuration.

/// What a pacenote announces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteKind {
    Corner,
    Junction,
    Caution,
    Bridge,
    Tunnel,
    Railway,
    Ford,
    SpeedBump,
    Surface,
    Barrier,
    Narrow,
}

/// One spoken callout.
#[derive(Clone, Debug)]
pub struct Pacenote {
    pub text: String,
    pub distance_m: f64,
    pub kind: NoteKind,
    /// 1 = most urgent.
    pub priority: u8,
    /// Stable per physical feature and distance bracket, so a note is not
    /// re-spoken across cycles.  Merged notes join component keys with `|`.
    pub key: String,
}

/// Generator thresholds.
#[derive(Copy, Clone, Debug)]
pub struct NoteConfig {
    /// Features beyond this are not considered at all.
    pub lookahead_m: f64,
    /// Junctions are announced within this distance.
    pub junction_warn_m: f64,
    /// Default maximum callout distance for single-bracket kinds.
    pub callout_distance_m: f64,
    /// Notes within this distance of each other merge into one "into" chain.
    pub merge_distance_m: f64,
    /// Below this the driver is already in the feature; stay quiet.
    pub min_callout_distance_m: f64,
    /// At speed, guarantee at least this much spoken warning.
    pub min_warning_time_s: f64,
    /// Speed above which the warning-time scaling kicks in.
    pub speed_scale_threshold_mps: f64,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            lookahead_m: 1_000.0,
            junction_warn_m: 200.0,
            callout_distance_m: 100.0,
            merge_distance_m: 10.0,
            min_callout_distance_m: 20.0,
            min_warning_time_s: 5.0,
            speed_scale_threshold_mps: 20.0,
        }
    }
}
