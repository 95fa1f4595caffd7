//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use cd_audio::AudioConfig;
use cd_corner::DetectorParams;
use cd_note::NoteConfig;

/// Everything the orchestrator needs to run, in one explicit record.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Map store file (`.roads.db`), a directory of region stores, or a raw
    /// extract when ingest is compiled in.
    pub map_path: PathBuf,

    /// How far ahead to project and analyse.
    pub lookahead_m: f64,
    /// Fixed cycle cadence.
    pub update_interval: Duration,
    /// Reload roads after moving this far from the last load centre.
    pub refetch_distance_m: f64,
    /// Radius of each road load.
    pub load_radius_m: f64,

    /// Simulation runs cover ground faster: bigger loads, laxer refetch.
    pub simulation_mode: bool,
    pub simulation_load_radius_m: f64,
    pub simulation_refetch_distance_m: f64,

    pub detector: DetectorParams,
    pub notes: NoteConfig,

    pub audio_enabled: bool,
    pub audio: AudioConfig,
}

impl EngineConfig {
    /// Defaults for a live in-car run over the given map path.
    ///
    /// The detector deviates from its library defaults: finer cuts, tighter
    /// chicane pairing, and no same-direction merging — square corners and
    /// chicanes read better that way.
    pub fn new(map_path: impl Into<PathBuf>) -> Self {
        Self {
            map_path: map_path.into(),
            lookahead_m: 1_000.0,
            update_interval: Duration::from_millis(500),
            refetch_distance_m: 500.0,
            load_radius_m: 2_000.0,
            simulation_mode: false,
            simulation_load_radius_m: 5_000.0,
            simulation_refetch_distance_m: 2_500.0,
            detector: DetectorParams {
                merge_same_direction: false,
                min_cut_distance_m: 10.0,
                max_chicane_gap_m: 15.0,
                ..Default::default()
            },
            notes: NoteConfig::default(),
            audio_enabled: true,
            audio: AudioConfig::default(),
        }
    }

    pub(crate) fn effective_load_radius(&self) -> f64 {
        if self.simulation_mode { self.simulation_load_radius_m } else { self.load_radius_m }
    }

    pub(crate) fn effective_refetch_distance(&self) -> f64 {
        if self.simulation_mode {
            self.simulation_refetch_distance_m
        } else {
            self.refetch_distance_m
        }
    }
}
