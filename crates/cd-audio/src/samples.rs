//! Sample pack access: one folder per key, one or more WAV takes per folder.
//!
//! Pack layout (CrewChief-style co-driver packs):
//!
//! ```text
//! pack/
//!   corner_3_left/   1.wav 2.wav …
//!   detail_into/     1.wav …
//!   number_100/      1.wav …
//! ```
//!
//! A random take is picked per render for subtle voice variation.  Absent
//! folders are tolerated — the caller falls back to synthesised speech.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;

/// Scanned sample pack.
#[derive(Default)]
pub struct SampleLibrary {
    folders: FxHashMap<String, Vec<PathBuf>>,
}

impl SampleLibrary {
    /// Scan `dir` for sample folders.  A missing directory yields an empty
    /// library (every lookup falls back).
    pub fn scan(dir: &Path) -> Self {
        let mut folders: FxHashMap<String, Vec<PathBuf>> = FxHashMap::default();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Self { folders };
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if name.starts_with('.') {
                continue;
            }
            let mut wavs: Vec<PathBuf> = std::fs::read_dir(&path)
                .map(|wav_entries| {
                    wav_entries
                        .flatten()
                        .map(|e| e.path())
                        .filter(|p| {
                            p.extension().and_then(|e| e.to_str()) == Some("wav")
                        })
                        .collect()
                })
                .unwrap_or_default();
            wavs.sort();
            if !wavs.is_empty() {
                folders.insert(name.to_owned(), wavs);
            }
        }
        Self { folders }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn has(&self, folder: &str) -> bool {
        self.folders.contains_key(folder)
    }

    /// A random take from `folder`, or `None` when the folder is absent.
    pub fn pick(&self, folder: &str) -> Option<&Path> {
        self.folders
            .get(folder)?
            .choose(&mut rand::thread_rng())
            .map(PathBuf::as_path)
    }
}

/// Map a parsed sample key to its pack folder name.
pub fn folder_for_key(key: &str) -> Option<&'static str> {
    let folder = match key {
        // Corners
        "left_hairpin" => "corner_hairpin_left",
        "right_hairpin" => "corner_hairpin_right",
        "left_square" => "corner_square_left_descriptive",
        "right_square" => "corner_square_right_descriptive",
        "left_two" => "corner_2_left",
        "right_two" => "corner_2_right",
        "left_three" => "corner_3_left",
        "right_three" => "corner_3_right",
        "left_four" => "corner_4_left",
        "right_four" => "corner_4_right",
        "left_five" => "corner_5_left",
        "right_five" => "corner_5_right",
        "left_six" => "corner_6_left",
        "right_six" => "corner_6_right",
        "left_flat" => "corner_flat_left",
        "right_flat" => "corner_flat_right",

        // Details
        "tightens" => "detail_tightens",
        "opens" => "detail_opens",
        "long" => "detail_long",
        "caution" => "detail_caution",
        "over_bridge" => "detail_over_bridge",
        "into" => "detail_into",
        "and" => "detail_and",
        "bridge" => "detail_bridge",
        "junction" => "detail_junction",
        "left_entry_chicane" => "detail_left_entry_chicane",
        "right_entry_chicane" => "detail_right_entry_chicane",
        "tunnel" => "detail_tunnel",
        "over_rails" => "detail_over_rails",
        "water" => "detail_water",
        "bump" => "detail_bump",
        "bumps" => "detail_bumps",
        "onto_gravel" => "detail_onto_gravel",
        "onto_tarmac" => "detail_onto_tarmac",
        "onto_concrete" => "detail_onto_concrete",
        "cattle_grid" => "detail_cattle_grid",
        "gate" => "detail_gate",
        "narrows" => "detail_narrows",

        // Numbers
        "30" => "number_30",
        "40" => "number_40",
        "50" => "number_50",
        "60" => "number_60",
        "70" => "number_70",
        "80" => "number_80",
        "100" => "number_100",
        "120" => "number_120",
        "140" => "number_140",
        "150" => "number_150",
        "160" => "number_160",
        "180" => "number_180",
        "200" => "number_200",
        "250" => "number_250",
        "300" => "number_300",
        "350" => "number_350",
        "400" => "number_400",
        "500" => "number_500",
        "1000" => "number_1000",

        _ => return None,
    };
    Some(folder)
}
