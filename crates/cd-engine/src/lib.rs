//! `cd-engine` — the codriver orchestrator.
//!
//! Wires the pipeline together: GPS fix → map loader → path projector →
//! corner detector → pacenote generator → audio, at a fixed cadence, with
//! asynchronous map prefetch and an immutable per-cycle snapshot for UIs.
//!
//! | Module       | Contents                                        |
//! |--------------|-------------------------------------------------|
//! | [`copilot`]  | `CoPilot` — the update cycle and load machine   |
//! | [`config`]   | `EngineConfig`                                  |
//! | [`gps`]      | `GpsSource`, `GpsSimulator`                     |
//! | [`route`]    | `RouteSource`, `GpxRoute`                       |
//! | [`snapshot`] | `CoPilotSnapshot`, `Mode`, `Status`             |
//! | [`error`]    | `EngineError`, `EngineResult`                   |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use cd_engine::{CoPilot, EngineConfig, GpsSimulator};
//!
//! let config = EngineConfig::new("maps/wales.roads.db");
//! let gps = GpsSimulator::new(52.41, -3.55, 90.0, 22.0);
//! let mut copilot = CoPilot::new(config, gps);
//! copilot.start()?;
//! copilot.run(); // until a stop_flag() clone is cleared
//! ```

pub mod config;
pub mod copilot;
pub mod error;
pub mod gps;
pub mod route;
pub mod snapshot;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::EngineConfig;
pub use copilot::CoPilot;
pub use error::{EngineError, EngineResult};
pub use gps::{GpsSimulator, GpsSource, NoFixGps};
pub use route::{GpxRoute, RouteSource};
pub use snapshot::{CoPilotSnapshot, Mode, SnapshotReader, Status};
