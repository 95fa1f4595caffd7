//! `cd-note` — rally pacenote generation for the codriver engine.
//!
//! Corners and path features come in; distance-bracketed, deduplicated,
//! "into"-merged callouts come out.  The generator owns the callout memory
//! (spoken keys and cached corner descriptors) and the per-note
//! speak-now decision, including speed-scaled warning distances.
//!
//! | Module        | Contents                                          |
//! |---------------|---------------------------------------------------|
//! | [`note`]      | `Pacenote`, `NoteKind`, `NoteConfig`              |
//! | [`generator`] | `PacenoteGenerator`, `CalloutMemory`, brackets    |

pub mod generator;
pub mod note;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use generator::{CalloutMemory, PacenoteGenerator};
pub use note::{NoteConfig, NoteKind, Pacenote};
