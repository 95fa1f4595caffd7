//! Audio-subsystem error type.
//!
//! Render errors are signals to fall back to the next strategy, never to
//! abort: a lost callout is acceptable, a wedged worker is not.

use thiserror::Error;

/// Errors produced by `cd-audio`.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no sample for key '{0}'")]
    MissingSample(String),

    #[error("callout text has no speakable tokens: '{0}'")]
    EmptyCallout(String),

    #[error("{tool} exited with {status}")]
    Tool { tool: &'static str, status: std::process::ExitStatus },

    #[error("{0} did not finish in time")]
    Timeout(&'static str),

    #[error("no speech synthesiser available")]
    NoSynth,

    #[error("no audio playback tool available")]
    NoPlayback,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
