//! The audio worker: callouts in, sound out.
//!
//! Render strategy, in fall-back order:
//!
//! 1. **Samples** — parse the callout into sample keys, pick a take per key,
//!    concatenate with `sox`, play.
//! 2. **Shaped speech** — synthesise with espeak, push through a sox filter
//!    chain that fakes a helmet intercom, play.
//! 3. **Plain speech** — synthesise straight to the speakers.
//! 4. Silence.  A lost callout never takes the worker down.
//!
//! Every external tool invocation carries a small timeout so a wedged
//! subprocess cannot lock the worker.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{AudioError, AudioResult};
use crate::keys::parse_sample_keys;
use crate::queue::{Callout, CalloutQueue};
use crate::samples::{SampleLibrary, folder_for_key};

/// A handful of pending callouts is plenty; older ones are stale anyway.
const QUEUE_CAPACITY: usize = 8;

/// Worker wake-up interval; also bounds shutdown latency.
const POP_TIMEOUT: Duration = Duration::from_millis(100);

/// Ceiling for any single external tool run.
const TOOL_TIMEOUT: Duration = Duration::from_secs(3);

/// How long `stop()` waits for the worker before letting it go.
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ─────────────────────────────────────────────────────────────

/// Audio tunables.
#[derive(Clone, Debug)]
pub struct AudioConfig {
    /// Sample pack root; `None` goes straight to synthesised speech.
    pub sample_dir: Option<PathBuf>,
    /// Synthesiser voice.
    pub voice: String,
    /// Words per minute — brisk, rally style.
    pub speed_wpm: u32,
    /// Apply the intercom filter chain to synthesised speech.
    pub effects: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_dir: None, voice: "en-gb".into(), speed_wpm: 210, effects: true }
    }
}

// ── AudioPlayer ───────────────────────────────────────────────────────────────

/// Owns the callout queue and the worker thread.
pub struct AudioPlayer {
    config: AudioConfig,
    queue: Arc<CalloutQueue>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl AudioPlayer {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            queue: Arc::new(CalloutQueue::new(QUEUE_CAPACITY)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Spawn the worker thread.  Idempotent.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        self.worker = Some(thread::spawn(move || {
            let renderer = match Renderer::new(&config) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "audio worker could not start");
                    return;
                }
            };
            info!(
                samples = renderer.samples.is_some(),
                sox = renderer.has_sox,
                "audio worker running"
            );

            while running.load(Ordering::SeqCst) {
                let Some(first) = queue.pop_timeout(POP_TIMEOUT) else { continue };
                // Anything queued while the last clip played joins this one.
                let mut chain = vec![first.text];
                chain.extend(queue.drain().into_iter().map(|c| c.text));
                renderer.speak_chain(&chain);
            }
        }));
    }

    /// Queue a callout.  Never blocks; oldest entries drop on overflow.
    pub fn say(&self, text: &str, priority: u8) {
        self.queue.push(Callout { text: text.to_owned(), priority });
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Stop the worker, waiting briefly for the current utterance.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.worker.take() else { return };

        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            // Mid-render; it will exit after the current tool timeout.
            warn!("audio worker still busy at shutdown, detaching");
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Renderer ──────────────────────────────────────────────────────────────────

/// Worker-local render state: the sample pack, a scratch directory, and the
/// tools this host actually has.
struct Renderer {
    samples: Option<SampleLibrary>,
    temp: TempDir,
    voice: String,
    speed_wpm: u32,
    effects: bool,
    has_sox: bool,
    has_say: bool,
    espeak: Option<&'static str>,
    has_aplay: bool,
    has_afplay: bool,
}

impl Renderer {
    fn new(config: &AudioConfig) -> AudioResult<Self> {
        let samples = config
            .sample_dir
            .as_deref()
            .map(SampleLibrary::scan)
            .filter(|lib| !lib.is_empty());

        let renderer = Self {
            samples,
            temp: TempDir::with_prefix("codriver-audio-")?,
            voice: config.voice.clone(),
            speed_wpm: config.speed_wpm,
            effects: config.effects,
            has_sox: tool_available("sox"),
            has_say: tool_available("say"),
            espeak: if tool_available("espeak-ng") {
                Some("espeak-ng")
            } else if tool_available("espeak") {
                Some("espeak")
            } else {
                None
            },
            has_aplay: tool_available("aplay"),
            has_afplay: tool_available("afplay"),
        };

        // Warm sox up so the first real callout isn't delayed by library
        // loading.
        if renderer.has_sox {
            let warmup = renderer.temp.path().join("warmup.wav");
            let mut cmd = Command::new("sox");
            cmd.args(["-n", "-r", "44100", "-c", "1"])
                .arg(&warmup)
                .args(["trim", "0", "0.01"]);
            let _ = run_tool("sox", &mut cmd, Duration::from_secs(1));
        }

        Ok(renderer)
    }

    /// Speak one or more callouts, chained with "into".
    fn speak_chain(&self, chain: &[String]) {
        // Pre-merged chains from the note layer expand to individual parts.
        let mut expanded: Vec<&str> = Vec::new();
        for text in chain {
            if text.contains(" into ") {
                expanded.extend(text.split(" into "));
            } else {
                expanded.push(text);
            }
        }
        if expanded.is_empty() {
            return;
        }

        if self.samples.is_some() {
            match self.speak_with_samples(&expanded) {
                Ok(()) => return,
                Err(e) => debug!(error = %e, "sample render failed, falling back to speech"),
            }
        }

        let combined = expanded.join(" into ");
        let result = if self.effects && self.has_sox {
            self.speak_with_effects(&combined)
        } else {
            self.speak_plain(&combined)
        };
        if let Err(e) = result {
            warn!(error = %e, text = %combined, "callout dropped");
        }
    }

    // ── Strategy 1: sample concatenation ──────────────────────────────────

    fn speak_with_samples(&self, chain: &[&str]) -> AudioResult<()> {
        let library = self.samples.as_ref().expect("checked by caller");
        let mut takes: Vec<&Path> = Vec::new();

        for (idx, text) in chain.iter().enumerate() {
            if idx > 0 {
                takes.push(
                    library
                        .pick("detail_into")
                        .ok_or_else(|| AudioError::MissingSample("into".into()))?,
                );
            }

            let keys = parse_sample_keys(text);
            if keys.is_empty() {
                return Err(AudioError::EmptyCallout((*text).to_owned()));
            }
            for key in keys {
                let folder = folder_for_key(&key)
                    .ok_or_else(|| AudioError::MissingSample(key.clone()))?;
                takes.push(
                    library.pick(folder).ok_or_else(|| AudioError::MissingSample(key.clone()))?,
                );
            }
        }

        let output = self.temp.path().join("chain.wav");
        let mut cmd = Command::new("sox");
        for take in &takes {
            cmd.arg(take);
        }
        cmd.arg(&output);
        run_tool("sox", &mut cmd, TOOL_TIMEOUT)?;

        self.play_file(&output)
    }

    // ── Strategy 2: shaped synthesised speech ─────────────────────────────

    fn speak_with_effects(&self, text: &str) -> AudioResult<()> {
        let raw = self.temp.path().join("raw.wav");
        let processed = self.temp.path().join("processed.wav");

        if let Err(e) = self.synthesise_to_file(text, &raw) {
            debug!(error = %e, "synthesis to file failed, trying plain speech");
            return self.speak_plain(text);
        }

        // High-pass + low-pass + compression + overdrive: a voice on a
        // helmet intercom rather than a screen reader.
        let mut cmd = Command::new("sox");
        cmd.arg(&raw).arg(&processed).args([
            "highpass", "400", "lowpass", "3200", "compand", "0.1,0.3", "-70,-60,-20", "-8",
            "-90", "0.1", "overdrive", "3", "gain", "-5",
        ]);
        let shaped = run_tool("sox", &mut cmd, TOOL_TIMEOUT);
        match shaped {
            Ok(()) => self.play_file(&processed),
            Err(_) => self.speak_plain(text),
        }
    }

    fn synthesise_to_file(&self, text: &str, output: &Path) -> AudioResult<()> {
        if self.has_say {
            // macOS development hosts: `say` writes AIFF, sox converts.
            let aiff = self.temp.path().join("raw.aiff");
            let mut cmd = Command::new("say");
            cmd.arg("-v")
                .arg(&self.voice)
                .arg("-r")
                .arg(self.speed_wpm.to_string())
                .arg("-o")
                .arg(&aiff)
                .arg(text);
            run_tool("say", &mut cmd, TOOL_TIMEOUT)?;
            let mut convert = Command::new("sox");
            convert.arg(&aiff).arg(output);
            return run_tool("sox", &mut convert, TOOL_TIMEOUT);
        }

        let espeak = self.espeak.ok_or(AudioError::NoSynth)?;
        let mut cmd = Command::new(espeak);
        cmd.arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(self.speed_wpm.to_string())
            .arg("-w")
            .arg(output)
            .arg(text);
        run_tool(espeak, &mut cmd, TOOL_TIMEOUT)
    }

    // ── Strategy 3: plain speech ──────────────────────────────────────────

    fn speak_plain(&self, text: &str) -> AudioResult<()> {
        if self.has_say {
            let mut cmd = Command::new("say");
            cmd.arg("-v")
                .arg(&self.voice)
                .arg("-r")
                .arg(self.speed_wpm.to_string())
                .arg(text);
            return run_tool("say", &mut cmd, TOOL_TIMEOUT);
        }
        let espeak = self.espeak.ok_or(AudioError::NoSynth)?;
        let mut cmd = Command::new(espeak);
        cmd.arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(self.speed_wpm.to_string())
            .arg(text);
        run_tool(espeak, &mut cmd, TOOL_TIMEOUT)
    }

    // ── Playback ──────────────────────────────────────────────────────────

    fn play_file(&self, path: &Path) -> AudioResult<()> {
        if self.has_afplay {
            run_tool("afplay", Command::new("afplay").arg(path), TOOL_TIMEOUT)
        } else if self.has_aplay {
            run_tool("aplay", Command::new("aplay").arg("-q").arg(path), TOOL_TIMEOUT)
        } else {
            Err(AudioError::NoPlayback)
        }
    }
}

// ── Subprocess plumbing ───────────────────────────────────────────────────────

/// Is `name` on PATH?
fn tool_available(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else { return false };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}

/// Run a command to completion with a hard deadline; kill on overrun.
fn run_tool(name: &'static str, cmd: &mut Command, timeout: Duration) -> AudioResult<()> {
    let mut child = cmd.stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait()? {
            Some(status) if status.success() => return Ok(()),
            Some(status) => return Err(AudioError::Tool { tool: name, status }),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AudioError::Timeout(name));
            }
            None => thread::sleep(Duration::from_millis(20)),
        }
    }
}
