//! Local fallback synthesizer
//!
//! Wraps whatever speech engine the host offers behind `SpeechCapability`, so
//! callers pick a strategy once instead of checking for support at every call
//! site. State is `Idle` or `Speaking`; `stop()` cancels every active playback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::tts::{CliSpeechBackend, LocalSynthesizerConfig};
use crate::{ChefError, Result, SynthesisErrorCode};

/// A voice offered by the local engine; not comparable to remote voice ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformVoice {
    pub name: String,
    pub language: Option<String>,
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakOptions {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

impl SpeakOptions {
    /// Clamp rate and pitch into [0.5, 2.0] and volume into [0.0, 2.0];
    /// non-finite values become 1.0
    pub fn normalized(mut self) -> Self {
        fn clamp(v: f32, min: f32) -> f32 {
            if v.is_finite() {
                v.clamp(min, 2.0)
            } else {
                1.0
            }
        }
        self.rate = clamp(self.rate, 0.5);
        self.pitch = clamp(self.pitch, 0.5);
        self.volume = clamp(self.volume, 0.0);
        self
    }
}

/// A host speech engine.
///
/// Dropping the future returned by `speak` must stop the audio.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn voices(&self) -> Result<Vec<PlatformVoice>>;

    /// Speak `text` and resolve when playback ends
    async fn speak(&self, text: &str, opts: &SpeakOptions) -> Result<()>;
}

/// Whether the host can speak at all
#[derive(Clone)]
pub enum SpeechCapability {
    Supported(Arc<dyn SpeechBackend>),
    Unsupported,
}

impl SpeechCapability {
    /// Probe for Piper or espeak-ng using `cfg`
    pub fn detect(cfg: LocalSynthesizerConfig) -> Self {
        match CliSpeechBackend::detect(cfg) {
            Some(backend) => SpeechCapability::Supported(Arc::new(backend)),
            None => {
                warn!(target: "fallback_tts", "No local speech engine detected (Piper/espeak-ng missing)");
                SpeechCapability::Unsupported
            }
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, SpeechCapability::Supported(_))
    }
}

impl std::fmt::Debug for SpeechCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechCapability::Supported(b) => f.debug_tuple("Supported").field(&b.name()).finish(),
            SpeechCapability::Unsupported => f.write_str("Unsupported"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesizerState {
    Idle,
    Speaking,
}

/// Counts a playback as active until dropped
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(active))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Network-free speech used when the remote provider is not an option
#[derive(Clone)]
pub struct LocalSynthesizer {
    capability: SpeechCapability,
    active: Arc<AtomicUsize>,
    // Bumped by stop(); every active speak() watches it
    stop_epoch: Arc<watch::Sender<u64>>,
}

impl LocalSynthesizer {
    pub fn new(capability: SpeechCapability) -> Self {
        let (stop_epoch, _) = watch::channel(0u64);
        Self {
            capability,
            active: Arc::new(AtomicUsize::new(0)),
            stop_epoch: Arc::new(stop_epoch),
        }
    }

    /// Detect the host engine from env and PATH
    pub fn detect() -> Self {
        Self::new(SpeechCapability::detect(LocalSynthesizerConfig::default()))
    }

    pub fn capability(&self) -> &SpeechCapability {
        &self.capability
    }

    pub fn is_supported(&self) -> bool {
        self.capability.is_supported()
    }

    /// Voices the local engine offers; empty when unsupported
    pub async fn get_voices(&self) -> Result<Vec<PlatformVoice>> {
        match &self.capability {
            SpeechCapability::Supported(backend) => backend.voices().await,
            SpeechCapability::Unsupported => Ok(Vec::new()),
        }
    }

    /// Speak `text`, resolving when playback ends or `stop()` is called.
    ///
    /// Fails with `synthesis-unavailable` when the host has no engine, or with
    /// the engine's error code if playback fails.
    pub async fn speak(&self, text: &str, options: Option<SpeakOptions>) -> Result<()> {
        let backend = match &self.capability {
            SpeechCapability::Supported(backend) => Arc::clone(backend),
            SpeechCapability::Unsupported => {
                return Err(ChefError::synthesis(
                    SynthesisErrorCode::SynthesisUnavailable,
                    "no speech engine available on this host",
                ));
            }
        };
        if text.trim().is_empty() {
            return Ok(());
        }
        let opts = options.unwrap_or_default().normalized();

        let mut stop_rx = self.stop_epoch.subscribe();
        let _active = ActiveGuard::enter(&self.active);
        info!(
            target: "fallback_tts",
            engine = backend.name(),
            chars = text.chars().count(),
            "Speaking through local engine"
        );

        tokio::select! {
            res = backend.speak(text, &opts) => {
                match &res {
                    Ok(()) => debug!(target: "fallback_tts", "Local speech finished"),
                    Err(e) => warn!(target: "fallback_tts", error = %e, "Local speech failed"),
                }
                res
            }
            _ = stop_rx.changed() => {
                info!(target: "fallback_tts", "Local speech stopped");
                Ok(())
            }
        }
    }

    /// Cancel any in-progress playback; no-op when idle
    pub fn stop(&self) {
        if self.is_speaking() {
            debug!(target: "fallback_tts", "Stopping local speech");
        }
        self.stop_epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }

    pub fn is_speaking(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }

    pub fn state(&self) -> SynthesizerState {
        if self.is_speaking() {
            SynthesizerState::Speaking
        } else {
            SynthesizerState::Idle
        }
    }
}

impl std::fmt::Debug for LocalSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSynthesizer")
            .field("capability", &self.capability)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_clamped() {
        let opts = SpeakOptions {
            rate: 5.0,
            pitch: 0.1,
            volume: f32::NAN,
            voice: None,
        }
        .normalized();
        assert_eq!(opts.rate, 2.0);
        assert_eq!(opts.pitch, 0.5);
        assert_eq!(opts.volume, 1.0);

        let quiet = SpeakOptions {
            volume: 0.2,
            ..SpeakOptions::default()
        }
        .normalized();
        assert_eq!(quiet.volume, 0.2);
    }

    #[test]
    fn unsupported_starts_idle() {
        let synth = LocalSynthesizer::new(SpeechCapability::Unsupported);
        assert!(!synth.is_supported());
        assert_eq!(synth.state(), SynthesizerState::Idle);
        synth.stop();
        assert!(!synth.is_speaking());
    }
}
