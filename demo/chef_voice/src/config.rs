use std::fs;
use std::path::{Path, PathBuf};

use chef_core::{LocalSynthesizerConfig, OpenAiSpeechConfig, SpeakOptions, VoiceClientConfig};

/// Configuration for the chef-voice demo
#[derive(Clone, Debug)]
pub struct ChefVoiceConfig {
    pub voice: VoiceClientConfig,
    pub openai: OpenAiSpeechConfig,
    pub local: LocalSynthesizerConfig,
    /// Options used whenever speech falls back to the local engine
    pub speak: SpeakOptions,
    pub audio: AudioConfig,
}

/// Playback of remote audio
#[derive(Clone, Debug)]
pub struct AudioConfig {
    pub player: Option<String>,
    pub temp_dir: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            player: std::env::var("TTS_PLAYER").ok().filter(|s| !s.is_empty()),
            temp_dir: std::env::var("TTS_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
        }
    }
}

impl Default for ChefVoiceConfig {
    fn default() -> Self {
        // Module defaults already consider env vars
        Self {
            voice: VoiceClientConfig::from_env(),
            openai: OpenAiSpeechConfig::from_env(),
            local: LocalSynthesizerConfig::default(),
            speak: SpeakOptions::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl ChefVoiceConfig {
    /// Load from a TOML file (path via CHEF_VOICE_CONFIG or ./chef_voice.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("CHEF_VOICE_CONFIG").unwrap_or_else(|_| "chef_voice.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::debug!(target: "chef_voice", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::from_toml_str(&s, default.clone()) {
                Ok(cfg) => {
                    tracing::info!(target: "chef_voice", path = %path, "Loaded TOML config");
                    cfg
                }
                Err(e) => {
                    tracing::warn!(target: "chef_voice", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "chef_voice", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    pub fn from_toml_str(raw: &str, base: Self) -> Result<Self, toml::de::Error> {
        let t: ChefVoiceToml = toml::from_str(raw)?;
        Ok(t.overlay(base))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ChefVoiceToml {
    pub voice: Option<VoiceToml>,
    pub openai: Option<OpenAiToml>,
    pub local: Option<LocalToml>,
    pub audio: Option<AudioToml>,
}

impl ChefVoiceToml {
    fn overlay(self, mut base: ChefVoiceConfig) -> ChefVoiceConfig {
        if let Some(v) = self.voice {
            v.apply(&mut base.voice);
        }
        if let Some(o) = self.openai {
            o.apply(&mut base.openai);
        }
        if let Some(l) = self.local {
            l.apply(&mut base.local, &mut base.speak);
        }
        if let Some(a) = self.audio {
            a.apply(&mut base.audio);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct VoiceToml {
    pub base_url: Option<String>,
    pub path_prefix: Option<String>,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub stability: Option<f64>,
    pub similarity_boost: Option<f64>,
    pub request_timeout_ms: Option<u64>,
}
impl VoiceToml {
    fn apply(self, v: &mut VoiceClientConfig) {
        if let Some(x) = self.base_url {
            v.base_url = x;
        }
        if let Some(x) = self.path_prefix {
            v.path_prefix = x;
        }
        if let Some(x) = self.voice_id {
            v.default_voice_id = x;
        }
        if let Some(x) = self.model_id {
            v.model_id = x;
        }
        if let Some(x) = self.stability {
            v.stability = x;
        }
        if let Some(x) = self.similarity_boost {
            v.similarity_boost = x;
        }
        if let Some(x) = self.request_timeout_ms {
            v.request_timeout_ms = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct OpenAiToml {
    pub base_url: Option<String>,
    pub voice: Option<String>,
    pub model: Option<String>,
}
impl OpenAiToml {
    fn apply(self, o: &mut OpenAiSpeechConfig) {
        if let Some(x) = self.base_url {
            o.base_url = x;
        }
        if let Some(x) = self.voice {
            o.default_voice = x;
        }
        if let Some(x) = self.model {
            o.model = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct LocalToml {
    pub voice: Option<String>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub piper_voice: Option<PathBuf>,
    pub player: Option<String>,
}
impl LocalToml {
    fn apply(self, l: &mut LocalSynthesizerConfig, s: &mut SpeakOptions) {
        if let Some(x) = self.voice {
            s.voice = Some(x);
        }
        if let Some(x) = self.rate {
            s.rate = x;
        }
        if let Some(x) = self.pitch {
            s.pitch = x;
        }
        if let Some(x) = self.volume {
            s.volume = x;
        }
        if let Some(x) = self.piper_voice {
            l.piper_voice = Some(x);
        }
        if let Some(x) = self.player {
            l.player = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AudioToml {
    pub player: Option<String>,
    pub temp_dir: Option<PathBuf>,
}
impl AudioToml {
    fn apply(self, a: &mut AudioConfig) {
        if let Some(x) = self.player {
            a.player = Some(x);
        }
        if let Some(x) = self.temp_dir {
            a.temp_dir = x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ChefVoiceConfig {
        ChefVoiceConfig {
            voice: VoiceClientConfig::default(),
            openai: OpenAiSpeechConfig::default(),
            local: LocalSynthesizerConfig::empty(),
            speak: SpeakOptions::default(),
            audio: AudioConfig {
                player: None,
                temp_dir: std::env::temp_dir(),
            },
        }
    }

    #[test]
    fn overlay_replaces_only_given_fields() {
        let raw = r#"
            [voice]
            base_url = "http://127.0.0.1:9000"
            voice_id = "chef"

            [local]
            rate = 1.25
            voice = "ru"

            [audio]
            player = "mpg123"
        "#;
        let cfg = ChefVoiceConfig::from_toml_str(raw, base()).unwrap();
        assert_eq!(cfg.voice.base_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.voice.default_voice_id, "chef");
        assert_eq!(cfg.voice.model_id, "eleven_multilingual_v2");
        assert_eq!(cfg.speak.rate, 1.25);
        assert_eq!(cfg.speak.voice.as_deref(), Some("ru"));
        assert_eq!(cfg.speak.pitch, 1.0);
        assert_eq!(cfg.audio.player.as_deref(), Some("mpg123"));
        assert_eq!(cfg.openai.default_voice, "alloy");
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(ChefVoiceConfig::from_toml_str("[voice\nbase_url = 1", base()).is_err());
    }
}
