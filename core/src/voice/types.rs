use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::VoiceClientConfig;
use crate::{ChefError, Result};

/// Voice settings sent with a synthesis call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestVoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
}

/// Body of `POST /text-to-speech/<voiceId>`
///
/// Built per call and never mutated; `voice_id` travels in the path, not the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    #[serde(skip)]
    voice_id: String,
    text: String,
    model_id: String,
    voice_settings: RequestVoiceSettings,
}

impl SynthesisRequest {
    /// Build a request from client defaults, validating text and settings
    pub fn new(text: &str, voice_id: Option<&str>, cfg: &VoiceClientConfig) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(ChefError::InvalidRequest("text must not be empty".into()));
        }
        let voice_id = voice_id
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&cfg.default_voice_id);
        if voice_id.is_empty() {
            return Err(ChefError::InvalidRequest("voice id must not be empty".into()));
        }
        let settings = RequestVoiceSettings {
            stability: cfg.stability,
            similarity_boost: cfg.similarity_boost,
        };
        for (name, v) in [
            ("stability", settings.stability),
            ("similarity_boost", settings.similarity_boost),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ChefError::InvalidRequest(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }
        Ok(Self {
            voice_id: voice_id.to_string(),
            text: text.to_string(),
            model_id: cfg.model_id.clone(),
            voice_settings: settings,
        })
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn voice_settings(&self) -> RequestVoiceSettings {
        self.voice_settings
    }
}

/// Metadata for one selectable provider voice.
///
/// Holds the provider's JSON object as received, so it serializes back
/// unchanged. Accessors read the fields callers usually need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceDescriptor(Map<String, Value>);

impl VoiceDescriptor {
    pub fn voice_id(&self) -> Option<&str> {
        self.0.get("voice_id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn category(&self) -> Option<&str> {
        self.0.get("category").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Provider-side voice configuration, read-only and kept as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceSettings(Map<String, Value>);

impl VoiceSettings {
    pub fn stability(&self) -> Option<f64> {
        self.0.get("stability").and_then(Value::as_f64)
    }

    pub fn similarity_boost(&self) -> Option<f64> {
        self.0.get("similarity_boost").and_then(Value::as_f64)
    }

    pub fn style(&self) -> Option<f64> {
        self.0.get("style").and_then(Value::as_f64)
    }

    pub fn use_speaker_boost(&self) -> Option<bool> {
        self.0.get("use_speaker_boost").and_then(Value::as_bool)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// `GET /voices` response envelope; a missing or null `voices` is empty
#[derive(Debug, Default, Deserialize)]
pub(crate) struct VoicesEnvelope {
    #[serde(default)]
    voices: Option<Vec<VoiceDescriptor>>,
}

impl VoicesEnvelope {
    pub(crate) fn into_voices(self) -> Vec<VoiceDescriptor> {
        self.voices.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_has_exact_shape() {
        let cfg = VoiceClientConfig::default();
        let req = SynthesisRequest::new("Привет, это тестовый текст", Some("test-voice-id"), &cfg)
            .unwrap();
        assert_eq!(req.voice_id(), "test-voice-id");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "text": "Привет, это тестовый текст",
                "model_id": "eleven_multilingual_v2",
                "voice_settings": {"stability": 0.5, "similarity_boost": 0.75}
            })
        );
    }

    #[test]
    fn missing_voice_uses_default() {
        let cfg = VoiceClientConfig::default();
        let req = SynthesisRequest::new("hello", None, &cfg).unwrap();
        assert_eq!(req.voice_id(), "JBFqnCBsd6RMkjVDRZzb");
        let blank = SynthesisRequest::new("hello", Some("  "), &cfg).unwrap();
        assert_eq!(blank.voice_id(), "JBFqnCBsd6RMkjVDRZzb");
    }

    #[test]
    fn rejects_blank_text() {
        let cfg = VoiceClientConfig::default();
        let err = SynthesisRequest::new("   ", None, &cfg).unwrap_err();
        assert!(matches!(err, ChefError::InvalidRequest(_)));
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let cfg = VoiceClientConfig {
            stability: 1.5,
            ..VoiceClientConfig::default()
        };
        let err = SynthesisRequest::new("hi", None, &cfg).unwrap_err();
        assert!(err.to_string().contains("stability"));
    }

    #[test]
    fn descriptor_keeps_fields_and_nulls() {
        let raw = json!({
            "voice_id": "voice1",
            "name": "Test Voice 1",
            "category": null,
            "labels": {"accent": "american"},
            "preview_url": null
        });
        let d: VoiceDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(d.voice_id(), Some("voice1"));
        assert_eq!(d.category(), None);
        assert_eq!(serde_json::to_value(&d).unwrap(), raw);
    }

    #[test]
    fn descriptor_without_name_is_accepted() {
        let raw = json!({"voice_id": "v2"});
        let d: VoiceDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(d.name(), None);
        assert_eq!(serde_json::to_value(&d).unwrap(), raw);
    }

    #[test]
    fn null_or_missing_voices_is_empty() {
        let null: VoicesEnvelope = serde_json::from_value(json!({"voices": null})).unwrap();
        assert!(null.into_voices().is_empty());
        let missing: VoicesEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(missing.into_voices().is_empty());
    }

    #[test]
    fn settings_keep_integers_and_nulls() {
        let raw = json!({
            "stability": 1,
            "similarity_boost": 0,
            "style": null,
            "use_speaker_boost": true
        });
        let s: VoiceSettings = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(s.stability(), Some(1.0));
        assert_eq!(s.style(), None);
        assert_eq!(serde_json::to_value(&s).unwrap(), raw);

        let partial: VoiceSettings = serde_json::from_value(json!({"style": 0.3})).unwrap();
        assert_eq!(partial.stability(), None);
    }
}
