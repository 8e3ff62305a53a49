use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{error, info};

use super::client::{build_http, ensure_success, env_non_empty, Endpoint};
use super::provider::SpeechProvider;
use crate::{ChefError, Result};

#[derive(Debug, Clone)]
pub struct OpenAiSpeechConfig {
    pub base_url: String,
    pub path_prefix: String,
    pub default_voice: String,
    pub model: String,
    pub request_timeout_ms: Option<u64>,
}

impl Default for OpenAiSpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1031".to_string(),
            path_prefix: "/api/openai".to_string(),
            default_voice: "alloy".to_string(),
            model: "tts-1".to_string(),
            request_timeout_ms: None,
        }
    }
}

impl OpenAiSpeechConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_non_empty("CHEF_API_BASE_URL").unwrap_or(d.base_url),
            default_voice: env_non_empty("OPENAI_TTS_VOICE").unwrap_or(d.default_voice),
            model: env_non_empty("OPENAI_TTS_MODEL").unwrap_or(d.model),
            request_timeout_ms: std::env::var("CHEF_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .or(d.request_timeout_ms),
            ..d
        }
    }
}

#[derive(Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    voice: &'a str,
    model: &'a str,
}

/// Speech through the backend's OpenAI TTS endpoint (`POST <prefix>/tts`)
#[derive(Clone)]
pub struct OpenAiSpeechClient {
    http: Client,
    endpoint: Endpoint,
    cfg: OpenAiSpeechConfig,
}

impl OpenAiSpeechClient {
    pub fn new(cfg: OpenAiSpeechConfig) -> Result<Self> {
        let http = build_http(cfg.request_timeout_ms)?;
        let endpoint = Endpoint::new(&cfg.base_url, &cfg.path_prefix)?;
        Ok(Self {
            http,
            endpoint,
            cfg,
        })
    }

    pub async fn speech(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(ChefError::InvalidRequest("text must not be empty".into()));
        }
        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.cfg.default_voice);
        let url = self.endpoint.url(&["tts"])?;
        info!(
            target: "voice_client",
            url = %url,
            voice,
            chars = text.chars().count(),
            "Sending OpenAI speech request"
        );

        let body = TtsBody {
            text,
            voice,
            model: &self.cfg.model,
        };
        let resp = self
            .http
            .post(url)
            .header(header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(target: "voice_client", error = %e, "OpenAI speech request failed");
                ChefError::Transport(e)
            })?;
        let resp = ensure_success("openai", resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        self.speech(text, voice).await
    }
}
