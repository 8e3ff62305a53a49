use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::provider::SpeechProvider;
use super::types::{SynthesisRequest, VoiceDescriptor, VoiceSettings, VoicesEnvelope};
use crate::{ChefError, Result};

pub const DEFAULT_VOICE_ID: &str = "JBFqnCBsd6RMkjVDRZzb";
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Configuration for the ElevenLabs client.
///
/// The client talks to the local proxy, which owns the API key; nothing
/// secret lives here.
#[derive(Debug, Clone)]
pub struct VoiceClientConfig {
    pub base_url: String,    // e.g., http://localhost:1031
    pub path_prefix: String, // e.g., /api/elevenlabs
    pub default_voice_id: String,
    pub model_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
    /// No timeout unless set; callers own their deadline otherwise
    pub request_timeout_ms: Option<u64>,
}

impl Default for VoiceClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1031".to_string(),
            path_prefix: "/api/elevenlabs".to_string(),
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            request_timeout_ms: None,
        }
    }
}

impl VoiceClientConfig {
    /// Defaults overlaid with `CHEF_API_BASE_URL`, `ELEVENLABS_VOICE_ID`,
    /// `ELEVENLABS_MODEL_ID` and `CHEF_REQUEST_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_non_empty("CHEF_API_BASE_URL").unwrap_or(d.base_url),
            default_voice_id: env_non_empty("ELEVENLABS_VOICE_ID").unwrap_or(d.default_voice_id),
            model_id: env_non_empty("ELEVENLABS_MODEL_ID").unwrap_or(d.model_id),
            request_timeout_ms: std::env::var("CHEF_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .or(d.request_timeout_ms),
            ..d
        }
    }
}

pub(crate) fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Base URL plus fixed path prefix, with segment-safe joining
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    base: Url,
    prefix: Vec<String>,
}

impl Endpoint {
    pub(crate) fn new(base_url: &str, prefix: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ChefError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ChefError::Config(format!(
                "base URL {base_url:?} cannot carry a path"
            )));
        }
        let prefix = prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { base, prefix })
    }

    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ChefError::Config(format!("base URL {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(self.prefix.iter().map(String::as_str))
            .extend(segments.iter().copied());
        Ok(url)
    }
}

pub(crate) fn build_http(request_timeout_ms: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(ms) = request_timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    builder
        .build()
        .map_err(|e| ChefError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Turn a non-success response into `ChefError::Provider`, keeping the body text
pub(crate) async fn ensure_success(
    target: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    error!(target: "voice_client", provider = target, %status, body = %body, "Provider returned error status");
    Err(ChefError::Provider {
        status: status.as_u16(),
        body,
    })
}

/// Client for the ElevenLabs text-to-speech API, reached through the proxy.
///
/// No retries and no caching: every call is exactly one HTTP request.
#[derive(Clone)]
pub struct VoiceClient {
    http: Client,
    endpoint: Endpoint,
    cfg: VoiceClientConfig,
}

impl VoiceClient {
    pub fn new(cfg: VoiceClientConfig) -> Result<Self> {
        let http = build_http(cfg.request_timeout_ms)?;
        let endpoint = Endpoint::new(&cfg.base_url, &cfg.path_prefix)?;
        Ok(Self {
            http,
            endpoint,
            cfg,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(VoiceClientConfig::from_env())
    }

    pub fn config(&self) -> &VoiceClientConfig {
        &self.cfg
    }

    /// Synthesize `text` and return the raw audio bytes.
    ///
    /// `voice_id` falls back to the configured default voice.
    pub async fn synthesize_speech(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>> {
        let request = SynthesisRequest::new(text, voice_id, &self.cfg)?;
        self.synthesize(&request).await
    }

    /// Send a prepared request
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let url = self.endpoint.url(&["text-to-speech", request.voice_id()])?;
        info!(
            target: "voice_client",
            url = %url,
            voice_id = request.voice_id(),
            chars = request.text().chars().count(),
            "Sending text-to-speech request"
        );

        let resp = self
            .http
            .post(url)
            .header(header::ACCEPT, "audio/mpeg")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(target: "voice_client", error = %e, "Text-to-speech request failed");
                ChefError::Transport(e)
            })?;
        debug!(target: "voice_client", status = %resp.status(), "Text-to-speech response");

        let resp = ensure_success("elevenlabs", resp).await?;
        let audio = resp.bytes().await?.to_vec();
        info!(target: "voice_client", bytes = audio.len(), "Received audio");
        Ok(audio)
    }

    /// List the voices available to the account
    pub async fn get_voices(&self) -> Result<Vec<VoiceDescriptor>> {
        let url = self.endpoint.url(&["voices"])?;
        let envelope: VoicesEnvelope = self.get_json(url).await?;
        let voices = envelope.into_voices();
        debug!(target: "voice_client", count = voices.len(), "Fetched voices");
        Ok(voices)
    }

    /// Provider-side settings for one voice
    pub async fn get_voice_settings(&self, voice_id: &str) -> Result<VoiceSettings> {
        let url = self.endpoint.url(&["voices", voice_id, "settings"])?;
        self.get_json(url).await
    }

    /// Full provider record for one voice, as returned
    pub async fn get_voice_info(&self, voice_id: &str) -> Result<serde_json::Value> {
        let url = self.endpoint.url(&["voices", voice_id])?;
        self.get_json(url).await
    }

    /// Check the proxy and key by listing voices; never errors
    pub async fn test_connection(&self) -> bool {
        match self.get_voices().await {
            Ok(voices) => {
                info!(target: "voice_client", voices = voices.len(), "Provider connection works");
                true
            }
            Err(e) => {
                warn!(target: "voice_client", error = %e, "Provider connection failed");
                false
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(target: "voice_client", url = %url, "GET");
        let resp = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(target: "voice_client", error = %e, "Request failed");
                ChefError::Transport(e)
            })?;
        let resp = ensure_success("elevenlabs", resp).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SpeechProvider for VoiceClient {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        self.synthesize_speech(text, voice).await
    }
}
