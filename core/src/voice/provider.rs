use async_trait::async_trait;

use crate::Result;

/// A remote text-to-speech backend that turns text into encoded audio
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesizes `text` and returns the audio bytes (usually MP3).
    /// `voice` falls back to the provider's default voice.
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>>;

    /// Provider name (e.g., "elevenlabs", "openai")
    fn name(&self) -> &'static str;
}
