//! Remote voice synthesis
//!
//! This module provides:
//! - `VoiceClientConfig`, `VoiceClient` for the ElevenLabs API behind the local proxy
//!   (`/api/elevenlabs/text-to-speech/<id>`, `/voices`, `/voices/<id>/settings`)
//! - `OpenAiSpeechClient` for the backend's `/api/openai/tts` endpoint
//! - `SpeechProvider`, the seam callers use to swap one remote engine for another
//!
//! Errors surface unchanged to the caller: `ChefError::Transport` when the request
//! never got an answer, `ChefError::Provider` when it got a non-success status.

mod client;
mod openai;
mod provider;
mod types;

pub use client::{VoiceClient, VoiceClientConfig, DEFAULT_MODEL_ID, DEFAULT_VOICE_ID};
pub use openai::{OpenAiSpeechClient, OpenAiSpeechConfig};
pub use provider::SpeechProvider;
pub use types::{RequestVoiceSettings, SynthesisRequest, VoiceDescriptor, VoiceSettings};
