// AI Chef Core Library
// Voice synthesis clients and local speech fallback

pub mod audio;
pub mod telemetry;
pub mod voice;

// Export core types
pub use audio::{
    AudioPlayer, CliSpeechBackend, LocalSynthesizer, LocalSynthesizerConfig, PlatformVoice,
    SpeakOptions, SpeechBackend, SpeechCapability, SynthesizerState,
};
pub use voice::{
    OpenAiSpeechClient, OpenAiSpeechConfig, SpeechProvider, SynthesisRequest, VoiceClient,
    VoiceClientConfig, VoiceDescriptor, VoiceSettings,
};

// Error types
use thiserror::Error;

/// Platform speech error codes, named after the Web Speech API error strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorCode {
    /// No speech engine on this host
    SynthesisUnavailable,
    /// The engine ran but failed to produce or play audio
    SynthesisFailed,
    /// The engine is held by another process
    AudioBusy,
    /// No audio output could be opened
    AudioHardware,
    InvalidArgument,
    Interrupted,
}

impl SynthesisErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisErrorCode::SynthesisUnavailable => "synthesis-unavailable",
            SynthesisErrorCode::SynthesisFailed => "synthesis-failed",
            SynthesisErrorCode::AudioBusy => "audio-busy",
            SynthesisErrorCode::AudioHardware => "audio-hardware",
            SynthesisErrorCode::InvalidArgument => "invalid-argument",
            SynthesisErrorCode::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for SynthesisErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ChefError {
    /// Network-level failure reaching an upstream (DNS, refused, timeout)
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("HTTP error! status: {status}, message: {body}")]
    Provider { status: u16, body: String },

    /// Local speech capability unsupported or failed mid-playback
    #[error("Speech synthesis error ({code}): {message}")]
    Synthesis {
        code: SynthesisErrorCode,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChefError {
    pub(crate) fn synthesis(code: SynthesisErrorCode, message: impl Into<String>) -> Self {
        ChefError::Synthesis {
            code,
            message: message.into(),
        }
    }

    /// Status code carried by a provider error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ChefError::Provider { status, .. } => Some(*status),
            ChefError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Platform error code carried by a synthesis error, if any
    pub fn synthesis_code(&self) -> Option<SynthesisErrorCode> {
        match self {
            ChefError::Synthesis { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChefError>;
