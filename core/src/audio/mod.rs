// Local audio: fallback speech synthesis and playback of remote audio

mod fallback;
mod player;
pub mod tts;

// Shared audio utilities
pub(crate) mod utils;

pub use fallback::{
    LocalSynthesizer, PlatformVoice, SpeakOptions, SpeechBackend, SpeechCapability,
    SynthesizerState,
};
pub use player::{AudioPlayer, ENCODED_PLAYERS, WAV_PLAYERS};
pub use tts::{parse_espeak_voices, CliSpeechBackend, Engine, LocalSynthesizerConfig};
