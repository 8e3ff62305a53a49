use chef_core::voice::{DEFAULT_MODEL_ID, DEFAULT_VOICE_ID};
use chef_core::{OpenAiSpeechConfig, VoiceClientConfig};
use serial_test::serial;

const KEYS: &[&str] = &[
    "CHEF_API_BASE_URL",
    "ELEVENLABS_VOICE_ID",
    "ELEVENLABS_MODEL_ID",
    "CHEF_REQUEST_TIMEOUT_MS",
    "OPENAI_TTS_VOICE",
    "OPENAI_TTS_MODEL",
];

fn clear_env() {
    for k in KEYS {
        std::env::remove_var(k);
    }
}

#[test]
#[serial]
fn voice_config_defaults_without_env() {
    clear_env();
    let cfg = VoiceClientConfig::from_env();
    assert_eq!(cfg.base_url, "http://localhost:1031");
    assert_eq!(cfg.path_prefix, "/api/elevenlabs");
    assert_eq!(cfg.default_voice_id, DEFAULT_VOICE_ID);
    assert_eq!(cfg.model_id, DEFAULT_MODEL_ID);
    assert_eq!(cfg.stability, 0.5);
    assert_eq!(cfg.similarity_boost, 0.75);
    assert_eq!(cfg.request_timeout_ms, None);
}

#[test]
#[serial]
fn voice_config_reads_env_overrides() {
    clear_env();
    std::env::set_var("CHEF_API_BASE_URL", "http://127.0.0.1:9999");
    std::env::set_var("ELEVENLABS_VOICE_ID", "custom-voice");
    std::env::set_var("CHEF_REQUEST_TIMEOUT_MS", "1500");
    let cfg = VoiceClientConfig::from_env();
    assert_eq!(cfg.base_url, "http://127.0.0.1:9999");
    assert_eq!(cfg.default_voice_id, "custom-voice");
    assert_eq!(cfg.model_id, DEFAULT_MODEL_ID);
    assert_eq!(cfg.request_timeout_ms, Some(1500));
    clear_env();
}

#[test]
#[serial]
fn blank_or_bad_env_values_are_ignored() {
    clear_env();
    std::env::set_var("ELEVENLABS_VOICE_ID", "   ");
    std::env::set_var("CHEF_REQUEST_TIMEOUT_MS", "soon");
    let cfg = VoiceClientConfig::from_env();
    assert_eq!(cfg.default_voice_id, DEFAULT_VOICE_ID);
    assert_eq!(cfg.request_timeout_ms, None);
    clear_env();
}

#[test]
#[serial]
fn openai_config_reads_env_overrides() {
    clear_env();
    std::env::set_var("OPENAI_TTS_VOICE", "nova");
    let cfg = OpenAiSpeechConfig::from_env();
    assert_eq!(cfg.default_voice, "nova");
    assert_eq!(cfg.model, "tts-1");
    assert_eq!(cfg.path_prefix, "/api/openai");
    clear_env();
}
