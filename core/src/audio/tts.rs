//! Local text-to-speech through command-line engines
//!
//! Engines, in order of preference:
//! - Piper (higher quality, requires a voice model), played from a WAV temp file
//! - espeak-ng (widely available), plays directly
//!
//! Env overrides:
//! - PIPER_BIN, PIPER_VOICE, PIPER_VOICE_DIR
//! - ESPEAK_BIN
//! - TTS_TEMP_DIR, TTS_PLAYER
//!
//! Every child process is spawned with `kill_on_drop`, so dropping a `speak`
//! future silences the engine and the player.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::fallback::{PlatformVoice, SpeakOptions, SpeechBackend};
use super::player::{
    find_from_env_or_path, find_in_path, play_file, select_player, TempAudio, WAV_PLAYERS,
};
use crate::{ChefError, Result, SynthesisErrorCode};

#[derive(Clone, Debug)]
pub struct LocalSynthesizerConfig {
    pub temp_dir: PathBuf,
    pub default_sample_rate: u32,
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub piper_voice_dir: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    /// Preferred WAV player name (aplay|paplay|ffplay)
    pub player: Option<String>,
}

impl Default for LocalSynthesizerConfig {
    fn default() -> Self {
        let temp_dir = std::env::var("TTS_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let piper_bin = find_from_env_or_path("PIPER_BIN", "piper");
        let piper_voice = std::env::var("PIPER_VOICE").ok().map(PathBuf::from);
        let piper_voice_dir = std::env::var("PIPER_VOICE_DIR").ok().map(PathBuf::from);
        let espeak_bin =
            find_from_env_or_path("ESPEAK_BIN", "espeak-ng").or_else(|| find_in_path("espeak"));
        let player = std::env::var("TTS_PLAYER").ok().filter(|s| !s.is_empty());

        Self {
            temp_dir,
            default_sample_rate: 22_050,
            piper_bin,
            piper_voice,
            piper_voice_dir,
            espeak_bin,
            player,
        }
    }
}

impl LocalSynthesizerConfig {
    /// Config with no engines; nothing is looked up
    pub fn empty() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            default_sample_rate: 22_050,
            piper_bin: None,
            piper_voice: None,
            piper_voice_dir: None,
            espeak_bin: None,
            player: None,
        }
    }

    fn piper_usable(&self) -> bool {
        self.piper_bin.is_some() && (self.piper_voice.is_some() || self.piper_voice_dir.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Piper,
    EspeakNg,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Piper => "piper",
            Engine::EspeakNg => "espeak-ng",
        }
    }
}

/// `SpeechBackend` over Piper or espeak-ng
#[derive(Debug, Clone)]
pub struct CliSpeechBackend {
    engine: Engine,
    cfg: LocalSynthesizerConfig,
}

impl CliSpeechBackend {
    /// Pick Piper when it has a voice model, else espeak-ng, else nothing
    pub fn detect(cfg: LocalSynthesizerConfig) -> Option<Self> {
        let engine = if cfg.piper_usable() {
            Engine::Piper
        } else if cfg.espeak_bin.is_some() {
            Engine::EspeakNg
        } else {
            if cfg.piper_bin.is_some() {
                warn!(target: "fallback_tts", "Piper found but no voice model configured (PIPER_VOICE / PIPER_VOICE_DIR)");
            }
            return None;
        };
        info!(target: "fallback_tts", engine = engine.as_str(), "Detected local speech engine");
        Some(Self { engine, cfg })
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    async fn speak_espeak(&self, text: &str, opts: &SpeakOptions) -> Result<()> {
        let espeak = self.cfg.espeak_bin.as_ref().ok_or_else(|| {
            ChefError::synthesis(SynthesisErrorCode::SynthesisUnavailable, "espeak-ng not found")
        })?;
        let mut cmd = Command::new(espeak);
        cmd.args(espeak_args(opts));
        run_with_stdin(cmd, text, "espeak-ng").await
    }

    async fn speak_piper(&self, text: &str, opts: &SpeakOptions) -> Result<()> {
        let piper = self.cfg.piper_bin.as_ref().ok_or_else(|| {
            ChefError::synthesis(SynthesisErrorCode::SynthesisUnavailable, "Piper binary not found")
        })?;
        let voice_path =
            resolve_piper_voice_path(&self.cfg, opts.voice.as_deref().unwrap_or_default())
                .ok_or_else(|| {
                    ChefError::synthesis(
                        SynthesisErrorCode::InvalidArgument,
                        "Piper voice not found; set PIPER_VOICE or pass a voice",
                    )
                })?;
        let player = select_player(self.cfg.player.as_deref(), WAV_PLAYERS).ok_or_else(|| {
            ChefError::synthesis(
                SynthesisErrorCode::AudioHardware,
                format!("no WAV player found (tried {})", WAV_PLAYERS.join(", ")),
            )
        })?;

        let wav = TempAudio::new(&self.cfg.temp_dir, "wav");
        let mut cmd = Command::new(piper);
        cmd.arg("-m").arg(&voice_path);
        cmd.arg("-f").arg(wav.path());
        let length_scale = (1.0f32 / opts.rate).clamp(0.5, 2.0);
        cmd.arg("--length_scale").arg(format!("{:.2}", length_scale));
        cmd.arg("--sample_rate")
            .arg(self.cfg.default_sample_rate.to_string());
        run_with_stdin(cmd, text, "piper").await?;

        // Piper has no gain flag; scale the samples instead
        if (opts.volume - 1.0).abs() > f32::EPSILON {
            let path = wav.path().to_path_buf();
            let gain = opts.volume;
            let scaled = tokio::task::spawn_blocking(move || scale_wav_pcm16_inplace(&path, gain))
                .await
                .map_err(|e| ChefError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            if let Err(e) = scaled {
                warn!(target: "fallback_tts", error = %e, "Failed to scale volume for WAV");
            }
        }

        play_file(&player, wav.path()).await
    }

    async fn espeak_voices(&self) -> Result<Vec<PlatformVoice>> {
        let Some(espeak) = self.cfg.espeak_bin.as_ref() else {
            return Ok(Vec::new());
        };
        let output = Command::new(espeak)
            .arg("--voices")
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(ChefError::synthesis(
                SynthesisErrorCode::SynthesisFailed,
                format!(
                    "espeak-ng --voices failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(parse_espeak_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn piper_voices(&self) -> Result<Vec<PlatformVoice>> {
        let mut voices = Vec::new();
        if let Some(v) = &self.cfg.piper_voice {
            voices.extend(piper_voice_from_path(v));
        }
        if let Some(dir) = &self.cfg.piper_voice_dir {
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
                    voices.extend(piper_voice_from_path(&path));
                }
            }
        }
        voices.sort_by(|a, b| a.name.cmp(&b.name));
        voices.dedup_by(|a, b| a.name == b.name);
        Ok(voices)
    }
}

#[async_trait]
impl SpeechBackend for CliSpeechBackend {
    fn name(&self) -> &'static str {
        self.engine.as_str()
    }

    async fn voices(&self) -> Result<Vec<PlatformVoice>> {
        match self.engine {
            Engine::Piper => self.piper_voices().await,
            Engine::EspeakNg => self.espeak_voices().await,
        }
    }

    async fn speak(&self, text: &str, opts: &SpeakOptions) -> Result<()> {
        match self.engine {
            Engine::Piper => self.speak_piper(text, opts).await,
            Engine::EspeakNg => self.speak_espeak(text, opts).await,
        }
    }
}

/// Feed `text` on stdin and wait; the child dies if this future is dropped
async fn run_with_stdin(mut cmd: Command, text: &str, engine: &str) -> Result<()> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(target: "fallback_tts", command = ?cmd, "Running {}", engine);

    let mut child = cmd.spawn().map_err(|e| {
        let code = if e.kind() == std::io::ErrorKind::NotFound {
            SynthesisErrorCode::SynthesisUnavailable
        } else {
            SynthesisErrorCode::SynthesisFailed
        };
        ChefError::synthesis(code, format!("failed to start {engine}: {e}"))
    })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await?;
    }
    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(ChefError::synthesis(
            SynthesisErrorCode::SynthesisFailed,
            format!(
                "{engine} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    Ok(())
}

fn espeak_args(opts: &SpeakOptions) -> Vec<String> {
    let wpm = (175.0 * opts.rate).round().clamp(80.0, 450.0) as i32;
    let amp = (100.0 * opts.volume).round().clamp(0.0, 200.0) as i32;
    let pitch = (50.0 * opts.pitch).round().clamp(0.0, 99.0) as i32;
    let mut args = Vec::new();
    if let Some(voice) = opts.voice.as_deref().filter(|v| !v.is_empty()) {
        args.push("-v".to_string());
        args.push(voice.to_string());
    }
    args.extend([
        "-s".to_string(),
        wpm.to_string(),
        "-a".to_string(),
        amp.to_string(),
        "-p".to_string(),
        pitch.to_string(),
        "--stdin".to_string(),
    ]);
    args
}

fn resolve_piper_voice_path(cfg: &LocalSynthesizerConfig, voice: &str) -> Option<PathBuf> {
    if !voice.is_empty() {
        let vh = PathBuf::from(voice);
        if vh.exists() {
            return Some(vh);
        }
        if let Some(dir) = &cfg.piper_voice_dir {
            let candidate = dir.join(voice);
            if candidate.exists() {
                return Some(candidate);
            }
            let with_ext = dir.join(format!("{}.onnx", voice));
            if with_ext.exists() {
                return Some(with_ext);
            }
        }
    }
    cfg.piper_voice.clone()
}

fn piper_voice_from_path(path: &Path) -> Option<PlatformVoice> {
    let stem = path.file_stem()?.to_str()?.to_string();
    // Piper models are named like en_US-lessac-medium
    let language = stem
        .split('-')
        .next()
        .filter(|l| l.contains('_'))
        .map(str::to_string);
    Some(PlatformVoice {
        name: stem,
        language,
        engine: Engine::Piper.as_str().to_string(),
    })
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// The voice name is the language column, which is what `-v` accepts.
pub fn parse_espeak_voices(output: &str) -> Vec<PlatformVoice> {
    output
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 5 {
                return None;
            }
            Some(PlatformVoice {
                name: cols[1].to_string(),
                language: Some(cols[1].to_string()),
                engine: Engine::EspeakNg.as_str().to_string(),
            })
        })
        .collect()
}

fn scale_wav_pcm16_inplace(path: &Path, gain: f32) -> std::io::Result<()> {
    let mut buf = std::fs::read(path)?;
    if buf.len() < 12 || &buf[0..4] != b"RIFF" || &buf[8..12] != b"WAVE" {
        return Ok(());
    }
    let mut idx = 12;
    let mut data = None;
    while idx + 8 <= buf.len() {
        let chunk_id = &buf[idx..idx + 4];
        let sz =
            u32::from_le_bytes([buf[idx + 4], buf[idx + 5], buf[idx + 6], buf[idx + 7]]) as usize;
        if chunk_id == b"data" {
            let start = idx + 8;
            data = Some((start, (start + sz).min(buf.len())));
            break;
        }
        idx += 8 + sz;
    }
    if let Some((start, end)) = data {
        for chunk in buf[start..end].chunks_exact_mut(2) {
            let s = i16::from_le_bytes([chunk[0], chunk[1]]);
            let scaled = (s as f32 * gain).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            chunk.copy_from_slice(&scaled.to_le_bytes());
        }
        std::fs::write(path, &buf)?;
    }
    Ok(())
}
