//! Audio playback through whatever command-line player the host has.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::utils::gen_id;
use crate::{ChefError, Result, SynthesisErrorCode};

/// Players tried for encoded (MP3) audio, in order
pub const ENCODED_PLAYERS: &[&str] = &["ffplay", "mpg123", "paplay", "aplay"];
/// Players tried for WAV output, in order
pub const WAV_PLAYERS: &[&str] = &["aplay", "paplay", "ffplay"];

pub(crate) fn find_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    find_in_path(default_bin)
}

pub(crate) fn find_in_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

/// Preferred player if installed, otherwise the first installed candidate
pub(crate) fn select_player(pref: Option<&str>, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(p) = pref.and_then(find_in_path) {
        return Some(p);
    }
    candidates.iter().find_map(|name| find_in_path(name))
}

pub(crate) fn player_command(player_bin: &Path, file: &Path) -> Command {
    let name = player_bin
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let mut cmd = Command::new(player_bin);
    match name {
        "ffplay" => {
            cmd.args(["-autoexit", "-nodisp", "-loglevel", "error"]);
        }
        "mpg123" | "aplay" => {
            cmd.arg("-q");
        }
        _ => {}
    }
    cmd.arg(file);
    cmd.kill_on_drop(true);
    cmd
}

/// Run a player to completion; killed if the future is dropped
pub(crate) async fn play_file(player_bin: &Path, file: &Path) -> Result<()> {
    let mut cmd = player_command(player_bin, file);
    debug!(target: "audio_player", command = ?cmd, "Running player");
    let output = cmd.output().await.map_err(|e| {
        ChefError::synthesis(
            SynthesisErrorCode::AudioHardware,
            format!("failed to start {}: {e}", player_bin.display()),
        )
    })?;
    if !output.status.success() {
        return Err(ChefError::synthesis(
            SynthesisErrorCode::AudioHardware,
            format!(
                "{} exited with {}: {}",
                player_bin.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    Ok(())
}

/// Temp file removed when dropped, including on cancelled playback
pub(crate) struct TempAudio(PathBuf);

impl TempAudio {
    pub(crate) fn new(dir: &Path, ext: &str) -> Self {
        Self(dir.join(format!("chef_tts_{}.{}", gen_id(), ext)))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(target: "audio_player", path = ?self.0, error = %e, "Failed to remove temp audio");
            }
        }
    }
}

/// Plays audio bytes returned by a remote provider
#[derive(Debug, Clone)]
pub struct AudioPlayer {
    temp_dir: PathBuf,
    preferred: Option<String>,
}

impl AudioPlayer {
    pub fn new(temp_dir: PathBuf, preferred: Option<String>) -> Self {
        Self {
            temp_dir,
            preferred,
        }
    }

    /// Temp dir from `TTS_TEMP_DIR`, player preference from `TTS_PLAYER`
    pub fn from_env() -> Self {
        let temp_dir = std::env::var("TTS_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let preferred = std::env::var("TTS_PLAYER").ok().filter(|s| !s.is_empty());
        Self::new(temp_dir, preferred)
    }

    /// Installed player that would be used, if any
    pub fn player(&self) -> Option<PathBuf> {
        select_player(self.preferred.as_deref(), ENCODED_PLAYERS)
    }

    pub fn is_available(&self) -> bool {
        self.player().is_some()
    }

    /// Write `audio` to a temp file with extension `ext` and play it to the end
    pub async fn play(&self, audio: &[u8], ext: &str) -> Result<()> {
        if audio.is_empty() {
            return Err(ChefError::synthesis(
                SynthesisErrorCode::InvalidArgument,
                "audio buffer is empty",
            ));
        }
        let player = self.player().ok_or_else(|| {
            ChefError::synthesis(
                SynthesisErrorCode::AudioHardware,
                format!("no audio player found (tried {})", ENCODED_PLAYERS.join(", ")),
            )
        })?;
        let file = TempAudio::new(&self.temp_dir, ext);
        tokio::fs::write(file.path(), audio).await?;
        info!(
            target: "audio_player",
            player = ?player,
            bytes = audio.len(),
            "Playing audio"
        );
        play_file(&player, file.path()).await
    }
}
