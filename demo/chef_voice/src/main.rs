mod config;

use chef_core::telemetry::init_tracing;
use chef_core::{
    AudioPlayer, LocalSynthesizer, OpenAiSpeechClient, SpeechCapability, SpeechProvider,
    VoiceClient,
};
use clap::{Parser, Subcommand, ValueEnum};
use config::ChefVoiceConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "chef-voice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Speak recipe text through the AI Chef proxy, with a local fallback")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize text remotely and play it, or speak it locally if that fails
    Speak {
        text: String,

        /// Remote voice id (defaults to the configured voice)
        #[arg(long, value_name = "ID")]
        voice: Option<String>,

        /// Write remote audio to FILE instead of playing it
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Provider::Elevenlabs)]
        provider: Provider,

        /// Skip the remote provider
        #[arg(long)]
        local_only: bool,
    },
    /// List remote voices
    Voices,
    /// Show provider settings for a voice
    Settings {
        #[arg(value_name = "VOICE_ID")]
        voice_id: String,
    },
    /// List voices of the local engine
    LocalVoices,
    /// Check that the proxy and provider answer
    Check,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Provider {
    Elevenlabs,
    Openai,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing("info,chef_voice=info,chef_core=info");
    let cli = Cli::parse();
    let cfg = ChefVoiceConfig::load();

    let result = match cli.command {
        Command::Speak {
            text,
            voice,
            out,
            provider,
            local_only,
        } => speak(&cfg, &text, voice.as_deref(), out, provider, local_only).await,
        Command::Voices => list_voices(&cfg).await,
        Command::Settings { voice_id } => show_settings(&cfg, &voice_id).await,
        Command::LocalVoices => list_local_voices(&cfg).await,
        Command::Check => check(&cfg).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "chef_voice", error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn remote_provider(cfg: &ChefVoiceConfig, provider: Provider) -> CliResult<Box<dyn SpeechProvider>> {
    let client: Box<dyn SpeechProvider> = match provider {
        Provider::Elevenlabs => Box::new(VoiceClient::new(cfg.voice.clone())?),
        Provider::Openai => Box::new(OpenAiSpeechClient::new(cfg.openai.clone())?),
    };
    Ok(client)
}

async fn speak(
    cfg: &ChefVoiceConfig,
    text: &str,
    voice: Option<&str>,
    out: Option<PathBuf>,
    provider: Provider,
    local_only: bool,
) -> CliResult<()> {
    if !local_only {
        match speak_remote(cfg, text, voice, out.as_ref(), provider).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(target: "chef_voice", error = %e, "Remote speech failed; using local engine")
            }
        }
    }
    speak_local(cfg, text).await
}

async fn speak_remote(
    cfg: &ChefVoiceConfig,
    text: &str,
    voice: Option<&str>,
    out: Option<&PathBuf>,
    provider: Provider,
) -> CliResult<()> {
    let client = remote_provider(cfg, provider)?;
    let audio = client.synthesize(text, voice).await?;
    info!(target: "chef_voice", provider = client.name(), bytes = audio.len(), "Remote audio ready");

    match out {
        Some(path) => {
            tokio::fs::write(path, &audio).await?;
            println!("Wrote {} bytes to {}", audio.len(), path.display());
        }
        None => {
            let player = AudioPlayer::new(cfg.audio.temp_dir.clone(), cfg.audio.player.clone());
            player.play(&audio, "mp3").await?;
        }
    }
    Ok(())
}

async fn speak_local(cfg: &ChefVoiceConfig, text: &str) -> CliResult<()> {
    let local = LocalSynthesizer::new(SpeechCapability::detect(cfg.local.clone()));

    // Ctrl-C stops playback instead of killing the process mid-file
    let stopper = local.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });
    let result = local.speak(text, Some(cfg.speak.clone())).await;
    ctrl_c.abort();
    result?;
    Ok(())
}

async fn list_voices(cfg: &ChefVoiceConfig) -> CliResult<()> {
    let client = VoiceClient::new(cfg.voice.clone())?;
    for v in client.get_voices().await? {
        println!(
            "{}\t{}\t{}",
            v.voice_id().unwrap_or("-"),
            v.name().unwrap_or("-"),
            v.category().unwrap_or("-")
        );
    }
    Ok(())
}

async fn show_settings(cfg: &ChefVoiceConfig, voice_id: &str) -> CliResult<()> {
    let client = VoiceClient::new(cfg.voice.clone())?;
    let settings = client.get_voice_settings(voice_id).await?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

async fn list_local_voices(cfg: &ChefVoiceConfig) -> CliResult<()> {
    let local = LocalSynthesizer::new(SpeechCapability::detect(cfg.local.clone()));
    if !local.is_supported() {
        println!("No local speech engine available");
        return Ok(());
    }
    for v in local.get_voices().await? {
        println!(
            "{}\t{}\t{}",
            v.name,
            v.language.as_deref().unwrap_or("-"),
            v.engine
        );
    }
    Ok(())
}

async fn check(cfg: &ChefVoiceConfig) -> CliResult<()> {
    let client = VoiceClient::new(cfg.voice.clone())?;
    if client.test_connection().await {
        println!("Connection to {} OK", cfg.voice.base_url);
        Ok(())
    } else {
        Err(format!("cannot reach voices through {}", cfg.voice.base_url).into())
    }
}
