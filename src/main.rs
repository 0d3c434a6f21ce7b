use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, warn};

use tierchat::ports::ModelResolver;
use tierchat::{AppController, Backend, Session, StartupOptions};

#[derive(Debug, Parser)]
#[command(name = "tierchat", version, about = "Hardware-aware voice and text assistant")]
struct CliArgs {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend override: auto, cuda, openvino, cpu_legacy, cpu, openai.
    /// Also accepted after a subcommand, e.g. `resolve chat --backend openvino`
    #[arg(long, global = true, value_name = "BACKEND")]
    backend: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the hardware profile and the selected backend as JSON
    Probe,
    /// Print the model artifact a name resolves to for the text backend
    Resolve {
        /// Model name or path
        name: String,
    },
    /// Transcribe a WAV file
    Transcribe {
        /// Audio file
        audio: PathBuf,
    },
    /// Interactive conversation on stdin
    Chat {
        /// Read a WAV path per turn and transcribe it
        #[arg(long)]
        voice: bool,
    },
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let controller = AppController::new(StartupOptions {
        config_path: args.config.clone(),
        backend: args.backend.clone(),
        log_level: args.log_level.clone(),
    })
    .context("Failed to initialize")?;

    debug!(?args, "Arguments");

    match args.command {
        Commands::Probe => probe(&controller),
        Commands::Resolve { name } => resolve(&controller, &name),
        Commands::Transcribe { audio } => transcribe(&controller, &audio),
        Commands::Chat { voice } => chat(&controller, voice),
    }
}

fn probe(controller: &AppController) -> Result<()> {
    let report = serde_json::json!({
        "profile": controller.profile(),
        "active_backend": controller.active_backend(),
        "text_backend": controller.text_backend(),
        "config_path": controller.config_path(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn resolve(controller: &AppController, name: &str) -> Result<()> {
    let backend: Backend = controller.text_backend();
    let path = controller.resolver().resolve(name, backend);
    println!("{}", path.display());
    Ok(())
}

fn transcribe(controller: &AppController, audio: &Path) -> Result<()> {
    let asr = controller
        .create_asr()
        .context("Failed to create speech provider")?;
    let text = asr
        .transcribe(audio)
        .with_context(|| format!("Failed to transcribe {}", audio.display()))?;
    println!("{}", text);
    Ok(())
}

const HELP: &str = "Commands: quit, clear, help. Anything else is sent to the assistant.";

fn chat(controller: &AppController, voice: bool) -> Result<()> {
    let mut session = controller
        .start_session(voice)
        .context("Failed to start session")?;

    let prompt = if voice { "wav> " } else { "you> " };
    eprintln!("{}", HELP);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("{}", prompt);
        io::stderr().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                eprintln!("{}", HELP);
                continue;
            }
            "clear" => {
                session.clear().context("Failed to clear history")?;
                eprintln!("History cleared.");
                continue;
            }
            _ => {}
        }

        let user_text = if voice {
            match heard(&session, Path::new(input)) {
                Some(text) => text,
                None => continue,
            }
        } else {
            input.to_string()
        };

        match session.respond(&user_text) {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                error!(error = %e, "Turn failed");
                eprintln!("(no reply: {})", e);
            }
        }
    }

    Ok(())
}

/// Transcribe one voice turn; `None` skips the turn.
fn heard(session: &Session, audio: &Path) -> Option<String> {
    match session.listen(audio) {
        Ok(Some(text)) => {
            eprintln!("heard: {}", text);
            Some(text)
        }
        Ok(None) => {
            eprintln!("(nothing heard)");
            None
        }
        Err(e) => {
            warn!(error = %e, path = ?audio, "Transcription failed");
            eprintln!("(transcription failed: {})", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_resolve_accepts_backend_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["tierchat", "resolve", "chat", "--backend", "openvino"]).unwrap();
        assert_eq!(args.backend.as_deref(), Some("openvino"));
        assert!(matches!(args.command, Commands::Resolve { ref name } if name == "chat"));

        let args = CliArgs::try_parse_from(["tierchat", "--backend", "cpu", "resolve", "chat"]).unwrap();
        assert_eq!(args.backend.as_deref(), Some("cpu"));
    }

    #[test]
    fn test_resolve_without_backend_uses_configured_preference() {
        let args = CliArgs::try_parse_from(["tierchat", "resolve", "chat"]).unwrap();
        assert!(args.backend.is_none());
    }
}
