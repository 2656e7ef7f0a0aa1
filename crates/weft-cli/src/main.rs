// ABOUTME: Entry point for the weft binary.
// ABOUTME: Dispatches to replay, init, and version subcommands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use weft_cli::{replay, ReplayOptions, Transcript};
use weft_core::Config;
use weft_proto::Consent;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Replay agent stream events through the weft turn reducer")]
#[command(version)]
struct Cli {
    /// Log to weft.log in the config directory instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a file of newline-delimited JSON envelopes ("-" reads stdin)
    Replay {
        /// Recorded envelopes, one JSON object per line
        file: PathBuf,

        /// Send this message before replaying
        #[arg(long)]
        send: Option<String>,

        /// Context entry attached to the sent message (repeatable)
        #[arg(long, requires = "send")]
        context: Vec<String>,

        /// Cancel the turn after this many envelopes
        #[arg(long)]
        cancel_after: Option<usize>,

        /// Grant every approval request
        #[arg(long, conflicts_with = "deny")]
        approve: bool,

        /// Deny every approval request
        #[arg(long)]
        deny: bool,

        /// Print the final state and commands as JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(short, long, env = "WEFT_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Write the default config file
    Init,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.log_file {
        weft_log::init_file(&Config::config_dir(), "weft");
    } else {
        weft_log::init();
    }

    match cli.command {
        Commands::Replay {
            file,
            send,
            context,
            cancel_after,
            approve,
            deny,
            json,
            config,
        } => {
            let consent = if approve {
                Some(Consent::Granted)
            } else if deny {
                Some(Consent::Denied)
            } else {
                None
            };
            let options = ReplayOptions {
                send,
                context,
                cancel_after,
                consent,
            };
            run_replay(&file, config.as_deref(), &options, json).await
        }
        Commands::Init => run_init(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn run_replay(
    file: &Path,
    config_path: Option<&Path>,
    options: &ReplayOptions,
    json: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let script = read_script(file)?;
    let outcome = replay(&config, &script, options).await?;

    if json {
        let output = serde_json::json!({
            "commands": outcome.commands,
            "state": outcome.state.view(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for command in &outcome.commands {
        println!("-> {}", serde_json::to_string(command)?);
    }
    if !outcome.commands.is_empty() {
        println!();
    }
    print!("{}", Transcript(&outcome.state));
    Ok(())
}

fn read_script(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut script = String::new();
        std::io::stdin()
            .read_to_string(&mut script)
            .context("Failed to read envelopes from stdin")?;
        return Ok(script);
    }
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read envelopes from {}", file.display()))
}

fn run_init() -> Result<()> {
    let path = Config::init()?;
    println!("Config: {}", path.display());
    Ok(())
}

fn print_version() {
    println!("weft {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Component versions:");
    println!("  weft-cli:   {}", env!("CARGO_PKG_VERSION"));
    println!("  weft-core:  (linked)");
    println!("  weft-proto: (linked)");
}
