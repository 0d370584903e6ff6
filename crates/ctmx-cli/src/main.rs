//! 🚀 ctmx: the front door.
//!
//! 🎬 *[narrator voice]* "It all started when Control-M called a shell script..."
//!
//! ```text
//! ctmx alert call_type: I alert_id: 1234 data_center: psctm ... message: Ended not OK
//! ctmx alert --dry-run --style pairs call_type I alert_id 1234
//! ctmx replay captured-alerts.jsonl
//! ```
//!
//! Loads config, sets up logging, hands off to the library, and prints `Message: ...`
//! on stdout for the alert script to pick up. Logs go to stderr or the configured log file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 🔧 Where we look for config when `--config` isn't given.
const DEFAULT_CONFIG_FILE: &str = "ctmx.toml";

#[derive(Debug, Parser)]
#[command(name = "ctmx", version, about = "Control-M alerts to ITSM incidents, BHOM events and files")]
struct Cli {
    /// TOML config file (default: ./ctmx.toml when present). CTMX_* env vars are merged underneath.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process one alert, passed exactly as Control-M passes it
    Alert {
        /// Run the pipeline but keep every sink in memory
        #[arg(long)]
        dry_run: bool,
        /// How to read the alert arguments
        #[arg(long, value_enum, default_value_t = StyleArg::Auto)]
        style: StyleArg,
        /// The alert itself: `key: value ...` tokens or `key value key value` pairs
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1..)]
        args: Vec<String>,
    },
    /// Replay a capture file, one JSON alert per line
    Replay {
        file: PathBuf,
        #[arg(long)]
        dry_run: bool,
        /// Skip the progress bar (it still logs)
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StyleArg {
    Auto,
    Tokens,
    Pairs,
}

impl From<StyleArg> for ctmx::ArgStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Auto => ctmx::ArgStyle::Auto,
            StyleArg::Tokens => ctmx::ArgStyle::Tokens,
            StyleArg::Pairs => ctmx::ArgStyle::Pairs,
        }
    }
}

/// 📡 stderr by default. A configured log file (appended to) replaces it. If the file can't
/// be opened we say so on stderr and keep going there.
fn init_tracing(log_file: Option<&Path>) {
    let opened = log_file.map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| (path.to_path_buf(), err))
    });

    match opened {
        Some(Ok(file)) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Some(Err((path, err))) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
            warn!("⚠️ Log file '{}' could not be opened ({}), logging to stderr", path.display(), err);
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let exists = path.try_exists().with_context(|| {
                format!(
                    "💀 Couldn't check whether the config file exists. Maybe a permissions thing, maybe a \
                     relative path from a surprising working directory. Was checking here: '{}'",
                    path.display()
                )
            })?;
            if !exists {
                anyhow::bail!("💀 Config file '{}' does not exist. Double check the path.", path.display());
            }
            Ok(Some(path))
        }
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            Ok(fallback.is_file().then_some(fallback))
        }
    }
}

async fn run(command: Command, config: ctmx::AppConfig) -> Result<()> {
    match command {
        Command::Alert { dry_run, style, args } => {
            let outcome = ctmx::run_alert(&config, &args, style.into(), dry_run).await?;
            for failure in &outcome.failures {
                warn!("⚠️ {}", failure);
            }
            println!("Message: {}", outcome.message);
        }
        Command::Replay {
            file,
            dry_run,
            no_progress,
        } => {
            let summary = ctmx::run_replay(config, &file, dry_run, !no_progress).await?;
            println!("{}", summary.render());
            info!(
                "🏁 Replay done: {} clean, {} with problems",
                summary.processed(),
                summary.failed()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = config_path(cli.config).and_then(|path| {
        ctmx::app_config::load_config(path.as_deref())
            .context("💀 In ctmx, main, we couldn't load the config. Take a look at the file and the CTMX_* env vars.")
    });
    init_tracing(config.as_ref().ok().and_then(|c| c.logging.file.as_deref()));

    let result = match config {
        Ok(config) => run(cli.command, config).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        error!("💀 error: {}", err);
        eprintln!("Error: {err:#}");
        // -- 🧅 peel the onion, one layer at a time, sniffing for connection problems
        let mut looks_like_connectivity = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                looks_like_connectivity = true;
            }
        }

        if looks_like_connectivity {
            error!(
                "🔧 hint: looks like a service isn't reachable. Check that the Control-M Automation API, \
                 ITSM or BHOM endpoint in your config is up and reachable from this host \
                 (firewall, proxy, port). Even servers need a nudge sometimes. ☕"
            );
        }

        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert_args(argv: &[&str]) -> (Vec<String>, StyleArg) {
        let cli = Cli::try_parse_from(argv).expect("💀 the documented usage should parse");
        match cli.command {
            Command::Alert { args, style, .. } => (args, style),
            other => panic!("💀 expected an alert, got {other:?}"),
        }
    }

    #[test]
    fn the_one_where_pairs_are_key_then_value() {
        let (args, style) = alert_args(&[
            "ctmx", "alert", "--dry-run", "--style", "pairs", "call_type", "I", "alert_id", "1234",
        ]);

        let raw = ctmx::alerts::parse_alert_args(&args, style.into());
        assert_eq!(raw.get("call_type"), Some("I"));
        assert_eq!(raw.get("alert_id"), Some("1234"));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn the_one_where_tokens_keep_their_spaces() {
        let (args, style) = alert_args(&[
            "ctmx", "alert", "call_type:", "I", "alert_id:", "1234", "message:", "Ended", "not", "OK",
        ]);

        let raw = ctmx::alerts::parse_alert_args(&args, style.into());
        assert_eq!(raw.get("alert_id"), Some("1234"));
        assert_eq!(raw.get("message"), Some("Ended not OK"));
    }
}
