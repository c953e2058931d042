mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;

use craftwatch_logs::{EventPipeline, LineClassifier, LogWatcher, SessionTracker, TailReader};
use craftwatch_rcon::{
    DEFAULT_ANNOUNCE_COLOR, RconClient, sanitize_command, say_command, tellraw_command,
};
use craftwatch_sink::{DryRunSink, EventSink, NotionSink, SinkDispatcher};

use crate::config::{Config, ConfigOverrides};

/// How long in-flight record writes get after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Craftwatch - turns a Minecraft server log into play sessions and deaths
#[derive(Parser, Debug)]
#[command(name = "craftwatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Tail the server log and record sessions and deaths (default)
    Watch,
    /// Show who is online
    List,
    /// Broadcast a chat message
    Say {
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Broadcast a colored message to every player
    Announce {
        #[arg(long, default_value = DEFAULT_ANNOUNCE_COLOR)]
        color: String,
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Run a console command and print the reply
    Command {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("craftwatch=info".parse::<Directive>()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply(&args.overrides);

    match args.command.unwrap_or(Cmd::Watch) {
        Cmd::Watch => watch(&config).await,
        Cmd::List => {
            let mut client = connect(&config).await?;
            let players = client.list_players().await?;
            client.disconnect().await?;
            println!("{}", serde_json::to_string_pretty(&players)?);
            Ok(())
        }
        Cmd::Say { message } => console(&config, say_command(&message.join(" "))?).await,
        Cmd::Announce { color, message } => {
            console(&config, tellraw_command(&message.join(" "), &color)?).await
        }
        Cmd::Command { command } => console(&config, command_text(&command)?).await,
    }
}

/// Free-form command text, checked before connecting. `send_command` strips
/// the one leading `/`.
fn command_text(words: &[String]) -> Result<String> {
    let command = words.join(" ");
    sanitize_command(&command)?;
    Ok(command)
}

async fn watch(config: &Config) -> Result<()> {
    let sink: Arc<dyn EventSink> = if config.dry_run {
        info!("dry run, records are only logged");
        Arc::new(DryRunSink)
    } else {
        let Some(notion) = config.notion_config() else {
            bail!(
                "Notion is not configured; set NOTION_API_KEY, NOTION_SESSIONS_DB_ID and \
                 NOTION_DEATHS_DB_ID or pass --dry-run"
            );
        };
        Arc::new(NotionSink::new(notion)?)
    };

    let reader = TailReader::open(&config.log_path, config.truncation.into())
        .with_context(|| format!("Cannot watch {}", config.log_path.display()))?;
    info!(path = %config.log_path.display(), offset = reader.offset(), "watching server log");

    let dispatcher = SinkDispatcher::new(sink, config.sink_timeout());
    let pipeline = EventPipeline::new(
        LineClassifier::new(),
        SessionTracker::new(config.session_date),
        dispatcher,
    );
    let watcher = LogWatcher::new(reader, pipeline, config.poll_interval());

    let cancel = CancellationToken::new();
    let mut task = tokio::spawn(watcher.run(cancel.clone()));

    let joined = tokio::select! {
        joined = &mut task => joined,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("shutting down");
            cancel.cancel();
            task.await
        }
    };
    let pipeline = joined.context("Watch task panicked")??;

    let dispatcher = pipeline.dispatcher();
    if !dispatcher.shutdown(SHUTDOWN_GRACE).await {
        warn!(in_flight = dispatcher.in_flight(), "gave up on unfinished record writes");
    }

    let sink = dispatcher.stats().snapshot();
    info!(
        persisted = sink.persisted,
        failed = sink.failed,
        timed_out = sink.timed_out,
        open_sessions = pipeline.sessions().open_count(),
        online = ?pipeline.sessions().players(),
        "stopped"
    );
    Ok(())
}

async fn connect(config: &Config) -> Result<RconClient> {
    let rcon = config.rcon_config()?;
    RconClient::connect(&rcon)
        .await
        .with_context(|| format!("Failed to reach RCON at {}:{}", rcon.host, rcon.port))
}

/// Run one console command and print the reply as JSON
async fn console(config: &Config, command: String) -> Result<()> {
    let mut client = connect(config).await?;
    let response = client.send_command(&command).await?;
    client.disconnect().await?;
    println!("{}", serde_json::to_string_pretty(&json!({ "response": response }))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_shape() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_watch() {
        let args = Args::try_parse_from(["craftwatch", "--dry-run"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.overrides.dry_run);
    }

    #[test]
    fn test_command_keeps_its_words() {
        let args = Args::try_parse_from(["craftwatch", "command", "/time", "set", "day"]).unwrap();
        match args.command {
            Some(Cmd::Command { command }) => assert_eq!(command.join(" "), "/time set day"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_command_text_is_not_stripped_early() {
        let words = vec!["//wand".to_string()];
        assert_eq!(command_text(&words).unwrap(), "//wand");

        let words = vec!["/time".to_string(), "set".to_string(), "day".to_string()];
        assert_eq!(command_text(&words).unwrap(), "/time set day");

        assert!(command_text(&["/".to_string()]).is_err());
        assert!(command_text(&[" ".to_string()]).is_err());
    }

    #[test]
    fn test_announce_color() {
        let args =
            Args::try_parse_from(["craftwatch", "announce", "--color", "red", "restart", "soon"])
                .unwrap();
        match args.command {
            Some(Cmd::Announce { color, message }) => {
                assert_eq!(color, "red");
                assert_eq!(message, vec!["restart", "soon"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
