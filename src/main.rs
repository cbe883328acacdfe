//! Entry point for the `livebot` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

use livebot::bundle::locate_root;
use livebot::constants::ContextConstants;
use livebot::live::{CommandDefinition, OptionDefinition, Reply, Snapshot};
use livebot::{Bot, BotSettings, DiscordRest};

#[derive(Debug, Parser)]
#[command(name = "livebot", version, about = "Live-configured chat bot tooling")]
struct Cli {
    /// Settings file; `livebot.toml` is used when present otherwise.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download the bundle, load it and register its commands.
    Sync,
    /// Load an extracted bundle and print what it defines.
    Check {
        /// Extraction directory (or the bundle folder inside it).
        dir: PathBuf,
    },
    /// Render one interaction with date constants and print its payload.
    Render {
        dir: PathBuf,
        /// Interaction id, e.g. `verification/welcome`.
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();

    let Cli { config, command } = Cli::parse();
    match command {
        Commands::Sync => sync(config.as_deref()).await,
        Commands::Check { dir } => check(&dir),
        Commands::Render { dir, id } => render(&dir, &id),
    }
}

async fn sync(config: Option<&Path>) -> anyhow::Result<()> {
    let settings = BotSettings::load(config).context("failed to load settings")?;
    let platform = DiscordRest::new(&settings.discord.token, settings.discord.application_id);
    let bot = Bot::builder()
        .with_settings(settings)
        .with_platform(Arc::new(platform))
        .build()?;

    let snapshot = bot.reload().await?;
    let commands = bot.command_definitions(&snapshot);
    println!(
        "synced bundle v{}: {} commands registered",
        snapshot.version,
        commands.len()
    );
    Ok(())
}

fn load(dir: &Path) -> anyhow::Result<Snapshot> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    Ok(Snapshot::load(&locate_root(dir, None), 1))
}

fn check(dir: &Path) -> anyhow::Result<()> {
    let snapshot = load(dir)?;

    println!("constants: {}", snapshot.constants.tree().len());
    println!("commands: {}", snapshot.commands.len());
    for command in snapshot.commands.definitions() {
        println!("  /{} {}", command.name, command.description);
    }
    println!("interactions: {}", snapshot.interactions.len());
    for id in snapshot.interactions.ids() {
        println!("  {id}");
    }
    println!("triggers: {}", snapshot.triggers.len());

    let missing: Vec<&str> = snapshot
        .commands
        .definitions()
        .iter()
        .flat_map(reply_ids)
        .filter(|id| snapshot.interactions.get(id).is_none())
        .collect();
    for id in &missing {
        println!("warning: reply references unknown interaction '{id}'");
    }

    if let Some(verification) = snapshot.config.verification() {
        match verification.initial_interaction() {
            Some(id) if snapshot.interactions.get(id).is_none() => {
                println!("warning: welcome interaction '{id}' not found");
            }
            None if verification.enabled => {
                println!("warning: verification enabled without an initial interaction");
            }
            _ => {}
        }
    }
    Ok(())
}

/// Interaction ids referenced by a command and its subcommands.
fn reply_ids(command: &CommandDefinition) -> Vec<&str> {
    fn walk<'a>(options: &'a [OptionDefinition], out: &mut Vec<&'a str>) {
        for option in options {
            if let Some(Reply::Interaction(id)) = &option.reply {
                out.push(id);
            }
            walk(&option.options, out);
        }
    }

    let mut ids = Vec::new();
    if let Some(Reply::Interaction(id)) = &command.reply {
        ids.push(id.as_str());
    }
    walk(&command.options, &mut ids);
    ids
}

fn render(dir: &Path, id: &str) -> anyhow::Result<()> {
    let snapshot = load(dir)?;
    let Some(definition) = snapshot.interactions.get(id) else {
        bail!("no interaction with id '{id}'");
    };
    let rendered = definition
        .render(&ContextConstants::build(&()))
        .with_context(|| format!("failed to render '{id}'"))?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
