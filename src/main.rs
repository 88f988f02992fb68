use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_assets::{Asset, AssetManager, AssetStore, Color, Settings};
use log::{error, info, warn};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// deck-assets - Inspect and override named colors and icons
#[derive(Parser, Debug)]
#[command(name = "deck-assets")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0", global = true)]
    debug: u8,

    /// Override document to use instead of the one in the config directory
    #[arg(long = "overrides", value_name = "FILE", global = true)]
    overrides: Option<PathBuf>,

    /// JSON document with base colors and icons to register before running the command
    #[arg(long = "defaults", value_name = "FILE", global = true)]
    defaults: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every color and icon, marking overridden ones
    List,
    /// Override a color (e.g., set-color accent "#ff8000" or ff800080)
    SetColor {
        name: String,
        #[arg(value_name = "RRGGBB[AA]", value_parser = parse_color)]
        color: Color,
        /// Store the override even if no default color has that name
        #[arg(long)]
        force: bool,
    },
    /// Override an icon with an image file
    SetIcon {
        name: String,
        path: PathBuf,
        /// Store the override even if no default icon has that name
        #[arg(long)]
        force: bool,
    },
    /// Remove a color override
    ResetColor { name: String },
    /// Remove an icon override
    ResetIcon { name: String },
    /// Print base and override layers as JSON
    Export,
}

/// Parse a hex color string into a Color
fn parse_color(s: &str) -> Result<Color, String> {
    Color::from_hex(s).ok_or_else(|| format!("Expected #rrggbb or #rrggbbaa, got: {}", s))
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting deck-assets v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load().unwrap_or_else(|e| {
        warn!("Failed to load settings, using defaults: {:#}", e);
        Settings::default()
    });
    if let Some(path) = cli.overrides {
        settings = settings.with_overrides_path(path);
    }

    let mut manager = AssetManager::open(settings)?;
    if let Some(path) = &cli.defaults {
        let defaults = read_defaults(path)?;
        let added = manager.register_defaults(&defaults);
        info!("Registered {} defaults from {:?}", added, path);
    }

    match cli.command {
        Command::List => list(&manager),
        Command::SetColor { name, color, force } => {
            report(
                manager.set_color_override(&name, color, force),
                &format!("color '{}' set to {}", name, color.to_hex()),
            );
        }
        Command::SetIcon { name, path, force } => {
            if !path.is_file() {
                warn!("{:?} is not a file", path);
            }
            report(
                manager.set_icon_override(&name, &path, force),
                &format!("icon '{}' set to {}", name, path.display()),
            );
        }
        Command::ResetColor { name } => report(
            manager.remove_color_override(&name),
            &format!("color '{}' reset", name),
        ),
        Command::ResetIcon { name } => report(
            manager.remove_icon_override(&name),
            &format!("icon '{}' reset", name),
        ),
        Command::Export => {
            let export = json!({
                manager.color_store().save_key(): layers(manager.color_store()),
                manager.icon_store().save_key(): layers(manager.icon_store()),
            });
            println!("{}", serde_json::to_string_pretty(&export)?);
        }
    }

    Ok(())
}

fn read_defaults(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read defaults {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse defaults {}", path.display()))
}

fn report(changed: bool, message: &str) {
    if changed {
        println!("{}", message);
    } else {
        eprintln!("No change: {}", message);
    }
}

fn layers<A: Asset>(store: &AssetStore<A>) -> Value {
    json!({
        "assets": store.export_json(),
        "overrides": store.override_json(),
    })
}

fn list(manager: &AssetManager) {
    let colors = manager.color_store();
    let mut names: Vec<&str> = colors.get_assets_merged().into_keys().collect();
    names.sort_unstable();
    println!("Colors:");
    for name in names {
        let marker = if colors.has_override(name) { " *" } else { "" };
        println!("  {:<24} {}{}", name, manager.get_color(name).to_hex(), marker);
    }

    let icons = manager.icon_store();
    let mut names: Vec<&str> = icons.get_assets_merged().into_keys().collect();
    names.sort_unstable();
    println!("Icons:");
    for name in names {
        let marker = if icons.has_override(name) { " *" } else { "" };
        if let Some(icon) = manager.get_icon(name) {
            println!("  {:<24} {}{}", name, icon.path().display(), marker);
        }
    }

    let stale: Vec<&str> = colors
        .stale_overrides()
        .into_iter()
        .chain(icons.stale_overrides())
        .collect();
    if !stale.is_empty() {
        println!("Overrides without a default: {}", stale.join(", "));
    }
}
