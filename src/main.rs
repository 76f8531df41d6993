use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use sprite_bingo::{
    common::ColorRGB,
    helpers::parse_hex_color,
    message::Message,
    persist::{load_global_config, save_global_config},
    pipeline,
    state::{get_global_config_path, ConfigOverrides, RunConfig},
};

#[derive(Parser)]
#[command(name = "sprite_bingo")]
#[command(about = "Recolor sprite sheets for 8x16 tile hardware and build their palettes")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Args, Debug)]
struct Settings {
    /// Folder with the source PNG sprite sheets
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Folder the results are written to
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Go-to colors as comma-separated hex RGB (e.g. "#ffffff,#ff0000")
    #[arg(long, global = true, value_delimiter = ',', value_parser = parse_color)]
    colors: Option<Vec<ColorRGB>>,

    /// Number of go-to colors (padded from presets or truncated)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=32))]
    count: Option<u8>,

    /// Number of palettes the hardware can hold
    #[arg(long, global = true)]
    palette_limit: Option<usize>,

    /// Settings file (defaults to config.json in the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Remember the resolved settings in the settings file
    #[arg(long, global = true)]
    save_config: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Step 1: recolor all sprites and export remixes
    Recolor,
    /// Step 2: build hardware palettes for a recolored image
    Palettes {
        /// Image to use (defaults to the first RECOMMENDED_BEST_ image)
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Step 1 followed by step 2
    Run,
}

fn parse_color(s: &str) -> Result<ColorRGB, String> {
    parse_hex_color(s).map_err(|e| e.to_string())
}

fn resolve_config(settings: &Settings) -> Result<RunConfig> {
    let config_path = match &settings.config {
        Some(p) => p.clone(),
        None => get_global_config_path()?,
    };
    let mut global = load_global_config(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    let overrides = ConfigOverrides {
        input_dir: settings.input.clone(),
        output_dir: settings.output.clone(),
        goto_colors: settings.colors.clone(),
        goto_count: settings.count.map(|n| n as usize),
        palette_limit: settings.palette_limit,
    };
    let config = RunConfig::resolve(&global, overrides)?;
    if settings.save_config {
        global.remember(&config);
        save_global_config(&config_path, &global)?;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<Vec<Message>> {
    let config = resolve_config(&cli.settings)?;
    info!(
        "Output {}, {} go-to colors",
        config.output_dir.display(),
        config.goto_colors.len()
    );
    match cli.command {
        Command::Recolor => pipeline::run_in_background("recolor", move || {
            Ok(vec![match pipeline::recolor(&config)? {
                Some(report) => Message::Recolored(report),
                None => Message::NothingToRecolor {
                    input_dir: config.input_dir()?.to_owned(),
                },
            }])
        }),
        Command::Palettes { image } => pipeline::run_in_background("palettes", move || {
            let report = pipeline::build_palettes(&config, image.as_deref())?;
            Ok(vec![Message::PalettesBuilt(report)])
        }),
        Command::Run => pipeline::run_in_background("run", move || pipeline::run_all(&config)),
    }
}

pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(messages) => {
            for message in messages {
                for w in message.warnings() {
                    warn!("{}", w);
                }
                info!("{}", message);
            }
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
