use anyhow::{bail, ensure, Context, Result};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    common::{ColorRGB, MAX_GOTO_COLORS, MIN_GOTO_COLORS},
    helpers::{hex_color, parse_hex_color},
};

pub const DEFAULT_GOTO_COLORS: [ColorRGB; 4] = [(255, 255, 255), (255, 0, 0), (0, 255, 0), (0, 0, 255)];

// Used in order when the go-to color count grows; grey after that.
pub const PRESET_COLORS: [ColorRGB; 12] = [
    (255, 255, 255),
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 255, 0),
    (255, 0, 255),
    (0, 255, 255),
    (0, 0, 0),
    (128, 0, 0),
    (0, 128, 0),
    (0, 0, 128),
    (128, 128, 0),
];
pub const FILLER_COLOR: ColorRGB = (127, 127, 127);

pub const DEFAULT_PALETTE_LIMIT: usize = 8;

/// Settings remembered between runs (`config.json`). Every field is optional;
/// command-line flags take precedence.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub goto_colors: Option<Vec<String>>, // "#rrggbb"
    pub palette_limit: Option<usize>,
}

/// Values given on the command line for a single run.
#[derive(Default, Clone, Debug)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub goto_colors: Option<Vec<ColorRGB>>,
    pub goto_count: Option<usize>,
    pub palette_limit: Option<usize>,
}

/// Everything one pipeline run needs. Built once and never changed while
/// the run is in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub input_dir: Option<PathBuf>, // Only step 1 reads it
    pub output_dir: PathBuf,
    pub goto_colors: Vec<ColorRGB>,
    pub palette_limit: usize,
}

pub fn get_global_config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "SpriteBingo")
        .context("Unable to open global config directory.")?;
    let config_dir = project_dirs.config_dir();
    let config_path = config_dir.join("config.json");
    Ok(config_path)
}

/// Grows the list from the presets (then grey) or truncates it to `n`.
pub fn resize_goto_colors(colors: &mut Vec<ColorRGB>, n: usize) {
    while colors.len() < n {
        let c = PRESET_COLORS.get(colors.len()).copied().unwrap_or(FILLER_COLOR);
        colors.push(c);
    }
    colors.truncate(n);
}

impl GlobalConfig {
    /// Records the settings of a run so the next run can start from them.
    pub fn remember(&mut self, config: &RunConfig) {
        if config.input_dir.is_some() {
            self.input_dir = config.input_dir.clone();
        }
        self.output_dir = Some(config.output_dir.clone());
        self.goto_colors = Some(config.goto_colors.iter().map(|&c| hex_color(c)).collect());
        self.palette_limit = Some(config.palette_limit);
    }
}

impl RunConfig {
    pub fn resolve(global: &GlobalConfig, overrides: ConfigOverrides) -> Result<Self> {
        let input_dir = overrides.input_dir.or_else(|| global.input_dir.clone());
        let output_dir = overrides
            .output_dir
            .or_else(|| global.output_dir.clone())
            .context("Output folder not selected.")?;
        let mut goto_colors = match (overrides.goto_colors, &global.goto_colors) {
            (Some(colors), _) => colors,
            (None, Some(hex)) => hex
                .iter()
                .map(|s| parse_hex_color(s))
                .collect::<Result<Vec<_>>>()
                .context("invalid go-to color in config file")?,
            (None, None) => DEFAULT_GOTO_COLORS.to_vec(),
        };
        if let Some(n) = overrides.goto_count {
            resize_goto_colors(&mut goto_colors, n);
        }
        let palette_limit = overrides
            .palette_limit
            .or(global.palette_limit)
            .unwrap_or(DEFAULT_PALETTE_LIMIT);
        let config = RunConfig {
            input_dir,
            output_dir,
            goto_colors,
            palette_limit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (MIN_GOTO_COLORS..=MAX_GOTO_COLORS).contains(&self.goto_colors.len()),
            "Go-to color count must be between {} and {}, got {}.",
            MIN_GOTO_COLORS,
            MAX_GOTO_COLORS,
            self.goto_colors.len()
        );
        ensure!(self.palette_limit >= 1, "Palette limit must be at least 1.");
        if let Some(input_dir) = &self.input_dir {
            if !input_dir.is_dir() {
                bail!("Input folder {} does not exist.", input_dir.display());
            }
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            bail!("Output location {} is not a folder.", self.output_dir.display());
        }
        Ok(())
    }

    pub fn input_dir(&self) -> Result<&Path> {
        self.input_dir.as_deref().context("Input folder not selected.")
    }
}
