// The two steps of a conversion: recolor a folder of sprites (step 1) and
// build hardware palettes for one recolored image (step 2).
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hashbrown::HashMap;
use log::{info, warn};

use crate::{
    allocate::{allocate, PaletteDocument},
    common::{ColorRGB, Weight, HW_LIGHT, HW_MID, HW_SHADOW, HW_TRANSPARENT, MAX_TILE_COLORS},
    helpers::sort_by_brightness,
    message::Message,
    persist::{list_matching, list_pngs, load_png, reset_dir, save_json, save_png},
    quantize::quantize,
    remix,
    repair::{RepairStatus, TileRepairer},
    sheet::{is_opaque, rgb, Sheet},
    state::RunConfig,
    usage::ColorUsage,
};

pub const RECOLORED_FILE: &str = "recolored.png";
pub const REMIX_DIR: &str = "new_alg_remixes";
pub const BEST_PREFIX: &str = "RECOMMENDED_BEST_";
pub const GREEN_PREVIEW_FILE: &str = "GBS_GREEN_PREVIEW.png";
pub const PALETTES_FILE: &str = "palettes.json";
pub const TILE_ASSIGNMENTS_FILE: &str = "tile_assignments.json";

#[derive(Debug, Clone)]
pub struct RecolorReport {
    pub sheets: usize,
    pub source_colors: usize,
    pub colors_kept: usize,
    pub merges: usize,
    pub repair: RepairStatus,
    pub remixes: usize,
    pub best_remix: Option<usize>,
    pub score: Weight,
    pub recommended: Vec<PathBuf>,
}

impl RecolorReport {
    pub fn warnings(&self) -> Vec<String> {
        match self.repair {
            RepairStatus::Converged => vec![],
            RepairStatus::Exhausted { illegal_tiles } => vec![format!(
                "{} tiles still use more than {} colors: no merge left",
                illegal_tiles, MAX_TILE_COLORS
            )],
            RepairStatus::IterationCap { illegal_tiles } => vec![format!(
                "{} tiles still use more than {} colors: merge limit reached after {} merges",
                illegal_tiles, MAX_TILE_COLORS, self.merges
            )],
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaletteReport {
    pub input: PathBuf,
    pub palettes: usize,
    pub palette_limit: usize,
    pub oversized_palettes: usize, // Palettes with more real colors than the hardware allows
    pub tiles: usize,
}

impl PaletteReport {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = vec![];
        if self.palettes > self.palette_limit {
            warnings.push(format!(
                "{} palettes needed, more than the limit of {}",
                self.palettes, self.palette_limit
            ));
        }
        if self.oversized_palettes > 0 {
            warnings.push(format!(
                "{} palettes have more than {} colors; extra colors are dropped from {}",
                self.oversized_palettes, MAX_TILE_COLORS, PALETTES_FILE
            ));
        }
        warnings
    }
}

pub fn load_sheets(input_dir: &Path) -> Result<Vec<Sheet>> {
    list_pngs(input_dir)?.iter().map(|p| load_png(p)).collect()
}

/// Step 1. Returns `None` without writing anything when the input folder has
/// no opaque pixels to recolor.
pub fn recolor(config: &RunConfig) -> Result<Option<RecolorReport>> {
    config.validate()?;
    let sheets = load_sheets(config.input_dir()?)?;
    recolor_sheets(config, &sheets)
}

pub fn recolor_sheets(config: &RunConfig, sheets: &[Sheet]) -> Result<Option<RecolorReport>> {
    let usage = ColorUsage::analyze(sheets);
    if usage.is_empty() {
        info!("Nothing to recolor");
        return Ok(None);
    }
    info!(
        "{} images, {} source colors, {} go-to colors",
        sheets.len(),
        usage.len(),
        config.goto_colors.len()
    );

    let quantized = quantize(&usage, &config.goto_colors)?;
    let repair = TileRepairer::new(sheets, &usage).repair(quantized.clone());
    if !repair.status.is_converged() {
        warn!("Tile repair did not converge: {:?}", repair.status);
    }
    let colors_kept = repair.map.in_use_count();
    info!("Repair done after {} merges, {} colors kept", repair.merges.len(), colors_kept);

    let out = &config.output_dir;
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let recolored: Vec<Sheet> = sheets
        .iter()
        .map(|s| s.recolor(&s.name, |c| quantized.apply(c)))
        .collect();
    save_png(&out.join(RECOLORED_FILE), &Sheet::composite(RECOLORED_FILE, &recolored))?;

    let remix_dir = out.join(REMIX_DIR);
    reset_dir(&remix_dir)?;
    let search = remix::search(&usage, &repair.map, |idx, variant, _score| {
        for sheet in sheets {
            let name = format!("v{}_{}", idx, sheet.name);
            save_png(&remix_dir.join(&name), &sheet.recolor(&name, |c| variant.apply(c)))?;
        }
        Ok(())
    })?;

    for stale in list_matching(out, &format!("{}*.png", BEST_PREFIX))? {
        info!("Removing {}", stale.display());
        std::fs::remove_file(&stale).with_context(|| format!("removing {}", stale.display()))?;
    }
    let mut recommended = vec![];
    for sheet in sheets {
        let name = format!("{}{}", BEST_PREFIX, sheet.name);
        let path = out.join(&name);
        save_png(&path, &sheet.recolor(&name, |c| search.map.apply(c)))?;
        recommended.push(path);
    }

    Ok(Some(RecolorReport {
        sheets: sheets.len(),
        source_colors: usage.len(),
        colors_kept,
        merges: repair.merges.len(),
        repair: repair.status,
        remixes: search.variants,
        best_remix: search.best_index,
        score: search.score,
        recommended,
    }))
}

/// The image step 2 works on: `explicit` if given, else the first
/// recommended image, else the composite from step 1. Step 1 removes the
/// recommended images of earlier runs, so the first one belongs to the
/// latest run.
pub fn select_palette_input(output_dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    let path = match explicit {
        Some(p) => p.to_owned(),
        None => match list_matching(output_dir, &format!("{}*.png", BEST_PREFIX))?.first() {
            Some(p) => p.clone(),
            None => output_dir.join(RECOLORED_FILE),
        },
    };
    if !path.is_file() {
        bail!("No image found at {}.", path.display());
    }
    Ok(path)
}

/// Maps the go-to colors onto the hardware shades: brightest to light,
/// second to mid, darkest (with three or more colors) to shadow. Anything
/// else becomes mid; transparent pixels show the transparency green.
pub fn green_preview(sheet: &Sheet, goto_colors: &[ColorRGB]) -> Sheet {
    let mut sorted_active = goto_colors.to_vec();
    sort_by_brightness(&mut sorted_active);
    let mut green_map: HashMap<ColorRGB, ColorRGB> = HashMap::new();
    if let Some(&c) = sorted_active.first() {
        green_map.insert(c, HW_LIGHT);
    }
    if let Some(&c) = sorted_active.get(1) {
        green_map.insert(c, HW_MID);
    }
    if sorted_active.len() >= 3 {
        if let Some(&c) = sorted_active.last() {
            green_map.insert(c, HW_SHADOW);
        }
    }
    let pixels = sheet
        .pixels
        .iter()
        .map(|&p| {
            let c = if is_opaque(p) {
                green_map.get(&rgb(p)).copied().unwrap_or(HW_MID)
            } else {
                HW_TRANSPARENT
            };
            [c.0, c.1, c.2, 255]
        })
        .collect();
    Sheet {
        name: GREEN_PREVIEW_FILE.to_string(),
        width: sheet.width,
        height: sheet.height,
        pixels,
    }
}

/// Step 2.
pub fn build_palettes(config: &RunConfig, image: Option<&Path>) -> Result<PaletteReport> {
    let input = select_palette_input(&config.output_dir, image)?;
    let sheet = load_png(&input)?;
    let out = &config.output_dir;
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    save_png(&out.join(GREEN_PREVIEW_FILE), &green_preview(&sheet, &config.goto_colors))?;

    let allocation = allocate(&sheet);
    let layouts = allocation.layouts();
    save_json(&out.join(PALETTES_FILE), &PaletteDocument(&layouts))?;
    save_json(&out.join(TILE_ASSIGNMENTS_FILE), &allocation.tiles)?;

    let report = PaletteReport {
        input,
        palettes: allocation.palettes.len(),
        palette_limit: config.palette_limit,
        oversized_palettes: allocation
            .palettes
            .iter()
            .filter(|p| p.len() > MAX_TILE_COLORS)
            .count(),
        tiles: allocation.tiles.len(),
    };
    for w in report.warnings() {
        warn!("{}", w);
    }
    info!("{} palettes for {} tiles", report.palettes, report.tiles);
    Ok(report)
}

/// Step 1 followed by step 2 on the first recommended image.
pub fn run_all(config: &RunConfig) -> Result<Vec<Message>> {
    match recolor(config)? {
        None => Ok(vec![Message::NothingToRecolor {
            input_dir: config.input_dir()?.to_owned(),
        }]),
        Some(report) => {
            let first = report
                .recommended
                .first()
                .context("no recommended image written")?
                .clone();
            let palettes = build_palettes(config, Some(&first))?;
            Ok(vec![Message::Recolored(report), Message::PalettesBuilt(palettes)])
        }
    }
}

/// Runs `job` on its own named thread and waits for its single result.
pub fn run_in_background<T, F>(name: &str, job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(job)
        .with_context(|| format!("spawning {} worker", name))?;
    match handle.join() {
        Ok(result) => result,
        Err(_) => bail!("{} worker panicked", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::tests::tiled_sheet;

    #[test]
    fn test_green_preview_shades() {
        let white = (255, 255, 255);
        let red = (255, 0, 0);
        let blue = (0, 0, 255);
        let green = (0, 255, 0);
        let sheet = tiled_sheet("s", &[vec![white, green, red, blue], vec![]], 2);
        let preview = green_preview(&sheet, &[white, red, green, blue]);
        // Brightness order: white, green, red, blue.
        assert_eq!(preview.pixel(0, 0), [224, 248, 207, 255]);
        assert_eq!(preview.pixel(1, 0), [134, 192, 108, 255]);
        assert_eq!(preview.pixel(2, 0), [134, 192, 108, 255]);
        assert_eq!(preview.pixel(3, 0), [7, 24, 33, 255]);
        assert_eq!(preview.pixel(8, 0), [101, 255, 0, 255]);
    }

    #[test]
    fn test_green_preview_two_colors_have_no_shadow() {
        let sheet = tiled_sheet("s", &[vec![(0, 0, 0), (255, 255, 255)]], 1);
        let preview = green_preview(&sheet, &[(0, 0, 0), (255, 255, 255)]);
        assert_eq!(preview.pixel(0, 0), [134, 192, 108, 255]);
        assert_eq!(preview.pixel(1, 0), [224, 248, 207, 255]);
    }

    #[test]
    fn test_run_in_background_returns_result() {
        assert_eq!(run_in_background("ok", || Ok(42)).unwrap(), 42);
        let err = run_in_background::<(), _>("fails", || bail!("boom")).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
