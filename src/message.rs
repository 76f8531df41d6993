use std::{fmt, path::PathBuf};

use crate::pipeline::{PaletteReport, RecolorReport};

/// Final notification of a finished job. A job reports exactly once, with
/// no progress updates before it.
#[derive(Debug, Clone)]
pub enum Message {
    NothingToRecolor { input_dir: PathBuf },
    Recolored(RecolorReport),
    PalettesBuilt(PaletteReport),
}

impl Message {
    pub fn warnings(&self) -> Vec<String> {
        match self {
            Message::NothingToRecolor { .. } => vec![],
            Message::Recolored(report) => report.warnings(),
            Message::PalettesBuilt(report) => report.warnings(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::NothingToRecolor { input_dir } => {
                write!(f, "No opaque pixels found in PNG files in {}.", input_dir.display())
            }
            Message::Recolored(r) => write!(
                f,
                "Variety-first optimization done: {} images, {} source colors, kept {} colors, {} remixes.",
                r.sheets, r.source_colors, r.colors_kept, r.remixes
            ),
            Message::PalettesBuilt(r) => write!(
                f,
                "Palettes done for {}: {} palettes used across {} tiles.",
                r.input.display(),
                r.palettes,
                r.tiles
            ),
        }
    }
}
