// Tries every relabeling of the colors left after repair and keeps the one
// with the least weighted distortion.
use anyhow::Result;
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info};

use crate::{
    common::{ColorRGB, Weight},
    quantize::ColorMap,
    usage::ColorUsage,
};

// The search is factorial in the number of colors in use; 6! = 720 variants.
pub const MIN_SEARCH_COLORS: usize = 2;
pub const MAX_SEARCH_COLORS: usize = 6;

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub map: ColorMap,
    pub score: Weight,
    pub best_index: Option<usize>, // None when the search was skipped
    pub variants: usize,
}

pub fn should_search(colors_in_use: usize) -> bool {
    (MIN_SEARCH_COLORS..=MAX_SEARCH_COLORS).contains(&colors_in_use)
}

/// Runs the permutation search over `repaired`. Every variant is handed to
/// `on_remix` (permutation index, map, score) in enumeration order before the
/// next one is built. The first variant with the lowest score is selected;
/// when the number of colors in use is out of range, `repaired` is returned
/// unchanged and `on_remix` is never called.
pub fn search<F>(usage: &ColorUsage, repaired: &ColorMap, mut on_remix: F) -> Result<SearchOutcome>
where
    F: FnMut(usize, &ColorMap, Weight) -> Result<()>,
{
    let targets: Vec<ColorRGB> = repaired.in_use();
    if !should_search(targets.len()) {
        info!(
            "Skipping remix search: {} colors in use (searching {}..={})",
            targets.len(),
            MIN_SEARCH_COLORS,
            MAX_SEARCH_COLORS
        );
        return Ok(SearchOutcome {
            map: repaired.clone(),
            score: repaired.score(usage),
            best_index: None,
            variants: 0,
        });
    }

    let mut best: Option<(usize, ColorMap, Weight)> = None;
    let mut variants = 0;
    for (idx, perm) in targets.iter().copied().permutations(targets.len()).enumerate() {
        let swap: HashMap<ColorRGB, ColorRGB> = targets.iter().copied().zip(perm).collect();
        let variant = repaired.relabel(&swap);
        let score = variant.score(usage);
        debug!("Remix {}: score {}", idx, score);
        on_remix(idx, &variant, score)?;
        variants += 1;
        if best.as_ref().map_or(true, |(_, _, s)| score < *s) {
            best = Some((idx, variant, score));
        }
    }

    Ok(match best {
        Some((idx, map, score)) => {
            info!("Remix {} of {} selected (score {})", idx, variants, score);
            SearchOutcome {
                map,
                score,
                best_index: Some(idx),
                variants,
            }
        }
        None => SearchOutcome {
            map: repaired.clone(),
            score: repaired.score(usage),
            best_index: None,
            variants,
        },
    })
}
