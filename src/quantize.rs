use anyhow::{ensure, Result};
use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    common::{ColorRGB, Weight},
    helpers::color_distance,
    usage::ColorUsage,
};

/// Total mapping from every source color seen during analysis to one go-to
/// color. Only ever changed by reassigning everything mapped to one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorMap {
    entries: HashMap<ColorRGB, ColorRGB>,
}

impl FromIterator<(ColorRGB, ColorRGB)> for ColorMap {
    fn from_iter<I: IntoIterator<Item = (ColorRGB, ColorRGB)>>(iter: I) -> Self {
        ColorMap {
            entries: iter.into_iter().collect(),
        }
    }
}

impl ColorMap {
    pub fn get(&self, src: ColorRGB) -> Option<ColorRGB> {
        self.entries.get(&src).copied()
    }

    /// Like `get`, but unknown colors render as black.
    pub fn apply(&self, src: ColorRGB) -> ColorRGB {
        self.get(src).unwrap_or((0, 0, 0))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorRGB, ColorRGB)> + '_ {
        self.entries.iter().map(|(&s, &t)| (s, t))
    }

    /// Source colors in RGB order.
    pub fn sources(&self) -> Vec<ColorRGB> {
        self.entries.keys().copied().sorted().collect()
    }

    /// Distinct target colors currently in use, in RGB order.
    pub fn in_use(&self) -> Vec<ColorRGB> {
        self.entries.values().copied().sorted().dedup().collect()
    }

    pub fn in_use_count(&self) -> usize {
        self.entries.values().unique().count()
    }

    /// Number of distinct targets that would remain after merging `from` into `to`.
    pub fn in_use_count_after_merge(&self, from: ColorRGB, to: ColorRGB) -> usize {
        self.entries
            .values()
            .map(|&t| if t == from { to } else { t })
            .unique()
            .count()
    }

    /// Reassigns every source currently mapped to `from` so it maps to `to`.
    pub fn merge(&mut self, from: ColorRGB, to: ColorRGB) {
        for t in self.entries.values_mut() {
            if *t == from {
                *t = to;
            }
        }
    }

    /// Sum over sources mapped to `from` of squared distance to `to`, times usage.
    pub fn merge_damage(&self, usage: &ColorUsage, from: ColorRGB, to: ColorRGB) -> Weight {
        self.entries
            .iter()
            .filter(|(_, &t)| t == from)
            .map(|(&s, _)| color_distance(s, to) * usage.weight(s))
            .sum()
    }

    /// Composes this map with a relabeling of its targets. Targets missing
    /// from `swap` are kept as they are.
    pub fn relabel(&self, swap: &HashMap<ColorRGB, ColorRGB>) -> ColorMap {
        self.iter()
            .map(|(s, t)| (s, swap.get(&t).copied().unwrap_or(t)))
            .collect()
    }

    /// Total distortion: squared distance of every source to its target,
    /// weighted by pixel count.
    pub fn score(&self, usage: &ColorUsage) -> Weight {
        self.iter()
            .map(|(s, t)| color_distance(s, t) * usage.weight(s))
            .sum()
    }
}

/// Closest go-to color by squared RGB distance; the earliest entry wins ties.
pub fn nearest(c: ColorRGB, targets: &[ColorRGB]) -> Option<ColorRGB> {
    let mut best: Option<(ColorRGB, Weight)> = None;
    for &t in targets {
        let d = color_distance(c, t);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((t, d));
        }
    }
    best.map(|(t, _)| t)
}

pub fn quantize(usage: &ColorUsage, targets: &[ColorRGB]) -> Result<ColorMap> {
    ensure!(!targets.is_empty(), "go-to color list is empty");
    Ok(usage
        .colors()
        .into_iter()
        .filter_map(|c| nearest(c, targets).map(|t| (c, t)))
        .collect())
}
