// Enforces the per-tile color limit by merging go-to colors, one merge at a
// time, until every tile fits.
use itertools::Itertools;
use log::{debug, warn};

use crate::{
    common::{ColorRGB, Weight, MAX_TILE_COLORS},
    quantize::ColorMap,
    sheet::{ColorSet, Sheet},
    usage::ColorUsage,
};

// Added to the cost of any merge that lowers the number of colors in use.
pub const COLOR_LOSS_PENALTY: Weight = 1_000_000;
pub const COLOR_LOSS_DAMAGE_FACTOR: Weight = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Merge {
    pub from: ColorRGB,
    pub to: ColorRGB,
    pub damage: Weight,
    pub cost: Weight,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepairStatus {
    Converged,
    // No merge candidate was left for an illegal tile.
    Exhausted { illegal_tiles: usize },
    // Safety bound on the number of merges was hit.
    IterationCap { illegal_tiles: usize },
}

impl RepairStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, RepairStatus::Converged)
    }
}

#[derive(Clone, Debug)]
pub struct RepairOutcome {
    pub map: ColorMap,
    pub merges: Vec<Merge>,
    pub status: RepairStatus,
}

pub struct TileRepairer<'a> {
    sheets: &'a [Sheet],
    usage: &'a ColorUsage,
    max_colors: usize,
    max_iterations: Option<usize>,
}

impl<'a> TileRepairer<'a> {
    pub fn new(sheets: &'a [Sheet], usage: &'a ColorUsage) -> Self {
        Self {
            sheets,
            usage,
            max_colors: MAX_TILE_COLORS,
            max_iterations: None,
        }
    }

    /// Overrides the default merge bound (square of the number of colors in use).
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    fn tile_sets<'b>(&'b self, map: &'b ColorMap) -> impl Iterator<Item = ColorSet> + 'b {
        self.sheets.iter().flat_map(move |sheet| {
            sheet
                .tile_origins()
                .map(move |(x, y)| sheet.tile_colors(x, y, |c| map.apply(c)))
        })
    }

    /// Color sets of all tiles over the limit, in sheet/row/column order.
    pub fn illegal_tiles(&self, map: &ColorMap) -> Vec<ColorSet> {
        self.tile_sets(map)
            .filter(|s| s.len() > self.max_colors)
            .collect()
    }

    fn first_illegal_tile(&self, map: &ColorMap) -> Option<ColorSet> {
        self.tile_sets(map).find(|s| s.len() > self.max_colors)
    }

    fn merge_cost(&self, map: &ColorMap, from: ColorRGB, to: ColorRGB) -> Merge {
        let damage = map.merge_damage(self.usage, from, to);
        let penalty = if map.in_use_count_after_merge(from, to) < map.in_use_count() {
            COLOR_LOSS_PENALTY + damage * COLOR_LOSS_DAMAGE_FACTOR
        } else {
            0
        };
        Merge {
            from,
            to,
            damage,
            cost: damage + penalty,
        }
    }

    /// Cheapest merge between two colors of `target`. Pairs are visited in
    /// RGB order and always merge the lower color into the higher one; the
    /// first candidate with the lowest cost wins.
    pub fn best_merge(&self, map: &ColorMap, target: &ColorSet) -> Option<Merge> {
        let mut best: Option<Merge> = None;
        for (&from, &to) in target.colors().iter().tuple_combinations() {
            let candidate = self.merge_cost(map, from, to);
            if best.map_or(true, |m| candidate.cost < m.cost) {
                best = Some(candidate);
            }
        }
        best
    }

    pub fn repair(&self, mut map: ColorMap) -> RepairOutcome {
        let max_iterations = self
            .max_iterations
            .unwrap_or_else(|| map.in_use_count().max(1).pow(2));
        let mut merges = vec![];
        let status = loop {
            let Some(target) = self.first_illegal_tile(&map) else {
                break RepairStatus::Converged;
            };
            if merges.len() >= max_iterations {
                let illegal_tiles = self.illegal_tiles(&map).len();
                warn!(
                    "Stopped after {} merges with {} tiles still over the limit",
                    merges.len(),
                    illegal_tiles
                );
                break RepairStatus::IterationCap { illegal_tiles };
            }
            let Some(merge) = self.best_merge(&map, &target) else {
                let illegal_tiles = self.illegal_tiles(&map).len();
                warn!("No merge left; {} tiles still over the limit", illegal_tiles);
                break RepairStatus::Exhausted { illegal_tiles };
            };
            debug!(
                "Merging {:?} into {:?} (damage {}, cost {})",
                merge.from, merge.to, merge.damage, merge.cost
            );
            map.merge(merge.from, merge.to);
            merges.push(merge);
        };
        RepairOutcome {
            map,
            merges,
            status,
        }
    }
}
