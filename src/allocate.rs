// Reduces the color sets of all tiles to a small list of hardware palettes
// and assigns every non-empty tile to one of them.
use std::cmp::Reverse;

use hashbrown::HashSet;
use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::{
    common::{ColorRGB, PaletteIdx, PixelCoord, HW_LIGHT, HW_MID, HW_SHADOW, HW_TRANSPARENT},
    helpers::{hex_color, hex_color_upper, sort_by_brightness},
    sheet::{ColorSet, Sheet},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TileAssignment {
    pub x: PixelCoord,
    pub y: PixelCoord,
    pub palette: PaletteIdx,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allocation {
    pub palettes: Vec<ColorSet>,
    pub tiles: Vec<TileAssignment>, // Row-major; transparent tiles are left out
}

impl Allocation {
    pub fn palette_for(&self, x: PixelCoord, y: PixelCoord) -> Option<PaletteIdx> {
        self.tiles
            .iter()
            .find(|t| t.x == x && t.y == y)
            .map(|t| t.palette)
    }

    pub fn layouts(&self) -> Vec<PaletteLayout> {
        self.palettes.iter().map(palette_layout).collect()
    }
}

/// Keeps only the color sets that are not contained in a larger kept set.
/// Sets are visited largest first (equal sizes in RGB order), and the kept
/// list is returned smallest first.
pub fn covering_palettes<'a, I>(sets: I) -> Vec<ColorSet>
where
    I: IntoIterator<Item = &'a ColorSet>,
{
    let distinct: HashSet<&ColorSet> = sets.into_iter().filter(|s| !s.is_empty()).collect();
    let mut kept: Vec<ColorSet> = vec![];
    for s in distinct
        .into_iter()
        .sorted_by(|a, b| (Reverse(a.len()), a).cmp(&(Reverse(b.len()), b)))
    {
        if !kept.iter().any(|k| s.is_subset(k)) {
            kept.push(s.clone());
        }
    }
    kept.reverse();
    kept
}

pub fn allocate(sheet: &Sheet) -> Allocation {
    let tile_sets: Vec<((PixelCoord, PixelCoord), ColorSet)> = sheet
        .tile_origins()
        .map(|(x, y)| ((x, y), sheet.tile_colors(x, y, |c| c)))
        .collect();
    let palettes = covering_palettes(tile_sets.iter().map(|(_, s)| s));
    let tiles = tile_sets
        .iter()
        .filter(|(_, s)| !s.is_empty())
        .filter_map(|&((x, y), ref s)| {
            palettes
                .iter()
                .position(|p| s.is_subset(p))
                .map(|palette| TileAssignment { x, y, palette })
        })
        .collect();
    Allocation { palettes, tiles }
}

/// One entry of a hardware palette: either a color used by the tiles or a
/// fixed hardware color standing in for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    Color(ColorRGB),
    Fixed(ColorRGB),
}

impl Slot {
    pub fn rgb(&self) -> ColorRGB {
        match *self {
            Slot::Color(c) | Slot::Fixed(c) => c,
        }
    }

    // Fixed hardware colors are written in upper case.
    pub fn hex(&self) -> String {
        match *self {
            Slot::Color(c) => hex_color(c),
            Slot::Fixed(c) => hex_color_upper(c),
        }
    }
}

/// Hardware slot order: brightest, second, transparency marker, darkest.
pub type PaletteLayout = [Slot; 4];

pub fn palette_layout(palette: &ColorSet) -> PaletteLayout {
    let mut ps = palette.colors().to_vec();
    sort_by_brightness(&mut ps);
    let slot = |c: Option<&ColorRGB>, fallback: ColorRGB| {
        c.map_or(Slot::Fixed(fallback), |&c| Slot::Color(c))
    };
    [
        slot(ps.first(), HW_LIGHT),
        slot(ps.get(1), HW_MID),
        Slot::Fixed(HW_TRANSPARENT),
        slot(ps.get(2).or(ps.get(1)), HW_SHADOW),
    ]
}

/// `palettes.json`: `"palette {i}"` to four hex colors, in palette order.
pub struct PaletteDocument<'a>(pub &'a [PaletteLayout]);

impl Serialize for PaletteDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .enumerate()
                .map(|(i, layout)| (format!("palette {}", i), layout.map(|slot| slot.hex()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::tests::tiled_sheet;
    use pretty_assertions::assert_eq;

    const A: ColorRGB = (255, 255, 255);
    const B: ColorRGB = (255, 0, 0);
    const C: ColorRGB = (0, 0, 255);
    const D: ColorRGB = (0, 255, 0);

    fn set(colors: &[ColorRGB]) -> ColorSet {
        colors.iter().copied().collect()
    }

    #[test]
    fn test_subsets_collapse_into_one_palette() {
        let sheet = tiled_sheet("s", &[vec![A, B], vec![A], vec![A, B, C], vec![]], 2);
        let alloc = allocate(&sheet);
        assert_eq!(alloc.palettes, vec![set(&[A, B, C])]);
        assert_eq!(
            alloc.tiles,
            vec![
                TileAssignment { x: 0, y: 0, palette: 0 },
                TileAssignment { x: 8, y: 0, palette: 0 },
                TileAssignment { x: 0, y: 16, palette: 0 },
            ]
        );
        assert_eq!(alloc.palette_for(8, 16), None);
    }

    #[test]
    fn test_disjoint_sets_are_ordered_smallest_first() {
        let sheet = tiled_sheet("s", &[vec![A, B, C], vec![D], vec![B, D], vec![C]], 4);
        let alloc = allocate(&sheet);
        // {D} is covered by {B, D}; {C} by {A, B, C}.
        assert_eq!(alloc.palettes, vec![set(&[B, D]), set(&[A, B, C])]);
        assert_eq!(alloc.palette_for(0, 0), Some(1));
        assert_eq!(alloc.palette_for(8, 0), Some(0));
        assert_eq!(alloc.palette_for(16, 0), Some(0));
        assert_eq!(alloc.palette_for(24, 0), Some(1));
    }

    #[test]
    fn test_every_tile_is_covered() {
        let tiles = vec![
            vec![A, B],
            vec![C, D],
            vec![A, C, D],
            vec![B],
            vec![B, C, D],
            vec![A, D],
            vec![],
            vec![C],
        ];
        let sheet = tiled_sheet("s", &tiles, 3);
        let alloc = allocate(&sheet);
        for (x, y) in sheet.tile_origins() {
            let s = sheet.tile_colors(x, y, |c| c);
            match alloc.palette_for(x, y) {
                Some(p) => assert!(s.is_subset(&alloc.palettes[p])),
                None => assert!(s.is_empty()),
            }
        }
        for (i, p) in alloc.palettes.iter().enumerate() {
            for (j, q) in alloc.palettes.iter().enumerate() {
                assert!(i == j || !p.is_subset(q), "palette {} is inside palette {}", i, j);
            }
        }
    }

    #[test]
    fn test_allocation_is_idempotent() {
        let tiles = vec![vec![A, B], vec![C, D], vec![A, C, D], vec![B, C], vec![D]];
        let sheet = tiled_sheet("s", &tiles, 2);
        assert_eq!(allocate(&sheet), allocate(&sheet.clone()));
    }

    #[test]
    fn test_transparent_sheet_has_no_palettes() {
        let sheet = tiled_sheet("s", &[vec![], vec![]], 2);
        assert_eq!(allocate(&sheet), Allocation::default());
    }

    #[test]
    fn test_palette_layout_fallbacks() {
        let black = (0, 0, 0);
        let rgb = |layout: PaletteLayout| layout.map(|s| s.rgb());
        assert_eq!(rgb(palette_layout(&set(&[A, black, B]))), [A, B, HW_TRANSPARENT, black]);
        assert_eq!(rgb(palette_layout(&set(&[black, A]))), [A, black, HW_TRANSPARENT, black]);
        assert_eq!(rgb(palette_layout(&set(&[B]))), [B, HW_MID, HW_TRANSPARENT, HW_SHADOW]);
        assert_eq!(
            palette_layout(&ColorSet::default()),
            [
                Slot::Fixed(HW_LIGHT),
                Slot::Fixed(HW_MID),
                Slot::Fixed(HW_TRANSPARENT),
                Slot::Fixed(HW_SHADOW)
            ]
        );
        assert_eq!(palette_layout(&set(&[black, A]))[3], Slot::Color(black));
    }

    #[test]
    fn test_fixed_slots_are_upper_case_hex() {
        let layout = palette_layout(&set(&[(224, 248, 207)]));
        assert_eq!(
            layout.map(|s| s.hex()),
            ["#e0f8cf", "#86C06C", "#65FF00", "#071821"].map(String::from)
        );
    }

    #[test]
    fn test_palette_document_keeps_palette_order() {
        let layouts: Vec<PaletteLayout> = (0..12u8)
            .map(|i| {
                [
                    Slot::Color((i, i, i)),
                    Slot::Fixed(HW_MID),
                    Slot::Fixed(HW_TRANSPARENT),
                    Slot::Fixed(HW_SHADOW),
                ]
            })
            .collect();
        let json = serde_json::to_string(&PaletteDocument(&layouts)).unwrap();
        assert!(json.starts_with(r##"{"palette 0":["#000000","#86C06C","#65FF00","#071821"],"palette 1":"##));
        let p2 = json.find("\"palette 2\"").unwrap();
        let p10 = json.find("\"palette 10\"").unwrap();
        assert!(p2 < p10);
    }
}
