use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    common::{ColorRGB, Weight},
    sheet::Sheet,
};

/// Pixel count of every distinct opaque color across a batch of sheets.
#[derive(Clone, Debug, Default)]
pub struct ColorUsage {
    weights: HashMap<ColorRGB, Weight>,
}

impl ColorUsage {
    pub fn analyze(sheets: &[Sheet]) -> Self {
        let mut weights: HashMap<ColorRGB, Weight> = HashMap::new();
        for sheet in sheets {
            for c in sheet.opaque_colors() {
                *weights.entry(c).or_insert(0) += 1;
            }
        }
        ColorUsage { weights }
    }

    pub fn weight(&self, c: ColorRGB) -> Weight {
        self.weights.get(&c).copied().unwrap_or(0)
    }

    /// Distinct source colors in RGB order.
    pub fn colors(&self) -> Vec<ColorRGB> {
        self.weights.keys().copied().sorted().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorRGB, Weight)> + '_ {
        self.weights.iter().map(|(&c, &w)| (c, w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_pixels(&self) -> Weight {
        self.weights.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::tests::sheet_from_rows;

    #[test]
    fn test_usage_counts_across_sheets() {
        let a = sheet_from_rows("a", &[vec![Some((1, 1, 1)), Some((1, 1, 1)), None]]);
        let b = sheet_from_rows("b", &[vec![Some((2, 2, 2)), Some((1, 1, 1)), None]]);
        let usage = ColorUsage::analyze(&[a, b]);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage.weight((1, 1, 1)), 3);
        assert_eq!(usage.weight((2, 2, 2)), 1);
        assert_eq!(usage.weight((9, 9, 9)), 0);
        assert_eq!(usage.colors(), vec![(1, 1, 1), (2, 2, 2)]);
    }

    #[test]
    fn test_usage_total_equals_opaque_pixel_count() {
        let rows: Vec<Vec<Option<ColorRGB>>> = (0..7u8)
            .map(|y| {
                (0..5u8)
                    .map(|x| if (x + y) % 3 == 0 { None } else { Some((x, y, x ^ y)) })
                    .collect()
            })
            .collect();
        let sheet = sheet_from_rows("s", &rows);
        let opaque = sheet.pixels.iter().filter(|p| p[3] != 0).count() as Weight;
        let usage = ColorUsage::analyze(&[sheet.clone(), sheet]);
        assert_eq!(usage.total_pixels(), 2 * opaque);
    }

    #[test]
    fn test_usage_of_transparent_batch_is_empty() {
        let sheet = sheet_from_rows("s", &[vec![None, None]]);
        assert!(ColorUsage::analyze(&[sheet]).is_empty());
        assert!(ColorUsage::analyze(&[]).is_empty());
    }
}
