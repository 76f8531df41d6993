// Sprite sheets and the fixed tile grid laid over them.
use anyhow::{ensure, Result};
use itertools::Itertools;

use crate::common::{ColorRGB, ColorRGBA, PixelCoord, TILE_HEIGHT, TILE_WIDTH, TRANSPARENT_PIXEL};

#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub width: PixelCoord,
    pub height: PixelCoord,
    pub pixels: Vec<ColorRGBA>, // Row-major
}

/// Distinct colors of one tile, kept sorted so that equal sets compare and
/// hash equal and iterate in RGB order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorSet(Vec<ColorRGB>);

impl FromIterator<ColorRGB> for ColorSet {
    fn from_iter<I: IntoIterator<Item = ColorRGB>>(iter: I) -> Self {
        ColorSet(iter.into_iter().sorted().dedup().collect())
    }
}

impl ColorSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[ColorRGB] {
        &self.0
    }

    pub fn contains(&self, c: ColorRGB) -> bool {
        self.0.binary_search(&c).is_ok()
    }

    pub fn is_subset(&self, other: &ColorSet) -> bool {
        self.0.iter().all(|&c| other.contains(c))
    }
}

pub fn is_opaque(p: ColorRGBA) -> bool {
    p[3] != 0
}

pub fn rgb(p: ColorRGBA) -> ColorRGB {
    (p[0], p[1], p[2])
}

impl Sheet {
    pub fn new(name: &str, width: PixelCoord, height: PixelCoord, pixels: Vec<ColorRGBA>) -> Result<Self> {
        ensure!(
            pixels.len() == width as usize * height as usize,
            "sheet {}: expected {}x{} pixels, got {}",
            name,
            width,
            height,
            pixels.len()
        );
        Ok(Sheet {
            name: name.to_string(),
            width,
            height,
            pixels,
        })
    }

    pub fn pixel(&self, x: PixelCoord, y: PixelCoord) -> ColorRGBA {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn opaque_colors(&self) -> impl Iterator<Item = ColorRGB> + '_ {
        self.pixels.iter().filter(|&&p| is_opaque(p)).map(|&p| rgb(p))
    }

    /// Top-left corners of every tile, row by row. Tiles at the right and
    /// bottom edges may be clipped when the sheet is not a multiple of the
    /// tile size.
    pub fn tile_origins(&self) -> impl Iterator<Item = (PixelCoord, PixelCoord)> {
        let (w, h) = (self.width, self.height);
        (0..h)
            .step_by(TILE_HEIGHT as usize)
            .flat_map(move |y| (0..w).step_by(TILE_WIDTH as usize).map(move |x| (x, y)))
    }

    /// Opaque colors inside the tile at `(x, y)`, before any remapping.
    pub fn tile_source_colors(&self, x: PixelCoord, y: PixelCoord) -> impl Iterator<Item = ColorRGB> + '_ {
        let x_end = (x + TILE_WIDTH).min(self.width);
        let y_end = (y + TILE_HEIGHT).min(self.height);
        (y..y_end)
            .flat_map(move |py| (x..x_end).map(move |px| self.pixel(px, py)))
            .filter(|&p| is_opaque(p))
            .map(rgb)
    }

    /// Distinct opaque colors of the tile at `(x, y)`, each passed through `map`.
    pub fn tile_colors<F>(&self, x: PixelCoord, y: PixelCoord, map: F) -> ColorSet
    where
        F: Fn(ColorRGB) -> ColorRGB,
    {
        self.tile_source_colors(x, y).map(map).collect()
    }

    /// Returns a copy with every opaque pixel replaced through `map` and made
    /// fully opaque; transparent pixels become (0, 0, 0, 0).
    pub fn recolor<F>(&self, name: &str, map: F) -> Sheet
    where
        F: Fn(ColorRGB) -> ColorRGB,
    {
        let pixels = self
            .pixels
            .iter()
            .map(|&p| {
                if is_opaque(p) {
                    let c = map(rgb(p));
                    [c.0, c.1, c.2, 255]
                } else {
                    TRANSPARENT_PIXEL
                }
            })
            .collect();
        Sheet {
            name: name.to_string(),
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Stacks sheets top to bottom on a transparent canvas as wide as the
    /// widest sheet.
    pub fn composite(name: &str, sheets: &[Sheet]) -> Sheet {
        let width = sheets.iter().map(|s| s.width).max().unwrap_or(0);
        let height = sheets.iter().map(|s| s.height).sum::<PixelCoord>();
        let mut pixels = vec![TRANSPARENT_PIXEL; width as usize * height as usize];
        let mut y_off = 0;
        for s in sheets {
            for y in 0..s.height {
                let dst = ((y_off + y) * width) as usize;
                let src = (y * s.width) as usize;
                pixels[dst..dst + s.width as usize]
                    .copy_from_slice(&s.pixels[src..src + s.width as usize]);
            }
            y_off += s.height;
        }
        Sheet {
            name: name.to_string(),
            width,
            height,
            pixels,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Builds a sheet from RGB rows; `None` marks a transparent pixel.
    pub fn sheet_from_rows(name: &str, rows: &[Vec<Option<ColorRGB>>]) -> Sheet {
        let height = rows.len() as PixelCoord;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as PixelCoord;
        let pixels = rows
            .iter()
            .flatten()
            .map(|p| match p {
                Some(c) => [c.0, c.1, c.2, 255],
                None => TRANSPARENT_PIXEL,
            })
            .collect();
        Sheet::new(name, width, height, pixels).unwrap()
    }

    /// A sheet of `tiles_x` by `tiles_y` tiles, each filled by cycling through
    /// the given colors pixel by pixel.
    pub fn tiled_sheet(name: &str, tiles: &[Vec<ColorRGB>], tiles_x: usize) -> Sheet {
        let tiles_y = tiles.len().div_ceil(tiles_x);
        let width = tiles_x * TILE_WIDTH as usize;
        let height = tiles_y * TILE_HEIGHT as usize;
        let mut rows = vec![vec![None; width]; height];
        for (i, colors) in tiles.iter().enumerate() {
            let (tx, ty) = (i % tiles_x, i / tiles_x);
            let mut k = 0;
            for y in 0..TILE_HEIGHT as usize {
                for x in 0..TILE_WIDTH as usize {
                    if !colors.is_empty() {
                        rows[ty * TILE_HEIGHT as usize + y][tx * TILE_WIDTH as usize + x] =
                            Some(colors[k % colors.len()]);
                        k += 1;
                    }
                }
            }
        }
        sheet_from_rows(name, &rows)
    }

    #[test]
    fn test_sheet_new_rejects_wrong_size() {
        assert!(Sheet::new("bad", 2, 2, vec![[0, 0, 0, 255]; 3]).is_err());
    }

    #[test]
    fn test_tile_origins_include_clipped_edges() {
        let sheet = Sheet::new("s", 12, 20, vec![TRANSPARENT_PIXEL; 12 * 20]).unwrap();
        let origins: Vec<_> = sheet.tile_origins().collect();
        assert_eq!(origins, vec![(0, 0), (8, 0), (0, 16), (8, 16)]);
    }

    #[test]
    fn test_tile_colors_skip_transparent_pixels() {
        let red = (255, 0, 0);
        let blue = (0, 0, 255);
        let sheet = tiled_sheet("s", &[vec![red, blue], vec![]], 2);
        let left = sheet.tile_colors(0, 0, |c| c);
        assert_eq!(left.colors(), &[blue, red]);
        assert!(sheet.tile_colors(8, 0, |c| c).is_empty());
    }

    #[test]
    fn test_color_set_subset() {
        let a: ColorSet = [(1, 1, 1), (2, 2, 2)].into_iter().collect();
        let b: ColorSet = [(3, 3, 3), (2, 2, 2), (1, 1, 1), (2, 2, 2)].into_iter().collect();
        assert_eq!(b.len(), 3);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(ColorSet::default().is_subset(&a));
    }

    #[test]
    fn test_recolor_and_composite() {
        let a = sheet_from_rows("a", &[vec![Some((10, 10, 10)), None]]);
        let b = sheet_from_rows("b", &[vec![Some((20, 20, 20))], vec![Some((30, 30, 30))]]);
        let a2 = a.recolor("a2", |_| (1, 2, 3));
        assert_eq!(a2.pixels, vec![[1, 2, 3, 255], TRANSPARENT_PIXEL]);

        let c = Sheet::composite("c", &[a, b]);
        assert_eq!((c.width, c.height), (2, 3));
        assert_eq!(
            c.pixels,
            vec![
                [10, 10, 10, 255],
                TRANSPARENT_PIXEL,
                [20, 20, 20, 255],
                TRANSPARENT_PIXEL,
                [30, 30, 30, 255],
                TRANSPARENT_PIXEL,
            ]
        );
    }
}
