use anyhow::{ensure, Context, Result};

use crate::common::{ColorRGB, Weight};

pub fn color_distance(a: ColorRGB, b: ColorRGB) -> Weight {
    let dr = a.0 as i64 - b.0 as i64;
    let dg = a.1 as i64 - b.1 as i64;
    let db = a.2 as i64 - b.2 as i64;
    (dr * dr + dg * dg + db * db) as Weight
}

/// Perceptual brightness (ITU-R BT.601 luma weights).
pub fn brightness(c: ColorRGB) -> f64 {
    0.299 * c.0 as f64 + 0.587 * c.1 as f64 + 0.114 * c.2 as f64
}

/// Stable sort, brightest first. Colors of equal brightness keep their order.
pub fn sort_by_brightness(colors: &mut [ColorRGB]) {
    colors.sort_by(|a, b| brightness(*b).total_cmp(&brightness(*a)));
}

pub fn hex_color(c: ColorRGB) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
}

pub fn hex_color_upper(c: ColorRGB) -> String {
    format!("#{:02X}{:02X}{:02X}", c.0, c.1, c.2)
}

/// Parses `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
pub fn parse_hex_color(s: &str) -> Result<ColorRGB> {
    let hex = s.trim().trim_start_matches('#');
    ensure!(
        hex.is_ascii() && (hex.len() == 3 || hex.len() == 6),
        "invalid color {:?}: expected #rgb or #rrggbb",
        s
    );
    let channel = |i: usize, n: usize| -> Result<u8> {
        let v = u8::from_str_radix(&hex[i * n..(i + 1) * n], 16)
            .with_context(|| format!("invalid hex digit in color {:?}", s))?;
        Ok(if n == 1 { v * 17 } else { v })
    };
    let n = hex.len() / 3;
    Ok((channel(0, n)?, channel(1, n)?, channel(2, n)?))
}
