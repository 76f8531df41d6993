pub type ColorValue = u8; // Color channel value (0-255)
pub type ColorRGB = (ColorValue, ColorValue, ColorValue);
pub type ColorRGBA = [ColorValue; 4];
pub type PixelCoord = u32;
pub type PaletteIdx = usize; // Index into the allocated palette list
pub type Weight = u64; // Pixel count or weighted squared distance

// Hardware profile: Game Boy style sprite tiles (8x16 mode) with three real
// colors per palette plus one slot reserved for transparency.
pub const TILE_WIDTH: PixelCoord = 8;
pub const TILE_HEIGHT: PixelCoord = 16;
pub const MAX_TILE_COLORS: usize = 3;

pub const MIN_GOTO_COLORS: usize = 1;
pub const MAX_GOTO_COLORS: usize = 32;

// Hardware colors used by the preview and by palette slot fallbacks.
pub const HW_LIGHT: ColorRGB = (224, 248, 207);
pub const HW_MID: ColorRGB = (134, 192, 108);
pub const HW_TRANSPARENT: ColorRGB = (101, 255, 0);
pub const HW_SHADOW: ColorRGB = (7, 24, 33);

pub const TRANSPARENT_PIXEL: ColorRGBA = [0, 0, 0, 0];
