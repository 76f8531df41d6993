//! SpriteBINGO: converts full-color sprite sheets into images that fit a
//! fixed-palette, tile-based sprite format (8x16 tiles, three colors plus
//! transparency per tile), then allocates the hardware palettes they need.

pub mod allocate;
pub mod common;
pub mod helpers;
pub mod message;
pub mod persist;
pub mod pipeline;
pub mod quantize;
pub mod remix;
pub mod repair;
pub mod sheet;
pub mod state;
pub mod usage;
