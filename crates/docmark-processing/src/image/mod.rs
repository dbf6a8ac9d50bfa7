//! Raster watermark engine
//!
//! Decodes PNG/JPEG (and other formats the `image` crate recognizes),
//! composites the translucent logo, and always re-encodes as PNG.

pub mod watermark;

pub use watermark::RasterWatermark;
