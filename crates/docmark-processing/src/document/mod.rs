//! Paged (PDF) watermark engine

pub mod watermark;

pub use watermark::PagedWatermark;
