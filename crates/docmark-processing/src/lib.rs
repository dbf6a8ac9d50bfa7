//! Docmark Processing Library
//!
//! Request decoding and the two watermark engines:
//!
//! - [`multipart`]: binary-safe `multipart/form-data` reader
//! - [`image`]: raster engine (PNG/JPEG in, PNG out)
//! - [`document`]: paged engine (PDF in, PDF out)
//! - [`pipeline`]: routes an uploaded asset to the right engine

pub mod error;
pub mod geometry;
pub mod multipart;
pub mod validator;

#[cfg(feature = "document")]
pub mod document;
#[cfg(feature = "image")]
pub mod image;
#[cfg(feature = "image")]
pub mod logo;
#[cfg(all(feature = "image", feature = "document"))]
pub mod pipeline;

pub use error::WatermarkError;
pub use multipart::{boundary_from_content_type, decode_form, DecodedForm, MultipartError, MultipartReader, Part};
pub use validator::{AssetValidator, ValidationError};

#[cfg(feature = "document")]
pub use crate::document::PagedWatermark;
#[cfg(feature = "image")]
pub use crate::image::RasterWatermark;
#[cfg(feature = "image")]
pub use logo::WatermarkLogo;
#[cfg(all(feature = "image", feature = "document"))]
pub use pipeline::WatermarkPipeline;
