//! The brand mark drawn by both engines.

use crate::error::WatermarkError;
use image::imageops::{self, FilterType};
use image::{ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Decoded logo, loaded once and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct WatermarkLogo {
    image: RgbaImage,
}

impl WatermarkLogo {
    pub fn from_image(image: RgbaImage) -> Result<Self, WatermarkError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(WatermarkError::LogoUnavailable(
                "logo image is empty".to_string(),
            ));
        }
        Ok(WatermarkLogo { image })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WatermarkError> {
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| WatermarkError::LogoUnavailable(e.to_string()))?
            .decode()
            .map_err(|e| WatermarkError::LogoUnavailable(e.to_string()))?;
        Self::from_image(decoded.to_rgba8())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            WatermarkError::LogoUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let logo = Self::from_bytes(&bytes)?;
        tracing::info!(
            path = %path.display(),
            width = logo.image.width(),
            height = logo.image.height(),
            "Watermark logo loaded"
        );
        Ok(logo)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// The logo resized to `width`×`height` with every pixel's alpha scaled
    /// by `opacity`.
    pub fn tile(&self, width: u32, height: u32, opacity: f32) -> RgbaImage {
        let (w, h) = (width.max(1), height.max(1));
        let mut tile = if (w, h) == self.image.dimensions() {
            self.image.clone()
        } else {
            imageops::resize(&self.image, w, h, select_filter(self.image.dimensions(), (w, h)))
        };

        let opacity = opacity.clamp(0.0, 1.0);
        for pixel in tile.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity) as u8;
        }
        tile
    }
}

fn select_filter(from: (u32, u32), to: (u32, u32)) -> FilterType {
    if to.0 < from.0 / 2 || to.1 < from.1 / 2 {
        FilterType::Triangle
    } else {
        FilterType::Lanczos3
    }
}
