use crate::error::WatermarkError;
use crate::geometry::raster_placements;
use crate::logo::WatermarkLogo;
use docmark_core::models::WatermarkSpec;
use image::{imageops, DynamicImage, GenericImageView, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;

/// Upper bound on a rendered tile side, in pixels.
const MAX_TILE_SIDE: u32 = 8192;

pub struct RasterWatermark;

impl RasterWatermark {
    /// Watermark an encoded image, returning PNG bytes of the same size.
    pub fn apply(
        input: &[u8],
        logo: &WatermarkLogo,
        spec: &WatermarkSpec,
    ) -> Result<Vec<u8>, WatermarkError> {
        let start = std::time::Instant::now();

        let img = ImageReader::new(Cursor::new(input))
            .with_guessed_format()
            .map_err(|e| WatermarkError::UnsupportedMediaType(e.to_string()))?
            .decode()
            .map_err(|e| {
                WatermarkError::UnsupportedMediaType(format!("Failed to decode image: {}", e))
            })?;

        let (width, height) = img.dimensions();
        let canvas = Self::render(img, logo, spec);

        let mut output = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
            .map_err(|e| WatermarkError::Encode(e.to_string()))?;

        tracing::debug!(
            width,
            height,
            input_bytes = input.len(),
            output_bytes = output.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Raster watermark applied"
        );

        Ok(output)
    }

    /// Composite the logo onto a decoded image.
    pub fn render(img: DynamicImage, logo: &WatermarkLogo, spec: &WatermarkSpec) -> RgbaImage {
        let (width, height) = img.dimensions();
        let (logo_w, logo_h) = logo.dimensions();

        let (tile_w, tile_h) = spec
            .size
            .resolve(logo_w, logo_h, width as f32, height as f32);
        let tile_w = (tile_w.round() as u32).clamp(1, MAX_TILE_SIDE);
        let tile_h = (tile_h.round() as u32).clamp(1, MAX_TILE_SIDE);
        let tile = logo.tile(tile_w, tile_h, spec.opacity);

        let mut canvas = img.to_rgba8();
        for (x, y) in raster_placements(width, height, tile_w, tile_h, spec.placement, spec.spacing)
        {
            imageops::overlay(&mut canvas, &tile, x, y);
        }
        canvas
    }
}
