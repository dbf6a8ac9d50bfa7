//! Media-type routing between the raster and paged engines

use crate::document::PagedWatermark;
use crate::error::WatermarkError;
use crate::image::RasterWatermark;
use crate::logo::WatermarkLogo;
use crate::validator::AssetValidator;
use docmark_core::models::{
    normalize_mime_type, output_file_name, AssetKind, UploadedAsset, WatermarkSpec,
    WatermarkedAsset,
};
use std::sync::Arc;

/// Shared watermarking service. Built once at startup and cloned through
/// application state.
pub struct WatermarkPipeline {
    logo: Arc<WatermarkLogo>,
    raster: WatermarkSpec,
    paged: WatermarkSpec,
    validator: AssetValidator,
}

impl WatermarkPipeline {
    pub fn new(
        logo: Arc<WatermarkLogo>,
        raster: WatermarkSpec,
        paged: WatermarkSpec,
        validator: AssetValidator,
    ) -> Self {
        Self {
            logo,
            raster,
            paged,
            validator,
        }
    }

    pub fn validator(&self) -> &AssetValidator {
        &self.validator
    }

    /// Classify an asset without rendering it.
    pub fn classify(&self, asset: &UploadedAsset) -> Result<AssetKind, WatermarkError> {
        Ok(self
            .validator
            .validate_all(&asset.file_name, &asset.mime_type, asset.bytes.len())?)
    }

    /// Watermark an asset on the current thread.
    pub fn process(&self, asset: &UploadedAsset) -> Result<WatermarkedAsset, WatermarkError> {
        let kind = self.classify(asset)?;

        let bytes = match kind {
            AssetKind::Paged => PagedWatermark::apply(&asset.bytes, &self.logo, &self.paged)?,
            AssetKind::Raster => RasterWatermark::apply(&asset.bytes, &self.logo, &self.raster)?,
        };

        tracing::info!(
            file_name = %asset.file_name,
            mime_type = %normalize_mime_type(&asset.mime_type),
            kind = ?kind,
            input_bytes = asset.bytes.len(),
            output_bytes = bytes.len(),
            "Asset watermarked"
        );

        Ok(WatermarkedAsset {
            bytes,
            mime_type: kind.output_mime_type().to_string(),
            file_name: output_file_name(&asset.file_name, kind),
        })
    }

    /// Watermark an asset on tokio's blocking pool.
    pub async fn process_blocking(
        self: &Arc<Self>,
        asset: UploadedAsset,
    ) -> Result<WatermarkedAsset, WatermarkError> {
        // Reject unsupported types before paying for a blocking task
        self.classify(&asset)?;

        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || pipeline.process(&asset))
            .await
            .map_err(|e| WatermarkError::Task(e.to_string()))?
    }
}
