use docmark_core::AppError;

/// Failures while rendering a watermark.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Watermark logo unavailable: {0}")]
    LogoUnavailable(String),

    #[error("Failed to encode output: {0}")]
    Encode(String),

    #[error(transparent)]
    Validation(#[from] crate::validator::ValidationError),

    #[error("Watermark task failed: {0}")]
    Task(String),
}

impl From<WatermarkError> for AppError {
    fn from(err: WatermarkError) -> Self {
        match err {
            WatermarkError::UnsupportedMediaType(msg) => AppError::UnsupportedMediaType(msg),
            WatermarkError::CorruptDocument(msg) => AppError::CorruptDocument(msg),
            WatermarkError::LogoUnavailable(msg) => AppError::Io(msg),
            WatermarkError::Validation(e) => e.into(),
            WatermarkError::Encode(msg) | WatermarkError::Task(msg) => AppError::Internal(msg),
        }
    }
}
