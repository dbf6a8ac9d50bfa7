use docmark_core::models::{AssetKind, ACCEPTED_CONTENT_TYPES};
use docmark_core::AppError;

/// Validation errors for uploaded assets
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported content type: {content_type} (accepted: {accepted})")]
    InvalidContentType {
        content_type: String,
        accepted: String,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ValidationError::InvalidContentType { .. } => {
                AppError::UnsupportedMediaType(err.to_string())
            }
            ValidationError::InvalidFilename(_) | ValidationError::EmptyFile => {
                AppError::MalformedRequest(err.to_string())
            }
        }
    }
}

/// Checks an asset before any engine runs.
#[derive(Debug, Clone)]
pub struct AssetValidator {
    max_file_size: usize,
}

impl AssetValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Classify the declared content type, rejecting anything the engines
    /// cannot handle.
    pub fn validate_content_type(&self, content_type: &str) -> Result<AssetKind, ValidationError> {
        AssetKind::from_mime_type(content_type).ok_or_else(|| {
            ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                accepted: ACCEPTED_CONTENT_TYPES.join(", "),
            }
        })
    }

    pub fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::InvalidFilename(
                "file name is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate all aspects of a file
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: usize,
    ) -> Result<AssetKind, ValidationError> {
        let kind = self.validate_content_type(content_type)?;
        self.validate_filename(filename)?;
        self.validate_file_size(file_size)?;
        Ok(kind)
    }
}
