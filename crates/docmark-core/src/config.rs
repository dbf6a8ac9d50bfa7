//! Configuration module
//!
//! Environment-driven settings for the HTTP surface, storage backends and
//! the watermark engines.

use std::env;

use crate::models::{Placement, WatermarkSize, WatermarkSpec};
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 3000;
const MAX_UPLOAD_SIZE_MB: usize = 50;
const URL_FETCH_TIMEOUT_SECS: u64 = 60;
const UPLOAD_TOKEN_TTL_SECS: u64 = 900;
const LOCAL_STORAGE_PATH: &str = "./data";
const LOCAL_STORAGE_BASE_URL: &str = "http://localhost:3000/files";
const DOCUMENT_VIEW_BASE_URL: &str = "http://localhost:3000/view";
const WATERMARK_LOGO_PATH: &str = "logo-watermark.png";

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Watermark rendering settings, one spec per engine.
#[derive(Clone, Debug)]
pub struct WatermarkSettings {
    pub logo_path: String,
    pub raster: WatermarkSpec,
    pub paged: WatermarkSpec,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        WatermarkSettings {
            logo_path: WATERMARK_LOGO_PATH.to_string(),
            raster: WatermarkSpec::raster_default(),
            paged: WatermarkSpec::paged_default(),
        }
    }
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct DocmarkConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO, R2, Spaces)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    /// Base of the shareable `link` written into each document
    pub document_view_base_url: String,
    pub watermark: WatermarkSettings,
    pub max_upload_size_bytes: usize,
    // Source fetching for the watermark-by-URL mode.
    // If set, only URLs on these domains (or their subdomains) are fetched.
    pub url_fetch_allowlist: Option<Vec<String>>,
    pub url_fetch_timeout_secs: u64,
    pub upload_token_ttl_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DocmarkConfig>);

impl Config {
    fn inner(&self) -> &DocmarkConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DocmarkConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    /// `S3_REGION`, falling back to `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.inner()
            .s3_region
            .as_deref()
            .or(self.inner().aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn document_view_base_url(&self) -> &str {
        &self.inner().document_view_base_url
    }

    pub fn watermark(&self) -> &WatermarkSettings {
        &self.inner().watermark
    }

    pub fn watermark_logo_path(&self) -> &str {
        &self.inner().watermark.logo_path
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn url_fetch_allowlist(&self) -> Option<&[String]> {
        self.inner().url_fetch_allowlist.as_deref()
    }

    pub fn url_fetch_timeout_secs(&self) -> u64 {
        self.inner().url_fetch_timeout_secs
    }

    pub fn upload_token_ttl_secs(&self) -> u64 {
        self.inner().upload_token_ttl_secs
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl DocmarkConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            cors_origins,
            environment,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let placement = match env::var("WATERMARK_PLACEMENT") {
            Ok(value) => value
                .parse::<Placement>()
                .map_err(|e| anyhow::anyhow!("WATERMARK_PLACEMENT: {}", e))?,
            Err(_) => Placement::Tiled,
        };
        let opacity = env_or("WATERMARK_OPACITY", crate::models::DEFAULT_OPACITY);

        let raster_default = WatermarkSpec::raster_default();
        let paged_default = WatermarkSpec::paged_default();
        let watermark = WatermarkSettings {
            logo_path: env::var("WATERMARK_LOGO_PATH")
                .unwrap_or_else(|_| WATERMARK_LOGO_PATH.to_string()),
            raster: WatermarkSpec {
                opacity,
                placement,
                size: WatermarkSize::CanvasRelative {
                    fraction: env_or("WATERMARK_RASTER_SCALE", 0.2),
                },
                spacing: env_or("WATERMARK_RASTER_SPACING", raster_default.spacing),
            },
            paged: WatermarkSpec {
                opacity,
                placement,
                size: WatermarkSize::LogoRelative {
                    factor: env_or("WATERMARK_PAGED_SCALE", 0.2),
                },
                spacing: env_or("WATERMARK_PAGED_SPACING", paged_default.spacing),
            },
        };

        let max_upload_size_mb = env_or("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB);

        let url_fetch_allowlist = env::var("URL_FETCH_ALLOWLIST")
            .ok()
            .map(|s| parse_list(&s))
            .filter(|list| !list.is_empty());

        Ok(DocmarkConfig {
            base,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: Some(
                env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| LOCAL_STORAGE_PATH.to_string()),
            ),
            local_storage_base_url: Some(
                env::var("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|_| LOCAL_STORAGE_BASE_URL.to_string()),
            ),
            document_view_base_url: env::var("DOCUMENT_VIEW_BASE_URL")
                .unwrap_or_else(|_| DOCUMENT_VIEW_BASE_URL.to_string()),
            watermark,
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            url_fetch_allowlist,
            url_fetch_timeout_secs: env_or("URL_FETCH_TIMEOUT_SECS", URL_FETCH_TIMEOUT_SECS),
            upload_token_ttl_secs: env_or("UPLOAD_TOKEN_TTL_SECS", UPLOAD_TOKEN_TTL_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.watermark
            .raster
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid raster watermark settings: {}", e))?;
        self.watermark
            .paged
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid paged watermark settings: {}", e))?;

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.document_view_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("DOCUMENT_VIEW_BASE_URL must not be empty"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Local-backend configuration rooted at `path`, used by tests and
    /// tooling that do not read the environment.
    pub fn local(path: impl Into<String>, base_url: impl Into<String>) -> Self {
        DocmarkConfig {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
            },
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some(path.into()),
            local_storage_base_url: Some(base_url.into()),
            document_view_base_url: DOCUMENT_VIEW_BASE_URL.to_string(),
            watermark: WatermarkSettings::default(),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            url_fetch_allowlist: None,
            url_fetch_timeout_secs: URL_FETCH_TIMEOUT_SECS,
            upload_token_ttl_secs: UPLOAD_TOKEN_TTL_SECS,
        }
    }
}
