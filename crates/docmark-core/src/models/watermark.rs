use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Where copies of the mark are placed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Repeating grid covering the whole canvas
    #[default]
    Tiled,
    /// A single copy in the middle
    Centered,
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiled" | "tile" => Ok(Placement::Tiled),
            "centered" | "center" | "centre" => Ok(Placement::Centered),
            other => Err(format!("Invalid placement: {}", other)),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Tiled => write!(f, "tiled"),
            Placement::Centered => write!(f, "centered"),
        }
    }
}

/// Rendered size of one copy of the mark. Height always follows the logo's
/// aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum WatermarkSize {
    /// Multiple of the logo's natural size (1 px maps to 1 pt on pages)
    LogoRelative { factor: f32 },
    /// Fraction of the shorter canvas side
    CanvasRelative { fraction: f32 },
    /// Fixed width in pixels (raster) or points (pages)
    Absolute { width: f32 },
}

impl WatermarkSize {
    fn magnitude(&self) -> f32 {
        match *self {
            WatermarkSize::LogoRelative { factor } => factor,
            WatermarkSize::CanvasRelative { fraction } => fraction,
            WatermarkSize::Absolute { width } => width,
        }
    }

    /// Resolve to a `(width, height)` for a logo of `logo_w`×`logo_h` drawn
    /// on a `canvas_w`×`canvas_h` surface.
    pub fn resolve(&self, logo_w: u32, logo_h: u32, canvas_w: f32, canvas_h: f32) -> (f32, f32) {
        let logo_w = logo_w.max(1) as f32;
        let logo_h = logo_h.max(1) as f32;
        let aspect = logo_h / logo_w;

        let width = match *self {
            WatermarkSize::LogoRelative { factor } => logo_w * factor,
            WatermarkSize::CanvasRelative { fraction } => canvas_w.min(canvas_h) * fraction,
            WatermarkSize::Absolute { width } => width,
        };

        (width, width * aspect)
    }
}

/// How the translucent mark is rendered. The logo bytes themselves are
/// injected separately and shared across requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkSpec {
    pub opacity: f32,
    pub placement: Placement,
    pub size: WatermarkSize,
    /// Multiplier applied to the rendered size to get the grid stride
    pub spacing: f32,
}

pub const DEFAULT_OPACITY: f32 = 0.25;

impl WatermarkSpec {
    /// Defaults used for raster images.
    pub fn raster_default() -> Self {
        WatermarkSpec {
            opacity: DEFAULT_OPACITY,
            placement: Placement::Tiled,
            size: WatermarkSize::CanvasRelative { fraction: 0.2 },
            spacing: 1.5,
        }
    }

    /// Defaults used for PDF pages.
    pub fn paged_default() -> Self {
        WatermarkSpec {
            opacity: DEFAULT_OPACITY,
            placement: Placement::Tiled,
            size: WatermarkSize::LogoRelative { factor: 0.2 },
            spacing: 2.0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.opacity > 0.0 && self.opacity < 1.0) {
            return Err(format!(
                "opacity must be strictly between 0 and 1, got {}",
                self.opacity
            ));
        }
        let magnitude = self.size.magnitude();
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return Err(format!("watermark size must be positive, got {}", magnitude));
        }
        if !(self.spacing.is_finite() && self.spacing > 1.0) {
            return Err(format!(
                "spacing must be greater than 1, got {}",
                self.spacing
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_from_str() {
        assert_eq!("tiled".parse::<Placement>().unwrap(), Placement::Tiled);
        assert_eq!("CENTERED".parse::<Placement>().unwrap(), Placement::Centered);
        assert!("diagonal".parse::<Placement>().is_err());
    }

    #[test]
    fn test_resolve_logo_relative() {
        let size = WatermarkSize::LogoRelative { factor: 0.2 };
        assert_eq!(size.resolve(500, 250, 600.0, 800.0), (100.0, 50.0));
    }

    #[test]
    fn test_resolve_canvas_relative_uses_shorter_side() {
        let size = WatermarkSize::CanvasRelative { fraction: 0.5 };
        let (w, h) = size.resolve(100, 50, 400.0, 200.0);
        assert_eq!(w, 100.0);
        assert_eq!(h, 50.0);
    }

    #[test]
    fn test_resolve_absolute() {
        let size = WatermarkSize::Absolute { width: 64.0 };
        assert_eq!(size.resolve(32, 16, 10.0, 10.0), (64.0, 32.0));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(WatermarkSpec::raster_default().validate().is_ok());
        assert!(WatermarkSpec::paged_default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut spec = WatermarkSpec::raster_default();
        spec.opacity = 1.0;
        assert!(spec.validate().is_err());

        let mut spec = WatermarkSpec::raster_default();
        spec.spacing = 1.0;
        assert!(spec.validate().is_err());

        let mut spec = WatermarkSpec::paged_default();
        spec.size = WatermarkSize::LogoRelative { factor: 0.0 };
        assert!(spec.validate().is_err());
    }
}
