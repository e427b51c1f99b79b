use serde::{Deserialize, Serialize};

use crate::core::{ArchiveConfig, AxisScaleMode, Palette, XValueTransform};
use crate::error::{PlotError, PlotResult};
use crate::render::PathBuilderConfig;

/// Public live-plot bootstrap configuration.
///
/// Serializable so hosts can persist plot setup alongside their own settings.
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePlotConfig {
    /// Queue redraws and use incremental bounds instead of redrawing per append.
    #[serde(default)]
    pub turbo_mode: bool,
    /// Width of the strip window in transformed domain units (turbo mode only).
    #[serde(default)]
    pub strip_width: Option<f64>,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub path_builder: PathBuilderConfig,
    #[serde(default)]
    pub x_transform: XValueTransform,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default = "default_secondary_axis_enabled")]
    pub secondary_axis_enabled: bool,
    #[serde(default)]
    pub domain_scale: AxisScaleMode,
    #[serde(default)]
    pub range_scale: AxisScaleMode,
}

impl Default for LivePlotConfig {
    fn default() -> Self {
        Self {
            turbo_mode: false,
            strip_width: None,
            archive: ArchiveConfig::default(),
            path_builder: PathBuilderConfig::default(),
            x_transform: XValueTransform::identity(),
            palette: Palette::default(),
            secondary_axis_enabled: default_secondary_axis_enabled(),
            domain_scale: AxisScaleMode::Linear,
            range_scale: AxisScaleMode::Linear,
        }
    }
}

impl LivePlotConfig {
    #[must_use]
    pub fn with_turbo_mode(mut self, turbo_mode: bool) -> Self {
        self.turbo_mode = turbo_mode;
        self
    }

    #[must_use]
    pub fn with_strip_width(mut self, strip_width: Option<f64>) -> Self {
        self.strip_width = strip_width;
        self
    }

    #[must_use]
    pub fn with_archive(mut self, archive: ArchiveConfig) -> Self {
        self.archive = archive;
        self
    }

    #[must_use]
    pub fn with_path_builder(mut self, path_builder: PathBuilderConfig) -> Self {
        self.path_builder = path_builder;
        self
    }

    #[must_use]
    pub fn with_x_transform(mut self, x_transform: XValueTransform) -> Self {
        self.x_transform = x_transform;
        self
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    #[must_use]
    pub fn with_secondary_axis(mut self, enabled: bool) -> Self {
        self.secondary_axis_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_domain_scale(mut self, mode: AxisScaleMode) -> Self {
        self.domain_scale = mode;
        self
    }

    #[must_use]
    pub fn with_range_scale(mut self, mode: AxisScaleMode) -> Self {
        self.range_scale = mode;
        self
    }

    pub fn validate(self) -> PlotResult<Self> {
        if let Some(width) = self.strip_width {
            validate_strip_width(width)?;
        }
        let archive = self.archive.validate()?;
        let path_builder = self.path_builder.validate()?;
        let x_transform = self.x_transform.validate()?;
        let palette = self.palette.validate()?;
        Ok(Self {
            archive,
            path_builder,
            x_transform,
            palette,
            ..self
        })
    }

    pub fn to_json_pretty(&self) -> PlotResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PlotError::InvalidData(format!("failed to serialize plot config: {e}")))
    }

    pub fn from_json_str(input: &str) -> PlotResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| PlotError::InvalidData(format!("failed to parse plot config: {e}")))?;
        config.validate()
    }
}

pub(crate) fn validate_strip_width(width: f64) -> PlotResult<f64> {
    if !width.is_finite() || width <= 0.0 {
        return Err(PlotError::InvalidData(
            "strip width must be finite and > 0".to_owned(),
        ));
    }
    Ok(width)
}

fn default_secondary_axis_enabled() -> bool {
    true
}
