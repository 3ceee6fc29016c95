//! Renderer-facing color and layout configuration.

use crate::model::activity::{DimensionLabel, Level};
use serde::{Deserialize, Serialize};

/// Width of the square SVG view box, in user units.
pub const DEFAULT_IMAGE_WIDTH: u32 = 1200;
/// Margin applied on every side of the view box.
pub const DEFAULT_MARGIN: u32 = 5;

/// Colors resolved from the active theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapColors {
    /// Color for 0% progress.
    pub background: String,
    /// Color for 100% progress.
    pub filled: String,
    /// Color for sectors without activities.
    pub disabled: String,
    pub cursor: String,
    pub stroke: String,
}

/// Parameters handed to the renderer on initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapConfig {
    pub image_width: u32,
    pub margin: u32,
    pub max_level: Level,
    pub dimension_labels: Vec<DimensionLabel>,
    pub colors: HeatmapColors,
}

impl HeatmapConfig {
    pub fn new(
        max_level: Level,
        dimension_labels: Vec<DimensionLabel>,
        colors: HeatmapColors,
    ) -> Self {
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            margin: DEFAULT_MARGIN,
            max_level,
            dimension_labels,
            colors,
        }
    }
}
