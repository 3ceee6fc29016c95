//! Theme color extraction for the heatmap renderer.
//!
//! # Invariants
//! - Values are trimmed; a missing property reads as an empty string.
//! - Empty `background` or `filled` is reported, never raised.

use crate::model::theme::HeatmapColors;
use log::error;

pub const CSS_BACKGROUND: &str = "--heatmap-background";
pub const CSS_FILLED: &str = "--heatmap-filled";
pub const CSS_DISABLED: &str = "--heatmap-disabled";
pub const CSS_CURSOR: &str = "--heatmap-cursor-hover";
pub const CSS_STROKE: &str = "--heatmap-stroke";

/// Computed style lookup port.
pub trait ComputedStyle {
    /// Raw value of a CSS custom property, `None` when unset.
    fn property_value(&self, name: &str) -> Option<String>;
}

impl<T: ComputedStyle + ?Sized> ComputedStyle for &T {
    fn property_value(&self, name: &str) -> Option<String> {
        (**self).property_value(name)
    }
}

/// Reads the five heatmap color properties.
pub fn resolve_theme_colors(style: &impl ComputedStyle) -> HeatmapColors {
    let read = |name: &str| {
        style
            .property_value(name)
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };
    let colors = HeatmapColors {
        background: read(CSS_BACKGROUND),
        filled: read(CSS_FILLED),
        disabled: read(CSS_DISABLED),
        cursor: read(CSS_CURSOR),
        stroke: read(CSS_STROKE),
    };

    for (name, value) in [(CSS_BACKGROUND, &colors.background), (CSS_FILLED, &colors.filled)] {
        if value.is_empty() {
            error!("event=theme_colors module=theme status=error property={name} reason=empty");
        }
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::{resolve_theme_colors, ComputedStyle, CSS_BACKGROUND, CSS_CURSOR, CSS_FILLED};
    use std::collections::HashMap;

    struct Style(HashMap<&'static str, &'static str>);

    impl ComputedStyle for Style {
        fn property_value(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|value| value.to_string())
        }
    }

    #[test]
    fn values_are_trimmed() {
        let style = Style(HashMap::from([
            (CSS_BACKGROUND, "  #fff "),
            (CSS_FILLED, "#0a0"),
            (CSS_CURSOR, "\t#333\n"),
        ]));
        let colors = resolve_theme_colors(&style);
        assert_eq!(colors.background, "#fff");
        assert_eq!(colors.filled, "#0a0");
        assert_eq!(colors.cursor, "#333");
        assert_eq!(colors.disabled, "");
    }

    #[test]
    fn missing_required_colors_degrade_to_empty() {
        let colors = resolve_theme_colors(&Style(HashMap::new()));
        assert!(colors.background.is_empty());
        assert!(colors.filled.is_empty());
    }
}
