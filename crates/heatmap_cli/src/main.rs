//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `heatmap_core` linkage.
//! - Print a small demo grid with deterministic output.

use heatmap_core::{build_sectors, pinch, Activity, ActivityId, PINCH_MAX, PINCH_MIN};

fn main() {
    println!("heatmap_core ping={}", heatmap_core::ping());
    println!("heatmap_core version={}", heatmap_core::core_version());

    let labels = ["Build", "Deploy", "Test"].map(str::to_string);
    let sectors = build_sectors(&labels, 2, |dimension, level| {
        if dimension == "Deploy" && level == 2 {
            Vec::new()
        } else {
            vec![Activity::new(
                ActivityId::nil(),
                format!("{dimension} L{level}"),
                dimension,
                level,
            )]
        }
    });
    for (index, sector) in sectors.iter().enumerate() {
        let state = if sector.is_disabled() { "disabled" } else { "enabled" };
        println!(
            "sector index-{index} dimension={} level={} {state}",
            sector.dimension, sector.level
        );
    }
    println!("pinch 0.5 -> {:.2}", pinch(PINCH_MIN, PINCH_MAX, 0.5));
}
