//! Flutter-facing bindings for the heatmap core.

pub mod api;
