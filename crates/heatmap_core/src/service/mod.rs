//! Core use-case services.
//!
//! # Responsibility
//! - Turn model and repository state into dashboard-level operations.
//! - Keep renderer, navigation and dialog concerns behind ports.

pub mod deep_link_service;
pub mod filter_service;
pub mod heatmap_service;
pub mod sector_service;
pub mod theme_service;
