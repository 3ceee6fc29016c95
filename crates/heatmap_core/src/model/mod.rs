//! Heatmap domain model.
//!
//! # Responsibility
//! - Define activities, sectors, teams and progress stages used by services.
//! - Keep positional sector addressing in one place.
//!
//! # Invariants
//! - Activities are identified by a stable `ActivityId`.
//! - Sector order is fixed once a grid is built.

pub mod activity;
pub mod progress;
pub mod sector;
pub mod team;
pub mod theme;
