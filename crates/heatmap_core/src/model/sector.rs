//! Sector grid model.
//!
//! # Responsibility
//! - Build the flat dimension × level sector list consumed by renderers.
//! - Translate between (dimension, level) coordinates and flat indices.
//!
//! # Invariants
//! - Sector at flat index `i` has `level = i / d + 1` and
//!   `dimension = labels[i % d]` where `d` is the dimension count.
//! - A built `SectorGrid` never reorders; renderers address sectors by index.
//! - Empty labels or `max_level == 0` produce an empty grid, never an error.

use crate::model::activity::{Activity, ActivityId, DimensionLabel, Level};
use serde::Serialize;

/// One cell of the heatmap: all activities of one dimension at one level.
///
/// A sector without activities is valid and rendered as disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sector {
    pub dimension: DimensionLabel,
    pub level: Level,
    pub activities: Vec<Activity>,
}

impl Sector {
    /// Returns whether this sector has no activities.
    pub fn is_disabled(&self) -> bool {
        self.activities.is_empty()
    }

    /// Returns whether this sector holds the given activity.
    pub fn contains_activity(&self, uuid: ActivityId) -> bool {
        self.activities.iter().any(|activity| activity.uuid == uuid)
    }
}

/// Builds sectors level-major: outer loop over `1..=max_level`, inner loop
/// over `dimension_labels` in their given order.
pub fn build_sectors<F>(
    dimension_labels: &[DimensionLabel],
    max_level: Level,
    mut lookup_activities: F,
) -> Vec<Sector>
where
    F: FnMut(&str, Level) -> Vec<Activity>,
{
    if dimension_labels.is_empty() || max_level < 1 {
        return Vec::new();
    }

    let mut sectors = Vec::with_capacity(dimension_labels.len() * max_level as usize);
    for level in 1..=max_level {
        for dimension in dimension_labels {
            sectors.push(Sector {
                dimension: dimension.clone(),
                level,
                activities: lookup_activities(dimension.as_str(), level),
            });
        }
    }
    sectors
}

/// Immutable, positionally indexed sector list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorGrid {
    dimension_labels: Vec<DimensionLabel>,
    max_level: Level,
    sectors: Vec<Sector>,
}

impl SectorGrid {
    /// Builds a grid through [`build_sectors`].
    pub fn build<F>(dimension_labels: Vec<DimensionLabel>, max_level: Level, lookup: F) -> Self
    where
        F: FnMut(&str, Level) -> Vec<Activity>,
    {
        let sectors = build_sectors(&dimension_labels, max_level, lookup);
        let max_level = if sectors.is_empty() { 0 } else { max_level };
        Self {
            dimension_labels,
            max_level,
            sectors,
        }
    }

    pub fn dimension_labels(&self) -> &[DimensionLabel] {
        &self.dimension_labels
    }

    /// Effective max level; `0` for an empty grid.
    pub fn max_level(&self) -> Level {
        self.max_level
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter()
    }

    /// Returns the flat index for `(dimension, level)`.
    pub fn index_of(&self, dimension: &str, level: Level) -> Option<usize> {
        if level < 1 || level > self.max_level {
            return None;
        }
        let dimension_index = self
            .dimension_labels
            .iter()
            .position(|label| label == dimension)?;
        Some(dimension_index + self.dimension_labels.len() * (level as usize - 1))
    }

    /// Returns the index of the sector holding `uuid`.
    pub fn index_of_activity(&self, uuid: ActivityId) -> Option<usize> {
        self.sectors
            .iter()
            .position(|sector| sector.contains_activity(uuid))
    }
}
