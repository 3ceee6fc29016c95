//! Activity domain model.
//!
//! # Responsibility
//! - Define the read-only activity record the heatmap core works with.
//! - Provide the identifier and axis aliases shared by the sector grid.
//!
//! # Invariants
//! - `uuid` is the stable identity used in deep links and progress records.
//! - `level` is 1-based; level `0` never belongs to any sector.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable activity identifier.
pub type ActivityId = Uuid;

/// Name of one dimension (angular axis of the heatmap).
pub type DimensionLabel = String;

/// 1-based maturity level (radial axis of the heatmap).
pub type Level = u32;

/// One activity as seen by the heatmap core.
///
/// Activity authoring and file parsing live outside the core; only the
/// fields needed for sector placement and detail panels are kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub uuid: ActivityId,
    pub name: String,
    pub dimension: DimensionLabel,
    pub level: Level,
    /// Grouping above dimensions, when the source provides one.
    #[serde(default)]
    pub category: Option<String>,
    /// Markdown description shown in the detail panel.
    #[serde(default)]
    pub description: Option<String>,
}

impl Activity {
    /// Creates an activity with a caller-provided stable ID.
    pub fn new(
        uuid: ActivityId,
        name: impl Into<String>,
        dimension: impl Into<String>,
        level: Level,
    ) -> Self {
        Self {
            uuid,
            name: name.into(),
            dimension: dimension.into(),
            level,
            category: None,
            description: None,
        }
    }

    /// Validates placement fields.
    ///
    /// # Errors
    /// - `EmptyName` / `EmptyDimension` when the trimmed value is blank.
    /// - `InvalidLevel` when `level == 0`.
    pub fn validate(&self) -> Result<(), ActivityValidationError> {
        if self.name.trim().is_empty() {
            return Err(ActivityValidationError::EmptyName(self.uuid));
        }
        if self.dimension.trim().is_empty() {
            return Err(ActivityValidationError::EmptyDimension(self.uuid));
        }
        if self.level == 0 {
            return Err(ActivityValidationError::InvalidLevel(self.uuid));
        }
        Ok(())
    }
}

/// Activity placement validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityValidationError {
    EmptyName(ActivityId),
    EmptyDimension(ActivityId),
    InvalidLevel(ActivityId),
}

impl Display for ActivityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName(id) => write!(f, "activity {id} has an empty name"),
            Self::EmptyDimension(id) => write!(f, "activity {id} has an empty dimension"),
            Self::InvalidLevel(id) => write!(f, "activity {id} must have level >= 1"),
        }
    }
}

impl Error for ActivityValidationError {}
