//! Activity lookup contracts and in-memory implementation.
//!
//! # Responsibility
//! - Answer the lookups the sector grid and deep links need.
//! - Preserve dimension first-seen order, which drives sector indices.
//!
//! # Invariants
//! - Every stored activity passed `Activity::validate()`.
//! - UUIDs are unique; a later duplicate replaces the earlier record in place.

use crate::model::activity::{Activity, ActivityId, ActivityValidationError, DimensionLabel, Level};
use std::collections::HashMap;

/// Read-only activity lookup port.
pub trait ActivityRepository {
    /// Activities of one dimension at one level, in load order.
    fn activities(&self, dimension: &str, level: Level) -> Vec<Activity>;
    fn activity_by_uuid(&self, uuid: ActivityId) -> Option<Activity>;
    fn activity_by_name(&self, name: &str) -> Option<Activity>;
    /// Dimension names in first-seen order.
    fn dimension_names(&self) -> Vec<DimensionLabel>;
    /// Highest level of any activity, `None` when empty.
    fn max_level(&self) -> Option<Level>;
    /// Activity name lookup used for progress export comments.
    fn activity_names(&self) -> HashMap<ActivityId, String>;
}

/// Activity store held fully in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityRepository {
    activities: Vec<Activity>,
    dimensions: Vec<DimensionLabel>,
}

impl InMemoryActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already loaded activities.
    pub fn from_activities(
        activities: impl IntoIterator<Item = Activity>,
    ) -> Result<Self, ActivityValidationError> {
        let mut repo = Self::new();
        for activity in activities {
            repo.insert(activity)?;
        }
        Ok(repo)
    }

    /// Adds or replaces one activity.
    pub fn insert(&mut self, activity: Activity) -> Result<(), ActivityValidationError> {
        activity.validate()?;
        if !self.dimensions.contains(&activity.dimension) {
            self.dimensions.push(activity.dimension.clone());
        }
        match self
            .activities
            .iter_mut()
            .find(|existing| existing.uuid == activity.uuid)
        {
            Some(existing) => *existing = activity,
            None => self.activities.push(activity),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

impl ActivityRepository for InMemoryActivityRepository {
    fn activities(&self, dimension: &str, level: Level) -> Vec<Activity> {
        self.activities
            .iter()
            .filter(|activity| activity.dimension == dimension && activity.level == level)
            .cloned()
            .collect()
    }

    fn activity_by_uuid(&self, uuid: ActivityId) -> Option<Activity> {
        self.activities
            .iter()
            .find(|activity| activity.uuid == uuid)
            .cloned()
    }

    fn activity_by_name(&self, name: &str) -> Option<Activity> {
        self.activities
            .iter()
            .find(|activity| activity.name == name)
            .cloned()
    }

    fn dimension_names(&self) -> Vec<DimensionLabel> {
        self.dimensions.clone()
    }

    fn max_level(&self) -> Option<Level> {
        self.activities.iter().map(|activity| activity.level).max()
    }

    fn activity_names(&self) -> HashMap<ActivityId, String> {
        self.activities
            .iter()
            .map(|activity| (activity.uuid, activity.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityRepository, InMemoryActivityRepository};
    use crate::model::activity::Activity;
    use uuid::Uuid;

    #[test]
    fn dimensions_keep_first_seen_order() {
        let repo = InMemoryActivityRepository::from_activities(vec![
            Activity::new(Uuid::new_v4(), "b1", "Build", 1),
            Activity::new(Uuid::new_v4(), "t1", "Test", 2),
            Activity::new(Uuid::new_v4(), "b2", "Build", 3),
        ])
        .unwrap();
        assert_eq!(repo.dimension_names(), vec!["Build", "Test"]);
        assert_eq!(repo.max_level(), Some(3));
        assert_eq!(repo.activities("Build", 3).len(), 1);
    }

    #[test]
    fn duplicate_uuid_replaces_record() {
        let id = Uuid::new_v4();
        let repo = InMemoryActivityRepository::from_activities(vec![
            Activity::new(id, "old", "Build", 1),
            Activity::new(id, "new", "Build", 1),
        ])
        .unwrap();
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.activity_by_uuid(id).map(|a| a.name), Some("new".to_string()));
        assert!(repo.activity_by_name("old").is_none());
    }

    #[test]
    fn empty_store_has_no_max_level() {
        assert_eq!(InMemoryActivityRepository::new().max_level(), None);
    }
}
