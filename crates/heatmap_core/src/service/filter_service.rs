//! Team and team-group filter coordination.
//!
//! # Responsibility
//! - Own the single set of selected teams.
//! - Derive the per-team and per-group chip states from that set.
//!
//! # Invariants
//! - A group reads as active iff its member set equals the selected set.
//!   The "all teams" group (no members) is active iff nothing is selected.
//! - `has_teams_filter()` is recomputed from the selection on every call.
//! - Activating an already active group is a no-op.

use crate::model::team::{GroupName, TeamGroups, TeamName};
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Filter toggle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    UnknownTeam(TeamName),
    UnknownGroup(GroupName),
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTeam(team) => write!(f, "unknown team: `{team}`"),
            Self::UnknownGroup(group) => write!(f, "unknown team group: `{group}`"),
        }
    }
}

impl Error for FilterError {}

/// Result of a team chip toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamToggle {
    /// Selected teams in declared team order.
    pub visible_teams: Vec<TeamName>,
    /// First group whose members equal the selection, if any.
    pub matching_group: Option<GroupName>,
}

/// Result of a group chip toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupToggle {
    pub visible_teams: Vec<TeamName>,
    /// `false` when the group was already active and nothing changed.
    pub changed: bool,
}

/// Team/group filter state derived from one selected-team set.
#[derive(Debug, Clone)]
pub struct TeamFilterCoordinator {
    teams: Vec<TeamName>,
    groups: TeamGroups,
    selected: BTreeSet<TeamName>,
}

impl TeamFilterCoordinator {
    /// Starts with no team selected, so the "all teams" group is active.
    pub fn new(teams: Vec<TeamName>, groups: TeamGroups) -> Self {
        Self {
            teams,
            groups,
            selected: BTreeSet::new(),
        }
    }

    pub fn teams(&self) -> &[TeamName] {
        &self.teams
    }

    pub fn groups(&self) -> &TeamGroups {
        &self.groups
    }

    /// Flips one team and reports the group matching the new selection.
    pub fn toggle_team(&mut self, team: &str) -> Result<TeamToggle, FilterError> {
        let team = team.trim();
        if !self.teams.iter().any(|known| known == team) {
            return Err(FilterError::UnknownTeam(team.to_string()));
        }

        let selected = if self.selected.remove(team) {
            false
        } else {
            self.selected.insert(team.to_string());
            true
        };
        let matching_group = self.active_group().map(str::to_string);
        info!(
            "event=filter_team module=filter status=ok team={team} selected={selected} group={}",
            matching_group.as_deref().unwrap_or("-")
        );

        Ok(TeamToggle {
            visible_teams: self.visible_teams(),
            matching_group,
        })
    }

    /// Selects exactly the members of `group`, unless it is already active.
    pub fn toggle_group(&mut self, group: &str) -> Result<GroupToggle, FilterError> {
        let group = group.trim();
        let members = self
            .groups
            .members(group)
            .ok_or_else(|| FilterError::UnknownGroup(group.to_string()))?;

        if self.is_group_active(group) {
            info!("event=filter_group module=filter status=skipped group={group} reason=already_active");
            return Ok(GroupToggle {
                visible_teams: self.visible_teams(),
                changed: false,
            });
        }

        self.selected = members.iter().cloned().collect();
        info!(
            "event=filter_group module=filter status=ok group={group} teams={}",
            self.selected.len()
        );
        Ok(GroupToggle {
            visible_teams: self.visible_teams(),
            changed: true,
        })
    }

    /// Selected teams in declared order.
    pub fn visible_teams(&self) -> Vec<TeamName> {
        self.teams
            .iter()
            .filter(|team| self.selected.contains(team.as_str()))
            .cloned()
            .collect()
    }

    pub fn has_teams_filter(&self) -> bool {
        self.teams
            .iter()
            .any(|team| self.selected.contains(team.as_str()))
    }

    pub fn is_team_selected(&self, team: &str) -> bool {
        self.selected.contains(team)
    }

    pub fn is_group_active(&self, group: &str) -> bool {
        self.groups
            .members(group)
            .is_some_and(|members| self.equals_selection(members))
    }

    /// First active group in declared order.
    pub fn active_group(&self) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, members)| self.equals_selection(members))
            .map(|(name, _)| name)
    }

    /// Per-team chip states in declared order.
    pub fn team_filters(&self) -> Vec<(TeamName, bool)> {
        self.teams
            .iter()
            .map(|team| (team.clone(), self.selected.contains(team.as_str())))
            .collect()
    }

    /// Per-group chip states in declared order.
    pub fn group_filters(&self) -> Vec<(GroupName, bool)> {
        self.groups
            .iter()
            .map(|(name, members)| (name.to_string(), self.equals_selection(members)))
            .collect()
    }

    fn equals_selection(&self, members: &[TeamName]) -> bool {
        let members = members.iter().map(String::as_str).collect::<BTreeSet<_>>();
        members.len() == self.selected.len()
            && members
                .iter()
                .all(|member| self.selected.contains(*member))
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterError, TeamFilterCoordinator};
    use crate::model::team::TeamGroups;

    fn coordinator() -> TeamFilterCoordinator {
        let teams = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let groups = TeamGroups::new(
            "All",
            &teams,
            vec![("Core".to_string(), vec!["A".to_string(), "B".to_string()])],
        );
        TeamFilterCoordinator::new(teams, groups)
    }

    #[test]
    fn starts_with_all_group_active() {
        let filters = coordinator();
        assert_eq!(filters.active_group(), Some("All"));
        assert!(!filters.has_teams_filter());
    }

    #[test]
    fn manual_selection_matches_group() {
        let mut filters = coordinator();
        let first = filters.toggle_team("A").unwrap();
        assert_eq!(first.matching_group, None);
        let second = filters.toggle_team("B").unwrap();
        assert_eq!(second.matching_group.as_deref(), Some("Core"));
        assert_eq!(second.visible_teams, vec!["A", "B"]);
        assert!(filters.is_group_active("Core"));
        assert!(!filters.is_group_active("All"));
    }

    #[test]
    fn group_toggle_is_guarded() {
        let mut filters = coordinator();
        let first = filters.toggle_group("Core").unwrap();
        assert!(first.changed);
        let second = filters.toggle_group("Core").unwrap();
        assert!(!second.changed);
        assert_eq!(first.visible_teams, second.visible_teams);
    }

    #[test]
    fn all_group_clears_selection() {
        let mut filters = coordinator();
        filters.toggle_team("C").unwrap();
        let toggle = filters.toggle_group("All").unwrap();
        assert!(toggle.visible_teams.is_empty());
        assert!(!filters.has_teams_filter());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut filters = coordinator();
        assert_eq!(
            filters.toggle_team("Z"),
            Err(FilterError::UnknownTeam("Z".to_string()))
        );
        assert_eq!(
            filters.toggle_group("Nope"),
            Err(FilterError::UnknownGroup("Nope".to_string()))
        );
    }
}
