//! Team and team-group model.
//!
//! # Invariants
//! - The first group is always the synthetic "all teams" group with no
//!   members, meaning "no restriction".
//! - Group members are limited to declared teams; unknown names are dropped.
//! - Configured groups without any declared member are dropped.
//! - Group names are unique; a later duplicate replaces the earlier member list.

use log::warn;
use std::collections::BTreeSet;

pub type TeamName = String;
pub type GroupName = String;

/// Default name of the synthetic group that selects every team.
pub const DEFAULT_ALL_TEAMS_GROUP: &str = "All";

/// Ordered team-group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGroups {
    groups: Vec<(GroupName, Vec<TeamName>)>,
}

impl TeamGroups {
    /// Builds the group table with the "all teams" group in first position.
    ///
    /// `configured` keeps its order after the synthetic group. A configured
    /// group sharing the synthetic group's name is ignored.
    pub fn new(
        all_teams_group_name: &str,
        teams: &[TeamName],
        configured: Vec<(GroupName, Vec<TeamName>)>,
    ) -> Self {
        let all_name = normalize_group_name(all_teams_group_name);
        let mut groups: Vec<(GroupName, Vec<TeamName>)> = vec![(all_name.clone(), Vec::new())];

        for (name, members) in configured {
            let name = name.trim().to_string();
            if name.is_empty() || name == all_name {
                continue;
            }
            let mut seen = BTreeSet::new();
            let members = members
                .into_iter()
                .filter(|member| teams.contains(member))
                .filter(|member| seen.insert(member.clone()))
                .collect::<Vec<_>>();
            if members.is_empty() {
                warn!(
                    "event=team_group module=team status=dropped group={name} reason=no_known_members"
                );
                groups.retain(|(existing, _)| *existing != name);
                continue;
            }
            match groups.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = members,
                None => groups.push((name, members)),
            }
        }

        Self { groups }
    }

    /// Name of the synthetic "all teams" group.
    pub fn all_teams_group_name(&self) -> &str {
        self.groups[0].0.as_str()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn members(&self, group: &str) -> Option<&[TeamName]> {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, members)| members.as_slice())
    }

    pub fn contains(&self, group: &str) -> bool {
        self.members(group).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TeamName])> {
        self.groups
            .iter()
            .map(|(name, members)| (name.as_str(), members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn normalize_group_name(value: &str) -> GroupName {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_ALL_TEAMS_GROUP.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{TeamGroups, DEFAULT_ALL_TEAMS_GROUP};

    fn teams() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    #[test]
    fn all_group_is_first_and_empty() {
        let groups = TeamGroups::new(
            "",
            &teams(),
            vec![("Core".to_string(), vec!["A".to_string()])],
        );
        assert_eq!(groups.all_teams_group_name(), DEFAULT_ALL_TEAMS_GROUP);
        assert_eq!(groups.names().collect::<Vec<_>>(), vec!["All", "Core"]);
        assert_eq!(groups.members("All"), Some(&[][..]));
    }

    #[test]
    fn unknown_and_duplicate_members_are_dropped() {
        let groups = TeamGroups::new(
            "Everyone",
            &teams(),
            vec![(
                "Core".to_string(),
                vec!["A".to_string(), "Z".to_string(), "A".to_string()],
            )],
        );
        assert_eq!(groups.members("Core"), Some(&["A".to_string()][..]));
    }

    #[test]
    fn configured_group_cannot_shadow_all_group() {
        let groups = TeamGroups::new(
            "All",
            &teams(),
            vec![("All".to_string(), vec!["A".to_string()])],
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.members("All"), Some(&[][..]));
    }

    #[test]
    fn group_without_known_members_is_dropped() {
        let groups = TeamGroups::new(
            "All",
            &teams(),
            vec![
                ("Ops".to_string(), vec!["Ghost".to_string()]),
                ("Core".to_string(), vec!["A".to_string()]),
            ],
        );
        assert!(!groups.contains("Ops"));
        assert_eq!(groups.names().collect::<Vec<_>>(), vec!["All", "Core"]);
    }
}
