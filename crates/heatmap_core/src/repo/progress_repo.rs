//! Team activity progress store.
//!
//! # Responsibility
//! - Track, per activity and team, the date each progress stage was reached.
//! - Keep a backup of dates removed by a downgrade so an upgrade restores them.
//! - Export progress as a YAML document and persist it to local storage.
//!
//! # Invariants
//! - Stage titles are ordered by ascending score (see `ProgressDefinitions`).
//! - A team's current title is the highest stage with a recorded date; with
//!   no record it is the first ("not started") title.
//! - Mutations require `init()`; calling them earlier is a wiring bug and
//!   fails fast with `ProgressError::NotInitialized`.

use crate::model::activity::ActivityId;
use crate::model::progress::{ProgressDefinitions, ProgressTitle};
use crate::model::team::TeamName;
use crate::repo::storage_repo::{KeyValueStorage, RepoResult, STORAGE_KEY_PROGRESS};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stage title -> date the stage was reached.
pub type TeamProgress = BTreeMap<ProgressTitle, NaiveDate>;
/// Activity -> team -> stage dates.
pub type Progress = BTreeMap<ActivityId, BTreeMap<TeamName, TeamProgress>>;

const YAML_INDENT: &str = "  ";

/// Read port used by the sector aggregator.
pub trait TeamProgressSource {
    /// Current stage title of `team` for `activity`, `None` when unknown.
    fn team_activity_title(&self, activity: ActivityId, team: &str) -> Option<ProgressTitle>;
    /// Score of a stage title, `None` when the title is not defined.
    fn title_score(&self, title: &str) -> Option<f64>;
}

/// Progress store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// `init()` was never called with a non-empty definition.
    NotInitialized,
    /// Requested stage title is not part of the definition.
    UnknownTitle(ProgressTitle),
    /// Stage date is not `YYYY-MM-DD`.
    InvalidDate(String),
}

impl Display for ProgressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "progress states are not initialized"),
            Self::UnknownTitle(title) => write!(f, "unknown progress state: `{title}`"),
            Self::InvalidDate(raw) => write!(f, "invalid progress date: `{raw}`"),
        }
    }
}

impl Error for ProgressError {}

/// One dated stage of one team, as read back from saved or shipped progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub activity: ActivityId,
    pub team: TeamName,
    pub title: ProgressTitle,
    pub date: NaiveDate,
}

/// Parses a stage date written as `YYYY-MM-DD`.
pub fn parse_stage_date(raw: &str) -> Result<NaiveDate, ProgressError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ProgressError::InvalidDate(raw.to_string()))
}

/// In-memory progress store.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    definitions: Option<ProgressDefinitions>,
    titles: Vec<ProgressTitle>,
    activity_names: HashMap<ActivityId, String>,
    progress: Progress,
    backup: Progress,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stage definitions; titles are taken in ascending score order.
    pub fn init(&mut self, definitions: ProgressDefinitions) {
        self.titles = definitions.titles();
        self.definitions = Some(definitions);
    }

    pub fn is_initialized(&self) -> bool {
        !self.titles.is_empty()
    }

    /// Sets the activity name lookup used for export comments.
    pub fn set_activity_names(&mut self, names: HashMap<ActivityId, String>) {
        self.activity_names = names;
    }

    pub fn progress_titles(&self) -> &[ProgressTitle] {
        &self.titles
    }

    pub fn progress_data(&self) -> &Progress {
        &self.progress
    }

    /// Merges loaded progress; when both sides date the same stage the
    /// earlier date wins.
    pub fn add_progress_data(&mut self, incoming: Progress) {
        if self.progress.is_empty() {
            self.progress = incoming;
            return;
        }

        for (activity, teams) in incoming {
            let existing_teams = self.progress.entry(activity).or_default();
            for (team, stages) in teams {
                let existing = existing_teams.entry(team).or_default();
                for (title, date) in stages {
                    match existing.get(&title) {
                        Some(current) if *current <= date => {}
                        _ => {
                            existing.insert(title, date);
                        }
                    }
                }
            }
        }
    }

    /// Merges flat records through `add_progress_data`.
    pub fn add_progress_records(&mut self, records: impl IntoIterator<Item = ProgressRecord>) {
        let mut incoming = Progress::new();
        let mut count = 0usize;
        for record in records {
            incoming
                .entry(record.activity)
                .or_default()
                .entry(record.team)
                .or_default()
                .entry(record.title)
                .and_modify(|date| *date = (*date).min(record.date))
                .or_insert(record.date);
            count += 1;
        }
        info!("event=progress_merge module=progress status=ok records={count}");
        self.add_progress_data(incoming);
    }

    /// Stage dates for one team, optionally from the backup set.
    pub fn team_progress(
        &self,
        activity: ActivityId,
        team: &str,
        from_backup: bool,
    ) -> Option<&TeamProgress> {
        let source = if from_backup {
            &self.backup
        } else {
            &self.progress
        };
        source.get(&activity)?.get(team)
    }

    /// Highest reached stage title, or the first title without progress.
    ///
    /// Returns `None` only when the store is not initialized.
    pub fn team_activity_title_from(
        &self,
        activity: ActivityId,
        team: &str,
        from_backup: bool,
    ) -> Option<ProgressTitle> {
        let first = self.titles.first()?;
        let Some(stages) = self.team_progress(activity, team, from_backup) else {
            return Some(first.clone());
        };
        let reached = self
            .titles
            .iter()
            .rev()
            .find(|title| stages.contains_key(title.as_str()))
            .unwrap_or(first);
        Some(reached.clone())
    }

    /// Score of the team's current stage; `0.0` without progress.
    pub fn team_activity_progress_value(
        &self,
        activity: ActivityId,
        team: &str,
        from_backup: bool,
    ) -> f64 {
        self.team_activity_title_from(activity, team, from_backup)
            .and_then(|title| self.title_score(&title))
            .unwrap_or(0.0)
    }

    /// Moves a team to `new_title`.
    ///
    /// Raising fills every stage up to `new_title`, restoring backed-up
    /// dates when present and otherwise reusing the date of the next higher
    /// stage (`today` for the top one). Lowering removes the stages above
    /// `new_title` after backing their dates up.
    pub fn set_team_activity_progress_state(
        &mut self,
        activity: ActivityId,
        team: &str,
        new_title: &str,
        today: NaiveDate,
    ) -> Result<(), ProgressError> {
        if self.titles.is_empty() {
            return Err(ProgressError::NotInitialized);
        }
        let new_index = self
            .title_index(new_title)
            .ok_or_else(|| ProgressError::UnknownTitle(new_title.to_string()))?;
        let current_title = self
            .team_activity_title_from(activity, team, false)
            .ok_or(ProgressError::NotInitialized)?;
        let current_index = self.title_index(&current_title).unwrap_or(0);

        info!(
            "event=progress_set module=progress status=start activity={activity} team={team} from={current_title} to={new_title}"
        );

        self.progress
            .entry(activity)
            .or_default()
            .entry(team.to_string())
            .or_default();

        if new_index < current_index {
            self.clear_stages(activity, team, new_index + 1, current_index, today);
        } else if new_index > current_index {
            self.fill_stages(activity, team, current_index + 1, new_index, today);
        }
        Ok(())
    }

    /// Renames a team in live and backup progress.
    pub fn rename_team(&mut self, old_name: &str, new_name: &str) {
        info!("event=team_rename module=progress status=ok from={old_name} to={new_name}");
        for source in [&mut self.progress, &mut self.backup] {
            for teams in source.values_mut() {
                if let Some(stages) = teams.remove(old_name) {
                    teams.insert(new_name.to_string(), stages);
                }
            }
        }
    }

    /// Renames a stage title in definitions, live and backup progress.
    pub fn rename_progress_title(&mut self, old_title: &str, new_title: &str) {
        info!(
            "event=progress_title_rename module=progress status=ok from={old_title} to={new_title}"
        );
        for source in [&mut self.progress, &mut self.backup] {
            for teams in source.values_mut() {
                for stages in teams.values_mut() {
                    if let Some(date) = stages.remove(old_title) {
                        stages.insert(new_title.to_string(), date);
                    }
                }
            }
        }
        if let Some(title) = self.titles.iter_mut().find(|title| title.as_str() == old_title) {
            *title = new_title.to_string();
        }
        if let Some(definitions) = self.definitions.as_mut() {
            definitions.rename(old_title, new_title);
        }
    }

    /// Titles strictly between "not started" and "completed".
    pub fn in_progress_titles(&self) -> &[ProgressTitle] {
        if self.titles.len() < 2 {
            return &[];
        }
        &self.titles[1..self.titles.len() - 1]
    }

    pub fn completed_title(&self) -> Option<&str> {
        self.titles.last().map(String::as_str)
    }

    /// Renders progress as a `progress:` YAML document.
    ///
    /// The activity name is appended as a comment. The first stage is
    /// implied and never written; teams and activities without any written
    /// stage are omitted.
    pub fn as_yaml_string(&self) -> String {
        let mut out = String::from("progress:\n");
        for (activity, teams) in &self.progress {
            let mut activity_block = String::new();
            for (team, stages) in teams {
                let mut team_block = String::new();
                for (title, date) in self.ordered_stages(stages) {
                    if Some(title) == self.titles.first().map(String::as_str) {
                        continue;
                    }
                    team_block.push_str(&format!(
                        "{YAML_INDENT}{YAML_INDENT}{YAML_INDENT}{}: {}\n",
                        yaml_quote(title),
                        date.format("%Y-%m-%d")
                    ));
                }
                if !team_block.is_empty() {
                    activity_block.push_str(&format!(
                        "{YAML_INDENT}{YAML_INDENT}{}:\n",
                        yaml_quote(team)
                    ));
                    activity_block.push_str(&team_block);
                }
            }
            if !activity_block.is_empty() {
                let comment = self
                    .activity_names
                    .get(activity)
                    .map(|name| format!("  # {name}"))
                    .unwrap_or_default();
                out.push_str(&format!("{YAML_INDENT}{activity}:{comment}\n"));
                out.push_str(&activity_block);
            }
        }
        out
    }

    /// Persists the YAML export under the `progress` storage key.
    pub fn save_to_storage(&self, storage: &impl KeyValueStorage) -> RepoResult<()> {
        storage.set_item(STORAGE_KEY_PROGRESS, &self.as_yaml_string())
    }

    /// Returns the raw YAML previously saved to storage.
    pub fn retrieve_stored_yaml(storage: &impl KeyValueStorage) -> RepoResult<Option<String>> {
        storage.get_item(STORAGE_KEY_PROGRESS)
    }

    pub fn delete_stored_progress(storage: &impl KeyValueStorage) -> RepoResult<()> {
        info!("event=progress_delete_local module=progress status=ok");
        storage.remove_item(STORAGE_KEY_PROGRESS)
    }

    fn title_index(&self, title: &str) -> Option<usize> {
        self.titles.iter().position(|candidate| candidate == title)
    }

    fn ordered_stages<'a>(&self, stages: &'a TeamProgress) -> Vec<(&'a str, &'a NaiveDate)> {
        let mut ordered = stages
            .iter()
            .map(|(title, date)| (title.as_str(), date))
            .collect::<Vec<_>>();
        ordered.sort_by_key(|(title, _)| self.title_index(title).unwrap_or(usize::MAX));
        ordered
    }

    fn clear_stages(
        &mut self,
        activity: ActivityId,
        team: &str,
        start: usize,
        end: usize,
        today: NaiveDate,
    ) {
        debug!("event=progress_clear module=progress team={team} range={start}-{end}");
        let titles = self.titles.clone();
        let Some(stages) = self
            .progress
            .get_mut(&activity)
            .and_then(|teams| teams.get_mut(team))
        else {
            return;
        };
        if start > 0 {
            stages.entry(titles[start - 1].clone()).or_insert(today);
        }

        let backup = self
            .backup
            .entry(activity)
            .or_default()
            .entry(team.to_string())
            .or_default();
        for title in &titles[start..=end] {
            if backup.contains_key(title) {
                warn!(
                    "event=progress_backup module=progress status=overwrite activity={activity} team={team} title={title}"
                );
            }
            if let Some(date) = stages.remove(title) {
                backup.insert(title.clone(), date);
            }
        }
    }

    fn fill_stages(
        &mut self,
        activity: ActivityId,
        team: &str,
        start: usize,
        end: usize,
        today: NaiveDate,
    ) {
        debug!("event=progress_fill module=progress team={team} range={start}-{end}");
        let titles = self.titles.clone();
        let mut previous = today;
        for title in titles[start..=end].iter().rev() {
            let restored = self
                .backup
                .get_mut(&activity)
                .and_then(|teams| teams.get_mut(team))
                .and_then(|stages| stages.remove(title));
            if let Some(date) = restored {
                previous = date;
            }
            self.progress
                .entry(activity)
                .or_default()
                .entry(team.to_string())
                .or_default()
                .insert(title.clone(), previous);
        }
    }
}

impl TeamProgressSource for ProgressStore {
    fn team_activity_title(&self, activity: ActivityId, team: &str) -> Option<ProgressTitle> {
        self.team_activity_title_from(activity, team, false)
    }

    fn title_score(&self, title: &str) -> Option<f64> {
        self.definitions.as_ref()?.score(title)
    }
}

fn yaml_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::{parse_stage_date, ProgressError, ProgressRecord, ProgressStore};
    use crate::model::progress::{ProgressDefinitions, ProgressStageInput, ScoreInput};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn definitions() -> ProgressDefinitions {
        ProgressDefinitions::new(
            [("Not started", 0.0), ("Started", 0.3), ("Implemented", 1.0)]
                .into_iter()
                .map(|(title, score)| ProgressStageInput {
                    title: title.to_string(),
                    score: ScoreInput::Fraction(score),
                    definition: None,
                })
                .collect(),
        )
        .expect("valid definitions")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date")
    }

    #[test]
    fn uninitialized_store_fails_fast() {
        let mut store = ProgressStore::new();
        let err = store
            .set_team_activity_progress_state(Uuid::new_v4(), "A", "Started", day(1))
            .expect_err("not initialized");
        assert_eq!(err, ProgressError::NotInitialized);
    }

    #[test]
    fn raising_fills_intermediate_stages_with_same_date() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store
            .set_team_activity_progress_state(id, "A", "Implemented", day(5))
            .unwrap();
        let stages = store.team_progress(id, "A", false).unwrap();
        assert_eq!(stages.get("Started"), Some(&day(5)));
        assert_eq!(stages.get("Implemented"), Some(&day(5)));
        assert_eq!(store.team_activity_progress_value(id, "A", false), 1.0);
    }

    #[test]
    fn lowering_backs_up_and_raising_restores_dates() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store
            .set_team_activity_progress_state(id, "A", "Implemented", day(1))
            .unwrap();
        store
            .set_team_activity_progress_state(id, "A", "Started", day(2))
            .unwrap();
        assert_eq!(
            store.team_activity_title_from(id, "A", false).as_deref(),
            Some("Started")
        );
        assert_eq!(
            store.team_activity_title_from(id, "A", true).as_deref(),
            Some("Implemented")
        );

        store
            .set_team_activity_progress_state(id, "A", "Implemented", day(9))
            .unwrap();
        let stages = store.team_progress(id, "A", false).unwrap();
        assert_eq!(stages.get("Implemented"), Some(&day(1)));
    }

    #[test]
    fn unknown_title_is_rejected() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let err = store
            .set_team_activity_progress_state(Uuid::new_v4(), "A", "Done-ish", day(1))
            .expect_err("unknown title");
        assert_eq!(err, ProgressError::UnknownTitle("Done-ish".to_string()));
    }

    #[test]
    fn merge_keeps_earliest_date() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store
            .set_team_activity_progress_state(id, "A", "Started", day(10))
            .unwrap();

        let mut incoming = super::Progress::new();
        incoming
            .entry(id)
            .or_default()
            .entry("A".to_string())
            .or_default()
            .insert("Started".to_string(), day(3));
        store.add_progress_data(incoming);
        assert_eq!(
            store.team_progress(id, "A", false).unwrap().get("Started"),
            Some(&day(3))
        );
    }

    #[test]
    fn rename_team_moves_progress() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store
            .set_team_activity_progress_state(id, "A", "Started", day(1))
            .unwrap();
        store.rename_team("A", "Alpha");
        assert!(store.team_progress(id, "A", false).is_none());
        assert!(store.team_progress(id, "Alpha", false).is_some());
    }

    #[test]
    fn in_progress_titles_exclude_extremes() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        assert_eq!(store.in_progress_titles(), &["Started".to_string()]);
        assert_eq!(store.completed_title(), Some("Implemented"));
    }

    #[test]
    fn records_merge_into_existing_progress() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store
            .set_team_activity_progress_state(id, "A", "Started", day(9))
            .unwrap();

        let record = |team: &str, title: &str, date| ProgressRecord {
            activity: id,
            team: team.to_string(),
            title: title.to_string(),
            date,
        };
        store.add_progress_records(vec![
            record("A", "Started", day(4)),
            record("A", "Started", day(6)),
            record("B", "Implemented", day(2)),
        ]);

        assert_eq!(
            store.team_progress(id, "A", false).unwrap().get("Started"),
            Some(&day(4))
        );
        assert_eq!(
            store.team_activity_title_from(id, "B", false).as_deref(),
            Some("Implemented")
        );
    }

    #[test]
    fn stage_dates_must_be_iso_days() {
        assert_eq!(parse_stage_date(" 2024-03-05 "), Ok(day(5)));
        assert_eq!(
            parse_stage_date("05.03.2024"),
            Err(ProgressError::InvalidDate("05.03.2024".to_string()))
        );
    }

    #[test]
    fn yaml_export_skips_first_stage_and_empty_teams() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store.set_activity_names([(id, "Build pipeline".to_string())].into());
        store
            .set_team_activity_progress_state(id, "A", "Implemented", day(5))
            .unwrap();
        store
            .set_team_activity_progress_state(id, "B", "Not started", day(5))
            .unwrap();

        let expected = format!(
            "progress:\n  {id}:  # Build pipeline\n    'A':\n      'Started': 2024-03-05\n      'Implemented': 2024-03-05\n"
        );
        assert_eq!(store.as_yaml_string(), expected);
    }

    #[test]
    fn rename_progress_title_keeps_dates_and_order() {
        let mut store = ProgressStore::new();
        store.init(definitions());
        let id = Uuid::new_v4();
        store
            .set_team_activity_progress_state(id, "A", "Started", day(2))
            .unwrap();
        store.rename_progress_title("Started", "In progress");

        assert_eq!(
            store.progress_titles(),
            &["Not started", "In progress", "Implemented"].map(str::to_string)
        );
        assert_eq!(
            store.team_activity_title_from(id, "A", false).as_deref(),
            Some("In progress")
        );
        assert_eq!(
            store.team_progress(id, "A", false).unwrap().get("In progress"),
            Some(&day(2))
        );
    }
}
