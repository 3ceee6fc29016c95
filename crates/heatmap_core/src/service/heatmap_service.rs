//! Circular heatmap dashboard orchestration.
//!
//! # Responsibility
//! - Turn a loaded `DataStore` into a sector grid, filters and a first render.
//! - Route renderer events, filter chips, progress edits and deep links to
//!   the owning services, then request the matching recolor.
//! - Surface recoverable failures through `ShellPort` dialogs.
//!
//! # Invariants
//! - The grid is replaced only by a successful `load()`, which also resets
//!   panel state and re-resolves the current fragment.
//! - Recolor and theme updates are skipped until the renderer is initialized.
//! - Progress edits before a successful load fail fast with `NotInitialized`.
//! - `destroy()` unsubscribes from theme changes and clears the title once.

use crate::config::HeatmapSettings;
use crate::model::activity::ActivityId;
use crate::model::progress::ProgressTitle;
use crate::model::sector::{Sector, SectorGrid};
use crate::model::team::{GroupName, TeamGroups, TeamName};
use crate::model::theme::{HeatmapColors, HeatmapConfig};
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::progress_repo::{ProgressError, ProgressStore};
use crate::repo::storage_repo::{KeyValueStorage, RepoError, RepoResult, STORAGE_KEY_DATASET};
use crate::service::deep_link_service::{DeepLinkState, DeepLinkSynchronizer, NavigationPort, PanelState};
use crate::service::filter_service::{FilterError, GroupToggle, TeamFilterCoordinator, TeamToggle};
use crate::service::sector_service::SectorService;
use crate::service::theme_service::{resolve_theme_colors, ComputedStyle};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Element the renderer attaches the chart to.
pub const HEATMAP_SELECTOR: &str = "#chart";
/// Window title while the dashboard is shown.
pub const HEATMAP_TITLE: &str = "Heatmap";
pub const LOAD_ERROR_TITLE: &str = "An error occurred";
pub const EXPORT_ERROR_TITLE: &str = "Export Error";
pub const EXPORT_EMPTY_MESSAGE: &str = "No team progress data available";
pub const DELETE_DIALOG_TITLE: &str = "Delete local browser data";
pub const DELETE_DIALOG_MESSAGE: &str = "Do you want to delete all progress for each team?\n\n\
This deletes all progress stored in your local browser, but does not change any progress \
stored in the yaml file on the server.";
pub const BUTTON_CANCEL: &str = "Cancel";
pub const BUTTON_DELETE: &str = "Delete";

/// Renderer-facing sector id.
pub fn sector_id(index: usize) -> String {
    format!("index-{index}")
}

/// Cursor overlays drawn on top of sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Hover,
    Selected,
}

impl CursorKind {
    pub fn selector(self) -> &'static str {
        match self {
            Self::Hover => "#hover",
            Self::Selected => "#selected",
        }
    }
}

/// Drawing port.
pub trait HeatmapRenderer {
    fn initialize(&mut self, selector: &str, config: &HeatmapConfig);
    /// Draws every sector; `progress[i]` belongs to `sectors[i]`.
    fn render(&mut self, sectors: &[Sector], progress: &[Option<f64>]);
    /// `None` draws the disabled color.
    fn recolor_sector(&mut self, index: usize, value: Option<f64>);
    /// `None` hides the cursor.
    fn set_sector_cursor(&mut self, kind: CursorKind, sector_id: Option<&str>);
    fn update_theme_colors(&mut self, colors: &HeatmapColors);
    fn is_initialized(&self) -> bool;
}

/// Modal dialog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogInfo {
    pub title: String,
    pub message: String,
    pub buttons: Vec<String>,
}

impl DialogInfo {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: &[&str]) -> Self {
        self.buttons = buttons.iter().map(|button| button.to_string()).collect();
        self
    }
}

/// Dialog and window chrome port.
pub trait ShellPort {
    fn display_message(&mut self, dialog: DialogInfo);
    /// Returns the clicked button, `None` when dismissed.
    fn ask(&mut self, dialog: DialogInfo) -> Option<String>;
    fn set_title(&mut self, title: Option<&str>);
}

/// Team metadata delivered with a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaStore {
    pub teams: Vec<TeamName>,
    /// Configured groups in declared order, without the "all teams" group.
    pub team_groups: Vec<(GroupName, Vec<TeamName>)>,
    pub all_teams_group_name: Option<String>,
    pub team_progress_file: Option<String>,
}

/// Result of one data load.
#[derive(Default)]
pub struct DataStore {
    pub activity_store: Option<Box<dyn ActivityRepository + Send>>,
    /// Expected to be initialized with the progress definition.
    pub progress_store: Option<ProgressStore>,
    pub meta: Option<MetaStore>,
}

/// One-shot data source.
pub trait DataLoader {
    fn load(&mut self) -> Result<DataStore, LoadError>;
}

/// Data load failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The loader rejected with a message.
    Failed(String),
    MissingActivityStore,
    MissingProgressStore,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(message) => write!(f, "{message}"),
            Self::MissingActivityStore => write!(f, "activity store is not loaded"),
            Self::MissingProgressStore => write!(f, "progress store is not loaded"),
        }
    }
}

impl Error for LoadError {}

/// Dashboard-level error.
#[derive(Debug)]
pub enum HeatmapError {
    /// An operation needs a loaded data store.
    NotInitialized,
    Load(LoadError),
    Progress(ProgressError),
    Filter(FilterError),
    Repo(RepoError),
}

impl Display for HeatmapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "data store or progress store is not initialized"),
            Self::Load(err) => write!(f, "{err}"),
            Self::Progress(err) => write!(f, "{err}"),
            Self::Filter(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HeatmapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotInitialized => None,
            Self::Load(err) => Some(err),
            Self::Progress(err) => Some(err),
            Self::Filter(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<LoadError> for HeatmapError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

impl From<ProgressError> for HeatmapError {
    fn from(value: ProgressError) -> Self {
        match value {
            ProgressError::NotInitialized => Self::NotInitialized,
            other => Self::Progress(other),
        }
    }
}

impl From<FilterError> for HeatmapError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

impl From<RepoError> for HeatmapError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Progress YAML ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content: String,
}

/// Outcome of the delete-local-progress flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    /// Stored progress is gone; the host should reload the data.
    ReloadRequested,
}

struct LoadedDashboard {
    activities: Box<dyn ActivityRepository + Send>,
    progress: ProgressStore,
    grid: SectorGrid,
    filters: TeamFilterCoordinator,
    aggregator: SectorService,
    team_progress_file: String,
}

/// Dashboard use-case service.
pub struct HeatmapService<R, N, S, K>
where
    R: HeatmapRenderer,
    N: NavigationPort,
    S: ShellPort,
    K: KeyValueStorage,
{
    renderer: R,
    shell: S,
    storage: K,
    deep_link: DeepLinkSynchronizer<N>,
    settings: HeatmapSettings,
    colors: HeatmapColors,
    dashboard: Option<LoadedDashboard>,
    theme_subscribed: bool,
    destroyed: bool,
}

impl<R, N, S, K> HeatmapService<R, N, S, K>
where
    R: HeatmapRenderer,
    N: NavigationPort,
    S: ShellPort,
    K: KeyValueStorage,
{
    /// Creates the service and subscribes it to theme changes.
    pub fn new(renderer: R, navigation: N, shell: S, storage: K, settings: HeatmapSettings) -> Self {
        Self {
            renderer,
            shell,
            storage,
            deep_link: DeepLinkSynchronizer::new(navigation),
            settings,
            colors: HeatmapColors::default(),
            dashboard: None,
            theme_subscribed: true,
            destroyed: false,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    pub fn storage(&self) -> &K {
        &self.storage
    }

    pub fn navigation(&self) -> &N {
        self.deep_link.navigation()
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        self.deep_link.navigation_mut()
    }

    pub fn settings(&self) -> &HeatmapSettings {
        &self.settings
    }

    pub fn colors(&self) -> &HeatmapColors {
        &self.colors
    }

    pub fn panel(&self) -> &PanelState {
        self.deep_link.panel()
    }

    pub fn deep_link_state(&self) -> DeepLinkState {
        self.deep_link.state()
    }

    pub fn is_loaded(&self) -> bool {
        self.dashboard.is_some()
    }

    pub fn is_theme_subscribed(&self) -> bool {
        self.theme_subscribed
    }

    /// Sector grid of the last successful load.
    pub fn grid(&self) -> Option<&SectorGrid> {
        self.dashboard.as_ref().map(|dashboard| &dashboard.grid)
    }

    pub fn filters(&self) -> Option<&TeamFilterCoordinator> {
        self.dashboard.as_ref().map(|dashboard| &dashboard.filters)
    }

    pub fn progress_store(&self) -> Option<&ProgressStore> {
        self.dashboard.as_ref().map(|dashboard| &dashboard.progress)
    }

    /// Loads data, builds grid and filters, then renders.
    ///
    /// # Errors
    /// - Loader rejection or a missing activity/progress store. The message
    ///   is also shown in an error dialog.
    pub fn load(&mut self, loader: &mut impl DataLoader) -> Result<(), HeatmapError> {
        info!("event=heatmap_load module=heatmap status=start");
        let data = match loader.load().and_then(require_stores) {
            Ok(data) => data,
            Err(err) => {
                warn!("event=heatmap_load module=heatmap status=error error={err}");
                self.shell
                    .display_message(DialogInfo::new(LOAD_ERROR_TITLE, err.to_string()));
                return Err(err.into());
            }
        };
        let (activities, mut progress, meta) = data;

        let all_teams_group_name = meta
            .all_teams_group_name
            .clone()
            .unwrap_or_else(|| self.settings.all_teams_group_name.clone());
        let team_progress_file = meta
            .team_progress_file
            .clone()
            .unwrap_or_else(|| self.settings.team_progress_file.clone());
        let groups = TeamGroups::new(&all_teams_group_name, &meta.teams, meta.team_groups);
        let filters = TeamFilterCoordinator::new(meta.teams.clone(), groups);
        let aggregator = SectorService::new(meta.teams);

        let max_level = self
            .settings
            .max_level_override()
            .or_else(|| activities.max_level())
            .unwrap_or(0);
        let grid = SectorGrid::build(activities.dimension_names(), max_level, |dimension, level| {
            activities.activities(dimension, level)
        });
        progress.set_activity_names(activities.activity_names());

        let values = grid
            .iter()
            .map(|sector| aggregator.sector_progress(sector, &progress))
            .collect::<Vec<_>>();
        let config = HeatmapConfig::new(
            grid.max_level(),
            grid.dimension_labels().to_vec(),
            self.colors.clone(),
        );
        self.renderer.initialize(HEATMAP_SELECTOR, &config);
        self.renderer.render(grid.sectors(), &values);
        self.shell.set_title(Some(HEATMAP_TITLE));

        info!(
            "event=heatmap_load module=heatmap status=ok sectors={} max_level={} teams={}",
            grid.len(),
            grid.max_level(),
            filters.teams().len()
        );
        self.dashboard = Some(LoadedDashboard {
            activities,
            progress,
            grid,
            filters,
            aggregator,
            team_progress_file,
        });

        self.deep_link.reset();
        let fragment = self.deep_link.navigation().fragment();
        self.on_fragment_changed(fragment.as_deref());
        Ok(())
    }

    /// Aggregated progress of one sector; `None` for disabled or unknown.
    pub fn sector_progress(&self, index: usize) -> Option<f64> {
        let dashboard = self.dashboard.as_ref()?;
        let sector = dashboard.grid.get(index)?;
        dashboard
            .aggregator
            .sector_progress(sector, &dashboard.progress)
    }

    pub fn recolor_sector(&mut self, index: usize) {
        if !self.renderer.is_initialized() {
            return;
        }
        let in_range = self
            .dashboard
            .as_ref()
            .is_some_and(|dashboard| index < dashboard.grid.len());
        if !in_range {
            debug!("event=recolor_sector module=heatmap status=skipped index={index}");
            return;
        }
        let value = self.sector_progress(index);
        self.renderer.recolor_sector(index, value);
    }

    /// Recolors every sector in index order.
    pub fn recolor_heatmap(&mut self) {
        let count = self
            .dashboard
            .as_ref()
            .map_or(0, |dashboard| dashboard.grid.len());
        for index in 0..count {
            self.recolor_sector(index);
        }
    }

    /// Selects the clicked sector and moves the selection cursor.
    pub fn on_sector_click(&mut self, index: usize) {
        let Some(has_activities) = self.sector_has_activities(index) else {
            return;
        };
        self.deep_link.select_sector(index, has_activities);
        let id = sector_id(index);
        let target = has_activities.then_some(id.as_str());
        debug!("event=sector_click module=heatmap status=ok index={index} enabled={has_activities}");
        self.renderer.set_sector_cursor(CursorKind::Selected, target);
    }

    pub fn on_sector_hover(&mut self, index: usize) {
        let Some(has_activities) = self.sector_has_activities(index) else {
            return;
        };
        let id = sector_id(index);
        self.renderer
            .set_sector_cursor(CursorKind::Hover, has_activities.then_some(id.as_str()));
    }

    pub fn on_sector_mouse_out(&mut self) {
        self.renderer.set_sector_cursor(CursorKind::Hover, None);
    }

    /// Toggles one team chip and recolors.
    pub fn toggle_team_filter(&mut self, team: &str) -> Result<TeamToggle, HeatmapError> {
        let dashboard = self.dashboard.as_mut().ok_or(HeatmapError::NotInitialized)?;
        let toggle = dashboard.filters.toggle_team(team)?;
        dashboard
            .aggregator
            .set_visible_teams(toggle.visible_teams.clone());
        self.recolor_heatmap();
        Ok(toggle)
    }

    /// Activates one group chip and recolors when the selection changed.
    pub fn toggle_team_group_filter(&mut self, group: &str) -> Result<GroupToggle, HeatmapError> {
        let dashboard = self.dashboard.as_mut().ok_or(HeatmapError::NotInitialized)?;
        let toggle = dashboard.filters.toggle_group(group)?;
        if toggle.changed {
            dashboard
                .aggregator
                .set_visible_teams(toggle.visible_teams.clone());
            self.recolor_heatmap();
        }
        Ok(toggle)
    }

    /// Records a team's new stage dated today (UTC).
    pub fn on_progress_change(
        &mut self,
        activity: ActivityId,
        team: &str,
        title: &str,
    ) -> Result<(), HeatmapError> {
        self.set_progress_state(activity, team, title, Utc::now().date_naive())
    }

    /// Records a team's new stage, saves progress and recolors its sector.
    ///
    /// # Errors
    /// - `NotInitialized` without a loaded, initialized progress store.
    /// - Unknown stage title or storage failure.
    pub fn set_progress_state(
        &mut self,
        activity: ActivityId,
        team: &str,
        title: &str,
        today: NaiveDate,
    ) -> Result<(), HeatmapError> {
        let dashboard = self.dashboard.as_mut().ok_or(HeatmapError::NotInitialized)?;
        if !dashboard.progress.is_initialized() {
            return Err(HeatmapError::NotInitialized);
        }
        dashboard
            .progress
            .set_team_activity_progress_state(activity, team, title, today)?;
        dashboard.progress.save_to_storage(&self.storage)?;

        if let Some(index) = dashboard.grid.index_of_activity(activity) {
            self.recolor_sector(index);
        }
        Ok(())
    }

    pub fn team_progress_state(&self, activity: ActivityId, team: &str) -> Option<ProgressTitle> {
        self.dashboard
            .as_ref()?
            .progress
            .team_activity_title_from(activity, team, false)
    }

    pub fn backed_up_team_progress_state(
        &self,
        activity: ActivityId,
        team: &str,
    ) -> Option<ProgressTitle> {
        self.dashboard
            .as_ref()?
            .progress
            .team_activity_title_from(activity, team, true)
    }

    /// Exports progress as YAML; shows an "Export Error" dialog without data.
    pub fn export_team_progress(&mut self) -> Option<ExportFile> {
        info!("event=progress_export module=heatmap status=start");
        let export = self
            .dashboard
            .as_ref()
            .filter(|dashboard| !dashboard.progress.progress_data().is_empty())
            .map(|dashboard| ExportFile {
                file_name: dashboard.team_progress_file.clone(),
                content: dashboard.progress.as_yaml_string(),
            });
        if export.is_none() {
            warn!("event=progress_export module=heatmap status=error reason=no_data");
            self.shell
                .display_message(DialogInfo::new(EXPORT_ERROR_TITLE, EXPORT_EMPTY_MESSAGE));
        }
        export
    }

    /// Asks for confirmation, then removes locally stored progress.
    pub fn delete_local_teams_progress(&mut self) -> Result<DeleteOutcome, HeatmapError> {
        let dialog = DialogInfo::new(DELETE_DIALOG_TITLE, DELETE_DIALOG_MESSAGE)
            .with_buttons(&[BUTTON_CANCEL, BUTTON_DELETE]);
        if self.shell.ask(dialog).as_deref() != Some(BUTTON_DELETE) {
            info!("event=progress_delete_local module=heatmap status=cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        ProgressStore::delete_stored_progress(&self.storage)?;
        Ok(DeleteOutcome::ReloadRequested)
    }

    pub fn dataset_from_browser_storage(&self) -> Result<Option<Value>, HeatmapError> {
        Ok(dataset_from_storage(&self.storage)?)
    }

    /// Applies theme colors and recolors once the renderer is ready.
    pub fn on_theme_changed(&mut self, style: &impl ComputedStyle) {
        if !self.theme_subscribed {
            debug!("event=theme_change module=heatmap status=skipped reason=unsubscribed");
            return;
        }
        self.colors = resolve_theme_colors(style);
        if !self.renderer.is_initialized() {
            debug!("event=theme_change module=heatmap status=deferred");
            return;
        }
        self.renderer.update_theme_colors(&self.colors);
        self.recolor_heatmap();
    }

    pub fn open_activity(&mut self, activity: ActivityId) -> DeepLinkState {
        let Some(dashboard) = self.dashboard.as_ref() else {
            warn!("event=deep_link_open module=heatmap status=not_loaded uuid={activity}");
            return DeepLinkState::Closed;
        };
        self.deep_link
            .open_by_uuid(activity, dashboard.activities.as_ref(), &dashboard.grid)
    }

    pub fn open_activity_details(&mut self, activity_name: &str) -> DeepLinkState {
        let Some(dashboard) = self.dashboard.as_ref() else {
            warn!("event=deep_link_open module=heatmap status=not_loaded name={activity_name}");
            return DeepLinkState::Closed;
        };
        self.deep_link.open_activity_details(
            activity_name,
            dashboard.activities.as_ref(),
            &dashboard.grid,
        )
    }

    pub fn close_overlay(&mut self) {
        self.deep_link.close_overlay();
    }

    /// Inbound fragment change; ignored until data is loaded.
    pub fn on_fragment_changed(&mut self, fragment: Option<&str>) -> DeepLinkState {
        let Some(dashboard) = self.dashboard.as_ref() else {
            return DeepLinkState::Closed;
        };
        self.deep_link.on_fragment_changed(
            fragment,
            dashboard.activities.as_ref(),
            &dashboard.grid,
        )
    }

    /// Tears down the dashboard view. Repeated calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.theme_subscribed = false;
        self.shell.set_title(None);
        info!("event=heatmap_destroy module=heatmap status=ok");
    }

    fn sector_has_activities(&self, index: usize) -> Option<bool> {
        self.dashboard
            .as_ref()?
            .grid
            .get(index)
            .map(|sector| !sector.is_disabled())
    }
}

type LoadedParts = (Box<dyn ActivityRepository + Send>, ProgressStore, MetaStore);

fn require_stores(data: DataStore) -> Result<LoadedParts, LoadError> {
    let activities = data.activity_store.ok_or(LoadError::MissingActivityStore)?;
    let progress = data.progress_store.ok_or(LoadError::MissingProgressStore)?;
    Ok((activities, progress, data.meta.unwrap_or_default()))
}

/// Reads the cached `dataset` entry.
///
/// A legacy schema (first element carries `Task`) or unparsable content is
/// removed from storage and reads as `None`.
pub fn dataset_from_storage(storage: &impl KeyValueStorage) -> RepoResult<Option<Value>> {
    let Some(raw) = storage.get_item(STORAGE_KEY_DATASET)? else {
        return Ok(None);
    };
    let parsed = serde_json::from_str::<Value>(&raw).ok();
    let legacy = parsed
        .as_ref()
        .and_then(|value| value.as_array())
        .and_then(|items| items.first())
        .is_some_and(|first| first.get("Task").is_some_and(|task| !task.is_null()));

    if parsed.is_none() || legacy {
        info!("event=dataset_cache module=heatmap status=removed legacy={legacy}");
        storage.remove_item(STORAGE_KEY_DATASET)?;
        return Ok(None);
    }
    Ok(parsed)
}
