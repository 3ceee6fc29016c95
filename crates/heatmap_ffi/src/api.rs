//! FFI use-case API for the Flutter heatmap dashboard.
//!
//! # Responsibility
//! - Expose dashboard use cases to Dart via FRB over one process-wide session.
//! - Translate renderer, dialog and navigation port calls into records Dart
//!   drains after each call.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call on a closed session returns a failure envelope, never an error.

use heatmap_core::db::open_db;
use heatmap_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Activity, ComputedStyle, CursorKind, DataLoader, DataStore, DeleteOutcome, DialogInfo,
    HeatmapColors, HeatmapConfig, HeatmapRenderer, HeatmapService, HeatmapSettings,
    InMemoryActivityRepository, LoadError, MetaStore, NavigationPort, ProgressDefinitions,
    ProgressRecord, ProgressStore, Sector, ShellPort, SqliteKeyValueStorage,
};
use heatmap_core::model::progress::{ProgressStageInput, ScoreInput};
use heatmap_core::parse_stage_date;
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

const STORAGE_FILE_NAME: &str = "heatmap_storage.sqlite3";
static STORAGE_PATH: OnceLock<PathBuf> = OnceLock::new();
static SESSION: Mutex<Option<Session>> = Mutex::new(None);

type Session = HeatmapService<RecordingRenderer, HostNavigation, HostShell, SqliteKeyValueStorage>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// One activity as parsed by the Dart loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityInput {
    pub uuid: String,
    pub name: String,
    pub dimension: String,
    pub level: u32,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGroupInput {
    pub name: String,
    pub teams: Vec<String>,
}

/// Progress stage definition; `score` is `0.5` or `50%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStageDef {
    pub title: String,
    pub score: String,
}

/// One dated team stage; `date` is `YYYY-MM-DD`.
///
/// Dart builds these from the shipped progress file and from
/// `heatmap_stored_progress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecordInput {
    pub activity_uuid: String,
    pub team: String,
    pub title: String,
    pub date: String,
}

/// Everything the dashboard needs for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadRequest {
    pub activities: Vec<ActivityInput>,
    pub teams: Vec<String>,
    pub team_groups: Vec<TeamGroupInput>,
    pub all_teams_group_name: Option<String>,
    pub progress_stages: Vec<ProgressStageDef>,
    pub team_progress_file: Option<String>,
    /// Merged into the progress store; the earliest date per stage wins.
    pub progress: Vec<ProgressRecordInput>,
}

/// Renderer instruction recorded for Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCommand {
    /// `initialize|render|recolor|cursor|theme`.
    pub kind: String,
    pub sector_index: Option<u32>,
    pub value: Option<f64>,
    /// Selector for `initialize`, cursor selector for `cursor`.
    pub target: Option<String>,
    /// Sector id for `cursor`; `None` hides the cursor.
    pub sector_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRecord {
    pub title: String,
    pub message: String,
    pub buttons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorView {
    pub index: u32,
    pub id: String,
    pub dimension: String,
    pub level: u32,
    pub activity_names: Vec<String>,
    /// `None` for disabled sectors.
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    pub image_width: u32,
    pub margin: u32,
    pub max_level: u32,
    pub dimension_labels: Vec<String>,
    pub sectors: Vec<SectorView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterView {
    pub teams: Vec<FilterChip>,
    pub groups: Vec<FilterChip>,
    pub has_teams_filter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub selected_sector: Option<u32>,
    pub activity_card: Option<u32>,
    pub activity_uuid: Option<String>,
    pub activity_name: Option<String>,
    pub show_overlay: bool,
    pub fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    pub file_name: Option<String>,
    pub content: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssProperty {
    pub name: String,
    pub value: String,
}

/// Opens (or reopens) the dashboard session.
///
/// `storage_path` picks the SQLite file; `None` uses `HEATMAP_STORAGE_PATH`
/// or a file in the temp directory. `:memory:` keeps storage in memory.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_open_session(storage_path: Option<String>) -> ActionResponse {
    let path = storage_path
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(resolve_storage_path);
    let storage = match open_db(&path) {
        Ok(conn) => SqliteKeyValueStorage::new(conn),
        Err(err) => return ActionResponse::failure(format!("storage open failed: {err}")),
    };
    let settings = match HeatmapSettings::load(&storage) {
        Ok(settings) => settings,
        Err(err) => return ActionResponse::failure(format!("settings load failed: {err}")),
    };

    let service = HeatmapService::new(
        RecordingRenderer::default(),
        HostNavigation::default(),
        HostShell::default(),
        storage,
        settings,
    );
    match SESSION.lock() {
        Ok(mut guard) => {
            if let Some(previous) = guard.as_mut() {
                previous.destroy();
            }
            *guard = Some(service);
            ActionResponse::success("Session opened.")
        }
        Err(_) => ActionResponse::failure("heatmap session lock poisoned"),
    }
}

/// Loads dashboard data and renders.
///
/// Load failures are also recorded as an "An error occurred" dialog.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_load(request: LoadRequest) -> ActionResponse {
    let mut loader = RequestLoader(Some(request));
    respond(with_session(|session| session.load(&mut loader)), "Loaded.")
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_grid() -> Option<GridView> {
    with_session(|session| {
        let grid = session.grid()?;
        let config = HeatmapConfig::new(
            grid.max_level(),
            grid.dimension_labels().to_vec(),
            session.colors().clone(),
        );
        let sectors = grid
            .iter()
            .enumerate()
            .map(|(index, sector)| SectorView {
                index: index as u32,
                id: heatmap_core::service::heatmap_service::sector_id(index),
                dimension: sector.dimension.clone(),
                level: sector.level,
                activity_names: sector
                    .activities
                    .iter()
                    .map(|activity| activity.name.clone())
                    .collect(),
                progress: session.sector_progress(index),
            })
            .collect();
        Some(GridView {
            image_width: config.image_width,
            margin: config.margin,
            max_level: config.max_level,
            dimension_labels: config.dimension_labels,
            sectors,
        })
    })
    .ok()
    .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_sector_click(index: u32) -> ActionResponse {
    respond(
        with_session(|session| {
            session.on_sector_click(index as usize);
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Sector selected.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_sector_hover(index: Option<u32>) -> ActionResponse {
    respond(
        with_session(|session| {
            match index {
                Some(index) => session.on_sector_hover(index as usize),
                None => session.on_sector_mouse_out(),
            }
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Cursor updated.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_toggle_team(team: String) -> ActionResponse {
    respond(
        with_session(|session| session.toggle_team_filter(&team).map(|_| ())),
        "Team filter toggled.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_toggle_group(group: String) -> ActionResponse {
    respond(
        with_session(|session| session.toggle_team_group_filter(&group).map(|_| ())),
        "Team group filter applied.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_filters() -> Option<FilterView> {
    with_session(|session| {
        session.filters().map(|filters| FilterView {
            teams: filters
                .team_filters()
                .into_iter()
                .map(|(name, selected)| FilterChip { name, selected })
                .collect(),
            groups: filters
                .group_filters()
                .into_iter()
                .map(|(name, selected)| FilterChip { name, selected })
                .collect(),
            has_teams_filter: filters.has_teams_filter(),
        })
    })
    .ok()
    .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_open_activity(activity_uuid: String) -> ActionResponse {
    let Ok(uuid) = Uuid::parse_str(activity_uuid.trim()) else {
        return ActionResponse::failure(format!("invalid activity uuid: `{activity_uuid}`"));
    };
    respond(
        with_session(|session| {
            session.open_activity(uuid);
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Activity link handled.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_open_activity_details(activity_name: String) -> ActionResponse {
    respond(
        with_session(|session| {
            session.open_activity_details(&activity_name);
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Activity link handled.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_close_overlay() -> ActionResponse {
    respond(
        with_session(|session| {
            session.close_overlay();
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Overlay closed.",
    )
}

/// Reports a fragment change coming from the host (back/forward, shared link).
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_fragment_changed(fragment: Option<String>) -> ActionResponse {
    respond(
        with_session(|session| {
            session.navigation_mut().fragment = fragment.clone();
            session.on_fragment_changed(fragment.as_deref());
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Fragment handled.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_panel() -> Option<PanelView> {
    with_session(|session| {
        let panel = session.panel();
        PanelView {
            selected_sector: panel.selected_sector.map(|index| index as u32),
            activity_card: panel.activity_card.map(|index| index as u32),
            activity_uuid: panel
                .activity_details
                .as_ref()
                .map(|activity| activity.uuid.to_string()),
            activity_name: panel
                .activity_details
                .as_ref()
                .map(|activity| activity.name.clone()),
            show_overlay: panel.show_overlay,
            fragment: session.navigation().fragment.clone(),
        }
    })
    .ok()
}

/// Sets a team's stage for an activity, dated today.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_set_progress(activity_uuid: String, team: String, title: String) -> ActionResponse {
    let Ok(uuid) = Uuid::parse_str(activity_uuid.trim()) else {
        return ActionResponse::failure(format!("invalid activity uuid: `{activity_uuid}`"));
    };
    respond(
        with_session(|session| session.on_progress_change(uuid, &team, &title)),
        "Progress saved.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_team_progress(activity_uuid: String, team: String, backed_up: bool) -> Option<String> {
    let uuid = Uuid::parse_str(activity_uuid.trim()).ok()?;
    with_session(|session| {
        if backed_up {
            session.backed_up_team_progress_state(uuid, &team)
        } else {
            session.team_progress_state(uuid, &team)
        }
    })
    .ok()
    .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_export_progress() -> ExportResponse {
    match with_session(|session| session.export_team_progress()) {
        Ok(Some(file)) => ExportResponse {
            ok: true,
            file_name: Some(file.file_name),
            content: Some(file.content),
            message: "Progress exported.".to_string(),
        },
        Ok(None) => ExportResponse {
            ok: false,
            file_name: None,
            content: None,
            message: "No team progress data available".to_string(),
        },
        Err(message) => ExportResponse {
            ok: false,
            file_name: None,
            content: None,
            message,
        },
    }
}

/// Runs the delete-local-progress flow with the button Dart's dialog returned.
///
/// On success the message is `reload` when the host must reload its data.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_delete_local_progress(button: Option<String>) -> ActionResponse {
    let outcome = with_session(|session| {
        session.shell_mut().answer = button.clone();
        session.delete_local_teams_progress()
    });
    match outcome {
        Ok(Ok(DeleteOutcome::ReloadRequested)) => ActionResponse::success("reload"),
        Ok(Ok(DeleteOutcome::Cancelled)) => ActionResponse::success("cancelled"),
        Ok(Err(err)) => ActionResponse::failure(err.to_string()),
        Err(message) => ActionResponse::failure(message),
    }
}

/// Reads the progress YAML saved by earlier sessions, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_stored_progress() -> Option<String> {
    match with_session(|session| ProgressStore::retrieve_stored_yaml(session.storage())) {
        Ok(Ok(yaml)) => yaml,
        Ok(Err(err)) => {
            warn!("event=stored_progress module=ffi status=error error={err}");
            None
        }
        Err(_) => None,
    }
}

/// Reads the cached dataset as JSON text; legacy content is dropped.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_cached_dataset() -> Option<String> {
    with_session(|session| session.dataset_from_browser_storage())
        .ok()?
        .ok()?
        .map(|value| value.to_string())
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_theme_changed(properties: Vec<CssProperty>) -> ActionResponse {
    let style = PropertyStyle(properties);
    respond(
        with_session(|session| {
            session.on_theme_changed(&style);
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Theme applied.",
    )
}

/// Returns and clears recorded renderer commands.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_take_render_commands() -> Vec<RenderCommand> {
    with_session(|session| std::mem::take(&mut session.renderer_mut().commands)).unwrap_or_default()
}

/// Returns and clears recorded dialogs.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_take_dialogs() -> Vec<DialogRecord> {
    with_session(|session| std::mem::take(&mut session.shell_mut().dialogs)).unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_title() -> Option<String> {
    with_session(|session| session.shell().title.clone())
        .ok()
        .flatten()
}

/// Tears the session view down; repeated calls are harmless.
#[flutter_rust_bridge::frb(sync)]
pub fn heatmap_destroy() -> ActionResponse {
    respond(
        with_session(|session| {
            session.destroy();
            Ok::<(), heatmap_core::HeatmapError>(())
        }),
        "Session destroyed.",
    )
}

/// Renderer port that records commands for Dart.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    initialized: bool,
    commands: Vec<RenderCommand>,
}

impl RecordingRenderer {
    fn push(&mut self, kind: &str, sector_index: Option<usize>, value: Option<f64>) {
        self.commands.push(RenderCommand {
            kind: kind.to_string(),
            sector_index: sector_index.map(|index| index as u32),
            value,
            target: None,
            sector_id: None,
        });
    }
}

impl HeatmapRenderer for RecordingRenderer {
    fn initialize(&mut self, selector: &str, _config: &HeatmapConfig) {
        self.initialized = true;
        self.commands.push(RenderCommand {
            kind: "initialize".to_string(),
            sector_index: None,
            value: None,
            target: Some(selector.to_string()),
            sector_id: None,
        });
    }

    fn render(&mut self, _sectors: &[Sector], _progress: &[Option<f64>]) {
        self.push("render", None, None);
    }

    fn recolor_sector(&mut self, index: usize, value: Option<f64>) {
        self.push("recolor", Some(index), value);
    }

    fn set_sector_cursor(&mut self, kind: CursorKind, sector_id: Option<&str>) {
        self.commands.push(RenderCommand {
            kind: "cursor".to_string(),
            sector_index: None,
            value: None,
            target: Some(kind.selector().to_string()),
            sector_id: sector_id.map(str::to_string),
        });
    }

    fn update_theme_colors(&mut self, _colors: &HeatmapColors) {
        self.push("theme", None, None);
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Fragment mirror; Dart reads it back through `heatmap_panel`.
#[derive(Debug, Default)]
pub struct HostNavigation {
    fragment: Option<String>,
}

impl NavigationPort for HostNavigation {
    fn fragment(&self) -> Option<String> {
        self.fragment.clone()
    }

    fn set_fragment(&mut self, fragment: Option<&str>) {
        self.fragment = fragment.map(str::to_string);
    }
}

/// Dialog port; confirmations use the answer Dart supplied up front.
#[derive(Debug, Default)]
pub struct HostShell {
    dialogs: Vec<DialogRecord>,
    answer: Option<String>,
    title: Option<String>,
}

impl ShellPort for HostShell {
    fn display_message(&mut self, dialog: DialogInfo) {
        self.dialogs.push(to_dialog_record(dialog));
    }

    fn ask(&mut self, dialog: DialogInfo) -> Option<String> {
        self.dialogs.push(to_dialog_record(dialog));
        self.answer.take()
    }

    fn set_title(&mut self, title: Option<&str>) {
        self.title = title.map(str::to_string);
    }
}

struct PropertyStyle(Vec<CssProperty>);

impl ComputedStyle for PropertyStyle {
    fn property_value(&self, name: &str) -> Option<String> {
        self.0
            .iter()
            .find(|property| property.name == name)
            .map(|property| property.value.clone())
    }
}

struct RequestLoader(Option<LoadRequest>);

impl DataLoader for RequestLoader {
    fn load(&mut self) -> Result<DataStore, LoadError> {
        let request = self
            .0
            .take()
            .ok_or_else(|| LoadError::Failed("load request already consumed".to_string()))?;

        let mut activities = Vec::with_capacity(request.activities.len());
        for input in request.activities {
            let uuid = Uuid::parse_str(input.uuid.trim()).map_err(|err| {
                LoadError::Failed(format!("activity `{}` has invalid uuid: {err}", input.name))
            })?;
            let mut activity = Activity::new(uuid, input.name, input.dimension, input.level);
            activity.category = input.category;
            activity.description = input.description;
            activities.push(activity);
        }
        let activity_store = InMemoryActivityRepository::from_activities(activities)
            .map_err(|err| LoadError::Failed(err.to_string()))?;

        let definitions = ProgressDefinitions::new(
            request
                .progress_stages
                .into_iter()
                .map(|stage| ProgressStageInput {
                    title: stage.title,
                    score: ScoreInput::Text(stage.score),
                    definition: None,
                })
                .collect(),
        )
        .map_err(|err| LoadError::Failed(err.to_string()))?;
        let mut records = Vec::with_capacity(request.progress.len());
        for input in request.progress {
            records.push(to_progress_record(input)?);
        }
        let mut progress_store = ProgressStore::new();
        progress_store.init(definitions);
        progress_store.add_progress_records(records);

        Ok(DataStore {
            activity_store: Some(Box::new(activity_store)),
            progress_store: Some(progress_store),
            meta: Some(MetaStore {
                teams: request.teams,
                team_groups: request
                    .team_groups
                    .into_iter()
                    .map(|group| (group.name, group.teams))
                    .collect(),
                all_teams_group_name: request.all_teams_group_name,
                team_progress_file: request.team_progress_file,
            }),
        })
    }
}

fn to_progress_record(input: ProgressRecordInput) -> Result<ProgressRecord, LoadError> {
    let activity = Uuid::parse_str(input.activity_uuid.trim()).map_err(|err| {
        LoadError::Failed(format!(
            "progress for team `{}` has invalid activity uuid: {err}",
            input.team
        ))
    })?;
    let date = parse_stage_date(&input.date).map_err(|err| LoadError::Failed(err.to_string()))?;
    Ok(ProgressRecord {
        activity,
        team: input.team,
        title: input.title,
        date,
    })
}

fn to_dialog_record(dialog: DialogInfo) -> DialogRecord {
    DialogRecord {
        title: dialog.title,
        message: dialog.message,
        buttons: dialog.buttons,
    }
}

fn with_session<T>(f: impl FnOnce(&mut Session) -> T) -> Result<T, String> {
    let mut guard = SESSION
        .lock()
        .map_err(|_| "heatmap session lock poisoned".to_string())?;
    let session = guard
        .as_mut()
        .ok_or_else(|| "heatmap session is not open".to_string())?;
    Ok(f(session))
}

fn respond<E: std::fmt::Display>(
    result: Result<Result<(), E>, String>,
    success: &str,
) -> ActionResponse {
    match result {
        Ok(Ok(())) => ActionResponse::success(success),
        Ok(Err(err)) => {
            warn!("event=ffi_call module=ffi status=error error={err}");
            ActionResponse::failure(err.to_string())
        }
        Err(message) => ActionResponse::failure(message),
    }
}

fn resolve_storage_path() -> PathBuf {
    STORAGE_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("HEATMAP_STORAGE_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(STORAGE_FILE_NAME)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, heatmap_close_overlay, heatmap_delete_local_progress, heatmap_destroy,
        heatmap_export_progress, heatmap_filters, heatmap_grid, heatmap_load,
        heatmap_open_activity, heatmap_open_session, heatmap_panel, heatmap_set_progress,
        heatmap_stored_progress, heatmap_take_dialogs, heatmap_take_render_commands,
        heatmap_team_progress, heatmap_title, heatmap_toggle_group, heatmap_toggle_team,
        init_logging, ping, ActivityInput, LoadRequest, ProgressRecordInput, ProgressStageDef,
        TeamGroupInput,
    };
    use std::sync::Mutex;
    use uuid::Uuid;

    static SESSION_TEST_LOCK: Mutex<()> = Mutex::new(());

    const BUILD_UUID: &str = "3f2b8a10-6c1d-4e2f-9a7b-1c2d3e4f5a6b";
    const TEST_UUID: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

    fn request() -> LoadRequest {
        LoadRequest {
            activities: vec![
                ActivityInput {
                    uuid: BUILD_UUID.to_string(),
                    name: "Build pipeline".to_string(),
                    dimension: "Build".to_string(),
                    level: 1,
                    category: None,
                    description: None,
                },
                ActivityInput {
                    uuid: TEST_UUID.to_string(),
                    name: "Unit tests".to_string(),
                    dimension: "Test".to_string(),
                    level: 2,
                    category: None,
                    description: None,
                },
            ],
            teams: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            team_groups: vec![TeamGroupInput {
                name: "Core".to_string(),
                teams: vec!["A".to_string(), "B".to_string()],
            }],
            all_teams_group_name: None,
            progress_stages: vec![
                ProgressStageDef {
                    title: "Not started".to_string(),
                    score: "0%".to_string(),
                },
                ProgressStageDef {
                    title: "Started".to_string(),
                    score: "50%".to_string(),
                },
                ProgressStageDef {
                    title: "Done".to_string(),
                    score: "100%".to_string(),
                },
            ],
            team_progress_file: None,
            progress: Vec::new(),
        }
    }

    fn open_loaded_session() {
        let opened = heatmap_open_session(Some(":memory:".to_string()));
        assert!(opened.ok, "{}", opened.message);
        let loaded = heatmap_load(request());
        assert!(loaded.ok, "{}", loaded.message);
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_dir() {
        assert!(!init_logging("info".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn load_renders_grid_and_sets_title() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        open_loaded_session();

        let commands = heatmap_take_render_commands();
        assert_eq!(commands[0].kind, "initialize");
        assert_eq!(commands[1].kind, "render");
        let grid = heatmap_grid().expect("grid after load");
        assert_eq!(grid.sectors.len(), 4);
        assert_eq!(grid.sectors[0].id, "index-0");
        assert_eq!(grid.sectors[1].progress, None);
        assert_eq!(heatmap_title().as_deref(), Some("Heatmap"));

        heatmap_destroy();
        heatmap_destroy();
        assert_eq!(heatmap_title(), None);
    }

    #[test]
    fn invalid_load_records_error_dialog() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        assert!(heatmap_open_session(Some(":memory:".to_string())).ok);
        let mut bad = request();
        bad.activities[0].uuid = "nope".to_string();

        let response = heatmap_load(bad);
        assert!(!response.ok);
        let dialogs = heatmap_take_dialogs();
        assert_eq!(dialogs.len(), 1);
        assert_eq!(dialogs[0].title, "An error occurred");
    }

    #[test]
    fn group_chip_follows_team_selection() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        open_loaded_session();

        assert!(heatmap_toggle_team("A".to_string()).ok);
        assert!(heatmap_toggle_team("B".to_string()).ok);
        let filters = heatmap_filters().expect("filters");
        let core = filters.groups.iter().find(|chip| chip.name == "Core").unwrap();
        let all = filters.groups.iter().find(|chip| chip.name == "All").unwrap();
        assert!(core.selected);
        assert!(!all.selected);
        assert!(filters.has_teams_filter);

        assert!(heatmap_toggle_group("All".to_string()).ok);
        assert!(!heatmap_filters().unwrap().has_teams_filter);
        assert!(!heatmap_toggle_team("Z".to_string()).ok);
    }

    #[test]
    fn deep_link_round_trip_through_panel() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        open_loaded_session();

        assert!(heatmap_open_activity(TEST_UUID.to_string()).ok);
        let panel = heatmap_panel().unwrap();
        assert!(panel.show_overlay);
        assert_eq!(panel.fragment.as_deref(), Some(TEST_UUID));
        assert_eq!(panel.activity_card, Some(3));

        assert!(heatmap_close_overlay().ok);
        let panel = heatmap_panel().unwrap();
        assert!(!panel.show_overlay);
        assert_eq!(panel.fragment, None);
    }

    #[test]
    fn progress_change_then_export_and_delete() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        open_loaded_session();
        assert!(!heatmap_export_progress().ok);
        heatmap_take_dialogs();

        let response =
            heatmap_set_progress(BUILD_UUID.to_string(), "A".to_string(), "Done".to_string());
        assert!(response.ok, "{}", response.message);
        assert_eq!(
            heatmap_team_progress(BUILD_UUID.to_string(), "A".to_string(), false).as_deref(),
            Some("Done")
        );

        let export = heatmap_export_progress();
        assert!(export.ok);
        assert_eq!(export.file_name.as_deref(), Some("team-progress.yaml"));
        assert!(export.content.unwrap().contains("# Build pipeline"));

        let cancelled = heatmap_delete_local_progress(Some("Cancel".to_string()));
        assert_eq!(cancelled.message, "cancelled");
        let deleted = heatmap_delete_local_progress(Some("Delete".to_string()));
        assert_eq!(deleted.message, "reload");
        let dialogs = heatmap_take_dialogs();
        assert_eq!(dialogs.last().unwrap().title, "Delete local browser data");
    }

    #[test]
    fn stored_progress_survives_reopen_and_reloads() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let path = std::env::temp_dir().join(format!("heatmap-progress-{}.sqlite3", Uuid::new_v4()));
        let path_text = path.to_string_lossy().into_owned();

        assert!(heatmap_open_session(Some(path_text.clone())).ok);
        assert!(heatmap_load(request()).ok);
        assert_eq!(heatmap_stored_progress(), None);
        let response =
            heatmap_set_progress(BUILD_UUID.to_string(), "A".to_string(), "Done".to_string());
        assert!(response.ok, "{}", response.message);
        let stored = heatmap_stored_progress().expect("progress saved");
        assert!(stored.contains(BUILD_UUID));
        assert!(stored.contains("'Done'"));

        assert!(heatmap_open_session(Some(path_text)).ok);
        assert_eq!(heatmap_stored_progress().as_deref(), Some(stored.as_str()));

        let mut reload = request();
        reload.progress = vec![
            ProgressRecordInput {
                activity_uuid: BUILD_UUID.to_string(),
                team: "A".to_string(),
                title: "Started".to_string(),
                date: "2024-03-01".to_string(),
            },
            ProgressRecordInput {
                activity_uuid: BUILD_UUID.to_string(),
                team: "A".to_string(),
                title: "Done".to_string(),
                date: "2024-03-02".to_string(),
            },
        ];
        let loaded = heatmap_load(reload.clone());
        assert!(loaded.ok, "{}", loaded.message);
        assert_eq!(
            heatmap_team_progress(BUILD_UUID.to_string(), "A".to_string(), false).as_deref(),
            Some("Done")
        );
        assert_eq!(
            heatmap_team_progress(BUILD_UUID.to_string(), "B".to_string(), false).as_deref(),
            Some("Not started")
        );
        let grid = heatmap_grid().expect("grid after reload");
        assert!(grid.sectors[0].progress.unwrap() > 0.0);

        reload.progress[1].date = "02.03.2024".to_string();
        let failed = heatmap_load(reload);
        assert!(!failed.ok);
        assert!(failed.message.contains("02.03.2024"), "{}", failed.message);

        assert!(heatmap_open_session(Some(":memory:".to_string())).ok);
        let _ = std::fs::remove_file(&path);
    }
}
