//! URL fragment <-> open activity synchronization.
//!
//! # Responsibility
//! - Resolve an activity UUID against the activity store and the grid.
//! - Drive panel state (selected sector, activity card, details, overlay).
//! - Mirror the open activity into the URL fragment through `NavigationPort`.
//!
//! # Invariants
//! - Resolution failures never error; they log a warning and end closed.
//! - An unresolvable fragment is left in place.
//! - Consecutive identical inbound fragments are handled once.

use crate::model::activity::{Activity, ActivityId};
use crate::model::sector::SectorGrid;
use crate::repo::activity_repo::ActivityRepository;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("valid uuid regex")
});

/// URL fragment port. Implementations preserve query parameters.
pub trait NavigationPort {
    fn fragment(&self) -> Option<String>;
    fn set_fragment(&mut self, fragment: Option<&str>);
}

impl<T: NavigationPort + ?Sized> NavigationPort for Box<T> {
    fn fragment(&self) -> Option<String> {
        (**self).fragment()
    }

    fn set_fragment(&mut self, fragment: Option<&str>) {
        (**self).set_fragment(fragment)
    }
}

/// Observable deep-link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLinkState {
    Closed,
    Open {
        activity: ActivityId,
        sector_index: usize,
    },
}

/// Detail panel state driven by deep links and sector clicks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    /// Sector highlighted in the grid.
    pub selected_sector: Option<usize>,
    /// Sector whose activity card is shown.
    pub activity_card: Option<usize>,
    pub activity_details: Option<Activity>,
    pub show_overlay: bool,
}

/// Keeps the fragment and the activity overlay in lockstep.
pub struct DeepLinkSynchronizer<N: NavigationPort> {
    navigation: N,
    panel: PanelState,
    last_fragment: Option<String>,
}

impl<N: NavigationPort> DeepLinkSynchronizer<N> {
    pub fn new(navigation: N) -> Self {
        Self {
            navigation,
            panel: PanelState::default(),
            last_fragment: None,
        }
    }

    pub fn navigation(&self) -> &N {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        &mut self.navigation
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn state(&self) -> DeepLinkState {
        match (&self.panel.activity_details, self.panel.activity_card) {
            (Some(activity), Some(sector_index)) if self.panel.show_overlay => {
                DeepLinkState::Open {
                    activity: activity.uuid,
                    sector_index,
                }
            }
            _ => DeepLinkState::Closed,
        }
    }

    /// Highlights a sector without opening any activity.
    ///
    /// Disabled sectors are selected but show no activity card.
    pub fn select_sector(&mut self, index: usize, has_activities: bool) {
        self.panel.selected_sector = Some(index);
        self.panel.activity_card = has_activities.then_some(index);
    }

    /// Opens the activity overlay for `uuid` and writes it to the fragment.
    pub fn open_by_uuid(
        &mut self,
        uuid: ActivityId,
        activities: &dyn ActivityRepository,
        grid: &SectorGrid,
    ) -> DeepLinkState {
        let resolved = activities
            .activity_by_uuid(uuid)
            .zip(grid.index_of_activity(uuid));
        let Some((activity, sector_index)) = resolved else {
            warn!("event=deep_link_open module=deep_link status=unresolved uuid={uuid}");
            self.panel.show_overlay = false;
            return DeepLinkState::Closed;
        };

        info!(
            "event=deep_link_open module=deep_link status=ok uuid={uuid} sector={sector_index}"
        );
        self.panel.selected_sector = Some(sector_index);
        self.panel.activity_card = Some(sector_index);
        self.panel.activity_details = Some(activity);
        self.panel.show_overlay = true;

        let fragment = uuid.to_string();
        self.navigation.set_fragment(Some(&fragment));
        self.last_fragment = Some(fragment);
        self.state()
    }

    /// Opens an activity of the shown card by name.
    ///
    /// Names outside the shown card do not resolve.
    pub fn open_activity_details(
        &mut self,
        activity_name: &str,
        activities: &dyn ActivityRepository,
        grid: &SectorGrid,
    ) -> DeepLinkState {
        let uuid = self
            .panel
            .activity_card
            .and_then(|index| grid.get(index))
            .and_then(|sector| {
                sector
                    .activities
                    .iter()
                    .find(|activity| activity.name == activity_name)
                    .map(|activity| activity.uuid)
            });
        match uuid {
            Some(uuid) => self.open_by_uuid(uuid, activities, grid),
            None => {
                warn!(
                    "event=deep_link_open module=deep_link status=unresolved name={activity_name}"
                );
                self.panel.show_overlay = false;
                DeepLinkState::Closed
            }
        }
    }

    /// Forgets panel state and the last seen fragment.
    ///
    /// Used when the grid is rebuilt; the fragment itself is left alone.
    pub fn reset(&mut self) {
        self.panel = PanelState::default();
        self.last_fragment = None;
    }

    /// Clears the fragment and hides the overlay.
    pub fn close_overlay(&mut self) {
        info!("event=deep_link_close module=deep_link status=ok");
        self.navigation.set_fragment(None);
        self.last_fragment = None;
        self.panel.show_overlay = false;
    }

    /// Handles an inbound fragment (back/forward, shared link).
    pub fn on_fragment_changed(
        &mut self,
        fragment: Option<&str>,
        activities: &dyn ActivityRepository,
        grid: &SectorGrid,
    ) -> DeepLinkState {
        let normalized = fragment.and_then(normalize_fragment);
        if normalized == self.last_fragment {
            return self.state();
        }
        self.last_fragment = normalized.clone();

        let Some(fragment) = normalized else {
            self.panel.show_overlay = false;
            return DeepLinkState::Closed;
        };
        match parse_fragment_uuid(&fragment) {
            Some(uuid) => self.open_by_uuid(uuid, activities, grid),
            None => {
                warn!("event=deep_link_open module=deep_link status=invalid_fragment");
                self.panel.show_overlay = false;
                DeepLinkState::Closed
            }
        }
    }
}

/// Strips a leading `#`, trims and lowercases; blank fragments become `None`.
pub fn normalize_fragment(fragment: &str) -> Option<String> {
    let trimmed = fragment.trim();
    let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

/// Parses a normalized fragment as a hyphenated UUID.
pub fn parse_fragment_uuid(fragment: &str) -> Option<Uuid> {
    if !UUID_RE.is_match(fragment) {
        return None;
    }
    Uuid::parse_str(fragment).ok()
}
