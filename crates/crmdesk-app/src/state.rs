// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    Activity, Application, Contact, DashboardCounts, Department, FilterState, FormKind, Incident,
    Integration, TagCategory, TagColorMap, ViewKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Filter,
    Form(FormKind),
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatVisibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_view: ViewKind,
    pub chat: ChatVisibility,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_view: ViewKind::Dashboard,
            chat: ChatVisibility::Hidden,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextView,
    PrevView,
    SelectView(ViewKind),
    EditFilters,
    OpenForm(FormKind),
    OpenConfirm,
    ExitToNav,
    OpenChat,
    CloseChat,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ViewChanged(ViewKind),
    ChatVisibilityChanged(ChatVisibility),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextView => self.rotate_view(1),
            AppCommand::PrevView => self.rotate_view(-1),
            AppCommand::SelectView(view) => {
                if self.active_view == view {
                    return Vec::new();
                }
                self.active_view = view;
                self.mode = AppMode::Nav;
                vec![AppEvent::ViewChanged(view)]
            }
            AppCommand::EditFilters => {
                if self.active_view.filter_controls().is_empty() {
                    return vec![self.set_status("no filters on this view")];
                }
                self.mode = AppMode::Filter;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenConfirm => {
                self.mode = AppMode::Confirm;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenChat => {
                self.chat = ChatVisibility::Visible;
                vec![
                    AppEvent::ChatVisibilityChanged(self.chat),
                    self.set_status("chat open"),
                ]
            }
            AppCommand::CloseChat => {
                self.chat = ChatVisibility::Hidden;
                vec![
                    AppEvent::ChatVisibilityChanged(self.chat),
                    self.set_status("chat hidden"),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_view(&mut self, delta: isize) -> Vec<AppEvent> {
        let views = ViewKind::ALL;
        let current = views
            .iter()
            .position(|view| *view == self.active_view)
            .unwrap_or(0) as isize;
        let len = views.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_view = views[next];
        self.mode = AppMode::Nav;
        vec![AppEvent::ViewChanged(self.active_view)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

/// One full load of the six collections plus tag categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSnapshot {
    pub departments: Vec<Department>,
    pub applications: Vec<Application>,
    pub integrations: Vec<Integration>,
    pub contacts: Vec<Contact>,
    pub activities: Vec<Activity>,
    pub incidents: Vec<Incident>,
    pub tag_categories: Vec<TagCategory>,
}

impl DataSnapshot {
    pub fn tag_category(&self, name: &str) -> Option<&TagCategory> {
        self.tag_categories
            .iter()
            .find(|category| category.name == name)
    }

    pub fn row_count(&self, view: ViewKind) -> Option<usize> {
        let count = match view {
            ViewKind::Departments => self.departments.len(),
            ViewKind::Applications => self.applications.len(),
            ViewKind::Integrations => self.integrations.len(),
            ViewKind::Contacts => self.contacts.len(),
            ViewKind::Activities => self.activities.len(),
            ViewKind::Incidents => self.incidents.len(),
            ViewKind::Tags => self.tag_categories.len(),
            ViewKind::Dashboard => return None,
        };
        Some(count)
    }
}

/// Client-side cache. Collections and the tag color map are only ever
/// replaced together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppData {
    snapshot: DataSnapshot,
    tag_colors: TagColorMap,
    pub dashboard: DashboardCounts,
    pub filters: FilterState,
    loaded: bool,
}

impl AppData {
    pub fn snapshot(&self) -> &DataSnapshot {
        &self.snapshot
    }

    pub fn tag_colors(&self) -> &TagColorMap {
        &self.tag_colors
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn replace(&mut self, snapshot: DataSnapshot) {
        self.tag_colors = TagColorMap::from_categories(&snapshot.tag_categories);
        self.filters.rebuild_distinct(&snapshot);
        self.snapshot = snapshot;
        self.loaded = true;
    }

    pub fn rebuild_filter_options(&mut self) {
        self.filters.rebuild_distinct(&self.snapshot);
    }

    /// Swaps in fresh tag categories after a tag mutation, keeping entity
    /// collections.
    pub fn replace_tag_categories(&mut self, categories: Vec<TagCategory>) {
        self.tag_colors = TagColorMap::from_categories(&categories);
        self.snapshot.tag_categories = categories;
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppData, AppEvent, AppMode, AppState, ChatVisibility, DataSnapshot};
    use crate::{
        Department, DepartmentId, FilterId, FormKind, TagCategory, TagField, TagId, TagValue,
        ViewKind,
    };

    #[test]
    fn view_rotation_wraps() {
        let mut state = AppState {
            active_view: ViewKind::Tags,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextView);
        assert_eq!(state.active_view, ViewKind::Dashboard);
        assert_eq!(events, vec![AppEvent::ViewChanged(ViewKind::Dashboard)]);

        state.dispatch(AppCommand::PrevView);
        assert_eq!(state.active_view, ViewKind::Tags);
    }

    #[test]
    fn selecting_current_view_is_a_no_op() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::SelectView(ViewKind::Dashboard)).is_empty());
    }

    #[test]
    fn filters_unavailable_on_dashboard() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::EditFilters);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated("no filters on this view".to_owned())]
        );

        state.dispatch(AppCommand::SelectView(ViewKind::Incidents));
        state.dispatch(AppCommand::EditFilters);
        assert_eq!(state.mode, AppMode::Filter);
    }

    #[test]
    fn open_and_close_chat() {
        let mut state = AppState::default();

        let opened = state.dispatch(AppCommand::OpenChat);
        assert_eq!(state.chat, ChatVisibility::Visible);
        assert_eq!(
            opened,
            vec![
                AppEvent::ChatVisibilityChanged(ChatVisibility::Visible),
                AppEvent::StatusUpdated("chat open".to_owned()),
            ],
        );

        state.dispatch(AppCommand::CloseChat);
        assert_eq!(state.chat, ChatVisibility::Hidden);
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::OpenForm(FormKind::Contact));
        assert_eq!(state.mode, AppMode::Form(FormKind::Contact));

        state.dispatch(AppCommand::OpenConfirm);
        assert_eq!(state.mode, AppMode::Confirm);

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn replace_swaps_collections_and_tag_colors_together() {
        let mut data = AppData::default();
        assert!(!data.is_loaded());
        assert!(data.tag_colors().is_empty());

        data.replace(DataSnapshot {
            departments: vec![Department {
                department_id: DepartmentId::new(1),
                name: "Health".to_owned(),
                owner_team: "Alpha".to_owned(),
                ..Department::default()
            }],
            tag_categories: vec![TagCategory {
                name: "department_tier".to_owned(),
                tags: vec![TagValue {
                    tag_id: TagId::new(1),
                    value: "critical".to_owned(),
                    label: "Critical".to_owned(),
                    color: "#E74C3C".to_owned(),
                    is_active: true,
                    ..TagValue::default()
                }],
                ..TagCategory::default()
            }],
            ..DataSnapshot::default()
        });

        assert!(data.is_loaded());
        assert_eq!(
            data.tag_colors()
                .badge(TagField::DepartmentTier, "critical")
                .text(),
            "Critical"
        );
        let choices = data
            .filters
            .choices(FilterId::DepartmentOwnerTeam, data.snapshot());
        assert_eq!(choices.len(), 2);
        assert_eq!(data.snapshot().row_count(ViewKind::Departments), Some(1));
    }
}
