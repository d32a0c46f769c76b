// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};
use time::Date;

use crate::{
    ACTIVE_FLAGS, Activity, Application, Contact, DataSnapshot, Department, INCIDENT_SEVERITIES,
    INCIDENT_STATUSES, INTEGRATION_STATUSES, Incident, Integration, RISK_LEVELS, TagField, ViewKind,
    parse_calendar_date, tag_options,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Case-insensitive substring over the record's searchable text.
    Search,
    Exact,
    /// Substring containment, for comma-joined multi-value fields.
    Contains,
    DateFrom,
    DateTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctSource {
    OwnerTeams,
    Departments,
    Applications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    FreeText,
    Fixed(&'static [(&'static str, &'static str)]),
    Tags(TagField),
    Distinct(DistinctSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterId {
    DepartmentSearch,
    DepartmentTier,
    DepartmentStatus,
    DepartmentOwnerTeam,
    ApplicationSearch,
    ApplicationDepartment,
    ApplicationEnvironment,
    ApplicationAuthType,
    ApplicationStatus,
    IntegrationSearch,
    IntegrationStage,
    IntegrationStatus,
    IntegrationRisk,
    IntegrationDepartment,
    ContactSearch,
    ContactDepartment,
    ContactRole,
    ContactActive,
    ActivitySearch,
    ActivityType,
    ActivityDepartment,
    ActivityApplication,
    ActivityDateFrom,
    ActivityDateTo,
    IncidentSearch,
    IncidentSeverity,
    IncidentStatus,
    IncidentApplication,
}

impl FilterId {
    /// Stable control identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DepartmentSearch => "dept-search",
            Self::DepartmentTier => "dept-tier",
            Self::DepartmentStatus => "dept-status",
            Self::DepartmentOwnerTeam => "dept-owner-team",
            Self::ApplicationSearch => "app-search",
            Self::ApplicationDepartment => "app-department",
            Self::ApplicationEnvironment => "app-environment",
            Self::ApplicationAuthType => "app-auth-type",
            Self::ApplicationStatus => "app-status",
            Self::IntegrationSearch => "int-search",
            Self::IntegrationStage => "int-stage",
            Self::IntegrationStatus => "int-status",
            Self::IntegrationRisk => "int-risk",
            Self::IntegrationDepartment => "int-department",
            Self::ContactSearch => "contact-search",
            Self::ContactDepartment => "contact-department",
            Self::ContactRole => "contact-role",
            Self::ContactActive => "contact-active",
            Self::ActivitySearch => "activity-search",
            Self::ActivityType => "activity-type",
            Self::ActivityDepartment => "activity-department",
            Self::ActivityApplication => "activity-application",
            Self::ActivityDateFrom => "activity-date-from",
            Self::ActivityDateTo => "activity-date-to",
            Self::IncidentSearch => "incident-search",
            Self::IncidentSeverity => "incident-severity",
            Self::IncidentStatus => "incident-status",
            Self::IncidentApplication => "incident-application",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DepartmentSearch
            | Self::ApplicationSearch
            | Self::IntegrationSearch
            | Self::ContactSearch
            | Self::ActivitySearch
            | Self::IncidentSearch => "search",
            Self::DepartmentTier => "tier",
            Self::DepartmentStatus
            | Self::ApplicationStatus
            | Self::IntegrationStatus
            | Self::IncidentStatus => "status",
            Self::DepartmentOwnerTeam => "owner team",
            Self::ApplicationDepartment
            | Self::IntegrationDepartment
            | Self::ContactDepartment
            | Self::ActivityDepartment => "department",
            Self::ApplicationEnvironment => "environment",
            Self::ApplicationAuthType => "auth type",
            Self::IntegrationStage => "stage",
            Self::IntegrationRisk => "risk",
            Self::ContactRole => "role",
            Self::ContactActive => "active",
            Self::ActivityType => "type",
            Self::ActivityApplication | Self::IncidentApplication => "application",
            Self::ActivityDateFrom => "from",
            Self::ActivityDateTo => "to",
            Self::IncidentSeverity => "severity",
        }
    }

    pub const fn kind(self) -> FilterKind {
        match self {
            Self::DepartmentSearch
            | Self::ApplicationSearch
            | Self::IntegrationSearch
            | Self::ContactSearch
            | Self::ActivitySearch
            | Self::IncidentSearch => FilterKind::Search,
            Self::ApplicationAuthType => FilterKind::Contains,
            Self::ActivityDateFrom => FilterKind::DateFrom,
            Self::ActivityDateTo => FilterKind::DateTo,
            _ => FilterKind::Exact,
        }
    }

    pub const fn source(self) -> OptionSource {
        match self {
            Self::DepartmentTier => OptionSource::Tags(TagField::DepartmentTier),
            Self::DepartmentStatus => OptionSource::Tags(TagField::DepartmentStatus),
            Self::DepartmentOwnerTeam => OptionSource::Distinct(DistinctSource::OwnerTeams),
            Self::ApplicationDepartment
            | Self::IntegrationDepartment
            | Self::ContactDepartment
            | Self::ActivityDepartment => OptionSource::Distinct(DistinctSource::Departments),
            Self::ActivityApplication | Self::IncidentApplication => {
                OptionSource::Distinct(DistinctSource::Applications)
            }
            Self::ApplicationEnvironment => OptionSource::Tags(TagField::ApplicationEnvironment),
            Self::ApplicationAuthType => OptionSource::Tags(TagField::ApplicationAuthType),
            Self::ApplicationStatus => OptionSource::Tags(TagField::ApplicationStatus),
            Self::IntegrationStage => OptionSource::Tags(TagField::IntegrationStage),
            Self::IntegrationStatus => OptionSource::Fixed(&INTEGRATION_STATUSES),
            Self::IntegrationRisk => OptionSource::Fixed(&RISK_LEVELS),
            Self::ContactRole => OptionSource::Tags(TagField::ContactRole),
            Self::ContactActive => OptionSource::Fixed(&ACTIVE_FLAGS),
            Self::ActivityType => OptionSource::Tags(TagField::ActivityType),
            Self::IncidentSeverity => OptionSource::Fixed(&INCIDENT_SEVERITIES),
            Self::IncidentStatus => OptionSource::Fixed(&INCIDENT_STATUSES),
            Self::DepartmentSearch
            | Self::ApplicationSearch
            | Self::IntegrationSearch
            | Self::ContactSearch
            | Self::ActivitySearch
            | Self::IncidentSearch
            | Self::ActivityDateFrom
            | Self::ActivityDateTo => OptionSource::FreeText,
        }
    }

    pub const fn all_label(self) -> &'static str {
        match self.source() {
            OptionSource::Distinct(DistinctSource::OwnerTeams) => "All Teams",
            OptionSource::Distinct(DistinctSource::Departments) => "All Departments",
            OptionSource::Distinct(DistinctSource::Applications) => "All Applications",
            _ => "All",
        }
    }
}

impl ViewKind {
    /// The fixed control list of a view, in display order.
    pub const fn filter_controls(self) -> &'static [FilterId] {
        match self {
            Self::Departments => &[
                FilterId::DepartmentSearch,
                FilterId::DepartmentTier,
                FilterId::DepartmentStatus,
                FilterId::DepartmentOwnerTeam,
            ],
            Self::Applications => &[
                FilterId::ApplicationSearch,
                FilterId::ApplicationDepartment,
                FilterId::ApplicationEnvironment,
                FilterId::ApplicationAuthType,
                FilterId::ApplicationStatus,
            ],
            Self::Integrations => &[
                FilterId::IntegrationSearch,
                FilterId::IntegrationStage,
                FilterId::IntegrationStatus,
                FilterId::IntegrationRisk,
                FilterId::IntegrationDepartment,
            ],
            Self::Contacts => &[
                FilterId::ContactSearch,
                FilterId::ContactDepartment,
                FilterId::ContactRole,
                FilterId::ContactActive,
            ],
            Self::Activities => &[
                FilterId::ActivitySearch,
                FilterId::ActivityType,
                FilterId::ActivityDepartment,
                FilterId::ActivityApplication,
                FilterId::ActivityDateFrom,
                FilterId::ActivityDateTo,
            ],
            Self::Incidents => &[
                FilterId::IncidentSearch,
                FilterId::IncidentSeverity,
                FilterId::IncidentStatus,
                FilterId::IncidentApplication,
            ],
            Self::Dashboard | Self::Tags => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Text(&'a str),
    Flag(bool),
    Date(Option<Date>),
    Missing,
}

pub trait Filterable {
    fn search_fields(&self) -> Vec<&str>;
    fn filter_field(&self, id: FilterId) -> FieldRef<'_>;
}

impl Filterable for Department {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.acronym.as_str(), self.owner_team.as_str()]
    }

    fn filter_field(&self, id: FilterId) -> FieldRef<'_> {
        match id {
            FilterId::DepartmentTier => FieldRef::Text(&self.tier),
            FilterId::DepartmentStatus => FieldRef::Text(&self.status),
            FilterId::DepartmentOwnerTeam => FieldRef::Text(&self.owner_team),
            _ => FieldRef::Missing,
        }
    }
}

impl Filterable for Application {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.app_name.as_str(), self.department_name.as_str()]
    }

    fn filter_field(&self, id: FilterId) -> FieldRef<'_> {
        match id {
            FilterId::ApplicationDepartment => FieldRef::Text(&self.department_name),
            FilterId::ApplicationEnvironment => FieldRef::Text(&self.environment),
            FilterId::ApplicationAuthType => FieldRef::Text(&self.auth_type),
            FilterId::ApplicationStatus => FieldRef::Text(&self.status),
            _ => FieldRef::Missing,
        }
    }
}

impl Filterable for Integration {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.app_name.as_str(), self.department_name.as_str(), self.notes.as_str()]
    }

    fn filter_field(&self, id: FilterId) -> FieldRef<'_> {
        match id {
            FilterId::IntegrationStage => FieldRef::Text(&self.stage),
            FilterId::IntegrationStatus => FieldRef::Text(&self.status),
            FilterId::IntegrationRisk => FieldRef::Text(&self.risk_level),
            FilterId::IntegrationDepartment => FieldRef::Text(&self.department_name),
            _ => FieldRef::Missing,
        }
    }
}

impl Filterable for Contact {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.phone.as_str()]
    }

    fn filter_field(&self, id: FilterId) -> FieldRef<'_> {
        match id {
            FilterId::ContactDepartment => FieldRef::Text(&self.department_name),
            FilterId::ContactRole => FieldRef::Text(&self.role),
            FilterId::ContactActive => FieldRef::Flag(self.active_flag),
            _ => FieldRef::Missing,
        }
    }
}

impl Filterable for Activity {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.summary.as_str(), self.next_action.as_str(), self.owner.as_str()]
    }

    fn filter_field(&self, id: FilterId) -> FieldRef<'_> {
        match id {
            FilterId::ActivityType => FieldRef::Text(&self.activity_type),
            FilterId::ActivityDepartment => FieldRef::Text(&self.department_name),
            FilterId::ActivityApplication => FieldRef::Text(&self.app_name),
            FilterId::ActivityDateFrom | FilterId::ActivityDateTo => {
                FieldRef::Date(self.calendar_date())
            }
            _ => FieldRef::Missing,
        }
    }
}

impl Filterable for Incident {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str(), self.root_cause.as_str(), self.app_name.as_str()]
    }

    fn filter_field(&self, id: FilterId) -> FieldRef<'_> {
        match id {
            FilterId::IncidentSeverity => FieldRef::Text(&self.severity),
            FilterId::IncidentStatus => FieldRef::Text(&self.status),
            FilterId::IncidentApplication => FieldRef::Text(&self.app_name),
            _ => FieldRef::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChoice {
    pub value: String,
    pub label: String,
}

/// Current control values plus the distinct-value dropdowns rebuilt after
/// each full load. An empty or absent value means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    values: BTreeMap<FilterId, String>,
    distinct: BTreeMap<FilterId, Vec<String>>,
}

impl FilterState {
    pub fn value(&self, id: FilterId) -> &str {
        self.values.get(&id).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, id: FilterId, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&id);
        } else {
            self.values.insert(id, value);
        }
    }

    pub fn reset(&mut self, view: ViewKind) {
        for id in view.filter_controls() {
            self.values.remove(id);
        }
    }

    pub fn active_count(&self, view: ViewKind) -> usize {
        view.filter_controls()
            .iter()
            .filter(|id| !self.value(**id).is_empty())
            .count()
    }

    /// Regenerates every distinct-value dropdown from the snapshot. A prior
    /// selection survives only if the value is still present.
    pub fn rebuild_distinct(&mut self, snapshot: &DataSnapshot) {
        for view in ViewKind::ALL {
            for id in view.filter_controls() {
                let OptionSource::Distinct(source) = id.source() else {
                    continue;
                };
                let fresh = distinct_source_values(snapshot, source);
                let previous = self.value(*id).to_owned();
                if !previous.is_empty() && !fresh.contains(&previous) {
                    self.values.remove(id);
                }
                self.distinct.insert(*id, fresh);
            }
        }
    }

    /// Dropdown choices with the "All ..." entry always at index 0. Free
    /// text controls have no choices.
    pub fn choices(&self, id: FilterId, snapshot: &DataSnapshot) -> Vec<FilterChoice> {
        let rest: Vec<FilterChoice> = match id.source() {
            OptionSource::FreeText => return Vec::new(),
            OptionSource::Fixed(pairs) => pairs
                .iter()
                .map(|(value, label)| FilterChoice {
                    value: (*value).to_owned(),
                    label: (*label).to_owned(),
                })
                .collect(),
            OptionSource::Tags(field) => snapshot
                .tag_category(field.category())
                .map(|category| {
                    tag_options(&category.tags, &[])
                        .into_iter()
                        .map(|option| FilterChoice {
                            value: option.value,
                            label: option.label,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            OptionSource::Distinct(_) => self
                .distinct
                .get(&id)
                .into_iter()
                .flatten()
                .map(|value| FilterChoice {
                    value: value.clone(),
                    label: value.clone(),
                })
                .collect(),
        };

        let mut choices = Vec::with_capacity(rest.len() + 1);
        choices.push(FilterChoice {
            value: String::new(),
            label: id.all_label().to_owned(),
        });
        choices.extend(rest);
        choices
    }
}

fn distinct_source_values(snapshot: &DataSnapshot, source: DistinctSource) -> Vec<String> {
    match source {
        DistinctSource::OwnerTeams => distinct_values(
            snapshot
                .departments
                .iter()
                .map(|department| department.owner_team.as_str()),
        ),
        DistinctSource::Departments => distinct_values(
            snapshot
                .departments
                .iter()
                .map(|department| department.name.as_str()),
        ),
        DistinctSource::Applications => {
            distinct_values(snapshot.applications.iter().map(|app| app.app_name.as_str()))
        }
    }
}

/// Distinct non-empty values in first-seen order.
pub fn distinct_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() || !seen.insert(value) {
            continue;
        }
        out.push(value.to_owned());
    }
    out
}

/// Applies every active control of `view` as an AND-conjunction. Returns
/// borrowed rows in collection order; the collection is never touched.
pub fn apply_filters<'a, T: Filterable>(
    rows: &'a [T],
    view: ViewKind,
    state: &FilterState,
) -> Vec<&'a T> {
    let active = view
        .filter_controls()
        .iter()
        .filter_map(|id| {
            let value = state.value(*id).trim();
            (!value.is_empty()).then_some((*id, value))
        })
        .collect::<Vec<_>>();

    rows.iter()
        .filter(|row| active.iter().all(|(id, value)| matches_filter(*row, *id, value)))
        .collect()
}

fn matches_filter<T: Filterable>(row: &T, id: FilterId, value: &str) -> bool {
    match id.kind() {
        FilterKind::Search => {
            let needle = value.to_lowercase();
            row.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        }
        FilterKind::Exact => match row.filter_field(id) {
            // Dropdown options are trimmed, so the record side is too.
            FieldRef::Text(field) => field.trim() == value,
            FieldRef::Flag(flag) => flag == (value == "active"),
            FieldRef::Date(_) | FieldRef::Missing => true,
        },
        FilterKind::Contains => match row.filter_field(id) {
            FieldRef::Text(field) => field.contains(value),
            _ => true,
        },
        FilterKind::DateFrom | FilterKind::DateTo => {
            let Some(bound) = parse_calendar_date(value) else {
                return true;
            };
            match row.filter_field(id) {
                FieldRef::Date(Some(date)) => {
                    if id.kind() == FilterKind::DateFrom {
                        date >= bound
                    } else {
                        date <= bound
                    }
                }
                FieldRef::Date(None) => false,
                _ => true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterId, FilterState, apply_filters, distinct_values};
    use crate::{
        Activity, ActivityId, Application, ApplicationId, DataSnapshot, Department,
        DepartmentId, ViewKind,
    };

    fn department(id: i64, name: &str, tier: &str, owner_team: &str) -> Department {
        Department {
            department_id: DepartmentId::new(id),
            name: name.to_owned(),
            tier: tier.to_owned(),
            status: "active".to_owned(),
            owner_team: owner_team.to_owned(),
            ..Department::default()
        }
    }

    fn activity(id: i64, date: Option<&str>) -> Activity {
        Activity {
            activity_id: ActivityId::new(id),
            summary: format!("sync {id}"),
            date: date.map(str::to_owned),
            ..Activity::default()
        }
    }

    #[test]
    fn filters_combine_as_conjunction_and_keep_order() {
        let rows = vec![
            department(1, "Health Canada", "critical", "Alpha"),
            department(2, "Parks", "standard", "Beta"),
            department(3, "Health Research", "critical", "Beta"),
        ];
        let mut state = FilterState::default();
        state.set(FilterId::DepartmentSearch, "HEALTH");
        state.set(FilterId::DepartmentTier, "critical");

        let ids = apply_filters(&rows, ViewKind::Departments, &state)
            .into_iter()
            .map(|row| row.department_id.get())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn padded_value_matches_its_own_dropdown_option() {
        let rows = vec![
            department(1, "Health Canada", "critical", " Alpha "),
            department(2, "Parks", "standard", "Beta"),
        ];
        let options = distinct_values(rows.iter().map(|row| row.owner_team.as_str()));
        assert_eq!(options, vec!["Alpha".to_owned(), "Beta".to_owned()]);

        let mut state = FilterState::default();
        state.set(FilterId::DepartmentOwnerTeam, options[0].clone());
        let ids = apply_filters(&rows, ViewKind::Departments, &state)
            .into_iter()
            .map(|row| row.department_id.get())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn empty_filters_return_everything() {
        let rows = vec![department(1, "A", "", ""), department(2, "B", "", "")];
        let filtered = apply_filters(&rows, ViewKind::Departments, &FilterState::default());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn auth_type_filter_uses_containment() {
        let rows = vec![
            Application {
                app_id: ApplicationId::new(1),
                auth_type: "GC Key,Interact Sign In".to_owned(),
                ..Application::default()
            },
            Application {
                app_id: ApplicationId::new(2),
                auth_type: "GCCF Consolidator".to_owned(),
                ..Application::default()
            },
        ];
        let mut state = FilterState::default();
        state.set(FilterId::ApplicationAuthType, "Interact Sign In");
        let filtered = apply_filters(&rows, ViewKind::Applications, &state);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].app_id, ApplicationId::new(1));
    }

    #[test]
    fn date_range_is_inclusive_and_skips_undated_rows() {
        let rows = vec![
            activity(1, Some("2026-01-01")),
            activity(2, Some("2026-01-15")),
            activity(3, None),
            activity(4, Some("2026-02-01")),
        ];
        let mut state = FilterState::default();
        state.set(FilterId::ActivityDateFrom, "2026-01-01");
        state.set(FilterId::ActivityDateTo, "2026-01-15");
        let ids = apply_filters(&rows, ViewKind::Activities, &state)
            .into_iter()
            .map(|row| row.activity_id.get())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn unparsable_date_bound_is_ignored() {
        let rows = vec![activity(1, None), activity(2, Some("2026-01-15"))];
        let mut state = FilterState::default();
        state.set(FilterId::ActivityDateFrom, "2026-01");
        assert_eq!(apply_filters(&rows, ViewKind::Activities, &state).len(), 2);
    }

    #[test]
    fn reset_clears_only_that_views_controls() {
        let mut state = FilterState::default();
        state.set(FilterId::DepartmentTier, "critical");
        state.set(FilterId::IncidentSeverity, "high");
        state.reset(ViewKind::Departments);
        assert_eq!(state.value(FilterId::DepartmentTier), "");
        assert_eq!(state.value(FilterId::IncidentSeverity), "high");
        assert_eq!(state.active_count(ViewKind::Incidents), 1);
    }

    #[test]
    fn distinct_values_dedupe_in_first_seen_order() {
        assert_eq!(
            distinct_values(["Beta", "", "Alpha", "Beta", " "]),
            vec!["Beta".to_owned(), "Alpha".to_owned()]
        );
    }

    #[test]
    fn rebuild_keeps_surviving_selection_and_drops_vanished_one() {
        let mut snapshot = DataSnapshot {
            departments: vec![
                department(1, "Health", "critical", "Alpha"),
                department(2, "Parks", "standard", "Beta"),
            ],
            ..DataSnapshot::default()
        };
        let mut state = FilterState::default();
        state.rebuild_distinct(&snapshot);
        state.set(FilterId::DepartmentOwnerTeam, "Beta");
        state.set(FilterId::ApplicationDepartment, "Health");

        snapshot.departments.remove(0);
        state.rebuild_distinct(&snapshot);
        assert_eq!(state.value(FilterId::DepartmentOwnerTeam), "Beta");
        assert_eq!(state.value(FilterId::ApplicationDepartment), "");

        let choices = state.choices(FilterId::DepartmentOwnerTeam, &snapshot);
        assert_eq!(choices[0].label, "All Teams");
        assert_eq!(choices[0].value, "");
        assert_eq!(choices.len(), 2);
    }

    #[test]
    fn free_text_controls_have_no_choices() {
        let state = FilterState::default();
        assert!(
            state
                .choices(FilterId::ActivityDateFrom, &DataSnapshot::default())
                .is_empty()
        );
        assert_eq!(FilterId::ActivityDateFrom.as_str(), "activity-date-from");
    }
}
