// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use time::Date;
use time::macros::format_description;

use crate::ids::*;

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Truthiness the browser console used: `null` is inactive and numbers count
/// when non-zero.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(flag) => flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        serde_json::Value::String(text) => {
            matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
        }
        _ => false,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub department_id: DepartmentId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub acronym: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tier: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub owner_team: String,
    #[serde(default)]
    pub app_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub app_id: ApplicationId,
    pub department_id: DepartmentId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub app_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environment: String,
    /// Comma-joined on the wire, e.g. `GC Key,Interact Sign In`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub auth_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default)]
    pub go_live_date: Option<String>,
}

impl Application {
    pub fn auth_types(&self) -> Vec<String> {
        split_multi_value(&self.auth_type)
    }

    pub fn go_live(&self) -> Option<Date> {
        self.go_live_date.as_deref().and_then(parse_calendar_date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub integration_id: IntegrationId,
    pub app_id: ApplicationId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub app_name: String,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stage: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub risk_level: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: ContactId,
    pub department_id: DepartmentId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default = "default_true", deserialize_with = "lenient_flag")]
    pub active_flag: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: ActivityId,
    pub department_id: DepartmentId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_name: String,
    #[serde(default)]
    pub app_id: Option<ApplicationId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub app_name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub activity_type: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub next_action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub owner: String,
}

impl Activity {
    pub fn calendar_date(&self) -> Option<Date> {
        self.date.as_deref().and_then(parse_calendar_date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: IncidentId,
    pub app_id: ApplicationId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub app_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub root_cause: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

pub const INTEGRATION_STATUSES: [(&str, &str); 3] = [
    ("on_track", "On Track"),
    ("blocked", "Blocked"),
    ("delayed", "Delayed"),
];
pub const RISK_LEVELS: [(&str, &str); 3] = [("low", "Low"), ("medium", "Medium"), ("high", "High")];
pub const ACTIVE_FLAGS: [(&str, &str); 2] = [("active", "Active"), ("inactive", "Inactive")];
pub const INCIDENT_SEVERITIES: [(&str, &str); 4] = [
    ("low", "Low"),
    ("medium", "Medium"),
    ("high", "High"),
    ("critical", "Critical"),
];
pub const INCIDENT_STATUSES: [(&str, &str); 4] = [
    ("open", "Open"),
    ("investigating", "Investigating"),
    ("resolved", "Resolved"),
    ("closed", "Closed"),
];

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCounts {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub active: i64,
    #[serde(default)]
    pub critical: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCounts {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub live: i64,
    #[serde(default)]
    pub integrating: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    #[serde(default)]
    pub high_risk: i64,
    #[serde(default)]
    pub blocked: i64,
    #[serde(default)]
    pub delayed: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentCounts {
    #[serde(default)]
    pub open: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    #[serde(default)]
    pub recent_activities: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    #[serde(default)]
    pub departments: DepartmentCounts,
    #[serde(default)]
    pub applications: ApplicationCounts,
    #[serde(default)]
    pub risk: RiskCounts,
    #[serde(default)]
    pub incidents: IncidentCounts,
    #[serde(default)]
    pub engagement: Option<EngagementCounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValue {
    pub tag_id: TagId,
    #[serde(default)]
    pub category_id: TagCategoryId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub color: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategory {
    #[serde(default)]
    pub category_id: TagCategoryId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entity_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field_name: String,
    #[serde(default)]
    pub tag_count: Option<i64>,
    #[serde(default)]
    pub tags: Vec<TagValue>,
}

impl TagCategory {
    pub fn title(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Response body of `GET tags/{category}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategoryDetail {
    pub category: TagCategory,
    #[serde(default)]
    pub tags: Vec<TagValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Department,
    Application,
    Integration,
    Contact,
    Activity,
    Incident,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Department,
        Self::Application,
        Self::Integration,
        Self::Contact,
        Self::Activity,
        Self::Incident,
    ];

    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Department => "departments",
            Self::Application => "applications",
            Self::Integration => "integrations",
            Self::Contact => "contacts",
            Self::Activity => "activities",
            Self::Incident => "incidents",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Application => "application",
            Self::Integration => "integration",
            Self::Contact => "contact",
            Self::Activity => "activity",
            Self::Incident => "incident",
        }
    }

    /// Summary counts on the dashboard derive from these collections.
    pub const fn affects_dashboard(self) -> bool {
        matches!(
            self,
            Self::Department | Self::Application | Self::Integration | Self::Incident
        )
    }

    pub const fn supports_delete(self) -> bool {
        matches!(
            self,
            Self::Department | Self::Application | Self::Contact | Self::Activity
        )
    }

    pub const fn delete_prompt(self) -> &'static str {
        match self {
            Self::Department => {
                "Delete this department? Its applications, contacts and activities are deleted too."
            }
            Self::Application => "Delete this application?",
            Self::Contact => "Delete this contact?",
            Self::Activity => "Delete this activity?",
            Self::Integration | Self::Incident => "This record cannot be deleted.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Dashboard,
    Departments,
    Applications,
    Integrations,
    Contacts,
    Activities,
    Incidents,
    Tags,
}

impl ViewKind {
    pub const ALL: [Self; 8] = [
        Self::Dashboard,
        Self::Departments,
        Self::Applications,
        Self::Integrations,
        Self::Contacts,
        Self::Activities,
        Self::Incidents,
        Self::Tags,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Departments => "departments",
            Self::Applications => "applications",
            Self::Integrations => "integrations",
            Self::Contacts => "contacts",
            Self::Activities => "activities",
            Self::Incidents => "incidents",
            Self::Tags => "tags",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|view| view.label().eq_ignore_ascii_case(value.trim()))
    }

    pub const fn entity(self) -> Option<EntityKind> {
        match self {
            Self::Departments => Some(EntityKind::Department),
            Self::Applications => Some(EntityKind::Application),
            Self::Integrations => Some(EntityKind::Integration),
            Self::Contacts => Some(EntityKind::Contact),
            Self::Activities => Some(EntityKind::Activity),
            Self::Incidents => Some(EntityKind::Incident),
            Self::Dashboard | Self::Tags => None,
        }
    }
}

/// Splits a comma-joined multi-value field, trimming whitespace and dropping
/// empty parts.
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn join_multi_value(values: &[String]) -> String {
    values.join(",")
}

/// Reads the calendar date of a `YYYY-MM-DD` date or an ISO-8601 timestamp.
pub fn parse_calendar_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    let head = trimmed.get(..10)?;
    Date::parse(head, format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_calendar_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}
