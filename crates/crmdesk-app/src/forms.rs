// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::{Map, Value, json};
use time::Date;

use crate::{
    DataSnapshot, EntityKind, INCIDENT_SEVERITIES, INCIDENT_STATUSES, INTEGRATION_STATUSES,
    RISK_LEVELS, SelectOption, TagField, TagValue, format_calendar_date, parse_calendar_date,
    split_multi_value, tag_options,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Department,
    Application,
    Integration,
    Contact,
    Activity,
    IncidentReport,
    IncidentUpdate,
}

impl FormKind {
    pub const fn entity(self) -> EntityKind {
        match self {
            Self::Department => EntityKind::Department,
            Self::Application => EntityKind::Application,
            Self::Integration => EntityKind::Integration,
            Self::Contact => EntityKind::Contact,
            Self::Activity => EntityKind::Activity,
            Self::IncidentReport | Self::IncidentUpdate => EntityKind::Incident,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Application => "application",
            Self::Integration => "integration",
            Self::Contact => "contact",
            Self::Activity => "activity",
            Self::IncidentReport => "report incident",
            Self::IncidentUpdate => "update incident",
        }
    }

    /// Form used to add a record to `entity`, if the backend accepts creation.
    pub const fn create_for(entity: EntityKind) -> Option<Self> {
        match entity {
            EntityKind::Department => Some(Self::Department),
            EntityKind::Application => Some(Self::Application),
            EntityKind::Integration => None,
            EntityKind::Contact => Some(Self::Contact),
            EntityKind::Activity => Some(Self::Activity),
            EntityKind::Incident => Some(Self::IncidentReport),
        }
    }

    pub const fn edit_for(entity: EntityKind) -> Self {
        match entity {
            EntityKind::Department => Self::Department,
            EntityKind::Application => Self::Application,
            EntityKind::Integration => Self::Integration,
            EntityKind::Contact => Self::Contact,
            EntityKind::Activity => Self::Activity,
            EntityKind::Incident => Self::IncidentUpdate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTarget {
    Create,
    Update(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSpecKind {
    Text,
    TextArea,
    Date,
    Tag(TagField),
    Fixed(&'static [(&'static str, &'static str)]),
    Departments,
    Applications,
    Checkbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSpec {
    key: &'static str,
    label: &'static str,
    required: bool,
    edit_only: bool,
    kind: FieldSpecKind,
}

const fn field(key: &'static str, label: &'static str, kind: FieldSpecKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        required: false,
        edit_only: false,
        kind,
    }
}

const fn required(key: &'static str, label: &'static str, kind: FieldSpecKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        required: true,
        edit_only: false,
        kind,
    }
}

const DEPARTMENT_FIELDS: [FieldSpec; 5] = [
    required("name", "name", FieldSpecKind::Text),
    field("acronym", "acronym", FieldSpecKind::Text),
    field("tier", "tier", FieldSpecKind::Tag(TagField::DepartmentTier)),
    field("status", "status", FieldSpecKind::Tag(TagField::DepartmentStatus)),
    field(
        "owner_team",
        "owner team",
        FieldSpecKind::Tag(TagField::DepartmentOwnerTeam),
    ),
];

const APPLICATION_FIELDS: [FieldSpec; 6] = [
    required("department_id", "department", FieldSpecKind::Departments),
    required("app_name", "app name", FieldSpecKind::Text),
    field(
        "environment",
        "environment",
        FieldSpecKind::Tag(TagField::ApplicationEnvironment),
    ),
    field(
        "auth_type",
        "auth type",
        FieldSpecKind::Tag(TagField::ApplicationAuthType),
    ),
    field(
        "status",
        "status",
        FieldSpecKind::Tag(TagField::ApplicationStatus),
    ),
    field("go_live_date", "go-live date", FieldSpecKind::Date),
];

const INTEGRATION_FIELDS: [FieldSpec; 4] = [
    field("stage", "stage", FieldSpecKind::Tag(TagField::IntegrationStage)),
    field(
        "status",
        "status",
        FieldSpecKind::Fixed(&INTEGRATION_STATUSES),
    ),
    field("risk_level", "risk level", FieldSpecKind::Fixed(&RISK_LEVELS)),
    field("notes", "notes", FieldSpecKind::TextArea),
];

const CONTACT_FIELDS: [FieldSpec; 6] = [
    required("department_id", "department", FieldSpecKind::Departments),
    required("name", "name", FieldSpecKind::Text),
    field("role", "role", FieldSpecKind::Tag(TagField::ContactRole)),
    field("email", "email", FieldSpecKind::Text),
    field("phone", "phone", FieldSpecKind::Text),
    FieldSpec {
        key: "active_flag",
        label: "active",
        required: false,
        edit_only: true,
        kind: FieldSpecKind::Checkbox,
    },
];

const ACTIVITY_FIELDS: [FieldSpec; 7] = [
    required("department_id", "department", FieldSpecKind::Departments),
    field("app_id", "application", FieldSpecKind::Applications),
    required("type", "type", FieldSpecKind::Tag(TagField::ActivityType)),
    field("date", "date", FieldSpecKind::Date),
    required("summary", "summary", FieldSpecKind::TextArea),
    field("next_action", "next action", FieldSpecKind::Text),
    field("owner", "owner", FieldSpecKind::Text),
];

const INCIDENT_REPORT_FIELDS: [FieldSpec; 3] = [
    required("app_id", "application", FieldSpecKind::Applications),
    required(
        "severity",
        "severity",
        FieldSpecKind::Fixed(&INCIDENT_SEVERITIES),
    ),
    required("description", "description", FieldSpecKind::TextArea),
];

const INCIDENT_UPDATE_FIELDS: [FieldSpec; 4] = [
    field(
        "severity",
        "severity",
        FieldSpecKind::Fixed(&INCIDENT_SEVERITIES),
    ),
    field("status", "status", FieldSpecKind::Fixed(&INCIDENT_STATUSES)),
    field("description", "description", FieldSpecKind::TextArea),
    field("root_cause", "root cause", FieldSpecKind::TextArea),
];

fn field_specs(kind: FormKind) -> &'static [FieldSpec] {
    match kind {
        FormKind::Department => &DEPARTMENT_FIELDS,
        FormKind::Application => &APPLICATION_FIELDS,
        FormKind::Integration => &INTEGRATION_FIELDS,
        FormKind::Contact => &CONTACT_FIELDS,
        FormKind::Activity => &ACTIVITY_FIELDS,
        FormKind::IncidentReport => &INCIDENT_REPORT_FIELDS,
        FormKind::IncidentUpdate => &INCIDENT_UPDATE_FIELDS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    Text(String),
    TextArea(String),
    Date(String),
    Select {
        options: Vec<SelectOption>,
        selected: Option<usize>,
        numeric: bool,
    },
    /// `order` holds option indices in the order they were selected.
    MultiSelect {
        options: Vec<SelectOption>,
        order: Vec<usize>,
        cursor: usize,
    },
    Checkbox(bool),
}

impl FieldInput {
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) | Self::TextArea(value) | Self::Date(value) => value.clone(),
            Self::Select {
                options, selected, ..
            } => selected
                .and_then(|index| options.get(index))
                .map(|option| option.label.clone())
                .unwrap_or_else(|| "(none)".to_owned()),
            Self::MultiSelect { options, order, .. } => {
                if order.is_empty() {
                    return "(none)".to_owned();
                }
                order
                    .iter()
                    .filter_map(|index| options.get(*index))
                    .map(|option| option.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            Self::Checkbox(checked) => (if *checked { "[x]" } else { "[ ]" }).to_owned(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) | Self::TextArea(value) | Self::Date(value) => {
                value.trim().is_empty()
            }
            Self::Select {
                options, selected, ..
            } => selected
                .and_then(|index| options.get(index))
                .is_none_or(|option| option.value.is_empty()),
            Self::MultiSelect { order, .. } => order.is_empty(),
            Self::Checkbox(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub input: FieldInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub entity: EntityKind,
    pub target: FormTarget,
    pub payload: Value,
}

impl FormSubmission {
    pub fn endpoint(&self) -> String {
        match self.target {
            FormTarget::Create => self.entity.endpoint().to_owned(),
            FormTarget::Update(id) => format!("{}/{id}", self.entity.endpoint()),
        }
    }

    pub const fn affects_dashboard(&self) -> bool {
        self.entity.affects_dashboard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub kind: FormKind,
    pub target: FormTarget,
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl FormState {
    /// Builds a form for `kind`. `current` is the edited record (any
    /// serializable entity), `tags` supplies each enum-like field's category.
    pub fn open<R, F>(
        kind: FormKind,
        target: FormTarget,
        current: Option<&R>,
        snapshot: &DataSnapshot,
        today: Date,
        mut tags: F,
    ) -> Result<Self>
    where
        R: Serialize,
        F: FnMut(TagField) -> Vec<TagValue>,
    {
        let current = match current {
            Some(record) => match serde_json::to_value(record)? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        let editing = matches!(target, FormTarget::Update(_));

        let fields = field_specs(kind)
            .iter()
            .filter(|spec| editing || !spec.edit_only)
            .map(|spec| FormField {
                key: spec.key,
                label: spec.label,
                required: spec.required,
                input: initial_input(spec, current.get(spec.key), snapshot, today, editing, &mut tags),
            })
            .collect();

        Ok(Self {
            kind,
            target,
            fields,
            focus: 0,
        })
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|field| field.key == key)
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn type_char(&mut self, ch: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            match &mut field.input {
                FieldInput::Text(value) | FieldInput::TextArea(value) | FieldInput::Date(value) => {
                    value.push(ch)
                }
                FieldInput::Checkbox(checked) if ch == ' ' => *checked = !*checked,
                FieldInput::MultiSelect { order, cursor, .. } if ch == ' ' => {
                    toggle_order(order, *cursor)
                }
                _ => {}
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            match &mut field.input {
                FieldInput::Text(value) | FieldInput::TextArea(value) | FieldInput::Date(value) => {
                    value.pop();
                }
                FieldInput::Select { selected, .. } => *selected = None,
                _ => {}
            }
        }
    }

    /// Moves a single select's choice, or a multi select's cursor.
    pub fn cycle(&mut self, delta: isize) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match &mut field.input {
            FieldInput::Select {
                options, selected, ..
            } => {
                // Slot 0 is "(none)".
                let slots = options.len() as isize + 1;
                let current = selected.map_or(0, |index| index as isize + 1);
                let next = (current + delta).rem_euclid(slots);
                *selected = if next == 0 {
                    None
                } else {
                    Some(next as usize - 1)
                };
            }
            FieldInput::MultiSelect {
                options, cursor, ..
            } if !options.is_empty() => {
                let len = options.len() as isize;
                *cursor = (*cursor as isize + delta).rem_euclid(len) as usize;
            }
            FieldInput::Checkbox(checked) => *checked = !*checked,
            _ => {}
        }
    }

    /// Toggles the option at `index` of multi select `key`.
    pub fn toggle_option(&mut self, key: &str, index: usize) {
        if let Some(FormField {
            input: FieldInput::MultiSelect { options, order, .. },
            ..
        }) = self.field_mut(key)
            && index < options.len()
        {
            toggle_order(order, index);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            if field.required && field.input.is_blank() {
                bail!(
                    "{} is required -- fill in {} and retry",
                    field.label,
                    field.label
                );
            }
            if let FieldInput::Date(value) = &field.input
                && !value.trim().is_empty()
                && parse_calendar_date(value).is_none()
            {
                bail!(
                    "{} {:?} is not a date -- use YYYY-MM-DD",
                    field.label,
                    value.trim()
                );
            }
        }
        Ok(())
    }

    /// Plain key-value serialization. A multi select contributes only its
    /// last selected option, matching single-value form encoding.
    pub fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for field in &self.fields {
            let value = match &field.input {
                FieldInput::Text(value) | FieldInput::TextArea(value) => {
                    Some(json!(value.trim()))
                }
                FieldInput::Date(value) => {
                    let value = value.trim();
                    (!value.is_empty()).then(|| json!(value))
                }
                FieldInput::Select {
                    options,
                    selected,
                    numeric,
                } => selected
                    .and_then(|index| options.get(index))
                    .filter(|option| !option.value.is_empty())
                    .map(|option| select_value(&option.value, *numeric)),
                FieldInput::MultiSelect { options, order, .. } => order
                    .iter()
                    .copied()
                    .max()
                    .and_then(|index| options.get(index))
                    .map(|option| json!(option.value)),
                FieldInput::Checkbox(checked) => Some(json!(checked)),
            };
            if let Some(value) = value {
                map.insert(field.key.to_owned(), value);
            }
        }
        map
    }

    /// Final payload: generic serialization with each multi select replaced
    /// by its full ordered selection when at least one option is chosen.
    pub fn payload(&self) -> Value {
        let mut map = self.serialize_fields();
        for field in &self.fields {
            if let FieldInput::MultiSelect { options, order, .. } = &field.input {
                let selected = order
                    .iter()
                    .filter_map(|index| options.get(*index))
                    .map(|option| json!(option.value))
                    .collect::<Vec<_>>();
                if !selected.is_empty() {
                    map.insert(field.key.to_owned(), Value::Array(selected));
                }
            }
        }
        Value::Object(map)
    }

    pub fn submission(&self) -> Result<FormSubmission> {
        self.validate()?;
        Ok(FormSubmission {
            entity: self.kind.entity(),
            target: self.target,
            payload: self.payload(),
        })
    }
}

fn toggle_order(order: &mut Vec<usize>, index: usize) {
    if let Some(position) = order.iter().position(|selected| *selected == index) {
        order.remove(position);
    } else {
        order.push(index);
    }
}

fn select_value(value: &str, numeric: bool) -> Value {
    if numeric && let Ok(number) = value.parse::<i64>() {
        return json!(number);
    }
    json!(value)
}

fn current_strings(current: Option<&Value>) -> Vec<String> {
    match current {
        Some(Value::String(raw)) => split_multi_value(raw),
        Some(Value::Number(number)) => vec![number.to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}

fn current_text(current: Option<&Value>) -> String {
    match current {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn initial_input<F>(
    spec: &FieldSpec,
    current: Option<&Value>,
    snapshot: &DataSnapshot,
    today: Date,
    editing: bool,
    tags: &mut F,
) -> FieldInput
where
    F: FnMut(TagField) -> Vec<TagValue>,
{
    match spec.kind {
        FieldSpecKind::Text => FieldInput::Text(current_text(current)),
        FieldSpecKind::TextArea => FieldInput::TextArea(current_text(current)),
        FieldSpecKind::Date => {
            let date = current
                .and_then(Value::as_str)
                .and_then(parse_calendar_date)
                .map(format_calendar_date);
            let default = (!editing && spec.key == "date").then(|| format_calendar_date(today));
            FieldInput::Date(date.or(default).unwrap_or_default())
        }
        FieldSpecKind::Tag(tag_field) => {
            let values = if tag_field.is_multi_value() {
                current_strings(current)
            } else {
                let single = current_text(current);
                if single.is_empty() {
                    Vec::new()
                } else {
                    vec![single]
                }
            };
            let options = tag_options(&tags(tag_field), &values);
            if tag_field.is_multi_value() {
                let order = values
                    .iter()
                    .filter_map(|value| options.iter().position(|option| &option.value == value))
                    .collect();
                FieldInput::MultiSelect {
                    options,
                    order,
                    cursor: 0,
                }
            } else {
                single_select(options, false)
            }
        }
        FieldSpecKind::Fixed(pairs) => {
            let value = current_text(current);
            let options = pairs
                .iter()
                .map(|(option_value, label)| SelectOption {
                    value: (*option_value).to_owned(),
                    label: (*label).to_owned(),
                    selected: *option_value == value,
                })
                .collect();
            single_select(options, false)
        }
        FieldSpecKind::Departments => {
            let value = current_text(current);
            let options = snapshot
                .departments
                .iter()
                .map(|department| {
                    let id = department.department_id.to_string();
                    SelectOption {
                        selected: id == value,
                        value: id,
                        label: department.name.clone(),
                    }
                })
                .collect();
            single_select(options, true)
        }
        FieldSpecKind::Applications => {
            let value = current_text(current);
            let options = snapshot
                .applications
                .iter()
                .map(|app| {
                    let id = app.app_id.to_string();
                    SelectOption {
                        selected: id == value,
                        value: id,
                        label: if app.department_name.is_empty() {
                            app.app_name.clone()
                        } else {
                            format!("{} ({})", app.app_name, app.department_name)
                        },
                    }
                })
                .collect();
            single_select(options, true)
        }
        FieldSpecKind::Checkbox => {
            FieldInput::Checkbox(current.and_then(Value::as_bool).unwrap_or(true))
        }
    }
}

fn single_select(options: Vec<SelectOption>, numeric: bool) -> FieldInput {
    let selected = options.iter().position(|option| option.selected);
    FieldInput::Select {
        options,
        selected,
        numeric,
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldInput, FormKind, FormState, FormTarget};
    use crate::{
        Application, ApplicationId, DataSnapshot, Department, DepartmentId, EntityKind, TagField,
        TagId, TagValue,
    };
    use serde_json::json;
    use time::{Date, Month};

    fn today() -> Date {
        Date::from_calendar_date(2026, Month::March, 2).expect("valid date")
    }

    fn auth_tags(field: TagField) -> Vec<TagValue> {
        if field != TagField::ApplicationAuthType {
            return Vec::new();
        }
        ["GC Key", "Interact Sign In", "GCCF Consolidator"]
            .iter()
            .enumerate()
            .map(|(index, value)| TagValue {
                tag_id: TagId::new(index as i64 + 1),
                value: (*value).to_owned(),
                label: (*value).to_owned(),
                is_active: true,
                sort_order: index as i64 + 1,
                ..TagValue::default()
            })
            .collect()
    }

    fn snapshot() -> DataSnapshot {
        DataSnapshot {
            departments: vec![Department {
                department_id: DepartmentId::new(4),
                name: "Revenue".to_owned(),
                ..Department::default()
            }],
            ..DataSnapshot::default()
        }
    }

    fn blank_application_form() -> FormState {
        FormState::open::<Application, _>(
            FormKind::Application,
            FormTarget::Create,
            None,
            &snapshot(),
            today(),
            auth_tags,
        )
        .expect("form should open")
    }

    #[test]
    fn multi_select_payload_keeps_selection_order() {
        let mut form = blank_application_form();
        form.toggle_option("auth_type", 2);
        form.toggle_option("auth_type", 0);

        let generic = form.serialize_fields();
        assert_eq!(generic.get("auth_type"), Some(&json!("GCCF Consolidator")));

        let payload = form.payload();
        assert_eq!(
            payload["auth_type"],
            json!(["GCCF Consolidator", "GC Key"])
        );
    }

    #[test]
    fn empty_multi_select_is_absent_from_payload() {
        let form = blank_application_form();
        assert!(form.payload().get("auth_type").is_none());
    }

    #[test]
    fn editing_preselects_split_auth_types() {
        let app = Application {
            app_id: ApplicationId::new(8),
            department_id: DepartmentId::new(4),
            app_name: "Portal".to_owned(),
            auth_type: "Interact Sign In,GC Key".to_owned(),
            ..Application::default()
        };
        let form = FormState::open(
            FormKind::Application,
            FormTarget::Update(8),
            Some(&app),
            &snapshot(),
            today(),
            auth_tags,
        )
        .expect("form should open");

        let Some(FieldInput::MultiSelect { options, order, .. }) =
            form.field("auth_type").map(|field| &field.input)
        else {
            panic!("auth_type should be a multi select");
        };
        let selected = order
            .iter()
            .map(|index| options[*index].value.as_str())
            .collect::<Vec<_>>();
        assert_eq!(selected, vec!["Interact Sign In", "GC Key"]);
        assert_eq!(
            form.payload()["auth_type"],
            json!(["Interact Sign In", "GC Key"])
        );
        assert_eq!(form.payload()["department_id"], json!(4));
    }

    #[test]
    fn required_fields_block_submission() {
        let form = blank_application_form();
        let error = form.submission().expect_err("blank form should fail");
        assert!(error.to_string().contains("department is required"));
    }

    #[test]
    fn submission_targets_update_endpoint() {
        let mut form = blank_application_form();
        form.focus = 0;
        form.cycle(1);
        form.focus = 1;
        for ch in "Portal".chars() {
            form.type_char(ch);
        }
        let submission = form.submission().expect("valid form");
        assert_eq!(submission.endpoint(), "applications");
        assert_eq!(submission.payload["app_name"], json!("Portal"));
        assert!(submission.affects_dashboard());

        let update = super::FormSubmission {
            target: FormTarget::Update(12),
            ..submission
        };
        assert_eq!(update.endpoint(), "applications/12");
    }

    #[test]
    fn activity_create_defaults_to_today_and_omits_empty_application() {
        let form = FormState::open::<Application, _>(
            FormKind::Activity,
            FormTarget::Create,
            None,
            &snapshot(),
            today(),
            |_| Vec::new(),
        )
        .expect("form should open");
        let payload = form.payload();
        assert_eq!(payload["date"], json!("2026-03-02"));
        assert!(payload.get("app_id").is_none());
        assert_eq!(form.kind.entity(), EntityKind::Activity);
    }

    #[test]
    fn contact_active_flag_is_edit_only() {
        let create = FormState::open::<Application, _>(
            FormKind::Contact,
            FormTarget::Create,
            None,
            &snapshot(),
            today(),
            |_| Vec::new(),
        )
        .expect("form should open");
        assert!(create.field("active_flag").is_none());
    }

    #[test]
    fn bad_date_is_rejected_with_format_hint() {
        let mut form = blank_application_form();
        if let Some(field) = form.field_mut("go_live_date") {
            field.input = FieldInput::Date("March".to_owned());
        }
        form.focus = 0;
        form.cycle(1);
        form.focus = 1;
        form.type_char('x');
        let error = form.validate().expect_err("bad date should fail");
        assert!(error.to_string().contains("YYYY-MM-DD"));
    }
}
