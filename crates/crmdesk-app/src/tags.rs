// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

use crate::{TagCategory, TagValue};

pub const DEFAULT_TAG_COLOR: &str = "#3498DB";

/// Enum-like record fields whose values and colors come from tag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    DepartmentTier,
    DepartmentStatus,
    DepartmentOwnerTeam,
    ApplicationEnvironment,
    ApplicationAuthType,
    ApplicationStatus,
    IntegrationStage,
    ContactRole,
    ActivityType,
}

impl TagField {
    pub const ALL: [Self; 9] = [
        Self::DepartmentTier,
        Self::DepartmentStatus,
        Self::DepartmentOwnerTeam,
        Self::ApplicationEnvironment,
        Self::ApplicationAuthType,
        Self::ApplicationStatus,
        Self::IntegrationStage,
        Self::ContactRole,
        Self::ActivityType,
    ];

    pub const fn category(self) -> &'static str {
        match self {
            Self::DepartmentTier => "department_tier",
            Self::DepartmentStatus => "department_status",
            Self::DepartmentOwnerTeam => "department_owner_team",
            Self::ApplicationEnvironment => "application_environment",
            Self::ApplicationAuthType => "application_auth_type",
            Self::ApplicationStatus => "application_status",
            Self::IntegrationStage => "integration_stage",
            Self::ContactRole => "contact_role",
            Self::ActivityType => "activity_type",
        }
    }

    pub const fn is_multi_value(self) -> bool {
        matches!(self, Self::ApplicationAuthType)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStyle {
    pub color: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Badge {
    Tagged { label: String, color: String },
    Raw { value: String },
}

impl Badge {
    pub fn text(&self) -> &str {
        match self {
            Self::Tagged { label, .. } => label,
            Self::Raw { value } => value,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            Self::Tagged { color, .. } => Some(color),
            Self::Raw { .. } => None,
        }
    }
}

/// Flattened `"<category>_<value>"` lookup rebuilt on every full load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagColorMap {
    entries: HashMap<String, TagStyle>,
}

impl TagColorMap {
    pub fn from_categories(categories: &[TagCategory]) -> Self {
        let mut entries = HashMap::new();
        for category in categories {
            for tag in &category.tags {
                let category_name = if tag.category_name.is_empty() {
                    &category.name
                } else {
                    &tag.category_name
                };
                entries.insert(
                    Self::key(category_name, &tag.value),
                    TagStyle {
                        color: tag.color.clone(),
                        label: tag.label.clone(),
                    },
                );
            }
        }
        Self { entries }
    }

    pub fn key(category: &str, value: &str) -> String {
        format!("{category}_{value}")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, category: &str, value: &str) -> Option<&TagStyle> {
        self.entries.get(&Self::key(category, value))
    }

    pub fn badge(&self, field: TagField, value: &str) -> Badge {
        match self.lookup(field.category(), value) {
            Some(style) => Badge::Tagged {
                label: style.label.clone(),
                color: style.color.clone(),
            },
            None => Badge::Raw {
                value: value.to_owned(),
            },
        }
    }

    /// One badge per value of a comma-joined multi-value field.
    pub fn badges(&self, field: TagField, raw: &str) -> Vec<Badge> {
        crate::split_multi_value(raw)
            .iter()
            .map(|value| self.badge(field, value))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Builds form options from a category's tags: active only, ordered by
/// `sort_order`, with current values marked selected. A current value that
/// is no longer an active tag is kept as a trailing option.
pub fn tag_options(tags: &[TagValue], current: &[String]) -> Vec<SelectOption> {
    let mut active = tags.iter().filter(|tag| tag.is_active).collect::<Vec<_>>();
    active.sort_by_key(|tag| tag.sort_order);

    let mut options = active
        .into_iter()
        .map(|tag| SelectOption {
            value: tag.value.clone(),
            label: if tag.label.is_empty() {
                tag.value.clone()
            } else {
                tag.label.clone()
            },
            selected: current.iter().any(|value| value == &tag.value),
        })
        .collect::<Vec<_>>();

    for value in current {
        if value.is_empty() || options.iter().any(|option| &option.value == value) {
            continue;
        }
        options.push(SelectOption {
            value: value.clone(),
            label: value.clone(),
            selected: true,
        });
    }
    options
}

/// Categories grouped by owning entity type, in first-seen order.
pub fn group_by_entity_type(categories: &[TagCategory]) -> Vec<(String, Vec<&TagCategory>)> {
    let mut groups: Vec<(String, Vec<&TagCategory>)> = Vec::new();
    for category in categories {
        match groups
            .iter_mut()
            .find(|(entity_type, _)| *entity_type == category.entity_type)
        {
            Some((_, members)) => members.push(category),
            None => groups.push((category.entity_type.clone(), vec![category])),
        }
    }
    groups
}

pub fn entity_type_label(entity_type: &str) -> String {
    let mut chars = entity_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Other".to_owned(),
    }
}

pub fn sorted_tags(tags: &[TagValue]) -> Vec<&TagValue> {
    let mut sorted = tags.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|tag| tag.sort_order);
    sorted
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub label: String,
    pub value: String,
    pub color: String,
    pub sort_order: i64,
    pub is_active: bool,
}

impl Default for TagDraft {
    fn default() -> Self {
        Self {
            label: String::new(),
            value: String::new(),
            color: DEFAULT_TAG_COLOR.to_owned(),
            sort_order: 0,
            is_active: true,
        }
    }
}

impl TagDraft {
    pub fn from_tag(tag: &TagValue) -> Self {
        Self {
            label: tag.label.clone(),
            value: tag.value.clone(),
            color: tag.color.clone(),
            sort_order: tag.sort_order,
            is_active: tag.is_active,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("tag label is required -- enter a label and retry");
        }
        if self.value.trim().is_empty() {
            bail!("tag value is required -- enter the stored value and retry");
        }
        if parse_hex_color(&self.color).is_none() {
            bail!(
                "tag color {:?} is not a hex color -- use the #RRGGBB form, e.g. {}",
                self.color,
                DEFAULT_TAG_COLOR
            );
        }
        Ok(())
    }

    /// `is_active` is only sent on edit.
    pub fn to_payload(&self, include_active: bool) -> Value {
        let mut payload = Map::new();
        payload.insert("label".to_owned(), json!(self.label.trim()));
        payload.insert("value".to_owned(), json!(self.value.trim()));
        payload.insert("color".to_owned(), json!(self.color));
        payload.insert("sort_order".to_owned(), json!(self.sort_order));
        if include_active {
            payload.insert("is_active".to_owned(), json!(self.is_active));
        }
        Value::Object(payload)
    }
}

pub fn parse_hex_color(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let red = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let green = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let blue = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((red, green, blue))
}

#[cfg(test)]
mod tests {
    use super::{
        Badge, TagColorMap, TagDraft, TagField, group_by_entity_type, parse_hex_color,
        tag_options,
    };
    use crate::{TagCategory, TagId, TagValue};

    fn tag(id: i64, value: &str, sort_order: i64, is_active: bool) -> TagValue {
        TagValue {
            tag_id: TagId::new(id),
            category_name: "application_auth_type".to_owned(),
            value: value.to_owned(),
            label: value.to_uppercase(),
            color: "#27AE60".to_owned(),
            is_active,
            sort_order,
            ..TagValue::default()
        }
    }

    fn category(name: &str, entity_type: &str, tags: Vec<TagValue>) -> TagCategory {
        TagCategory {
            name: name.to_owned(),
            entity_type: entity_type.to_owned(),
            tags,
            ..TagCategory::default()
        }
    }

    #[test]
    fn empty_map_renders_raw_badges() {
        let map = TagColorMap::default();
        assert_eq!(
            map.badge(TagField::DepartmentTier, "critical"),
            Badge::Raw {
                value: "critical".to_owned()
            }
        );
        assert_eq!(map.badge(TagField::DepartmentTier, "").text(), "");
    }

    #[test]
    fn known_key_renders_tagged_badge() {
        let map = TagColorMap::from_categories(&[category(
            "application_auth_type",
            "application",
            vec![tag(1, "gckey", 1, true)],
        )]);
        let badge = map.badge(TagField::ApplicationAuthType, "gckey");
        assert_eq!(badge.text(), "GCKEY");
        assert_eq!(badge.color(), Some("#27AE60"));
        assert!(map.lookup("application_auth_type", "missing").is_none());
    }

    #[test]
    fn multi_value_field_yields_badge_per_value() {
        let map = TagColorMap::from_categories(&[category(
            "application_auth_type",
            "application",
            vec![tag(1, "a", 1, true)],
        )]);
        let badges = map.badges(TagField::ApplicationAuthType, "a, b");
        assert_eq!(badges.len(), 2);
        assert!(matches!(badges[0], Badge::Tagged { .. }));
        assert!(matches!(badges[1], Badge::Raw { .. }));
    }

    #[test]
    fn options_are_active_sorted_and_selected() {
        let tags = vec![
            tag(1, "c", 3, true),
            tag(2, "a", 1, true),
            tag(3, "hidden", 0, false),
            tag(4, "b", 2, true),
        ];
        let options = tag_options(&tags, &["b".to_owned(), "c".to_owned()]);
        let values = options
            .iter()
            .map(|option| option.value.as_str())
            .collect::<Vec<_>>();
        assert_eq!(values, vec!["a", "b", "c"]);
        let selected = options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.value.as_str())
            .collect::<Vec<_>>();
        assert_eq!(selected, vec!["b", "c"]);
    }

    #[test]
    fn retired_current_value_is_kept_as_trailing_option() {
        let tags = vec![tag(1, "a", 1, true), tag(2, "old", 2, false)];
        let options = tag_options(&tags, &["old".to_owned()]);
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].value, "old");
        assert!(options[1].selected);
    }

    #[test]
    fn categories_group_by_entity_type_in_first_seen_order() {
        let categories = vec![
            category("department_tier", "department", vec![]),
            category("application_status", "application", vec![]),
            category("department_status", "department", vec![]),
        ];
        let groups = group_by_entity_type(&categories);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "department");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "application");
    }

    #[test]
    fn tag_draft_validation_names_the_fix() {
        let draft = TagDraft {
            label: "Live".to_owned(),
            value: "live".to_owned(),
            color: "green".to_owned(),
            ..TagDraft::default()
        };
        let error = draft.validate().expect_err("bad color should fail");
        assert!(error.to_string().contains("#RRGGBB"));

        let payload = TagDraft {
            color: "#27AE60".to_owned(),
            ..draft
        }
        .to_payload(false);
        assert!(payload.get("is_active").is_none());
        assert_eq!(payload["sort_order"], 0);
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#26374A"), Some((0x26, 0x37, 0x4A)));
        assert_eq!(parse_hex_color("26374A"), None);
        assert_eq!(parse_hex_color("#XYZ123"), None);
    }
}
