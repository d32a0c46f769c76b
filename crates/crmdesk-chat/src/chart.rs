// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const PALETTE: [&str; 10] = [
    "#26374A", "#E8112D", "#27AE60", "#3498DB", "#F39C12", "#9B59B6", "#1ABC9C", "#E74C3C",
    "#2C3E50", "#95A5A6",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
    Doughnut,
    Radar,
    PolarArea,
    #[serde(other)]
    Other,
}

impl ChartKind {
    pub const fn is_circular(self) -> bool {
        matches!(self, Self::Pie | Self::Doughnut)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Doughnut => "doughnut",
            Self::Radar => "radar",
            Self::PolarArea => "polarArea",
            Self::Other => "chart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    One(String),
    Many(Vec<String>),
}

impl ColorSpec {
    /// Color for the data point at `index`. A single color applies to every
    /// point; a list cycles.
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            Self::One(color) => Some(color.as_str()),
            Self::Many(colors) if colors.is_empty() => None,
            Self::Many(colors) => Some(colors[index % colors.len()].as_str()),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Data points accept numbers and numeric strings; anything else is a gap.
fn lenient_points<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|point| match point {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
            _ => None,
        })
        .collect())
}

/// Chart block body as sent by the assistant.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type", default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datasets: Vec<DatasetSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSpec {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_points")]
    pub data: Vec<Option<f64>>,
    #[serde(default)]
    pub background_color: Option<ColorSpec>,
    #[serde(default)]
    pub border_color: Option<ColorSpec>,
    #[serde(default)]
    pub fill: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueAxis {
    pub begin_at_zero: bool,
    pub tick_precision: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub label: String,
    pub data: Vec<Option<f64>>,
    pub background: ColorSpec,
    pub border: Option<ColorSpec>,
    pub fill: Option<bool>,
}

/// Render-ready chart: defaults applied, axis and legend decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub labels: Vec<String>,
    pub datasets: Vec<DatasetConfig>,
    pub legend: Option<LegendPosition>,
    pub y_axis: Option<ValueAxis>,
}

impl ChartConfig {
    pub fn from_spec(spec: &ChartSpec) -> Self {
        let kind = spec.kind;
        let datasets = spec
            .datasets
            .iter()
            .enumerate()
            .map(|(series, dataset)| {
                let background = dataset.background_color.clone().unwrap_or_else(|| {
                    if kind.is_circular() {
                        ColorSpec::Many(
                            (0..dataset.data.len())
                                .map(|point| PALETTE[point % PALETTE.len()].to_owned())
                                .collect(),
                        )
                    } else {
                        ColorSpec::One(PALETTE[series % PALETTE.len()].to_owned())
                    }
                });
                let (border, fill) = match (&dataset.border_color, kind) {
                    (None, ChartKind::Line) => (Some(background.clone()), Some(false)),
                    (border, _) => (border.clone(), dataset.fill),
                };
                DatasetConfig {
                    label: dataset.label.clone().unwrap_or_default(),
                    data: dataset.data.clone(),
                    background,
                    border,
                    fill,
                }
            })
            .collect();

        Self {
            kind,
            title: spec.title.clone().filter(|title| !title.trim().is_empty()),
            labels: spec.labels.iter().map(label_text).collect(),
            datasets,
            legend: kind.is_circular().then_some(LegendPosition::Bottom),
            y_axis: (!kind.is_circular()).then_some(ValueAxis {
                begin_at_zero: true,
                tick_precision: 0,
            }),
        }
    }
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Stable address of a rendered chart: the transcript entry and the chart's
/// position among that entry's chart blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChartSlotId {
    pub message: usize,
    pub index: usize,
}

pub trait ChartHandle {
    fn dispose(&mut self);
}

pub trait ChartBackend {
    type Handle: ChartHandle;

    fn render(&mut self, slot: ChartSlotId, config: &ChartConfig) -> Result<Self::Handle>;
}

/// Owns every live chart handle. A slot holds at most one handle; the old
/// one is disposed before a replacement is rendered.
#[derive(Debug)]
pub struct ChartRegistry<H: ChartHandle> {
    handles: BTreeMap<ChartSlotId, H>,
}

impl<H: ChartHandle> Default for ChartRegistry<H> {
    fn default() -> Self {
        Self {
            handles: BTreeMap::new(),
        }
    }
}

impl<H: ChartHandle> ChartRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_into<B>(
        &mut self,
        backend: &mut B,
        slot: ChartSlotId,
        spec: &ChartSpec,
    ) -> Result<()>
    where
        B: ChartBackend<Handle = H>,
    {
        self.dispose(slot);
        let handle = backend.render(slot, &ChartConfig::from_spec(spec))?;
        self.handles.insert(slot, handle);
        Ok(())
    }

    pub fn dispose(&mut self, slot: ChartSlotId) -> bool {
        match self.handles.remove(&slot) {
            Some(mut handle) => {
                handle.dispose();
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, mut handle) in std::mem::take(&mut self.handles) {
            handle.dispose();
        }
        count
    }

    pub fn get(&self, slot: ChartSlotId) -> Option<&H> {
        self.handles.get(&slot)
    }

    pub fn contains(&self, slot: ChartSlotId) -> bool {
        self.handles.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
