//! Chart payloads and the chart viewer's regenerate flow.
//!
//! The backend returns chart data in a Chart.js-like shape (`labels` plus
//! `datasets`). Rendering wants one record per label instead, so the viewer
//! converts with [`to_records`] before drawing.

use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::input::TextInput;
use crate::notify::Notifier;
use crate::state::ChatResponse;

const REGENERATE_FALLBACK: &str = "Please try again with a different prompt.";

/// Brand purple, then lighter/darker variants for additional series
pub const FALLBACK_PALETTE: [(u8, u8, u8); 5] = [
    (126, 105, 171),
    (155, 135, 245),
    (214, 188, 250),
    (110, 89, 165),
    (229, 222, 255),
];

/// A chart attached to an assistant reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawChart", into = "RawChart")]
pub enum ChartPayload {
    /// Remote image reference, opaque to the client
    Image(String),
    Series(SeriesChart),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
        }
    }

    /// Anything other than `bar` draws as a line chart; no type means bar.
    fn from_wire(kind: Option<&str>) -> Self {
        match kind {
            None | Some("bar") => ChartKind::Bar,
            Some(_) => ChartKind::Line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesChart {
    pub kind: ChartKind,
    pub data: ChartData,
}

impl SeriesChart {
    pub fn is_empty(&self) -> bool {
        self.data.labels.is_empty() || self.data.datasets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
}

// Wire shape: either a bare URL string or an object with optional url/type/data.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawChart {
    Url(String),
    Object(RawChartObject),
}

#[derive(Serialize, Deserialize)]
struct RawChartObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<ChartData>,
}

impl From<RawChart> for ChartPayload {
    fn from(raw: RawChart) -> Self {
        match raw {
            RawChart::Url(url) => ChartPayload::Image(url),
            RawChart::Object(obj) => match (obj.data, obj.url) {
                (Some(data), _) => ChartPayload::Series(SeriesChart {
                    kind: ChartKind::from_wire(obj.kind.as_deref()),
                    data,
                }),
                (None, Some(url)) => ChartPayload::Image(url),
                (None, None) => ChartPayload::Series(SeriesChart {
                    kind: ChartKind::from_wire(obj.kind.as_deref()),
                    data: ChartData::default(),
                }),
            },
        }
    }
}

impl From<ChartPayload> for RawChart {
    fn from(payload: ChartPayload) -> Self {
        match payload {
            ChartPayload::Image(url) => RawChart::Url(url),
            ChartPayload::Series(series) => RawChart::Object(RawChartObject {
                url: None,
                kind: Some(series.kind.as_str().to_string()),
                data: Some(series.data),
            }),
        }
    }
}

/// One row of the record-shaped chart data: the label plus a value per series
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRecord {
    pub name: String,
    pub fields: Vec<(String, Option<f64>)>,
}

impl ChartRecord {
    pub fn value(&self, key: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| *v)
    }
}

/// Series key for a dataset: its label, or `Dataset <index>` when unlabeled
pub fn dataset_key(dataset: &Dataset, index: usize) -> String {
    match dataset.label.as_deref() {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => format!("Dataset {}", index),
    }
}

/// Convert label/dataset columns into one record per label.
pub fn to_records(data: &ChartData) -> Vec<ChartRecord> {
    data.labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mut fields: Vec<(String, Option<f64>)> = Vec::with_capacity(data.datasets.len());
            for (ds_idx, dataset) in data.datasets.iter().enumerate() {
                let key = dataset_key(dataset, ds_idx);
                let value = dataset.data.get(i).copied();
                // Two datasets sharing a label collapse into one field, last wins
                if let Some(slot) = fields.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    fields.push((key, value));
                }
            }
            ChartRecord {
                name: label.clone(),
                fields,
            }
        })
        .collect()
}

/// Parse `#rgb`, `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)`. Alpha is dropped.
pub fn parse_css_color(color: &str) -> Option<(u8, u8, u8)> {
    let color = color.trim();

    if let Some(hex) = color.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        return match hex.len() {
            3 => {
                let mut channels = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some((channels.next()??, channels.next()??, channels.next()??))
            }
            6 => Some((
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            _ => None,
        };
    }

    let inner = color
        .strip_prefix("rgba(")
        .or_else(|| color.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<f64>().ok());
    let r = parts.next()??;
    let g = parts.next()??;
    let b = parts.next()??;
    let clamp = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    Some((clamp(r), clamp(g), clamp(b)))
}

/// Colour for a series. Line charts prefer the border colour.
pub fn dataset_color(dataset: &Dataset, index: usize, kind: ChartKind) -> (u8, u8, u8) {
    let declared = match kind {
        ChartKind::Bar => dataset.background_color.as_deref(),
        ChartKind::Line => dataset
            .border_color
            .as_deref()
            .or(dataset.background_color.as_deref()),
    };
    declared
        .and_then(parse_css_color)
        .unwrap_or(FALLBACK_PALETTE[index % FALLBACK_PALETTE.len()])
}

/// Cross-component update emitted by the viewer
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    /// Display this payload in place of the current chart
    Regenerated(ChartPayload),
}

/// Local state of the chart viewer: the regenerate prompt and in-flight flag.
/// The payload itself is owned by the chat window.
#[derive(Debug, Default)]
pub struct ChartViewer {
    pub prompt: TextInput,
    regenerating: bool,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_regenerating(&self) -> bool {
        self.regenerating
    }

    /// Validate the prompt and enter the regenerating state.
    /// Returns the prompt to send, or `None` if nothing should be sent.
    pub fn begin_regenerate(&mut self, notifier: &mut Notifier) -> Option<String> {
        if self.regenerating {
            return None;
        }
        let prompt = self.prompt.value().to_string();
        if prompt.is_empty() {
            notifier.warning("Please enter a prompt for chart regeneration", None);
            return None;
        }
        self.regenerating = true;
        tracing::debug!(%prompt, "regenerating chart");
        Some(prompt)
    }

    pub fn finish_regenerate(
        &mut self,
        result: Result<ChatResponse, ApiError>,
        notifier: &mut Notifier,
    ) -> Option<ChartEvent> {
        self.regenerating = false;
        match result {
            Ok(response) => {
                let payload = response.chart_data?;
                notifier.success("Chart regenerated successfully", None);
                Some(ChartEvent::Regenerated(payload))
            }
            Err(e) => {
                tracing::error!(error = %e, "chart regeneration failed");
                notifier.error(
                    "Failed to regenerate chart",
                    Some(e.user_message(REGENERATE_FALLBACK)),
                );
                None
            }
        }
    }
}
