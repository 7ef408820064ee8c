//! Message model and wire types for the conversation engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One result row: column name to scalar value.
pub type Row = Map<String, Value>;

// =============================================================================
// Message
// =============================================================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single entry of the conversation history.
///
/// Messages are only created by [`crate::ConversationStore`] and are handed
/// out by shared reference, so they never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Query payload, present on assistant messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<QueryResponse>,
}

impl Message {
    pub(crate) fn user(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text,
            created_at: Utc::now(),
            response: None,
        }
    }

    pub(crate) fn assistant(response: QueryResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: response.headline(),
            created_at: Utc::now(),
            response: Some(response),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

// =============================================================================
// QueryResponse
// =============================================================================

/// Answer to one natural-language query, as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    /// Generated SQL.
    pub sql: String,
    pub row_count: u64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(rename = "data")]
    pub rows: Vec<Row>,
    pub visualization: VisualizationSpec,
    pub suggested_questions: Vec<String>,
}

impl QueryResponse {
    /// Summary line used as the assistant message text.
    pub fn headline(&self) -> String {
        if self.row_count == 1 {
            "Query returned 1 row.".to_string()
        } else {
            format!("Query returned {} rows.", self.row_count)
        }
    }

    /// Confidence as a whole percentage.
    pub fn confidence_percent(&self) -> u32 {
        (clamp_confidence(self.confidence) * 100.0).round() as u32
    }

    /// Row count and confidence, e.g. `12 rows • 87% confidence`.
    pub fn caption(&self) -> String {
        format!(
            "{} rows \u{2022} {}% confidence",
            self.row_count,
            self.confidence_percent()
        )
    }

    /// Decode a response body leniently.
    ///
    /// Only a non-object body is rejected. Missing, null or mistyped fields
    /// fall back to their defaults: `sql` to empty, `row_count` to the number
    /// of rows, `confidence` to zero. Non-object rows and non-string
    /// suggestions are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let rows: Vec<Row> = ["data", "rows"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array))
            .map(|entries| entries.iter().filter_map(|e| e.as_object().cloned()).collect())
            .unwrap_or_default();
        let row_count = obj
            .get("row_count")
            .and_then(count_value)
            .unwrap_or(rows.len() as u64);
        let confidence = obj.get("confidence").and_then(number_value).unwrap_or(0.0);
        let suggested_questions = obj
            .get("suggested_questions")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            sql: obj
                .get("sql")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            row_count,
            confidence: clamp_confidence(confidence),
            rows,
            visualization: obj
                .get("visualization")
                .map(VisualizationSpec::from_value)
                .unwrap_or_default(),
            suggested_questions,
        })
    }
}

impl<'de> Deserialize<'de> for QueryResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a JSON object"))
    }
}

/// A non-negative whole number, given as an integer or an integral float.
fn count_value(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// A number, or a string holding one.
fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// =============================================================================
// VisualizationSpec
// =============================================================================

/// Chart family selected by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    /// No chart; also stands in for any unrecognized kind.
    #[default]
    None,
}

impl ChartKind {
    /// Parse a wire value. Unknown values map to [`ChartKind::None`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "pie" => ChartKind::Pie,
            "none" | "" => ChartKind::None,
            other => {
                tracing::debug!(kind = %other, "Unrecognized chart kind, rendering as table");
                ChartKind::None
            }
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::None => "none",
        };
        f.write_str(name)
    }
}

/// One line of a multi-series line chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSpec {
    pub field: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SeriesSpec {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let field = non_empty_str(obj.get("field"))?;
        let label = non_empty_str(obj.get("label")).unwrap_or_else(|| field.clone());
        let color = non_empty_str(obj.get("color"));
        Some(Self {
            field,
            label,
            color,
        })
    }
}

/// Server-supplied chart descriptor.
///
/// Decoding never fails: anything that is not an object is kind `none`,
/// fields of the wrong type are dropped, and unknown kinds become `none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualizationSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "x_axis", skip_serializing_if = "Option::is_none")]
    pub x_field: Option<String>,
    #[serde(rename = "y_axis", skip_serializing_if = "Option::is_none")]
    pub y_field: Option<String>,
    #[serde(rename = "lines", skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<SeriesSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
}

impl VisualizationSpec {
    /// A descriptor of the given kind with no field bindings.
    pub fn of_kind(kind: ChartKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Decode a descriptor from arbitrary JSON.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let text = |keys: &[&str]| non_empty_str(keys.iter().find_map(|k| obj.get(*k)));

        let kind = text(&["type", "kind"])
            .map(|k| ChartKind::parse(&k))
            .unwrap_or_default();
        let series = ["lines", "series"]
            .iter()
            .find_map(|k| obj.get(*k))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(SeriesSpec::from_value).collect())
            .unwrap_or_default();

        Self {
            kind,
            title: text(&["title"]),
            x_field: text(&["x_axis", "xField", "x_field"]),
            y_field: text(&["y_axis", "yField", "y_field"]),
            series,
            label_field: text(&["label_field", "labelField"]),
            value_field: text(&["value_field", "valueField"]),
        }
    }
}

impl<'de> Deserialize<'de> for VisualizationSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Conversation lifecycle
// =============================================================================

/// Request lifecycle of the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Read-only copy of the conversation for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
