//! Interaction event model as published by the tracking service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

/// Event type tag. Unknown tags are kept verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Pageview,
    Click,
    FormSubmit,
    HeatmapClick,
    Custom(String),
}

impl std::str::FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pageview" => EventType::Pageview,
            "click" => EventType::Click,
            "form_submit" => EventType::FormSubmit,
            "heatmap_click" => EventType::HeatmapClick,
            other => EventType::Custom(other.to_string()),
        })
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Custom(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Pageview => "pageview",
            EventType::Click => "click",
            EventType::FormSubmit => "form_submit",
            EventType::HeatmapClick => "heatmap_click",
            EventType::Custom(s) => s,
        }
    }

    /// Pointer-driven types that carry an element and usually a position
    pub fn is_click_like(&self) -> bool {
        matches!(self, EventType::Click | EventType::HeatmapClick)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element descriptor attached to interaction events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
}

/// Pointer position for click-like events
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<f64>,
}

/// A single interaction event. Read-only to the feed engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub event_type: EventType,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl Event {
    pub fn new(event_type: EventType, timestamp: i64) -> Self {
        Self {
            event_id: None,
            event_type,
            timestamp,
            target: None,
            metadata: None,
            position: None,
            url: None,
            title: None,
            referrer: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.event_id = Some(id.to_string());
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.get_or_insert_with(Map::new).insert(key.to_string(), value);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y, ..Default::default() });
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Page path: `metadata.path`, then the url without its query, then `/`
    pub fn page_path(&self) -> &str {
        if let Some(path) = self.metadata_str("path") {
            return path;
        }
        self.url
            .as_deref()
            .and_then(|url| url.split('?').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("/")
    }

    /// Element tag with optional ` [category]` suffix
    pub fn element_label(&self) -> String {
        let target = self.target.as_ref();
        let tag = target
            .and_then(|t| t.tag_name.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("element");
        match target.and_then(|t| t.category.as_deref()).filter(|s| !s.is_empty()) {
            Some(category) => format!("{tag} [{category}]"),
            None => tag.to_string(),
        }
    }

    /// Form name: `metadata.formName`, then `target.formId`, then `unnamed form`
    pub fn form_name(&self) -> &str {
        self.metadata_str("formName")
            .or_else(|| {
                self.target.as_ref().and_then(|t| t.form_id.as_deref()).filter(|s| !s.is_empty())
            })
            .unwrap_or("unnamed form")
    }

    /// Number of submitted fields, if the producer recorded them
    pub fn field_count(&self) -> Option<usize> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("fields"))
            .and_then(Value::as_array)
            .map(Vec::len)
    }

    pub fn target_label(&self) -> Option<&str> {
        self.target.as_ref().and_then(|t| t.label.as_deref()).filter(|s| !s.is_empty())
    }
}

/// Opaque browsing-session identifier owned by the tracking service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// New time-sortable session id (UUIDv7)
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// First `n` characters, for display
    pub fn short(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
