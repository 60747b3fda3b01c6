//! Agent Engine event decoding
//!
//! Events streamed back by the Agent Engine do not share one schema. Text
//! can sit directly on the event, on the first of its `parts`, or under
//! `content.parts`. Every event is decoded once, here, into [`AgentEvent`]
//! so nothing downstream has to probe JSON shapes.

use serde_json::Value;

/// Where the text of an event was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShape {
    /// `{"text": ...}`
    Direct,
    /// `{"parts": [{"text": ...}]}`
    Parts,
    /// `{"content": {"parts": [{"text": ...}]}}`
    ContentParts,
}

/// One decoded unit of agent output
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The event carried text
    Text { text: String, shape: TextShape },
    /// No known shape matched; the raw payload is kept for diagnostics
    Unknown { raw: Value },
}

impl AgentEvent {
    /// Decode a raw event.
    ///
    /// Shapes are tried in a fixed order and the first one holding a
    /// non-empty string wins.
    pub fn from_value(raw: Value) -> Self {
        let found = direct_text(&raw)
            .map(|text| (text, TextShape::Direct))
            .or_else(|| first_part_text(raw.get("parts")).map(|text| (text, TextShape::Parts)))
            .or_else(|| {
                raw.get("content")
                    .and_then(|content| first_part_text(content.get("parts")))
                    .map(|text| (text, TextShape::ContentParts))
            })
            .map(|(text, shape)| (text.to_string(), shape));

        match found {
            Some((text, shape)) => AgentEvent::Text { text, shape },
            None => AgentEvent::Unknown { raw },
        }
    }

    /// Decode one line of a streamed response body.
    ///
    /// Accepts bare JSON or an SSE `data:` line. Returns `None` for blank
    /// lines and SSE comments. Lines that are not JSON become
    /// [`AgentEvent::Unknown`] string events.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return None;
        }

        let data = match line.strip_prefix("data:") {
            Some(rest) => rest.trim_start(),
            None => line,
        };
        if data.is_empty() {
            return None;
        }

        let raw = serde_json::from_str::<Value>(data)
            .unwrap_or_else(|_| Value::String(data.to_string()));
        Some(Self::from_value(raw))
    }

    /// Extracted text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            AgentEvent::Text { text, .. } => Some(text),
            AgentEvent::Unknown { .. } => None,
        }
    }

    /// Printable form of an event without text
    pub fn raw_string(&self) -> String {
        match self {
            AgentEvent::Text { text, .. } => text.clone(),
            AgentEvent::Unknown { raw: Value::String(s) } => s.clone(),
            AgentEvent::Unknown { raw } => raw.to_string(),
        }
    }
}

impl From<Value> for AgentEvent {
    fn from(raw: Value) -> Self {
        Self::from_value(raw)
    }
}

fn direct_text(raw: &Value) -> Option<&str> {
    raw.get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn first_part_text(parts: Option<&Value>) -> Option<&str> {
    parts
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}
