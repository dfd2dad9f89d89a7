//! # Digest aggregate
//! Typed view over the `{date, generated_at, sections}` object that the
//! assembler produces and the validator consumes.
//!
//! Section payloads stay semi-structured ([`Payload`]) because each provider
//! emits its own shape. Conversion from raw JSON never fails for malformed
//! *sections*: odd values are kept so the validator can report them. Only a
//! top-level value that is not an object is rejected.

use anyhow::{bail, Context, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Section payload as seen by the content check.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
    Text(String),
    /// Numbers, booleans and null. Accepted as-is.
    Other(Value),
}

impl Payload {
    pub fn from_value(v: Value) -> Self {
        match v {
            Value::Object(m) => Payload::Mapping(m),
            Value::Array(a) => Payload::Sequence(a),
            Value::String(s) => Payload::Text(s),
            other => Payload::Other(other),
        }
    }

    /// Empty container, empty string, null, `false` or zero.
    pub fn is_blank(&self) -> bool {
        match self {
            Payload::Mapping(m) => m.is_empty(),
            Payload::Sequence(a) => a.is_empty(),
            Payload::Text(s) => s.is_empty(),
            Payload::Other(Value::Null) => true,
            Payload::Other(Value::Bool(b)) => !b,
            Payload::Other(Value::Number(n)) => n.as_f64() == Some(0.0),
            Payload::Other(_) => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Payload::Mapping(m) => Value::Object(m.clone()),
            Payload::Sequence(a) => Value::Array(a.clone()),
            Payload::Text(s) => Value::String(s.clone()),
            Payload::Other(v) => v.clone(),
        }
    }

    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Mapping(m) => Some(m),
            _ => None,
        }
    }
}

/// One topical slice of the digest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: Option<String>,
    pub data: Option<Payload>,
    /// Legacy payload key; wins over `data` when non-blank.
    pub content: Option<Payload>,
    pub timestamp: Option<String>,
    pub source: Option<String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(Payload::from_value(data));
        self
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(Payload::from_value(content));
        self
    }

    pub fn with_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Name used in error messages; unnamed sections read as "unknown".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    /// Lower-cased name used for lookups; unnamed sections are "".
    pub fn key(&self) -> String {
        self.name.as_deref().unwrap_or_default().to_lowercase()
    }

    /// Payload the content check looks at: `content` when non-blank, else `data`,
    /// else a blank `content`.
    pub fn resolved_payload(&self) -> Option<&Payload> {
        match (&self.content, &self.data) {
            (Some(c), _) if !c.is_blank() => Some(c),
            (_, Some(d)) => Some(d),
            (Some(c), None) => Some(c),
            (None, None) => None,
        }
    }

    /// Non-object entries turn into an empty section so every check reports them.
    pub fn from_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self::default();
        };
        Self {
            name: obj.get("name").and_then(scalar_text),
            data: obj.get("data").cloned().map(Payload::from_value),
            content: obj.get("content").cloned().map(Payload::from_value),
            timestamp: obj.get("timestamp").and_then(present_text),
            source: obj.get("source").and_then(present_text),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut m = Map::new();
        if let Some(n) = &self.name {
            m.insert("name".into(), Value::String(n.clone()));
        }
        if let Some(d) = &self.data {
            m.insert("data".into(), d.to_value());
        }
        if let Some(c) = &self.content {
            m.insert("content".into(), c.to_value());
        }
        if let Some(t) = &self.timestamp {
            m.insert("timestamp".into(), Value::String(t.clone()));
        }
        if let Some(s) = &self.source {
            m.insert("source".into(), Value::String(s.clone()));
        }
        Value::Object(m)
    }
}

/// State of the top-level `sections` key.
#[derive(Debug, Clone, PartialEq)]
pub enum Sections {
    Missing,
    /// Present but not an array; carries the JSON type name.
    NotAList(&'static str),
    List(Vec<Section>),
}

/// The full digest object: metadata plus sections.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestAggregate {
    pub date: Option<String>,
    pub generated_at: Option<String>,
    pub sections: Sections,
    /// Unknown top-level keys, preserved for the JSON artifact.
    pub extra: Map<String, Value>,
}

impl DigestAggregate {
    pub fn new(
        date: impl Into<String>,
        generated_at: impl Into<String>,
        sections: Vec<Section>,
    ) -> Self {
        Self {
            date: Some(date.into()),
            generated_at: Some(generated_at.into()),
            sections: Sections::List(sections),
            extra: Map::new(),
        }
    }

    /// Fails only when `value` is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = json_type_name(&value);
        let Value::Object(mut obj) = value else {
            bail!("digest must be a JSON object, got {kind}");
        };
        let date = obj.remove("date").as_ref().and_then(scalar_text);
        let generated_at = obj.remove("generated_at").as_ref().and_then(scalar_text);
        let sections = match obj.remove("sections") {
            None => Sections::Missing,
            Some(Value::Array(items)) => {
                Sections::List(items.iter().map(Section::from_value).collect())
            }
            Some(other) => Sections::NotAList(json_type_name(&other)),
        };
        Ok(Self {
            date,
            generated_at,
            sections,
            extra: obj,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let v: Value = serde_json::from_str(s).context("parsing digest json")?;
        Self::from_value(v)
    }

    pub fn sections(&self) -> &[Section] {
        match &self.sections {
            Sections::List(v) => v,
            _ => &[],
        }
    }

    /// First section whose name matches case-insensitively.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections()
            .iter()
            .find(|s| s.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn to_value(&self) -> Value {
        let mut m = self.extra.clone();
        if let Some(d) = &self.date {
            m.insert("date".into(), Value::String(d.clone()));
        }
        if let Some(g) = &self.generated_at {
            m.insert("generated_at".into(), Value::String(g.clone()));
        }
        if let Sections::List(v) = &self.sections {
            m.insert(
                "sections".into(),
                Value::Array(v.iter().map(Section::to_value).collect()),
            );
        }
        Value::Object(m)
    }
}

impl Serialize for DigestAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Like [`scalar_text`], but falsy values (`false`, zero, empty string or
/// container) count as absent.
fn present_text(v: &Value) -> Option<String> {
    if Payload::from_value(v.clone()).is_blank() {
        return None;
    }
    scalar_text(v)
}

/// Strings as-is, other scalars rendered as JSON text, null as absent.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
