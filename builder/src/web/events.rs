//! GitHub event labels and the payloads decoded for them.
//!
//! Only the fields the builder acts on are decoded; everything else in the
//! GitHub payload is ignored.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};

/// Event label resolved from the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Sent once when the webhook is created.
    Ping,
    Push,
    Release,
    /// Any label the builder is not subscribed to (including a missing header).
    Unknown(String),
}

impl EventKind {
    pub fn from_header(label: &str) -> Self {
        match label {
            "ping" => EventKind::Ping,
            "push" => EventKind::Push,
            "release" => EventKind::Release,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Ping => "ping",
            EventKind::Push => "push",
            EventKind::Release => "release",
            EventKind::Unknown(label) => label,
        }
    }
}

// =============================================================================
// Push
// =============================================================================

/// Payload of a `push` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Full ref that was pushed, e.g. `refs/heads/main` or `refs/tags/v1.0.0`.
    #[serde(rename = "ref")]
    pub git_ref: String,
}

// =============================================================================
// Release
// =============================================================================

/// Payload of a `release` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    /// What happened to the release (`published`, `created`, `deleted`, ...).
    pub action: String,
    pub release: Release,
}

/// Release descriptor nested in a `release` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: ReleaseName,
}

/// Release title as sent by GitHub.
///
/// The title is optional and GitHub does not constrain it to a string, so
/// every scalar shape is kept. Objects and arrays are rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReleaseName {
    /// Missing or `null`.
    #[default]
    Absent,
    Text(String),
    Bool(bool),
    Number(Number),
}

impl ReleaseName {
    /// The title as text, if it was sent as a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReleaseName::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ReleaseName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(ReleaseName::Absent),
            Value::String(s) => Ok(ReleaseName::Text(s)),
            Value::Bool(b) => Ok(ReleaseName::Bool(b)),
            Value::Number(n) => Ok(ReleaseName::Number(n)),
            Value::Array(_) => Err(de::Error::invalid_type(
                de::Unexpected::Seq,
                &"a string, number, boolean or null",
            )),
            Value::Object(_) => Err(de::Error::invalid_type(
                de::Unexpected::Map,
                &"a string, number, boolean or null",
            )),
        }
    }
}

impl Serialize for ReleaseName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReleaseName::Absent => serializer.serialize_none(),
            ReleaseName::Text(s) => serializer.serialize_str(s),
            ReleaseName::Bool(b) => serializer.serialize_bool(*b),
            ReleaseName::Number(n) => n.serialize(serializer),
        }
    }
}
