use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod mirror;
pub mod prober;
pub mod schedule;
pub mod sync;

#[cfg(test)]
mod testing;

/// The three remote systems the control panel watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Middleware,
    App1,
    Hospital,
}

impl Subsystem {
    pub const ALL: [Subsystem; 3] = [Subsystem::Middleware, Subsystem::App1, Subsystem::Hospital];

    pub fn key(&self) -> &'static str {
        match self {
            Subsystem::Middleware => "middleware",
            Subsystem::App1 => "app1",
            Subsystem::Hospital => "hospital",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Subsystem::Middleware => "Middleware/MySQL",
            Subsystem::App1 => "App 1 (Shopping)",
            Subsystem::Hospital => "App 2 (Hospital)",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemState {
    Up,
    Down,
}

impl SubsystemState {
    /// Anything other than `up` is treated as `down`.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("up") {
            SubsystemState::Up
        } else {
            SubsystemState::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemState::Up => "up",
            SubsystemState::Down => "down",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, SubsystemState::Up)
    }
}

impl fmt::Display for SubsystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of every subsystem as reported by one probe. Always carries an
/// entry for each [`Subsystem`]; a new snapshot replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    states: BTreeMap<Subsystem, SubsystemState>,
}

impl StatusSnapshot {
    pub fn new(states: impl IntoIterator<Item = (Subsystem, SubsystemState)>) -> Self {
        let mut snapshot = Self::all_down();
        for (subsystem, state) in states {
            snapshot.states.insert(subsystem, state);
        }
        snapshot
    }

    pub fn all_down() -> Self {
        Self {
            states: Subsystem::ALL
                .iter()
                .map(|subsystem| (*subsystem, SubsystemState::Down))
                .collect(),
        }
    }

    /// Builds a snapshot from a `/api/system-status` body. Returns `None`
    /// when the body is not a JSON object. Missing keys count as `down`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self::new(Subsystem::ALL.iter().map(|subsystem| {
            let state = map
                .get(subsystem.key())
                .and_then(Value::as_str)
                .map(SubsystemState::parse_lenient)
                .unwrap_or(SubsystemState::Down);
            (*subsystem, state)
        })))
    }

    pub fn state(&self, subsystem: Subsystem) -> SubsystemState {
        self.states
            .get(&subsystem)
            .copied()
            .unwrap_or(SubsystemState::Down)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subsystem, SubsystemState)> + '_ {
        self.states.iter().map(|(subsystem, state)| (*subsystem, *state))
    }

    pub fn up_count(&self) -> usize {
        self.states.values().filter(|state| state.is_up()).count()
    }
}

/// Display-only name of the backing store currently accepting writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterIdentity(pub String);

impl MasterIdentity {
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// Reads `master_actual` from a `/health` body.
    pub fn from_health(value: &Value) -> Self {
        value
            .get("master_actual")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Self(name.to_string()))
            .unwrap_or_else(Self::unknown)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MasterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub list_id: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(
        default,
        rename = "paciente",
        alias = "patient",
        deserialize_with = "deserialize_text"
    )]
    pub patient: String,
    #[serde(
        default,
        rename = "descripcion",
        alias = "reason",
        deserialize_with = "deserialize_text"
    )]
    pub reason: String,
    #[serde(
        default,
        rename = "fecha",
        alias = "date",
        deserialize_with = "deserialize_text"
    )]
    pub date: String,
}

/// Deserialize an ID that can be either a string or a number into a String
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected string or number for id")),
    }
}

/// Free text that may arrive as null, a number or a string.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(serde::de::Error::custom("expected scalar text value")),
    }
}

/// MySQL mirrors report booleans as 0/1; the remote app uses true/false.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().map(|v| v != 0.0).unwrap_or(false)),
        Value::String(s) => Ok(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )),
        _ => Err(serde::de::Error::custom("expected boolean flag")),
    }
}
