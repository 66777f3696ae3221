//! Key/value commands carried by replica logs

use crate::{Result, SmrError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command value. Serialized untagged, so `1`, `1.5`, `true` and `"x"`
/// round-trip through JSON as themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CommandValue {
    /// Interpret raw user input: integer, then float, then boolean, else text
    pub fn infer(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            return CommandValue::Integer(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            if value.is_finite() {
                return CommandValue::Float(value);
            }
        }
        match raw {
            "true" => CommandValue::Boolean(true),
            "false" => CommandValue::Boolean(false),
            _ => CommandValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandValue::Boolean(value) => write!(f, "{}", value),
            CommandValue::Integer(value) => write!(f, "{}", value),
            CommandValue::Float(value) => write!(f, "{}", value),
            CommandValue::Text(value) => write!(f, "{:?}", value),
        }
    }
}

impl From<bool> for CommandValue {
    fn from(value: bool) -> Self {
        CommandValue::Boolean(value)
    }
}

impl From<i32> for CommandValue {
    fn from(value: i32) -> Self {
        CommandValue::Integer(i64::from(value))
    }
}

impl From<i64> for CommandValue {
    fn from(value: i64) -> Self {
        CommandValue::Integer(value)
    }
}

impl From<f64> for CommandValue {
    fn from(value: f64) -> Self {
        CommandValue::Float(value)
    }
}

impl From<&str> for CommandValue {
    fn from(value: &str) -> Self {
        CommandValue::Text(value.to_string())
    }
}

impl From<String> for CommandValue {
    fn from(value: String) -> Self {
        CommandValue::Text(value)
    }
}

/// Set `key` to `value` on every replica once committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// State key; must be non-empty
    pub key: String,

    /// New value; `null` makes the command malformed
    #[serde(default)]
    pub value: Option<CommandValue>,
}

impl Command {
    pub fn new(key: impl Into<String>, value: impl Into<CommandValue>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Parse `key=value` input, inferring the value type
    pub fn parse(input: &str) -> Result<Self> {
        let (key, raw) = input
            .split_once('=')
            .ok_or_else(|| SmrError::InvalidCommand(format!("expected key=value, got {:?}", input)))?;

        let command = Self {
            key: key.trim().to_string(),
            value: Some(CommandValue::infer(raw.trim())),
        };
        command.validate()?;
        Ok(command)
    }

    /// Both a non-empty key and a value are present
    pub fn is_well_formed(&self) -> bool {
        !self.key.is_empty() && self.value.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(SmrError::InvalidCommand("empty key".to_string()));
        }
        if self.value.is_none() {
            return Err(SmrError::InvalidCommand(format!("no value for key {}", self.key)));
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => write!(f, "{}=null", self.key),
        }
    }
}
