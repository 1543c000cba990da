//! Cables between elements.
//!
//! Connections carry descriptive data only. They never take part in
//! containment or collision.

use crate::ElementId;
use palette::Srgb;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Port label used when a connection is drawn without naming its ports.
pub const DEFAULT_PORT: &str = "Port?";

/// Display color stored as a `#rrggbb` hex string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color(pub Srgb<u8>);

#[derive(Debug, thiserror::Error)]
#[error("Invalid color {input:?}: expected #rrggbb or #rgb")]
pub struct ColorParseError {
    pub input: String,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(Srgb::new(red, green, blue))
    }

    /// Accent used for connections created by batch layouts.
    pub const fn accent() -> Self {
        Self::rgb(0x3b, 0x82, 0xf6)
    }

    pub fn to_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.0.red, self.0.green, self.0.blue
        )
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Srgb<u8>>()
            .map(Color)
            .map_err(|_| ColorParseError {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("e_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

/// A cable from `source` to `target`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source: ElementId,
    pub target: ElementId,
    #[serde(default = "default_port")]
    pub source_port: String,
    #[serde(default = "default_port")]
    pub target_port: String,
    /// Free-text medium or speed, e.g. `10GbE`.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "speed")]
    pub medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Connection {
    pub fn new(id: ConnectionId, source: ElementId, target: ElementId) -> Self {
        Self {
            id,
            source,
            target,
            source_port: default_port(),
            target_port: default_port(),
            medium: None,
            color: None,
        }
    }

    pub fn with_medium(mut self, medium: impl Into<String>) -> Self {
        self.medium = Some(medium.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Whether either end is `id`.
    pub fn touches(&self, id: &ElementId) -> bool {
        &self.source == id || &self.target == id
    }
}
