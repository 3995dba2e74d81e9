//! Aggregate and event identifiers.
//!
//! Two identifier flavours are supported for aggregates: RFC 4122 v4 UUIDs
//! and short URL-safe ids. Both are plain strings on the wire; the strategy
//! only decides how fresh candidates are generated.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alphabet used for short ids (URL-safe, 64 symbols).
const SHORT_ID_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// Length of generated short ids.
pub const SHORT_ID_LEN: usize = 10;

/// Identity of an aggregate, i.e. of its event stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id that must be a UUID.
    pub fn parse_uuid(id: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(id)
            .map(|_| Self(id.to_string()))
            .map_err(|_| IdentifierError::InvalidUuid(id.to_string()))
    }

    /// Parse an id that must be a short id.
    pub fn parse_short(id: &str) -> Result<Self, IdentifierError> {
        let valid = id.len() == SHORT_ID_LEN && id.bytes().all(|b| SHORT_ID_ALPHABET.contains(&b));
        if valid {
            Ok(Self(id.to_string()))
        } else {
            Err(IdentifierError::InvalidShortId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identity of a single persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Fresh random event id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How candidate aggregate ids are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Short,
}

impl IdStrategy {
    /// Produce a candidate id. Uniqueness against the store is checked by
    /// the caller.
    pub fn generate(&self) -> AggregateId {
        match self {
            IdStrategy::Uuid => AggregateId(Uuid::new_v4().to_string()),
            IdStrategy::Short => {
                let mut rng = rand::rng();
                let id = (0..SHORT_ID_LEN)
                    .map(|_| {
                        let idx = rng.random_range(0..SHORT_ID_ALPHABET.len());
                        SHORT_ID_ALPHABET[idx] as char
                    })
                    .collect::<String>();
                AggregateId(id)
            }
        }
    }
}

/// Identifier parsing errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("Invalid short id: {0}")]
    InvalidShortId(String),
}
