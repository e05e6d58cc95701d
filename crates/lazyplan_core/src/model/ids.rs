//! Local identity for notes and scheduled items.
//!
//! # Responsibility
//! - Distinguish server-assigned ids from optimistic placeholders.
//! - Provide a stable text form for UI keys and logs.
//!
//! # Invariants
//! - A `Temp` id is never sent to the remote store.
//! - A `Temp` id is replaced by exactly one `Server` id on confirmation.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier assigned by the remote store.
pub type ServerId = i64;

const TEMP_PREFIX: &str = "tmp:";

/// Identity of an entity held in local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocalId {
    /// Placeholder synthesized for an optimistic create.
    Temp(Uuid),
    /// Server-confirmed identity.
    Server(ServerId),
}

impl LocalId {
    /// Synthesizes a fresh temporary id.
    pub fn temp() -> Self {
        Self::Temp(Uuid::new_v4())
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, Self::Temp(_))
    }

    /// Returns the server id, if this identity has been confirmed.
    pub fn server_id(&self) -> Option<ServerId> {
        match self {
            Self::Server(id) => Some(*id),
            Self::Temp(_) => None,
        }
    }
}

impl From<ServerId> for LocalId {
    fn from(value: ServerId) -> Self {
        Self::Server(value)
    }
}

impl Display for LocalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temp(uuid) => write!(f, "{TEMP_PREFIX}{uuid}"),
            Self::Server(id) => write!(f, "{id}"),
        }
    }
}

/// Text could not be parsed into a [`LocalId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdParseError(pub String);

impl Display for LocalIdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid local id: `{}`", self.0)
    }
}

impl Error for LocalIdParseError {}

impl FromStr for LocalId {
    type Err = LocalIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(raw_uuid) = trimmed.strip_prefix(TEMP_PREFIX) {
            return Uuid::parse_str(raw_uuid)
                .map(Self::Temp)
                .map_err(|_| LocalIdParseError(trimmed.to_string()));
        }
        trimmed
            .parse::<ServerId>()
            .map(Self::Server)
            .map_err(|_| LocalIdParseError(trimmed.to_string()))
    }
}
