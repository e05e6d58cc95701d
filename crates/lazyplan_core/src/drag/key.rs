//! Typed identity of a draggable element.

use crate::model::catalog::CatalogKind;
use crate::model::ids::{LocalId, ServerId};
use crate::model::schedule::Slot;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Which list a dragged element came from, plus its id in that list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragKey {
    Catalog { kind: CatalogKind, id: ServerId },
    Scheduled { slot: Slot, id: LocalId },
}

impl DragKey {
    pub fn catalog(kind: CatalogKind, id: ServerId) -> Self {
        Self::Catalog { kind, id }
    }

    pub fn scheduled(slot: Slot, id: LocalId) -> Self {
        Self::Scheduled { slot, id }
    }
}

/// `{prefix}-{id}`, e.g. `task-7` or `morning-12`.
impl Display for DragKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog { kind, id } => write!(f, "{kind}-{id}"),
            Self::Scheduled { slot, id } => write!(f, "{slot}-{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragKeyError {
    MissingSeparator(String),
    UnknownPrefix(String),
    InvalidId(String),
}

impl Display for DragKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSeparator(raw) => write!(f, "drag key has no separator: {raw}"),
            Self::UnknownPrefix(prefix) => write!(f, "unknown drag key prefix: {prefix}"),
            Self::InvalidId(raw) => write!(f, "invalid id in drag key: {raw}"),
        }
    }
}

impl Error for DragKeyError {}

impl FromStr for DragKey {
    type Err = DragKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (prefix, raw_id) = value
            .split_once('-')
            .ok_or_else(|| DragKeyError::MissingSeparator(value.to_string()))?;

        if let Some(kind) = CatalogKind::parse(prefix) {
            let id = raw_id
                .parse::<ServerId>()
                .map_err(|_| DragKeyError::InvalidId(raw_id.to_string()))?;
            return Ok(Self::Catalog { kind, id });
        }
        let slot = prefix
            .parse::<Slot>()
            .map_err(|_| DragKeyError::UnknownPrefix(prefix.to_string()))?;
        let id = raw_id
            .parse::<LocalId>()
            .map_err(|_| DragKeyError::InvalidId(raw_id.to_string()))?;
        Ok(Self::Scheduled { slot, id })
    }
}
