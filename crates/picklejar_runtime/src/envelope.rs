//! The transport envelope.
//!
//! Success is `{"ok": true, "value": ...}`; failure is
//! `{"ok": false, "error": {"kind": ..., "detail": ..., ...}}`. Optional
//! error fields are omitted when the kind does not carry them.

use picklejar_foundation::{Error, ErrorKind};
use picklejar_normalize::NormalizedValue;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Machine-readable description of a failed parse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Stable kind name, e.g. `BlockedSymbol`.
    pub kind: &'static str,
    /// Human-readable message.
    pub detail: String,
    /// Byte offset of the failing opcode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Name of the failing opcode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcode: Option<&'static str>,
    /// Module of a blocked reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Attribute of a blocked reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Configuration key of a breached limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<&'static str>,
}

impl From<&Error> for ErrorReport {
    fn from(error: &Error) -> Self {
        let (namespace, symbol) = match &error.kind {
            ErrorKind::BlockedSymbol { namespace, symbol } => (Some(namespace.clone()), Some(symbol.clone())),
            _ => (None, None),
        };
        let limit = match &error.kind {
            ErrorKind::ResourceLimitExceeded(limit) => Some(limit.key()),
            _ => None,
        };
        let context = error.context.as_ref();
        Self {
            kind: error.kind.name(),
            detail: error.kind.to_string(),
            offset: context.and_then(|c| c.offset),
            opcode: context.and_then(|c| c.opcode),
            namespace,
            symbol,
            limit,
        }
    }
}

/// Result of one parse, ready for serialization.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The stream was interpreted and normalized.
    Ok(NormalizedValue),
    /// The stream was rejected.
    Err(ErrorReport),
}

impl Outcome {
    /// Returns true for a successful parse.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The normalized value of a successful parse.
    #[must_use]
    pub const fn value(&self) -> Option<&NormalizedValue> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Err(_) => None,
        }
    }

    /// The report of a failed parse.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Ok(_) => None,
            Self::Err(report) => Some(report),
        }
    }

    /// Compact JSON text of the envelope.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| fallback(&e))
    }

    /// Indented JSON text of the envelope.
    #[must_use]
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| fallback(&e))
    }
}

/// Serialization only fails on non-string map keys, which the tree never has.
fn fallback(error: &serde_json::Error) -> String {
    serde_json::json!({
        "ok": false,
        "error": { "kind": "Serialization", "detail": error.to_string() },
    })
    .to_string()
}

impl From<Result<NormalizedValue, Error>> for Outcome {
    fn from(result: Result<NormalizedValue, Error>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(error) => Self::Err(ErrorReport::from(&error)),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Ok(value) => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("value", value)?;
            }
            Self::Err(report) => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", report)?;
            }
        }
        map.end()
    }
}
