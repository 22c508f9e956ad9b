//! Connector type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single row fetched from an external source, keyed by column name.
///
/// Values keep whatever JSON shape the adapter produced; callers decide how
/// to coerce them (the reconciler stringifies primary keys, the validator
/// formats dates).
pub type SourceRow = serde_json::Map<String, serde_json::Value>;

/// Vendor of an external data source.
///
/// Adding a vendor means adding one variant here and one adapter behind the
/// factory; call sites dispatch on the enum and never on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `PostgreSQL` server reachable over the wire.
    Postgres,
    /// `MySQL`/MariaDB server.
    Mysql,
    /// Supabase project (`PostgreSQL` behind a service key).
    Supabase,
}

impl SourceKind {
    /// All known source kinds.
    #[must_use]
    pub fn all() -> &'static [SourceKind] {
        &[SourceKind::Postgres, SourceKind::Mysql, SourceKind::Supabase]
    }

    /// String form used in storage and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Postgres => "postgres",
            SourceKind::Mysql => "mysql",
            SourceKind::Supabase => "supabase",
        }
    }

    /// Default wire port for this vendor.
    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            SourceKind::Postgres | SourceKind::Supabase => 5432,
            SourceKind::Mysql => 3306,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ParseSourceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SourceKind::Postgres),
            "mysql" | "mariadb" => Ok(SourceKind::Mysql),
            "supabase" => Ok(SourceKind::Supabase),
            _ => Err(ParseSourceKindError(s.to_string())),
        }
    }
}

/// Error parsing a source kind from a string.
#[derive(Debug, Clone)]
pub struct ParseSourceKindError(String);

impl fmt::Display for ParseSourceKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid source kind '{}', expected one of: postgres, mysql, supabase",
            self.0
        )
    }
}

impl std::error::Error for ParseSourceKindError {}

/// One column of an external resource, as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name exactly as the source reports it.
    pub name: String,
    /// Source-native data type, when the adapter can determine it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnInfo {
    /// Create a column with a known data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
        }
    }

    /// Create a column whose type the adapter could not determine.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }
}
