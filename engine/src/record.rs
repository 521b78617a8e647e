//! Canonical inventory records.

use crate::RowId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Separator used when a row identifier is built from path, name and size.
pub const ROW_ID_SEPARATOR: &str = "::";

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// One inventory entry. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Content hash, when the scanner computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// File kind (video, audio, document...)
    #[serde(default)]
    pub kind: String,
    /// File name
    #[serde(default)]
    pub name: String,
    /// Containing folder
    #[serde(default)]
    pub path: String,
    /// Storage unit / drive the file lives on
    #[serde(default)]
    pub unit: String,
    /// Size in bytes
    #[serde(default)]
    pub size_bytes: u64,
    /// Last modification timestamp as found in the source, or empty
    #[serde(default)]
    pub modified_at: String,
}

impl Record {
    /// Derived row identity: the hash when present, otherwise path, name and
    /// size joined.
    pub fn row_id(&self) -> Cow<'_, str> {
        match self.hash.as_deref() {
            Some(hash) if !hash.is_empty() => Cow::Borrowed(hash),
            _ => Cow::Owned(format!(
                "{}{sep}{}{sep}{}",
                self.path,
                self.name,
                self.size_bytes,
                sep = ROW_ID_SEPARATOR
            )),
        }
    }

    /// Owned row identifier.
    pub fn row_key(&self) -> RowId {
        self.row_id().into_owned()
    }

    /// Textual value of a field, as used by text filters and sorting.
    pub fn text(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::Hash => Cow::Borrowed(self.hash.as_deref().unwrap_or("")),
            Field::Kind => Cow::Borrowed(&self.kind),
            Field::Name => Cow::Borrowed(&self.name),
            Field::Path => Cow::Borrowed(&self.path),
            Field::Unit => Cow::Borrowed(&self.unit),
            Field::Size => Cow::Owned(self.size_bytes.to_string()),
            Field::Modified => Cow::Borrowed(&self.modified_at),
        }
    }

    /// Display value of a field (sizes humanised, dates normalised).
    pub fn display(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::Size => Cow::Owned(format_size(self.size_bytes)),
            Field::Modified => Cow::Owned(display_date(&self.modified_at)),
            other => self.text(other),
        }
    }

    /// Lowercased extension of the file name, if it has one.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_lowercase())
    }
}

/// Canonical record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Hash,
    Kind,
    Name,
    Path,
    Unit,
    Size,
    Modified,
}

impl Field {
    /// All fields in canonical order.
    pub const ALL: [Field; 7] = [
        Field::Hash,
        Field::Kind,
        Field::Name,
        Field::Path,
        Field::Unit,
        Field::Size,
        Field::Modified,
    ];

    /// Fields concatenated for free-text search.
    pub const SEARCHABLE: [Field; 5] = [Field::Hash, Field::Kind, Field::Name, Field::Path, Field::Unit];
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Hash => "hash",
            Field::Kind => "kind",
            Field::Name => "name",
            Field::Path => "path",
            Field::Unit => "unit",
            Field::Size => "size",
            Field::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// Human readable byte count: `0 B`, `512 B`, `1.5 KB`, `2.0 GB`...
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut idx = 0;
    while value >= 1024.0 && idx < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    if idx == 0 {
        format!("{} {}", bytes, SIZE_UNITS[0])
    } else {
        format!("{:.1} {}", value, SIZE_UNITS[idx])
    }
}

/// Display form of a timestamp: `2024-03-01T10:20:30Z` becomes
/// `2024-03-01 10:20:30`.
pub fn display_date(value: &str) -> String {
    let trimmed = value.trim();
    let without_zone = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    without_zone.replacen('T', " ", 1)
}
