//! Table schema: the known column set and how each column filters, sorts and
//! renders.
//!
//! The schema is static for the lifetime of a store. Persisted layouts are
//! reconciled against it on load.

use crate::{ColumnId, Field};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Floor applied to every column width unless the schema overrides it.
pub const DEFAULT_MIN_WIDTH: u32 = 80;

/// Width used for columns without a configured default.
pub const FALLBACK_WIDTH: u32 = 150;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#x[0-9a-fA-F]+|[a-zA-Z]+);").expect("static regex"));

/// How a column is filtered and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Case-insensitive substring filter, natural ordering.
    Text,
    /// Relational size expression or substring over the formatted size.
    Size,
    /// Case-insensitive prefix filter over the display form.
    Date,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Text => write!(f, "Text"),
            ColumnKind::Size => write!(f, "Size"),
            ColumnKind::Date => write!(f, "Date"),
        }
    }
}

/// How the free-text search box interprets multiple words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchMode {
    /// The whole query must appear as one substring.
    #[default]
    Substring,
    /// Every whitespace separated token must appear somewhere.
    AllTokens,
}

/// How a size filter consisting of a bare number (no operator, no unit) is
/// read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BareSizeFilter {
    /// `5` means `>= 5` bytes.
    #[default]
    AtLeast,
    /// `5` is a substring of the formatted size.
    Contains,
}

/// Definition of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Stable column identifier
    pub id: ColumnId,
    /// Header label; may contain markup or HTML entities
    pub label: String,
    /// Filter and comparison semantics
    pub kind: ColumnKind,
    /// Record field displayed in this column
    pub field: Field,
    /// Default width in pixels
    pub default_width: u32,
}

impl ColumnDef {
    /// Create a column definition.
    pub fn new(
        id: impl Into<ColumnId>,
        label: impl Into<String>,
        kind: ColumnKind,
        field: Field,
        default_width: u32,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            field,
            default_width,
        }
    }

    /// Header label with markup removed and entities decoded.
    pub fn plain_label(&self) -> String {
        strip_markup(&self.label)
    }
}

/// The static table definition shared by the store, the filter engine and the
/// projection layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Known columns in their canonical order
    pub columns: Vec<ColumnDef>,
    /// Initial column order (reconciled against `columns`)
    #[serde(default)]
    pub default_order: Vec<ColumnId>,
    /// Minimum width any column may take
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    /// Free-text search semantics
    #[serde(default)]
    pub search_mode: SearchMode,
    /// Bare number size filter semantics
    #[serde(default)]
    pub bare_size_filter: BareSizeFilter,
}

fn default_min_width() -> u32 {
    DEFAULT_MIN_WIDTH
}

impl TableSchema {
    /// Create a schema from a list of columns. The default order is the
    /// column order.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        let default_order = columns.iter().map(|c| c.id.clone()).collect();
        Self {
            columns,
            default_order,
            min_width: DEFAULT_MIN_WIDTH,
            search_mode: SearchMode::default(),
            bare_size_filter: BareSizeFilter::default(),
        }
    }

    /// The standard inventory table.
    pub fn inventory() -> Self {
        Self::new(vec![
            ColumnDef::new("hash", "SHA", ColumnKind::Text, Field::Hash, 240),
            ColumnDef::new("kind", "Type", ColumnKind::Text, Field::Kind, 120),
            ColumnDef::new("name", "Name", ColumnKind::Text, Field::Name, 260),
            ColumnDef::new("path", "Path/Folder", ColumnKind::Text, Field::Path, 320),
            ColumnDef::new("unit", "Unit", ColumnKind::Text, Field::Unit, 90),
            ColumnDef::new("size", "Size", ColumnKind::Size, Field::Size, 130),
            ColumnDef::new("modified", "Date", ColumnKind::Date, Field::Modified, 160),
        ])
    }

    /// Builder: override the default column order.
    pub fn with_default_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnId>,
    {
        self.default_order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: override the width floor.
    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width.max(1);
        self
    }

    /// Builder: choose the search semantics.
    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Builder: choose how bare numbers in the size filter are read.
    pub fn with_bare_size_filter(mut self, policy: BareSizeFilter) -> Self {
        self.bare_size_filter = policy;
        self
    }

    /// Look up a column.
    pub fn column(&self, id: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Whether the column id is known.
    pub fn contains(&self, id: &str) -> bool {
        self.column(id).is_some()
    }

    /// Known column ids in canonical order.
    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }

    /// The default order reconciled against the known columns.
    pub fn reconciled_default_order(&self) -> Vec<ColumnId> {
        crate::view::sanitize_order(self.default_order.as_slice(), self)
    }

    /// Default widths, floored at the minimum width.
    pub fn default_widths(&self) -> BTreeMap<ColumnId, u32> {
        self.columns
            .iter()
            .map(|c| {
                let width = if c.default_width == 0 {
                    FALLBACK_WIDTH
                } else {
                    c.default_width
                };
                (c.id.clone(), width.max(self.min_width))
            })
            .collect()
    }

    /// Default width of a single column.
    pub fn default_width(&self, id: &str) -> u32 {
        self.column(id)
            .map(|c| c.default_width)
            .filter(|w| *w > 0)
            .unwrap_or(FALLBACK_WIDTH)
            .max(self.min_width)
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::inventory()
    }
}

/// Remove HTML tags and decode entities from a header label.
pub fn strip_markup(label: &str) -> String {
    let without_tags = MARKUP.replace_all(label, "");
    ENTITY
        .replace_all(&without_tags, |caps: &regex::Captures<'_>| decode_entity(&caps[1]))
        .trim()
        .to_string()
}

fn decode_entity(entity: &str) -> String {
    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default();
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default();
    }
    let decoded = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ntilde" => "ñ",
        "Ntilde" => "Ñ",
        "aacute" => "á",
        "eacute" => "é",
        "iacute" => "í",
        "oacute" => "ó",
        "uacute" => "ú",
        "uuml" => "ü",
        "ccedil" => "ç",
        _ => "",
    };
    decoded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_schema_columns() {
        let schema = TableSchema::inventory();
        let ids: Vec<_> = schema.column_ids().collect();
        assert_eq!(ids, ["hash", "kind", "name", "path", "unit", "size", "modified"]);
        assert_eq!(schema.column("size").unwrap().kind, ColumnKind::Size);
        assert_eq!(schema.column("modified").unwrap().kind, ColumnKind::Date);
        assert!(schema.column("bogus").is_none());
    }

    #[test]
    fn default_widths_are_floored() {
        let schema = TableSchema::new(vec![
            ColumnDef::new("a", "A", ColumnKind::Text, Field::Name, 10),
            ColumnDef::new("b", "B", ColumnKind::Text, Field::Path, 0),
        ]);
        let widths = schema.default_widths();
        assert_eq!(widths["a"], DEFAULT_MIN_WIDTH);
        assert_eq!(widths["b"], FALLBACK_WIDTH);
    }

    #[test]
    fn default_order_is_reconciled() {
        let schema = TableSchema::inventory().with_default_order(["name", "ghost", "name", "size"]);
        let order = schema.reconciled_default_order();
        assert_eq!(order[..2], ["name".to_string(), "size".to_string()]);
        assert_eq!(order.len(), 7);
    }

    #[test]
    fn labels_are_stripped() {
        assert_eq!(strip_markup("Tama&ntilde;o"), "Tamaño");
        assert_eq!(strip_markup("<b>Ruta</b>/Carpeta"), "Ruta/Carpeta");
        assert_eq!(strip_markup("A &amp; B &#65;"), "A & B A");
    }
}
