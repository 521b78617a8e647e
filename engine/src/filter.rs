//! Row predicates: hidden rows, the unit facet, free-text search and typed
//! per-column filters.
//!
//! A [`CompiledFilter`] parses the configuration once (lowercasing, size
//! expressions) so projection over a large dataset does not reparse per row.

use crate::schema::{BareSizeFilter, SearchMode};
use crate::{format_size, ColumnKind, Field, Record, RowId, TableSchema, ViewConfiguration};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static SIZE_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(>=|<=|>|<|=)?\s*([0-9]+(?:[.,][0-9]+)?)\s*(b|kb|mb|gb|tb|pb)?$")
        .expect("static regex")
});

/// Relational operator of a size expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

impl SizeOp {
    fn parse(token: &str) -> Self {
        match token {
            "<=" => SizeOp::Le,
            ">" => SizeOp::Gt,
            "<" => SizeOp::Lt,
            "=" => SizeOp::Eq,
            _ => SizeOp::Ge,
        }
    }
}

/// A parsed size column filter.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeFilter {
    /// Relational comparison against the byte count.
    Compare { op: SizeOp, bytes: f64 },
    /// Substring of the human-readable size (lowercase).
    Contains(String),
}

impl SizeFilter {
    /// Parse a size expression such as `>=1mb`, `< 500 KB` or `2,5gb`.
    /// Anything that does not parse becomes a substring filter.
    pub fn parse(expr: &str, bare: BareSizeFilter) -> Self {
        let normalized = expr.trim().to_lowercase();
        let Some(caps) = SIZE_EXPR.captures(&normalized) else {
            return SizeFilter::Contains(normalized);
        };
        let op = caps.get(1).map(|m| m.as_str());
        let unit = caps.get(3).map(|m| m.as_str());
        if op.is_none() && unit.is_none() && bare == BareSizeFilter::Contains {
            return SizeFilter::Contains(normalized);
        }
        let Ok(value) = caps[2].replace(',', ".").parse::<f64>() else {
            return SizeFilter::Contains(normalized);
        };
        SizeFilter::Compare {
            op: op.map(SizeOp::parse).unwrap_or(SizeOp::Ge),
            bytes: value * unit_multiplier(unit.unwrap_or("b")),
        }
    }

    /// Whether a byte count satisfies the filter.
    pub fn matches(&self, size_bytes: u64) -> bool {
        match self {
            SizeFilter::Compare { op, bytes } => {
                let size = size_bytes as f64;
                match op {
                    SizeOp::Ge => size >= *bytes,
                    SizeOp::Le => size <= *bytes,
                    SizeOp::Gt => size > *bytes,
                    SizeOp::Lt => size < *bytes,
                    SizeOp::Eq => size == bytes.round(),
                }
            }
            SizeFilter::Contains(needle) => format_size(size_bytes).to_lowercase().contains(needle),
        }
    }
}

fn unit_multiplier(unit: &str) -> f64 {
    let power = match unit {
        "kb" => 1,
        "mb" => 2,
        "gb" => 3,
        "tb" => 4,
        "pb" => 5,
        _ => 0,
    };
    1024f64.powi(power)
}

#[derive(Debug, Clone)]
enum Search {
    Any,
    Substring(String),
    Tokens(Vec<String>),
}

impl Search {
    fn new(query: &str, mode: SearchMode) -> Self {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Search::Any;
        }
        match mode {
            SearchMode::Substring => Search::Substring(query),
            SearchMode::AllTokens => {
                Search::Tokens(query.split_whitespace().map(str::to_string).collect())
            }
        }
    }

    fn matches(&self, record: &Record) -> bool {
        if matches!(self, Search::Any) {
            return true;
        }
        let haystack = Field::SEARCHABLE
            .iter()
            .map(|f| record.text(*f))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match self {
            Search::Any => true,
            Search::Substring(needle) => haystack.contains(needle.as_str()),
            Search::Tokens(tokens) => tokens.iter().all(|t| haystack.contains(t.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
enum ColumnPredicate {
    Contains(String),
    Prefix(String),
    Size(SizeFilter),
}

/// Filter predicate compiled from a configuration and schema.
#[derive(Debug, Clone)]
pub struct CompiledFilter<'a> {
    hidden_rows: &'a BTreeSet<RowId>,
    unit: Option<String>,
    search: Search,
    columns: Vec<(Field, ColumnPredicate)>,
}

impl<'a> CompiledFilter<'a> {
    /// Compile the filter state of `config`. Filters on columns the schema
    /// does not know are ignored.
    pub fn new(config: &'a ViewConfiguration, schema: &TableSchema) -> Self {
        let unit = config.active_unit.trim().to_lowercase();
        let columns = config
            .filters
            .iter()
            .filter_map(|(id, expr)| {
                let column = schema.column(id)?;
                let expr = expr.trim();
                if expr.is_empty() {
                    return None;
                }
                let predicate = match column.kind {
                    ColumnKind::Text => ColumnPredicate::Contains(expr.to_lowercase()),
                    ColumnKind::Date => ColumnPredicate::Prefix(expr.to_lowercase()),
                    ColumnKind::Size => {
                        ColumnPredicate::Size(SizeFilter::parse(expr, schema.bare_size_filter))
                    }
                };
                Some((column.field, predicate))
            })
            .collect();
        Self {
            hidden_rows: &config.hidden_rows,
            unit: (!unit.is_empty()).then_some(unit),
            search: Search::new(&config.search, schema.search_mode),
            columns,
        }
    }

    /// Drop the unit facet (used for facet chip counts).
    pub fn without_unit(mut self) -> Self {
        self.unit = None;
        self
    }

    /// Evaluate the predicate.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.hidden_rows.is_empty() && self.hidden_rows.contains(record.row_id().as_ref()) {
            return false;
        }
        if let Some(unit) = &self.unit {
            if record.unit.trim().to_lowercase() != *unit {
                return false;
            }
        }
        if !self.search.matches(record) {
            return false;
        }
        self.columns.iter().all(|(field, predicate)| match predicate {
            ColumnPredicate::Contains(needle) => {
                record.text(*field).to_lowercase().contains(needle.as_str())
            }
            ColumnPredicate::Prefix(prefix) => {
                record.display(*field).to_lowercase().starts_with(prefix.as_str())
            }
            ColumnPredicate::Size(filter) => filter.matches(record.size_bytes),
        })
    }
}

/// One-shot predicate evaluation. Prefer [`CompiledFilter`] in loops.
pub fn matches(record: &Record, config: &ViewConfiguration, schema: &TableSchema) -> bool {
    CompiledFilter::new(config, schema).matches(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViewDefaults;

    fn schema() -> TableSchema {
        TableSchema::inventory()
    }

    fn config() -> ViewConfiguration {
        ViewConfiguration::from_defaults(&schema(), &ViewDefaults::default())
    }

    fn rec(name: &str, unit: &str, size: u64) -> Record {
        Record {
            hash: None,
            kind: "video".into(),
            name: name.into(),
            path: "D:\\media\\films".into(),
            unit: unit.into(),
            size_bytes: size,
            modified_at: "2024-03-01T10:20:30Z".into(),
        }
    }

    #[test]
    fn size_expression_selects_megabyte_and_up() {
        let mut cfg = config();
        cfg.filters.insert("size".into(), ">=1mb".into());
        let records = [rec("a", "D", 500_000), rec("b", "D", 1_048_576), rec("c", "D", 2_000_000)];
        let hits: Vec<_> = records
            .iter()
            .filter(|r| matches(r, &cfg, &schema()))
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(hits, ["b", "c"]);
    }

    #[test]
    fn size_expression_forms() {
        let bare = BareSizeFilter::AtLeast;
        assert_eq!(
            SizeFilter::parse("< 2 KB", bare),
            SizeFilter::Compare { op: SizeOp::Lt, bytes: 2048.0 }
        );
        assert_eq!(
            SizeFilter::parse("1,5kb", bare),
            SizeFilter::Compare { op: SizeOp::Ge, bytes: 1536.0 }
        );
        assert_eq!(
            SizeFilter::parse("5", bare),
            SizeFilter::Compare { op: SizeOp::Ge, bytes: 5.0 }
        );
        assert_eq!(SizeFilter::parse("about 5", bare), SizeFilter::Contains("about 5".into()));
        assert!(SizeFilter::parse("=1kb", bare).matches(1024));
        assert!(!SizeFilter::parse("=1kb", bare).matches(1025));
    }

    #[test]
    fn bare_number_as_substring() {
        let filter = SizeFilter::parse("5", BareSizeFilter::Contains);
        assert_eq!(filter, SizeFilter::Contains("5".into()));
        // 1536 -> "1.5 KB"
        assert!(filter.matches(1536));
        // 2048 -> "2.0 KB"
        assert!(!filter.matches(2048));
        // units still parse relationally
        assert!(matches!(
            SizeFilter::parse("5kb", BareSizeFilter::Contains),
            SizeFilter::Compare { .. }
        ));
    }

    #[test]
    fn unparseable_size_falls_back_to_formatted_text() {
        let filter = SizeFilter::parse("kb", BareSizeFilter::AtLeast);
        assert!(filter.matches(4096));
        assert!(!filter.matches(12));
    }

    #[test]
    fn text_date_and_facet() {
        let s = schema();
        let record = rec("Holiday.MKV", "D", 10);

        let mut cfg = config();
        cfg.filters.insert("name".into(), "day.mk".into());
        assert!(matches(&record, &cfg, &s));

        cfg.filters.insert("modified".into(), "2024-03-01 10".into());
        assert!(matches(&record, &cfg, &s));
        cfg.filters.insert("modified".into(), "03-01".into());
        assert!(!matches(&record, &cfg, &s));
        cfg.filters.remove("modified");

        cfg.active_unit = "d".into();
        assert!(matches(&record, &cfg, &s));
        cfg.active_unit = "E".into();
        assert!(!matches(&record, &cfg, &s));
        assert!(CompiledFilter::new(&cfg, &s).without_unit().matches(&record));
    }

    #[test]
    fn unknown_filters_never_exclude() {
        let mut cfg = config();
        cfg.filters.insert("ghost".into(), "zzz".into());
        assert!(matches(&rec("a", "D", 1), &cfg, &schema()));
    }

    #[test]
    fn hidden_rows_are_excluded() {
        let record = rec("a", "D", 1);
        let mut cfg = config();
        cfg.hidden_rows.insert(record.row_key());
        assert!(!matches(&record, &cfg, &schema()));
    }

    #[test]
    fn search_modes() {
        let record = rec("holiday.mkv", "D", 1);
        let mut cfg = config();
        cfg.search = "  HOLIDAY ".into();
        assert!(matches(&record, &cfg, &schema()));

        cfg.search = "films holiday".into();
        assert!(!matches(&record, &cfg, &schema()));
        let tokens = schema().with_search_mode(SearchMode::AllTokens);
        assert!(matches(&record, &cfg, &tokens));

        cfg.search = "films bogus".into();
        assert!(!matches(&record, &cfg, &tokens));
    }
}
