//! The per-user view configuration and the sanitizers that keep it valid.
//!
//! The same rules apply to live mutations and to snapshots loaded from
//! storage, so a hand-edited or stale snapshot can never produce a state the
//! mutators could not have produced.

use crate::selection::Selection;
use crate::{ColumnId, ColumnKind, RowId, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub column: ColumnId,
    pub direction: Direction,
}

impl SortSpec {
    pub fn new(column: impl Into<ColumnId>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<ColumnId>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<ColumnId>) -> Self {
        Self::new(column, Direction::Desc)
    }

    /// Initial direction when a column is first clicked: numeric and date
    /// columns open largest/newest first.
    pub fn initial_for(column: &str, schema: &TableSchema) -> Self {
        let direction = match schema.column(column).map(|c| c.kind) {
            Some(ColumnKind::Size) | Some(ColumnKind::Date) => Direction::Desc,
            _ => Direction::Asc,
        };
        Self::new(column, direction)
    }
}

/// Static defaults a fresh configuration is seeded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewDefaults {
    pub hidden_columns: BTreeSet<ColumnId>,
    pub hidden_rows: BTreeSet<RowId>,
    pub row_heights: BTreeMap<RowId, u32>,
    pub filters: BTreeMap<ColumnId, String>,
    pub search: String,
    pub active_unit: String,
    pub page: usize,
    pub page_size: usize,
    pub sort: Option<SortSpec>,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            hidden_columns: BTreeSet::new(),
            hidden_rows: BTreeSet::new(),
            row_heights: BTreeMap::new(),
            filters: BTreeMap::new(),
            search: String::new(),
            active_unit: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Some(SortSpec::asc("name")),
        }
    }
}

impl ViewDefaults {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_hidden_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnId>,
    {
        self.hidden_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Full per-user display, filter and selection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfiguration {
    /// Column order: a permutation of the known columns
    pub order: Vec<ColumnId>,
    /// Column widths, floored at the schema minimum
    pub widths: BTreeMap<ColumnId, u32>,
    /// Hidden columns, a subset of the known columns
    pub hidden_columns: BTreeSet<ColumnId>,
    /// Non-empty per-column filter expressions
    pub filters: BTreeMap<ColumnId, String>,
    /// Free-text search
    pub search: String,
    /// Active unit facet, empty when none
    pub active_unit: String,
    /// 1-based page index
    pub page: usize,
    /// Rows per page, 0 for everything on one page
    pub page_size: usize,
    /// Active sort, `None` keeps dataset order
    pub sort: Option<SortSpec>,
    /// Rows excluded from every view
    pub hidden_rows: BTreeSet<RowId>,
    /// Per-row height overrides
    pub row_heights: BTreeMap<RowId, u32>,
    /// Selected rows with their selection order
    pub selection: Selection,
}

impl ViewConfiguration {
    /// Seed a configuration from defaults, reconciled against the schema.
    pub fn from_defaults(schema: &TableSchema, defaults: &ViewDefaults) -> Self {
        Self {
            order: schema.reconciled_default_order(),
            widths: schema.default_widths(),
            hidden_columns: sanitize_hidden_columns(defaults.hidden_columns.iter(), schema),
            filters: sanitize_filters(
                defaults.filters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                schema,
            ),
            search: defaults.search.trim().to_string(),
            active_unit: defaults.active_unit.trim().to_string(),
            page: defaults.page.max(1),
            page_size: defaults.page_size,
            sort: sanitize_sort(defaults.sort.clone(), schema),
            hidden_rows: sanitize_row_ids(defaults.hidden_rows.iter()),
            row_heights: defaults
                .row_heights
                .iter()
                .filter(|(id, h)| !id.is_empty() && **h > 0)
                .map(|(id, h)| (id.clone(), *h))
                .collect(),
            selection: Selection::new(),
        }
    }

    /// Visible columns in display order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnId> {
        self.order
            .iter()
            .filter(move |id| !self.hidden_columns.contains(*id))
    }

    /// Whether any filter, search or facet is active.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty() || !self.search.is_empty() || !self.active_unit.is_empty()
    }
}

/// Reconcile a column order against the known columns: unknown and duplicate
/// ids are dropped, missing known ids are appended in schema order.
pub fn sanitize_order<S: AsRef<str>>(order: &[S], schema: &TableSchema) -> Vec<ColumnId> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(schema.columns.len());
    for id in order {
        let id = id.as_ref().trim();
        if id.is_empty() || !schema.contains(id) || !seen.insert(id.to_string()) {
            continue;
        }
        result.push(id.to_string());
    }
    for id in schema.column_ids() {
        if seen.insert(id.to_string()) {
            result.push(id.to_string());
        }
    }
    result
}

/// Clamp a width to the schema floor.
pub fn clamp_width(width: u32, schema: &TableSchema) -> u32 {
    width.max(schema.min_width)
}

/// Reconcile widths: every known column gets a width, taken from `widths`
/// when positive and from the schema default otherwise, floored.
pub fn sanitize_widths<'a, I>(widths: I, schema: &TableSchema) -> BTreeMap<ColumnId, u32>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let provided: BTreeMap<&str, f64> = widths.into_iter().collect();
    schema
        .columns
        .iter()
        .map(|column| {
            let width = provided
                .get(column.id.as_str())
                .copied()
                .filter(|w| w.is_finite() && *w > 0.0)
                .map(|w| w.round().min(u32::MAX as f64) as u32)
                .unwrap_or_else(|| schema.default_width(&column.id));
            (column.id.clone(), clamp_width(width, schema))
        })
        .collect()
}

/// Keep only known, trimmed column ids.
pub fn sanitize_hidden_columns<I, S>(columns: I, schema: &TableSchema) -> BTreeSet<ColumnId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .filter_map(|c| {
            let id = c.as_ref().trim();
            schema.contains(id).then(|| id.to_string())
        })
        .collect()
}

/// Keep only non-empty, trimmed row ids.
pub fn sanitize_row_ids<I, S>(ids: I) -> BTreeSet<RowId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .filter(|id| !id.as_ref().is_empty())
        .map(|id| id.as_ref().to_string())
        .collect()
}

/// Keep only filters on known columns with a non-blank value, trimmed.
pub fn sanitize_filters<'a, I>(filters: I, schema: &TableSchema) -> BTreeMap<ColumnId, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    filters
        .into_iter()
        .filter_map(|(column, value)| {
            let column = column.trim();
            let value = value.trim();
            (schema.contains(column) && !value.is_empty())
                .then(|| (column.to_string(), value.to_string()))
        })
        .collect()
}

/// Drop a sort on an unknown column.
pub fn sanitize_sort(sort: Option<SortSpec>, schema: &TableSchema) -> Option<SortSpec> {
    sort.filter(|s| schema.contains(&s.column))
}
