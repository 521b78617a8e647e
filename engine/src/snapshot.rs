//! Persisted view snapshots.
//!
//! Writing is strict: a [`ViewSnapshot`] is the configuration flattened into
//! a stable, camelCase JSON document with `BTreeMap` ordering. Reading is
//! lenient: each field is taken from the stored document when it has a usable
//! shape and falls back to the defaults otherwise, and everything goes through
//! the same sanitizers the live mutators use.

use crate::selection::Selection;
use crate::view::{
    sanitize_filters, sanitize_hidden_columns, sanitize_order, sanitize_row_ids, sanitize_sort,
    sanitize_widths,
};
use crate::{
    ColumnId, Error, Result, RowId, SortSpec, TableSchema, UserKey, ViewConfiguration,
    ViewDefaults,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Version of the snapshot format. Newer snapshots are refused.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Serialized form of a user's view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Owner of the snapshot
    pub user_key: UserKey,
    pub order: Vec<ColumnId>,
    pub widths: BTreeMap<ColumnId, u32>,
    pub hidden_columns: Vec<ColumnId>,
    pub filters: BTreeMap<ColumnId, String>,
    pub search: String,
    pub active_unit: String,
    pub page: usize,
    pub page_size: usize,
    pub sort: Option<SortSpec>,
    pub hidden_rows: Vec<RowId>,
    pub row_heights: BTreeMap<RowId, u32>,
    pub selected_rows: Vec<RowId>,
    pub selection_order: Vec<RowId>,
}

impl ViewSnapshot {
    /// Capture a configuration.
    pub fn capture(config: &ViewConfiguration, user_key: &str) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            user_key: user_key.to_string(),
            order: config.order.clone(),
            widths: config.widths.clone(),
            hidden_columns: config.hidden_columns.iter().cloned().collect(),
            filters: config.filters.clone(),
            search: config.search.clone(),
            active_unit: config.active_unit.clone(),
            page: config.page,
            page_size: config.page_size,
            sort: config.sort.clone(),
            hidden_rows: config.hidden_rows.iter().cloned().collect(),
            row_heights: config.row_heights.clone(),
            selected_rows: config.selection.rows().iter().cloned().collect(),
            selection_order: config.selection.order().to_vec(),
        }
    }

    /// Serialize with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Rebuild a configuration from stored JSON.
    ///
    /// Fails only when the document is not a JSON object or was written by a
    /// newer format; individual malformed fields fall back to `defaults`.
    pub fn restore(
        json: &str,
        schema: &TableSchema,
        defaults: &ViewDefaults,
    ) -> Result<ViewConfiguration> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        let Value::Object(saved) = value else {
            return Err(Error::InvalidSnapshot("snapshot is not an object".into()));
        };
        if let Some(version) = saved.get("formatVersion").and_then(Value::as_u64) {
            if version > u64::from(SNAPSHOT_FORMAT_VERSION) {
                return Err(Error::InvalidSnapshot(format!(
                    "unsupported snapshot format version: {} (max supported: {})",
                    version, SNAPSHOT_FORMAT_VERSION
                )));
            }
        }
        Ok(restore_fields(&saved, schema, defaults))
    }
}

fn restore_fields(
    saved: &Map<String, Value>,
    schema: &TableSchema,
    defaults: &ViewDefaults,
) -> ViewConfiguration {
    let mut config = ViewConfiguration::from_defaults(schema, defaults);

    if let Some(order) = string_list(saved.get("order")).filter(|o| !o.is_empty()) {
        config.order = sanitize_order(&order, schema);
    }
    if let Some(Value::Object(widths)) = saved.get("widths") {
        let merged = config
            .widths
            .iter()
            .map(|(id, w)| (id.as_str(), f64::from(*w)))
            .chain(
                widths
                    .iter()
                    .filter_map(|(id, w)| number(w).map(|w| (id.as_str(), w))),
            )
            .filter(|(_, w)| *w > 0.0);
        config.widths = sanitize_widths(merged, schema);
    }
    if let Some(hidden) = string_list(saved.get("hiddenColumns")) {
        config.hidden_columns = sanitize_hidden_columns(&hidden, schema);
    }
    if let Some(Value::Object(filters)) = saved.get("filters") {
        config.filters = sanitize_filters(
            filters
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v))),
            schema,
        );
    }
    if let Some(search) = saved.get("search").and_then(Value::as_str) {
        config.search = search.trim().to_string();
    }
    if let Some(unit) = saved.get("activeUnit").and_then(Value::as_str) {
        config.active_unit = unit.trim().to_string();
    }
    if let Some(page) = saved.get("page").and_then(number) {
        config.page = (page.floor() as usize).max(1);
    }
    if let Some(page_size) = saved.get("pageSize").and_then(number) {
        config.page_size = page_size.max(0.0).floor() as usize;
    }
    match saved.get("sort") {
        Some(Value::Null) => config.sort = None,
        Some(sort) => {
            if let Ok(spec) = serde_json::from_value::<SortSpec>(sort.clone()) {
                config.sort = sanitize_sort(Some(spec), schema);
            }
        }
        None => {}
    }
    if let Some(hidden) = string_list(saved.get("hiddenRows")) {
        config.hidden_rows = sanitize_row_ids(&hidden);
    }
    if let Some(Value::Object(heights)) = saved.get("rowHeights") {
        config.row_heights = heights
            .iter()
            .filter(|(id, _)| !id.is_empty())
            .filter_map(|(id, h)| {
                let h = number(h)?.round();
                (h >= 1.0).then(|| (id.clone(), h.min(f64::from(u32::MAX)) as u32))
            })
            .collect();
    }
    let selected = string_list(saved.get("selectedRows")).unwrap_or_default();
    let order = string_list(saved.get("selectionOrder")).unwrap_or_default();
    config.selection = Selection::reconcile(selected, order);

    config
}

/// A JSON array as strings. Numbers are stringified, other items dropped.
/// Anything that is not an array is `None`.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
    )
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
