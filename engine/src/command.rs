//! Serializable store commands.
//!
//! Every mutator of [`ViewStore`](crate::ViewStore) has a command form,
//! applied with [`ViewStore::dispatch`](crate::ViewStore::dispatch). Listener
//! reactions and the FFI boundary use them. Numeric fields are signed and
//! fractional: out-of-range input is clamped by the store, not rejected by
//! the decoder.

use crate::selection::{DragMode, Rect, RowBox};
use crate::{ColumnId, RowId, SortSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ViewCommand {
    // Columns
    SetColumnOrder {
        order: Vec<ColumnId>,
    },
    SetColumnWidth {
        column: ColumnId,
        width: f64,
    },
    ClearColumnWidth {
        column: ColumnId,
    },
    SetHiddenColumns {
        columns: Vec<ColumnId>,
    },
    HideColumn {
        column: ColumnId,
    },
    ShowColumn {
        column: ColumnId,
    },
    ResetColumns,

    // Rows
    SetHiddenRows {
        rows: Vec<RowId>,
    },
    HideRows {
        rows: Vec<RowId>,
    },
    HideSelectedRows,
    ToggleRowHidden {
        row: RowId,
    },
    ShowAllRows,
    SetRowHeight {
        row: RowId,
        #[serde(default)]
        height: Option<f64>,
    },

    // Filtering, sorting, paging
    SetSearch {
        search: String,
    },
    SetFilter {
        column: ColumnId,
        #[serde(default)]
        value: String,
    },
    ClearFilter {
        column: ColumnId,
    },
    SetFilters {
        filters: BTreeMap<ColumnId, String>,
    },
    SetActiveUnit {
        #[serde(default)]
        unit: String,
    },
    ClearFilters,
    SetSort {
        #[serde(default)]
        sort: Option<SortSpec>,
    },
    ToggleSort {
        column: ColumnId,
    },
    SetPageSize {
        page_size: i64,
    },
    SetPage {
        page: i64,
    },
    ResetView,

    // Selection
    ToggleSelection {
        row: RowId,
        #[serde(default)]
        selected: Option<bool>,
    },
    UpdateSelection {
        #[serde(default)]
        add: Vec<RowId>,
        #[serde(default)]
        remove: Vec<RowId>,
    },
    SetSelectedRows {
        rows: Vec<RowId>,
    },
    ClearSelection,
    SelectPage {
        rows: Vec<RowId>,
        checked: bool,
    },
    SelectRect {
        candidates: Vec<RowBox>,
        rect: Rect,
        #[serde(default)]
        mode: DragMode,
    },

    // Identity
    SetUser {
        #[serde(default)]
        user_key: Option<String>,
    },
}

impl ViewCommand {
    /// Parse a command from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        let cmd = ViewCommand::from_json(r#"{"op":"setPageSize","pageSize":-4}"#).unwrap();
        assert_eq!(cmd, ViewCommand::SetPageSize { page_size: -4 });

        let cmd = ViewCommand::from_json(r#"{"op":"toggleSelection","row":"abc"}"#).unwrap();
        assert_eq!(
            cmd,
            ViewCommand::ToggleSelection {
                row: "abc".into(),
                selected: None
            }
        );

        let json = serde_json::to_string(&ViewCommand::ClearFilters).unwrap();
        assert_eq!(json, r#"{"op":"clearFilters"}"#);
    }

    #[test]
    fn rect_selection_command() {
        let cmd = ViewCommand::from_json(
            r#"{"op":"selectRect","mode":"add",
                "candidates":[{"rowId":"a","left":0,"top":0,"right":10,"bottom":10}],
                "rect":{"left":0,"top":0,"right":5,"bottom":5}}"#,
        )
        .unwrap();
        match cmd {
            ViewCommand::SelectRect { candidates, mode, .. } => {
                assert_eq!(candidates[0].row_id, "a");
                assert_eq!(mode, DragMode::Add);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_op_is_an_error() {
        assert!(ViewCommand::from_json(r#"{"op":"dropTables"}"#).is_err());
    }
}
