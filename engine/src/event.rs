//! Typed change notifications and the listener registry.
//!
//! Every effective mutation emits one or more typed [`StoreEvent`]s followed
//! by a generic [`StoreEvent::Change`]. Listeners subscribe to a single
//! [`EventKind`] or to everything. The string names (`columns:order`, ...)
//! exist for the FFI boundary and for logging.
//!
//! Listeners cannot borrow the store while it notifies them. A listener that
//! wants to react with a mutation queues a [`ViewCommand`] on the
//! [`Reactions`] it is handed; the store runs queued commands once the
//! current round of notifications is over.

use crate::{ColumnId, RowId, SortSpec, ViewCommand, ViewConfiguration};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A change notification with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all_fields = "camelCase")]
pub enum StoreEvent {
    #[serde(rename = "columns:order")]
    ColumnsOrder { order: Vec<ColumnId> },
    #[serde(rename = "columns:hidden")]
    ColumnsHidden { hidden: Vec<ColumnId> },
    #[serde(rename = "columns:width")]
    ColumnsWidth {
        column: Option<ColumnId>,
        widths: BTreeMap<ColumnId, u32>,
    },
    #[serde(rename = "rows:hidden")]
    RowsHidden { hidden: Vec<RowId> },
    #[serde(rename = "rows:height")]
    RowsHeight {
        row: Option<RowId>,
        heights: BTreeMap<RowId, u32>,
    },
    #[serde(rename = "filters:change")]
    FiltersChange {
        filters: BTreeMap<ColumnId, String>,
        search: String,
        active_unit: String,
        page: usize,
    },
    #[serde(rename = "page:change")]
    PageChange { page: usize, page_size: usize },
    #[serde(rename = "sort:change")]
    SortChange { sort: Option<SortSpec> },
    #[serde(rename = "selection:change")]
    SelectionChange { order: Vec<RowId> },
    #[serde(rename = "user:change")]
    UserChange { user_key: String },
    #[serde(rename = "view:hydrate")]
    Hydrate { user_key: String },
    #[serde(rename = "change")]
    Change,
}

impl StoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StoreEvent::ColumnsOrder { .. } => EventKind::ColumnsOrder,
            StoreEvent::ColumnsHidden { .. } => EventKind::ColumnsHidden,
            StoreEvent::ColumnsWidth { .. } => EventKind::ColumnsWidth,
            StoreEvent::RowsHidden { .. } => EventKind::RowsHidden,
            StoreEvent::RowsHeight { .. } => EventKind::RowsHeight,
            StoreEvent::FiltersChange { .. } => EventKind::FiltersChange,
            StoreEvent::PageChange { .. } => EventKind::PageChange,
            StoreEvent::SortChange { .. } => EventKind::SortChange,
            StoreEvent::SelectionChange { .. } => EventKind::SelectionChange,
            StoreEvent::UserChange { .. } => EventKind::UserChange,
            StoreEvent::Hydrate { .. } => EventKind::Hydrate,
            StoreEvent::Change => EventKind::Change,
        }
    }

    pub(crate) fn columns_order(config: &ViewConfiguration) -> Self {
        StoreEvent::ColumnsOrder {
            order: config.order.clone(),
        }
    }

    pub(crate) fn columns_hidden(config: &ViewConfiguration) -> Self {
        StoreEvent::ColumnsHidden {
            hidden: config.hidden_columns.iter().cloned().collect(),
        }
    }

    pub(crate) fn columns_width(config: &ViewConfiguration, column: Option<&str>) -> Self {
        StoreEvent::ColumnsWidth {
            column: column.map(str::to_string),
            widths: config.widths.clone(),
        }
    }

    pub(crate) fn rows_hidden(config: &ViewConfiguration) -> Self {
        StoreEvent::RowsHidden {
            hidden: config.hidden_rows.iter().cloned().collect(),
        }
    }

    pub(crate) fn rows_height(config: &ViewConfiguration, row: Option<&str>) -> Self {
        StoreEvent::RowsHeight {
            row: row.map(str::to_string),
            heights: config.row_heights.clone(),
        }
    }

    pub(crate) fn filters(config: &ViewConfiguration) -> Self {
        StoreEvent::FiltersChange {
            filters: config.filters.clone(),
            search: config.search.clone(),
            active_unit: config.active_unit.clone(),
            page: config.page,
        }
    }

    pub(crate) fn page(config: &ViewConfiguration) -> Self {
        StoreEvent::PageChange {
            page: config.page,
            page_size: config.page_size,
        }
    }

    pub(crate) fn sort(config: &ViewConfiguration) -> Self {
        StoreEvent::SortChange {
            sort: config.sort.clone(),
        }
    }

    pub(crate) fn selection(config: &ViewConfiguration) -> Self {
        StoreEvent::SelectionChange {
            order: config.selection.order().to_vec(),
        }
    }
}

/// Event names, used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ColumnsOrder,
    ColumnsHidden,
    ColumnsWidth,
    RowsHidden,
    RowsHeight,
    FiltersChange,
    PageChange,
    SortChange,
    SelectionChange,
    UserChange,
    Hydrate,
    Change,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::ColumnsOrder,
        EventKind::ColumnsHidden,
        EventKind::ColumnsWidth,
        EventKind::RowsHidden,
        EventKind::RowsHeight,
        EventKind::FiltersChange,
        EventKind::PageChange,
        EventKind::SortChange,
        EventKind::SelectionChange,
        EventKind::UserChange,
        EventKind::Hydrate,
        EventKind::Change,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ColumnsOrder => "columns:order",
            EventKind::ColumnsHidden => "columns:hidden",
            EventKind::ColumnsWidth => "columns:width",
            EventKind::RowsHidden => "rows:hidden",
            EventKind::RowsHeight => "rows:height",
            EventKind::FiltersChange => "filters:change",
            EventKind::PageChange => "page:change",
            EventKind::SortChange => "sort:change",
            EventKind::SelectionChange => "selection:change",
            EventKind::UserChange => "user:change",
            EventKind::Hydrate => "view:hydrate",
            EventKind::Change => "change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event: {}", s))
    }
}

/// Commands queued by listeners, run after the current notification round.
#[derive(Debug, Default)]
pub struct Reactions {
    queued: Vec<ViewCommand>,
}

impl Reactions {
    pub fn push(&mut self, command: ViewCommand) {
        self.queued.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub(crate) fn into_commands(self) -> Vec<ViewCommand> {
        self.queued
    }
}

/// Handle returned by a subscription.
pub type SubscriptionId = u64;

type Handler = Box<dyn FnMut(&StoreEvent, &ViewConfiguration, &mut Reactions)>;

struct Listener {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: Handler,
}

/// Listener registry owned by a store.
#[derive(Default)]
pub struct Listeners {
    next_id: SubscriptionId,
    entries: Vec<Listener>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one kind, or for every event when `kind` is
    /// `None`.
    pub fn subscribe<F>(&mut self, kind: Option<EventKind>, handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &ViewConfiguration, &mut Reactions) + 'static,
    {
        self.next_id += 1;
        self.entries.push(Listener {
            id: self.next_id,
            kind,
            handler: Box::new(handler),
        });
        self.next_id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|l| l.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver an event to matching handlers in subscription order.
    pub fn notify(&mut self, event: &StoreEvent, state: &ViewConfiguration, reactions: &mut Reactions) {
        let kind = event.kind();
        for listener in &mut self.entries {
            if listener.kind.map_or(true, |k| k == kind) {
                (listener.handler)(event, state, reactions);
            }
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TableSchema, ViewDefaults};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn state() -> ViewConfiguration {
        ViewConfiguration::from_defaults(&TableSchema::inventory(), &ViewDefaults::default())
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("columns:bogus".parse::<EventKind>().is_err());
    }

    #[test]
    fn serialized_shape() {
        let event = StoreEvent::PageChange { page: 2, page_size: 25 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "page:change");
        assert_eq!(json["detail"]["pageSize"], 25);
        assert_eq!(serde_json::to_value(StoreEvent::Change).unwrap()["type"], "change");
    }

    #[test]
    fn filtered_delivery_and_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::new();

        let sink = seen.clone();
        let pages = listeners.subscribe(Some(EventKind::PageChange), move |event, _, _| {
            sink.borrow_mut().push(event.kind());
        });
        let sink = seen.clone();
        listeners.subscribe(None, move |event, _, _| {
            sink.borrow_mut().push(event.kind());
        });

        let state = state();
        let mut reactions = Reactions::default();
        listeners.notify(&StoreEvent::page(&state), &state, &mut reactions);
        listeners.notify(&StoreEvent::Change, &state, &mut reactions);
        assert_eq!(
            *seen.borrow(),
            [EventKind::PageChange, EventKind::PageChange, EventKind::Change]
        );

        assert!(listeners.unsubscribe(pages));
        assert!(!listeners.unsubscribe(pages));
        assert_eq!(listeners.len(), 1);
    }
}
