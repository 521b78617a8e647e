//! ViewStore - the single owner of a user's view configuration.
//!
//! Every mutation goes through a named operation that sanitizes its input,
//! builds the next configuration and commits it. A commit that would leave
//! the configuration unchanged does nothing: no write, no event. Otherwise
//! the snapshot is persisted under the current user key and listeners get the
//! typed events followed by [`StoreEvent::Change`].
//!
//! Storage failures never reach the caller. A failed write is logged and the
//! store carries on in memory for the rest of its lifetime.

use crate::event::{EventKind, Listeners, Reactions, StoreEvent, SubscriptionId};
use crate::export::{self, CsvExport};
use crate::projection::{self, ViewResult};
use crate::selection::{DragGesture, DragMode, Rect, RowBox};
use crate::snapshot::ViewSnapshot;
use crate::storage::{
    normalize_user_key, storage_key, MemoryStorage, Storage, DEFAULT_STORAGE_PREFIX,
    DEFAULT_USER_KEY,
};
use crate::view::{
    clamp_width, sanitize_filters, sanitize_hidden_columns, sanitize_order, sanitize_row_ids,
    sanitize_sort,
};
use crate::{
    ColumnId, Record, Result, RowId, SortSpec, TableSchema, UserKey, ViewCommand,
    ViewConfiguration, ViewDefaults,
};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Listener reactions nested deeper than this are dropped.
pub const MAX_REACTION_DEPTH: usize = 8;

/// Construction parameters of a [`ViewStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub schema: TableSchema,
    pub defaults: ViewDefaults,
    /// Namespace prepended to the user key in storage
    pub storage_prefix: String,
    /// Key used when no user is given
    pub default_user_key: String,
    /// User to hydrate at construction
    pub user_key: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            schema: TableSchema::inventory(),
            defaults: ViewDefaults::default(),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            default_user_key: DEFAULT_USER_KEY.to_string(),
            user_key: None,
        }
    }
}

impl StoreOptions {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    pub fn with_defaults(mut self, defaults: ViewDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    pub fn with_default_user_key(mut self, key: impl Into<String>) -> Self {
        self.default_user_key = key.into();
        self
    }

    pub fn with_user_key(mut self, key: impl Into<String>) -> Self {
        self.user_key = Some(key.into());
        self
    }
}

/// The view-state store.
pub struct ViewStore {
    schema: TableSchema,
    defaults: ViewDefaults,
    storage: Box<dyn Storage>,
    storage_prefix: String,
    default_user_key: UserKey,
    user_key: UserKey,
    config: ViewConfiguration,
    listeners: Listeners,
    persistence_degraded: bool,
    reaction_depth: usize,
}

impl ViewStore {
    /// Create a store and hydrate the initial user's snapshot, if any.
    /// Hydration at construction emits nothing.
    pub fn new(options: StoreOptions, storage: impl Storage + 'static) -> Self {
        let StoreOptions {
            schema,
            defaults,
            storage_prefix,
            default_user_key,
            user_key,
        } = options;
        let default_user_key = normalize_user_key(Some(&default_user_key), DEFAULT_USER_KEY);
        let user_key = normalize_user_key(user_key.as_deref(), &default_user_key);
        let config = ViewConfiguration::from_defaults(&schema, &defaults);

        let mut store = Self {
            schema,
            defaults,
            storage: Box::new(storage),
            storage_prefix,
            default_user_key,
            user_key,
            config,
            listeners: Listeners::new(),
            persistence_degraded: false,
            reaction_depth: 0,
        };
        if let Some(config) = store.read_snapshot() {
            store.config = config;
        }
        store
    }

    /// A store backed by a fresh [`MemoryStorage`].
    pub fn in_memory(options: StoreOptions) -> Self {
        Self::new(options, MemoryStorage::new())
    }

    /// Current configuration.
    pub fn state(&self) -> &ViewConfiguration {
        &self.config
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn defaults(&self) -> &ViewDefaults {
        &self.defaults
    }

    pub fn user_key(&self) -> &str {
        &self.user_key
    }

    /// Storage key of the current user's snapshot.
    pub fn storage_key(&self) -> String {
        storage_key(&self.storage_prefix, &self.user_key)
    }

    /// Whether a storage failure has switched the store to memory-only.
    pub fn is_persistence_degraded(&self) -> bool {
        self.persistence_degraded
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Listen to one event kind.
    pub fn subscribe<F>(&mut self, kind: EventKind, mut handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &ViewConfiguration) + 'static,
    {
        self.listeners
            .subscribe(Some(kind), move |event, state, _| handler(event, state))
    }

    /// Listen to every event.
    pub fn subscribe_all<F>(&mut self, mut handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &ViewConfiguration) + 'static,
    {
        self.listeners
            .subscribe(None, move |event, state, _| handler(event, state))
    }

    /// Listen with the ability to queue follow-up commands. `None` listens to
    /// every event.
    pub fn subscribe_reactive<F>(&mut self, kind: Option<EventKind>, handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &ViewConfiguration, &mut Reactions) + 'static,
    {
        self.listeners.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Reorder columns. Unknown ids are dropped and missing ones appended.
    pub fn set_column_order<S: AsRef<str>>(&mut self, order: &[S]) -> bool {
        let mut next = self.config.clone();
        next.order = sanitize_order(order, &self.schema);
        self.commit(next, |c| vec![StoreEvent::columns_order(c)])
    }

    /// Set a column width, floored at the schema minimum.
    pub fn set_column_width(&mut self, column: &str, width: u32) -> bool {
        let column = column.trim();
        if !self.schema.contains(column) {
            return false;
        }
        let mut next = self.config.clone();
        next.widths
            .insert(column.to_string(), clamp_width(width, &self.schema));
        self.commit(next, |c| vec![StoreEvent::columns_width(c, Some(column))])
    }

    /// Restore a column's default width.
    pub fn clear_column_width(&mut self, column: &str) -> bool {
        let column = column.trim();
        if !self.schema.contains(column) {
            return false;
        }
        let width = clamp_width(self.schema.default_width(column), &self.schema);
        let mut next = self.config.clone();
        next.widths.insert(column.to_string(), width);
        self.commit(next, |c| vec![StoreEvent::columns_width(c, Some(column))])
    }

    pub fn set_hidden_columns<I, S>(&mut self, columns: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.config.clone();
        next.hidden_columns = sanitize_hidden_columns(columns, &self.schema);
        self.commit(next, |c| vec![StoreEvent::columns_hidden(c)])
    }

    pub fn hide_column(&mut self, column: &str) -> bool {
        let column = column.trim();
        if !self.schema.contains(column) {
            return false;
        }
        let mut next = self.config.clone();
        next.hidden_columns.insert(column.to_string());
        self.commit(next, |c| vec![StoreEvent::columns_hidden(c)])
    }

    pub fn show_column(&mut self, column: &str) -> bool {
        let mut next = self.config.clone();
        next.hidden_columns.remove(column.trim());
        self.commit(next, |c| vec![StoreEvent::columns_hidden(c)])
    }

    /// Default order, widths and hidden columns.
    pub fn reset_columns(&mut self) -> bool {
        let mut next = self.config.clone();
        next.order = self.schema.reconciled_default_order();
        next.widths = self.schema.default_widths();
        next.hidden_columns = sanitize_hidden_columns(&self.defaults.hidden_columns, &self.schema);
        self.commit(next, |c| {
            vec![
                StoreEvent::columns_order(c),
                StoreEvent::columns_hidden(c),
                StoreEvent::columns_width(c, None),
            ]
        })
    }

    // =========================================================================
    // Rows
    // =========================================================================

    pub fn set_hidden_rows<I, S>(&mut self, rows: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.config.clone();
        next.hidden_rows = sanitize_row_ids(rows);
        self.commit(next, |c| vec![StoreEvent::rows_hidden(c)])
    }

    /// Hide rows and drop them from the selection.
    pub fn hide_rows<I, S>(&mut self, rows: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = sanitize_row_ids(rows);
        if rows.is_empty() {
            return false;
        }
        let mut next = self.config.clone();
        next.hidden_rows.extend(rows.iter().cloned());
        let deselected = next.selection.bulk_update(std::iter::empty::<&str>(), &rows);
        self.commit(next, |c| {
            let mut events = vec![StoreEvent::rows_hidden(c)];
            if deselected {
                events.push(StoreEvent::selection(c));
            }
            events
        })
    }

    pub fn hide_selected_rows(&mut self) -> bool {
        let selected = self.config.selection.order().to_vec();
        self.hide_rows(selected)
    }

    pub fn toggle_row_hidden(&mut self, row: &str) -> bool {
        if row.is_empty() {
            return false;
        }
        let mut next = self.config.clone();
        if !next.hidden_rows.remove(row) {
            next.hidden_rows.insert(row.to_string());
        }
        self.commit(next, |c| vec![StoreEvent::rows_hidden(c)])
    }

    pub fn show_all_rows(&mut self) -> bool {
        let mut next = self.config.clone();
        next.hidden_rows.clear();
        self.commit(next, |c| vec![StoreEvent::rows_hidden(c)])
    }

    /// Override a row height. `None` or zero removes the override.
    pub fn set_row_height(&mut self, row: &str, height: Option<u32>) -> bool {
        if row.is_empty() {
            return false;
        }
        let mut next = self.config.clone();
        match height.filter(|h| *h > 0) {
            Some(height) => {
                next.row_heights.insert(row.to_string(), height);
            }
            None => {
                next.row_heights.remove(row);
            }
        }
        self.commit(next, |c| vec![StoreEvent::rows_height(c, Some(row))])
    }

    // =========================================================================
    // Filtering, sorting, paging
    // =========================================================================

    /// Set the free-text search. Resets to the first page.
    pub fn set_search(&mut self, search: &str) -> bool {
        let mut next = self.config.clone();
        next.search = search.trim().to_string();
        self.commit_filters(next)
    }

    /// Set or, with a blank value, clear one column filter. Filters on
    /// unknown columns are ignored.
    pub fn set_filter(&mut self, column: &str, value: &str) -> bool {
        let column = column.trim();
        if !self.schema.contains(column) {
            return false;
        }
        let mut next = self.config.clone();
        let value = value.trim();
        if value.is_empty() {
            next.filters.remove(column);
        } else {
            next.filters.insert(column.to_string(), value.to_string());
        }
        self.commit_filters(next)
    }

    pub fn clear_filter(&mut self, column: &str) -> bool {
        self.set_filter(column, "")
    }

    /// Replace every column filter at once.
    pub fn set_filters(&mut self, filters: &BTreeMap<ColumnId, String>) -> bool {
        let mut next = self.config.clone();
        next.filters = sanitize_filters(
            filters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            &self.schema,
        );
        self.commit_filters(next)
    }

    /// Select the unit facet; an empty value shows every unit.
    pub fn set_active_unit(&mut self, unit: &str) -> bool {
        let mut next = self.config.clone();
        next.active_unit = unit.trim().to_string();
        self.commit_filters(next)
    }

    /// Drop column filters, search and facet together.
    pub fn clear_filters(&mut self) -> bool {
        let mut next = self.config.clone();
        next.filters.clear();
        next.search.clear();
        next.active_unit.clear();
        self.commit_filters(next)
    }

    fn commit_filters(&mut self, mut next: ViewConfiguration) -> bool {
        if next.filters == self.config.filters
            && next.search == self.config.search
            && next.active_unit == self.config.active_unit
        {
            return false;
        }
        next.page = 1;
        self.commit(next, |c| vec![StoreEvent::filters(c)])
    }

    /// Set the sort. A sort on an unknown column is ignored.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) -> bool {
        if sort.as_ref().is_some_and(|s| !self.schema.contains(&s.column)) {
            return false;
        }
        let mut next = self.config.clone();
        next.sort = sanitize_sort(sort, &self.schema);
        self.commit(next, |c| vec![StoreEvent::sort(c)])
    }

    /// Header click: flip the direction on the active column, otherwise
    /// start sorting by `column` in its initial direction.
    pub fn toggle_sort(&mut self, column: &str) -> bool {
        let column = column.trim();
        if !self.schema.contains(column) {
            return false;
        }
        let sort = match &self.config.sort {
            Some(current) if current.column == column => {
                SortSpec::new(column, current.direction.reversed())
            }
            _ => SortSpec::initial_for(column, &self.schema),
        };
        self.set_sort(Some(sort))
    }

    /// Rows per page, 0 for unpaginated. Resets to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if page_size == self.config.page_size {
            return false;
        }
        let mut next = self.config.clone();
        next.page_size = page_size;
        next.page = 1;
        self.commit(next, |c| vec![StoreEvent::page(c)])
    }

    /// Go to a 1-based page. Range clamping against the data happens in
    /// [`ViewStore::build_view`].
    pub fn set_page(&mut self, page: usize) -> bool {
        let mut next = self.config.clone();
        next.page = page.max(1);
        self.commit(next, |c| vec![StoreEvent::page(c)])
    }

    /// Everything back to defaults, selection and hidden rows included.
    pub fn reset_view(&mut self) -> bool {
        let next = ViewConfiguration::from_defaults(&self.schema, &self.defaults);
        self.commit(next, |c| {
            vec![
                StoreEvent::columns_order(c),
                StoreEvent::columns_hidden(c),
                StoreEvent::columns_width(c, None),
                StoreEvent::rows_hidden(c),
                StoreEvent::rows_height(c, None),
                StoreEvent::filters(c),
                StoreEvent::page(c),
                StoreEvent::sort(c),
                StoreEvent::selection(c),
            ]
        })
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn toggle_selection(&mut self, row: &str, selected: Option<bool>) -> bool {
        let mut next = self.config.clone();
        next.selection.toggle(row, selected);
        self.commit_selection(next)
    }

    /// Add and remove in one step; removal wins.
    pub fn update_selection<A, R, S, T>(&mut self, add: A, remove: R) -> bool
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut next = self.config.clone();
        next.selection.bulk_update(add, remove);
        self.commit_selection(next)
    }

    pub fn set_selected_rows<I, S>(&mut self, rows: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.config.clone();
        next.selection.replace_with(rows);
        self.commit_selection(next)
    }

    pub fn clear_selection(&mut self) -> bool {
        let mut next = self.config.clone();
        next.selection.clear();
        self.commit_selection(next)
    }

    /// "Select all on this page" checkbox.
    pub fn select_page<I, S>(&mut self, rows: I, checked: bool) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let none = std::iter::empty::<&str>();
        let mut next = self.config.clone();
        if checked {
            next.selection.bulk_update(rows, none);
        } else {
            next.selection.bulk_update(none, rows);
        }
        self.commit_selection(next)
    }

    /// Apply a finished rectangle selection.
    pub fn select_rect(&mut self, candidates: &[RowBox], rect: Rect, mode: DragMode) -> bool {
        let mut next = self.config.clone();
        next.selection.intersect_with_rect(candidates, rect, mode);
        self.commit_selection(next)
    }

    /// Pointer-up of a drag gesture. A click (no drag) changes nothing.
    pub fn commit_drag(&mut self, gesture: DragGesture, x: f64, y: f64, candidates: &[RowBox]) -> bool {
        match gesture.finish(x, y) {
            Some((rect, mode)) => self.select_rect(candidates, rect, mode),
            None => false,
        }
    }

    fn commit_selection(&mut self, next: ViewConfiguration) -> bool {
        self.commit(next, |c| vec![StoreEvent::selection(c)])
    }

    // =========================================================================
    // Identity and persistence
    // =========================================================================

    /// Switch user. In-memory state of the previous user is dropped and the
    /// new user's snapshot is loaded, or defaults when there is none.
    pub fn set_user(&mut self, user_key: Option<&str>) -> bool {
        let key = normalize_user_key(user_key, &self.default_user_key);
        if key == self.user_key {
            return false;
        }
        debug!(from = %self.user_key, to = %key, "switching view user");
        self.user_key = key;
        let loaded = self.read_snapshot();
        let hydrated = loaded.is_some();
        self.config = loaded
            .unwrap_or_else(|| ViewConfiguration::from_defaults(&self.schema, &self.defaults));

        let mut events = vec![StoreEvent::UserChange {
            user_key: self.user_key.clone(),
        }];
        if hydrated {
            events.push(StoreEvent::Hydrate {
                user_key: self.user_key.clone(),
            });
        }
        events.push(StoreEvent::Change);
        self.emit(events);
        true
    }

    /// Re-read the current user's snapshot. Returns whether one was applied.
    pub fn load_from_storage(&mut self) -> bool {
        let Some(config) = self.read_snapshot() else {
            return false;
        };
        self.config = config;
        self.emit(vec![
            StoreEvent::Hydrate {
                user_key: self.user_key.clone(),
            },
            StoreEvent::Change,
        ]);
        true
    }

    fn read_snapshot(&mut self) -> Option<ViewConfiguration> {
        if self.persistence_degraded {
            return None;
        }
        let key = self.storage_key();
        match self.storage.get(&key) {
            Ok(None) => None,
            Ok(Some(json)) => match ViewSnapshot::restore(&json, &self.schema, &self.defaults) {
                Ok(config) => {
                    debug!(key = %key, "view snapshot hydrated");
                    Some(config)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "ignoring unreadable view snapshot");
                    None
                }
            },
            Err(e) => {
                warn!(key = %key, error = %e, "view storage unavailable, continuing in memory");
                self.persistence_degraded = true;
                None
            }
        }
    }

    fn persist(&mut self) {
        if self.persistence_degraded {
            return;
        }
        let key = self.storage_key();
        let written = ViewSnapshot::capture(&self.config, &self.user_key)
            .to_json()
            .and_then(|json| self.storage.set(&key, &json));
        match written {
            Ok(()) => debug!(key = %key, "view snapshot persisted"),
            Err(e) => {
                warn!(key = %key, error = %e, "persisting view snapshot failed, continuing in memory");
                self.persistence_degraded = true;
            }
        }
    }

    // =========================================================================
    // Commit and notification
    // =========================================================================

    fn commit<F>(&mut self, next: ViewConfiguration, events: F) -> bool
    where
        F: FnOnce(&ViewConfiguration) -> Vec<StoreEvent>,
    {
        if next == self.config {
            return false;
        }
        self.config = next;
        self.persist();
        let mut events = events(&self.config);
        events.push(StoreEvent::Change);
        self.emit(events);
        true
    }

    fn emit(&mut self, events: Vec<StoreEvent>) {
        let mut reactions = Reactions::default();
        for event in &events {
            self.listeners.notify(event, &self.config, &mut reactions);
        }
        if reactions.is_empty() {
            return;
        }
        if self.reaction_depth >= MAX_REACTION_DEPTH {
            warn!(
                depth = self.reaction_depth,
                "dropping listener reactions, mutation chain too deep"
            );
            return;
        }
        self.reaction_depth += 1;
        for command in reactions.into_commands() {
            self.dispatch(command);
        }
        self.reaction_depth -= 1;
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Apply a command. Numeric input is clamped: negative page sizes become
    /// 0, pages below 1 become 1, non-positive row heights clear the override.
    pub fn dispatch(&mut self, command: ViewCommand) -> bool {
        match command {
            ViewCommand::SetColumnOrder { order } => self.set_column_order(&order),
            ViewCommand::SetColumnWidth { column, width } => match to_u32(width) {
                Some(width) => self.set_column_width(&column, width),
                None => false,
            },
            ViewCommand::ClearColumnWidth { column } => self.clear_column_width(&column),
            ViewCommand::SetHiddenColumns { columns } => self.set_hidden_columns(&columns),
            ViewCommand::HideColumn { column } => self.hide_column(&column),
            ViewCommand::ShowColumn { column } => self.show_column(&column),
            ViewCommand::ResetColumns => self.reset_columns(),

            ViewCommand::SetHiddenRows { rows } => self.set_hidden_rows(&rows),
            ViewCommand::HideRows { rows } => self.hide_rows(&rows),
            ViewCommand::HideSelectedRows => self.hide_selected_rows(),
            ViewCommand::ToggleRowHidden { row } => self.toggle_row_hidden(&row),
            ViewCommand::ShowAllRows => self.show_all_rows(),
            ViewCommand::SetRowHeight { row, height } => {
                self.set_row_height(&row, height.and_then(to_u32))
            }

            ViewCommand::SetSearch { search } => self.set_search(&search),
            ViewCommand::SetFilter { column, value } => self.set_filter(&column, &value),
            ViewCommand::ClearFilter { column } => self.clear_filter(&column),
            ViewCommand::SetFilters { filters } => self.set_filters(&filters),
            ViewCommand::SetActiveUnit { unit } => self.set_active_unit(&unit),
            ViewCommand::ClearFilters => self.clear_filters(),
            ViewCommand::SetSort { sort } => self.set_sort(sort),
            ViewCommand::ToggleSort { column } => self.toggle_sort(&column),
            ViewCommand::SetPageSize { page_size } => {
                self.set_page_size(usize::try_from(page_size.max(0)).unwrap_or(usize::MAX))
            }
            ViewCommand::SetPage { page } => {
                self.set_page(usize::try_from(page.max(1)).unwrap_or(usize::MAX))
            }
            ViewCommand::ResetView => self.reset_view(),

            ViewCommand::ToggleSelection { row, selected } => self.toggle_selection(&row, selected),
            ViewCommand::UpdateSelection { add, remove } => self.update_selection(&add, &remove),
            ViewCommand::SetSelectedRows { rows } => self.set_selected_rows(&rows),
            ViewCommand::ClearSelection => self.clear_selection(),
            ViewCommand::SelectPage { rows, checked } => self.select_page(&rows, checked),
            ViewCommand::SelectRect {
                candidates,
                rect,
                mode,
            } => self.select_rect(&candidates, rect, mode),

            ViewCommand::SetUser { user_key } => self.set_user(user_key.as_deref()),
        }
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Project `records` through the current configuration. An out-of-range
    /// page is written back before the result is returned, again if a
    /// reaction moves it out of range, up to the reaction depth limit.
    pub fn build_view<'a>(&mut self, records: &'a [Record]) -> ViewResult<'a> {
        let mut view = projection::build_view(records, &self.config, &self.schema);
        let mut rounds = 0;
        while view.projection.page.clamped && rounds < MAX_REACTION_DEPTH {
            self.set_page(view.projection.page.page);
            view = projection::build_view(records, &self.config, &self.schema);
            rounds += 1;
        }
        if view.projection.page.clamped {
            warn!(
                stored = self.config.page,
                shown = view.projection.page.page,
                "page kept leaving range; view and stored page differ"
            );
        }
        view
    }

    /// Row ids on the current page, for "select all on this page".
    pub fn page_row_ids(&self, records: &[Record]) -> Vec<RowId> {
        projection::project(records, &self.config, &self.schema).page_row_ids()
    }

    /// CSV of every row passing the filters. `Ok(None)` when nothing does.
    pub fn export_csv(&self, records: &[Record]) -> Result<Option<CsvExport>> {
        export::export_csv(records, &self.config, &self.schema)
    }
}

impl fmt::Debug for ViewStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewStore")
            .field("user_key", &self.user_key)
            .field("storage_prefix", &self.storage_prefix)
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .field("persistence_degraded", &self.persistence_degraded)
            .finish()
    }
}

/// Round a boundary number into `u32`; non-finite input is rejected and
/// negative input becomes 0.
fn to_u32(value: f64) -> Option<u32> {
    value
        .is_finite()
        .then(|| value.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Modifiers;
    use crate::{Direction, Error};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> ViewStore {
        ViewStore::in_memory(StoreOptions::default())
    }

    fn record_events(store: &mut ViewStore) -> Rc<RefCell<Vec<EventKind>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe_all(move |event, _| sink.borrow_mut().push(event.kind()));
        seen
    }

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".into()))
        }
    }

    #[test]
    fn no_op_setters_emit_nothing() {
        let mut store = store();
        let seen = record_events(&mut store);
        let order = store.state().order.clone();

        assert!(!store.set_column_order(&order));
        assert!(!store.set_search(""));
        assert!(!store.set_page(1));
        assert!(!store.set_page_size(50));
        assert!(!store.show_column("name"));
        assert!(!store.clear_selection());
        assert!(!store.set_sort(Some(SortSpec::asc("name"))));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn typed_event_then_change() {
        let mut store = store();
        let seen = record_events(&mut store);
        assert!(store.hide_column("hash"));
        assert_eq!(*seen.borrow(), [EventKind::ColumnsHidden, EventKind::Change]);
    }

    #[test]
    fn filters_reset_page() {
        let mut store = store();
        store.set_page(4);
        assert!(store.set_search("  movie "));
        assert_eq!(store.state().search, "movie");
        assert_eq!(store.state().page, 1);

        store.set_page(3);
        assert!(store.set_filter("size", ">1gb"));
        assert_eq!(store.state().page, 1);
        assert!(!store.set_filter("ghost", "x"));

        store.set_page(2);
        assert!(store.set_active_unit("D"));
        assert_eq!(store.state().page, 1);

        assert!(store.clear_filters());
        assert!(!store.state().has_filters());
        assert!(!store.clear_filters());
    }

    #[test]
    fn page_size_resets_page_and_sort_keeps_it() {
        let mut store = store();
        store.set_page(3);
        assert!(store.toggle_sort("size"));
        assert_eq!(store.state().page, 3);
        assert_eq!(store.state().sort, Some(SortSpec::desc("size")));
        assert!(store.toggle_sort("size"));
        assert_eq!(store.state().sort.as_ref().map(|s| s.direction), Some(Direction::Asc));

        assert!(store.set_page_size(10));
        assert_eq!(store.state().page, 1);
    }

    #[test]
    fn column_width_is_floored() {
        let mut store = store();
        assert!(store.set_column_width("name", 10));
        assert_eq!(store.state().widths["name"], 80);
        assert!(!store.set_column_width("ghost", 300));
        assert!(store.clear_column_width("name"));
        assert_eq!(store.state().widths["name"], 260);
    }

    #[test]
    fn hide_rows_deselects_them() {
        let mut store = store();
        store.set_selected_rows(["a", "b", "c"]);
        let seen = record_events(&mut store);
        assert!(store.hide_rows(["b", ""]));
        assert_eq!(store.state().selection.order(), ["a", "c"]);
        assert!(store.state().hidden_rows.contains("b"));
        assert_eq!(
            *seen.borrow(),
            [EventKind::RowsHidden, EventKind::SelectionChange, EventKind::Change]
        );

        assert!(store.hide_selected_rows());
        assert!(store.state().selection.is_empty());
        assert_eq!(store.state().hidden_rows.len(), 3);
        assert!(store.show_all_rows());
    }

    #[test]
    fn row_height_override() {
        let mut store = store();
        assert!(store.set_row_height("a", Some(48)));
        assert_eq!(store.state().row_heights["a"], 48);
        assert!(store.set_row_height("a", Some(0)));
        assert!(store.state().row_heights.is_empty());
        assert!(!store.set_row_height("a", None));
    }

    #[test]
    fn write_failure_degrades_to_memory() {
        let mut store = ViewStore::new(StoreOptions::default(), FailingStorage);
        assert!(store.set_search("x"));
        assert!(store.is_persistence_degraded());
        assert!(store.set_search("y"));
        assert_eq!(store.state().search, "y");
    }

    #[test]
    fn select_page_and_drag() {
        let mut store = store();
        assert!(store.select_page(["a", "b"], true));
        assert!(store.select_page(["a"], false));
        assert_eq!(store.state().selection.order(), ["b"]);

        let boxes = vec![
            RowBox::new("a", Rect::new(0.0, 0.0, 100.0, 19.0)),
            RowBox::new("c", Rect::new(0.0, 20.0, 100.0, 39.0)),
        ];
        let gesture = DragGesture::begin(
            5.0,
            5.0,
            Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        );
        assert!(store.commit_drag(gesture, 50.0, 30.0, &boxes));
        assert_eq!(store.state().selection.order(), ["b", "a", "c"]);

        let click = DragGesture::begin(5.0, 5.0, Modifiers::default());
        assert!(!store.commit_drag(click, 6.0, 7.0, &boxes));
    }

    #[test]
    fn reactions_run_after_notifications() {
        let mut store = store();
        store.subscribe_reactive(Some(EventKind::FiltersChange), |_, state, reactions| {
            if !state.selection.is_empty() {
                reactions.push(ViewCommand::ClearSelection);
            }
        });
        store.set_selected_rows(["a"]);
        assert!(store.set_search("foo"));
        assert!(store.state().selection.is_empty());
    }

    #[test]
    fn reaction_cycles_are_cut() {
        let mut store = store();
        let calls = Rc::new(RefCell::new(0usize));
        let counter = calls.clone();
        store.subscribe_reactive(Some(EventKind::PageChange), move |_, state, reactions| {
            *counter.borrow_mut() += 1;
            reactions.push(ViewCommand::SetPage {
                page: state.page as i64 + 1,
            });
        });
        assert!(store.set_page(2));
        assert_eq!(*calls.borrow(), MAX_REACTION_DEPTH + 1);
        assert_eq!(store.state().page, 2 + MAX_REACTION_DEPTH);
    }

    #[test]
    fn build_view_reclamps_after_reactions() {
        let records: Vec<Record> = (0..30)
            .map(|i| Record {
                hash: Some(format!("h{:02}", i)),
                name: format!("file{:02}", i),
                ..Record::default()
            })
            .collect();
        let mut store = store();
        store.set_page_size(10);
        store.set_page(5);

        let fired = Rc::new(RefCell::new(false));
        let flag = fired.clone();
        store.subscribe_reactive(Some(EventKind::PageChange), move |_, _, reactions| {
            if !flag.replace(true) {
                reactions.push(ViewCommand::SetPage { page: 50 });
            }
        });

        let view = store.build_view(&records);
        assert!(*fired.borrow());
        assert!(!view.page().clamped);
        assert_eq!(view.page().page, 3);
        assert_eq!(store.state().page, 3);
    }

    #[test]
    fn dispatch_clamps_numbers() {
        let mut store = store();
        assert!(store.dispatch(ViewCommand::SetPageSize { page_size: -5 }));
        assert_eq!(store.state().page_size, 0);
        assert!(!store.dispatch(ViewCommand::SetPage { page: -3 }));
        assert_eq!(store.state().page, 1);
        assert!(!store.dispatch(ViewCommand::SetColumnWidth {
            column: "name".into(),
            width: f64::NAN,
        }));
        assert!(store.dispatch(ViewCommand::SetColumnWidth {
            column: "name".into(),
            width: 311.6,
        }));
        assert_eq!(store.state().widths["name"], 312);
    }

    #[test]
    fn reset_view_clears_everything() {
        let mut store = store();
        store.set_selected_rows(["a"]);
        store.hide_rows(["z"]);
        store.set_search("q");
        store.hide_column("hash");
        let seen = record_events(&mut store);
        assert!(store.reset_view());
        assert_eq!(
            *store.state(),
            ViewConfiguration::from_defaults(store.schema(), store.defaults())
        );
        assert_eq!(seen.borrow().last(), Some(&EventKind::Change));
        assert!(!store.reset_view());
    }
}
