//! # Inventory Engine
//!
//! View-state store and filter/sort/selection engine for inventory tables.
//!
//! This crate owns everything a table UI over a file inventory needs apart
//! from drawing pixels: turning loosely shaped scanner output into records,
//! filtering, sorting and paging them, keeping an ordered multi-row
//! selection, and persisting each user's layout and filters.
//!
//! ## Design Principles
//!
//! - **No network, no runtime**: persistence goes through the injected
//!   [`Storage`] trait only
//! - **Deterministic**: the same records and configuration always project to
//!   the same rows in the same order
//! - **Never fails the caller**: bad input is sanitized, storage failures are
//!   logged and the store keeps working in memory
//! - **Portable**: usable natively or through the C ABI in [`ffi`]
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! [`Record`]s are produced by the [`Normalizer`] from raw JSON rows using an
//! ordered alias table per field. A record's row id is its hash, or path,
//! name and size joined when there is no hash.
//!
//! ### View configuration
//!
//! [`ViewConfiguration`] holds column order and widths, hidden columns and
//! rows, filters, search, unit facet, paging, sort and the [`Selection`].
//! The [`ViewStore`] owns one per user key and is the only way to change it.
//!
//! ### Events
//!
//! Every effective mutation emits typed [`StoreEvent`]s followed by
//! [`StoreEvent::Change`]. A no-op mutation emits nothing and writes nothing.
//!
//! ### Projection
//!
//! [`build_view`] filters, sorts and paginates records and computes the
//! aggregate breakdowns; [`export_csv`] writes every filtered row.
//!
//! ## Quick Start
//!
//! ```rust
//! use inventory_engine::{Dataset, StoreOptions, ViewStore};
//! use serde_json::json;
//!
//! // 1. Load raw rows
//! let dataset = Dataset::from_raw(&[
//!     json!({"hash": "a1", "nombre": "movie.mkv", "unidad": "D", "tamano": 3_000_000}),
//!     json!({"hash": "b2", "nombre": "song.mp3", "unidad": "E", "tamano": 4_000}),
//! ]);
//!
//! // 2. Create a store (in-memory persistence)
//! let mut store = ViewStore::in_memory(StoreOptions::default());
//!
//! // 3. Mutate through named operations
//! store.set_filter("size", ">=1mb");
//! store.toggle_selection("a1", None);
//!
//! // 4. Project
//! let view = store.build_view(dataset.records());
//! assert_eq!(view.page_slice().len(), 1);
//! assert_eq!(view.page_slice()[0].name, "movie.mkv");
//! ```
//!
//! ## Persistence
//!
//! Each user's configuration is written as a [`ViewSnapshot`] under
//! `prefix:user`. Snapshots are sanitized against the current schema on load,
//! never trusted verbatim.

pub mod command;
pub mod dataset;
pub mod error;
pub mod event;
pub mod export;
pub mod ffi;
pub mod filter;
pub mod normalize;
pub mod projection;
pub mod record;
pub mod schema;
pub mod selection;
pub mod snapshot;
pub mod sort;
pub mod storage;
pub mod store;
pub mod view;

// Re-export main types at crate root
pub use command::ViewCommand;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use event::{EventKind, Reactions, StoreEvent, SubscriptionId};
pub use export::{export_csv, CsvExport, ExportOptions};
pub use filter::{CompiledFilter, SizeFilter, SizeOp};
pub use normalize::{normalize, AliasTable, Normalizer};
pub use projection::{
    build_view, project, Bucket, OwnedView, PageInfo, PageSelection, Projection, Summary,
    UnitChip, UnitChips, ViewResult,
};
pub use record::{display_date, format_size, Field, Record};
pub use schema::{BareSizeFilter, ColumnDef, ColumnKind, SearchMode, TableSchema};
pub use selection::{DragGesture, DragMode, Modifiers, Rect, RowBox, Selection};
pub use snapshot::{ViewSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use sort::{compare, natural_cmp, sort_records};
pub use storage::{FileStorage, MemoryStorage, NullStorage, Storage};
pub use store::{StoreOptions, ViewStore};
pub use view::{Direction, SortSpec, ViewConfiguration, ViewDefaults};

/// Type aliases for clarity
pub type RowId = String;
pub type ColumnId = String;
pub type UserKey = String;
