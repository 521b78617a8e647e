//! FFI layer for host UIs.
//!
//! This module provides C-compatible functions for a rendering host (webview
//! bridge, native shell). All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `inventory_*` functions are allocated by Rust
//! - Caller must free them with `inventory_string_free`
//! - Session pointers must be freed with `inventory_session_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//!
//! # Events
//!
//! The host cannot receive callbacks, so every store event is queued on the
//! session and handed out by `inventory_session_drain_events`.

use crate::storage::{FileStorage, MemoryStorage};
use crate::{
    Dataset, StoreEvent, StoreOptions, TableSchema, ViewCommand, ViewConfiguration, ViewDefaults,
    ViewStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::rc::Rc;

/// Result wrapper for FFI responses.
#[derive(Serialize)]
#[serde(untagged)]
enum FfiResult<T: Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

fn error_json(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `inventory_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // Interior NUL: the fixed message below has none
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Options accepted by `inventory_session_new`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionOptions {
    schema: Option<TableSchema>,
    defaults: ViewDefaults,
    /// Directory for file-backed snapshots; in-memory when absent
    storage_dir: Option<String>,
    storage_prefix: Option<String>,
    default_user_key: Option<String>,
    user_key: Option<String>,
}

impl SessionOptions {
    fn into_store(self) -> ViewStore {
        let mut options =
            StoreOptions::new(self.schema.unwrap_or_default()).with_defaults(self.defaults);
        if let Some(prefix) = self.storage_prefix {
            options = options.with_storage_prefix(prefix);
        }
        if let Some(key) = self.default_user_key {
            options = options.with_default_user_key(key);
        }
        options.user_key = self.user_key;
        match self.storage_dir {
            Some(dir) => ViewStore::new(options, FileStorage::new(dir)),
            None => ViewStore::new(options, MemoryStorage::new()),
        }
    }
}

/// A store, its loaded dataset and the queue of events not yet drained.
pub struct InventorySession {
    store: ViewStore,
    dataset: Dataset,
    events: Rc<RefCell<Vec<StoreEvent>>>,
}

impl InventorySession {
    fn new(mut store: ViewStore) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let queue = events.clone();
        store.subscribe_all(move |event, _| queue.borrow_mut().push(event.clone()));
        Self {
            store,
            dataset: Dataset::default(),
            events,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadSummary {
    records: usize,
    distinct_rows: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionState<'a> {
    user_key: &'a str,
    storage_key: String,
    persistence_degraded: bool,
    state: &'a ViewConfiguration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvFile {
    filename: String,
    mime_type: &'static str,
    rows: usize,
    /// UTF-8 text, byte-order mark included
    content: String,
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Create a new session.
///
/// # Arguments
/// - `options_json`: JSON session options, or null for defaults
///
/// # Returns
/// Pointer to the session, or null when the options do not parse.
///
/// # Safety
/// - `options_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `inventory_session_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_new(
    options_json: *const c_char,
) -> *mut InventorySession {
    let options = match from_c_string(options_json) {
        Some(json) => match serde_json::from_str::<SessionOptions>(&json) {
            Ok(options) => options,
            Err(_) => return ptr::null_mut(),
        },
        None => SessionOptions::default(),
    };

    let session = InventorySession::new(options.into_store());
    Box::into_raw(Box::new(session))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn inventory_session_free(session: *mut InventorySession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from an `inventory_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn inventory_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Replace the loaded dataset with raw rows.
///
/// # Arguments
/// - `raw_json`: an array of raw rows, or an object wrapping one under
///   `records`, `items` or `data`
///
/// # Returns
/// JSON string: `{"ok": {"records": n, "distinctRows": m}}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - `raw_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_load_records(
    session: *mut InventorySession,
    raw_json: *const c_char,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    let raw = match from_c_string(raw_json) {
        Some(s) => s,
        None => return error_json("invalid records JSON"),
    };

    let document: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };

    session.dataset = Dataset::from_document(&document, &Default::default());
    let summary = LoadSummary {
        records: session.dataset.len(),
        distinct_rows: session.dataset.distinct_rows(),
    };
    to_c_string(FfiResult::ok(summary).to_json())
}

// ============================================================================
// Store Operations
// ============================================================================

/// Apply a command.
///
/// # Arguments
/// - `command_json`: JSON string of a `ViewCommand`, e.g. `{"op":"setSearch","search":"x"}`
///
/// # Returns
/// JSON string: `{"ok": <changed>}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - `command_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_dispatch(
    session: *mut InventorySession,
    command_json: *const c_char,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    let command_str = match from_c_string(command_json) {
        Some(s) => s,
        None => return error_json("invalid command JSON"),
    };

    let command = match ViewCommand::from_json(&command_str) {
        Ok(c) => c,
        Err(e) => return error_json(e.to_string()),
    };

    let changed = session.store.dispatch(command);
    to_c_string(FfiResult::ok(changed).to_json())
}

/// Switch the active user.
///
/// # Arguments
/// - `user_key`: raw user key, or null for the default user
///
/// # Returns
/// JSON string: `{"ok": "<normalized key>"}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - `user_key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_set_user(
    session: *mut InventorySession,
    user_key: *const c_char,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    let user_key = from_c_string(user_key);
    session.store.set_user(user_key.as_deref());
    to_c_string(FfiResult::ok(session.store.user_key()).to_json())
}

/// Current configuration and identity.
///
/// # Returns
/// JSON string: `{"ok": {"userKey", "storageKey", "persistenceDegraded", "state"}}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_state(session: *const InventorySession) -> *mut c_char {
    let session = match session.as_ref() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    let state = SessionState {
        user_key: session.store.user_key(),
        storage_key: session.store.storage_key(),
        persistence_degraded: session.store.is_persistence_degraded(),
        state: session.store.state(),
    };
    to_c_string(FfiResult::ok(state).to_json())
}

/// Project the loaded dataset: page rows, pagination, aggregates, chips.
///
/// # Returns
/// JSON string: `{"ok": View}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_build_view(
    session: *mut InventorySession,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    let view = session.store.build_view(session.dataset.records()).to_owned_view();
    to_c_string(FfiResult::ok(view).to_json())
}

/// Export the filtered, sorted rows as CSV.
///
/// # Returns
/// JSON string: `{"ok": {"filename", "mimeType", "rows", "content"}}`,
/// `{"ok": null}` when no row passes the filters, or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_export_csv(
    session: *const InventorySession,
) -> *mut c_char {
    let session = match session.as_ref() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    match session.store.export_csv(session.dataset.records()) {
        Ok(Some(export)) => {
            let file = CsvFile {
                filename: export.filename,
                mime_type: export.mime_type,
                rows: export.rows,
                content: String::from_utf8_lossy(&export.bytes).into_owned(),
            };
            to_c_string(FfiResult::ok(file).to_json())
        }
        Ok(None) => to_c_string(FfiResult::ok(()).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

/// Take every event emitted since the last call, oldest first.
///
/// # Returns
/// JSON string: `{"ok": [{"type": "columns:order", "detail": {...}}, ...]}`
///
/// # Safety
/// - `session` must be a valid pointer from `inventory_session_new` or null
/// - Caller must free the returned string with `inventory_string_free`
#[no_mangle]
pub unsafe extern "C" fn inventory_session_drain_events(
    session: *mut InventorySession,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_json("null session pointer"),
    };

    let events = std::mem::take(&mut *session.events.borrow_mut());
    to_c_string(FfiResult::ok(events).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn inventory_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn inventory_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take(ptr: *mut c_char) -> Value {
        let json = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        inventory_string_free(ptr);
        serde_json::from_str(&json).unwrap()
    }

    fn cstr(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn raw_records() -> CString {
        cstr(
            r#"[
                {"hash": "a1", "nombre": "alpha.mkv", "ruta": "/films", "unidad": "D", "tamano": 3000000},
                {"hash": "b2", "nombre": "beta.mp3", "ruta": "/music", "unidad": "E", "tamano": 4000},
                {"hash": "c3", "nombre": "gamma.mkv", "ruta": "/films", "unidad": "D", "tamano": 1500000}
            ]"#,
        )
    }

    #[test]
    fn ffi_session_lifecycle() {
        unsafe {
            let session = inventory_session_new(ptr::null());
            assert!(!session.is_null());
            inventory_session_free(session);

            let bad = cstr("{not json");
            assert!(inventory_session_new(bad.as_ptr()).is_null());
        }
    }

    #[test]
    fn ffi_load_dispatch_and_view() {
        unsafe {
            let session = inventory_session_new(ptr::null());

            let loaded = take(inventory_session_load_records(session, raw_records().as_ptr()));
            assert_eq!(loaded["ok"]["records"], 3);

            let cmd = cstr(r#"{"op":"setFilter","column":"size","value":">=1mb"}"#);
            assert_eq!(take(inventory_session_dispatch(session, cmd.as_ptr()))["ok"], true);

            let view = take(inventory_session_build_view(session));
            let names: Vec<_> = view["ok"]["rows"]
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r["name"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(names, ["alpha.mkv", "gamma.mkv"]);
            assert_eq!(view["ok"]["summary"]["byUnit"][0]["key"], "D");

            let events = take(inventory_session_drain_events(session));
            let kinds: Vec<_> = events["ok"]
                .as_array()
                .unwrap()
                .iter()
                .map(|e| e["type"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(kinds, ["filters:change", "change"]);
            assert_eq!(take(inventory_session_drain_events(session))["ok"], serde_json::json!([]));

            inventory_session_free(session);
        }
    }

    #[test]
    fn ffi_export_csv() {
        unsafe {
            let session = inventory_session_new(ptr::null());
            let empty = take(inventory_session_export_csv(session));
            assert!(empty["ok"].is_null());

            take(inventory_session_load_records(session, raw_records().as_ptr()));
            let export = take(inventory_session_export_csv(session));
            assert_eq!(export["ok"]["filename"], "inventory_filtered.csv");
            assert_eq!(export["ok"]["mimeType"], "text/csv");
            assert_eq!(export["ok"]["rows"], 3);
            assert!(export["ok"]["content"].as_str().unwrap().starts_with('\u{feff}'));

            inventory_session_free(session);
        }
    }

    #[test]
    fn ffi_user_switch_and_state() {
        unsafe {
            let options = cstr(r#"{"storagePrefix":"test.view","defaults":{"pageSize":25}}"#);
            let session = inventory_session_new(options.as_ptr());

            let state = take(inventory_session_state(session));
            assert_eq!(state["ok"]["userKey"], "public");
            assert_eq!(state["ok"]["storageKey"], "test.view:public");
            assert_eq!(state["ok"]["state"]["pageSize"], 25);

            let user = cstr("  Ana Perez ");
            let key = take(inventory_session_set_user(session, user.as_ptr()));
            assert_eq!(key["ok"], "ana_perez");

            inventory_session_free(session);
        }
    }

    #[test]
    fn ffi_version() {
        unsafe {
            let version = inventory_version();
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
        assert_eq!(inventory_snapshot_format_version(), crate::SNAPSHOT_FORMAT_VERSION);
    }

    #[test]
    fn ffi_error_handling() {
        unsafe {
            let result = take(inventory_session_state(ptr::null()));
            assert!(result["error"].is_string());

            let session = inventory_session_new(ptr::null());
            let invalid = cstr("not valid json");
            let result = take(inventory_session_dispatch(session, invalid.as_ptr()));
            assert!(result["error"].is_string());

            let unknown = cstr(r#"{"op":"dropTables"}"#);
            let result = take(inventory_session_dispatch(session, unknown.as_ptr()));
            assert!(result["error"].is_string());

            inventory_session_free(session);
        }
    }
}
