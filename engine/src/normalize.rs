//! Coercion of loosely typed raw inventory rows into canonical [`Record`]s.
//!
//! Different generations of the scanner wrote different field names
//! (`tamano`, `size`, `length`...). Each canonical field resolves through an
//! ordered alias list; the first alias carrying a value wins. Keys are matched
//! case-insensitively. Normalization never fails: garbage becomes empty
//! strings and zero sizes.

use crate::{Field, Record};
use serde_json::{Map, Value};

/// Ordered alias lists, one per canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<(Field, Vec<String>)>,
}

impl AliasTable {
    /// A table with no aliases at all.
    pub fn empty() -> Self {
        Self {
            entries: Field::ALL.iter().map(|f| (*f, Vec::new())).collect(),
        }
    }

    /// Append an alias at the lowest priority for a field.
    pub fn push(&mut self, field: Field, alias: impl Into<String>) {
        let alias = alias.into();
        if let Some((_, aliases)) = self.entries.iter_mut().find(|(f, _)| *f == field) {
            if !aliases.iter().any(|a| a.eq_ignore_ascii_case(&alias)) {
                aliases.push(alias);
            }
        }
    }

    /// Builder form of [`AliasTable::push`].
    pub fn with_alias(mut self, field: Field, alias: impl Into<String>) -> Self {
        self.push(field, alias);
        self
    }

    /// Aliases for a field, highest priority first.
    pub fn aliases(&self, field: Field) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve the first alias of `field` that carries a value.
    fn resolve<'a>(&self, object: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
        self.aliases(field).iter().find_map(|alias| {
            object
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(alias))
                .map(|(_, value)| value)
                .filter(|value| has_value(value))
        })
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        let table = [
            (Field::Hash, &["hash", "sha", "sha256", "sha1"][..]),
            (Field::Kind, &["kind", "tipo", "type"][..]),
            (Field::Name, &["name", "nombre", "filename"][..]),
            (Field::Path, &["path", "ruta", "dir", "folder"][..]),
            (Field::Unit, &["unit", "unidad", "drive"][..]),
            (Field::Size, &["sizeBytes", "tamano", "size", "bytes", "length"][..]),
            (
                Field::Modified,
                &["modifiedAt", "fecha", "date", "last", "lastWriteTime", "mtime"][..],
            ),
        ];
        let mut aliases = Self::empty();
        for (field, names) in table {
            for name in names {
                aliases.push(field, *name);
            }
        }
        aliases
    }
}

/// Normalizes raw rows with a given alias table.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    aliases: AliasTable,
}

impl Normalizer {
    /// Create a normalizer using custom aliases.
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// The alias table in use.
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Normalize a list of raw rows. Output order matches input order.
    pub fn normalize(&self, raw: &[Value]) -> Vec<Record> {
        raw.iter().map(|row| self.normalize_one(row)).collect()
    }

    /// Normalize a whole dataset document: either an array of rows or an
    /// object wrapping one under `records`, `items` or `data`.
    pub fn normalize_document(&self, document: &Value) -> Vec<Record> {
        match document {
            Value::Array(rows) => self.normalize(rows),
            Value::Object(object) => ["records", "items", "data"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_array))
                .map(|rows| self.normalize(rows))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Normalize a single raw row.
    pub fn normalize_one(&self, row: &Value) -> Record {
        let Some(object) = row.as_object() else {
            return Record::default();
        };
        let text = |field| self.aliases.resolve(object, field).map(coerce_string).unwrap_or_default();

        let hash = text(Field::Hash).trim().to_string();
        Record {
            hash: (!hash.is_empty()).then_some(hash),
            kind: text(Field::Kind),
            name: text(Field::Name),
            path: text(Field::Path),
            unit: text(Field::Unit).trim().to_string(),
            size_bytes: self
                .aliases
                .resolve(object, Field::Size)
                .map(coerce_size)
                .unwrap_or(0),
            modified_at: text(Field::Modified),
        }
    }
}

/// Normalize raw rows with the default alias table.
pub fn normalize(raw: &[Value]) -> Vec<Record> {
    Normalizer::default().normalize(raw)
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn coerce_size(value: &Value) -> u64 {
    let number = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => return v,
            None => n.as_f64(),
        },
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(v) if v.is_finite() && v > 0.0 => v.floor() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_fields() {
        let records = normalize(&[json!({
            "hash": "abc",
            "kind": "video",
            "name": "a.mkv",
            "path": "D:\\films",
            "unit": " D ",
            "sizeBytes": 1024,
            "modifiedAt": "2024-01-01T00:00:00Z"
        })]);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.hash.as_deref(), Some("abc"));
        assert_eq!(r.unit, "D");
        assert_eq!(r.size_bytes, 1024);
        assert_eq!(r.modified_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn legacy_aliases_and_casing() {
        let records = normalize(&[json!({
            "SHA": "f00",
            "Tipo": "audio",
            "NOMBRE": "song.mp3",
            "ruta": "E:\\music",
            "drive": "E",
            "tamano": "2048",
            "lastWriteTime": "2023-05-05"
        })]);
        let r = &records[0];
        assert_eq!(r.hash.as_deref(), Some("f00"));
        assert_eq!(r.kind, "audio");
        assert_eq!(r.name, "song.mp3");
        assert_eq!(r.path, "E:\\music");
        assert_eq!(r.unit, "E");
        assert_eq!(r.size_bytes, 2048);
        assert_eq!(r.modified_at, "2023-05-05");
    }

    #[test]
    fn size_alias_priority() {
        let records = normalize(&[
            json!({"size": 10, "bytes": 20, "length": 30}),
            json!({"bytes": 20, "length": 30}),
            json!({"length": 30}),
            json!({"size": null, "length": 30}),
        ]);
        let sizes: Vec<_> = records.iter().map(|r| r.size_bytes).collect();
        assert_eq!(sizes, [10, 20, 30, 30]);
    }

    #[test]
    fn lenient_numbers() {
        let records = normalize(&[
            json!({"size": "not a number"}),
            json!({"size": -5}),
            json!({"size": 12.9}),
            json!({"size": "3,5"}),
            json!({"size": true}),
        ]);
        let sizes: Vec<_> = records.iter().map(|r| r.size_bytes).collect();
        assert_eq!(sizes, [0, 0, 12, 3, 0]);
    }

    #[test]
    fn malformed_rows_become_empty_records() {
        let records = normalize(&[json!(null), json!(42), json!("text"), json!({})]);
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| *r == Record::default()));
    }

    #[test]
    fn order_is_preserved() {
        let raw: Vec<_> = (0..5).map(|i| json!({"name": format!("f{}", 4 - i)})).collect();
        let names: Vec<_> = normalize(&raw).into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["f4", "f3", "f2", "f1", "f0"]);
    }

    #[test]
    fn wrapped_documents() {
        let normalizer = Normalizer::default();
        let doc = json!({"records": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(normalizer.normalize_document(&doc).len(), 2);
        assert!(normalizer.normalize_document(&json!("nope")).is_empty());
    }

    #[test]
    fn custom_aliases() {
        let aliases = AliasTable::default().with_alias(Field::Name, "titulo");
        let normalizer = Normalizer::new(aliases);
        let r = normalizer.normalize_one(&json!({"titulo": "x.avi"}));
        assert_eq!(r.name, "x.avi");
        assert_eq!(normalizer.aliases().aliases(Field::Name).last().unwrap(), "titulo");
    }
}
