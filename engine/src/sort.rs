//! Record ordering.
//!
//! Sizes compare numerically. Every other column uses a natural ordering:
//! digit runs compare by value, text compares case- and accent-insensitively.
//! Ties fall back to the path so repeated sorts render identically; the
//! direction is applied last, to the whole comparison.

use crate::{ColumnDef, ColumnKind, Direction, Field, Record, SortSpec, TableSchema};
use std::cmp::Ordering;

/// Compare two records on a column.
pub fn compare(a: &Record, b: &Record, column: &ColumnDef, direction: Direction) -> Ordering {
    let primary = match column.kind {
        ColumnKind::Size => a.size_bytes.cmp(&b.size_bytes),
        ColumnKind::Text | ColumnKind::Date => {
            natural_cmp(&a.text(column.field), &b.text(column.field))
        }
    };
    let ordering = match primary {
        Ordering::Equal if column.field != Field::Path => natural_cmp(&a.path, &b.path),
        other => other,
    };
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

/// Stable in-place sort. A missing spec or an unknown column keeps the
/// incoming order.
pub fn sort_records(rows: &mut [&Record], sort: Option<&SortSpec>, schema: &TableSchema) {
    let Some(spec) = sort else {
        return;
    };
    let Some(column) = schema.column(&spec.column) else {
        return;
    };
    rows.sort_by(|a, b| compare(a, b, column, spec.direction));
}

/// Natural, case-insensitive string ordering (`file2` < `File10`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_chunks(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

fn compare_chunks(a: Chunk<'_>, b: Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Digits(x), Chunk::Digits(y)) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        (Chunk::Text(x), Chunk::Text(y)) => x.chars().map(fold).cmp(y.chars().map(fold)),
    }
}

/// Base letter of a character: lowercase, common Latin diacritics removed.
fn fold(c: char) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    match lower {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, path: &str, size: u64) -> Record {
        Record {
            name: name.into(),
            path: path.into(),
            size_bytes: size,
            ..Record::default()
        }
    }

    fn sorted<'a>(records: &'a [Record], spec: SortSpec) -> Vec<&'a Record> {
        let mut rows: Vec<&Record> = records.iter().collect();
        sort_records(&mut rows, Some(&spec), &TableSchema::inventory());
        rows
    }

    #[test]
    fn name_ties_break_on_path() {
        let records = [rec("b", "x", 0), rec("a", "y", 0), rec("a", "x", 0)];
        let rows = sorted(&records, SortSpec::asc("name"));
        let got: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.path.as_str())).collect();
        assert_eq!(got, [("a", "x"), ("a", "y"), ("b", "x")]);
    }

    #[test]
    fn descending_reverses_everything() {
        let records = [rec("b", "x", 0), rec("a", "y", 0), rec("a", "x", 0)];
        let rows = sorted(&records, SortSpec::desc("name"));
        let got: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.path.as_str())).collect();
        assert_eq!(got, [("b", "x"), ("a", "y"), ("a", "x")]);
    }

    #[test]
    fn size_is_numeric() {
        let records = [rec("a", "p", 900), rec("b", "p", 10_000), rec("c", "p", 80)];
        let rows = sorted(&records, SortSpec::asc("size"));
        let sizes: Vec<_> = rows.iter().map(|r| r.size_bytes).collect();
        assert_eq!(sizes, [80, 900, 10_000]);
    }

    #[test]
    fn unknown_column_keeps_order() {
        let records = [rec("b", "", 0), rec("a", "", 0)];
        let rows = sorted(&records, SortSpec::asc("ghost"));
        assert_eq!(rows[0].name, "b");
    }

    #[test]
    fn natural_ordering() {
        assert_eq!(natural_cmp("file2", "File10"), Ordering::Less);
        assert_eq!(natural_cmp("file010", "file10"), Ordering::Equal);
        assert_eq!(natural_cmp("Ábaco", "abaco"), Ordering::Equal);
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(natural_cmp("9", "a"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_record() -> impl Strategy<Value = Record> {
            ("[a-c]{0,3}[0-9]{0,2}", "[xy]{1,2}", 0u64..5).prop_map(|(name, path, size)| {
                Record {
                    name,
                    path,
                    size_bytes: size,
                    ..Record::default()
                }
            })
        }

        proptest! {
            #[test]
            fn sort_is_deterministic(
                records in prop::collection::vec(arb_record(), 0..30),
                column in prop::sample::select(vec!["name", "path", "size"]),
            ) {
                let schema = TableSchema::inventory();
                let spec = SortSpec::asc(column);
                let mut forward: Vec<&Record> = records.iter().collect();
                let mut backward: Vec<&Record> = records.iter().rev().collect();
                sort_records(&mut forward, Some(&spec), &schema);
                sort_records(&mut backward, Some(&spec), &schema);

                let col = schema.column(column).unwrap();
                for (a, b) in forward.iter().zip(backward.iter()) {
                    prop_assert_eq!(compare(a, b, col, Direction::Asc), Ordering::Equal);
                }
                for pair in forward.windows(2) {
                    prop_assert_ne!(compare(pair[0], pair[1], col, Direction::Asc), Ordering::Greater);
                }
            }
        }
    }
}
