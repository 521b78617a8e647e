//! CSV export of the filtered, sorted, unpaginated view.

use crate::projection::project;
use crate::{Error, Record, Result, TableSchema, ViewConfiguration};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// UTF-8 byte-order mark written ahead of the header.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// MIME type of the export.
pub const CSV_MIME: &str = "text/csv";

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    /// File name without extension
    pub file_stem: String,
    pub byte_order_mark: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            file_stem: "inventory_filtered".to_string(),
            byte_order_mark: true,
        }
    }
}

/// A produced CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    /// Data rows written, header excluded
    pub rows: usize,
}

/// Export with default options. `Ok(None)` when no row passes the filters.
pub fn export_csv(
    records: &[Record],
    config: &ViewConfiguration,
    schema: &TableSchema,
) -> Result<Option<CsvExport>> {
    export_csv_with(records, config, schema, &ExportOptions::default())
}

/// Export every visible row (not only the current page) with the visible
/// columns in display order. Size is written as a raw byte count.
pub fn export_csv_with(
    records: &[Record],
    config: &ViewConfiguration,
    schema: &TableSchema,
    options: &ExportOptions,
) -> Result<Option<CsvExport>> {
    let projection = project(records, config, schema);
    if projection.visible.is_empty() {
        return Ok(None);
    }

    let columns: Vec<_> = config
        .visible_columns()
        .filter_map(|id| schema.column(id))
        .collect();

    let mut out = Vec::new();
    if options.byte_order_mark {
        out.extend_from_slice(UTF8_BOM);
    }
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(out);

    writer.write_record(columns.iter().map(|c| c.plain_label()))?;
    for record in &projection.visible {
        writer.write_record(columns.iter().map(|c| record.text(c.field).into_owned()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;

    Ok(Some(CsvExport {
        filename: format!("{}.csv", options.file_stem),
        mime_type: CSV_MIME,
        bytes,
        rows: projection.visible.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, ColumnKind, Field, SortSpec, ViewDefaults};

    fn records() -> Vec<Record> {
        vec![
            Record {
                hash: Some("h1".into()),
                kind: "video".into(),
                name: "b, \"quoted\".mkv".into(),
                path: "D:\\films".into(),
                unit: "D".into(),
                size_bytes: 2048,
                modified_at: "2024-01-01T00:00:00Z".into(),
            },
            Record {
                hash: Some("h2".into()),
                kind: "audio".into(),
                name: "a.mp3".into(),
                path: "E:\\music\nlive".into(),
                unit: "E".into(),
                size_bytes: 10,
                modified_at: String::new(),
            },
        ]
    }

    fn config(schema: &TableSchema) -> ViewConfiguration {
        let mut config = ViewConfiguration::from_defaults(schema, &ViewDefaults::default());
        config.order = crate::view::sanitize_order(&["name", "size", "path"], schema);
        config.hidden_columns = ["hash", "kind", "unit", "modified"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        config
    }

    fn text(export: &CsvExport) -> &str {
        std::str::from_utf8(&export.bytes[UTF8_BOM.len()..]).unwrap()
    }

    #[test]
    fn visible_columns_in_order_with_quoting() {
        let schema = TableSchema::inventory();
        let export = export_csv(&records(), &config(&schema), &schema)
            .unwrap()
            .unwrap();
        assert!(export.bytes.starts_with(UTF8_BOM));
        assert_eq!(export.filename, "inventory_filtered.csv");
        assert_eq!(export.mime_type, "text/csv");
        assert_eq!(export.rows, 2);
        assert_eq!(
            text(&export),
            "Name,Size,Path/Folder\r\n\
             a.mp3,10,\"E:\\music\nlive\"\r\n\
             \"b, \"\"quoted\"\".mkv\",2048,D:\\films\r\n"
        );
    }

    #[test]
    fn all_pages_are_exported_in_sort_order() {
        let schema = TableSchema::inventory();
        let mut cfg = config(&schema);
        cfg.page_size = 1;
        cfg.page = 2;
        cfg.sort = Some(SortSpec::desc("size"));
        let export = export_csv(&records(), &cfg, &schema).unwrap().unwrap();
        let lines: Vec<_> = text(&export).split("\r\n").collect();
        assert!(lines[1].ends_with(",2048,D:\\films"));
        assert_eq!(export.rows, 2);
    }

    #[test]
    fn empty_result_produces_nothing() {
        let schema = TableSchema::inventory();
        let mut cfg = config(&schema);
        cfg.search = "no such file".into();
        assert_eq!(export_csv(&records(), &cfg, &schema).unwrap(), None);
        assert_eq!(export_csv(&[], &config(&schema), &schema).unwrap(), None);
    }

    #[test]
    fn markup_in_labels_is_stripped() {
        let schema = TableSchema::new(vec![
            ColumnDef::new("name", "<b>Nombre</b>", ColumnKind::Text, Field::Name, 200),
            ColumnDef::new("size", "Tama&ntilde;o", ColumnKind::Size, Field::Size, 100),
        ]);
        let cfg = ViewConfiguration::from_defaults(&schema, &ViewDefaults::default());
        let options = ExportOptions {
            delimiter: b';',
            file_stem: "inventario_filtrado".into(),
            byte_order_mark: false,
        };
        let export = export_csv_with(&records(), &cfg, &schema, &options)
            .unwrap()
            .unwrap();
        let text = String::from_utf8(export.bytes).unwrap();
        assert!(text.starts_with("Nombre;Tamaño\r\n"));
        assert_eq!(export.filename, "inventario_filtrado.csv");
    }
}
