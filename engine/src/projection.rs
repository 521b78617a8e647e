//! Projection: records plus configuration in, visible rows, page and
//! aggregates out.
//!
//! Nothing here mutates the configuration. When the requested page is out of
//! range the effective page is reported with `clamped = true` so the caller
//! can write it back (see [`ViewStore::build_view`](crate::ViewStore::build_view)).

use crate::filter::CompiledFilter;
use crate::sort::{natural_cmp, sort_records};
use crate::{Record, RowId, TableSchema, ViewConfiguration};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;

/// Number of entries kept per aggregate breakdown.
pub const TOP_N: usize = 6;

const NO_UNIT: &str = "(no unit)";
const NO_EXTENSION: &str = "(no extension)";
const NO_PATH: &str = "(no path)";

/// Effective pagination of a visible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Effective 1-based page
    pub page: usize,
    /// Page stored in the configuration
    pub requested_page: usize,
    pub page_count: usize,
    pub page_size: usize,
    /// Visible row count
    pub total: usize,
    /// 1-based position of the first row on the page, 0 when empty
    pub first: usize,
    /// 1-based position of the last row on the page, 0 when empty
    pub last: usize,
    /// Whether `page` differs from `requested_page`
    pub clamped: bool,
}

impl PageInfo {
    /// Paginate `total` rows. A page size of 0 puts everything on one page.
    pub fn compute(total: usize, requested_page: usize, page_size: usize) -> Self {
        let page_count = if page_size == 0 {
            1
        } else {
            total.div_ceil(page_size).max(1)
        };
        let page = requested_page.clamp(1, page_count);
        let range = Self::range_of(total, page, page_size);
        Self {
            page,
            requested_page,
            page_count,
            page_size,
            total,
            first: if range.is_empty() { 0 } else { range.start + 1 },
            last: range.end,
            clamped: page != requested_page,
        }
    }

    /// Index range of the page within the visible rows.
    pub fn range(&self) -> Range<usize> {
        Self::range_of(self.total, self.page, self.page_size)
    }

    fn range_of(total: usize, page: usize, page_size: usize) -> Range<usize> {
        if page_size == 0 {
            return 0..total;
        }
        let start = (page - 1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);
        start..end
    }
}

/// Filtered, sorted rows and their pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection<'a> {
    /// Every row passing the filters, sorted
    pub visible: Vec<&'a Record>,
    pub page: PageInfo,
    /// Sum of visible sizes
    pub total_bytes: u64,
}

impl<'a> Projection<'a> {
    /// Rows on the effective page.
    pub fn page_slice(&self) -> &[&'a Record] {
        &self.visible[self.page.range()]
    }

    pub fn page_count(&self) -> usize {
        self.page.page_count
    }

    /// Row ids on the effective page, in display order.
    pub fn page_row_ids(&self) -> Vec<RowId> {
        self.page_slice().iter().map(|r| r.row_key()).collect()
    }
}

/// Filter, sort and paginate.
pub fn project<'a>(
    records: &'a [Record],
    config: &ViewConfiguration,
    schema: &TableSchema,
) -> Projection<'a> {
    let filter = CompiledFilter::new(config, schema);
    let mut visible: Vec<&Record> = records.iter().filter(|r| filter.matches(r)).collect();
    sort_records(&mut visible, config.sort.as_ref(), schema);
    let total_bytes = total_bytes(&visible);
    let page = PageInfo::compute(visible.len(), config.page, config.page_size);
    Projection {
        visible,
        page,
        total_bytes,
    }
}

fn total_bytes(rows: &[&Record]) -> u64 {
    rows.iter().fold(0u64, |sum, r| sum.saturating_add(r.size_bytes))
}

/// One aggregate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub key: String,
    pub count: usize,
    pub bytes: u64,
}

/// Aggregate breakdowns of the visible set, each capped at [`TOP_N`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Records in the dataset
    pub total_records: usize,
    /// Records passing the filters
    pub visible_records: usize,
    pub visible_bytes: u64,
    pub by_unit: Vec<Bucket>,
    pub by_extension: Vec<Bucket>,
    pub by_path: Vec<Bucket>,
}

impl Summary {
    pub fn compute(total_records: usize, visible: &[&Record]) -> Self {
        let mut by_unit: HashMap<&str, Bucket> = HashMap::new();
        let mut by_extension: HashMap<String, Bucket> = HashMap::new();
        let mut by_path: HashMap<&str, Bucket> = HashMap::new();

        for record in visible {
            let unit = if record.unit.is_empty() {
                NO_UNIT
            } else {
                record.unit.as_str()
            };
            tally(by_unit.entry(unit).or_insert_with(|| Bucket::empty(unit)), record);

            let ext = record
                .extension()
                .unwrap_or_else(|| NO_EXTENSION.to_string());
            tally(
                by_extension.entry(ext.clone()).or_insert_with(|| Bucket::empty(&ext)),
                record,
            );

            let path = if record.path.is_empty() {
                NO_PATH
            } else {
                record.path.as_str()
            };
            tally(by_path.entry(path).or_insert_with(|| Bucket::empty(path)), record);
        }

        Self {
            total_records,
            visible_records: visible.len(),
            visible_bytes: total_bytes(visible),
            by_unit: top_n(by_unit.into_values()),
            by_extension: top_n(by_extension.into_values()),
            by_path: top_n(by_path.into_values()),
        }
    }
}

impl Bucket {
    fn empty(key: &str) -> Self {
        Self {
            key: key.to_string(),
            count: 0,
            bytes: 0,
        }
    }
}

fn tally(bucket: &mut Bucket, record: &Record) {
    bucket.count += 1;
    bucket.bytes = bucket.bytes.saturating_add(record.size_bytes);
}

fn top_n(buckets: impl Iterator<Item = Bucket>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = buckets.collect();
    buckets.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.bytes.cmp(&a.bytes))
            .then_with(|| natural_cmp(&a.key, &b.key))
            .then_with(|| a.key.cmp(&b.key))
    });
    buckets.truncate(TOP_N);
    buckets
}

/// One unit facet chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitChip {
    pub unit: String,
    pub count: usize,
    pub active: bool,
}

/// Facet chips, counted over rows filtered by everything except the facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitChips {
    /// Count for the "all units" chip
    pub all: usize,
    pub all_active: bool,
    pub chips: Vec<UnitChip>,
}

impl UnitChips {
    /// Units are grouped case-insensitively, the way the facet matches them;
    /// each chip shows the first spelling seen.
    pub fn compute(records: &[Record], config: &ViewConfiguration, schema: &TableSchema) -> Self {
        let filter = CompiledFilter::new(config, schema).without_unit();
        let active = config.active_unit.trim();
        let active_key = active.to_lowercase();
        let mut all = 0;
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut chips: Vec<UnitChip> = Vec::new();
        for record in records.iter().filter(|r| filter.matches(r)) {
            all += 1;
            let unit = record.unit.trim();
            if unit.is_empty() {
                continue;
            }
            let key = unit.to_lowercase();
            match index.get(&key) {
                Some(&i) => chips[i].count += 1,
                None => {
                    chips.push(UnitChip {
                        unit: unit.to_string(),
                        count: 1,
                        active: !active_key.is_empty() && key == active_key,
                    });
                    index.insert(key, chips.len() - 1);
                }
            }
        }

        if !active.is_empty() && !index.contains_key(&active_key) {
            chips.push(UnitChip {
                unit: active.to_string(),
                count: 0,
                active: true,
            });
        }
        chips.sort_by(|a, b| natural_cmp(&a.unit, &b.unit).then_with(|| a.unit.cmp(&b.unit)));

        Self {
            all,
            all_active: active.is_empty(),
            chips,
        }
    }
}

/// State of a "select all on this page" checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSelection {
    None,
    Partial,
    All,
}

impl PageSelection {
    pub fn compute(page_rows: &[&Record], config: &ViewConfiguration) -> Self {
        if page_rows.is_empty() || config.selection.is_empty() {
            return PageSelection::None;
        }
        let selected = page_rows
            .iter()
            .filter(|r| config.selection.contains(&r.row_id()))
            .count();
        match selected {
            0 => PageSelection::None,
            n if n == page_rows.len() => PageSelection::All,
            _ => PageSelection::Partial,
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewResult<'a> {
    pub projection: Projection<'a>,
    pub summary: Summary,
    pub unit_chips: UnitChips,
    pub page_selection: PageSelection,
}

impl<'a> ViewResult<'a> {
    /// Rows on the effective page.
    pub fn page_slice(&self) -> &[&'a Record] {
        self.projection.page_slice()
    }

    pub fn page(&self) -> PageInfo {
        self.projection.page
    }

    /// Boundary form: plain records instead of references, for JSON callers.
    pub fn to_owned_view(&self) -> OwnedView {
        OwnedView {
            rows: self.page_slice().iter().map(|r| (*r).clone()).collect(),
            row_ids: self.projection.page_row_ids(),
            page: self.projection.page,
            total_bytes: self.projection.total_bytes,
            summary: self.summary.clone(),
            unit_chips: self.unit_chips.clone(),
            page_selection: self.page_selection,
        }
    }
}

/// Serializable snapshot of a [`ViewResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedView {
    pub rows: Vec<Record>,
    pub row_ids: Vec<RowId>,
    pub page: PageInfo,
    pub total_bytes: u64,
    pub summary: Summary,
    pub unit_chips: UnitChips,
    pub page_selection: PageSelection,
}

/// Project and aggregate.
pub fn build_view<'a>(
    records: &'a [Record],
    config: &ViewConfiguration,
    schema: &TableSchema,
) -> ViewResult<'a> {
    let projection = project(records, config, schema);
    let summary = Summary::compute(records.len(), &projection.visible);
    let unit_chips = UnitChips::compute(records, config, schema);
    let page_selection = PageSelection::compute(projection.page_slice(), config);
    ViewResult {
        projection,
        summary,
        unit_chips,
        page_selection,
    }
}
