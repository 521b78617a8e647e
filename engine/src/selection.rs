//! Order-preserving multi-row selection.
//!
//! A [`Selection`] is a set of row ids plus the order they were selected in.
//! The order list always holds exactly the members of the set, once each;
//! every operation here re-establishes that before returning.
//!
//! Rectangle selection is split in two: [`DragGesture`] tracks a pointer drag
//! without touching the selection, and [`Selection::intersect_with_rect`]
//! applies the finished gesture in one step.

use crate::RowId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Pointer travel (per axis) below which a drag counts as a click.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

/// Selected rows and their selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    selected_rows: BTreeSet<RowId>,
    selection_order: Vec<RowId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from an order list, dropping empty and duplicate ids.
    pub fn from_order<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::new();
        for id in ids {
            selection.insert(id.as_ref());
        }
        selection
    }

    /// Rebuild from a possibly inconsistent set/order pair: members missing
    /// from the order are appended in set order, stray order entries dropped.
    pub fn reconcile<I, J, S, T>(selected: I, order: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let members: BTreeSet<RowId> = selected
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        let mut selection = Self::new();
        for id in order {
            if members.contains(id.as_ref()) {
                selection.insert(id.as_ref());
            }
        }
        for id in &members {
            selection.insert(id);
        }
        selection
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected_rows.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selection_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection_order.is_empty()
    }

    /// Ids in selection order.
    pub fn order(&self) -> &[RowId] {
        &self.selection_order
    }

    /// Ids as a set.
    pub fn rows(&self) -> &BTreeSet<RowId> {
        &self.selected_rows
    }

    /// Whether the order list is a duplicate-free permutation of the set.
    pub fn is_consistent(&self) -> bool {
        let unique: HashSet<&str> = self.selection_order.iter().map(String::as_str).collect();
        unique.len() == self.selection_order.len()
            && unique.len() == self.selected_rows.len()
            && self.selection_order.iter().all(|id| self.selected_rows.contains(id))
    }

    fn insert(&mut self, id: &str) -> bool {
        if id.is_empty() || self.selected_rows.contains(id) {
            return false;
        }
        self.selected_rows.insert(id.to_string());
        self.selection_order.push(id.to_string());
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        if !self.selected_rows.remove(id) {
            return false;
        }
        self.selection_order.retain(|x| x != id);
        true
    }

    /// Flip membership, or force it when `forced` is given. Returns whether
    /// anything changed.
    pub fn toggle(&mut self, id: &str, forced: Option<bool>) -> bool {
        let want = forced.unwrap_or(!self.contains(id));
        if want {
            self.insert(id)
        } else {
            self.remove(id)
        }
    }

    /// Add and remove in one step. Ids in both lists are removed; retained
    /// ids keep their order, new ids are appended in input order.
    pub fn bulk_update<A, R, S, T>(&mut self, add: A, remove: R) -> bool
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let remove: HashSet<String> = remove.into_iter().map(|id| id.as_ref().to_string()).collect();
        let before = self.selection_order.len();
        self.selection_order.retain(|id| !remove.contains(id));
        let mut changed = self.selection_order.len() != before;
        self.selected_rows.retain(|id| !remove.contains(id));
        for id in add {
            let id = id.as_ref();
            if !remove.contains(id) {
                changed |= self.insert(id);
            }
        }
        changed
    }

    /// Replace the selection with the deduplicated input, in input order.
    pub fn replace_with<I, S>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = Self::from_order(ids);
        if next == *self {
            return false;
        }
        *self = next;
        true
    }

    pub fn clear(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.selected_rows.clear();
        self.selection_order.clear();
        true
    }

    /// Combine the rows hit by `rect` with the current selection.
    pub fn intersect_with_rect(&mut self, candidates: &[RowBox], rect: Rect, mode: DragMode) -> bool {
        let next = rect_selection(self, candidates, rect, mode);
        if next == *self {
            return false;
        }
        *self = next;
        true
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            #[serde(default)]
            selected_rows: Vec<RowId>,
            #[serde(default)]
            selection_order: Vec<RowId>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Selection::reconcile(raw.selected_rows, raw.selection_order))
    }
}

/// Axis-aligned rectangle in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle spanned by two corner points, in any order.
    pub fn from_points(a: (f64, f64), b: (f64, f64)) -> Self {
        Self::new(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
    }

    /// Edge-inclusive overlap test.
    pub fn intersects(&self, other: &Rect) -> bool {
        other.bottom >= self.top
            && other.top <= self.bottom
            && other.right >= self.left
            && other.left <= self.right
    }

    /// Clamp into `bounds`.
    pub fn clamped(&self, bounds: &Rect) -> Self {
        Self::new(
            self.left.clamp(bounds.left, bounds.right),
            self.top.clamp(bounds.top, bounds.bottom),
            self.right.clamp(bounds.left, bounds.right),
            self.bottom.clamp(bounds.top, bounds.bottom),
        )
    }
}

/// A rendered row and its bounding box, in visual order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowBox {
    pub row_id: RowId,
    #[serde(flatten)]
    pub rect: Rect,
}

impl RowBox {
    pub fn new(row_id: impl Into<RowId>, rect: Rect) -> Self {
        Self {
            row_id: row_id.into(),
            rect,
        }
    }
}

/// How a rectangle combines with the pre-drag selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragMode {
    #[default]
    Replace,
    Add,
    Remove,
}

impl DragMode {
    /// Mode from the modifiers held at pointer-down: alt removes,
    /// ctrl/meta/shift add, nothing replaces.
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.alt {
            DragMode::Remove
        } else if modifiers.ctrl || modifiers.meta || modifiers.shift {
            DragMode::Add
        } else {
            DragMode::Replace
        }
    }
}

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

/// Rows of `candidates` (in their given visual order) intersecting `rect`.
pub fn rows_in_rect(candidates: &[RowBox], rect: &Rect) -> Vec<RowId> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|row| rect.intersects(&row.rect) && seen.insert(row.row_id.as_str()))
        .map(|row| row.row_id.clone())
        .collect()
}

/// The selection a finished drag produces, without mutating `base`.
pub fn rect_selection(base: &Selection, candidates: &[RowBox], rect: Rect, mode: DragMode) -> Selection {
    let hits = rows_in_rect(candidates, &rect);
    match mode {
        DragMode::Replace => Selection::from_order(&hits),
        DragMode::Add => {
            let mut next = base.clone();
            next.bulk_update(&hits, std::iter::empty::<&str>());
            next
        }
        DragMode::Remove => {
            let mut next = base.clone();
            next.bulk_update(std::iter::empty::<&str>(), &hits);
            next
        }
    }
}

/// In-progress rectangle drag. Holds local highlight state only; the store
/// is touched once, when the gesture finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    origin: (f64, f64),
    current: (f64, f64),
    mode: DragMode,
    bounds: Option<Rect>,
    highlighted: Vec<RowId>,
    started: bool,
}

impl DragGesture {
    /// Start a gesture at pointer-down.
    pub fn begin(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self {
            origin: (x, y),
            current: (x, y),
            mode: DragMode::from_modifiers(modifiers),
            bounds: None,
            highlighted: Vec::new(),
            started: false,
        }
    }

    /// Clamp the rectangle to a container.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        let normalized = Rect::from_points((bounds.left, bounds.top), (bounds.right, bounds.bottom));
        self.bounds = Some(normalized);
        self
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    /// Whether the pointer has at some point travelled far enough to count
    /// as a drag. Once started, a gesture stays a drag.
    pub fn is_drag(&self) -> bool {
        self.started
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.current = (x, y);
        self.started = self.started
            || (x - self.origin.0).abs() >= DRAG_THRESHOLD_PX
            || (y - self.origin.1).abs() >= DRAG_THRESHOLD_PX;
    }

    /// Current rectangle, clamped to the bounds if any.
    pub fn rect(&self) -> Rect {
        let rect = Rect::from_points(self.origin, self.current);
        match &self.bounds {
            Some(bounds) => rect.clamped(bounds),
            None => rect,
        }
    }

    /// Pointer-move: returns the rows to highlight.
    pub fn update(&mut self, x: f64, y: f64, candidates: &[RowBox]) -> &[RowId] {
        self.move_to(x, y);
        self.highlighted = if self.is_drag() {
            rows_in_rect(candidates, &self.rect())
        } else {
            Vec::new()
        };
        &self.highlighted
    }

    pub fn highlighted(&self) -> &[RowId] {
        &self.highlighted
    }

    /// Pointer-up: the committed rectangle and mode, or `None` for a click.
    pub fn finish(mut self, x: f64, y: f64) -> Option<(Rect, DragMode)> {
        self.move_to(x, y);
        self.is_drag().then(|| (self.rect(), self.mode))
    }
}
