//! Grid position validation and layout synchronisation.
//!
//! Rectangles arrive from the editor as signed integers so that negative
//! coordinates are reported as validation errors instead of parse failures.
//! A valid rectangle has `x, y >= 0`, `w, h >= 1` and `x + w <= columns`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use trellis_store::{GridRect, Id, Widget};

use crate::error::ValidationErrors;

/// Partial rectangle. Missing coordinates keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPatch {
    #[serde(default)]
    pub x: Option<i64>,
    #[serde(default)]
    pub y: Option<i64>,
    #[serde(default)]
    pub w: Option<i64>,
    #[serde(default)]
    pub h: Option<i64>,
}

impl PositionPatch {
    /// Whether no coordinate is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.w.is_none() && self.h.is_none()
    }

    /// Apply over `base` and validate the result.
    pub fn apply(&self, base: GridRect, columns: u16) -> Result<GridRect, ValidationErrors> {
        validate_rect(
            self.x.unwrap_or(i64::from(base.x)),
            self.y.unwrap_or(i64::from(base.y)),
            self.w.unwrap_or(i64::from(base.w)),
            self.h.unwrap_or(i64::from(base.h)),
            columns,
        )
    }
}

/// Build a rectangle, checking it fits a grid of `columns` columns.
pub fn validate_rect(
    x: i64,
    y: i64,
    w: i64,
    h: i64,
    columns: u16,
) -> Result<GridRect, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let cols = i64::from(columns);
    let unbounded = i64::from(u16::MAX);

    let x = coordinate(&mut errors, "x", x, 0, cols - 1);
    let y = coordinate(&mut errors, "y", y, 0, unbounded);
    let w = coordinate(&mut errors, "w", w, 1, cols);
    let h = coordinate(&mut errors, "h", h, 1, unbounded);

    if errors.is_empty() && u32::from(x) + u32::from(w) > u32::from(columns) {
        errors.add("w", format!("x + w must not exceed {columns} columns"));
    }

    if errors.is_empty() {
        Ok(GridRect::new(x, y, w, h))
    } else {
        Err(errors)
    }
}

fn coordinate(errors: &mut ValidationErrors, field: &str, value: i64, min: i64, max: i64) -> u16 {
    if value < min {
        errors.add(
            field,
            if min == 0 {
                "must not be negative".to_owned()
            } else {
                format!("must be at least {min}")
            },
        );
        return 0;
    }
    match u16::try_from(value) {
        Ok(v) if value <= max => v,
        _ => {
            errors.add(field, format!("must not exceed {max}"));
            0
        }
    }
}

/// Reject `rect` if it overlaps a locked sibling other than `id`.
///
/// Siblings are `(id, rect, locked)` triples.
pub fn check_locked_overlap(
    id: Option<Id>,
    rect: &GridRect,
    siblings: impl IntoIterator<Item = (Id, GridRect, bool)>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for (sibling_id, sibling_rect, locked) in siblings {
        if locked && Some(sibling_id) != id && rect.overlaps(&sibling_rect) {
            errors.add("position", format!("overlaps locked sibling {sibling_id}"));
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// First free row below `rects`, for appending a new full-width item.
#[must_use]
pub fn next_row(rects: impl IntoIterator<Item = GridRect>) -> u16 {
    let bottom = rects.into_iter().map(|r| r.bottom()).max().unwrap_or(0);
    u16::try_from(bottom).unwrap_or(u16::MAX)
}

/// One widget rectangle from an editor layout sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutItem {
    pub id: Id,
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    /// Expected widget version, for optimistic concurrency.
    #[serde(default)]
    pub version: Option<u64>,
}

/// Plan the writes for a layout sync of one section.
///
/// Every item must name a widget of `widgets` at most once and carry a valid
/// rectangle that does not overlap a locked sibling in the resulting layout.
/// Order indices are then renumbered to follow the grid: positioned widgets by
/// `(y, x, id)`, followed by unpositioned ones by their previous order.
/// Only widgets whose position or order changes are returned.
pub fn plan_layout(
    widgets: &[Widget],
    items: &[LayoutItem],
    columns: u16,
) -> Result<Vec<(Widget, Option<u64>)>, ValidationErrors> {
    let known: HashSet<Id> = widgets.iter().map(|w| w.id).collect();
    let mut errors = ValidationErrors::new();
    let mut moved: HashMap<Id, (GridRect, Option<u64>, usize)> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        let path = format!("items[{index}]");
        if !known.contains(&item.id) {
            errors.add(
                format!("{path}.id"),
                format!("widget {} is not in this section", item.id),
            );
            continue;
        }
        if moved.contains_key(&item.id) {
            errors.add(
                format!("{path}.id"),
                format!("widget {} appears more than once", item.id),
            );
            continue;
        }
        match validate_rect(item.x, item.y, item.w, item.h, columns) {
            Ok(rect) => {
                moved.insert(item.id, (rect, item.version, index));
            }
            Err(e) => errors.merge_prefixed(&path, e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let layout: Vec<(Id, Option<GridRect>, bool)> = widgets
        .iter()
        .map(|w| {
            let rect = moved.get(&w.id).map(|(rect, ..)| *rect).or(w.position);
            (w.id, rect, w.locked)
        })
        .collect();

    for (id, (rect, _, index)) in &moved {
        let siblings = layout
            .iter()
            .filter_map(|(sid, r, locked)| r.map(|r| (*sid, r, *locked)));
        if let Err(e) = check_locked_overlap(Some(*id), rect, siblings) {
            errors.merge_prefixed(&format!("items[{index}]"), e);
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut ordered: Vec<(&Widget, Option<GridRect>)> = widgets
        .iter()
        .map(|w| (w, moved.get(&w.id).map(|(rect, ..)| *rect).or(w.position)))
        .collect();
    ordered.sort_by_key(|(w, rect)| match rect {
        Some(r) => (0, i64::from(r.y), i64::from(r.x), w.id),
        None => (1, i64::from(w.order), 0, w.id),
    });

    let mut writes = Vec::new();
    for (index, (widget, rect)) in ordered.into_iter().enumerate() {
        let order = i32::try_from(index).unwrap_or(i32::MAX);
        if widget.order == order && widget.position == rect {
            continue;
        }
        let version = moved.get(&widget.id).and_then(|(_, version, _)| *version);
        let mut updated = widget.clone();
        updated.order = order;
        updated.position = rect;
        writes.push((updated, version));
    }
    Ok(writes)
}
