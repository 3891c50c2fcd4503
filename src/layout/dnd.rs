//! Drop zones of a notebook while a tab is dragged over it.

use crate::layout::split::SplitType;
use crate::region::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    /// Over the tab strip: becomes a new tab.
    Tabs,
    Top,
    Bottom,
    Left,
    Right,
    /// Middle of the client area: becomes a new tab.
    Center,
}

impl DropZone {
    /// Split to create for an edge zone, and whether the dragged client goes into `pack0`.
    pub fn split(self) -> Option<(SplitType, bool)> {
        match self {
            DropZone::Top => Some((SplitType::Horizontal, true)),
            DropZone::Bottom => Some((SplitType::Horizontal, false)),
            DropZone::Left => Some((SplitType::Vertical, true)),
            DropZone::Right => Some((SplitType::Vertical, false)),
            DropZone::Tabs | DropZone::Center => None,
        }
    }
}

/// Classifies `p` relative to a notebook. The center zone covers the middle half of the
/// notebook in both directions; the rest goes to the nearest edge.
pub fn drop_zone(notebook: Rect, tab_bar: Rect, p: Point) -> Option<DropZone> {
    if !notebook.contains_point(p) {
        return None;
    }
    if tab_bar.contains_point(p) {
        return Some(DropZone::Tabs);
    }

    let center = Rect::new(
        notebook.x + notebook.w / 4,
        notebook.y + notebook.h / 4,
        notebook.w / 2,
        notebook.h / 2,
    );
    if center.contains_point(p) {
        return Some(DropZone::Center);
    }

    // Distances relative to the notebook size.
    let w = f64::from(notebook.w.max(1));
    let h = f64::from(notebook.h.max(1));
    let left = f64::from(p.x - notebook.x) / w;
    let right = f64::from(notebook.right() - p.x) / w;
    let top = f64::from(p.y - notebook.y) / h;
    let bottom = f64::from(notebook.bottom() - p.y) / h;

    let candidates = [
        (left, DropZone::Left),
        (right, DropZone::Right),
        (top, DropZone::Top),
        (bottom, DropZone::Bottom),
    ];
    candidates
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, zone)| zone)
}

/// Area highlighted while hovering `zone`.
pub fn zone_preview(notebook: Rect, zone: DropZone) -> Rect {
    let (hw, hh) = (notebook.w / 2, notebook.h / 2);
    match zone {
        DropZone::Tabs | DropZone::Center => notebook,
        DropZone::Left => Rect::new(notebook.x, notebook.y, hw, notebook.h),
        DropZone::Right => Rect::new(notebook.right() - hw, notebook.y, hw, notebook.h),
        DropZone::Top => Rect::new(notebook.x, notebook.y, notebook.w, hh),
        DropZone::Bottom => Rect::new(notebook.x, notebook.bottom() - hh, notebook.w, hh),
    }
}
