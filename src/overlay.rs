//! Transient popups painted above every layer while a grab is running.

use crate::backend::Window;
use crate::layout::split::SplitType;
use crate::region::Rect;
use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub struct AltTabEntry {
    pub view: NodeId,
    pub title: String,
    pub urgent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    /// Live preview of a split bar being dragged.
    SplitPreview {
        split_type: SplitType,
        pack0: Rect,
        bar: Rect,
        pack1: Rect,
    },
    /// Area a dragged tab will land in.
    DropPreview,
    /// Follows the pointer while a tab is dragged.
    Ghost { title: String },
    AltTab {
        entries: Vec<AltTabEntry>,
        selected: usize,
    },
}

impl OverlayKind {
    pub fn label(&self) -> &'static str {
        match self {
            OverlayKind::SplitPreview { .. } => "split-preview",
            OverlayKind::DropPreview => "drop-preview",
            OverlayKind::Ghost { .. } => "ghost",
            OverlayKind::AltTab { .. } => "alt-tab",
        }
    }
}

#[derive(Debug)]
pub struct Overlay {
    pub kind: OverlayKind,
    /// Geometry on screen.
    pub rect: Rect,
    pub window: Option<Window>,
    pub needs_redraw: bool,
}

impl Overlay {
    pub fn new(kind: OverlayKind, rect: Rect) -> Self {
        Self {
            kind,
            rect,
            window: None,
            needs_redraw: true,
        }
    }
}

/// Height of one alt-tab row.
pub fn alt_tab_row_height(tab_height: i32) -> i32 {
    tab_height + 8
}

/// Alt-tab popup rectangle centered on `area`.
pub fn alt_tab_rect(area: Rect, entries: usize, tab_height: i32) -> Rect {
    let row = alt_tab_row_height(tab_height);
    let w = (area.w / 3).min(600).max(1);
    let h = (row * entries as i32 + 8).min(area.h).max(1);
    Rect::new(area.x + (area.w - w) / 2, area.y + (area.h - h) / 2, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_tab_is_centered() {
        let rect = alt_tab_rect(Rect::new(0, 0, 1200, 800), 3, 22);
        assert_eq!(rect.w, 400);
        assert_eq!(rect.h, 30 * 3 + 8);
        assert_eq!(rect.center(), Rect::new(0, 0, 1200, 800).center());
    }
}
