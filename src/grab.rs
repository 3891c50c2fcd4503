//! Interactive grabs.
//!
//! A grab handler owns all transient state of one pointer or keyboard interaction. While it
//! runs only previews change; the final release commits the result, so cancelling a grab is
//! dropping its handler after [`GrabHandler::cancel`] removed the previews.

use page_config::{Key, Modifiers};

use crate::backend::{Backend, ButtonEvent, KeyEvent, MotionEvent};
use crate::layout;
use crate::layout::dnd::{drop_zone, zone_preview, DropZone};
use crate::layout::split::{compute_children_allocation, compute_split_constraint, Split};
use crate::overlay::{alt_tab_rect, AltTabEntry, OverlayKind};
use crate::page::Page;
use crate::region::{Point, Rect};
use crate::tree::NodeId;
use crate::view::floating::{resize_rect, ResizeEdge};

/// Pointer travel before a press on a tab turns into a drag.
const DRAG_THRESHOLD: i32 = 4;

const XK_ESCAPE: u32 = 0xff1b;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    Continue,
    Done,
}

pub trait GrabHandler<B: Backend> {
    fn motion(&mut self, page: &mut Page<B>, event: &MotionEvent);
    fn button_release(&mut self, page: &mut Page<B>, event: &ButtonEvent) -> GrabStatus;

    fn key_press(&mut self, _page: &mut Page<B>, _event: &KeyEvent) -> GrabStatus {
        GrabStatus::Continue
    }

    fn key_release(&mut self, _page: &mut Page<B>, _event: &KeyEvent) -> GrabStatus {
        GrabStatus::Continue
    }

    /// Removes previews and restores what the grab changed.
    fn cancel(&mut self, page: &mut Page<B>);
}

/// Drags a floating window by its title bar.
#[derive(Debug)]
pub struct MoveGrab {
    view: NodeId,
    start: Point,
    original: Rect,
}

impl MoveGrab {
    pub fn new(view: NodeId, start: Point, original: Rect) -> Self {
        Self {
            view,
            start,
            original,
        }
    }

    fn target(&self, p: Point) -> Rect {
        let d = p - self.start;
        self.original.translate(d.x, d.y)
    }
}

impl<B: Backend> GrabHandler<B> for MoveGrab {
    fn motion(&mut self, page: &mut Page<B>, event: &MotionEvent) {
        page.move_floating(self.view, self.target(event.root));
    }

    fn button_release(&mut self, page: &mut Page<B>, event: &ButtonEvent) -> GrabStatus {
        page.move_floating(self.view, self.target(event.root));
        GrabStatus::Done
    }

    fn cancel(&mut self, page: &mut Page<B>) {
        page.move_floating(self.view, self.original);
    }
}

/// Drags one of the eight grips of a floating window.
#[derive(Debug)]
pub struct ResizeGrab {
    view: NodeId,
    edges: ResizeEdge,
    start: Point,
    original: Rect,
}

impl ResizeGrab {
    pub fn new(view: NodeId, edges: ResizeEdge, start: Point, original: Rect) -> Self {
        Self {
            view,
            edges,
            start,
            original,
        }
    }

    fn target<B: Backend>(&self, page: &Page<B>, p: Point) -> Rect {
        let hints = page.size_hints(self.view);
        let d = p - self.start;
        resize_rect(self.original, self.edges, d.x, d.y, &hints)
    }
}

impl<B: Backend> GrabHandler<B> for ResizeGrab {
    fn motion(&mut self, page: &mut Page<B>, event: &MotionEvent) {
        let rect = self.target(page, event.root);
        page.move_floating(self.view, rect);
    }

    fn button_release(&mut self, page: &mut Page<B>, event: &ButtonEvent) -> GrabStatus {
        let rect = self.target(page, event.root);
        page.move_floating(self.view, rect);
        GrabStatus::Done
    }

    fn cancel(&mut self, page: &mut Page<B>) {
        page.move_floating(self.view, self.original);
    }
}

/// Drags a split bar, previewing the new ratio in an overlay.
#[derive(Debug)]
pub struct SplitGrab {
    split: NodeId,
    overlay: Option<NodeId>,
    ratio: f64,
}

impl SplitGrab {
    pub fn new<B: Backend>(page: &mut Page<B>, split: NodeId) -> Option<Self> {
        let ratio = page.tree.split(split)?.ratio();
        let mut grab = Self {
            split,
            overlay: None,
            ratio,
        };
        let (kind, rect) = grab.preview(page, ratio)?;
        grab.overlay = page.add_overlay(kind, rect);
        Some(grab)
    }

    fn preview<B: Backend>(&self, page: &Page<B>, ratio: f64) -> Option<(OverlayKind, Rect)> {
        let split = page.tree.split(self.split)?;
        let (pack0, pack1) = Split::packs(&page.tree, self.split)?;
        let alloc = split.allocation;
        let has_parent = page
            .tree
            .parent(self.split)
            .is_some_and(|parent| page.tree.split(parent).is_some());
        let a = compute_children_allocation(
            split.split_type,
            ratio,
            alloc,
            layout::min_size(&page.tree, pack0, &page.metrics),
            layout::min_size(&page.tree, pack1, &page.metrics),
            page.metrics.split_width,
            has_parent,
        );
        let local = |r: Rect| r.translate(-alloc.x, -alloc.y);
        let kind = OverlayKind::SplitPreview {
            split_type: split.split_type,
            pack0: local(a.pack0),
            bar: local(a.bar),
            pack1: local(a.pack1),
        };
        Some((kind, alloc))
    }

    fn update<B: Backend>(&mut self, page: &mut Page<B>, p: Point) {
        let Some(split) = page.tree.split(self.split) else {
            return;
        };
        self.ratio = compute_split_constraint(
            split.split_type,
            split.allocation,
            p,
            page.metrics.split_width,
        );
        if let (Some(overlay), Some((kind, rect))) = (self.overlay, self.preview(page, self.ratio)) {
            page.update_overlay(overlay, kind, rect);
        }
    }
}

impl<B: Backend> GrabHandler<B> for SplitGrab {
    fn motion(&mut self, page: &mut Page<B>, event: &MotionEvent) {
        self.update(page, event.root);
    }

    fn button_release(&mut self, page: &mut Page<B>, event: &ButtonEvent) -> GrabStatus {
        self.update(page, event.root);
        if let Some(overlay) = self.overlay.take() {
            page.remove_overlay(overlay);
        }
        page.set_split_ratio(self.split, self.ratio);
        GrabStatus::Done
    }

    fn cancel(&mut self, page: &mut Page<B>) {
        if let Some(overlay) = self.overlay.take() {
            page.remove_overlay(overlay);
        }
    }
}

/// Press on a tab: a click selects it, a drag moves the client to another notebook, to a new
/// split, or out of the tiling layer.
#[derive(Debug)]
pub struct TabDragGrab {
    view: NodeId,
    start: Point,
    ghost: Option<NodeId>,
    preview: Option<NodeId>,
    target: Option<(NodeId, DropZone)>,
    dragging: bool,
}

impl TabDragGrab {
    pub fn new(view: NodeId, start: Point) -> Self {
        Self {
            view,
            start,
            ghost: None,
            preview: None,
            target: None,
            dragging: false,
        }
    }

    fn ghost_rect<B: Backend>(page: &Page<B>, p: Point) -> Rect {
        let tabs = &page.metrics.tabs;
        Rect::new(p.x + 8, p.y + 8, tabs.tab_min_width * 2, tabs.tab_height)
    }

    fn remove_previews<B: Backend>(&mut self, page: &mut Page<B>) {
        for overlay in [self.ghost.take(), self.preview.take()].into_iter().flatten() {
            page.remove_overlay(overlay);
        }
    }

    fn update<B: Backend>(&mut self, page: &mut Page<B>, p: Point) {
        if !self.dragging {
            let d = p - self.start;
            if d.x.abs() <= DRAG_THRESHOLD && d.y.abs() <= DRAG_THRESHOLD {
                return;
            }
            self.dragging = true;
            let title = page
                .tree
                .view(self.view)
                .map(|view| view.title.clone())
                .unwrap_or_default();
            self.ghost = page.add_overlay(OverlayKind::Ghost { title }, Self::ghost_rect(page, p));
        }

        if let Some(ghost) = self.ghost {
            page.move_overlay(ghost, Self::ghost_rect(page, p));
        }

        self.target = page.notebook_at(p).and_then(|notebook| {
            let nb = page.tree.notebook(notebook)?;
            let zone = drop_zone(nb.allocation(), nb.layout().bar, p)?;
            Some((notebook, zone))
        });

        let preview = self.target.and_then(|(notebook, zone)| {
            let nb = page.tree.notebook(notebook)?;
            Some(zone_preview(nb.allocation(), zone))
        });
        match (preview, self.preview) {
            (Some(rect), Some(overlay)) => page.move_overlay(overlay, rect),
            (Some(rect), None) => self.preview = page.add_overlay(OverlayKind::DropPreview, rect),
            (None, Some(overlay)) => {
                page.remove_overlay(overlay);
                self.preview = None;
            }
            (None, None) => (),
        }
    }
}

impl<B: Backend> GrabHandler<B> for TabDragGrab {
    fn motion(&mut self, page: &mut Page<B>, event: &MotionEvent) {
        self.update(page, event.root);
    }

    fn button_release(&mut self, page: &mut Page<B>, event: &ButtonEvent) -> GrabStatus {
        self.update(page, event.root);
        self.remove_previews(page);
        if !self.dragging {
            return GrabStatus::Done;
        }

        match self.target {
            Some((notebook, zone)) => page.drop_view(self.view, notebook, zone),
            None => page.float_view_at(self.view, event.root),
        }
        GrabStatus::Done
    }

    fn cancel(&mut self, page: &mut Page<B>) {
        self.remove_previews(page);
    }
}

/// Keyboard-driven cycling through the focus history.
#[derive(Debug)]
pub struct AltTabGrab {
    entries: Vec<NodeId>,
    selected: usize,
    overlay: Option<NodeId>,
    cycle_key: u32,
    /// Modifiers of the binding; releasing one of them commits.
    modifiers: Modifiers,
}

impl AltTabGrab {
    /// Starts cycling from the view focused before the current one. Returns `None` when there
    /// is nothing to cycle through.
    pub fn new<B: Backend>(page: &mut Page<B>, key: Key) -> Option<Self> {
        let entries = page.focus_history();
        if entries.is_empty() {
            return None;
        }
        let mut grab = Self {
            selected: 1 % entries.len(),
            entries,
            overlay: None,
            cycle_key: key.keysym.raw(),
            modifiers: key.modifiers,
        };
        let (kind, rect) = grab.popup(page)?;
        grab.overlay = page.add_overlay(kind, rect);
        Some(grab)
    }

    fn popup<B: Backend>(&self, page: &Page<B>) -> Option<(OverlayKind, Rect)> {
        let entries: Vec<_> = self
            .entries
            .iter()
            .filter_map(|id| {
                let view = page.tree.view(*id)?;
                Some(AltTabEntry {
                    view: *id,
                    title: view.title.clone(),
                    urgent: view.urgent,
                })
            })
            .collect();
        let area = page.active_work_area()?;
        let rect = alt_tab_rect(area, entries.len(), page.metrics.tabs.tab_height);
        Some((
            OverlayKind::AltTab {
                entries,
                selected: self.selected,
            },
            rect,
        ))
    }

    fn step<B: Backend>(&mut self, page: &mut Page<B>, forward: bool) {
        let len = self.entries.len();
        self.selected = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        if let (Some(overlay), Some((kind, rect))) = (self.overlay, self.popup(page)) {
            page.update_overlay(overlay, kind, rect);
        }
    }

    fn close<B: Backend>(&mut self, page: &mut Page<B>) {
        if let Some(overlay) = self.overlay.take() {
            page.remove_overlay(overlay);
        }
    }
}

/// Modifier a key sets while held, with the usual X modifier mapping.
fn modifier_of_keysym(keysym: u32) -> Modifiers {
    match keysym {
        // Shift_L, Shift_R.
        0xffe1 | 0xffe2 => Modifiers::SHIFT,
        // Control_L, Control_R.
        0xffe3 | 0xffe4 => Modifiers::CTRL,
        // Meta_L ..= Alt_R.
        0xffe7..=0xffea => Modifiers::ALT,
        // Super_L ..= Hyper_R.
        0xffeb..=0xffee => Modifiers::SUPER,
        // ISO_Level3_Shift.
        0xfe03 => Modifiers::ISO_LEVEL3_SHIFT,
        // ISO_Level5_Shift.
        0xfe11 => Modifiers::ISO_LEVEL5_SHIFT,
        _ => Modifiers::empty(),
    }
}

impl<B: Backend> GrabHandler<B> for AltTabGrab {
    fn motion(&mut self, _page: &mut Page<B>, _event: &MotionEvent) {}

    fn button_release(&mut self, _page: &mut Page<B>, _event: &ButtonEvent) -> GrabStatus {
        GrabStatus::Continue
    }

    fn key_press(&mut self, page: &mut Page<B>, event: &KeyEvent) -> GrabStatus {
        if event.keysym == XK_ESCAPE {
            self.close(page);
            return GrabStatus::Done;
        }
        if event.keysym == self.cycle_key {
            let backwards = event.modifiers & Modifiers::SHIFT.bits() != 0;
            self.step(page, !backwards);
        }
        GrabStatus::Continue
    }

    fn key_release(&mut self, page: &mut Page<B>, event: &KeyEvent) -> GrabStatus {
        let commit = if self.modifiers.is_empty() {
            event.keysym == self.cycle_key
        } else {
            self.modifiers.intersects(modifier_of_keysym(event.keysym))
        };
        if !commit {
            return GrabStatus::Continue;
        }
        self.close(page);
        if let Some(view) = self.entries.get(self.selected).copied() {
            page.activate(view, event.time);
        }
        GrabStatus::Done
    }

    fn cancel(&mut self, page: &mut Page<B>) {
        self.close(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_target_follows_pointer() {
        let grab = MoveGrab::new(NodeId::default(), Point::new(10, 10), Rect::new(100, 100, 50, 40));
        assert_eq!(grab.target(Point::new(25, 5)), Rect::new(115, 95, 50, 40));
    }

    #[test]
    fn modifier_keysyms() {
        assert_eq!(modifier_of_keysym(0xffe9), Modifiers::ALT); // Alt_L
        assert_eq!(modifier_of_keysym(0xffeb), Modifiers::SUPER); // Super_L
        assert_eq!(modifier_of_keysym(0xffe2), Modifiers::SHIFT); // Shift_R
        assert_eq!(modifier_of_keysym(0xfe03), Modifiers::ISO_LEVEL3_SHIFT);
        assert!(modifier_of_keysym(0xff09).is_empty()); // Tab
        assert!(modifier_of_keysym(0x61).is_empty());
    }
}
