//! Workspaces, their layer stack and their viewports.

use crate::backend::Window;
use crate::client::Strut;
use crate::region::{Point, Rect};
use crate::tree::{NodeId, NodeKind, Order, Tree};

pub type WorkspaceId = usize;

/// Layers of a workspace, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Tiling,
    Dock,
    Floating,
    Fullscreen,
    Tooltips,
    Notifications,
    Overlays,
}

impl LayerKind {
    pub const ALL: [LayerKind; 7] = [
        LayerKind::Tiling,
        LayerKind::Dock,
        LayerKind::Floating,
        LayerKind::Fullscreen,
        LayerKind::Tooltips,
        LayerKind::Notifications,
        LayerKind::Overlays,
    ];
}

/// One output of the virtual desktop.
#[derive(Debug)]
pub struct Viewport {
    /// Output geometry.
    pub raw: Rect,
    /// Output geometry minus dock struts.
    pub work_area: Rect,
    /// Opaque window the tiling decorations are drawn into.
    pub back: Option<Window>,
    pub needs_redraw: bool,
}

impl Viewport {
    pub fn new(raw: Rect) -> Self {
        Self {
            raw,
            work_area: raw,
            back: None,
            needs_redraw: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Layers {
    nodes: [NodeId; 7],
}

impl Layers {
    pub fn get(&self, kind: LayerKind) -> NodeId {
        let idx = LayerKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        self.nodes[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, NodeId)> + '_ {
        LayerKind::ALL.into_iter().zip(self.nodes.iter().copied())
    }
}

#[derive(Debug)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub root: NodeId,
    pub layers: Layers,
    /// Most recently focused views first.
    focus_history: Vec<NodeId>,
}

impl Workspace {
    pub fn new(tree: &mut Tree, id: WorkspaceId) -> Self {
        let root = tree.insert(NodeKind::Root);
        tree.assign_workspace(root, id);
        // Layers never change their relative order.
        tree.set_stack_locked(root, true);

        let nodes = LayerKind::ALL.map(|kind| {
            let layer = tree.insert(NodeKind::Layer(kind));
            tree.push_child(root, layer);
            layer
        });

        Self {
            id,
            root,
            layers: Layers { nodes },
            focus_history: Vec::new(),
        }
    }

    pub fn layer(&self, kind: LayerKind) -> NodeId {
        self.layers.get(kind)
    }

    pub fn viewports(&self, tree: &Tree) -> Vec<NodeId> {
        tree.children(self.layer(LayerKind::Tiling))
            .iter()
            .copied()
            .filter(|id| tree.viewport(*id).is_some())
            .collect()
    }

    pub fn default_viewport(&self, tree: &Tree) -> Option<NodeId> {
        self.viewports(tree).first().copied()
    }

    pub fn viewport_at(&self, tree: &Tree, p: Point) -> Option<NodeId> {
        self.viewports(tree)
            .into_iter()
            .find(|id| tree.viewport(*id).is_some_and(|v| v.raw.contains_point(p)))
    }

    /// Viewport that contains most of `rect`, or the first one.
    pub fn viewport_for_rect(&self, tree: &Tree, rect: Rect) -> Option<NodeId> {
        let viewports = self.viewports(tree);
        viewports
            .iter()
            .copied()
            .max_by_key(|id| {
                tree.viewport(*id)
                    .and_then(|v| v.raw.intersection(&rect))
                    .map_or(0, |r| r.area())
            })
            .or_else(|| viewports.first().copied())
    }

    /// First notebook of the first viewport, where new clients land by default.
    pub fn default_notebook(&self, tree: &Tree) -> Option<NodeId> {
        let viewport = self.default_viewport(tree)?;
        tree.gather_children(viewport, Order::DepthFirst)
            .into_iter()
            .find(|id| tree.notebook(*id).is_some())
    }

    pub fn notebooks(&self, tree: &Tree) -> Vec<NodeId> {
        tree.notebooks_in(self.layer(LayerKind::Tiling))
    }

    /// Records `view` as the most recently focused.
    pub fn push_focus(&mut self, view: NodeId) {
        self.focus_history.retain(|id| *id != view);
        self.focus_history.insert(0, view);
    }

    pub fn forget_focus(&mut self, view: NodeId) {
        self.focus_history.retain(|id| *id != view);
    }

    /// Focus history with views that no longer exist dropped.
    pub fn focus_history(&mut self, tree: &Tree) -> &[NodeId] {
        self.focus_history
            .retain(|id| tree.view(*id).is_some_and(|v| v.kind.is_focusable()));
        &self.focus_history
    }

    pub fn last_focused(&mut self, tree: &Tree) -> Option<NodeId> {
        self.focus_history(tree).first().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Screen areas reserved by a dock, in root coordinates.
pub fn reserved_areas(strut: &Strut, screen: Rect) -> Vec<(Side, Rect)> {
    let mut out = Vec::new();
    if strut.left > 0 {
        out.push((
            Side::Left,
            Rect::from_extents(
                screen.x,
                strut.left_start_y,
                screen.x + strut.left,
                strut.left_end_y + 1,
            ),
        ));
    }
    if strut.right > 0 {
        out.push((
            Side::Right,
            Rect::from_extents(
                screen.right() - strut.right,
                strut.right_start_y,
                screen.right(),
                strut.right_end_y + 1,
            ),
        ));
    }
    if strut.top > 0 {
        out.push((
            Side::Top,
            Rect::from_extents(
                strut.top_start_x,
                screen.y,
                strut.top_end_x + 1,
                screen.y + strut.top,
            ),
        ));
    }
    if strut.bottom > 0 {
        out.push((
            Side::Bottom,
            Rect::from_extents(
                strut.bottom_start_x,
                screen.bottom() - strut.bottom,
                strut.bottom_end_x + 1,
                screen.bottom(),
            ),
        ));
    }
    out.retain(|(_, r)| !r.is_empty());
    out
}

/// Shrinks an output rectangle away from the reserved areas that overlap it.
pub fn work_area(raw: Rect, reserved: &[(Side, Rect)]) -> Rect {
    let (mut x0, mut y0, mut x1, mut y1) = (raw.x, raw.y, raw.right(), raw.bottom());
    for (side, area) in reserved {
        if !area.intersects(&raw) {
            continue;
        }
        match side {
            Side::Left => x0 = x0.max(area.right()),
            Side::Right => x1 = x1.min(area.x),
            Side::Top => y0 = y0.max(area.bottom()),
            Side::Bottom => y1 = y1.min(area.y),
        }
    }
    let area = Rect::from_extents(x0, y0, x1.max(x0), y1.max(y0));
    if area.is_empty() {
        raw
    } else {
        area
    }
}
