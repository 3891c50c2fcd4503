//! Scene graph shared by every workspace.
//!
//! Nodes live in a [`SlotMap`] arena and are referenced by [`NodeId`]. A node exclusively owns
//! its children; the child list order is the paint order, back to front. Anything that merely
//! refers to a node elsewhere (focus history, grab handlers, fullscreen revert targets) keeps
//! the id and checks liveness with [`Tree::contains`].

use std::collections::VecDeque;
use std::fmt::Write as _;

use slotmap::{new_key_type, SlotMap};

use crate::layout::notebook::Notebook;
use crate::layout::split::Split;
use crate::overlay::Overlay;
use crate::region::Region;
use crate::view::View;
use crate::workspace::{LayerKind, Viewport, WorkspaceId};

new_key_type! {
    /// Handle of a node in the scene tree.
    pub struct NodeId;
}

/// Traversal order of [`Tree::gather_children`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    DepthFirst,
    BreadthFirst,
}

/// Direction in which a button press travels through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Containers see the press before their children.
    RootFirst,
    /// The topmost painted node sees the press first.
    TopmostFirst,
}

/// Answer of a node to a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Not mine, keep looking.
    Continue,
    /// Stop and let the X server deliver the press to the client.
    ReplayPointer,
    /// Stop and keep the pointer frozen until the grab handler releases it.
    SyncGrab,
    /// Stop and grab the pointer without freezing it.
    AsyncGrab,
    /// Stop, the handler already installed its grab.
    Grabbed,
}

#[derive(Debug)]
pub enum NodeKind {
    Root,
    Layer(LayerKind),
    Viewport(Viewport),
    Split(Split),
    Notebook(Notebook),
    View(View),
    Overlay(Overlay),
}

#[derive(Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    workspace: Option<WorkspaceId>,
    visible: bool,
    stack_locked: bool,
    damage: Region,
    pub kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            workspace: None,
            visible: true,
            stack_locked: false,
            damage: Region::new(),
            kind,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn workspace(&self) -> Option<WorkspaceId> {
        self.workspace
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_stack_locked(&self) -> bool {
        self.stack_locked
    }
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Adds a detached node.
    pub fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Appends `child` on top of the paint order of `parent`, detaching it first if needed.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    pub fn insert_child(&mut self, parent: NodeId, idx: usize, child: NodeId) {
        assert_ne!(parent, child, "a node cannot own itself");
        debug_assert!(
            !self.ancestors(parent).contains(&child),
            "inserting a node below itself"
        );

        self.detach(child);

        let workspace = self.nodes.get(parent).and_then(|p| p.workspace);
        let Some(p) = self.nodes.get_mut(parent) else {
            return;
        };
        let idx = idx.min(p.children.len());
        p.children.insert(idx, child);

        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
        self.set_workspace(child, workspace);
    }

    /// Unlinks `child` from its parent. The node stays in the arena.
    pub fn detach(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        true
    }

    /// Detaches `id` and drops it with its whole subtree, returning the removed nodes
    /// children first.
    pub fn remove(&mut self, id: NodeId) -> Vec<(NodeId, Node)> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);

        let mut ids = self.subtree(id, Order::DepthFirst);
        ids.reverse();
        ids.into_iter()
            .filter_map(|id| self.nodes.remove(id).map(|node| (id, node)))
            .collect()
    }

    /// All descendants of `id`, not including `id` itself.
    pub fn gather_children(&self, id: NodeId, order: Order) -> Vec<NodeId> {
        let mut out = Vec::new();
        match order {
            Order::DepthFirst => {
                let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
                while let Some(next) = stack.pop() {
                    out.push(next);
                    stack.extend(self.children(next).iter().rev().copied());
                }
            }
            Order::BreadthFirst => {
                let mut queue: VecDeque<NodeId> = self.children(id).iter().copied().collect();
                while let Some(next) = queue.pop_front() {
                    out.push(next);
                    queue.extend(self.children(next).iter().copied());
                }
            }
        }
        out
    }

    /// `id` followed by [`Tree::gather_children`].
    pub fn subtree(&self, id: NodeId, order: Order) -> Vec<NodeId> {
        let mut out = vec![id];
        out.extend(self.gather_children(id, order));
        out
    }

    /// Moves `id` to the top of its siblings. Does nothing when the parent's stack is locked.
    pub fn raise(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let Some(p) = self.nodes.get_mut(parent) else {
            return false;
        };
        if p.stack_locked {
            return false;
        }
        p.children.retain(|c| *c != id);
        p.children.push(id);
        true
    }

    /// Parents of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    pub fn find_ancestor(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|a| self.kind(*a).is_some_and(&pred))
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.visible = visible;
        }
    }

    /// Whether the node and every ancestor are visible.
    pub fn is_shown(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.visible)
            && self
                .ancestors(id)
                .into_iter()
                .all(|a| self.get(a).is_some_and(|n| n.visible))
    }

    pub fn set_stack_locked(&mut self, id: NodeId, locked: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.stack_locked = locked;
        }
    }

    pub fn workspace_of(&self, id: NodeId) -> Option<WorkspaceId> {
        self.get(id).and_then(|n| n.workspace)
    }

    fn set_workspace(&mut self, id: NodeId, workspace: Option<WorkspaceId>) {
        for node in self.subtree(id, Order::DepthFirst) {
            if let Some(n) = self.nodes.get_mut(node) {
                n.workspace = workspace;
            }
        }
    }

    /// Marks the root of a workspace; descendants inherit it on insertion.
    pub fn assign_workspace(&mut self, root: NodeId, workspace: WorkspaceId) {
        self.set_workspace(root, Some(workspace));
    }

    pub fn add_damage(&mut self, id: NodeId, damage: &Region) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.damage += damage;
        }
    }

    /// Collects and clears the damage of the whole subtree.
    pub fn take_damage(&mut self, id: NodeId) -> Region {
        let mut out = Region::new();
        for node in self.subtree(id, Order::DepthFirst) {
            if let Some(n) = self.nodes.get_mut(node) {
                out += &std::mem::take(&mut n.damage);
            }
        }
        out
    }

    /// Calls `f` on `root` and every descendant, over a list collected before the first call.
    pub fn broadcast(&mut self, root: NodeId, order: Order, mut f: impl FnMut(NodeId, &mut Node)) {
        for id in self.subtree(root, order) {
            if let Some(node) = self.nodes.get_mut(id) {
                f(id, node);
            }
        }
    }

    /// Offers a button press to the subtree until some node answers with something other than
    /// [`ButtonAction::Continue`].
    pub fn broadcast_button_press(
        &self,
        root: NodeId,
        dispatch: Dispatch,
        mut f: impl FnMut(NodeId, &Node) -> ButtonAction,
    ) -> Option<(NodeId, ButtonAction)> {
        let ids = match dispatch {
            Dispatch::RootFirst => self.subtree(root, Order::BreadthFirst),
            Dispatch::TopmostFirst => {
                let mut ids = self.subtree(root, Order::DepthFirst);
                ids.reverse();
                ids
            }
        };

        for id in ids {
            let Some(node) = self.get(id) else {
                continue;
            };
            if !self.is_shown(id) {
                continue;
            }
            match f(id, node) {
                ButtonAction::Continue => (),
                action => return Some((id, action)),
            }
        }
        None
    }

    pub fn view(&self, id: NodeId) -> Option<&View> {
        match self.kind(id)? {
            NodeKind::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn view_mut(&mut self, id: NodeId) -> Option<&mut View> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn notebook(&self, id: NodeId) -> Option<&Notebook> {
        match self.kind(id)? {
            NodeKind::Notebook(notebook) => Some(notebook),
            _ => None,
        }
    }

    pub fn notebook_mut(&mut self, id: NodeId) -> Option<&mut Notebook> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Notebook(notebook) => Some(notebook),
            _ => None,
        }
    }

    pub fn split(&self, id: NodeId) -> Option<&Split> {
        match self.kind(id)? {
            NodeKind::Split(split) => Some(split),
            _ => None,
        }
    }

    pub fn split_mut(&mut self, id: NodeId) -> Option<&mut Split> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Split(split) => Some(split),
            _ => None,
        }
    }

    pub fn viewport(&self, id: NodeId) -> Option<&Viewport> {
        match self.kind(id)? {
            NodeKind::Viewport(viewport) => Some(viewport),
            _ => None,
        }
    }

    pub fn viewport_mut(&mut self, id: NodeId) -> Option<&mut Viewport> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Viewport(viewport) => Some(viewport),
            _ => None,
        }
    }

    pub fn overlay(&self, id: NodeId) -> Option<&Overlay> {
        match self.kind(id)? {
            NodeKind::Overlay(overlay) => Some(overlay),
            _ => None,
        }
    }

    pub fn overlay_mut(&mut self, id: NodeId) -> Option<&mut Overlay> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Overlay(overlay) => Some(overlay),
            _ => None,
        }
    }

    pub fn views_in(&self, root: NodeId) -> Vec<NodeId> {
        self.subtree(root, Order::DepthFirst)
            .into_iter()
            .filter(|id| self.view(*id).is_some())
            .collect()
    }

    pub fn notebooks_in(&self, root: NodeId) -> Vec<NodeId> {
        self.subtree(root, Order::DepthFirst)
            .into_iter()
            .filter(|id| self.notebook(*id).is_some())
            .collect()
    }

    /// Area the subtree may paint into.
    pub fn visible_region(&self, id: NodeId) -> Region {
        let mut out = Region::new();
        for node in self.subtree(id, Order::DepthFirst) {
            if !self.is_shown(node) {
                continue;
            }
            match self.kind(node) {
                Some(NodeKind::View(view)) => out += view.rect,
                Some(NodeKind::Viewport(viewport)) => out += viewport.raw,
                Some(NodeKind::Overlay(overlay)) => out += overlay.rect,
                _ => (),
            }
        }
        out
    }

    /// Area the subtree is guaranteed to fully cover with opaque pixels.
    pub fn opaque_region(&self, id: NodeId) -> Region {
        let mut out = Region::new();
        for node in self.subtree(id, Order::DepthFirst) {
            if !self.is_shown(node) {
                continue;
            }
            match self.kind(node) {
                Some(NodeKind::View(view)) => out += &view.opaque_region(),
                Some(NodeKind::Viewport(viewport)) => out += viewport.raw,
                _ => (),
            }
        }
        out
    }

    /// Human-readable dump of the subtree, used by snapshot tests and debug logging.
    pub fn debug_tree(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.debug_tree_node(root, 0, &mut out);
        out
    }

    fn debug_tree_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.get(id) else {
            let _ = writeln!(out, "{indent}(missing)");
            return;
        };

        let hidden = if node.visible { "" } else { " (hidden)" };
        let label = match &node.kind {
            NodeKind::Root => String::from("Root"),
            NodeKind::Layer(kind) => format!("Layer {kind:?}"),
            NodeKind::Viewport(viewport) => format!("Viewport {:?}", viewport.raw),
            NodeKind::Split(split) => {
                format!("Split {:?} {:.2}", split.split_type, split.ratio())
            }
            NodeKind::Notebook(notebook) => {
                let tabs: Vec<String> = notebook
                    .tabs()
                    .iter()
                    .map(|tab| {
                        let window = self.view(tab.view).map_or(0, |v| v.client);
                        let selected = if notebook.selected() == Some(tab.view) {
                            "*"
                        } else {
                            ""
                        };
                        let iconic = if tab.iconic { "~" } else { "" };
                        format!("{window:#x}{selected}{iconic}")
                    })
                    .collect();
                format!("Notebook [{}]", tabs.join(", "))
            }
            NodeKind::View(view) => format!("View {} {:#x}", view.kind.label(), view.client),
            NodeKind::Overlay(overlay) => format!("Overlay {}", overlay.kind.label()),
        };
        let _ = writeln!(out, "{indent}{label}{hidden}");

        for child in &node.children {
            self.debug_tree_node(*child, depth + 1, out);
        }
    }
}
