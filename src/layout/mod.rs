//! Tiling layout: viewports hold a tree of splits whose leaves are notebooks.

use crate::region::Rect;
use crate::tree::{NodeId, NodeKind, Order, Tree};
use crate::view::ViewKind;

pub mod dnd;
pub mod notebook;
pub mod split;

use notebook::{Notebook, TabMetrics};
use split::{compute_children_allocation, Size, Split, SplitType};

/// Geometry settings shared by the whole tiling tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMetrics {
    pub tabs: TabMetrics,
    pub split_width: i32,
}

impl LayoutMetrics {
    pub fn from_theme(theme: &page_config::Theme) -> Self {
        Self {
            tabs: TabMetrics::from_theme(theme),
            split_width: theme.split_width.max(0),
        }
    }
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self::from_theme(&page_config::Theme::default())
    }
}

/// Smallest size the subtree can be allocated without squeezing a notebook.
pub fn min_size(tree: &Tree, id: NodeId, metrics: &LayoutMetrics) -> Size {
    match tree.kind(id) {
        Some(NodeKind::Notebook(notebook)) => {
            let m = notebook.metrics();
            Size::new(m.min_width, m.min_height)
        }
        Some(NodeKind::Split(split)) => match Split::packs(tree, id) {
            Some((pack0, pack1)) => Split::min_size(
                split.split_type,
                min_size(tree, pack0, metrics),
                min_size(tree, pack1, metrics),
                metrics.split_width,
            ),
            None => Size::default(),
        },
        Some(NodeKind::Viewport(_)) => tree
            .children(id)
            .first()
            .map_or(Size::default(), |child| min_size(tree, *child, metrics)),
        _ => Size::default(),
    }
}

/// Lays out a viewport's tiling tree inside its work area.
pub fn update_viewport(tree: &mut Tree, viewport: NodeId, metrics: &LayoutMetrics) {
    let Some(area) = tree.viewport(viewport).map(|v| v.work_area) else {
        return;
    };
    if let Some(viewport) = tree.viewport_mut(viewport) {
        viewport.needs_redraw = true;
    }
    let children = tree.children(viewport).to_vec();
    for child in children {
        update_allocation(tree, child, area, metrics);
    }
}

/// Recursively assigns `rect` to the subtree rooted at `id`.
pub fn update_allocation(tree: &mut Tree, id: NodeId, rect: Rect, metrics: &LayoutMetrics) {
    match tree.kind(id) {
        Some(NodeKind::Split(split)) => {
            let split_type = split.split_type;
            let ratio = split.ratio();
            let Some((pack0, pack1)) = Split::packs(tree, id) else {
                return;
            };
            let has_parent = tree
                .parent(id)
                .is_some_and(|parent| tree.split(parent).is_some());
            let alloc = compute_children_allocation(
                split_type,
                ratio,
                rect,
                min_size(tree, pack0, metrics),
                min_size(tree, pack1, metrics),
                metrics.split_width,
                has_parent,
            );
            if let Some(split) = tree.split_mut(id) {
                split.allocation = rect;
                split.bar = alloc.bar;
            }
            update_allocation(tree, pack0, alloc.pack0, metrics);
            update_allocation(tree, pack1, alloc.pack1, metrics);
        }
        Some(NodeKind::Notebook(_)) => {
            let Some(notebook) = tree.notebook_mut(id) else {
                return;
            };
            notebook.set_allocation(rect, metrics.tabs);
            let client_area = notebook.client_area();
            let shown = notebook.shown();
            let views: Vec<_> = notebook.tabs().iter().map(|tab| tab.view).collect();

            for view_id in views {
                if let Some(view) = tree.view_mut(view_id) {
                    view.rect = client_area;
                    view.client_rect = client_area;
                }
                tree.set_visible(view_id, shown == Some(view_id));
            }
        }
        _ => (),
    }
}

/// Adds a detached empty notebook. Its tab order is its paint order, so the stack is locked.
pub fn new_notebook(tree: &mut Tree, metrics: &LayoutMetrics) -> NodeId {
    let notebook = tree.insert(NodeKind::Notebook(Notebook::new(metrics.tabs)));
    tree.set_stack_locked(notebook, true);
    notebook
}

/// Puts `view` into `notebook` as a tab at `index` (or last) and selects it.
pub fn attach_to_notebook(tree: &mut Tree, view: NodeId, notebook: NodeId, index: Option<usize>) {
    tree.push_child(notebook, view);
    if let Some(v) = tree.view_mut(view) {
        v.kind = ViewKind::Notebook { notebook };
    }
    if let Some(nb) = tree.notebook_mut(notebook) {
        nb.add(view, index);
        nb.select(view);
    }
}

/// Takes `view` out of its notebook, returning the notebook and the former tab index.
pub fn detach_from_notebook(tree: &mut Tree, view: NodeId) -> Option<(NodeId, usize)> {
    let notebook = tree.parent(view)?;
    let index = tree.notebook_mut(notebook)?.remove(view)?;
    tree.detach(view);
    Some((notebook, index))
}

/// Replaces `notebook` by a split holding it and a new empty notebook.
///
/// Returns the split and the new notebook. `new_first` puts the new notebook in `pack0`.
pub fn split_notebook(
    tree: &mut Tree,
    notebook: NodeId,
    split_type: SplitType,
    ratio: f64,
    new_first: bool,
    metrics: &LayoutMetrics,
) -> Option<(NodeId, NodeId)> {
    tree.notebook(notebook)?;
    let parent = tree.parent(notebook)?;
    let index = tree.children(parent).iter().position(|c| *c == notebook)?;

    let split = tree.insert(NodeKind::Split(Split::new(split_type, ratio)));
    let created = new_notebook(tree, metrics);
    tree.insert_child(parent, index, split);
    if new_first {
        tree.push_child(split, created);
        tree.push_child(split, notebook);
    } else {
        tree.push_child(split, notebook);
        tree.push_child(split, created);
    }

    debug!("split notebook {notebook:?} {split_type:?}, new notebook {created:?}");
    Some((split, created))
}

/// Removes `notebook` from its split, collapsing the split into the remaining side. The tabs of
/// the removed notebook move to the first notebook of that side, which is returned.
///
/// A notebook that is the only tiling node of its viewport is never removed.
pub fn remove_notebook(tree: &mut Tree, notebook: NodeId) -> Option<NodeId> {
    let split = tree.parent(notebook)?;
    let (pack0, pack1) = Split::packs(tree, split)?;
    let sibling = if pack0 == notebook { pack1 } else { pack0 };
    let grandparent = tree.parent(split)?;
    let index = tree.children(grandparent).iter().position(|c| *c == split)?;

    let target = tree
        .subtree(sibling, Order::DepthFirst)
        .into_iter()
        .find(|id| tree.notebook(*id).is_some())?;

    let views: Vec<_> = tree
        .notebook(notebook)?
        .tabs()
        .iter()
        .map(|tab| tab.view)
        .collect();
    for view in views {
        detach_from_notebook(tree, view);
        tree.push_child(target, view);
        if let Some(v) = tree.view_mut(view) {
            v.kind = ViewKind::Notebook { notebook: target };
        }
        if let Some(nb) = tree.notebook_mut(target) {
            nb.add(view, None);
        }
    }

    tree.insert_child(grandparent, index, sibling);
    tree.remove(split);

    debug!("removed notebook {notebook:?}, tabs moved to {target:?}");
    Some(target)
}

/// Viewport that contains `id`.
pub fn viewport_of(tree: &Tree, id: NodeId) -> Option<NodeId> {
    if tree.viewport(id).is_some() {
        return Some(id);
    }
    tree.find_ancestor(id, |kind| matches!(kind, NodeKind::Viewport(_)))
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::client::{Client, ClientProperties};
    use crate::view::View;
    use crate::workspace::Viewport;

    fn setup() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let viewport = tree.insert(NodeKind::Viewport(Viewport::new(Rect::new(0, 0, 1000, 600))));
        let notebook = tree.insert(NodeKind::Notebook(Notebook::new(TabMetrics::default())));
        tree.push_child(viewport, notebook);
        (tree, viewport, notebook)
    }

    fn add_view(tree: &mut Tree, notebook: NodeId, window: u32) -> NodeId {
        let client = Client::new(window, ClientProperties::default());
        let view = tree.insert(NodeKind::View(View::new(
            &client,
            ViewKind::Notebook { notebook },
        )));
        attach_to_notebook(tree, view, notebook, None);
        view
    }

    #[test]
    fn vertical_split_halves_viewport() {
        let (mut tree, viewport, notebook) = setup();
        let metrics = LayoutMetrics::default();
        let (split, created) =
            split_notebook(&mut tree, notebook, SplitType::Vertical, 0.5, false, &metrics).unwrap();
        update_viewport(&mut tree, viewport, &metrics);

        let left = tree.notebook(notebook).unwrap().allocation();
        let right = tree.notebook(created).unwrap().allocation();
        let bar = tree.split(split).unwrap().bar;
        assert_eq!(left.w + right.w + bar.w, 1000);
        assert!((left.w - right.w).abs() <= 1);
        assert_eq!(bar.w, metrics.split_width);
    }

    #[test]
    fn only_selected_tab_is_visible() {
        let (mut tree, viewport, notebook) = setup();
        let a = add_view(&mut tree, notebook, 0x100);
        let b = add_view(&mut tree, notebook, 0x200);
        update_viewport(&mut tree, viewport, &LayoutMetrics::default());

        assert!(!tree.is_shown(a));
        assert!(tree.is_shown(b));
        let area = tree.notebook(notebook).unwrap().client_area();
        assert_eq!(tree.view(b).unwrap().client_rect, area);
    }

    #[test]
    fn removing_notebook_collapses_split() {
        let (mut tree, viewport, notebook) = setup();
        let metrics = LayoutMetrics::default();
        add_view(&mut tree, notebook, 0x100);
        let (_, created) =
            split_notebook(&mut tree, notebook, SplitType::Horizontal, 0.5, true, &metrics)
                .unwrap();
        add_view(&mut tree, created, 0x200);
        let (_, nested) =
            split_notebook(&mut tree, created, SplitType::Vertical, 0.3, false, &metrics).unwrap();
        update_viewport(&mut tree, viewport, &metrics);

        assert_snapshot!(tree.debug_tree(viewport), @r"
        Viewport 1000x600+0+0
          Split Horizontal 0.50
            Split Vertical 0.30
              Notebook [0x200*]
                View notebook 0x200
              Notebook []
            Notebook [0x100*]
              View notebook 0x100
        ");

        assert_eq!(remove_notebook(&mut tree, created), Some(nested));
        update_viewport(&mut tree, viewport, &metrics);
        assert_snapshot!(tree.debug_tree(viewport), @r"
        Viewport 1000x600+0+0
          Split Horizontal 0.50
            Notebook [0x200*]
              View notebook 0x200
            Notebook [0x100*]
              View notebook 0x100
        ");

        assert_eq!(remove_notebook(&mut tree, notebook), Some(nested));
        assert_eq!(remove_notebook(&mut tree, nested), None);
        assert_snapshot!(tree.debug_tree(viewport), @r"
        Viewport 1000x600+0+0
          Notebook [0x200*, 0x100]
            View notebook 0x200
            View notebook 0x100
        ");
    }

    #[test]
    fn min_size_adds_up() {
        let (mut tree, viewport, notebook) = setup();
        let metrics = LayoutMetrics::default();
        split_notebook(&mut tree, notebook, SplitType::Vertical, 0.5, false, &metrics).unwrap();
        let size = min_size(&tree, viewport, &metrics);
        assert_eq!(size.w, metrics.tabs.min_width * 2 + metrics.split_width);
        assert_eq!(size.h, metrics.tabs.min_height);
    }
}
