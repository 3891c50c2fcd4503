use approx::assert_abs_diff_eq;
use page_config::Action;

use super::*;
use crate::client::{ClientProperties, Strut, WindowType, WmState};
use crate::layout::notebook::TabBarHit;
use crate::region::{Point, Rect};
use crate::tree::NodeId;
use crate::view::ViewKind;

fn notebook_of(f: &Fixture, w: u32) -> NodeId {
    match f.view(w).kind {
        ViewKind::Notebook { notebook } => notebook,
        kind => panic!("expected a tiled view, got {kind:?}"),
    }
}

fn notebook_count(f: &Fixture) -> usize {
    f.page.workspace().notebooks(&f.page.tree).len()
}

#[test]
fn vertical_split_from_the_keyboard() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let notebook = notebook_of(&f, w);

    f.press_bind(Action::SplitVertical);

    assert_eq!(notebook_count(&f), 2);
    let split = f.page.tree.parent(notebook).unwrap();
    let split = f.page.tree.split(split).unwrap();
    assert_eq!(split.bar, Rect::new(496, 0, 8, 800));

    let nb = f.page.tree.notebook(notebook).unwrap();
    assert_eq!(nb.allocation(), Rect::new(0, 0, 496, 800));
    // Tab bar on top, notebook margins around the client.
    assert_eq!(f.view(w).client_rect, Rect::new(3, 22, 490, 775));
    assert_eq!(f.page.backend.root_rect(w), Rect::new(3, 22, 490, 775));
    assert!(f.view(w).focused);
}

#[test]
fn new_clients_go_to_the_focused_notebook() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    f.press_bind(Action::SplitHorizontal);

    let bottom = f.page.workspace().notebooks(&f.page.tree)[1];
    assert_ne!(bottom, notebook_of(&f, a));

    let b = f.map_tiled();
    assert_eq!(notebook_of(&f, a), notebook_of(&f, b));

    f.page.bind_to_notebook(f.view_id(b), Some(bottom));
    f.dispatch();
    assert_eq!(notebook_of(&f, b), bottom);
    assert!(f.view(b).focused);

    let c = f.map_tiled();
    assert_eq!(notebook_of(&f, c), bottom);
    // Both notebooks show their selected client.
    assert!(f.page.backend.is_viewable(a));
    assert!(f.page.backend.is_viewable(c));
    assert!(!f.page.backend.is_viewable(b));
}

#[test]
fn dragging_a_tab_to_an_edge_splits_the_notebook() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    let b = f.map_tiled();
    let notebook = notebook_of(&f, a);

    // Two tabs of 240px, left of the split buttons.
    f.press(Point::new(100, 10), 1, 0);
    assert!(f.view(a).focused);
    assert!(f.page.has_grab());

    f.motion(Point::new(900, 400));
    // Ghost and drop preview.
    assert_eq!(f.page.backend.windows_with_role(WindowRole::Overlay).len(), 2);

    f.release(Point::new(900, 400), 1);

    assert!(!f.page.has_grab());
    assert!(!f.page.backend.pointer_grabbed);
    assert!(f.page.backend.windows_with_role(WindowRole::Overlay).is_empty());
    assert_eq!(notebook_count(&f), 2);
    assert_eq!(notebook_of(&f, b), notebook);

    let right = notebook_of(&f, a);
    assert_ne!(right, notebook);
    let alloc = f.page.tree.notebook(right).unwrap().allocation();
    assert_eq!(alloc, Rect::new(504, 0, 496, 800));
    assert!(f.view(a).focused);
    assert!(f.page.backend.is_viewable(a));
    assert!(f.page.backend.is_viewable(b));
}

#[test]
fn dragging_the_empty_bar_moves_the_selected_tab() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    f.press_bind(Action::SplitVertical);
    let left = notebook_of(&f, a);
    let right = f.page.workspace().notebooks(&f.page.tree)[1];
    let b = f.map_tiled();
    f.page.bind_to_notebook(f.view_id(b), Some(right));
    f.dispatch();

    // The single tab is 240px wide, the rest of the bar is empty.
    let empty = Point::new(300, 10);
    let nb = f.page.tree.notebook(left).unwrap();
    assert_eq!(nb.hit_test(empty), Some(TabBarHit::Empty));

    f.press(empty, 1, 0);
    assert!(f.page.has_grab());
    assert!(f.view(a).focused);

    // Bottom edge of the right notebook.
    f.motion(Point::new(750, 780));
    f.release(Point::new(750, 780), 1);

    assert!(!f.page.has_grab());
    assert!(f.page.backend.windows_with_role(WindowRole::Overlay).is_empty());
    assert_eq!(notebook_of(&f, b), right);
    let bottom = notebook_of(&f, a);
    assert_ne!(bottom, left);
    assert_ne!(bottom, right);
    let split = f.page.tree.parent(bottom).unwrap();
    assert_eq!(f.page.tree.parent(right), Some(split));
    assert_eq!(
        f.page.tree.notebook(bottom).unwrap().allocation(),
        Rect::new(504, 404, 496, 396)
    );
    assert!(f.page.tree.notebook(left).unwrap().is_empty());
    assert!(f.page.backend.is_viewable(a));
    assert!(f.page.backend.is_viewable(b));
}

#[test]
fn pressing_the_bar_of_an_empty_notebook_starts_nothing() {
    let mut f = Fixture::new();
    f.press_bind(Action::SplitVertical);

    f.press(Point::new(600, 10), 1, 0);

    assert!(!f.page.has_grab());
    assert!(!f.page.backend.pointer_grabbed);
}

#[test]
fn click_on_a_tab_only_selects_it() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    let b = f.map_tiled();

    f.press(Point::new(100, 10), 1, 0);
    f.motion(Point::new(102, 11));
    f.release(Point::new(102, 11), 1);

    assert!(f.view(a).focused);
    assert_eq!(notebook_of(&f, a), notebook_of(&f, b));
    assert_eq!(notebook_count(&f), 1);
    assert!(f.page.backend.is_viewable(a));
    assert!(!f.page.backend.is_viewable(b));
    assert_eq!(f.page.backend.window(b).wm_state, WmState::Iconic);
}

#[test]
fn tab_dropped_outside_every_notebook_floats() {
    let mut f = Fixture::with_config(test_config(), vec![Rect::new(0, 0, 500, 800)]);
    let a = f.map_tiled();
    let _b = f.map_tiled();

    // Left tab of two in a 500px wide notebook.
    f.press(Point::new(50, 10), 1, 0);
    f.motion(Point::new(700, 300));
    f.release(Point::new(700, 300), 1);

    let view = f.view(a);
    assert_eq!(view.kind, ViewKind::Floating);
    assert!(view.focused);
    assert_eq!(view.client_rect.y, 300);
    assert!(f.page.backend.window(a).parent != ROOT);
}

#[test]
fn dragging_the_split_bar_sets_the_ratio() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let notebook = notebook_of(&f, w);
    f.press_bind(Action::SplitVertical);
    let split = f.page.tree.parent(notebook).unwrap();

    f.press(Point::new(500, 400), 1, 0);
    assert!(f.page.has_grab());
    assert_eq!(f.page.backend.windows_with_role(WindowRole::Overlay).len(), 1);

    f.motion(Point::new(300, 400));
    f.release(Point::new(250, 400), 1);

    assert!(!f.page.has_grab());
    assert!(f.page.backend.windows_with_role(WindowRole::Overlay).is_empty());
    let ratio = f.page.tree.split(split).unwrap().ratio();
    assert_abs_diff_eq!(ratio, 246. / 992., epsilon = 1e-9);
    assert_eq!(f.page.tree.notebook(notebook).unwrap().allocation().w, 246);
}

#[test]
fn only_notebook_of_a_viewport_stays() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let notebook = notebook_of(&f, w);

    f.page.remove_notebook(notebook);
    f.dispatch();
    assert_eq!(notebook_count(&f), 1);

    f.press_bind(Action::SplitVertical);
    let created = f.page.workspace().notebooks(&f.page.tree)[1];
    f.page.remove_notebook(created);
    f.dispatch();

    assert_eq!(notebook_count(&f), 1);
    assert_eq!(notebook_of(&f, w), notebook);
    assert_eq!(f.view(w).client_rect, Rect::new(3, 22, 994, 775));
}

#[test]
fn removed_notebook_hands_its_tabs_over() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    let left = notebook_of(&f, a);
    f.press_bind(Action::SplitVertical);
    let right = f.page.workspace().notebooks(&f.page.tree)[1];

    let b = f.map_tiled();
    f.page.bind_to_notebook(f.view_id(b), Some(right));
    f.dispatch();

    f.page.remove_notebook(right);
    f.dispatch();

    assert_eq!(notebook_count(&f), 1);
    assert_eq!(notebook_of(&f, a), left);
    assert_eq!(notebook_of(&f, b), left);
    assert_eq!(f.page.tree.notebook(left).unwrap().len(), 2);
}

#[test]
fn switching_workspaces_hides_and_restores() {
    let mut f = Fixture::new();
    let dock = f.map_client(ClientProperties {
        window_type: Some(vec![WindowType::Dock]),
        strut: Some(Strut::full(0, 0, 30, 0, SCREEN)),
        geometry: Some(Rect::new(0, 0, 1000, 30)),
        ..Default::default()
    });
    let w = f.map_tiled();
    let first_back = f.page.backend.windows_with_role(WindowRole::Background)[0];

    f.press_bind(Action::WorkspaceRight);

    assert_eq!(f.page.active_workspace(), 1);
    assert!(!f.page.backend.is_viewable(w));
    assert_eq!(f.page.backend.window(w).wm_state, WmState::Iconic);
    assert!(!f.page.backend.window(first_back).mapped);
    assert_eq!(f.page.focused(), None);
    assert_eq!(f.page.backend.focus, None);
    // Docks follow the active workspace.
    assert!(f.page.backend.is_viewable(dock));
    let viewport = f.page.workspace().default_viewport(&f.page.tree).unwrap();
    assert_eq!(
        f.page.tree.viewport(viewport).unwrap().work_area,
        Rect::new(0, 30, 1000, 770)
    );

    let other = f.map_tiled();
    assert_eq!(f.page.tree.workspace_of(f.view_id(other)), Some(1));
    assert_eq!(f.page.backend.client_list, [w, other, dock]);

    f.press_bind(Action::WorkspaceLeft);

    assert_eq!(f.page.active_workspace(), 0);
    assert!(f.page.backend.is_viewable(w));
    assert!(!f.page.backend.is_viewable(other));
    assert!(f.page.backend.window(first_back).mapped);
    assert!(f.view(w).focused);
    assert_eq!(f.page.backend.focus, Some(w));
}

#[test]
fn activating_a_client_elsewhere_switches_workspace() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    f.page.switch_workspace(2);
    f.dispatch();

    f.send(crate::backend::BackendEvent::ClientMessage {
        window: w,
        request: crate::backend::ClientRequest::Activate,
    });

    assert_eq!(f.page.active_workspace(), 0);
    assert!(f.view(w).focused);
}

#[test]
fn outputs_become_viewports() {
    let mut f = Fixture::new();
    let w = f.map_tiled();

    let outputs = vec![Rect::new(0, 0, 500, 800), Rect::new(500, 0, 500, 800)];
    f.send(crate::backend::BackendEvent::OutputsChanged { outputs });

    assert_eq!(f.page.workspace().viewports(&f.page.tree).len(), 2);
    assert_eq!(notebook_count(&f), 2);
    assert_eq!(f.view(w).client_rect, Rect::new(3, 22, 494, 775));

    f.send(crate::backend::BackendEvent::OutputsChanged {
        outputs: vec![Rect::new(0, 0, 1000, 800)],
    });
    assert_eq!(f.page.workspace().viewports(&f.page.tree).len(), 1);
    assert_eq!(f.view(w).client_rect, Rect::new(3, 22, 994, 775));
}
