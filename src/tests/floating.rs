use page_config::{Action, Modifiers};

use super::*;
use crate::client::{ClientProperties, WindowType};
use crate::region::{Point, Rect};
use crate::view::ViewKind;

fn dialog(f: &mut Fixture, w: i32, h: i32) -> u32 {
    f.map_client(ClientProperties {
        window_type: Some(vec![WindowType::Dialog]),
        geometry: Some(Rect::new(0, 0, w, h)),
        ..Default::default()
    })
}

/// Screen position of a frame-local point.
fn on_frame(f: &Fixture, w: u32, x: i32, y: i32) -> Point {
    let rect = f.view(w).rect;
    Point::new(rect.x + x, rect.y + y)
}

#[test]
fn frame_surrounds_the_client() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    let view = f.view(w);
    assert_eq!(view.client_rect, Rect::new(400, 350, 200, 100));
    // Title bar on top, thin borders elsewhere.
    assert_eq!(view.rect, Rect::new(395, 328, 210, 127));
    let frame = view.frame.unwrap();
    assert_eq!(f.page.backend.window(frame).rect, view.rect);
    assert_eq!(f.page.backend.window(w).rect, Rect::new(5, 22, 200, 100));
    assert!(f.page.backend.images.contains(&frame));
}

#[test]
fn resize_from_the_bottom_right_grip() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    let start = on_frame(&f, w, 207, 124);
    f.press(start, 1, 0);
    assert!(f.page.has_grab());
    assert!(f.page.backend.pointer_grabbed);

    f.motion(Point::new(start.x + 10, start.y + 5));
    assert_eq!(f.view(w).client_rect, Rect::new(400, 350, 210, 105));

    f.release(Point::new(start.x + 20, start.y + 20), 1);

    assert!(!f.page.has_grab());
    assert!(!f.page.backend.pointer_grabbed);
    let client = Rect::new(400, 350, 220, 120);
    assert_eq!(f.view(w).client_rect, client);
    assert_eq!(f.page.backend.root_rect(w), client);
    assert_eq!(f.page.backend.notifies.last(), Some(&(w, client)));
}

#[test]
fn resize_from_the_top_left_keeps_the_opposite_corner() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    let start = on_frame(&f, w, 2, 2);
    f.press(start, 1, 0);
    f.release(Point::new(start.x - 30, start.y - 10), 1);

    let client = f.view(w).client_rect;
    assert_eq!(client, Rect::new(370, 340, 230, 110));
    assert_eq!((client.right(), client.bottom()), (600, 450));
}

#[test]
fn resize_honours_size_hints() {
    let mut f = Fixture::new();
    let w = f.map_client(ClientProperties {
        window_type: Some(vec![WindowType::Dialog]),
        geometry: Some(Rect::new(0, 0, 200, 100)),
        normal_hints: Some(crate::client::SizeHints {
            min: Some((150, 80)),
            ..Default::default()
        }),
        ..Default::default()
    });

    let start = on_frame(&f, w, 207, 124);
    f.press(start, 1, 0);
    f.release(Point::new(start.x - 100, start.y - 100), 1);

    assert_eq!(f.view(w).client_rect, Rect::new(400, 350, 150, 80));
}

#[test]
fn move_by_the_title_bar() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    let start = on_frame(&f, w, 50, 10);
    f.press(start, 1, 0);
    f.motion(Point::new(start.x + 40, start.y + 40));
    f.release(Point::new(start.x + 100, start.y + 100), 1);

    let client = Rect::new(500, 450, 200, 100);
    assert_eq!(f.view(w).client_rect, client);
    assert_eq!(f.view(w).rect, Rect::new(495, 428, 210, 127));
    assert_eq!(f.page.backend.root_rect(w), client);
}

#[test]
fn super_drag_moves_from_anywhere() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    f.press(Point::new(500, 400), 1, Modifiers::SUPER.bits());
    assert!(f.page.has_grab());
    f.release(Point::new(480, 390), 1);

    assert_eq!(f.view(w).client_rect, Rect::new(380, 340, 200, 100));
}

#[test]
fn plain_click_on_the_client_only_focuses() {
    let mut f = Fixture::new();
    let tiled = f.map_tiled();
    let w = dialog(&mut f, 200, 100);
    f.page.set_focus(Some(f.view_id(tiled)), 0);
    f.dispatch();

    f.press(Point::new(500, 400), 1, 0);

    assert!(!f.page.has_grab());
    assert!(f.view(w).focused);
    assert_eq!(f.page.backend.focus, Some(w));
}

#[test]
fn cancelled_move_restores_the_window() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);
    let original = f.view(w).client_rect;

    let start = on_frame(&f, w, 50, 10);
    f.press(start, 1, 0);
    f.motion(Point::new(start.x + 100, start.y + 100));
    assert_ne!(f.view(w).client_rect, original);

    f.page.cancel_grab();
    f.dispatch();

    assert!(!f.page.has_grab());
    assert!(!f.page.backend.pointer_grabbed);
    assert_eq!(f.view(w).client_rect, original);
    assert_eq!(f.page.backend.root_rect(w), original);
}

#[test]
fn bind_button_sends_the_client_to_a_notebook() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    f.press(on_frame(&f, w, 170, 10), 1, 0);

    let notebook = f.page.workspace().default_notebook(&f.page.tree).unwrap();
    let view = f.view(w);
    assert_eq!(view.kind, ViewKind::Notebook { notebook });
    assert!(view.focused);
    assert_eq!(
        f.page.backend.root_rect(w),
        f.page.tree.notebook(notebook).unwrap().client_area()
    );
}

#[test]
fn close_button_asks_the_client_to_close() {
    let mut f = Fixture::new();
    let w = dialog(&mut f, 200, 100);

    f.press(on_frame(&f, w, 190, 10), 1, 0);

    assert_eq!(f.page.backend.closed, [(w, false)]);
    assert!(f.page.view_of(w).is_some());
}

#[test]
fn toggle_floating_round_trip() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let ViewKind::Notebook { notebook } = f.view(w).kind else {
        unreachable!();
    };

    f.press_bind(Action::ToggleFloating);

    let view = f.view(w);
    assert_eq!(view.kind, ViewKind::Floating);
    assert!(view.focused);
    // Centered in the work area at its own size.
    assert_eq!(view.client_rect, Rect::new(350, 300, 300, 200));
    assert!(f.page.tree.notebook(notebook).unwrap().is_empty());

    f.press_bind(Action::ToggleFloating);

    assert_eq!(f.view(w).kind, ViewKind::Notebook { notebook });
    assert!(f.view(w).focused);
    assert_eq!(f.page.backend.window(w).parent, f.view(w).frame.unwrap());
}

#[test]
fn focusing_a_floating_window_raises_it() {
    let mut f = Fixture::new();
    let lower = dialog(&mut f, 400, 300);
    let upper = dialog(&mut f, 200, 100);
    let (lower_frame, upper_frame) = (f.view(lower).frame.unwrap(), f.view(upper).frame.unwrap());

    let position = |f: &Fixture, w| f.page.backend.stack.iter().position(|s| *s == w).unwrap();
    assert!(position(&f, lower_frame) < position(&f, upper_frame));

    // Title bar of the lower window, outside the upper one.
    f.press(on_frame(&f, lower, 50, 10), 1, 0);
    f.release(on_frame(&f, lower, 50, 10), 1);

    assert!(f.view(lower).focused);
    assert!(position(&f, lower_frame) > position(&f, upper_frame));
}

#[test]
fn floating_windows_sit_above_the_tiling_layer() {
    let mut f = Fixture::new();
    let tiled = f.map_tiled();
    let floating = dialog(&mut f, 200, 100);
    let tiled_frame = f.view(tiled).frame.unwrap();
    let floating_frame = f.view(floating).frame.unwrap();

    f.page.set_focus(Some(f.view_id(tiled)), 0);
    f.dispatch();

    let stack = &f.page.backend.stack;
    let back = f.page.backend.windows_with_role(WindowRole::Background)[0];
    let pos = |w| stack.iter().position(|s| *s == w).unwrap();
    assert!(pos(back) < pos(tiled_frame));
    assert!(pos(tiled_frame) < pos(floating_frame));
}
