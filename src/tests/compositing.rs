use std::time::{Duration, Instant};

use page_config::Action;

use super::*;
use crate::backend::{BackendEvent, Operator};
use crate::client::{ClientProperties, WindowType};
use crate::region::Rect;

fn argb_dialog(f: &mut Fixture, opaque_region: Option<Vec<Rect>>) -> u32 {
    f.map_client(ClientProperties {
        window_type: Some(vec![WindowType::Dialog]),
        geometry: Some(Rect::new(0, 0, 200, 100)),
        depth: 32,
        opaque_region,
        ..Default::default()
    })
}

fn with_fades(fade_in_ms: u32, fade_out_ms: u32) -> Fixture {
    let mut config = test_config();
    config.compositor.fade_in_ms = fade_in_ms;
    config.compositor.fade_out_ms = fade_out_ms;
    Fixture::with_config(config, vec![SCREEN])
}

#[test]
fn opaque_windows_never_blend() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let frame = f.view(w).frame.unwrap();
    assert!(f.page.backend.surfaces.contains(&frame));
    assert!(f.page.needs_frame());

    let stats = f.render();

    assert!(!stats.skipped);
    assert_eq!(stats.slow_paints, 0);
    assert_eq!(stats.slow_area, 0);
    assert!(stats.direct_paints + stats.opaque_paints >= 2);
    assert!(f.page.backend.paints.iter().all(|(_, op)| *op == Operator::Source));
    assert!(f.page.backend.paints.iter().any(|(s, _)| *s == frame));
}

#[test]
fn unchanged_screen_is_not_repainted() {
    let mut f = Fixture::new();
    f.map_tiled();
    f.render();

    assert!(!f.page.needs_frame());
    let stats = f.render();
    assert!(stats.skipped);
    assert!(f.page.backend.paints.is_empty());
}

#[test]
fn translucent_client_blends_over_the_tiling_layer() {
    let mut f = Fixture::new();
    let tiled = f.map_tiled();
    let w = argb_dialog(&mut f, None);

    let stats = f.render();

    // Only the client area of the dialog is translucent; its frame is opaque.
    assert_eq!(stats.slow_area, 200 * 100);
    assert_eq!(stats.slow_paints, 3);
    let tiled_frame = f.view(tiled).frame.unwrap();
    let frame = f.view(w).frame.unwrap();
    let over: Vec<_> = f
        .page
        .backend
        .paints
        .iter()
        .filter(|(_, op)| *op == Operator::Over)
        .map(|(s, _)| *s)
        .collect();
    assert_eq!(over.len(), 3);
    assert_eq!(over[1..], [tiled_frame, frame]);
}

#[test]
fn declared_opaque_region_keeps_the_fast_path() {
    let mut f = Fixture::new();
    f.map_tiled();
    argb_dialog(&mut f, Some(vec![Rect::new(0, 0, 200, 100)]));

    let stats = f.render();

    assert_eq!(stats.slow_area, 0);
    assert_eq!(stats.slow_paints, 0);
}

#[test]
fn damage_repaints_only_the_damaged_window() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let frame = f.view(w).frame.unwrap();
    f.render();

    f.send(BackendEvent::Damage {
        window: frame,
        area: Rect::new(0, 0, 10, 10),
    });
    assert!(f.page.needs_frame());
    assert_eq!(
        f.page.compositor.pending_damage().area(),
        100,
        "damage is translated to the screen"
    );

    let stats = f.render();
    assert_eq!(stats.opaque_paints, 1);
    assert_eq!(stats.direct_paints, 0);
    assert_eq!(stats.slow_area, 0);
    assert_eq!(f.page.backend.paints, [(frame, Operator::Source)]);
}

#[test]
fn moving_a_window_damages_both_places() {
    let mut f = Fixture::new();
    let w = argb_dialog(&mut f, Some(vec![Rect::new(0, 0, 200, 100)]));
    f.render();

    let id = f.view_id(w);
    f.page.move_floating(id, Rect::new(0, 0, 200, 100));
    f.dispatch();

    let stats = f.render();
    assert!(!stats.skipped);
    let painted: Vec<_> = f.page.backend.paints.iter().map(|(s, _)| *s).collect();
    let back = f.page.backend.windows_with_role(WindowRole::Background)[0];
    // The old place shows the background again.
    assert!(painted.contains(&back));
    assert!(painted.contains(&f.view(w).frame.unwrap()));
}

#[test]
fn new_windows_fade_in() {
    let mut f = with_fades(10_000, 0);
    let w = f.map_tiled();
    assert!(f.view(w).is_fading());
    assert!(f.view(w).opaque_region().is_empty());

    let stats = f.render();
    assert!(stats.slow_paints > 0);
    assert!(f.page.needs_frame());

    f.page.render_frame(Instant::now() + Duration::from_secs(20));
    assert!(!f.view(w).is_fading());
    assert!(!f.page.needs_frame());

    let stats = f.render();
    assert!(stats.skipped);
}

#[test]
fn closed_windows_fade_out() {
    let mut f = with_fades(0, 10_000);
    let w = f.map_tiled();
    let frame = f.view(w).frame.unwrap();
    f.render();

    f.withdraw(w);

    // The frame is gone from the server's point of view, its last contents are not.
    assert!(!f.page.backend.windows.contains_key(&frame));
    assert!(f.page.backend.surfaces.contains(&frame));
    assert!(f.page.needs_frame());

    f.render();
    assert!(f
        .page
        .backend
        .paints
        .contains(&(frame, Operator::Over)));

    f.page.render_frame(Instant::now() + Duration::from_secs(20));
    assert!(!f.page.backend.surfaces.contains(&frame));
    assert!(!f.page.needs_frame());
}

#[test]
fn destroyed_windows_fade_out_too() {
    let mut f = with_fades(0, 10_000);
    let w = f.map_tiled();
    let frame = f.view(w).frame.unwrap();
    f.render();

    f.destroy(w);

    assert!(f.page.backend.surfaces.contains(&frame));
    f.page.render_frame(Instant::now() + Duration::from_secs(20));
    assert!(!f.page.backend.surfaces.contains(&frame));
}

#[test]
fn hidden_tabs_are_not_composited() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    let b = f.map_tiled();
    f.render();

    let hidden = f.view(a).frame.unwrap();
    f.page.compositor.damage_rect(SCREEN);
    f.render();

    let painted: Vec<_> = f.page.backend.paints.iter().map(|(s, _)| *s).collect();
    assert!(!painted.contains(&hidden));
    assert!(painted.contains(&f.view(b).frame.unwrap()));
}

#[test]
fn compositor_can_be_switched_off_and_on() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let frame = f.view(w).frame.unwrap();
    f.render();

    f.press_bind(Action::ToggleCompositor);

    assert!(!f.page.compositor.is_enabled());
    assert!(!f.page.backend.compositing);
    assert!(f.page.backend.surfaces.is_empty());
    assert!(!f.page.needs_frame());
    assert!(f.render().skipped);

    f.press_bind(Action::ToggleCompositor);

    assert!(f.page.backend.compositing);
    assert!(f.page.backend.surfaces.contains(&frame));
    let back = f.page.backend.windows_with_role(WindowRole::Background)[0];
    assert!(f.page.backend.surfaces.contains(&back));
    let stats = f.render();
    assert!(!stats.skipped);
    assert!(f.page.backend.paints.iter().any(|(s, _)| *s == frame));
}
