use super::*;
use crate::backend::{BackendEvent, ClientRequest, ConfigureMask, WindowSystem as _};
use crate::client::{ClientProperties, PropertyKind, Strut, WindowType, WmProtocols, WmState};
use crate::region::Rect;
use crate::view::ViewKind;

fn typed(ty: WindowType) -> ClientProperties {
    ClientProperties {
        window_type: Some(vec![ty]),
        ..Default::default()
    }
}

#[test]
fn first_client_fills_the_notebook() {
    let mut f = Fixture::new();
    let w = f.map_tiled();

    let view = f.view(w);
    let ViewKind::Notebook { notebook } = view.kind else {
        panic!("expected a tiled view, got {:?}", view.kind);
    };
    let area = f.page.tree.notebook(notebook).unwrap().client_area();
    assert_eq!(view.client_rect, area);
    assert!(area.w > 0 && area.h > 0);
    assert!(view.focused);

    let frame = view.frame.unwrap();
    let backend = &f.page.backend;
    assert_eq!(backend.window(w).parent, frame);
    assert_eq!(backend.root_rect(w), area);
    assert!(backend.is_viewable(w));
    assert_eq!(backend.window(w).wm_state, WmState::Normal);
    assert_eq!(backend.focus, Some(w));
    assert_eq!(backend.active, Some(w));
    assert_eq!(backend.client_list, [w]);
}

#[test]
fn new_tab_hides_the_previous_one() {
    let mut f = Fixture::new();
    let first = f.map_tiled();
    let second = f.map_tiled();

    assert_eq!(f.view(first).kind, f.view(second).kind);
    assert!(f.view(second).focused);
    assert!(!f.view(first).focused);

    let backend = &f.page.backend;
    assert!(backend.is_viewable(second));
    assert!(!backend.is_viewable(first));
    assert_eq!(backend.window(first).wm_state, WmState::Iconic);
    assert_eq!(backend.client_list, [first, second]);
}

#[test]
fn withdrawn_client_gives_focus_back() {
    let mut f = Fixture::new();
    let first = f.map_tiled();
    let second = f.map_tiled();
    let frame = f.view(second).frame.unwrap();

    f.withdraw(second);

    assert!(f.page.view_of(second).is_none());
    assert!(!f.page.clients.contains(second));
    assert!(!f.page.backend.windows.contains_key(&frame));
    assert_eq!(f.page.backend.window(second).parent, ROOT);
    assert_eq!(f.page.backend.window(second).wm_state, WmState::Withdrawn);

    assert!(f.view(first).focused);
    assert!(f.page.backend.is_viewable(first));
    assert_eq!(f.page.backend.focus, Some(first));
    assert_eq!(f.page.backend.client_list, [first]);
}

#[test]
fn reparenting_a_mapped_window_keeps_it_managed() {
    let mut f = Fixture::new();
    let w = f.page.backend.create_client(ClientProperties::default());
    // Mapped before the window manager started.
    f.page.backend.map(w);
    f.send(BackendEvent::MapRequest { window: w });

    assert!(f.page.view_of(w).is_some());
    assert_eq!(f.page.clients.get(w).unwrap().ignore_unmaps, 0);
    assert!(f.page.backend.is_viewable(w));
}

#[test]
fn destroyed_client_is_forgotten() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let frame = f.view(w).frame.unwrap();

    f.destroy(w);

    assert!(f.page.view_of(w).is_none());
    assert!(!f.page.clients.contains(w));
    assert!(!f.page.backend.windows.contains_key(&frame));
    assert!(f.page.backend.client_list.is_empty());
    assert_eq!(f.page.focused(), None);
}

#[test]
fn map_request_of_managed_client_activates_it() {
    let mut f = Fixture::new();
    let first = f.map_tiled();
    let _second = f.map_tiled();

    f.send(BackendEvent::MapRequest { window: first });

    assert!(f.view(first).focused);
    assert_eq!(f.page.clients.len(), 2);
}

#[test]
fn dock_strut_shrinks_the_work_area() {
    let mut f = Fixture::new();
    let dock = f.map_client(ClientProperties {
        strut: Some(Strut::full(0, 0, 30, 0, SCREEN)),
        geometry: Some(Rect::new(0, 0, 1000, 30)),
        ..typed(WindowType::Dock)
    });
    let w = f.map_tiled();

    assert_eq!(f.view(dock).kind, ViewKind::Dock);
    assert!(f.view(dock).frame.is_none());
    assert!(f.page.backend.is_viewable(dock));

    let viewport = f.page.workspace().default_viewport(&f.page.tree).unwrap();
    let work_area = f.page.tree.viewport(viewport).unwrap().work_area;
    assert_eq!(work_area, Rect::new(0, 30, 1000, 770));

    let client = f.view(w).client_rect;
    assert!(work_area.contains_rect(&client));
    // Docks never take focus.
    assert!(f.view(w).focused);
}

#[test]
fn dialog_floats_centered_in_the_work_area() {
    let mut f = Fixture::new();
    let w = f.map_client(ClientProperties {
        geometry: Some(Rect::new(0, 0, 200, 100)),
        ..typed(WindowType::Dialog)
    });

    let view = f.view(w);
    assert_eq!(view.kind, ViewKind::Floating);
    assert_eq!(view.client_rect, Rect::new(400, 350, 200, 100));
    assert!(view.rect.contains_rect(&view.client_rect));
    assert_eq!(f.page.backend.root_rect(w), view.client_rect);
}

#[test]
fn transient_floats_over_its_parent() {
    let mut f = Fixture::new();
    let parent = f.map_tiled();
    let w = f.map_client(ClientProperties {
        transient_for: Some(parent),
        geometry: Some(Rect::new(0, 0, 100, 50)),
        ..Default::default()
    });

    let parent_rect = f.view(parent).client_rect;
    let view = f.view(w);
    assert_eq!(view.kind, ViewKind::Floating);
    assert_eq!(view.client_rect.center(), parent_rect.center());
}

#[test]
fn tiled_configure_request_gets_current_geometry() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    let current = f.view(w).client_rect;
    f.page.backend.notifies.clear();

    f.send(BackendEvent::ConfigureRequest {
        window: w,
        rect: Rect::new(5, 5, 10, 10),
        mask: ConfigureMask::all(),
    });

    assert_eq!(f.view(w).client_rect, current);
    assert_eq!(f.page.backend.notifies, [(w, current)]);
}

#[test]
fn floating_configure_request_moves_the_window() {
    let mut f = Fixture::new();
    let w = f.map_client(typed(WindowType::Utility));

    f.send(BackendEvent::ConfigureRequest {
        window: w,
        rect: Rect::new(10, 20, 0, 0),
        mask: ConfigureMask::X | ConfigureMask::Y,
    });

    let client = f.view(w).client_rect;
    assert_eq!((client.x, client.y), (10, 20));
    assert_eq!(f.page.backend.root_rect(w), client);
}

#[test]
fn unmanaged_configure_request_is_granted() {
    let mut f = Fixture::new();
    let w = f.page.backend.create_client(ClientProperties::default());
    let rect = Rect::new(1, 2, 30, 40);

    f.send(BackendEvent::ConfigureRequest {
        window: w,
        rect,
        mask: ConfigureMask::all(),
    });

    assert_eq!(f.page.backend.window(w).rect, rect);
}

#[test]
fn title_change_reaches_the_view() {
    let mut f = Fixture::new();
    let w = f.map_tiled();
    assert_eq!(f.view(w).title, format!("#{w}"));

    f.page.backend.windows.get_mut(&w).unwrap().props.net_wm_name = Some("editor".into());
    f.send(BackendEvent::PropertyNotify {
        window: w,
        property: PropertyKind::Title,
    });

    assert_eq!(f.view(w).title, "editor");
}

#[test]
fn close_request_uses_delete_protocol_when_supported() {
    let mut f = Fixture::new();
    let polite = f.map_client(ClientProperties {
        protocols: Some(WmProtocols {
            delete_window: true,
            take_focus: false,
        }),
        ..Default::default()
    });
    let rude = f.map_tiled();

    f.send(BackendEvent::ClientMessage {
        window: polite,
        request: ClientRequest::Close,
    });
    f.send(BackendEvent::ClientMessage {
        window: rude,
        request: ClientRequest::Close,
    });

    assert_eq!(f.page.backend.closed, [(polite, true), (rude, false)]);
}

#[test]
fn notification_popup_is_tracked_unframed() {
    let mut f = Fixture::new();
    let w = f.page.backend.create_client(typed(WindowType::Notification));
    f.page.backend.windows.get_mut(&w).unwrap().props.override_redirect = true;
    f.page.backend.map(w);
    f.send(BackendEvent::MapNotify {
        window: w,
        override_redirect: true,
    });

    let view = f.view(w);
    assert_eq!(view.kind, ViewKind::Popup { notification: true });
    assert!(view.frame.is_none());
    assert!(f.page.compositor.is_tracked(w));
    assert!(f.page.backend.client_list.is_empty());

    f.destroy(w);
    assert!(f.page.view_of(w).is_none());
}

#[test]
fn shutdown_returns_clients_to_the_root() {
    let mut f = Fixture::new();
    let a = f.map_tiled();
    let b = f.map_client(typed(WindowType::Dialog));

    f.page.shutdown();

    for w in [a, b] {
        assert_eq!(f.page.backend.window(w).parent, ROOT);
    }
    assert!(f.page.backend.windows_with_role(WindowRole::Frame).is_empty());
}
