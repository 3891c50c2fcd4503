//! Client lifecycle: building and tearing down views, mode switches and the structural events
//! clients send.

use std::time::Instant;

use anyhow::{anyhow, Context as _};

use super::Page;
use crate::backend::{Backend, ClientRequest, ConfigureMask, StateAction, Window};
use crate::client::{Client, PropertyKind, WindowType, WmState};
use crate::compositor::CompositedWindow;
use crate::layout::dnd::DropZone;
use crate::layout::split::SplitType;
use crate::layout;
use crate::region::{Point, Rect, Region};
use crate::tree::{NodeId, NodeKind, Order};
use crate::view::floating::frame_for_client;
use crate::view::{Fade, Revert, View, ViewKind};
use crate::workspace::LayerKind;

/// Where a view is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Destination {
    Notebook {
        notebook: NodeId,
        index: Option<usize>,
    },
    Floating {
        client_rect: Rect,
    },
    Fullscreen {
        viewport: NodeId,
        revert: Revert,
    },
    Dock,
    Popup {
        notification: bool,
    },
}

/// Why a view goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Replaced by a view of another kind for the same client.
    Rebuild,
    /// The client unmapped itself.
    Withdrawn,
    /// The client window is gone.
    Destroyed,
}

const DEFAULT_FLOATING_SIZE: (i32, i32) = (640, 480);

impl<B: Backend> Page<B> {
    pub(super) fn on_map_request(&mut self, window: Window) {
        if let Some(view) = self.view_of(window) {
            self.activate(view, self.last_time);
            return;
        }
        self.manage(window);
    }

    pub(super) fn on_map_notify(&mut self, window: Window, override_redirect: bool) {
        if !override_redirect {
            if let Some(client) = self.clients.get_mut(window) {
                client.mapped = true;
            }
            return;
        }
        if self.view_of(window).is_some() {
            return;
        }

        let Some(props) = self.backend.read_properties(window) else {
            return;
        };
        let notification = props.has_type(WindowType::Notification);
        let mut client = Client::new(window, props);
        client.mapped = true;
        self.clients.insert(client);

        if let Err(err) = self.build_view(window, Destination::Popup { notification }) {
            debug!("not tracking popup {window:#x}: {err:?}");
            self.clients.remove(window);
        }
    }

    pub(super) fn on_unmap_notify(&mut self, window: Window) {
        let Some(client) = self.clients.get_mut(window) else {
            return;
        };
        if client.ignore_unmaps > 0 {
            client.ignore_unmaps -= 1;
            return;
        }
        client.mapped = false;
        self.unmanage(window, Teardown::Withdrawn);
    }

    pub(super) fn on_destroy_notify(&mut self, window: Window) {
        if self.clients.contains(window) {
            self.unmanage(window, Teardown::Destroyed);
        }
    }

    /// Starts managing a top-level that asked to be mapped.
    pub fn manage(&mut self, window: Window) {
        if !self.clients.contains(window) {
            let Some(props) = self.backend.read_properties(window) else {
                debug!("window {window:#x} is gone, not managing it");
                return;
            };
            self.clients.insert(Client::new(window, props));
        }

        let Some(dest) = self.placement(window) else {
            warn!("no place for window {window:#x}, leaving it unmanaged");
            self.clients.remove(window);
            self.backend.map(window);
            return;
        };

        match self.build_view(window, dest) {
            Ok(view) => {
                let focusable = self.tree.view(view).is_some_and(|v| v.kind.is_focusable());
                if focusable {
                    self.set_focus(Some(view), self.last_time);
                }
            }
            Err(err) => {
                warn!("could not manage window {window:#x}, leaving it unmanaged: {err:?}");
                self.clients.remove(window);
                self.backend.map(window);
            }
        }
    }

    /// Drops the client `window`, tearing its view down.
    pub fn unmanage(&mut self, window: Window, how: Teardown) {
        let was_focused = self.focused.is_some_and(|f| self.view_of(window) == Some(f));
        if let Some(view) = self.view_of(window) {
            self.teardown_view(view, how);
        }
        self.clients.remove(window);
        debug!("unmanaged {window:#x} ({how:?})");

        if was_focused {
            let next = self.workspaces[self.active].last_focused(&self.tree);
            self.set_focus(next, self.last_time);
        }
    }

    /// Hands every client back to the root window before exiting.
    pub fn shutdown(&mut self) {
        let windows: Vec<Window> = self.clients.iter().map(|c| c.window).collect();
        for window in windows {
            if let Some(view) = self.view_of(window) {
                self.teardown_view(view, Teardown::Rebuild);
            }
        }
        self.backend.set_input_focus(None, false, self.last_time);
        self.backend.flush();
        info!("released {} clients", self.clients.len());
    }

    fn placement(&self, window: Window) -> Option<Destination> {
        let props = &self.clients.get(window)?.props;

        if props.is_dock() {
            return Some(Destination::Dock);
        }
        if props.is_popup() {
            return Some(Destination::Popup {
                notification: props.has_type(WindowType::Notification),
            });
        }
        if props.wants_fullscreen() {
            let notebook = self.target_notebook()?;
            let index = self.tree.notebook(notebook).map_or(0, |nb| nb.len());
            let geometry = props.geometry.unwrap_or_default();
            let viewport = self
                .workspace()
                .viewport_for_rect(&self.tree, geometry)
                .or_else(|| layout::viewport_of(&self.tree, notebook))?;
            return Some(Destination::Fullscreen {
                viewport,
                revert: Revert::Notebook { notebook, index },
            });
        }
        if props.wants_floating() {
            return Some(Destination::Floating {
                client_rect: self.initial_floating_rect(window),
            });
        }
        Some(Destination::Notebook {
            notebook: self.target_notebook()?,
            index: None,
        })
    }

    /// Where a client first shows up when floating: where it asked if that fits, otherwise
    /// centered over its parent or the work area.
    pub(super) fn initial_floating_rect(&self, window: Window) -> Rect {
        let Some(client) = self.clients.get(window) else {
            return Rect::default();
        };
        let props = &client.props;
        let hints = props.size_hints();
        let geometry = props.geometry.unwrap_or_default();
        let (w, h) = if geometry.w > 1 && geometry.h > 1 {
            (geometry.w, geometry.h)
        } else {
            DEFAULT_FLOATING_SIZE
        };
        let (w, h) = hints.constrain(w, h);

        let area = self
            .workspace()
            .viewport_for_rect(&self.tree, geometry)
            .and_then(|viewport| self.tree.viewport(viewport))
            .map_or(self.backend.screen_rect(), |v| v.work_area);
        let (w, h) = (w.min(area.w).max(1), h.min(area.h).max(1));

        let requested = Rect::new(geometry.x, geometry.y, w, h);
        let positioned = hints.user_position || hints.program_position;
        if positioned && area.contains_rect(&requested) {
            return requested;
        }

        let parent = props
            .transient_for
            .and_then(|parent| self.view_of(parent))
            .and_then(|view| self.tree.view(view))
            .map(|view| view.client_rect)
            .filter(|rect| area.intersects(rect));
        let center = parent.unwrap_or(area).center();
        let x = (center.x - w / 2).clamp(area.x, (area.right() - w).max(area.x));
        let y = (center.y - h / 2).clamp(area.y, (area.bottom() - h).max(area.y));
        Rect::new(x, y, w, h)
    }

    /// Binds `window` to a new view at `dest`. On error nothing of the view is left behind.
    pub(super) fn build_view(&mut self, window: Window, dest: Destination) -> anyhow::Result<NodeId> {
        let client = self
            .clients
            .get(window)
            .with_context(|| format!("unknown client {window:#x}"))?;
        let client_mapped = client.mapped;

        let kind = match dest {
            Destination::Notebook { notebook, .. } => {
                self.tree
                    .notebook(notebook)
                    .ok_or_else(|| anyhow!("notebook {notebook:?} is gone"))?;
                ViewKind::Notebook { notebook }
            }
            Destination::Floating { .. } => ViewKind::Floating,
            Destination::Fullscreen { viewport, revert } => {
                self.tree
                    .viewport(viewport)
                    .ok_or_else(|| anyhow!("viewport {viewport:?} is gone"))?;
                ViewKind::Fullscreen { viewport, revert }
            }
            Destination::Dock => ViewKind::Dock,
            Destination::Popup { notification } => ViewKind::Popup { notification },
        };

        let mut view = View::new(client, kind);
        match dest {
            Destination::Notebook { notebook, .. } => {
                let area = self.tree.notebook(notebook).map(|nb| nb.client_area());
                view.rect = area.unwrap_or(view.rect);
                view.client_rect = view.rect;
            }
            Destination::Floating { client_rect } => {
                view.client_rect = client_rect;
                view.rect = frame_for_client(client_rect, self.theme.config());
            }
            Destination::Fullscreen { viewport, .. } => {
                let raw = self.tree.viewport(viewport).map(|v| v.raw);
                view.rect = raw.unwrap_or(view.rect);
                view.client_rect = view.rect;
            }
            Destination::Dock | Destination::Popup { .. } => (),
        }
        if self.compositor.is_enabled()
            && !self.compositor.fade_in().is_zero()
            && kind.is_focusable()
        {
            view.fade = Some(Fade::new(Instant::now(), self.compositor.fade_in(), 0., 1.));
        }
        let (rect, offset) = (view.rect, view.client_offset());

        let id = self.tree.insert(NodeKind::View(view));
        if let Err(err) = self.clients.acquire(window, id, &self.tree) {
            self.tree.remove(id);
            return Err(err.into());
        }

        if kind.is_reparented() {
            let frame = match self.backend.create_frame(rect, window) {
                Ok(frame) => frame,
                Err(err) => {
                    self.clients.release(window, id);
                    self.tree.remove(id);
                    return Err(err.context("error creating a frame"));
                }
            };
            if let Some(client) = self.clients.get_mut(window) {
                // Reparenting a mapped window unmaps it first.
                if client.mapped {
                    client.ignore_unmaps += 1;
                }
                client.mapped = true;
            }
            self.backend.reparent(window, frame, offset);
            if !client_mapped {
                self.backend.map(window);
            }
            if let Some(v) = self.tree.view_mut(id) {
                v.frame = Some(frame);
            }
        }

        let active = self.active;
        match dest {
            Destination::Notebook { notebook, index } => {
                layout::attach_to_notebook(&mut self.tree, id, notebook, index);
            }
            Destination::Floating { .. } => {
                let layer = self.workspaces[active].layer(LayerKind::Floating);
                self.tree.push_child(layer, id);
            }
            Destination::Fullscreen { viewport, .. } => {
                let workspace = self.tree.workspace_of(viewport).unwrap_or(active);
                let layer = self.workspaces[workspace].layer(LayerKind::Fullscreen);
                self.tree.push_child(layer, id);
                self.backend.set_fullscreen_state(window, true);
            }
            Destination::Dock => {
                let layer = self.workspaces[active].layer(LayerKind::Dock);
                self.tree.push_child(layer, id);
                if !client_mapped {
                    self.backend.map(window);
                }
                if let Some(client) = self.clients.get_mut(window) {
                    client.mapped = true;
                }
                if let Some(v) = self.tree.view_mut(id) {
                    v.mapped = true;
                }
            }
            Destination::Popup { .. } => {
                let layer = self.workspaces[active].layer(kind.layer());
                self.tree.push_child(layer, id);
                if let Some(v) = self.tree.view_mut(id) {
                    v.mapped = true;
                }
            }
        }

        let toplevel = self.tree.view(id).map_or(window, |v| v.toplevel());
        self.compositor.track(&mut self.backend, toplevel);
        self.compositor.damage_rect(rect);

        self.layout_dirty = true;
        self.stack_dirty = true;
        self.client_list_dirty = true;
        debug!("built {} view {id:?} for {window:#x}", kind.label());
        Ok(id)
    }

    /// Removes a view and everything it owns. The client stays known unless the caller drops
    /// it.
    pub(super) fn teardown_view(&mut self, id: NodeId, how: Teardown) {
        let Some(view) = self.tree.view(id) else {
            return;
        };
        let (client, frame, kind, rect, client_rect) =
            (view.client, view.frame, view.kind, view.rect, view.client_rect);
        let toplevel = view.toplevel();
        let now = Instant::now();

        let fades = how != Teardown::Rebuild
            && view.mapped
            && self.tree.is_shown(id)
            && !self.compositor.fade_out().is_zero();
        if fades {
            let mut window = CompositedWindow::new(Some(id), toplevel, rect, Region::new());
            window.opacity = view.opacity(now);
            self.compositor.start_fade_out(window, now);
        }
        // A no-op when the fade took the surface over.
        self.compositor.untrack(&mut self.backend, toplevel);

        if matches!(kind, ViewKind::Notebook { .. }) {
            layout::detach_from_notebook(&mut self.tree, id);
        }
        for workspace in &mut self.workspaces {
            workspace.forget_focus(id);
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
        self.clients.release(client, id);

        if let Some(frame) = frame {
            if how != Teardown::Destroyed {
                if let Some(c) = self.clients.get_mut(client) {
                    if c.mapped {
                        c.ignore_unmaps += 1;
                    }
                }
                let root = self.backend.root();
                self.backend.reparent(client, root, client_rect.origin());
            }
            self.backend.destroy_window(frame);
        }
        if how != Teardown::Destroyed && matches!(kind, ViewKind::Fullscreen { .. }) {
            self.backend.set_fullscreen_state(client, false);
        }
        if how == Teardown::Withdrawn {
            self.backend.set_wm_state(client, WmState::Withdrawn);
            if let Some(c) = self.clients.get_mut(client) {
                c.wm_state = WmState::Withdrawn;
            }
        }

        self.tree.remove(id);
        self.compositor.damage_rect(rect);
        self.layout_dirty = true;
        self.stack_dirty = true;
        self.client_list_dirty = true;
        debug!("tore down {} view {id:?} ({how:?})", kind.label());
    }

    /// Replaces `view` by a view of another kind for the same client, keeping focus.
    fn rebuild(&mut self, view: NodeId, dest: Destination) -> Option<NodeId> {
        let client = self.tree.view(view)?.client;
        let was_focused = self.focused == Some(view);
        self.teardown_view(view, Teardown::Rebuild);

        match self.build_view(client, dest) {
            Ok(id) => {
                if was_focused {
                    self.set_focus(Some(id), self.last_time);
                }
                Some(id)
            }
            Err(err) => {
                warn!("error rebuilding the view of {client:#x}: {err:?}");
                self.unmanage(client, Teardown::Withdrawn);
                None
            }
        }
    }

    // Mode switches.

    pub fn set_fullscreen(&mut self, view: NodeId, fullscreen: bool) -> Option<NodeId> {
        let v = self.tree.view(view)?;
        let (kind, rect, client_rect) = (v.kind, v.rect, v.client_rect);

        let dest = match (kind, fullscreen) {
            (ViewKind::Fullscreen { revert, .. }, false) => match revert {
                Revert::Notebook { notebook, index } if self.tree.notebook(notebook).is_some() => {
                    Destination::Notebook {
                        notebook,
                        index: Some(index),
                    }
                }
                Revert::Floating(client_rect) => Destination::Floating { client_rect },
                Revert::Notebook { .. } => Destination::Notebook {
                    notebook: self.target_notebook()?,
                    index: None,
                },
            },
            (ViewKind::Notebook { notebook }, true) => {
                let index = self.tree.notebook(notebook)?.index_of(view)?;
                let viewport = layout::viewport_of(&self.tree, notebook)?;
                Destination::Fullscreen {
                    viewport,
                    revert: Revert::Notebook { notebook, index },
                }
            }
            (ViewKind::Floating, true) => {
                let workspace = self.tree.workspace_of(view)?;
                let viewport = self.workspaces[workspace].viewport_for_rect(&self.tree, rect)?;
                Destination::Fullscreen {
                    viewport,
                    revert: Revert::Floating(client_rect),
                }
            }
            _ => return Some(view),
        };
        info!("{} {view:?}", if fullscreen { "fullscreen" } else { "unfullscreen" });
        self.rebuild(view, dest)
    }

    pub fn toggle_fullscreen(&mut self, view: NodeId) -> Option<NodeId> {
        let fullscreen = matches!(self.tree.view(view)?.kind, ViewKind::Fullscreen { .. });
        self.set_fullscreen(view, !fullscreen)
    }

    pub fn toggle_floating(&mut self, view: NodeId) -> Option<NodeId> {
        let v = self.tree.view(view)?;
        match v.kind {
            ViewKind::Notebook { .. } => {
                let client_rect = self.initial_floating_rect(v.client);
                self.rebuild(view, Destination::Floating { client_rect })
            }
            ViewKind::Floating => self.bind_to_notebook(view, None),
            _ => Some(view),
        }
    }

    /// Sends a floating view back to `notebook`, or the current target notebook.
    pub fn bind_to_notebook(&mut self, view: NodeId, notebook: Option<NodeId>) -> Option<NodeId> {
        let notebook = notebook
            .filter(|nb| self.tree.notebook(*nb).is_some())
            .or_else(|| self.target_notebook())?;
        match self.tree.view(view)?.kind {
            ViewKind::Notebook { notebook: current } if current == notebook => Some(view),
            ViewKind::Notebook { .. } => {
                layout::detach_from_notebook(&mut self.tree, view);
                layout::attach_to_notebook(&mut self.tree, view, notebook, None);
                self.layout_dirty = true;
                self.set_focus(Some(view), self.last_time);
                Some(view)
            }
            _ => self.rebuild(
                view,
                Destination::Notebook {
                    notebook,
                    index: None,
                },
            ),
        }
    }

    /// Drops a dragged view on `zone` of `notebook`: edge zones split the notebook first.
    pub fn drop_view(&mut self, view: NodeId, notebook: NodeId, zone: DropZone) {
        let target = match zone.split() {
            Some((split_type, new_first)) => {
                let ratio = self.config.split_ratio();
                match layout::split_notebook(
                    &mut self.tree,
                    notebook,
                    split_type,
                    ratio,
                    new_first,
                    &self.metrics,
                ) {
                    Some((_, created)) => created,
                    None => return,
                }
            }
            None => notebook,
        };
        self.layout_dirty = true;
        self.bind_to_notebook(view, Some(target));
    }

    /// Takes a view out of the tiling layer, putting its client under `p`.
    pub fn float_view_at(&mut self, view: NodeId, p: Point) {
        let Some(v) = self.tree.view(view) else {
            return;
        };
        if !matches!(v.kind, ViewKind::Notebook { .. }) {
            return;
        }
        let rect = self.initial_floating_rect(v.client);
        let client_rect = Rect::new(p.x - rect.w / 2, p.y, rect.w, rect.h);
        self.rebuild(view, Destination::Floating { client_rect });
    }

    /// Asks the client of `view` to close.
    pub fn close_view(&mut self, view: NodeId) {
        let Some(client) = self.tree.view(view).map(|v| v.client) else {
            return;
        };
        let delete = self
            .clients
            .get(client)
            .is_some_and(|c| c.props.supports_delete());
        debug!("closing {client:#x}");
        self.backend.close(client, delete);
    }

    /// Splits `notebook` and focuses nothing new; the new notebook starts empty.
    pub fn split(&mut self, notebook: NodeId, split_type: SplitType) {
        let ratio = self.config.split_ratio();
        if layout::split_notebook(&mut self.tree, notebook, split_type, ratio, false, &self.metrics)
            .is_some()
        {
            self.layout_dirty = true;
        }
    }

    /// Removes a notebook and moves its tabs next door. A viewport's last notebook stays.
    pub fn remove_notebook(&mut self, notebook: NodeId) {
        if layout::remove_notebook(&mut self.tree, notebook).is_some() {
            self.layout_dirty = true;
        }
    }

    // Client requests.

    pub(super) fn on_configure_request(&mut self, window: Window, rect: Rect, mask: ConfigureMask) {
        let Some(view) = self.view_of(window) else {
            // Unmanaged windows get what they ask for.
            self.backend.configure(window, rect);
            return;
        };
        let Some(v) = self.tree.view(view) else {
            return;
        };

        match v.kind {
            ViewKind::Floating => {
                let mut wanted = v.client_rect;
                if mask.contains(ConfigureMask::X) {
                    wanted.x = rect.x;
                }
                if mask.contains(ConfigureMask::Y) {
                    wanted.y = rect.y;
                }
                if mask.contains(ConfigureMask::WIDTH) {
                    wanted.w = rect.w;
                }
                if mask.contains(ConfigureMask::HEIGHT) {
                    wanted.h = rect.h;
                }
                let (w, h) = self.size_hints(view).constrain(wanted.w, wanted.h);
                wanted.w = w;
                wanted.h = h;
                self.move_floating(view, wanted);
                let unchanged = self.tree.view(view).and_then(|v| v.configured) == Some((
                    frame_for_client(wanted, self.theme.config()),
                    wanted,
                ));
                if unchanged {
                    self.backend.send_configure_notify(window, wanted);
                }
            }
            ViewKind::Dock | ViewKind::Popup { .. } => {
                self.backend.configure(window, rect);
                if let Some(v) = self.tree.view_mut(view) {
                    let old = v.rect;
                    v.rect = rect;
                    v.client_rect = rect;
                    self.compositor.damage_rect(old);
                }
                self.compositor.damage_rect(rect);
                self.layout_dirty = true;
            }
            _ => {
                let current = v.client_rect;
                self.backend.send_configure_notify(window, current);
            }
        }
    }

    /// Geometry change of an override-redirect popup.
    pub(super) fn on_configure_notify(&mut self, window: Window, rect: Rect) {
        let Some(view) = self.view_of(window) else {
            return;
        };
        let Some(v) = self.tree.view_mut(view) else {
            return;
        };
        if !matches!(v.kind, ViewKind::Popup { .. }) || v.rect == rect {
            return;
        }
        let old = v.rect;
        v.rect = rect;
        v.client_rect = rect;
        if (old.w, old.h) != (rect.w, rect.h) {
            self.compositor.refresh(&mut self.backend, window);
        }
        self.compositor.damage_rect(old);
        self.compositor.damage_rect(rect);
    }

    pub(super) fn on_property_notify(&mut self, window: Window, kind: PropertyKind) {
        let Some(client) = self.clients.get_mut(window) else {
            return;
        };
        self.backend.refresh_property(window, &mut client.props, kind);
        let title = client.title();
        let urgent = client.props.is_urgent();
        let opaque = client.props.opaque_region();
        let has_alpha = client.props.has_alpha();

        let Some(view) = self.view_of(window) else {
            return;
        };
        let Some(v) = self.tree.view_mut(view) else {
            return;
        };
        match kind {
            PropertyKind::Title => {
                if v.title == title {
                    return;
                }
                v.title = title;
                v.needs_redraw = true;
            }
            PropertyKind::Hints | PropertyKind::State => {
                if v.urgent == urgent {
                    return;
                }
                v.urgent = urgent;
                v.needs_redraw = true;
            }
            PropertyKind::OpaqueRegion => {
                v.opaque_hint = opaque;
                v.has_alpha = has_alpha;
                self.compositor.damage_rect(v.rect);
                return;
            }
            PropertyKind::Strut => {
                self.layout_dirty = true;
                return;
            }
            _ => return,
        }
        self.mark_notebook_dirty(view);
    }

    pub(super) fn on_client_message(&mut self, window: Window, request: ClientRequest) {
        let Some(view) = self.view_of(window) else {
            return;
        };
        match request {
            ClientRequest::Fullscreen(action) => {
                let Some(v) = self.tree.view(view) else {
                    return;
                };
                let current = matches!(v.kind, ViewKind::Fullscreen { .. });
                let wanted = match action {
                    StateAction::Add => true,
                    StateAction::Remove => false,
                    StateAction::Toggle => !current,
                };
                if wanted != current {
                    self.set_fullscreen(view, wanted);
                }
            }
            ClientRequest::Activate => self.activate(view, self.last_time),
            ClientRequest::Close => self.close_view(view),
        }
    }

    /// Contents of a top-level changed.
    pub(super) fn on_damage(&mut self, window: Window, area: Rect) {
        if let Some(origin) = self.toplevel_origin(window) {
            self.compositor
                .damage_rect(area.translate(origin.x, origin.y));
        }
    }

    fn toplevel_origin(&self, window: Window) -> Option<Point> {
        if let Some(view) = self.view_of(window).and_then(|id| self.tree.view(id)) {
            if view.toplevel() == window {
                return Some(view.rect.origin());
            }
        }
        let root = self.workspace().root;
        self.tree
            .subtree(root, Order::DepthFirst)
            .into_iter()
            .find_map(|id| match self.tree.kind(id)? {
                NodeKind::View(v) if v.frame == Some(window) => Some(v.rect.origin()),
                NodeKind::Viewport(v) if v.back == Some(window) => Some(v.raw.origin()),
                NodeKind::Overlay(o) if o.window == Some(window) => Some(o.rect.origin()),
                _ => None,
            })
    }
}
