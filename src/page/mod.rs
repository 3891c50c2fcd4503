//! The window manager state.
//!
//! [`Page`] owns the scene tree, the client registry and the compositor. Event handlers only
//! change the model and mark what went stale; [`Page::refresh`] pushes the result to the
//! display server once per batch of events, and [`Page::render_frame`] composites the screen.

use anyhow::Context as _;
use page_config::Config;

use crate::backend::{Backend, BackendEvent, CursorKind, Timestamp, Window};
use crate::client::{Clients, SizeHints};
use crate::compositor::Compositor;
use crate::grab::{GrabHandler, GrabStatus};
use crate::layout::{self, LayoutMetrics};
use crate::overlay::{Overlay, OverlayKind};
use crate::region::{Point, Rect};
use crate::theme::{DefaultTheme, Theme};
use crate::tree::{NodeId, NodeKind, Order, Tree};
use crate::view::floating::frame_for_client;
use crate::view::ViewKind;
use crate::workspace::{LayerKind, Viewport, Workspace, WorkspaceId};

mod input;
mod manage;
mod render;

pub use manage::Teardown;

pub struct Page<B: Backend> {
    pub backend: B,
    pub config: Config,
    theme: Box<dyn Theme>,
    pub metrics: LayoutMetrics,
    pub tree: Tree,
    pub clients: Clients,
    pub workspaces: Vec<Workspace>,
    active: WorkspaceId,
    pub compositor: Compositor,
    grab: Option<Box<dyn GrabHandler<B>>>,
    focused: Option<NodeId>,
    outputs: Vec<Rect>,
    /// Time of the last input event.
    last_time: Timestamp,
    running: bool,
    layout_dirty: bool,
    stack_dirty: bool,
    client_list_dirty: bool,
}

impl<B: Backend> Page<B> {
    pub fn new(backend: B, config: Config, outputs: Vec<Rect>) -> anyhow::Result<Self> {
        let theme = Box::new(DefaultTheme::new(config.theme.clone()));
        Self::with_theme(backend, config, outputs, theme)
    }

    pub fn with_theme(
        mut backend: B,
        config: Config,
        outputs: Vec<Rect>,
        theme: Box<dyn Theme>,
    ) -> anyhow::Result<Self> {
        let metrics = LayoutMetrics::from_theme(&config.theme);

        // Start unredirected so that enabling goes through the backend.
        let initial = page_config::Compositor {
            off: true,
            ..config.compositor.clone()
        };
        let mut compositor = Compositor::new(&initial, config.theme.background_color);
        compositor
            .set_enabled(&mut backend, !config.compositor.off)
            .context("error enabling compositing")?;

        let mut tree = Tree::new();
        let count = usize::try_from(config.layout.workspace_count)
            .unwrap_or(1)
            .max(1);
        let workspaces: Vec<_> = (0..count)
            .map(|id| {
                let workspace = Workspace::new(&mut tree, id);
                tree.set_visible(workspace.root, id == 0);
                workspace
            })
            .collect();

        let outputs = if outputs.is_empty() {
            vec![backend.screen_rect()]
        } else {
            outputs
        };

        let mut page = Self {
            backend,
            config,
            theme,
            metrics,
            tree,
            clients: Clients::new(),
            workspaces,
            active: 0,
            compositor,
            grab: None,
            focused: None,
            outputs: outputs.clone(),
            last_time: 0,
            running: true,
            layout_dirty: true,
            stack_dirty: true,
            client_list_dirty: true,
        };

        for workspace in 0..page.workspaces.len() {
            for rect in &outputs {
                page.create_viewport(workspace, *rect);
            }
        }
        page.grab_keys();

        info!(
            "managing {} workspaces on {} outputs",
            page.workspaces.len(),
            outputs.len()
        );
        Ok(page)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn quit(&mut self) {
        info!("quitting");
        self.running = false;
    }

    pub fn active_workspace(&self) -> WorkspaceId {
        self.active
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspaces[self.active]
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn outputs(&self) -> &[Rect] {
        &self.outputs
    }

    pub fn has_grab(&self) -> bool {
        self.grab.is_some()
    }

    /// Live view owning the client `window`.
    pub fn view_of(&self, window: Window) -> Option<NodeId> {
        self.clients.owner(window, &self.tree)
    }

    pub fn size_hints(&self, view: NodeId) -> SizeHints {
        self.tree
            .view(view)
            .and_then(|v| self.clients.get(v.client))
            .map(|c| c.props.size_hints())
            .unwrap_or_default()
    }

    /// Focus history of the active workspace, most recent first.
    pub fn focus_history(&mut self) -> Vec<NodeId> {
        self.workspaces[self.active]
            .focus_history(&self.tree)
            .to_vec()
    }

    /// Work area of the viewport holding the focused view, or of the first viewport.
    pub fn active_work_area(&self) -> Option<Rect> {
        let workspace = self.workspace();
        let viewport = self
            .focused
            .and_then(|view| self.tree.view(view))
            .and_then(|view| workspace.viewport_for_rect(&self.tree, view.rect))
            .or_else(|| workspace.default_viewport(&self.tree))?;
        self.tree.viewport(viewport).map(|v| v.work_area)
    }

    /// Shown notebook of the active workspace under `p`.
    pub fn notebook_at(&self, p: Point) -> Option<NodeId> {
        self.workspace()
            .notebooks(&self.tree)
            .into_iter()
            .filter(|id| self.tree.is_shown(*id))
            .find(|id| {
                self.tree
                    .notebook(*id)
                    .is_some_and(|nb| nb.allocation().contains_point(p))
            })
    }

    /// Notebook new tiled clients go to: the focused one, or the first of the workspace.
    pub fn target_notebook(&self) -> Option<NodeId> {
        let focused = self.focused.and_then(|view| match self.tree.view(view)?.kind {
            ViewKind::Notebook { notebook } => Some(notebook),
            _ => None,
        });
        focused
            .filter(|nb| self.tree.workspace_of(*nb) == Some(self.active))
            .or_else(|| self.workspace().default_notebook(&self.tree))
    }

    /// Handles every queued event, then brings the server up to date.
    pub fn dispatch_events(&mut self) {
        while let Some(event) = self.backend.next_event() {
            self.handle_event(event);
        }
        self.refresh();
    }

    pub fn handle_event(&mut self, event: BackendEvent) {
        trace!("event: {event:?}");
        match event {
            BackendEvent::MapRequest { window } => self.on_map_request(window),
            BackendEvent::MapNotify {
                window,
                override_redirect,
            } => self.on_map_notify(window, override_redirect),
            BackendEvent::UnmapNotify { window } => self.on_unmap_notify(window),
            BackendEvent::DestroyNotify { window } => self.on_destroy_notify(window),
            BackendEvent::ConfigureRequest { window, rect, mask } => {
                self.on_configure_request(window, rect, mask)
            }
            BackendEvent::ConfigureNotify { window, rect } => self.on_configure_notify(window, rect),
            BackendEvent::PropertyNotify { window, property } => {
                self.on_property_notify(window, property)
            }
            BackendEvent::ButtonPress(event) => self.on_button_press(event),
            BackendEvent::ButtonRelease(event) => self.on_button_release(event),
            BackendEvent::Motion(event) => self.on_motion(event),
            BackendEvent::KeyPress(event) => self.on_key_press(event),
            BackendEvent::KeyRelease(event) => self.on_key_release(event),
            BackendEvent::Damage { window, area } => self.on_damage(window, area),
            BackendEvent::ClientMessage { window, request } => {
                self.on_client_message(window, request)
            }
            BackendEvent::OutputsChanged { outputs } => self.set_outputs(outputs),
        }
    }

    fn grab_keys(&mut self) {
        let keys: Vec<_> = self
            .config
            .binds
            .0
            .iter()
            .map(|bind| (bind.key.keysym.raw(), bind.key.modifiers.bits()))
            .collect();
        self.backend.grab_keys(&keys);
    }

    // Grabs.

    /// Installs `handler`, grabbing the pointer with `cursor` when given.
    pub fn start_grab(&mut self, mut handler: Box<dyn GrabHandler<B>>, cursor: Option<CursorKind>) {
        self.cancel_grab();
        if let Some(cursor) = cursor {
            let root = self.backend.root();
            if !self.backend.grab_pointer(root, cursor) {
                warn!("could not grab the pointer");
                handler.cancel(self);
                return;
            }
        }
        self.grab = Some(handler);
    }

    pub fn cancel_grab(&mut self) {
        if let Some(mut grab) = self.grab.take() {
            debug!("cancelling grab");
            grab.cancel(self);
            self.end_grab();
        }
    }

    fn end_grab(&mut self) {
        self.backend.ungrab_pointer();
        self.backend.ungrab_keyboard();
    }

    /// Runs `f` on the current grab handler. Returns whether a grab was running.
    fn with_grab(&mut self, f: impl FnOnce(&mut dyn GrabHandler<B>, &mut Self) -> GrabStatus) -> bool {
        let Some(mut grab) = self.grab.take() else {
            return false;
        };
        match f(grab.as_mut(), self) {
            GrabStatus::Continue => self.grab = Some(grab),
            GrabStatus::Done => self.end_grab(),
        }
        true
    }

    // Overlays.

    /// Adds a popup on top of the active workspace.
    pub fn add_overlay(&mut self, kind: OverlayKind, rect: Rect) -> Option<NodeId> {
        let window = match self.backend.create_overlay_window(rect) {
            Ok(window) => window,
            Err(err) => {
                warn!("error creating an overlay window: {err:?}");
                return None;
            }
        };

        let mut overlay = Overlay::new(kind, rect);
        overlay.window = Some(window);
        let id = self.tree.insert(NodeKind::Overlay(overlay));
        let layer = self.workspace().layer(LayerKind::Overlays);
        self.tree.push_child(layer, id);

        self.compositor.track(&mut self.backend, window);
        self.backend.map(window);
        self.compositor.damage_rect(rect);
        self.stack_dirty = true;
        Some(id)
    }

    pub fn update_overlay(&mut self, id: NodeId, kind: OverlayKind, rect: Rect) {
        if let Some(overlay) = self.tree.overlay_mut(id) {
            if overlay.kind != kind {
                overlay.kind = kind;
                overlay.needs_redraw = true;
            }
        }
        self.move_overlay(id, rect);
    }

    pub fn move_overlay(&mut self, id: NodeId, rect: Rect) {
        let Some(overlay) = self.tree.overlay_mut(id) else {
            return;
        };
        let old = overlay.rect;
        if old == rect {
            return;
        }
        let resized = (old.w, old.h) != (rect.w, rect.h);
        overlay.rect = rect;
        overlay.needs_redraw |= resized;

        if let Some(window) = overlay.window {
            self.backend.configure(window, rect);
            if resized {
                self.compositor.refresh(&mut self.backend, window);
            }
        }
        self.compositor.damage_rect(old);
        self.compositor.damage_rect(rect);
    }

    pub fn remove_overlay(&mut self, id: NodeId) {
        let Some(overlay) = self.tree.overlay(id) else {
            return;
        };
        let (rect, window) = (overlay.rect, overlay.window);
        if let Some(window) = window {
            self.compositor.untrack(&mut self.backend, window);
            self.backend.destroy_window(window);
        }
        self.compositor.damage_rect(rect);
        self.tree.remove(id);
    }

    // Viewports and outputs.

    fn create_viewport(&mut self, workspace: WorkspaceId, raw: Rect) -> NodeId {
        let layer = self.workspaces[workspace].layer(LayerKind::Tiling);
        let viewport = self.tree.insert(NodeKind::Viewport(Viewport::new(raw)));
        self.tree.push_child(layer, viewport);
        let notebook = layout::new_notebook(&mut self.tree, &self.metrics);
        self.tree.push_child(viewport, notebook);

        match self.backend.create_background(raw) {
            Ok(back) => {
                if let Some(v) = self.tree.viewport_mut(viewport) {
                    v.back = Some(back);
                }
                self.compositor.track(&mut self.backend, back);
                if workspace == self.active {
                    self.backend.map(back);
                }
            }
            Err(err) => warn!("error creating the background of {raw:?}: {err:?}"),
        }

        self.layout_dirty = true;
        self.stack_dirty = true;
        viewport
    }

    fn resize_viewport(&mut self, viewport: NodeId, raw: Rect) {
        let Some(v) = self.tree.viewport_mut(viewport) else {
            return;
        };
        if v.raw == raw {
            return;
        }
        v.raw = raw;
        v.work_area = raw;
        v.needs_redraw = true;
        if let Some(back) = v.back {
            self.backend.configure(back, raw);
            self.compositor.refresh(&mut self.backend, back);
        }
    }

    /// Moves the clients of `viewport` to the first viewport of its workspace and drops it.
    fn remove_viewport(&mut self, workspace: WorkspaceId, viewport: NodeId) {
        let first = self.workspaces[workspace].default_viewport(&self.tree);
        let Some(target) = self.workspaces[workspace].default_notebook(&self.tree) else {
            return;
        };
        if first == Some(viewport) {
            return;
        }

        let selected = self.tree.notebook(target).and_then(|nb| nb.selected());
        for view in self.tree.views_in(viewport) {
            layout::detach_from_notebook(&mut self.tree, view);
            layout::attach_to_notebook(&mut self.tree, view, target, None);
        }
        if let (Some(selected), Some(nb)) = (selected, self.tree.notebook_mut(target)) {
            nb.select(selected);
        }

        let back = self.tree.viewport(viewport).and_then(|v| v.back);
        if let Some(back) = back {
            self.compositor.untrack(&mut self.backend, back);
            self.backend.destroy_window(back);
        }
        self.tree.remove(viewport);
        debug!("removed viewport {viewport:?} of workspace {workspace}");
    }

    /// Rebuilds every workspace's viewports from the output geometries.
    pub fn set_outputs(&mut self, outputs: Vec<Rect>) {
        let outputs = if outputs.is_empty() {
            vec![self.backend.screen_rect()]
        } else {
            outputs
        };
        if outputs == self.outputs {
            return;
        }
        info!("outputs changed: {outputs:?}");
        self.cancel_grab();

        for workspace in 0..self.workspaces.len() {
            let viewports = self.workspaces[workspace].viewports(&self.tree);
            for (idx, rect) in outputs.iter().enumerate() {
                match viewports.get(idx) {
                    Some(viewport) => self.resize_viewport(*viewport, *rect),
                    None => {
                        self.create_viewport(workspace, *rect);
                    }
                }
            }
            for viewport in viewports.iter().skip(outputs.len()) {
                self.remove_viewport(workspace, *viewport);
            }
        }

        self.outputs = outputs;
        self.compositor.damage_rect(self.backend.screen_rect());
        self.layout_dirty = true;
        self.stack_dirty = true;
    }

    // Workspaces.

    pub fn switch_workspace(&mut self, target: WorkspaceId) {
        if target == self.active || target >= self.workspaces.len() {
            return;
        }
        self.cancel_grab();
        let old = self.active;
        info!("switching to workspace {target}");

        // Docks and popups are shared by every workspace.
        for kind in [LayerKind::Dock, LayerKind::Tooltips, LayerKind::Notifications] {
            let from = self.workspaces[old].layer(kind);
            let to = self.workspaces[target].layer(kind);
            for child in self.tree.children(from).to_vec() {
                self.tree.push_child(to, child);
            }
        }

        for (workspace, visible) in [(old, false), (target, true)] {
            let root = self.workspaces[workspace].root;
            self.tree.set_visible(root, visible);
            for viewport in self.workspaces[workspace].viewports(&self.tree) {
                let Some(back) = self.tree.viewport(viewport).and_then(|v| v.back) else {
                    continue;
                };
                if visible {
                    self.backend.map(back);
                } else {
                    self.backend.unmap(back);
                }
            }
        }

        self.active = target;
        self.compositor.damage_rect(self.backend.screen_rect());
        self.layout_dirty = true;
        self.stack_dirty = true;

        let last = self.workspaces[target].last_focused(&self.tree);
        self.set_focus(last, self.last_time);
    }

    /// Switches to the next (or previous) workspace, wrapping around.
    pub fn cycle_workspace(&mut self, forward: bool) {
        let len = self.workspaces.len();
        let target = if forward {
            (self.active + 1) % len
        } else {
            (self.active + len - 1) % len
        };
        self.switch_workspace(target);
    }

    // Focus.

    pub fn set_focus(&mut self, view: Option<NodeId>, time: Timestamp) {
        let view = view.filter(|id| self.tree.view(*id).is_some_and(|v| v.kind.is_focusable()));

        if let Some(old) = self.focused.take() {
            if let Some(v) = self.tree.view_mut(old) {
                v.focused = false;
                v.needs_redraw = true;
            }
            self.mark_notebook_dirty(old);
        }

        let Some(id) = view else {
            self.backend.set_input_focus(None, false, time);
            self.backend.set_active_window(None);
            return;
        };
        let Some(v) = self.tree.view_mut(id) else {
            return;
        };
        v.focused = true;
        v.needs_redraw = true;
        let (client, kind) = (v.client, v.kind);

        match kind {
            ViewKind::Notebook { notebook } => {
                if let Some(nb) = self.tree.notebook_mut(notebook) {
                    if nb.shown() != Some(id) {
                        nb.select(id);
                        self.layout_dirty = true;
                    }
                    nb.needs_redraw = true;
                }
            }
            ViewKind::Floating => {
                if self.tree.raise(id) {
                    self.stack_dirty = true;
                }
            }
            _ => (),
        }

        if let Some(workspace) = self
            .tree
            .workspace_of(id)
            .and_then(|ws| self.workspaces.get_mut(ws))
        {
            workspace.push_focus(id);
        }
        self.focused = Some(id);

        let (accepts, takes) = self
            .clients
            .get(client)
            .map_or((true, false), |c| (c.props.accepts_input(), c.props.takes_focus()));
        if accepts || takes {
            self.backend.set_input_focus(Some(client), takes, time);
        } else {
            self.backend.set_input_focus(None, false, time);
        }
        self.backend.set_active_window(Some(client));
        debug!("focused {id:?} (window {client:#x})");
    }

    /// Brings `view` forward: switches to its workspace, selects its tab and focuses it.
    pub fn activate(&mut self, view: NodeId, time: Timestamp) {
        let Some(workspace) = self.tree.workspace_of(view) else {
            return;
        };
        if workspace != self.active {
            self.switch_workspace(workspace);
        }
        self.set_focus(Some(view), time);
    }

    fn mark_notebook_dirty(&mut self, view: NodeId) {
        if let Some(ViewKind::Notebook { notebook }) = self.tree.view(view).map(|v| v.kind) {
            if let Some(nb) = self.tree.notebook_mut(notebook) {
                nb.needs_redraw = true;
            }
        }
    }

    // Floating geometry.

    /// Moves and resizes a floating view; `client_rect` is the client area on screen.
    pub fn move_floating(&mut self, view: NodeId, client_rect: Rect) {
        let theme = self.theme.config();
        let Some(v) = self.tree.view_mut(view) else {
            return;
        };
        if v.kind != ViewKind::Floating || v.client_rect == client_rect {
            return;
        }
        v.client_rect = client_rect;
        v.rect = frame_for_client(client_rect, theme);
    }

    pub fn set_split_ratio(&mut self, split: NodeId, ratio: f64) {
        let Some(s) = self.tree.split_mut(split) else {
            return;
        };
        s.set_ratio(ratio);
        debug!("split {split:?} ratio {:.3}", s.ratio());
        self.layout_dirty = true;
    }

    /// Toggles compositing, re-tracking every top-level when it comes back on.
    pub fn toggle_compositor(&mut self) {
        let enabled = !self.compositor.is_enabled();
        if let Err(err) = self.compositor.set_enabled(&mut self.backend, enabled) {
            warn!("error toggling the compositor: {err:?}");
            return;
        }
        if !enabled {
            return;
        }

        let mut windows = Vec::new();
        for workspace in &self.workspaces {
            for id in self.tree.subtree(workspace.root, Order::DepthFirst) {
                match self.tree.kind(id) {
                    Some(NodeKind::Viewport(v)) => windows.extend(v.back),
                    Some(NodeKind::View(v)) => windows.push(v.toplevel()),
                    Some(NodeKind::Overlay(o)) => windows.extend(o.window),
                    _ => (),
                }
            }
        }
        for window in windows {
            self.compositor.track(&mut self.backend, window);
        }
        self.compositor.damage_rect(self.backend.screen_rect());
    }

    #[cfg(test)]
    pub fn verify_invariants(&self) {
        use std::collections::HashSet;

        let views: Vec<NodeId> = self
            .workspaces
            .iter()
            .flat_map(|ws| self.tree.views_in(ws.root))
            .collect();
        for client in self.clients.iter() {
            let owner = self
                .view_of(client.window)
                .unwrap_or_else(|| panic!("client {:#x} has no view", client.window));
            let view = self.tree.view(owner).unwrap();
            assert_eq!(view.client, client.window, "owner views the wrong client");
        }

        for &id in &views {
            let view = self.tree.view(id).unwrap();
            assert_eq!(self.view_of(view.client), Some(id), "view is not its client's owner");
            assert_eq!(view.focused, self.focused == Some(id), "stale focus flag");

            match view.kind {
                ViewKind::Notebook { notebook } => {
                    assert_eq!(self.tree.parent(id), Some(notebook));
                    let nb = self.tree.notebook(notebook).unwrap();
                    assert!(nb.contains(id), "view missing from its notebook tabs");
                }
                ViewKind::Floating => {
                    let frame = frame_for_client(view.client_rect, self.theme.config());
                    assert_eq!(view.rect, frame);
                }
                _ => (),
            }
        }

        if let Some(focused) = self.focused {
            let view = self.tree.view(focused).expect("focused view is gone");
            assert!(view.kind.is_focusable());
        }

        for workspace in &self.workspaces {
            for notebook in self.tree.notebooks_in(workspace.root) {
                let nb = self.tree.notebook(notebook).unwrap();
                let tabs: HashSet<_> = nb.tabs().iter().map(|t| t.view).collect();
                let children: HashSet<_> = self.tree.children(notebook).iter().copied().collect();
                assert_eq!(tabs, children, "notebook tabs and tree children disagree");
                assert_eq!(nb.selected().is_some(), !nb.is_empty());
            }
            assert!(
                !workspace.notebooks(&self.tree).is_empty(),
                "workspace {} lost all its notebooks",
                workspace.id
            );
        }
    }
}
