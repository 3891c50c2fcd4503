//! Pushing the model to the display server: geometry, mapping, stacking, decorations and
//! composited frames.

use std::time::Instant;

use super::Page;
use crate::backend::{Backend, Window};
use crate::client::WmState;
use crate::compositor::{CompositedWindow, FrameStats};
use crate::layout;
use crate::region::{Rect, Region};
use crate::theme::{rasterize, FloatingDecoration, NotebookDecoration, TabState};
use crate::tree::{NodeId, NodeKind, Order};
use crate::view::floating::{compute_layout, frame_for_client};
use crate::view::ViewKind;
use crate::workspace::{reserved_areas, work_area, LayerKind};

impl<B: Backend> Page<B> {
    /// Brings the server up to date with everything marked stale since the last call.
    pub fn refresh(&mut self) {
        if std::mem::take(&mut self.layout_dirty) {
            self.relayout();
        }
        self.apply_geometry();
        self.sync_visibility();
        self.redraw_decorations();
        if std::mem::take(&mut self.stack_dirty) {
            self.restack();
        }
        if std::mem::take(&mut self.client_list_dirty) {
            let clients: Vec<Window> = self
                .all_views()
                .into_iter()
                .filter_map(|id| self.tree.view(id))
                .filter(|v| !matches!(v.kind, ViewKind::Popup { .. }))
                .map(|v| v.client)
                .collect();
            self.backend.set_client_list(&clients);
        }
        self.backend.flush();
    }

    /// Views of every workspace in paint order.
    fn all_views(&self) -> Vec<NodeId> {
        self.workspaces
            .iter()
            .flat_map(|ws| self.tree.views_in(ws.root))
            .collect()
    }

    fn relayout(&mut self) {
        let screen = self.backend.screen_rect();
        let docks = self.workspace().layer(LayerKind::Dock);
        let reserved: Vec<_> = self
            .tree
            .views_in(docks)
            .into_iter()
            .filter_map(|id| self.tree.view(id))
            .filter_map(|view| self.clients.get(view.client)?.props.strut.as_ref())
            .flat_map(|strut| reserved_areas(strut, screen))
            .collect();

        let viewports: Vec<_> = self
            .workspaces
            .iter()
            .flat_map(|ws| ws.viewports(&self.tree))
            .collect();
        for viewport in viewports {
            if let Some(v) = self.tree.viewport_mut(viewport) {
                v.work_area = work_area(v.raw, &reserved);
            }
            layout::update_viewport(&mut self.tree, viewport, &self.metrics);
        }

        let theme = self.theme.config();
        for id in self.all_views() {
            let Some(kind) = self.tree.view(id).map(|v| v.kind) else {
                continue;
            };
            match kind {
                ViewKind::Fullscreen { viewport, revert } => {
                    let viewport = match self.tree.viewport(viewport) {
                        Some(_) => Some(viewport),
                        None => self
                            .tree
                            .workspace_of(id)
                            .and_then(|ws| self.workspaces[ws].default_viewport(&self.tree)),
                    };
                    let Some(raw) = viewport.and_then(|vp| self.tree.viewport(vp)).map(|v| v.raw)
                    else {
                        continue;
                    };
                    if let (Some(view), Some(viewport)) = (self.tree.view_mut(id), viewport) {
                        view.kind = ViewKind::Fullscreen { viewport, revert };
                        view.rect = raw;
                        view.client_rect = raw;
                    }
                }
                ViewKind::Floating => {
                    if let Some(view) = self.tree.view_mut(id) {
                        view.rect = frame_for_client(view.client_rect, theme);
                    }
                }
                _ => (),
            }
        }
        trace!("relayout done");
    }

    /// Sends frames and clients their new geometry.
    fn apply_geometry(&mut self) {
        for id in self.all_views() {
            let Some(view) = self.tree.view(id) else {
                continue;
            };
            let Some(frame) = view.frame else {
                continue;
            };
            let wanted = (view.rect, view.client_rect);
            let previous = view.configured;
            if previous == Some(wanted) {
                continue;
            }
            let (rect, client_rect) = wanted;
            let client = view.client;
            let offset = view.client_offset();

            self.backend.configure(frame, rect);
            let inner = Rect::new(offset.x, offset.y, client_rect.w, client_rect.h);
            self.backend.configure(client, inner);
            self.backend.send_configure_notify(client, client_rect);

            let resized = previous.map_or(true, |(old, _)| (old.w, old.h) != (rect.w, rect.h));
            if resized {
                self.compositor.refresh(&mut self.backend, frame);
            }
            if let Some((old, _)) = previous {
                self.compositor.damage_rect(old);
            }
            self.compositor.damage_rect(rect);

            if let Some(view) = self.tree.view_mut(id) {
                view.configured = Some(wanted);
                view.needs_redraw |= resized;
            }
        }
    }

    /// Maps what is shown and unmaps what is hidden.
    fn sync_visibility(&mut self) {
        for id in self.all_views() {
            let shown = self.tree.is_shown(id);
            let Some(view) = self.tree.view(id) else {
                continue;
            };
            if matches!(view.kind, ViewKind::Dock | ViewKind::Popup { .. }) {
                continue;
            }
            let (client, frame, rect) = (view.client, view.toplevel(), view.rect);
            let mapped = view.mapped;

            if mapped != shown {
                if shown {
                    self.backend.map(frame);
                } else {
                    self.backend.unmap(frame);
                }
                self.compositor.damage_rect(rect);
                if let Some(view) = self.tree.view_mut(id) {
                    view.mapped = shown;
                }
            }

            let state = if shown { WmState::Normal } else { WmState::Iconic };
            if let Some(c) = self.clients.get_mut(client) {
                if c.wm_state != state {
                    c.wm_state = state;
                    self.backend.set_wm_state(client, state);
                }
            }
        }
    }

    fn redraw_decorations(&mut self) {
        let root = self.workspace().root;
        let viewports = self.workspace().viewports(&self.tree);
        for viewport in viewports {
            self.redraw_viewport(viewport);
        }

        let nodes = self.tree.subtree(root, Order::DepthFirst);
        for id in nodes {
            match self.tree.kind(id) {
                Some(NodeKind::View(view)) if view.needs_redraw => {
                    if view.kind == ViewKind::Floating {
                        self.redraw_floating(id);
                    }
                    if let Some(view) = self.tree.view_mut(id) {
                        view.needs_redraw = false;
                    }
                }
                Some(NodeKind::Overlay(overlay)) if overlay.needs_redraw => {
                    self.redraw_overlay(id);
                }
                _ => (),
            }
        }
    }

    /// Repaints a viewport background with its split bars and tab bars.
    fn redraw_viewport(&mut self, viewport: NodeId) {
        let Some(v) = self.tree.viewport(viewport) else {
            return;
        };
        let (raw, back) = (v.raw, v.back);
        let nodes = self.tree.subtree(viewport, Order::DepthFirst);
        let stale = v.needs_redraw
            || nodes
                .iter()
                .any(|id| self.tree.notebook(*id).is_some_and(|nb| nb.needs_redraw));
        if !stale {
            return;
        }

        if let Some(back) = back {
            let focused = self.focused;
            let (tree, theme) = (&self.tree, &self.theme);
            let image = rasterize(raw.w, raw.h, |cr| {
                theme.render_background(cr, Rect::new(0, 0, raw.w, raw.h))?;
                cr.translate(-f64::from(raw.x), -f64::from(raw.y));
                for id in &nodes {
                    match tree.kind(*id) {
                        Some(NodeKind::Split(split)) => {
                            theme.render_split(cr, split.bar, split.split_type)?;
                        }
                        Some(NodeKind::Notebook(nb)) => {
                            let selected = nb.selected();
                            let tabs = nb
                                .tabs()
                                .iter()
                                .map(|tab| {
                                    let view = tree.view(tab.view);
                                    TabState {
                                        title: view.map_or("", |v| v.title.as_str()),
                                        selected: selected == Some(tab.view),
                                        iconic: tab.iconic,
                                        urgent: view.is_some_and(|v| v.urgent),
                                    }
                                })
                                .collect();
                            let decoration = NotebookDecoration {
                                allocation: nb.allocation(),
                                layout: nb.layout(),
                                tabs,
                                focused: focused.is_some_and(|f| nb.contains(f)),
                            };
                            theme.render_notebook(cr, &decoration)?;
                        }
                        _ => (),
                    }
                }
                Ok(())
            });
            match image {
                Ok(image) => {
                    self.backend
                        .put_image(back, image.width, image.height, &image.data);
                    self.compositor.damage_rect(raw);
                }
                Err(err) => warn!("error painting viewport {viewport:?}: {err:?}"),
            }
        }

        if let Some(v) = self.tree.viewport_mut(viewport) {
            v.needs_redraw = false;
        }
        for id in nodes {
            if let Some(nb) = self.tree.notebook_mut(id) {
                nb.needs_redraw = false;
            }
        }
    }

    fn redraw_floating(&mut self, id: NodeId) {
        let Some(view) = self.tree.view(id) else {
            return;
        };
        let Some(frame) = view.frame else {
            return;
        };
        let rect = view.rect;
        let layout = compute_layout((rect.w, rect.h), self.theme.config());
        let decoration = FloatingDecoration {
            layout: &layout,
            title: &view.title,
            focused: view.focused,
            urgent: view.urgent,
        };
        let theme = &self.theme;
        match rasterize(rect.w, rect.h, |cr| theme.render_floating(cr, &decoration)) {
            Ok(image) => {
                self.backend
                    .put_image(frame, image.width, image.height, &image.data);
                self.compositor.damage_rect(rect);
            }
            Err(err) => warn!("error painting the frame of {id:?}: {err:?}"),
        }
    }

    fn redraw_overlay(&mut self, id: NodeId) {
        let Some(overlay) = self.tree.overlay(id) else {
            return;
        };
        let rect = overlay.rect;
        if let Some(window) = overlay.window {
            let theme = &self.theme;
            let size = (rect.w, rect.h);
            match rasterize(rect.w, rect.h, |cr| theme.render_overlay(cr, &overlay.kind, size)) {
                Ok(image) => {
                    self.backend
                        .put_image(window, image.width, image.height, &image.data);
                    self.compositor.damage_rect(rect);
                }
                Err(err) => warn!("error painting {} overlay: {err:?}", overlay.kind.label()),
            }
        }
        if let Some(overlay) = self.tree.overlay_mut(id) {
            overlay.needs_redraw = false;
        }
    }

    /// Stacks the active workspace bottom to top in tree order.
    fn restack(&mut self) {
        let root = self.workspace().root;
        let windows: Vec<Window> = self
            .tree
            .subtree(root, Order::DepthFirst)
            .into_iter()
            .filter_map(|id| match self.tree.kind(id)? {
                NodeKind::Viewport(v) => v.back,
                NodeKind::View(v) if !matches!(v.kind, ViewKind::Popup { .. }) => {
                    Some(v.toplevel())
                }
                NodeKind::Overlay(o) => o.window,
                _ => None,
            })
            .collect();
        trace!("restacking {} windows", windows.len());
        self.backend.restack(&windows);
    }

    /// What the compositor paints, bottom to top.
    fn composited_windows(&self, now: Instant) -> Vec<CompositedWindow> {
        let root = self.workspace().root;
        self.tree
            .subtree(root, Order::DepthFirst)
            .into_iter()
            .filter(|id| self.tree.is_shown(*id))
            .filter_map(|id| match self.tree.kind(id)? {
                NodeKind::Viewport(v) => Some(CompositedWindow::new(
                    Some(id),
                    v.back?,
                    v.raw,
                    Region::from_rect(v.raw),
                )),
                NodeKind::View(v) if v.mapped => {
                    let mut window =
                        CompositedWindow::new(Some(id), v.toplevel(), v.rect, v.opaque_region());
                    window.opacity = v.opacity(now);
                    Some(window)
                }
                NodeKind::Overlay(o) => Some(CompositedWindow::new(
                    Some(id),
                    o.window?,
                    o.rect,
                    Region::new(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Whether [`Page::render_frame`] has anything to do.
    pub fn needs_frame(&self) -> bool {
        if !self.compositor.is_enabled() {
            return false;
        }
        self.compositor.needs_frame()
            || self
                .tree
                .views_in(self.workspace().root)
                .into_iter()
                .any(|id| self.tree.view(id).is_some_and(|v| v.is_fading()))
    }

    /// Composites one frame of the active workspace.
    pub fn render_frame(&mut self, now: Instant) -> FrameStats {
        let windows = self.composited_windows(now);

        let views = self.tree.views_in(self.workspace().root);
        for id in views {
            if let Some(view) = self.tree.view_mut(id) {
                if view.fade.is_some_and(|fade| fade.is_done(now)) {
                    view.fade = None;
                }
            }
        }

        let stats = self.compositor.render(&mut self.backend, windows, now);
        self.backend.flush();
        if !stats.skipped {
            trace!(
                "frame: {} direct, {} opaque, {} slow ({} px)",
                stats.direct_paints,
                stats.opaque_paints,
                stats.slow_paints,
                stats.slow_area
            );
        }
        stats
    }
}
