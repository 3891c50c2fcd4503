//! Pointer and keyboard input.

use page_config::{Action, Key, Keysym, Modifiers};

use super::Page;
use crate::backend::{Backend, ButtonEvent, CursorKind, KeyEvent, MotionEvent};
use crate::grab::{AltTabGrab, MoveGrab, ResizeGrab, SplitGrab, TabDragGrab};
use crate::layout::notebook::TabBarHit;
use crate::layout::split::SplitType;
use crate::region::Point;
use crate::tree::{ButtonAction, Dispatch, NodeId, NodeKind};
use crate::utils::spawn;
use crate::view::floating::{compute_layout, FloatingZone};
use crate::view::ViewKind;

const BUTTON_LEFT: u8 = 1;
const BUTTON_MIDDLE: u8 = 2;
const SCROLL_UP: u8 = 4;
const SCROLL_DOWN: u8 = 5;

/// What a button press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressTarget {
    Floating { view: NodeId, zone: FloatingZone },
    Tab { notebook: NodeId, hit: TabBarHit },
    SplitBar { split: NodeId },
    Client { view: NodeId },
    Background,
}

impl<B: Backend> Page<B> {
    fn press_target(&self, p: Point) -> PressTarget {
        let theme = self.theme.config();
        let root = self.workspace().root;

        let mut target = PressTarget::Background;
        self.tree
            .broadcast_button_press(root, Dispatch::TopmostFirst, |id, node| {
                let found = match &node.kind {
                    NodeKind::View(view) if view.rect.contains_point(p) => match view.kind {
                        ViewKind::Floating => {
                            let layout = compute_layout((view.rect.w, view.rect.h), theme);
                            match layout.hit_test(p - view.rect.origin()) {
                                Some(FloatingZone::Client) | None => {
                                    PressTarget::Client { view: id }
                                }
                                Some(zone) => PressTarget::Floating { view: id, zone },
                            }
                        }
                        ViewKind::Popup { .. } => return ButtonAction::Continue,
                        _ => PressTarget::Client { view: id },
                    },
                    NodeKind::Notebook(nb) => match nb.hit_test(p) {
                        Some(hit) => PressTarget::Tab { notebook: id, hit },
                        None => return ButtonAction::Continue,
                    },
                    NodeKind::Split(split) if split.bar.contains_point(p) => {
                        PressTarget::SplitBar { split: id }
                    }
                    _ => return ButtonAction::Continue,
                };
                target = found;
                ButtonAction::SyncGrab
            });
        target
    }

    pub(super) fn on_button_press(&mut self, event: ButtonEvent) {
        self.last_time = event.time;
        if self.has_grab() {
            self.backend.allow_events(false, event.time);
            return;
        }

        let target = self.press_target(event.root);
        trace!("button {} on {target:?}", event.button);
        let replay = matches!(target, PressTarget::Client { .. });
        self.backend.allow_events(replay, event.time);

        match target {
            PressTarget::Client { view } => self.press_client(view, &event),
            PressTarget::Floating { view, zone } => self.press_floating(view, zone, &event),
            PressTarget::Tab { notebook, hit } => self.press_tab(notebook, hit, &event),
            PressTarget::SplitBar { split } => {
                if event.button != BUTTON_LEFT {
                    return;
                }
                let split_type = self.tree.split(split).map(|s| s.split_type);
                if let (Some(grab), Some(split_type)) = (SplitGrab::new(self, split), split_type) {
                    self.start_grab(Box::new(grab), Some(CursorKind::Split(split_type)));
                }
            }
            PressTarget::Background => (),
        }
    }

    fn press_client(&mut self, view: NodeId, event: &ButtonEvent) {
        self.set_focus(Some(view), event.time);

        let Some(v) = self.tree.view(view) else {
            return;
        };
        let with_super = event.modifiers & Modifiers::SUPER.bits() != 0;
        if v.kind == ViewKind::Floating && with_super && event.button == BUTTON_LEFT {
            let grab = MoveGrab::new(view, event.root, v.client_rect);
            self.start_grab(Box::new(grab), Some(CursorKind::Move));
        }
    }

    fn press_floating(&mut self, view: NodeId, zone: FloatingZone, event: &ButtonEvent) {
        self.set_focus(Some(view), event.time);
        if event.button != BUTTON_LEFT {
            return;
        }
        let Some(client_rect) = self.tree.view(view).map(|v| v.client_rect) else {
            return;
        };

        match zone {
            FloatingZone::Close => self.close_view(view),
            FloatingZone::Bind => {
                self.bind_to_notebook(view, None);
            }
            FloatingZone::Grip(edges) => {
                let grab = ResizeGrab::new(view, edges, event.root, client_rect);
                self.start_grab(Box::new(grab), Some(CursorKind::Resize(edges)));
            }
            FloatingZone::Title => {
                let grab = MoveGrab::new(view, event.root, client_rect);
                self.start_grab(Box::new(grab), Some(CursorKind::Move));
            }
            FloatingZone::Client => (),
        }
    }

    fn press_tab(&mut self, notebook: NodeId, hit: TabBarHit, event: &ButtonEvent) {
        match event.button {
            SCROLL_UP | SCROLL_DOWN => {
                if let Some(nb) = self.tree.notebook_mut(notebook) {
                    nb.scroll_by(if event.button == SCROLL_UP { -1 } else { 1 });
                }
                return;
            }
            BUTTON_LEFT | BUTTON_MIDDLE => (),
            _ => return,
        }
        let Some(nb) = self.tree.notebook(notebook) else {
            return;
        };
        let selected = nb.selected();

        if event.button == BUTTON_MIDDLE {
            // Middle click closes the tab under the pointer.
            if let TabBarHit::Tab(idx) = hit {
                if let Some(view) = nb.tabs().get(idx).map(|tab| tab.view) {
                    self.close_view(view);
                }
            }
            return;
        }

        match hit {
            TabBarHit::Close => match selected {
                Some(view) => self.close_view(view),
                None => self.remove_notebook(notebook),
            },
            TabBarHit::Bind => {
                if let Some(view) = selected {
                    let iconic = nb.is_iconic(view);
                    if let Some(nb) = self.tree.notebook_mut(notebook) {
                        nb.set_iconic(view, !iconic);
                    }
                    self.layout_dirty = true;
                }
            }
            TabBarHit::ScrollLeft | TabBarHit::ScrollRight => {
                let step = if hit == TabBarHit::ScrollLeft { -1 } else { 1 };
                if let Some(nb) = self.tree.notebook_mut(notebook) {
                    nb.scroll_by(step);
                }
            }
            TabBarHit::Tab(idx) => {
                let Some(view) = nb.tabs().get(idx).map(|tab| tab.view) else {
                    return;
                };
                self.set_focus(Some(view), event.time);
                let grab = TabDragGrab::new(view, event.root);
                self.start_grab(Box::new(grab), Some(CursorKind::Default));
            }
            TabBarHit::SplitHorizontal => self.split(notebook, SplitType::Horizontal),
            TabBarHit::SplitVertical => self.split(notebook, SplitType::Vertical),
            // Dragging the empty part of the bar moves the selected tab.
            TabBarHit::Empty => {
                let Some(view) = selected else {
                    return;
                };
                self.set_focus(Some(view), event.time);
                let grab = TabDragGrab::new(view, event.root);
                self.start_grab(Box::new(grab), Some(CursorKind::Default));
            }
        }
    }

    pub(super) fn on_button_release(&mut self, event: ButtonEvent) {
        self.last_time = event.time;
        self.with_grab(|grab, page| grab.button_release(page, &event));
    }

    pub(super) fn on_motion(&mut self, event: MotionEvent) {
        self.last_time = event.time;
        if let Some(mut grab) = self.grab.take() {
            grab.motion(self, &event);
            self.grab = Some(grab);
        }
    }

    pub(super) fn on_key_press(&mut self, event: KeyEvent) {
        self.last_time = event.time;
        if self.with_grab(|grab, page| grab.key_press(page, &event)) {
            return;
        }

        let key = Key {
            keysym: Keysym::new(event.keysym),
            modifiers: Modifiers::from_bits_truncate(event.modifiers),
        };
        let Some(action) = self.config.binds.find(key).map(|bind| bind.action.clone()) else {
            trace!("unbound key {key:?}");
            return;
        };
        self.do_action(action, key);
    }

    pub(super) fn on_key_release(&mut self, event: KeyEvent) {
        self.last_time = event.time;
        self.with_grab(|grab, page| grab.key_release(page, &event));
    }

    pub fn do_action(&mut self, action: Action, key: Key) {
        debug!("action {action:?}");
        let focused = self.focused;
        match action {
            Action::Quit => self.quit(),
            Action::ToggleFullscreen => {
                if let Some(view) = focused {
                    self.toggle_fullscreen(view);
                }
            }
            Action::ToggleFloating => {
                if let Some(view) = focused {
                    self.toggle_floating(view);
                }
            }
            Action::ToggleCompositor => self.toggle_compositor(),
            Action::CloseWindow => {
                if let Some(view) = focused {
                    self.close_view(view);
                }
            }
            Action::FocusNext => {
                let Some(grab) = AltTabGrab::new(self, key) else {
                    return;
                };
                self.start_grab(Box::new(grab), None);
                if !self.backend.grab_keyboard() {
                    warn!("could not grab the keyboard");
                    self.cancel_grab();
                }
            }
            Action::WorkspaceLeft => self.cycle_workspace(false),
            Action::WorkspaceRight => self.cycle_workspace(true),
            Action::SplitHorizontal | Action::SplitVertical => {
                let split_type = if action == Action::SplitHorizontal {
                    SplitType::Horizontal
                } else {
                    SplitType::Vertical
                };
                if let Some(notebook) = self.target_notebook() {
                    self.split(notebook, split_type);
                }
            }
            Action::Spawn(command) => spawn(command),
        }
    }
}
