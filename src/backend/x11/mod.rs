//! Display server backend over an `x11rb` connection.

use std::collections::{HashMap, VecDeque};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use anyhow::{anyhow, Context as _};
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    Allow, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageEvent, ColormapAlloc,
    ConfigureNotifyEvent, ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux,
    Cursor, EventMask, Font, Gcontext, GrabMode, GrabStatus, ImageFormat, InputFocus, MapState,
    ModMask, PropMode, SetMode, StackMode, WindowClass, CONFIGURE_NOTIFY_EVENT,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use self::atoms::Atoms;
use self::keyboard::Keymap;
use self::render::Renderer;
use super::{
    Backend, BackendEvent, ButtonEvent, ClientRequest, ConfigureMask, CursorKind, KeyEvent,
    MotionEvent, StateAction, Timestamp, Window, WindowSystem,
};
use crate::client::WmState;
use crate::layout::split::SplitType;
use crate::region::{Point, Rect};
use crate::view::floating::ResizeEdge;

mod atoms;
mod keyboard;
mod properties;
mod render;

/// Glyphs of the core cursor font.
mod glyph {
    pub const LEFT_PTR: u16 = 68;
    pub const FLEUR: u16 = 52;
    pub const TOP_LEFT_CORNER: u16 = 134;
    pub const TOP_RIGHT_CORNER: u16 = 136;
    pub const BOTTOM_LEFT_CORNER: u16 = 12;
    pub const BOTTOM_RIGHT_CORNER: u16 = 14;
    pub const TOP_SIDE: u16 = 138;
    pub const BOTTOM_SIDE: u16 = 16;
    pub const LEFT_SIDE: u16 = 70;
    pub const RIGHT_SIDE: u16 = 96;
    pub const SB_H_DOUBLE_ARROW: u16 = 108;
    pub const SB_V_DOUBLE_ARROW: u16 = 116;
}

fn root_events() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::STRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
}

fn grab_events() -> EventMask {
    EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION
}

pub(crate) fn clamp_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// `_NET_WM_STATE` action field; anything else is not a valid request.
fn state_action(value: u32) -> Option<StateAction> {
    match value {
        0 => Some(StateAction::Remove),
        1 => Some(StateAction::Add),
        2 => Some(StateAction::Toggle),
        _ => None,
    }
}

pub(crate) fn clamp_u16(v: i32) -> u16 {
    v.clamp(1, i32::from(u16::MAX)) as u16
}

fn log_err<T, E: std::fmt::Debug>(res: Result<T, E>, what: &str) {
    if let Err(err) = res {
        warn!("error {what}: {err:?}");
    }
}

#[derive(Debug, Default)]
struct Cursors {
    default: Cursor,
    moving: Cursor,
    resize: HashMap<u8, Cursor>,
    split_h: Cursor,
    split_v: Cursor,
}

impl Cursors {
    fn get(&self, kind: CursorKind) -> Cursor {
        match kind {
            CursorKind::Default => self.default,
            CursorKind::Move => self.moving,
            CursorKind::Resize(edges) => {
                self.resize.get(&edges.bits()).copied().unwrap_or(self.default)
            }
            CursorKind::Split(SplitType::Vertical) => self.split_h,
            CursorKind::Split(SplitType::Horizontal) => self.split_v,
        }
    }
}

pub struct X11Backend {
    conn: RustConnection,
    root: Window,
    root_depth: u8,
    root_visual: u32,
    colormap: u32,
    screen_rect: Rect,
    atoms: Atoms,
    keymap: Keymap,
    cursors: Cursors,
    /// Hidden window advertising the running manager.
    check_window: Window,
    renderer: Renderer,
    gcs: HashMap<u8, Gcontext>,
    /// Windows created by the manager, with their depth.
    own: HashMap<Window, u8>,
    keys: Vec<(u32, u16)>,
    pending: VecDeque<BackendEvent>,
    has_randr: bool,
}

impl X11Backend {
    pub fn new(display: Option<&str>, replace: bool) -> anyhow::Result<Self> {
        let (conn, screen_num) = x11rb::connect(display).context("error connecting to X")?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .context("X server reported no screens")?
            .clone();
        let root = screen.root;
        let atoms = Atoms::new(&conn)?.reply().context("error interning atoms")?;

        let check_window = conn.generate_id()?;
        conn.create_window(
            0,
            check_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            0,
            &CreateWindowAux::new().override_redirect(1),
        )?;

        if replace {
            replace_running_manager(&conn, screen_num, check_window)?;
        }

        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(root_events()))?
            .check()
            .map_err(|_| anyhow!("another window manager is already running"))?;

        let has_randr = conn
            .extension_information(randr::X11_EXTENSION_NAME)?
            .is_some();
        if has_randr {
            conn.randr_query_version(1, 5)?.reply()?;
            conn.randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE)?;
        } else {
            warn!("RandR extension not available, assuming a single output");
        }

        let renderer = Renderer::new(&conn, &screen)?;
        let keymap = Keymap::load(&conn)?;
        let cursors = create_cursors(&conn)?;

        let screen_rect = Rect::new(
            0,
            0,
            screen.width_in_pixels.into(),
            screen.height_in_pixels.into(),
        );

        let mut backend = Self {
            conn,
            root,
            root_depth: screen.root_depth,
            root_visual: screen.root_visual,
            colormap: screen.default_colormap,
            screen_rect,
            atoms,
            keymap,
            cursors,
            check_window,
            renderer,
            gcs: HashMap::new(),
            own: HashMap::from([(check_window, 0)]),
            keys: Vec::new(),
            pending: VecDeque::new(),
            has_randr,
        };
        backend.advertise()?;
        backend.adopt_existing()?;
        backend.conn.flush()?;

        Ok(backend)
    }

    /// Descriptor to poll for incoming events.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.conn.stream().as_fd()
    }

    pub fn outputs(&self) -> Vec<Rect> {
        let monitors = self
            .has_randr
            .then(|| self.conn.randr_get_monitors(self.root, true).ok()?.reply().ok())
            .flatten();

        let outputs: Vec<Rect> = monitors
            .map(|reply| {
                reply
                    .monitors
                    .iter()
                    .map(|m| Rect::new(m.x.into(), m.y.into(), m.width.into(), m.height.into()))
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if outputs.is_empty() {
            vec![self.screen_rect]
        } else {
            outputs
        }
    }

    fn advertise(&self) -> anyhow::Result<()> {
        let a = &self.atoms;
        for window in [self.root, self.check_window] {
            self.conn.change_property32(
                PropMode::REPLACE,
                window,
                a._NET_SUPPORTING_WM_CHECK,
                AtomEnum::WINDOW,
                &[self.check_window],
            )?;
        }
        self.conn.change_property8(
            PropMode::REPLACE,
            self.check_window,
            a._NET_WM_NAME,
            a.UTF8_STRING,
            b"page",
        )?;

        let supported = [
            a._NET_SUPPORTED,
            a._NET_SUPPORTING_WM_CHECK,
            a._NET_CLIENT_LIST,
            a._NET_ACTIVE_WINDOW,
            a._NET_CLOSE_WINDOW,
            a._NET_WM_NAME,
            a._NET_WM_STATE,
            a._NET_WM_STATE_FULLSCREEN,
            a._NET_WM_STATE_DEMANDS_ATTENTION,
            a._NET_WM_WINDOW_TYPE,
            a._NET_WM_STRUT,
            a._NET_WM_STRUT_PARTIAL,
            a._NET_WM_OPAQUE_REGION,
        ];
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            a._NET_SUPPORTED,
            AtomEnum::ATOM,
            &supported,
        )?;
        Ok(())
    }

    /// Queues windows that were mapped before the manager started.
    fn adopt_existing(&mut self) -> anyhow::Result<()> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        for window in tree.children {
            if self.own.contains_key(&window) {
                continue;
            }
            let Ok(attrs) = self.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            let event = if attrs.override_redirect {
                BackendEvent::MapNotify {
                    window,
                    override_redirect: true,
                }
            } else {
                BackendEvent::MapRequest { window }
            };
            self.pending.push_back(event);
        }
        debug!("adopting {} existing windows", self.pending.len());
        Ok(())
    }

    fn gc_for_depth(&mut self, window: Window, depth: u8) -> Option<Gcontext> {
        if let Some(gc) = self.gcs.get(&depth) {
            return Some(*gc);
        }
        let gc = self.conn.generate_id().ok()?;
        self.conn
            .create_gc(gc, window, &CreateGCAux::new().graphics_exposures(0))
            .ok()?;
        self.gcs.insert(depth, gc);
        Some(gc)
    }

    fn send_protocol(&self, window: Window, protocol: u32, time: Timestamp) {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.WM_PROTOCOLS,
            [protocol, time, 0, 0, 0],
        );
        log_err(
            self.conn.send_event(false, window, EventMask::NO_EVENT, event),
            "sending a protocol message",
        );
    }

    fn create_window(
        &mut self,
        rect: Rect,
        depth: u8,
        visual: u32,
        aux: CreateWindowAux,
    ) -> anyhow::Result<Window> {
        let colormap = if depth == self.root_depth && visual == self.root_visual {
            self.colormap
        } else {
            let colormap = self.conn.generate_id()?;
            self.conn
                .create_colormap(ColormapAlloc::NONE, colormap, self.root, visual)?;
            colormap
        };

        let window = self.conn.generate_id()?;
        self.conn.create_window(
            depth,
            window,
            self.root,
            clamp_i16(rect.x),
            clamp_i16(rect.y),
            clamp_u16(rect.w),
            clamp_u16(rect.h),
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &aux.border_pixel(0).colormap(colormap),
        )?;
        self.own.insert(window, depth);
        Ok(window)
    }

    fn translate(&mut self, event: Event) -> Option<BackendEvent> {
        let event = match event {
            Event::MapRequest(e) => BackendEvent::MapRequest { window: e.window },
            Event::MapNotify(e) => {
                if e.event != self.root || self.own.contains_key(&e.window) {
                    return None;
                }
                BackendEvent::MapNotify {
                    window: e.window,
                    override_redirect: e.override_redirect,
                }
            }
            Event::UnmapNotify(e) => {
                // Reported once by the parent; the copy sent to the window itself is dropped.
                if self.own.contains_key(&e.window) || e.event == e.window {
                    return None;
                }
                BackendEvent::UnmapNotify { window: e.window }
            }
            Event::DestroyNotify(e) => {
                if self.own.contains_key(&e.window) || e.event == e.window {
                    return None;
                }
                BackendEvent::DestroyNotify { window: e.window }
            }
            Event::ConfigureRequest(e) => BackendEvent::ConfigureRequest {
                window: e.window,
                rect: Rect::new(e.x.into(), e.y.into(), e.width.into(), e.height.into()),
                mask: ConfigureMask::from_bits_truncate(u16::from(e.value_mask)),
            },
            Event::ConfigureNotify(e) => {
                if e.window == self.root {
                    self.screen_rect = Rect::new(0, 0, e.width.into(), e.height.into());
                    return Some(BackendEvent::OutputsChanged {
                        outputs: self.outputs(),
                    });
                }
                if e.event != self.root || self.own.contains_key(&e.window) {
                    return None;
                }
                BackendEvent::ConfigureNotify {
                    window: e.window,
                    rect: Rect::new(e.x.into(), e.y.into(), e.width.into(), e.height.into()),
                }
            }
            Event::PropertyNotify(e) => BackendEvent::PropertyNotify {
                window: e.window,
                property: self.property_kind(e.atom)?,
            },
            Event::ButtonPress(e) => BackendEvent::ButtonPress(ButtonEvent {
                window: e.event,
                root: Point::new(e.root_x.into(), e.root_y.into()),
                pos: Point::new(e.event_x.into(), e.event_y.into()),
                button: e.detail,
                modifiers: u16::from(e.state),
                time: e.time,
            }),
            Event::ButtonRelease(e) => BackendEvent::ButtonRelease(ButtonEvent {
                window: e.event,
                root: Point::new(e.root_x.into(), e.root_y.into()),
                pos: Point::new(e.event_x.into(), e.event_y.into()),
                button: e.detail,
                modifiers: u16::from(e.state),
                time: e.time,
            }),
            Event::MotionNotify(e) => BackendEvent::Motion(MotionEvent {
                root: Point::new(e.root_x.into(), e.root_y.into()),
                modifiers: u16::from(e.state),
                time: e.time,
            }),
            Event::KeyPress(e) => BackendEvent::KeyPress(KeyEvent {
                keysym: self.keymap.keysym(e.detail),
                modifiers: u16::from(e.state),
                time: e.time,
            }),
            Event::KeyRelease(e) => BackendEvent::KeyRelease(KeyEvent {
                keysym: self.keymap.keysym(e.detail),
                modifiers: u16::from(e.state),
                time: e.time,
            }),
            Event::ClientMessage(e) => {
                let data = e.data.as_data32();
                let a = &self.atoms;
                let request = if e.type_ == a._NET_WM_STATE {
                    if !data[1..3].contains(&a._NET_WM_STATE_FULLSCREEN) {
                        return None;
                    }
                    let Some(action) = state_action(data[0]) else {
                        debug!("ignoring _NET_WM_STATE action {} on {:#x}", data[0], e.window);
                        return None;
                    };
                    ClientRequest::Fullscreen(action)
                } else if e.type_ == a._NET_ACTIVE_WINDOW {
                    ClientRequest::Activate
                } else if e.type_ == a._NET_CLOSE_WINDOW {
                    ClientRequest::Close
                } else {
                    return None;
                };
                BackendEvent::ClientMessage {
                    window: e.window,
                    request,
                }
            }
            Event::DamageNotify(e) => {
                self.renderer.acknowledge_damage(&self.conn, e.damage);
                BackendEvent::Damage {
                    window: e.drawable,
                    area: Rect::new(
                        e.area.x.into(),
                        e.area.y.into(),
                        e.area.width.into(),
                        e.area.height.into(),
                    ),
                }
            }
            Event::RandrScreenChangeNotify(e) => {
                self.screen_rect = Rect::new(0, 0, e.width.into(), e.height.into());
                self.renderer.resize(&self.conn, self.screen_rect);
                BackendEvent::OutputsChanged {
                    outputs: self.outputs(),
                }
            }
            Event::MappingNotify(_) => {
                match Keymap::load(&self.conn) {
                    Ok(keymap) => {
                        self.keymap = keymap;
                        self.keymap.grab_keys(&self.conn, self.root, &self.keys);
                    }
                    Err(err) => warn!("error reloading the keymap: {err:?}"),
                }
                return None;
            }
            Event::Error(err) => {
                debug!("X11 error: {err:?}");
                return None;
            }
            _ => return None,
        };
        Some(event)
    }
}

fn replace_running_manager(
    conn: &RustConnection,
    screen_num: usize,
    check_window: Window,
) -> anyhow::Result<()> {
    let selection = conn
        .intern_atom(false, format!("WM_S{screen_num}").as_bytes())?
        .reply()?
        .atom;
    let previous = conn.get_selection_owner(selection)?.reply()?.owner;
    conn.set_selection_owner(check_window, selection, CURRENT_TIME)?;
    if previous == NONE {
        return Ok(());
    }

    info!("replacing the running window manager");
    conn.change_window_attributes(
        previous,
        &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
    )?;
    conn.flush()?;

    for _ in 0..20 {
        if conn.get_window_attributes(previous)?.reply().is_err() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    warn!("previous window manager did not exit");
    Ok(())
}

fn create_cursors(conn: &RustConnection) -> anyhow::Result<Cursors> {
    let font: Font = conn.generate_id()?;
    conn.open_font(font, b"cursor")?;

    let glyph_cursor = |glyph: u16| -> anyhow::Result<Cursor> {
        let cursor = conn.generate_id()?;
        conn.create_glyph_cursor(
            cursor,
            font,
            font,
            glyph,
            glyph + 1,
            0,
            0,
            0,
            0xffff,
            0xffff,
            0xffff,
        )?;
        Ok(cursor)
    };

    let resize = [
        (ResizeEdge::TOP_LEFT, glyph::TOP_LEFT_CORNER),
        (ResizeEdge::TOP_RIGHT, glyph::TOP_RIGHT_CORNER),
        (ResizeEdge::BOTTOM_LEFT, glyph::BOTTOM_LEFT_CORNER),
        (ResizeEdge::BOTTOM_RIGHT, glyph::BOTTOM_RIGHT_CORNER),
        (ResizeEdge::TOP, glyph::TOP_SIDE),
        (ResizeEdge::BOTTOM, glyph::BOTTOM_SIDE),
        (ResizeEdge::LEFT, glyph::LEFT_SIDE),
        (ResizeEdge::RIGHT, glyph::RIGHT_SIDE),
    ]
    .into_iter()
    .map(|(edges, glyph)| Ok((edges.bits(), glyph_cursor(glyph)?)))
    .collect::<anyhow::Result<HashMap<_, _>>>()?;

    let cursors = Cursors {
        default: glyph_cursor(glyph::LEFT_PTR)?,
        moving: glyph_cursor(glyph::FLEUR)?,
        resize,
        split_h: glyph_cursor(glyph::SB_H_DOUBLE_ARROW)?,
        split_v: glyph_cursor(glyph::SB_V_DOUBLE_ARROW)?,
    };
    conn.close_font(font)?;
    Ok(cursors)
}

impl WindowSystem for X11Backend {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_rect(&self) -> Rect {
        self.screen_rect
    }

    fn create_frame(&mut self, rect: Rect, client: Window) -> anyhow::Result<Window> {
        let attrs = self.conn.get_window_attributes(client)?.reply()?;
        let geometry = self.conn.get_geometry(client)?.reply()?;

        let aux = CreateWindowAux::new()
            .background_pixmap(NONE)
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY);
        let frame = self.create_window(rect, geometry.depth, attrs.visual, aux)?;

        for button in [ButtonIndex::M1, ButtonIndex::M3] {
            self.conn.grab_button(
                false,
                frame,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::SYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                button,
                ModMask::ANY,
            )?;
        }
        self.conn.change_save_set(SetMode::INSERT, client)?;
        self.conn.change_window_attributes(
            client,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY),
        )?;
        Ok(frame)
    }

    fn create_overlay_window(&mut self, rect: Rect) -> anyhow::Result<Window> {
        let (depth, visual) = self.renderer.argb_visual().unwrap_or((self.root_depth, self.root_visual));
        let aux = CreateWindowAux::new()
            .background_pixmap(NONE)
            .override_redirect(1);
        self.create_window(rect, depth, visual, aux)
    }

    fn create_background(&mut self, rect: Rect) -> anyhow::Result<Window> {
        let aux = CreateWindowAux::new()
            .background_pixmap(NONE)
            .override_redirect(1)
            .event_mask(EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::EXPOSURE);
        self.create_window(rect, self.root_depth, self.root_visual, aux)
    }

    fn destroy_window(&mut self, window: Window) {
        self.own.remove(&window);
        log_err(self.conn.destroy_window(window), "destroying a window");
    }

    fn map(&mut self, window: Window) {
        log_err(self.conn.map_window(window), "mapping a window");
    }

    fn unmap(&mut self, window: Window) {
        log_err(self.conn.unmap_window(window), "unmapping a window");
    }

    fn reparent(&mut self, window: Window, parent: Window, pos: Point) {
        log_err(
            self.conn
                .reparent_window(window, parent, clamp_i16(pos.x), clamp_i16(pos.y)),
            "reparenting a window",
        );
    }

    fn configure(&mut self, window: Window, rect: Rect) {
        let aux = ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(u32::from(clamp_u16(rect.w)))
            .height(u32::from(clamp_u16(rect.h)))
            .border_width(0);
        log_err(self.conn.configure_window(window, &aux), "configuring a window");
    }

    fn send_configure_notify(&mut self, window: Window, rect: Rect) {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: clamp_i16(rect.x),
            y: clamp_i16(rect.y),
            width: clamp_u16(rect.w),
            height: clamp_u16(rect.h),
            border_width: 0,
            override_redirect: false,
        };
        log_err(
            self.conn
                .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event),
            "sending a synthetic configure",
        );
    }

    fn restack(&mut self, windows: &[Window]) {
        let mut below = None;
        for &window in windows {
            let aux = match below {
                None => ConfigureWindowAux::new().stack_mode(StackMode::BELOW),
                Some(sibling) => ConfigureWindowAux::new()
                    .sibling(sibling)
                    .stack_mode(StackMode::ABOVE),
            };
            log_err(self.conn.configure_window(window, &aux), "restacking");
            below = Some(window);
        }
    }

    fn set_wm_state(&mut self, window: Window, state: WmState) {
        let value = match state {
            WmState::Withdrawn => 0,
            WmState::Normal => 1,
            WmState::Iconic => 3,
        };
        let atom = self.atoms.WM_STATE;
        log_err(
            self.conn
                .change_property32(PropMode::REPLACE, window, atom, atom, &[value, NONE]),
            "setting WM_STATE",
        );
    }

    fn set_fullscreen_state(&mut self, window: Window, fullscreen: bool) {
        let a = self.atoms;
        let mut state: Vec<u32> = self
            .conn
            .get_property(false, window, a._NET_WM_STATE, AtomEnum::ATOM, 0, 1024)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(Iterator::collect))
            .unwrap_or_default();
        state.retain(|&atom| atom != a._NET_WM_STATE_FULLSCREEN);
        if fullscreen {
            state.push(a._NET_WM_STATE_FULLSCREEN);
        }
        log_err(
            self.conn.change_property32(
                PropMode::REPLACE,
                window,
                a._NET_WM_STATE,
                AtomEnum::ATOM,
                &state,
            ),
            "setting _NET_WM_STATE",
        );
    }

    fn set_input_focus(&mut self, window: Option<Window>, take_focus: bool, time: Timestamp) {
        let target = window.unwrap_or(self.root);
        log_err(
            self.conn
                .set_input_focus(InputFocus::POINTER_ROOT, target, time),
            "setting input focus",
        );
        if let (Some(window), true) = (window, take_focus) {
            self.send_protocol(window, self.atoms.WM_TAKE_FOCUS, time);
        }
    }

    fn set_active_window(&mut self, window: Option<Window>) {
        log_err(
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root,
                self.atoms._NET_ACTIVE_WINDOW,
                AtomEnum::WINDOW,
                &[window.unwrap_or(NONE)],
            ),
            "setting _NET_ACTIVE_WINDOW",
        );
    }

    fn set_client_list(&mut self, windows: &[Window]) {
        log_err(
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root,
                self.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                windows,
            ),
            "setting _NET_CLIENT_LIST",
        );
    }

    fn close(&mut self, window: Window, delete: bool) {
        if delete {
            self.send_protocol(window, self.atoms.WM_DELETE_WINDOW, CURRENT_TIME);
        } else {
            log_err(self.conn.kill_client(window), "killing a client");
        }
    }

    fn grab_pointer(&mut self, window: Window, cursor: CursorKind) -> bool {
        let cursor = self.cursors.get(cursor);
        let reply = self
            .conn
            .grab_pointer(
                false,
                window,
                grab_events(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                cursor,
                CURRENT_TIME,
            )
            .ok()
            .and_then(|cookie| cookie.reply().ok());
        matches!(reply, Some(reply) if reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self) {
        log_err(self.conn.ungrab_pointer(CURRENT_TIME), "ungrabbing the pointer");
    }

    fn grab_keyboard(&mut self) -> bool {
        let reply = self
            .conn
            .grab_keyboard(false, self.root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)
            .ok()
            .and_then(|cookie| cookie.reply().ok());
        matches!(reply, Some(reply) if reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&mut self) {
        log_err(self.conn.ungrab_keyboard(CURRENT_TIME), "ungrabbing the keyboard");
    }

    fn allow_events(&mut self, replay: bool, time: Timestamp) {
        let mode = if replay {
            Allow::REPLAY_POINTER
        } else {
            Allow::ASYNC_POINTER
        };
        log_err(self.conn.allow_events(mode, time), "allowing events");
    }

    fn grab_keys(&mut self, keys: &[(u32, u16)]) {
        self.keys = keys.to_vec();
        self.keymap.grab_keys(&self.conn, self.root, keys);
    }

    fn window_exists(&mut self, window: Window) -> bool {
        if self.conn.grab_server().is_err() {
            return false;
        }
        let exists = self
            .conn
            .get_window_attributes(window)
            .ok()
            .is_some_and(|cookie| cookie.reply().is_ok());
        log_err(self.conn.ungrab_server(), "ungrabbing the server");
        exists
    }

    fn put_image(&mut self, window: Window, width: i32, height: i32, data: &[u8]) {
        let Some(&depth) = self.own.get(&window) else {
            warn!("refusing to draw into foreign window {window:#x}");
            return;
        };
        let Some(gc) = self.gc_for_depth(window, depth) else {
            return;
        };
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return;
        };
        let stride = usize::from(w) * 4;
        if stride == 0 || data.len() < stride * usize::from(h) {
            warn!("short image data for {window:#x}");
            return;
        }

        // Split into bands that fit in a single request.
        let max_bytes = self.conn.maximum_request_bytes().saturating_sub(64);
        let rows_per_band = (max_bytes / stride).clamp(1, usize::from(h));
        for (band, chunk) in data[..stride * usize::from(h)]
            .chunks(stride * rows_per_band)
            .enumerate()
        {
            let rows = (chunk.len() / stride) as u16;
            let y = (band * rows_per_band) as i16;
            log_err(
                self.conn.put_image(
                    ImageFormat::Z_PIXMAP,
                    window,
                    gc,
                    w,
                    rows,
                    0,
                    y,
                    0,
                    depth,
                    chunk,
                ),
                "uploading an image",
            );
        }
    }

    fn flush(&mut self) {
        log_err(self.conn.flush(), "flushing the connection");
    }
}

impl Backend for X11Backend {
    fn next_event(&mut self) -> Option<BackendEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        loop {
            match self.conn.poll_for_event() {
                Ok(Some(event)) => {
                    if let Some(event) = self.translate(event) {
                        return Some(event);
                    }
                }
                Ok(None) => return None,
                Err(err) => {
                    error!("error reading X events: {err:?}");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wm_state_actions() {
        assert_eq!(state_action(0), Some(StateAction::Remove));
        assert_eq!(state_action(1), Some(StateAction::Add));
        assert_eq!(state_action(2), Some(StateAction::Toggle));
        assert_eq!(state_action(3), None);
        assert_eq!(state_action(u32::MAX), None);
    }
}
