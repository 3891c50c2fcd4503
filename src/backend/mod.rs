//! Contracts between the window manager core and the display server.
//!
//! The core never talks X11 directly. It issues the abstract requests below and consumes
//! [`BackendEvent`]s; [`x11`] implements them over an `x11rb` connection and the test suite
//! implements them with a recorder.

use bitflags::bitflags;
use page_config::Color;

use crate::client::{ClientProperties, PropertyKind, WmState};
use crate::layout::split::SplitType;
use crate::region::{Point, Rect, Region};
use crate::view::floating::ResizeEdge;

pub mod x11;

/// Server-side window id.
pub type Window = u32;
/// Server timestamp of an input event.
pub type Timestamp = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Default,
    Move,
    Resize(ResizeEdge),
    Split(SplitType),
}

bitflags! {
    /// Fields present in a client's configure request, as in the core protocol value mask.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ConfigureMask: u16 {
        const X = 1;
        const Y = 1 << 1;
        const WIDTH = 1 << 2;
        const HEIGHT = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING = 1 << 5;
        const STACK_MODE = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub window: Window,
    pub root: Point,
    /// Position relative to `window`.
    pub pos: Point,
    pub button: u8,
    pub modifiers: u16,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub root: Point,
    pub modifiers: u16,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keysym: u32,
    pub modifiers: u16,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

/// Requests clients send to the root window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
    Fullscreen(StateAction),
    Activate,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    MapRequest {
        window: Window,
    },
    MapNotify {
        window: Window,
        override_redirect: bool,
    },
    UnmapNotify {
        window: Window,
    },
    DestroyNotify {
        window: Window,
    },
    ConfigureRequest {
        window: Window,
        rect: Rect,
        mask: ConfigureMask,
    },
    /// Geometry change of an unmanaged override-redirect window.
    ConfigureNotify {
        window: Window,
        rect: Rect,
    },
    PropertyNotify {
        window: Window,
        property: PropertyKind,
    },
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    Motion(MotionEvent),
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    /// Contents of `window` changed; `area` is in window coordinates.
    Damage {
        window: Window,
        area: Rect,
    },
    ClientMessage {
        window: Window,
        request: ClientRequest,
    },
    /// Output geometry changed; one rectangle per monitor.
    OutputsChanged {
        outputs: Vec<Rect>,
    },
}

/// Window management requests.
pub trait WindowSystem {
    fn root(&self) -> Window;
    fn screen_rect(&self) -> Rect;

    /// Creates an input-output frame of the client's depth to reparent the client into.
    fn create_frame(&mut self, rect: Rect, client: Window) -> anyhow::Result<Window>;
    /// Creates an override-redirect ARGB window for popups.
    fn create_overlay_window(&mut self, rect: Rect) -> anyhow::Result<Window>;
    /// Creates an opaque window covering an output, below every client.
    fn create_background(&mut self, rect: Rect) -> anyhow::Result<Window>;
    fn destroy_window(&mut self, window: Window);

    fn map(&mut self, window: Window);
    fn unmap(&mut self, window: Window);
    fn reparent(&mut self, window: Window, parent: Window, pos: Point);
    fn configure(&mut self, window: Window, rect: Rect);
    /// Tells a client its current geometry without moving it.
    fn send_configure_notify(&mut self, window: Window, rect: Rect);
    /// Restacks top-level windows, bottom to top.
    fn restack(&mut self, windows: &[Window]);

    fn set_wm_state(&mut self, window: Window, state: WmState);
    fn set_fullscreen_state(&mut self, window: Window, fullscreen: bool);
    fn set_input_focus(&mut self, window: Option<Window>, take_focus: bool, time: Timestamp);
    fn set_active_window(&mut self, window: Option<Window>);
    fn set_client_list(&mut self, windows: &[Window]);
    /// Asks the client to close through `WM_DELETE_WINDOW`, or kills it.
    fn close(&mut self, window: Window, delete: bool);

    fn grab_pointer(&mut self, window: Window, cursor: CursorKind) -> bool;
    fn ungrab_pointer(&mut self);
    fn grab_keyboard(&mut self) -> bool;
    fn ungrab_keyboard(&mut self);
    /// Thaws a synchronous grab, replaying the frozen event to the client when asked.
    fn allow_events(&mut self, replay: bool, time: Timestamp);
    /// Binds the configured keys on the root window.
    fn grab_keys(&mut self, keys: &[(u32, u16)]);

    /// Whether `window` still exists, checked under a short server grab.
    fn window_exists(&mut self, window: Window) -> bool;
    /// Uploads premultiplied ARGB32 pixels to the whole of `window`.
    fn put_image(&mut self, window: Window, width: i32, height: i32, data: &[u8]);

    fn flush(&mut self);
}

/// Typed access to client window properties.
pub trait PropertyStore {
    /// Reads every cached property of a window; `None` when the window is gone.
    fn read_properties(&mut self, window: Window) -> Option<ClientProperties>;
    fn refresh_property(&mut self, window: Window, props: &mut ClientProperties, kind: PropertyKind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Whatever is shown on screen.
    Front,
    BackBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Replace destination pixels.
    Source,
    /// Alpha-blend on top of destination pixels.
    Over,
}

/// Raster operations used by the compositor.
pub trait RenderBackend {
    /// Starts tracking the contents of a redirected window.
    fn create_surface(&mut self, window: Window) -> anyhow::Result<()>;
    /// Re-acquires window contents after a resize.
    fn refresh_surface(&mut self, window: Window);
    fn destroy_surface(&mut self, window: Window);

    /// Draws `window`'s contents with its top-left at `origin`, clipped to `clip`.
    fn paint(
        &mut self,
        target: Target,
        window: Window,
        origin: Point,
        clip: &Region,
        op: Operator,
        opacity: f64,
    );
    fn fill(&mut self, target: Target, clip: &Region, color: Color);
    /// Copies the back buffer to the front for `clip`.
    fn copy_back_buffer(&mut self, clip: &Region);
    fn present(&mut self);

    fn set_compositing(&mut self, enabled: bool) -> anyhow::Result<()>;
}

pub trait Backend: WindowSystem + PropertyStore + RenderBackend {
    /// Next queued event, without blocking.
    fn next_event(&mut self) -> Option<BackendEvent>;
}
