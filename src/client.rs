//! Managed client windows and their cached properties.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

use crate::backend::Window;
use crate::region::{Rect, Region};
use crate::tree::{NodeId, Tree};

/// ICCCM `WM_STATE`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    #[default]
    Withdrawn,
    Normal,
    Iconic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
    Normal,
}

bitflags! {
    /// `_NET_WM_STATE` atoms the window manager cares about.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct NetWmState: u16 {
        const MODAL = 1;
        const STICKY = 1 << 1;
        const MAXIMIZED_VERT = 1 << 2;
        const MAXIMIZED_HORZ = 1 << 3;
        const SHADED = 1 << 4;
        const SKIP_TASKBAR = 1 << 5;
        const SKIP_PAGER = 1 << 6;
        const HIDDEN = 1 << 7;
        const FULLSCREEN = 1 << 8;
        const ABOVE = 1 << 9;
        const BELOW = 1 << 10;
        const DEMANDS_ATTENTION = 1 << 11;
        const FOCUSED = 1 << 12;
    }
}

/// Which cached property a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    Class,
    NormalHints,
    Hints,
    Protocols,
    TransientFor,
    WindowType,
    State,
    Strut,
    Icon,
    OpaqueRegion,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WmClass {
    pub instance: String,
    pub class: String,
}

/// `WM_NORMAL_HINTS`, with absent fields left as `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub user_position: bool,
    pub program_position: bool,
    pub min: Option<(i32, i32)>,
    pub max: Option<(i32, i32)>,
    pub base: Option<(i32, i32)>,
    pub inc: Option<(i32, i32)>,
    pub min_aspect: Option<(i32, i32)>,
    pub max_aspect: Option<(i32, i32)>,
}

impl SizeHints {
    /// Applies min/max bounds and resize increments to a requested client size.
    pub fn constrain(&self, w: i32, h: i32) -> (i32, i32) {
        let (mut w, mut h) = (w.max(1), h.max(1));

        if let Some((min_w, min_h)) = self.min {
            w = w.max(min_w);
            h = h.max(min_h);
        }
        if let Some((max_w, max_h)) = self.max {
            if max_w > 0 {
                w = w.min(max_w);
            }
            if max_h > 0 {
                h = h.min(max_h);
            }
        }

        if let Some((inc_w, inc_h)) = self.inc {
            let (base_w, base_h) = self.base.or(self.min).unwrap_or((0, 0));
            let (min_w, min_h) = self.min.unwrap_or((0, 0));
            w = snap_to_increment(w, base_w, inc_w, min_w);
            h = snap_to_increment(h, base_h, inc_h, min_h);
        }

        (w.max(1), h.max(1))
    }

    pub fn min_size(&self) -> (i32, i32) {
        self.min.or(self.base).unwrap_or((1, 1))
    }

    /// Whether equal min and max sizes pin the client to one size.
    pub fn is_fixed_size(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min == max && min.0 > 0)
    }
}

fn snap_to_increment(value: i32, base: i32, inc: i32, min: i32) -> i32 {
    if inc <= 1 || value <= base {
        return value;
    }
    let snapped = base + (value - base) / inc * inc;
    if snapped < min {
        snapped + inc
    } else {
        snapped
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WmHints {
    pub input: Option<bool>,
    pub initial_state: Option<WmState>,
    pub urgent: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WmProtocols {
    pub delete_window: bool,
    pub take_focus: bool,
}

/// `_NET_WM_STRUT_PARTIAL`, or `_NET_WM_STRUT` with full-length ranges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Strut {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
    pub left_start_y: i32,
    pub left_end_y: i32,
    pub right_start_y: i32,
    pub right_end_y: i32,
    pub top_start_x: i32,
    pub top_end_x: i32,
    pub bottom_start_x: i32,
    pub bottom_end_x: i32,
}

impl Strut {
    /// Legacy strut reserving whole screen edges.
    pub fn full(left: i32, right: i32, top: i32, bottom: i32, screen: Rect) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            left_start_y: 0,
            left_end_y: screen.h - 1,
            right_start_y: 0,
            right_end_y: screen.h - 1,
            top_start_x: 0,
            top_end_x: screen.w - 1,
            bottom_start_x: 0,
            bottom_end_x: screen.w - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left <= 0 && self.right <= 0 && self.top <= 0 && self.bottom <= 0
    }
}

/// `_NET_WM_ICON` entry in ARGB.
#[derive(Clone, PartialEq, Eq)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl fmt::Debug for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Icon")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Cached state of the X properties of one client.
#[derive(Debug, Default, Clone)]
pub struct ClientProperties {
    pub wm_name: Option<String>,
    pub net_wm_name: Option<String>,
    pub wm_class: Option<WmClass>,
    pub normal_hints: Option<SizeHints>,
    pub wm_hints: Option<WmHints>,
    pub protocols: Option<WmProtocols>,
    pub transient_for: Option<Window>,
    pub window_type: Option<Vec<WindowType>>,
    pub net_wm_state: Option<NetWmState>,
    pub strut: Option<Strut>,
    pub icon: Option<Icon>,
    pub opaque_region: Option<Vec<Rect>>,
    pub geometry: Option<Rect>,
    pub depth: u8,
    pub override_redirect: bool,
    /// Whether the window was already mapped when it was read.
    pub viewable: bool,
}

/// Typed key into [`ClientProperties`].
pub trait Property {
    type Value;

    fn get(props: &ClientProperties) -> Option<&Self::Value>;
}

macro_rules! properties {
    ($($(#[$meta:meta])* $name:ident => $field:ident: $ty:ty;)*) => {
        $(
            $(#[$meta])*
            pub struct $name;

            impl Property for $name {
                type Value = $ty;

                fn get(props: &ClientProperties) -> Option<&$ty> {
                    props.$field.as_ref()
                }
            }
        )*
    };
}

properties! {
    WmName => wm_name: String;
    NetWmName => net_wm_name: String;
    WmClassProperty => wm_class: WmClass;
    WmNormalHints => normal_hints: SizeHints;
    WmHintsProperty => wm_hints: WmHints;
    WmProtocolsProperty => protocols: WmProtocols;
    WmTransientFor => transient_for: Window;
    NetWmWindowType => window_type: Vec<WindowType>;
    NetWmStateProperty => net_wm_state: NetWmState;
    /// Either `_NET_WM_STRUT_PARTIAL` or the legacy `_NET_WM_STRUT`.
    NetWmStrut => strut: Strut;
    NetWmIcon => icon: Icon;
    NetWmOpaqueRegion => opaque_region: Vec<Rect>;
    Geometry => geometry: Rect;
}

impl ClientProperties {
    pub fn get<P: Property>(&self) -> Option<&P::Value> {
        P::get(self)
    }

    /// Title to show for the client, falling back to `#<window id>`.
    pub fn title(&self, window: Window) -> String {
        let title = self
            .get::<NetWmName>()
            .or_else(|| self.get::<WmName>())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        match title {
            Some(title) => title.to_owned(),
            None => format!("#{window}"),
        }
    }

    pub fn has_type(&self, ty: WindowType) -> bool {
        self.get::<NetWmWindowType>()
            .is_some_and(|types| types.contains(&ty))
    }

    pub fn has_state(&self, state: NetWmState) -> bool {
        self.get::<NetWmStateProperty>()
            .is_some_and(|s| s.contains(state))
    }

    pub fn is_dock(&self) -> bool {
        self.has_type(WindowType::Dock)
    }

    /// Tooltips, menus and notifications go to the popup layers.
    pub fn is_popup(&self) -> bool {
        [
            WindowType::Tooltip,
            WindowType::Notification,
            WindowType::DropdownMenu,
            WindowType::PopupMenu,
            WindowType::Menu,
            WindowType::Combo,
            WindowType::Dnd,
        ]
        .into_iter()
        .any(|ty| self.has_type(ty))
    }

    pub fn wants_floating(&self) -> bool {
        self.transient_for.is_some()
            || self.has_state(NetWmState::MODAL)
            || [
                WindowType::Dialog,
                WindowType::Utility,
                WindowType::Splash,
                WindowType::Toolbar,
            ]
            .into_iter()
            .any(|ty| self.has_type(ty))
            || self.normal_hints.is_some_and(|h| h.is_fixed_size())
    }

    pub fn wants_fullscreen(&self) -> bool {
        self.has_state(NetWmState::FULLSCREEN)
    }

    pub fn is_urgent(&self) -> bool {
        self.wm_hints.is_some_and(|h| h.urgent) || self.has_state(NetWmState::DEMANDS_ATTENTION)
    }

    /// ICCCM input model: the window takes focus unless it explicitly refuses.
    pub fn accepts_input(&self) -> bool {
        self.wm_hints.and_then(|h| h.input).unwrap_or(true)
    }

    pub fn takes_focus(&self) -> bool {
        self.protocols.is_some_and(|p| p.take_focus)
    }

    pub fn supports_delete(&self) -> bool {
        self.protocols.is_some_and(|p| p.delete_window)
    }

    pub fn has_alpha(&self) -> bool {
        self.depth == 32
    }

    pub fn size_hints(&self) -> SizeHints {
        self.normal_hints.unwrap_or_default()
    }

    /// Opaque area in client-local coordinates, when the client declared one.
    pub fn opaque_region(&self) -> Option<Region> {
        self.get::<NetWmOpaqueRegion>()
            .map(|rects| Region::from_rects(rects.iter().copied()))
    }
}

#[derive(Debug)]
pub enum AcquireError {
    /// The client is bound to another live view.
    OwnedBy(NodeId),
    UnknownClient(Window),
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::OwnedBy(node) => write!(f, "client is already owned by {node:?}"),
            AcquireError::UnknownClient(window) => write!(f, "unknown client {window:#x}"),
        }
    }
}

impl std::error::Error for AcquireError {}

#[derive(Debug)]
pub struct Client {
    pub window: Window,
    pub props: ClientProperties,
    pub wm_state: WmState,
    /// Whether the client window itself is mapped.
    pub mapped: bool,
    /// Unmap notifications caused by the manager that must not withdraw the client.
    pub ignore_unmaps: u32,
    owner: Option<NodeId>,
}

impl Client {
    pub fn new(window: Window, props: ClientProperties) -> Self {
        let mapped = props.viewable;
        Self {
            window,
            props,
            wm_state: WmState::Withdrawn,
            mapped,
            ignore_unmaps: 0,
            owner: None,
        }
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn title(&self) -> String {
        self.props.title(self.window)
    }
}

/// Registry of known clients; enforces that a client is bound to at most one view.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<Window, Client>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: Client) {
        self.clients.insert(client.window, client);
    }

    pub fn remove(&mut self, window: Window) -> Option<Client> {
        self.clients.remove(&window)
    }

    pub fn get(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn get_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    pub fn contains(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Live view owning `window`.
    pub fn owner(&self, window: Window, tree: &Tree) -> Option<NodeId> {
        self.get(window)
            .and_then(|c| c.owner)
            .filter(|node| tree.contains(*node))
    }

    /// Binds `window` to `view`. Acquiring twice for the same view is a no-op; a client owned by
    /// another live view is never taken over.
    pub fn acquire(&mut self, window: Window, view: NodeId, tree: &Tree) -> Result<(), AcquireError> {
        let client = self
            .clients
            .get_mut(&window)
            .ok_or(AcquireError::UnknownClient(window))?;

        match client.owner {
            Some(owner) if owner == view => Ok(()),
            Some(owner) if tree.contains(owner) => Err(AcquireError::OwnedBy(owner)),
            _ => {
                client.owner = Some(view);
                Ok(())
            }
        }
    }

    /// Unbinds `window` from `view`. Does nothing if `view` is not the owner.
    pub fn release(&mut self, window: Window, view: NodeId) {
        if let Some(client) = self.clients.get_mut(&window) {
            if client.owner == Some(view) {
                client.owner = None;
            }
        }
    }
}
