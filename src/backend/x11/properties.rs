use x11rb::properties::{
    WmClass as XWmClass, WmHints as XWmHints, WmHintsState, WmSizeHints, WmSizeHintsSpecification,
};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, GetPropertyReply, MapState};

use super::X11Backend;
use crate::backend::{PropertyStore, Window};
use crate::client::{
    ClientProperties, Icon, NetWmState, PropertyKind, SizeHints, Strut, WindowType, WmClass,
    WmHints, WmProtocols, WmState,
};
use crate::region::Rect;

const ALL_PROPERTIES: [PropertyKind; 11] = [
    PropertyKind::Title,
    PropertyKind::Class,
    PropertyKind::NormalHints,
    PropertyKind::Hints,
    PropertyKind::Protocols,
    PropertyKind::TransientFor,
    PropertyKind::WindowType,
    PropertyKind::State,
    PropertyKind::Strut,
    PropertyKind::Icon,
    PropertyKind::OpaqueRegion,
];

impl X11Backend {
    fn property(&self, window: Window, property: Atom) -> Option<GetPropertyReply> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX / 4)
            .ok()?
            .reply()
            .ok()?;
        (reply.type_ != u32::from(AtomEnum::NONE)).then_some(reply)
    }

    fn property32(&self, window: Window, property: Atom) -> Option<Vec<u32>> {
        self.property(window, property)
            .and_then(|reply| reply.value32().map(Iterator::collect))
    }

    fn property_string(&self, window: Window, property: Atom) -> Option<String> {
        let reply = self.property(window, property)?;
        let bytes = reply.value8()?.collect::<Vec<u8>>();
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn window_type(&self, atom: Atom) -> Option<WindowType> {
        let a = &self.atoms;
        let ty = match atom {
            x if x == a._NET_WM_WINDOW_TYPE_DESKTOP => WindowType::Desktop,
            x if x == a._NET_WM_WINDOW_TYPE_DOCK => WindowType::Dock,
            x if x == a._NET_WM_WINDOW_TYPE_TOOLBAR => WindowType::Toolbar,
            x if x == a._NET_WM_WINDOW_TYPE_MENU => WindowType::Menu,
            x if x == a._NET_WM_WINDOW_TYPE_UTILITY => WindowType::Utility,
            x if x == a._NET_WM_WINDOW_TYPE_SPLASH => WindowType::Splash,
            x if x == a._NET_WM_WINDOW_TYPE_DIALOG => WindowType::Dialog,
            x if x == a._NET_WM_WINDOW_TYPE_DROPDOWN_MENU => WindowType::DropdownMenu,
            x if x == a._NET_WM_WINDOW_TYPE_POPUP_MENU => WindowType::PopupMenu,
            x if x == a._NET_WM_WINDOW_TYPE_TOOLTIP => WindowType::Tooltip,
            x if x == a._NET_WM_WINDOW_TYPE_NOTIFICATION => WindowType::Notification,
            x if x == a._NET_WM_WINDOW_TYPE_COMBO => WindowType::Combo,
            x if x == a._NET_WM_WINDOW_TYPE_DND => WindowType::Dnd,
            x if x == a._NET_WM_WINDOW_TYPE_NORMAL => WindowType::Normal,
            _ => return None,
        };
        Some(ty)
    }

    pub(super) fn net_wm_state_flag(&self, atom: Atom) -> Option<NetWmState> {
        let a = &self.atoms;
        let flag = match atom {
            x if x == a._NET_WM_STATE_MODAL => NetWmState::MODAL,
            x if x == a._NET_WM_STATE_STICKY => NetWmState::STICKY,
            x if x == a._NET_WM_STATE_MAXIMIZED_VERT => NetWmState::MAXIMIZED_VERT,
            x if x == a._NET_WM_STATE_MAXIMIZED_HORZ => NetWmState::MAXIMIZED_HORZ,
            x if x == a._NET_WM_STATE_SHADED => NetWmState::SHADED,
            x if x == a._NET_WM_STATE_SKIP_TASKBAR => NetWmState::SKIP_TASKBAR,
            x if x == a._NET_WM_STATE_SKIP_PAGER => NetWmState::SKIP_PAGER,
            x if x == a._NET_WM_STATE_HIDDEN => NetWmState::HIDDEN,
            x if x == a._NET_WM_STATE_FULLSCREEN => NetWmState::FULLSCREEN,
            x if x == a._NET_WM_STATE_ABOVE => NetWmState::ABOVE,
            x if x == a._NET_WM_STATE_BELOW => NetWmState::BELOW,
            x if x == a._NET_WM_STATE_DEMANDS_ATTENTION => NetWmState::DEMANDS_ATTENTION,
            x if x == a._NET_WM_STATE_FOCUSED => NetWmState::FOCUSED,
            _ => return None,
        };
        Some(flag)
    }

    /// Maps a changed property atom to the cache entry it invalidates.
    pub(super) fn property_kind(&self, atom: Atom) -> Option<PropertyKind> {
        let a = &self.atoms;
        let kind = match atom {
            x if x == a.WM_NAME || x == a._NET_WM_NAME => PropertyKind::Title,
            x if x == a.WM_CLASS => PropertyKind::Class,
            x if x == a.WM_NORMAL_HINTS => PropertyKind::NormalHints,
            x if x == a.WM_HINTS => PropertyKind::Hints,
            x if x == a.WM_PROTOCOLS => PropertyKind::Protocols,
            x if x == a.WM_TRANSIENT_FOR => PropertyKind::TransientFor,
            x if x == a._NET_WM_WINDOW_TYPE => PropertyKind::WindowType,
            x if x == a._NET_WM_STATE => PropertyKind::State,
            x if x == a._NET_WM_STRUT || x == a._NET_WM_STRUT_PARTIAL => PropertyKind::Strut,
            x if x == a._NET_WM_ICON => PropertyKind::Icon,
            x if x == a._NET_WM_OPAQUE_REGION => PropertyKind::OpaqueRegion,
            _ => return None,
        };
        Some(kind)
    }

    fn read_normal_hints(&self, window: Window) -> Option<SizeHints> {
        let hints = WmSizeHints::get_normal_hints(&self.conn, window)
            .ok()?
            .reply()
            .ok()??;

        Some(SizeHints {
            user_position: matches!(
                hints.position,
                Some((WmSizeHintsSpecification::UserSpecified, _, _))
            ),
            program_position: matches!(
                hints.position,
                Some((WmSizeHintsSpecification::ProgramSpecified, _, _))
            ),
            min: hints.min_size,
            max: hints.max_size,
            base: hints.base_size,
            inc: hints.size_increment,
            min_aspect: hints.aspect.map(|(min, _)| (min.numerator, min.denominator)),
            max_aspect: hints.aspect.map(|(_, max)| (max.numerator, max.denominator)),
        })
    }

    fn read_hints(&self, window: Window) -> Option<WmHints> {
        let hints: XWmHints = XWmHints::get(&self.conn, window).ok()?.reply().ok()??;
        Some(WmHints {
            input: hints.input,
            initial_state: hints.initial_state.map(|state| match state {
                WmHintsState::Iconic => WmState::Iconic,
                WmHintsState::Normal => WmState::Normal,
            }),
            urgent: hints.urgent,
        })
    }

    fn read_class(&self, window: Window) -> Option<WmClass> {
        let class: XWmClass = XWmClass::get(&self.conn, window).ok()?.reply().ok()??;
        Some(WmClass {
            instance: String::from_utf8_lossy(class.instance()).into_owned(),
            class: String::from_utf8_lossy(class.class()).into_owned(),
        })
    }

    fn read_strut(&self, window: Window) -> Option<Strut> {
        let c = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);

        if let Some(v) = self.property32(window, self.atoms._NET_WM_STRUT_PARTIAL) {
            if v.len() >= 12 {
                return Some(Strut {
                    left: c(v[0]),
                    right: c(v[1]),
                    top: c(v[2]),
                    bottom: c(v[3]),
                    left_start_y: c(v[4]),
                    left_end_y: c(v[5]),
                    right_start_y: c(v[6]),
                    right_end_y: c(v[7]),
                    top_start_x: c(v[8]),
                    top_end_x: c(v[9]),
                    bottom_start_x: c(v[10]),
                    bottom_end_x: c(v[11]),
                });
            }
        }

        let v = self.property32(window, self.atoms._NET_WM_STRUT)?;
        (v.len() >= 4).then(|| Strut::full(c(v[0]), c(v[1]), c(v[2]), c(v[3]), self.screen_rect))
    }

    fn read_icon(&self, window: Window) -> Option<Icon> {
        let data = self.property32(window, self.atoms._NET_WM_ICON)?;

        // Entries are width, height, then pixels; keep the largest.
        let mut best: Option<Icon> = None;
        let mut rest = &data[..];
        while rest.len() >= 2 {
            let (width, height) = (rest[0], rest[1]);
            let len = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
            let pixels = rest.get(2..2 + len)?;
            let area = |w: u32, h: u32| u64::from(w) * u64::from(h);
            if best.as_ref().map_or(true, |b| area(b.width, b.height) < area(width, height)) {
                best = Some(Icon {
                    width,
                    height,
                    pixels: pixels.to_vec(),
                });
            }
            rest = &rest[2 + len..];
        }
        best
    }
}

impl PropertyStore for X11Backend {
    fn read_properties(&mut self, window: Window) -> Option<ClientProperties> {
        let attrs = self.conn.get_window_attributes(window).ok()?.reply().ok()?;
        let geometry = self.conn.get_geometry(window).ok()?.reply().ok()?;

        let mut props = ClientProperties {
            geometry: Some(Rect::new(
                geometry.x.into(),
                geometry.y.into(),
                geometry.width.into(),
                geometry.height.into(),
            )),
            depth: geometry.depth,
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
            ..ClientProperties::default()
        };
        for kind in ALL_PROPERTIES {
            self.refresh_property(window, &mut props, kind);
        }
        Some(props)
    }

    fn refresh_property(&mut self, window: Window, props: &mut ClientProperties, kind: PropertyKind) {
        let atoms = self.atoms;
        match kind {
            PropertyKind::Title => {
                props.wm_name = self.property_string(window, atoms.WM_NAME);
                props.net_wm_name = self.property_string(window, atoms._NET_WM_NAME);
            }
            PropertyKind::Class => props.wm_class = self.read_class(window),
            PropertyKind::NormalHints => props.normal_hints = self.read_normal_hints(window),
            PropertyKind::Hints => props.wm_hints = self.read_hints(window),
            PropertyKind::Protocols => {
                props.protocols = self.property32(window, atoms.WM_PROTOCOLS).map(|list| {
                    WmProtocols {
                        delete_window: list.contains(&atoms.WM_DELETE_WINDOW),
                        take_focus: list.contains(&atoms.WM_TAKE_FOCUS),
                    }
                });
            }
            PropertyKind::TransientFor => {
                props.transient_for = self
                    .property32(window, atoms.WM_TRANSIENT_FOR)
                    .and_then(|v| v.first().copied())
                    .filter(|&w| w != x11rb::NONE && w != window);
            }
            PropertyKind::WindowType => {
                props.window_type = self
                    .property32(window, atoms._NET_WM_WINDOW_TYPE)
                    .map(|list| list.into_iter().filter_map(|a| self.window_type(a)).collect());
            }
            PropertyKind::State => {
                props.net_wm_state = self.property32(window, atoms._NET_WM_STATE).map(|list| {
                    list.into_iter()
                        .filter_map(|a| self.net_wm_state_flag(a))
                        .fold(NetWmState::empty(), |acc, flag| acc | flag)
                });
            }
            PropertyKind::Strut => props.strut = self.read_strut(window),
            PropertyKind::Icon => props.icon = self.read_icon(window),
            PropertyKind::OpaqueRegion => {
                props.opaque_region = self.property32(window, atoms._NET_WM_OPAQUE_REGION).map(|v| {
                    v.chunks_exact(4)
                        .map(|r| {
                            let c = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
                            Rect::new(c(r[0]), c(r[1]), c(r[2]), c(r[3]))
                        })
                        .collect()
                });
            }
        }
    }
}
