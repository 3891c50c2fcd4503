//! Views bind one client window to a place in the scene tree.
//!
//! The variant decides decorations, reparenting and layer. Changing variant never mutates a
//! view in place: the old view is torn down and a new one is built from the same client.

use std::time::{Duration, Instant};

use crate::backend::Window;
use crate::client::Client;
use crate::region::{Point, Rect, Region};
use crate::tree::NodeId;
use crate::workspace::LayerKind;

pub mod floating;

/// Where a fullscreen view goes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revert {
    Notebook { notebook: NodeId, index: usize },
    Floating(Rect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Notebook {
        notebook: NodeId,
    },
    Floating,
    Fullscreen {
        viewport: NodeId,
        revert: Revert,
    },
    Dock,
    Popup {
        notification: bool,
    },
}

impl ViewKind {
    pub fn label(&self) -> &'static str {
        match self {
            ViewKind::Notebook { .. } => "notebook",
            ViewKind::Floating => "floating",
            ViewKind::Fullscreen { .. } => "fullscreen",
            ViewKind::Dock => "dock",
            ViewKind::Popup { .. } => "popup",
        }
    }

    pub fn layer(&self) -> LayerKind {
        match self {
            ViewKind::Notebook { .. } => LayerKind::Tiling,
            ViewKind::Floating => LayerKind::Floating,
            ViewKind::Fullscreen { .. } => LayerKind::Fullscreen,
            ViewKind::Dock => LayerKind::Dock,
            ViewKind::Popup { notification: true } => LayerKind::Notifications,
            ViewKind::Popup { notification: false } => LayerKind::Tooltips,
        }
    }

    pub fn is_focusable(&self) -> bool {
        matches!(
            self,
            ViewKind::Notebook { .. } | ViewKind::Floating | ViewKind::Fullscreen { .. }
        )
    }

    /// Whether the client lives inside a frame window owned by the view.
    pub fn is_reparented(&self) -> bool {
        self.is_focusable()
    }
}

/// Linear opacity transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    start: Instant,
    duration: Duration,
    from: f64,
    to: f64,
}

impl Fade {
    pub fn new(start: Instant, duration: Duration, from: f64, to: f64) -> Self {
        Self {
            start,
            duration,
            from,
            to,
        }
    }

    pub fn value(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = now.saturating_duration_since(self.start).as_secs_f64()
            / self.duration.as_secs_f64();
        let t = t.clamp(0., 1.);
        self.from + (self.to - self.from) * t
    }

    pub fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.duration
    }

    pub fn target(&self) -> f64 {
        self.to
    }
}

#[derive(Debug)]
pub struct View {
    pub client: Window,
    pub kind: ViewKind,
    /// Frame the client is reparented into.
    pub frame: Option<Window>,
    /// Outer geometry on screen, frame included.
    pub rect: Rect,
    /// Client geometry on screen.
    pub client_rect: Rect,
    pub title: String,
    pub has_alpha: bool,
    /// Opaque area declared by the client, in client coordinates.
    pub opaque_hint: Option<Region>,
    pub focused: bool,
    pub urgent: bool,
    pub fade: Option<Fade>,
    pub needs_redraw: bool,
    /// Whether the toplevel is currently mapped.
    pub mapped: bool,
    /// Frame and client geometry last sent to the server.
    pub configured: Option<(Rect, Rect)>,
}

impl View {
    pub fn new(client: &Client, kind: ViewKind) -> Self {
        let geometry = client.props.geometry.unwrap_or_default();
        Self {
            client: client.window,
            kind,
            frame: None,
            rect: geometry,
            client_rect: geometry,
            title: client.title(),
            has_alpha: client.props.has_alpha(),
            opaque_hint: client.props.opaque_region(),
            focused: false,
            urgent: client.props.is_urgent(),
            fade: None,
            needs_redraw: true,
            mapped: false,
            configured: None,
        }
    }

    /// Top-level window that gets composited.
    pub fn toplevel(&self) -> Window {
        self.frame.unwrap_or(self.client)
    }

    /// Client position inside the frame.
    pub fn client_offset(&self) -> Point {
        self.client_rect.origin() - self.rect.origin()
    }

    pub fn opacity(&self, now: Instant) -> f64 {
        self.fade.map_or(1., |fade| fade.value(now))
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Area guaranteed fully opaque on screen. Fading views have none.
    pub fn opaque_region(&self) -> Region {
        if self.fade.is_some() {
            return Region::new();
        }

        let mut region = Region::from_rect(self.rect);
        if self.has_alpha {
            region -= self.client_rect;
            if let Some(hint) = &self.opaque_hint {
                let mut client = hint.translate(self.client_rect.x, self.client_rect.y);
                client &= self.client_rect;
                region += &client;
            }
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientProperties;

    fn client(depth: u8) -> Client {
        Client::new(
            0x200001,
            ClientProperties {
                depth,
                geometry: Some(Rect::new(10, 10, 100, 100)),
                opaque_region: Some(vec![Rect::new(0, 0, 100, 20)]),
                ..Default::default()
            },
        )
    }

    #[test]
    fn opaque_region_of_argb_client() {
        let mut view = View::new(&client(32), ViewKind::Floating);
        view.rect = Rect::new(0, 0, 120, 130);
        view.client_rect = Rect::new(10, 25, 100, 100);

        let opaque = view.opaque_region();
        // Frame decorations plus the declared top strip of the client.
        assert_eq!(opaque.area(), 120 * 130 - 100 * 100 + 100 * 20);
        assert!(opaque.contains_rect(&Rect::new(10, 25, 100, 20)));
        assert!(!opaque.contains_point(Point::new(50, 80)));

        let opaque = View::new(&client(24), ViewKind::Floating).opaque_region();
        assert_eq!(opaque, Region::from_rect(Rect::new(10, 10, 100, 100)));
    }

    #[test]
    fn fading_views_are_never_opaque() {
        let now = Instant::now();
        let mut view = View::new(&client(24), ViewKind::Floating);
        view.fade = Some(Fade::new(now, Duration::from_millis(100), 0., 1.));
        assert!(view.opaque_region().is_empty());
        assert_eq!(view.opacity(now), 0.);
        assert_eq!(view.opacity(now + Duration::from_millis(50)), 0.5);
        assert_eq!(view.opacity(now + Duration::from_secs(1)), 1.);
    }

    #[test]
    fn layers() {
        assert_eq!(ViewKind::Dock.layer(), LayerKind::Dock);
        assert_eq!(
            ViewKind::Popup { notification: true }.layer(),
            LayerKind::Notifications
        );
        assert!(!ViewKind::Dock.is_focusable());
    }
}
