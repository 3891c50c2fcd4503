//! Floating window chrome: frame geometry, hit zones and interactive resize arithmetic.

use bitflags::bitflags;
use page_config::Theme as ThemeConfig;

use crate::client::SizeHints;
use crate::region::{Point, Rect};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResizeEdge: u8 {
        const TOP = 1;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;

        const TOP_LEFT = Self::TOP.bits() | Self::LEFT.bits();
        const BOTTOM_LEFT = Self::BOTTOM.bits() | Self::LEFT.bits();
        const TOP_RIGHT = Self::TOP.bits() | Self::RIGHT.bits();
        const BOTTOM_RIGHT = Self::BOTTOM.bits() | Self::RIGHT.bits();

        const LEFT_RIGHT = Self::LEFT.bits() | Self::RIGHT.bits();
        const TOP_BOTTOM = Self::TOP.bits() | Self::BOTTOM.bits();
    }
}

/// Part of a floating frame under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatingZone {
    Close,
    /// Sends the client back to a notebook.
    Bind,
    Grip(ResizeEdge),
    /// Title bar, drags the window.
    Title,
    Client,
}

/// Frame-local geometry of the chrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingLayout {
    pub frame: Rect,
    pub title: Rect,
    pub close: Rect,
    pub bind: Rect,
    pub client: Rect,
    pub grips: [(ResizeEdge, Rect); 8],
}

fn frame_margins(theme: &ThemeConfig) -> page_config::Margins {
    let m = theme.floating_margin;
    page_config::Margins::new(
        m.top + theme.floating_title_height,
        m.bottom,
        m.left,
        m.right,
    )
}

/// Frame rectangle on screen around a client rectangle.
pub fn frame_for_client(client: Rect, theme: &ThemeConfig) -> Rect {
    client.grow(&frame_margins(theme))
}

/// Client rectangle on screen inside a frame rectangle.
pub fn client_for_frame(frame: Rect, theme: &ThemeConfig) -> Rect {
    frame.shrink(&frame_margins(theme))
}

pub fn compute_layout(size: (i32, i32), theme: &ThemeConfig) -> FloatingLayout {
    let frame = Rect::new(0, 0, size.0, size.1);
    let m = theme.floating_margin;
    let title = Rect::new(m.left, m.top, frame.w - m.horizontal(), theme.floating_title_height);
    let bh = title.h;
    let close = Rect::new(title.right() - bh, title.y, bh, bh);
    let bind = Rect::new(close.x - bh, title.y, bh, bh);
    let client = client_for_frame(frame, theme);

    let g = theme.grip_size.min(frame.w / 2).min(frame.h / 2).max(0);
    let (l, r, t, b) = (
        m.left.max(1),
        m.right.max(1),
        m.top.max(1),
        m.bottom.max(1),
    );
    let grips = [
        (ResizeEdge::TOP_LEFT, Rect::new(0, 0, g, g)),
        (ResizeEdge::TOP_RIGHT, Rect::new(frame.w - g, 0, g, g)),
        (ResizeEdge::BOTTOM_LEFT, Rect::new(0, frame.h - g, g, g)),
        (ResizeEdge::BOTTOM_RIGHT, Rect::new(frame.w - g, frame.h - g, g, g)),
        (ResizeEdge::TOP, Rect::new(g, 0, frame.w - 2 * g, t)),
        (ResizeEdge::BOTTOM, Rect::new(g, frame.h - b, frame.w - 2 * g, b)),
        (ResizeEdge::LEFT, Rect::new(0, g, l, frame.h - 2 * g)),
        (ResizeEdge::RIGHT, Rect::new(frame.w - r, g, r, frame.h - 2 * g)),
    ];

    FloatingLayout {
        frame,
        title,
        close,
        bind,
        client,
        grips,
    }
}

impl FloatingLayout {
    /// Buttons first, then grips, then the title bar. Points over the client are only reported
    /// when no grip overlaps them.
    pub fn hit_test(&self, p: Point) -> Option<FloatingZone> {
        if !self.frame.contains_point(p) {
            return None;
        }
        if self.close.contains_point(p) {
            return Some(FloatingZone::Close);
        }
        if self.bind.contains_point(p) {
            return Some(FloatingZone::Bind);
        }
        if let Some((edges, _)) = self.grips.iter().find(|(_, r)| r.contains_point(p)) {
            return Some(FloatingZone::Grip(*edges));
        }
        if self.title.contains_point(p) {
            return Some(FloatingZone::Title);
        }
        if self.client.contains_point(p) {
            return Some(FloatingZone::Client);
        }
        Some(FloatingZone::Title)
    }
}

/// New client rectangle after dragging `edges` by `(dx, dy)` from `original`.
///
/// The opposite edges stay anchored; the size is constrained by the client's size hints.
pub fn resize_rect(original: Rect, edges: ResizeEdge, dx: i32, dy: i32, hints: &SizeHints) -> Rect {
    let mut move_x = dx;
    let mut move_y = dy;
    if !edges.intersects(ResizeEdge::LEFT_RIGHT) {
        move_x = 0;
    }
    if !edges.intersects(ResizeEdge::TOP_BOTTOM) {
        move_y = 0;
    }

    let grow_width = if edges.contains(ResizeEdge::LEFT) {
        -move_x
    } else {
        move_x
    };
    let grow_height = if edges.contains(ResizeEdge::TOP) {
        -move_y
    } else {
        move_y
    };

    let (w, h) = hints.constrain(original.w + grow_width, original.h + grow_height);

    let x = if edges.contains(ResizeEdge::LEFT) {
        original.right() - w
    } else {
        original.x
    };
    let y = if edges.contains(ResizeEdge::TOP) {
        original.bottom() - h
    } else {
        original.y
    };

    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use page_config::Margins;

    use super::*;

    fn theme() -> ThemeConfig {
        ThemeConfig {
            floating_margin: Margins::new(2, 5, 5, 5),
            floating_title_height: 20,
            grip_size: 16,
            ..Default::default()
        }
    }

    #[test]
    fn frame_round_trip() {
        let client = Rect::new(100, 100, 300, 200);
        let frame = frame_for_client(client, &theme());
        assert_eq!(frame, Rect::new(95, 78, 310, 227));
        assert_eq!(client_for_frame(frame, &theme()), client);
    }

    #[test]
    fn zones() {
        let layout = compute_layout((310, 227), &theme());
        assert_eq!(layout.client, Rect::new(5, 22, 300, 200));
        assert_eq!(layout.hit_test(Point::new(300, 10)), Some(FloatingZone::Close));
        assert_eq!(layout.hit_test(Point::new(280, 10)), Some(FloatingZone::Bind));
        assert_eq!(layout.hit_test(Point::new(100, 10)), Some(FloatingZone::Title));
        assert_eq!(layout.hit_test(Point::new(1, 1)), Some(FloatingZone::Grip(ResizeEdge::TOP_LEFT)));
        assert_eq!(
            layout.hit_test(Point::new(308, 225)),
            Some(FloatingZone::Grip(ResizeEdge::BOTTOM_RIGHT))
        );
        assert_eq!(layout.hit_test(Point::new(100, 0)), Some(FloatingZone::Grip(ResizeEdge::TOP)));
        assert_eq!(layout.hit_test(Point::new(2, 100)), Some(FloatingZone::Grip(ResizeEdge::LEFT)));
        assert_eq!(layout.hit_test(Point::new(150, 100)), Some(FloatingZone::Client));
        assert_eq!(layout.hit_test(Point::new(400, 100)), None);
    }

    #[test]
    fn resize_bottom_right() {
        let original = Rect::new(50, 60, 300, 200);
        let rect = resize_rect(original, ResizeEdge::BOTTOM_RIGHT, 20, 20, &SizeHints::default());
        assert_eq!(rect, Rect::new(50, 60, 320, 220));
    }

    #[test]
    fn resize_top_left_keeps_opposite_corner() {
        let original = Rect::new(50, 60, 300, 200);
        let rect = resize_rect(original, ResizeEdge::TOP_LEFT, 30, -10, &SizeHints::default());
        assert_eq!(rect, Rect::new(80, 50, 270, 210));
        assert_eq!(rect.right(), original.right());
        assert_eq!(rect.bottom(), original.bottom());
    }

    #[test]
    fn resize_single_edge_ignores_other_axis() {
        let original = Rect::new(0, 0, 100, 100);
        let rect = resize_rect(original, ResizeEdge::RIGHT, 10, 50, &SizeHints::default());
        assert_eq!(rect, Rect::new(0, 0, 110, 100));
    }

    #[test]
    fn resize_respects_min_size() {
        let original = Rect::new(100, 100, 200, 200);
        let hints = SizeHints {
            min: Some((150, 120)),
            ..Default::default()
        };
        let rect = resize_rect(original, ResizeEdge::LEFT, 150, 0, &hints);
        assert_eq!(rect, Rect::new(150, 100, 150, 200));
    }
}
