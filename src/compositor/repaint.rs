//! Classification of damaged screen area into paint strategies.
//!
//! Damage is split three ways. Where exactly one window is visible its pixels are copied
//! straight to the front buffer. Where the topmost window is opaque it is copied too, and
//! everything else is alpha-blended bottom to top in the back buffer before being copied out.

use crate::backend::Window;
use crate::region::{Rect, Region};
use crate::tree::NodeId;

/// One composited top-level in stacking order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositedWindow {
    pub node: Option<NodeId>,
    pub surface: Window,
    pub rect: Rect,
    /// Area the window covers on screen.
    pub region: Region,
    /// Part of `region` guaranteed fully opaque.
    pub opaque: Region,
    pub opacity: f64,
}

impl CompositedWindow {
    pub fn new(node: Option<NodeId>, surface: Window, rect: Rect, opaque: Region) -> Self {
        let region = Region::from_rect(rect);
        let opaque = opaque.intersect(&region);
        Self {
            node,
            surface,
            rect,
            region,
            opaque,
            opacity: 1.,
        }
    }

    /// Fading windows always blend.
    pub fn is_translucent(&self) -> bool {
        self.opacity < 1.
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RepaintPlan {
    /// Window index and area where it is the only visible window.
    pub direct: Vec<(usize, Region)>,
    /// Window index and area where it is the topmost window and opaque.
    pub opaque: Vec<(usize, Region)>,
    /// Area that needs blending in the back buffer.
    pub slow: Region,
}

impl RepaintPlan {
    pub fn direct_region(&self) -> Region {
        self.direct.iter().fold(Region::new(), |acc, (_, r)| &acc + r)
    }

    pub fn opaque_region(&self) -> Region {
        self.opaque.iter().fold(Region::new(), |acc, (_, r)| &acc + r)
    }
}

/// Splits `damage` over `windows`, given bottom to top.
pub fn plan_repaint(windows: &[CompositedWindow], damage: &Region) -> RepaintPlan {
    let mut plan = RepaintPlan::default();
    if damage.is_empty() {
        return plan;
    }

    // Single-window areas.
    let mut direct_total = Region::new();
    for (idx, window) in windows.iter().enumerate() {
        if window.region.is_empty() || window.is_translucent() {
            continue;
        }
        let mut alone = window.region.intersect(damage);
        for (other_idx, other) in windows.iter().enumerate() {
            if other_idx == idx || alone.is_empty() {
                continue;
            }
            alone -= &other.region;
        }
        if !alone.is_empty() {
            direct_total += &alone;
            plan.direct.push((idx, alone));
        }
    }

    // Areas whose topmost window is opaque there.
    let mut covered = Region::new();
    for window in windows {
        covered -= &window.region;
        if !window.is_translucent() {
            covered += &window.opaque;
        }
    }
    let mut remaining = covered.intersect(damage);
    remaining -= &direct_total;

    let mut opaque_total = Region::new();
    for (idx, window) in windows.iter().enumerate().rev() {
        if remaining.is_empty() {
            break;
        }
        if window.is_translucent() || window.opaque.is_empty() {
            continue;
        }
        let part = remaining.intersect(&window.opaque);
        if part.is_empty() {
            continue;
        }
        remaining -= &part;
        opaque_total += &part;
        plan.opaque.push((idx, part));
    }

    let mut slow = damage.clone();
    slow -= &direct_total;
    slow -= &opaque_total;
    plan.slow = slow;

    plan
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn opaque(surface: Window, rect: Rect) -> CompositedWindow {
        CompositedWindow::new(None, surface, rect, Region::from_rect(rect))
    }

    fn alpha(surface: Window, rect: Rect) -> CompositedWindow {
        CompositedWindow::new(None, surface, rect, Region::new())
    }

    fn screen() -> Region {
        Region::from_rect(Rect::new(0, 0, 1000, 800))
    }

    #[test]
    fn empty_damage_plans_nothing() {
        let windows = [opaque(1, Rect::new(0, 0, 100, 100))];
        assert_eq!(plan_repaint(&windows, &Region::new()), RepaintPlan::default());
    }

    #[test]
    fn disjoint_opaque_windows_paint_directly() {
        let windows = [
            opaque(1, Rect::new(0, 0, 300, 800)),
            opaque(2, Rect::new(300, 0, 300, 800)),
            opaque(3, Rect::new(600, 0, 400, 800)),
        ];
        let plan = plan_repaint(&windows, &screen());
        assert_eq!(plan.direct.len(), 3);
        assert!(plan.opaque.is_empty());
        assert!(plan.slow.is_empty());
        assert_eq!(plan.direct_region(), screen());
    }

    #[test]
    fn alpha_on_top_routes_overlap_to_slow_path() {
        let bottom = Rect::new(0, 0, 600, 600);
        let top = Rect::new(400, 400, 600, 400);
        let windows = [opaque(1, bottom), alpha(2, top)];
        let damage = Region::from_rects([bottom, top]);
        let plan = plan_repaint(&windows, &damage);

        let overlap = Rect::new(400, 400, 200, 200);
        assert_eq!(plan.slow, Region::from_rect(overlap));

        let direct = plan.direct_region();
        assert!(direct.contains_rect(&Rect::new(0, 0, 600, 400)));
        assert!(direct.contains_rect(&Rect::new(600, 400, 400, 400)));
        assert!(!direct.intersects_rect(&overlap));
        assert!(plan.opaque.is_empty());
    }

    #[test]
    fn opaque_on_top_is_assigned_to_topmost() {
        let bottom = Rect::new(0, 0, 600, 600);
        let top = Rect::new(400, 400, 600, 400);
        let windows = [opaque(1, bottom), opaque(2, top)];
        let plan = plan_repaint(&windows, &screen());

        assert_eq!(plan.opaque.len(), 1);
        assert_eq!(plan.opaque[0].0, 1);
        assert_eq!(plan.opaque[0].1, Region::from_rect(Rect::new(400, 400, 200, 200)));
        assert_eq!(plan.slow, &screen() - &windows_region(&windows));
    }

    #[test]
    fn fading_window_blends() {
        let mut window = opaque(1, Rect::new(0, 0, 100, 100));
        window.opacity = 0.5;
        let damage = Region::from_rect(Rect::new(0, 0, 100, 100));
        let plan = plan_repaint(&[window], &damage);
        assert!(plan.direct.is_empty());
        assert!(plan.opaque.is_empty());
        assert_eq!(plan.slow, damage);
    }

    fn windows_region(windows: &[CompositedWindow]) -> Region {
        windows.iter().fold(Region::new(), |acc, w| &acc + &w.region)
    }

    fn arbitrary_window() -> impl Strategy<Value = CompositedWindow> {
        (0..200i32, 0..200i32, 1..120i32, 1..120i32, any::<bool>(), any::<bool>()).prop_map(
            |(x, y, w, h, is_opaque, fading)| {
                let rect = Rect::new(x, y, w, h);
                let mut window = if is_opaque {
                    opaque(1, rect)
                } else {
                    alpha(1, rect)
                };
                if fading {
                    window.opacity = 0.5;
                }
                window
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn buckets_partition_damage(
            windows in prop::collection::vec(arbitrary_window(), 0..6),
            damage in prop::collection::vec((0..250i32, 0..250i32, 1..100i32, 1..100i32), 1..4),
        ) {
            let damage = Region::from_rects(
                damage.into_iter().map(|(x, y, w, h)| Rect::new(x, y, w, h)),
            );
            let plan = plan_repaint(&windows, &damage);

            let direct = plan.direct_region();
            let opaque = plan.opaque_region();

            let total = &(&direct + &opaque) + &plan.slow;
            prop_assert_eq!(total, damage.clone());
            prop_assert!(!direct.intersects(&opaque));
            prop_assert!(!direct.intersects(&plan.slow));
            prop_assert!(!opaque.intersects(&plan.slow));

            // Fast paths only ever touch the window they name.
            for (idx, region) in plan.direct.iter().chain(plan.opaque.iter()) {
                prop_assert!(!windows[*idx].is_translucent());
                prop_assert_eq!(&region.intersect(&windows[*idx].region), region);
            }
        }
    }
}
