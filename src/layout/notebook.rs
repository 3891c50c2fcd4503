//! Tabbed container.
//!
//! A notebook shows one selected client in its client area and a tab per client in its tab
//! bar. The tab bar geometry is cached in a [`TabBarLayout`] that is recomputed whenever the
//! tabs or the allocation change, so hit-testing never sees stale rectangles.

use page_config::{Margins, Theme as ThemeConfig};

use crate::region::{Point, Rect};
use crate::tree::NodeId;

/// Tab bar geometry constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabMetrics {
    pub tab_height: i32,
    pub tab_min_width: i32,
    pub tab_max_width: i32,
    pub button_width: i32,
    pub arrow_width: i32,
    pub margin: Margins,
    pub min_width: i32,
    pub min_height: i32,
}

impl TabMetrics {
    pub fn from_theme(theme: &ThemeConfig) -> Self {
        Self {
            tab_height: theme.notebook_tab_height.max(1),
            tab_min_width: theme.notebook_tab_min_width.max(1),
            tab_max_width: theme.notebook_tab_max_width.max(theme.notebook_tab_min_width).max(1),
            button_width: theme.notebook_button_width.max(0),
            arrow_width: theme.notebook_scroll_arrow_width.max(0),
            margin: theme.notebook_margin,
            min_width: theme.notebook_min_width.max(1),
            min_height: theme.notebook_min_height.max(1),
        }
    }
}

impl Default for TabMetrics {
    fn default() -> Self {
        Self::from_theme(&ThemeConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tab {
    pub view: NodeId,
    /// Hidden through the unbind button; the tab stays.
    pub iconic: bool,
}

/// What a point of the tab bar maps to, in hit-test priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabBarHit {
    Close,
    Bind,
    ScrollLeft,
    ScrollRight,
    Tab(usize),
    SplitHorizontal,
    SplitVertical,
    Empty,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TabBarLayout {
    pub bar: Rect,
    /// Visible part of every tab, possibly empty when scrolled out.
    pub tabs: Vec<Rect>,
    pub close: Option<Rect>,
    pub bind: Option<Rect>,
    pub left_arrow: Option<Rect>,
    pub right_arrow: Option<Rect>,
    pub hsplit: Rect,
    pub vsplit: Rect,
    pub client_area: Rect,
    pub scroll: i32,
    pub max_scroll: i32,
}

impl TabBarLayout {
    pub fn hit_test(&self, p: Point) -> Option<TabBarHit> {
        if !self.bar.contains_point(p) {
            return None;
        }

        let hit = |r: &Option<Rect>| r.is_some_and(|r| r.contains_point(p));
        if hit(&self.close) {
            return Some(TabBarHit::Close);
        }
        if hit(&self.bind) {
            return Some(TabBarHit::Bind);
        }
        if hit(&self.left_arrow) {
            return Some(TabBarHit::ScrollLeft);
        }
        if hit(&self.right_arrow) {
            return Some(TabBarHit::ScrollRight);
        }
        if let Some(idx) = self.tabs.iter().position(|r| r.contains_point(p)) {
            return Some(TabBarHit::Tab(idx));
        }
        if self.hsplit.contains_point(p) {
            return Some(TabBarHit::SplitHorizontal);
        }
        if self.vsplit.contains_point(p) {
            return Some(TabBarHit::SplitVertical);
        }
        Some(TabBarHit::Empty)
    }
}

pub fn compute_tab_bar(
    alloc: Rect,
    tab_count: usize,
    selected: Option<usize>,
    scroll: i32,
    metrics: &TabMetrics,
) -> TabBarLayout {
    let bar = Rect::new(alloc.x, alloc.y, alloc.w.max(0), metrics.tab_height.min(alloc.h).max(0));
    let bw = metrics.button_width.min(bar.w / 2);

    let vsplit = Rect::new(bar.right() - bw, bar.y, bw, bar.h);
    let hsplit = Rect::new(vsplit.x - bw, bar.y, bw, bar.h);
    let strip = Rect::from_extents(bar.x, bar.y, hsplit.x.max(bar.x), bar.bottom());

    let client_area =
        Rect::from_extents(alloc.x, bar.bottom(), alloc.right(), alloc.bottom()).shrink(&metrics.margin);

    let mut layout = TabBarLayout {
        bar,
        hsplit,
        vsplit,
        client_area,
        ..Default::default()
    };

    if tab_count == 0 || strip.is_empty() {
        layout.tabs = vec![Rect::default(); tab_count];
        return layout;
    }

    let count = tab_count as i32;
    let needed = count.saturating_mul(metrics.tab_min_width);

    if needed <= strip.w {
        let even = strip.w / count;
        let (base, remainder) = if even >= metrics.tab_max_width {
            (metrics.tab_max_width, 0)
        } else {
            (even, strip.w - even * count)
        };
        let mut x = strip.x;
        for idx in 0..count {
            let w = base + i32::from(idx < remainder);
            layout.tabs.push(Rect::new(x, strip.y, w, strip.h));
            x += w;
        }
    } else {
        let aw = metrics.arrow_width.min(strip.w / 2);
        let left = Rect::new(strip.x, strip.y, aw, strip.h);
        let right = Rect::new(strip.right() - aw, strip.y, aw, strip.h);
        let inner = Rect::from_extents(left.right(), strip.y, right.x, strip.bottom());

        let max_scroll = (needed - inner.w).max(0);
        let mut scroll = scroll.clamp(0, max_scroll);
        if let Some(sel) = selected {
            let x0 = sel as i32 * metrics.tab_min_width;
            let x1 = x0 + metrics.tab_min_width;
            if x0 < scroll {
                scroll = x0;
            } else if x1 > scroll + inner.w {
                scroll = (x1 - inner.w).min(max_scroll);
            }
        }

        for idx in 0..count {
            let full = Rect::new(
                inner.x - scroll + idx * metrics.tab_min_width,
                inner.y,
                metrics.tab_min_width,
                inner.h,
            );
            layout.tabs.push(full.intersection(&inner).unwrap_or_default());
        }

        layout.left_arrow = Some(left);
        layout.right_arrow = Some(right);
        layout.scroll = scroll;
        layout.max_scroll = max_scroll;
    }

    if let Some(tab) = selected.and_then(|sel| layout.tabs.get(sel)) {
        if tab.w >= bw * 3 {
            let close = Rect::new(tab.right() - bw, tab.y, bw, tab.h);
            let bind = Rect::new(close.x - bw, tab.y, bw, tab.h);
            layout.close = Some(close);
            layout.bind = Some(bind);
        }
    }

    layout
}

#[derive(Debug)]
pub struct Notebook {
    tabs: Vec<Tab>,
    selected: Option<NodeId>,
    scroll: i32,
    allocation: Rect,
    metrics: TabMetrics,
    layout: TabBarLayout,
    pub needs_redraw: bool,
}

impl Notebook {
    pub fn new(metrics: TabMetrics) -> Self {
        Self {
            tabs: Vec::new(),
            selected: None,
            scroll: 0,
            allocation: Rect::default(),
            metrics,
            layout: TabBarLayout::default(),
            needs_redraw: true,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn contains(&self, view: NodeId) -> bool {
        self.index_of(view).is_some()
    }

    pub fn index_of(&self, view: NodeId) -> Option<usize> {
        self.tabs.iter().position(|t| t.view == view)
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|view| self.index_of(view))
    }

    /// Selected view, unless it was unbound.
    pub fn shown(&self) -> Option<NodeId> {
        let idx = self.selected_index()?;
        let tab = self.tabs[idx];
        (!tab.iconic).then_some(tab.view)
    }

    pub fn is_iconic(&self, view: NodeId) -> bool {
        self.tabs.iter().any(|t| t.view == view && t.iconic)
    }

    pub fn allocation(&self) -> Rect {
        self.allocation
    }

    pub fn metrics(&self) -> &TabMetrics {
        &self.metrics
    }

    pub fn layout(&self) -> &TabBarLayout {
        &self.layout
    }

    pub fn client_area(&self) -> Rect {
        self.layout.client_area
    }

    /// Inserts a tab at `index` (or last). The first tab of an empty notebook becomes selected.
    pub fn add(&mut self, view: NodeId, index: Option<usize>) -> usize {
        if let Some(idx) = self.index_of(view) {
            return idx;
        }
        let idx = index.unwrap_or(self.tabs.len()).min(self.tabs.len());
        self.tabs.insert(idx, Tab { view, iconic: false });
        if self.selected.is_none() {
            self.selected = Some(view);
        }
        self.refresh_layout();
        idx
    }

    /// Removes the tab of `view`, returning its former index. The selection moves to the tab
    /// that took its place, or the new last tab.
    pub fn remove(&mut self, view: NodeId) -> Option<usize> {
        let idx = self.index_of(view)?;
        self.tabs.remove(idx);
        if self.selected == Some(view) {
            self.selected = if self.tabs.is_empty() {
                None
            } else {
                Some(self.tabs[idx.min(self.tabs.len() - 1)].view)
            };
        }
        self.refresh_layout();
        Some(idx)
    }

    /// Selects and un-iconifies the tab of `view`.
    pub fn select(&mut self, view: NodeId) -> bool {
        let Some(idx) = self.index_of(view) else {
            return false;
        };
        self.tabs[idx].iconic = false;
        self.selected = Some(view);
        self.refresh_layout();
        true
    }

    pub fn set_iconic(&mut self, view: NodeId, iconic: bool) -> bool {
        let Some(idx) = self.index_of(view) else {
            return false;
        };
        self.tabs[idx].iconic = iconic;
        self.needs_redraw = true;
        true
    }

    pub fn move_tab(&mut self, view: NodeId, index: usize) -> bool {
        let Some(idx) = self.index_of(view) else {
            return false;
        };
        let tab = self.tabs.remove(idx);
        let index = index.min(self.tabs.len());
        self.tabs.insert(index, tab);
        self.refresh_layout();
        true
    }

    /// Scrolls the tab strip by whole tabs.
    pub fn scroll_by(&mut self, tabs: i32) {
        self.scroll = (self.layout.scroll + tabs * self.metrics.tab_min_width)
            .clamp(0, self.layout.max_scroll);
        // Manual scrolling may hide the selected tab.
        self.layout = compute_tab_bar(
            self.allocation,
            self.tabs.len(),
            None,
            self.scroll,
            &self.metrics,
        );
        self.needs_redraw = true;
    }

    pub fn set_allocation(&mut self, allocation: Rect, metrics: TabMetrics) {
        if self.allocation == allocation && self.metrics == metrics {
            return;
        }
        self.allocation = allocation;
        self.metrics = metrics;
        self.refresh_layout();
    }

    pub fn hit_test(&self, p: Point) -> Option<TabBarHit> {
        self.layout.hit_test(p)
    }

    fn refresh_layout(&mut self) {
        self.layout = compute_tab_bar(
            self.allocation,
            self.tabs.len(),
            self.selected_index(),
            self.scroll,
            &self.metrics,
        );
        self.scroll = self.layout.scroll;
        self.needs_redraw = true;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::tree::{NodeKind, Tree};

    fn metrics() -> TabMetrics {
        TabMetrics {
            tab_height: 20,
            tab_min_width: 100,
            tab_max_width: 150,
            button_width: 10,
            arrow_width: 15,
            margin: Margins::uniform(2),
            min_width: 50,
            min_height: 50,
        }
    }

    fn ids(n: usize) -> Vec<NodeId> {
        let mut tree = Tree::new();
        (0..n).map(|_| tree.insert(NodeKind::Root)).collect()
    }

    #[test]
    fn tabs_share_width_evenly() {
        let layout = compute_tab_bar(Rect::new(0, 0, 322, 200), 3, Some(0), 0, &metrics());
        assert_eq!(layout.hsplit, Rect::new(302, 0, 10, 20));
        assert_eq!(layout.vsplit, Rect::new(312, 0, 10, 20));
        let widths: Vec<_> = layout.tabs.iter().map(|t| t.w).collect();
        assert_eq!(widths, [101, 101, 100]);
        assert_eq!(layout.tabs[2].right(), 302);
        assert_eq!(layout.client_area, Rect::new(2, 22, 318, 176));
        assert!(layout.left_arrow.is_none());
        assert_eq!(layout.close, Some(Rect::new(91, 0, 10, 20)));
        assert_eq!(layout.bind, Some(Rect::new(81, 0, 10, 20)));
    }

    #[test]
    fn wide_bar_caps_tabs() {
        // 480px strip, two tabs of at most 150px.
        let layout = compute_tab_bar(Rect::new(0, 0, 500, 200), 2, Some(1), 0, &metrics());
        assert_eq!(layout.tabs, [Rect::new(0, 0, 150, 20), Rect::new(150, 0, 150, 20)]);
        assert_eq!(layout.close, Some(Rect::new(290, 0, 10, 20)));
        assert_eq!(layout.hit_test(Point::new(299, 5)), Some(TabBarHit::Close));
        assert_eq!(layout.hit_test(Point::new(300, 5)), Some(TabBarHit::Empty));
        assert_eq!(layout.hit_test(Point::new(479, 5)), Some(TabBarHit::Empty));
        assert_eq!(layout.hit_test(Point::new(480, 5)), Some(TabBarHit::SplitHorizontal));
    }

    #[test]
    fn overflowing_tabs_scroll_to_selection() {
        // Strip of 250px, arrows of 15px, 220px for 5 tabs of 100px.
        let layout = compute_tab_bar(Rect::new(0, 0, 270, 100), 5, Some(4), 0, &metrics());
        assert_eq!(layout.left_arrow, Some(Rect::new(0, 0, 15, 20)));
        assert_eq!(layout.right_arrow, Some(Rect::new(235, 0, 15, 20)));
        assert_eq!(layout.max_scroll, 280);
        assert_eq!(layout.scroll, 280);
        assert_eq!(layout.tabs[4], Rect::new(135, 0, 100, 20));
        assert!(layout.tabs[0].is_empty());

        let layout = compute_tab_bar(Rect::new(0, 0, 270, 100), 5, Some(0), 280, &metrics());
        assert_eq!(layout.scroll, 0);
        assert_eq!(layout.tabs[0], Rect::new(15, 0, 100, 20));
    }

    #[test]
    fn hit_test_priority() {
        let layout = compute_tab_bar(Rect::new(0, 0, 322, 200), 3, Some(0), 0, &metrics());
        assert_eq!(layout.hit_test(Point::new(95, 5)), Some(TabBarHit::Close));
        assert_eq!(layout.hit_test(Point::new(85, 5)), Some(TabBarHit::Bind));
        assert_eq!(layout.hit_test(Point::new(50, 5)), Some(TabBarHit::Tab(0)));
        assert_eq!(layout.hit_test(Point::new(150, 5)), Some(TabBarHit::Tab(1)));
        assert_eq!(layout.hit_test(Point::new(305, 5)), Some(TabBarHit::SplitHorizontal));
        assert_eq!(layout.hit_test(Point::new(315, 5)), Some(TabBarHit::SplitVertical));
        assert_eq!(layout.hit_test(Point::new(50, 50)), None);

        let empty = compute_tab_bar(Rect::new(0, 0, 322, 200), 0, None, 0, &metrics());
        assert_eq!(empty.hit_test(Point::new(50, 5)), Some(TabBarHit::Empty));
    }

    #[test]
    fn selection_follows_removal() {
        let v = ids(3);
        let mut nb = Notebook::new(metrics());
        nb.set_allocation(Rect::new(0, 0, 400, 300), metrics());
        for id in &v {
            nb.add(*id, None);
        }
        assert_eq!(nb.selected(), Some(v[0]));

        nb.select(v[1]);
        assert_eq!(nb.remove(v[1]), Some(1));
        assert_eq!(nb.selected(), Some(v[2]));

        assert_eq!(nb.remove(v[2]), Some(1));
        assert_eq!(nb.selected(), Some(v[0]));

        nb.set_iconic(v[0], true);
        assert_eq!(nb.shown(), None);
        nb.select(v[0]);
        assert_eq!(nb.shown(), Some(v[0]));
    }

    #[test]
    fn add_is_idempotent_and_positions() {
        let v = ids(3);
        let mut nb = Notebook::new(metrics());
        assert_eq!(nb.add(v[0], None), 0);
        assert_eq!(nb.add(v[1], Some(0)), 0);
        assert_eq!(nb.add(v[0], None), 1);
        assert_eq!(nb.add(v[2], Some(99)), 2);
        assert!(nb.move_tab(v[2], 0));
        let order: Vec<_> = nb.tabs().iter().map(|t| t.view).collect();
        assert_eq!(order, [v[2], v[1], v[0]]);
    }

    proptest! {
        #[test]
        fn tab_round_trip(order in Just((0..8).collect::<Vec<usize>>()).prop_shuffle(), n in 1..8usize) {
            let v = ids(8);
            let mut nb = Notebook::new(metrics());
            nb.set_allocation(Rect::new(0, 0, 500, 300), metrics());
            for id in &v[..n] {
                nb.add(*id, None);
            }
            prop_assert_eq!(nb.layout().tabs.len(), n);

            for idx in order.into_iter().filter(|idx| *idx < n) {
                prop_assert!(nb.remove(v[idx]).is_some());
                prop_assert_eq!(nb.layout().tabs.len(), nb.len());
                if let Some(sel) = nb.selected() {
                    prop_assert!(nb.contains(sel));
                }
            }

            prop_assert!(nb.is_empty());
            prop_assert_eq!(nb.selected(), None);
            prop_assert!(nb.layout().tabs.is_empty());
            prop_assert!(nb.layout().close.is_none());
        }
    }
}
