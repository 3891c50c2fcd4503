//! Damage-tracking compositor.
//!
//! The compositor owns no scene knowledge: every frame it receives the stack of composited
//! top-levels, bottom to top, works out which screen area changed since the previous frame
//! and repaints only that area through [`repaint::plan_repaint`].

use std::collections::HashSet;
use std::time::{Duration, Instant};

use page_config::Color;

use crate::backend::{Operator, RenderBackend, Target, Window};
use crate::region::{Rect, Region};
use crate::view::Fade;

pub mod repaint;

pub use repaint::{plan_repaint, CompositedWindow, RepaintPlan};

/// What the last frame did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub skipped: bool,
    pub direct_paints: usize,
    pub opaque_paints: usize,
    pub slow_paints: usize,
    pub slow_area: i64,
}

/// A window that is gone from the scene but still fading out.
#[derive(Debug)]
struct FadingOut {
    window: CompositedWindow,
    fade: Fade,
}

#[derive(Debug)]
pub struct Compositor {
    enabled: bool,
    background: Color,
    fade_in: Duration,
    fade_out: Duration,
    damage: Region,
    surfaces: HashSet<Window>,
    previous: Vec<CompositedWindow>,
    fading_out: Vec<FadingOut>,
    last_frame: FrameStats,
}

impl Compositor {
    pub fn new(config: &page_config::Compositor, background: Color) -> Self {
        Self {
            enabled: !config.off,
            background,
            fade_in: Duration::from_millis(u64::from(config.fade_in_ms)),
            fade_out: Duration::from_millis(u64::from(config.fade_out_ms)),
            damage: Region::new(),
            surfaces: HashSet::new(),
            previous: Vec::new(),
            fading_out: Vec::new(),
            last_frame: FrameStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn fade_in(&self) -> Duration {
        self.fade_in
    }

    pub fn fade_out(&self) -> Duration {
        self.fade_out
    }

    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    /// Switches redirection on or off. Turning it on forgets the previous stack so the next
    /// frame repaints everything that is mapped.
    pub fn set_enabled<R: RenderBackend>(
        &mut self,
        backend: &mut R,
        enabled: bool,
    ) -> anyhow::Result<()> {
        if self.enabled == enabled {
            return Ok(());
        }
        backend.set_compositing(enabled)?;
        self.enabled = enabled;
        self.previous.clear();
        self.damage.clear();
        if !enabled {
            for ghost in self.fading_out.drain(..) {
                backend.destroy_surface(ghost.window.surface);
            }
            for surface in self.surfaces.drain() {
                backend.destroy_surface(surface);
            }
        }
        info!("compositing {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    pub fn add_damage(&mut self, damage: &Region) {
        if self.enabled {
            self.damage += damage;
        }
    }

    pub fn damage_rect(&mut self, rect: Rect) {
        if self.enabled {
            self.damage += rect;
        }
    }

    pub fn pending_damage(&self) -> &Region {
        &self.damage
    }

    pub fn is_tracked(&self, window: Window) -> bool {
        self.surfaces.contains(&window)
    }

    /// Starts following the contents of `window`.
    pub fn track<R: RenderBackend>(&mut self, backend: &mut R, window: Window) {
        if !self.enabled || self.surfaces.contains(&window) {
            return;
        }
        match backend.create_surface(window) {
            Ok(()) => {
                self.surfaces.insert(window);
            }
            Err(err) => {
                debug!("cannot composite window {window:#x}: {err:?}");
            }
        }
    }

    pub fn untrack<R: RenderBackend>(&mut self, backend: &mut R, window: Window) {
        if self.surfaces.remove(&window) {
            backend.destroy_surface(window);
        }
    }

    /// Re-reads the contents of a resized window.
    pub fn refresh<R: RenderBackend>(&mut self, backend: &mut R, window: Window) {
        if self.surfaces.contains(&window) {
            backend.refresh_surface(window);
        }
    }

    /// Keeps painting `window` on top while it fades away. Its surface is released once the
    /// fade completes.
    pub fn start_fade_out(&mut self, window: CompositedWindow, now: Instant) {
        if !self.enabled || !self.surfaces.remove(&window.surface) {
            return;
        }
        self.damage += &window.region;
        let from = window.opacity;
        self.fading_out.push(FadingOut {
            window,
            fade: Fade::new(now, self.fade_out, from, 0.),
        });
    }

    /// Whether a frame should be drawn now.
    pub fn needs_frame(&self) -> bool {
        self.enabled && (!self.damage.is_empty() || !self.fading_out.is_empty())
    }

    /// Draws one frame of `windows`, given bottom to top.
    pub fn render<R: RenderBackend>(
        &mut self,
        backend: &mut R,
        mut windows: Vec<CompositedWindow>,
        now: Instant,
    ) -> FrameStats {
        if !self.enabled {
            return FrameStats {
                skipped: true,
                ..Default::default()
            };
        }

        windows.retain(|w| self.surfaces.contains(&w.surface) && !w.region.is_empty());
        self.damage += &structural_damage(&self.previous, &windows);

        let mut done = Vec::new();
        for ghost in &mut self.fading_out {
            self.damage += &ghost.window.region;
            if ghost.fade.is_done(now) {
                done.push(ghost.window.surface);
            } else {
                ghost.window.opacity = ghost.fade.value(now);
            }
        }
        for surface in done {
            backend.destroy_surface(surface);
        }
        self.fading_out.retain(|ghost| !ghost.fade.is_done(now));

        self.previous = windows.clone();
        windows.extend(self.fading_out.iter().map(|ghost| ghost.window.clone()));

        let damage = std::mem::take(&mut self.damage);
        if damage.is_empty() {
            self.last_frame = FrameStats {
                skipped: true,
                ..Default::default()
            };
            return self.last_frame;
        }

        let plan = plan_repaint(&windows, &damage);
        let mut stats = FrameStats::default();

        for (idx, clip) in &plan.direct {
            let window = &windows[*idx];
            backend.paint(
                Target::Front,
                window.surface,
                window.rect.origin(),
                clip,
                Operator::Source,
                1.,
            );
            stats.direct_paints += 1;
        }
        for (idx, clip) in &plan.opaque {
            let window = &windows[*idx];
            backend.paint(
                Target::Front,
                window.surface,
                window.rect.origin(),
                clip,
                Operator::Source,
                1.,
            );
            stats.opaque_paints += 1;
        }

        if !plan.slow.is_empty() {
            backend.fill(Target::BackBuffer, &plan.slow, self.background);
            for window in &windows {
                let clip = window.region.intersect(&plan.slow);
                if clip.is_empty() {
                    continue;
                }
                backend.paint(
                    Target::BackBuffer,
                    window.surface,
                    window.rect.origin(),
                    &clip,
                    Operator::Over,
                    window.opacity,
                );
                stats.slow_paints += 1;
            }
            backend.copy_back_buffer(&plan.slow);
            stats.slow_area = plan.slow.area();
        }

        backend.present();
        trace!("frame: {stats:?}");
        self.last_frame = stats;
        stats
    }
}

/// Screen area changed by windows appearing, disappearing, moving or restacking.
fn structural_damage(previous: &[CompositedWindow], current: &[CompositedWindow]) -> Region {
    let mut damage = Region::new();

    for old in previous {
        match current.iter().find(|w| w.surface == old.surface) {
            Some(new) if new.rect == old.rect && new.opacity == old.opacity => (),
            Some(new) => {
                damage += &old.region;
                damage += &new.region;
            }
            None => damage += &old.region,
        }
    }
    for new in current {
        if !previous.iter().any(|w| w.surface == new.surface) {
            damage += &new.region;
        }
    }

    // Windows that changed place relative to each other.
    let old_order: Vec<_> = previous
        .iter()
        .filter(|w| current.iter().any(|c| c.surface == w.surface))
        .collect();
    let new_order: Vec<_> = current
        .iter()
        .filter(|w| previous.iter().any(|p| p.surface == w.surface))
        .collect();
    for (old, new) in old_order.iter().zip(&new_order) {
        if old.surface != new.surface {
            damage += &old.region;
            damage += &new.region;
        }
    }

    damage
}
