//! Decoration painting.
//!
//! The core decides what a decoration shows; a [`Theme`] decides how it looks. Everything is
//! painted with cairo into an ARGB32 image that the caller uploads to the window that shows
//! it.

use std::borrow::Cow;

use anyhow::{ensure, Context as _, Result};
use page_config::{Color, Theme as ThemeConfig};
use pangocairo::cairo::{self, Context, ImageSurface};
use pangocairo::pango::{self, Alignment, EllipsizeMode, FontDescription};

use crate::layout::notebook::TabBarLayout;
use crate::layout::split::SplitType;
use crate::overlay::{alt_tab_row_height, AltTabEntry, OverlayKind};
use crate::region::Rect;
use crate::view::floating::FloatingLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabState<'a> {
    pub title: &'a str,
    pub selected: bool,
    pub iconic: bool,
    pub urgent: bool,
}

/// A notebook tab bar, in the coordinates of the target surface.
#[derive(Debug)]
pub struct NotebookDecoration<'a> {
    pub allocation: Rect,
    pub layout: &'a TabBarLayout,
    pub tabs: Vec<TabState<'a>>,
    /// Whether the notebook holds the focused client.
    pub focused: bool,
}

/// Floating chrome, in frame coordinates.
#[derive(Debug)]
pub struct FloatingDecoration<'a> {
    pub layout: &'a FloatingLayout,
    pub title: &'a str,
    pub focused: bool,
    pub urgent: bool,
}

pub trait Theme {
    fn config(&self) -> &ThemeConfig;

    fn render_background(&self, cr: &Context, area: Rect) -> Result<()>;
    fn render_notebook(&self, cr: &Context, notebook: &NotebookDecoration<'_>) -> Result<()>;
    fn render_split(&self, cr: &Context, bar: Rect, split_type: SplitType) -> Result<()>;
    fn render_floating(&self, cr: &Context, floating: &FloatingDecoration<'_>) -> Result<()>;
    /// Paints a popup of `size` with its top-left at the origin.
    fn render_overlay(&self, cr: &Context, overlay: &OverlayKind, size: (i32, i32)) -> Result<()>;
    fn render_alt_tab(
        &self,
        cr: &Context,
        entries: &[AltTabEntry],
        selected: usize,
        size: (i32, i32),
    ) -> Result<()>;
}

/// Premultiplied ARGB32 pixels, rows packed without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

/// Runs `paint` on a fresh transparent surface and returns its pixels.
pub fn rasterize(width: i32, height: i32, paint: impl FnOnce(&Context) -> Result<()>) -> Result<Image> {
    ensure!(width > 0 && height > 0, "cannot rasterize a {width}x{height} surface");

    let mut surface = ImageSurface::create(cairo::Format::ARgb32, width, height)
        .context("error creating decoration surface")?;
    let stride = surface.stride();
    {
        let cr = Context::new(&surface)?;
        paint(&cr)?;
    }
    surface.flush();

    let data = surface
        .data()
        .context("error reading decoration surface data")?;
    let row = width as usize * 4;
    let mut out = Vec::with_capacity(row * height as usize);
    for line in data.chunks(stride as usize).take(height as usize) {
        out.extend_from_slice(&line[..row]);
    }

    Ok(Image {
        width,
        height,
        data: out,
    })
}

pub fn sanitize_title(title: &str) -> Cow<'_, str> {
    if title.chars().all(|ch| !ch.is_control()) {
        let trimmed = title.trim();
        return if trimmed.is_empty() {
            Cow::Borrowed("untitled")
        } else {
            Cow::Borrowed(trimmed)
        };
    }

    let buf: String = title
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect();
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        Cow::Borrowed("untitled")
    } else {
        Cow::Owned(trimmed.to_string())
    }
}

fn set_source_color(cr: &Context, color: Color) {
    let [r, g, b, a] = color.to_array_unpremul();
    cr.set_source_rgba(f64::from(r), f64::from(g), f64::from(b), f64::from(a));
}

fn fill_rect(cr: &Context, rect: Rect, color: Color) -> Result<()> {
    if rect.is_empty() {
        return Ok(());
    }
    set_source_color(cr, color);
    cr.rectangle(
        f64::from(rect.x),
        f64::from(rect.y),
        f64::from(rect.w),
        f64::from(rect.h),
    );
    cr.fill()?;
    Ok(())
}

fn outline_rect(cr: &Context, rect: Rect, color: Color, width: f64) -> Result<()> {
    if rect.is_empty() {
        return Ok(());
    }
    set_source_color(cr, color);
    cr.set_line_width(width);
    cr.rectangle(
        f64::from(rect.x) + width / 2.,
        f64::from(rect.y) + width / 2.,
        f64::from(rect.w) - width,
        f64::from(rect.h) - width,
    );
    cr.stroke()?;
    Ok(())
}

/// Built-in flat theme.
#[derive(Debug, Clone)]
pub struct DefaultTheme {
    config: ThemeConfig,
    font: FontDescription,
}

impl DefaultTheme {
    pub fn new(config: ThemeConfig) -> Self {
        let font = FontDescription::from_string(&config.font);
        Self { config, font }
    }

    fn text_layout(&self, cr: &Context) -> pango::Layout {
        let layout = pangocairo::functions::create_layout(cr);
        layout.context().set_round_glyph_positions(false);
        layout.set_single_paragraph_mode(true);
        layout.set_font_description(Some(&self.font));
        layout.set_ellipsize(EllipsizeMode::End);
        layout.set_alignment(Alignment::Left);
        layout
    }

    fn draw_text(&self, cr: &Context, rect: Rect, text: &str, color: Color) -> Result<()> {
        let padding = 6_i32.min(rect.w / 4);
        let width = rect.w - padding * 2;
        if width <= 0 || rect.h <= 0 {
            return Ok(());
        }

        let layout = self.text_layout(cr);
        layout.set_width(width * pango::SCALE);
        layout.set_text(&sanitize_title(text));
        let (_, th) = layout.pixel_size();

        cr.save()?;
        cr.rectangle(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.w),
            f64::from(rect.h),
        );
        cr.clip();
        set_source_color(cr, color);
        cr.move_to(
            f64::from(rect.x + padding),
            f64::from(rect.y + ((rect.h - th) / 2).max(0)),
        );
        pangocairo::functions::show_layout(cr, &layout);
        cr.restore()?;
        Ok(())
    }

    fn draw_cross(&self, cr: &Context, rect: Rect, color: Color) -> Result<()> {
        let inset = f64::from(rect.w.min(rect.h)) / 3.;
        let (x0, y0) = (f64::from(rect.x) + inset, f64::from(rect.y) + inset);
        let (x1, y1) = (
            f64::from(rect.right()) - inset,
            f64::from(rect.bottom()) - inset,
        );
        set_source_color(cr, color);
        cr.set_line_width(1.5);
        cr.move_to(x0, y0);
        cr.line_to(x1, y1);
        cr.move_to(x1, y0);
        cr.line_to(x0, y1);
        cr.stroke()?;
        Ok(())
    }

    fn draw_pin(&self, cr: &Context, rect: Rect, color: Color) -> Result<()> {
        let inset = rect.w.min(rect.h) / 3;
        let inner = Rect::new(
            rect.x + inset,
            rect.y + inset,
            rect.w - 2 * inset,
            rect.h - 2 * inset,
        );
        outline_rect(cr, inner, color, 1.)
    }

    fn draw_arrow(&self, cr: &Context, rect: Rect, left: bool, color: Color) -> Result<()> {
        let cx = f64::from(rect.x) + f64::from(rect.w) / 2.;
        let cy = f64::from(rect.y) + f64::from(rect.h) / 2.;
        let s = f64::from(rect.w.min(rect.h)) / 4.;
        set_source_color(cr, color);
        if left {
            cr.move_to(cx + s / 2., cy - s);
            cr.line_to(cx - s / 2., cy);
            cr.line_to(cx + s / 2., cy + s);
        } else {
            cr.move_to(cx - s / 2., cy - s);
            cr.line_to(cx + s / 2., cy);
            cr.line_to(cx - s / 2., cy + s);
        }
        cr.close_path();
        cr.fill()?;
        Ok(())
    }

    fn draw_split_icon(&self, cr: &Context, rect: Rect, split_type: SplitType) -> Result<()> {
        let inset = rect.w.min(rect.h) / 4;
        let inner = Rect::new(
            rect.x + inset,
            rect.y + inset,
            rect.w - 2 * inset,
            rect.h - 2 * inset,
        );
        outline_rect(cr, inner, self.config.text_color, 1.)?;
        let line = match split_type {
            SplitType::Vertical => Rect::new(inner.center().x, inner.y, 1, inner.h),
            SplitType::Horizontal => Rect::new(inner.x, inner.center().y, inner.w, 1),
        };
        fill_rect(cr, line, self.config.text_color)
    }

    fn tab_color(&self, tab: &TabState<'_>, focused: bool) -> Color {
        if tab.urgent {
            self.config.urgent_color
        } else if tab.selected && focused {
            self.config.active_color
        } else if tab.selected {
            self.config.split_color
        } else {
            self.config.inactive_color
        }
    }
}

impl Theme for DefaultTheme {
    fn config(&self) -> &ThemeConfig {
        &self.config
    }

    fn render_background(&self, cr: &Context, area: Rect) -> Result<()> {
        fill_rect(cr, area, self.config.background_color)
    }

    fn render_notebook(&self, cr: &Context, notebook: &NotebookDecoration<'_>) -> Result<()> {
        let layout = notebook.layout;
        fill_rect(cr, layout.bar, self.config.inactive_color)?;

        for (tab, rect) in notebook.tabs.iter().zip(&layout.tabs) {
            if rect.is_empty() {
                continue;
            }
            fill_rect(cr, *rect, self.tab_color(tab, notebook.focused))?;

            let mut text_rect = *rect;
            if tab.selected {
                if let Some(bind) = layout.bind {
                    text_rect = Rect::from_extents(rect.x, rect.y, bind.x, rect.bottom());
                }
            }
            let mut text_color = self.config.text_color;
            if tab.iconic {
                text_color.a *= 0.5;
            }
            self.draw_text(cr, text_rect, tab.title, text_color)?;

            // Separator.
            fill_rect(
                cr,
                Rect::new(rect.right() - 1, rect.y, 1, rect.h),
                self.config.background_color,
            )?;
        }

        if let Some(close) = layout.close {
            self.draw_cross(cr, close, self.config.text_color)?;
        }
        if let Some(bind) = layout.bind {
            self.draw_pin(cr, bind, self.config.text_color)?;
        }
        if let Some(left) = layout.left_arrow {
            fill_rect(cr, left, self.config.split_color)?;
            self.draw_arrow(cr, left, true, self.config.text_color)?;
        }
        if let Some(right) = layout.right_arrow {
            fill_rect(cr, right, self.config.split_color)?;
            self.draw_arrow(cr, right, false, self.config.text_color)?;
        }
        self.draw_split_icon(cr, layout.hsplit, SplitType::Horizontal)?;
        self.draw_split_icon(cr, layout.vsplit, SplitType::Vertical)?;

        // Margin around the client area.
        let body = Rect::from_extents(
            notebook.allocation.x,
            layout.bar.bottom(),
            notebook.allocation.right(),
            notebook.allocation.bottom(),
        );
        let border = if notebook.focused {
            self.config.active_color
        } else {
            self.config.inactive_color
        };
        fill_rect(cr, body, border)?;
        if notebook.tabs.iter().all(|tab| !tab.selected || tab.iconic) {
            fill_rect(cr, layout.client_area, self.config.background_color)?;
        }
        Ok(())
    }

    fn render_split(&self, cr: &Context, bar: Rect, split_type: SplitType) -> Result<()> {
        fill_rect(cr, bar, self.config.split_color)?;
        let grip = match split_type {
            SplitType::Vertical => Rect::new(bar.center().x, bar.center().y - 10, 1, 20),
            SplitType::Horizontal => Rect::new(bar.center().x - 10, bar.center().y, 20, 1),
        };
        let grip = grip.intersection(&bar).unwrap_or_default();
        fill_rect(cr, grip, self.config.inactive_color)
    }

    fn render_floating(&self, cr: &Context, floating: &FloatingDecoration<'_>) -> Result<()> {
        let layout = floating.layout;
        let color = if floating.urgent {
            self.config.urgent_color
        } else if floating.focused {
            self.config.active_color
        } else {
            self.config.inactive_color
        };
        fill_rect(cr, layout.frame, color)?;

        let text = Rect::from_extents(
            layout.title.x,
            layout.title.y,
            layout.bind.x.max(layout.title.x),
            layout.title.bottom(),
        );
        self.draw_text(cr, text, floating.title, self.config.text_color)?;
        self.draw_pin(cr, layout.bind, self.config.text_color)?;
        self.draw_cross(cr, layout.close, self.config.text_color)?;
        Ok(())
    }

    fn render_overlay(&self, cr: &Context, overlay: &OverlayKind, size: (i32, i32)) -> Result<()> {
        let area = Rect::new(0, 0, size.0, size.1);
        match overlay {
            OverlayKind::SplitPreview {
                split_type,
                pack0,
                bar,
                pack1,
            } => {
                // Coordinates are relative to the split allocation.
                fill_rect(cr, area, Color { a: 0.25, ..self.config.overlay_color })?;
                outline_rect(cr, *pack0, self.config.overlay_color, 2.)?;
                outline_rect(cr, *pack1, self.config.overlay_color, 2.)?;
                self.render_split(cr, *bar, *split_type)
            }
            OverlayKind::DropPreview => {
                fill_rect(cr, area, self.config.overlay_color)?;
                outline_rect(cr, area, self.config.active_color, 2.)
            }
            OverlayKind::Ghost { title } => {
                fill_rect(cr, area, Color { a: 0.8, ..self.config.active_color })?;
                self.draw_text(cr, area, title, self.config.text_color)
            }
            OverlayKind::AltTab { entries, selected } => {
                self.render_alt_tab(cr, entries, *selected, size)
            }
        }
    }

    fn render_alt_tab(
        &self,
        cr: &Context,
        entries: &[AltTabEntry],
        selected: usize,
        size: (i32, i32),
    ) -> Result<()> {
        let area = Rect::new(0, 0, size.0, size.1);
        fill_rect(cr, area, self.config.background_color)?;
        outline_rect(cr, area, self.config.inactive_color, 1.)?;

        let row = alt_tab_row_height(self.config.notebook_tab_height);
        for (idx, entry) in entries.iter().enumerate() {
            let rect = Rect::new(4, 4 + idx as i32 * row, size.0 - 8, row);
            if idx == selected {
                fill_rect(cr, rect, self.config.active_color)?;
            }
            let color = if entry.urgent {
                self.config.urgent_color
            } else {
                self.config.text_color
            };
            self.draw_text(cr, rect, &entry.title, color)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::notebook::{compute_tab_bar, TabMetrics};

    fn pixel(image: &Image, x: i32, y: i32) -> [u8; 4] {
        let idx = ((y * image.width + x) * 4) as usize;
        [
            image.data[idx],
            image.data[idx + 1],
            image.data[idx + 2],
            image.data[idx + 3],
        ]
    }

    /// Byte order of a premultiplied opaque colour in a little-endian ARGB32 image.
    fn bgra(color: Color) -> [u8; 4] {
        let argb = color.to_argb32_premul();
        argb.to_le_bytes()
    }

    #[test]
    fn titles_are_sanitized() {
        assert_eq!(sanitize_title("  hello "), "hello");
        assert_eq!(sanitize_title("a\nb"), "a b");
        assert_eq!(sanitize_title("\t\n"), "untitled");
        assert_eq!(sanitize_title(""), "untitled");
    }

    #[test]
    fn rasterize_packs_rows() {
        let image = rasterize(3, 2, |cr| {
            cr.set_source_rgba(1., 0., 0., 1.);
            cr.paint()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(image.data.len(), 3 * 2 * 4);
        assert_eq!(pixel(&image, 2, 1), [0, 0, 255, 255]);

        assert!(rasterize(0, 10, |_| Ok(())).is_err());
    }

    #[test]
    fn split_bar_is_filled() {
        let theme = DefaultTheme::new(ThemeConfig::default());
        let image = rasterize(8, 100, |cr| {
            theme.render_split(cr, Rect::new(0, 0, 8, 100), SplitType::Vertical)
        })
        .unwrap();
        assert_eq!(pixel(&image, 0, 0), bgra(theme.config().split_color));
    }

    #[test]
    fn selected_tab_uses_active_color() {
        let theme = DefaultTheme::new(ThemeConfig::default());
        let metrics = TabMetrics::default();
        let alloc = Rect::new(0, 0, 400, 200);
        let layout = compute_tab_bar(alloc, 2, Some(1), 0, &metrics);
        let decoration = NotebookDecoration {
            allocation: alloc,
            layout: &layout,
            tabs: vec![
                TabState {
                    title: "first",
                    selected: false,
                    iconic: false,
                    urgent: false,
                },
                TabState {
                    title: "second",
                    selected: true,
                    iconic: false,
                    urgent: false,
                },
            ],
            focused: true,
        };
        let image = rasterize(400, 200, |cr| theme.render_notebook(cr, &decoration)).unwrap();

        let first = layout.tabs[0];
        let second = layout.tabs[1];
        assert_eq!(pixel(&image, second.x + 1, second.y + 1), bgra(theme.config().active_color));
        assert_eq!(pixel(&image, first.x + 1, first.y + 1), bgra(theme.config().inactive_color));
    }
}
