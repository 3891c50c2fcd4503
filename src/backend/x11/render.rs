//! Compositing over the Composite, Damage and Render extensions.

use std::collections::HashMap;

use anyhow::Context as _;
use page_config::Color;
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::composite::{self, ConnectionExt as _, Redirect};
use x11rb::protocol::damage::{self, ConnectionExt as _, Damage, ReportLevel};
use x11rb::protocol::render::{
    self, ConnectionExt as _, CreatePictureAux, PictOp, Pictformat, Picture,
};
use x11rb::protocol::shape::SK;
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    ConnectionExt as _, Pixmap, Rectangle, Screen, SubwindowMode, VisualClass, Visualid,
};
use x11rb::rust_connection::RustConnection;
use x11rb::NONE;

use super::{clamp_i16, clamp_u16, log_err, X11Backend};
use crate::backend::{Operator, RenderBackend, Target, Window};
use crate::region::{Point, Rect, Region};

struct Surface {
    damage: Damage,
    format: Pictformat,
    contents: Option<(Pixmap, Picture)>,
}

/// Pictures the compositor draws into while enabled.
struct Output {
    overlay: Window,
    front: Picture,
    back_pixmap: Pixmap,
    back: Picture,
}

pub(super) struct Renderer {
    root: Window,
    root_depth: u8,
    root_format: Pictformat,
    screen: Rect,
    formats: HashMap<Visualid, Pictformat>,
    argb: Option<(u8, Visualid)>,
    surfaces: HashMap<Window, Surface>,
    output: Option<Output>,
}

fn rectangles(region: &Region) -> Vec<Rectangle> {
    region
        .rects()
        .iter()
        .map(|r| Rectangle {
            x: clamp_i16(r.x),
            y: clamp_i16(r.y),
            width: clamp_u16(r.w),
            height: clamp_u16(r.h),
        })
        .collect()
}

fn render_color(color: Color) -> render::Color {
    let a = color.a.clamp(0., 1.);
    let channel = |c: f32| (c.clamp(0., 1.) * a * 65535.).round() as u16;
    render::Color {
        red: channel(color.r),
        green: channel(color.g),
        blue: channel(color.b),
        alpha: (a * 65535.).round() as u16,
    }
}

impl Renderer {
    pub fn new(conn: &RustConnection, screen: &Screen) -> anyhow::Result<Self> {
        for (name, ext) in [
            ("Composite", composite::X11_EXTENSION_NAME),
            ("Damage", damage::X11_EXTENSION_NAME),
            ("XFixes", xfixes::X11_EXTENSION_NAME),
            ("Render", render::X11_EXTENSION_NAME),
        ] {
            conn.extension_information(ext)?
                .with_context(|| format!("{name} extension not available"))?;
        }

        let version = conn
            .composite_query_version(0, 4)?
            .reply()
            .context("error querying the Composite version")?;
        info!(
            "using Composite {}.{}",
            version.major_version, version.minor_version
        );
        conn.xfixes_query_version(5, 0)?.reply()?;
        conn.damage_query_version(1, 1)?.reply()?;

        let pict_formats = conn.render_query_pict_formats()?.reply()?;
        let formats: HashMap<Visualid, Pictformat> = pict_formats
            .screens
            .iter()
            .flat_map(|s| &s.depths)
            .flat_map(|d| &d.visuals)
            .map(|v| (v.visual, v.format))
            .collect();
        let root_format = *formats
            .get(&screen.root_visual)
            .context("no picture format for the root visual")?;

        let argb = screen
            .allowed_depths
            .iter()
            .filter(|d| d.depth == 32)
            .flat_map(|d| d.visuals.iter().map(move |v| (d.depth, v)))
            .find(|(_, v)| v.class == VisualClass::TRUE_COLOR)
            .map(|(depth, v)| (depth, v.visual_id));
        if argb.is_none() {
            warn!("no 32-bit visual, overlays will be opaque");
        }

        Ok(Self {
            root: screen.root,
            root_depth: screen.root_depth,
            root_format,
            screen: Rect::new(
                0,
                0,
                screen.width_in_pixels.into(),
                screen.height_in_pixels.into(),
            ),
            formats,
            argb,
            surfaces: HashMap::new(),
            output: None,
        })
    }

    pub fn argb_visual(&self) -> Option<(u8, Visualid)> {
        self.argb
    }

    pub fn acknowledge_damage(&self, conn: &RustConnection, damage: Damage) {
        log_err(conn.damage_subtract(damage, NONE, NONE), "subtracting damage");
    }

    pub fn resize(&mut self, conn: &RustConnection, screen: Rect) {
        self.screen = screen;
        if self.output.is_some() {
            self.disable_output(conn);
            if let Err(err) = self.enable_output(conn) {
                warn!("error recreating the compositor output: {err:?}");
            }
        }
    }

    fn create_back_buffer(&self, conn: &RustConnection) -> anyhow::Result<(Pixmap, Picture)> {
        let pixmap = conn.generate_id()?;
        conn.create_pixmap(
            self.root_depth,
            pixmap,
            self.root,
            clamp_u16(self.screen.w),
            clamp_u16(self.screen.h),
        )?;
        let picture = conn.generate_id()?;
        conn.render_create_picture(picture, pixmap, self.root_format, &CreatePictureAux::new())?;
        Ok((pixmap, picture))
    }

    fn enable_output(&mut self, conn: &RustConnection) -> anyhow::Result<()> {
        conn.composite_redirect_subwindows(self.root, Redirect::MANUAL)?
            .check()
            .context("another compositing manager is running")?;

        let overlay = conn
            .composite_get_overlay_window(self.root)?
            .reply()?
            .overlay_win;

        // The overlay only displays; input goes through to the windows below.
        let region = conn.generate_id()?;
        conn.xfixes_create_region(region, &[])?;
        conn.xfixes_set_window_shape_region(overlay, SK::INPUT, 0, 0, region)?;
        conn.xfixes_destroy_region(region)?;

        let front = conn.generate_id()?;
        conn.render_create_picture(
            front,
            overlay,
            self.root_format,
            &CreatePictureAux::new().subwindowmode(SubwindowMode::INCLUDE_INFERIORS),
        )?;
        let (back_pixmap, back) = self.create_back_buffer(conn)?;

        self.output = Some(Output {
            overlay,
            front,
            back_pixmap,
            back,
        });
        Ok(())
    }

    fn disable_output(&mut self, conn: &RustConnection) {
        let Some(output) = self.output.take() else {
            return;
        };
        log_err(conn.render_free_picture(output.front), "freeing a picture");
        log_err(conn.render_free_picture(output.back), "freeing a picture");
        log_err(conn.free_pixmap(output.back_pixmap), "freeing a pixmap");
        log_err(
            conn.composite_release_overlay_window(self.root),
            "releasing the overlay window",
        );
        log_err(
            conn.composite_unredirect_subwindows(self.root, Redirect::MANUAL),
            "unredirecting windows",
        );
        debug!("released overlay window {:#x}", output.overlay);
    }

    fn target(&self, target: Target) -> Option<Picture> {
        let output = self.output.as_ref()?;
        Some(match target {
            Target::Front => output.front,
            Target::BackBuffer => output.back,
        })
    }

    /// Picture of the window contents, named lazily after each resize.
    fn contents(&mut self, conn: &RustConnection, window: Window) -> Option<Picture> {
        let surface = self.surfaces.get_mut(&window)?;
        if let Some((_, picture)) = surface.contents {
            return Some(picture);
        }

        let pixmap = conn.generate_id().ok()?;
        conn.composite_name_window_pixmap(window, pixmap).ok()?;
        let picture = conn.generate_id().ok()?;
        conn.render_create_picture(
            picture,
            pixmap,
            surface.format,
            &CreatePictureAux::new().subwindowmode(SubwindowMode::INCLUDE_INFERIORS),
        )
        .ok()?;
        surface.contents = Some((pixmap, picture));
        Some(picture)
    }

    fn release_contents(conn: &RustConnection, surface: &mut Surface) {
        if let Some((pixmap, picture)) = surface.contents.take() {
            log_err(conn.render_free_picture(picture), "freeing a picture");
            log_err(conn.free_pixmap(pixmap), "freeing a pixmap");
        }
    }

    fn set_clip(conn: &RustConnection, picture: Picture, clip: &Region) {
        log_err(
            conn.render_set_picture_clip_rectangles(picture, 0, 0, &rectangles(clip)),
            "setting a clip",
        );
    }
}

impl RenderBackend for X11Backend {
    fn create_surface(&mut self, window: Window) -> anyhow::Result<()> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        let format = self
            .renderer
            .formats
            .get(&attrs.visual)
            .copied()
            .unwrap_or(self.renderer.root_format);

        let damage = self.conn.generate_id()?;
        self.conn
            .damage_create(damage, window, ReportLevel::BOUNDING_BOX)?;
        self.renderer.surfaces.insert(
            window,
            Surface {
                damage,
                format,
                contents: None,
            },
        );
        Ok(())
    }

    fn refresh_surface(&mut self, window: Window) {
        if let Some(surface) = self.renderer.surfaces.get_mut(&window) {
            Renderer::release_contents(&self.conn, surface);
        }
    }

    fn destroy_surface(&mut self, window: Window) {
        if let Some(mut surface) = self.renderer.surfaces.remove(&window) {
            Renderer::release_contents(&self.conn, &mut surface);
            log_err(self.conn.damage_destroy(surface.damage), "destroying damage");
        }
    }

    fn paint(
        &mut self,
        target: Target,
        window: Window,
        origin: Point,
        clip: &Region,
        op: Operator,
        opacity: f64,
    ) {
        if clip.is_empty() {
            return;
        }
        let Some(dst) = self.renderer.target(target) else {
            return;
        };
        let Some(src) = self.renderer.contents(&self.conn, window) else {
            trace!("no contents for {window:#x}");
            return;
        };

        let mask = if opacity < 1. {
            let alpha = (opacity.clamp(0., 1.) * 65535.).round() as u16;
            let color = render::Color {
                red: 0,
                green: 0,
                blue: 0,
                alpha,
            };
            self.conn.generate_id().ok().filter(|&mask| {
                self.conn.render_create_solid_fill(mask, color).is_ok()
            })
        } else {
            None
        };

        let op = match op {
            Operator::Source => PictOp::SRC,
            Operator::Over => PictOp::OVER,
        };
        let ext = clip.extents();
        Renderer::set_clip(&self.conn, dst, clip);
        log_err(
            self.conn.render_composite(
                op,
                src,
                mask.unwrap_or(NONE),
                dst,
                clamp_i16(ext.x - origin.x),
                clamp_i16(ext.y - origin.y),
                0,
                0,
                clamp_i16(ext.x),
                clamp_i16(ext.y),
                clamp_u16(ext.w),
                clamp_u16(ext.h),
            ),
            "compositing a window",
        );
        if let Some(mask) = mask {
            log_err(self.conn.render_free_picture(mask), "freeing a picture");
        }
    }

    fn fill(&mut self, target: Target, clip: &Region, color: Color) {
        let Some(dst) = self.renderer.target(target) else {
            return;
        };
        Renderer::set_clip(&self.conn, dst, clip);
        log_err(
            self.conn
                .render_fill_rectangles(PictOp::SRC, dst, render_color(color), &rectangles(clip)),
            "filling",
        );
    }

    fn copy_back_buffer(&mut self, clip: &Region) {
        let Some(output) = &self.renderer.output else {
            return;
        };
        if clip.is_empty() {
            return;
        }
        let ext = clip.extents();
        Renderer::set_clip(&self.conn, output.front, clip);
        log_err(
            self.conn.render_composite(
                PictOp::SRC,
                output.back,
                NONE,
                output.front,
                clamp_i16(ext.x),
                clamp_i16(ext.y),
                0,
                0,
                clamp_i16(ext.x),
                clamp_i16(ext.y),
                clamp_u16(ext.w),
                clamp_u16(ext.h),
            ),
            "copying the back buffer",
        );
    }

    fn present(&mut self) {
        log_err(self.conn.flush(), "flushing a frame");
    }

    fn set_compositing(&mut self, enabled: bool) -> anyhow::Result<()> {
        if enabled == self.renderer.output.is_some() {
            return Ok(());
        }
        if enabled {
            self.renderer.enable_output(&self.conn)?;
        } else {
            let windows: Vec<Window> = self.renderer.surfaces.keys().copied().collect();
            for window in windows {
                self.destroy_surface(window);
            }
            self.renderer.disable_output(&self.conn);
        }
        self.conn.flush()?;
        Ok(())
    }
}
