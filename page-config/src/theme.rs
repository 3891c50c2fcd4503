use crate::utils::Color;

/// Per-edge pixel margins.
#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    #[knuffel(property, default)]
    pub top: i32,
    #[knuffel(property, default)]
    pub bottom: i32,
    #[knuffel(property, default)]
    pub left: i32,
    #[knuffel(property, default)]
    pub right: i32,
}

impl Margins {
    pub const fn uniform(value: i32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }

    pub const fn new(top: i32, bottom: i32, left: i32, right: i32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

/// Geometry constants and colours of the decorations.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Theme {
    #[knuffel(child, unwrap(argument), default = Theme::default().font)]
    pub font: String,
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_tab_height)]
    pub notebook_tab_height: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_tab_min_width)]
    pub notebook_tab_min_width: i32,
    /// Tabs never grow wider than this; the rest of the bar stays empty.
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_tab_max_width)]
    pub notebook_tab_max_width: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_button_width)]
    pub notebook_button_width: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_scroll_arrow_width)]
    pub notebook_scroll_arrow_width: i32,
    #[knuffel(child, default = Theme::default().notebook_margin)]
    pub notebook_margin: Margins,
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_min_width)]
    pub notebook_min_width: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().notebook_min_height)]
    pub notebook_min_height: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().split_width)]
    pub split_width: i32,
    #[knuffel(child, default = Theme::default().floating_margin)]
    pub floating_margin: Margins,
    #[knuffel(child, unwrap(argument), default = Theme::default().floating_title_height)]
    pub floating_title_height: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().grip_size)]
    pub grip_size: i32,
    #[knuffel(child, unwrap(argument), default = Theme::default().background_color)]
    pub background_color: Color,
    #[knuffel(child, unwrap(argument), default = Theme::default().active_color)]
    pub active_color: Color,
    #[knuffel(child, unwrap(argument), default = Theme::default().inactive_color)]
    pub inactive_color: Color,
    #[knuffel(child, unwrap(argument), default = Theme::default().text_color)]
    pub text_color: Color,
    #[knuffel(child, unwrap(argument), default = Theme::default().urgent_color)]
    pub urgent_color: Color,
    #[knuffel(child, unwrap(argument), default = Theme::default().split_color)]
    pub split_color: Color,
    #[knuffel(child, unwrap(argument), default = Theme::default().overlay_color)]
    pub overlay_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            font: String::from("Sans 10"),
            notebook_tab_height: 22,
            notebook_tab_min_width: 80,
            notebook_tab_max_width: 240,
            notebook_button_width: 18,
            notebook_scroll_arrow_width: 16,
            notebook_margin: Margins::new(0, 3, 3, 3),
            notebook_min_width: 100,
            notebook_min_height: 60,
            split_width: 8,
            floating_margin: Margins::new(0, 5, 5, 5),
            floating_title_height: 22,
            grip_size: 24,
            background_color: Color::from_rgba8_unpremul(0x2e, 0x34, 0x36, 0xff),
            active_color: Color::from_rgba8_unpremul(0x34, 0x65, 0xa4, 0xff),
            inactive_color: Color::from_rgba8_unpremul(0x55, 0x57, 0x53, 0xff),
            text_color: Color::from_rgba8_unpremul(0xee, 0xee, 0xec, 0xff),
            urgent_color: Color::from_rgba8_unpremul(0xcc, 0x00, 0x00, 0xff),
            split_color: Color::from_rgba8_unpremul(0x3c, 0x3f, 0x41, 0xff),
            overlay_color: Color::from_rgba8_unpremul(0x72, 0x9f, 0xcf, 0x80),
        }
    }
}
