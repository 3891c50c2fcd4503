//! Configuration file model of the PAGE window manager.
//!
//! The file is KDL, decoded with knuffel. Every section is optional and falls back to the
//! built-in defaults.

#[macro_use]
extern crate tracing;

use std::path::{Path, PathBuf};

use miette::{Context as _, IntoDiagnostic as _};

pub mod binds;
pub mod theme;
pub mod utils;

pub use crate::binds::{Action, Bind, Binds, Key, Modifiers};
pub use crate::theme::{Margins, Theme};
pub use crate::utils::Color;
pub use xkbcommon::xkb::Keysym;

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub theme: Theme,
    #[knuffel(child, default)]
    pub compositor: Compositor,
    #[knuffel(child, default)]
    pub layout: Layout,
    #[knuffel(child, default)]
    pub binds: Binds,
    #[knuffel(children(name = "exec-on-startup"))]
    pub exec_on_startup: Vec<ExecOnStartup>,
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Compositor {
    #[knuffel(child)]
    pub off: bool,
    #[knuffel(child, unwrap(argument), default = Compositor::default().fade_in_ms)]
    pub fade_in_ms: u32,
    #[knuffel(child, unwrap(argument), default = Compositor::default().fade_out_ms)]
    pub fade_out_ms: u32,
    #[knuffel(child, unwrap(argument), default = Compositor::default().frame_interval_ms)]
    pub frame_interval_ms: u32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            off: false,
            fade_in_ms: 120,
            fade_out_ms: 120,
            frame_interval_ms: 16,
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Layout {
    #[knuffel(child, unwrap(argument), default = Layout::default().default_split_ratio)]
    pub default_split_ratio: f64,
    #[knuffel(child, unwrap(argument), default = Layout::default().workspace_count)]
    pub workspace_count: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            default_split_ratio: 0.5,
            workspace_count: 4,
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ExecOnStartup {
    #[knuffel(arguments)]
    pub command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            compositor: Compositor::default(),
            layout: Layout::default(),
            binds: Binds::default(),
            exec_on_startup: Vec::new(),
        }
    }
}

impl Config {
    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = trace_span!("Config::parse").entered();
        knuffel::parse(filename, text)
    }

    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(|x| x.to_str())
                .unwrap_or("config.kdl"),
            &contents,
        )
        .map_err(miette::Report::new)
        .context("error parsing")?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }

    /// Loads the config at `path`, or the defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> miette::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("{path:?} does not exist, using the default config");
            Ok(Self::default())
        }
    }

    /// Ratio clamped to the range every split accepts.
    pub fn split_ratio(&self) -> f64 {
        self.layout.default_split_ratio.clamp(0.05, 0.95)
    }
}

/// `$XDG_CONFIG_HOME/page/config.kdl`, when a config dir can be determined.
pub fn default_config_path(config_home: Option<PathBuf>) -> Option<PathBuf> {
    config_home.map(|dir| dir.join("page").join("config.kdl"))
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;

    #[track_caller]
    fn do_parse(text: &str) -> Config {
        Config::parse("test.kdl", text)
            .map_err(miette::Report::new)
            .unwrap()
    }

    #[test]
    fn empty_config_is_default() {
        let parsed = do_parse("");
        assert_eq!(parsed.theme, Theme::default());
        assert_eq!(parsed.compositor, Compositor::default());
        assert_eq!(parsed.layout, Layout::default());
        assert!(parsed.exec_on_startup.is_empty());
    }

    #[test]
    fn parse_theme_and_binds() {
        let parsed = do_parse(
            r##"
            theme {
                font "Monospace 9"
                notebook-tab-height 30
                split-width 12
                notebook-margin top=1 bottom=2 left=3 right=4
                active-color "#ff0000"
            }

            compositor {
                off
                fade-in-ms 0
            }

            layout {
                default-split-ratio 0.3
                workspace-count 2
            }

            binds {
                Mod4+Return { spawn "alacritty" "-e" "htop"; }
                Super+F { toggle-fullscreen; }
            }

            exec-on-startup "nm-applet"
            "##,
        );

        assert_eq!(parsed.theme.font, "Monospace 9");
        assert_eq!(parsed.theme.notebook_tab_height, 30);
        assert_eq!(parsed.theme.split_width, 12);
        assert_eq!(parsed.theme.notebook_margin, Margins::new(1, 2, 3, 4));
        assert_eq!(parsed.theme.active_color, Color::new_unpremul(1., 0., 0., 1.));
        assert!(parsed.compositor.off);
        assert_eq!(parsed.compositor.fade_in_ms, 0);
        assert_eq!(parsed.compositor.fade_out_ms, 120);
        assert_eq!(parsed.layout.workspace_count, 2);
        assert_eq!(parsed.split_ratio(), 0.3);
        assert_eq!(
            parsed.exec_on_startup,
            vec![ExecOnStartup {
                command: vec![String::from("nm-applet")]
            }]
        );

        assert_debug_snapshot!(
            parsed.binds.0.iter().map(|bind| &bind.action).collect::<Vec<_>>(),
            @r#"
        [
            Spawn(
                [
                    "alacritty",
                    "-e",
                    "htop",
                ],
            ),
            ToggleFullscreen,
        ]
        "#
        );
    }

    #[test]
    fn duplicate_binds_are_rejected() {
        let result = Config::parse(
            "test.kdl",
            r#"
            binds {
                Super+F { toggle-fullscreen; }
                Mod4+f { quit; }
            }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn split_ratio_is_clamped() {
        let parsed = do_parse("layout { default-split-ratio 1.5; }");
        assert_eq!(parsed.split_ratio(), 0.95);
    }

    #[test]
    fn default_config_file_parses() {
        let parsed = do_parse(include_str!("../../resources/default-config.kdl"));
        assert_eq!(parsed.binds, Binds::default());
    }
}
