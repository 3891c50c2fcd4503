use std::collections::HashSet;
use std::str::FromStr;

use bitflags::bitflags;
use knuffel::errors::DecodeError;
use miette::miette;
use xkbcommon::xkb::keysyms::KEY_NoSymbol;
use xkbcommon::xkb::{keysym_from_name, Keysym, KEYSYM_CASE_INSENSITIVE};

use crate::utils::expect_only_children;

#[derive(Debug, Clone, PartialEq)]
pub struct Binds(pub Vec<Bind>);

#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub key: Key,
    pub action: Action,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Key {
    pub keysym: Keysym,
    pub modifiers: Modifiers,
}

bitflags! {
    /// Modifier state, laid out like the core X11 modifier mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers : u16 {
        const SHIFT = 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        const ISO_LEVEL5_SHIFT = 1 << 5;
        const SUPER = 1 << 6;
        const ISO_LEVEL3_SHIFT = 1 << 7;
    }
}

// Remember to document new actions in resources/default-config.kdl too.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    ToggleFullscreen,
    ToggleFloating,
    ToggleCompositor,
    CloseWindow,
    FocusNext,
    WorkspaceLeft,
    WorkspaceRight,
    SplitHorizontal,
    SplitVertical,
    Spawn(#[knuffel(arguments)] Vec<String>),
}

impl Default for Binds {
    fn default() -> Self {
        let defaults = [
            ("Super+Shift+Q", Action::Quit),
            ("Super+F", Action::ToggleFullscreen),
            ("Super+Shift+F", Action::ToggleFloating),
            ("Super+C", Action::ToggleCompositor),
            ("Super+Shift+C", Action::CloseWindow),
            ("Alt+Tab", Action::FocusNext),
            ("Super+Left", Action::WorkspaceLeft),
            ("Super+Right", Action::WorkspaceRight),
            ("Super+H", Action::SplitHorizontal),
            ("Super+V", Action::SplitVertical),
            ("Super+Return", Action::Spawn(vec![String::from("xterm")])),
        ];

        Self(
            defaults
                .into_iter()
                .filter_map(|(key, action)| {
                    let key = key.parse::<Key>().ok()?;
                    Some(Bind { key, action })
                })
                .collect(),
        )
    }
}

impl Binds {
    pub fn find(&self, key: Key) -> Option<&Bind> {
        self.0.iter().find(|bind| bind.key == key)
    }
}

impl<S> knuffel::Decode<S> for Binds
where
    S: knuffel::traits::ErrorSpan,
{
    fn decode_node(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        expect_only_children(node, ctx);

        let mut seen_keys = HashSet::new();
        let mut binds = Vec::new();

        for child in node.children() {
            match Bind::decode_node(child, ctx) {
                Err(e) => {
                    ctx.emit_error(e);
                }
                Ok(bind) => {
                    if seen_keys.insert(bind.key) {
                        binds.push(bind);
                    } else {
                        ctx.emit_error(DecodeError::unexpected(
                            &child.node_name,
                            "keybind",
                            "duplicate keybind",
                        ));
                    }
                }
            }
        }

        Ok(Self(binds))
    }
}

impl<S> knuffel::Decode<S> for Bind
where
    S: knuffel::traits::ErrorSpan,
{
    fn decode_node(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        expect_only_children(node, ctx);

        let key = node
            .node_name
            .parse::<Key>()
            .map_err(|e| DecodeError::conversion(&node.node_name, e.wrap_err("invalid keybind")))?;

        let mut children = node.children();

        // A broken action still yields a bind so that duplicate keys get reported.
        let dummy = Self {
            key,
            action: Action::Spawn(vec![]),
        };

        if let Some(child) = children.next() {
            for unwanted_child in children {
                ctx.emit_error(DecodeError::unexpected(
                    unwanted_child,
                    "node",
                    "only one action is allowed per keybind",
                ));
            }
            match Action::decode_node(child, ctx) {
                Ok(action) => Ok(Self { key, action }),
                Err(e) => {
                    ctx.emit_error(e);
                    Ok(dummy)
                }
            }
        } else {
            ctx.emit_error(DecodeError::missing(
                node,
                "expected an action for this keybind",
            ));
            Ok(dummy)
        }
    }
}

impl FromStr for Key {
    type Err = miette::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::empty();

        let mut split = s.split('+');
        let key = split.next_back().unwrap_or_default();

        for part in split {
            let part = part.trim();
            if part.eq_ignore_ascii_case("ctrl") || part.eq_ignore_ascii_case("control") {
                modifiers |= Modifiers::CTRL;
            } else if part.eq_ignore_ascii_case("shift") {
                modifiers |= Modifiers::SHIFT;
            } else if part.eq_ignore_ascii_case("alt") || part.eq_ignore_ascii_case("mod1") {
                modifiers |= Modifiers::ALT;
            } else if part.eq_ignore_ascii_case("super")
                || part.eq_ignore_ascii_case("win")
                || part.eq_ignore_ascii_case("mod4")
                || part.eq_ignore_ascii_case("mod")
            {
                modifiers |= Modifiers::SUPER;
            } else if part.eq_ignore_ascii_case("iso_level3_shift")
                || part.eq_ignore_ascii_case("mod5")
            {
                modifiers |= Modifiers::ISO_LEVEL3_SHIFT;
            } else if part.eq_ignore_ascii_case("iso_level5_shift")
                || part.eq_ignore_ascii_case("mod3")
            {
                modifiers |= Modifiers::ISO_LEVEL5_SHIFT;
            } else {
                return Err(miette!("invalid modifier: {part}"));
            }
        }

        let keysym = keysym_from_name(key.trim(), KEYSYM_CASE_INSENSITIVE);
        if keysym.raw() == KEY_NoSymbol {
            return Err(miette!("invalid key: {key}"));
        }

        Ok(Key { keysym, modifiers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modifiers() {
        assert_eq!(
            "Mod4+Shift+q".parse::<Key>().unwrap(),
            Key {
                keysym: Keysym::q,
                modifiers: Modifiers::SUPER | Modifiers::SHIFT,
            },
        );
        assert_eq!(
            "Alt+Tab".parse::<Key>().unwrap(),
            Key {
                keysym: Keysym::Tab,
                modifiers: Modifiers::ALT,
            },
        );
    }

    #[test]
    fn parse_iso_level_shifts() {
        assert_eq!(
            "ISO_Level3_Shift+A".parse::<Key>().unwrap(),
            Key {
                keysym: Keysym::a,
                modifiers: Modifiers::ISO_LEVEL3_SHIFT
            },
        );
        assert_eq!(
            "Mod3+A".parse::<Key>().unwrap(),
            Key {
                keysym: Keysym::a,
                modifiers: Modifiers::ISO_LEVEL5_SHIFT
            },
        );
    }

    #[test]
    fn reject_unknown_modifier() {
        assert!("Hyper+A".parse::<Key>().is_err());
        assert!("Super+NotAKeyAtAll".parse::<Key>().is_err());
    }

    #[test]
    fn default_binds_are_unique() {
        let binds = Binds::default();
        let unique: HashSet<_> = binds.0.iter().map(|bind| bind.key).collect();
        assert_eq!(unique.len(), binds.0.len());
        assert!(binds
            .find("Alt+Tab".parse().unwrap())
            .is_some_and(|bind| bind.action == Action::FocusNext));
    }
}
