use anyhow::Context as _;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GrabMode, Keycode, ModMask, Window};
use x11rb::rust_connection::RustConnection;

/// Modifier combinations grabbed in addition to each binding so that Caps Lock and Num Lock
/// do not break shortcuts.
fn lock_combinations() -> [ModMask; 4] {
    [
        ModMask::from(0u16),
        ModMask::LOCK,
        ModMask::M2,
        ModMask::LOCK | ModMask::M2,
    ]
}

/// Core protocol keycode to keysym table.
pub struct Keymap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl Keymap {
    pub fn load(conn: &RustConnection) -> anyhow::Result<Self> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()
            .context("error getting the keyboard mapping")?;
        Ok(Self {
            min_keycode: min,
            keysyms_per_keycode: usize::from(reply.keysyms_per_keycode),
            keysyms: reply.keysyms,
        })
    }

    /// Unshifted keysym of `keycode`; bindings are matched case-insensitively.
    pub fn keysym(&self, keycode: Keycode) -> u32 {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return 0;
        }
        let idx = usize::from(keycode - self.min_keycode) * self.keysyms_per_keycode;
        self.keysyms.get(idx).copied().unwrap_or(0)
    }

    pub fn keycodes(&self, keysym: u32) -> Vec<Keycode> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .filter_map(|(idx, _)| {
                let idx = u8::try_from(idx).ok()?;
                self.min_keycode.checked_add(idx)
            })
            .collect()
    }

    pub fn grab_keys(&self, conn: &RustConnection, root: Window, keys: &[(u32, u16)]) {
        if let Err(err) = conn.ungrab_key(0, root, ModMask::ANY) {
            warn!("error ungrabbing keys: {err:?}");
            return;
        }

        for &(keysym, modifiers) in keys {
            let keycodes = self.keycodes(keysym);
            if keycodes.is_empty() {
                debug!("no keycode for keysym {keysym:#x}");
                continue;
            }

            for keycode in keycodes {
                for extra in lock_combinations() {
                    let mods = ModMask::from(modifiers) | extra;
                    if let Err(err) =
                        conn.grab_key(true, root, mods, keycode, GrabMode::ASYNC, GrabMode::ASYNC)
                    {
                        warn!("error grabbing key {keycode}: {err:?}");
                    }
                }
            }
        }
    }
}
