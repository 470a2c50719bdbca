use splitmap_common::keycodes::macro_types;

#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Macro {
    /// A keycode sent with extra modifiers; `S-8` for example.
    Modifier { keycode: u16, modifiers: u8 },
    /// tap, hold, hold timeout, tap timeout; `u16::MAX` timeouts use the global values.
    DualAction(u16, u16, u16, u16),
    /// The choices are `len` codes starting at `location` in the layout.
    TapDance { timeout: u16, location: u32, len: u16 },
    ShiftSwap { primary: u16, shifted: u16 },
    Noop,
}
impl Macro {
    /// Decode the macro stored at `location` in the layout.
    pub fn decode(location: usize, data: Option<&[u16]>) -> Self {
        let Some(data) = data else {
            return Macro::Noop;
        };
        let Some(head) = data.first() else {
            return Macro::Noop;
        };
        match (head & 0xff, data) {
            (macro_types::MODIFIER, [_, keycode, ..]) => Macro::Modifier {
                keycode: *keycode,
                modifiers: (head >> 8) as u8,
            },
            (macro_types::DUAL_ACTION, [_, tap, hold]) => {
                Macro::DualAction(*tap, *hold, u16::MAX, u16::MAX)
            }
            (macro_types::DUAL_ACTION, [_, tap, hold, t1]) => {
                Macro::DualAction(*tap, *hold, *t1, u16::MAX)
            }
            (macro_types::DUAL_ACTION, [_, tap, hold, t1, t2, ..]) => {
                Macro::DualAction(*tap, *hold, *t1, *t2)
            }
            (macro_types::TAPDANCE, [_, timeout, _, ..]) => Macro::TapDance {
                timeout: *timeout,
                location: location as u32 + 2,
                len: data.len() as u16 - 2,
            },
            (macro_types::SHIFT_SWAP, [_, primary, shifted, ..]) => Macro::ShiftSwap {
                primary: *primary,
                shifted: *shifted,
            },
            (kind, _) => {
                crate::warn!("unsupported macro {} at {}", kind, location);
                Macro::Noop
            }
        }
    }
}

#[cfg(test)]
#[path = "macros_test.rs"]
mod test;
