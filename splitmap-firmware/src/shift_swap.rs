//! Shift swap: one key with a symbol for each shift state.

use splitmap_common::keycodes::modifiers::SHIFT_MASK;

/// `shifted` when either shift is held in `modifiers`, otherwise `primary`.
pub const fn resolve(modifiers: u8, primary: u16, shifted: u16) -> u16 {
    if modifiers & SHIFT_MASK != 0 {
        shifted
    } else {
        primary
    }
}

/// The shift bits that must be lifted while the resolved symbol is sent.
pub const fn held_shift(modifiers: u8) -> u8 {
    modifiers & SHIFT_MASK
}

#[cfg(test)]
#[path = "shift_swap_test.rs"]
mod test;
