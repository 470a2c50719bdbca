pub const DUAL_ACTION_TIMEOUT: u16 = 0;
pub const DUAL_ACTION_TIMEOUT2: u16 = 1;
pub const TAPDANCE_TAP_TIMEOUT: u16 = 2;
pub const CAPS_WORD_IDLE_TIMEOUT: u16 = 3;
pub const TRI_LAYER: u16 = 4;

pub const GLOBALS_LEN: usize = 5;

pub const DUAL_ACTION_TIMEOUT_DEFAULT: u16 = 180;
pub const DUAL_ACTION_TIMEOUT2_DEFAULT: u16 = 20;
pub const TAPDANCE_TAP_TIMEOUT_DEFAULT: u16 = 180;
pub const CAPS_WORD_IDLE_TIMEOUT_DEFAULT: u16 = 5000;
pub const TRI_LAYER_NONE: u16 = u16::MAX;

pub const DEFAULTS: [u16; GLOBALS_LEN] = [
    DUAL_ACTION_TIMEOUT_DEFAULT,
    DUAL_ACTION_TIMEOUT2_DEFAULT,
    TAPDANCE_TAP_TIMEOUT_DEFAULT,
    CAPS_WORD_IDLE_TIMEOUT_DEFAULT,
    TRI_LAYER_NONE,
];

/// Pack the two trigger layers and the result layer of a tri-layer into one global value.
///
/// ```
/// use splitmap_common::globals::{pack_tri_layer, unpack_tri_layer};
///
/// let v = pack_tri_layer(7, 5, 9);
/// assert_eq!(unpack_tri_layer(v), Some((7, 5, 9)));
/// ```
pub const fn pack_tri_layer(a: u8, b: u8, result: u8) -> u16 {
    (a as u16 & 0x1f) | ((b as u16 & 0x1f) << 5) | ((result as u16 & 0x1f) << 10)
}

pub const fn unpack_tri_layer(value: u16) -> Option<(u8, u8, u8)> {
    if value == TRI_LAYER_NONE {
        None
    } else {
        Some((
            (value & 0x1f) as u8,
            ((value >> 5) & 0x1f) as u8,
            ((value >> 10) & 0x1f) as u8,
        ))
    }
}
