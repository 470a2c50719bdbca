pub mod key_range {
    pub const MAX_LAYER_N: u16 = 0xff;

    pub const TRANSPARENT: u16 = 0;
    pub const NOOP: u16 = 1;

    pub const LAYER: u16 = 0x600;
    pub const TOGGLE: u16 = 0x700;
    pub const SET_LAYOUT: u16 = 0x800;
    pub const ONESHOT: u16 = 0x900;
    pub const LAYERS_LAST: u16 = ONESHOT + MAX_LAYER_N;

    pub const BASIC_MIN: u16 = 0x4;
    pub const BASIC_A: u16 = 0x4;
    pub const BASIC_Z: u16 = 0x1d;
    pub const BASIC_1: u16 = 0x1e;
    pub const BASIC_0: u16 = 0x27;
    pub const BASIC_ENTER: u16 = 0x28;
    pub const BASIC_BACKSPACE: u16 = 0x2a;
    pub const BASIC_MINUS: u16 = 0x2d;
    pub const BASIC_DELETE: u16 = 0x4c;
    pub const BASIC_MAX: u16 = 0xdf;
    pub const MODIFIER_MIN: u16 = 0xe0;
    pub const MODIFIER_MAX: u16 = 0xe7;
    pub const CONSUMER_MIN: u16 = 0x100;
    pub const CONSUMER_MAX: u16 = 0x3a0;
    pub const MOUSE_MIN: u16 = 0x400;
    pub const MOUSE_MAX: u16 = MOUSE_MIN + 0xff;
    pub const LIGHTING_MIN: u16 = 0x500;
    pub const LIGHTING_MAX: u16 = LIGHTING_MIN + 0xff;

    pub const LAYER_MIN: u16 = LAYER;
    pub const LAYER_MAX: u16 = LAYER_MIN + MAX_LAYER_N;
    pub const TOGGLE_MIN: u16 = TOGGLE;
    pub const TOGGLE_MAX: u16 = TOGGLE_MIN + MAX_LAYER_N;
    pub const SET_LAYOUT_MIN: u16 = SET_LAYOUT;
    pub const SET_LAYOUT_MAX: u16 = SET_LAYOUT_MIN + MAX_LAYER_N;
    /// One-shot modifiers; the low byte holds the modifier bits.
    pub const ONESHOT_MIN: u16 = ONESHOT;
    pub const ONESHOT_MAX: u16 = ONESHOT_MIN + MAX_LAYER_N;

    pub const MACROS_MIN: u16 = 0x1000;
    pub const MACROS_MAX: u16 = 0x1fff;

    pub const FIRMWARE_MIN: u16 = MACROS_MAX + 1;
    pub const FIRMWARE_MAX: u16 = FIRMWARE_MIN + 0xff;

    pub const FW_RESET_TO_USB_BOOT: u16 = FIRMWARE_MIN;
    pub const FW_CAPS_WORD_TOGGLE: u16 = FIRMWARE_MIN + 1;
    pub const FW_CLEAR_ALL: u16 = FIRMWARE_MIN + 2;
    pub const FW_CLEAR_LAYERS: u16 = FIRMWARE_MIN + 3;

    pub fn base_code(code: u16) -> u16 {
        code & 0xff00
    }
}

pub mod macro_types {
    pub const MODIFIER: u16 = 0;
    pub const DUAL_ACTION: u16 = 1;
    pub const TAPDANCE: u16 = 2;
    pub const SHIFT_SWAP: u16 = 3;
}

/// Modifier bits as reported to the host, in HID order.
pub mod modifiers {
    pub const LEFT_CTRL: u8 = 0x01;
    pub const LEFT_SHIFT: u8 = 0x02;
    pub const LEFT_ALT: u8 = 0x04;
    pub const LEFT_GUI: u8 = 0x08;
    pub const RIGHT_CTRL: u8 = 0x10;
    pub const RIGHT_SHIFT: u8 = 0x20;
    pub const RIGHT_ALT: u8 = 0x40;
    pub const RIGHT_GUI: u8 = 0x80;

    pub const CTRL_MASK: u8 = LEFT_CTRL | RIGHT_CTRL;
    pub const SHIFT_MASK: u8 = LEFT_SHIFT | RIGHT_SHIFT;
    pub const ALT_MASK: u8 = LEFT_ALT | RIGHT_ALT;
    pub const GUI_MASK: u8 = LEFT_GUI | RIGHT_GUI;
}
