use super::*;
use keycodes::{key_range, modifiers};

#[test]
fn key_ranges_do_not_overlap() {
    assert!(key_range::BASIC_MAX < key_range::MODIFIER_MIN);
    assert!(key_range::MODIFIER_MAX < key_range::CONSUMER_MIN);
    assert!(key_range::CONSUMER_MAX < key_range::MOUSE_MIN);
    assert!(key_range::MOUSE_MAX < key_range::LIGHTING_MIN);
    assert!(key_range::LIGHTING_MAX < key_range::LAYER_MIN);
    assert!(key_range::LAYERS_LAST < key_range::MACROS_MIN);
    assert!(key_range::MACROS_MAX < key_range::FIRMWARE_MIN);
}

#[test]
fn base_code() {
    assert_eq!(key_range::base_code(key_range::TOGGLE + 3), key_range::TOGGLE);
    assert_eq!(key_range::base_code(key_range::LAYER), key_range::LAYER);
}

#[test]
fn modifier_masks() {
    assert_eq!(modifiers::SHIFT_MASK, 0x22);
    assert_eq!(
        modifiers::CTRL_MASK | modifiers::SHIFT_MASK | modifiers::ALT_MASK | modifiers::GUI_MASK,
        0xff
    );
}

#[test]
fn tri_layer_none() {
    assert_eq!(globals::unpack_tri_layer(globals::TRI_LAYER_NONE), None);
    assert_eq!(
        globals::unpack_tri_layer(globals::pack_tri_layer(31, 0, 1)),
        Some((31, 0, 1))
    );
    assert!(MAX_LAYERS <= 32);
}
