use splitmap_common::keycodes::modifiers::{LEFT_CTRL, RIGHT_SHIFT};

use super::*;

const NAMES: LayerNames = LayerNames::new(&["QWERTY", "Nav", "Sym", "Tri-State"]);

#[test]
fn capture_status() {
    let state = KeyboardState {
        layer_state: 0b110,
        default_layer_state: 1,
        modifiers: LEFT_CTRL | RIGHT_SHIFT,
        caps_word: true,
    };
    let buf = StatusBuffer::capture(&state, &NAMES, LedState(LedState::CAPS_LOCK));
    assert_eq!(buf.kind(), StatusKind::Status);
    assert_eq!(buf.layer(), 2);
    assert_eq!(buf.layer_name(), Some("Sym"));
    assert!(buf.leds().caps_lock());
    assert!(!buf.leds().num_lock());
    assert_eq!(buf.modifiers(), LEFT_CTRL | RIGHT_SHIFT);
    assert!(buf.caps_word());

    let state = KeyboardState {
        layer_state: 1 << 9,
        ..state
    };
    let buf = StatusBuffer::capture(&state, &NAMES, LedState::default());
    assert_eq!(buf.layer(), 9);
    assert_eq!(buf.layer_name(), Some(crate::layer::UNDEFINED));
}

#[test]
fn host_text_truncates_on_char_boundary() {
    let buf = StatusBuffer::host_text(b"hello");
    assert_eq!(buf.kind(), StatusKind::HostText);
    assert_eq!(buf.text(), b"hello");

    // 25 ascii bytes then a two byte character straddling the limit
    let text = "abcdefghijklmnopqrstuvwxyé";
    let buf = StatusBuffer::host_text(text.as_bytes());
    assert_eq!(buf.layer_name(), Some("abcdefghijklmnopqrstuvwxy"));

    let text = "abcdefghijklmnopqrstuvwxyz0123";
    let buf = StatusBuffer::host_text(text.as_bytes());
    assert_eq!(buf.text().len(), TEXT_MAX);
}

#[test]
fn from_bytes() {
    let buf = StatusBuffer::capture(
        &KeyboardState {
            layer_state: 0b10,
            default_layer_state: 1,
            modifiers: 0,
            caps_word: false,
        },
        &NAMES,
        LedState(LedState::NUM_LOCK | LedState::SCROLL_LOCK),
    );
    let copy = StatusBuffer::from_bytes(buf.as_bytes());
    assert_eq!(copy, buf);

    let short = StatusBuffer::from_bytes(&[1, 3]);
    assert_eq!(short.kind(), StatusKind::Status);
    assert_eq!(short.layer(), 3);
    assert_eq!(short.text(), b"");

    let mut long = [0u8; 40];
    long[0] = 2;
    long[TEXT_LEN] = 200;
    let long = StatusBuffer::from_bytes(&long);
    assert_eq!(long.text().len(), TEXT_MAX);

    assert_eq!(StatusBuffer::from_bytes(&[7]).kind(), StatusKind::Empty);
}
