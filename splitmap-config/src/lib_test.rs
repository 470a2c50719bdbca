use std::path::Path;

use crate::{keycodes, text_to_binary, ConfigError};

pub fn kc(c: &str) -> u16 {
    match keycodes::key_code(c) {
        Some(kc) => kc,
        None => panic!("Unknown key mnemonic: {c:?}"),
    }
}

#[test]
fn long_format() {
    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = nosuch\n";
    let err = text_to_binary(src).err().expect("should fail");

    assert_eq!(err.line_col_slice(src), (4, 5, (29, 39)));
    assert_eq!(
        err.long_format(Path::new("kyria.conf"), src),
        "error: Unknown action/keycode \n   --> kyria.conf:4:5\n  4 | a = nosuch\n"
    );
}

#[test]
fn display_without_span() {
    let err = ConfigError::from("Layout truncated");
    assert_eq!(err.to_string(), "Layout truncated");
    assert_eq!(err.line_col_slice("abc"), (0, 0, (0, 0)));
}
