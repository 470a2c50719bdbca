use std::path::Path;

use key_range::{LAYER_MIN, MACROS_MIN, ONESHOT_MIN, SET_LAYOUT_MIN, TOGGLE_MIN};

use crate::test::kc;

use super::*;

pub fn pretty_compile(src: &str) -> Result<KeyboardConfig> {
    crate::pretty_compile(Path::new("test"), src)
}

macro_rules! compile_global {
    ($src:ident, $result:ident, $name:expr, $value:expr, $x:tt) => {{
        let $src = format!("[global]\n{} = {}\n", $name, $value);
        let $result = compile($src.as_str());

        $x
    }};
}

fn span_text<'a>(src: &'a str, err: &ConfigError) -> &'a str {
    &src[err.span.clone().unwrap()]
}

#[test]
fn firmware_section() {
    let src = r#"
[firmware]

keyboard = kyria
max_layout_size = 8 * 1024

pins = [PIN_4, # comment pin 4
PIN_5, PIN_6]  # comment

report_buffer_size = 32
scanner_buffer_size = 16

[matrix:1x3]
0x00 = 7 8 9
"#;

    let config = pretty_compile(src).expect("should allow firmware");

    assert_eq!(config.firmware_get("keyboard"), Some("kyria"));
    assert_eq!(config.firmware_get("MAX_LAYOUT_SIZE"), None);
    assert_eq!(config.firmware_get("max_layout_size"), Some("8 * 1024"));
    assert_eq!(
        config.firmware_get("pins"),
        Some("[PIN_4, # comment pin 4\nPIN_5, PIN_6]")
    );
}

#[test]
fn firmware_syntax_error() {
    let src = "[firmware]\nkeyboard = 1 +* )\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, SYNTAX_ERROR);
}

#[test]
fn keycode_names() {
    let src = r#"
[matrix:1x4]
\0x00 = \= b c d

[main]

equal =  1
\b = \\
c = play_pause
d = AC_Select_All

"#;

    let config = pretty_compile(src).expect("should allow escaping");
    assert_eq!(config.code_at("main", 0x0), kc("1"));
    assert_eq!(config.code_at("main", 0x1), kc("\\"));
    assert_eq!(config.code_at("main", 0x2), kc("mply"));
    assert_eq!(config.code_at("main", 0x3), 0x31e);
}

#[test]
fn layers_indexed_by_first_appearance() {
    let src = r#"
[matrix:1x2]
0x00 = a b

[base]
a = layer(nav)

[nav]
a = x

[sym]
b = y

[base]
b = layer(sym)
"#;

    let config = pretty_compile(src).expect("should compile");
    assert_eq!(config.layer_names(), vec!["base", "nav", "sym"]);
    assert_eq!(config.get_layer_index("sym"), Some(2));
    assert_eq!(config.code_at("base", 0x0), LAYER_MIN + 1);
    assert_eq!(config.code_at("base", 0x1), LAYER_MIN + 2);
    assert_eq!(config.code_at("nav", 0x1), key_range::TRANSPARENT);
}

#[test]
fn layer_actions() {
    let src = r#"
[matrix:1x6]
0x00 = a b c d e f

[main]
a = toggle(fn)
b = setlayout( colemak )
c = oneshot(leftshift)
d = oneshot(C-S)
e = _
f = noop

[colemak]
[fn]
"#;

    let config = pretty_compile(src).expect("should allow layer actions");
    assert_eq!(config.code_at("main", 0x0), TOGGLE_MIN + 2);
    assert_eq!(config.code_at("main", 0x1), SET_LAYOUT_MIN + 1);
    assert_eq!(config.code_at("main", 0x2), ONESHOT_MIN | 2);
    assert_eq!(config.code_at("main", 0x3), ONESHOT_MIN | 3);
    assert_eq!(config.code_at("main", 0x4), key_range::TRANSPARENT);
    assert_eq!(config.code_at("main", 0x5), key_range::NOOP);
}

#[test]
fn oneshot_needs_modifier() {
    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = oneshot(q)\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Expected a modifier");
    assert_eq!(span_text(src, &err), "q");
}

#[test]
fn dual_action_macro() {
    let src = r#"
[matrix:1x3]
0x00 = a b c

[main]

a = dualaction(rightshift, a, 251, 45)
b = overload(nav, esc)
c = dualaction(leftctrl, C-c, 300)

[nav]
"#;

    let config = pretty_compile(src).expect("should allow dualaction");

    assert_eq!(config.code_at("main", 0x0), MACROS_MIN);
    assert_eq!(
        config.macro_at(MACROS_MIN),
        Some(&Macro::TimedDualAction(kc("a"), kc("rightshift"), 251, 45))
    );

    assert_eq!(
        config.macro_at(config.code_at("main", 0x1)),
        Some(&Macro::DualAction(kc("esc"), LAYER_MIN + 1))
    );

    let c = config.macro_at(config.code_at("main", 0x2)).unwrap();
    let Macro::TimedDualAction(tap, hold, 300, u16::MAX) = *c else {
        panic!("unexpected {c:?}");
    };
    assert_eq!(hold, kc("leftctrl"));
    assert_eq!(
        config.macro_at(tap),
        Some(&Macro::Modifier {
            keycode: kc("c"),
            modifiers: 1
        })
    );
}

#[test]
fn tap_dance_macro() {
    let src = r#"
[matrix:1x2]
0x00 = a b

[main]
a = tapdance(S-8, RA-7, RA-8)
b = tapdance(250ms, q, S-2, S-2)
"#;

    let config = pretty_compile(src).expect("should allow tapdance");

    let Some(Macro::TapDance { timeout, choices }) = config.macro_at(config.code_at("main", 0))
    else {
        panic!("expected tapdance");
    };
    assert_eq!(*timeout, u16::MAX);
    assert_eq!(choices.len(), 3);
    assert_eq!(
        config.macro_at(choices[1]),
        Some(&Macro::Modifier {
            keycode: kc("7"),
            modifiers: 0x40
        })
    );

    let Some(Macro::TapDance { timeout, choices }) = config.macro_at(config.code_at("main", 1))
    else {
        panic!("expected tapdance");
    };
    assert_eq!(*timeout, 250);
    assert_eq!(choices[0], kc("q"));
    assert_eq!(choices[1], choices[2]);
}

#[test]
fn tap_dance_errors() {
    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = tapdance()\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Missing tap dance choice");

    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = tapdance(b c)\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Expected , or )");
}

#[test]
fn shift_swap_macro() {
    let src = r#"
[matrix:1x1]
0x00 = a

[main]
a = shiftswap(RA-7, RA-8)
"#;

    let config = pretty_compile(src).expect("should allow shiftswap");
    let Some(Macro::ShiftSwap { primary, shifted }) = config.macro_at(config.code_at("main", 0))
    else {
        panic!("expected shiftswap");
    };
    assert_eq!(
        config.macro_at(*primary),
        Some(&Macro::Modifier {
            keycode: kc("7"),
            modifiers: 0x40
        })
    );
    assert_eq!(
        config.macro_at(*shifted),
        Some(&Macro::Modifier {
            keycode: kc("8"),
            modifiers: 0x40
        })
    );
}

#[test]
fn modifier_macros_are_shared() {
    let src = r#"
[matrix:1x3]
0x00 = a b c

[main]
a = S-8
b = S-8
c = C-S-tab
"#;

    let config = pretty_compile(src).expect("should allow modifier macros");
    assert_eq!(config.code_at("main", 0), config.code_at("main", 1));
    assert_eq!(config.macro_count(), 2);
    assert_eq!(
        config.macro_at(config.code_at("main", 2)),
        Some(&Macro::Modifier {
            keycode: kc("tab"),
            modifiers: 3
        })
    );

    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = X-8\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Invalid modifiers 'X'");
    assert_eq!(span_text(src, &err), "X");
}

#[test]
fn define_section() {
    let src = r#"
[define]
SE_LPRN = S-8
SE_LCBR = RA-7
TD_LBRC = tapdance(SE_LPRN, SE_LCBR)

[matrix:1x2]
0x00 = a b

[main]
a = TD_LBRC
b = SE_LPRN
"#;

    let config = pretty_compile(src).expect("should allow defines");
    assert_eq!(config.code_at("main", 1), config.defined("SE_LPRN").unwrap());
    let Some(Macro::TapDance { choices, .. }) = config.macro_at(config.code_at("main", 0)) else {
        panic!("expected tapdance");
    };
    assert_eq!(choices, &vec![config.code_at("main", 1), config.defined("SE_LCBR").unwrap()]);
}

#[test]
fn define_cannot_shadow_key() {
    let src = "[define]\nesc = a\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "'esc' is already a key name");
}

#[test]
fn display_section() {
    let src = r#"
[matrix:1x1]
0x00 = a

[display]
base = Mod Left (Qwe) # comment
sym = Symbol

[base]
[nav]
[sym]
"#;

    let config = pretty_compile(src).expect("should allow display names");
    assert_eq!(
        config.display_names(),
        vec!["Mod Left (Qwe)", "nav", "Symbol"]
    );

    let src = "[display]\nfoo = Bar\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Unknown layer name foo");
}

#[test]
fn encoders_section() {
    let src = r#"
[encoders]
0 = volumeup volumedown
1 = pagedown pageup

[matrix:1x1]
0x00 = a
"#;

    let config = pretty_compile(src).expect("should allow encoders");
    assert_eq!(
        config.encoders(),
        vec![
            (0, kc("volumeup"), kc("volumedown")),
            (1, kc("pgdn"), kc("pgup"))
        ]
    );

    let src = "[encoders]\n0 = volumeup\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Expected counter-clockwise action");

    let src = "[encoders]\nx = a b\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Invalid encoder index");
}

#[test]
fn tri_layer_global() {
    let src = r#"
[global]
tri_layer = nav sym adjust
dual_action_timeout = 200

[base]
[nav]
[sym]
[adjust]
"#;

    let config = pretty_compile(src).expect("should allow tri_layer");
    assert_eq!(config.tri_layer(), Some((1, 2, 3)));
    assert_eq!(config.global("dual_action_timeout").unwrap().value(), 200);

    let src = "[global]\ntri_layer = a b\n[a]\n[b]\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(
        err.message,
        "tri_layer needs two trigger layers and a result layer"
    );

    let src = "[global]\ntri_layer = a b c\n[a]\n[b]\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Unknown layer name c");
}

#[test]
fn global_timeouts() {
    compile_global!(src, result, "tapdance_tap_timeout", 250, {
        let config = result.expect("should compile");
        assert_eq!(config.global("tapdance_tap_timeout").unwrap().value(), 250);
        assert_eq!(config.serialize_globals(), vec![2, 250]);
        let _ = src;
    });

    compile_global!(src, result, "tapping_term", 190, {
        let config = result.expect("should compile");
        assert_eq!(config.global("tapping_term").unwrap().value(), 190);
        assert_eq!(config.serialize_globals(), vec![0, 190]);
        let _ = src;
    });

    compile_global!(src, result, "caps_word_idle_timeout", 70000, {
        let err = result.err().expect("should fail");
        assert_eq!(
            err.message,
            "Invalid duration; only 0 to 65535 milliseconds are valid"
        );
        assert_eq!(span_text(&src, &err), "70000");
    });

    compile_global!(src, result, "tapdance_tap_timeout", 6000, {
        let err = result.err().expect("should fail");
        assert_eq!(
            err.message,
            "Invalid duration; only 0 to 5000 milliseconds are valid"
        );
        let _ = src;
    });

    compile_global!(src, result, "foo", 100, {
        let err = result.err().expect("should fail");
        assert_eq!(err.message, "Invalid global 'foo'");
        assert_eq!(span_text(&src, &err), "foo");
    });
}

#[test]
fn defaults_when_unset() {
    let config = compile("[base]\n").unwrap();
    assert_eq!(
        config.global("tapdance_tap_timeout").unwrap().value(),
        common_globals::TAPDANCE_TAP_TIMEOUT_DEFAULT
    );
    assert_eq!(config.tri_layer(), None);
    assert!(config.serialize_globals().is_empty());
}

#[test]
fn matrix_names_make_main_layer() {
    let src = "[matrix:1x3]\n0x00 = a k01 c\n";
    let config = pretty_compile(src).expect("should compile");
    assert_eq!(config.layer_names(), vec!["main"]);
    assert_eq!(config.code_at("main", 0x0), kc("a"));
    assert_eq!(config.code_at("main", 0x1), 0);
    assert_eq!(config.code_at("main", 0x2), kc("c"));

    let src = "[matrix:1x2]\n0x00 = a b\n[base]\na = x\n";
    let config = pretty_compile(src).expect("should compile");
    assert_eq!(config.layer_names(), vec!["base"]);
    assert_eq!(config.code_at("base", 0x1), 0);
}

#[test]
fn kyria_positions() {
    let src = r#"
[matrix:4x16]
0x00 = a b
0x0a = c d
0x33 = e f
"#;

    let config = pretty_compile(src).expect("should compile");
    assert_eq!(config.get_aliases("c").unwrap(), &vec![0x00a]);
    assert_eq!(config.get_aliases("f").unwrap(), &vec![0x304]);

    let src = "[matrix:4x16]\n0x4 = a\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Invalid key position");

    let src = "[matrix:4x16]\n0x40 = a\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, TOO_MANY_ROWS);
}

#[test]
fn unknown_names() {
    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = nosuch\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, UNKNOWN_ACTION);
    assert_eq!(span_text(src, &err), "nosuch");

    let src = "[matrix:1x1]\n0x00 = a\n[main]\na = layer(nope)\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "Unknown layer name nope");
    assert_eq!(span_text(src, &err), "nope");

    let src = "[matrix:1x1]\n0x00 = a\n[main]\nz = b\n";
    let err = compile(src).err().expect("should fail");
    assert_eq!(err.message, "key not found! z");
}

#[test]
fn section_errors() {
    let err = compile("[base\n").err().expect("should fail");
    assert_eq!(err.message, "missing ']'");

    let err = compile("a = b\n").err().expect("should fail");
    assert_eq!(err.message, "expected '['");

    let err = compile("[base:S]\n").err().expect("should fail");
    assert_eq!(err.message, "layer sections take no suffix");

    let err = compile("[aliases:x]\n").err().expect("should fail");
    assert_eq!(err.message, "suffix not allowed here");
}

#[test]
fn too_many_layers() {
    let src = (0..=MAX_LAYERS).fold(String::new(), |s, i| s + &format!("[l{i}]\n"));
    let err = compile(&src).err().expect("should fail");
    assert_eq!(err.message, "Too many layers; at most 32 are allowed");
    assert_eq!(span_text(&src, &err), "l32");

    let src = (0..MAX_LAYERS).fold(String::new(), |s, i| s + &format!("[l{i}]\n"));
    assert_eq!(compile(&src).unwrap().layer_count(), MAX_LAYERS);
}

#[test]
fn serialize_layout() {
    let src = r#"
[matrix:2x3]
0x00 = a b c
0x10 = d e f

[global]
dual_action_timeout = 250

[encoders]
0 = volumeup volumedown

[base]
0x00 = q w e
0x10 = r t overload(fn, y)

[fn]
a = f1
"#;

    let config = pretty_compile(src).expect("should compile");
    let bin = config.serialize();

    assert_eq!(
        bin,
        vec![
            PROTOCOL_VERSION,
            0x0203,
            2,
            1,
            1,
            2,
            0,
            250,
            kc("volumeup"),
            kc("volumedown"),
            4,
            10,
            12,
            15,
            kc("q"),
            kc("w"),
            kc("e"),
            kc("r"),
            kc("t"),
            MACROS_MIN,
            0,
            kc("f1"),
            1,
            kc("y"),
            LAYER_MIN + 1,
        ]
    );

    let copy = KeyboardConfig::deserialize(&bin).expect("should deserialize");
    assert_eq!(copy.layer_names(), vec!["layer0", "layer1"]);
    assert_eq!(copy.code_at("layer0", 0x102), MACROS_MIN);
    assert_eq!(copy.code_at("layer1", 0x000), kc("f1"));
    assert_eq!(
        copy.macro_at(MACROS_MIN),
        Some(&Macro::DualAction(kc("y"), LAYER_MIN + 1))
    );
    assert_eq!(copy.global("dual_action_timeout").unwrap().value(), 250);
    assert_eq!(copy.encoders(), config.encoders());
    assert_eq!(copy.serialize(), bin);
}

#[test]
fn deserialize_rejects_bad_data() {
    assert_eq!(
        KeyboardConfig::deserialize(&[PROTOCOL_VERSION + 1, 0, 0, 0, 0, 0])
            .err()
            .unwrap()
            .message,
        "Layout version mismatch"
    );
    assert_eq!(
        KeyboardConfig::deserialize(&[PROTOCOL_VERSION, 0x101, 3, 0, 0, 0])
            .err()
            .unwrap()
            .message,
        "Layout truncated"
    );
}
