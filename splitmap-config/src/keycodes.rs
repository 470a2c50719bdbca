use std::collections::HashMap;

use lazy_static::lazy_static;
use splitmap_common::keycodes::key_range;

const DASH_USCORE: [char; 2] = ['_', '-'];

const MODIFIER_BITS: [&str; 8] = ["C", "S", "A", "G", "RC", "RS", "RA", "RG"];

#[derive(Debug, Clone, PartialEq)]
pub struct KeycodeDesc {
    pub name: String,
    pub code: u16,
}

struct Keycodes {
    names: HashMap<String, u16>,
    list: Vec<KeycodeDesc>,
}

impl Keycodes {
    fn ins(&mut self, a: &str, b: u16) {
        let mut first = true;
        for a in a.split('/') {
            let k = a.replace(DASH_USCORE, "").to_lowercase();
            if self.names.contains_key(k.as_str()) {
                panic!("key already added {a}");
            }
            self.names.insert(k, b);
            if first && !a.starts_with('_') {
                self.list.push(KeycodeDesc {
                    name: a.to_string(),
                    code: b,
                });
                first = false;
            }
        }
    }
}

lazy_static! {
    static ref MODIFIER_BIT_MAP: HashMap<&'static str, u8> = {
        let mut m = HashMap::new();
        for (i, c) in MODIFIER_BITS.iter().enumerate() {
            m.insert(*c, 1 << i);
        }
        m.insert("M", 1 << 3);
        m
    };
    static ref ACTION_NAMES: HashMap<&'static str, u16> = {
        let mut m = HashMap::new();
        m.insert("layer", key_range::LAYER);
        m.insert("toggle", key_range::TOGGLE);
        m.insert("setlayout", key_range::SET_LAYOUT);
        m.insert("oneshot", key_range::ONESHOT);
        m.insert("overload", key_range::MACROS_MIN);
        m.insert("dualaction", key_range::MACROS_MIN);
        m.insert("tapdance", key_range::MACROS_MIN);
        m.insert("shiftswap", key_range::MACROS_MIN);
        m
    };
    static ref KEYCODES: Keycodes = {
        let mut m = Keycodes {
            names: HashMap::new(),
            list: Vec::new(),
        };
        m.ins("Transparent/trans/trns", key_range::TRANSPARENT);
        m.ins("NoOp/xxxxxxx", key_range::NOOP);
        m.names.insert("/".into(), 0x38);
        for (i, name) in r#"
A B C D E F G H I J K L M N O P Q R S T U V W X Y Z
1 2 3 4 5 6 7 8 9 0
Return/Enter/ent
Escape/esc
backspace/bksp/bspc
Tab
Spacebar/space/spc
Dash/-/minus/mins
Equals/=/equal/eql
LeftBrace/[/leftsquarebracket/lbrc
RightBrace/]/rightsquarebracket/rbrc
Backslash/\/bsls
NonUsHash/nuhs
Semicolon/;/scln
LeftApos/'/apostrophe/quot
GraveAccent/`/grave/grv
Comma/,/comm
Period/./dot
Forwardslash/slash/slsh
CapsLock/caps
F1 F2 F3 F4 F5 F6 F7 F8 F9 F10 F11 F12
Printscreen/print/pscr
ScrollLock/scrl
Pause/paus
Insert/ins
Home Pageup/pgup Delete/del End Pagedown/pgdn
Right/rght Left Down Up
KpNumLock/num
KpForwardslash KpStar KpDash KpPlus KpEnter
Kp1 Kp2 Kp3 Kp4 Kp5 Kp6 Kp7 Kp8 Kp9 Kp0
KpPeriod
NonUsBackslash/nubs
Application/app
Power
KpEquals
F13 F14 F15 F16 F17 F18 F19 F20 F21 F22 F23 F24
Execute
Help
Menu/mnu
Select
Stop
Again Undo
Cut Copy Paste
Find
Mute
VolumeUp VolumeDown
LockingCapsLock LockingNumLock LockingScrollLock
KpComma KpEqualSign
International1 International2 International3 International4
International5 International6 International7 International8 International9
Lang1 Lang2 Lang3 Lang4 Lang5 Lang6 Lang7 Lang8 Lang9
AlternateErase
SysreqAttention
Cancel
Clear
Prior
KeyboardReturn
Separator
Out
Oper
ClearAgain
CrselProps
Exsel
A5 A6 A7 A8 A9 AA AB AC AD AE AF
KpDouble0 KpTriple0
ThousandsSeparator DecimalSeparator CurrencyUnit CurrencySubUnit
KpLeftBracket KpRightBracket KpLeftBrace KpRightBrace
KpTab KpBackspace
KpA KpB KpC KpD KpE KpF
KpXor
KpCaret
KpPercentage
KpLess KpGreater
KpAmpersand KpDoubleAmpersand KpBar KpDoubleBar
KpColon KpHash KpSpace KpAt KpBang
KpMemoryStore KpMemoryRecall KpMemoryClear
KpMemoryAdd KpMemorySubtract KpMemoryMultiply KpMemoryDivide KpPlusMinus
KpClear KpClearEntry
KpBinary KpOctal KpDecimal KpHexadecimal
DE DF
Leftcontrol/leftctrl/lctrl/lc/lctl
Leftshift/lshift/ls/lsft
Leftalt/lalt/la
LeftGui/leftmeta/lgui/lg
Rightcontrol/rightctrl/rctrl/rc/rctl
Rightshift/rshift/rs/rsft
Rightalt/altgr/ralt/ra
RightGui/rightmeta/rgui/rg
"#
        .split_whitespace().enumerate()
        {
            m.ins(name, (i + 4) as u16);
        }

        for (i, name) in r#"
1 2 3 4 5 6 7 8
Left Right Up Down
ScrollDown/WheelDown/whld
ScrollUp/WheelUp/whlu
ScrollRight/WheelRight/whlr
ScrollLeft/WheelLeft/whll
Accel1/acl0 Accel2/acl1 Accel3/acl2
"#
        .split_whitespace()
        .enumerate()
        {
            let code = i as u16 + key_range::MOUSE_MIN;
            let names = name
                .split('/')
                .flat_map(|n| [format!("mouse{n}"), format!("ms_{n}")])
                .collect::<Vec<_>>()
                .join("/");
            m.ins(&names, code);
            if i < 8 {
                m.ins(&format!("_ms_btn{}", i + 1), code);
            }
        }

        for (i, name) in r#"
rgb_toggle/rm_togg
rgb_mode_next/rm_next
rgb_mode_prev/rm_prev
rgb_hue_up/rm_hueu
rgb_hue_down/rm_hued
rgb_sat_up/rm_satu
rgb_sat_down/rm_satd
rgb_val_up/rm_valu
rgb_val_down/rm_vald
rgb_speed_up/rm_spdu
rgb_speed_down/rm_spdd
"#
        .split_whitespace()
        .enumerate()
        {
            m.ins(name, i as u16 + key_range::LIGHTING_MIN);
        }

        let mut i = |a: &str, b: u16| {
            m.ins(a, b + key_range::CONSUMER_MIN);
            if a.starts_with("al_") || a.starts_with("ac_") {
                m.ins(&format!("_{}", &a[3..]), b + key_range::CONSUMER_MIN);
            }
        };

        // Display Controls
        i("snapshot"        ,0x065);
        i("brightness_up/bri_u"   ,0x06F);
        i("brightness_down/bri_d" ,0x070);
        // Transport Controls
        i("record"       ,0x0B2);
        i("fast_forward" ,0x0B3);
        i("rewind"       ,0x0B4);
        i("next_track/mnxt"   ,0x0B5);
        i("prev_track/mprv"   ,0x0B6);
        i("tc_stop/mstp"         ,0x0B7);
        i("eject"        ,0x0B8);
        i("random_play"  ,0x0B9);
        i("stop_eject"   ,0x0CC);
        i("play_pause/mply"   ,0x0CD);
        // Audio Controls
        i("audio_mute"     ,0x0E2);
        i("audio_vol_up"   ,0x0E9);
        i("audio_vol_down" ,0x0EA);
        // Application Launch Buttons
        i("al_cc_config"       ,0x183);
        i("al_email"           ,0x18A);
        i("al_calculator"      ,0x192);
        i("al_local_browser"   ,0x194);
        i("al_lock"            ,0x19E);
        i("al_control_panel"   ,0x19F);
        i("al_assistant"       ,0x1CB);
        i("al_keyboard_layout" ,0x1AE);
        // Generic GUI Application Controls
        i("ac_new"                         ,0x201);
        i("ac_open"                        ,0x202);
        i("ac_close"                       ,0x203);
        i("ac_exit"                        ,0x204);
        i("ac_maximize"                    ,0x205);
        i("ac_minimize"                    ,0x206);
        i("ac_save"                        ,0x207);
        i("ac_properties"                  ,0x209);
        i("ac_select_all"                  ,0x21E);
        i("ac_search"                      ,0x221);
        i("ac_homepage"                    ,0x223);
        i("ac_back"                        ,0x224);
        i("ac_forward"                     ,0x225);
        i("ac_refresh"                     ,0x227);
        i("ac_bookmarks"                   ,0x22A);
        i("ac_next_keyboard_layout_select" ,0x29D);
        i("ac_desktop_show_all_windows"    ,0x29F);

        // System controls
        i("system_power_down", 0x2a1);
        i("system_sleep/sleep", 0x2a2);
        i("system_wake_up/wakeup", 0x2a3);
        i("system_restart", 0x2af);

        // Firmware
        m.ins("reset_to_usb_boot/qk_boot/boot", key_range::FW_RESET_TO_USB_BOOT);
        m.ins("caps_word/cw_togg", key_range::FW_CAPS_WORD_TOGGLE);
        m.ins("clear_all", key_range::FW_CLEAR_ALL);
        m.ins("clear_layers", key_range::FW_CLEAR_LAYERS);

        m
    };
}

/// Look up the code of a key name. Case, dashes and underscores are ignored except that `_` on
/// its own is the transparent key.
pub fn key_code(name: &str) -> Option<u16> {
    let name = if name.len() > 1 && name.starts_with('\\') {
        &name[1..]
    } else {
        name
    };
    if name == "_" {
        return Some(key_range::TRANSPARENT);
    }
    let names = &KEYCODES.names;
    if name.contains(DASH_USCORE) || name.chars().any(|c| c.is_ascii_uppercase()) {
        let name = name.replace(DASH_USCORE, "").to_lowercase();
        names.get(name.as_str()).copied()
    } else {
        names.get(name).copied()
    }
}

/// All key names in code order of definition; one entry per alias group.
pub fn keycodes_iter() -> impl Iterator<Item = &'static KeycodeDesc> {
    KEYCODES.list.iter()
}

/// A readable name for a layout code.
pub fn describe_code(code: u16) -> String {
    if let Some(d) = keycodes_iter().find(|d| d.code == code) {
        return d.name.clone();
    }
    let n = code & 0xff;
    match key_range::base_code(code) {
        key_range::LAYER => format!("layer({n})"),
        key_range::TOGGLE => format!("toggle({n})"),
        key_range::SET_LAYOUT => format!("setlayout({n})"),
        key_range::ONESHOT => format!("oneshot({})", modifiers_to_string(n as u8)),
        _ if (key_range::MACROS_MIN..=key_range::MACROS_MAX).contains(&code) => {
            format!("macro({})", code - key_range::MACROS_MIN)
        }
        _ => format!("{code:#06x}"),
    }
}

pub fn action_code(name: &str) -> Option<u16> {
    ACTION_NAMES.get(name).copied()
}

pub fn modifier_macro(name: &str) -> Option<u16> {
    match name.rsplit_once('-') {
        Some((mods, _)) if !mods.is_empty() => Some(key_range::MACROS_MIN),
        _ => None,
    }
}

/// `C-S` style modifier names to modifier bits; `None` for an unknown name.
pub fn modifiers_to_bit_map(text: &str) -> Option<u8> {
    if text.is_empty() {
        return Some(0);
    }
    text.split('-')
        .try_fold(0, |bits, m| Some(bits | MODIFIER_BIT_MAP.get(m)?))
}

pub fn modifiers_to_string(modifiers: u8) -> String {
    MODIFIER_BITS
        .iter()
        .enumerate()
        .filter(|(i, _)| modifiers & (1 << i) != 0)
        .map(|(_, m)| *m)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
#[path = "keycodes_test.rs"]
mod test;
