use super::*;

#[test]
fn decode() {
    assert_eq!(Macro::decode(0, None), Macro::Noop);
    assert_eq!(Macro::decode(0, Some(&[])), Macro::Noop);

    assert_eq!(
        Macro::decode(10, Some(&[0x0200, 0x25])),
        Macro::Modifier {
            keycode: 0x25,
            modifiers: 2
        }
    );
    assert_eq!(
        Macro::decode(10, Some(&[1, 4, 0xe1])),
        Macro::DualAction(4, 0xe1, u16::MAX, u16::MAX)
    );
    assert_eq!(
        Macro::decode(10, Some(&[1, 4, 0xe1, 250])),
        Macro::DualAction(4, 0xe1, 250, u16::MAX)
    );
    assert_eq!(
        Macro::decode(10, Some(&[1, 4, 0xe1, 250, 30])),
        Macro::DualAction(4, 0xe1, 250, 30)
    );
    assert_eq!(
        Macro::decode(10, Some(&[2, u16::MAX, 4, 5, 6])),
        Macro::TapDance {
            timeout: u16::MAX,
            location: 12,
            len: 3
        }
    );
    assert_eq!(
        Macro::decode(10, Some(&[3, 0x2f, 0x30])),
        Macro::ShiftSwap {
            primary: 0x2f,
            shifted: 0x30
        }
    );
    assert_eq!(Macro::decode(10, Some(&[2, 200])), Macro::Noop);
}
