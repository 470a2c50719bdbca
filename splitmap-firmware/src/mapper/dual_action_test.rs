use crate::scan_key::ScanKey;

use super::*;

fn key(row: u8, col: u8, is_down: bool, time: u64) -> TimedScanKey {
    TimedScanKey(ScanKey::new(row, col, is_down), time)
}

#[test]
fn release_first_is_tap() {
    let mut da = DualActionTimer::default();
    assert!(da.is_no_timer());
    assert!(da.key_switch(key(0, 0, true, 100)));

    da.start(key(0, 0, true, 100), 4, 0xe1, 180, 20);
    assert!(!da.is_no_timer());
    assert_eq!(da.wait_until(), 280);

    assert!(!da.key_switch(key(0, 0, false, 150)));
    assert!(matches!(da, DualActionTimer::Tap { tap: 4, .. }));
    assert_eq!(da.wait_until(), u64::MAX);
}

#[test]
fn timeout_is_hold() {
    let mut da = DualActionTimer::default();
    da.start(key(0, 0, true, 100), 4, 0xe1, 180, 20);
    da.timer_expired();
    assert!(matches!(da, DualActionTimer::Hold { hold: 0xe1, .. }));
    assert!(da.is_no_timer());
}

#[test]
fn other_key_tapped_is_hold() {
    let mut da = DualActionTimer::default();
    da.start(key(0, 0, true, 100), 4, 0xe1, 180, 20);

    assert!(!da.key_switch(key(1, 1, true, 110)));
    assert!(matches!(da, DualActionTimer::Wait { count: 1, .. }));
    assert!(!da.key_switch(key(1, 1, false, 130)));
    assert!(matches!(da, DualActionTimer::Wait { count: 0, .. }));
    // tap_timeout after the other key was released
    assert_eq!(da.wait_until(), 100 + 20 + 30);

    assert!(!da.key_switch(key(1, 2, true, 140)));
    assert!(matches!(da, DualActionTimer::Hold { hold: 0xe1, .. }));
}
