use core::cmp::min;

use DualActionTimer::*;

use super::TimedScanKey;

/// Decides between the tap and hold action of a dual action key such as `overload(nav, tab)` or
/// `dualaction(lshift, f)`.
///
/// While undecided (`Wait`) `count` is the number of other key events still needed before the
/// next one forces the hold action: a full press and release of another key is two events.
/// Holding past `hold_after` also picks hold. Releasing the dual action key first picks tap.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(super) enum DualActionTimer {
    #[default]
    NoDual,
    Wait {
        scan_key: TimedScanKey,
        hold_after: u16,
        /// Once another key has been tapped, hold is also picked this long after the press plus
        /// the time the other key took.
        interrupt_window: u16,
        tap: u16,
        hold: u16,
        count: usize,
    },
    Hold {
        scan_key: TimedScanKey,
        hold: u16,
    },
    Tap {
        scan_key: TimedScanKey,
        tap: u16,
    },
}

impl DualActionTimer {
    pub(crate) fn start(
        &mut self,
        scan_key: TimedScanKey,
        tap: u16,
        hold: u16,
        hold_after: u16,
        interrupt_window: u16,
    ) {
        debug_assert!(matches!(self, NoDual));
        *self = Wait {
            scan_key,
            hold_after,
            interrupt_window,
            tap,
            hold,
            count: 2,
        };
    }

    pub(crate) fn is_no_timer(&self) -> bool {
        !matches!(self, Wait { .. })
    }

    pub(crate) fn wait_until(&self) -> u64 {
        let Wait {
            scan_key: TimedScanKey(_, pressed),
            hold_after,
            interrupt_window,
            count,
            ..
        } = *self
        else {
            return u64::MAX;
        };
        let hold_at = pressed + hold_after as u64;
        if count == 0 {
            min(hold_at, pressed + interrupt_window as u64)
        } else {
            hold_at
        }
    }

    /// Returns true when `next_key` should be processed straight away; otherwise the caller must
    /// act on the new state.
    pub(crate) fn key_switch(&mut self, next_key: TimedScanKey) -> bool {
        let Wait {
            scan_key,
            hold_after,
            interrupt_window,
            tap,
            hold,
            count,
        } = *self
        else {
            return matches!(self, NoDual);
        };

        *self = if next_key.same_key(&scan_key) {
            Tap { scan_key, tap }
        } else if count == 0 {
            Hold { scan_key, hold }
        } else {
            let interrupt_window = if count == 1 {
                let took = next_key.1.saturating_sub(scan_key.1);
                interrupt_window.saturating_add(took as u16)
            } else {
                interrupt_window
            };
            Wait {
                scan_key,
                hold_after,
                interrupt_window,
                tap,
                hold,
                count: count - 1,
            }
        };
        false
    }

    pub(crate) fn timer_expired(&mut self) {
        if let Wait { scan_key, hold, .. } = *self {
            *self = Hold { scan_key, hold };
        }
    }
}

#[cfg(test)]
#[path = "dual_action_test.rs"]
mod test;
