//! Tap dance: the number of quick taps on one key selects which of its choices is sent.

use crate::scan_key::ScanKey;

/// Index into a dance's choices for `count` taps; taps beyond the last choice select the last.
pub const fn choice_index(count: u16, len: u16) -> u16 {
    let n = if count < len { count } else { len };
    n.saturating_sub(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapDance {
    #[default]
    Idle,
    Counting {
        key: ScanKey,
        location: u32,
        len: u16,
        count: u16,
        wait_until: u64,
    },
}

/// The outcome of a finished dance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolved {
    /// The dance key; down when the key is still held.
    pub key: ScanKey,
    /// Layout location of the selected choice.
    pub location: u32,
}

impl TapDance {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Counting { .. })
    }

    pub fn wait_until(&self) -> u64 {
        match self {
            Self::Counting { wait_until, .. } => *wait_until,
            Self::Idle => u64::MAX,
        }
    }

    /// Does `scan_key` interrupt a running dance? Any key down other than the dance key does, as
    /// does the dance key itself once the window has closed.
    pub fn is_interrupted_by(&self, scan_key: ScanKey, time: u64) -> bool {
        match self {
            Self::Counting {
                key, wait_until, ..
            } => scan_key.is_down() && (!key.same_key(scan_key) || time >= *wait_until),
            Self::Idle => false,
        }
    }

    /// Count a press of `key` for the dance whose `len` choices start at `location`.
    pub fn press(&mut self, key: ScanKey, location: u32, len: u16, now: u64, timeout: u16) {
        let wait_until = now + timeout as u64;
        match self {
            Self::Counting {
                key: k,
                location: l,
                count,
                wait_until: w,
                ..
            } if k.same_key(key) && *l == location => {
                *k = key;
                *count = count.saturating_add(1);
                *w = wait_until;
            }
            _ => {
                *self = Self::Counting {
                    key,
                    location,
                    len,
                    count: 1,
                    wait_until,
                }
            }
        }
    }

    pub fn release(&mut self, scan_key: ScanKey) {
        if let Self::Counting { key, .. } = self {
            if key.same_key(scan_key) {
                key.set_down(false);
            }
        }
    }

    /// End the dance returning the selected choice.
    pub fn finish(&mut self) -> Option<Resolved> {
        match *self {
            Self::Counting {
                key,
                location,
                len,
                count,
                ..
            } => {
                *self = Self::Idle;
                Some(Resolved {
                    key,
                    location: location + choice_index(count, len) as u32,
                })
            }
            Self::Idle => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::Idle;
    }
}

#[cfg(test)]
#[path = "tap_dance_test.rs"]
mod test;
