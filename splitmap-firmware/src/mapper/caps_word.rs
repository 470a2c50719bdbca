use splitmap_common::keycodes::key_range;

/// How a basic key affects an active caps word.
#[derive(Debug, PartialEq)]
pub(super) enum CapsWordKey {
    Shifted,
    Continue,
    Ends,
}

pub(super) fn classify(code: u16) -> CapsWordKey {
    match code {
        key_range::BASIC_A..=key_range::BASIC_Z | key_range::BASIC_MINUS => CapsWordKey::Shifted,
        key_range::BASIC_1..=key_range::BASIC_0
        | key_range::BASIC_BACKSPACE
        | key_range::BASIC_DELETE => CapsWordKey::Continue,
        _ => CapsWordKey::Ends,
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct CapsWord {
    idle_until: u64,
}

impl Default for CapsWord {
    fn default() -> Self {
        Self {
            idle_until: u64::MAX,
        }
    }
}

impl CapsWord {
    pub(super) fn is_active(&self) -> bool {
        self.idle_until != u64::MAX
    }

    pub(super) fn idle_until(&self) -> u64 {
        self.idle_until
    }

    pub(super) fn touch(&mut self, now: u64, timeout: u16) {
        self.idle_until = now + timeout as u64;
    }

    pub(super) fn stop(&mut self) {
        self.idle_until = u64::MAX;
    }
}

#[cfg(test)]
#[path = "caps_word_test.rs"]
mod test;
