use std::collections::HashMap;

use lazy_static::lazy_static;

pub mod prop {
    use splitmap_common::globals;

    #[derive(Clone, Copy, Debug, PartialEq)]
    pub enum GlobalType {
        Timeout { value: u16, max: u16, min: u16 },
        TriLayer(u16),
    }
    use GlobalType::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct GlobalProp {
        pub index: u16,
        pub kind: GlobalType,
    }

    impl GlobalProp {
        pub fn new_default(name: &str) -> Result<GlobalProp, String> {
            super::DEFAULTS
                .get(name)
                .ok_or_else(|| format!("Invalid global '{}'", name))
                .copied()
        }

        pub fn default_name(&self) -> Option<&'static str> {
            super::INDEX_TO_NAME.get(self.index as usize).copied()
        }

        pub fn value(&self) -> u16 {
            match self.kind {
                Timeout { value, .. } => value,
                TriLayer(value) => value,
            }
        }

        /// Set a timeout value, checking it is within the allowed range.
        pub fn with_value(mut self, v: u16) -> Result<Self, String> {
            match self.kind {
                Timeout {
                    ref mut value,
                    max,
                    min,
                } => {
                    if v < min || v > max {
                        return Err(format!(
                            "Invalid duration; only {} to {} milliseconds are valid",
                            min, max
                        ));
                    }
                    *value = v;
                }
                TriLayer(ref mut value) => *value = v,
            }
            Ok(self)
        }

        pub fn deserialize(data: &mut impl Iterator<Item = u16>) -> Option<Self> {
            let index = data.next()?;
            let name = super::INDEX_TO_NAME.get(index as usize).copied()?;
            let gp = GlobalProp::new_default(name).ok()?;
            gp.with_value(data.next()?).ok()
        }

        pub fn serialize(self) -> [u16; 2] {
            [self.index, self.value()]
        }
    }

    const fn timeout(index: u16, max: u16) -> GlobalProp {
        GlobalProp {
            index,
            kind: Timeout {
                value: globals::DEFAULTS[index as usize],
                min: 0,
                max,
            },
        }
    }

    pub(super) const GLOBALS: [GlobalProp; globals::GLOBALS_LEN] = [
        timeout(globals::DUAL_ACTION_TIMEOUT, 5000),
        timeout(globals::DUAL_ACTION_TIMEOUT2, 5000),
        timeout(globals::TAPDANCE_TAP_TIMEOUT, 5000),
        timeout(globals::CAPS_WORD_IDLE_TIMEOUT, 60000),
        GlobalProp {
            index: globals::TRI_LAYER,
            kind: TriLayer(globals::TRI_LAYER_NONE),
        },
    ];
}

lazy_static! {
    pub static ref INDEX_TO_NAME: [&'static str; 5] = [
        "dual_action_timeout",
        "dual_action_timeout2",
        "tapdance_tap_timeout",
        "caps_word_idle_timeout",
        "tri_layer",
    ];
    pub static ref DEFAULTS: HashMap<&'static str, prop::GlobalProp> = {
        let mut m = HashMap::new();
        m.insert("tapping_term", prop::GLOBALS[0]);
        m.insert("overload_tap_timeout", prop::GLOBALS[0]);
        for (k, v) in INDEX_TO_NAME.iter().zip(prop::GLOBALS.iter()) {
            m.insert(*k, *v);
        }
        m
    };
}

#[cfg(test)]
#[path = "globals_test.rs"]
mod test;
