//! Layer state helpers shared by the mapper and the status display.

use crate::layer_bit;

/// Display name used for a layer id that has no name.
pub const UNDEFINED: &str = "Undefined";

/// The highest layer set in either `layer_state` or `default_layer_state`; `0` when neither has a
/// layer set.
///
/// This is the layer shown on the display. Key lookup searches the same union from highest to
/// lowest.
pub const fn resolve_display_layer(layer_state: u32, default_layer_state: u32) -> u8 {
    let union = layer_state | default_layer_state;
    if union == 0 {
        0
    } else {
        (31 - union.leading_zeros()) as u8
    }
}

/// Turn on `result` when both `a` and `b` are on, otherwise turn it off.
pub const fn update_tri_layer_state(state: u32, a: u8, b: u8, result: u8) -> u32 {
    let mask = layer_bit(a as u16) | layer_bit(b as u16);
    let result = layer_bit(result as u16);
    if mask != 0 && state & mask == mask {
        state | result
    } else {
        state & !result
    }
}

/// Display names indexed by layer id.
#[derive(Debug, Clone, Copy)]
pub struct LayerNames<'n>(&'n [&'n str]);

impl<'n> LayerNames<'n> {
    pub const fn new(names: &'n [&'n str]) -> Self {
        Self(names)
    }

    pub fn name(&self, layer: u8) -> &'n str {
        self.0.get(layer as usize).copied().unwrap_or(UNDEFINED)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[path = "layer_test.rs"]
mod test;
