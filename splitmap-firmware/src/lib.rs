#![no_std]
//! Keymap runtime for split keyboards.
//!
//! A [mapper::Mapper] turns [scan_key::ScanEvent]s into [mapper::KeyEvent]s using a compiled
//! layout (see `splitmap-config`). Layer state, dual actions, tap dances, shift swaps and caps
//! word are resolved here; USB reporting, matrix scanning and the physical split link are left to
//! the host framework.
pub mod display;
pub mod exec;
pub mod firmware_functions;
pub mod layer;
pub mod layout;
pub mod mapper;
pub mod scan_key;
pub mod shift_swap;
pub mod split_mirror;
pub mod status;
pub mod tap_dance;

#[macro_use]
mod macros;

/// Bit for `layer` in a layer state mask; `0` when the layer can not be represented.
pub(crate) const fn layer_bit(layer: u16) -> u32 {
    if layer < 32 {
        1 << layer
    } else {
        0
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
