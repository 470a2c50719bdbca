#![no_std]
//! Constants shared between the keymap compiler ([splitmap-config]) and the keymap runtime
//! ([splitmap-firmware]).
//!
//! [splitmap-config]: https://docs.rs/splitmap-config
//! [splitmap-firmware]: https://docs.rs/splitmap-firmware

pub mod globals;
pub mod keycodes;

/// Version of the binary layout format. Bumped whenever the header or macro encoding changes.
pub const PROTOCOL_VERSION: u16 = 1;

/// The most layers a keymap may declare; layer state is held in a `u32` bitmask.
pub const MAX_LAYERS: usize = 32;

/// The most rotary encoders a keymap may assign actions to.
pub const MAX_ENCODERS: usize = 16;

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
