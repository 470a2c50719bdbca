//! The fixed size status buffer shared between the keyboard halves.
//!
//! Layout of [StatusBuffer]:
//!
//! | byte  | content                                   |
//! |-------|-------------------------------------------|
//! | 0     | kind: 0 empty, 1 status, 2 host text      |
//! | 1     | highest active layer                      |
//! | 2     | host LED state                            |
//! | 3     | held modifiers                            |
//! | 4     | flags; bit 0 is caps word                 |
//! | 5     | length of the text that follows           |
//! | 6..32 | layer name or host text (UTF-8)           |

use crate::{layer::LayerNames, mapper::KeyboardState};

pub const STATUS_BUFFER_SIZE: usize = 32;

const KIND: usize = 0;
const LAYER: usize = 1;
const LEDS: usize = 2;
const MODS: usize = 3;
const FLAGS: usize = 4;
const TEXT_LEN: usize = 5;
const TEXT: usize = 6;

pub const TEXT_MAX: usize = STATUS_BUFFER_SIZE - TEXT;

const FLAG_CAPS_WORD: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusKind {
    Empty,
    Status,
    HostText,
}

/// Host keyboard LED bits as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedState(pub u8);
impl LedState {
    pub const NUM_LOCK: u8 = 1;
    pub const CAPS_LOCK: u8 = 2;
    pub const SCROLL_LOCK: u8 = 4;

    pub fn num_lock(&self) -> bool {
        self.0 & Self::NUM_LOCK != 0
    }

    pub fn caps_lock(&self) -> bool {
        self.0 & Self::CAPS_LOCK != 0
    }

    pub fn scroll_lock(&self) -> bool {
        self.0 & Self::SCROLL_LOCK != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusBuffer([u8; STATUS_BUFFER_SIZE]);

impl Default for StatusBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl StatusBuffer {
    pub const fn empty() -> Self {
        Self([0; STATUS_BUFFER_SIZE])
    }

    /// Snapshot the primary half's state for display and mirroring.
    pub fn capture(state: &KeyboardState, names: &LayerNames, leds: LedState) -> Self {
        let mut buf = Self::empty();
        let layer = state.display_layer();
        buf.0[KIND] = 1;
        buf.0[LAYER] = layer;
        buf.0[LEDS] = leds.0;
        buf.0[MODS] = state.modifiers;
        buf.0[FLAGS] = if state.caps_word { FLAG_CAPS_WORD } else { 0 };
        buf.set_text(names.name(layer).as_bytes());
        buf
    }

    /// Text sent by the host to be shown on the secondary half.
    pub fn host_text(text: &[u8]) -> Self {
        let mut buf = Self::empty();
        buf.0[KIND] = 2;
        buf.set_text(text);
        buf
    }

    /// Copy a received payload. Short payloads are zero filled and long ones truncated.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut buf = Self::empty();
        let n = data.len().min(STATUS_BUFFER_SIZE);
        buf.0[..n].copy_from_slice(&data[..n]);
        buf.0[TEXT_LEN] = buf.0[TEXT_LEN].min(TEXT_MAX as u8);
        buf
    }

    pub fn as_bytes(&self) -> &[u8; STATUS_BUFFER_SIZE] {
        &self.0
    }

    fn set_text(&mut self, text: &[u8]) {
        let mut n = text.len().min(TEXT_MAX);
        // keep whole UTF-8 characters
        while n < text.len() && n > 0 && text[n] & 0xc0 == 0x80 {
            n -= 1;
        }
        self.0[TEXT..TEXT + n].copy_from_slice(&text[..n]);
        self.0[TEXT_LEN] = n as u8;
    }

    pub fn kind(&self) -> StatusKind {
        match self.0[KIND] {
            1 => StatusKind::Status,
            2 => StatusKind::HostText,
            _ => StatusKind::Empty,
        }
    }

    pub fn layer(&self) -> u8 {
        self.0[LAYER]
    }

    pub fn leds(&self) -> LedState {
        LedState(self.0[LEDS])
    }

    pub fn modifiers(&self) -> u8 {
        self.0[MODS]
    }

    pub fn caps_word(&self) -> bool {
        self.0[FLAGS] & FLAG_CAPS_WORD != 0
    }

    pub fn text(&self) -> &[u8] {
        &self.0[TEXT..TEXT + self.0[TEXT_LEN] as usize]
    }

    /// The layer name of a status buffer; `None` when the text is not valid UTF-8.
    pub fn layer_name(&self) -> Option<&str> {
        core::str::from_utf8(self.text()).ok()
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod test;
