//! Text rendering for the OLED on each half.
//!
//! The OLED driver belongs to the host framework; this module only produces the characters to
//! draw. Bytes from `0x80` up index logo glyphs in the display font.

use core::fmt;

use heapless::Vec;
use splitmap_common::keycodes::modifiers::{ALT_MASK, CTRL_MASK, GUI_MASK, SHIFT_MASK};

use crate::{
    layer::{LayerNames, UNDEFINED},
    mapper::KeyboardState,
    split_mirror::{HalfLink, HalfRole, SplitMirror},
    status::{LedState, StatusBuffer, StatusKind},
};

/// 21 columns by 8 rows of 6x8 characters.
pub const OLED_BUFFER_SIZE: usize = 168;

pub const LOGO: [u8; 63] = {
    let mut logo = [0; 63];
    let mut i = 0;
    while i < 21 {
        logo[i] = 0x80 + i as u8;
        logo[21 + i] = 0xa0 + i as u8;
        logo[42 + i] = 0xc0 + i as u8;
        i += 1;
    }
    logo
};

/// Characters to draw, filled from the top left of the display.
#[derive(Debug, Default)]
pub struct OledText<const N: usize>(Vec<u8, N>);

impl<const N: usize> OledText<N> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        self.0.extend_from_slice(bytes).map_err(|_| fmt::Error)
    }
}

impl<const N: usize> fmt::Write for OledText<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes())
    }
}

pub fn render_logo<const N: usize>(out: &mut OledText<N>) -> fmt::Result {
    out.push_bytes(&LOGO)
}

/// Layer name, host LEDs and held modifiers.
pub fn render_status<const N: usize>(status: &StatusBuffer, out: &mut OledText<N>) -> fmt::Result {
    use fmt::Write;

    let name = status.layer_name().unwrap_or(UNDEFINED);
    write!(out, "\nLayer: {}\n", name)?;

    let leds = status.leds();
    out.write_str(if leds.num_lock() { "NUMLCK " } else { "       " })?;
    out.write_str(if leds.caps_lock() { "CAPLCK " } else { "       " })?;
    out.write_str(if leds.scroll_lock() { "SCRLCK " } else { "       " })?;

    let mods = status.modifiers();
    for (mask, c) in [
        (SHIFT_MASK, 'S'),
        (CTRL_MASK, 'C'),
        (ALT_MASK, 'A'),
        (GUI_MASK, 'G'),
    ] {
        out.write_char(if mods & mask != 0 { c } else { ' ' })?;
    }
    out.write_char(if status.caps_word() { 'W' } else { ' ' })
}

pub fn render_primary<const N: usize>(status: &StatusBuffer, out: &mut OledText<N>) -> fmt::Result {
    render_logo(out)?;
    render_status(status, out)
}

/// Draw whatever the secondary half last received.
pub fn render_secondary<const N: usize>(
    mirrored: &StatusBuffer,
    out: &mut OledText<N>,
) -> fmt::Result {
    render_logo(out)?;
    match mirrored.kind() {
        StatusKind::Status => render_status(mirrored, out),
        StatusKind::HostText => out.push_bytes(mirrored.text()),
        StatusKind::Empty => Ok(()),
    }
}

/// One display tick. The primary half captures and publishes its status; the secondary half
/// renders its mirrored copy.
pub fn refresh<L: HalfLink, const N: usize>(
    mirror: &mut SplitMirror<L>,
    state: &KeyboardState,
    names: &LayerNames,
    leds: LedState,
    out: &mut OledText<N>,
) -> fmt::Result {
    out.clear();
    match mirror.role() {
        HalfRole::Primary => {
            let status = StatusBuffer::capture(state, names, leds);
            mirror.publish(status);
            render_primary(&status, out)
        }
        HalfRole::Secondary => render_secondary(mirror.local(), out),
    }
}

#[cfg(test)]
#[path = "display_test.rs"]
mod test;
