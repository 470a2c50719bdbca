//! Mirror the primary half's status onto the secondary half.
//!
//! The primary half owns the USB connection and the keymap; it captures a [StatusBuffer] and
//! sends it over the split link. The secondary half only ever displays what it last received.

use embassy_sync::{blocking_mutex::raw::NoopRawMutex, signal::Signal};

use crate::status::StatusBuffer;

/// Transport between the halves. Delivery is best effort; a lost payload is replaced by the
/// next one.
pub trait HalfLink {
    fn send(&mut self, payload: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalfRole {
    Primary,
    Secondary,
}

pub struct SplitMirror<L: HalfLink> {
    role: HalfRole,
    link: L,
    local: StatusBuffer,
}

impl<L: HalfLink> SplitMirror<L> {
    pub fn new(role: HalfRole, link: L) -> Self {
        Self {
            role,
            link,
            local: StatusBuffer::empty(),
        }
    }

    pub fn role(&self) -> HalfRole {
        self.role
    }

    /// Send `status` to the other half. Only the primary half publishes; the secondary ignores
    /// the call.
    pub fn publish(&mut self, status: StatusBuffer) {
        if self.role == HalfRole::Primary {
            self.local = status;
            self.link.send(status.as_bytes());
        } else {
            crate::debug!("secondary half does not publish");
        }
    }

    /// Forward text from the host to the secondary half's display.
    pub fn relay_host_text(&mut self, text: &[u8]) {
        if self.role == HalfRole::Primary {
            self.link.send(StatusBuffer::host_text(text).as_bytes());
        }
    }

    /// Accept a payload from the other half. Only the secondary half updates its copy.
    pub fn receive(&mut self, payload: &[u8]) {
        if self.role == HalfRole::Secondary {
            self.local = StatusBuffer::from_bytes(payload);
        }
    }

    /// The status this half displays.
    pub fn local(&self) -> &StatusBuffer {
        &self.local
    }
}

/// A [HalfLink] that hands each payload to a task on the same executor.
pub struct SignalLink<'a>(pub &'a Signal<NoopRawMutex, StatusBuffer>);

impl HalfLink for SignalLink<'_> {
    fn send(&mut self, payload: &[u8]) {
        self.0.signal(StatusBuffer::from_bytes(payload));
    }
}

#[cfg(test)]
#[path = "split_mirror_test.rs"]
mod test;
