use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};

/// A key position with its switch state. [ScanKey::none] marks "no key".
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanKey {
    row: u8,
    col: u8,
    down: bool,
}
impl ScanKey {
    const NONE: u8 = 0xff;

    pub fn new(row: u8, col: u8, down: bool) -> Self {
        Self { row, col, down }
    }

    pub fn none() -> Self {
        Self::new(Self::NONE, Self::NONE, false)
    }

    pub fn is_none(&self) -> bool {
        self.col == Self::NONE
    }

    pub fn row(&self) -> usize {
        self.row.into()
    }

    pub fn column(&self) -> usize {
        self.col.into()
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    pub fn same_key(&self, other: ScanKey) -> bool {
        (self.row, self.col) == (other.row, other.col)
    }

    pub(crate) fn set_down(&mut self, down: bool) {
        self.down = down;
    }
}

/// Input to the mapper from the host framework's matrix scanner and encoder driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanEvent {
    Key(ScanKey),
    Encoder { index: u8, clockwise: bool },
}

pub struct ScanEventChannel<M: RawMutex, const N: usize>(Channel<M, ScanEvent, N>);
impl<M: RawMutex, const N: usize> Default for ScanEventChannel<M, N> {
    fn default() -> Self {
        Self(Channel::new())
    }
}
impl<M: RawMutex, const N: usize> ScanEventChannel<M, N> {
    pub async fn receive(&self) -> ScanEvent {
        self.0.receive().await
    }

    /// Queue a key change. Dropped when the channel is full.
    pub fn key_changed(&self, row: u8, col: u8, is_down: bool) {
        if self.0.try_send(ScanEvent::Key(ScanKey::new(row, col, is_down))).is_err() {
            crate::warn!("scan channel full; dropped key {}x{}", row, col);
        }
    }

    /// Queue one detent of encoder `index`. Dropped when the channel is full.
    pub fn encoder_turned(&self, index: u8, clockwise: bool) {
        if self
            .0
            .try_send(ScanEvent::Encoder { index, clockwise })
            .is_err()
        {
            crate::warn!("scan channel full; dropped encoder {}", index);
        }
    }

    #[cfg(test)]
    pub(crate) fn try_receive(&self) -> Option<ScanEvent> {
        self.0.try_receive().ok()
    }
}

#[cfg(test)]
#[path = "scan_key_test.rs"]
mod test;
