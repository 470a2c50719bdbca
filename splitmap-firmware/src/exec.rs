//! Tasks that tie the mapper and the display to the host framework.

use embassy_sync::{blocking_mutex::raw::NoopRawMutex, signal::Signal};
use embassy_time::{Duration, Ticker};
use static_cell::StaticCell;

use crate::{
    display::{self, OledText, OLED_BUFFER_SIZE},
    layer::LayerNames,
    layout::LoadError,
    mapper::{KeyboardState, Mapper, MapperChannel},
    scan_key::ScanEventChannel,
    split_mirror::{HalfLink, SplitMirror},
    status::{LedState, StatusBuffer},
};

// How many scan events can be stored before the scanner drops them
pub const SCANNER_BUFFER_SIZE: usize = 32;
// How many key events can be queued for the host before the mapper clears them
pub const REPORT_BUFFER_SIZE: usize = 32;
pub const DISPLAY_REFRESH_MS: u64 = 100;

pub type ScanChannel = ScanEventChannel<NoopRawMutex, SCANNER_BUFFER_SIZE>;
pub type MpChannel = MapperChannel<NoopRawMutex, REPORT_BUFFER_SIZE>;

static SCAN_CHANNEL: StaticCell<ScanChannel> = StaticCell::new();
static MAPPER_CHANNEL: StaticCell<MpChannel> = StaticCell::new();

/// Allocate the channels shared by the tasks. Returns `None` if called more than once.
pub fn init_channels() -> Option<(&'static ScanChannel, &'static MpChannel)> {
    let scan = SCAN_CHANNEL.try_init(ScanChannel::default())?;
    let mapper = MAPPER_CHANNEL.try_init(MpChannel::default())?;
    Some((scan, mapper))
}

/// Feeds from the host framework into [display_run].
#[derive(Default)]
pub struct DisplayInputs {
    pub leds: Signal<NoopRawMutex, LedState>,
    /// Payloads received from the other half.
    pub from_other_half: Signal<NoopRawMutex, StatusBuffer>,
    /// Host text to show on the secondary half.
    pub host_text: Signal<NoopRawMutex, StatusBuffer>,
}

/// Load `layout_mapping` then map scan events until [crate::mapper::ControlSignal::exit].
pub async fn mapper_run<'c, const ROW_COUNT: usize, const COL_COUNT: usize, const LAYOUT_MAX: usize>(
    scan_channel: &'c ScanChannel,
    mapper_channel: &'c MpChannel,
    layout_mapping: &[u16],
) -> Result<(), LoadError> {
    let mut mapper =
        Mapper::<ROW_COUNT, COL_COUNT, LAYOUT_MAX, _, REPORT_BUFFER_SIZE>::new(mapper_channel);

    if let Err(err) = mapper.load_layout(layout_mapping.iter().copied()) {
        crate::warn!("error loading layout {:?}", err);
        return Err(err);
    }
    crate::info!("layout loaded");

    mapper.run(scan_channel).await;

    Ok(())
}

/// Redraw the display every [DISPLAY_REFRESH_MS]. `draw` receives the characters to show.
pub async fn display_run<L: HalfLink>(
    mapper_channel: &MpChannel,
    mirror: &mut SplitMirror<L>,
    names: LayerNames<'_>,
    inputs: &DisplayInputs,
    mut draw: impl FnMut(&[u8]),
) {
    let mut ticker = Ticker::every(Duration::from_millis(DISPLAY_REFRESH_MS));
    let mut state = KeyboardState {
        default_layer_state: 1,
        ..Default::default()
    };
    let mut leds = LedState::default();
    let mut out = OledText::<OLED_BUFFER_SIZE>::new();

    loop {
        if let Some(s) = mapper_channel.try_take_state() {
            state = s;
        }
        if let Some(l) = inputs.leds.try_take() {
            leds = l;
        }
        if let Some(payload) = inputs.from_other_half.try_take() {
            mirror.receive(payload.as_bytes());
        }
        if let Some(text) = inputs.host_text.try_take() {
            mirror.relay_host_text(text.text());
        }

        match display::refresh(mirror, &state, &names, leds, &mut out) {
            Ok(()) => draw(out.as_bytes()),
            Err(_) => crate::warn!("display text overflow"),
        }

        ticker.next().await;
    }
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod test;
