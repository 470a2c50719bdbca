use embassy_sync::{blocking_mutex::raw::NoopRawMutex, signal::Signal};

use crate::{
    layer::LayerNames,
    mapper::KeyboardState,
    status::{LedState, StatusKind},
};

use super::*;

extern crate std;
use std::vec::Vec;

#[derive(Default)]
struct Recorder(Vec<Vec<u8>>);

impl HalfLink for &mut Recorder {
    fn send(&mut self, payload: &[u8]) {
        self.0.push(payload.to_vec());
    }
}

fn status(layer_state: u32) -> StatusBuffer {
    StatusBuffer::capture(
        &KeyboardState {
            layer_state,
            default_layer_state: 1,
            modifiers: 0,
            caps_word: false,
        },
        &LayerNames::new(&["Base", "Nav"]),
        LedState::default(),
    )
}

#[test]
fn primary_publishes() {
    let mut rec = Recorder::default();
    let mut primary = SplitMirror::new(HalfRole::Primary, &mut rec);
    primary.publish(status(0b10));
    assert_eq!(primary.local().layer_name(), Some("Nav"));
    primary.receive(status(0).as_bytes());
    assert_eq!(primary.local().layer(), 1);
    primary.relay_host_text(b"hi");
    drop(primary);

    assert_eq!(rec.0.len(), 2);
    assert_eq!(StatusBuffer::from_bytes(&rec.0[0]), status(0b10));
    assert_eq!(StatusBuffer::from_bytes(&rec.0[1]).text(), b"hi");
}

#[test]
fn secondary_mirrors() {
    let mut rec = Recorder::default();
    let mut secondary = SplitMirror::new(HalfRole::Secondary, &mut rec);
    assert_eq!(secondary.role(), HalfRole::Secondary);
    assert_eq!(secondary.local().kind(), StatusKind::Empty);

    secondary.publish(status(0b10));
    secondary.relay_host_text(b"ignored");
    assert_eq!(secondary.local().kind(), StatusKind::Empty);

    secondary.receive(status(0b10).as_bytes());
    assert_eq!(secondary.local(), &status(0b10));

    secondary.receive(StatusBuffer::host_text(b"build ok").as_bytes());
    assert_eq!(secondary.local().kind(), StatusKind::HostText);
    assert_eq!(secondary.local().text(), b"build ok");
    drop(secondary);

    assert!(rec.0.is_empty());
}

#[test]
fn signal_link() {
    let signal = Signal::<NoopRawMutex, StatusBuffer>::new();
    let mut primary = SplitMirror::new(HalfRole::Primary, SignalLink(&signal));
    primary.publish(status(0b10));
    assert_eq!(signal.try_take(), Some(status(0b10)));
    assert_eq!(signal.try_take(), None);
}
