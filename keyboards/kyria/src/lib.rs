#![no_std]
//! Keymaps for the splitkb Kyria.
//!
//! Each module embeds one compiled keymap from `keymaps/`. The host framework picks a module,
//! feeds its scan events to [miryo::mapper_run] (or the equivalent in another module) and shows
//! [Keymap::layer_names] on the display.

use splitmap_firmware::layer::LayerNames;

pub mod callum;
pub mod kajih;
pub mod miryo;

/// Both halves of a Kyria scanned as one matrix: the left half in columns 0 to 7, the right half
/// in columns 8 to 15.
pub const ROW_COUNT: usize = 4;
pub const COL_COUNT: usize = 16;

/// A compiled keymap and the names to show for its layers.
#[derive(Debug, Clone, Copy)]
pub struct Keymap {
    pub name: &'static str,
    pub layout: &'static [u16],
    pub layer_names: LayerNames<'static>,
}

pub const KEYMAPS: [Keymap; 3] = [miryo::KEYMAP, callum::KEYMAP, kajih::KEYMAP];

/// Find a keymap by its full name (`kyria/rev3/miryo`) or by its last part (`miryo`).
pub fn keymap(name: &str) -> Option<Keymap> {
    KEYMAPS
        .iter()
        .find(|k| k.name == name || k.name.rsplit('/').next() == Some(name))
        .copied()
}

/// Items shared by every keymap module; expects the constants from
/// `splitmap_macros::configure_keymap!` to be in scope.
macro_rules! keymap_items {
    () => {
        const _: () = assert!(ROW_COUNT == crate::ROW_COUNT && COL_COUNT == crate::COL_COUNT);
        const _: () = assert!(REPORT_BUFFER_SIZE == splitmap_firmware::exec::REPORT_BUFFER_SIZE);

        pub const KEYMAP: crate::Keymap = crate::Keymap {
            name: KEYBOARD_NAME,
            layout: LAYOUT_MAPPING,
            layer_names: LAYER_NAMES,
        };

        pub type Mapper<'c> = splitmap_firmware::mapper::Mapper<
            'c,
            ROW_COUNT,
            COL_COUNT,
            LAYOUT_MAX,
            embassy_sync::blocking_mutex::raw::NoopRawMutex,
            REPORT_BUFFER_SIZE,
        >;

        /// Load this keymap and map scan events until told to exit.
        pub async fn mapper_run(
            scan_channel: &splitmap_firmware::exec::ScanChannel,
            mapper_channel: &splitmap_firmware::exec::MpChannel,
        ) -> Result<(), splitmap_firmware::layout::LoadError> {
            splitmap_firmware::exec::mapper_run::<ROW_COUNT, COL_COUNT, LAYOUT_MAX>(
                scan_channel,
                mapper_channel,
                LAYOUT_MAPPING,
            )
            .await
        }
    };
}
pub(crate) use keymap_items;

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
