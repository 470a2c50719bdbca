//! Embeds a compiled keymap into a keyboard crate. See [configure_keymap!].
extern crate proc_macro;

mod build;

/// Compile a keymap conf file, relative to the calling crate's manifest directory, and define
/// the constants needed to run it:
///
/// `LAYOUT_MAPPING`, `ROW_COUNT`, `COL_COUNT`, `LAYOUT_MAX`, `REPORT_BUFFER_SIZE`,
/// `KEYBOARD_NAME` and `LAYER_NAMES`.
///
/// With no argument `keymap.conf` is used. Compile errors in the conf file are reported as Rust
/// compile errors.
#[proc_macro]
pub fn configure_keymap(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    build::configure_keymap(proc_macro2::TokenStream::from(input)).into()
}
