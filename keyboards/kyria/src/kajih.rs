//! Plain Qwerty and Colemak-DH for the rev2 board.

splitmap_macros::configure_keymap!("keymaps/kajih.conf");

crate::keymap_items!();
