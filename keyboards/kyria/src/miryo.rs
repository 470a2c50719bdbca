//! Qwerty and Colemak-DH with home row modifiers. Holding Nav and Num together reaches the
//! Tri-State layer.

splitmap_macros::configure_keymap!("keymaps/miryo.conf");

crate::keymap_items!();
