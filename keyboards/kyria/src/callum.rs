//! One shot modifiers on the home row of the opposite half while a space or backspace thumb key
//! is held.

splitmap_macros::configure_keymap!("keymaps/callum.conf");

crate::keymap_items!();
