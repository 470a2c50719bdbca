//! Hooks into the host framework for actions the keymap can not perform itself.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

pub type ResetFn = &'static (dyn Fn() + Sync);

static RESET_TO_USB_BOOT: CriticalSectionMutex<RefCell<Option<ResetFn>>> =
    CriticalSectionMutex::new(RefCell::new(None));

/// Run the registered bootloader hook. The hook is consumed so a bouncing key can not call it
/// twice.
pub fn reset_to_usb_boot() {
    let hook = RESET_TO_USB_BOOT.lock(|r| r.borrow_mut().take());
    match hook {
        Some(f) => f(),
        None => crate::info!("no reset_to_usb_boot handler"),
    }
}

/// Register the function that jumps to the bootloader when the `reset_to_usb_boot` key is
/// released.
///
/// ```
/// use splitmap_firmware::firmware_functions::handle_reset_to_usb_boot;
///
/// fn enter_bootloader() {}
///
/// handle_reset_to_usb_boot(Some(&enter_bootloader));
/// ```
pub fn handle_reset_to_usb_boot(value: Option<ResetFn>) {
    RESET_TO_USB_BOOT.lock(|r| {
        *r.borrow_mut() = value;
    });
}

