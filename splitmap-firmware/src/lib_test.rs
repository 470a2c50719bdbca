extern crate std;

#[cfg(feature = "defmt")]
#[defmt::global_logger]
struct Logger;

#[cfg(feature = "defmt")]
unsafe impl defmt::Logger for Logger {
    fn acquire() {}

    unsafe fn release() {}

    unsafe fn write(_bytes: &[u8]) {}

    unsafe fn flush() {}
}

#[test]
fn layer_bit() {
    assert_eq!(crate::layer_bit(0), 1);
    assert_eq!(crate::layer_bit(5), 0b10_0000);
    assert_eq!(crate::layer_bit(31), 0x8000_0000);
    assert_eq!(crate::layer_bit(32), 0);
}
