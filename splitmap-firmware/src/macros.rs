//! `debug!`, `info!`, `warn!` and `error!` for the firmware.
//!
//! They forward to `defmt` with the `defmt` feature and print to stderr in tests (or with
//! `test-utils`). Otherwise the arguments are evaluated and dropped. Only `{}` and `{:?}`
//! placeholders work in all three.

#[allow(unused)]
#[cfg(all(not(test), not(feature = "defmt"), not(feature = "test-utils")))]
mod silent {
    #[macro_export]
    macro_rules! debug {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }
}

#[cfg(all(not(test), feature = "defmt"))]
mod defmt {
    #[macro_export]
    macro_rules! debug {
        ($($arg:expr),*) => { defmt::debug!($($arg,)*) };
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:expr),*) => { defmt::info!($($arg,)*) };
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:expr),*) => { defmt::warn!($($arg,)*) };
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:expr),*) => { defmt::error!($($arg,)*) };
    }
}

#[cfg(any(test, all(feature = "test-utils", not(feature = "defmt"))))]
pub mod host {
    extern crate std;

    #[doc(hidden)]
    pub fn log(level: &str, args: core::fmt::Arguments) {
        std::eprintln!("{level}: {args}");
    }

    #[doc(hidden)]
    pub fn log_at(level: &str, file: &str, line: u32, args: core::fmt::Arguments) {
        std::eprintln!("\n{level}: at ./{file}:{line}:\n{args}");
    }

    #[macro_export]
    macro_rules! debug {
        ($($arg:expr),*) => { $crate::macros::host::log("DEBUG", format_args!($($arg,)*)) };
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:expr),*) => { $crate::macros::host::log("INFO", format_args!($($arg,)*)) };
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:expr),*) => { $crate::macros::host::log("WARN", format_args!($($arg,)*)) };
    }

    /// Panics under test so unexpected errors fail the test.
    #[macro_export]
    macro_rules! error {
        ($($arg:expr),*) => {{
            if cfg!(test) {
                panic!($($arg,)*);
            } else {
                $crate::macros::host::log_at("ERROR", file!(), line!(), format_args!($($arg,)*))
            }
        }};
    }
}

#[cfg(test)]
mod test_keycodes {
    /// Look up a key name the way keymap files do.
    #[macro_export]
    macro_rules! kc {
        ($a:expr) => {
            match splitmap_config::keycodes::key_code($a) {
                Some(kc) => kc,
                None => panic!("Unknown key mnemonic: {:?}", $a),
            }
        };
    }
}
