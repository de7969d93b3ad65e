// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::fmt::Display;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `fallback_filter`; with neither set everything at
/// `info` and above is printed. Calling this more than once is harmless.
pub fn init_tracing(fallback_filter: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// An error that ends the process with its own exit code.
///
/// Codes must be non-zero and unique per kind so a failing run can be told
/// apart without reading the log.
pub trait FatalCode: Display {
    fn exit_code(&self) -> u8;
}

/// Logs `err` and exits the process with its code.
pub fn terminate(err: &dyn FatalCode) -> ! {
    let code = err.exit_code();
    tracing::error!(code, "fatal: {err}");
    std::process::exit(i32::from(code))
}
