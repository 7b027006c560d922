use std::panic::{self, PanicHookInfo};

use tracing_subscriber::EnvFilter;

use crate::bootstrap::LogSettings;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this twice is
/// harmless; the second subscriber is simply not installed.
pub fn init_logging(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let installed = if settings.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().with_target(false).try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init()
    };

    if installed.is_err() {
        crate::quill_log!(Debug, "Logging already initialized, keeping existing subscriber");
    }
}

pub fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info: &PanicHookInfo| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("Unknown panic");
        let location = if let Some(loc) = panic_info.location() {
            format!("{}:{}", loc.file(), loc.line())
        } else {
            "unknown location".to_string()
        };
        crate::quill_log!(Error, format!("Panic at {}: {}", location, payload));
    }));
}

#[macro_export]
macro_rules! quill_log {
    (Trace, $msg:expr) => {
        ::tracing::trace!("{}", $msg)
    };
    (Debug, $msg:expr) => {
        ::tracing::debug!("{}", $msg)
    };
    (Info, $msg:expr) => {
        ::tracing::info!("{}", $msg)
    };
    (Warning, $msg:expr) => {
        ::tracing::warn!("{}", $msg)
    };
    (Error, $msg:expr) => {
        ::tracing::error!("{}", $msg)
    };
}
