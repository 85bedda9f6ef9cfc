//! Tracing setup.
//!
//! Startup initializes the logger twice: once at "info" before the config
//! file is available, then again at the configured level.  The first call
//! installs the global subscriber with a reloadable filter; later calls
//! swap the filter in place.

use std::sync::{Mutex, OnceLock};

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::error::AppError;

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

// Serializes install-vs-reload; concurrent first calls would both reach
// `try_init` otherwise.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialize (or re-initialize) the global logger at `level`.
///
/// `level` accepts any `EnvFilter` directive string, e.g. `"info"` or
/// `"debug,rusqlite=warn"`.
pub fn init(level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| AppError::Logger(format!("invalid log level {level:?}: {e}")))?;

    let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(handle) = FILTER_HANDLE.get() {
        return handle
            .reload(filter)
            .map_err(|e| AppError::Logger(format!("could not reload filter: {e}")));
    }

    let (filter_layer, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| AppError::Logger(format!("could not install subscriber: {e}")))?;

    let _ = FILTER_HANDLE.set(handle);
    Ok(())
}
