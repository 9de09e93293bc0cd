//! Logging configuration for the phs front end
//!
//! Thin wrappers around `log` and `env_logger`, shared by the `phsc` binary,
//! the integration tests and the benches.
//!
//! # Usage
//!
//! ```rust,ignore
//! use compiler::logging;
//!
//! // Initialize with default level (Warn)
//! logging::init();
//!
//! // Or initialize from RUST_LOG environment variable
//! logging::init_from_env();
//!
//! // Or initialize with a specific level
//! logging::init_with_level(log::LevelFilter::Debug);
//! ```
//!
//! # Log Levels
//!
//! - `error!` - Failures of the driver itself (unreadable input, bad config)
//! - `warn!` - Recoverable driver-level anomalies
//! - `info!` - Pass boundaries (collect, resolve, late binding)
//! - `debug!` - Per-declaration decisions (symbol added, class resolved)
//! - `trace!` - Every lookup and capture step
//!
//! # Environment Variable
//!
//! ```bash
//! RUST_LOG=info phsc check main.ast.json
//! RUST_LOG=compiler::sema::lookup=trace phsc check main.ast.json
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging at Warn level. Subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging with a specific level. Subsequent calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {}:{} - {}",
                    record.level(),
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from `RUST_LOG`, defaulting to Warn.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initialize logging for tests; safe to call from every test.
pub fn init_test() {
    // try_init() doesn't panic if already initialized
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

/// Parse a level name from configuration (`"warn"`, `"debug"`, ...).
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// True once `init`, `init_with_level` or `init_from_env` ran.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
