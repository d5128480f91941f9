//! Logging for usnjrnl
//!
//! Thin layer over the `log` facade. Every message carries a component tag
//! (`USN`, `BLOCK`, `TIMELINE`, ...) which is used as the log target, so
//! output can be filtered per component with `RUST_LOG=USN=debug`.
//!
//! The library never installs a logger itself; binaries call [`init`].

use log::Level;

/// Component tag for the journal scanner
pub const USN: &str = "USN";
/// Component tag for block reads
pub const BLOCK: &str = "BLOCK";
/// Component tag for timeline coalescing
pub const TIMELINE: &str = "TIMELINE";

/// Initialize the global logger.
///
/// `verbosity` 0 logs warnings, 1 info, 2 debug, 3+ trace. `RUST_LOG`
/// overrides the default when set. Calling this twice is harmless.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format_target(true)
    .try_init();
}

fn log(level: Level, module: &str, message: &str) {
    log::log!(target: module, level, "{}", message);
}

/// Log debug message
pub fn debug(module: &str, message: &str) {
    log(Level::Debug, module, message);
}

/// Log info message
pub fn info(module: &str, message: &str) {
    log(Level::Info, module, message);
}

/// Log warning message
pub fn warn(module: &str, message: &str) {
    log(Level::Warn, module, message);
}

/// Log error message
pub fn error(module: &str, message: &str) {
    log(Level::Error, module, message);
}

// ============================================================================
// Specialized logging functions for scanner events
// ============================================================================

/// Log a record slot that could not be decoded
pub fn log_corrupted_record(index: u64, stream_offset: u64, reason: &str) {
    if !log::log_enabled!(target: USN, Level::Debug) {
        return;
    }

    let msg = format!(
        "Corrupted record: index={}, offset=0x{:X}, reason={}",
        index, stream_offset, reason
    );
    debug(USN, &msg);
}

/// Log a record whose layout version is recognized but not implemented
pub fn log_unsupported_version(index: u64, stream_offset: u64, major: i16, minor: i16) {
    let msg = format!(
        "Unsupported record version {}.{}: index={}, offset=0x{:X}",
        major, minor, index, stream_offset
    );
    warn(USN, &msg);
}

/// Log bytes dropped at end of stream because they cannot hold a record
pub fn log_discarded_tail(stream_offset: u64, len: usize) {
    let msg = format!(
        "Discarding {} trailing bytes at offset 0x{:X} (below minimum record size)",
        len, stream_offset
    );
    debug(BLOCK, &msg);
}

/// Log a rewind of the underlying stream
pub fn log_rewind(stream_offset: u64, len: usize) {
    let msg = format!(
        "Rewinding {} unconsumed bytes to offset 0x{:X}",
        len, stream_offset
    );
    log(Level::Trace, BLOCK, &msg);
}

/// Log the outcome of a finished scan
pub fn log_scan_summary(records: u64, corrupted: u64, stream_len: u64) {
    let msg = format!(
        "Scan complete: records={}, corrupted={}, stream_len={}",
        records, corrupted, stream_len
    );
    info(USN, &msg);
}
