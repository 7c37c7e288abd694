// Small levelled logger writing timestamped DEBUG/INFO/ERROR lines to stderr.
// Stdout stays free for help text; the SQL always goes to the output file.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Ordered so that a plain >= comparison answers "is this level enabled".
const INFO_LEVEL: u8 = 0;
const DEBUG_LEVEL: u8 = 1;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(INFO_LEVEL);

// Set the global log level from the --debug flag.
pub fn set_debug(enabled: bool) {
    let level = if enabled { DEBUG_LEVEL } else { INFO_LEVEL };
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

pub fn is_debug() -> bool {
    LOG_LEVEL.load(Ordering::Relaxed) >= DEBUG_LEVEL
}

pub fn info(msg: &str) {
    log_line("INFO", msg);
}

// Print a DEBUG-level message if enabled.
pub fn debug(msg: &str) {
    if is_debug() {
        log_line("DEBUG", msg);
    }
}

pub fn error(msg: &str) {
    log_line("ERROR", msg);
}

fn log_line(level: &str, msg: &str) {
    eprintln!("{}", format_line(level, unix_secs(), msg));
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_line(level: &str, ts: u64, msg: &str) -> String {
    format!("[{}] {} {}", level, ts, msg)
}
