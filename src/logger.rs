//! Logging utilities: colored, module-prefixed terminal output plus a
//! throttled single-line progress display for the render phase.

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::{Write, stdout};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message, only when verbose mode is enabled.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    println!("{} {}", format!("[{module}]").cyan(), message);
}

pub fn warn(module: &str, message: &str) {
    println!("{} {}", format!("[{module}]").yellow(), message);
}

pub fn error(module: &str, message: &str) {
    eprintln!("{} {}", format!("[{module}]").red(), message);
}

/// A throttled single-line progress display with multiple named counters.
/// Batches screen updates (by count or elapsed time) so the redraw itself
/// never dominates the render hot loop.
pub struct ProgressLine {
    counters: Mutex<Vec<(String, AtomicUsize, usize)>>,
    last_draw: Mutex<Instant>,
    updates_since_draw: AtomicUsize,
    min_interval: Duration,
    batch_size: usize,
}

impl ProgressLine {
    pub fn new(counters: &[(&str, usize)]) -> Self {
        Self {
            counters: Mutex::new(
                counters
                    .iter()
                    .map(|(name, total)| ((*name).to_string(), AtomicUsize::new(0), *total))
                    .collect(),
            ),
            last_draw: Mutex::new(Instant::now()),
            updates_since_draw: AtomicUsize::new(0),
            min_interval: Duration::from_millis(100),
            batch_size: 25,
        }
    }

    pub fn inc(&self, name: &str) {
        let counters = self.counters.lock();
        if let Some((_, counter, _)) = counters.iter().find(|(n, _, _)| n == name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        drop(counters);
        self.maybe_draw();
    }

    fn maybe_draw(&self) {
        let pending = self.updates_since_draw.fetch_add(1, Ordering::Relaxed) + 1;
        let should_draw = pending >= self.batch_size || {
            let last = *self.last_draw.lock();
            last.elapsed() >= self.min_interval
        };
        if should_draw {
            self.draw();
        }
    }

    fn draw(&self) {
        let counters = self.counters.lock();
        let line = counters
            .iter()
            .map(|(name, count, total)| format!("{name}: {}/{total}", count.load(Ordering::Relaxed)))
            .collect::<Vec<_>>()
            .join("  ");
        print!("\r{line}");
        let _ = stdout().flush();
        drop(counters);
        *self.last_draw.lock() = Instant::now();
        self.updates_since_draw.store(0, Ordering::Relaxed);
    }

    pub fn finish(&self) {
        self.draw();
        println!();
    }
}

static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Reserve a visual "slot" for a progress line, so concurrent logging from
/// other phases knows to avoid clobbering it. A simple counting token;
/// dropping it releases the slot.
pub struct ProgressSlot;

impl ProgressSlot {
    pub fn acquire() -> Self {
        BAR_COUNT.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for ProgressSlot {
    fn drop(&mut self) {
        BAR_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub static ACTIVE_PROGRESS: LazyLock<AtomicUsize> = LazyLock::new(|| AtomicUsize::new(0));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_increments() {
        let p = ProgressLine::new(&[("pages", 10)]);
        p.inc("pages");
        p.inc("pages");
        let counters = p.counters.lock();
        assert_eq!(counters[0].1.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn verbose_flag_roundtrips() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
