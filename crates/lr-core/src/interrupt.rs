//! SIGINT/SIGTERM handling.
//!
//! The first signal sets a shared flag that the stream processor polls
//! after each batch. The handler then reinstalls the default disposition,
//! so a second signal terminates the process immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static CANCEL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// The process-wide cancellation flag.
pub fn cancel_flag() -> Arc<AtomicBool> {
    CANCEL_FLAG
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// Whether a cancellation signal has been received.
pub fn is_interrupted() -> bool {
    CANCEL_FLAG
        .get()
        .map(|flag| flag.load(Ordering::SeqCst))
        .unwrap_or(false)
}

/// Install handlers for SIGINT and SIGTERM and return the flag they set.
#[cfg(unix)]
pub fn install() -> Arc<AtomicBool> {
    let flag = cancel_flag();
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only performs an atomic store and calls
    // signal(2), both async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
    flag
}

#[cfg(not(unix))]
pub fn install() -> Arc<AtomicBool> {
    cancel_flag()
}

#[cfg(unix)]
extern "C" fn on_signal(signum: libc::c_int) {
    if let Some(flag) = CANCEL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
    // SAFETY: restoring the default disposition is async-signal-safe.
    unsafe {
        libc::signal(signum, libc::SIG_DFL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared() {
        let a = cancel_flag();
        let b = cancel_flag();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_handler_sets_flag_then_restores_default() {
        let flag = cancel_flag();
        flag.store(false, Ordering::SeqCst);
        on_signal(libc::SIGTERM);
        assert!(flag.load(Ordering::SeqCst));
        assert!(is_interrupted());
        flag.store(false, Ordering::SeqCst);
    }
}
