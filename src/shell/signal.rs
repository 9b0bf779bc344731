//! Ctrl-C handling.
//!
//! A SIGINT handler flips a process-wide flag. Running commands poll it,
//! kill their process group, and return [`DotstrapError::UserCancelled`].
//!
//! [`DotstrapError::UserCancelled`]: crate::error::DotstrapError::UserCancelled

use std::sync::atomic::{AtomicBool, Ordering};

static CANCELLED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    CANCELLED.store(true, Ordering::SeqCst);
}

/// Install the SIGINT handler. Call once from `main`.
pub fn install_handler() {
    #[cfg(unix)]
    {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
        unsafe {
            libc::signal(
                libc::SIGINT,
                on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
            );
        }
    }
}

/// Whether the user pressed Ctrl-C.
pub fn is_cancelled() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}
