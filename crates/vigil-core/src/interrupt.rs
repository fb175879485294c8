//! Operator reset requests.
//!
//! The operator's stop keystroke (SIGTSTP) asks the orchestrator to forget
//! the selected protocol and its accumulated metrics. The signal handler only
//! raises a flag; the cycle driver checks it between cycles, so a reset never
//! lands in the middle of a running cycle.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::Result;

/// Flag raised by the installed signal handler.
static HANDLER_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Shared reset request flag.
#[derive(Debug, Clone, Default)]
pub struct ResetFlag {
    requested: Arc<AtomicBool>,
}

impl ResetFlag {
    /// A flag not connected to any signal. Resets are raised with
    /// [`request`](Self::request).
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGTSTP to this flag.
    ///
    /// Only the first flag installed in a process receives the signal;
    /// later calls return the already installed flag.
    pub fn install() -> Result<Self> {
        let requested = HANDLER_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)));
        install_handler(libc::SIGTSTP)?;
        Ok(Self {
            requested: requested.clone(),
        })
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Consume a pending request.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

fn install_handler(signal: libc::c_int) -> io::Result<()> {
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    let ret = unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = reset_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(signal, &sa, std::ptr::null_mut())
    };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

extern "C" fn reset_handler(_sig: libc::c_int) {
    if let Some(flag) = HANDLER_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_request() {
        let flag = ResetFlag::new();
        assert!(!flag.take());
        flag.request();
        assert!(flag.is_requested());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = ResetFlag::new();
        let other = flag.clone();
        other.request();
        assert!(flag.take());
    }

    #[test]
    fn test_signal_raises_installed_flag() {
        let flag = ResetFlag::install().unwrap();
        flag.take();
        unsafe {
            libc::raise(libc::SIGTSTP);
        }
        assert!(flag.take());
    }
}
