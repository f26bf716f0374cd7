//! Signal handling for daemon processes.
//!
//! Every bound signal leads to the same place: release the PID file, close
//! the log and exit with status 0. SIGTERM, SIGINT and SIGTSTP are delivered
//! through tokio streams, so the cleanup action runs on an ordinary task.
//! SIGILL is a fault signal that tokio refuses to register; it gets a raw
//! handler limited to `unlink` and `_exit`.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::DaemonError;

/// Signals that stop the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    /// SIGTERM.
    Terminate,
    /// SIGINT.
    Interrupt,
    /// SIGTSTP.
    TerminalStop,
    /// SIGILL.
    IllegalInstruction,
}

impl DaemonSignal {
    /// Signals delivered through the async runtime.
    pub const ROUTED: [DaemonSignal; 3] = [
        DaemonSignal::Terminate,
        DaemonSignal::Interrupt,
        DaemonSignal::TerminalStop,
    ];

    /// The OS signal behind this variant.
    pub fn os_signal(self) -> Signal {
        match self {
            DaemonSignal::Terminate => Signal::SIGTERM,
            DaemonSignal::Interrupt => Signal::SIGINT,
            DaemonSignal::TerminalStop => Signal::SIGTSTP,
            DaemonSignal::IllegalInstruction => Signal::SIGILL,
        }
    }
}

impl std::fmt::Display for DaemonSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.os_signal().as_str())
    }
}

/// Cleanup run when a bound signal arrives.
pub type SignalAction = Arc<dyn Fn(DaemonSignal) + Send + Sync>;

/// Routes OS signals to a single cleanup action.
#[derive(Clone)]
pub struct SignalRouter {
    sender: broadcast::Sender<DaemonSignal>,
    received: Arc<AtomicBool>,
}

impl SignalRouter {
    /// Create a new signal router.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            sender,
            received: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to received signals.
    pub fn subscribe(&self) -> broadcast::Receiver<DaemonSignal> {
        self.sender.subscribe()
    }

    /// Check whether any bound signal has arrived.
    pub fn is_signalled(&self) -> bool {
        self.received.load(Ordering::SeqCst)
    }

    /// Record `signal`, notify subscribers, then run `action`.
    pub fn dispatch(&self, signal: DaemonSignal, action: &SignalAction) {
        info!("Received {}", signal);
        self.received.store(true, Ordering::SeqCst);
        let _ = self.sender.send(signal);
        action(signal);
    }

    /// Bind SIGTERM, SIGINT and SIGTSTP to `action`.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn install(&self, action: SignalAction) -> Result<(), DaemonError> {
        use tokio::signal::unix::{signal, SignalKind};

        for daemon_signal in DaemonSignal::ROUTED {
            let kind = SignalKind::from_raw(daemon_signal.os_signal() as i32);
            let mut stream =
                signal(kind).map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

            let router = self.clone();
            let action = action.clone();
            tokio::spawn(async move {
                if stream.recv().await.is_some() {
                    router.dispatch(daemon_signal, &action);
                }
            });
        }

        info!("OS signal handlers installed (SIGTERM, SIGINT, SIGTSTP)");
        Ok(())
    }
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// PID file path read by the SIGILL handler.
static FAULT_PID_PATH: AtomicPtr<libc::c_char> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_fault(_signal: libc::c_int) {
    let path = FAULT_PID_PATH.load(Ordering::SeqCst);
    // SAFETY: unlink and _exit are async-signal-safe; `path` is either null
    // or a leaked, NUL-terminated CString that is never freed.
    unsafe {
        if !path.is_null() {
            libc::unlink(path);
        }
        libc::_exit(0);
    }
}

/// Bind SIGILL to "remove `pid_path`, exit 0".
pub fn install_fault_handler(pid_path: &Path) -> Result<(), DaemonError> {
    let c_path = CString::new(pid_path.as_os_str().as_bytes())
        .map_err(|e| DaemonError::SignalSetup(e.to_string()))?;
    // The previous path, if any, stays leaked: the handler may still be reading it.
    FAULT_PID_PATH.store(c_path.into_raw(), Ordering::SeqCst);

    let action = SigAction::new(
        SigHandler::Handler(on_fault),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only calls async-signal-safe functions.
    unsafe { sigaction(Signal::SIGILL, &action) }
        .map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

    debug!("SIGILL handler installed for {}", pid_path.display());
    Ok(())
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
