//! Background launches and the reaper that reclaims them.
//!
//! No table of job handles is kept. The `SIGCHLD` handler only raises a flag; the
//! command loop calls [`Jobs::reap_if_needed`] at points where no foreground child
//! is being waited on, so draining `waitpid(-1, WNOHANG)` can only collect
//! background children.
//!
//! Those points are the end of each input line and a Ctrl-C at the prompt. A
//! background child that exits while the shell sits idle at the prompt stays a
//! zombie until one of them comes around.

use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicBool, Ordering};

static CHILD_EXITED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigchld(_: libc::c_int) {
    CHILD_EXITED.store(true, Ordering::SeqCst);
}

extern "C" fn on_interactive_signal(_: libc::c_int) {}

/// Install the `SIGCHLD` flag handler.
pub fn install_sigchld_handler() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    // SAFETY: the handler only stores into an atomic.
    unsafe { signal::sigaction(Signal::SIGCHLD, &action) }.map(drop)
}

/// Keep the shell alive on `SIGINT`, `SIGTSTP` and `SIGTERM`.
///
/// A caught signal is reset to its default action across `exec`, so launched
/// commands still react to them normally.
pub fn install_interactive_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_interactive_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGTERM] {
        // SAFETY: the handler does nothing.
        unsafe { signal::sigaction(sig, &action) }?;
    }
    Ok(())
}

/// Reclaim every child that has already terminated, without blocking.
///
/// Returns the number of children collected.
pub fn reap() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                log::debug!("reaped background child: {status:?}");
                reaped += 1;
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                log::warn!("waitpid failed while reaping: {e}");
                break;
            }
        }
    }
    reaped
}

/// Background launch bookkeeping for one session.
#[derive(Debug, Default)]
pub struct Jobs {
    launched: u32,
    outstanding: usize,
}

impl Jobs {
    /// Register a new background launch and return its display number.
    pub fn next_number(&mut self) -> u32 {
        self.launched += 1;
        self.outstanding += 1;
        self.launched
    }

    /// Number of background launches not yet reclaimed.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Run the reaper if a child has exited since the last call and any background
    /// launch is still outstanding.
    pub fn reap_if_needed(&mut self) -> usize {
        if self.outstanding == 0 || !CHILD_EXITED.swap(false, Ordering::SeqCst) {
            return 0;
        }
        self.reap_now()
    }

    /// Run the reaper unconditionally.
    pub fn reap_now(&mut self) -> usize {
        let reaped = reap();
        self.outstanding = self.outstanding.saturating_sub(reaped);
        reaped
    }
}
