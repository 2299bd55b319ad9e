//! The watch list and the monitor thread that reports logins of watched users.

use crate::error::ShellError;
use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One live login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub user: String,
    pub line: String,
    pub host: String,
}

/// Source of live login sessions.
pub trait SessionSource: Send + 'static {
    fn sessions(&mut self) -> Vec<LoginSession>;
}

/// Reads `USER_PROCESS` records from the system utmpx database.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utmpx;

#[cfg(any(target_os = "linux", target_os = "macos"))]
impl SessionSource for Utmpx {
    fn sessions(&mut self) -> Vec<LoginSession> {
        fn field(raw: &[libc::c_char]) -> String {
            let bytes: Vec<u8> = raw
                .iter()
                .take_while(|&&c| c != 0)
                .map(|&c| c as u8)
                .collect();
            String::from_utf8_lossy(&bytes).into_owned()
        }

        let mut found = Vec::new();
        // SAFETY: the utmpx cursor is only used from the monitor thread, and each
        // record is copied out before the next getutxent call.
        unsafe {
            libc::setutxent();
            loop {
                let entry = libc::getutxent();
                if entry.is_null() {
                    break;
                }
                let entry = &*entry;
                if entry.ut_type == libc::USER_PROCESS {
                    found.push(LoginSession {
                        user: field(&entry.ut_user),
                        line: field(&entry.ut_line),
                        host: field(&entry.ut_host),
                    });
                }
            }
            libc::endutxent();
        }
        found
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
impl SessionSource for Utmpx {
    fn sessions(&mut self) -> Vec<LoginSession> {
        Vec::new()
    }
}

/// Insertion-ordered list of watched usernames shared with the monitor thread.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    users: Arc<Mutex<Vec<String>>>,
}

impl WatchList {
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // the list is only ever pushed to or filtered, a panic can't leave it half-updated
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `name` unless it is already watched.
    pub fn add(&self, name: &str) -> Result<(), ShellError> {
        let mut users = self.lock();
        if users.iter().any(|u| u == name) {
            return Err(ShellError::WatchListDuplicate(name.to_owned()));
        }
        users.push(name.to_owned());
        Ok(())
    }

    /// Remove every entry equal to `name`. Returns how many were removed.
    pub fn remove(&self, name: &str) -> Result<usize, ShellError> {
        let mut users = self.lock();
        if users.is_empty() {
            return Err(ShellError::WatchListEmpty);
        }
        let before = users.len();
        users.retain(|u| u != name);
        Ok(before - users.len())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().iter().any(|u| u == name)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }
}

/// Report every session whose user is on the watch list.
///
/// The lock is taken once per session, so the command loop is never kept waiting
/// for a whole scan.
pub fn scan<W: Write>(list: &WatchList, sessions: &[LoginSession], out: &mut W) -> usize {
    let mut reported = 0;
    for session in sessions {
        let users = list.lock();
        for user in users.iter().filter(|u| **u == session.user) {
            let _ = writeln!(
                out,
                "{} has logged on {} from {}",
                user, session.line, session.host
            );
            reported += 1;
        }
    }
    let _ = out.flush();
    reported
}

/// Owner of the monitor thread.
///
/// Idle until [`WatchMonitor::start`] is first called; later calls are no-ops.
/// [`WatchMonitor::stop`] (also run on drop) wakes the thread out of its sleep and
/// joins it.
pub struct WatchMonitor {
    list: WatchList,
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WatchMonitor {
    pub fn new(list: WatchList, interval: Duration) -> Self {
        Self {
            list,
            interval,
            stop_tx: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the polling thread. Returns `false` if it was already running.
    pub fn start<S, W>(&mut self, mut source: S, mut out: W) -> std::io::Result<bool>
    where
        S: SessionSource,
        W: Write + Send + 'static,
    {
        if self.handle.is_some() {
            return Ok(false);
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let list = self.list.clone();
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("watchuser".into())
            .spawn(move || {
                log::debug!("watch monitor started, polling every {interval:?}");
                loop {
                    let sessions = source.sessions();
                    scan(&list, &sessions, &mut out);
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("watch monitor stopped");
            })?;
        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(true)
    }

    /// Request the thread to stop and wait until it has.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("watch monitor thread panicked");
            }
        }
    }
}

impl Drop for WatchMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
