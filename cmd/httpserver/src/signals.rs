//! Process signal setup.
//!
//! Worker threads never see the process signals: the mask is in place
//! while the pool spawns and is lifted on the main thread afterwards, so
//! every signal lands on the acceptor.
//!
//! - SIGINT, SIGQUIT, SIGTERM set the stop flag and shut the watched
//!   listener down. They are installed without `SA_RESTART`, so a blocked
//!   `accept` returns `EINTR`; the shutdown covers a signal that arrives
//!   just before the call blocks.
//! - SIGHUP redirects stdout/stderr to the access/error log files.
//! - SIGUSR1, SIGUSR2 and SIGPIPE are ignored.

use std::ffi::CStr;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use nix::sys::signal::{
    pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

const WORKER_BLOCKED: [Signal; 6] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

const ACCESS_LOG_PATH: &CStr = c"httpserver.access.log";
const ERROR_LOG_PATH: &CStr = c"httpserver.error.log";

static STOP: AtomicBool = AtomicBool::new(false);
static LISTENER: AtomicI32 = AtomicI32::new(-1);

/// Set once a termination signal has arrived.
pub fn stop_flag() -> &'static AtomicBool {
    &STOP
}

/// Listening socket to shut down on a termination signal. The descriptor
/// must stay open until the accept loop has returned.
pub fn watch_listener(fd: RawFd) {
    LISTENER.store(fd, Ordering::SeqCst);
}

/// Restores the previous signal mask when dropped.
pub struct MaskGuard {
    previous: SigSet,
}

impl Drop for MaskGuard {
    fn drop(&mut self) {
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            tracing::warn!(error = %e, "failed to restore signal mask");
        }
    }
}

/// Block the process signals on the calling thread. Threads spawned while
/// the guard lives inherit the mask.
pub fn block_for_workers() -> nix::Result<MaskGuard> {
    let mut set = SigSet::empty();
    for sig in WORKER_BLOCKED {
        set.add(sig);
    }
    let mut previous = SigSet::empty();
    pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut previous))?;
    Ok(MaskGuard { previous })
}

/// Install handlers for the acceptor thread.
pub fn install() -> nix::Result<()> {
    let stop = SigAction::new(
        SigHandler::Handler(on_stop),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let hangup = SigAction::new(
        SigHandler::Handler(on_hangup),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    // SAFETY: both handlers only touch atomics or make
    // async-signal-safe libc calls.
    unsafe {
        for sig in [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTERM] {
            sigaction(sig, &stop)?;
        }
        sigaction(Signal::SIGHUP, &hangup)?;
        for sig in [Signal::SIGUSR1, Signal::SIGUSR2, Signal::SIGPIPE] {
            sigaction(sig, &ignore)?;
        }
    }
    Ok(())
}

extern "C" fn on_stop(_sig: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
    let fd = LISTENER.load(Ordering::SeqCst);
    if fd >= 0 {
        // SAFETY: shutdown is async-signal-safe; fd is the live listener.
        unsafe {
            libc::shutdown(fd, libc::SHUT_RDWR);
        }
    }
}

extern "C" fn on_hangup(_sig: libc::c_int) {
    // SAFETY: open, dup2 and close are async-signal-safe.
    unsafe {
        redirect(ACCESS_LOG_PATH, libc::STDOUT_FILENO);
        redirect(ERROR_LOG_PATH, libc::STDERR_FILENO);
    }
}

unsafe fn redirect(path: &CStr, target: libc::c_int) {
    let fd = libc::open(
        path.as_ptr(),
        libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
        0o644 as libc::c_uint,
    );
    if fd >= 0 {
        libc::dup2(fd, target);
        libc::close(fd);
    }
}
