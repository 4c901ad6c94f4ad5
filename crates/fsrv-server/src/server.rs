//! Listening socket and the blocking accept loop.
//!
//! `accept(2)` is called directly rather than through `TcpListener::accept`
//! because std retries on `EINTR`. Here an interrupted accept is how a
//! shutdown signal reaches the loop.
//!
//! A stop request that lands between the flag check and the blocking
//! accept would not interrupt anything, so [`Stopper`] also shuts the
//! listening socket down. On Linux that fails any pending or future
//! accept with `EINVAL`, and the loop re-checks the flag.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};

use fsrv_core::{FsrvError, Result};
use fsrv_pool::FixedPool;
use nix::errno::Errno;
use nix::sys::socket::{accept, shutdown, Shutdown};
use tracing::{debug, info, warn};

pub struct Server {
    listener: TcpListener,
}

/// Ends [`Server::run`] from another thread or a signal handler.
///
/// Holds the listener's raw descriptor, so it must not be used after the
/// `Server` it came from is dropped.
#[derive(Debug, Clone, Copy)]
pub struct Stopper {
    fd: RawFd,
}

impl Stopper {
    /// Set `stop`, then wake the accept loop.
    pub fn stop(&self, stop: &AtomicBool) {
        stop.store(true, Ordering::SeqCst);
        if let Err(e) = shutdown(self.fd, Shutdown::Both) {
            debug!(error = %e, "listener shutdown failed");
        }
    }
}

impl AsRawFd for Stopper {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Server {
    /// Resolve `host:port` and listen on the first address that binds.
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let target = format!("{}:{}", host, port);
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|_| FsrvError::Resolve(target.clone()))?
            .collect();
        if addrs.is_empty() {
            return Err(FsrvError::Resolve(target));
        }

        let listener = TcpListener::bind(&addrs[..]).map_err(|source| FsrvError::Bind {
            addr: target,
            source,
        })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stopper(&self) -> Stopper {
        Stopper {
            fd: self.listener.as_raw_fd(),
        }
    }

    /// Accept connections and submit them to `pool` until `stop` is set.
    ///
    /// `stop` is checked whenever accept returns, so whoever sets it must
    /// also interrupt the call, normally through [`Stopper::stop`]. Returns
    /// the number of connections handed to the pool.
    pub fn run(&self, pool: &FixedPool<TcpStream>, stop: &AtomicBool) -> u64 {
        let fd = self.listener.as_raw_fd();
        let mut accepted = 0u64;
        info!(addr = ?self.listener.local_addr().ok(), "accepting connections");

        while !stop.load(Ordering::SeqCst) {
            match accept(fd) {
                Ok(conn) => {
                    // SAFETY: accept returned a fresh descriptor nothing else owns.
                    let stream = unsafe { TcpStream::from_raw_fd(conn) };
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    accepted += 1;
                    pool.submit(stream);
                }
                Err(Errno::EINTR) => debug!("accept interrupted"),
                Err(Errno::EINVAL) if stop.load(Ordering::SeqCst) => break,
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }

        info!(accepted, "accept loop stopped");
        accepted
    }
}

// ============================================================================
// Tests
// ============================================================================
