//! End-to-end tests over loopback sockets.
//!
//! Each test starts a real server (acceptor thread plus worker pool) on an
//! ephemeral port, with a temporary storage directory and audit log.


use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fsrv_audit::AuditLog;
use fsrv_core::ServerConfig;
use fsrv_pool::FixedPool;

use crate::{FileService, Server, Stopper};

pub(crate) const NAME: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAA";

pub(crate) struct TestServer {
    pub addr: SocketAddr,
    pub dir: tempfile::TempDir,
    log_path: PathBuf,
    stop: Arc<AtomicBool>,
    stopper: Stopper,
    acceptor: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with(|config| config)
    }

    pub fn start_with(tune: impl FnOnce(ServerConfig) -> ServerConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let storage = dir.path().join("store");
        std::fs::create_dir(&storage).unwrap();

        let config = tune(
            ServerConfig::default()
                .workers(4)
                .storage_dir(&storage)
                .recv_timeout(Duration::from_secs(2))
                .audit_log(Some(log_path.clone())),
        );
        config.validate().unwrap();

        let audit = AuditLog::create(&log_path).unwrap();
        let service = Arc::new(FileService::new(&config, audit));
        let server = Server::bind("127.0.0.1", 0).unwrap();
        let addr = server.local_addr().unwrap();
        let stopper = server.stopper();
        let stop = Arc::new(AtomicBool::new(false));

        let acceptor = {
            let stop = Arc::clone(&stop);
            let workers = config.workers;
            thread::spawn(move || {
                let pool = FixedPool::new(workers, move |id: usize, stream: TcpStream| {
                    service.handle_connection(id, stream)
                })
                .unwrap();
                server.run(&pool, &stop);
                pool.shutdown();
            })
        };

        Self {
            addr,
            dir,
            log_path,
            stop,
            stopper,
            acceptor: Some(acceptor),
        }
    }

    pub fn storage(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    pub fn resource_path(&self, name: &str) -> PathBuf {
        self.storage().join(name)
    }

    /// Stop accepting, drain the pool, and return the audit log contents.
    pub fn shutdown(mut self) -> Vec<u8> {
        self.stop_and_join();
        std::fs::read(&self.log_path).unwrap()
    }

    fn stop_and_join(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            self.stopper.stop(&self.stop);
            acceptor.join().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Send `request`, optionally half-close, and read until the server closes.
pub(crate) fn exchange(addr: SocketAddr, request: &[u8], half_close: bool) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(request).unwrap();
    if half_close {
        stream.shutdown(Shutdown::Write).unwrap();
    }
    read_all(stream)
}

pub(crate) fn read_all(mut stream: TcpStream) -> Vec<u8> {
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    out
}

/// Split a response into its head (without the blank line) and body.
pub(crate) fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    (
        String::from_utf8(raw[..end].to_vec()).unwrap(),
        raw[end + 4..].to_vec(),
    )
}

pub(crate) fn get(addr: SocketAddr, name: &str) -> (String, Vec<u8>) {
    let raw = exchange(
        addr,
        format!("GET /{} HTTP/1.1\r\n\r\n", name).as_bytes(),
        false,
    );
    split_response(&raw)
}

pub(crate) fn put(addr: SocketAddr, name: &str, body: &[u8]) -> (String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .write_all(format!("PUT /{} HTTP/1.1\r\nContent-Length: {}\r\n\r\n", name, body.len()).as_bytes())
        .unwrap();
    stream.write_all(body).unwrap();
    split_response(&read_all(stream))
}

pub(crate) fn failure_record(method: &str, resource: &str, code: u16) -> String {
    format!(
        "FAIL: {} {} HTTP/1.1 --- response {}\n========\n",
        method, resource, code
    )
}

/// Decode hex-dump lines back into bytes, checking that every line's index
/// equals the number of bytes decoded before it.
pub(crate) fn undump(lines: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        let mut fields = line.split(' ');
        let index = fields.next().unwrap();
        assert!(index.len() >= 8, "index too narrow: {:?}", line);
        assert_eq!(index.parse::<usize>().unwrap(), out.len(), "line {:?}", line);
        let before = out.len();
        out.extend(fields.map(|hh| u8::from_str_radix(hh, 16).unwrap()));
        assert!((1..=20).contains(&(out.len() - before)), "line {:?}", line);
    }
    out
}

pub(crate) fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

pub(crate) fn write_file(path: &Path, bytes: &[u8]) {
    std::fs::write(path, bytes).unwrap();
}
