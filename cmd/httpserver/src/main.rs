//! httpserver: concurrent GET/PUT file server
//!
//! Usage:
//!     httpserver [-W workers] [-l logfile] [-d dir] host [port]
//!
//! Defaults come from `FSRV_*` environment variables (see
//! `ServerConfig::from_env`); flags override them.
//!
//! Signals:
//!     SIGINT/SIGQUIT/SIGTERM  finish in-flight requests and exit
//!     SIGHUP                  redirect output to httpserver.{access,error}.log

mod signals;

use std::net::TcpStream;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fsrv_audit::AuditLog;
use fsrv_core::constants::DEFAULT_PORT;
use fsrv_core::{FsrvError, Result, ServerConfig};
use fsrv_pool::FixedPool;
use fsrv_server::{FileService, Server};
use tracing::{error, info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "httpserver",
    version,
    about = "Concurrent GET/PUT file server with a hex-dump audit log"
)]
struct Cli {
    /// Number of worker threads
    #[arg(short = 'W', long)]
    workers: Option<usize>,

    /// Audit log file, truncated at startup
    #[arg(short = 'l', long = "log")]
    log: Option<PathBuf>,

    /// Directory holding resource files
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    /// Request and transfer buffer size in bytes
    #[arg(long)]
    buf_size: Option<usize>,

    /// PUT receive timeout in seconds
    #[arg(long)]
    recv_timeout: Option<u64>,

    /// Address to listen on
    host: String,

    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

impl Cli {
    /// Layer command-line flags over `config`.
    fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(n) = self.workers {
            config = config.workers(n);
        }
        if let Some(path) = &self.log {
            config = config.audit_log(Some(path.clone()));
        }
        if let Some(dir) = &self.dir {
            config = config.storage_dir(dir);
        }
        if let Some(n) = self.buf_size {
            config = config.buf_size(n);
        }
        if let Some(secs) = self.recv_timeout {
            config = config.recv_timeout(Duration::from_secs(secs));
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.apply(ServerConfig::from_env());
    init_tracing(&config.log_level);

    match run(&cli.host, cli.port, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "httpserver failed");
            eprintln!("httpserver: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Warnings and errors go to stderr, everything else to stdout, so that
/// after SIGHUP they land in the error and access logs respectively.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_thread_names(true)
        .init();
}

fn run(host: &str, port: u16, config: ServerConfig) -> Result<()> {
    config.validate()?;

    let audit = match &config.audit_log {
        Some(path) => AuditLog::create(path).map_err(|source| FsrvError::AuditLogOpen {
            path: path.clone(),
            source,
        })?,
        None => AuditLog::disabled(),
    };
    let server = Server::bind(host, port)?;
    let service = Arc::new(FileService::new(&config, audit));

    let pool = {
        let _masked = signals::block_for_workers().map_err(|e| FsrvError::Io(e.into()))?;
        let service = Arc::clone(&service);
        FixedPool::new(config.workers, move |worker_id: usize, stream: TcpStream| {
            service.handle_connection(worker_id, stream)
        })
        .map_err(FsrvError::Spawn)?
    };
    signals::watch_listener(server.stopper().as_raw_fd());
    signals::install().map_err(|e| FsrvError::Io(e.into()))?;

    info!(
        addr = %server.local_addr()?,
        workers = config.workers,
        storage = %config.storage_dir.display(),
        audit = service.audit().is_enabled(),
        "httpserver started"
    );

    let accepted = server.run(&pool, signals::stop_flag());
    let processed = pool.shutdown();
    info!(accepted, processed, "httpserver stopped");
    Ok(())
}
