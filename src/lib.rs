use std::io;
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread::{Builder, JoinHandle};
use tracing::info;

pub mod config;
mod server;

pub use config::{Config, ConfigError};
pub use server::http::{parse_request, ParseError, Request};
pub use server::path::{decode_path, DecodeError};
pub use server::pool::{PoolError, ThreadPool, MAX_WORKERS};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Root path does not exist: {}", .0.display())]
    RootMissing(PathBuf),
    #[error("Error on bind to {address}: {source}")]
    Bind { address: String, #[source] source: io::Error },
    #[error("unable to start dispatcher thread: {0}")]
    Spawn(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub struct ServerHandle {
    pub ip: String, pub port: u16, pub handle: JoinHandle<Result<(), ServerError>>
}

fn bind(config: &Config) -> Result<TcpListener, ServerError> {
    config.validate()?;
    if !config.root_dir.exists() {
        return Err(ServerError::RootMissing(config.root_dir.clone()));
    }
    info!("binding to:{}", config.address());
    TcpListener::bind(config.address())
        .map_err(|source| ServerError::Bind { address: config.address(), source })
}

/// Binds and serves on the calling thread until `max_requests` is reached.
pub fn run(config: &Config) -> Result<(), ServerError> {
    let listener = bind(config)?;
    server::serve(listener, &config.root_dir, config.pool_size, config.max_requests)?;
    Ok(())
}

/// Binds on the calling thread, then serves from a background thread.
/// Port 0 picks an ephemeral port, reported in the returned handle.
pub fn start_server(config: &Config) -> Result<ServerHandle, ServerError> {
    let listener = bind(config)?;
    let (ip, port) = match listener.local_addr() {
        Ok(addr) => (addr.ip().to_string(), addr.port()),
        Err(_) => ("unknown".to_string(), 0)
    };

    let config = config.clone();
    let handle = Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || {
            server::serve(listener, &config.root_dir, config.pool_size, config.max_requests)?;
            Ok(())
        })
        .map_err(ServerError::Spawn)?;
    Ok(ServerHandle { ip, port, handle })
}
