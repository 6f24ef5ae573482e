use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use self::file_system::FileSystemAdapter;
use self::handlers::handle_client;
use self::pool::{PoolError, ThreadPool};

/// Accepts connections and hands each one to the pool. With `max_requests`
/// set, returns after that many connections have been dispatched and the
/// pool has drained. `max_requests` of zero is rejected by `Config::validate`.
pub fn serve(listener: TcpListener, root: &Path, pool_size: usize, max_requests: Option<usize>) -> Result<(), PoolError> {
    let fs_adapter = FileSystemAdapter::new(root);
    let adapter_rc = Arc::new(fs_adapter);
    let pool = ThreadPool::new(pool_size)?;
    info!("serving {} with {} workers", adapter_rc.root().display(), pool.size());

    let mut dispatched = 0;
    for stream_ref in listener.incoming() {
        match stream_ref {
            Ok(stream) => {
                let local_rc = adapter_rc.clone();
                if let Err(e) = pool.execute(move || handle_client(stream, local_rc.as_ref())) {
                    error!("dropping connection: {}", e);
                }
                dispatched += 1;
                if max_requests == Some(dispatched) {
                    break;
                }
            },
            Err(e) => error!("Error with stream:{}", e)
        }
    }

    info!("stopped accepting after {} connections", dispatched);
    pool.shutdown();
    Ok(())
}

pub mod buffer;
pub mod file_system;
pub mod handlers;
pub mod http;
pub mod listing;
pub mod path;
pub mod pool;
pub mod response;
