//! Network layer: URL resolution and the live hyper transport

mod transport;
mod url;

pub use transport::HyperTransport;
pub use url::resolve_url;

/// Idle connection lifetime for the live transport
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Idle connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;
