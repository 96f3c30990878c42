// connpool - client-side TCP connection pool with keep-alive eviction

pub mod config;
pub mod metrics;
pub mod pool;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, PoolSettings};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use utils::error::{ConnPoolError, Result};
