pub mod address;
mod connection;
mod eviction;
mod manager;
mod record;
mod registry;

pub use address::{ensure_port, normalize_address, DEFAULT_PORT};
pub use connection::PooledConnection;

use crate::config::PoolSettings;
use crate::metrics::PoolMetrics;
use crate::utils::error::{ConnPoolError, Result};
use registry::PoolRegistry;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Client-side pool of outbound TCP connections, partitioned by resolved address.
///
/// Connections handed back with [`put`](Self::put) stay parked for the
/// keep-alive period and are reused by later checkouts to the same address.
/// If nobody reuses them in time they are closed in the background.
pub struct ConnectionPool {
    settings: PoolSettings,
    registry: PoolRegistry,
    /// Read on every release, so updates only affect later evictions.
    keep_alive_nanos: AtomicU64,
}

impl ConnectionPool {
    /// Create a new connection pool with the given settings
    pub fn new(settings: PoolSettings) -> Self {
        let keep_alive_nanos = duration_to_nanos(settings.keep_alive());
        Self {
            settings,
            registry: PoolRegistry::new(),
            keep_alive_nanos: AtomicU64::new(keep_alive_nanos),
        }
    }

    /// Check out a connection to `address` (`host` or `host:port`).
    ///
    /// An idle pooled connection is reused when one exists; otherwise a new
    /// one is dialed. The dial is unbounded unless `connect_timeout_ms` is
    /// configured.
    pub async fn get(&self, address: &str) -> Result<PooledConnection> {
        self.checkout(address, self.settings.connect_timeout()).await
    }

    /// Like [`get`](Self::get), but a dial taking longer than `limit` fails
    /// with [`ConnPoolError::Timeout`].
    pub async fn get_with_timeout(
        &self,
        address: &str,
        limit: Duration,
    ) -> Result<PooledConnection> {
        self.checkout(address, Some(limit)).await
    }

    /// Return a connection for reuse. It is closed after the current
    /// keep-alive period unless it is checked out again first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn put(&self, conn: PooledConnection) {
        let (id, stream, manager) = conn.into_parts();
        let address = manager.address();

        match manager.mark_idle(id, stream) {
            Ok(epoch) => {
                PoolMetrics::record_release();
                let keep_alive = self.keep_alive_timeout();
                trace!(
                    "Returned connection #{} to pool for {} (evict in {:?})",
                    id,
                    address,
                    keep_alive
                );
                eviction::arm(manager, id, epoch, keep_alive);
            }
            Err(stream) => {
                debug!(
                    "Connection #{} to {} is no longer tracked, discarding it",
                    id, address
                );
                drop(stream);
            }
        }
    }

    /// Drop a connection from the pool and close it right away.
    ///
    /// Use this when the connection is known to be broken.
    pub async fn remove(&self, conn: PooledConnection) {
        let (id, stream, manager) = conn.into_parts();
        let address = manager.address();

        if manager.remove(id).is_some() {
            PoolMetrics::record_removal();
            trace!("Removed connection #{} to {}", id, address);
        }
        eviction::close_stream(stream, address).await;
    }

    /// Change the keep-alive used for connections released from now on.
    pub fn set_keep_alive_timeout(&self, keep_alive: Duration) {
        self.keep_alive_nanos
            .store(duration_to_nanos(keep_alive), Ordering::Relaxed);
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_nanos(self.keep_alive_nanos.load(Ordering::Relaxed))
    }

    /// Number of tracked connections (idle and busy) for `address`.
    pub async fn connection_count(&self, address: &str) -> Result<usize> {
        let target = normalize_address(address, self.settings.default_port).await?;
        Ok(self
            .registry
            .get(&target)
            .map(|manager| manager.len())
            .unwrap_or(0))
    }

    /// Close every idle connection now, returning how many were closed.
    pub async fn close_idle(&self) -> usize {
        let mut closed = 0;
        for manager in self.registry.managers() {
            for record in manager.drain_idle() {
                PoolMetrics::record_eviction();
                if let Some(stream) = record.into_stream() {
                    eviction::close_stream(stream, manager.address()).await;
                }
                closed += 1;
            }
        }

        if closed > 0 {
            debug!("Closed {} idle connections", closed);
        }
        closed
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            destinations: self.registry.len(),
            keep_alive_ms: u64::try_from(self.keep_alive_timeout().as_millis())
                .unwrap_or(u64::MAX),
            ..PoolStats::default()
        };

        for manager in self.registry.managers() {
            let (idle, busy) = manager.counts();
            stats.idle += idle;
            stats.busy += busy;
        }
        stats.total = stats.idle + stats.busy;
        stats
    }

    async fn checkout(&self, address: &str, limit: Option<Duration>) -> Result<PooledConnection> {
        let target = normalize_address(address, self.settings.default_port).await?;
        let manager = self.registry.fetch_or_create(target);

        if let Some((id, stream)) = manager.acquire_idle() {
            PoolMetrics::record_reuse();
            trace!("Reusing pooled connection #{} to {}", id, target);
            return Ok(PooledConnection::new(id, stream, manager));
        }

        debug!("Pool miss for {}, creating new connection", target);
        let stream = self.connect_new(target, limit).await.inspect_err(|_| {
            PoolMetrics::record_dial_failure();
        })?;
        PoolMetrics::record_dial();

        let id = record::next_connection_id();
        manager.add(id);
        Ok(PooledConnection::new(id, stream, manager))
    }

    /// Dial `target`, bounded by `limit` when given.
    async fn connect_new(&self, target: SocketAddr, limit: Option<Duration>) -> Result<TcpStream> {
        let dial_error = |source: std::io::Error| ConnPoolError::Dial {
            address: target.to_string(),
            source,
        };

        let stream = match limit {
            Some(limit) => match timeout(limit, TcpStream::connect(target)).await {
                Ok(result) => result.map_err(dial_error)?,
                Err(_) => {
                    return Err(ConnPoolError::Timeout {
                        address: target.to_string(),
                        timeout: limit,
                    })
                }
            },
            None => TcpStream::connect(target).await.map_err(dial_error)?,
        };

        if self.settings.tcp_nodelay {
            stream.set_nodelay(true)?;
        }

        Ok(stream)
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(PoolSettings::default())
    }
}

fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Statistics about the connection pool
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStats {
    /// Number of address partitions created so far
    pub destinations: usize,
    /// Tracked connections, idle and busy
    pub total: usize,
    /// Connections parked in the pool
    pub idle: usize,
    /// Connections checked out to callers
    pub busy: usize,
    /// Keep-alive applied to the next release (milliseconds)
    pub keep_alive_ms: u64,
}
