use super::record::{ConnState, ConnectionRecord};
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tracing::trace;

/// Owns every connection record for one canonical address.
///
/// All state transitions run under `connections`, which is never held across
/// an await point. A plain std mutex lets a dropped checkout handle forget its
/// record synchronously.
#[derive(Debug)]
pub(crate) struct AddressManager {
    address: SocketAddr,
    connections: Mutex<Vec<ConnectionRecord>>,
}

impl AddressManager {
    pub(crate) fn new(address: SocketAddr) -> Self {
        Self {
            address,
            connections: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn address(&self) -> SocketAddr {
        self.address
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConnectionRecord>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out the oldest idle connection, in insertion order.
    pub(crate) fn acquire_idle(&self) -> Option<(u64, TcpStream)> {
        let mut connections = self.lock();
        connections
            .iter_mut()
            .filter(|record| record.is_idle())
            .find_map(|record| record.checkout().map(|stream| (record.id(), stream)))
    }

    /// Track a freshly dialed connection as busy.
    pub(crate) fn add(&self, id: u64) {
        let mut connections = self.lock();
        if connections.iter().any(|record| record.id() == id) {
            return;
        }
        connections.push(ConnectionRecord::busy(id));
        trace!(
            "Tracking connection #{} to {} (pool size: {})",
            id,
            self.address,
            connections.len()
        );
    }

    /// Park a busy connection and return the release epoch to arm eviction with.
    ///
    /// The stream is handed back when the record is unknown or not busy.
    pub(crate) fn mark_idle(&self, id: u64, stream: TcpStream) -> Result<u64, TcpStream> {
        let mut connections = self.lock();
        match connections
            .iter_mut()
            .find(|record| record.id() == id && record.state() == ConnState::Busy)
        {
            Some(record) => Ok(record.park(stream)),
            None => Err(stream),
        }
    }

    /// Drop the record from the collection. Removing an absent record is a no-op.
    pub(crate) fn remove(&self, id: u64) -> Option<ConnectionRecord> {
        let mut connections = self.lock();
        let idx = connections.iter().position(|record| record.id() == id)?;
        Some(connections.remove(idx))
    }

    /// Remove the record only if it is still idle from the release identified by `epoch`.
    pub(crate) fn evict_if_idle(&self, id: u64, epoch: u64) -> Option<ConnectionRecord> {
        let mut connections = self.lock();
        let idx = connections.iter().position(|record| {
            record.id() == id && record.is_idle() && record.release_epoch() == epoch
        })?;
        Some(connections.remove(idx))
    }

    /// Remove every idle record at once.
    pub(crate) fn drain_idle(&self) -> Vec<ConnectionRecord> {
        let mut connections = self.lock();
        let mut drained = Vec::new();
        let mut kept = Vec::with_capacity(connections.len());
        for record in connections.drain(..) {
            if record.is_idle() {
                drained.push(record);
            } else {
                kept.push(record);
            }
        }
        *connections = kept;
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// (idle, busy) counts.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let connections = self.lock();
        let idle = connections.iter().filter(|record| record.is_idle()).count();
        (idle, connections.len() - idle)
    }

    #[cfg(test)]
    pub(crate) fn ids(&self) -> Vec<u64> {
        self.lock().iter().map(|record| record.id()).collect()
    }
}
