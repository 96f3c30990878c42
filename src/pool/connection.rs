use super::manager::AddressManager;
use std::fmt;
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::trace;

/// A connection checked out of a [`ConnectionPool`](super::ConnectionPool).
///
/// The borrower owns the stream until it hands the connection back with
/// `put` or discards it with `remove`. Dropping the handle without either
/// forgets the record and closes the stream.
pub struct PooledConnection {
    id: u64,
    stream: Option<TcpStream>,
    manager: Arc<AddressManager>,
}

impl PooledConnection {
    pub(crate) fn new(id: u64, stream: TcpStream, manager: Arc<AddressManager>) -> Self {
        Self {
            id,
            stream: Some(stream),
            manager,
        }
    }

    /// Pool-wide identity of the underlying connection.
    ///
    /// A reused connection keeps the id it was dialed with.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Canonical `ip:port` this connection belongs to.
    pub fn address(&self) -> SocketAddr {
        self.manager.address()
    }

    pub fn stream(&self) -> &TcpStream {
        self.stream
            .as_ref()
            .expect("stream is present until the connection is released")
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        self.stream
            .as_mut()
            .expect("stream is present until the connection is released")
    }

    pub(crate) fn into_parts(mut self) -> (u64, TcpStream, Arc<AddressManager>) {
        let stream = self
            .stream
            .take()
            .expect("stream is present until the connection is released");
        (self.id, stream, Arc::clone(&self.manager))
    }
}

impl Deref for PooledConnection {
    type Target = TcpStream;

    fn deref(&self) -> &TcpStream {
        self.stream()
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut TcpStream {
        self.stream_mut()
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("address", &self.manager.address())
            .finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        // Released handles have already given their stream back.
        if self.stream.is_some() && self.manager.remove(self.id).is_some() {
            trace!(
                "Connection #{} to {} dropped while checked out, forgetting it",
                self.id,
                self.manager.address()
            );
        }
    }
}
