use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique connection identity.
pub(crate) fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnState {
    /// Checked out to a caller.
    Busy,
    /// Parked in the pool, eligible for reuse or eviction.
    Idle,
}

/// Bookkeeping for a single pooled TCP connection.
///
/// The stream is parked here only while the record is idle. While busy the
/// borrower owns the stream and the record holds state only.
#[derive(Debug)]
pub(crate) struct ConnectionRecord {
    id: u64,
    state: ConnState,
    stream: Option<TcpStream>,
    /// Bumped on every release; a pending eviction only applies to the epoch it was armed for.
    release_epoch: u64,
    created_at: Instant,
    last_used: Instant,
}

impl ConnectionRecord {
    pub(crate) fn busy(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: ConnState::Busy,
            stream: None,
            release_epoch: 0,
            created_at: now,
            last_used: now,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> ConnState {
        self.state
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.state == ConnState::Idle
    }

    pub(crate) fn release_epoch(&self) -> u64 {
        self.release_epoch
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since the record last changed hands.
    pub(crate) fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// Flip to busy and hand the parked stream out.
    pub(crate) fn checkout(&mut self) -> Option<TcpStream> {
        let stream = self.stream.take()?;
        self.state = ConnState::Busy;
        self.last_used = Instant::now();
        Some(stream)
    }

    /// Park `stream` and flip to idle, returning the new release epoch.
    pub(crate) fn park(&mut self, stream: TcpStream) -> u64 {
        self.stream = Some(stream);
        self.state = ConnState::Idle;
        self.release_epoch += 1;
        self.last_used = Instant::now();
        self.release_epoch
    }

    /// Consume the record, yielding the parked stream if it was idle.
    pub(crate) fn into_stream(self) -> Option<TcpStream> {
        self.stream
    }
}
