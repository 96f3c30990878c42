use super::manager::AddressManager;
use crate::metrics::PoolMetrics;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::trace;

/// Arm a one-shot eviction for a connection that was just released.
///
/// Nothing cancels the timer. When it fires, the connection is evicted only if
/// it is still idle from the same release; a reacquired or re-released
/// connection is left alone.
pub(crate) fn arm(manager: Arc<AddressManager>, id: u64, epoch: u64, keep_alive: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(keep_alive).await;

        let Some(record) = manager.evict_if_idle(id, epoch) else {
            trace!(
                "Eviction of connection #{} to {} skipped (reused or already removed)",
                id,
                manager.address()
            );
            return;
        };

        PoolMetrics::record_eviction();
        trace!(
            "Evicting idle connection #{} to {} (idle: {:?}, age: {:?})",
            id,
            manager.address(),
            record.idle_for(),
            record.created_at().elapsed()
        );

        if let Some(stream) = record.into_stream() {
            close_stream(stream, manager.address()).await;
        }
    });
}

/// Shut a stream down and drop it. Close errors are not propagated.
pub(crate) async fn close_stream(mut stream: TcpStream, address: SocketAddr) {
    if let Err(e) = stream.shutdown().await {
        trace!("Ignoring close error for {}: {}", address, e);
    }
}
