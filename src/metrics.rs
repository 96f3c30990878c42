#[cfg(feature = "metrics")]
use lazy_static::lazy_static;
#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref DIALS: IntCounter = register_int_counter!(
        "connpool_dials_total",
        "Total number of new upstream connections dialed"
    )
    .expect("register connpool_dials_total counter");
    pub static ref DIAL_FAILURES: IntCounter = register_int_counter!(
        "connpool_dial_failures_total",
        "Total number of failed or timed out dials"
    )
    .expect("register connpool_dial_failures_total counter");
    pub static ref REUSES: IntCounter = register_int_counter!(
        "connpool_reuses_total",
        "Total number of checkouts served by an idle pooled connection"
    )
    .expect("register connpool_reuses_total counter");
    pub static ref EVICTIONS: IntCounter = register_int_counter!(
        "connpool_evictions_total",
        "Total number of idle connections closed by the pool"
    )
    .expect("register connpool_evictions_total counter");
    pub static ref REMOVALS: IntCounter = register_int_counter!(
        "connpool_removals_total",
        "Total number of connections explicitly removed by callers"
    )
    .expect("register connpool_removals_total counter");
    pub static ref IDLE_CONNECTIONS: IntGauge = register_int_gauge!(
        "connpool_idle_connections",
        "Number of connections currently parked in the pool"
    )
    .expect("register connpool_idle_connections gauge");
}

/// Prometheus hooks for pool lifecycle events. Every call is a no-op when the
/// `metrics` feature is disabled.
#[derive(Debug, Clone, Copy)]
pub struct PoolMetrics;

impl PoolMetrics {
    #[inline]
    pub fn record_dial() {
        #[cfg(feature = "metrics")]
        DIALS.inc();
    }

    #[inline]
    pub fn record_dial_failure() {
        #[cfg(feature = "metrics")]
        DIAL_FAILURES.inc();
    }

    #[inline]
    pub fn record_reuse() {
        #[cfg(feature = "metrics")]
        {
            REUSES.inc();
            IDLE_CONNECTIONS.dec();
        }
    }

    #[inline]
    pub fn record_release() {
        #[cfg(feature = "metrics")]
        IDLE_CONNECTIONS.inc();
    }

    #[inline]
    pub fn record_eviction() {
        #[cfg(feature = "metrics")]
        {
            EVICTIONS.inc();
            IDLE_CONNECTIONS.dec();
        }
    }

    #[inline]
    pub fn record_removal() {
        #[cfg(feature = "metrics")]
        REMOVALS.inc();
    }
}
