use super::manager::AddressManager;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Canonical address -> per-address manager.
///
/// Managers are created on first use and live as long as the registry, so a
/// caller holding a manager never races with its removal.
#[derive(Debug, Default)]
pub(crate) struct PoolRegistry {
    managers: DashMap<SocketAddr, Arc<AddressManager>>,
}

impl PoolRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the manager for `address`, creating it atomically if absent.
    ///
    /// Only the shard lock is taken, and it is released before this returns.
    pub(crate) fn fetch_or_create(&self, address: SocketAddr) -> Arc<AddressManager> {
        self.managers
            .entry(address)
            .or_insert_with(|| Arc::new(AddressManager::new(address)))
            .value()
            .clone()
    }

    pub(crate) fn get(&self, address: &SocketAddr) -> Option<Arc<AddressManager>> {
        self.managers.get(address).map(|entry| entry.value().clone())
    }

    /// Snapshot of every manager, taken without holding shard locks afterwards.
    pub(crate) fn managers(&self) -> Vec<Arc<AddressManager>> {
        self.managers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.managers.len()
    }
}
