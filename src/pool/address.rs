use crate::utils::error::{ConnPoolError, Result};
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use tracing::instrument;

/// Port applied to inputs that only name a host.
pub const DEFAULT_PORT: u16 = 80;

/// Append `default_port` when the input carries no port of its own.
pub fn ensure_port(address: &str, default_port: u16) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, default_port)
    }
}

/// Resolve `host` or `host:port` into the IPv4 socket address used as the
/// pool partition key.
///
/// IPv4 literals are parsed directly; anything else goes through the system
/// resolver and the first IPv4 entry wins.
#[instrument(level = "debug")]
pub async fn normalize_address(address: &str, default_port: u16) -> Result<SocketAddr> {
    let target = ensure_port(address.trim(), default_port);
    let resolution_error = |source: io::Error| ConnPoolError::Resolution {
        address: address.to_string(),
        source,
    };

    if let Ok(literal) = target.parse::<SocketAddrV4>() {
        return Ok(SocketAddr::V4(literal));
    }

    let mut lookup = tokio::net::lookup_host(target.as_str())
        .await
        .map_err(resolution_error)?;

    lookup.find(SocketAddr::is_ipv4).ok_or_else(|| {
        resolution_error(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no IPv4 address found for destination",
        ))
    })
}
