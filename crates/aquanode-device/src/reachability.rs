//! Network attachment probe.
//!
//! The lifecycle controller polls a [`Reachability`] implementation until the
//! node can reach its border router. The probe is pulled, never pushed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

/// Trait for the reachability capability.
#[async_trait]
pub trait Reachability: Send + Sync {
    /// Returns true if the node currently has a route to the network.
    async fn is_reachable(&self) -> bool;
}

#[async_trait]
impl<T: Reachability + ?Sized> Reachability for Box<T> {
    async fn is_reachable(&self) -> bool {
        (**self).is_reachable().await
    }
}

/// Probes reachability by opening a TCP connection to a well-known address
/// (the border router or the controller itself).
#[derive(Debug, Clone)]
pub struct TcpReachability {
    addr: String,
    timeout: Duration,
}

impl TcpReachability {
    /// Create a probe for `addr` (`host:port`).
    #[must_use]
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// The probed address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Reachability for TcpReachability {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "Reachability probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(addr = %self.addr, "Reachability probe timed out");
                false
            }
        }
    }
}

/// A probe that always succeeds, for nodes on a network that is known to be up.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReachable;

#[async_trait]
impl Reachability for AlwaysReachable {
    async fn is_reachable(&self) -> bool {
        true
    }
}
