//! Transport trait — best-effort group datagrams.
//!
//! `udp.rs` provides the real IPv4 multicast implementation.
//! `loopback.rs` provides an in-memory group for tests and local simulation.

pub mod error;
pub mod loopback;
pub mod udp;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use error::TransportError;
pub use loopback::{LoopbackBus, LoopbackTransport};
pub use udp::UdpMulticast;

pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Unreliable, unordered group channel.
///
/// Object-safe thanks to `Pin<Box<…>>` returns. Every member of the group,
/// the sender included, may receive each datagram zero or more times.
pub trait Transport: Send + Sync {
    /// Fire-and-forget a datagram to the whole group.
    fn send<'a>(&'a self, payload: &'a [u8]) -> TransportFuture<'a, ()>;

    /// Wait at most `timeout` for one datagram. `Ok(None)` means nothing arrived.
    fn try_recv(&self, timeout: Duration) -> TransportFuture<'_, Option<Vec<u8>>>;
}
