//! Loopback — in-memory multicast group.
//!
//! Every member, including the sender, sees every datagram, matching
//! multicast loopback on a real socket. Optional deterministic loss lets
//! tests exercise convergence-by-repetition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tracing::trace;

use super::{Transport, TransportError, TransportFuture};

const DEFAULT_CAPACITY: usize = 1024;

/// A shared in-memory group. Clone it to hand the same group to several robots.
#[derive(Clone)]
pub struct LoopbackBus {
    tx: broadcast::Sender<Vec<u8>>,
    sends: Arc<AtomicU64>,
    drop_every: Option<u64>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            tx,
            sends: Arc::new(AtomicU64::new(0)),
            drop_every: None,
        }
    }

    /// Silently lose every `n`th datagram sent through a member transport.
    pub fn with_drop_every(mut self, n: u64) -> Self {
        self.drop_every = (n > 0).then_some(n);
        self
    }

    /// Join the group. Only datagrams sent after joining are delivered.
    pub fn join(&self) -> LoopbackTransport {
        LoopbackTransport {
            bus: self.clone(),
            rx: Mutex::new(self.tx.subscribe()),
        }
    }

    /// Deliver raw bytes to every member, bypassing loss.
    pub fn inject(&self, payload: &[u8]) {
        // No members is not an error for a group channel.
        let _ = self.tx.send(payload.to_vec());
    }

    /// Datagrams handed to the bus by member transports, lost ones included.
    pub fn sent_count(&self) -> u64 {
        self.sends.load(Ordering::Relaxed)
    }

    fn publish(&self, payload: &[u8]) {
        let seq = self.sends.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(n) = self.drop_every {
            if seq % n == 0 {
                trace!(seq, "Loopback dropped datagram");
                return;
            }
        }
        let _ = self.tx.send(payload.to_vec());
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One member of a [`LoopbackBus`].
pub struct LoopbackTransport {
    bus: LoopbackBus,
    rx: Mutex<broadcast::Receiver<Vec<u8>>>,
}

impl Transport for LoopbackTransport {
    fn send<'a>(&'a self, payload: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.bus.publish(payload);
            Ok(())
        })
    }

    fn try_recv(&self, timeout: Duration) -> TransportFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            let mut rx = self.rx.lock().await;
            loop {
                match tokio::time::timeout(timeout, rx.recv()).await {
                    Err(_elapsed) => return Ok(None),
                    Ok(Ok(datagram)) => return Ok(Some(datagram)),
                    // A slow member loses datagrams, like a full socket buffer.
                    Ok(Err(RecvError::Lagged(skipped))) => {
                        trace!(skipped, "Loopback member lagged");
                    }
                    Ok(Err(RecvError::Closed)) => return Err(TransportError::Closed),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_every_member_receives_including_sender() {
        let bus = LoopbackBus::new();
        let a = bus.join();
        let b = bus.join();

        a.send(b"hello").await.unwrap();

        assert_eq!(a.try_recv(WAIT).await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(b.try_recv(WAIT).await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_empty_poll_is_none_not_error() {
        let bus = LoopbackBus::new();
        let a = bus.join();
        assert_eq!(a.try_recv(Duration::from_millis(5)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_every_loses_datagrams() {
        let bus = LoopbackBus::new().with_drop_every(2);
        let tx = bus.join();
        let rx = bus.join();

        for i in 0..4u8 {
            tx.send(&[i]).await.unwrap();
        }

        let mut received = Vec::new();
        while let Some(d) = rx.try_recv(Duration::from_millis(5)).await.unwrap() {
            received.push(d[0]);
        }
        assert_eq!(received, vec![0, 2]);
        assert_eq!(bus.sent_count(), 4);
    }

    #[tokio::test]
    async fn test_inject_reaches_members() {
        let bus = LoopbackBus::new();
        let a = bus.join();
        bus.inject(b"abc");
        assert_eq!(a.try_recv(WAIT).await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(bus.sent_count(), 0);
    }
}
