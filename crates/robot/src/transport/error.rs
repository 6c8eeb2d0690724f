use std::net::{Ipv4Addr, SocketAddrV4};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0} is not an IPv4 multicast address")]
    NotMulticast(Ipv4Addr),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to join multicast group {group} on {interface}: {source}")]
    JoinGroup {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        #[source]
        source: std::io::Error,
    },

    #[error("socket setup failed: {0}")]
    Socket(#[from] std::io::Error),

    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Setup errors are fatal; send/receive errors are transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Send(_) | TransportError::Receive(_))
    }
}
