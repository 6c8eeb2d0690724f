//! UDP — IPv4 multicast socket joined to the swarm group.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{info, trace};

use super::{Transport, TransportError, TransportFuture};
use crate::conf::NetworkConfig;

/// A socket bound to the group port that both sends to and receives from the group.
#[derive(Debug)]
pub struct UdpMulticast {
    socket: UdpSocket,
    destination: SocketAddrV4,
    recv_buffer: usize,
}

impl UdpMulticast {
    /// Bind `0.0.0.0:<port>` with address reuse, join the group, and set the TTL.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn join(config: &NetworkConfig) -> Result<Self, TransportError> {
        let group = config.group;
        if !group.is_multicast() {
            return Err(TransportError::NotMulticast(group));
        }

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        // Several robots on one host share the group port.
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);
        socket
            .bind(&SocketAddr::V4(bind_addr).into())
            .map_err(|source| TransportError::Bind {
                addr: bind_addr,
                source,
            })?;

        socket
            .join_multicast_v4(&group, &config.interface)
            .map_err(|source| TransportError::JoinGroup {
                group,
                interface: config.interface,
                source,
            })?;
        if !config.interface.is_unspecified() {
            socket.set_multicast_if_v4(&config.interface)?;
        }
        socket.set_multicast_ttl_v4(config.ttl)?;
        socket.set_multicast_loop_v4(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        info!(
            "✓ Joined multicast group {}:{} (ttl={}, interface={})",
            group, config.port, config.ttl, config.interface
        );

        Ok(Self {
            socket,
            destination: SocketAddrV4::new(group, config.port),
            recv_buffer: config.recv_buffer,
        })
    }

    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }
}

impl Transport for UdpMulticast {
    fn send<'a>(&'a self, payload: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.socket
                .send_to(payload, self.destination)
                .await
                .map(|_| ())
                .map_err(TransportError::Send)
        })
    }

    fn try_recv(&self, timeout: Duration) -> TransportFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            let mut buf = vec![0u8; self.recv_buffer];
            match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
                Err(_elapsed) => Ok(None),
                Ok(Ok((len, from))) => {
                    trace!(%from, len, "Received datagram");
                    buf.truncate(len);
                    Ok(Some(buf))
                }
                Ok(Err(e)) if e.kind() == ErrorKind::WouldBlock => Ok(None),
                Ok(Err(e)) => Err(TransportError::Receive(e)),
            }
        })
    }
}
