//! Datagram transport and best-effort delivery helpers

use async_trait::async_trait;
use log::{info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Receives and sends whole frames.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Blocks until a frame arrives, writing it into `buf`.
    async fn recv_frame(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Sends one frame to `addr`.
    async fn send_frame(&self, frame: &[u8], addr: SocketAddr) -> io::Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn recv_frame(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        (**self).recv_frame(buf).await
    }

    async fn send_frame(&self, frame: &[u8], addr: SocketAddr) -> io::Result<()> {
        (**self).send_frame(frame, addr).await
    }
}

/// UDP socket transport.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds a UDP socket to `addr` (`host:port`).
    ///
    /// Port 0 picks a free port; use [`UdpTransport::local_addr`] to find
    /// out which one.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Server listening on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv_frame(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    async fn send_frame(&self, frame: &[u8], addr: SocketAddr) -> io::Result<()> {
        self.socket.send_to(frame, addr).await?;
        Ok(())
    }
}

/// Outcome of a fan-out.
///
/// Every recipient is attempted once; a failed send never stops the
/// remaining ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Number of frames handed to the transport successfully
    pub delivered: usize,
    /// Recipients whose send failed, in attempt order
    pub failed: Vec<SocketAddr>,
}

impl SendReport {
    /// True when no send failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends `frame` to every address, continuing past failures.
pub async fn send_to_all<T>(transport: &T, frame: &[u8], addrs: &[SocketAddr]) -> SendReport
where
    T: Transport + ?Sized,
{
    let mut report = SendReport::default();

    for &addr in addrs {
        match transport.send_frame(frame, addr).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!("Failed to send to {}: {}", addr, e);
                report.failed.push(addr);
            }
        }
    }

    report
}
