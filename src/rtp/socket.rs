//! Outgoing multicast UDP socket shared by the RTP sender and SAP announcer.
//!
//! Grounded on `bass-rtp::rtp::socket::RtpSocket`'s use of `socket2` for
//! TTL/reuse-address setup, simplified to the send-only, fire-and-forget
//! shape both gateway senders need.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// A UDP socket bound for multicast transmission on a chosen outgoing
/// interface, at a fixed TTL.
pub struct McastSender {
    socket: UdpSocket,
    dest: SocketAddrV4,
}

impl McastSender {
    /// `iface_ip`: the IPv4 address of the interface multicast traffic should
    /// egress from, if the iface selector (`crate::iface`) resolved one.
    pub fn new(dest: SocketAddrV4, ttl: u32, iface_ip: Option<Ipv4Addr>) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_multicast_ttl_v4(ttl)?;

        let bind_addr: SocketAddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into();
        socket.bind(&bind_addr.into())?;

        if let Some(ip) = iface_ip {
            // Best-effort: an interface that can't take multicast traffic
            // (e.g. no multicast route) shouldn't prevent the socket from
            // existing; the OS default route is the documented fallback.
            let _ = socket.set_multicast_if_v4(&ip);
        }

        let socket: UdpSocket = socket.into();
        Ok(Self { socket, dest })
    }

    pub fn send(&self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send_to(packet, self.dest)
    }
}
