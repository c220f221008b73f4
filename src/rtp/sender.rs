//! RTP/L24 sender: builds packets from repacketizer payloads and maintains
//! the monotonic seq/timestamp counters (§4.4).

use super::header::RtpHeader;
use super::socket::McastSender;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};

pub struct RtpSender {
    socket: McastSender,
    payload_type: u8,
    ssrc: u32,
    seq: u16,
    timestamp: u32,
    samples_per_packet: u32,
}

impl RtpSender {
    pub fn new(
        dest: SocketAddrV4,
        ttl: u32,
        iface_ip: Option<Ipv4Addr>,
        payload_type: u8,
        ssrc: u32,
        samples_per_packet: u32,
    ) -> io::Result<Self> {
        Ok(Self {
            socket: McastSender::new(dest, ttl, iface_ip)?,
            payload_type,
            ssrc,
            seq: 0,
            timestamp: 0,
            samples_per_packet,
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn seq(&self) -> u16 {
        self.seq
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Build and send one RTP packet for `payload`. Advances `seq`/`timestamp`
    /// only on a successful send (§4.4 failure semantics).
    pub fn send_payload(&mut self, payload: &[u8]) -> io::Result<usize> {
        let header = RtpHeader {
            payload_type: self.payload_type,
            sequence: self.seq,
            timestamp: self.timestamp,
            ssrc: self.ssrc,
        };

        let mut packet = Vec::with_capacity(RtpHeader::LEN + payload.len());
        packet.extend_from_slice(&header.encode());
        packet.extend_from_slice(payload);

        let sent = self.socket.send(&packet)?;

        self.seq = self.seq.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(self.samples_per_packet);

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    fn loopback_receiver() -> (UdpSocket, SocketAddrV4) {
        let recv = UdpSocket::bind("127.0.0.1:0").unwrap();
        recv.set_read_timeout(Some(std::time::Duration::from_millis(200))).unwrap();
        let addr = match recv.local_addr().unwrap() {
            std::net::SocketAddr::V4(v4) => v4,
            _ => unreachable!(),
        };
        (recv, addr)
    }

    #[test]
    fn counters_advance_monotonically_on_success() {
        // Property 1 + 2, exercised over loopback unicast (multicast isn't
        // guaranteed routable in a sandboxed test runner).
        let (recv, addr) = loopback_receiver();
        let mut sender = RtpSender::new(addr, 1, None, 96, 0x1234, 48).unwrap();

        let payload = vec![0u8; 48 * 2 * 3];
        for i in 0..5u16 {
            sender.send_payload(&payload).unwrap();
            assert_eq!(sender.seq(), i.wrapping_add(1));
            assert_eq!(sender.timestamp(), (i as u32 + 1) * 48);

            let mut buf = [0u8; 1500];
            let (n, _) = recv.recv_from(&mut buf).unwrap();
            assert_eq!(n, 12 + 48 * 2 * 3); // Property 2
            assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), i);
            assert_eq!(
                u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
                i as u32 * 48
            );
        }
    }

    #[test]
    fn wraps_sequence_and_timestamp_modulo() {
        let (recv, addr) = loopback_receiver();
        let mut sender = RtpSender::new(addr, 1, None, 96, 1, 48).unwrap();
        // Force near-wraparound state.
        sender.seq = u16::MAX;
        sender.timestamp = u32::MAX - 10;

        sender.send_payload(&[0u8; 6]).unwrap();
        assert_eq!(sender.seq(), 0);
        assert_eq!(sender.timestamp(), 37); // (u32::MAX - 10) + 48 wraps to 37

        let mut buf = [0u8; 64];
        recv.recv_from(&mut buf).unwrap();
    }
}
