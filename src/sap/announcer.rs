//! SAP packet framing and periodic emission/withdrawal (§4.5, RFC 2974).

use super::sdp::SapIdentity;
use crate::config::{MCAST_TTL, SAP_GROUP, SAP_PORT};
use crate::rtp::McastSender;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::thread;
use std::time::Duration;

/// SAP v1 "MIME type" field: always present per RFC 2974 (§9 open question:
/// the alternate source variant that omits it is not implemented here).
const SAP_MIME_TYPE: &[u8] = b"application/sdp\0";

const SAP_HEADER_ANNOUNCE: u8 = 0x20;
const SAP_HEADER_DELETE: u8 = 0x24;

pub struct SapAnnouncer {
    socket: McastSender,
    header_base: [u8; 8],
    sdp_bytes: Vec<u8>,
    pub packets_sent: u64,
    pub last_send_error: Option<String>,
}

impl SapAnnouncer {
    pub fn new(sdp: &str, identity: SapIdentity, origin_ip: Ipv4Addr, iface_ip: Option<Ipv4Addr>) -> std::io::Result<Self> {
        let dest = SocketAddrV4::new(SAP_GROUP.parse().unwrap(), SAP_PORT);
        let socket = McastSender::new(dest, MCAST_TTL, iface_ip)?;

        let mut header_base = [0u8; 8];
        header_base[0] = SAP_HEADER_ANNOUNCE;
        header_base[1] = 0x00; // auth length
        header_base[2..4].copy_from_slice(&identity.msg_id_hash.to_be_bytes());
        header_base[4..8].copy_from_slice(&origin_ip.octets());

        Ok(Self {
            socket,
            header_base,
            sdp_bytes: sdp.as_bytes().to_vec(),
            packets_sent: 0,
            last_send_error: None,
        })
    }

    fn packet(&self, delete: bool) -> Vec<u8> {
        let mut header = self.header_base;
        header[0] = if delete { SAP_HEADER_DELETE } else { SAP_HEADER_ANNOUNCE };

        let mut pkt = Vec::with_capacity(header.len() + SAP_MIME_TYPE.len() + self.sdp_bytes.len());
        pkt.extend_from_slice(&header);
        pkt.extend_from_slice(SAP_MIME_TYPE);
        pkt.extend_from_slice(&self.sdp_bytes);
        pkt
    }

    pub fn send_once(&mut self, delete: bool) -> std::io::Result<()> {
        let pkt = self.packet(delete);
        match self.socket.send(&pkt) {
            Ok(_) => {
                self.packets_sent += 1;
                Ok(())
            }
            Err(e) => {
                self.last_send_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Best-effort withdrawal burst: each send failure is swallowed (§4.5).
    pub fn send_delete_burst(&mut self, count: usize, spacing: Duration) {
        for i in 0..count.max(1) {
            let _ = self.send_once(true);
            if i + 1 < count {
                thread::sleep(spacing);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::GatewayEnv;
    use crate::sap::sdp::build_sdp;

    fn test_announcer() -> SapAnnouncer {
        let env = GatewayEnv::default();
        let (sdp, identity) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        SapAnnouncer::new(&sdp, identity, "10.0.0.5".parse().unwrap(), None).unwrap()
    }

    #[test]
    fn deletion_packet_matches_announcement_except_first_byte() {
        // Property 6.
        let ann = test_announcer();
        let announce = ann.packet(false);
        let delete = ann.packet(true);
        assert_eq!(announce.len(), delete.len());
        assert_eq!(announce[0], 0x20);
        assert_eq!(delete[0], 0x24);
        assert_eq!(&announce[1..], &delete[1..]);
    }

    #[test]
    fn mime_type_field_is_present_and_null_terminated() {
        let ann = test_announcer();
        let pkt = ann.packet(false);
        // header is 8 bytes, then 16-byte MIME field.
        assert_eq!(&pkt[8..24], SAP_MIME_TYPE);
    }

    #[test]
    fn msg_id_hash_matches_low_16_bits_of_identity() {
        let env = GatewayEnv::default();
        let (sdp, identity) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        let ann = SapAnnouncer::new(&sdp, identity, "10.0.0.5".parse().unwrap(), None).unwrap();
        let pkt = ann.packet(false);
        assert_eq!(u16::from_be_bytes([pkt[2], pkt[3]]), identity.msg_id_hash);
    }
}
