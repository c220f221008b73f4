//! Canonical SDP rendering and the stable per-flow identity it's keyed on
//! (§3 `SapIdentity`, §4.5).

use crate::config::{AES67_CHANNELS, AES67_SAMPLE_RATE, SDP_ORIGIN_USER};
use crate::env::GatewayEnv;

/// A stable identity for one AES67 flow, derived by CRC-32 of its canonical
/// key so that restarting the process with the same config doesn't look like
/// a new flow to receivers (Property 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SapIdentity {
    /// Used as the SDP `o=` `sess-id`.
    pub sess_id: u32,
    /// Low 16 bits, used as the SAP `msg-id-hash`.
    pub msg_id_hash: u16,
}

impl SapIdentity {
    pub fn derive(
        stream_name: &str,
        mcast_ip: &str,
        mcast_port: u16,
        payload_type: u8,
        codec: &str,
    ) -> Self {
        let key = canonical_key(stream_name, mcast_ip, mcast_port, payload_type, codec);
        let sess_id = crc32fast::hash(key.as_bytes());
        SapIdentity {
            sess_id,
            msg_id_hash: (sess_id & 0xFFFF) as u16,
        }
    }
}

fn canonical_key(stream_name: &str, mcast_ip: &str, mcast_port: u16, payload_type: u8, codec: &str) -> String {
    format!(
        "{stream_name}|{mcast_ip}|{mcast_port}|pt={payload_type}|sr={AES67_SAMPLE_RATE}|ch={AES67_CHANNELS}|{codec}"
    )
}

fn ptime_ms(samples_per_packet: usize) -> u32 {
    ((samples_per_packet as f64 * 1000.0) / AES67_SAMPLE_RATE as f64).round() as u32
}

/// SDP session version. Pinned to 1: per the design notes, the later source
/// variant keeps this stable rather than deriving it from wall-clock time,
/// since Dante treats a sess-ver change as an updated/new flow.
const SESS_VER: u32 = 1;

/// Build the canonical SDP text and its stable identity for one flow.
///
/// `origin_ip` is the SAP/SDP originating source IPv4, as resolved by the
/// multicast interface policy (or forced via `SAP_SRC_IP`).
pub fn build_sdp(
    stream_name: &str,
    mcast_ip: &str,
    mcast_port: u16,
    payload_type: u8,
    codec: &str,
    origin_ip: &str,
    env: &GatewayEnv,
) -> (String, SapIdentity) {
    let identity = SapIdentity::derive(stream_name, mcast_ip, mcast_port, payload_type, codec);

    let mut lines = vec![
        "v=0".to_string(),
        format!("o={SDP_ORIGIN_USER} {} {SESS_VER} IN IP4 {origin_ip}", identity.sess_id),
        format!("s={stream_name}"),
        "t=0 0".to_string(),
        format!("m=audio {mcast_port} RTP/AVP {payload_type}"),
        format!("c=IN IP4 {mcast_ip}/32"),
        format!("a=rtcp:{}", mcast_port as u32 + 1),
        format!("a=rtpmap:{payload_type} {codec}/{AES67_SAMPLE_RATE}/{AES67_CHANNELS}"),
        format!("a=ptime:{}", ptime_ms(crate::config::AES67_SAMPLES_PER_PACKET)),
        "a=recvonly".to_string(),
        "a=mediaclk:direct=0".to_string(),
    ];

    if let Some(gmid) = env.ptp_gmid.as_deref() {
        let line = match env.ptp_domain.as_deref().and_then(|d| d.parse::<u32>().ok()) {
            Some(domain) => format!("a=ts-refclk:ptp=IEEE1588-2008:{gmid}:{domain}"),
            None => format!("a=ts-refclk:ptp=IEEE1588-2008:{gmid}"),
        };
        lines.push(line);
    }

    lines.push(String::new()); // trailing blank line
    (lines.join("\r\n"), identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable_across_rebuilds() {
        // Property 5: same logical config -> same identity, regardless of call count.
        let env = GatewayEnv::default();
        let (_, id1) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        let (_, id2) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        assert_eq!(id1, id2);

        let (_, id3) = build_sdp("Slot 1", "239.69.0.11", 5004, 96, "L24", "10.0.0.5", &env);
        assert_ne!(id1, id3);
    }

    #[test]
    fn sdp_shape_matches_canonical_layout() {
        let env = GatewayEnv::default();
        let (sdp, identity) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        let lines: Vec<&str> = sdp.split("\r\n").collect();
        assert_eq!(lines[0], "v=0");
        assert_eq!(
            lines[1],
            format!("o=SSQ {} 1 IN IP4 10.0.0.5", identity.sess_id)
        );
        assert_eq!(lines[2], "s=Slot 1");
        assert_eq!(lines[3], "t=0 0");
        assert_eq!(lines[4], "m=audio 5004 RTP/AVP 96");
        assert_eq!(lines[5], "c=IN IP4 239.69.0.10/32");
        assert_eq!(lines[6], "a=rtcp:5005");
        assert_eq!(lines[7], "a=rtpmap:96 L24/48000/2");
        assert_eq!(lines[8], "a=ptime:1");
        assert_eq!(lines[9], "a=recvonly");
        assert_eq!(lines[10], "a=mediaclk:direct=0");
        assert_eq!(lines[11], ""); // trailing blank line
        assert!(sdp.ends_with("\r\n"));
    }

    #[test]
    fn ptp_identity_appended_only_when_configured() {
        let mut env = GatewayEnv::default();
        env.ptp_gmid = Some("00-11-22-33-44-55-66-77".to_string());
        env.ptp_domain = Some("0".to_string());
        let (sdp, _) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        assert!(sdp.contains("a=ts-refclk:ptp=IEEE1588-2008:00-11-22-33-44-55-66-77:0"));

        env.ptp_domain = None;
        let (sdp2, _) = build_sdp("Slot 1", "239.69.0.10", 5004, 96, "L24", "10.0.0.5", &env);
        assert!(sdp2.contains("a=ts-refclk:ptp=IEEE1588-2008:00-11-22-33-44-55-66-77"));
        assert!(!sdp2.contains(":0\r\n"));
    }

    #[test]
    fn ptime_rounds_to_nearest_ms() {
        assert_eq!(ptime_ms(48), 1);
        assert_eq!(ptime_ms(192), 4);
    }
}
