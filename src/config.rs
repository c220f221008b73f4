//! AES67 format constants, default slot table, and the JSON-facing config types
//! consumed by the HTTP contract layer.

use serde::{Deserialize, Serialize};

/// AES67 sample rate: the only rate the NDI producer accepts.
pub const AES67_SAMPLE_RATE: u32 = 48_000;
/// Only the first two channels of any source are used.
pub const AES67_CHANNELS: u16 = 2;
pub const AES67_BIT_DEPTH: u8 = 24;
/// Default RTP/AVP dynamic payload type for the AES67 flow.
pub const AES67_PAYLOAD_TYPE: u8 = 96;
/// Samples per channel per RTP packet. 48 => 1ms at 48kHz.
pub const AES67_SAMPLES_PER_PACKET: usize = 48;

/// Dante Controller / AES67 receivers listen for SAP here.
pub const SAP_GROUP: &str = "239.255.255.255";
pub const SAP_PORT: u16 = 9875;
pub const SAP_INTERVAL_SEC: f64 = 1.0;
/// SAP worker polls cancellation at least this often.
pub const SAP_POLL_INTERVAL_MS: u64 = 200;

pub const MCAST_TTL: u32 = 16;

pub const SDP_ORIGIN_USER: &str = "SSQ";
pub const SDP_SESSION_NAME_PREFIX: &str = "AES67";

/// Default (ip, port) pairs for the four slots, before any NDI source is bound.
pub const DEFAULT_SLOT_ENDPOINTS: [(&str, u16); 4] = [
    ("239.69.0.10", 5004),
    ("239.69.0.11", 5004),
    ("239.69.0.12", 5004),
    ("239.69.0.13", 5004),
];

lazy_static::lazy_static! {
    /// The default slot table, built once from [`DEFAULT_SLOT_ENDPOINTS`].
    ///
    /// All slots start disabled (`ndi_source_name: None`); the operator binds
    /// a source per slot through `configure()`/`set_slot()`.
    pub static ref DEFAULT_SLOTS: Vec<SlotConfig> = DEFAULT_SLOT_ENDPOINTS
        .iter()
        .enumerate()
        .map(|(i, (ip, port))| SlotConfig {
            slot_id: (i + 1) as u32,
            ndi_source_name: None,
            stream_name: format!("{SDP_SESSION_NAME_PREFIX} Slot {}", i + 1),
            mcast_ip: ip.to_string(),
            mcast_port: *port,
        })
        .collect();
}

/// Configuration for one output flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub slot_id: u32,
    #[serde(default)]
    pub ndi_source_name: Option<String>,
    #[serde(default)]
    pub stream_name: String,
    pub mcast_ip: String,
    pub mcast_port: u16,
}

impl SlotConfig {
    /// Is this slot bound to an NDI source and eligible to start?
    pub fn is_enabled(&self) -> bool {
        self.ndi_source_name
            .as_ref()
            .is_some_and(|s| !s.is_empty())
    }

    /// The AES67 stream name, falling back to the NDI source name when unset.
    pub fn effective_stream_name(&self) -> String {
        if !self.stream_name.is_empty() {
            self.stream_name.clone()
        } else {
            self.ndi_source_name.clone().unwrap_or_default()
        }
    }

    fn endpoint(&self) -> (&str, u16) {
        (self.mcast_ip.as_str(), self.mcast_port)
    }
}

/// Validate that no two *enabled* slots share a (mcast_ip, mcast_port) endpoint.
pub fn validate_unique_endpoints(slots: &[SlotConfig]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for slot in slots.iter().filter(|s| s.is_enabled()) {
        if !seen.insert(slot.endpoint()) {
            return Err(format!(
                "duplicate multicast endpoint {}:{} across enabled slots",
                slot.mcast_ip, slot.mcast_port
            ));
        }
    }
    Ok(())
}

/// The full slot table, as returned by `GET /api/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub slots: Vec<SlotConfig>,
}

/// An NDI source discovered on the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NdiSourceInfo {
    pub name: String,
}

/// Supervisor running/stopped state, as returned by `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub running: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: u32, source: Option<&str>, ip: &str, port: u16) -> SlotConfig {
        SlotConfig {
            slot_id: id,
            ndi_source_name: source.map(str::to_string),
            stream_name: String::new(),
            mcast_ip: ip.to_string(),
            mcast_port: port,
        }
    }

    #[test]
    fn default_slots_have_unique_endpoints_and_are_all_disabled() {
        assert_eq!(DEFAULT_SLOTS.len(), 4);
        assert!(DEFAULT_SLOTS.iter().all(|s| !s.is_enabled()));
        assert!(validate_unique_endpoints(&DEFAULT_SLOTS).is_ok());
    }

    #[test]
    fn duplicate_endpoints_rejected_only_among_enabled_slots() {
        let slots = vec![
            slot(1, Some("Source A"), "239.69.0.10", 5004),
            slot(2, Some("Source B"), "239.69.0.10", 5004),
        ];
        assert!(validate_unique_endpoints(&slots).is_err());

        // Same endpoint, but one slot is unbound -> not a conflict.
        let slots = vec![
            slot(1, Some("Source A"), "239.69.0.10", 5004),
            slot(2, None, "239.69.0.10", 5004),
        ];
        assert!(validate_unique_endpoints(&slots).is_ok());
    }

    #[test]
    fn effective_stream_name_falls_back_to_source_name() {
        let mut s = slot(1, Some("My NDI Source"), "239.69.0.10", 5004);
        assert_eq!(s.effective_stream_name(), "My NDI Source");
        s.stream_name = "AES67 Slot 1".to_string();
        assert_eq!(s.effective_stream_name(), "AES67 Slot 1");
        s.stream_name.clear();
        assert_eq!(s.effective_stream_name(), "My NDI Source");
    }
}
