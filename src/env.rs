//! Process-wide configuration read once from the environment.
//!
//! Mirrors `config.py`'s one-shot `os.getenv` reads: the original re-read
//! `PTP_GMID`/`PTP_DOMAIN` on every `build_sdp()` call, which is harmless for
//! a process that never changes its own environment but is needless work on
//! the SAP hot path. We read once at startup instead.

use std::env;

#[derive(Debug, Clone, Default)]
pub struct GatewayEnv {
    /// `MCAST_IFACE` — force outgoing multicast interface name.
    pub mcast_iface: Option<String>,
    /// `SAP_SRC_IP` — force the SAP/SDP originating source IPv4.
    pub sap_src_ip: Option<String>,
    /// `PTP_GMID` — PTP grandmaster identity, advertised only (no discipline).
    pub ptp_gmid: Option<String>,
    /// `PTP_DOMAIN` — optional PTP domain number, appended to `ts-refclk` if `ptp_gmid` is set.
    pub ptp_domain: Option<String>,
    /// `NDI_LIB` — override path to the native NDI shared library.
    pub ndi_lib: Option<String>,
    /// `GATEWAY_HTTP_ADDR` — bind address for the thin HTTP contract layer.
    pub http_addr: String,
}

impl GatewayEnv {
    pub fn from_process_env() -> Self {
        Self {
            mcast_iface: non_empty(env::var("MCAST_IFACE").ok()),
            sap_src_ip: non_empty(env::var("SAP_SRC_IP").ok()),
            ptp_gmid: non_empty(env::var("PTP_GMID").ok()),
            ptp_domain: non_empty(env::var("PTP_DOMAIN").ok()),
            ndi_lib: non_empty(env::var("NDI_LIB").ok()),
            http_addr: env::var("GATEWAY_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
