//! One output flow: an audio worker (NDI -> repacketize -> RTP) and an
//! independent SAP announcer worker, sharing only a cancellation signal and
//! the debug counters the HTTP layer reads back.

use crate::config::{
    AES67_CHANNELS, AES67_PAYLOAD_TYPE, AES67_SAMPLES_PER_PACKET, AES67_SAMPLE_RATE, MCAST_TTL,
    SAP_INTERVAL_SEC, SAP_POLL_INTERVAL_MS, SlotConfig,
};
use crate::env::GatewayEnv;
use crate::error::{GatewayError, Result};
use crate::iface::pick_multicast_iface;
use crate::ndi::{NdiBackend, NdiReceiver};
use crate::repacketizer::Repacketizer;
use crate::rtp::RtpSender;
use crate::sap::{build_sdp, SapAnnouncer};
use parking_lot::Mutex;
use rand::Rng;
use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters and last-error state a running slot exposes to `GET /api/debug/slot/{id}`.
#[derive(Debug, Default)]
pub struct SlotStats {
    pub audio_frames: AtomicU64,
    pub rtp_packets: AtomicU64,
    pub sap_packets_sent: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SlotStats {
    fn set_error(&self, msg: impl Into<String>) {
        *self.last_error.lock() = Some(msg.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

/// A single active flow: one audio worker task plus one SAP worker task,
/// both cancelled together via `cancel`.
pub struct SlotRuntime {
    pub slot_id: u32,
    pub config: SlotConfig,
    pub sdp: String,
    cancel: Arc<AtomicBool>,
    notify: Arc<tokio::sync::Notify>,
    pub stats: Arc<SlotStats>,
    audio_task: tokio::task::JoinHandle<()>,
    sap_task: tokio::task::JoinHandle<()>,
}

impl SlotRuntime {
    /// Spawns the audio and SAP workers for one enabled slot. Fails fast if
    /// the SDP can't be built or the sockets can't be bound; the worker
    /// loops themselves only report NDI connect failures asynchronously.
    pub fn start(config: SlotConfig, ndi: Arc<NdiBackend>, env: Arc<GatewayEnv>) -> Result<Self> {
        let source_name = config
            .ndi_source_name
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::ConfigInvalid(format!("slot {} has no bound NDI source", config.slot_id)))?;

        // Originating source IPv4: forced SAP_SRC_IP, else the picked outgoing
        // interface's address, else 0.0.0.0 (§4.5).
        let iface = pick_multicast_iface(env.mcast_iface.as_deref());
        let origin_ipv4 = match env.sap_src_ip.as_deref().map(|ip| ip.parse()) {
            Some(Ok(ip)) => ip,
            _ => iface.ipv4.unwrap_or(std::net::Ipv4Addr::UNSPECIFIED),
        };
        let origin_ip = origin_ipv4.to_string();

        let (sdp, identity) = build_sdp(
            &config.effective_stream_name(),
            &config.mcast_ip,
            config.mcast_port,
            AES67_PAYLOAD_TYPE,
            "L24",
            &origin_ip,
            &env,
        );

        let dest: SocketAddrV4 = format!("{}:{}", config.mcast_ip, config.mcast_port)
            .parse()
            .map_err(|e| GatewayError::ConfigInvalid(format!("bad multicast endpoint: {e}")))?;

        let ssrc: u32 = rand::thread_rng().gen_range(1..=u32::MAX);
        let rtp = RtpSender::new(dest, MCAST_TTL, iface.ipv4, AES67_PAYLOAD_TYPE, ssrc, AES67_SAMPLES_PER_PACKET as u32)
            .map_err(GatewayError::SendFailed)?;

        let sap = SapAnnouncer::new(&sdp, identity, origin_ipv4, iface.ipv4).map_err(GatewayError::SendFailed)?;

        let cancel = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(tokio::sync::Notify::new());
        let stats = Arc::new(SlotStats::default());

        let recv_name = format!("aes67-ndi-gateway-{}", config.slot_id);
        let audio_task = tokio::task::spawn_blocking({
            let cancel = cancel.clone();
            let stats = stats.clone();
            let ndi = ndi.clone();
            move || audio_worker(ndi, source_name, recv_name, rtp, cancel, stats)
        });

        let sap_task = tokio::spawn({
            let cancel = cancel.clone();
            let notify = notify.clone();
            let stats = stats.clone();
            sap_worker(sap, cancel, notify, stats)
        });

        Ok(SlotRuntime {
            slot_id: config.slot_id,
            config,
            sdp,
            cancel,
            notify,
            stats,
            audio_task,
            sap_task,
        })
    }

    /// Signals both workers to stop and waits (bounded) for them to exit.
    /// The SAP worker sends a deletion burst before its loop returns.
    pub async fn stop(self, join_timeout: Duration) {
        self.cancel.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();

        let _ = tokio::time::timeout(join_timeout, self.audio_task).await;
        let _ = tokio::time::timeout(join_timeout, self.sap_task).await;
    }
}

/// Blocking NDI -> repacketizer -> RTP loop, run on a `spawn_blocking` thread
/// since the NDI capture call and the repacketizer are both synchronous.
fn audio_worker(
    ndi: Arc<NdiBackend>,
    source_name: String,
    recv_name: String,
    mut rtp: RtpSender,
    cancel: Arc<AtomicBool>,
    stats: Arc<SlotStats>,
) {
    let mut receiver: NdiReceiver = match ndi.connect(&source_name, &recv_name) {
        Ok(r) => r,
        Err(e) => {
            stats.set_error(format!("NDI connect failed: {e}"));
            return;
        }
    };

    let mut repacketizer = Repacketizer::new(AES67_SAMPLES_PER_PACKET);
    let capture_timeout = Duration::from_millis(500);

    while !cancel.load(Ordering::SeqCst) {
        match receiver.next_frame(capture_timeout) {
            Ok(Some(frame)) => {
                if frame.sample_rate != AES67_SAMPLE_RATE || frame.channel_count < AES67_CHANNELS {
                    continue;
                }
                stats.audio_frames.fetch_add(1, Ordering::Relaxed);
                for payload in repacketizer.push_frame(&frame) {
                    match rtp.send_payload(&payload) {
                        Ok(_) => {
                            stats.rtp_packets.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => stats.set_error(format!("RTP send failed: {e}")),
                    }
                }
            }
            Ok(None) => continue,
            Err(e) => {
                stats.set_error(format!("NDI stream ended: {e}"));
                break;
            }
        }
    }

    receiver.close();
}

/// Periodic SAP announce loop, independent of the audio path so a stalled
/// NDI source doesn't stop receivers from hearing about the flow.
async fn sap_worker(
    mut sap: SapAnnouncer,
    cancel: Arc<AtomicBool>,
    notify: Arc<tokio::sync::Notify>,
    stats: Arc<SlotStats>,
) {
    let interval = Duration::from_secs_f64(SAP_INTERVAL_SEC);
    let poll = Duration::from_millis(SAP_POLL_INTERVAL_MS);
    let mut next_send = tokio::time::Instant::now();

    loop {
        if cancel.load(Ordering::SeqCst) {
            break;
        }

        let now = tokio::time::Instant::now();
        if now >= next_send {
            match sap.send_once(false) {
                Ok(_) => {
                    stats.sap_packets_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => stats.set_error(format!("SAP: {e}")),
            }
            next_send = now + interval;
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            _ = notify.notified() => {}
        }
    }

    sap.send_delete_burst(3, Duration::from_millis(50));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_start_at_zero_and_track_last_error() {
        let stats = SlotStats::default();
        assert_eq!(stats.audio_frames.load(Ordering::Relaxed), 0);
        assert_eq!(stats.last_error(), None);

        stats.set_error("NDI connect failed: no such source");
        assert_eq!(stats.last_error().as_deref(), Some("NDI connect failed: no such source"));

        stats.audio_frames.fetch_add(1, Ordering::Relaxed);
        assert_eq!(stats.audio_frames.load(Ordering::Relaxed), 1);
    }
}
