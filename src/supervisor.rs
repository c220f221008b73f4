//! Owns the slot table and the currently-running flows; the one thing the
//! HTTP contract layer talks to.

use crate::config::{validate_unique_endpoints, NdiSourceInfo, SlotConfig, Status, SystemConfig, DEFAULT_SLOTS};
use crate::env::GatewayEnv;
use crate::error::{GatewayError, Result};
use crate::ndi::NdiBackend;
use crate::slot::SlotRuntime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SOURCE_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(500);
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Supervisor {
    env: Arc<GatewayEnv>,
    ndi: Arc<NdiBackend>,
    slots: Mutex<Vec<SlotConfig>>,
    active: Mutex<HashMap<u32, SlotRuntime>>,
    running: AtomicBool,
    last_error: Mutex<String>,
}

impl Supervisor {
    pub fn new(env: Arc<GatewayEnv>, ndi: Arc<NdiBackend>) -> Self {
        Supervisor {
            env,
            ndi,
            slots: Mutex::new(DEFAULT_SLOTS.clone()),
            active: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
            last_error: Mutex::new(String::new()),
        }
    }

    pub fn list_sources(&self) -> Result<Vec<NdiSourceInfo>> {
        let names = self
            .ndi
            .list_sources(SOURCE_DISCOVERY_TIMEOUT)
            .map_err(GatewayError::SourceUnavailable)?;
        Ok(names.into_iter().map(|name| NdiSourceInfo { name }).collect())
    }

    pub fn get_config(&self) -> SystemConfig {
        SystemConfig { slots: self.slots.lock().clone() }
    }

    /// Updates one slot's config. Rejected (config unchanged) while running,
    /// matching the original "edit while stopped" workflow.
    pub fn set_slot(&self, updated: SlotConfig) -> SystemConfig {
        if !self.running.load(Ordering::SeqCst) {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots.iter_mut().find(|s| s.slot_id == updated.slot_id) {
                *slot = updated;
            }
        }
        SystemConfig { slots: self.slots.lock().clone() }
    }

    pub fn status(&self) -> Status {
        let running = self.running.load(Ordering::SeqCst);
        let message = if running {
            "Live".to_string()
        } else {
            let err = self.last_error.lock().clone();
            if err.is_empty() { "Offline".to_string() } else { err }
        };
        Status { running, message }
    }

    pub fn active_slots(&self) -> Vec<u32> {
        if !self.running.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let mut ids: Vec<u32> = self.active.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn slot_sdp(&self, slot_id: u32) -> Option<String> {
        self.active.lock().get(&slot_id).map(|s| s.sdp.clone())
    }

    pub fn slot_debug(&self, slot_id: u32) -> serde_json::Value {
        let active = self.active.lock();
        match active.get(&slot_id) {
            None => serde_json::json!({
                "running": self.running.load(Ordering::SeqCst),
                "slot_id": slot_id,
                "active": false,
            }),
            Some(slot) => serde_json::json!({
                "slot_id": slot.slot_id,
                "ndi_source_name": slot.config.ndi_source_name,
                "stream_name": slot.config.effective_stream_name(),
                "mcast": format!("{}:{}", slot.config.mcast_ip, slot.config.mcast_port),
                "audio_frames": slot.stats.audio_frames.load(Ordering::Relaxed),
                "rtp_packets": slot.stats.rtp_packets.load(Ordering::Relaxed),
                "sap_packets_sent": slot.stats.sap_packets_sent.load(Ordering::Relaxed),
                "last_error": slot.stats.last_error(),
                "active": true,
            }),
        }
    }

    /// Starts every enabled slot. If any slot fails to start, every slot
    /// already started in this call is rolled back and the supervisor stays
    /// stopped (matching the original transactional `/api/start`).
    pub async fn start(&self) -> Status {
        if self.running.load(Ordering::SeqCst) {
            return Status { running: true, message: "Live".to_string() };
        }

        let slots = self.slots.lock().clone();
        if let Err(e) = validate_unique_endpoints(&slots) {
            *self.last_error.lock() = format!("Start failed: {e}");
            return Status { running: false, message: self.last_error.lock().clone() };
        }

        let mut started: Vec<SlotRuntime> = Vec::new();
        let mut failure: Option<String> = None;

        for slot in slots.into_iter().filter(|s| s.is_enabled()) {
            match SlotRuntime::start(slot, self.ndi.clone(), self.env.clone()) {
                Ok(runtime) => started.push(runtime),
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        if let Some(err) = failure {
            for runtime in started {
                runtime.stop(WORKER_JOIN_TIMEOUT).await;
            }
            let message = format!("Start failed: {err}");
            *self.last_error.lock() = message.clone();
            return Status { running: false, message };
        }

        let mut active = self.active.lock();
        for runtime in started {
            active.insert(runtime.slot_id, runtime);
        }
        drop(active);

        *self.last_error.lock() = String::new();
        self.running.store(true, Ordering::SeqCst);
        Status { running: true, message: "Live".to_string() }
    }

    pub async fn stop(&self) -> Status {
        if !self.running.load(Ordering::SeqCst) {
            return Status { running: false, message: "Offline".to_string() };
        }

        let runtimes: Vec<SlotRuntime> = self.active.lock().drain().map(|(_, r)| r).collect();
        for runtime in runtimes {
            runtime.stop(WORKER_JOIN_TIMEOUT).await;
        }

        self.running.store(false, Ordering::SeqCst);
        *self.last_error.lock() = String::new();
        Status { running: false, message: "Offline".to_string() }
    }
}
