//! AES67 RTP/SAP gateway for NDI audio sources.

pub mod audio_frame;
pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod iface;
pub mod ndi;
pub mod rtp;
pub mod sap;
pub mod repacketizer;
pub mod slot;
pub mod supervisor;

pub use env::GatewayEnv;
pub use error::{GatewayError, Result};
pub use supervisor::Supervisor;
