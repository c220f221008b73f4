pub mod announcer;
pub mod sdp;

pub use announcer::SapAnnouncer;
pub use sdp::{build_sdp, SapIdentity};
