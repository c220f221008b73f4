pub mod backend;
pub mod ffi;

pub use backend::{NdiBackend, NdiReceiver};
