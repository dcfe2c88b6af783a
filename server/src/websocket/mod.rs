//! WebSocket session transport.
//!
//! Each connected client gets one engine session. Requests are dispatched to the
//! firmware update service one at a time; a contract violation closes only the
//! offending session.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
