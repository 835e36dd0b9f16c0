//! WebSocket Session Management
//!
//! Real-time interview driving over a WebSocket:
//!
//! - `protocol`: JSON message format between client and server.
//! - `session`: connection lifecycle, from handshake to termination.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
