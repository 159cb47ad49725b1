//! WebSocket gateway for Helm sessions.
//!
//! Serves the reconnection sync protocol and fans canonical events out to
//! connected consoles, scoped by workspace subscription. Durable history
//! lives in `helm-store`; the in-memory sync history covers the process
//! lifetime only.

#![deny(unsafe_code)]

pub mod bridge;
pub mod protocol;
pub mod server;
pub mod shutdown;
pub mod sync;
pub mod websocket;
