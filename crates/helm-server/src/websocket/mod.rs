//! WebSocket connection management, message dispatch, and fan-out.
//!
//! `connection` holds per-client state (send channel, workspace
//! subscriptions); `handler` parses and dispatches console messages;
//! `broadcast` fans framed events out to matching connections.

pub mod broadcast;
pub mod connection;
pub mod handler;
