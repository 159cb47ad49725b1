//! # helm-runtime
//!
//! The per-session agent controller: one status machine per session
//! wrapping a provider connection, with retry policy, conversation-context
//! bookkeeping, and usage accounting.
//!
//! - **[`controller::AgentSessionController`]**: drives one provider turn at
//!   a time, enforced by a status guard rather than locking
//! - **[`emitter::EventEmitter`]**: non-blocking broadcast of canonical
//!   events to subscribers (the server bridge, tests)
//! - **[`config::SessionConfig`]**: model selection and retry policy

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod emitter;
pub mod errors;
