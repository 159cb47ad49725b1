//! # helm-core
//!
//! Canonical event model and shared types for the Helm session console.
//!
//! This crate provides the vocabulary every other Helm crate reads and writes:
//!
//! - **Canonical events**: [`events::CanonicalEvent`] — the closed, tagged
//!   union all provider converters emit and all consumers switch on
//! - **Content blocks**: [`events::ContentBlock`] for assistant messages
//! - **Token usage**: [`usage::TokenUsage`] with cached-token normalization
//! - **Conversation context**: [`context::ConversationContext`] per-session
//!   turn log with usage precedence and tool-use merge rules
//! - **Session metadata**: [`session::SessionMetadata`] and the
//!   [`session::Namespace`] storage-layout enum
//! - **Retry**: [`retry::RetryConfig`] and backoff calculation
//! - **Logging**: [`logging`] tracing-subscriber setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other helm crates.

#![deny(unsafe_code)]

pub mod context;
pub mod events;
pub mod logging;
pub mod retry;
pub mod session;
pub mod usage;
