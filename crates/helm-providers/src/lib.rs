//! # helm-providers
//!
//! Converts the two upstream agent backends' native event protocols into
//! [`helm_core::events::CanonicalEvent`]s.
//!
//! - **[`claude`]**: the delta-protocol backend. Messages arrive as
//!   fragments (`message_start` → deltas → `message_stop`) plus an
//!   eventually-consistent whole-message snapshot; [`accumulator`]
//!   reconstructs the fragments and suppresses the duplicate snapshot.
//! - **[`codex`]**: the lifecycle-item backend. Whole work-items arrive as
//!   `started`/`updated`/`completed`; each completed item maps 1:1 to a
//!   canonical event.
//! - **[`provider`]**: the [`provider::AgentProvider`] trait the session
//!   controller drives, yielding a stream of canonical events per turn.
//! - **[`model_cache`]**: process-wide cache of the most recently detected
//!   model id, passed explicitly (no global statics).
//!
//! All converters are total: unrecognized native shapes yield `[]`,
//! never an error.

#![deny(unsafe_code)]

pub mod accumulator;
pub mod claude;
pub mod codex;
pub mod model_cache;
pub mod provider;
