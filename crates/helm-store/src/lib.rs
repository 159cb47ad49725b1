//! Durable session event store.
//!
//! One JSONL file per session, namespaced by the `(workspace, app)` pair
//! supplied at first write, plus a metadata sidecar. Append-only; records
//! are immutable once written.

#![deny(unsafe_code)]

pub mod errors;
pub mod record;
pub mod store;

pub use errors::{Result, StoreError};
pub use record::PersistedEvent;
pub use store::SessionStore;
