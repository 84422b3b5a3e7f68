//! Keeping the local cache and the remote document in agreement.
//!
//! - `Reconciler` decides which tier is authoritative on load and on sync
//! - `DebouncedPush` collapses bursts of saves into a single remote write

mod debounce;
mod policy;

pub use debounce::{DebouncedPush, DEFAULT_QUIET_PERIOD};
pub use policy::{remote_wins, LoadSource, Loaded, Reconciler, SyncOutcome};
