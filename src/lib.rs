//! # statekv
//!
//! The state-machine storage layer of a replicated key-value system: an
//! in-memory map from string keys to values with optional per-key TTL,
//! synchronous change notification and byte-level snapshot recovery.
//!
//! A consensus layer applies committed operations against the store in
//! log order; every mutation carries the log index that ordered it, so
//! replaying the same operations reproduces the same state.
//!
//! ## Features
//!
//! - Keys normalized as slash-separated paths before every lookup
//! - One expiration task per volatile key, rescheduled and cancelled
//!   over a non-blocking control channel
//! - Every mutation produces an immutable [`Response`] envelope, passed
//!   to the registered [`Watcher`] and forwarded as JSON text to an
//!   optional messager sink
//! - JSON snapshot of the whole map with expired-entry cleanup on
//!   recovery
//!
//! ## Example
//!
//! ```rust,no_run
//! use statekv::{Store, PERMANENT};
//! use chrono::{Duration, Utc};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Store::new();
//!
//!     // Permanent key, applied at log index 1.
//!     store.set("/config/name", "node-a", PERMANENT, 1).unwrap();
//!
//!     // Volatile key: deleted automatically when its TTL elapses.
//!     let expire_at = Utc::now() + Duration::seconds(30);
//!     store.set("/leases/7", "held", expire_at, 2).unwrap();
//!
//!     let resp = store.get("/config/name");
//!     assert_eq!(resp.new_value, "node-a");
//!
//!     // Snapshot and restore.
//!     let snapshot = store.save().unwrap();
//!     store.recover(&snapshot).unwrap();
//! }
//! ```

mod config;
mod error;
mod expire;
mod key;
mod node;
mod response;
mod store;

use chrono::{DateTime, Utc};

pub use config::StoreConfig;
pub use error::Error;
pub use node::Node;
pub use response::{Action, Response};
pub use store::{Store, Watcher};

/// Sentinel expiration instant meaning "never expires".
///
/// Real TTLs always resolve to instants strictly after the epoch, so the
/// sentinel is distinguishable from any live expiration.
pub const PERMANENT: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;
