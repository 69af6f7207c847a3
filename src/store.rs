use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::StoreConfig;
use crate::error::Error;
use crate::expire;
use crate::key;
use crate::node::Node;
use crate::response::Response;
use crate::PERMANENT;

/// Synchronous hook invoked with the response envelope of every mutation,
/// including deletions fired by expiration tasks. Fan-out to downstream
/// subscribers is the hook's own business.
pub trait Watcher: Send + Sync {
    fn notify(&self, resp: &Response);
}

impl<F> Watcher for F
where
    F: Fn(&Response) + Send + Sync,
{
    fn notify(&self, resp: &Response) {
        self(resp)
    }
}

/// One entry of the snapshot wire format.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotNode {
    value: String,
    #[serde(rename = "expireTime")]
    expire_time: DateTime<Utc>,
}

/// The serialized form of the whole map. Control handles are running
/// tasks, not state, and never appear here.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    nodes: HashMap<String, SnapshotNode>,
}

/// Internal shared state for the store.
pub(crate) struct StoreInner {
    data: DashMap<String, Node>,
    watcher: RwLock<Option<Arc<dyn Watcher>>>,
    messager: RwLock<Option<UnboundedSender<String>>>,
    /// Runtime handle captured at construction so expiration tasks can be
    /// spawned from any thread that holds a store handle.
    runtime: tokio::runtime::Handle,
    /// Volatile entries restored with less remaining TTL than this are
    /// dropped during recovery instead of getting a timer.
    min_recovery_ttl: Duration,
}

impl StoreInner {
    pub(crate) fn data(&self) -> &DashMap<String, Node> {
        &self.data
    }

    pub(crate) fn runtime(&self) -> &tokio::runtime::Handle {
        &self.runtime
    }

    /// Delivers one envelope: watch hook first, then the serialized form
    /// to the messager sink if one is registered.
    pub(crate) fn publish(&self, resp: &Response) -> Result<(), Error> {
        if let Some(watcher) = self.watcher.read().expect("watcher lock poisoned").as_ref() {
            watcher.notify(resp);
        }

        let text = serde_json::to_string(resp).map_err(Error::Serialization)?;

        if let Some(messager) = self
            .messager
            .read()
            .expect("messager lock poisoned")
            .as_ref()
        {
            // Unbounded hand-off; a consumer that went away is not this
            // store's failure.
            let _ = messager.send(text);
        }
        Ok(())
    }
}

/// In-memory key-value state machine with per-key TTL, change
/// notification and snapshot recovery.
///
/// A consensus layer applies committed operations against the store in
/// log order; every mutation carries the log index that ordered it, so
/// replaying the same operations reproduces the same state. Keys are
/// normalized as slash-separated paths before every lookup.
///
/// Each volatile key (one with a real expiration instant rather than the
/// [`PERMANENT`] sentinel) owns a single expiration task that deletes the
/// key when its TTL elapses. [`set`](Store::set) and
/// [`delete`](Store::delete) never race that task: they only signal it
/// over the key's control channel.
///
/// # Concurrency
///
/// `set` and `delete` are meant to be called from one sequential apply
/// path; invoking them concurrently for the same key from multiple
/// callers forfeits deterministic replay, though the map itself stays
/// consistent (`DashMap` shard locking). [`get`](Store::get) may run
/// concurrently with the apply path.
///
/// # Example
///
/// ```rust,no_run
/// use statekv::{Store, PERMANENT};
///
/// #[tokio::main]
/// async fn main() {
///     let store = Store::new();
///
///     let resp = store.set("/users/1", "alice", PERMANENT, 1).unwrap();
///     assert!(!resp.exist);
///
///     let resp = store.get("/users/1");
///     assert_eq!(resp.new_value, "alice");
///
///     store.delete("/users/1", 2).unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates a new store with default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The store
    /// needs a runtime to spawn expiration tasks.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a new store with custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The store
    /// needs a runtime to spawn expiration tasks.
    pub fn with_config(config: StoreConfig) -> Self {
        let runtime = tokio::runtime::Handle::try_current().unwrap_or_else(|_| {
            panic!(
                "statekv::Store requires a Tokio runtime. \
                 Ensure you are calling Store::new() or Store::with_config() \
                 from within a #[tokio::main] or #[tokio::test] context, \
                 or from code running on a Tokio runtime."
            )
        });

        Self {
            inner: Arc::new(StoreInner {
                data: DashMap::new(),
                watcher: RwLock::new(None),
                messager: RwLock::new(None),
                runtime,
                min_recovery_ttl: config.min_recovery_ttl,
            }),
        }
    }

    /// Registers the watch hook invoked on every mutation.
    pub fn set_watcher(&self, watcher: Arc<dyn Watcher>) {
        *self.inner.watcher.write().expect("watcher lock poisoned") = Some(watcher);
    }

    /// Registers the sink that receives every mutation's envelope as
    /// serialized JSON text. Registration is optional; without a sink the
    /// forwarding step is skipped.
    pub fn set_messager(&self, messager: UnboundedSender<String>) {
        *self.inner.messager.write().expect("messager lock poisoned") = Some(messager);
    }

    /// Sets `key` to `value`, expiring at `expire_at` ([`PERMANENT`] for
    /// no expiration). `index` is the log order assigned by the caller.
    ///
    /// An expiration instant already in the past degrades to a
    /// [`delete`](Store::delete) of the same key and index: a slow
    /// follower can replay a set whose TTL elapsed before it applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the envelope cannot be
    /// encoded; the map mutation is not rolled back.
    pub fn set(
        &self,
        key: &str,
        value: &str,
        expire_at: DateTime<Utc>,
        index: u64,
    ) -> Result<Response, Error> {
        let key = key::normalize(key);
        let volatile = expire_at != PERMANENT;

        if volatile && expire_at <= Utc::now() {
            return self.delete_normalized(key, index);
        }

        let (old_value, existed) = match self.inner.data.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let node = occupied.get();
                let old_value = node.value().to_string();

                // A live task gets rescheduled (or cancelled, when the new
                // state is permanent) instead of spawning a second one. A
                // failed send means the task already fired and exited, so
                // a fresh task is needed if the key stays volatile.
                let control = match node.control() {
                    Some(tx) if tx.send(expire_at).is_ok() => volatile.then(|| tx.clone()),
                    _ => volatile.then(|| expire::spawn(&self.inner, key.clone(), expire_at)),
                };

                occupied.insert(Node::new(value.to_string(), expire_at, control));
                (old_value, true)
            }
            Entry::Vacant(vacant) => {
                let control =
                    volatile.then(|| expire::spawn(&self.inner, key.clone(), expire_at));
                vacant.insert(Node::new(value.to_string(), expire_at, control));
                (String::new(), false)
            }
        };

        tracing::debug!(key = %key, volatile, index, "SET");

        let resp = Response::set(key, old_value, value, existed, expire_at, index);
        self.inner.publish(&resp)?;
        Ok(resp)
    }

    /// Looks up `key`. Never mutates, never notifies; the envelope index
    /// is 0 since a read has no ordering effect.
    pub fn get(&self, key: &str) -> Response {
        let key = key::normalize(key);
        let found = self
            .inner
            .data
            .get(&key)
            .map(|node| (node.value().value().to_string(), node.expire_at()));
        match found {
            Some((value, expire_at)) => Response::get_hit(key, &value, expire_at),
            None => Response::get_miss(key),
        }
    }

    /// Deletes `key`. A missing key is not an error: the returned
    /// envelope reports `exist = false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the envelope cannot be
    /// encoded; the map mutation is not rolled back.
    pub fn delete(&self, key: &str, index: u64) -> Result<Response, Error> {
        self.delete_normalized(key::normalize(key), index)
    }

    fn delete_normalized(&self, key: String, index: u64) -> Result<Response, Error> {
        // Cancel the expiration task before touching the map so it cannot
        // fire in between and attempt the same removal.
        if let Some(node) = self.inner.data.get(&key) {
            if let Some(tx) = node.control() {
                let _ = tx.send(PERMANENT);
            }
        }

        match self.inner.data.remove(&key) {
            Some((key, node)) => {
                tracing::debug!(key = %key, index, "DELETE");
                let expiration = node.expire_at();
                let resp = Response::delete(key, node.into_value(), true, expiration, index);
                self.inner.publish(&resp)?;
                Ok(resp)
            }
            // Deleting an absent key is a no-op; nothing to notify.
            None => Ok(Response::delete(key, String::new(), false, PERMANENT, index)),
        }
    }

    /// Serializes the whole map as a JSON snapshot. Expiration instants
    /// are saved as-is; control handles are running tasks, not state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn save(&self) -> Result<Vec<u8>, Error> {
        let nodes: HashMap<String, SnapshotNode> = self
            .inner
            .data
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    SnapshotNode {
                        value: entry.value().value().to_string(),
                        expire_time: entry.value().expire_at(),
                    },
                )
            })
            .collect();

        serde_json::to_vec(&Snapshot { nodes }).map_err(Error::Serialization)
    }

    /// Replaces the map wholesale from a snapshot produced by
    /// [`save`](Store::save).
    ///
    /// A snapshot stores instants, not durations, and real time keeps
    /// passing while it sits on disk. Volatile entries whose remaining
    /// TTL is below the configured minimum are dropped; the rest get a
    /// fresh expiration task recomputed from the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] for a malformed snapshot; the
    /// map keeps its previous contents in that case.
    pub fn recover(&self, state: &[u8]) -> Result<(), Error> {
        let snapshot: Snapshot = serde_json::from_slice(state).map_err(Error::Deserialization)?;

        // Dropping the old entries closes their control channels, which
        // terminates whatever tasks the replaced map had running.
        self.inner.data.clear();

        let now = Utc::now();
        let mut restored = 0usize;
        let mut dropped = 0usize;

        for (key, node) in snapshot.nodes {
            if node.expire_time == PERMANENT {
                self.inner
                    .data
                    .insert(key, Node::new(node.value, PERMANENT, None));
                restored += 1;
                continue;
            }

            let remaining = (node.expire_time - now).to_std().unwrap_or_default();
            if remaining < self.inner.min_recovery_ttl {
                // Expired during downtime, or close enough that arming a
                // timer is pointless.
                dropped += 1;
                continue;
            }

            let control = expire::spawn(&self.inner, key.clone(), node.expire_time);
            self.inner
                .data
                .insert(key, Node::new(node.value, node.expire_time, Some(control)));
            restored += 1;
        }

        tracing::info!(restored, dropped, "recovered store from snapshot");
        Ok(())
    }

    /// Returns the number of entries in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Checks if a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.data.contains_key(&key::normalize(key))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
