//! Per-key expiration tasks.
//!
//! Every volatile key owns exactly one task counting down to its
//! expiration instant. The store never deletes a volatile key's entry on
//! the expiry path itself; it only signals the task over the key's
//! control channel. The task in turn owns exactly one map mutation: the
//! removal of its own key when the countdown elapses.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::response::Response;
use crate::store::StoreInner;
use crate::PERMANENT;

/// Starts an expiration task for `key` and returns its control handle.
///
/// Sending a new instant on the handle re-arms the countdown; sending
/// [`PERMANENT`] terminates the task without touching the map. Sends never
/// block: the channel is unbounded, and a send to a task that already
/// fired and exited simply fails.
pub(crate) fn spawn(
    store: &Arc<StoreInner>,
    key: String,
    expire_at: DateTime<Utc>,
) -> UnboundedSender<DateTime<Utc>> {
    let (tx, rx) = mpsc::unbounded_channel();
    store
        .runtime()
        .spawn(run(Arc::downgrade(store), key, expire_at, rx));
    tx
}

async fn run(
    store: Weak<StoreInner>,
    key: String,
    mut armed: DateTime<Utc>,
    mut control: UnboundedReceiver<DateTime<Utc>>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(countdown(armed)) => {
                let Some(store) = store.upgrade() else { return };

                // Only delete if the entry still expires at the instant
                // this task armed with; a set may have replaced it after
                // the timer fired but before we got here.
                if let Some((key, node)) =
                    store.data().remove_if(&key, |_, node| node.expire_at() == armed)
                {
                    tracing::debug!(key = %key, "key expired");
                    let expiration = node.expire_at();
                    let resp = Response::delete(key, node.into_value(), true, expiration, 0);
                    if let Err(err) = store.publish(&resp) {
                        tracing::warn!(key = %resp.key, error = %err, "failed to forward expiry event");
                    }
                    return;
                }

                // Entry gone (racing delete) or re-armed under us; adopt
                // whatever the map now says.
                match store.data().get(&key).map(|node| node.expire_at()) {
                    None => return,
                    Some(next) if next == PERMANENT => return,
                    Some(next) => armed = next,
                }
            }
            signal = control.recv() => {
                match signal {
                    // Channel closed: the store or this key's entry is gone.
                    None => return,
                    Some(next) if next == PERMANENT => return,
                    Some(next) => armed = next,
                }
            }
        }
    }
}

/// Remaining time until `expire_at`; zero if it already passed.
fn countdown(expire_at: DateTime<Utc>) -> Duration {
    (expire_at - Utc::now()).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::countdown;
    use chrono::{Duration, Utc};

    #[test]
    fn test_countdown_future_instant() {
        let wait = countdown(Utc::now() + Duration::seconds(10));
        assert!(wait > std::time::Duration::from_secs(9));
        assert!(wait <= std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_countdown_past_instant_is_zero() {
        let wait = countdown(Utc::now() - Duration::seconds(10));
        assert_eq!(wait, std::time::Duration::ZERO);
    }
}
