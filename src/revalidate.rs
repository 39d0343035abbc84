use std::{fmt::Display, future::Future, sync::Arc, time::Duration};

use actix_web::rt;
use tokio::{task::JoinHandle, time::{interval, MissedTickBehavior}};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{model::Snapshot, store::{Action, Store}};

/// A running revalidation task. Dropping the handle cancels it.
pub struct Subscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels the task and waits until it has stopped
    pub async fn shutdown(mut self) {
        self.cancel();

        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Keeps `store` in sync with whatever `fetch` returns.
///
/// Fetches right away, then on every `every` tick. A failed fetch is retried
/// up to `retries` times before waiting for the next tick.
pub fn subscribe<F, Fut, E>(store: Arc<Store>, every: Duration, retries: u32, fetch: F) -> Subscription
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<Snapshot, E>> + 'static,
    E: Display + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let handle = rt::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(every_secs = every.as_secs_f64(), "Revalidation started");

        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancelled.cancelled() => break,
                        _ = revalidate(&store, retries, &fetch) => {}
                    }
                }
            }
        }

        info!("Revalidation stopped");
    });

    Subscription { token, handle: Some(handle) }
}

async fn revalidate<F, Fut, E>(store: &Store, retries: u32, fetch: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Snapshot, E>>,
    E: Display,
{
    for attempt in 0..=retries {
        match fetch().await {
            Ok(snapshot) if !snapshot.ok => warn!(attempt, "n8n snapshot reported a failure"),
            Ok(snapshot) => {
                debug!(applications = snapshot.items.len(), "Revalidated from n8n");
                store.dispatch(Action::Hydrate { applications: snapshot.items, balance: snapshot.balance });
                return;
            }
            Err(err) => warn!(error = %err, attempt, "Revalidation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use actix_web::rt::time::sleep;

    use crate::model::tests::sample_application;

    use super::*;

    #[actix_web::test]
    async fn test_hydrates_store() {
        let store = Arc::new(Store::in_memory());
        let calls = Rc::new(Cell::new(0));

        let subscription = subscribe(store.clone(), Duration::from_millis(20), 0, {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                async {
                    Ok::<_, String>(Snapshot {
                        ok: true,
                        items: vec![sample_application("remote", "2025-06-01T09:00:00+08:00")],
                        balance: None,
                    })
                }
            }
        });

        sleep(Duration::from_millis(90)).await;
        subscription.shutdown().await;

        assert!(calls.get() >= 2, "fetched {} times", calls.get());
        assert_eq!(store.snapshot().applications[0].id, "remote");
    }

    #[actix_web::test]
    async fn test_retries_then_waits() {
        let store = Arc::new(Store::in_memory());
        store.dispatch(Action::Upsert(sample_application("local", "2025-06-01T09:00:00+08:00")));
        let calls = Rc::new(Cell::new(0));

        let subscription = subscribe(store.clone(), Duration::from_secs(60), 2, {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                async { Err::<Snapshot, _>("n8n is down") }
            }
        });

        sleep(Duration::from_millis(50)).await;
        subscription.shutdown().await;

        assert_eq!(calls.get(), 3);
        assert_eq!(store.snapshot().applications[0].id, "local");
    }

    #[actix_web::test]
    async fn test_failed_snapshot_is_retried_and_ignored() {
        let store = Arc::new(Store::in_memory());
        store.dispatch(Action::Upsert(sample_application("local", "2025-06-01T09:00:00+08:00")));
        let calls = Rc::new(Cell::new(0));

        let subscription = subscribe(store.clone(), Duration::from_secs(60), 2, {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                async {
                    Ok::<_, String>(Snapshot {
                        ok: false,
                        items: vec![sample_application("remote", "2025-06-02T09:00:00+08:00")],
                        balance: None,
                    })
                }
            }
        });

        sleep(Duration::from_millis(50)).await;
        subscription.shutdown().await;

        assert_eq!(calls.get(), 3);

        let state = store.snapshot();
        assert_eq!(state.applications.len(), 1);
        assert_eq!(state.applications[0].id, "local");
    }

    #[actix_web::test]
    async fn test_cancel_stops_fetching() {
        let store = Arc::new(Store::in_memory());
        let calls = Rc::new(Cell::new(0));

        let subscription = subscribe(store, Duration::from_millis(10), 0, {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                async { Ok::<_, String>(Snapshot { ok: true, items: Vec::new(), balance: None }) }
            }
        });

        sleep(Duration::from_millis(35)).await;
        subscription.cancel();
        sleep(Duration::from_millis(5)).await;

        let after_cancel = calls.get();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.get(), after_cancel);

        drop(subscription);
    }
}
