// src/tasks/housekeeping.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::rate_limit::RateLimiter;
use crate::auth::TokenDenylist;

/// Runs `sweep` every `period` until `shutdown_rx` flips to true.
pub fn spawn_sweeper<F>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    sweep: F,
) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = sweep();
                    if removed > 0 {
                        debug!("{} sweep removed {} entries", name, removed);
                    }
                },
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                },
            }
        }
        info!("{} sweeper stopped", name);
    })
}

pub fn spawn_denylist_sweep(
    denylist: Arc<TokenDenylist>,
    period: Duration,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_sweeper("token denylist", period, shutdown_rx, move || {
        denylist.purge_expired(Utc::now().timestamp())
    })
}

pub fn spawn_rate_limit_sweep(
    limiter: Arc<RateLimiter>,
    period: Duration,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_sweeper("rate limit", period, shutdown_rx, move || limiter.purge_expired())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn sweeper_runs_until_shutdown() {
        let (tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let handle = spawn_sweeper("test", Duration::from_millis(10), rx, move || {
            seen.fetch_add(1, Ordering::SeqCst);
            0
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
