//! Confirmation polling shared by the chain adapters

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use unipredict_core::TradingResult;

/// Default delay between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll `check` until it reports a settled status or `timeout` elapses
///
/// `check` returns `Ok(None)` while the transaction is pending and
/// `Ok(Some(success))` once it settled. Check errors are logged and the
/// watch keeps polling. Elapsed timeout yields `false`. The watch is an
/// ordinary future, so dropping it stops polling.
pub async fn poll_until_settled<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TradingResult<Option<bool>>>,
{
    let watch = async {
        loop {
            match check().await {
                Ok(Some(success)) => return success,
                Ok(None) => {}
                Err(e) => warn!("Confirmation check failed: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    };

    match tokio::time::timeout(timeout, watch).await {
        Ok(settled) => settled,
        Err(_) => {
            debug!("Confirmation watch timed out after {:?}", timeout);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use unipredict_core::TradingError;

    #[tokio::test]
    async fn test_zero_timeout_returns_false_promptly() {
        let start = Instant::now();
        let confirmed = poll_until_settled(Duration::ZERO, Duration::from_secs(1), || async {
            Ok::<Option<bool>, TradingError>(None)
        })
        .await;
        assert!(!confirmed);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_settles_after_pending_checks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let confirmed = poll_until_settled(Duration::from_secs(5), Duration::from_millis(5), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, TradingError>(if n >= 2 { Some(true) } else { None }) }
        })
        .await;
        assert!(confirmed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_transaction_reports_false() {
        let confirmed = poll_until_settled(Duration::from_secs(5), Duration::from_millis(5), || async {
            Ok::<_, TradingError>(Some(false))
        })
        .await;
        assert!(!confirmed);
    }

    #[tokio::test]
    async fn test_check_errors_keep_polling_until_timeout() {
        let confirmed = poll_until_settled(Duration::from_millis(50), Duration::from_millis(5), || async {
            Err::<Option<bool>, _>(TradingError::connection("rpc down"))
        })
        .await;
        assert!(!confirmed);
    }

    #[tokio::test]
    async fn test_dropped_wait_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let waiter = tokio::spawn(poll_until_settled(
            Duration::from_secs(10),
            Duration::from_millis(5),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<Option<bool>, TradingError>(None) }
            },
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        let after_abort = calls.load(Ordering::SeqCst);
        assert!(after_abort > 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_abort);
    }
}
