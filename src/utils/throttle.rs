use crate::api::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleeps for `delay` unless cancelled first. A zero delay only checks the
/// token, so throttling can be switched off without losing cancellation.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), ApiError> {
    if cancel.is_cancelled() {
        return Err(ApiError::Cancelled);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Runs `fut` to completion unless cancelled first; the future is dropped
/// on cancellation.
pub async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if cancel.is_cancelled() {
        return Err(ApiError::Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pause_waits_full_delay() {
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();
        pause(Duration::from_millis(300), &cancel).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_pause_observes_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res = pause(Duration::ZERO, &cancel).await;
        assert!(matches!(res, Err(ApiError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_drops_future_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let res: Result<(), ApiError> = guarded(&cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(ApiError::Cancelled)));
    }
}
