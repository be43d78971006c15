use crate::error::ProviderError;
use std::future::Future;
use std::time::Duration;

/// Runs one provider call under `limit`.
///
/// An elapsed timer becomes `ProviderError::Timeout` naming `call`, so the
/// caller handles it exactly like any other provider failure.
pub async fn within<T, F>(call: &'static str, limit: Duration, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(call, timeout_s = limit.as_secs(), "provider call timed out");
            Err(ProviderError::Timeout { call, secs: limit.as_secs() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ProviderError>(42)
        };
        let res = within("image search", Duration::from_secs(10), slow).await;
        assert_eq!(res, Err(ProviderError::Timeout { call: "image search", secs: 10 }));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let res = within("registry lookup", Duration::from_secs(1), async { Ok::<_, ProviderError>("x") }).await;
        assert_eq!(res, Ok("x"));

        let err = within::<(), _>("registry lookup", Duration::from_secs(1), async {
            Err(ProviderError::Http("refused".into()))
        }).await;
        assert_eq!(err, Err(ProviderError::Http("refused".into())));
    }
}
