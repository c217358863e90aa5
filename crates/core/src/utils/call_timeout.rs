use std::future::Future;
use std::time::Duration;

use crate::errors::{Error, Result};

/// Runs `call` with an upper bound on its duration.
///
/// An elapsed budget becomes `Error::Timeout` naming `operation`; the
/// abandoned future is dropped.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!(
            "{} did not complete within {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}
