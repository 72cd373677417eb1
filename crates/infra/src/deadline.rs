//! Per-operation deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ServiceError;

/// When an operation must give up. `Deadline::none()` never expires.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Drive `fut` to completion or until the deadline.
    ///
    /// On expiry `fut` is dropped before returning, together with any open
    /// store transaction it owns, which rolls that transaction back. If expiry
    /// lands while the commit itself is in flight, the outcome is
    /// indeterminate: the server may still have committed even though the
    /// caller sees `DeadlineExceeded`.
    pub async fn run<T, F>(self, operation: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        match self.0 {
            None => fut.await,
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .unwrap_or(Err(ServiceError::DeadlineExceeded { operation })),
        }
    }
}
