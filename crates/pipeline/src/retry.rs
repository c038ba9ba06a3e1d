use anyhow::{Result, anyhow};
use async_trait::async_trait;
use extract::{GraphDocument, GraphTransformer, LlmError, Node, Relationship};
use index::{GraphStats, GraphStore, PersistOptions};
use ingest::Document;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_retries: usize,
        initial_backoff_ms: u64,
        max_backoff_ms: u64,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
            attempt_timeout,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Retry a future with exponential backoff; each attempt is bounded by
    /// the attempt timeout and an elapsed attempt counts as a failure.
    /// Errors that another attempt cannot fix are returned immediately.
    pub async fn retry<F, Fut, T>(&self, operation_name: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let outcome = match timeout(self.attempt_timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!(
                    "{} timed out after {:?}",
                    operation_name,
                    self.attempt_timeout
                )),
            };

            match outcome {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    if is_permanent(&e) {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed with a permanent error"
                        );
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

/// Rejected credentials and exhausted JSON corrections do not improve on retry.
fn is_permanent(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<LlmError>(),
            Some(LlmError::Authentication | LlmError::InvalidJson { .. })
        )
    })
}

/// Wraps an extraction capability or a graph store so that every external
/// call goes through a [`RetryPolicy`].
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: GraphTransformer> GraphTransformer for Retrying<T> {
    async fn convert(&self, document: &Document) -> Result<GraphDocument> {
        self.policy
            .retry("extract", || self.inner.convert(document))
            .await
    }
}

#[async_trait]
impl<S: GraphStore> GraphStore for Retrying<S> {
    async fn init_schema(&self, options: &PersistOptions) -> Result<()> {
        self.policy
            .retry("init_schema", || self.inner.init_schema(options))
            .await
    }

    async fn merge_node(&self, node: &Node, options: &PersistOptions) -> Result<()> {
        self.policy
            .retry("merge_node", || self.inner.merge_node(node, options))
            .await
    }

    async fn merge_relationship(
        &self,
        relationship: &Relationship,
        options: &PersistOptions,
    ) -> Result<()> {
        self.policy
            .retry("merge_relationship", || self.inner.merge_relationship(relationship, options))
            .await
    }

    async fn merge_source_document(
        &self,
        document_id: &str,
        source: &Document,
        nodes: &[Node],
        options: &PersistOptions,
    ) -> Result<()> {
        self.policy
            .retry("merge_source_document", || {
                self.inner.merge_source_document(document_id, source, nodes, options)
            })
            .await
    }

    async fn stats(&self) -> Result<GraphStats> {
        self.policy.retry("stats", || self.inner.stats()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(max_retries, 1, 2, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result = fast_policy(3)
            .retry("flaky", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("transient");
                }
                Ok(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: Result<()> = fast_policy(2)
            .retry("broken", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("permanent")
            })
            .await;

        assert!(result.unwrap_err().to_string().contains("permanent"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let policy = RetryPolicy::new(1, 1, 1, Duration::from_millis(10));
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: Result<()> = policy
            .retry("slow", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_authentication_error_is_not_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: Result<()> = fast_policy(3)
            .retry("extract", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::Error::from(LlmError::Authentication).context("Failed to extract graph"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: Result<()> = fast_policy(2)
            .retry("extract", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::RateLimit.into())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    struct SlowTransformer {
        calls: AtomicUsize,
        requests: u32,
        request_time: Duration,
        rejected: bool,
    }

    #[async_trait]
    impl GraphTransformer for SlowTransformer {
        async fn convert(&self, document: &Document) -> Result<GraphDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.rejected {
                return Err(LlmError::Authentication.into());
            }
            for _ in 0..self.requests {
                sleep(self.request_time).await;
            }
            Ok(GraphDocument::new(Vec::new(), Vec::new(), document.clone()))
        }
    }

    #[tokio::test]
    async fn test_extraction_budget_covers_json_corrections() {
        let request_time = Duration::from_millis(30);
        let transformer = SlowTransformer {
            calls: AtomicUsize::new(0),
            requests: 2,
            request_time,
            rejected: false,
        };
        // Two 30ms requests exceed a 50ms per-request limit but fit the scaled budget.
        let policy = RetryPolicy::new(1, 1, 1, Duration::from_millis(50))
            .with_attempt_timeout(Duration::from_millis(50) * 5);
        let retrying = Retrying::new(transformer, policy);

        let document = Document::from_file("a.txt", "Alice.".to_string());
        retrying.convert(&document).await.unwrap();

        assert_eq!(retrying.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retrying_transformer_fails_fast_on_authentication() {
        let transformer = SlowTransformer {
            calls: AtomicUsize::new(0),
            requests: 0,
            request_time: Duration::ZERO,
            rejected: true,
        };
        let retrying = Retrying::new(transformer, fast_policy(3));

        let document = Document::from_file("a.txt", "Alice.".to_string());
        let error = retrying.convert(&document).await.unwrap_err();

        assert!(matches!(error.downcast_ref::<LlmError>(), Some(LlmError::Authentication)));
        assert_eq!(retrying.inner().calls.load(Ordering::SeqCst), 1);
    }
}
