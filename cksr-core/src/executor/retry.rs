use super::{Engine, Row, SqlExecutor};
use crate::config::RetryConfig;
use crate::error::{CksrError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// 固定次数、固定间隔的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.delay())
    }
}

/// 在执行器边界上对每条语句单独重试
///
/// 语句均以 `IF EXISTS`/`IF NOT EXISTS` 编写，部分成功后的重试不会产生重复操作。
pub struct RetryingExecutor<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: SqlExecutor> RetryingExecutor<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run_with_retry<T, F, Fut>(&self, sql: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.policy.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("{} 第 {} 次尝试成功", self.inner.engine(), attempt);
                    }
                    return Ok(result);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "{} 执行失败，{}ms 后重试 ({}/{}): {}",
                        self.inner.engine(),
                        self.policy.delay.as_millis(),
                        attempt,
                        self.policy.max_retries,
                        e
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => {
                    error!(
                        "{} 执行失败，已重试 {} 次: {}",
                        self.inner.engine(),
                        self.policy.max_retries,
                        e
                    );
                    return Err(CksrError::Execution {
                        sql: sql.to_string(),
                        attempts,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl<E: SqlExecutor> SqlExecutor for RetryingExecutor<E> {
    fn engine(&self) -> Engine {
        self.inner.engine()
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.run_with_retry(sql, || self.inner.query(sql)).await
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        self.run_with_retry(sql, || self.inner.exec(sql)).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
