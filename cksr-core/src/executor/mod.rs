//! SQL 执行层：两种引擎的连接、统一的重试包装与连接生命周期管理
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

mod clickhouse;
mod pair;
mod retry;
mod starrocks;

#[cfg(test)]
pub(crate) mod testing;

pub use clickhouse::ClickHouseExecutor;
pub use pair::{ConnectionSet, PairConnections};
pub use retry::{RetryPolicy, RetryingExecutor};
pub use starrocks::StarRocksExecutor;

/// 查询结果行，NULL 为 None
pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    ClickHouse,
    StarRocks,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::ClickHouse => f.write_str("ClickHouse"),
            Engine::StarRocks => f.write_str("StarRocks"),
        }
    }
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    fn engine(&self) -> Engine;

    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    async fn exec(&self, sql: &str) -> Result<()>;

    /// 释放连接资源
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// 第一行第一列，没有数据或为 NULL 时返回 None
pub async fn query_scalar(executor: &dyn SqlExecutor, sql: &str) -> Result<Option<String>> {
    let rows = executor.query(sql).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .flatten())
}
