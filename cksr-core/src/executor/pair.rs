use super::{
    ClickHouseExecutor, RetryPolicy, RetryingExecutor, SqlExecutor, StarRocksExecutor,
};
use crate::config::{AppConfig, DatabasePair, RetryConfig};
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// 一个数据库对的两端连接
pub struct PairConnections {
    pub pair: DatabasePair,
    origin: Arc<dyn SqlExecutor>,
    target: Arc<dyn SqlExecutor>,
}

impl PairConnections {
    pub fn open(pair: &DatabasePair, retry: &RetryConfig) -> Result<Self> {
        let policy = RetryPolicy::from(retry);
        let origin = RetryingExecutor::new(ClickHouseExecutor::new(&pair.clickhouse)?, policy);
        let target = RetryingExecutor::new(StarRocksExecutor::new(&pair.starrocks), policy);
        info!(
            "已建立数据库对 {} 的连接: ClickHouse {} / StarRocks {}:{}",
            pair.name,
            pair.clickhouse_http_url(),
            pair.starrocks.host,
            pair.starrocks.port
        );
        Ok(Self::with_executors(pair.clone(), Arc::new(origin), Arc::new(target)))
    }

    /// 使用已有的执行器，测试中传入内存实现
    pub fn with_executors(
        pair: DatabasePair,
        origin: Arc<dyn SqlExecutor>,
        target: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            pair,
            origin,
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.pair.name
    }

    pub fn origin(&self) -> &dyn SqlExecutor {
        self.origin.as_ref()
    }

    pub fn target(&self) -> &dyn SqlExecutor {
        self.target.as_ref()
    }

    pub async fn close(&self) -> Result<()> {
        self.origin.close().await?;
        self.target.close().await
    }
}

/// 所有数据库对的连接，由入口持有并在结束时统一关闭
pub struct ConnectionSet {
    pairs: Vec<PairConnections>,
}

impl ConnectionSet {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let pairs = config
            .database_pairs
            .iter()
            .map(|pair| PairConnections::open(pair, &config.retry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pairs })
    }

    /// 只打开指定名称的数据库对
    pub fn open_one(config: &AppConfig, pair: &DatabasePair) -> Result<Self> {
        Ok(Self {
            pairs: vec![PairConnections::open(pair, &config.retry)?],
        })
    }

    pub fn from_pairs(pairs: Vec<PairConnections>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[PairConnections] {
        &self.pairs
    }

    /// 关闭全部连接，单个失败只记录日志
    pub async fn close_all(&self) {
        for pair in &self.pairs {
            if let Err(e) = pair.close().await {
                warn!("关闭数据库对 {} 的连接失败: {}", pair.name(), e);
            }
        }
    }
}
