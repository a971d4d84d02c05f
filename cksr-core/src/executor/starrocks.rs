use super::{Engine, Row, SqlExecutor};
use crate::config::StarRocksConfig;
use crate::error::{CksrError, Result};
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, Value};
use std::time::Duration;
use tracing::debug;

/// 通过 MySQL 协议访问 StarRocks，内部使用连接池
pub struct StarRocksExecutor {
    pool: Pool,
    connect_timeout: Duration,
}

impl StarRocksExecutor {
    pub fn new(config: &StarRocksConfig) -> Self {
        let builder = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.username.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()))
            .prefer_socket(false);
        Self {
            pool: Pool::new(Opts::from(builder)),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    async fn conn(&self) -> Result<Conn> {
        match tokio::time::timeout(self.connect_timeout, self.pool.get_conn()).await {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(CksrError::custom(format!(
                "连接 StarRocks 超时 ({:?})",
                self.connect_timeout
            ))),
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, _micros) => Some(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
        )),
        Value::Time(negative, days, hours, minutes, seconds, _micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u32::from(*hours) + days * 24;
            Some(format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"))
        }
    }
}

#[async_trait]
impl SqlExecutor for StarRocksExecutor {
    fn engine(&self) -> Engine {
        Engine::StarRocks
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("StarRocks 查询: {}", sql);
        let mut conn = self.conn().await?;
        let rows: Vec<mysql_async::Row> = conn.query(sql).await?;
        Ok(rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.as_ref(i).and_then(value_to_string))
                    .collect()
            })
            .collect())
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        debug!("StarRocks 执行: {}", sql);
        let mut conn = self.conn().await?;
        conn.query_drop(sql).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.clone().disconnect().await?;
        Ok(())
    }
}
