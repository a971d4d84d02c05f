use super::{Engine, Row, SqlExecutor};
use crate::config::ClickHouseConfig;
use crate::error::{CksrError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// 通过 HTTP 接口访问 ClickHouse
pub struct ClickHouseExecutor {
    client: Client,
    url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct JsonCompact {
    data: Vec<Vec<Value>>,
}

impl ClickHouseExecutor {
    pub fn new(config: &ClickHouseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.query_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!(
                "http://{}:{}/?database={}",
                config.host, config.http_port, config.database
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn post(&self, body: String) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header("X-ClickHouse-User", &self.username)
            .header("X-ClickHouse-Key", &self.password)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CksrError::ClickHouse {
                status: status.as_u16(),
                body: text.trim().to_string(),
            });
        }
        Ok(text)
    }
}

/// 解析 `FORMAT JSONCompact` 输出
fn decode_json_compact(body: &str) -> Result<Vec<Row>> {
    let parsed: JsonCompact = serde_json::from_str(body)?;
    Ok(parsed
        .data
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|value| match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .collect())
}

#[async_trait]
impl SqlExecutor for ClickHouseExecutor {
    fn engine(&self) -> Engine {
        Engine::ClickHouse
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let statement = format!("{} FORMAT JSONCompact", sql.trim().trim_end_matches(';'));
        debug!("ClickHouse 查询: {}", statement);
        let body = self.post(statement).await?;
        decode_json_compact(&body)
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        debug!("ClickHouse 执行: {}", sql);
        self.post(sql.trim().trim_end_matches(';').to_string()).await?;
        Ok(())
    }
}
