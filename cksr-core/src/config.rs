use crate::constants::{boundary, catalog, config};
use crate::error::{CksrError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub database_pairs: Vec<DatabasePair>,
    /// 不参与迁移与回退的表名
    #[serde(default)]
    pub ignore_tables: Vec<String>,
    /// 按表配置的视图边界列
    #[serde(default)]
    pub timestamp_columns: BTreeMap<String, TimestampColumn>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub rollback: RollbackConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// 一组 ClickHouse -> StarRocks 数据库对
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabasePair {
    pub name: String,
    /// StarRocks 中指向 ClickHouse 的外部 Catalog 名
    pub catalog_name: String,
    /// StarRocks 基表改名时追加的后缀
    pub sr_table_suffix: String,
    /// JDBC 驱动下载地址，创建 Catalog 时使用
    #[serde(default)]
    pub driver_url: String,
    pub clickhouse: ClickHouseConfig,
    pub starrocks: StarRocksConfig,
}

/// 只使用 HTTP 接口，未知字段（如 `port`）直接报错
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ClickHouseConfig {
    pub host: String,
    #[serde(default = "default_clickhouse_http_port")]
    pub http_port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    /// 设置后 DDL 追加 `on cluster '<cluster>'`
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default = "default_clickhouse_query_timeout")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_jdbc_socket_timeout")]
    pub jdbc_socket_timeout_ms: u64,
    #[serde(default = "default_jdbc_connection_timeout")]
    pub jdbc_connection_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StarRocksConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_starrocks_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 边界列配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TimestampColumn {
    pub column: String,
    #[serde(rename = "type", default)]
    pub column_type: BoundaryType,
}

impl Default for TimestampColumn {
    fn default() -> Self {
        Self {
            column: boundary::DEFAULT_COLUMN.to_string(),
            column_type: BoundaryType::Bigint,
        }
    }
}

/// 边界列支持的数据类型
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    Date,
    Datetime,
    #[default]
    Bigint,
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryType::Date => "date",
            BoundaryType::Datetime => "datetime",
            BoundaryType::Bigint => "bigint",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: config::DEFAULT_MAX_RETRIES,
            delay_ms: config::DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// 回退出错时的处理策略
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStrategy {
    #[default]
    StopOnError,
    ContinueOnError,
}

impl fmt::Display for RollbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackStrategy::StopOnError => f.write_str("stop_on_error"),
            RollbackStrategy::ContinueOnError => f.write_str("continue_on_error"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RollbackConfig {
    #[serde(default)]
    pub strategy: RollbackStrategy,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_parse_timeout")]
    pub ddl_parse_timeout_seconds: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            ddl_parse_timeout_seconds: config::DEFAULT_PARSE_TIMEOUT_SECS,
        }
    }
}

impl ParserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ddl_parse_timeout_seconds)
    }
}

/// 多实例互斥锁配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockConfig {
    /// 关闭时只使用进程内锁（调试模式）
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
    #[serde(default = "default_lock_identity")]
    pub identity: String,
    #[serde(default = "default_lock_duration")]
    pub lock_duration_seconds: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lock_file: config::DEFAULT_LOCK_FILE.to_string(),
            identity: config::DEFAULT_LOCK_IDENTITY.to_string(),
            lock_duration_seconds: config::DEFAULT_LOCK_DURATION_SECS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default)]
    pub enable_file_log: bool,
    #[serde(default = "default_log_file")]
    pub log_file_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enable_file_log: false,
            log_file_path: config::DEFAULT_LOG_FILE.to_string(),
            log_level: config::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_clickhouse_http_port() -> u16 {
    config::DEFAULT_CLICKHOUSE_HTTP_PORT
}
fn default_clickhouse_query_timeout() -> u64 {
    config::DEFAULT_CLICKHOUSE_QUERY_TIMEOUT_SECS
}
fn default_jdbc_socket_timeout() -> u64 {
    catalog::DEFAULT_JDBC_SOCKET_TIMEOUT_MS
}
fn default_jdbc_connection_timeout() -> u64 {
    catalog::DEFAULT_JDBC_CONNECTION_TIMEOUT_MS
}
fn default_starrocks_connect_timeout() -> u64 {
    config::DEFAULT_STARROCKS_CONNECT_TIMEOUT_SECS
}
fn default_max_retries() -> u32 {
    config::DEFAULT_MAX_RETRIES
}
fn default_retry_delay_ms() -> u64 {
    config::DEFAULT_RETRY_DELAY_MS
}
fn default_parse_timeout() -> u64 {
    config::DEFAULT_PARSE_TIMEOUT_SECS
}
fn default_lock_file() -> String {
    config::DEFAULT_LOCK_FILE.to_string()
}
fn default_lock_identity() -> String {
    config::DEFAULT_LOCK_IDENTITY.to_string()
}
fn default_lock_duration() -> u64 {
    config::DEFAULT_LOCK_DURATION_SECS
}
fn default_log_file() -> String {
    config::DEFAULT_LOG_FILE.to_string()
}
fn default_log_level() -> String {
    config::DEFAULT_LOG_LEVEL.to_string()
}

const TEMPLATE: &str = include_str!("../templates/config.toml.template");

impl AppConfig {
    /// 从指定文件加载配置并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CksrError::ConfigNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 带注释的配置模板
    pub fn template() -> &'static str {
        TEMPLATE
    }

    /// 写出配置模板，已存在且未指定 force 时返回 false
    pub fn write_template<P: AsRef<Path>>(path: P, force: bool) -> Result<bool> {
        let path = path.as_ref();
        if path.exists() && !force {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, TEMPLATE)?;
        Ok(true)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_pairs.is_empty() {
            return Err(CksrError::config_invalid("至少需要配置一个数据库对 (database_pairs)"));
        }

        let mut names = HashSet::new();
        for (index, pair) in self.database_pairs.iter().enumerate() {
            pair.validate(index)?;
            if !names.insert(pair.name.as_str()) {
                return Err(CksrError::config_invalid(format!(
                    "数据库对名称重复: {}",
                    pair.name
                )));
            }
        }

        if self.retry.delay_ms > config::MAX_RETRY_DELAY_MS {
            return Err(CksrError::config_invalid(format!(
                "retry.delay_ms 不能超过 {}",
                config::MAX_RETRY_DELAY_MS
            )));
        }
        if self.parser.ddl_parse_timeout_seconds == 0 {
            return Err(CksrError::config_invalid(
                "parser.ddl_parse_timeout_seconds 必须大于 0",
            ));
        }
        if self.lock.enabled && self.lock.lock_file.trim().is_empty() {
            return Err(CksrError::config_invalid("lock.lock_file 不能为空"));
        }
        for (table, column) in &self.timestamp_columns {
            if column.column.trim().is_empty() {
                return Err(CksrError::config_invalid(format!(
                    "表 {table} 的边界列名不能为空"
                )));
            }
        }
        Ok(())
    }

    pub fn pair_by_name(&self, name: &str) -> Option<&DatabasePair> {
        self.database_pairs.iter().find(|pair| pair.name == name)
    }

    pub fn is_ignored(&self, table: &str) -> bool {
        self.ignore_tables.iter().any(|t| t == table)
    }

    /// 查找表的边界列：先按表名精确匹配，再去掉各数据库对的后缀匹配，最后使用默认值
    pub fn timestamp_column_for(&self, table: &str) -> TimestampColumn {
        if let Some(column) = self.timestamp_columns.get(table) {
            return column.clone();
        }
        for pair in &self.database_pairs {
            if pair.sr_table_suffix.is_empty() {
                continue;
            }
            if let Some(base) = table.strip_suffix(pair.sr_table_suffix.as_str()) {
                if let Some(column) = self.timestamp_columns.get(base) {
                    return column.clone();
                }
            }
        }
        TimestampColumn::default()
    }
}

impl DatabasePair {
    fn validate(&self, index: usize) -> Result<()> {
        let label = if self.name.is_empty() {
            format!("#{}", index + 1)
        } else {
            self.name.clone()
        };
        let required = [
            ("name", self.name.as_str()),
            ("catalog_name", self.catalog_name.as_str()),
            ("sr_table_suffix", self.sr_table_suffix.as_str()),
            ("clickhouse.host", self.clickhouse.host.as_str()),
            ("clickhouse.database", self.clickhouse.database.as_str()),
            ("starrocks.host", self.starrocks.host.as_str()),
            ("starrocks.database", self.starrocks.database.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CksrError::config_invalid(format!(
                    "数据库对 {label} 缺少必填项 {field}"
                )));
            }
        }
        if self.clickhouse.http_port == 0 || self.starrocks.port == 0 {
            return Err(CksrError::config_invalid(format!(
                "数据库对 {label} 的端口必须大于 0"
            )));
        }
        Ok(())
    }

    /// StarRocks 外部 Catalog 使用的 ClickHouse JDBC 连接串
    pub fn clickhouse_jdbc_uri(&self) -> String {
        let ck = &self.clickhouse;
        format!(
            "jdbc:clickhouse://{}:{}/?database={}&autoCommit=true&socket_timeout={}&connection_timeout={}&compress=true&allow_jdbctemplate_transactions=0",
            ck.host, ck.http_port, ck.database, ck.jdbc_socket_timeout_ms, ck.jdbc_connection_timeout_ms
        )
    }

    /// ClickHouse HTTP 接口地址
    pub fn clickhouse_http_url(&self) -> String {
        format!("http://{}:{}/", self.clickhouse.host, self.clickhouse.http_port)
    }
}
