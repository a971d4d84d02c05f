use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CksrError>;

#[derive(Error, Debug)]
pub enum CksrError {
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("配置文件未找到: {0}")]
    ConfigNotFound(String),

    #[error("配置校验失败: {0}")]
    ConfigInvalid(String),

    #[error("DDL 解析失败: {0}")]
    Parse(String),

    #[error("DDL 解析超时 (超过 {0:?})")]
    ParseTimeout(Duration),

    #[error("字段 {field} 类型不支持: not support type {type_name}")]
    UnsupportedType { field: String, type_name: String },

    #[error("视图字段映射不一致: {0}")]
    Mapping(MappingMismatch),

    #[error("回退预检失败: {0}")]
    Precheck(String),

    #[error("边界值错误: {0}")]
    Boundary(String),

    #[error("SQL 执行失败 (共尝试 {attempts} 次): {sql}: {source}")]
    Execution {
        sql: String,
        attempts: u32,
        #[source]
        source: Box<CksrError>,
    },

    #[error("ClickHouse 返回错误 (HTTP {status}): {body}")]
    ClickHouse { status: u16, body: String },

    #[error("StarRocks 数据库错误: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("锁错误: {0}")]
    Lock(String),

    #[error("自定义错误: {0}")]
    Custom(String),
}

/// 视图两侧字段集合的差异
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingMismatch {
    /// 源端投影中存在、目标表未声明的字段
    pub extra_in_origin: Vec<String>,
    /// 目标表声明、源端投影中缺失的字段
    pub missing_in_origin: Vec<String>,
}

impl MappingMismatch {
    pub fn is_empty(&self) -> bool {
        self.extra_in_origin.is_empty() && self.missing_in_origin.is_empty()
    }
}

impl fmt::Display for MappingMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "源端多出字段 [{}]，源端缺失字段 [{}]",
            self.extra_in_origin.join(", "),
            self.missing_in_origin.join(", ")
        )
    }
}

impl CksrError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn precheck(msg: impl Into<String>) -> Self {
        Self::Precheck(msg.into())
    }

    pub fn boundary(msg: impl Into<String>) -> Self {
        Self::Boundary(msg.into())
    }

    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }

    /// 配置类错误在入口处映射为退出码 2
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ConfigNotFound(_) | Self::ConfigInvalid(_))
    }
}
