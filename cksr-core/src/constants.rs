/// 影子列命名与表达式相关常量
pub mod shim {
    /// 影子列名后缀，`<name>_TmpSrConverter`
    pub const SUFFIX: &str = "_TmpSrConverter";

    /// 数组元素拼接分隔符，建列与建视图共用，不能与真实数据冲突
    pub const SEPARATOR: &str = "CKTOSRFRAGEMENT";

    /// 目标端 IP 类字段的命名后缀，`<name>_int`
    pub const TARGET_INT_SUFFIX: &str = "_int";

    /// IPv6 转 UInt128 后减去的偏移量 (2^127)，使结果落入 LARGEINT 范围
    pub const IPV6_BIAS: &str = "170141183460469231731687303715884105728";

    /// 影子列类型：数组
    pub const ARRAY_SHIM_TYPE: &str = "String";

    /// 影子列类型：IPv4
    pub const IPV4_SHIM_TYPE: &str = "UInt32";

    /// 影子列类型：IPv6
    pub const IPV6_SHIM_TYPE: &str = "UInt128";
}

/// 视图边界相关常量
pub mod boundary {
    /// 未配置时的默认边界列
    pub const DEFAULT_COLUMN: &str = "recordTimestamp";

    /// 空目标表时各类型的最大值，保证全部流量走源端
    pub const MAX_DATE: &str = "9999-12-31";
    pub const MAX_DATETIME: &str = "9999-12-31 23:59:59";
    pub const MAX_BIGINT: i64 = 9_999_999_999_999;

    pub const DATE_FORMAT: &str = "%Y-%m-%d";
    pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

/// 外部 Catalog 相关常量
pub mod catalog {
    pub const JDBC_DRIVER_CLASS: &str = "com.clickhouse.jdbc.ClickHouseDriver";

    pub const DEFAULT_JDBC_SOCKET_TIMEOUT_MS: u64 = 300_000;
    pub const DEFAULT_JDBC_CONNECTION_TIMEOUT_MS: u64 = 30_000;
}

/// 配置默认值
pub mod config {
    use std::path::PathBuf;

    pub const CONFIG_FILE_NAME: &str = "config.toml";

    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;
    /// 单次重试间隔上限，避免误配置导致长时间挂起
    pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

    pub const DEFAULT_PARSE_TIMEOUT_SECS: u64 = 60;

    pub const DEFAULT_CLICKHOUSE_HTTP_PORT: u16 = 8123;
    pub const DEFAULT_CLICKHOUSE_QUERY_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_STARROCKS_CONNECT_TIMEOUT_SECS: u64 = 10;

    pub const DEFAULT_LOCK_FILE: &str = "cksr.lock";
    pub const DEFAULT_LOCK_IDENTITY: &str = "cksr-instance";
    pub const DEFAULT_LOCK_DURATION_SECS: u64 = 300;

    pub const DEFAULT_LOG_FILE: &str = "logs/cksr.log";
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    pub fn get_config_file_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }
}

/// 锁持有者角色
pub mod lock {
    pub const ROLE_UPDATER: &str = "updater";
    pub const ROLE_ROLLBACK: &str = "rollback";
}
