/// 项目信息模块
///
/// 元数据统一从 cksr-cli 的 Cargo.toml 同步

pub mod metadata {
    pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    pub const PROJECT_LICENSE: &str = env!("CARGO_PKG_LICENSE");

    pub mod display {
        pub const CLI_FULL_NAME: &str = "cksr CLI";

        pub const DESCRIPTION_LONG: &str = "ClickHouse 到 StarRocks 的迁移桥接工具：为源表添加影子列，把 StarRocks 表改名后以联合视图同时读取两端数据，并支持边界刷新与完整回退";
    }
}

pub mod version_info {
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// `cksr CLI v0.1.0`
pub fn get_version_string() -> String {
    format!(
        "{} v{}",
        metadata::display::CLI_FULL_NAME,
        version_info::CLI_VERSION
    )
}

pub fn get_full_version_string() -> String {
    format!(
        "{}\n{}\n© {} - Licensed under {}",
        get_version_string(),
        metadata::PROJECT_DESCRIPTION,
        metadata::PROJECT_AUTHORS,
        metadata::PROJECT_LICENSE
    )
}
