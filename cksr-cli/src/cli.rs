use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cksr - ClickHouse 到 StarRocks 迁移桥接工具
#[derive(Parser, Debug)]
#[command(name = "cksr")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml", env = "CKSR_CONFIG")]
    pub config: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 创建 Catalog、为源表加影子列、目标表改名并创建联合视图
    Init,
    /// 使用指定的分区值更新单个视图的边界
    Update {
        /// 数据库对名称
        #[arg(long)]
        pair: String,
        /// 视图名（即源表名）
        #[arg(long)]
        view: String,
        /// 边界值，格式取决于边界列类型：datetime 为 YYYY-MM-DD HH:MM:SS，date 为 YYYY-MM-DD，bigint 为整数
        #[arg(long)]
        value: String,
    },
    /// 按目标表当前最小值刷新所有视图的边界
    Refresh,
    /// 回退：删除视图、去除表名后缀、删除影子列、删除 Catalog
    Rollback {
        /// 只输出回退计划，不执行任何语句
        #[arg(long)]
        dry_run: bool,
    },
    /// 离线解析 DDL，输出字段转换与生成的 SQL
    Inspect {
        /// ClickHouse 的 SHOW CREATE TABLE 输出
        #[arg(long)]
        ddl_file: PathBuf,
        /// StarRocks 改名后表的 SHOW CREATE TABLE 输出，提供时同时生成视图 SQL
        #[arg(long)]
        target_ddl_file: Option<PathBuf>,
        /// 视图中引用的 Catalog 名
        #[arg(long, default_value = "clickhouse_catalog")]
        catalog: String,
    },
    /// 生成带注释的配置文件模板
    NewConfig {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 显示版本信息
    Version,
}

impl Commands {
    /// 不需要加载配置即可执行的命令
    pub fn is_standalone(&self) -> bool {
        matches!(
            self,
            Commands::Inspect { .. } | Commands::NewConfig { .. } | Commands::Version
        )
    }
}
