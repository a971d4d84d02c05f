//! 正向迁移：建 Catalog、加影子列、改名、建视图
use crate::builder::{AddColumnBuilder, ViewBuilder, ViewSqlKind, create_catalog_sql, rename_table_sql};
use crate::config::AppConfig;
use crate::convert::{FieldConverter, new_converters};
use crate::ddl::{TableDefinition, parse_table_with_timeout};
use crate::error::{CksrError, Result};
use crate::executor::PairConnections;
use crate::schema::{OriginSchema, TableKind, TargetSchema};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, error, info, warn};

/// 单表的初始化动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitAction {
    /// 加影子列、改名、建视图
    FullMigration,
    /// 目标表已改名，补建视图
    ViewOnly,
}

impl fmt::Display for InitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitAction::FullMigration => f.write_str("重命名并创建视图"),
            InitAction::ViewOnly => f.write_str("仅创建视图"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInitPlan {
    pub base_table: String,
    pub suffixed_table: String,
    pub action: InitAction,
}

/// 根据两端现状生成初始化计划
///
/// 目标端基表名为普通表时完整迁移；基表名不存在或不是视图、带后缀表已存在时只补建视图；
/// 基表名已是视图说明迁移完成，跳过。
pub fn plan_init(
    origin_tables: &BTreeMap<String, TableKind>,
    target_tables: &BTreeMap<String, TableKind>,
    suffix: &str,
    ignored: &[String],
) -> Vec<TableInitPlan> {
    let mut plans = Vec::new();
    for (table, kind) in origin_tables {
        if ignored.iter().any(|t| t == table) {
            info!("忽略表: {} (在配置的忽略列表中)", table);
            continue;
        }
        if *kind != TableKind::BaseTable {
            debug!("源表 {} 不是普通表，跳过", table);
            continue;
        }

        let suffixed_table = format!("{table}{suffix}");
        let base = target_tables.get(table).copied();
        let suffixed = target_tables.get(&suffixed_table).copied();

        let action = match (base, suffixed) {
            (Some(TableKind::View), _) => {
                debug!("基础名 {} 在目标端已是视图，跳过", table);
                continue;
            }
            (Some(TableKind::BaseTable), _) => InitAction::FullMigration,
            (_, Some(TableKind::BaseTable)) => {
                info!("发现已重命名但未创建视图的表: {} -> {}", table, suffixed_table);
                InitAction::ViewOnly
            }
            _ => {
                warn!("表 {} 在目标端没有对应的表，跳过", table);
                continue;
            }
        };
        plans.push(TableInitPlan {
            base_table: table.clone(),
            suffixed_table,
            action,
        });
    }
    plans
}

/// 读取并解析源表，生成字段转换器
pub async fn load_origin(
    conn: &PairConnections,
    config: &AppConfig,
    table: &str,
) -> Result<(TableDefinition, Vec<FieldConverter>)> {
    let database = &conn.pair.clickhouse.database;
    let ddl = OriginSchema::new(conn.origin(), database)
        .show_create_table(table)
        .await?;
    let mut definition = parse_table_with_timeout(ddl, config.parser.timeout()).await?;
    if definition.db_name.is_empty() {
        definition.db_name = database.clone();
    }
    let converters = new_converters(&definition)?;
    Ok((definition, converters))
}

/// 读取并解析目标端表
pub async fn load_target(
    conn: &PairConnections,
    config: &AppConfig,
    table: &str,
) -> Result<TableDefinition> {
    let database = &conn.pair.starrocks.database;
    let ddl = TargetSchema::new(conn.target(), database)
        .show_create_table(table)
        .await?;
    let mut definition = parse_table_with_timeout(ddl, config.parser.timeout()).await?;
    definition.db_name = database.clone();
    definition.name = table.to_string();
    Ok(definition)
}

/// 单表失败
#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub error: CksrError,
}

/// 单个数据库对的初始化统计
#[derive(Debug, Default)]
pub struct MigrationStats {
    pub pair: String,
    pub catalog_created: bool,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<TableFailure>,
}

impl MigrationStats {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn log_summary(&self) {
        info!(
            "数据库对 {} 初始化完成: 总表 {}, 成功 {}, 失败 {}",
            self.pair,
            self.total,
            self.succeeded,
            self.failures.len()
        );
        for (i, failure) in self.failures.iter().enumerate() {
            error!("[{}] 表: {}, 错误: {}", i + 1, failure.table, failure.error);
        }
    }
}

pub struct Migrator<'a> {
    config: &'a AppConfig,
}

impl<'a> Migrator<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Catalog 不存在时创建，返回是否执行了创建
    pub async fn ensure_catalog(&self, conn: &PairConnections) -> Result<bool> {
        let pair = &conn.pair;
        let schema = TargetSchema::new(conn.target(), &pair.starrocks.database);
        if schema.catalog_exists(&pair.catalog_name).await? {
            debug!("Catalog {} 已存在", pair.catalog_name);
            return Ok(false);
        }
        conn.target().exec(&create_catalog_sql(pair)).await?;
        info!("已创建 Catalog: {}", pair.catalog_name);
        Ok(true)
    }

    pub async fn plan_pair(&self, conn: &PairConnections) -> Result<Vec<TableInitPlan>> {
        let pair = &conn.pair;
        let origin_tables = OriginSchema::new(conn.origin(), &pair.clickhouse.database)
            .list_tables()
            .await?;
        let target_tables = TargetSchema::new(conn.target(), &pair.starrocks.database)
            .list_tables()
            .await?;
        Ok(plan_init(
            &origin_tables,
            &target_tables,
            &pair.sr_table_suffix,
            &self.config.ignore_tables,
        ))
    }

    pub async fn migrate_table(&self, conn: &PairConnections, plan: &TableInitPlan) -> Result<()> {
        let pair = &conn.pair;
        info!("计划：{} - 表: {}", plan.action, plan.base_table);

        let (origin, converters) = load_origin(conn, self.config, &plan.base_table).await?;

        // 影子列在视图之前必须就绪，已存在的列不会重复生成
        let add_columns = AddColumnBuilder::new(&origin, &converters)
            .on_cluster(pair.clickhouse.cluster.as_deref())
            .build();
        if let Some(sql) = add_columns {
            conn.origin().exec(&sql).await?;
            info!("已为源表 {} 添加影子列", origin.qualified_name());
        }

        if plan.action == InitAction::FullMigration {
            let sql = rename_table_sql(
                &pair.starrocks.database,
                &plan.base_table,
                &plan.suffixed_table,
            );
            conn.target().exec(&sql).await?;
            info!("已重命名: {} -> {}", plan.base_table, plan.suffixed_table);
        }

        let target = load_target(conn, self.config, &plan.suffixed_table).await?;
        let view_sql = ViewBuilder::new(
            &converters,
            &target,
            &pair.catalog_name,
            &pair.clickhouse.database,
            &plan.base_table,
            &pair.starrocks.database,
            &plan.base_table,
        )
        .build(
            ViewSqlKind::Create,
            conn.target(),
            &self.config.timestamp_column_for(&plan.base_table),
        )
        .await?;
        conn.target().exec(&view_sql).await?;
        info!("已创建视图: {}.{}", pair.starrocks.database, plan.base_table);
        Ok(())
    }

    /// 初始化一个数据库对，单表失败记录后继续下一张表
    pub async fn migrate_pair(&self, conn: &PairConnections) -> Result<MigrationStats> {
        let mut stats = MigrationStats {
            pair: conn.name().to_string(),
            ..MigrationStats::default()
        };
        stats.catalog_created = self.ensure_catalog(conn).await?;

        let plans = self.plan_pair(conn).await?;
        stats.total = plans.len();
        info!("数据库对 {} 找到 {} 个待处理的表", conn.name(), plans.len());

        for (index, plan) in plans.iter().enumerate() {
            info!("[{}/{}] 处理表: {}", index + 1, plans.len(), plan.base_table);
            match self.migrate_table(conn, plan).await {
                Ok(()) => stats.succeeded += 1,
                Err(e) => {
                    error!("表 {} 处理失败: {}", plan.base_table, e);
                    stats.failures.push(TableFailure {
                        table: plan.base_table.clone(),
                        error: e,
                    });
                }
            }
        }
        stats.log_summary();
        Ok(stats)
    }

    pub async fn run(&self, connections: &[PairConnections]) -> Result<Vec<MigrationStats>> {
        let mut all = Vec::with_capacity(connections.len());
        for conn in connections {
            info!("开始处理数据库对 {}", conn.name());
            all.push(self.migrate_pair(conn).await?);
        }
        info!("所有数据库对处理完成 (init)");
        Ok(all)
    }
}
