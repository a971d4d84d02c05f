use super::plan::{RollbackSnapshot, RollbackStep, TableRollbackPlan};
use crate::builder::drop_catalog_sql;
use crate::config::{AppConfig, DatabasePair, RollbackStrategy};
use crate::error::{CksrError, Result};
use crate::executor::{Engine, PairConnections, SqlExecutor};
use crate::schema::{OriginSchema, TargetSchema};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{error, info, warn};

/// 单表某一步的失败
#[derive(Debug)]
pub struct FailureRecord {
    pub pair: String,
    pub table: String,
    pub step: RollbackStep,
    pub error: CksrError,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "库对: {}, 表: {}, 步骤: {}, 错误: {}",
            self.pair, self.table, self.step, self.error
        )
    }
}

/// 单个数据库对的回退统计
#[derive(Debug, Default)]
pub struct RollbackStats {
    pub pair: String,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<FailureRecord>,
    /// stop_on_error 下遇到失败后中止
    pub aborted: bool,
}

impl RollbackStats {
    fn log_summary(&self) {
        info!("回退统计 - 数据库对: {}", self.pair);
        info!(
            "总表: {}, 成功: {}, 失败: {}",
            self.total,
            self.succeeded,
            self.failures.len()
        );
        for (i, failure) in self.failures.iter().enumerate() {
            error!("[{}] {}", i + 1, failure);
        }
    }
}

/// 全部数据库对的回退结果
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub pairs: Vec<RollbackStats>,
    pub dropped_catalogs: Vec<String>,
}

impl RollbackReport {
    pub fn total(&self) -> usize {
        self.pairs.iter().map(|p| p.total).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.pairs.iter().map(|p| p.succeeded).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.pairs.iter().flat_map(|p| p.failures.iter())
    }

    pub fn aborted(&self) -> bool {
        self.pairs.iter().any(|p| p.aborted)
    }

    /// 存在任何失败都不算完全成功
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    fn log_global_summary(&self) {
        info!("回退统计 - 全局");
        let failures: Vec<_> = self.failures().collect();
        info!(
            "总表: {}, 成功: {}, 失败: {}",
            self.total(),
            self.succeeded(),
            failures.len()
        );
        for (i, failure) in failures.iter().enumerate() {
            error!("[{}] {}", i + 1, failure);
        }
    }
}

/// 一个数据库对的回退计划
#[derive(Debug, Clone)]
pub struct PairRollbackPlan {
    pub pair: DatabasePair,
    pub tables: Vec<TableRollbackPlan>,
}

/// 两阶段回退：先一次性读取结构并生成计划，再逐表执行
pub struct RollbackRunner<'a> {
    config: &'a AppConfig,
}

impl<'a> RollbackRunner<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// 读取两端结构快照
    pub async fn discover(&self, conn: &PairConnections) -> Result<RollbackSnapshot> {
        let pair = &conn.pair;
        let target = TargetSchema::new(conn.target(), &pair.starrocks.database);
        let origin = OriginSchema::new(conn.origin(), &pair.clickhouse.database);
        Ok(RollbackSnapshot {
            target_tables: target.list_tables().await?,
            origin_tables: origin.list_tables().await?,
            origin_columns: origin.list_columns().await?,
        })
    }

    pub fn plan(&self, pair: &DatabasePair, snapshot: &RollbackSnapshot) -> PairRollbackPlan {
        let common = snapshot.common_tables(&pair.sr_table_suffix, &self.config.ignore_tables);
        info!("数据库对 {} 确认到 {} 个共同表: {:?}", pair.name, common.len(), common);
        PairRollbackPlan {
            pair: pair.clone(),
            tables: common
                .iter()
                .map(|table| snapshot.plan_table(table, &pair.sr_table_suffix))
                .collect(),
        }
    }

    pub async fn plan_pair(&self, conn: &PairConnections) -> Result<PairRollbackPlan> {
        let snapshot = self.discover(conn).await?;
        Ok(self.plan(&conn.pair, &snapshot))
    }

    /// 按计划执行单表回退，预检不通过时不执行任何语句
    pub async fn execute_plan(
        &self,
        pair: &DatabasePair,
        plan: &TableRollbackPlan,
        origin: &dyn SqlExecutor,
        target: &dyn SqlExecutor,
    ) -> std::result::Result<(), FailureRecord> {
        let failure = |step, error| FailureRecord {
            pair: pair.name.clone(),
            table: plan.base_table.clone(),
            step,
            error,
        };

        if plan.is_blocked() {
            return Err(failure(
                RollbackStep::Precheck,
                CksrError::precheck(format!(
                    "重命名冲突：目标表 {}.{} 已存在且不是视图，停止回退此表",
                    pair.starrocks.database, plan.base_table
                )),
            ));
        }

        for statement in plan.statements(pair) {
            let executor = match statement.engine {
                Engine::ClickHouse => origin,
                Engine::StarRocks => target,
            };
            executor
                .exec(&statement.sql)
                .await
                .map_err(|e| failure(statement.step, e))?;
            info!("[{}] {}", statement.step, statement.sql);
        }
        Ok(())
    }

    /// 回退一个数据库对，按策略决定遇错中止还是继续
    pub async fn rollback_pair(&self, conn: &PairConnections) -> RollbackStats {
        let pair = &conn.pair;
        let mut stats = RollbackStats {
            pair: pair.name.clone(),
            ..RollbackStats::default()
        };

        let plan = match self.plan_pair(conn).await {
            Ok(plan) => plan,
            Err(e) => {
                error!("数据库对 {} 读取表结构失败: {}", pair.name, e);
                stats.failures.push(FailureRecord {
                    pair: pair.name.clone(),
                    table: String::new(),
                    step: RollbackStep::Precheck,
                    error: e,
                });
                stats.aborted = self.config.rollback.strategy == RollbackStrategy::StopOnError;
                return stats;
            }
        };

        stats.total = plan.tables.len();
        for (index, table) in plan.tables.iter().enumerate() {
            info!("[{}/{}] 回退表: {}", index + 1, stats.total, table);
            match self
                .execute_plan(pair, table, conn.origin(), conn.target())
                .await
            {
                Ok(()) => stats.succeeded += 1,
                Err(failure) => {
                    error!("表 {} 回退失败: {}", failure.table, failure);
                    stats.failures.push(failure);
                    if self.config.rollback.strategy == RollbackStrategy::StopOnError {
                        stats.aborted = true;
                        break;
                    }
                }
            }
        }
        stats
    }

    /// 回退所有数据库对，全部处理完后统一删除 Catalog
    pub async fn run(&self, connections: &[PairConnections]) -> Result<RollbackReport> {
        let mut report = RollbackReport::default();
        info!("开始回退，策略: {}", self.config.rollback.strategy);

        for conn in connections {
            info!("开始回退数据库对: {}", conn.name());
            let stats = self.rollback_pair(conn).await;
            stats.log_summary();
            let aborted = stats.aborted;
            report.pairs.push(stats);
            if aborted {
                report.log_global_summary();
                warn!("回退在数据库对 {} 中止，跳过 Catalog 清理", conn.name());
                return Ok(report);
            }
        }

        report.log_global_summary();
        report.dropped_catalogs = drop_catalogs_once(connections).await?;
        info!("所有数据库对回退与 Catalog 清理完成");
        Ok(report)
    }

    /// 只生成计划，不执行任何语句
    pub async fn dry_run(&self, connections: &[PairConnections]) -> Result<Vec<PairRollbackPlan>> {
        let mut plans = Vec::with_capacity(connections.len());
        for conn in connections {
            plans.push(self.plan_pair(conn).await?);
        }
        Ok(plans)
    }
}

/// 按名称去重后删除 Catalog，每个名称只删除一次
pub async fn drop_catalogs_once(connections: &[PairConnections]) -> Result<Vec<String>> {
    let mut pending: BTreeSet<String> = connections
        .iter()
        .map(|c| c.pair.catalog_name.clone())
        .filter(|name| !name.is_empty())
        .collect();
    let mut dropped = Vec::new();

    for conn in connections {
        if pending.is_empty() {
            break;
        }
        let schema = TargetSchema::new(conn.target(), &conn.pair.starrocks.database);
        let catalogs = schema.list_catalogs().await?;
        for name in pending.clone() {
            if catalogs.contains(&name) {
                conn.target().exec(&drop_catalog_sql(&name)).await?;
                info!("已删除 Catalog: {}", name);
                pending.remove(&name);
                dropped.push(name);
            }
        }
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{ScriptedExecutor, row};
    use std::sync::Arc;

    fn config(strategy: &str) -> AppConfig {
        let content = AppConfig::template().replace(
            "strategy = \"stop_on_error\"",
            &format!("strategy = \"{strategy}\""),
        );
        AppConfig::from_toml_str(&content).unwrap()
    }

    struct Fixture {
        origin: Arc<ScriptedExecutor>,
        target: Arc<ScriptedExecutor>,
        conn: PairConnections,
    }

    /// blocked 表的基表名被普通表占用，events 为完整迁移态
    fn fixture(config: &AppConfig) -> Fixture {
        let origin = Arc::new(
            ScriptedExecutor::for_engine(Engine::ClickHouse)
                .on_query(
                    "FROM system.tables",
                    vec![row(&["blocked", "MergeTree"]), row(&["events", "MergeTree"])],
                )
                .on_query(
                    "FROM system.columns",
                    vec![
                        row(&["blocked", "id"]),
                        row(&["events", "id"]),
                        row(&["events", "ip_TmpSrConverter"]),
                    ],
                ),
        );
        let target = Arc::new(
            ScriptedExecutor::new()
                .on_query(
                    "information_schema.tables",
                    vec![
                        row(&["blocked", "BASE TABLE"]),
                        row(&["blocked_sr", "BASE TABLE"]),
                        row(&["events", "VIEW"]),
                        row(&["events_sr", "BASE TABLE"]),
                    ],
                )
                .on_query("SHOW CATALOGS", vec![row(&["clickhouse_catalog"])]),
        );
        let conn = PairConnections::with_executors(
            config.database_pairs[0].clone(),
            origin.clone(),
            target.clone(),
        );
        Fixture {
            origin,
            target,
            conn,
        }
    }

    #[tokio::test]
    async fn test_blocked_table_issues_no_statement() {
        let config = config("stop_on_error");
        let f = fixture(&config);
        let runner = RollbackRunner::new(&config);

        let plan = runner.plan_pair(&f.conn).await.unwrap();
        let blocked = &plan.tables[0];
        assert_eq!(blocked.base_table, "blocked");
        assert!(blocked.need_rename && !blocked.can_rename);

        let failure = runner
            .execute_plan(&f.conn.pair, blocked, f.conn.origin(), f.conn.target())
            .await
            .unwrap_err();
        assert_eq!(failure.step, RollbackStep::Precheck);
        assert!(matches!(failure.error, CksrError::Precheck(_)));
        assert!(f.origin.statements().is_empty());
        assert!(f.target.statements().is_empty());
    }

    #[tokio::test]
    async fn test_stop_on_error_aborts_run() {
        let config = config("stop_on_error");
        let f = fixture(&config);
        let runner = RollbackRunner::new(&config);

        let report = runner.run(std::slice::from_ref(&f.conn)).await.unwrap();
        assert!(report.aborted());
        assert!(!report.is_success());
        assert_eq!(report.succeeded(), 0);
        // events 未执行，Catalog 未删除
        assert!(f.target.statements().is_empty());
        assert!(report.dropped_catalogs.is_empty());
    }

    #[tokio::test]
    async fn test_continue_on_error_finishes_and_drops_catalog() {
        let config = config("continue_on_error");
        let f = fixture(&config);
        let runner = RollbackRunner::new(&config);

        let report = runner.run(std::slice::from_ref(&f.conn)).await.unwrap();
        assert!(!report.aborted());
        assert!(!report.is_success());
        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].table, "blocked");
        assert_eq!(failures[0].pair, "default");

        assert_eq!(
            f.target.statements(),
            vec![
                "DROP VIEW IF EXISTS `default`.`events`".to_string(),
                "ALTER TABLE `default`.`events_sr` RENAME `events`".to_string(),
                "DROP CATALOG IF EXISTS `clickhouse_catalog`".to_string(),
            ]
        );
        assert_eq!(
            f.origin.statements(),
            vec!["ALTER TABLE `default`.`events` DROP COLUMN IF EXISTS `ip_TmpSrConverter`".to_string()]
        );
        assert_eq!(report.dropped_catalogs, vec!["clickhouse_catalog".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_step_is_recorded() {
        let config = config("continue_on_error");
        let origin = Arc::new(ScriptedExecutor::for_engine(Engine::ClickHouse).fail_on("DROP COLUMN"));
        let target = Arc::new(ScriptedExecutor::new());
        let conn = PairConnections::with_executors(
            config.database_pairs[0].clone(),
            origin.clone(),
            target.clone(),
        );
        let runner = RollbackRunner::new(&config);
        let plan = TableRollbackPlan {
            base_table: "events".to_string(),
            suffixed_table: "events_sr".to_string(),
            need_drop_view: false,
            need_rename: true,
            can_rename: true,
            ck_added_columns: vec!["ip_TmpSrConverter".to_string()],
        };

        let failure = runner
            .execute_plan(&conn.pair, &plan, conn.origin(), conn.target())
            .await
            .unwrap_err();
        assert_eq!(failure.step, RollbackStep::DropCkColumns);
        // 改名已完成，下次发现阶段会识别为只剩影子列的状态
        assert_eq!(target.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_dropped_once_across_pairs() {
        let config = config("stop_on_error");
        let first = Arc::new(ScriptedExecutor::new().on_query("SHOW CATALOGS", vec![row(&["clickhouse_catalog"])]));
        let second = Arc::new(ScriptedExecutor::new().on_query("SHOW CATALOGS", vec![row(&["clickhouse_catalog"])]));
        let origin = Arc::new(ScriptedExecutor::for_engine(Engine::ClickHouse));
        let pair = config.database_pairs[0].clone();
        let mut other = pair.clone();
        other.name = "second".to_string();
        let connections = vec![
            PairConnections::with_executors(pair, origin.clone(), first.clone()),
            PairConnections::with_executors(other, origin, second.clone()),
        ];

        let dropped = drop_catalogs_once(&connections).await.unwrap();
        assert_eq!(dropped, vec!["clickhouse_catalog".to_string()]);
        assert_eq!(first.statements().len(), 1);
        assert!(second.queries().is_empty());
    }
}
