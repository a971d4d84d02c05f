use crate::builder::{drop_column_sql, drop_view_sql, rename_table_sql};
use crate::config::DatabasePair;
use crate::convert::is_shim_column;
use crate::executor::Engine;
use crate::schema::TableKind;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 回退步骤，日志与失败记录中使用 snake_case 名称
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStep {
    Precheck,
    DropView,
    RenameSuffix,
    DropCkColumns,
}

impl fmt::Display for RollbackStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RollbackStep::Precheck => "precheck",
            RollbackStep::DropView => "drop_view",
            RollbackStep::RenameSuffix => "rename_suffix",
            RollbackStep::DropCkColumns => "drop_ck_columns",
        };
        f.write_str(name)
    }
}

/// 一次性读取的两端结构，规划阶段只使用这份快照
#[derive(Debug, Clone, Default)]
pub struct RollbackSnapshot {
    pub target_tables: BTreeMap<String, TableKind>,
    pub origin_tables: BTreeMap<String, TableKind>,
    pub origin_columns: HashMap<String, Vec<String>>,
}

impl RollbackSnapshot {
    fn target_kind(&self, table: &str) -> Option<TableKind> {
        self.target_tables.get(table).copied()
    }

    fn has_shim_columns(&self, table: &str) -> bool {
        self.origin_columns
            .get(table)
            .is_some_and(|cols| cols.iter().any(|c| is_shim_column(c)))
    }

    /// 存在迁移关系的源表
    ///
    /// - 带后缀表与基表都存在且基表为视图 (迁移完成)
    /// - 带后缀表存在、基表不是视图 (已改名、视图缺失)
    /// - 带后缀表不存在、基表为普通表且源表已有影子列 (只加了列)
    pub fn common_tables(&self, suffix: &str, ignored: &[String]) -> Vec<String> {
        let mut tables = Vec::new();
        for table in self.origin_tables.keys() {
            if ignored.iter().any(|t| t == table) {
                tracing::info!("忽略表: {} (在配置的忽略列表中)", table);
                continue;
            }
            let suffixed = self.target_kind(&format!("{table}{suffix}"));
            let base = self.target_kind(table);
            let base_is_view = base == Some(TableKind::View);

            let migrated = suffixed.is_some() && base_is_view;
            let renamed = suffixed.is_some() && !base_is_view;
            let shim_only = suffixed.is_none()
                && base == Some(TableKind::BaseTable)
                && self.has_shim_columns(table);

            if migrated || renamed || shim_only {
                tables.push(table.clone());
            }
        }
        tables
    }

    pub fn plan_table(&self, base_table: &str, suffix: &str) -> TableRollbackPlan {
        let suffixed_table = format!("{base_table}{suffix}");
        let base = self.target_kind(base_table);
        let suffixed = self.target_kind(&suffixed_table);

        let need_drop_view = base == Some(TableKind::View);
        let need_rename = suffixed == Some(TableKind::BaseTable);
        let can_rename = base.is_none() || need_drop_view;
        let ck_added_columns = self
            .origin_columns
            .get(base_table)
            .map(|cols| cols.iter().filter(|c| is_shim_column(c)).cloned().collect())
            .unwrap_or_default();

        TableRollbackPlan {
            base_table: base_table.to_string(),
            suffixed_table,
            need_drop_view,
            need_rename,
            can_rename,
            ck_added_columns,
        }
    }
}

/// 单表回退计划，计算一次后按固定顺序执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRollbackPlan {
    pub base_table: String,
    pub suffixed_table: String,
    pub need_drop_view: bool,
    pub need_rename: bool,
    pub can_rename: bool,
    pub ck_added_columns: Vec<String>,
}

/// 计划中的一条语句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStatement {
    pub step: RollbackStep,
    pub engine: Engine,
    pub sql: String,
}

impl TableRollbackPlan {
    /// 需要改名但基表名被普通表占用
    pub fn is_blocked(&self) -> bool {
        self.need_rename && !self.can_rename
    }

    /// 按执行顺序展开的语句，预检不通过时为空
    pub fn statements(&self, pair: &DatabasePair) -> Vec<PlannedStatement> {
        if self.is_blocked() {
            return Vec::new();
        }
        let target_db = &pair.starrocks.database;
        let mut statements = Vec::new();
        if self.need_drop_view {
            statements.push(PlannedStatement {
                step: RollbackStep::DropView,
                engine: Engine::StarRocks,
                sql: drop_view_sql(target_db, &self.base_table),
            });
        }
        if self.need_rename {
            statements.push(PlannedStatement {
                step: RollbackStep::RenameSuffix,
                engine: Engine::StarRocks,
                sql: rename_table_sql(target_db, &self.suffixed_table, &self.base_table),
            });
        }
        for column in &self.ck_added_columns {
            statements.push(PlannedStatement {
                step: RollbackStep::DropCkColumns,
                engine: Engine::ClickHouse,
                sql: drop_column_sql(
                    &pair.clickhouse.database,
                    &self.base_table,
                    column,
                    pair.clickhouse.cluster.as_deref(),
                ),
            });
        }
        statements
    }
}

impl fmt::Display for TableRollbackPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: NeedDropView={}, NeedRename={}, CanRename={}, CKAddedColumns=[{}]",
            self.base_table,
            self.need_drop_view,
            self.need_rename,
            self.can_rename,
            self.ck_added_columns.join(", ")
        )
    }
}
