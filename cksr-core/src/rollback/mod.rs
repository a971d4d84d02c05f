//! 回退：删除视图、去除表名后缀、删除源表影子列，最后清理 Catalog
mod plan;
mod runner;

pub use plan::{PlannedStatement, RollbackSnapshot, RollbackStep, TableRollbackPlan};
pub use runner::{
    FailureRecord, PairRollbackPlan, RollbackReport, RollbackRunner, RollbackStats,
    drop_catalogs_once,
};
