//! 视图边界更新：手工指定分区值或按目标表最小值刷新
use crate::builder::{ViewBuilder, ViewSqlKind};
use crate::config::AppConfig;
use crate::error::{CksrError, Result};
use crate::executor::PairConnections;
use crate::migrate::{load_origin, load_target};
use crate::schema::{TableKind, TargetSchema};
use tracing::{error, info};

/// 单个数据库对的刷新结果
#[derive(Debug, Default)]
pub struct RefreshStats {
    pub pair: String,
    pub refreshed: Vec<String>,
    pub failures: Vec<(String, CksrError)>,
}

impl RefreshStats {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ViewUpdater<'a> {
    config: &'a AppConfig,
}

impl<'a> ViewUpdater<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// 生成并执行 ALTER VIEW，`value` 为空时从目标表查询最小值
    pub async fn update_view(
        &self,
        conn: &PairConnections,
        view: &str,
        value: Option<&str>,
    ) -> Result<String> {
        let view = view.trim();
        if view.is_empty() {
            return Err(CksrError::custom("视图名不能为空"));
        }
        let pair = &conn.pair;
        let suffixed = format!("{view}{}", pair.sr_table_suffix);

        let (_, converters) = load_origin(conn, self.config, view).await?;
        let target = load_target(conn, self.config, &suffixed).await?;
        let builder = ViewBuilder::new(
            &converters,
            &target,
            &pair.catalog_name,
            &pair.clickhouse.database,
            view,
            &pair.starrocks.database,
            view,
        );
        let column = self.config.timestamp_column_for(view);
        let sql = match value {
            Some(value) => builder.build_alter_with_value(&column, value)?,
            None => {
                builder
                    .build(ViewSqlKind::Alter, conn.target(), &column)
                    .await?
            }
        };

        conn.target().exec(&sql).await?;
        info!("视图 {}.{} 已使用 ALTER VIEW 更新", pair.starrocks.database, view);
        Ok(sql)
    }

    /// 刷新所有带后缀基表的视图
    pub async fn refresh_pair(&self, conn: &PairConnections) -> Result<RefreshStats> {
        let pair = &conn.pair;
        let tables = TargetSchema::new(conn.target(), &pair.starrocks.database)
            .list_tables()
            .await?;

        let views: Vec<&String> = tables
            .iter()
            .filter(|(name, kind)| {
                **kind == TableKind::View
                    && !self.config.is_ignored(name)
                    && tables.get(&format!("{name}{}", pair.sr_table_suffix))
                        == Some(&TableKind::BaseTable)
            })
            .map(|(name, _)| name)
            .collect();
        info!("数据库对 {} 有 {} 个视图待刷新", pair.name, views.len());

        let mut stats = RefreshStats {
            pair: pair.name.clone(),
            ..RefreshStats::default()
        };
        for view in views {
            match self.update_view(conn, view, None).await {
                Ok(_) => stats.refreshed.push(view.clone()),
                Err(e) => {
                    error!("刷新视图 {} 失败: {}", view, e);
                    stats.failures.push((view.clone(), e));
                }
            }
        }
        Ok(stats)
    }

    pub async fn run(&self, connections: &[PairConnections]) -> Result<Vec<RefreshStats>> {
        let mut all = Vec::with_capacity(connections.len());
        for conn in connections {
            let stats = self.refresh_pair(conn).await?;
            info!(
                "数据库对 {} 刷新完成: 成功 {}, 失败 {}",
                stats.pair,
                stats.refreshed.len(),
                stats.failures.len()
            );
            all.push(stats);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Engine;
    use crate::executor::testing::{ScriptedExecutor, row};
    use std::sync::Arc;

    const CK_DDL: &str = "CREATE TABLE default.events
(
    `id` UInt64,
    `event_time` DateTime
)
ENGINE = MergeTree
ORDER BY id";

    const SR_DDL: &str = "CREATE TABLE `events_sr` (
  `id` bigint(20) NOT NULL COMMENT \"\",
  `event_time` datetime NOT NULL COMMENT \"\"
) ENGINE=OLAP";

    fn config() -> AppConfig {
        let content = format!(
            "{}\n[timestamp_columns.events]\ncolumn = \"event_time\"\ntype = \"datetime\"\n",
            AppConfig::template()
        );
        AppConfig::from_toml_str(&content).unwrap()
    }

    fn setup(target: ScriptedExecutor, config: &AppConfig) -> (Arc<ScriptedExecutor>, PairConnections) {
        let origin = Arc::new(
            ScriptedExecutor::for_engine(Engine::ClickHouse)
                .on_query("SHOW CREATE TABLE", vec![row(&[CK_DDL])]),
        );
        let target = Arc::new(target.on_query("SHOW CREATE TABLE", vec![row(&["events_sr", SR_DDL])]));
        let conn = PairConnections::with_executors(
            config.database_pairs[0].clone(),
            origin,
            target.clone(),
        );
        (target, conn)
    }

    #[tokio::test]
    async fn test_update_with_explicit_value() {
        let config = config();
        let (target, conn) = setup(ScriptedExecutor::new(), &config);

        let sql = ViewUpdater::new(&config)
            .update_view(&conn, "events", Some("2024-03-01 00:00:00"))
            .await
            .unwrap();
        assert!(sql.starts_with("alter view `default`.`events` as"));
        assert!(sql.contains("where `event_time` < '2024-03-01 00:00:00'"));
        assert_eq!(target.statements(), vec![sql]);
        // 手工指定时不查询最小值
        assert!(!target.queries().iter().any(|q| q.contains("min(")));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_value() {
        let config = config();
        let (target, conn) = setup(ScriptedExecutor::new(), &config);

        let err = ViewUpdater::new(&config)
            .update_view(&conn, "events", Some("2024-03-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, CksrError::Boundary(_)));
        assert!(target.statements().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_pair_only_touches_bridging_views() {
        let config = config();
        let (target, conn) = setup(
            ScriptedExecutor::new()
                .on_query(
                    "information_schema.tables",
                    vec![
                        row(&["events", "VIEW"]),
                        row(&["events_sr", "BASE TABLE"]),
                        row(&["report", "VIEW"]),
                    ],
                )
                .on_query("select min(`event_time`)", vec![row(&["2024-02-01 00:00:00"])]),
            &config,
        );

        let stats = ViewUpdater::new(&config).refresh_pair(&conn).await.unwrap();
        assert!(stats.is_success());
        assert_eq!(stats.refreshed, vec!["events".to_string()]);
        let statements = target.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("where `event_time` >= '2024-02-01 00:00:00'"));
    }
}
