//! 两端的表结构查询
use crate::builder::{quote_ident, quote_literal};
use crate::error::{CksrError, Result};
use crate::executor::{Row, SqlExecutor, query_scalar};
use std::collections::{BTreeMap, HashMap};

/// 表的种类，回退与迁移只区分基表和视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    BaseTable,
    View,
    Other,
}

impl TableKind {
    /// ClickHouse `system.tables.engine`
    pub fn from_clickhouse_engine(engine: &str) -> Self {
        match engine {
            "View" | "MaterializedView" | "LiveView" | "WindowView" => TableKind::View,
            "" => TableKind::Other,
            _ => TableKind::BaseTable,
        }
    }

    /// StarRocks `information_schema.tables.TABLE_TYPE`
    pub fn from_starrocks_type(table_type: &str) -> Self {
        match table_type.trim().to_ascii_uppercase().as_str() {
            "BASE TABLE" => TableKind::BaseTable,
            "VIEW" => TableKind::View,
            _ => TableKind::Other,
        }
    }
}

fn column(row: &Row, index: usize) -> Option<&str> {
    row.get(index).and_then(|v| v.as_deref())
}

/// 源端 (ClickHouse) 表结构查询
pub struct OriginSchema<'a> {
    exec: &'a dyn SqlExecutor,
    database: &'a str,
}

impl<'a> OriginSchema<'a> {
    pub fn new(exec: &'a dyn SqlExecutor, database: &'a str) -> Self {
        Self { exec, database }
    }

    /// 表名及种类，按表名排序
    pub async fn list_tables(&self) -> Result<BTreeMap<String, TableKind>> {
        let sql = format!(
            "SELECT name, engine FROM system.tables WHERE database = {}",
            quote_literal(self.database)
        );
        let rows = self.exec.query(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = column(row, 0)?;
                let kind = TableKind::from_clickhouse_engine(column(row, 1).unwrap_or_default());
                Some((name.to_string(), kind))
            })
            .collect())
    }

    pub async fn show_create_table(&self, table: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_ident(self.database),
            quote_ident(table)
        );
        query_scalar(self.exec, &sql).await?.ok_or_else(|| {
            CksrError::custom(format!("未获取到 ClickHouse 表 {}.{} 的 DDL", self.database, table))
        })
    }

    /// 整库的列名，按表分组并保持列顺序
    pub async fn list_columns(&self) -> Result<HashMap<String, Vec<String>>> {
        let sql = format!(
            "SELECT table, name FROM system.columns WHERE database = {} ORDER BY table, position",
            quote_literal(self.database)
        );
        let rows = self.exec.query(&sql).await?;
        let mut columns: HashMap<String, Vec<String>> = HashMap::new();
        for row in &rows {
            if let (Some(table), Some(name)) = (column(row, 0), column(row, 1)) {
                columns.entry(table.to_string()).or_default().push(name.to_string());
            }
        }
        Ok(columns)
    }
}

/// 目标端 (StarRocks) 表结构查询
pub struct TargetSchema<'a> {
    exec: &'a dyn SqlExecutor,
    database: &'a str,
}

impl<'a> TargetSchema<'a> {
    pub fn new(exec: &'a dyn SqlExecutor, database: &'a str) -> Self {
        Self { exec, database }
    }

    pub async fn list_tables(&self) -> Result<BTreeMap<String, TableKind>> {
        let sql = format!(
            "SELECT TABLE_NAME, TABLE_TYPE FROM information_schema.tables WHERE TABLE_SCHEMA = {}",
            quote_literal(self.database)
        );
        let rows = self.exec.query(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = column(row, 0)?;
                let kind = TableKind::from_starrocks_type(column(row, 1).unwrap_or_default());
                Some((name.to_string(), kind))
            })
            .collect())
    }

    /// StarRocks 的 `SHOW CREATE TABLE` 第二列为 DDL
    pub async fn show_create_table(&self, table: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_ident(self.database),
            quote_ident(table)
        );
        let rows = self.exec.query(&sql).await?;
        rows.first()
            .and_then(|row| column(row, 1))
            .map(str::to_string)
            .ok_or_else(|| {
                CksrError::custom(format!(
                    "未获取到 StarRocks 表 {}.{} 的 DDL",
                    self.database, table
                ))
            })
    }

    pub async fn list_catalogs(&self) -> Result<Vec<String>> {
        let rows = self.exec.query("SHOW CATALOGS").await?;
        Ok(rows
            .iter()
            .filter_map(|row| column(row, 0).map(str::to_string))
            .collect())
    }

    pub async fn catalog_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_catalogs().await?.iter().any(|c| c == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Engine;
    use crate::executor::testing::{ScriptedExecutor, row};

    #[test]
    fn test_table_kind_mapping() {
        assert_eq!(TableKind::from_clickhouse_engine("MergeTree"), TableKind::BaseTable);
        assert_eq!(TableKind::from_clickhouse_engine("MaterializedView"), TableKind::View);
        assert_eq!(TableKind::from_starrocks_type("BASE TABLE"), TableKind::BaseTable);
        assert_eq!(TableKind::from_starrocks_type("view"), TableKind::View);
        assert_eq!(TableKind::from_starrocks_type("SYSTEM VIEW"), TableKind::Other);
    }

    #[tokio::test]
    async fn test_origin_listing() {
        let exec = ScriptedExecutor::for_engine(Engine::ClickHouse)
            .on_query(
                "FROM system.tables",
                vec![row(&["events", "MergeTree"]), row(&["events_v", "View"])],
            )
            .on_query(
                "FROM system.columns",
                vec![
                    row(&["events", "id"]),
                    row(&["events", "ip_TmpSrConverter"]),
                    row(&["other", "x"]),
                ],
            );
        let schema = OriginSchema::new(&exec, "logs");

        let tables = schema.list_tables().await.unwrap();
        assert_eq!(tables.get("events"), Some(&TableKind::BaseTable));
        assert_eq!(tables.get("events_v"), Some(&TableKind::View));

        let columns = schema.list_columns().await.unwrap();
        assert_eq!(columns["events"], vec!["id", "ip_TmpSrConverter"]);
        assert_eq!(
            exec.queries()[0],
            "SELECT name, engine FROM system.tables WHERE database = 'logs'"
        );
    }

    #[tokio::test]
    async fn test_target_ddl_and_catalogs() {
        let exec = ScriptedExecutor::new()
            .on_query("SHOW CREATE TABLE", vec![row(&["events_sr", "CREATE TABLE `events_sr` ()"])])
            .on_query("SHOW CATALOGS", vec![row(&["default_catalog", "Internal"]), row(&["ck", "Jdbc"])]);
        let schema = TargetSchema::new(&exec, "logs");

        assert_eq!(
            schema.show_create_table("events_sr").await.unwrap(),
            "CREATE TABLE `events_sr` ()"
        );
        assert!(schema.catalog_exists("ck").await.unwrap());
        assert!(!schema.catalog_exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_ddl_is_error() {
        let exec = ScriptedExecutor::new();
        let schema = TargetSchema::new(&exec, "logs");
        assert!(schema.show_create_table("absent").await.is_err());
    }
}
