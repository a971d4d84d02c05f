use crate::config::DatabasePair;
use crate::constants::catalog;

/// 反引号包裹标识符
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// 单引号字符串字面量
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// ClickHouse DDL 的集群子句，未配置集群时为空
pub fn on_cluster_clause(cluster: Option<&str>) -> String {
    match cluster {
        Some(cluster) if !cluster.trim().is_empty() => format!(" on cluster '{cluster}'"),
        _ => String::new(),
    }
}

pub fn drop_view_sql(db: &str, view: &str) -> String {
    format!("DROP VIEW IF EXISTS {}.{}", quote_ident(db), quote_ident(view))
}

pub fn rename_table_sql(db: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {}.{} RENAME {}",
        quote_ident(db),
        quote_ident(from),
        quote_ident(to)
    )
}

pub fn drop_column_sql(db: &str, table: &str, column: &str, cluster: Option<&str>) -> String {
    format!(
        "ALTER TABLE {}.{}{} DROP COLUMN IF EXISTS {}",
        quote_ident(db),
        quote_ident(table),
        on_cluster_clause(cluster),
        quote_ident(column)
    )
}

pub fn drop_catalog_sql(name: &str) -> String {
    format!("DROP CATALOG IF EXISTS {}", quote_ident(name))
}

/// StarRocks 中指向 ClickHouse 的 JDBC 外部 Catalog
pub fn create_catalog_sql(pair: &DatabasePair) -> String {
    format!(
        "CREATE EXTERNAL CATALOG IF NOT EXISTS {}\nPROPERTIES (\n    \"type\" = \"jdbc\",\n    \"user\" = \"{}\",\n    \"password\" = \"{}\",\n    \"jdbc_uri\" = \"{}\",\n    \"driver_url\" = \"{}\",\n    \"driver_class\" = \"{}\"\n)",
        quote_ident(&pair.catalog_name),
        escape_double_quoted(&pair.clickhouse.username),
        escape_double_quoted(&pair.clickhouse.password),
        pair.clickhouse_jdbc_uri(),
        escape_double_quoted(&pair.driver_url),
        catalog::JDBC_DRIVER_CLASS
    )
}

fn escape_double_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
