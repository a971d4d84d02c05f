use anyhow::{Context, Result};
use cksr_core::builder::{AddColumnBuilder, Boundary, ViewBuilder, ViewSqlKind, default_max_literal};
use cksr_core::config::{ParserConfig, TimestampColumn};
use cksr_core::convert::new_converters;
use cksr_core::ddl::parse_table_with_timeout;
use std::fmt::Write;
use std::fs;
use std::path::Path;

async fn parse_file(path: &Path) -> Result<cksr_core::ddl::TableDefinition> {
    let ddl = fs::read_to_string(path)
        .with_context(|| format!("读取 DDL 文件失败: {}", path.display()))?;
    let table = parse_table_with_timeout(ddl, ParserConfig::default().timeout())
        .await
        .with_context(|| format!("解析 DDL 失败: {}", path.display()))?;
    Ok(table)
}

/// 离线生成字段转换表、加列语句以及视图语句（边界取最大值）
pub async fn inspect_report(
    ddl_file: &Path,
    target_ddl_file: Option<&Path>,
    catalog: &str,
) -> Result<String> {
    let table = parse_file(ddl_file).await?;
    let converters = new_converters(&table)?;

    let mut out = String::new();
    writeln!(out, "-- 表 {} 的字段转换", table.qualified_name())?;
    for converter in &converters {
        if converter.is_shim() {
            writeln!(
                out,
                "--   {} {} <- {} {}",
                converter.name(),
                converter.data_type(),
                converter.origin_name(),
                converter.origin_type()
            )?;
        } else {
            writeln!(out, "--   {} {}", converter.name(), converter.data_type())?;
        }
    }

    match AddColumnBuilder::new(&table, &converters).build() {
        Some(sql) => writeln!(out, "{sql}")?,
        None => writeln!(out, "-- 无需添加影子列")?,
    }

    if let Some(path) = target_ddl_file {
        let target = parse_file(path).await?;
        let target_db = if target.db_name.is_empty() {
            table.db_name.as_str()
        } else {
            target.db_name.as_str()
        };
        let column = TimestampColumn::default();
        let boundary = Boundary {
            value: default_max_literal(column.column_type),
            column: column.column,
            column_type: column.column_type,
        };
        let sql = ViewBuilder::new(
            &converters,
            &target,
            catalog,
            &table.db_name,
            &table.name,
            target_db,
            &table.name,
        )
        .render(ViewSqlKind::Create, &boundary)?;
        writeln!(out, "{sql}")?;
    }
    Ok(out)
}

pub async fn run_inspect(ddl_file: &Path, target_ddl_file: Option<&Path>, catalog: &str) -> Result<()> {
    let report = inspect_report(ddl_file, target_ddl_file, catalog).await?;
    println!("{report}");
    Ok(())
}
