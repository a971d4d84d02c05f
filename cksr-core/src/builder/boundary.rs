use super::statements::{quote_ident, quote_literal};
use crate::config::{BoundaryType, TimestampColumn};
use crate::constants::boundary;
use crate::error::{CksrError, Result};
use crate::executor::{SqlExecutor, query_scalar};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

/// 视图的切分边界：`column < value` 读源端，`column >= value` 读目标端
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub column: String,
    pub column_type: BoundaryType,
    /// 已渲染好的 SQL 字面量
    pub value: String,
}

/// 目标端无数据时使用的最大值，全部流量走源端
pub fn default_max_literal(column_type: BoundaryType) -> String {
    match column_type {
        BoundaryType::Date => quote_literal(boundary::MAX_DATE),
        BoundaryType::Datetime => quote_literal(boundary::MAX_DATETIME),
        BoundaryType::Bigint => boundary::MAX_BIGINT.to_string(),
    }
}

/// 把目标端查到的最小值渲染成字面量，NULL 或空值回退到最大值
pub fn render_min_value(column_type: BoundaryType, raw: Option<&str>) -> Result<String> {
    let value = match raw.map(str::trim) {
        Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("null") => v,
        _ => {
            debug!("目标端没有数据，边界使用 {} 的最大值", column_type);
            return Ok(default_max_literal(column_type));
        }
    };
    match column_type {
        BoundaryType::Date | BoundaryType::Datetime => Ok(quote_literal(value.trim_matches('\''))),
        BoundaryType::Bigint => {
            value.parse::<i64>().map_err(|_| {
                CksrError::boundary(format!("bigint 边界列的最小值不是整数: {value}"))
            })?;
            Ok(value.to_string())
        }
    }
}

/// 校验手工指定的边界值并渲染成字面量
pub fn parse_explicit_value(column_type: BoundaryType, value: &str) -> Result<String> {
    let trimmed = value.trim().trim_matches('\'');
    match column_type {
        BoundaryType::Datetime => {
            NaiveDateTime::parse_from_str(trimmed, boundary::DATETIME_FORMAT).map_err(|e| {
                CksrError::boundary(format!("分区值解析失败: {e} (期望格式 YYYY-MM-DD HH:MM:SS)"))
            })?;
            Ok(quote_literal(trimmed))
        }
        BoundaryType::Date => {
            NaiveDate::parse_from_str(trimmed, boundary::DATE_FORMAT).map_err(|e| {
                CksrError::boundary(format!("分区值解析失败: {e} (期望格式 YYYY-MM-DD)"))
            })?;
            Ok(quote_literal(trimmed))
        }
        BoundaryType::Bigint => {
            trimmed.parse::<i64>().map_err(|_| {
                CksrError::boundary("分区值类型不匹配: 列类型为 bigint，分区值必须为纯数字")
            })?;
            Ok(trimmed.to_string())
        }
    }
}

/// 查询目标表边界列的当前最小值
pub async fn fetch_boundary(
    target: &dyn SqlExecutor,
    db: &str,
    table: &str,
    column: &TimestampColumn,
) -> Result<Boundary> {
    let sql = format!(
        "select min({}) from {}.{}",
        quote_ident(&column.column),
        quote_ident(db),
        quote_ident(table)
    );
    let raw = query_scalar(target, &sql).await?;
    let value = render_min_value(column.column_type, raw.as_deref())?;
    info!("表 {}.{} 的边界 {} = {}", db, table, column.column, value);
    Ok(Boundary {
        column: column.column.clone(),
        column_type: column.column_type,
        value,
    })
}
