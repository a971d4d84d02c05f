use super::boundary::{Boundary, fetch_boundary, parse_explicit_value};
use super::statements::quote_ident;
use crate::config::TimestampColumn;
use crate::constants::shim;
use crate::convert::{
    FieldConverter, is_array, is_array_ipv4, is_array_ipv6, is_ipv4, is_ipv6, is_string_array,
};
use crate::ddl::{TableColumn, TableDefinition};
use crate::error::{CksrError, MappingMismatch, Result};
use crate::executor::SqlExecutor;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 生成 CREATE 还是 ALTER 语句
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSqlKind {
    Create,
    Alter,
}

/// 校验通过后的两侧投影，列顺序一一对应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewProjection {
    pub origin_clauses: Vec<String>,
    pub target_clauses: Vec<String>,
}

/// 联合视图构建器
///
/// 源端经外部 Catalog 读取 ClickHouse 表，目标端读取改名后的 StarRocks 表，
/// 两侧按边界列切分后 `union all`。
pub struct ViewBuilder<'a> {
    converters: &'a [FieldConverter],
    target: &'a TableDefinition,
    catalog: &'a str,
    origin_db: &'a str,
    origin_table: &'a str,
    target_db: &'a str,
    view_name: &'a str,
}

impl<'a> ViewBuilder<'a> {
    /// `target` 为改名后的 StarRocks 基表，其 `name` 即视图读取的表名
    pub fn new(
        converters: &'a [FieldConverter],
        target: &'a TableDefinition,
        catalog: &'a str,
        origin_db: &'a str,
        origin_table: &'a str,
        target_db: &'a str,
        view_name: &'a str,
    ) -> Self {
        Self {
            converters,
            target,
            catalog,
            origin_db,
            origin_table,
            target_db,
            view_name,
        }
    }

    /// 字段匹配与覆盖校验
    pub fn prepare(&self) -> Result<ViewProjection> {
        let mut matched: HashMap<&str, &FieldConverter> = HashMap::new();
        let mut mismatch = MappingMismatch::default();

        for converter in self.converters {
            let wanted = target_field_name(converter);
            match self.target.column(&wanted) {
                Some(field) => {
                    if matched.insert(field.name.as_str(), converter).is_some() {
                        mismatch.extra_in_origin.push(field.name.clone());
                    }
                }
                None => warn!(
                    "字段 {} 在目标表 {} 中没有对应字段 {}，已跳过",
                    converter.origin_name(),
                    self.target.name,
                    wanted
                ),
            }
        }

        if matched.is_empty() {
            return Err(CksrError::custom(format!(
                "源表 {}.{} 没有任何字段能映射到目标表 {}",
                self.origin_db, self.origin_table, self.target.name
            )));
        }

        let mut origin_clauses = Vec::with_capacity(self.target.columns.len());
        let mut target_clauses = Vec::with_capacity(self.target.columns.len());
        for field in &self.target.columns {
            match matched.get(field.name.as_str()) {
                Some(converter) => origin_clauses.push(origin_clause(converter, field)),
                None => match fill_clause(field) {
                    Some(clause) => {
                        debug!("目标表独有字段 {} 在源端补齐: {}", field.name, clause);
                        origin_clauses.push(clause);
                    }
                    None => {
                        mismatch.missing_in_origin.push(field.name.clone());
                        continue;
                    }
                },
            }
            target_clauses.push(format!("`{}`", field.name));
        }

        if !mismatch.is_empty() {
            return Err(CksrError::Mapping(mismatch));
        }
        Ok(ViewProjection {
            origin_clauses,
            target_clauses,
        })
    }

    /// 使用给定边界渲染最终 SQL
    pub fn render(&self, kind: ViewSqlKind, boundary: &Boundary) -> Result<String> {
        let projection = self.prepare()?;
        Ok(self.render_projection(kind, &projection, boundary))
    }

    fn render_projection(
        &self,
        kind: ViewSqlKind,
        projection: &ViewProjection,
        boundary: &Boundary,
    ) -> String {
        let origin_select = format!(
            "select \n\t{} \nfrom {}.{}.{}",
            projection.origin_clauses.join(", \n\t"),
            quote_ident(self.catalog),
            quote_ident(self.origin_db),
            quote_ident(self.origin_table)
        );
        let target_select = format!(
            "select \n\t{} \nfrom {}.{}",
            projection.target_clauses.join(", \n\t"),
            quote_ident(self.target_db),
            quote_ident(&self.target.name)
        );
        let head = match kind {
            ViewSqlKind::Create => "create view if not exists ",
            ViewSqlKind::Alter => "alter view ",
        };
        let column = quote_ident(&boundary.column);
        let value = &boundary.value;
        format!(
            "{head}{}.{} as \n{origin_select} \nwhere {column} < {value} \nunion all \n{target_select} \nwhere {column} >= {value}; \n",
            quote_ident(self.target_db),
            quote_ident(self.view_name)
        )
    }

    /// 校验字段后从目标端查询边界并生成 SQL
    pub async fn build(
        &self,
        kind: ViewSqlKind,
        target: &dyn SqlExecutor,
        column: &TimestampColumn,
    ) -> Result<String> {
        let projection = self.prepare()?;
        let boundary = fetch_boundary(target, self.target_db, &self.target.name, column).await?;
        Ok(self.render_projection(kind, &projection, &boundary))
    }

    /// 使用手工指定的边界值生成 ALTER VIEW
    pub fn build_alter_with_value(&self, column: &TimestampColumn, value: &str) -> Result<String> {
        let projection = self.prepare()?;
        let boundary = Boundary {
            column: column.column.clone(),
            column_type: column.column_type,
            value: parse_explicit_value(column.column_type, value)?,
        };
        Ok(self.render_projection(ViewSqlKind::Alter, &projection, &boundary))
    }
}

/// IP 及 IP 数组字段在目标端命名为 `<name>_int`，其余同名
fn target_field_name(converter: &FieldConverter) -> String {
    let origin_type = converter.origin_type();
    if is_ipv4(origin_type)
        || is_ipv6(origin_type)
        || is_array_ipv4(origin_type)
        || is_array_ipv6(origin_type)
    {
        format!("{}{}", converter.origin_name(), shim::TARGET_INT_SUFFIX)
    } else {
        converter.origin_name().to_string()
    }
}

fn origin_clause(converter: &FieldConverter, target: &TableColumn) -> String {
    if !converter.is_shim() {
        return format!("`{}`", converter.name());
    }

    let shim_col = converter.name();
    let origin_type = converter.origin_type();
    let sep = shim::SEPARATOR;
    let split = format!("split(`{shim_col}`, '{sep}')");

    if is_array_ipv6(origin_type) {
        format!(
            "CASE WHEN `{shim_col}` = '' THEN ARRAY<LARGEINT>[] ELSE array_map(x -> CAST(x AS LARGEINT), {split}) END as `{}`",
            target.name
        )
    } else if is_string_array(origin_type) {
        format!(
            "CASE WHEN `{shim_col}` = '' THEN ARRAY<String>[] ELSE {split} END as `{}`",
            target.name
        )
    } else if is_array(origin_type) {
        format!(
            "CASE WHEN `{shim_col}` = '' THEN {}[] ELSE array_map(x -> CAST(x AS {}), {split}) END as `{}`",
            target.data_type,
            array_element_type(&target.data_type),
            target.name
        )
    } else {
        format!("`{shim_col}` as `{}`", target.name)
    }
}

/// 目标表独有字段的源端占位：有 DEFAULT 用默认值，可空用 NULL，否则无法补齐
fn fill_clause(field: &TableColumn) -> Option<String> {
    let value = match field.plain_default() {
        Some(expr) => expr,
        None if field.nullable => "NULL",
        None => return None,
    };
    Some(format!(
        "CAST({value} AS {}) as `{}`",
        field.data_type, field.name
    ))
}

/// `ARRAY<bigint(20)>` -> `bigint(20)`
fn array_element_type(data_type: &str) -> &str {
    match (data_type.find('<'), data_type.rfind('>')) {
        (Some(start), Some(end)) if start < end => data_type[start + 1..end].trim(),
        _ => data_type,
    }
}
