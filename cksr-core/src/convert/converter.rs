use super::classify::{is_ipv4, is_ipv6, needs_shim, normalize_type};
use crate::constants::shim;
use crate::ddl::{TableColumn, TableDefinition};
use crate::error::Result;
use std::collections::HashSet;
use tracing::debug;

/// 单个字段的转换结果
///
/// `origin` 为 None 表示字段直接透传；否则 `field` 是影子列（新名称与类型），
/// `origin` 是 ClickHouse 上的真实列。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConverter {
    field: TableColumn,
    origin: Option<TableColumn>,
}

impl FieldConverter {
    pub fn passthrough(field: TableColumn) -> Self {
        Self {
            field,
            origin: None,
        }
    }

    pub fn shim(field: TableColumn, origin: TableColumn) -> Self {
        Self {
            field,
            origin: Some(origin),
        }
    }

    /// 有效字段：影子列或透传的原始列
    pub fn field(&self) -> &TableColumn {
        &self.field
    }

    pub fn origin(&self) -> Option<&TableColumn> {
        self.origin.as_ref()
    }

    pub fn is_shim(&self) -> bool {
        self.origin.is_some()
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn data_type(&self) -> &str {
        &self.field.data_type
    }

    pub fn origin_name(&self) -> &str {
        self.origin.as_ref().map_or(&self.field.name, |o| &o.name)
    }

    pub fn origin_type(&self) -> &str {
        self.origin.as_ref().map_or(&self.field.data_type, |o| &o.data_type)
    }
}

/// 列名带影子列后缀即视为此前生成的影子列
pub fn is_shim_column(name: &str) -> bool {
    name.contains(shim::SUFFIX)
}

/// 为 ClickHouse 表的每个字段生成转换结果
///
/// 物化列与已有影子列被跳过；任一字段类型不支持时整张表失败。
pub fn new_converters(table: &TableDefinition) -> Result<Vec<FieldConverter>> {
    let mut assigned: HashSet<String> = HashSet::new();
    let mut converters = Vec::with_capacity(table.columns.len());
    let mut skipped = 0;

    for column in &table.columns {
        if column.is_materialized() || is_shim_column(&column.name) {
            skipped += 1;
            continue;
        }

        let normalized = normalize_type(&column.name, &column.data_type)?;
        let mut origin = column.clone();
        origin.data_type = normalized;

        if !needs_shim(&origin.data_type) {
            converters.push(FieldConverter::passthrough(origin));
            continue;
        }

        let shim_name = allocate_shim_name(&origin.name, &mut assigned);
        let shim_type = shim_type_for(&origin.data_type);
        debug!(
            "字段 {} ({}) 需要影子列 {} ({})",
            origin.name, origin.data_type, shim_name, shim_type
        );
        converters.push(FieldConverter::shim(
            TableColumn::new(shim_name, shim_type),
            origin,
        ));
    }

    debug!(
        "表 {} 生成 {} 个字段转换，跳过 {} 个物化列/影子列",
        table.qualified_name(),
        converters.len(),
        skipped
    );
    Ok(converters)
}

/// `<name>_TmpSrConverter`，与本次已分配的名字冲突时追加数字
///
/// 表中已存在的同名列是上次运行留下的影子列，直接沿用。
fn allocate_shim_name(name: &str, assigned: &mut HashSet<String>) -> String {
    let base = format!("{name}{}", shim::SUFFIX);
    let mut candidate = base.clone();
    let mut n = 1;
    while assigned.contains(&candidate) {
        candidate = format!("{base}{n}");
        n += 1;
    }
    assigned.insert(candidate.clone());
    candidate
}

fn shim_type_for(data_type: &str) -> &'static str {
    if is_ipv4(data_type) {
        shim::IPV4_SHIM_TYPE
    } else if is_ipv6(data_type) {
        shim::IPV6_SHIM_TYPE
    } else {
        shim::ARRAY_SHIM_TYPE
    }
}
