use super::statements::on_cluster_clause;
use crate::constants::shim;
use crate::convert::{
    FieldConverter, is_array, is_array_ipv4, is_array_ipv6, is_ipv4, is_ipv6, is_string_array,
};
use crate::ddl::TableDefinition;
use tracing::debug;

/// 为 ClickHouse 表生成添加影子列的 ALTER 语句
///
/// 表中已存在的影子列不再生成子句，全部存在时 `build` 返回 None，
/// 因此重复执行不会产生新的语句。
pub struct AddColumnBuilder<'a> {
    table: &'a TableDefinition,
    converters: &'a [FieldConverter],
    cluster: Option<&'a str>,
}

impl<'a> AddColumnBuilder<'a> {
    pub fn new(table: &'a TableDefinition, converters: &'a [FieldConverter]) -> Self {
        Self {
            table,
            converters,
            cluster: None,
        }
    }

    pub fn on_cluster(mut self, cluster: Option<&'a str>) -> Self {
        self.cluster = cluster;
        self
    }

    /// 每个缺失影子列的 `ADD COLUMN` 子句
    pub fn clauses(&self) -> Vec<String> {
        self.converters
            .iter()
            .filter(|c| c.is_shim())
            .filter(|c| {
                let present = self.table.has_column(c.name());
                if present {
                    debug!("影子列 {} 已存在，跳过", c.name());
                }
                !present
            })
            .filter_map(|c| {
                alias_expression(c).map(|expr| {
                    format!(
                        "ADD COLUMN IF NOT EXISTS {} {} ALIAS {}",
                        c.name(),
                        c.data_type(),
                        expr
                    )
                })
            })
            .collect()
    }

    pub fn build(&self) -> Option<String> {
        let clauses = self.clauses();
        if clauses.is_empty() {
            return None;
        }
        Some(format!(
            "ALTER TABLE {}{}\n{};",
            self.table.qualified_name(),
            on_cluster_clause(self.cluster),
            clauses.join(",\n")
        ))
    }
}

/// 影子列的 ALIAS 表达式，透传字段返回 None
pub fn alias_expression(converter: &FieldConverter) -> Option<String> {
    if !converter.is_shim() {
        return None;
    }
    let col = converter.origin_name();
    let origin_type = converter.origin_type();
    let sep = shim::SEPARATOR;

    let expr = if is_array_ipv6(origin_type) {
        format!(
            "arrayStringConcat(arrayMap(x -> {}, {col}), '{sep}')",
            ipv6_to_int("x")
        )
    } else if is_array_ipv4(origin_type) {
        format!("arrayStringConcat(arrayMap(x -> toString(toUInt32(x)), {col}), '{sep}')")
    } else if is_string_array(origin_type) {
        format!("arrayStringConcat({col}, '{sep}')")
    } else if is_array(origin_type) {
        format!("arrayStringConcat(arrayMap(x -> toString(x), {col}), '{sep}')")
    } else if is_ipv6(origin_type) {
        ipv6_to_int(col)
    } else if is_ipv4(origin_type) {
        format!("toUInt32({col})")
    } else {
        return None;
    };
    Some(expr)
}

/// IPv6 按大端读成 UInt128 后减去 2^127
fn ipv6_to_int(operand: &str) -> String {
    format!(
        "reinterpretAsUInt128(reverse(reinterpretAsFixedString({operand}))) - toUInt128('{}')",
        shim::IPV6_BIAS
    )
}
