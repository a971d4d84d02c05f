use std::fmt;

/// 列默认值子句类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    Default,
    Materialized,
    Alias,
    Ephemeral,
}

impl DefaultKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "DEFAULT" => Some(Self::Default),
            "MATERIALIZED" => Some(Self::Materialized),
            "ALIAS" => Some(Self::Alias),
            "EPHEMERAL" => Some(Self::Ephemeral),
            _ => None,
        }
    }
}

impl fmt::Display for DefaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Default => "DEFAULT",
            Self::Materialized => "MATERIALIZED",
            Self::Alias => "ALIAS",
            Self::Ephemeral => "EPHEMERAL",
        };
        f.write_str(keyword)
    }
}

/// 表列定义
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    /// 仅在声明了 `NOT NULL` 时为 false
    pub nullable: bool,
    pub default_kind: Option<DefaultKind>,
    pub default_expr: Option<String>,
    pub comment: Option<String>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_kind: None,
            default_expr: None,
            comment: None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.default_kind == Some(DefaultKind::Materialized)
    }

    /// 声明了非空的 `DEFAULT <expr>`
    pub fn plain_default(&self) -> Option<&str> {
        match (self.default_kind, self.default_expr.as_deref()) {
            (Some(DefaultKind::Default), Some(expr)) if !expr.trim().is_empty() => Some(expr),
            _ => None,
        }
    }
}

/// 表定义
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub db_name: String,
    pub name: String,
    pub columns: Vec<TableColumn>,
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// `db.table`，库名为空时只返回表名
    pub fn qualified_name(&self) -> String {
        if self.db_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.db_name, self.name)
        }
    }
}
