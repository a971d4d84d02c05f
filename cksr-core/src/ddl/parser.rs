use super::scanner::{WordScanner, unquote_identifier, unquote_literal};
use super::types::{DefaultKind, TableColumn, TableDefinition};
use crate::error::{CksrError, Result};
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// 解析 `SHOW CREATE TABLE` 输出的表结构，ClickHouse 与 StarRocks 两种方言通用
pub fn parse_table(ddl: &str) -> Result<TableDefinition> {
    parse_table_cancellable(ddl, &AtomicBool::new(false))
}

/// 在阻塞线程上解析 DDL，超时后返回 `ParseTimeout`
///
/// 超时会置位取消标志，工作线程在下一行检查到后立即退出，其结果被丢弃。
pub async fn parse_table_with_timeout(ddl: String, timeout: Duration) -> Result<TableDefinition> {
    parse_with_cancel_flag(ddl, timeout, Arc::new(AtomicBool::new(false))).await
}

pub(crate) async fn parse_with_cancel_flag(
    ddl: String,
    timeout: Duration,
    cancelled: Arc<AtomicBool>,
) -> Result<TableDefinition> {
    let flag = Arc::clone(&cancelled);
    let handle = tokio::task::spawn_blocking(move || parse_table_cancellable(&ddl, &flag));

    match tokio::time::timeout(timeout, handle).await {
        Ok(joined) => joined?,
        Err(_) => {
            cancelled.store(true, Ordering::Relaxed);
            warn!("DDL 解析超时 ({:?})，已通知解析线程退出", timeout);
            Err(CksrError::ParseTimeout(timeout))
        }
    }
}

pub(crate) fn parse_table_cancellable(ddl: &str, cancelled: &AtomicBool) -> Result<TableDefinition> {
    let create_table_regex = Regex::new(
        r"(?i)^\s*CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(.+)$",
    )
    .map_err(|e| CksrError::custom(format!("正则表达式编译失败: {e}")))?;

    let mut table_name: Option<(String, String)> = None;
    let mut columns = Vec::new();

    for line in ddl.lines() {
        if cancelled.load(Ordering::Relaxed) {
            return Err(CksrError::parse("解析已取消"));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }

        if table_name.is_none() {
            if let Some(caps) = create_table_regex.captures(trimmed) {
                table_name = Some(parse_qualified_name(&caps[1])?);
                continue;
            }
        }

        if trimmed.starts_with('`') {
            columns.push(parse_column(trimmed)?);
        }
    }

    let (db_name, name) =
        table_name.ok_or_else(|| CksrError::parse("未找到 CREATE TABLE 语句"))?;
    if columns.is_empty() {
        return Err(CksrError::parse(format!("表 {name} 未解析到任何字段")));
    }

    debug!("解析表 {}，共 {} 个字段", name, columns.len());
    Ok(TableDefinition {
        db_name,
        name,
        columns,
    })
}

/// 解析 `db.table`、`` `db`.`table` `` 或单独的表名，忽略其后的 `(`
fn parse_qualified_name(text: &str) -> Result<(String, String)> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut pos = 0;

    let first = read_identifier(&chars, &mut pos)?;
    if pos < chars.len() && chars[pos] == '.' {
        pos += 1;
        let second = read_identifier(&chars, &mut pos)?;
        return Ok((first, second));
    }
    Ok((String::new(), first))
}

fn read_identifier(chars: &[char], pos: &mut usize) -> Result<String> {
    let mut ident = String::new();
    if chars.get(*pos) == Some(&'`') {
        *pos += 1;
        while *pos < chars.len() && chars[*pos] != '`' {
            ident.push(chars[*pos]);
            *pos += 1;
        }
        if *pos >= chars.len() {
            return Err(CksrError::parse("表名反引号不匹配"));
        }
        *pos += 1;
    } else {
        while *pos < chars.len() {
            let ch = chars[*pos];
            if ch == '.' || ch == '(' || ch.is_whitespace() {
                break;
            }
            ident.push(ch);
            *pos += 1;
        }
    }
    if ident.is_empty() {
        return Err(CksrError::parse("表名为空"));
    }
    Ok(ident)
}

/// 解析一行字段定义：名称、类型，以及其后的 DEFAULT/NOT NULL/COMMENT 等子句
fn parse_column(line: &str) -> Result<TableColumn> {
    let mut scanner = WordScanner::new(line);

    let name = scanner
        .next_word()?
        .map(|w| unquote_identifier(&w))
        .ok_or_else(|| CksrError::parse(format!("字段定义为空: {line}")))?;
    let data_type = scanner
        .next_word()?
        .ok_or_else(|| CksrError::parse(format!("字段 {name} 缺少类型")))?;

    let mut column = TableColumn::new(name, data_type);

    while let Some(word) = scanner.next_word()? {
        if let Some(kind) = DefaultKind::from_keyword(&word) {
            column.default_kind = Some(kind);
            column.default_expr = scanner.next_word()?;
            continue;
        }
        match word.to_ascii_uppercase().as_str() {
            "NOT" => {
                if let Some(next) = scanner.next_word()? {
                    if next.eq_ignore_ascii_case("NULL") {
                        column.nullable = false;
                    }
                }
            }
            "NULL" => column.nullable = true,
            "COMMENT" => {
                column.comment = scanner.next_word()?.map(|w| unquote_literal(&w));
            }
            // CODEC/TTL/AUTO_INCREMENT 等子句与迁移无关
            _ => {}
        }
    }

    Ok(column)
}
