use super::{Engine, Row, SqlExecutor};
use crate::error::{CksrError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// 按 SQL 片段返回预设结果的执行器，记录所有执行过的语句
pub(crate) struct ScriptedExecutor {
    engine: Engine,
    rules: Vec<(String, Vec<Row>)>,
    fail_on: Vec<String>,
    queries: Mutex<Vec<String>>,
    statements: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self::for_engine(Engine::StarRocks)
    }

    pub(crate) fn for_engine(engine: Engine) -> Self {
        Self {
            engine,
            rules: Vec::new(),
            fail_on: Vec::new(),
            queries: Mutex::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on_query(mut self, pattern: &str, rows: Vec<Row>) -> Self {
        self.rules.push((pattern.to_string(), rows));
        self
    }

    pub(crate) fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

pub(crate) fn row(values: &[&str]) -> Row {
    values.iter().map(|v| Some(v.to_string())).collect()
}

#[async_trait]
impl SqlExecutor for ScriptedExecutor {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.queries.lock().unwrap().push(sql.to_string());
        if self.fail_on.iter().any(|p| sql.contains(p.as_str())) {
            return Err(CksrError::custom(format!("scripted failure: {sql}")));
        }
        Ok(self
            .rules
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        self.statements.lock().unwrap().push(sql.to_string());
        if self.fail_on.iter().any(|p| sql.contains(p.as_str())) {
            return Err(CksrError::custom(format!("scripted failure: {sql}")));
        }
        Ok(())
    }
}
