//! 使用内存中的两端模拟验证：重复初始化不产生新语句，初始化后回退恢复原状
use async_trait::async_trait;
use cksr_core::config::AppConfig;
use cksr_core::executor::{ConnectionSet, Engine, PairConnections, Row, SqlExecutor};
use cksr_core::migrate::Migrator;
use cksr_core::rollback::RollbackRunner;
use cksr_core::{CksrError, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CkColumn {
    name: String,
    data_type: String,
    alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SrObject {
    Table(Vec<(String, String, bool)>),
    View,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct World {
    ck_tables: BTreeMap<String, Vec<CkColumn>>,
    sr_objects: BTreeMap<String, SrObject>,
    catalogs: BTreeSet<String>,
}

impl World {
    fn seeded() -> Self {
        let ck = |cols: &[(&str, &str)]| {
            cols.iter()
                .map(|(n, t)| CkColumn {
                    name: n.to_string(),
                    data_type: t.to_string(),
                    alias: None,
                })
                .collect::<Vec<_>>()
        };
        let sr = |cols: &[(&str, &str, bool)]| {
            SrObject::Table(
                cols.iter()
                    .map(|(n, t, nullable)| (n.to_string(), t.to_string(), *nullable))
                    .collect(),
            )
        };

        let mut world = World::default();
        world.ck_tables.insert(
            "events".to_string(),
            ck(&[
                ("id", "UInt64"),
                ("ip", "IPv4"),
                ("tags", "Array(String)"),
                ("recordTimestamp", "Int64"),
            ]),
        );
        world
            .ck_tables
            .insert("plain".to_string(), ck(&[("id", "UInt64"), ("recordTimestamp", "Int64")]));
        world
            .ck_tables
            .insert("ck_only".to_string(), ck(&[("id", "UInt64")]));

        world.sr_objects.insert(
            "events".to_string(),
            sr(&[
                ("id", "bigint(20)", false),
                ("ip_int", "bigint(20)", true),
                ("tags", "ARRAY<varchar(65533)>", true),
                ("recordTimestamp", "bigint(20)", false),
            ]),
        );
        world.sr_objects.insert(
            "plain".to_string(),
            sr(&[("id", "bigint(20)", false), ("recordTimestamp", "bigint(20)", false)]),
        );
        world
    }

    fn ck_ddl(&self, table: &str) -> Option<String> {
        let columns = self.ck_tables.get(table)?;
        let body: Vec<String> = columns
            .iter()
            .map(|c| match &c.alias {
                Some(expr) => format!("    `{}` {} ALIAS {}", c.name, c.data_type, expr),
                None => format!("    `{}` {}", c.name, c.data_type),
            })
            .collect();
        Some(format!(
            "CREATE TABLE default.{table}\n(\n{}\n)\nENGINE = MergeTree\nORDER BY id",
            body.join(",\n")
        ))
    }

    fn sr_ddl(&self, table: &str) -> Option<String> {
        match self.sr_objects.get(table)? {
            SrObject::Table(columns) => {
                let body: Vec<String> = columns
                    .iter()
                    .map(|(n, t, nullable)| {
                        let null = if *nullable { "NULL" } else { "NOT NULL" };
                        format!("  `{n}` {t} {null} COMMENT \"\"")
                    })
                    .collect();
                Some(format!(
                    "CREATE TABLE `{table}` (\n{}\n) ENGINE=OLAP\nDUPLICATE KEY(`id`)",
                    body.join(",\n")
                ))
            }
            SrObject::View => None,
        }
    }
}

fn cell(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn capture(pattern: &str, sql: &str) -> Option<Vec<String>> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(sql)?;
    Some(
        caps.iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect(),
    )
}

fn unsupported(engine: Engine, sql: &str) -> CksrError {
    CksrError::custom(format!("{engine} 模拟不支持的语句: {sql}"))
}

struct FakeClickHouse {
    world: Arc<Mutex<World>>,
    statements: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SqlExecutor for FakeClickHouse {
    fn engine(&self) -> Engine {
        Engine::ClickHouse
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let world = self.world.lock().unwrap();
        if sql.contains("FROM system.tables") {
            return Ok(world
                .ck_tables
                .keys()
                .map(|t| vec![cell(t), cell("MergeTree")])
                .collect());
        }
        if sql.contains("FROM system.columns") {
            return Ok(world
                .ck_tables
                .iter()
                .flat_map(|(t, cols)| cols.iter().map(move |c| vec![cell(t), cell(&c.name)]))
                .collect());
        }
        if let Some(caps) = capture(r"^SHOW CREATE TABLE `[^`]+`\.`([^`]+)`$", sql) {
            return Ok(world.ck_ddl(&caps[0]).map(|ddl| vec![cell(&ddl)]).into_iter().collect());
        }
        Err(unsupported(self.engine(), sql))
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        self.statements.lock().unwrap().push(sql.to_string());
        let mut world = self.world.lock().unwrap();

        if let Some(caps) = capture(r"^ALTER TABLE default\.(\w+)\n", sql) {
            let add = Regex::new(r"ADD COLUMN IF NOT EXISTS (\S+) (\S+) ALIAS (.+?)[,;]?$").unwrap();
            let columns = world
                .ck_tables
                .get_mut(&caps[0])
                .ok_or_else(|| unsupported(Engine::ClickHouse, sql))?;
            for line in sql.lines().skip(1) {
                let clause = add.captures(line).ok_or_else(|| unsupported(Engine::ClickHouse, sql))?;
                if !columns.iter().any(|c| c.name == clause[1]) {
                    columns.push(CkColumn {
                        name: clause[1].to_string(),
                        data_type: clause[2].to_string(),
                        alias: Some(clause[3].to_string()),
                    });
                }
            }
            return Ok(());
        }
        if let Some(caps) = capture(
            r"^ALTER TABLE `default`\.`([^`]+)` DROP COLUMN IF EXISTS `([^`]+)`$",
            sql,
        ) {
            if let Some(columns) = world.ck_tables.get_mut(&caps[0]) {
                columns.retain(|c| c.name != caps[1]);
            }
            return Ok(());
        }
        Err(unsupported(self.engine(), sql))
    }
}

struct FakeStarRocks {
    world: Arc<Mutex<World>>,
    statements: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SqlExecutor for FakeStarRocks {
    fn engine(&self) -> Engine {
        Engine::StarRocks
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let world = self.world.lock().unwrap();
        if sql.contains("information_schema.tables") {
            return Ok(world
                .sr_objects
                .iter()
                .map(|(name, object)| {
                    let kind = match object {
                        SrObject::Table(_) => "BASE TABLE",
                        SrObject::View => "VIEW",
                    };
                    vec![cell(name), cell(kind)]
                })
                .collect());
        }
        if sql == "SHOW CATALOGS" {
            return Ok(world.catalogs.iter().map(|c| vec![cell(c)]).collect());
        }
        if let Some(caps) = capture(r"^SHOW CREATE TABLE `[^`]+`\.`([^`]+)`$", sql) {
            return Ok(world
                .sr_ddl(&caps[0])
                .map(|ddl| vec![cell(&caps[0]), cell(&ddl)])
                .into_iter()
                .collect());
        }
        // 目标表均为空表
        if sql.starts_with("select min(") {
            return Ok(vec![vec![None]]);
        }
        Err(unsupported(self.engine(), sql))
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        self.statements.lock().unwrap().push(sql.to_string());
        let mut world = self.world.lock().unwrap();

        if let Some(caps) = capture(r"^CREATE EXTERNAL CATALOG IF NOT EXISTS `([^`]+)`", sql) {
            world.catalogs.insert(caps[0].clone());
            return Ok(());
        }
        if let Some(caps) = capture(r"^DROP CATALOG IF EXISTS `([^`]+)`$", sql) {
            world.catalogs.remove(&caps[0]);
            return Ok(());
        }
        if let Some(caps) = capture(r"^ALTER TABLE `default`\.`([^`]+)` RENAME `([^`]+)`$", sql) {
            if world.sr_objects.contains_key(&caps[1]) {
                return Err(CksrError::custom(format!("表 {} 已存在", caps[1])));
            }
            let object = world
                .sr_objects
                .remove(&caps[0])
                .ok_or_else(|| CksrError::custom(format!("表 {} 不存在", caps[0])))?;
            world.sr_objects.insert(caps[1].clone(), object);
            return Ok(());
        }
        if let Some(caps) = capture(r"^create view if not exists `default`\.`([^`]+)` as", sql) {
            world.sr_objects.entry(caps[0].clone()).or_insert(SrObject::View);
            return Ok(());
        }
        if let Some(caps) = capture(r"^DROP VIEW IF EXISTS `default`\.`([^`]+)`$", sql) {
            if world.sr_objects.get(&caps[0]) == Some(&SrObject::View) {
                world.sr_objects.remove(&caps[0]);
            }
            return Ok(());
        }
        Err(unsupported(self.engine(), sql))
    }
}

struct Harness {
    config: AppConfig,
    world: Arc<Mutex<World>>,
    statements: Arc<Mutex<Vec<String>>>,
    connections: ConnectionSet,
}

impl Harness {
    fn new() -> Self {
        let config = AppConfig::from_toml_str(AppConfig::template()).unwrap();
        let world = Arc::new(Mutex::new(World::seeded()));
        let statements = Arc::new(Mutex::new(Vec::new()));
        let conn = PairConnections::with_executors(
            config.database_pairs[0].clone(),
            Arc::new(FakeClickHouse {
                world: world.clone(),
                statements: statements.clone(),
            }),
            Arc::new(FakeStarRocks {
                world: world.clone(),
                statements: statements.clone(),
            }),
        );
        Self {
            config,
            world,
            statements,
            connections: ConnectionSet::from_pairs(vec![conn]),
        }
    }

    fn snapshot(&self) -> World {
        self.world.lock().unwrap().clone()
    }

    fn take_statements(&self) -> Vec<String> {
        std::mem::take(&mut *self.statements.lock().unwrap())
    }
}

#[tokio::test]
async fn init_twice_emits_nothing_the_second_time() {
    let harness = Harness::new();
    let migrator = Migrator::new(&harness.config);

    let first = migrator.run(harness.connections.pairs()).await.unwrap();
    assert!(first.iter().all(|s| s.is_success()));
    assert_eq!(first[0].succeeded, 2);
    let statements = harness.take_statements();
    // catalog + events(加列、改名、建视图) + plain(改名、建视图)
    assert_eq!(statements.len(), 6, "{statements:#?}");

    let world = harness.snapshot();
    assert_eq!(world.sr_objects.get("events"), Some(&SrObject::View));
    assert!(matches!(world.sr_objects.get("events_sr"), Some(SrObject::Table(_))));
    assert!(world.ck_tables["events"].iter().any(|c| c.name == "ip_TmpSrConverter"));

    let second = migrator.run(harness.connections.pairs()).await.unwrap();
    assert_eq!(second[0].total, 0);
    assert!(harness.take_statements().is_empty());
    assert_eq!(harness.snapshot(), world);
}

#[tokio::test]
async fn init_then_rollback_restores_original_schema() {
    let harness = Harness::new();
    let before = harness.snapshot();

    Migrator::new(&harness.config)
        .run(harness.connections.pairs())
        .await
        .unwrap();
    assert_ne!(harness.snapshot(), before);

    let report = RollbackRunner::new(&harness.config)
        .run(harness.connections.pairs())
        .await
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.total(), 2);
    assert_eq!(report.dropped_catalogs, vec!["clickhouse_catalog".to_string()]);

    assert_eq!(harness.snapshot(), before);
}

#[tokio::test]
async fn rollback_resumes_partially_migrated_table() {
    let harness = Harness::new();
    let before = harness.snapshot();

    // 模拟中断：只加了影子列，目标端尚未改名
    {
        let mut world = harness.world.lock().unwrap();
        world.ck_tables.get_mut("events").unwrap().push(CkColumn {
            name: "ip_TmpSrConverter".to_string(),
            data_type: "UInt32".to_string(),
            alias: Some("toUInt32(ip)".to_string()),
        });
    }

    let runner = RollbackRunner::new(&harness.config);
    let plans = runner.dry_run(harness.connections.pairs()).await.unwrap();
    assert_eq!(plans[0].tables.len(), 1);
    assert!(!plans[0].tables[0].need_rename);
    assert!(harness.take_statements().is_empty());

    let report = runner.run(harness.connections.pairs()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(harness.snapshot(), before);
}
