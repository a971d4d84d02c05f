use crate::app::CliApp;
use anyhow::{Result, bail};
use cksr_core::executor::ConnectionSet;
use cksr_core::rollback::{PairRollbackPlan, RollbackRunner};
use tracing::{info, warn};

fn print_plan(plan: &PairRollbackPlan) {
    info!("📋 数据库对 {}: {} 张表", plan.pair.name, plan.tables.len());
    for table in &plan.tables {
        if table.is_blocked() {
            warn!("  ⚠️  {} (目标端存在同名基表，跳过)", table);
            continue;
        }
        info!("  {}", table);
        for statement in table.statements(&plan.pair) {
            info!("    [{}] {}: {}", statement.engine, statement.step, statement.sql);
        }
    }
}

/// 回退全部数据库对，`dry_run` 时只输出计划
pub async fn run_rollback(app: &CliApp, dry_run: bool) -> Result<()> {
    let connections = ConnectionSet::open(&app.config)?;
    let runner = RollbackRunner::new(&app.config);

    if dry_run {
        info!("🔍 回退预演，不会执行任何语句");
        let result = runner.dry_run(connections.pairs()).await;
        connections.close_all().await;
        for plan in result? {
            print_plan(&plan);
        }
        return Ok(());
    }

    info!("⏪ 开始回退，策略: {}", app.config.rollback.strategy);
    let result = runner.run(connections.pairs()).await;
    connections.close_all().await;

    let report = result?;
    if report.aborted() {
        bail!("回退已中止，修复问题后可重新运行 rollback 继续");
    }
    if !report.is_success() {
        bail!(
            "回退结束: 成功 {} / {}，存在失败的表",
            report.succeeded(),
            report.total()
        );
    }
    info!("✅ 回退完成: {} 张表", report.total());
    Ok(())
}
