use crate::app::CliApp;
use anyhow::{Result, bail};
use cksr_core::executor::ConnectionSet;
use cksr_core::refresh::ViewUpdater;
use tracing::info;

/// 定时任务入口：按目标表当前最小值刷新所有视图
pub async fn run_refresh(app: &CliApp) -> Result<()> {
    info!("🔄 开始刷新视图边界...");
    let connections = ConnectionSet::open(&app.config)?;
    let result = ViewUpdater::new(&app.config).run(connections.pairs()).await;
    connections.close_all().await;

    let stats = result?;
    let failed: usize = stats.iter().map(|s| s.failures.len()).sum();
    let refreshed: usize = stats.iter().map(|s| s.refreshed.len()).sum();
    if failed > 0 {
        bail!("视图刷新结束: 成功 {}, 失败 {}", refreshed, failed);
    }
    info!("✅ 视图刷新完成: {} 个", refreshed);
    Ok(())
}
