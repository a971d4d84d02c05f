use crate::app::CliApp;
use anyhow::{Result, bail};
use cksr_core::executor::ConnectionSet;
use cksr_core::migrate::Migrator;
use tracing::info;

/// 对所有数据库对执行初始化，可重复运行
pub async fn run_init(app: &CliApp) -> Result<()> {
    info!("🚀 开始初始化迁移桥接...");
    let connections = ConnectionSet::open(&app.config)?;
    let result = Migrator::new(&app.config).run(connections.pairs()).await;
    connections.close_all().await;

    let stats = result?;
    let failed: usize = stats.iter().map(|s| s.failures.len()).sum();
    if failed > 0 {
        bail!("初始化结束，{} 张表处理失败，修复后可重新运行 init", failed);
    }
    let created = stats.iter().filter(|s| s.catalog_created).count();
    let tables: usize = stats.iter().map(|s| s.succeeded).sum();
    info!("✅ 初始化完成: 新建 Catalog {} 个, 处理表 {} 张", created, tables);
    Ok(())
}
