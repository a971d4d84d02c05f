use crate::app::CliApp;
use anyhow::Result;
use cksr_core::CksrError;
use cksr_core::executor::ConnectionSet;
use cksr_core::refresh::ViewUpdater;
use tracing::{debug, info};

/// 用指定边界值更新单个视图
pub async fn run_update(app: &CliApp, pair: &str, view: &str, value: &str) -> Result<()> {
    let pair = app
        .config
        .pair_by_name(pair)
        .ok_or_else(|| CksrError::config_invalid(format!("未找到数据库对: {pair}")))?;

    info!("🔄 更新视图 {}.{} 的边界为 {}", pair.starrocks.database, view, value);
    let connections = ConnectionSet::open_one(&app.config, pair)?;
    let result = match connections.pairs().first() {
        Some(conn) => {
            ViewUpdater::new(&app.config)
                .update_view(conn, view, Some(value))
                .await
        }
        None => Err(CksrError::custom("连接集合为空")),
    };
    connections.close_all().await;

    let sql = result?;
    debug!("执行的语句:\n{}", sql);
    info!("✅ 视图 {} 更新完成", view);
    Ok(())
}
