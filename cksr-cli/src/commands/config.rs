use crate::project_info::get_full_version_string;
use anyhow::Result;
use cksr_core::config::AppConfig;
use std::path::Path;
use tracing::{info, warn};

/// 写出配置模板，已存在时需要 --force
pub fn run_new_config(path: &Path, force: bool) -> Result<()> {
    if AppConfig::write_template(path, force)? {
        info!("✅ 配置文件已生成: {}", path.display());
        info!("👉 请填写 database_pairs 中的连接信息后再运行 init");
    } else {
        warn!("⚠️  配置文件 {} 已存在，使用 --force 覆盖", path.display());
    }
    Ok(())
}

pub fn show_version() {
    println!("{}", get_full_version_string());
}
