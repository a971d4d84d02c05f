use crate::cli::Commands;
use crate::commands;
use anyhow::Result;
use cksr_core::CksrError;
use cksr_core::config::AppConfig;
use cksr_core::constants::lock::{ROLE_ROLLBACK, ROLE_UPDATER};
use cksr_core::lock::{LockManager, lock_manager_from_config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const EXIT_RUNTIME_ERROR: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// 按错误链中的 CksrError 判断退出码
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    let is_config_error = error
        .chain()
        .filter_map(|e| e.downcast_ref::<CksrError>())
        .any(CksrError::is_config_error);
    if is_config_error {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_RUNTIME_ERROR
    }
}

/// 执行不需要配置与连接的命令
pub async fn run_standalone(command: &Commands, config_path: &Path) -> Result<()> {
    match command {
        Commands::Inspect {
            ddl_file,
            target_ddl_file,
            catalog,
        } => commands::run_inspect(ddl_file, target_ddl_file.as_deref(), catalog).await,
        Commands::NewConfig { force } => commands::run_new_config(config_path, *force),
        Commands::Version => {
            commands::show_version();
            Ok(())
        }
        other => anyhow::bail!("命令 {:?} 需要先加载配置文件", other),
    }
}

pub struct CliApp {
    pub config: AppConfig,
    pub config_path: PathBuf,
    /// init/update/refresh 共用
    updater_lock: Arc<dyn LockManager>,
    rollback_lock: Arc<dyn LockManager>,
}

impl CliApp {
    pub fn new(config: AppConfig) -> Self {
        Self::with_config_path(config, cksr_core::constants::config::get_config_file_path())
    }

    pub fn with_config_path(config: AppConfig, config_path: PathBuf) -> Self {
        let updater_lock = lock_manager_from_config(&config.lock, ROLE_UPDATER);
        let rollback_lock = lock_manager_from_config(&config.lock, ROLE_ROLLBACK);
        Self {
            config,
            config_path,
            updater_lock,
            rollback_lock,
        }
    }

    /// 运行命令，涉及数据库的命令先获取实例锁
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        debug!("执行命令: {:?}", command);
        match command {
            Commands::Init => {
                let _lock = self.updater_lock.acquire().await?;
                commands::run_init(self).await
            }
            Commands::Update { pair, view, value } => {
                let _lock = self.updater_lock.acquire().await?;
                commands::run_update(self, &pair, &view, &value).await
            }
            Commands::Refresh => {
                let _lock = self.updater_lock.acquire().await?;
                commands::run_refresh(self).await
            }
            Commands::Rollback { dry_run } => {
                let _lock = self.rollback_lock.acquire().await?;
                commands::run_rollback(self, dry_run).await
            }
            other => run_standalone(&other, &self.config_path).await,
        }
    }
}
