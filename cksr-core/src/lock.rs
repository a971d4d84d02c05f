//! 多实例互斥：定时更新与手工回退不能同时运行
use crate::config::LockConfig;
use crate::error::{CksrError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 锁持有凭证，Drop 时释放
pub struct LockGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[async_trait]
pub trait LockManager: Send + Sync {
    async fn acquire(&self) -> Result<LockGuard>;

    async fn is_locked(&self) -> Result<bool>;
}

/// `<base>-<role>`，base 为空时使用默认身份
pub fn build_identity(base: &str, role: &str) -> String {
    let base = if base.trim().is_empty() {
        crate::constants::config::DEFAULT_LOCK_IDENTITY
    } else {
        base.trim()
    };
    if role.is_empty() {
        base.to_string()
    } else {
        format!("{base}-{role}")
    }
}

/// 按配置创建锁管理器，未启用时只做进程内互斥
pub fn lock_manager_from_config(config: &LockConfig, role: &str) -> Arc<dyn LockManager> {
    let identity = build_identity(&config.identity, role);
    if config.enabled {
        Arc::new(FileLockManager::new(
            &config.lock_file,
            identity,
            Duration::from_secs(config.lock_duration_seconds),
        ))
    } else {
        debug!("锁未启用，使用进程内锁: {}", identity);
        Arc::new(LocalLockManager::default())
    }
}

/// 进程内锁（调试模式）
#[derive(Default)]
pub struct LocalLockManager {
    locked: Arc<Mutex<bool>>,
}

#[async_trait]
impl LockManager for LocalLockManager {
    async fn acquire(&self) -> Result<LockGuard> {
        {
            let mut locked = self
                .locked
                .lock()
                .map_err(|_| CksrError::lock("进程内锁状态损坏"))?;
            if *locked {
                return Err(CksrError::lock("lock already held"));
            }
            *locked = true;
        }
        debug!("获取进程内锁成功");

        let state = Arc::clone(&self.locked);
        Ok(LockGuard::new(move || {
            if let Ok(mut locked) = state.lock() {
                *locked = false;
            }
            debug!("释放进程内锁");
        }))
    }

    async fn is_locked(&self) -> Result<bool> {
        self.locked
            .lock()
            .map(|locked| *locked)
            .map_err(|_| CksrError::lock("进程内锁状态损坏"))
    }
}

/// 锁文件内容
#[derive(Debug, Serialize, Deserialize)]
struct LockRecord {
    identity: String,
    acquired_at: DateTime<Utc>,
    token: Uuid,
}

/// 基于锁文件的跨进程互斥，持有超过租期视为过期可被接管
pub struct FileLockManager {
    path: PathBuf,
    identity: String,
    duration: Duration,
}

impl FileLockManager {
    pub fn new(path: impl AsRef<Path>, identity: impl Into<String>, duration: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            identity: identity.into(),
            duration,
        }
    }

    fn read_record(&self) -> Result<Option<LockRecord>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    warn!("锁文件 {} 内容无法识别，按过期处理: {}", self.path.display(), e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_expired(&self, record: &LockRecord) -> bool {
        let age = Utc::now().signed_duration_since(record.acquired_at);
        age.to_std().map(|age| age > self.duration).unwrap_or(false)
    }

    fn try_create(&self, record: &LockRecord) -> Result<bool> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                file.write_all(serde_json::to_string(record)?.as_bytes())?;
                file.sync_all()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl LockManager for FileLockManager {
    async fn acquire(&self) -> Result<LockGuard> {
        let record = LockRecord {
            identity: self.identity.clone(),
            acquired_at: Utc::now(),
            token: Uuid::new_v4(),
        };

        if !self.try_create(&record)? {
            match self.read_record()? {
                Some(holder) if !self.is_expired(&holder) => {
                    return Err(CksrError::lock(format!(
                        "锁 {} 已被 {} 持有 (获取于 {})",
                        self.path.display(),
                        holder.identity,
                        holder.acquired_at.format("%Y-%m-%d %H:%M:%S")
                    )));
                }
                holder => {
                    let previous = holder.map(|h| h.identity).unwrap_or_default();
                    warn!("锁 {} 已过期，接管原持有者 {}", self.path.display(), previous);
                    if let Err(e) = fs::remove_file(&self.path) {
                        if e.kind() != ErrorKind::NotFound {
                            return Err(e.into());
                        }
                    }
                    if !self.try_create(&record)? {
                        return Err(CksrError::lock(format!(
                            "接管锁 {} 时被其他实例抢先",
                            self.path.display()
                        )));
                    }
                }
            }
        }
        info!("{} 获取锁成功: {}", self.identity, self.path.display());

        let path = self.path.clone();
        let identity = self.identity.clone();
        let token = record.token;
        Ok(LockGuard::new(move || release_file_lock(&path, &identity, token)))
    }

    async fn is_locked(&self) -> Result<bool> {
        Ok(self
            .read_record()?
            .map(|record| !self.is_expired(&record))
            .unwrap_or(false))
    }
}

/// 只删除自己持有的锁文件，被接管后不再触碰
fn release_file_lock(path: &Path, identity: &str, token: Uuid) {
    let owned = fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<LockRecord>(&content).ok())
        .map(|record| record.token == token)
        .unwrap_or(false);
    if !owned {
        warn!("锁 {} 已不属于 {}，跳过释放", path.display(), identity);
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => info!("{} 释放锁: {}", identity, path.display()),
        Err(e) => warn!("释放锁 {} 失败: {}", path.display(), e),
    }
}
