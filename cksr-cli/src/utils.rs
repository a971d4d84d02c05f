use cksr_core::config::LogConfig;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// 设置后日志写入该文件，优先于配置中的 `log.enable_file_log`
pub const LOG_FILE_ENV: &str = "CKSR_LOG_FILE";

/// 日志级别：RUST_LOG > `-v` > 配置文件 > info
fn default_level(verbose: bool, log: Option<&LogConfig>) -> String {
    if verbose {
        return "debug".to_string();
    }
    log.map(|l| l.log_level.trim())
        .filter(|l| !l.is_empty())
        .unwrap_or("info")
        .to_string()
}

fn log_file_path(log: Option<&LogConfig>) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    log.filter(|l| l.enable_file_log)
        .map(|l| PathBuf::from(&l.log_file_path))
}

/// 初始化日志
///
/// 写文件时返回的 guard 需要保持到进程退出前，否则缓冲区中的日志会丢失。
pub fn setup_logging(verbose: bool, log: Option<&LogConfig>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, log)));

    if let Some(path) = log_file_path(log) {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cksr.log".into());

        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::never(dir, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!("无法创建日志目录 {}: {}，改为输出到终端", dir.display(), e);
            }
        }
    }

    // 终端输出：简洁格式，不显示时间和模块路径
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .compact()
        .init();
    None
}
