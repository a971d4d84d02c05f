use cksr_cli::{Cli, CliApp, EXIT_CONFIG_ERROR, exit_code_for, run_standalone, setup_logging};
use cksr_core::CksrError;
use cksr_core::config::AppConfig;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();
    let code = run(cli).await;
    // 日志 guard 已在 run 内释放，文件日志此时已刷盘
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    // 不依赖配置的命令
    if cli.command.is_standalone() {
        let _guard = setup_logging(cli.verbose, None);
        return match run_standalone(&cli.command, &cli.config).await {
            Ok(()) => 0,
            Err(e) => {
                error!("❌ 操作失败: {:#}", e);
                exit_code_for(&e)
            }
        };
    }

    let config = match AppConfig::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            let _guard = setup_logging(cli.verbose, None);
            if matches!(e, CksrError::ConfigNotFound(_)) {
                error!("❌ 配置文件 '{}' 未找到。", cli.config.display());
                error!("👉 请先运行 'cksr new-config' 命令来创建配置文件。");
            } else {
                error!("❌ 配置加载失败: {}", e);
            }
            return EXIT_CONFIG_ERROR;
        }
    };

    let _guard = setup_logging(cli.verbose, Some(&config.log));
    let app = CliApp::with_config_path(config, cli.config);
    match app.run_command(cli.command).await {
        Ok(()) => 0,
        Err(e) => {
            error!("❌ 操作失败: {:#}", e);
            exit_code_for(&e)
        }
    }
}
