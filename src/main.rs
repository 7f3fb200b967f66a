//! Heartbeat Monitor 主程序入口
//!
//! HTTP(S) 可用性监控工具

use anyhow::{Context, Result};
use clap::Parser;
use heartbeat_monitor::cli::args::{Args, Commands};
use heartbeat_monitor::cli::commands::{
    AddCommand, CheckCommand, Command, HistoryCommand, InitCommand, ListCommand, RemoveCommand,
    StartCommand, ValidateCommand,
};
use heartbeat_monitor::config::TomlConfigLoader;
use heartbeat_monitor::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig::new(resolve_log_level(&args).await)
        .with_format(args.log_format)
        .with_file(args.log_file.clone());

    let _logging_system =
        LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Heartbeat Monitor v{} 启动", heartbeat_monitor::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 命令行指定的日志级别优先，否则读取配置文件
async fn resolve_log_level(args: &Args) -> log::LevelFilter {
    if let Some(level) = args.log_level {
        return level.into();
    }

    match TomlConfigLoader::new(true)
        .load_or_default(args.get_config_path())
        .await
    {
        Ok(config) => LogConfig::from_level_str(&config.monitor.log_level).level,
        Err(_) => log::LevelFilter::Info,
    }
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let result = match &args.command {
        Commands::Start { .. } => StartCommand.execute(args).await,
        Commands::Check { .. } => CheckCommand.execute(args).await,
        Commands::Add { .. } => AddCommand.execute(args).await,
        Commands::Remove { .. } => RemoveCommand.execute(args).await,
        Commands::List { .. } => ListCommand.execute(args).await,
        Commands::History { .. } => HistoryCommand.execute(args).await,
        Commands::Init { .. } => InitCommand.execute(args).await,
        Commands::Validate { .. } => ValidateCommand.execute(args).await,
    };
    result.map_err(|e| anyhow::anyhow!(e))
}
