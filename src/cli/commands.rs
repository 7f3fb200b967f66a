//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::loader::DEFAULT_CONFIG_TEMPLATE;
use crate::config::{Config, ConfigLoader, TomlConfigLoader};
use crate::error::{ConfigError, RegistryError, Result};
use crate::monitor::{HistoryEntry, HttpProber, SweepReport, SweepScheduler};
use crate::notification::build_sinks;
use crate::store::{JsonFileStore, MonitorStore, Target};
use crate::web::{self, AppState};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置并应用命令行覆盖项
pub async fn load_config(args: &Args) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    let mut config = loader.load_or_default(args.get_config_path()).await?;

    if let Some(ref data_file) = args.data_file {
        config.monitor.data_file = data_file.clone();
    }
    if let Commands::Start {
        interval_ms, port, ..
    } = &args.command
    {
        if let Some(interval_ms) = interval_ms {
            config.monitor.check_interval_ms = *interval_ms;
        }
        if let Some(port) = port {
            config.web.port = *port;
        }
    }

    loader.validate(&config)?;
    Ok(config)
}

/// 按配置组装巡检调度器
pub fn build_scheduler(config: &Config, store: Arc<dyn MonitorStore>) -> Result<SweepScheduler> {
    let prober = Arc::new(HttpProber::new(config.monitor.request_timeout())?);
    let sinks = build_sinks(&config.alerts)?;
    Ok(SweepScheduler::new(prober, store, sinks, &config.monitor))
}

async fn open_store(config: &Config) -> Result<Arc<JsonFileStore>> {
    Ok(Arc::new(JsonFileStore::open(&config.monitor.data_file).await?))
}

/// 启动命令：运行巡检调度器和 Web API，直到收到 Ctrl+C
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Start { no_web, .. } = &args.command else {
            return Ok(());
        };

        info!("启动监控服务...");
        let config = load_config(args).await?;
        let store = open_store(&config).await?;
        let scheduler = Arc::new(build_scheduler(&config, store)?);

        let (shutdown_tx, scheduler_rx) = broadcast::channel(1);

        let web_handle = if config.web.enabled && !*no_web {
            let addr = config.web.socket_addr().map_err(ConfigError::ValidationError)?;
            let state = AppState::new(Arc::clone(&scheduler), config.monitor.history_page_size);
            let web_rx = shutdown_tx.subscribe();
            let web_shutdown_tx = shutdown_tx.clone();
            Some(tokio::spawn(async move {
                let result = web::serve(state, addr, web_rx).await;
                if let Err(ref e) = result {
                    error!("Web API 运行失败: {:#}", e);
                    let _ = web_shutdown_tx.send(());
                }
                result
            }))
        } else {
            info!("Web API 已禁用");
            None
        };

        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("收到中断信号，正在停止服务...");
                    let _ = signal_tx.send(());
                }
                Err(err) => error!("监听中断信号失败: {}", err),
            }
        });

        scheduler
            .run(scheduler_rx, config.monitor.run_on_start)
            .await;
        scheduler
            .flush_alerts(config.alerts.webhook_timeout())
            .await;

        if let Some(handle) = web_handle {
            match handle.await {
                Ok(result) => result?,
                Err(e) => return Err(anyhow::anyhow!("等待 Web API 退出失败: {e}").into()),
            }
        }

        info!("监控服务已停止");
        Ok(())
    }
}

/// 单次巡检命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { format } = &args.command {
            let config = load_config(args).await?;
            let store = open_store(&config).await?;
            let scheduler = build_scheduler(&config, store.clone())?;

            let report = scheduler.run_sweep().await;
            scheduler.flush_alerts(config.alerts.webhook_timeout()).await;
            let targets = store.list_targets().await;

            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({ "report": report, "targets": targets });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => print_report(&report, &targets),
            }
        }
        Ok(())
    }
}

fn print_report(report: &SweepReport, targets: &[Target]) {
    println!(
        "巡检完成: 目标 {}，正常 {}，异常 {}，告警 {}",
        report.probed, report.up, report.down, report.alerts
    );
    print_targets(targets);
    if !report.persisted {
        println!("⚠ 结果未能写入数据文件");
    }
}

fn print_targets(targets: &[Target]) {
    if targets.is_empty() {
        println!("没有注册任何目标");
        return;
    }

    println!("{:<38} {:<8} {:<20} URL", "ID", "状态", "名称");
    for target in targets {
        println!(
            "{:<38} {:<8} {:<20} {}",
            target.id,
            target.status.to_string(),
            target.name,
            target.url
        );
    }
}

/// 注册目标命令
pub struct AddCommand;

#[async_trait]
impl Command for AddCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Add { name, url } = &args.command {
            let config = load_config(args).await?;
            let store = open_store(&config).await?;
            let target = store.add_target(name, url).await?;
            println!("✓ 已注册目标 {} ({})", target.name, target.url);
            println!("  ID: {}", target.id);
        }
        Ok(())
    }
}

/// 删除目标命令
pub struct RemoveCommand;

#[async_trait]
impl Command for RemoveCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Remove { id } = &args.command {
            let config = load_config(args).await?;
            let store = open_store(&config).await?;
            if !store.remove_target(id).await? {
                return Err(RegistryError::NotFound(id.clone()).into());
            }
            println!("✓ 已删除目标 {}", id);
        }
        Ok(())
    }
}

/// 列出目标命令
pub struct ListCommand;

#[async_trait]
impl Command for ListCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::List { format } = &args.command {
            let config = load_config(args).await?;
            let store = open_store(&config).await?;
            let targets = store.list_targets().await;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
                OutputFormat::Text => print_targets(&targets),
            }
        }
        Ok(())
    }
}

/// 历史查询命令
pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::History { limit, format } = &args.command {
            let config = load_config(args).await?;
            let store = open_store(&config).await?;
            let limit = limit.unwrap_or(config.monitor.history_page_size);
            let history = store.recent_history(limit).await;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
                OutputFormat::Text => print_history(&history),
            }
        }
        Ok(())
    }
}

fn print_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        println!("暂无历史记录");
        return;
    }

    for entry in history {
        println!(
            "{} {:<38} {:<5} {}ms",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.target_id,
            entry.status.to_string(),
            entry.response_time
        );
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE).await?;

        println!("配置文件已创建: {}", config_path.display());
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { config_path } = &args.command {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            println!("验证配置文件: {}", config_file.display());
            let config = TomlConfigLoader::new(true)
                .load_from_file(&config_file)
                .await?;

            println!("✓ 配置文件验证通过");
            println!("  巡检间隔: {}ms", config.monitor.check_interval_ms);
            println!("  探测超时: {}ms", config.monitor.request_timeout_ms);
            println!("  历史上限: {}", config.monitor.history_limit);
            println!("  数据文件: {}", config.monitor.data_file.display());
            if config.web.enabled {
                println!("  Web API: {}:{}", config.web.bind_address, config.web.port);
            }
            if config.alerts.webhook_url.is_some() {
                println!("  告警 webhook: 已配置");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, MonitorError};
    use clap::Parser;
    use std::path::PathBuf;

    fn args(dir: &Path, rest: &[&str]) -> Args {
        let config = dir.join("heartbeat.toml");
        let data = dir.join("db.json");
        let mut argv = vec![
            "heartbeat-monitor".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--data-file".to_string(),
            data.display().to_string(),
        ];
        argv.extend(rest.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(
            dir.path(),
            &["start", "--interval-ms", "1500", "--port", "9000"],
        );

        let config = load_config(&args).await.unwrap();

        assert_eq!(config.monitor.check_interval_ms, 1500);
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.monitor.data_file, dir.path().join("db.json"));
    }

    #[tokio::test]
    async fn test_load_config_rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), &["start", "--interval-ms", "0"]);

        let err = load_config(&args).await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Config(ConfigError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_start_fails_when_web_port_is_taken() {
        let dir = tempfile::tempdir().unwrap();
        let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port().to_string();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            StartCommand.execute(&args(dir.path(), &["start", "--port", &port])),
        )
        .await
        .unwrap();

        assert!(result.is_err());
        drop(taken);
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let dir = tempfile::tempdir().unwrap();

        AddCommand
            .execute(&args(dir.path(), &["add", "Good", "http://good.test"]))
            .await
            .unwrap();

        let store = JsonFileStore::open(dir.path().join("db.json")).await.unwrap();
        let targets = store.list_targets().await;
        assert_eq!(targets.len(), 1);

        ListCommand
            .execute(&args(dir.path(), &["list", "--format", "json"]))
            .await
            .unwrap();

        RemoveCommand
            .execute(&args(dir.path(), &["remove", &targets[0].id]))
            .await
            .unwrap();
        let err = RemoveCommand
            .execute(&args(dir.path(), &["remove", &targets[0].id]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Registry(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = AddCommand
            .execute(&args(dir.path(), &["add", "x", "ftp://x.test"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Registry(RegistryError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_check_with_no_targets_persists() {
        let dir = tempfile::tempdir().unwrap();
        CheckCommand
            .execute(&args(dir.path(), &["check"]))
            .await
            .unwrap();
        assert!(dir.path().join("db.json").exists());

        HistoryCommand
            .execute(&args(dir.path(), &["history"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_init_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("heartbeat.toml");
        let path_str = path.display().to_string();

        InitCommand
            .execute(&args(dir.path(), &["init", &path_str]))
            .await
            .unwrap();
        assert!(path.exists());

        // 不带 --force 时不覆盖
        std::fs::write(&path, "[monitor]\nhistory_limit = 10\nhistory_page_size = 5\n").unwrap();
        InitCommand
            .execute(&args(dir.path(), &["init", &path_str]))
            .await
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("history_limit = 10"));

        ValidateCommand
            .execute(&args(dir.path(), &["validate", &path_str]))
            .await
            .unwrap();

        InitCommand
            .execute(&args(dir.path(), &["init", &path_str, "--force"]))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            DEFAULT_CONFIG_TEMPLATE
        );
    }

    #[tokio::test]
    async fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = PathBuf::from(dir.path()).join("missing.toml");
        let err = ValidateCommand
            .execute(&args(dir.path(), &["validate", &missing.display().to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
