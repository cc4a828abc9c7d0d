//! 试验机遥测守护进程
//!
//! 加载配置，构造 `RigContext`，启动广播循环，Ctrl+C 协作式退出。
//! 控制器传输层不在本仓库内，守护进程连接内存中的模拟控制器运行。

mod sink;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sink::LogSink;
use stiffrig_client::RigBuilder;
use stiffrig_protocol::HardwareProfile;
use stiffrig_session::SimulatedSession;
use stiffrig_tools::RigConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 试验机遥测守护进程
#[derive(Parser, Debug)]
#[command(name = "stiffrig-daemon")]
#[command(about = "Pipe stiffness rig telemetry daemon", long_about = None)]
struct Args {
    /// 配置文件（TOML），不指定时使用默认配置
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖控制器地址
    #[arg(long)]
    address: Option<String>,

    /// 覆盖控制器版本（servo / hmi-panel）
    #[arg(long)]
    profile: Option<HardwareProfile>,

    /// 覆盖广播周期（毫秒）
    #[arg(long)]
    tick_ms: Option<u64>,

    /// 每隔多少条实时数据输出一次摘要日志（0 = 不输出）
    #[arg(long, default_value = "50")]
    summary_every: u64,

    /// 模拟控制器以断连状态启动（验证重连流程）
    #[arg(long)]
    start_offline: bool,

    /// 打印生效的配置并退出
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Args) -> Result<RigConfig> {
    let mut config = match &args.config {
        Some(path) => RigConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RigConfig::default(),
    };

    if let Some(address) = &args.address {
        config.controller.address = address.clone();
    }
    if let Some(profile) = args.profile {
        config.controller.profile = profile;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.broadcast.tick_ms = tick_ms;
    }
    config.validate().context("Invalid configuration after overrides")?;
    Ok(config)
}

fn main() -> Result<()> {
    // 初始化日志
    let mut filter = EnvFilter::from_default_env();
    for directive in ["stiffrig_daemon=info", "stiffrig_client=info", "stiffrig_driver=info"] {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let session = if args.start_offline {
        SimulatedSession::disconnected(config.controller.address.clone())
    } else {
        SimulatedSession::new(config.controller.address.clone())
    };

    let rig = RigBuilder::new(session).config(config).build()?;
    rig.subscribe(Arc::new(LogSink::new(args.summary_every)));
    rig.start_broadcast()?;

    let running = rig.running_flag();
    ctrlc::set_handler({
        let running = running.clone();
        move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            running.store(false, Ordering::Release);
        }
    })
    .context("Failed to set signal handler")?;

    info!(
        "stiffrig-daemon started (controller: {}, profile: {}). Press Ctrl+C to stop.",
        rig.session().address(),
        rig.config().controller.profile.as_str()
    );

    while running.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(100));
    }

    // 退出前确保没有点动保持
    let outcome = rig.jog_relay().on_subscriber_lost();
    info!("Shutdown jog stop: {}", outcome);
    rig.stop_broadcast();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "stiffrig-daemon",
            "--address",
            "10.1.1.1",
            "--profile",
            "hmi-panel",
            "--tick-ms",
            "20",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.controller.address, "10.1.1.1");
        assert_eq!(config.controller.profile, HardwareProfile::HmiPanel);
        assert_eq!(config.broadcast.tick_ms, 20);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["stiffrig-daemon", "--tick-ms", "0"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_unknown_profile_rejected_by_parser() {
        assert!(Args::try_parse_from(["stiffrig-daemon", "--profile", "plc-v9"]).is_err());
    }
}
