//! 手套中继服务主入口
//!
//! 接受 WebSocket 客户端，按设备名转发遥测，把弯曲传感器命令下发到设备。

mod config;
mod devices;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use config::{DeviceConfig, Overrides, RelayConfig};
use devices::DeviceHub;
use glove_relay::{DeviceRegistry, RelayRouter};
use server::{RelayServer, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// 手套中继服务
///
/// 网络客户端通过 WebSocket 订阅设备数据并下发弯曲传感器配置
#[derive(Parser, Debug)]
#[command(name = "glove-relay-host")]
#[command(about = "Glove relay - WebSocket access to OpenGlove devices", long_about = None)]
struct Args {
    /// WebSocket 监听地址
    ///
    /// 格式: IP:PORT
    /// 默认: 127.0.0.1:8181
    #[arg(long)]
    listen: Option<String>,

    /// TOML 配置文件路径（可选）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 设备（可重复）
    ///
    /// 格式: NAME=PORT (例如: GloveA=/dev/rfcomm0)
    #[arg(long = "device", value_name = "NAME=PORT")]
    devices: Vec<String>,

    /// 串口波特率
    ///
    /// 默认: 57600
    #[arg(long)]
    baud_rate: Option<u32>,

    /// 设备读取超时（毫秒）
    ///
    /// 默认: 50
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// 日志目录（可选，按天轮转）
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// 初始化日志：终端输出，指定目录时额外写入按天轮转的文件
fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("glove_relay_host=info".parse()?)
        .add_directive("glove_relay=info".parse()?)
        .add_directive("glove_driver=info".parse()?);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "glove-relay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// 启动信息：监听地址、实际生效的波特率、已连接设备
fn banner(listen: SocketAddr, config: &RelayConfig, devices: &[String]) -> Vec<String> {
    let mut lines = vec![
        format!("  Listen: ws://{}", listen),
        format!("  Baud rate: {}", config.baud_rate),
    ];
    lines.extend(devices.iter().map(|name| format!("  Device: {}", name)));
    lines
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.log_dir.as_deref())?;

    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    let devices = args
        .devices
        .iter()
        .map(|spec| DeviceConfig::parse_spec(spec))
        .collect::<Result<Vec<_>>>()?;
    config.apply(Overrides {
        listen: args.listen,
        baud_rate: args.baud_rate,
        read_timeout_ms: args.read_timeout_ms,
        devices,
    });
    config.validate()?;

    // Ctrl+C 优雅退出
    let is_running = Arc::new(AtomicBool::new(true));
    let running = is_running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        running.store(false, Ordering::Release);
    })
    .context("Failed to set signal handler")?;

    let registry = Arc::new(DeviceRegistry::new());
    let hub = Arc::new(DeviceHub::open_serial(&config, registry.clone()));
    if hub.len() < config.devices.len() {
        warn!(
            "{} of {} configured device(s) could not be opened",
            config.devices.len() - hub.len(),
            config.devices.len()
        );
    }
    if hub.is_empty() {
        warn!("No device connected, flexor commands will fail");
    }

    let router = Arc::new(RelayRouter::new(registry, hub.clone()));
    let server = RelayServer::bind(&config.listen, router, is_running, ServerConfig::default())?;

    eprintln!("Glove relay starting...");
    for line in banner(server.local_addr()?, &config, &hub.names()) {
        eprintln!("{}", line);
    }
    eprintln!("Glove relay started. Press Ctrl+C to stop.");

    server.run()?;

    hub.shutdown();
    info!("Glove relay stopped");
    Ok(())
}
