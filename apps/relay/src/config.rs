//! 中继服务配置
//!
//! 启动时从 TOML 文件读取（只读），命令行参数覆盖文件中的值。
//!
//! ```toml
//! listen = "0.0.0.0:8181"
//! baud_rate = 57600
//! read_timeout_ms = 50
//!
//! [[devices]]
//! name = "GloveA"
//! port = "/dev/rfcomm0"
//!
//! [[devices]]
//! name = "GloveB"
//! port = "COM4"
//! baud_rate = 115200
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8181";
pub const DEFAULT_BAUD_RATE: u32 = 57600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

/// 单个手套设备
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// 客户端消息中使用的设备名
    pub name: String,
    /// 串口路径（蓝牙 SPP 链路同样表现为串口）
    pub port: String,
    /// 覆盖全局波特率
    #[serde(default)]
    pub baud_rate: Option<u32>,
}

impl DeviceConfig {
    /// 解析命令行 `NAME=PORT`
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let Some((name, port)) = spec.split_once('=') else {
            bail!("invalid device spec {:?}, expected NAME=PORT", spec);
        };
        let (name, port) = (name.trim(), port.trim());
        if name.is_empty() || port.is_empty() {
            bail!("invalid device spec {:?}, expected NAME=PORT", spec);
        }
        Ok(Self {
            name: name.to_string(),
            port: port.to_string(),
            baud_rate: None,
        })
    }
}

/// 中继服务配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// WebSocket 监听地址
    pub listen: String,
    /// 默认串口波特率
    pub baud_rate: u32,
    /// 设备读取超时（毫秒）
    pub read_timeout_ms: u64,
    pub devices: Vec<DeviceConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            devices: Vec::new(),
        }
    }
}

/// 命令行覆盖项（`None` 表示沿用文件或默认值）
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub baud_rate: Option<u32>,
    pub read_timeout_ms: Option<u64>,
    pub devices: Vec<DeviceConfig>,
}

impl RelayConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse relay config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// 应用命令行覆盖
    ///
    /// 同名设备由命令行条目替换，其余追加。
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(listen) = overrides.listen {
            self.listen = listen;
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(read_timeout_ms) = overrides.read_timeout_ms {
            self.read_timeout_ms = read_timeout_ms;
        }
        for device in overrides.devices {
            match self.devices.iter_mut().find(|d| d.name == device.name) {
                Some(existing) => *existing = device,
                None => self.devices.push(device),
            }
        }
    }

    /// 设备实际使用的波特率
    pub fn baud_rate_for(&self, device: &DeviceConfig) -> u32 {
        device.baud_rate.unwrap_or(self.baud_rate)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, device) in self.devices.iter().enumerate() {
            if self.devices[..i].iter().any(|d| d.name == device.name) {
                bail!("duplicate device name {:?}", device.name);
            }
        }
        if self.read_timeout_ms == 0 {
            bail!("read_timeout_ms must be greater than 0");
        }
        Ok(())
    }
}
