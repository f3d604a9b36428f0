//! 设备侧：打开配置的手套，把遥测接到注册表，把弯曲传感器命令翻译为设备调用

use crate::config::RelayConfig;
use glove_driver::{GloveDevice, PipelineConfig, TelemetrySink};
use glove_protocol::RelayCommand;
use glove_relay::{DeviceCommandSink, DeviceRegistry, RelayError};
use glove_transport::{SerialTransport, SplittableTransport};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// 把遥测投递到设备注册表
pub struct RegistrySink(pub Arc<DeviceRegistry>);

impl TelemetrySink for RegistrySink {
    fn on_telemetry(&self, device: &str, line: &str) {
        self.0.route(device, line);
    }
}

/// 已连接的设备集合
pub struct DeviceHub<T: SplittableTransport> {
    devices: HashMap<String, GloveDevice<T>>,
}

impl<T: SplittableTransport> DeviceHub<T> {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// 连接一个设备并启动其接收线程
    pub fn connect(
        &mut self,
        name: &str,
        transport: T,
        sink: Arc<dyn TelemetrySink>,
        pipeline: PipelineConfig,
    ) -> Result<(), glove_driver::DriverError> {
        let device = GloveDevice::connect(name, transport, sink, pipeline)?;
        self.devices.insert(name.to_string(), device);
        Ok(())
    }

    /// 已连接的设备名（排序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// 停止全部接收线程
    pub fn shutdown(&self) {
        for device in self.devices.values() {
            device.shutdown();
        }
    }

    fn device(&self, name: &str) -> Result<&GloveDevice<T>, RelayError> {
        self.devices.get(name).ok_or_else(|| RelayError::Device {
            device: name.to_string(),
            message: "not connected".to_string(),
        })
    }
}

impl<T: SplittableTransport> Default for DeviceHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceHub<SerialTransport> {
    /// 打开配置中的全部串口设备
    ///
    /// 打开失败的设备记录错误后跳过，不做重连。
    pub fn open_serial(config: &RelayConfig, registry: Arc<DeviceRegistry>) -> Self {
        let sink: Arc<dyn TelemetrySink> = Arc::new(RegistrySink(registry));
        let timeout = Duration::from_millis(config.read_timeout_ms);
        let pipeline = PipelineConfig {
            receive_timeout_ms: config.read_timeout_ms,
        };

        let mut hub = Self::new();
        for device in &config.devices {
            let baud_rate = config.baud_rate_for(device);
            let result = SerialTransport::open(&device.port, baud_rate, timeout)
                .map_err(glove_driver::DriverError::from)
                .and_then(|transport| {
                    hub.connect(&device.name, transport, sink.clone(), pipeline.clone())
                });

            match result {
                Ok(()) => info!("{}: opened {} at {} baud", device.name, device.port, baud_rate),
                Err(e) => error!("{}: failed to open {}: {}", device.name, device.port, e),
            }
        }
        hub
    }
}

impl<T> DeviceCommandSink for DeviceHub<T>
where
    T: SplittableTransport,
    GloveDevice<T>: Send + Sync,
{
    fn execute(&self, command: &RelayCommand) -> Result<(), RelayError> {
        let device_error = |device: &str, e: glove_driver::DriverError| RelayError::Device {
            device: device.to_string(),
            message: e.to_string(),
        };

        match command {
            RelayCommand::AddFlexor {
                device,
                region,
                pin,
            } => self
                .device(device)?
                .add_flexor(*pin, *region)
                .map_err(|e| device_error(device, e)),
            RelayCommand::AddFlexors { device, flexors } => {
                let glove = self.device(device)?;
                for (region, pin) in flexors {
                    glove.add_flexor(*pin, *region).map_err(|e| device_error(device, e))?;
                }
                Ok(())
            },
            RelayCommand::RemoveFlexor { device, region } => self
                .device(device)?
                .remove_flexor(*region)
                .map_err(|e| device_error(device, e)),
            RelayCommand::RemoveFlexors { device, regions } => {
                let glove = self.device(device)?;
                for region in regions {
                    glove.remove_flexor(*region).map_err(|e| device_error(device, e))?;
                }
                Ok(())
            },
            other => {
                debug!("{}: no device action for {:?}", other.device(), other.action());
                Ok(())
            },
        }
    }
}
