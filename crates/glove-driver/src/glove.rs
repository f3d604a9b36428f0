//! 手套命令句柄
//!
//! [`Glove`] 持有传输写端，把每个高层操作编码为线协议消息后写出。
//! 参数非法时返回 [`DriverError::Encoding`]，此时不会写入任何数据。

use crate::error::DriverError;
use crate::metrics::GloveMetrics;
use glove_protocol::{Command, Pin, WireMessage};
use glove_transport::{LineReader, LineWriter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// 手套命令句柄
///
/// 内部用 `Mutex` 串行化写入，可在多线程间共享（`Arc<Glove<W>>`）。
///
/// ```rust
/// use glove_driver::Glove;
/// use glove_transport::MockTransport;
///
/// let transport = MockTransport::new();
/// let glove = Glove::new("GloveA", transport.clone());
///
/// glove.add_flexor(3, 1).unwrap();
/// assert_eq!(transport.written(), vec!["10,3,1s".to_string()]);
/// ```
pub struct Glove<W> {
    name: String,
    transport: Mutex<W>,
    metrics: Arc<GloveMetrics>,
}

impl<W> Glove<W> {
    /// 设备名
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<GloveMetrics> {
        &self.metrics
    }
}

impl<W: LineWriter> Glove<W> {
    pub fn new(name: impl Into<String>, transport: W) -> Self {
        Self::with_metrics(name, transport, Arc::new(GloveMetrics::new()))
    }

    /// 与接收循环共享同一组指标
    pub fn with_metrics(name: impl Into<String>, transport: W, metrics: Arc<GloveMetrics>) -> Self {
        Self {
            name: name.into(),
            transport: Mutex::new(transport),
            metrics,
        }
    }

    /// 编码并发送一条命令
    pub fn send(&self, command: &Command) -> Result<(), DriverError> {
        debug!("{}: sending {}", self.name, command.name());
        let message = command.encode();
        let mut transport = self.transport.lock();
        self.write_locked(&mut *transport, &message)
    }

    /// 发送未经编码的原始字符串
    pub fn write_raw(&self, message: &str) -> Result<(), DriverError> {
        let mut transport = self.transport.lock();
        match transport.write(message) {
            Ok(()) => {
                self.metrics.tx_messages.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("{}: write failed: {}", self.name, e);
                Err(e.into())
            },
        }
    }

    fn write_locked(&self, transport: &mut W, message: &WireMessage) -> Result<(), DriverError> {
        match transport.write(message.as_str()) {
            Ok(()) => {
                self.metrics.tx_messages.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("{}: write of {:?} failed: {}", self.name, message.as_str(), e);
                Err(e.into())
            },
        }
    }

    // ==================== 马达 ====================

    /// 初始化马达引脚
    pub fn init_motors(&self, pins: &[Pin]) -> Result<(), DriverError> {
        self.send(&Command::init_motors(pins)?)
    }

    /// 激活马达（`"HIGH"`、`"LOW"` 或 `"0"`~`"255"`）
    pub fn activate_motors<S: AsRef<str>>(&self, pins: &[Pin], values: &[S]) -> Result<(), DriverError> {
        self.send(&Command::activate_motors(pins, values)?)
    }

    // ==================== 引脚 ====================

    pub fn pin_mode(&self, pin: Pin, mode: &str) -> Result<(), DriverError> {
        self.send(&Command::pin_mode(pin, mode)?)
    }

    pub fn pin_modes<S: AsRef<str>>(&self, pins: &[Pin], modes: &[S]) -> Result<(), DriverError> {
        self.send(&Command::pin_modes(pins, modes)?)
    }

    pub fn digital_write(&self, pin: Pin, value: &str) -> Result<(), DriverError> {
        self.send(&Command::digital_write(pin, value)?)
    }

    pub fn digital_writes<S: AsRef<str>>(&self, pins: &[Pin], values: &[S]) -> Result<(), DriverError> {
        self.send(&Command::digital_writes(pins, values)?)
    }

    pub fn analog_write(&self, pin: Pin, value: i32) -> Result<(), DriverError> {
        self.send(&Command::analog_write(pin, value))
    }

    pub fn analog_writes(&self, pins: &[Pin], values: &[i32]) -> Result<(), DriverError> {
        self.send(&Command::analog_writes(pins, values)?)
    }

    // ==================== 弯曲传感器 ====================

    /// 把引脚上的弯曲传感器映射到手部区域
    pub fn add_flexor(&self, pin: Pin, mapping: i32) -> Result<(), DriverError> {
        self.send(&Command::AddFlexor { pin, mapping })
    }

    pub fn remove_flexor(&self, mapping: i32) -> Result<(), DriverError> {
        self.send(&Command::RemoveFlexor { mapping })
    }

    /// 开始校准；用户完成动作后调用 [`Glove::confirm_calibration`]
    pub fn calibrate_flexors(&self) -> Result<(), DriverError> {
        self.send(&Command::CalibrateFlexors)
    }

    pub fn confirm_calibration(&self) -> Result<(), DriverError> {
        self.send(&Command::ConfirmCalibration)
    }

    pub fn set_threshold(&self, value: i32) -> Result<(), DriverError> {
        self.send(&Command::SetThreshold { value })
    }

    pub fn reset_flexors(&self) -> Result<(), DriverError> {
        self.send(&Command::ResetFlexors)
    }

    // ==================== IMU 与采样 ====================

    pub fn start_imu(&self) -> Result<(), DriverError> {
        self.send(&Command::StartImu)
    }

    pub fn set_imu_status(&self, status: i32) -> Result<(), DriverError> {
        self.send(&Command::SetImuStatus { status })
    }

    pub fn set_raw_data(&self, status: i32) -> Result<(), DriverError> {
        self.send(&Command::SetRawData { status })
    }

    pub fn set_loop_delay(&self, value: i32) -> Result<(), DriverError> {
        self.send(&Command::SetLoopDelay { value })
    }

    pub fn set_choosing_data(&self, value: i32) -> Result<(), DriverError> {
        self.send(&Command::SetChoosingData { value })
    }
}

impl<T: LineWriter + LineReader> Glove<T> {
    /// 发送读请求并阻塞等待一行响应
    ///
    /// 写入与读取在同一把锁内完成，避免并发请求交错。
    /// 传输同时被接收循环读取时不要使用。
    fn request(&self, command: &Command) -> Result<String, DriverError> {
        let message = command.encode();
        let mut transport = self.transport.lock();
        self.write_locked(&mut *transport, &message)?;
        let line = transport.read_line()?;
        self.metrics.rx_lines.fetch_add(1, Ordering::Relaxed);
        Ok(line)
    }

    /// 读取模拟引脚，返回固件响应的原始字符串
    pub fn analog_read(&self, pin: Pin) -> Result<String, DriverError> {
        self.request(&Command::AnalogRead { pin })
    }

    /// 读取数字引脚，返回固件响应的原始字符串
    pub fn digital_read(&self, pin: Pin) -> Result<String, DriverError> {
        self.request(&Command::DigitalRead { pin })
    }
}
