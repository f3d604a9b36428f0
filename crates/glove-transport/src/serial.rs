//! 串口传输
//!
//! 蓝牙 SPP 连接（如 `/dev/rfcomm0`、`COM5`）在系统中表现为串口，
//! 因此与有线 USB 串口共用同一实现。

use crate::{LineBuffer, LineReader, LineWriter, SplittableTransport, TransportError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{info, trace, warn};

/// 单次读取的缓冲大小
const READ_CHUNK: usize = 256;

/// 串口传输（读写一体）
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    lines: LineBuffer,
}

impl SerialTransport {
    /// 打开串口
    ///
    /// # 参数
    /// * `path` - 串口路径（如 `"/dev/rfcomm0"`）
    /// * `baud_rate` - 波特率（固件默认 57600）
    /// * `read_timeout` - `read_line` 单次等待时长
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            lines: LineBuffer::new(),
        })
    }

    /// 端口名（如果系统提供）
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

fn write_message(port: &mut dyn SerialPort, message: &str) -> Result<(), TransportError> {
    port.write_all(message.as_bytes())?;
    port.flush()?;
    trace!("serial TX: {}", message);
    Ok(())
}

fn read_line_from(
    port: &mut dyn SerialPort,
    lines: &mut LineBuffer,
) -> Result<String, TransportError> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(line) = lines.next_line() {
            return line;
        }
        match port.read(&mut chunk) {
            // serialport 在无数据时可能返回 0 而不是 TimedOut
            Ok(0) => return Err(TransportError::Timeout),
            Ok(n) => lines.push(&chunk[..n]),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Err(TransportError::Timeout);
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn apply_timeout(port: &mut dyn SerialPort, timeout: Duration) {
    if let Err(e) = port.set_timeout(timeout) {
        warn!("Failed to set serial read timeout: {}", e);
    }
}

impl LineWriter for SerialTransport {
    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        write_message(&mut *self.port, message)
    }
}

impl LineReader for SerialTransport {
    fn read_line(&mut self) -> Result<String, TransportError> {
        read_line_from(&mut *self.port, &mut self.lines)
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        apply_timeout(&mut *self.port, timeout);
    }
}

impl SplittableTransport for SerialTransport {
    type Reader = SerialReader;
    type Writer = SerialWriter;

    fn split(self) -> Result<(SerialReader, SerialWriter), TransportError> {
        let reader_port = self.port.try_clone()?;
        Ok((
            SerialReader {
                port: reader_port,
                lines: self.lines,
            },
            SerialWriter { port: self.port },
        ))
    }
}

/// 串口读端（接收循环持有）
pub struct SerialReader {
    port: Box<dyn SerialPort>,
    lines: LineBuffer,
}

impl LineReader for SerialReader {
    fn read_line(&mut self) -> Result<String, TransportError> {
        read_line_from(&mut *self.port, &mut self.lines)
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        apply_timeout(&mut *self.port, timeout);
    }
}

/// 串口写端（命令发送方持有）
pub struct SerialWriter {
    port: Box<dyn SerialPort>,
}

impl LineWriter for SerialWriter {
    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        write_message(&mut *self.port, message)
    }
}
