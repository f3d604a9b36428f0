//! Mock 传输（用于测试）
//!
//! 所有克隆共享同一组缓冲区：测试代码保留一个克隆用于注入上行数据和检查
//! 下行消息，另一个交给被测对象。

use crate::{LineBuffer, LineReader, LineWriter, SplittableTransport, TransportError};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Default)]
struct MockInner {
    incoming: LineBuffer,
    written: Vec<String>,
    closed: bool,
    fail_writes: bool,
}

struct Shared {
    inner: Mutex<MockInner>,
    readable: Condvar,
}

/// 内存传输
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
    read_timeout: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(MockInner::default()),
                readable: Condvar::new(),
            }),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// 注入一行上行数据（自动追加 `\n`）
    pub fn inject_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.inject_bytes(&bytes);
    }

    /// 注入原始字节（可以是部分行）
    pub fn inject_bytes(&self, bytes: &[u8]) {
        self.shared.inner.lock().incoming.push(bytes);
        self.shared.readable.notify_all();
    }

    /// 已写入的全部消息
    pub fn written(&self) -> Vec<String> {
        self.shared.inner.lock().written.clone()
    }

    /// 取出并清空已写入的消息
    pub fn take_written(&self) -> Vec<String> {
        std::mem::take(&mut self.shared.inner.lock().written)
    }

    /// 模拟对端关闭：后续读写返回 `Closed`
    pub fn close(&self) {
        self.shared.inner.lock().closed = true;
        self.shared.readable.notify_all();
    }

    /// 让后续写入失败（模拟链路断开前的写错误）
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.inner.lock().fail_writes = fail;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LineWriter for MockTransport {
    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        if inner.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        inner.written.push(message.to_string());
        Ok(())
    }
}

impl LineReader for MockTransport {
    fn read_line(&mut self) -> Result<String, TransportError> {
        let mut inner = self.shared.inner.lock();
        loop {
            if let Some(line) = inner.incoming.next_line() {
                return line;
            }
            if inner.closed {
                return Err(TransportError::Closed);
            }
            if self
                .shared
                .readable
                .wait_for(&mut inner, self.read_timeout)
                .timed_out()
            {
                return match inner.incoming.next_line() {
                    Some(line) => line,
                    None => Err(TransportError::Timeout),
                };
            }
        }
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl SplittableTransport for MockTransport {
    type Reader = MockTransport;
    type Writer = MockTransport;

    fn split(self) -> Result<(MockTransport, MockTransport), TransportError> {
        Ok((self.clone(), self))
    }
}
