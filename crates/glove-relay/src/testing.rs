//! 单元测试用的连接与设备侧替身

use crate::connection::{Connection, ConnectionId};
use crate::error::RelayError;
use crate::router::DeviceCommandSink;
use glove_protocol::RelayCommand;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 记录所有发送内容的连接
pub struct RecordingConnection {
    id: ConnectionId,
    sent: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingConnection {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(id),
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Connection for RecordingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, payload: &str) -> Result<(), RelayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::Send {
                id: self.id,
                message: "connection gone".to_string(),
            });
        }
        self.sent.lock().push(payload.to_string());
        Ok(())
    }
}

/// 记录收到的设备命令
#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<RelayCommand>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn commands(&self) -> Vec<RelayCommand> {
        self.commands.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl DeviceCommandSink for RecordingSink {
    fn execute(&self, command: &RelayCommand) -> Result<(), RelayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::Device {
                device: command.device().to_string(),
                message: "device offline".to_string(),
            });
        }
        self.commands.lock().push(command.clone());
        Ok(())
    }
}
