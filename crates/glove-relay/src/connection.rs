//! 网络连接抽象
//!
//! 连接由服务端持有，注册表和路由器只保存 `Arc<dyn Connection>`。

use crate::error::RelayError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 连接 ID（进程内唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// 连接 ID 生成器
///
/// 单调递增，从 1 开始（0 保留为无效 ID）。
#[derive(Debug)]
pub struct ConnectionIdGenerator {
    next: AtomicU64,
}

impl ConnectionIdGenerator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// 可以接收文本消息的网络连接
///
/// `send` 可能在任意线程（包括设备接收线程）上调用，实现不应阻塞在 socket I/O 上。
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// 发送一条文本消息
    fn send(&self, payload: &str) -> Result<(), RelayError>;
}
