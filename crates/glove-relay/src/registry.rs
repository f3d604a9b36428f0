//! 设备注册表
//!
//! 维护 `设备名 → 订阅连接` 映射。每个设备同一时刻最多一个订阅者，
//! 后订阅者覆盖先订阅者。所有操作在同一把锁下互斥；`route` 在锁内只克隆
//! 连接句柄，发送在锁外进行，不会因慢连接阻塞其他操作。

use crate::connection::{Connection, ConnectionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// 设备注册表
#[derive(Default)]
pub struct DeviceRegistry {
    subscribers: Mutex<HashMap<String, Arc<dyn Connection>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅设备数据（覆盖已有订阅）
    ///
    /// # 返回
    /// 被覆盖的旧订阅者 ID（如果有）
    pub fn subscribe(&self, device: &str, connection: Arc<dyn Connection>) -> Option<ConnectionId> {
        let id = connection.id();
        let previous = self
            .subscribers
            .lock()
            .insert(device.to_string(), connection)
            .map(|old| old.id());

        match previous {
            Some(old) if old != id => debug!("{}: subscriber {} replaced by {}", device, old, id),
            _ => debug!("{}: subscribed by {}", device, id),
        }
        previous
    }

    /// 取消订阅（设备未订阅时为空操作）
    ///
    /// # 返回
    /// 是否确实移除了订阅
    pub fn unsubscribe(&self, device: &str) -> bool {
        let removed = self.subscribers.lock().remove(device);
        if let Some(connection) = &removed {
            debug!("{}: unsubscribed ({})", device, connection.id());
        }
        removed.is_some()
    }

    /// 把设备数据投递给订阅者
    ///
    /// 无订阅者时直接丢弃（不缓存）。
    ///
    /// # 返回
    /// 是否成功投递
    pub fn route(&self, device: &str, payload: &str) -> bool {
        // 锁内只克隆句柄
        let connection = self.subscribers.lock().get(device).cloned();

        let Some(connection) = connection else {
            trace!("{}: no subscriber, dropping {:?}", device, payload);
            return false;
        };

        match connection.send(payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}: delivery to {} failed: {}", device, connection.id(), e);
                false
            },
        }
    }

    /// 移除指向某连接的全部订阅
    ///
    /// # 返回
    /// 被移除订阅的设备名
    pub fn remove_connection(&self, id: ConnectionId) -> Vec<String> {
        let mut removed = Vec::new();
        self.subscribers.lock().retain(|device, connection| {
            if connection.id() == id {
                removed.push(device.clone());
                false
            } else {
                true
            }
        });

        if !removed.is_empty() {
            debug!("{}: removed subscriptions {:?}", id, removed);
        }
        removed
    }

    /// 设备当前订阅者
    pub fn subscriber(&self, device: &str) -> Option<ConnectionId> {
        self.subscribers.lock().get(device).map(|c| c.id())
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// 已订阅的设备名（排序）
    pub fn devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self.subscribers.lock().keys().cloned().collect();
        devices.sort();
        devices
    }
}
