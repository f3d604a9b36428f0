//! 中继路由器
//!
//! 连接生命周期：`on_open` → 多次 `handle_message` → `on_close`。
//!
//! | 命令 | 动作 |
//! |---|---|
//! | `StartCaptureData` | 订阅设备数据 |
//! | `StopCaptureData` | 取消订阅 |
//! | 弯曲传感器命令 | 转发给 [`DeviceCommandSink`] |
//! | `ActivateActuators` | 只记录日志 |
//! | 未知动作码 | 回显 `"You said: " + 原始消息` |
//!
//! 单条消息出错只影响该消息本身，不影响连接和其他连接。

use crate::connection::{Connection, ConnectionId};
use crate::error::RelayError;
use crate::registry::DeviceRegistry;
use glove_protocol::{ECHO_PREFIX, RelayCommand, parse_relay_command};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 设备侧命令执行者
///
/// 路由器只把弯曲传感器命令交给它，由实现者翻译为设备调用。
pub trait DeviceCommandSink: Send + Sync {
    fn execute(&self, command: &RelayCommand) -> Result<(), RelayError>;
}

/// 不连接任何设备的执行者，只记录日志
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDeviceSink;

impl DeviceCommandSink for NullDeviceSink {
    fn execute(&self, command: &RelayCommand) -> Result<(), RelayError> {
        debug!("{}: no device attached, ignoring {:?}", command.device(), command.action());
        Ok(())
    }
}

/// 单条消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 订阅了设备数据
    Subscribed { device: String },
    /// 取消了订阅（`removed` 为 `false` 表示本来就未订阅）
    Unsubscribed { device: String, removed: bool },
    /// 已转发给设备侧
    Forwarded { device: String },
    /// 已解析但不执行
    Ignored { device: String },
    /// 已回显
    Echoed,
}

/// 中继路由器
pub struct RelayRouter {
    registry: Arc<DeviceRegistry>,
    sink: Arc<dyn DeviceCommandSink>,
    connections: Mutex<HashMap<ConnectionId, Arc<dyn Connection>>>,
}

impl RelayRouter {
    pub fn new(registry: Arc<DeviceRegistry>, sink: Arc<dyn DeviceCommandSink>) -> Self {
        Self {
            registry,
            sink,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// 连接建立
    pub fn on_open(&self, connection: Arc<dyn Connection>) {
        let id = connection.id();
        self.connections.lock().insert(id, connection);
        info!("{} opened", id);
    }

    /// 处理一条入站文本消息
    ///
    /// 解析失败时消息被丢弃，注册表不变。
    pub fn handle_message(&self, id: ConnectionId, text: &str) -> Result<Dispatch, RelayError> {
        let connection = self
            .connections
            .lock()
            .get(&id)
            .cloned()
            .ok_or(RelayError::NotOpen { id })?;

        let command = parse_relay_command(text).inspect_err(|e| {
            warn!("{}: discarding malformed message {:?}: {}", id, text, e);
        })?;

        match command {
            RelayCommand::StartCaptureData { device } => {
                // 持有连接表锁完成订阅，与 on_close 互斥
                let connections = self.connections.lock();
                if !connections.contains_key(&id) {
                    return Err(RelayError::NotOpen { id });
                }
                self.registry.subscribe(&device, connection);
                drop(connections);
                Ok(Dispatch::Subscribed { device })
            },
            RelayCommand::StopCaptureData { device } => {
                let removed = self.registry.unsubscribe(&device);
                Ok(Dispatch::Unsubscribed { device, removed })
            },
            RelayCommand::ActivateActuators {
                device,
                regions,
                intensities,
            } => {
                debug!(
                    "{}: ActivateActuators for {} ignored (regions={:?}, intensities={:?})",
                    id, device, regions, intensities
                );
                Ok(Dispatch::Ignored { device })
            },
            RelayCommand::Unknown { action, .. } => {
                debug!("{}: unknown action {}, echoing", id, action);
                connection.send(&format!("{}{}", ECHO_PREFIX, text))?;
                Ok(Dispatch::Echoed)
            },
            command => {
                let device = command.device().to_string();
                self.sink.execute(&command).inspect_err(|e| {
                    warn!("{}: device command for {} failed: {}", id, device, e);
                })?;
                Ok(Dispatch::Forwarded { device })
            },
        }
    }

    /// 连接关闭，清理其全部订阅
    ///
    /// 可重复调用，清理只执行一次。清理在连接表中移除之后进行，
    /// 并发的订阅要么先完成并被清理，要么看到连接已关闭。
    ///
    /// # 返回
    /// 本次调用是否执行了清理
    pub fn on_close(&self, id: ConnectionId) -> bool {
        if self.connections.lock().remove(&id).is_none() {
            return false;
        }
        let removed = self.registry.remove_connection(id);
        info!("{} closed, released {} subscription(s)", id, removed.len());
        true
    }

    /// 设备遥测入口
    pub fn route_telemetry(&self, device: &str, payload: &str) -> bool {
        self.registry.route(device, payload)
    }

    /// 当前打开的连接数
    pub fn open_connections(&self) -> usize {
        self.connections.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingConnection, RecordingSink};
    use glove_protocol::ParseError;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn setup() -> (RelayRouter, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let router = RelayRouter::new(Arc::new(DeviceRegistry::new()), sink.clone());
        (router, sink)
    }

    #[test]
    fn test_subscribe_then_receive_telemetry() {
        let (router, _sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());

        let dispatch = router.handle_message(conn.id(), "1;GloveA").unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Subscribed {
                device: "GloveA".to_string()
            }
        );

        assert!(router.route_telemetry("GloveA", "f,3,512"));
        assert!(!router.route_telemetry("GloveB", "f,3,512"));
        assert_eq!(conn.sent(), vec!["f,3,512".to_string()]);
    }

    #[test]
    fn test_stop_capture() {
        let (router, _sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());

        router.handle_message(conn.id(), "1;GloveA").unwrap();
        let dispatch = router.handle_message(conn.id(), "2;GloveA").unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Unsubscribed {
                device: "GloveA".to_string(),
                removed: true
            }
        );
        assert!(router.registry().is_empty());
        assert!(!router.route_telemetry("GloveA", "43"));
        assert!(conn.sent().is_empty());

        // 未订阅时取消为空操作
        let dispatch = router.handle_message(conn.id(), "2;GloveA").unwrap();
        assert!(matches!(dispatch, Dispatch::Unsubscribed { removed: false, .. }));
    }

    #[test]
    fn test_unknown_action_echoes() {
        let (router, sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());

        let dispatch = router.handle_message(conn.id(), "99;GloveA").unwrap();
        assert_eq!(dispatch, Dispatch::Echoed);
        assert_eq!(conn.sent(), vec!["You said: 99;GloveA".to_string()]);
        assert!(sink.commands().is_empty());
        assert!(router.registry().is_empty());
    }

    #[test]
    fn test_flexor_commands_forwarded() {
        let (router, sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());

        router.handle_message(conn.id(), "10;GloveA;3;14").unwrap();
        router.handle_message(conn.id(), "11;GloveA;1,2;15,16").unwrap();
        router.handle_message(conn.id(), "12;GloveA;3").unwrap();
        router.handle_message(conn.id(), "13;GloveA;1,2").unwrap();

        assert_eq!(
            sink.commands(),
            vec![
                RelayCommand::AddFlexor {
                    device: "GloveA".to_string(),
                    region: 3,
                    pin: 14
                },
                RelayCommand::AddFlexors {
                    device: "GloveA".to_string(),
                    flexors: vec![(1, 15), (2, 16)]
                },
                RelayCommand::RemoveFlexor {
                    device: "GloveA".to_string(),
                    region: 3
                },
                RelayCommand::RemoveFlexors {
                    device: "GloveA".to_string(),
                    regions: vec![1, 2]
                },
            ]
        );
        assert!(conn.sent().is_empty());
    }

    #[test]
    fn test_activate_actuators_is_ignored() {
        let (router, sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());

        let dispatch = router.handle_message(conn.id(), "20;GloveA;1,2;HIGH,128").unwrap();
        assert!(matches!(dispatch, Dispatch::Ignored { .. }));
        assert!(sink.commands().is_empty());
        assert!(conn.sent().is_empty());
    }

    #[test]
    fn test_malformed_message_leaves_state() {
        let (router, _sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());
        router.handle_message(conn.id(), "1;GloveA").unwrap();

        let err = router.handle_message(conn.id(), "abc;GloveB").unwrap_err();
        assert!(matches!(err, RelayError::Parse(ParseError::InvalidAction { .. })));

        let err = router.handle_message(conn.id(), "1").unwrap_err();
        assert!(matches!(err, RelayError::Parse(ParseError::FieldCount { count: 1 })));

        assert_eq!(router.registry().devices(), vec!["GloveA".to_string()]);
        assert!(conn.sent().is_empty());
    }

    #[test]
    fn test_device_failure_is_isolated() {
        let (router, sink) = setup();
        let a = RecordingConnection::new(1);
        let b = RecordingConnection::new(2);
        router.on_open(a.clone());
        router.on_open(b.clone());

        sink.set_fail(true);
        let err = router.handle_message(a.id(), "10;GloveA;3;14").unwrap_err();
        assert!(matches!(err, RelayError::Device { .. }));

        sink.set_fail(false);
        router.handle_message(b.id(), "10;GloveA;3;14").unwrap();
        assert_eq!(sink.commands().len(), 1);
        assert_eq!(router.open_connections(), 2);
    }

    #[test]
    fn test_close_cleanup_runs_once() {
        let (router, _sink) = setup();
        let a = RecordingConnection::new(1);
        let b = RecordingConnection::new(2);
        router.on_open(a.clone());
        router.on_open(b.clone());

        router.handle_message(a.id(), "1;GloveA").unwrap();
        router.handle_message(a.id(), "1;GloveB").unwrap();
        router.handle_message(b.id(), "1;GloveC").unwrap();

        assert!(router.on_close(a.id()));
        assert!(!router.on_close(a.id()));
        assert_eq!(router.registry().devices(), vec!["GloveC".to_string()]);
        assert_eq!(router.open_connections(), 1);
    }

    #[test]
    fn test_closed_connection_rejected() {
        let (router, _sink) = setup();
        let conn = RecordingConnection::new(1);
        router.on_open(conn.clone());
        router.on_close(conn.id());

        let err = router.handle_message(conn.id(), "1;GloveA").unwrap_err();
        assert!(matches!(err, RelayError::NotOpen { .. }));
        assert!(router.registry().is_empty());
    }

    /// `id()` 第二次被调用（订阅内部）时停住，直到测试放行
    struct GatedConnection {
        calls: AtomicUsize,
        entered: Barrier,
        release: Barrier,
    }

    impl Connection for GatedConnection {
        fn id(&self) -> ConnectionId {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                self.entered.wait();
                self.release.wait();
            }
            ConnectionId::new(7)
        }

        fn send(&self, _payload: &str) -> Result<(), RelayError> {
            Ok(())
        }
    }

    #[test]
    fn test_close_during_subscribe_leaves_no_entry() {
        let (router, _sink) = setup();
        let router = Arc::new(router);
        let conn = Arc::new(GatedConnection {
            calls: AtomicUsize::new(0),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        });
        router.on_open(conn.clone());
        let id = ConnectionId::new(7);

        let subscriber = {
            let router = router.clone();
            thread::spawn(move || router.handle_message(id, "1;GloveA"))
        };
        conn.entered.wait();

        let closer = {
            let router = router.clone();
            thread::spawn(move || router.on_close(id))
        };
        thread::sleep(Duration::from_millis(20));
        conn.release.wait();

        let dispatch = subscriber.join().unwrap().unwrap();
        assert!(matches!(dispatch, Dispatch::Subscribed { .. }));
        assert!(closer.join().unwrap());

        assert_eq!(router.open_connections(), 0);
        assert_eq!(router.registry().subscriber("GloveA"), None);
        assert!(router.registry().is_empty());
    }

    #[test]
    fn test_resubscribe_overrides_other_connection() {
        let (router, _sink) = setup();
        let a = RecordingConnection::new(1);
        let b = RecordingConnection::new(2);
        router.on_open(a.clone());
        router.on_open(b.clone());

        router.handle_message(a.id(), "1;GloveA").unwrap();
        router.handle_message(b.id(), "1;GloveA").unwrap();

        // a 关闭不影响 b 的订阅
        router.on_close(a.id());
        assert_eq!(router.registry().subscriber("GloveA"), Some(b.id()));
    }
}
