//! 注册表并发与模型一致性测试

use glove_relay::{Connection, ConnectionId, DeviceRegistry, RelayError};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

struct CountingConnection {
    id: ConnectionId,
    received: Mutex<Vec<String>>,
}

impl CountingConnection {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(id),
            received: Mutex::new(Vec::new()),
        })
    }
}

impl Connection for CountingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, payload: &str) -> Result<(), RelayError> {
        self.received.lock().push(payload.to_string());
        Ok(())
    }
}

/// 多线程同时订阅、路由、取消订阅，不应死锁或丢失一致性
#[test]
fn test_concurrent_subscribe_route_unsubscribe() {
    let registry = Arc::new(DeviceRegistry::new());
    let connections: Vec<_> = (1..=8).map(CountingConnection::new).collect();

    let handles: Vec<_> = connections
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, conn)| {
            let registry = registry.clone();
            thread::spawn(move || {
                let own = format!("Glove{}", i);
                registry.subscribe(&own, conn.clone());
                for n in 0..200 {
                    registry.subscribe("Shared", conn.clone());
                    registry.route(&own, &n.to_string());
                    registry.route("Shared", "shared");
                    if n % 3 == 0 {
                        registry.unsubscribe("Shared");
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // 每个连接的专属设备数据全部按序到达
    for conn in &connections {
        let own: Vec<String> = conn
            .received
            .lock()
            .iter()
            .filter(|p| p.as_str() != "shared")
            .cloned()
            .collect();
        let expected: Vec<String> = (0..200).map(|n| n.to_string()).collect();
        assert_eq!(own, expected);
    }

    for i in 0..8 {
        assert!(registry.subscriber(&format!("Glove{}", i)).is_some());
    }
}

/// 路由时另一线程关闭连接
#[test]
fn test_route_while_removing_connection() {
    let registry = Arc::new(DeviceRegistry::new());
    let conn = CountingConnection::new(1);
    registry.subscribe("GloveA", conn.clone());

    let router = {
        let registry = registry.clone();
        thread::spawn(move || {
            for _ in 0..1000 {
                registry.route("GloveA", "x");
            }
        })
    };
    let remover = {
        let registry = registry.clone();
        thread::spawn(move || registry.remove_connection(ConnectionId::new(1)))
    };

    router.join().unwrap();
    assert_eq!(remover.join().unwrap(), vec!["GloveA".to_string()]);
    assert!(registry.is_empty());
    assert!(conn.received.lock().len() <= 1000);
}

#[derive(Debug, Clone)]
enum Op {
    Subscribe(u8, u64),
    Unsubscribe(u8),
    RemoveConnection(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, 1u64..4).prop_map(|(d, c)| Op::Subscribe(d, c)),
        (0u8..4).prop_map(Op::Unsubscribe),
        (1u64..4).prop_map(Op::RemoveConnection),
    ]
}

proptest! {
    /// 任意操作序列后，注册表与 HashMap 模型一致
    #[test]
    fn prop_registry_matches_model(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let registry = DeviceRegistry::new();
        let connections: HashMap<u64, Arc<CountingConnection>> =
            (1..4).map(|id| (id, CountingConnection::new(id))).collect();
        let mut model: HashMap<String, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Subscribe(d, c) => {
                    let device = format!("Glove{}", d);
                    registry.subscribe(&device, connections[&c].clone());
                    model.insert(device, c);
                },
                Op::Unsubscribe(d) => {
                    let device = format!("Glove{}", d);
                    prop_assert_eq!(registry.unsubscribe(&device), model.remove(&device).is_some());
                },
                Op::RemoveConnection(c) => {
                    registry.remove_connection(ConnectionId::new(c));
                    model.retain(|_, owner| *owner != c);
                },
            }
        }

        prop_assert_eq!(registry.len(), model.len());
        for d in 0..4u8 {
            let device = format!("Glove{}", d);
            prop_assert_eq!(
                registry.subscriber(&device),
                model.get(&device).map(|c| ConnectionId::new(*c))
            );
        }
    }
}
