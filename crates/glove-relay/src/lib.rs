//! # Glove Relay
//!
//! 多客户端、多设备的中继核心：
//!
//! - [`DeviceRegistry`]：`设备名 → 订阅连接` 映射，遥测按设备名路由
//! - [`RelayRouter`]：解析客户端消息并分发到注册表或设备侧
//!
//! 网络传输由上层服务实现 [`Connection`]，设备侧由上层实现 [`DeviceCommandSink`]。
//!
//! ```rust
//! use glove_relay::{Connection, ConnectionId, DeviceRegistry, NullDeviceSink, RelayError, RelayRouter};
//! use std::sync::{Arc, Mutex};
//!
//! struct Client(Mutex<Vec<String>>);
//!
//! impl Connection for Client {
//!     fn id(&self) -> ConnectionId {
//!         ConnectionId::new(1)
//!     }
//!     fn send(&self, payload: &str) -> Result<(), RelayError> {
//!         self.0.lock().unwrap().push(payload.to_string());
//!         Ok(())
//!     }
//! }
//!
//! let router = RelayRouter::new(Arc::new(DeviceRegistry::new()), Arc::new(NullDeviceSink));
//! let client = Arc::new(Client(Mutex::new(Vec::new())));
//! router.on_open(client.clone());
//!
//! router.handle_message(client.id(), "1;GloveA").unwrap();
//! router.route_telemetry("GloveA", "512");
//! assert_eq!(client.0.lock().unwrap().as_slice(), ["512"]);
//! ```

pub mod connection;
pub mod error;
pub mod registry;
pub mod router;

#[cfg(test)]
mod testing;

pub use connection::{Connection, ConnectionId, ConnectionIdGenerator};
pub use error::RelayError;
pub use registry::DeviceRegistry;
pub use router::{DeviceCommandSink, Dispatch, NullDeviceSink, RelayRouter};
