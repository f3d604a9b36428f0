//! WebSocket 服务端
//!
//! 每个连接一个线程：轮询读取客户端文本帧交给路由器，读超时间隙中把
//! 出站队列里的消息写回 socket。路由器和设备接收线程只向队列投递，
//! 不会阻塞在任何 socket 上。队列有界，客户端停止读取时多余的遥测被丢弃。

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use glove_relay::{Connection, ConnectionId, ConnectionIdGenerator, RelayError, RelayRouter};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tungstenite::{Message, WebSocket};

/// 服务端配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// accept 轮询间隔与连接读超时，决定停止信号和出站消息的最大延迟
    pub poll_interval: Duration,
    /// 每个连接出站队列的容量，队列满时新消息被丢弃
    pub outbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            outbox_capacity: 1024,
        }
    }
}

/// 出站消息进入连接自己的队列
struct WsConnection {
    id: ConnectionId,
    outbox: Sender<String>,
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, payload: &str) -> Result<(), RelayError> {
        match self.outbox.try_send(payload.to_string()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("{}: outbox full, dropping message", self.id);
                Err(RelayError::Send {
                    id: self.id,
                    message: "outbox full".to_string(),
                })
            },
            Err(TrySendError::Disconnected(_)) => Err(RelayError::Send {
                id: self.id,
                message: "connection closed".to_string(),
            }),
        }
    }
}

/// WebSocket 中继服务端
pub struct RelayServer {
    listener: TcpListener,
    router: Arc<RelayRouter>,
    ids: ConnectionIdGenerator,
    is_running: Arc<AtomicBool>,
    config: ServerConfig,
}

impl RelayServer {
    pub fn bind(
        addr: &str,
        router: Arc<RelayRouter>,
        is_running: Arc<AtomicBool>,
        config: ServerConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).with_context(|| format!("Failed to bind {}", addr))?;
        listener
            .set_nonblocking(true)
            .context("Failed to set listener non-blocking")?;

        Ok(Self {
            listener,
            router,
            ids: ConnectionIdGenerator::new(),
            is_running,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 运行 accept 循环，直到 `is_running` 被置为 `false`
    ///
    /// 返回前等待全部连接线程退出。
    pub fn run(&self) -> Result<()> {
        info!("Relay server listening on {}", self.local_addr()?);
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while self.is_running.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => match self.spawn_connection(stream, peer) {
                    Ok(handle) => workers.push(handle),
                    Err(e) => warn!("Rejected connection from {}: {:#}", peer, e),
                },
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(self.config.poll_interval);
                },
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    thread::sleep(self.config.poll_interval);
                },
            }
            workers.retain(|handle| !handle.is_finished());
        }

        info!("Relay server stopping, waiting for {} connection(s)", workers.len());
        for handle in workers {
            if handle.join().is_err() {
                error!("Connection thread panicked");
            }
        }
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) -> Result<JoinHandle<()>> {
        // 部分平台上 accept 出的 socket 继承监听端的非阻塞模式
        stream.set_nonblocking(false)?;

        let id = self.ids.next_id();
        let router = self.router.clone();
        let is_running = self.is_running.clone();
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name(format!("relay-{}", id))
            .spawn(move || serve_connection(stream, peer, id, router, is_running, config))?;
        Ok(handle)
    }
}

fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    router: Arc<RelayRouter>,
    is_running: Arc<AtomicBool>,
    config: ServerConfig,
) {
    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        },
    };
    if let Err(e) = ws.get_ref().set_read_timeout(Some(config.poll_interval)) {
        warn!("{}: failed to set read timeout: {}", id, e);
        return;
    }

    let (outbox_tx, outbox_rx) = crossbeam_channel::bounded(config.outbox_capacity);
    router.on_open(Arc::new(WsConnection {
        id,
        outbox: outbox_tx,
    }));
    debug!("{}: peer {}", id, peer);

    if let Err(e) = session_loop(&mut ws, id, &router, &outbox_rx, &is_running) {
        debug!("{}: session ended with error: {}", id, e);
    }

    router.on_close(id);
    // 对端可能已经关闭
    let _ = ws.close(None);
    let _ = ws.flush();
}

fn session_loop(
    ws: &mut WebSocket<TcpStream>,
    id: ConnectionId,
    router: &RelayRouter,
    outbox: &Receiver<String>,
    is_running: &AtomicBool,
) -> Result<(), tungstenite::Error> {
    loop {
        if !is_running.load(Ordering::Acquire) {
            return Ok(());
        }

        // 按入队顺序写出
        while let Ok(payload) = outbox.try_recv() {
            ws.write(Message::Text(payload))?;
        }
        ws.flush()?;

        match ws.read() {
            Ok(Message::Text(text)) => {
                if let Err(e) = router.handle_message(id, &text) {
                    debug!("{}: message not handled: {}", id, e);
                }
            },
            Ok(Message::Close(_)) => return Ok(()),
            Ok(_) => {},
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {},
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(());
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_relay::{DeviceRegistry, NullDeviceSink};
    use std::time::Instant;

    struct Harness {
        addr: SocketAddr,
        router: Arc<RelayRouter>,
        is_running: Arc<AtomicBool>,
        handle: Option<JoinHandle<()>>,
    }

    impl Harness {
        fn start() -> Self {
            let router = Arc::new(RelayRouter::new(
                Arc::new(DeviceRegistry::new()),
                Arc::new(NullDeviceSink),
            ));
            let is_running = Arc::new(AtomicBool::new(true));
            let server = RelayServer::bind(
                "127.0.0.1:0",
                router.clone(),
                is_running.clone(),
                ServerConfig {
                    poll_interval: Duration::from_millis(5),
                    ..ServerConfig::default()
                },
            )
            .unwrap();
            let addr = server.local_addr().unwrap();
            let handle = thread::spawn(move || server.run().unwrap());

            Self {
                addr,
                router,
                is_running,
                handle: Some(handle),
            }
        }

        fn client(&self) -> WebSocket<TcpStream> {
            let stream = TcpStream::connect(self.addr).unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let (ws, _response) = tungstenite::client(format!("ws://{}/", self.addr), stream).unwrap();
            ws
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.is_running.store(false, Ordering::Release);
            if let Some(handle) = self.handle.take() {
                handle.join().unwrap();
            }
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn read_text(ws: &mut WebSocket<TcpStream>) -> String {
        loop {
            match ws.read().unwrap() {
                Message::Text(text) => return text,
                _ => continue,
            }
        }
    }

    #[test]
    fn test_full_outbox_drops_message() {
        let (outbox, rx) = crossbeam_channel::bounded(2);
        let conn = WsConnection {
            id: ConnectionId::new(3),
            outbox,
        };

        conn.send("f,1,100").unwrap();
        conn.send("f,1,101").unwrap();
        let err = conn.send("f,1,102").unwrap_err();
        assert!(matches!(err, RelayError::Send { .. }));

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["f,1,100", "f,1,101"]);

        // 队列腾出空间后恢复投递
        conn.send("f,1,103").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "f,1,103");

        drop(rx);
        assert!(conn.send("f,1,104").is_err());
    }

    #[test]
    fn test_unknown_action_echo() {
        let harness = Harness::start();
        let mut client = harness.client();

        client.send(Message::Text("99;GloveA".to_string())).unwrap();
        assert_eq!(read_text(&mut client), "You said: 99;GloveA");
    }

    #[test]
    fn test_subscription_routing() {
        let harness = Harness::start();
        let mut client = harness.client();

        client.send(Message::Text("1;GloveA".to_string())).unwrap();
        let registry = harness.router.registry().clone();
        assert!(wait_until(|| registry.subscriber("GloveA").is_some()));

        assert!(harness.router.route_telemetry("GloveA", "f,3,512"));
        assert!(!harness.router.route_telemetry("GloveB", "ignored"));
        assert_eq!(read_text(&mut client), "f,3,512");
    }

    #[test]
    fn test_close_releases_subscriptions() {
        let harness = Harness::start();
        let mut client = harness.client();

        client.send(Message::Text("1;GloveA".to_string())).unwrap();
        let registry = harness.router.registry().clone();
        assert!(wait_until(|| registry.subscriber("GloveA").is_some()));

        client.close(None).unwrap();
        let _ = client.flush();

        let router = harness.router.clone();
        assert!(wait_until(|| router.open_connections() == 0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_message_keeps_connection() {
        let harness = Harness::start();
        let mut client = harness.client();

        client.send(Message::Text("not;a;valid;relay;frame".to_string())).unwrap();
        client.send(Message::Text("42;GloveA".to_string())).unwrap();
        assert_eq!(read_text(&mut client), "You said: 42;GloveA");
        assert_eq!(harness.router.open_connections(), 1);
    }
}
