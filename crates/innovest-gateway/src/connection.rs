use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::stomp::{Command, Frame};
use crate::transport::{Connector, PubSub, Subscription};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;
type Routes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<String>>>>;

/// How long `close` waits for DISCONNECT to flush before aborting.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

enum Outbound {
    Frame(Frame),
    Disconnect,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// STOMP over a single WebSocket. Subscriptions are routed by the `id` we
/// assign, so several topics can share the connection.
pub struct StompTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
    routes: Routes,
    connected: Arc<AtomicBool>,
    next_id: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StompTransport {
    pub async fn connect(config: &GatewayConfig, token: Option<&str>) -> Result<Self, GatewayError> {
        let handshake = async {
            let (ws, _response) = connect_async(config.url.as_str()).await?;
            let (mut sink, mut stream) = ws.split();

            let beat = config.heartbeat.as_millis().to_string();
            let mut connect = Frame::new(Command::Connect)
                .header("accept-version", "1.2")
                .header("host", config.url.host_str().unwrap_or("localhost"))
                .header("heart-beat", format!("{beat},{beat}"));
            if let Some(token) = token {
                connect = connect.header("Authorization", format!("Bearer {token}"));
            }
            sink.send(WsMessage::Text(connect.encode().into())).await?;

            let connected = wait_for_connected(&mut stream).await?;
            Ok::<_, GatewayError>((sink, stream, connected))
        };

        let (sink, stream, connected_frame) = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| GatewayError::Timeout)??;

        let server_beat = server_heartbeat(&connected_frame, config.heartbeat);
        info!(url = %config.url, ?server_beat, "Connected to message broker");

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let routes: Routes = Arc::default();
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(run_connection_loop(
            sink,
            stream,
            outbound_rx,
            routes.clone(),
            connected.clone(),
            config.heartbeat,
            server_beat,
        ));

        Ok(Self {
            outbound,
            routes,
            connected,
            next_id: AtomicU64::new(0),
            task: Mutex::new(Some(task)),
        })
    }
}

#[async_trait]
impl PubSub for StompTransport {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, GatewayError> {
        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }

        let id = format!("sub-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.routes).insert(id.clone(), tx);

        let frame = Frame::new(Command::Subscribe)
            .header("id", id.clone())
            .header("destination", topic)
            .header("ack", "auto");
        if self.outbound.send(Outbound::Frame(frame)).is_err() {
            lock(&self.routes).remove(&id);
            return Err(GatewayError::NotConnected);
        }
        debug!(%topic, sub = %id, "Subscribed");

        let routes = self.routes.clone();
        let outbound = self.outbound.clone();
        Ok(Subscription::new(topic, rx, move || {
            lock(&routes).remove(&id);
            let _ = outbound.send(Outbound::Frame(
                Frame::new(Command::Unsubscribe).header("id", id),
            ));
        }))
    }

    async fn publish(&self, destination: &str, body: String) -> Result<(), GatewayError> {
        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .body(body);
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| GatewayError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::Release);
        let _ = self.outbound.send(Outbound::Disconnect);

        let task = lock(&self.task).take();
        if let Some(mut task) = task
            && tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err()
        {
            warn!("Broker did not close in time, aborting connection");
            task.abort();
        }
    }
}

impl Drop for StompTransport {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

async fn wait_for_connected(stream: &mut WsSource) -> Result<Frame, GatewayError> {
    while let Some(msg) = stream.next().await {
        let WsMessage::Text(text) = msg? else {
            continue;
        };
        match Frame::decode(&text)? {
            Some(frame) if frame.command == Command::Connected => return Ok(frame),
            Some(frame) if frame.command == Command::Error => {
                return Err(GatewayError::Broker(frame.error_message()));
            }
            _ => continue,
        }
    }
    Err(GatewayError::NotConnected)
}

/// The interval the server promised to send at, if it promised at all.
fn server_heartbeat(connected: &Frame, ours: Duration) -> Option<Duration> {
    let (sx, _) = connected.get("heart-beat")?.split_once(',')?;
    let sx: u64 = sx.trim().parse().ok()?;
    (sx > 0).then(|| Duration::from_millis(sx).max(ours))
}

async fn run_connection_loop(
    mut sink: WsSink,
    mut stream: WsSource,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    routes: Routes,
    connected: Arc<AtomicBool>,
    heartbeat: Duration,
    server_beat: Option<Duration>,
) {
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await;
    let mut last_inbound = tokio::time::Instant::now();

    loop {
        tokio::select! {
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("Broker socket error: {}", e);
                        break;
                    }
                    None => break,
                };
                last_inbound = tokio::time::Instant::now();

                match msg {
                    WsMessage::Text(text) => match Frame::decode(&text) {
                        Ok(Some(frame)) => {
                            if !dispatch(&routes, frame) {
                                break;
                            }
                        }
                        Ok(None) => trace!("Broker heart-beat"),
                        Err(e) => warn!("Dropping malformed frame: {}", e),
                    },
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            cmd = outbound.recv() => {
                match cmd {
                    Some(Outbound::Frame(frame)) => {
                        if sink.send(WsMessage::Text(frame.encode().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Disconnect) | None => {
                        let bye = Frame::new(Command::Disconnect).encode();
                        let _ = sink.send(WsMessage::Text(bye.into())).await;
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if let Some(expected) = server_beat
                    && last_inbound.elapsed() > expected * 2
                {
                    warn!("Broker heart-beat timeout, dropping connection");
                    break;
                }
                if sink.send(WsMessage::Text("\n".to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    connected.store(false, Ordering::Release);
    // Dropping the senders ends every open subscription.
    lock(&routes).clear();
    info!("Message broker connection closed");
}

/// Routes one inbound frame. Returns `false` when the broker ended the
/// session.
fn dispatch(routes: &Routes, frame: Frame) -> bool {
    match frame.command {
        Command::Message => {
            let Some(sub) = frame.get("subscription").map(str::to_owned) else {
                warn!("MESSAGE frame without subscription header");
                return true;
            };
            match lock(routes).get(&sub) {
                Some(tx) => {
                    let _ = tx.send(frame.body);
                }
                None => debug!(%sub, "Message for released subscription"),
            }
            true
        }
        Command::Error => {
            warn!("Broker error: {}", frame.error_message());
            false
        }
        other => {
            trace!(command = %other, "Ignoring frame");
            true
        }
    }
}

/// Opens authenticated STOMP connections for deal rooms.
#[derive(Debug, Clone)]
pub struct StompConnector {
    config: GatewayConfig,
    token: Option<String>,
}

impl StompConnector {
    pub fn new(config: GatewayConfig, token: Option<String>) -> Self {
        Self { config, token }
    }
}

#[async_trait]
impl Connector for StompConnector {
    type Transport = StompTransport;

    async fn connect(&self) -> Result<StompTransport, GatewayError> {
        StompTransport::connect(&self.config, self.token.as_deref()).await
    }
}
