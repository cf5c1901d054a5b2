use std::sync::{Arc, PoisonError};
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{broadcast, Mutex as TokioMutex};
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use super::messages::ProtocolMessage;
use crate::cache::{CacheStore, InMemoryCache};
use crate::client::SharedCache;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{AppliedEvent, CacheEvent, CHAT_ADDED, CHAT_REMOVED, MESSAGE_ADDED};
use crate::graphql::{CHAT_ADDED_SUBSCRIPTION, CHAT_REMOVED_SUBSCRIPTION, MESSAGE_ADDED_SUBSCRIPTION};

const SUBPROTOCOL: &str = "graphql-transport-ws";

/// How long the server may take to acknowledge `connection_init`
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Keeps the server from closing an idle connection
const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Subscriptions opened on every connection, keyed by their field name
const SUBSCRIPTIONS: [(&str, &str); 3] = [
    (MESSAGE_ADDED, MESSAGE_ADDED_SUBSCRIPTION),
    (CHAT_ADDED, CHAT_ADDED_SUBSCRIPTION),
    (CHAT_REMOVED, CHAT_REMOVED_SUBSCRIPTION),
];

/// Capacity of the applied-event channel
const UPDATES_CAPACITY: usize = 64;

/// How a session with the server ended
enum SessionEnd {
    Shutdown,
    Closed,
}

/// Keeps the local cache in sync with server pushes.
///
/// Holds the three subscriptions open over one WebSocket, applies every
/// event to the shared cache as it arrives, and reconnects after the
/// connection drops until [`disconnect`](Self::disconnect) is called.
pub struct SubscriptionClient<S = InMemoryCache> {
    ws_url: Url,
    reconnect_delay: Duration,
    cache: SharedCache<S>,
    connected: Arc<TokioMutex<bool>>,
    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<()>,
    updates_tx: broadcast::Sender<AppliedEvent>,
}

impl<S: CacheStore + Send + 'static> SubscriptionClient<S> {
    pub fn new(config: &ClientConfig, cache: SharedCache<S>) -> Result<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (updates_tx, _) = broadcast::channel(UPDATES_CAPACITY);

        Ok(Self {
            ws_url: config.ws_url()?,
            reconnect_delay: config.reconnect_delay,
            cache,
            connected: Arc::new(TokioMutex::new(false)),
            shutdown_tx,
            updates_tx,
        })
    }

    /// True once every subscription has been sent on a live connection
    pub async fn is_connected(&self) -> bool {
        *self.connected.lock().await
    }

    /// Events applied to the cache, in arrival order
    pub fn updates(&self) -> broadcast::Receiver<AppliedEvent> {
        self.updates_tx.subscribe()
    }

    /// Start the connection loop in the background
    pub fn connect(&self) {
        let ws_url = self.ws_url.clone();
        let reconnect_delay = self.reconnect_delay;
        let cache = self.cache.clone();
        let connected = self.connected.clone();
        let updates_tx = self.updates_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                info!(url = %ws_url, "Connecting to subscription endpoint");

                let end = session(&ws_url, &cache, &connected, &updates_tx, &mut shutdown_rx).await;
                *connected.lock().await = false;

                match end {
                    Ok(SessionEnd::Shutdown) => break,
                    Ok(SessionEnd::Closed) => info!("Server closed subscription connection"),
                    Err(e) => error!(error = %e, url = %ws_url, "Subscription connection failed"),
                }

                debug!(delay = ?reconnect_delay, "Reconnecting");
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = sleep(reconnect_delay) => {}
                }
            }
            info!("Subscription client stopped");
        });
    }

    /// Close the connection and stop reconnecting
    pub fn disconnect(&self) {
        info!("Initiating graceful disconnect");
        let _ = self.shutdown_tx.send(());
    }
}

async fn send<W>(sink: &mut W, message: &ProtocolMessage) -> Result<()>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(message)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

/// Read frames until `connection_ack`. `false` if the stream ends first.
async fn await_ack<W, R>(ws_write: &mut W, ws_read: &mut R) -> Result<bool>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = ws_read.next().await {
        if let Message::Text(text) = frame? {
            match serde_json::from_str::<ProtocolMessage>(&text)? {
                ProtocolMessage::ConnectionAck { .. } => return Ok(true),
                ProtocolMessage::Ping { .. } => {
                    send(ws_write, &ProtocolMessage::Pong { payload: None }).await?
                }
                other => warn!(?other, "Unexpected message before acknowledgement"),
            }
        }
    }
    Ok(false)
}

/// One connection: handshake, subscribe, then apply events until it ends
async fn session<S: CacheStore>(
    ws_url: &Url,
    cache: &SharedCache<S>,
    connected: &TokioMutex<bool>,
    updates_tx: &broadcast::Sender<AppliedEvent>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Result<SessionEnd> {
    let mut request = ws_url.as_str().into_client_request()?;
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

    let (ws_stream, _) = connect_async(request).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    send(&mut ws_write, &ProtocolMessage::ConnectionInit { payload: None }).await?;

    let acknowledged = timeout(ACK_TIMEOUT, await_ack(&mut ws_write, &mut ws_read))
        .await
        .map_err(|_| ClientError::Protocol("Server did not acknowledge connection".to_string()))??;

    if !acknowledged {
        return Ok(SessionEnd::Closed);
    }

    for (id, query) in SUBSCRIPTIONS {
        send(&mut ws_write, &ProtocolMessage::subscribe(id, query)).await?;
    }
    *connected.lock().await = true;
    info!("Subscribed to chat events");

    let mut ping = interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing connection gracefully");
                if let Err(e) = ws_write.send(Message::Close(None)).await {
                    warn!(error = %e, "Failed to send close frame");
                }
                return Ok(SessionEnd::Shutdown);
            }
            _ = ping.tick() => {
                send(&mut ws_write, &ProtocolMessage::Ping { payload: None }).await?;
            }
            frame = ws_read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let message = match serde_json::from_str::<ProtocolMessage>(&text) {
                            Ok(message) => message,
                            Err(e) => {
                                warn!(error = %e, "Ignoring unparseable frame");
                                continue;
                            }
                        };
                        match message {
                            ProtocolMessage::Next { id, payload } => {
                                if let Some(errors) = payload.errors {
                                    warn!(subscription = %id, %errors, "Subscription result carried errors");
                                }
                                if let Some(data) = payload.data {
                                    apply_event(&id, &data, cache, updates_tx);
                                }
                            }
                            ProtocolMessage::Ping { .. } => {
                                send(&mut ws_write, &ProtocolMessage::Pong { payload: None }).await?;
                            }
                            ProtocolMessage::Error { id, payload } => {
                                warn!(subscription = %id, %payload, "Subscription rejected");
                            }
                            ProtocolMessage::Complete { id } => {
                                info!(subscription = %id, "Server completed subscription");
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
        }
    }
}

/// Convert one subscription result and run it through the cache
fn apply_event<S: CacheStore>(
    subscription: &str,
    data: &serde_json::Value,
    cache: &SharedCache<S>,
    updates_tx: &broadcast::Sender<AppliedEvent>,
) {
    let event = match CacheEvent::from_payload(data) {
        Ok(event) => event,
        Err(e) => {
            warn!(subscription, error = %e, "Dropping invalid event");
            return;
        }
    };

    let outcome = {
        let mut store = cache.lock().unwrap_or_else(PoisonError::into_inner);
        event.apply(&mut *store)
    };
    debug!(event = event.name(), ?outcome, "Applied event");

    // No receivers is fine
    let _ = updates_tx.send(AppliedEvent { event, outcome });
}
