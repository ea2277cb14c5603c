//! Connection sessions: connect, replay subscriptions, dispatch frames,
//! reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::OrderlyError;
use crate::ws::client::WsConfig;
use crate::ws::manager::ManagerInner;
use crate::ws::messages::{topics, ControlAck, InboundFrame, Pong, SubscribeRequest};
use crate::ws::registry::TopicRegistry;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// How long a closing session waits for the writer to flush before aborting.
const WRITER_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The manager was asked to stop.
    Shutdown,
    /// The connection dropped or a fatal dispatch error occurred.
    Disconnected,
}

/// Outcome of waiting for the next frame.
enum NextFrame {
    Message(WsMessage),
    TimedOut,
    Error(tokio_tungstenite::tungstenite::Error),
    StreamEnded,
}

/// Run the connection loop until the manager shuts down or reconnect
/// attempts run out.
pub(crate) async fn run(inner: Arc<ManagerInner>) {
    let mut shutdown = inner.shutdown.subscribe();
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match connect_async(inner.url.as_str()).await {
            Ok((stream, _response)) => {
                info!(client_id = %inner.client_id, url = %inner.url, "connected");
                attempt = 0;
                if run_session(&inner, stream, &mut shutdown).await == SessionEnd::Shutdown {
                    break;
                }
            }
            Err(e) => {
                warn!(client_id = %inner.client_id, url = %inner.url, error = %e, "connection failed");
            }
        }

        attempt = attempt.saturating_add(1);
        if let Some(max) = inner.config.max_reconnect_attempts {
            if attempt > max {
                error!(
                    client_id = %inner.client_id,
                    attempts = max,
                    "giving up after maximum reconnect attempts, stopping manager",
                );
                // Unblock every pending recv.
                inner.shutdown.send_replace(true);
                break;
            }
        }

        let backoff = backoff_duration(&inner.config, attempt - 1);
        if !backoff.is_zero() {
            debug!(client_id = %inner.client_id, backoff = ?backoff, "waiting before reconnect");
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(client_id = %inner.client_id, attempt, "reconnecting");
    }

    inner.outbound.clear();
    debug!(client_id = %inner.client_id, "connection task finished");
}

/// Exponential backoff for a reconnect attempt (zero-based).
fn backoff_duration(config: &WsConfig, attempt: u32) -> Duration {
    let base = config.initial_backoff.as_millis() as u64;
    let max = config.max_backoff.as_millis() as u64;
    let multiplier = 2u64.saturating_pow(attempt);
    Duration::from_millis(base.saturating_mul(multiplier).min(max))
}

/// Drive one established connection until it ends.
async fn run_session(
    inner: &Arc<ManagerInner>,
    stream: WsStream,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (sink, mut reader) = stream.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    // Single writer per session: every outgoing frame funnels through here.
    let mut writer = tokio::spawn(write_loop(sink, outbound_rx));
    inner.outbound.install(outbound_tx.clone());

    let end = match replay_subscriptions(inner) {
        Ok(()) => read_loop(inner, &mut reader, &outbound_tx, shutdown).await,
        Err(e) => {
            warn!(client_id = %inner.client_id, error = %e, "failed to replay subscriptions");
            SessionEnd::Disconnected
        }
    };

    inner.outbound.clear();
    match end {
        SessionEnd::Shutdown => {
            let _ = outbound_tx.send(WsMessage::Close(None));
            drop(outbound_tx);
            if tokio::time::timeout(WRITER_CLOSE_GRACE, &mut writer).await.is_err() {
                writer.abort();
            }
        }
        SessionEnd::Disconnected => {
            drop(outbound_tx);
            writer.abort();
        }
    }
    end
}

/// Forward queued frames to the socket until the channel or socket closes.
async fn write_loop(mut sink: WsSink, mut outbound: UnboundedReceiver<WsMessage>) {
    while let Some(message) = outbound.recv().await {
        let is_close = matches!(message, WsMessage::Close(_));
        if sink.send(message).await.is_err() {
            break;
        }
        if is_close {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Re-send subscribe requests for every registered topic.
///
/// Private sessions authenticate before each subscribe, matching the server's
/// expectation that auth precedes private topics.
fn replay_subscriptions(inner: &ManagerInner) -> Result<(), OrderlyError> {
    for topic in inner.registry.topic_names() {
        if let Some(auth) = &inner.auth {
            inner.send_frame(&auth.auth_request(&inner.client_id))?;
        }
        debug!(client_id = %inner.client_id, topic = %topic, "resubscribing");
        inner.send_frame(&SubscribeRequest::subscribe(&inner.client_id, &topic))?;
    }
    Ok(())
}

/// Pump frames from the socket into the registry.
async fn read_loop(
    inner: &ManagerInner,
    reader: &mut WsReader,
    outbound: &UnboundedSender<WsMessage>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        let frame = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return SessionEnd::Shutdown;
                }
                continue;
            }
            frame = next_frame(reader, inner.config.read_timeout) => frame,
        };

        let message = match frame {
            NextFrame::Message(message) => message,
            NextFrame::TimedOut => {
                warn!(
                    client_id = %inner.client_id,
                    timeout = ?inner.config.read_timeout,
                    "connection timed out, restarting",
                );
                return SessionEnd::Disconnected;
            }
            NextFrame::Error(e) => {
                warn!(client_id = %inner.client_id, error = %e, "connection error");
                return SessionEnd::Disconnected;
            }
            NextFrame::StreamEnded => {
                warn!(client_id = %inner.client_id, "disconnected from server");
                return SessionEnd::Disconnected;
            }
        };

        match message {
            WsMessage::Text(text) => {
                if handle_text(inner, outbound, &text).is_err() {
                    return SessionEnd::Disconnected;
                }
            }
            WsMessage::Binary(data) => {
                if let Ok(text) = String::from_utf8(data.to_vec()) {
                    if handle_text(inner, outbound, &text).is_err() {
                        return SessionEnd::Disconnected;
                    }
                } else {
                    warn!(client_id = %inner.client_id, "dropping non-UTF-8 binary frame");
                }
            }
            WsMessage::Close(frame) => {
                warn!(client_id = %inner.client_id, reason = ?frame, "server closed the connection");
                return SessionEnd::Disconnected;
            }
            // Handled automatically by tungstenite.
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }
}

/// Wait for the next frame, honoring the optional idle timeout.
async fn next_frame(reader: &mut WsReader, read_timeout: Option<Duration>) -> NextFrame {
    let next = match read_timeout {
        Some(limit) => match tokio::time::timeout(limit, reader.next()).await {
            Ok(next) => next,
            Err(_) => return NextFrame::TimedOut,
        },
        None => reader.next().await,
    };

    match next {
        Some(Ok(message)) => NextFrame::Message(message),
        Some(Err(e)) => NextFrame::Error(e),
        None => NextFrame::StreamEnded,
    }
}

/// Parse and dispatch a text frame.
///
/// Unparseable frames are dropped with a warning; an error here means the
/// dispatch itself was fatal and the session must restart.
fn handle_text(
    inner: &ManagerInner,
    outbound: &UnboundedSender<WsMessage>,
    text: &str,
) -> Result<(), OrderlyError> {
    match InboundFrame::parse(text) {
        Ok(frame) => {
            if let Err(e) = dispatch(&inner.registry, outbound, frame) {
                error!(client_id = %inner.client_id, error = %e, "fatal dispatch error, restarting");
                return Err(e);
            }
            Ok(())
        }
        Err(e) => {
            warn!(client_id = %inner.client_id, error = %e, "dropping malformed frame");
            Ok(())
        }
    }
}

/// Route one classified frame.
///
/// Pings are answered immediately and never enqueued. Failed acknowledgements
/// are fatal. Successful `request` acknowledgements carry orderbook snapshots
/// and are routed to the `{symbol}@orderbook` topic with the response
/// timestamp attached; all other acknowledgements are dropped. Data frames
/// are published to their topic's queue, with the envelope stripped.
pub(crate) fn dispatch(
    registry: &TopicRegistry,
    outbound: &UnboundedSender<WsMessage>,
    frame: InboundFrame,
) -> Result<(), OrderlyError> {
    match frame {
        InboundFrame::Ping { .. } => {
            let pong = serde_json::to_string(&Pong::new())?;
            if outbound.send(WsMessage::Text(pong.into())).is_err() {
                warn!("failed to answer ping, writer is gone");
            }
        }
        InboundFrame::Pong { .. } => {}
        InboundFrame::Ack(ack) if !ack.success => {
            return Err(OrderlyError::AckFailure {
                event: ack.event,
                message: ack
                    .error_msg
                    .unwrap_or_else(|| "no error message".to_string()),
            });
        }
        InboundFrame::Ack(ack) => {
            if ack.event == "request" && ack.data.is_some() {
                route_orderbook_snapshot(registry, ack);
            } else {
                debug!(event = %ack.event, id = ?ack.id, "acknowledged");
            }
        }
        InboundFrame::Data(frame) => {
            if let Err(e) = registry.publish(&frame.topic, frame.data) {
                warn!(error = %e, "dropping data frame");
            }
        }
    }
    Ok(())
}

/// Deliver an orderbook snapshot to its symbol's topic.
fn route_orderbook_snapshot(registry: &TopicRegistry, ack: ControlAck) {
    let Some(mut data) = ack.data else { return };
    let Some(symbol) = data.get("symbol").and_then(Value::as_str).map(str::to_owned) else {
        warn!("orderbook response has no symbol, dropping");
        return;
    };

    if let (Some(object), Some(ts)) = (data.as_object_mut(), ack.ts) {
        object.insert("ts".to_string(), ts.into());
    }

    let topic = topics::orderbook(&symbol);
    if let Err(e) = registry.publish(&topic, data) {
        warn!(error = %e, "dropping orderbook snapshot");
    }
}
