//! Transport seam.
//!
//! The manager never touches a socket directly. A [`Connector`] dials an
//! endpoint and hands back a [`Link`]: a pair of channels fed by a pump task
//! that owns the socket. [`WsConnector`] is the `tokio-tungstenite` pump;
//! tests substitute scripted connectors.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::errors::TransportError;
use crate::state::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a requested close may take before the link is reported closed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames going to the peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    /// A UTF-8 text frame.
    Text(String),
    /// Begin the close handshake.
    Close {
        /// Close code.
        code: u16,
        /// Human-readable reason.
        reason: String,
    },
}

/// What the pump reports from the peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Incoming {
    /// A UTF-8 text frame.
    Text(String),
    /// A transport error; a [`Closed`](Incoming::Closed) follows.
    Error(TransportError),
    /// The link is gone. Always the last item.
    Closed {
        /// Close code from the peer, if one was received.
        code: Option<u16>,
    },
}

/// An established connection.
#[derive(Debug)]
pub struct Link {
    /// Send side; dropping it closes the connection.
    pub writer: mpsc::Sender<Outgoing>,
    /// Receive side; ends after [`Incoming::Closed`].
    pub reader: mpsc::Receiver<Incoming>,
}

/// Dials endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `url` with `buffer` frames of channel slack.
    async fn connect(&self, url: &str, buffer: usize) -> Result<Link, TransportError>;
}

/// WebSocket connector over `tokio-tungstenite` (`ws://` and `wss://`).
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str, buffer: usize) -> Result<Link, TransportError> {
        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        debug!(url, status = %response.status(), "websocket handshake complete");

        let (writer, outgoing) = mpsc::channel(buffer.max(1));
        let (incoming, reader) = mpsc::channel(buffer.max(1));
        let _ = tokio::spawn(pump(ws, outgoing, incoming));

        Ok(Link { writer, reader })
    }
}

/// Shuttle frames between the socket and the link channels until the socket
/// closes or both channel ends are dropped.
async fn pump(
    ws: WsStream,
    mut outgoing: mpsc::Receiver<Outgoing>,
    incoming: mpsc::Sender<Incoming>,
) {
    let (mut sink, mut stream) = ws.split();
    let mut writer_open = true;
    let mut close_deadline: Option<Instant> = None;
    let mut peer_close: Option<u16> = None;

    loop {
        let deadline = async move {
            match close_deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            out = outgoing.recv(), if writer_open => match out {
                Some(Outgoing::Text(text)) => {
                    trace!(len = text.len(), "sending text frame");
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        let _ = incoming
                            .send(Incoming::Error(TransportError::Socket(e.to_string())))
                            .await;
                    }
                }
                Some(Outgoing::Close { code, reason }) => {
                    writer_open = false;
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    close_deadline = Some(Instant::now() + CLOSE_TIMEOUT);
                }
                None => {
                    writer_open = false;
                    let _ = sink.close().await;
                    close_deadline = Some(Instant::now() + CLOSE_TIMEOUT);
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if incoming.send(Incoming::Text(text.as_str().to_owned())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        if incoming.send(Incoming::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => debug!(len = bytes.len(), "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    peer_close = Some(frame.map_or(NORMAL_CLOSURE, |f| u16::from(f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    if peer_close.is_none() && close_deadline.is_none() {
                        let _ = incoming
                            .send(Incoming::Error(TransportError::Socket(e.to_string())))
                            .await;
                    }
                    let code = peer_close.or(Some(ABNORMAL_CLOSURE));
                    let _ = incoming.send(Incoming::Closed { code }).await;
                    break;
                }
                None => {
                    let code = peer_close.or(Some(ABNORMAL_CLOSURE));
                    let _ = incoming.send(Incoming::Closed { code }).await;
                    break;
                }
            },
            () = deadline => {
                debug!("close handshake timed out");
                let _ = incoming.send(Incoming::Closed { code: Some(NORMAL_CLOSURE) }).await;
                break;
            }
        }
    }
}
