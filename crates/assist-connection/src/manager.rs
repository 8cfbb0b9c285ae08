//! The connection manager.
//!
//! Owns one logical connection to the configured endpoint. I/O runs in
//! spawned tasks that report back through generation-checked callbacks:
//! every teardown bumps the generation, so a task still draining a replaced
//! connection cannot touch the current one.
//!
//! All operations that start a connection spawn onto the ambient tokio
//! runtime and must be called from within one.

use std::sync::Arc;
use std::time::Duration;

use assist_core::Frame;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::connector::{Connector, Incoming, Link, Outgoing};
use crate::errors::{ConnectionError, TransportError};
use crate::reconnect::{ReconnectDecision, ReconnectState};
use crate::state::{
    ConnectionConfig, ConnectionEvent, ConnectionState, MANUAL_DISCONNECT_REASON, NORMAL_CLOSURE,
};

const ENDPOINT_CHANGED_REASON: &str = "Endpoint changed";
const ENDPOINT_CLEARED_REASON: &str = "Endpoint cleared";

/// Handle to the managed connection.
///
/// Dropping the handle tears the connection down and cancels any pending
/// reconnect. Share it behind an `Arc` when several owners need it.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    slot: Mutex<Slot>,
    state_tx: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
}

struct Slot {
    url: Option<String>,
    state: ConnectionState,
    generation: u64,
    manual_disconnect: bool,
    reconnect: ReconnectState,
    cancel: Option<CancellationToken>,
    writer: Option<mpsc::Sender<Outgoing>>,
    last_frame: Option<Frame>,
    last_error: Option<TransportError>,
}

impl ConnectionManager {
    /// Idle manager; nothing is dialed until an endpoint is configured.
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let reconnect = ReconnectState::new(config.max_reconnect_attempts, config.reconnect_delay);

        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                slot: Mutex::new(Slot {
                    url: None,
                    state: ConnectionState::Idle,
                    generation: 0,
                    manual_disconnect: false,
                    reconnect,
                    cancel: None,
                    writer: None,
                    last_frame: None,
                    last_error: None,
                }),
                state_tx,
                events,
            }),
        }
    }

    /// Point the manager at `url`, or detach it with `None`.
    ///
    /// A new endpoint tears down the current connection and dials fresh with
    /// the attempt counter and manual-disconnect flag reset. Configuring the
    /// endpoint that is already open or being dialed does nothing. `None`
    /// tears down and reports [`ConnectionState::Idle`].
    pub fn configure(&self, url: Option<String>) {
        let mut slot = self.inner.slot.lock();
        match url {
            Some(url) => {
                if slot.url.as_deref() == Some(url.as_str()) && slot.state.is_live() {
                    debug!(url, "endpoint unchanged");
                    return;
                }
                self.inner.teardown(&mut slot, ENDPOINT_CHANGED_REASON);
                info!(url, "endpoint configured");
                slot.url = Some(url);
                slot.manual_disconnect = false;
                slot.reconnect.reset();
                self.inner.start_connection(&mut slot);
            }
            None => {
                self.inner.teardown(&mut slot, ENDPOINT_CLEARED_REASON);
                if slot.url.take().is_some() {
                    info!("endpoint cleared");
                }
                slot.manual_disconnect = false;
                slot.reconnect.reset();
                self.inner.set_state(&mut slot, ConnectionState::Idle);
            }
        }
    }

    /// Dial the configured endpoint unless a connection is open or being
    /// established. Clears the manual-disconnect flag and supersedes any
    /// scheduled reconnect.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        let mut slot = self.inner.slot.lock();
        if slot.url.is_none() {
            return Err(ConnectionError::NoEndpoint);
        }
        slot.manual_disconnect = false;
        if slot.state.is_live() {
            return Ok(());
        }
        self.inner.teardown(&mut slot, MANUAL_DISCONNECT_REASON);
        self.inner.start_connection(&mut slot);
        Ok(())
    }

    /// Close the connection with a normal-closure code and stop reconnecting.
    pub fn disconnect(&self) {
        let mut slot = self.inner.slot.lock();
        slot.manual_disconnect = true;
        if slot.reconnect.cancel() {
            debug!("pending reconnect cancelled");
        }

        let close_queued = slot.writer.take().is_some_and(|writer| {
            writer
                .try_send(Outgoing::Close {
                    code: NORMAL_CLOSURE,
                    reason: MANUAL_DISCONNECT_REASON.to_owned(),
                })
                .is_ok()
        });

        if close_queued {
            info!("closing connection");
            self.inner.set_state(&mut slot, ConnectionState::Closing);
        } else {
            slot.generation += 1;
            if let Some(cancel) = slot.cancel.take() {
                cancel.cancel();
            }
            if slot.state != ConnectionState::Idle {
                self.inner.set_state(&mut slot, ConnectionState::Closed);
            }
        }
    }

    /// Send a text frame. Returns `false`, without queueing, unless the
    /// connection is open and has room for the frame.
    pub fn send(&self, payload: &str) -> bool {
        let slot = self.inner.slot.lock();
        if slot.state != ConnectionState::Open {
            debug!(state = %slot.state, "send rejected, connection not open");
            return false;
        }
        let Some(writer) = slot.writer.as_ref() else {
            return false;
        };
        match writer.try_send(Outgoing::Text(payload.to_owned())) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "send failed");
                false
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.slot.lock().state
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    /// Most recent inbound frame.
    pub fn last_frame(&self) -> Option<Frame> {
        self.inner.slot.lock().last_frame.clone()
    }

    /// Most recent transport error.
    pub fn last_error(&self) -> Option<TransportError> {
        self.inner.slot.lock().last_error.clone()
    }

    /// Configured endpoint.
    pub fn endpoint(&self) -> Option<String> {
        self.inner.slot.lock().url.clone()
    }

    /// Automatic reconnects made since the last successful open.
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.slot.lock().reconnect.attempt()
    }

    /// Whether an automatic reconnect is pending.
    pub fn reconnect_scheduled(&self) -> bool {
        self.inner.slot.lock().reconnect.is_scheduled()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock();
        slot.manual_disconnect = true;
        self.inner.teardown(&mut slot, MANUAL_DISCONNECT_REASON);
    }
}

impl Inner {
    fn set_state(&self, slot: &mut Slot, state: ConnectionState) {
        if slot.state == state {
            return;
        }
        debug!(from = %slot.state, to = %state, "state changed");
        slot.state = state;
        let _ = self.state_tx.send_replace(state);
        self.emit(ConnectionEvent::StateChanged(state));
    }

    fn emit(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Detach from the current connection and any pending reconnect.
    fn teardown(&self, slot: &mut Slot, reason: &str) {
        slot.generation += 1;
        let _ = slot.reconnect.cancel();
        if let Some(writer) = slot.writer.take() {
            let _ = writer.try_send(Outgoing::Close {
                code: NORMAL_CLOSURE,
                reason: reason.to_owned(),
            });
        }
        if let Some(cancel) = slot.cancel.take() {
            cancel.cancel();
        }
    }

    fn start_connection(self: &Arc<Self>, slot: &mut Slot) {
        let Some(url) = slot.url.clone() else {
            return;
        };
        slot.generation += 1;
        let cancel = CancellationToken::new();
        if let Some(previous) = slot.cancel.replace(cancel.clone()) {
            previous.cancel();
        }
        slot.writer = None;
        self.set_state(slot, ConnectionState::Connecting);

        let span = info_span!("connection", id = %Uuid::now_v7(), url = %url);
        let generation = slot.generation;
        let _ = tokio::spawn(Arc::clone(self).run(generation, url, cancel).instrument(span));
    }

    async fn run(self: Arc<Self>, generation: u64, url: String, cancel: CancellationToken) {
        debug!("dialing");
        let dialed = tokio::select! {
            () = cancel.cancelled() => return,
            dialed = self.connector.connect(&url, self.config.outbound_buffer) => dialed,
        };

        let mut reader = match dialed {
            Ok(Link { writer, reader }) => {
                if !self.on_open(generation, writer) {
                    return;
                }
                reader
            }
            Err(e) => {
                self.on_error(generation, e);
                self.on_closed(generation, None);
                return;
            }
        };

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                incoming = reader.recv() => match incoming {
                    Some(Incoming::Text(data)) => self.on_frame(generation, data),
                    Some(Incoming::Error(e)) => self.on_error(generation, e),
                    Some(Incoming::Closed { code }) => {
                        self.on_closed(generation, code);
                        break;
                    }
                    None => {
                        self.on_closed(generation, None);
                        break;
                    }
                },
            }
        }
    }

    fn on_open(&self, generation: u64, writer: mpsc::Sender<Outgoing>) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return false;
        }
        slot.writer = Some(writer);
        slot.reconnect.reset();
        self.set_state(&mut slot, ConnectionState::Open);
        info!("connection open");
        true
    }

    fn on_frame(&self, generation: u64, data: String) {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        debug!(len = data.len(), "frame received");
        let frame = Frame::new(data);
        slot.last_frame = Some(frame.clone());
        self.emit(ConnectionEvent::Frame(frame));
    }

    fn on_error(&self, generation: u64, error: TransportError) {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        warn!(error = %error, "transport error");
        slot.last_error = Some(error.clone());
        self.emit(ConnectionEvent::Error(error));
    }

    fn on_closed(self: &Arc<Self>, generation: u64, code: Option<u16>) {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        slot.writer = None;
        slot.cancel = None;
        self.set_state(&mut slot, ConnectionState::Closed);

        let manual = slot.manual_disconnect;
        let has_url = slot.url.is_some();
        match slot.reconnect.on_unexpected_close(manual, has_url) {
            ReconnectDecision::Retry { attempt, delay } => {
                info!(
                    ?code,
                    attempt,
                    max_attempts = slot.reconnect.max_attempts(),
                    ?delay,
                    "connection closed, reconnect scheduled"
                );
                let timer = CancellationToken::new();
                slot.reconnect.arm(timer.clone());
                let _ = tokio::spawn(Arc::clone(self).reconnect_after(generation, delay, timer));
                self.emit(ConnectionEvent::ReconnectScheduled { attempt, delay });
            }
            ReconnectDecision::Suppressed => info!(?code, "connection closed"),
            ReconnectDecision::Exhausted => {
                warn!(
                    ?code,
                    attempts = slot.reconnect.attempt(),
                    "reconnect attempts exhausted"
                );
                self.emit(ConnectionEvent::ReconnectExhausted);
            }
        }
    }

    async fn reconnect_after(
        self: Arc<Self>,
        generation: u64,
        delay: Duration,
        timer: CancellationToken,
    ) {
        tokio::select! {
            () = timer.cancelled() => {}
            () = tokio::time::sleep(delay) => {
                let mut slot = self.slot.lock();
                if slot.generation != generation || timer.is_cancelled() {
                    return;
                }
                slot.reconnect.fire();
                info!(attempt = slot.reconnect.attempt(), "reconnecting");
                self.start_connection(&mut slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio::time::Instant;
    use tracing::Level;

    use super::*;

    const URL: &str = "wss://host/ws/42/";
    const OTHER_URL: &str = "wss://host/ws/43/";

    enum Script {
        Accept,
        Refuse,
    }

    /// Server end of a scripted link.
    struct Peer {
        url: String,
        outbound: mpsc::Receiver<Outgoing>,
        inbound: mpsc::Sender<Incoming>,
    }

    impl Peer {
        async fn push(&self, text: &str) {
            self.inbound.send(Incoming::Text(text.into())).await.unwrap();
        }

        async fn close(&self, code: u16) {
            self.inbound
                .send(Incoming::Closed { code: Some(code) })
                .await
                .unwrap();
        }
    }

    /// Connector that follows a script; dials past the end are refused.
    struct ScriptedConnector {
        script: Mutex<VecDeque<Script>>,
        dials: Mutex<Vec<(String, Instant)>>,
        peers: mpsc::UnboundedSender<Peer>,
    }

    impl ScriptedConnector {
        fn new(
            script: impl IntoIterator<Item = Script>,
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
            let (peers, rx) = mpsc::unbounded_channel();
            let connector = Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                dials: Mutex::new(Vec::new()),
                peers,
            });
            (connector, rx)
        }

        fn refusing() -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
            Self::new(Vec::<Script>::new())
        }

        fn dials(&self) -> usize {
            self.dials.lock().len()
        }

        fn dial_times(&self) -> Vec<Instant> {
            self.dials.lock().iter().map(|(_, at)| *at).collect()
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self, url: &str, buffer: usize) -> Result<Link, TransportError> {
            self.dials.lock().push((url.to_owned(), Instant::now()));
            let next = self.script.lock().pop_front();
            match next {
                Some(Script::Accept) => {
                    let (writer, outbound) = mpsc::channel(buffer);
                    let (inbound, reader) = mpsc::channel(buffer);
                    let _ = self.peers.send(Peer {
                        url: url.to_owned(),
                        outbound,
                        inbound,
                    });
                    Ok(Link { writer, reader })
                }
                Some(Script::Refuse) | None => Err(TransportError::Connect {
                    url: url.to_owned(),
                    reason: "refused".into(),
                }),
            }
        }
    }

    fn manager(connector: Arc<ScriptedConnector>) -> ConnectionManager {
        ConnectionManager::new(ConnectionConfig::default(), connector)
    }

    async fn wait_for(manager: &ConnectionManager, state: ConnectionState) {
        let mut rx = manager.watch_state();
        let _ = rx.wait_for(|s| *s == state).await.unwrap();
    }

    async fn next_event(
        events: &mut broadcast::Receiver<ConnectionEvent>,
        matches: impl Fn(&ConnectionEvent) -> bool,
    ) -> ConnectionEvent {
        loop {
            let event = events.recv().await.unwrap();
            if matches(&event) {
                return event;
            }
        }
    }

    // -- send guard --

    #[tokio::test]
    async fn send_requires_open_connection() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector);

        assert!(!m.send("idle"));
        m.configure(Some(URL.into()));
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(!m.send("connecting"));

        let mut peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;
        assert!(m.send(r#"{"prompt":"hi"}"#));

        assert_eq!(
            peer.outbound.recv().await,
            Some(Outgoing::Text(r#"{"prompt":"hi"}"#.into()))
        );
        assert!(peer.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector);
        m.configure(Some(URL.into()));
        let peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        m.disconnect();
        peer.close(NORMAL_CLOSURE).await;
        wait_for(&m, ConnectionState::Closed).await;
        assert!(!m.send("late"));
    }

    // -- frames and errors --

    #[tokio::test]
    async fn frames_are_surfaced() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector);
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let peer = peers.recv().await.unwrap();
        assert_eq!(peer.url, URL);

        peer.push(r#"{"status":"accepted","task_id":7}"#).await;
        let event = next_event(&mut events, |e| matches!(e, ConnectionEvent::Frame(_))).await;
        assert_matches!(event, ConnectionEvent::Frame(frame) if frame.data.contains("accepted"));
        assert!(m.last_frame().unwrap().data.contains("task_id"));
    }

    #[tokio::test]
    async fn error_alone_does_not_reconnect() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept, Script::Accept]);
        let m = manager(connector.clone());
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        peer.inbound
            .send(Incoming::Error(TransportError::Socket("reset".into())))
            .await
            .unwrap();
        let _ = next_event(&mut events, |e| matches!(e, ConnectionEvent::Error(_))).await;
        assert_eq!(m.last_error(), Some(TransportError::Socket("reset".into())));
        assert_eq!(m.state(), ConnectionState::Open);
        assert!(!m.reconnect_scheduled());
        assert_eq!(connector.dials(), 1);

        peer.close(1011).await;
        let event = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;
        assert_matches!(event, ConnectionEvent::ReconnectScheduled { attempt: 1, .. });
    }

    // -- reconnect policy --

    #[tokio::test(start_paused = true)]
    async fn fourth_unexpected_close_schedules_no_reconnect() {
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = manager(connector.clone());
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));

        let mut scheduled = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                ConnectionEvent::ReconnectScheduled { attempt, delay } => {
                    assert_eq!(delay, Duration::from_millis(1000));
                    scheduled.push(attempt);
                }
                ConnectionEvent::ReconnectExhausted => break,
                _ => {}
            }
        }
        assert_eq!(scheduled, vec![1, 2, 3]);
        assert_eq!(connector.dials(), 4);
        assert_eq!(m.state(), ConnectionState::Closed);
        assert_matches!(m.last_error(), Some(TransportError::Connect { .. }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.dials(), 4);
        assert!(!m.reconnect_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_delay_is_fixed() {
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = ConnectionManager::new(
            ConnectionConfig::default().with_reconnect_delay(Duration::from_millis(3000)),
            connector.clone(),
        );
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _ = next_event(&mut events, |e| *e == ConnectionEvent::ReconnectExhausted).await;

        let times = connector.dial_times();
        let gaps: Vec<_> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![Duration::from_millis(3000); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_open_resets_counter() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Refuse, Script::Accept]);
        let m = manager(connector);
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));

        let _ = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;
        assert_eq!(m.reconnect_attempt(), 1);

        let peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;
        assert_eq!(m.reconnect_attempt(), 0);

        peer.close(1006).await;
        let event = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;
        assert_matches!(event, ConnectionEvent::ReconnectScheduled { attempt: 1, .. });
    }

    #[tokio::test(start_paused = true)]
    async fn manual_connect_resumes_after_exhaustion() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Refuse, Script::Accept]);
        let m = ConnectionManager::new(
            ConnectionConfig::default().with_max_reconnect_attempts(0),
            connector.clone(),
        );
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _ = next_event(&mut events, |e| *e == ConnectionEvent::ReconnectExhausted).await;
        assert_eq!(m.state(), ConnectionState::Closed);

        m.connect().unwrap();
        let _peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;
        assert_eq!(connector.dials(), 2);
    }

    // -- manual control --

    #[tokio::test(start_paused = true)]
    async fn manual_disconnect_closes_normally() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector.clone());
        m.configure(Some(URL.into()));
        let mut peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        m.disconnect();
        assert_eq!(m.state(), ConnectionState::Closing);
        assert_eq!(
            peer.outbound.recv().await,
            Some(Outgoing::Close {
                code: NORMAL_CLOSURE,
                reason: MANUAL_DISCONNECT_REASON.into(),
            })
        );

        peer.close(NORMAL_CLOSURE).await;
        wait_for(&m, ConnectionState::Closed).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.dials(), 1);
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = manager(connector.clone());
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _ = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;

        m.disconnect();
        assert!(!m.reconnect_scheduled());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.dials(), 1);
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn connect_after_disconnect_clears_manual_flag() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept, Script::Accept]);
        let m = manager(connector);
        m.configure(Some(URL.into()));
        let first = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;
        m.disconnect();
        first.close(NORMAL_CLOSURE).await;
        wait_for(&m, ConnectionState::Closed).await;

        m.connect().unwrap();
        let second = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        // An unexpected close now reconnects again.
        let mut events = m.subscribe();
        second.close(1006).await;
        let _ = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;
    }

    #[tokio::test]
    async fn connect_without_endpoint_fails() {
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = manager(connector.clone());
        assert_matches!(m.connect(), Err(ConnectionError::NoEndpoint));
        assert_eq!(connector.dials(), 0);
        assert_eq!(m.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn connect_is_a_no_op_while_open() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector.clone());
        m.configure(Some(URL.into()));
        let _peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        m.connect().unwrap();
        assert_eq!(m.state(), ConnectionState::Open);
        assert_eq!(connector.dials(), 1);
    }

    // -- configuration --

    #[tokio::test]
    async fn same_endpoint_is_not_redialed() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector.clone());
        m.configure(Some(URL.into()));
        m.configure(Some(URL.into()));
        let _peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;
        m.configure(Some(URL.into()));
        assert_eq!(connector.dials(), 1);
    }

    #[tokio::test]
    async fn endpoint_change_starts_fresh() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept, Script::Accept]);
        let m = manager(connector);
        m.configure(Some(URL.into()));
        let mut old = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        m.configure(Some(OTHER_URL.into()));
        assert_eq!(m.endpoint().as_deref(), Some(OTHER_URL));
        assert_eq!(
            old.outbound.recv().await,
            Some(Outgoing::Close {
                code: NORMAL_CLOSURE,
                reason: ENDPOINT_CHANGED_REASON.into(),
            })
        );

        let new = peers.recv().await.unwrap();
        assert_eq!(new.url, OTHER_URL);
        wait_for(&m, ConnectionState::Open).await;

        // The replaced connection can no longer reach the manager.
        let _ = old.inbound.send(Incoming::Text("stale".into())).await;
        tokio::task::yield_now().await;
        assert!(m.last_frame().is_none());
        assert_eq!(m.reconnect_attempt(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_endpoint_goes_idle() {
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = manager(connector.clone());
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _ = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;

        m.configure(None);
        assert_eq!(m.state(), ConnectionState::Idle);
        assert!(m.endpoint().is_none());
        assert!(!m.reconnect_scheduled());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.dials(), 1);
        assert_eq!(m.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_reconnect() {
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = manager(connector.clone());
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _ = next_event(&mut events, |e| {
            matches!(e, ConnectionEvent::ReconnectScheduled { .. })
        })
        .await;

        drop(m);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.dials(), 1);
    }

    #[tokio::test]
    async fn state_changes_are_published() {
        let (connector, mut peers) = ScriptedConnector::new([Script::Accept]);
        let m = manager(connector);
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _peer = peers.recv().await.unwrap();
        wait_for(&m, ConnectionState::Open).await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ConnectionEvent::StateChanged(state) = event {
                seen.push(state);
            }
        }
        assert_eq!(seen, vec![ConnectionState::Connecting, ConnectionState::Open]);
    }

    // -- logging --

    #[tokio::test(start_paused = true)]
    async fn exhaustion_is_logged() {
        let (logs, _guard) = assist_logging::capture_logs();
        let (connector, _peers) = ScriptedConnector::refusing();
        let m = manager(connector);
        let mut events = m.subscribe();
        m.configure(Some(URL.into()));
        let _ = next_event(&mut events, |e| *e == ConnectionEvent::ReconnectExhausted).await;

        assert!(logs.has_event(Level::WARN, "reconnect attempts exhausted"));
        assert_eq!(logs.count_at_level(Level::WARN), 5);
    }
}
