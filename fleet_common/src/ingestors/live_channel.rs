//! # Live Channel Manager
//!
//! Keeps exactly one receive-only connection to the telemetry channel open for
//! as long as the dashboard is mounted, and writes every snapshot it receives
//! into the [`StateStore`].
//!
//! ## Structure
//!
//! - **Manager task**: a single task owns the [`ChannelMachine`] and is the
//!   only writer to the store while the channel runs. It services transport
//!   events, reconnect timers and the teardown signal in one `select!` loop.
//! - **Attempt tasks**: each connection attempt runs in its own task that
//!   dials (bounded by the connect timeout), then forwards frames to the
//!   manager tagged with the attempt's epoch. Frames it queued before it
//!   ended may still be delivered; the epoch check in the machine discards
//!   them.
//! - **Reconnect timer**: after a lost connection, one timer task is scheduled
//!   with a fixed delay and its own cancellation token, in the manner of the
//!   registry's linger task. Teardown cancels it.
//!
//! On [`ChannelHandle::shutdown`] the attempt task gets [`CLOSE_GRACE`] to
//! close its connection cleanly before it is aborted. After `shutdown`
//! returns, the manager task, the attempt task and any pending timer have all
//! finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::configs::DEFAULT_CONNECT_TIMEOUT;
use crate::core::StateStore;
use crate::errors::ChannelError;
use crate::ingestors::channel_machine::{ChannelEvent, ChannelMachine, ConnectionState, Epoch, Step};
use crate::ingestors::transport::{Connector, Frame};

/// How long teardown waits for a clean close before dropping the socket.
pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

type EventTx = mpsc::UnboundedSender<(Epoch, ChannelEvent)>;

/// Configuration of one channel manager, ready to [`spawn`](Self::spawn).
pub struct LiveChannel<C: Connector> {
    connector: Arc<C>,
    url: Url,
    store: StateStore,
    reconnect_delay: Duration,
    connect_timeout: Duration,
}

impl<C: Connector> LiveChannel<C> {
    pub fn new(connector: C, url: Url, store: StateStore, reconnect_delay: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            url,
            store,
            reconnect_delay,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Upper bound for one dial, handshake included. An attempt that does not
    /// open in time fails like a refused one.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Starts the manager task. The first connection attempt is immediate.
    pub fn spawn(self) -> ChannelHandle {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let task = tokio::spawn(self.run(cancel.clone(), state_tx));
        ChannelHandle { cancel, task, state_rx }
    }

    async fn run(self, cancel: CancellationToken, state_tx: watch::Sender<ConnectionState>) {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (due_tx, mut due_rx) = mpsc::unbounded_channel();

        let mut session = Session {
            channel: self,
            machine: ChannelMachine::new(),
            events_tx,
            due_tx,
            attempt: None,
            reconnect: None,
            state_tx,
        };

        session.start_attempt();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some((epoch, event)) = events_rx.recv() => session.on_event(epoch, event),
                Some(epoch) = due_rx.recv() => session.on_reconnect_due(epoch),
            }
        }

        session.teardown().await;
    }
}

/// Mutable state of a running manager. Lives entirely inside the manager task.
struct Session<C: Connector> {
    channel: LiveChannel<C>,
    machine: ChannelMachine,
    events_tx: EventTx,
    due_tx: mpsc::UnboundedSender<Epoch>,
    attempt: Option<Attempt>,
    reconnect: Option<ReconnectTimer>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: Connector> Session<C> {
    fn publish_state(&self) {
        self.state_tx.send_replace(self.machine.state());
    }

    fn start_attempt(&mut self) {
        let Some(epoch) = self.machine.begin_attempt() else {
            return;
        };
        self.publish_state();
        log::info!("Connecting to telemetry channel {} (attempt {})", self.channel.url, epoch);

        let connector = Arc::clone(&self.channel.connector);
        let url = self.channel.url.clone();
        let connect_timeout = self.channel.connect_timeout;
        let tx = self.events_tx.clone();
        let closing = CancellationToken::new();
        let task = tokio::spawn(run_attempt(connector, url, connect_timeout, epoch, tx, closing.clone()));
        self.attempt = Some(Attempt { closing, task });
    }

    fn on_event(&mut self, epoch: Epoch, event: ChannelEvent) {
        match self.machine.on_event(epoch, event) {
            Step::Stale => {
                log::debug!("Discarded event from superseded attempt {} (current {})", epoch, self.machine.epoch());
            }
            Step::Ignore => {}
            Step::Opened => {
                self.publish_state();
                log::info!("WebSocket connected (attempt {})", epoch);
            }
            Step::Apply(snapshot) => {
                let count = snapshot.len();
                let revision = self.channel.store.replace(snapshot);
                log::debug!("Applied live snapshot: {} robots (revision {})", count, revision);
            }
            Step::Malformed(e) => {
                log::error!("Error parsing WebSocket message: {}", e);
            }
            Step::Reconnect(cause) => {
                match cause {
                    Some(e) => log::error!("WebSocket error: {}", e),
                    None => log::warn!("WebSocket closed. Reconnecting..."),
                }
                self.close_transport();
                self.publish_state();
                self.schedule_reconnect();
            }
        }
    }

    fn on_reconnect_due(&mut self, epoch: Epoch) {
        // Only the timer scheduled for the attempt we lost may trigger the next one.
        if epoch != self.machine.epoch() || self.machine.state() != ConnectionState::Disconnected {
            return;
        }
        self.reconnect = None;
        self.start_attempt();
    }

    fn close_transport(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            attempt.task.abort();
        }
    }

    fn schedule_reconnect(&mut self) {
        // The machine only asks for a reconnect after an attempt began, and
        // starting an attempt consumes the previous timer.
        debug_assert!(self.reconnect.is_none());
        log::debug!("Reconnect scheduled in {} ms", self.channel.reconnect_delay.as_millis());
        self.reconnect = Some(ReconnectTimer::schedule(
            self.channel.reconnect_delay,
            self.machine.epoch(),
            self.due_tx.clone(),
        ));
    }

    async fn teardown(mut self) {
        self.machine.terminate();
        if let Some(timer) = self.reconnect.take() {
            timer.cancel().await;
        }
        if let Some(attempt) = self.attempt.take() {
            attempt.close().await;
        }
        self.publish_state();
        log::info!("Telemetry channel shut down");
    }
}

/// One running connection attempt.
struct Attempt {
    closing: CancellationToken,
    task: JoinHandle<()>,
}

impl Attempt {
    /// Asks the attempt to close its connection, then waits at most
    /// [`CLOSE_GRACE`] before aborting it.
    async fn close(mut self) {
        self.closing.cancel();
        if timeout(CLOSE_GRACE, &mut self.task).await.is_err() {
            log::warn!("Channel close handshake timed out; dropping connection");
            self.task.abort();
            let _ = self.task.await;
        }
    }
}

/// Dials once and forwards everything the connection reports, tagged with
/// `epoch`, until the connection ends or `closing` fires.
async fn run_attempt<C: Connector>(
    connector: Arc<C>,
    url: Url,
    connect_timeout: Duration,
    epoch: Epoch,
    tx: EventTx,
    closing: CancellationToken,
) {
    let dial = tokio::select! {
        _ = closing.cancelled() => return,
        res = timeout(connect_timeout, connector.connect(&url)) => res,
    };
    let mut conn = match dial {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            let _ = tx.send((epoch, ChannelEvent::Failed(e)));
            return;
        }
        Err(_) => {
            let e = ChannelError::Connect { url: url.to_string(), reason: "handshake timed out".to_string() };
            let _ = tx.send((epoch, ChannelEvent::Failed(e)));
            return;
        }
    };
    if tx.send((epoch, ChannelEvent::Opened)).is_err() {
        return;
    }

    loop {
        let item = tokio::select! {
            _ = closing.cancelled() => {
                conn.close().await;
                return;
            }
            item = conn.next() => item,
        };
        let event = match item {
            Some(Ok(Frame::Payload(bytes))) => ChannelEvent::Payload(bytes),
            Some(Ok(Frame::Close)) | None => break,
            Some(Err(e)) => {
                let _ = tx.send((epoch, ChannelEvent::Failed(e)));
                return;
            }
        };
        if tx.send((epoch, event)).is_err() {
            return;
        }
    }
    let _ = tx.send((epoch, ChannelEvent::Closed));
}

/// A scheduled reconnect with its cancel handle.
struct ReconnectTimer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReconnectTimer {
    fn schedule(delay: Duration, epoch: Epoch, due_tx: mpsc::UnboundedSender<Epoch>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    log::debug!("Reconnect for attempt {} cancelled", epoch);
                }
                _ = sleep(delay) => {
                    let _ = due_tx.send(epoch);
                }
            }
        });
        Self { cancel, task }
    }

    async fn cancel(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Owner-side handle of a running channel manager.
pub struct ChannelHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ChannelHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver for connection status changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Closes the transport, cancels any pending reconnect and waits until
    /// every task of this manager has finished.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            log::error!("Channel manager task ended abnormally: {}", e);
        }
    }
}
