//! Shared fixtures for the integration tests: a scripted channel connector and
//! a one-shot HTTP server on a random local port.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fleet_common::ingestors::{ChannelConnection, Connector, Frame};
use fleet_common::{ChannelError, RobotRecord};
use futures_util::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

pub type FrameTx = mpsc::UnboundedSender<Result<Frame, ChannelError>>;

enum Script {
    Accept(mpsc::UnboundedReceiver<Result<Frame, ChannelError>>),
    Refuse(String),
}

/// Connector whose attempts follow a queue of scripts. Once the queue is
/// empty, further attempts hang until the connect timeout fires.
#[derive(Clone)]
pub struct ScriptedConnector {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    count: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    attempts_tx: mpsc::UnboundedSender<usize>,
}

impl ScriptedConnector {
    /// The receiver yields the 1-based attempt number each time `connect` is called.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<usize>) {
        let (attempts_tx, attempts_rx) = mpsc::unbounded_channel();
        let connector = Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            count: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            attempts_tx,
        };
        (connector, attempts_rx)
    }

    /// Queues a successful attempt; the returned sender feeds its frames.
    /// Dropping the sender ends the stream, which the manager sees as a close.
    pub fn accept_next(&self) -> FrameTx {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().push_back(Script::Accept(rx));
        tx
    }

    pub fn refuse_next(&self, reason: &str) {
        self.scripts.lock().unwrap().push_back(Script::Refuse(reason.to_string()));
    }

    pub fn attempts(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// How many connections were closed with a handshake rather than dropped.
    pub fn clean_closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    async fn connect(&self, url: &Url) -> Result<ChannelConnection, ChannelError> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.attempts_tx.send(n);

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Accept(rx)) => {
                let frames = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
                let closes = Arc::clone(&self.closes);
                Ok(ChannelConnection::new(frames.boxed()).with_close(async move {
                    closes.fetch_add(1, Ordering::SeqCst);
                }))
            }
            Some(Script::Refuse(reason)) => Err(ChannelError::Connect { url: url.to_string(), reason }),
            None => std::future::pending().await,
        }
    }
}

pub fn payload(snapshot: &[RobotRecord]) -> Result<Frame, ChannelError> {
    Ok(Frame::Payload(serde_json::to_vec(snapshot).unwrap()))
}

pub fn raw(text: &str) -> Result<Frame, ChannelError> {
    Ok(Frame::Payload(text.as_bytes().to_vec()))
}

/// Request-seen notification and response release for a gated server.
pub struct Gate {
    pub seen: oneshot::Sender<()>,
    pub release: oneshot::Receiver<()>,
}

/// Serves exactly one HTTP response. With a `gate`, the server reports when
/// the request has arrived and holds the response until released.
pub async fn serve_http_once(
    status_line: &'static str,
    body: String,
    gate: Option<Gate>,
) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;

            if let Some(gate) = gate {
                let _ = gate.seen.send(());
                let _ = gate.release.await;
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.flush().await;
            let _ = stream.shutdown().await;
        }
    });

    (addr, handle)
}
