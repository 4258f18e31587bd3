//! # Channel Transport
//!
//! The seam between the channel manager and the actual socket. The manager
//! only needs "open a receive-only stream of frames for this URL" and a way to
//! say goodbye to the server when the dashboard goes away.

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, StreamExt};
use futures_util::{FutureExt, SinkExt};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::errors::ChannelError;

/// One inbound unit from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text or binary data frame.
    Payload(Vec<u8>),
    /// The server closed the connection.
    Close,
}

/// Inbound frames of one open connection.
pub type FrameStream = BoxStream<'static, Result<Frame, ChannelError>>;

/// One open connection: its inbound frames plus an optional close handshake.
///
/// Dropping a connection closes it abruptly; [`close`](Self::close) runs the
/// handshake first.
pub struct ChannelConnection {
    frames: FrameStream,
    closer: Option<BoxFuture<'static, ()>>,
}

impl ChannelConnection {
    pub fn new(frames: FrameStream) -> Self {
        Self { frames, closer: None }
    }

    /// Attaches the future that performs a clean close.
    pub fn with_close<F>(mut self, closer: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.closer = Some(closer.boxed());
        self
    }

    pub async fn next(&mut self) -> Option<Result<Frame, ChannelError>> {
        self.frames.next().await
    }

    /// Stops reading and runs the close handshake, if any.
    pub async fn close(self) {
        let Self { frames, closer } = self;
        drop(frames);
        if let Some(closer) = closer {
            closer.await;
        }
    }
}

/// Opens connections for the live channel.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &Url) -> impl Future<Output = Result<ChannelConnection, ChannelError>> + Send;
}

/// `tokio-tungstenite` WebSocket connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<ChannelConnection, ChannelError> {
        let (ws_stream, _) = connect_async(url.as_str()).await.map_err(|e| ChannelError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let (mut write, read) = ws_stream.split();

        // Receive-only: the write half is used for nothing but the close frame.
        let frames = read.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(Frame::Payload(text.as_str().as_bytes().to_vec()))),
                Ok(Message::Binary(bin)) => Some(Ok(Frame::Payload(bin.to_vec()))),
                Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => None,
                Err(e) => Some(Err(ChannelError::Transport(e.to_string()))),
            }
        });

        let url = url.clone();
        Ok(ChannelConnection::new(frames.boxed()).with_close(async move {
            if let Err(e) = write.close().await {
                log::debug!("Close handshake with {} failed: {}", url, e);
            }
        }))
    }
}
