//! Frame-level connection abstraction.
//!
//! The hub never sees sockets. A connection is anything that splits into a
//! [`FrameSink`] and a [`FrameStream`]; the server adapts WebSockets, tests use
//! [`MemoryTransport`].

use crate::{Message, TransportError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// One unit on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Payload bytes; one JSON object.
    Data(Vec<u8>),
    /// Keepalive request.
    Ping,
    /// Keepalive answer.
    Pong,
    /// Orderly shutdown.
    Close,
}

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes one frame.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Sends a close frame and releases the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame, or `None` once the peer is gone.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// A bidirectional connection.
pub trait Transport: Send + 'static {
    /// Outbound half.
    type Sink: FrameSink + 'static;
    /// Inbound half.
    type Stream: FrameStream + 'static;

    /// Splits into halves that can be driven concurrently.
    fn split(self) -> (Self::Sink, Self::Stream);
}

// ─── In-memory transport ────────────────────────────────────────────────────

/// Client side of an in-process connection.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: mpsc::Sender<Frame>,
    inbound: mpsc::Receiver<Frame>,
}

/// Remote side of an in-process connection, driven by tests.
#[derive(Debug)]
pub struct MemoryPeer {
    to_client: mpsc::Sender<Frame>,
    from_client: mpsc::Receiver<Frame>,
}

impl MemoryTransport {
    /// Connected transport/peer pair with `capacity` frames of buffering each way.
    pub fn pair(capacity: usize) -> (MemoryTransport, MemoryPeer) {
        let (to_client, inbound) = mpsc::channel(capacity);
        let (outbound, from_client) = mpsc::channel(capacity);
        (
            MemoryTransport { outbound, inbound },
            MemoryPeer {
                to_client,
                from_client,
            },
        )
    }
}

/// Outbound half of [`MemoryTransport`].
#[derive(Debug)]
pub struct MemorySink(mpsc::Sender<Frame>);

/// Inbound half of [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryStream(mpsc::Receiver<Frame>);

impl Transport for MemoryTransport {
    type Sink = MemorySink;
    type Stream = MemoryStream;

    fn split(self) -> (MemorySink, MemoryStream) {
        (MemorySink(self.outbound), MemoryStream(self.inbound))
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.0
            .send(frame)
            .await
            .map_err(|_| TransportError::new("peer dropped"))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Peer may already be gone; closing is best effort.
        if self.0.send(Frame::Close).await.is_err() {
            debug!("Close frame not delivered, peer dropped");
        }
        Ok(())
    }
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.0.recv().await.map(Ok)
    }
}

impl MemoryPeer {
    /// Sends raw bytes as one data frame.
    ///
    /// # Errors
    ///
    /// Fails once the client side has been dropped.
    pub async fn send_raw(&self, raw: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        self.send(Frame::Data(raw.into())).await
    }

    /// Sends any frame.
    ///
    /// # Errors
    ///
    /// Fails once the client side has been dropped.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        self.to_client
            .send(frame)
            .await
            .map_err(|_| TransportError::new("client dropped"))
    }

    /// Next frame written by the client.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next data frame decoded as a message, skipping keepalives.
    ///
    /// Returns `None` on close or when the client side is gone.
    pub async fn recv_message(&mut self) -> Option<Message> {
        loop {
            match self.from_client.recv().await? {
                Frame::Data(bytes) => return Message::decode(&bytes).ok(),
                Frame::Ping | Frame::Pong => continue,
                Frame::Close => return None,
            }
        }
    }

    /// Stops reading while keeping the client's inbound half open.
    ///
    /// Frames already written stay readable; every later client write fails.
    pub fn close_inbound(&mut self) {
        self.from_client.close();
    }

    /// Hangs up from the remote side.
    pub fn disconnect(self) {
        drop(self);
    }
}
