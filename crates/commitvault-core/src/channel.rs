//! Bounded byte channel with poisoned close.
//!
//! Connects the compression task to the upload. The producer either finishes
//! cleanly ([`ByteSender::finish`]) or closes with an error
//! ([`ByteSender::close_with_error`]); the consumer drains buffered chunks and then
//! observes end-of-data or that error. A producer that disappears without doing
//! either (panic, abort) is reported as [`io::ErrorKind::UnexpectedEof`], so a
//! truncated stream is never mistaken for a complete one.
//!
//! Dropping the [`ByteReceiver`] makes the next [`ByteSender::send`] fail.

use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

enum CloseState {
    Finished,
    Failed(io::Error),
}

type CloseSlot = Arc<Mutex<Option<CloseState>>>;

/// Create a channel holding at most `capacity` chunks in flight.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn byte_channel(capacity: usize) -> (ByteSender, ByteReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let close: CloseSlot = Arc::new(Mutex::new(None));
    (
        ByteSender {
            tx,
            close: Arc::clone(&close),
        },
        ByteReceiver {
            rx,
            close,
            terminated: false,
        },
    )
}

/// The receiving half went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("byte channel closed by the reader")]
pub struct ChannelClosed;

/// Producer half.
pub struct ByteSender {
    tx: mpsc::Sender<Bytes>,
    close: CloseSlot,
}

impl ByteSender {
    /// Send a chunk, waiting for capacity. Fails once the reader is gone.
    pub async fn send(&self, chunk: Bytes) -> Result<(), ChannelClosed> {
        self.tx.send(chunk).await.map_err(|_| ChannelClosed)
    }

    /// Whether the reader has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Close cleanly; the reader sees end-of-data after the buffered chunks.
    pub fn finish(self) {
        *self.close.lock() = Some(CloseState::Finished);
    }

    /// Close with `error`; the reader sees it after the buffered chunks.
    pub fn close_with_error(self, error: io::Error) {
        *self.close.lock() = Some(CloseState::Failed(error));
    }
}

impl std::fmt::Debug for ByteSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Consumer half; a stream of chunks ending in `None` or one terminal error.
pub struct ByteReceiver {
    rx: mpsc::Receiver<Bytes>,
    close: CloseSlot,
    terminated: bool,
}

impl ByteReceiver {
    /// Receive the next chunk.
    pub async fn recv(&mut self) -> Option<io::Result<Bytes>> {
        futures::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    fn terminal(&mut self) -> Option<io::Result<Bytes>> {
        self.terminated = true;
        match self.close.lock().take() {
            Some(CloseState::Finished) => None,
            Some(CloseState::Failed(error)) => Some(Err(error)),
            None => Some(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "byte channel producer dropped before finishing",
            ))),
        }
    }
}

impl Stream for ByteReceiver {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(None) => Poll::Ready(self.terminal()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for ByteReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteReceiver")
            .field("terminated", &self.terminated)
            .finish()
    }
}
