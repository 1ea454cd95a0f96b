//! Framed transport over an asynchronous byte stream.
//!
//! Both sides of the protocol speak through a [`FramedStream`]: writes are
//! staged as whole frames and flushed as one all-or-nothing write, reads
//! re-run the frame decode predicate as bytes arrive. Every operation runs
//! under a single deadline; `Duration::ZERO` disables it.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use crate::codec::{self, DecodeStatus, RpcMessage};
use crate::error::RpcError;

const INITIAL_BUF_SIZE: usize = 8 * 1024;

/// Deadline for one framed operation; `Duration::ZERO` means none.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    if timeout.is_zero() { None } else { Some(Instant::now() + timeout) }
}

/// Run `f` to completion, aborting it when the deadline fires first.
async fn with_deadline<F, T>(deadline: Option<Instant>, f: F) -> Result<T, RpcError>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        None => Ok(f.await?),
        Some(at) => match timeout_at(at, f).await {
            Ok(r) => Ok(r?),
            Err(_) => Err(RpcError::Timeout),
        },
    }
}

/// Bridges the frame codec to an asynchronous byte stream.
///
/// Generic over the stream so tests can drive it with in-memory pipes; the
/// runtime uses it over [`TcpStream`].
pub struct FramedStream<S = TcpStream> {
    stream: S,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl FramedStream<TcpStream> {
    /// Connect to `addr` under `timeout` and wrap the stream.
    pub async fn connect(addr: &SocketAddr, timeout: Duration) -> Result<Self, RpcError> {
        let stream = with_deadline(deadline_after(timeout), TcpStream::connect(addr)).await?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> FramedStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(INITIAL_BUF_SIZE),
            write_buf: BytesMut::with_capacity(INITIAL_BUF_SIZE),
        }
    }

    /// Append one frame to the staged output without writing yet.
    pub fn stage_message(&mut self, msg: &dyn RpcMessage) {
        codec::encode(msg, &mut self.write_buf);
    }

    /// Write everything staged as one all-or-nothing write.
    pub async fn flush_staged(&mut self, timeout: Duration) -> Result<(), RpcError> {
        let r = with_deadline(deadline_after(timeout), async {
            self.stream.write_all(&self.write_buf).await?;
            self.stream.flush().await
        })
        .await;
        self.write_buf.clear();
        r
    }

    pub async fn write_message(
        &mut self, msg: &dyn RpcMessage, timeout: Duration,
    ) -> Result<(), RpcError> {
        self.stage_message(msg);
        self.flush_staged(timeout).await
    }

    /// Read one frame into `msg` under the deadline.
    ///
    /// Bytes past the frame stay buffered for the next read; the consumed
    /// prefix matches the frame size exactly.
    pub async fn read_message(
        &mut self, msg: &mut dyn RpcMessage, timeout: Duration,
    ) -> Result<(), RpcError> {
        let deadline = deadline_after(timeout);
        loop {
            if let DecodeStatus::Complete(consumed) = codec::try_decode(&self.read_buf, msg)? {
                self.read_buf.advance(consumed);
                return Ok(());
            }
            let n = with_deadline(deadline, self.stream.read_buf(&mut self.read_buf)).await?;
            if n == 0 {
                return Err(RpcError::Eof);
            }
        }
    }
}
