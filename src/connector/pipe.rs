//! Bounded in-memory pipe bridging a push-style body writer to a
//! pull-style engine body.
//!
//! The writer pends while the buffer is full and the reader pends while it
//! is empty. Both ends must be driven concurrently.
//!
//! A writer dropped without `shutdown` is an aborted body: the reader
//! reports `UnexpectedEof` instead of a clean end, so a truncated body never
//! looks complete to the engine.

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream, ReadBuf};

/// Default pipe capacity in bytes.
pub const DEFAULT_PIPE_CAPACITY: usize = 8 * 1024;

/// Create a pipe holding at most `capacity` buffered bytes.
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let capacity = capacity.max(1);
    let (write_half, read_half) = tokio::io::duplex(capacity);
    let closed = Arc::new(AtomicBool::new(false));

    (
        PipeWriter {
            inner: write_half,
            closed: closed.clone(),
        },
        PipeReader {
            inner: read_half,
            closed,
            capacity,
        },
    )
}

/// Write end, registered as the request's entity sink.
#[derive(Debug)]
pub struct PipeWriter {
    inner: DuplexStream,
    closed: Arc<AtomicBool>,
}

impl AsyncWrite for PipeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        // Must be visible before the reader can observe EOF.
        this.closed.store(true, Ordering::Release);
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

/// Read end, handed to the engine as the request body.
#[derive(Debug)]
pub struct PipeReader {
    inner: DuplexStream,
    closed: Arc<AtomicBool>,
    capacity: usize,
}

impl PipeReader {
    /// Stream of chunks, at most one buffer's worth each.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let chunk_size = self.capacity;
        stream::try_unfold(self, move |mut reader| async move {
            let mut chunk = BytesMut::with_capacity(chunk_size);
            let read = reader.read_buf(&mut chunk).await?;
            Ok((read > 0).then(|| (chunk.freeze(), reader)))
        })
    }

    /// Lazy engine body; nothing is read until the engine polls it.
    pub fn into_body(self) -> Body {
        Body::from_stream(self.into_stream())
    }
}

impl AsyncRead for PipeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let at_eof = buf.filled().len() == before && buf.remaining() > 0;
        if at_eof && !this.closed.load(Ordering::Acquire) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "request body writer dropped before closing",
            )));
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use futures_util::TryStreamExt;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_round_trip_across_chunk_sizes() {
        let capacity = 16;
        let chunks = [0usize, 1, 7, 0, 16, 17, 3 * capacity + 5, 0, 2];
        let expected: Vec<u8> = chunks.iter().flat_map(|len| payload(*len)).collect();

        let (mut writer, reader) = pipe(capacity);
        let consumer = tokio::spawn(async move { to_bytes(reader.into_body(), usize::MAX).await });

        for len in chunks {
            writer.write_all(&payload(len)).await.unwrap();
        }
        writer.shutdown().await.unwrap();

        let received = consumer.await.unwrap().unwrap();
        assert_eq!(received.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn test_chunks_never_exceed_capacity() {
        let (mut writer, reader) = pipe(8);
        let consumer = tokio::spawn(async move {
            reader.into_stream().try_collect::<Vec<Bytes>>().await
        });

        writer.write_all(&payload(100)).await.unwrap();
        writer.shutdown().await.unwrap();

        let chunks = consumer.await.unwrap().unwrap();
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 8));
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), 100);
    }

    #[tokio::test]
    async fn test_full_buffer_blocks_writer() {
        let (mut writer, mut reader) = pipe(4);

        let blocked = tokio::time::timeout(Duration::from_millis(50), writer.write_all(b"0123456789")).await;
        assert!(blocked.is_err(), "writer should wait for the reader");

        let mut first = [0u8; 4];
        reader.read_exact(&mut first).await.unwrap();
        assert_eq!(&first, b"0123");
    }

    #[tokio::test]
    async fn test_empty_reader_blocks() {
        let (_writer, mut reader) = pipe(4);
        let mut buf = [0u8; 4];
        let blocked = tokio::time::timeout(Duration::from_millis(50), reader.read(&mut buf)).await;
        assert!(blocked.is_err(), "reader should wait for the writer");
    }

    #[tokio::test]
    async fn test_dropped_writer_is_an_error() {
        let (mut writer, reader) = pipe(64);
        writer.write_all(b"partial").await.unwrap();
        drop(writer);

        let err = to_bytes(reader.into_body(), usize::MAX).await.unwrap_err();
        assert!(err.to_string().contains("dropped before closing"), "{err}");
    }

    #[tokio::test]
    async fn test_dropped_reader_breaks_writer() {
        let (mut writer, reader) = pipe(64);
        drop(reader);

        let err = writer.write_all(b"data").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
