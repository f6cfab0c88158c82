//! Downstream writers that receive fetched bodies.
//!
//! The engine only depends on the [`Writer`] trait. Two implementations are
//! provided: [`ChannelWriter`] feeds an in-process pipeline stage through a
//! tokio channel, [`StdoutWriter`] prints to standard output.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::{Mutex, mpsc};

/// Default capacity of a [`ChannelWriter`] buffer, in chunks.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A unit of data pushed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Text decoded as UTF-8.
    Text(String),
    /// Raw bytes.
    Binary(Bytes),
}

impl Chunk {
    /// Returns the chunk's bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// Errors raised by a [`Writer`].
#[derive(Debug, Error)]
pub enum WriterError {
    /// The writer was already closed.
    #[error("writer is closed")]
    Closed,

    /// The receiving end went away.
    #[error("downstream reader dropped")]
    Disconnected,

    /// Writing to the underlying sink failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives chunks from the engine.
///
/// `push` may be called from several requests at once; implementations keep
/// each call atomic. `close` may be called more than once and must treat
/// every call after the first as a no-op.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Forwards one chunk downstream.
    async fn push(&self, chunk: Chunk) -> Result<(), WriterError>;

    /// Signals end of data.
    async fn close(&self) -> Result<(), WriterError>;
}

/// Writer backed by a bounded tokio channel.
///
/// Closing drops the sender, so the paired [`ChannelReader`] observes end of
/// stream once buffered chunks are drained.
#[derive(Debug)]
pub struct ChannelWriter {
    sender: Mutex<Option<mpsc::Sender<Chunk>>>,
}

/// Receiving side of a [`ChannelWriter`].
#[derive(Debug)]
pub struct ChannelReader {
    receiver: mpsc::Receiver<Chunk>,
}

impl ChannelWriter {
    /// Creates a writer/reader pair with the given buffer capacity (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> (Self, ChannelReader) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Mutex::new(Some(sender)),
            },
            ChannelReader { receiver },
        )
    }

    /// Returns true once `close` has been called.
    pub async fn is_closed(&self) -> bool {
        self.sender.lock().await.is_none()
    }
}

#[async_trait]
impl Writer for ChannelWriter {
    async fn push(&self, chunk: Chunk) -> Result<(), WriterError> {
        let sender = self.sender.lock().await.clone().ok_or(WriterError::Closed)?;
        sender
            .send(chunk)
            .await
            .map_err(|_| WriterError::Disconnected)
    }

    async fn close(&self) -> Result<(), WriterError> {
        self.sender.lock().await.take();
        Ok(())
    }
}

impl ChannelReader {
    /// Receives the next chunk, or `None` once the writer is closed and drained.
    pub async fn recv(&mut self) -> Option<Chunk> {
        self.receiver.recv().await
    }

    /// Drains every remaining chunk until the writer closes.
    pub async fn collect(mut self) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.recv().await {
            chunks.push(chunk);
        }
        chunks
    }

    /// Drains the channel and concatenates the chunks as text.
    pub async fn collect_string(self) -> String {
        let bytes = self.collect_bytes().await;
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Drains the channel and concatenates the chunks as bytes.
    pub async fn collect_bytes(self) -> Bytes {
        let mut buffer = BytesMut::new();
        for chunk in self.collect().await {
            buffer.extend_from_slice(chunk.as_bytes());
        }
        buffer.freeze()
    }
}

/// Writer that prints chunks to standard output.
#[derive(Debug)]
pub struct StdoutWriter {
    stdout: Mutex<Option<Stdout>>,
}

impl Default for StdoutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutWriter {
    /// Creates a writer over the process's standard output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(Some(tokio::io::stdout())),
        }
    }
}

#[async_trait]
impl Writer for StdoutWriter {
    async fn push(&self, chunk: Chunk) -> Result<(), WriterError> {
        let mut guard = self.stdout.lock().await;
        let stdout = guard.as_mut().ok_or(WriterError::Closed)?;
        stdout.write_all(chunk.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), WriterError> {
        if let Some(mut stdout) = self.stdout.lock().await.take() {
            stdout.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_channel_writer_delivers_in_order() {
        let (writer, reader) = ChannelWriter::new(8);
        writer.push(Chunk::Text("Hello, ".into())).await.unwrap();
        writer.push(Chunk::Text("World!".into())).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(reader.collect_string().await, "Hello, World!");
    }

    #[tokio::test]
    async fn test_channel_writer_double_close_is_noop() {
        let (writer, reader) = ChannelWriter::new(1);
        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(writer.is_closed().await);
        assert!(reader.collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_push_after_close_fails() {
        let (writer, _reader) = ChannelWriter::new(1);
        writer.close().await.unwrap();
        let result = writer.push(Chunk::Text("late".into())).await;
        assert!(matches!(result, Err(WriterError::Closed)));
    }

    #[tokio::test]
    async fn test_push_after_reader_dropped_fails() {
        let (writer, reader) = ChannelWriter::new(1);
        drop(reader);
        let result = writer.push(Chunk::Binary(Bytes::from_static(b"x"))).await;
        assert!(matches!(result, Err(WriterError::Disconnected)));
    }

    #[tokio::test]
    async fn test_concurrent_pushes_keep_chunks_whole() {
        let (writer, reader) = ChannelWriter::new(4);
        let writer = Arc::new(writer);

        let mut handles = Vec::new();
        for i in 0..10 {
            let writer = Arc::clone(&writer);
            handles.push(tokio::spawn(async move {
                writer.push(Chunk::Text(format!("chunk-{i};"))).await.unwrap();
            }));
        }
        let collector = tokio::spawn(reader.collect());
        for handle in handles {
            handle.await.unwrap();
        }
        writer.close().await.unwrap();

        let chunks = collector.await.unwrap();
        assert_eq!(chunks.len(), 10);
        for chunk in chunks {
            let Chunk::Text(text) = chunk else {
                panic!("expected text chunk");
            };
            assert!(text.starts_with("chunk-") && text.ends_with(';'));
        }
    }

    #[tokio::test]
    async fn test_collect_bytes_mixes_text_and_binary() {
        let (writer, reader) = ChannelWriter::new(4);
        writer.push(Chunk::Text("ab".into())).await.unwrap();
        writer
            .push(Chunk::Binary(Bytes::from_static(b"cd")))
            .await
            .unwrap();
        writer.close().await.unwrap();
        assert_eq!(reader.collect_bytes().await, Bytes::from_static(b"abcd"));
    }

    #[test]
    fn test_channel_writer_needs_no_runtime_for_buffered_pushes() {
        let (writer, reader) = ChannelWriter::new(2);
        tokio_test::block_on(async {
            writer.push(Chunk::Text("a".into())).await.unwrap();
            writer.push(Chunk::Text("b".into())).await.unwrap();
            writer.close().await.unwrap();
            assert_eq!(reader.collect_string().await, "ab");
        });
    }

    #[tokio::test]
    async fn test_stdout_writer_rejects_push_after_close() {
        let writer = StdoutWriter::new();
        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(matches!(
            writer.push(Chunk::Text(String::new())).await,
            Err(WriterError::Closed)
        ));
    }
}
