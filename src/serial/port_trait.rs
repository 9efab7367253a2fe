//! Trait abstraction for the byte transport to enable testing
//!
//! The reader task consumes a [`ByteSource`], command sending writes to a
//! [`ByteSink`]. Any tokio `AsyncRead`/`AsyncWrite` half can be wrapped, so
//! tests can drive both sides with `tokio::io::duplex`.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Inbound byte stream
#[async_trait]
pub trait ByteSource: Send {
    /// Read the next chunk into `buf`; `Ok(0)` means the stream ended
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Outbound byte stream
#[async_trait]
pub trait ByteSink: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// [`ByteSource`] over any async reader
pub struct ReaderSource<R> {
    inner: R,
}

impl<R> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ByteSource for ReaderSource<R> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).await
    }
}

/// [`ByteSink`] over any async writer
pub struct WriterSink<W> {
    inner: W,
}

impl<W> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ByteSink for WriterSink<W> {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplex_source_and_sink() {
        let (client, server) = tokio::io::duplex(64);
        let mut sink = WriterSink::new(client);
        let mut source = ReaderSource::new(server);

        sink.write_all(b"imu start\r").await.unwrap();
        sink.flush().await.unwrap();

        let mut buf = [0u8; 32];
        let n = source.read_chunk(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"imu start\r");
    }

    #[tokio::test]
    async fn test_source_reports_eof() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut source = ReaderSource::new(server);
        let mut buf = [0u8; 8];
        assert_eq!(source.read_chunk(&mut buf).await.unwrap(), 0);
    }

    #[test]
    fn test_mock_sink_records_and_fails() {
        let mut mock = mocks::MockByteSink::new();
        tokio_test::block_on(async {
            mock.write_all(b"pwm duty 0 0\r").await.unwrap();
            mock.flush().await.unwrap();
        });
        assert_eq!(mock.get_written_text(), vec!["pwm duty 0 0\r".to_string()]);
        assert_eq!(mock.get_flush_count(), 1);

        mock.set_write_error(io::ErrorKind::BrokenPipe);
        let result = tokio_test::block_on(mock.write_all(b"imu stop\r"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
