//! # Telemetry Reader Task
//!
//! Drains a [`ByteSource`] into a [`TelemetryPipeline`] on its own tokio task.
//!
//! Stopping is cooperative: [`ReaderHandle::stop`] raises a flag that the
//! task checks between reads. A chunk that has already been read is always
//! ingested completely before the task exits.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::pipeline::TelemetryPipeline;
use crate::serial::port_trait::ByteSource;

/// Why the reader task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderExit {
    /// [`ReaderHandle::stop`] was called
    Stopped,
    /// The source reported end of stream
    EndOfStream,
    /// The source returned an unrecoverable read error
    Failed(String),
}

/// Control handle for a spawned reader task
#[derive(Debug)]
pub struct ReaderHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<ReaderExit>,
    exit: Option<ReaderExit>,
}

/// Spawn the reader task
///
/// # Arguments
///
/// * `source` - Inbound byte stream (serial port half, or a test duplex)
/// * `pipeline` - Framer, decoder and the state it writes to
/// * `buffer_size` - Bytes requested per read
pub fn spawn_reader<S: ByteSource + 'static>(
    mut source: S,
    mut pipeline: TelemetryPipeline,
    buffer_size: usize,
) -> ReaderHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut buf = vec![0u8; buffer_size.max(1)];
        info!("Telemetry reader started");

        let exit = loop {
            if *stop_rx.borrow() {
                break ReaderExit::Stopped;
            }

            tokio::select! {
                biased;

                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break ReaderExit::Stopped;
                    }
                }

                result = source.read_chunk(&mut buf) => match result {
                    Ok(0) => break ReaderExit::EndOfStream,
                    Ok(n) => {
                        let summary = pipeline.ingest(&buf[..n]);
                        debug!("Read {} bytes: {:?}", n, summary);
                    }
                    Err(e) if is_transient(&e) => {
                        debug!("Transient read error: {}", e);
                    }
                    Err(e) => break ReaderExit::Failed(e.to_string()),
                }
            }
        };

        match &exit {
            ReaderExit::Failed(e) => warn!("Telemetry reader failed: {}", e),
            other => info!("Telemetry reader finished: {:?}", other),
        }
        exit
    });

    ReaderHandle {
        stop_tx,
        task,
        exit: None,
    }
}

fn is_transient(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::WouldBlock
    )
}

impl ReaderHandle {
    /// Wait until the task ends on its own (end of stream or failure)
    ///
    /// Cancel safe, so it can be used in `tokio::select!`.
    pub async fn wait(&mut self) -> ReaderExit {
        if let Some(exit) = &self.exit {
            return exit.clone();
        }
        let exit = join_exit((&mut self.task).await);
        self.exit = Some(exit.clone());
        exit
    }

    /// Ask the task to stop and wait for it to finish its current chunk
    pub async fn stop(mut self) -> ReaderExit {
        if let Some(exit) = self.exit.take() {
            return exit;
        }
        // The task may already have exited and dropped its receiver
        let _ = self.stop_tx.send(true);
        join_exit(self.task.await)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.exit.is_some() || self.task.is_finished()
    }
}

fn join_exit(result: std::result::Result<ReaderExit, tokio::task::JoinError>) -> ReaderExit {
    result.unwrap_or_else(|e| ReaderExit::Failed(format!("reader task aborted: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adcs::protocol::Vector3;
    use crate::serial::port_trait::ReaderSource;
    use crate::store::rolling::{AxisChannel, ScalarChannel};
    use crate::store::state::AdcsState;
    use async_trait::async_trait;
    use std::io;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_reads_until_end_of_stream() {
        let state = AdcsState::shared(16);
        let (mut tx, rx) = tokio::io::duplex(64);
        let pipeline = TelemetryPipeline::new(state.clone());
        let mut handle = spawn_reader(ReaderSource::new(rx), pipeline, 8);

        tx.write_all(b"counter 5\nacc(1.0,2.0,3.0)\n").await.unwrap();
        tx.write_all(b"temp21.5\n").await.unwrap();
        drop(tx);

        assert_eq!(handle.wait().await, ReaderExit::EndOfStream);
        assert!(handle.is_finished());
        assert_eq!(state.packet_stats().last_packet_number, Some(5));
        assert_eq!(
            state.channels.latest(AxisChannel::Acceleration),
            Some(Vector3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(state.channels.latest_scalar(ScalarChannel::Temperature), Some(21.5));

        // stop after a natural exit reports the first exit reason
        assert_eq!(handle.stop().await, ReaderExit::EndOfStream);
    }

    #[tokio::test]
    async fn test_stop_is_cooperative() {
        let state = AdcsState::shared(16);
        let (mut tx, rx) = tokio::io::duplex(64);
        let handle = spawn_reader(ReaderSource::new(rx), TelemetryPipeline::new(state.clone()), 64);

        tx.write_all(b"temp19.0\n").await.unwrap();
        tokio::task::yield_now().await;
        while state.channels.latest_scalar(ScalarChannel::Temperature).is_none() {
            tokio::task::yield_now().await;
        }

        assert_eq!(handle.stop().await, ReaderExit::Stopped);
        // writer still open: the reader exited because of the flag
        tx.write_all(b"temp25.0\n").await.ok();
        assert_eq!(state.channels.latest_scalar(ScalarChannel::Temperature), Some(19.0));
    }

    struct FailingSource {
        errors: Vec<io::ErrorKind>,
    }

    #[async_trait]
    impl ByteSource for FailingSource {
        async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.errors.pop() {
                Some(kind) => Err(io::Error::new(kind, "mock read error")),
                None => {
                    let line = b"counter 1\n";
                    buf[..line.len()].copy_from_slice(line);
                    self.errors.push(io::ErrorKind::BrokenPipe);
                    Ok(line.len())
                }
            }
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let state = AdcsState::shared(16);
        // popped from the back: TimedOut, Interrupted, then data, then BrokenPipe
        let source = FailingSource {
            errors: vec![io::ErrorKind::Interrupted, io::ErrorKind::TimedOut],
        };
        let mut handle = spawn_reader(source, TelemetryPipeline::new(state.clone()), 32);

        match handle.wait().await {
            ReaderExit::Failed(msg) => assert!(msg.contains("mock read error")),
            other => panic!("Expected Failed, got: {:?}", other),
        }
        assert_eq!(state.packet_stats().total_count, 1);
    }
}
