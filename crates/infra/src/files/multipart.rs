//! Multipart fields streamed from a reader.
//!
//! A pump copies the reader into a bounded channel whose receiving end is
//! the request body, so a part is never held in memory as a whole. The
//! field is declared with its exact length. The pump runs next to the
//! request: joined on the same task for tokio, on a scoped thread for the
//! blocking client.

use std::future::Future;
use std::io::{self, Read};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

use bytes::{Buf, Bytes};
use cloudsdk_domain::constants::BUFFER_PULL_SIZE;
use cloudsdk_domain::Result;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Chunks in flight between the pump and the transport.
const PUMP_DEPTH: usize = 4;

/// Run `send` with a body fed from `reader`.
///
/// A read failure of `reader` wins over the transport error it causes.
pub(crate) async fn stream_body<R, F, Fut, T>(reader: R, send: F) -> Result<T>
where
    R: AsyncRead + Unpin,
    F: FnOnce(reqwest::Body) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(PUMP_DEPTH);
    let body = reqwest::Body::wrap_stream(rx);

    let (outcome, pumped) = tokio::join!(send(body), pump(reader, tx));
    pumped?;
    outcome
}

async fn pump<R>(reader: R, mut tx: mpsc::Sender<io::Result<Bytes>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunks = ReaderStream::with_capacity(reader, BUFFER_PULL_SIZE);
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) => {
                if tx.send(Ok(chunk)).await.is_err() {
                    debug!("request ended before the body was drained");
                    return Ok(());
                }
            }
            Err(err) => {
                // Abort the body as well so the request does not hang.
                let _ = tx.send(Err(io::Error::new(err.kind(), err.to_string()))).await;
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Blocking twin of [`stream_body`].
pub(crate) fn stream_body_blocking<R, F, T>(reader: R, send: F) -> Result<T>
where
    R: Read + Send,
    F: FnOnce(ChannelReader) -> Result<T>,
{
    let (tx, rx) = sync_channel(PUMP_DEPTH);
    thread::scope(|scope| {
        let pump = scope.spawn(move || pump_blocking(reader, tx));
        let outcome = send(ChannelReader::new(rx));
        let pumped = pump
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "body pump panicked")));
        pumped?;
        outcome
    })
}

fn pump_blocking<R: Read>(mut reader: R, tx: SyncSender<io::Result<Bytes>>) -> io::Result<()> {
    let mut buf = vec![0u8; BUFFER_PULL_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(Err(io::Error::new(err.kind(), err.to_string())));
                return Err(err);
            }
        };
        if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
            debug!("request ended before the body was drained");
            return Ok(());
        }
    }
}

/// Receiving end of a blocking pump, readable as a request body.
#[derive(Debug)]
pub(crate) struct ChannelReader {
    rx: Receiver<io::Result<Bytes>>,
    current: Bytes,
}

impl ChannelReader {
    fn new(rx: Receiver<io::Result<Bytes>>) -> Self {
        Self { rx, current: Bytes::new() }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.current.is_empty() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => self.current = chunk,
                Ok(Err(err)) => return Err(err),
                // Pump finished and hung up.
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.current.len());
        out[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}
