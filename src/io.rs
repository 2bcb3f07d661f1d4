//! Adapters to [`std::io`] and [`futures`].

use crate::{
    chunk::Chunk,
    error::{StreamError, StreamResult},
    notifier::ListenerId,
    readable::ReadableEventKind,
    writable::{WritableEvent, WritableEventKind},
    Readable, Writable,
};
use bytes::Bytes;
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use futures::{stream::Stream, task::AtomicWaker};
use std::{cell::RefCell, io, rc::Rc};

fn would_block() -> io::Error {
    io::Error::from(io::ErrorKind::WouldBlock)
}

/// Implements `std::io::Read` for a byte-mode readable.
///
/// Reads never wait. When no data is buffered and the stream hasn't ended, `read` fails with
/// [`io::ErrorKind::WouldBlock`].
#[derive(Clone, Debug)]
pub struct Reader(Readable);

impl Reader {
    /// Create a new `Reader`
    pub fn new(stream: Readable) -> Self {
        Self(stream)
    }

    /// Return the original `Readable`
    pub fn into_inner(self) -> Readable {
        self.0
    }
}

impl io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(error) = self.0.errored() {
            return Err(error.into());
        }
        if self.0.readable_length() == 0 {
            // Gives the source a chance to produce.
            self.0.read(Some(0));
        }
        let available = self.0.readable_length();
        if available == 0 {
            return if self.0.eof_received() {
                Ok(0)
            } else {
                Err(would_block())
            };
        }
        match self.0.read(Some(buf.len().min(available))) {
            Some(Chunk::Bytes(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(_) => Err(StreamError::InvalidChunk("readers only accept byte chunks").into()),
            None => Err(would_block()),
        }
    }
}

/// Implements `std::io::Write` for a writable.
///
/// Writes never wait. While the writable signals backpressure, `write` fails with
/// [`io::ErrorKind::WouldBlock`], as does `flush` while writes are pending.
#[derive(Clone, Debug)]
pub struct Writer(Writable);

impl Writer {
    /// Create a new `Writer`
    pub fn new(stream: Writable) -> Self {
        Self(stream)
    }

    /// Return the original `Writable`
    pub fn into_inner(self) -> Writable {
        self.0
    }

    fn check(&self) -> io::Result<()> {
        if let Some(error) = self.0.errored() {
            Err(error.into())
        } else if self.0.destroyed() {
            Err(StreamError::Destroyed.into())
        } else if self.0.writable_ended() {
            Err(StreamError::WriteAfterEnd.into())
        } else {
            Ok(())
        }
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        if self.0.writable_need_drain() {
            return Err(would_block());
        }
        self.0.write(Bytes::copy_from_slice(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        if self.0.writable_length() > 0 {
            Err(would_block())
        } else {
            Ok(())
        }
    }
}

struct Signal {
    waker: AtomicWaker,
}

impl Signal {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            waker: AtomicWaker::new(),
        })
    }
}

/// A [`Stream`] of the chunks of a readable.
///
/// The readable is consumed in paused mode, so it only pulls from its source as chunks are polled.
/// Yields an error if the readable fails, or [`StreamError::PrematureClose`] if it is destroyed before
/// it ends.
pub struct ChunkStream {
    readable: Readable,
    signal: Rc<Signal>,
    listeners: Vec<(ReadableEventKind, ListenerId)>,
    done: bool,
}

impl ChunkStream {
    /// Create a new `ChunkStream`
    pub fn new(readable: Readable) -> Self {
        let signal = Signal::new();
        let listeners = [
            ReadableEventKind::Readable,
            ReadableEventKind::End,
            ReadableEventKind::Error,
            ReadableEventKind::Close,
        ]
        .into_iter()
        .map(|kind| {
            let signal = signal.clone();
            (kind, readable.on(kind, move |_| signal.waker.wake()))
        })
        .collect();
        Self {
            readable,
            signal,
            listeners,
            done: false,
        }
    }
}

impl Stream for ChunkStream {
    type Item = StreamResult<Chunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        this.signal.waker.register(cx.waker());

        if let Some(error) = this.readable.errored() {
            this.done = true;
            return Poll::Ready(Some(Err(error)));
        }
        if let Some(chunk) = this.readable.read(None) {
            return Poll::Ready(Some(Ok(chunk)));
        }
        if this.readable.readable_ended() {
            this.done = true;
            return Poll::Ready(None);
        }
        if this.readable.destroyed() {
            this.done = true;
            return Poll::Ready(Some(Err(StreamError::PrematureClose)));
        }
        Poll::Pending
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        for (kind, id) in self.listeners.drain(..) {
            self.readable.off(kind, id);
        }
    }
}

impl Readable {
    /// Returns a [`Stream`] of this stream's chunks.
    pub fn chunks(&self) -> ChunkStream {
        ChunkStream::new(self.clone())
    }
}

struct Outcome {
    signal: Rc<Signal>,
    result: RefCell<Option<StreamResult<()>>>,
}

impl Outcome {
    fn settle(&self, result: StreamResult<()>) {
        let mut slot = self.result.borrow_mut();
        if slot.is_none() {
            *slot = Some(result);
            self.signal.waker.wake();
        }
    }
}

/// Future produced by [`Writable::finished`].
pub struct Finished {
    writable: Writable,
    outcome: Rc<Outcome>,
    listeners: Vec<(WritableEventKind, ListenerId)>,
}

impl Writable {
    /// Create a future that resolves once this stream finishes.
    ///
    /// Resolves with the stream's error if it fails, or [`StreamError::PrematureClose`] if it closes
    /// without finishing.
    pub fn finished(&self) -> Finished {
        let outcome = Rc::new(Outcome {
            signal: Signal::new(),
            result: RefCell::new(None),
        });
        if self.writable_finished() {
            outcome.settle(Ok(()));
        } else if let Some(error) = self.errored() {
            outcome.settle(Err(error));
        } else if self.close_emitted() {
            outcome.settle(Err(StreamError::PrematureClose));
        }

        let listeners = [
            WritableEventKind::Finish,
            WritableEventKind::Error,
            WritableEventKind::Close,
        ]
        .into_iter()
        .map(|kind| {
            let outcome = outcome.clone();
            let id = self.on(kind, move |event| match event {
                WritableEvent::Finish => outcome.settle(Ok(())),
                WritableEvent::Error(error) => outcome.settle(Err(error.clone())),
                _ => outcome.settle(Err(StreamError::PrematureClose)),
            });
            (kind, id)
        })
        .collect();

        Finished {
            writable: self.clone(),
            outcome,
            listeners,
        }
    }
}

impl Future for Finished {
    type Output = StreamResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.outcome.signal.waker.register(cx.waker());
        match this.outcome.result.borrow_mut().take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl Drop for Finished {
    fn drop(&mut self) {
        for (kind, id) in self.listeners.drain(..) {
            self.writable.off(kind, id);
        }
    }
}

/// Drains a readable into a vector of chunks, resolving once it ends.
pub async fn collect(readable: &Readable) -> StreamResult<Vec<Chunk>> {
    use futures::stream::TryStreamExt;
    readable.chunks().try_collect().await
}

/// Returns the concatenated bytes of `chunks`.
///
/// # Errors
/// Fails if a chunk is not a byte chunk.
pub fn concat(chunks: &[Chunk]) -> StreamResult<Bytes> {
    let mut out = bytes::BytesMut::new();
    for chunk in chunks {
        match chunk {
            Chunk::Bytes(bytes) => out.extend_from_slice(bytes),
            _ => return Err(StreamError::InvalidChunk("expected a byte chunk")),
        }
    }
    Ok(out.freeze())
}
