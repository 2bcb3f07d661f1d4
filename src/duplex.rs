//! Streams that are both readable and writable.

use crate::{
    chunk::Chunk,
    error::{StreamError, StreamResult},
    options::DuplexOptions,
    readable::{ReadableEventKind, Source},
    scheduler::Scheduler,
    writable::Sink,
    Readable, Writable,
};
use std::rc::Rc;
use tracing::debug;

/// A readable side and a writable side with independent state.
///
/// The two sides share a scheduler but otherwise only interact on teardown, and, if half-open streams
/// are disallowed, when the readable side ends.
#[derive(Clone, Debug)]
pub struct Duplex {
    readable: Readable,
    writable: Writable,
}

impl Duplex {
    /// Create a stream that reads from `source` and writes into `sink`.
    pub fn new(
        source: impl Source + 'static,
        sink: impl Sink + 'static,
        options: DuplexOptions,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        let scheduler: Rc<dyn Scheduler> = Rc::new(scheduler);
        let readable =
            Readable::with_scheduler(Box::new(source), options.readable, scheduler.clone());
        let writable = Writable::with_scheduler(Box::new(sink), options.writable, scheduler);
        Self::from_parts(readable, writable, options.allow_half_open)
    }

    pub(crate) fn from_parts(readable: Readable, writable: Writable, allow_half_open: bool) -> Self {
        if !allow_half_open {
            let weak = writable.downgrade();
            readable.once(ReadableEventKind::End, move |_| {
                let Some(writable) = weak.upgrade() else {
                    return;
                };
                if !writable.writable_ended() {
                    debug!("readable side ended, ending writable side");
                    if let Err(error) = writable.end() {
                        debug!(%error, "cannot end writable side");
                    }
                }
            });
        }
        Self { readable, writable }
    }

    /// Returns the readable side.
    pub fn readable(&self) -> &Readable {
        &self.readable
    }

    /// Returns the writable side.
    pub fn writable(&self) -> &Writable {
        &self.writable
    }

    /// See [`Readable::push`].
    pub fn push(&self, chunk: impl Into<Chunk>) -> StreamResult<bool> {
        self.readable.push(chunk)
    }

    /// See [`Readable::push_eof`].
    pub fn push_eof(&self) -> bool {
        self.readable.push_eof()
    }

    /// See [`Readable::read`].
    pub fn read(&self, size: Option<usize>) -> Option<Chunk> {
        self.readable.read(size)
    }

    /// Pauses the readable side.
    pub fn pause(&self) {
        self.readable.pause()
    }

    /// Resumes the readable side.
    pub fn resume(&self) {
        self.readable.resume()
    }

    /// See [`Readable::pipe`].
    pub fn pipe(&self, dest: &Writable) -> Writable {
        self.readable.pipe(dest)
    }

    /// See [`Writable::write`].
    pub fn write(&self, chunk: impl Into<Chunk>) -> StreamResult<bool> {
        self.writable.write(chunk)
    }

    /// See [`Writable::write_with`].
    pub fn write_with(
        &self,
        chunk: impl Into<Chunk>,
        callback: impl FnOnce(StreamResult<()>) + 'static,
    ) -> StreamResult<bool> {
        self.writable.write_with(chunk, callback)
    }

    /// Corks the writable side.
    pub fn cork(&self) {
        self.writable.cork()
    }

    /// Releases one cork on the writable side.
    pub fn uncork(&self) {
        self.writable.uncork()
    }

    /// See [`Writable::end`].
    pub fn end(&self) -> StreamResult<()> {
        self.writable.end()
    }

    /// See [`Writable::end_with`].
    pub fn end_with(&self, chunk: impl Into<Chunk>) -> StreamResult<()> {
        self.writable.end_with(chunk)
    }

    /// Destroys both sides.
    pub fn destroy(&self, error: Option<StreamError>) {
        self.writable.destroy(error.clone());
        self.readable.destroy(error);
    }

    /// Returns `true` once both sides are destroyed.
    pub fn destroyed(&self) -> bool {
        self.readable.destroyed() && self.writable.destroyed()
    }
}

impl From<Duplex> for (Readable, Writable) {
    fn from(duplex: Duplex) -> Self {
        (duplex.readable, duplex.writable)
    }
}
