//! Duplex streams whose output is computed from their input.

use crate::{
    chunk::{Chunk, Encoding},
    completion::Completion,
    duplex::Duplex,
    error::{StreamError, StreamResult},
    options::DuplexOptions,
    readable::Source,
    scheduler::Scheduler,
    writable::{Sink, WeakWritable},
    Readable, Writable,
};
use once_cell::unsync::OnceCell;
use std::{cell::RefCell, fmt, ops::Deref, rc::Rc};
use tracing::trace;

/// Computes the output of a [`Transform`].
pub trait Transformer {
    /// Transforms one written chunk.
    ///
    /// Output may be pushed with [`TransformDone::push`] any number of times, and `done` must be completed
    /// once the chunk was consumed.
    fn transform(&mut self, chunk: Chunk, encoding: Encoding, done: TransformDone);

    /// Produces any remaining output after the writable side ended.
    fn flush(&mut self, done: TransformDone) {
        done.complete(Ok(None))
    }
}

impl<F> Transformer for F
where
    F: FnMut(Chunk, Encoding) -> StreamResult<Option<Chunk>>,
{
    fn transform(&mut self, chunk: Chunk, encoding: Encoding, done: TransformDone) {
        done.complete(self(chunk, encoding))
    }
}

// Shared by both sides of one transform.
struct Link {
    // The completion of a write whose output is waiting to be read. Writes are serialized, so there is at
    // most one.
    continuation: RefCell<Option<Completion>>,
    writable: OnceCell<WeakWritable>,
}

impl Link {
    fn park(&self, done: Completion) {
        let previous = self.continuation.borrow_mut().replace(done);
        debug_assert!(previous.is_none(), "two writes awaiting a read");
    }

    fn resume(&self) {
        let done = self.continuation.borrow_mut().take();
        if let Some(done) = done {
            trace!("output consumed, resuming transform");
            done.complete(Ok(()));
        }
    }

    fn writable_ended(&self) -> bool {
        self.writable
            .get()
            .and_then(WeakWritable::upgrade)
            .map_or(true, |writable| writable.writable_ended())
    }
}

enum Step {
    Write(Completion, Rc<Link>),
    Flush(Completion),
}

/// Completes a [`Transformer`] call.
pub struct TransformDone {
    readable: Readable,
    step: Step,
}

impl TransformDone {
    /// Pushes output to the readable side.
    ///
    /// # Errors
    /// Fails if the chunk is invalid for the readable side's mode.
    pub fn push(&self, chunk: impl Into<Chunk>) -> StreamResult<bool> {
        self.readable.push(chunk)
    }

    /// Completes the call, pushing `output` first if there is any.
    ///
    /// An error fails the write, which destroys the stream.
    pub fn complete(self, result: StreamResult<Option<Chunk>>) {
        let Self { readable, step } = self;
        let hook = match &step {
            Step::Write(..) => "transform",
            Step::Flush(_) => "flush",
        };
        let length = readable.readable_length();
        let result = result.and_then(|output| match output {
            Some(chunk) => readable.push(chunk).map(drop),
            None => Ok(()),
        });
        match (step, result) {
            (Step::Write(completion, _), Err(e)) | (Step::Flush(completion), Err(e)) => {
                trace!(error = %e, "{hook} failed");
                completion.complete(Err(e));
            }
            (Step::Write(completion, link), Ok(())) => {
                let unread = readable.readable_length();
                if readable.eof_received()
                    || link.writable_ended()
                    || unread == length
                    || unread < readable.readable_high_water_mark()
                {
                    completion.complete(Ok(()));
                } else {
                    link.park(completion);
                }
            }
            (Step::Flush(completion), Ok(())) => {
                readable.push_eof();
                completion.complete(Ok(()));
            }
        }
    }
}

impl fmt::Debug for TransformDone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let step = match self.step {
            Step::Write(..) => "write",
            Step::Flush(_) => "flush",
        };
        f.debug_struct("TransformDone").field("step", &step).finish()
    }
}

struct TransformSource(Rc<Link>);

impl Source for TransformSource {
    fn read(&mut self, _size: usize, _stream: &Readable) {
        self.0.resume();
    }
}

struct TransformSink {
    transformer: Box<dyn Transformer>,
    readable: Readable,
    link: Rc<Link>,
}

impl Sink for TransformSink {
    fn write(&mut self, chunk: Chunk, encoding: Encoding, done: Completion) {
        self.transformer.transform(
            chunk,
            encoding,
            TransformDone {
                readable: self.readable.clone(),
                step: Step::Write(done, self.link.clone()),
            },
        );
    }

    fn finalize(&mut self, done: Completion) {
        self.transformer.flush(TransformDone {
            readable: self.readable.clone(),
            step: Step::Flush(done),
        });
    }

    fn destroy(&mut self, error: Option<&StreamError>, done: Completion) {
        self.link.continuation.borrow_mut().take();
        if let Some(error) = error {
            self.readable.destroy(Some(error.clone()));
        }
        done.complete(Ok(()));
    }
}

/// A duplex stream that passes every written chunk through a [`Transformer`] and makes the output
/// readable.
///
/// Writes are held back while the output is not being consumed.
#[derive(Clone, Debug)]
pub struct Transform(Duplex);

impl Transform {
    /// Create a transform stream.
    pub fn new(
        transformer: impl Transformer + 'static,
        options: DuplexOptions,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        let scheduler: Rc<dyn Scheduler> = Rc::new(scheduler);
        let link = Rc::new(Link {
            continuation: RefCell::new(None),
            writable: OnceCell::new(),
        });
        let readable = Readable::with_scheduler(
            Box::new(TransformSource(link.clone())),
            options.readable,
            scheduler.clone(),
        );
        let writable = Writable::with_scheduler(
            Box::new(TransformSink {
                transformer: Box::new(transformer),
                readable: readable.clone(),
                link: link.clone(),
            }),
            options.writable,
            scheduler,
        );
        link.writable.get_or_init(|| writable.downgrade());
        Self(Duplex::from_parts(readable, writable, options.allow_half_open))
    }

    /// Create a transform stream that passes chunks through unchanged.
    pub fn pass_through(options: DuplexOptions, scheduler: impl Scheduler + 'static) -> Self {
        Self::new(
            |chunk: Chunk, _: Encoding| -> StreamResult<Option<Chunk>> { Ok(Some(chunk)) },
            options,
            scheduler,
        )
    }
}

impl Deref for Transform {
    type Target = Duplex;

    fn deref(&self) -> &Duplex {
        &self.0
    }
}
