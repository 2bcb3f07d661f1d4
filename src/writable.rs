//! The consumer side of a stream.

use crate::{
    chunk::{Chunk, Encoding},
    completion::Completion,
    error::{StreamError, StreamResult},
    notifier::{Event, ListenerId, Notifier},
    options::WritableOptions,
    scheduler::Scheduler,
    Readable,
};
use std::{
    cell::{RefCell, RefMut},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};
use tracing::{debug, trace};

/// Consumes data written to a [`Writable`].
pub trait Sink {
    /// Consumes one chunk.
    ///
    /// `encoding` is [`Encoding::Buffer`] for byte chunks. `done` must be completed once the chunk was
    /// handled. The stream never calls `write` again before that.
    fn write(&mut self, chunk: Chunk, encoding: Encoding, done: Completion);

    /// One-time setup run before the first write.
    ///
    /// Writes are queued until `done` completes. A failure destroys the stream.
    fn construct(&mut self, done: Completion) {
        done.complete(Ok(()))
    }

    /// Runs once after the last write completed and before `finish` is emitted.
    fn finalize(&mut self, done: Completion) {
        done.complete(Ok(()))
    }

    /// Releases resources when the stream is destroyed. `close` is emitted after `done` completes.
    fn destroy(&mut self, _error: Option<&StreamError>, done: Completion) {
        done.complete(Ok(()))
    }
}

impl<F> Sink for F
where
    F: FnMut(Chunk, Encoding, Completion),
{
    fn write(&mut self, chunk: Chunk, encoding: Encoding, done: Completion) {
        self(chunk, encoding, done)
    }
}

/// Notifications emitted by a [`Writable`].
#[derive(Clone, Debug)]
pub enum WritableEvent {
    /// The pending writes that caused backpressure have all completed.
    Drain,
    /// All writes completed after `end`. Emitted at most once.
    Finish,
    Close,
    Error(StreamError),
    /// A readable started piping into this stream.
    Pipe(Readable),
    /// A readable stopped piping into this stream.
    Unpipe(Readable),
}

/// Keys for subscribing to [`WritableEvent`]s.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WritableEventKind {
    Drain,
    Finish,
    Close,
    Error,
    Pipe,
    Unpipe,
}

impl Event for WritableEvent {
    type Kind = WritableEventKind;

    fn kind(&self) -> WritableEventKind {
        match self {
            Self::Drain => WritableEventKind::Drain,
            Self::Finish => WritableEventKind::Finish,
            Self::Close => WritableEventKind::Close,
            Self::Error(_) => WritableEventKind::Error,
            Self::Pipe(_) => WritableEventKind::Pipe,
            Self::Unpipe(_) => WritableEventKind::Unpipe,
        }
    }
}

/// Invoked once a write (or `end`) is resolved.
pub type WriteCallback = Box<dyn FnOnce(StreamResult<()>)>;

struct PendingWrite {
    chunk: Chunk,
    encoding: Encoding,
    len: usize,
    callback: Option<WriteCallback>,
}

struct WritableState {
    object_mode: bool,
    high_water_mark: usize,
    default_encoding: Encoding,
    decode_strings: bool,
    emit_close: bool,
    auto_destroy: bool,

    // Includes the write in flight.
    length: usize,
    buffered: VecDeque<PendingWrite>,
    writing: bool,
    write_len: usize,
    write_callback: Option<WriteCallback>,
    // Set while the sink's `write` hook is on the stack.
    sync: bool,
    // Callbacks of accepted writes that haven't been invoked yet.
    pending_callbacks: usize,
    need_drain: bool,
    corked: usize,
    constructed: bool,

    ending: bool,
    ended: bool,
    final_called: bool,
    prefinished: bool,
    finish_scheduled: bool,
    finished: bool,
    end_callbacks: Vec<WriteCallback>,

    destroyed: bool,
    errored: Option<StreamError>,
    error_emitted: bool,
    close_emitted: bool,
}

impl WritableState {
    fn new(options: &WritableOptions) -> Self {
        Self {
            object_mode: options.object_mode,
            high_water_mark: options.resolved_high_water_mark(),
            default_encoding: options.default_encoding,
            decode_strings: options.decode_strings,
            emit_close: options.emit_close,
            auto_destroy: options.auto_destroy,
            length: 0,
            buffered: VecDeque::new(),
            writing: false,
            write_len: 0,
            write_callback: None,
            sync: false,
            pending_callbacks: 0,
            need_drain: false,
            corked: 0,
            constructed: false,
            ending: false,
            ended: false,
            final_called: false,
            prefinished: false,
            finish_scheduled: false,
            finished: false,
            end_callbacks: Vec::new(),
            destroyed: false,
            errored: None,
            error_emitted: false,
            close_emitted: false,
        }
    }

    // Resolves a chunk to what the sink receives.
    fn prepare(&self, chunk: Chunk) -> StreamResult<(Chunk, Encoding)> {
        match chunk {
            Chunk::Bytes(bytes) => Ok((Chunk::Bytes(bytes), Encoding::Buffer)),
            Chunk::Text(text, encoding) => {
                let encoding = encoding.unwrap_or(self.default_encoding);
                if self.decode_strings && !self.object_mode {
                    Ok((Chunk::Bytes(encoding.encode(&text)?), Encoding::Buffer))
                } else {
                    Ok((Chunk::Text(text, Some(encoding)), encoding))
                }
            }
            Chunk::Object(_) if !self.object_mode => Err(StreamError::InvalidChunk(
                "objects are only accepted in object mode",
            )),
            object => Ok((object, self.default_encoding)),
        }
    }

    fn rejection(&self) -> Option<StreamError> {
        if self.ending {
            Some(StreamError::WriteAfterEnd)
        } else if self.destroyed {
            Some(StreamError::Destroyed)
        } else {
            self.errored.clone()
        }
    }

    fn need_finish(&self) -> bool {
        self.ending
            && self.constructed
            && self.length == 0
            && self.buffered.is_empty()
            && self.errored.is_none()
            && !self.destroyed
            && !self.finished
            && !self.writing
            && !self.close_emitted
    }

    fn can_dispatch(&self) -> bool {
        !self.writing && !self.sync && self.corked == 0 && self.constructed && !self.destroyed
    }
}

struct Shared {
    state: RefCell<WritableState>,
    events: Notifier<WritableEvent>,
    // Taken out while a hook runs, so a hook can never be entered twice.
    sink: RefCell<Option<Box<dyn Sink>>>,
    scheduler: Rc<dyn Scheduler>,
}

/// The consumer side of a stream.
///
/// A `Writable` serializes writes into its [`Sink`], queueing any that arrive while a write is in
/// flight, and signals backpressure once the pending size reaches the high-water-mark. Cloning the
/// handle shares the stream.
#[derive(Clone)]
pub struct Writable(Rc<Shared>);

#[derive(Clone)]
pub(crate) struct WeakWritable(Weak<Shared>);

impl WeakWritable {
    pub(crate) fn upgrade(&self) -> Option<Writable> {
        self.0.upgrade().map(Writable)
    }
}

impl Writable {
    /// Create a stream that writes into `sink`.
    pub fn new(
        sink: impl Sink + 'static,
        options: WritableOptions,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        Self::with_scheduler(Box::new(sink), options, Rc::new(scheduler))
    }

    pub(crate) fn with_scheduler(
        sink: Box<dyn Sink>,
        options: WritableOptions,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let stream = Self(Rc::new(Shared {
            state: RefCell::new(WritableState::new(&options)),
            events: Notifier::new(),
            sink: RefCell::new(Some(sink)),
            scheduler,
        }));
        let weak = stream.downgrade();
        stream.with_sink(|sink| {
            sink.construct(Completion::new(move |result| {
                if let Some(stream) = weak.upgrade() {
                    stream.on_constructed(result);
                }
            }))
        });
        stream
    }

    pub(crate) fn downgrade(&self) -> WeakWritable {
        WeakWritable(Rc::downgrade(&self.0))
    }

    /// Returns `true` if both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Writable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn state(&self) -> RefMut<'_, WritableState> {
        self.0.state.borrow_mut()
    }

    fn emit(&self, event: WritableEvent) -> bool {
        self.0.events.emit(&event)
    }

    fn defer(&self, task: impl FnOnce(&Writable) + 'static) {
        let this = self.clone();
        self.0.scheduler.defer(Box::new(move || task(&this)));
    }

    fn defer_callback(&self, callback: WriteCallback, result: StreamResult<()>) {
        self.0.scheduler.defer(Box::new(move || callback(result)));
    }

    // Runs `f` with the sink taken out of its slot. A sink that comes back to a destroyed stream is torn
    // down instead of restored.
    fn with_sink(&self, f: impl FnOnce(&mut dyn Sink)) {
        let Some(mut sink) = self.0.sink.borrow_mut().take() else {
            return;
        };
        f(sink.as_mut());
        if self.0.state.borrow().destroyed {
            self.teardown(sink);
        } else {
            *self.0.sink.borrow_mut() = Some(sink);
        }
    }

    fn on_constructed(&self, result: StreamResult<()>) {
        match result {
            Ok(()) => {
                self.state().constructed = true;
                self.clear_buffer();
                self.finish_maybe();
            }
            Err(e) => self.destroy(Some(e)),
        }
    }

    /// Writes a chunk.
    ///
    /// Returns `false` once the pending size reaches the high-water-mark. The caller should then wait for
    /// [`WritableEvent::Drain`] before writing more. A write to a stream that is ending or errored is
    /// rejected and reported through an `error` notification.
    ///
    /// # Errors
    /// Fails if the chunk is invalid for the stream's mode or its text cannot be encoded, and with the
    /// rejection itself if the stream was destroyed.
    pub fn write(&self, chunk: impl Into<Chunk>) -> StreamResult<bool> {
        self.write_chunk(chunk.into(), None)
    }

    /// Writes a chunk and invokes `callback` once it was handled by the sink, or rejected.
    ///
    /// # Errors
    /// Fails if the chunk is invalid for the stream's mode or its text cannot be encoded. `callback` is
    /// not invoked in that case.
    pub fn write_with(
        &self,
        chunk: impl Into<Chunk>,
        callback: impl FnOnce(StreamResult<()>) + 'static,
    ) -> StreamResult<bool> {
        self.write_chunk(chunk.into(), Some(Box::new(callback)))
    }

    fn write_chunk(&self, chunk: Chunk, callback: Option<WriteCallback>) -> StreamResult<bool> {
        let mut state = self.state();
        let (chunk, encoding) = state.prepare(chunk)?;

        if let Some(error) = state.rejection() {
            let destroyed = state.destroyed;
            drop(state);
            debug!(%error, "rejecting write");
            match callback {
                Some(callback) => self.defer_callback(callback, Err(error)),
                // A destroyed stream already reported its failure.
                None if destroyed => return Err(error),
                None => self.defer(move |stream| {
                    stream.emit(WritableEvent::Error(error));
                }),
            }
            return Ok(false);
        }

        let len = if state.object_mode { 1 } else { chunk.len() };
        state.length += len;
        state.pending_callbacks += 1;
        let ret = state.length < state.high_water_mark;
        if !ret {
            state.need_drain = true;
        }

        let queue = !state.can_dispatch() || !state.buffered.is_empty();
        if queue {
            trace!(len, queued = state.buffered.len() + 1, "buffering write");
            state.buffered.push_back(PendingWrite {
                chunk,
                encoding,
                len,
                callback,
            });
        } else {
            drop(state);
            self.do_write(chunk, encoding, len, callback);
            // Picks up writes the sink issued against this stream from inside its own hook.
            self.clear_buffer();
        }
        Ok(ret)
    }

    fn do_write(&self, chunk: Chunk, encoding: Encoding, len: usize, callback: Option<WriteCallback>) {
        {
            let mut state = self.state();
            state.writing = true;
            state.write_len = len;
            state.write_callback = callback;
            state.sync = true;
        }
        trace!(len, "dispatching write");
        let weak = self.downgrade();
        self.with_sink(|sink| {
            sink.write(
                chunk,
                encoding,
                Completion::new(move |result| {
                    if let Some(stream) = weak.upgrade() {
                        stream.on_write_end(result);
                    }
                }),
            )
        });
        self.state().sync = false;
    }

    fn on_write_end(&self, result: StreamResult<()>) {
        let (sync, callback) = {
            let mut state = self.state();
            state.writing = false;
            state.length -= std::mem::take(&mut state.write_len);
            (state.sync, state.write_callback.take())
        };

        if let Err(error) = result {
            debug!(%error, "sink write failed");
            let auto_destroy = {
                let mut state = self.state();
                state.pending_callbacks -= 1;
                state.errored.get_or_insert_with(|| error.clone());
                state.auto_destroy
            };
            if let Some(callback) = callback {
                if sync {
                    self.defer_callback(callback, Err(error.clone()));
                } else {
                    callback(Err(error.clone()));
                }
            }
            if auto_destroy {
                self.destroy(Some(error));
            } else {
                self.defer(Writable::fail_pending);
                self.defer(Writable::emit_error);
            }
            return;
        }

        if sync {
            // The sink completed from inside `write`; whoever dispatched it keeps draining the queue.
            self.defer(move |stream| stream.after_write(callback));
        } else {
            self.clear_buffer();
            self.after_write(callback);
        }
    }

    fn after_write(&self, callback: Option<WriteCallback>) {
        let drain = {
            let mut state = self.state();
            state.pending_callbacks -= 1;
            let drain = state.need_drain && state.length == 0 && !state.ending && !state.destroyed;
            if drain {
                state.need_drain = false;
            }
            drain
        };
        if drain {
            debug!("writable drained");
            self.emit(WritableEvent::Drain);
        }
        if let Some(callback) = callback {
            callback(Ok(()));
        }
        self.finish_maybe();
    }

    // Dispatches queued writes one at a time. Writes the sink completes synchronously are dispatched in a
    // loop; an asynchronous completion resumes draining from `on_write_end`.
    fn clear_buffer(&self) {
        loop {
            let next = {
                let mut state = self.state();
                if !state.can_dispatch() || state.errored.is_some() {
                    return;
                }
                state.buffered.pop_front()
            };
            let Some(write) = next else {
                return;
            };
            self.do_write(write.chunk, write.encoding, write.len, write.callback);
        }
    }

    /// Holds writes in the queue until a matching [`uncork`](Self::uncork).
    pub fn cork(&self) {
        self.state().corked += 1;
    }

    /// Releases one [`cork`](Self::cork). Queued writes are dispatched once every cork is released.
    pub fn uncork(&self) {
        let flush = {
            let mut state = self.state();
            if state.corked == 0 {
                return;
            }
            state.corked -= 1;
            state.corked == 0 && !state.writing
        };
        if flush {
            self.clear_buffer();
        }
    }

    /// Signals that nothing more will be written.
    ///
    /// `finish` is emitted once every pending write completed.
    ///
    /// # Errors
    /// Fails with [`StreamError::Destroyed`] if the stream was destroyed.
    pub fn end(&self) -> StreamResult<()> {
        self.end_inner(None, None)
    }

    /// Writes a final chunk, then ends the stream.
    ///
    /// # Errors
    /// Fails if the chunk is invalid, or if the stream was destroyed.
    pub fn end_with(&self, chunk: impl Into<Chunk>) -> StreamResult<()> {
        self.end_inner(Some(chunk.into()), None)
    }

    /// Ends the stream and invokes `callback` once it finished, or failed.
    ///
    /// # Errors
    /// Fails with [`StreamError::Destroyed`] if the stream was destroyed. `callback` receives the same
    /// error on the next turn.
    pub fn end_then(&self, callback: impl FnOnce(StreamResult<()>) + 'static) -> StreamResult<()> {
        self.end_inner(None, Some(Box::new(callback)))
    }

    fn end_inner(&self, chunk: Option<Chunk>, callback: Option<WriteCallback>) -> StreamResult<()> {
        if let Some(chunk) = chunk {
            self.write_chunk(chunk, None)?;
        }

        let uncork = {
            let mut state = self.state();
            if state.corked > 0 {
                state.corked = 1;
                true
            } else {
                false
            }
        };
        if uncork {
            self.uncork();
        }

        let (destroyed, errored) = {
            let state = self.0.state.borrow();
            (state.destroyed, state.errored.clone())
        };
        if destroyed {
            if let Some(callback) = callback {
                self.defer_callback(callback, Err(errored.unwrap_or(StreamError::Destroyed)));
            }
            return Err(StreamError::Destroyed);
        }

        let start = !std::mem::replace(&mut self.state().ending, true);
        if start {
            debug!("ending writable");
            self.finish_maybe();
            self.state().ended = true;
        }

        if let Some(callback) = callback {
            let mut state = self.state();
            if let Some(error) = state.errored.clone() {
                drop(state);
                self.defer_callback(callback, Err(error));
            } else if state.finished {
                drop(state);
                self.defer_callback(callback, Ok(()));
            } else {
                state.end_callbacks.push(callback);
            }
        }
        Ok(())
    }

    fn finish_maybe(&self) {
        enum Step {
            Finalize,
            Finish,
        }
        let step = {
            let mut state = self.state();
            if !state.need_finish() || state.finish_scheduled {
                None
            } else if !state.prefinished {
                if state.final_called {
                    None
                } else {
                    state.final_called = true;
                    Some(Step::Finalize)
                }
            } else if state.pending_callbacks == 0 {
                state.finish_scheduled = true;
                Some(Step::Finish)
            } else {
                None
            }
        };
        match step {
            Some(Step::Finalize) => {
                let weak = self.downgrade();
                self.with_sink(|sink| {
                    sink.finalize(Completion::new(move |result| {
                        if let Some(stream) = weak.upgrade() {
                            stream.on_finalized(result);
                        }
                    }))
                });
            }
            Some(Step::Finish) => self.defer(Writable::emit_finish),
            None => {}
        }
    }

    fn on_finalized(&self, result: StreamResult<()>) {
        match result {
            Ok(()) => {
                self.state().prefinished = true;
                self.finish_maybe();
            }
            Err(e) => {
                debug!(error = %e, "sink finalize failed");
                self.destroy(Some(e));
            }
        }
    }

    fn emit_finish(&self) {
        let (callbacks, auto_destroy) = {
            let mut state = self.state();
            state.finish_scheduled = false;
            if state.destroyed || state.errored.is_some() || state.finished {
                return;
            }
            state.finished = true;
            (std::mem::take(&mut state.end_callbacks), state.auto_destroy)
        };
        debug!("writable finished");
        for callback in callbacks {
            callback(Ok(()));
        }
        self.emit(WritableEvent::Finish);
        if auto_destroy {
            self.destroy(None);
        }
    }

    /// Destroys the stream.
    ///
    /// Queued writes and `end` callbacks fail, and the sink's [`destroy`](Sink::destroy) hook runs. A write
    /// already in flight still completes. `error`, if any, is emitted on the next turn, followed by
    /// `close`.
    pub fn destroy(&self, error: Option<StreamError>) {
        self.destroy_inner(error, None)
    }

    /// Destroys the stream and invokes `callback` immediately with the error, if any.
    pub fn destroy_with(
        &self,
        error: Option<StreamError>,
        callback: impl FnOnce(StreamResult<()>) + 'static,
    ) {
        self.destroy_inner(error, Some(Box::new(callback)))
    }

    fn destroy_inner(&self, error: Option<StreamError>, callback: Option<WriteCallback>) {
        let (first, fail) = {
            let mut state = self.state();
            if let Some(error) = &error {
                state.errored.get_or_insert_with(|| error.clone());
            }
            let first = !std::mem::replace(&mut state.destroyed, true);
            let fail = !state.buffered.is_empty() || !state.end_callbacks.is_empty();
            (first, fail)
        };
        if let Some(callback) = callback {
            callback(error.map_or(Ok(()), Err));
        }
        if !first {
            return;
        }
        debug!(error = ?self.errored(), "destroying writable");

        if fail {
            self.defer(Writable::fail_pending);
        }
        let sink = self.0.sink.borrow_mut().take();
        if let Some(sink) = sink {
            self.teardown(sink);
        }
    }

    fn teardown(&self, mut sink: Box<dyn Sink>) {
        let errored = self.errored();
        let weak = self.downgrade();
        sink.destroy(
            errored.as_ref(),
            Completion::new(move |result| {
                if let Some(stream) = weak.upgrade() {
                    if let Err(e) = result {
                        stream.state().errored.get_or_insert(e);
                    }
                    stream.defer(Writable::emit_destroyed);
                }
            }),
        );
    }

    // Fails every queued write and `end` callback with the recorded error.
    fn fail_pending(&self) {
        let (writes, callbacks, error) = {
            let mut state = self.state();
            let writes: Vec<PendingWrite> = state.buffered.drain(..).collect();
            for write in &writes {
                state.length -= write.len;
                state.pending_callbacks -= 1;
            }
            let error = state.errored.clone().unwrap_or(StreamError::Destroyed);
            (writes, std::mem::take(&mut state.end_callbacks), error)
        };
        for write in writes {
            if let Some(callback) = write.callback {
                callback(Err(error.clone()));
            }
        }
        for callback in callbacks {
            callback(Err(error.clone()));
        }
    }

    fn emit_error(&self) {
        let error = {
            let mut state = self.state();
            if state.error_emitted {
                None
            } else {
                state.error_emitted = state.errored.is_some();
                state.errored.clone()
            }
        };
        if let Some(error) = error {
            self.emit(WritableEvent::Error(error));
        }
    }

    fn emit_destroyed(&self) {
        self.emit_error();
        let close = {
            let mut state = self.state();
            let close = state.emit_close && !state.close_emitted;
            state.close_emitted |= close;
            close
        };
        if close {
            debug!("writable closed");
            self.emit(WritableEvent::Close);
        }
    }

    /// Sets the encoding of text chunks written without one.
    pub fn set_default_encoding(&self, encoding: Encoding) -> &Self {
        self.state().default_encoding = encoding;
        self
    }

    /// Subscribes to an event.
    pub fn on(
        &self,
        kind: WritableEventKind,
        listener: impl Fn(&WritableEvent) + 'static,
    ) -> ListenerId {
        self.0.events.subscribe(kind, listener)
    }

    /// Subscribes to the next event of `kind` only.
    pub fn once(
        &self,
        kind: WritableEventKind,
        listener: impl Fn(&WritableEvent) + 'static,
    ) -> ListenerId {
        self.0.events.subscribe_once(kind, listener)
    }

    /// Unsubscribes a listener. Returns `false` if it was not subscribed.
    pub fn off(&self, kind: WritableEventKind, id: ListenerId) -> bool {
        self.0.events.unsubscribe(kind, id)
    }

    /// Returns the number of listeners subscribed to `kind`.
    pub fn listener_count(&self, kind: WritableEventKind) -> usize {
        self.0.events.listener_count(kind)
    }

    /// Subscribes to `Drain`, emitted when a full stream has written everything it queued.
    pub fn on_drain(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.on(WritableEventKind::Drain, move |_| listener())
    }

    /// Subscribes to `Finish`.
    pub fn on_finish(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.on(WritableEventKind::Finish, move |_| listener())
    }

    /// Subscribes to `Close`.
    pub fn on_close(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.on(WritableEventKind::Close, move |_| listener())
    }

    /// Subscribes to `Error` with a listener that receives the error.
    pub fn on_error(&self, listener: impl Fn(&StreamError) + 'static) -> ListenerId {
        self.on(WritableEventKind::Error, move |event| {
            if let WritableEvent::Error(error) = event {
                listener(error)
            }
        })
    }

    pub(crate) fn emit_pipe(&self, source: &Readable) {
        self.emit(WritableEvent::Pipe(source.clone()));
    }

    pub(crate) fn emit_unpipe(&self, source: &Readable) {
        self.emit(WritableEvent::Unpipe(source.clone()));
    }

    /// Returns the size of pending writes in bytes, or items in object mode.
    pub fn writable_length(&self) -> usize {
        self.0.state.borrow().length
    }

    /// The pending size at which [`write`](Self::write) starts returning `false`.
    pub fn writable_high_water_mark(&self) -> usize {
        self.0.state.borrow().high_water_mark
    }

    /// Returns `true` if each chunk counts as one item.
    pub fn writable_object_mode(&self) -> bool {
        self.0.state.borrow().object_mode
    }

    /// Returns `true` while a `drain` notification is owed.
    pub fn writable_need_drain(&self) -> bool {
        self.0.state.borrow().need_drain
    }

    /// Returns the number of unreleased corks.
    pub fn writable_corked(&self) -> usize {
        self.0.state.borrow().corked
    }

    /// Returns `true` once `end` was called.
    pub fn writable_ended(&self) -> bool {
        self.0.state.borrow().ending
    }

    /// Returns `true` once `finish` was emitted.
    pub fn writable_finished(&self) -> bool {
        self.0.state.borrow().finished
    }

    /// Returns `true` if a write would currently be accepted.
    pub fn is_writable(&self) -> bool {
        let state = self.0.state.borrow();
        !state.destroyed && state.errored.is_none() && !state.ending
    }

    /// Returns `true` once [`destroy`](Self::destroy) was called.
    pub fn destroyed(&self) -> bool {
        self.0.state.borrow().destroyed
    }

    /// The error that failed the stream, if any.
    pub fn errored(&self) -> Option<StreamError> {
        self.0.state.borrow().errored.clone()
    }

    pub(crate) fn close_emitted(&self) -> bool {
        self.0.state.borrow().close_emitted
    }
}

impl PartialEq for Writable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Writable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("Writable")
            .field("length", &state.length)
            .field("buffered", &state.buffered.len())
            .field("writing", &state.writing)
            .field("corked", &state.corked)
            .field("ending", &state.ending)
            .field("ended", &state.ended)
            .field("finished", &state.finished)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
