//! The producer side of a stream.

use crate::{
    chunk::{Chunk, Encoding},
    chunk_buffer::ChunkBuffer,
    completion::Completion,
    error::{StreamError, StreamResult},
    notifier::{Event, ListenerId, Notifier},
    options::{ReadableOptions, MAX_HIGH_WATER_MARK},
    scheduler::Scheduler,
    Writable,
};
use std::{
    cell::{RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};
use tracing::{debug, trace};

/// Supplies data to a [`Readable`].
pub trait Source {
    /// Requests more data.
    ///
    /// The source responds by calling [`Readable::push`] zero or more times, now or later, and eventually
    /// [`Readable::push_eof`]. `size` is advisory. The stream does not call `read` again until something is
    /// pushed.
    fn read(&mut self, size: usize, stream: &Readable);

    /// One-time setup run before the first read.
    ///
    /// Reads are held back until `done` completes. A failure destroys the stream.
    fn construct(&mut self, done: Completion) {
        done.complete(Ok(()))
    }

    /// Releases resources when the stream is destroyed.
    fn destroy(&mut self, _error: Option<&StreamError>) {}
}

impl<F> Source for F
where
    F: FnMut(usize, &Readable),
{
    fn read(&mut self, size: usize, stream: &Readable) {
        self(size, stream)
    }
}

/// Notifications emitted by a [`Readable`].
#[derive(Clone, Debug)]
pub enum ReadableEvent {
    /// A chunk was handed to the consumer.
    Data(Chunk),
    /// Data (or the end of data) is available to [`Readable::read`].
    Readable,
    /// All data was consumed. Emitted at most once.
    End,
    Pause,
    Resume,
    Close,
    Error(StreamError),
}

/// Keys for subscribing to [`ReadableEvent`]s.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReadableEventKind {
    Data,
    Readable,
    End,
    Pause,
    Resume,
    Close,
    Error,
}

impl Event for ReadableEvent {
    type Kind = ReadableEventKind;

    fn kind(&self) -> ReadableEventKind {
        match self {
            Self::Data(_) => ReadableEventKind::Data,
            Self::Readable => ReadableEventKind::Readable,
            Self::End => ReadableEventKind::End,
            Self::Pause => ReadableEventKind::Pause,
            Self::Resume => ReadableEventKind::Resume,
            Self::Close => ReadableEventKind::Close,
            Self::Error(_) => ReadableEventKind::Error,
        }
    }
}

struct ReadableState {
    object_mode: bool,
    high_water_mark: usize,
    default_encoding: Encoding,
    emit_close: bool,
    auto_destroy: bool,

    buffer: ChunkBuffer,
    length: usize,

    // `None` until a consumer picks a mode, `Some(false)` when paused, `Some(true)` when flowing.
    flowing: Option<bool>,
    paused: Option<bool>,

    ended: bool,
    end_emitted: bool,
    reading: bool,
    // Set while the source's `read` hook is on the stack.
    sync: bool,
    constructed: bool,
    need_readable: bool,
    emitted_readable: bool,
    readable_listening: bool,
    resume_scheduled: bool,
    reading_more: bool,

    destroyed: bool,
    errored: Option<StreamError>,
    error_emitted: bool,
    close_emitted: bool,

    pipes: Vec<Writable>,
}

impl ReadableState {
    fn new(options: &ReadableOptions) -> Self {
        Self {
            object_mode: options.object_mode,
            high_water_mark: options.resolved_high_water_mark(),
            default_encoding: options.default_encoding,
            emit_close: options.emit_close,
            auto_destroy: options.auto_destroy,
            buffer: ChunkBuffer::new(),
            length: 0,
            flowing: None,
            paused: None,
            ended: false,
            end_emitted: false,
            reading: false,
            sync: false,
            constructed: false,
            need_readable: false,
            emitted_readable: false,
            readable_listening: false,
            resume_scheduled: false,
            reading_more: false,
            destroyed: false,
            errored: None,
            error_emitted: false,
            close_emitted: false,
            pipes: Vec::new(),
        }
    }

    fn chunk_len(&self, chunk: &Chunk) -> usize {
        if self.object_mode {
            1
        } else {
            chunk.len()
        }
    }

    fn push_accepted(&self) -> bool {
        !self.ended && (self.length < self.high_water_mark || self.length == 0)
    }

    // How much of the buffer a `read(size)` call can return right now.
    fn how_much_to_read(&self, size: Option<usize>) -> usize {
        if size == Some(0) || (self.length == 0 && self.ended) {
            return 0;
        }
        if self.object_mode {
            return 1;
        }
        match size {
            None if self.flowing == Some(true) && self.length > 0 => {
                self.buffer.first().map_or(0, Chunk::len)
            }
            None => self.length,
            Some(n) if n <= self.length => n,
            Some(_) if self.ended => self.length,
            Some(_) => 0,
        }
    }

    fn from_list(&mut self, n: usize) -> Option<Chunk> {
        if self.length == 0 {
            return None;
        }
        if self.object_mode {
            return self.buffer.shift();
        }
        if n >= self.length {
            let chunk = if self.buffer.len() == 1 {
                self.buffer.shift()
            } else {
                Some(Chunk::Bytes(self.buffer.concatenate(self.length)))
            };
            self.buffer.clear();
            chunk
        } else {
            self.buffer.consume(n).map(Chunk::Bytes)
        }
    }
}

/// Grows the high-water-mark to the next power of two that covers a read of `n`, up to the maximum.
fn next_high_water_mark(n: usize) -> usize {
    n.min(MAX_HIGH_WATER_MARK).next_power_of_two()
}

struct Shared {
    state: RefCell<ReadableState>,
    events: Notifier<ReadableEvent>,
    // Taken out while a hook runs, so a hook can never be entered twice.
    source: RefCell<Option<Box<dyn Source>>>,
    scheduler: Rc<dyn Scheduler>,
}

/// The producer side of a stream.
///
/// A `Readable` buffers data pushed by its [`Source`] and hands it to consumers, either on request
/// ([`read`](Self::read)) or automatically while flowing. Cloning the handle shares the stream.
#[derive(Clone)]
pub struct Readable(Rc<Shared>);

#[derive(Clone)]
pub(crate) struct WeakReadable(Weak<Shared>);

impl WeakReadable {
    pub(crate) fn upgrade(&self) -> Option<Readable> {
        self.0.upgrade().map(Readable)
    }
}

impl Readable {
    /// Create a stream that pulls from `source`.
    pub fn new(
        source: impl Source + 'static,
        options: ReadableOptions,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        Self::with_scheduler(Box::new(source), options, Rc::new(scheduler))
    }

    /// Create a stream that yields the items of `iter`, one per pull, and then ends.
    pub fn from_items<I>(iter: I, options: ReadableOptions, scheduler: impl Scheduler + 'static) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Chunk>,
        I::IntoIter: 'static,
    {
        let mut iter = iter.into_iter();
        Self::new(
            move |_size: usize, stream: &Readable| match iter.next() {
                Some(chunk) => {
                    if let Err(e) = stream.push(chunk) {
                        stream.destroy(Some(e));
                    }
                }
                None => {
                    stream.push_eof();
                }
            },
            options,
            scheduler,
        )
    }

    pub(crate) fn with_scheduler(
        source: Box<dyn Source>,
        options: ReadableOptions,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let stream = Self(Rc::new(Shared {
            state: RefCell::new(ReadableState::new(&options)),
            events: Notifier::new(),
            source: RefCell::new(Some(source)),
            scheduler,
        }));
        let weak = stream.downgrade();
        stream.with_source(|source| {
            source.construct(Completion::new(move |result| {
                if let Some(stream) = weak.upgrade() {
                    stream.on_constructed(result);
                }
            }))
        });
        stream
    }

    pub(crate) fn downgrade(&self) -> WeakReadable {
        WeakReadable(Rc::downgrade(&self.0))
    }

    /// Returns `true` if both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Readable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn state(&self) -> RefMut<'_, ReadableState> {
        self.0.state.borrow_mut()
    }

    pub(crate) fn pipes_mut(&self) -> RefMut<'_, Vec<Writable>> {
        RefMut::map(self.state(), |state| &mut state.pipes)
    }

    fn emit(&self, event: ReadableEvent) -> bool {
        self.0.events.emit(&event)
    }

    pub(crate) fn defer(&self, task: impl FnOnce(&Readable) + 'static) {
        let this = self.clone();
        self.0.scheduler.defer(Box::new(move || task(&this)));
    }

    // Runs `f` with the source taken out of its slot. A source that comes back to a destroyed stream is
    // torn down instead of restored.
    fn with_source(&self, f: impl FnOnce(&mut dyn Source)) {
        let Some(mut source) = self.0.source.borrow_mut().take() else {
            return;
        };
        f(source.as_mut());
        let (destroyed, errored) = {
            let state = self.0.state.borrow();
            (state.destroyed, state.errored.clone())
        };
        if destroyed {
            source.destroy(errored.as_ref());
        } else {
            *self.0.source.borrow_mut() = Some(source);
        }
    }

    fn on_constructed(&self, result: StreamResult<()>) {
        match result {
            Ok(()) => {
                let read_more = {
                    let mut state = self.state();
                    state.constructed = true;
                    state.need_readable || state.flowing == Some(true)
                };
                if read_more {
                    self.maybe_read_more();
                }
            }
            Err(e) => self.destroy(Some(e)),
        }
    }

    /// Adds a chunk to the end of the buffer.
    ///
    /// Text is converted to bytes unless the stream is in object mode. Returns `false` once the buffered
    /// length reaches the high-water-mark, signaling that the source should stop producing until it is
    /// asked again.
    ///
    /// # Errors
    /// Fails if the chunk is invalid for the stream's mode, or if [`push_eof`](Self::push_eof) was already
    /// called.
    pub fn push(&self, chunk: impl Into<Chunk>) -> StreamResult<bool> {
        self.add_chunk(chunk.into(), false)
    }

    /// Signals that the source will produce no more data.
    pub fn push_eof(&self) -> bool {
        self.state().reading = false;
        self.on_eof_chunk();
        self.0.state.borrow().push_accepted()
    }

    /// Returns a chunk to the front of the buffer.
    ///
    /// # Errors
    /// Fails if the chunk is invalid for the stream's mode, or if `end` was already emitted.
    pub fn unshift(&self, chunk: impl Into<Chunk>) -> StreamResult<bool> {
        self.add_chunk(chunk.into(), true)
    }

    fn add_chunk(&self, chunk: Chunk, front: bool) -> StreamResult<bool> {
        let (object_mode, encoding) = {
            let state = self.0.state.borrow();
            (state.object_mode, state.default_encoding)
        };
        let chunk = if object_mode {
            chunk
        } else {
            Chunk::Bytes(chunk.into_bytes(encoding)?)
        };

        if !object_mode && chunk.is_empty() {
            if !front {
                self.state().reading = false;
                self.maybe_read_more();
            }
            return Ok(self.0.state.borrow().push_accepted());
        }

        {
            let mut state = self.state();
            if front {
                if state.end_emitted {
                    return Err(StreamError::UnshiftAfterEnd);
                }
            } else if state.ended {
                return Err(StreamError::PushAfterEof);
            }
            if state.destroyed || state.errored.is_some() {
                return Ok(false);
            }
            if !front {
                state.reading = false;
            }
        }

        self.store_chunk(chunk, front);
        Ok(self.0.state.borrow().push_accepted())
    }

    fn store_chunk(&self, chunk: Chunk, front: bool) {
        let fast_path = {
            let state = self.0.state.borrow();
            state.flowing == Some(true) && state.length == 0 && !state.sync
        } && self.0.events.listener_count(ReadableEventKind::Data) > 0;

        if fast_path {
            self.emit(ReadableEvent::Data(chunk));
        } else {
            let need_readable = {
                let mut state = self.state();
                state.length += state.chunk_len(&chunk);
                if front {
                    state.buffer.unshift(chunk);
                } else {
                    state.buffer.push(chunk);
                }
                state.need_readable
            };
            if need_readable {
                self.emit_readable();
            }
        }
        self.maybe_read_more();
    }

    fn on_eof_chunk(&self) {
        let sync = {
            let mut state = self.state();
            if state.ended {
                return;
            }
            state.ended = true;
            state.sync
        };
        debug!("readable source reached end of data");
        if sync {
            self.emit_readable();
        } else {
            {
                let mut state = self.state();
                state.need_readable = false;
                state.emitted_readable = true;
            }
            self.emit_readable_now();
        }
    }

    // Schedules one `readable` notification; further requests coalesce until it has fired.
    fn emit_readable(&self) {
        let schedule = {
            let mut state = self.state();
            state.need_readable = false;
            !std::mem::replace(&mut state.emitted_readable, true)
        };
        if schedule {
            self.defer(Readable::emit_readable_now);
        }
    }

    fn emit_readable_now(&self) {
        let notify = {
            let state = self.0.state.borrow();
            !state.destroyed && state.errored.is_none() && (state.length > 0 || state.ended)
        };
        if notify {
            self.emit(ReadableEvent::Readable);
            self.state().emitted_readable = false;
        }
        {
            let mut state = self.state();
            state.need_readable =
                state.flowing != Some(true) && !state.ended && state.length <= state.high_water_mark;
        }
        self.flow();
    }

    fn maybe_read_more(&self) {
        let schedule = {
            let mut state = self.state();
            if state.reading_more || !state.constructed {
                false
            } else {
                state.reading_more = true;
                true
            }
        };
        if schedule {
            self.defer(Readable::maybe_read_more_now);
        }
    }

    // Keeps the buffer topped up to the high-water-mark while the source keeps answering synchronously.
    fn maybe_read_more_now(&self) {
        loop {
            let length = {
                let state = self.0.state.borrow();
                let wants_more = !state.reading
                    && !state.ended
                    && (state.length < state.high_water_mark
                        || (state.flowing == Some(true) && state.length == 0));
                if !wants_more {
                    break;
                }
                state.length
            };
            self.read(Some(0));
            if self.readable_length() == length {
                break;
            }
        }
        self.state().reading_more = false;
    }

    /// Pulls data out of the buffer.
    ///
    /// With `None`, returns the first chunk while flowing and everything buffered otherwise. With
    /// `Some(n)`, returns exactly `n` bytes (one item in object mode), or `None` if fewer are buffered and
    /// the stream hasn't ended. A request larger than the high-water-mark raises it. If the buffer is
    /// running low, the source is asked for more before returning.
    ///
    /// Every chunk returned is also emitted as [`ReadableEvent::Data`].
    pub fn read(&self, size: Option<usize>) -> Option<Chunk> {
        let mut state = self.state();
        if let Some(n) = size {
            if n > state.high_water_mark {
                state.high_water_mark = next_high_water_mark(n);
                trace!(high_water_mark = state.high_water_mark, "raised high water mark");
            }
        }
        if size != Some(0) {
            state.emitted_readable = false;
        }

        // `read(0)` only refreshes notifications.
        if size == Some(0) && state.need_readable {
            let full = if state.high_water_mark != 0 {
                state.length >= state.high_water_mark
            } else {
                state.length > 0
            };
            if full || state.ended {
                let end = state.length == 0 && state.ended;
                drop(state);
                if end {
                    self.end_readable();
                } else {
                    self.emit_readable();
                }
                return None;
            }
        }

        let mut n = state.how_much_to_read(size);
        if n == 0 && state.ended {
            let end = state.length == 0;
            drop(state);
            if end {
                self.end_readable();
            }
            return None;
        }

        let mut do_read = state.need_readable
            || state.length == 0
            || state.length < state.high_water_mark.saturating_add(n);
        if state.ended
            || state.reading
            || state.destroyed
            || state.errored.is_some()
            || !state.constructed
        {
            do_read = false;
        }
        if do_read {
            state.reading = true;
            state.sync = true;
            if state.length == 0 {
                state.need_readable = true;
            }
            let request = state.high_water_mark;
            drop(state);

            trace!(size = request, "pulling from source");
            self.with_source(|source| source.read(request, self));

            state = self.state();
            state.sync = false;
            if !state.reading {
                n = state.how_much_to_read(size);
            }
        }

        let chunk = if n > 0 { state.from_list(n) } else { None };
        match &chunk {
            Some(chunk) => {
                let len = state.chunk_len(chunk);
                state.length -= len;
                n = len;
            }
            None => {
                state.need_readable = state.length <= state.high_water_mark;
                n = 0;
            }
        }

        let mut end = false;
        if state.length == 0 {
            if !state.ended {
                state.need_readable = true;
            }
            end = size != Some(n) && state.ended;
        }
        let emit = chunk.is_some() && !state.error_emitted && !state.close_emitted;
        drop(state);

        if end {
            self.end_readable();
        }
        if emit {
            if let Some(chunk) = &chunk {
                self.emit(ReadableEvent::Data(chunk.clone()));
            }
        }
        chunk
    }

    fn end_readable(&self) {
        let schedule = {
            let mut state = self.state();
            if state.end_emitted {
                false
            } else {
                state.ended = true;
                true
            }
        };
        if schedule {
            self.defer(Readable::end_now);
        }
    }

    fn end_now(&self) {
        let auto_destroy = {
            let mut state = self.state();
            if state.errored.is_some()
                || state.close_emitted
                || state.end_emitted
                || state.length != 0
            {
                return;
            }
            state.end_emitted = true;
            state.auto_destroy
        };
        debug!("readable ended");
        self.emit(ReadableEvent::End);
        if auto_destroy {
            self.destroy(None);
        }
    }

    fn is_flowing(&self) -> bool {
        self.0.state.borrow().flowing == Some(true)
    }

    fn is_reading(&self) -> bool {
        self.0.state.borrow().reading
    }

    fn flow(&self) {
        while self.is_flowing() && self.read(None).is_some() {}
    }

    /// Switches the stream into flowing mode.
    ///
    /// Buffered data starts flowing on the next turn.
    pub fn resume(&self) {
        let schedule = {
            let mut state = self.state();
            let mut schedule = false;
            if state.flowing != Some(true) {
                state.flowing = Some(!state.readable_listening);
                if !state.resume_scheduled {
                    state.resume_scheduled = true;
                    schedule = true;
                }
            }
            state.paused = Some(false);
            schedule
        };
        if schedule {
            debug!("resuming readable");
            self.defer(Readable::resume_now);
        }
    }

    fn resume_now(&self) {
        if !self.is_reading() {
            self.read(Some(0));
        }
        self.state().resume_scheduled = false;
        self.emit(ReadableEvent::Resume);
        self.flow();
        if self.is_flowing() && !self.is_reading() {
            self.read(Some(0));
        }
    }

    /// Stops flowing mode. Data accumulates in the buffer until read or resumed.
    ///
    /// `Pause` is only emitted when the stream was flowing.
    pub fn pause(&self) {
        let emit = {
            let mut state = self.state();
            state.paused = Some(true);
            state.flowing.replace(false) == Some(true)
        };
        if emit {
            debug!("pausing readable");
            self.emit(ReadableEvent::Pause);
        }
    }

    /// Returns `true` if [`pause`](Self::pause) was called more recently than [`resume`](Self::resume).
    pub fn is_paused(&self) -> bool {
        self.0.state.borrow().paused == Some(true)
    }

    /// Subscribes to an event.
    ///
    /// A `Data` listener switches the stream into flowing mode unless it was explicitly paused. A
    /// `Readable` listener switches it into paused mode and requests a `Readable` notification as soon
    /// as data is available.
    pub fn on(
        &self,
        kind: ReadableEventKind,
        listener: impl Fn(&ReadableEvent) + 'static,
    ) -> ListenerId {
        let id = self.0.events.subscribe(kind, listener);
        self.listener_added(kind);
        id
    }

    /// Subscribes to the next event of `kind` only.
    pub fn once(
        &self,
        kind: ReadableEventKind,
        listener: impl Fn(&ReadableEvent) + 'static,
    ) -> ListenerId {
        let id = self.0.events.subscribe_once(kind, listener);
        self.listener_added(kind);
        id
    }

    /// Unsubscribes a listener. Returns `false` if it was not subscribed.
    pub fn off(&self, kind: ReadableEventKind, id: ListenerId) -> bool {
        let removed = self.0.events.unsubscribe(kind, id);
        if removed && kind == ReadableEventKind::Readable {
            self.defer(Readable::update_readable_listening);
        }
        removed
    }

    /// Returns the number of listeners subscribed to `kind`.
    pub fn listener_count(&self, kind: ReadableEventKind) -> usize {
        self.0.events.listener_count(kind)
    }

    /// Subscribes to `Data` with a listener that receives the chunk.
    pub fn on_data(&self, listener: impl Fn(&Chunk) + 'static) -> ListenerId {
        self.on(ReadableEventKind::Data, move |event| {
            if let ReadableEvent::Data(chunk) = event {
                listener(chunk)
            }
        })
    }

    /// Subscribes to `Readable`, switching the stream into paused mode.
    pub fn on_readable(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.on(ReadableEventKind::Readable, move |_| listener())
    }

    /// Subscribes to `End`, emitted once every buffered chunk was consumed.
    pub fn on_end(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.on(ReadableEventKind::End, move |_| listener())
    }

    /// Subscribes to `Close`.
    pub fn on_close(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.on(ReadableEventKind::Close, move |_| listener())
    }

    /// Subscribes to `Error` with a listener that receives the error.
    pub fn on_error(&self, listener: impl Fn(&StreamError) + 'static) -> ListenerId {
        self.on(ReadableEventKind::Error, move |event| {
            if let ReadableEvent::Error(error) = event {
                listener(error)
            }
        })
    }

    fn listener_added(&self, kind: ReadableEventKind) {
        match kind {
            ReadableEventKind::Data => {
                let readable_listening =
                    self.0.events.listener_count(ReadableEventKind::Readable) > 0;
                let resume = {
                    let mut state = self.state();
                    state.readable_listening = readable_listening;
                    state.flowing != Some(false)
                };
                if resume {
                    self.resume();
                }
            }
            ReadableEventKind::Readable => {
                enum Next {
                    Notify,
                    Pull,
                }
                let next = {
                    let mut state = self.state();
                    if state.end_emitted || state.readable_listening {
                        None
                    } else {
                        state.readable_listening = true;
                        state.need_readable = true;
                        state.flowing = Some(false);
                        state.emitted_readable = false;
                        if state.length > 0 {
                            Some(Next::Notify)
                        } else if !state.reading {
                            Some(Next::Pull)
                        } else {
                            None
                        }
                    }
                };
                match next {
                    Some(Next::Notify) => self.emit_readable(),
                    Some(Next::Pull) => self.defer(|stream| {
                        stream.read(Some(0));
                    }),
                    None => {}
                }
            }
            _ => {}
        }
    }

    fn update_readable_listening(&self) {
        let has_readable = self.0.events.listener_count(ReadableEventKind::Readable) > 0;
        let has_data = self.0.events.listener_count(ReadableEventKind::Data) > 0;
        let resume = {
            let mut state = self.state();
            state.readable_listening = has_readable;
            if state.resume_scheduled && state.paused == Some(false) {
                state.flowing = Some(true);
                false
            } else if has_data {
                true
            } else {
                if !has_readable {
                    state.flowing = None;
                }
                false
            }
        };
        if resume {
            self.resume();
        }
    }

    /// Destroys the stream.
    ///
    /// Buffered data is abandoned and the source's [`destroy`](Source::destroy) hook runs. `error`, if any,
    /// is emitted on the next turn, followed by `close`.
    pub fn destroy(&self, error: Option<StreamError>) {
        let errored = {
            let mut state = self.state();
            if let Some(error) = error {
                state.errored.get_or_insert(error);
            }
            if std::mem::replace(&mut state.destroyed, true) {
                return;
            }
            state.errored.clone()
        };
        debug!(error = ?errored, "destroying readable");

        let source = self.0.source.borrow_mut().take();
        if let Some(mut source) = source {
            source.destroy(errored.as_ref());
        }
        self.defer(Readable::emit_destroyed);
    }

    fn emit_destroyed(&self) {
        let (error, close) = {
            let mut state = self.state();
            let error = if state.error_emitted {
                None
            } else {
                state.errored.clone()
            };
            state.error_emitted |= error.is_some();
            let close = state.emit_close && !state.close_emitted;
            state.close_emitted |= close;
            (error, close)
        };
        if let Some(error) = error {
            self.emit(ReadableEvent::Error(error));
        }
        if close {
            self.emit(ReadableEvent::Close);
        }
    }

    /// Returns the number of buffered bytes, or items in object mode.
    pub fn readable_length(&self) -> usize {
        self.0.state.borrow().length
    }

    /// The current high-water-mark. It grows when a read asks for more than it.
    pub fn readable_high_water_mark(&self) -> usize {
        self.0.state.borrow().high_water_mark
    }

    /// Returns `None` before a consumer picked a mode, otherwise whether the stream is flowing.
    pub fn readable_flowing(&self) -> Option<bool> {
        self.0.state.borrow().flowing
    }

    /// Returns `true` if each chunk counts as one item.
    pub fn readable_object_mode(&self) -> bool {
        self.0.state.borrow().object_mode
    }

    /// Returns `true` once `end` was emitted.
    pub fn readable_ended(&self) -> bool {
        self.0.state.borrow().end_emitted
    }

    /// Returns `true` once the source pushed the end of data.
    pub(crate) fn eof_received(&self) -> bool {
        self.0.state.borrow().ended
    }

    /// Returns `true` once [`destroy`](Self::destroy) was called.
    pub fn destroyed(&self) -> bool {
        self.0.state.borrow().destroyed
    }

    /// The error the stream was destroyed with, if any.
    pub fn errored(&self) -> Option<StreamError> {
        self.0.state.borrow().errored.clone()
    }

    /// Returns the number of writables this stream is piped into.
    pub fn pipe_count(&self) -> usize {
        self.0.state.borrow().pipes.len()
    }
}

impl PartialEq for Readable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Readable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("Readable")
            .field("length", &state.length)
            .field("chunks", &state.buffer.len())
            .field("flowing", &state.flowing)
            .field("ended", &state.ended)
            .field("end_emitted", &state.end_emitted)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
