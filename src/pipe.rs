//! Flow-controlled connections from a readable to a writable.

use crate::{
    notifier::ListenerId,
    readable::{ReadableEvent, ReadableEventKind, WeakReadable},
    writable::{WeakWritable, WritableEvent, WritableEventKind},
    Readable, Writable,
};
use once_cell::unsync::OnceCell;
use std::{cell::Cell, rc::Rc};
use tracing::{debug, trace};

/// Options for [`Readable::pipe_with`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipeOptions {
    /// End the destination when the source ends.
    pub end: bool,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self { end: true }
    }
}

impl PipeOptions {
    /// Whether the destination is ended when the source ends. Defaults to `true`.
    pub fn end(mut self, end: bool) -> Self {
        self.end = end;
        self
    }
}

// The subscriptions wiring one source to one destination.
struct PipeLink {
    source: WeakReadable,
    dest: WeakWritable,
    end_dest: bool,
    data: Cell<Option<ListenerId>>,
    end: Cell<Option<ListenerId>>,
    close: Cell<Option<ListenerId>>,
    finish: Cell<Option<ListenerId>>,
    error: Cell<Option<ListenerId>>,
    unpipe: Cell<Option<ListenerId>>,
    // Subscribed the first time the destination pushes back.
    drain: OnceCell<ListenerId>,
    cleaned: Cell<bool>,
}

impl PipeLink {
    fn streams(&self) -> Option<(Readable, Writable)> {
        Some((self.source.upgrade()?, self.dest.upgrade()?))
    }

    fn forward(self: &Rc<Self>, event: &ReadableEvent) {
        let ReadableEvent::Data(chunk) = event else {
            return;
        };
        let Some((source, dest)) = self.streams() else {
            return;
        };
        match dest.write(chunk.clone()) {
            Ok(true) => {}
            Ok(false) => self.pause(&source, &dest),
            // Torn down once the destination closes.
            Err(_) if dest.destroyed() => source.pause(),
            Err(error) => {
                debug!(%error, "piped chunk rejected by destination");
                dest.destroy(Some(error));
            }
        }
    }

    fn pause(self: &Rc<Self>, source: &Readable, dest: &Writable) {
        trace!("pipe destination is full, pausing source");
        source.pause();
        self.drain.get_or_init(|| {
            let link = self.clone();
            dest.on(WritableEventKind::Drain, move |_| link.on_drain())
        });
    }

    fn on_drain(&self) {
        let Some(source) = self.source.upgrade() else {
            return;
        };
        let waiting = source
            .pipes_mut()
            .iter()
            .any(Writable::writable_need_drain);
        if !waiting && source.listener_count(ReadableEventKind::Data) > 0 {
            trace!("pipe destination drained, resuming source");
            source.resume();
        }
    }

    fn on_end(&self) {
        let Some((source, dest)) = self.streams() else {
            return;
        };
        if self.end_dest {
            if let Err(error) = dest.end() {
                debug!(%error, "cannot end pipe destination");
            }
        } else {
            source.unpipe(Some(&dest));
        }
    }

    // Detaches every subscription. Safe to call more than once.
    fn cleanup(&self) {
        if self.cleaned.replace(true) {
            return;
        }
        trace!("cleaning up pipe");
        if let Some(source) = self.source.upgrade() {
            for (kind, id) in [
                (ReadableEventKind::End, &self.end),
                (ReadableEventKind::Data, &self.data),
            ] {
                if let Some(id) = id.take() {
                    source.off(kind, id);
                }
            }
        }
        if let Some(dest) = self.dest.upgrade() {
            for (kind, id) in [
                (WritableEventKind::Close, &self.close),
                (WritableEventKind::Finish, &self.finish),
                (WritableEventKind::Error, &self.error),
                (WritableEventKind::Unpipe, &self.unpipe),
            ] {
                if let Some(id) = id.take() {
                    dest.off(kind, id);
                }
            }
            if let Some(id) = self.drain.get() {
                dest.off(WritableEventKind::Drain, *id);
                if dest.writable_need_drain() {
                    self.on_drain();
                }
            }
        }
    }
}

impl Readable {
    /// Pipes this stream into `dest`, ending it when this stream ends.
    ///
    /// Returns `dest` for chaining.
    pub fn pipe(&self, dest: &Writable) -> Writable {
        self.pipe_with(dest, PipeOptions::default())
    }

    /// Pipes this stream into `dest`.
    ///
    /// Every chunk this stream produces is written to `dest`. This stream pauses while `dest` signals
    /// backpressure and resumes on `drain`. The connection is torn down when `dest` closes or finishes,
    /// or when [`unpipe`](Self::unpipe) is called.
    pub fn pipe_with(&self, dest: &Writable, options: PipeOptions) -> Writable {
        debug!(end = options.end, "piping readable into writable");
        self.pipes_mut().push(dest.clone());

        let link = Rc::new(PipeLink {
            source: self.downgrade(),
            dest: dest.downgrade(),
            end_dest: options.end,
            data: Cell::new(None),
            end: Cell::new(None),
            close: Cell::new(None),
            finish: Cell::new(None),
            error: Cell::new(None),
            unpipe: Cell::new(None),
            drain: OnceCell::new(),
            cleaned: Cell::new(false),
        });

        if self.readable_ended() {
            let end = link.clone();
            self.defer(move |_| end.on_end());
        } else {
            let end = link.clone();
            link.end
                .set(Some(self.once(ReadableEventKind::End, move |_| end.on_end())));
        }

        let unpipe = link.clone();
        link.unpipe.set(Some(dest.on(WritableEventKind::Unpipe, move |event| {
            if let WritableEvent::Unpipe(source) = event {
                if unpipe.source.upgrade().is_some_and(|s| s.ptr_eq(source)) {
                    unpipe.cleanup();
                }
            }
        })));

        let data = link.clone();
        link.data
            .set(Some(self.on(ReadableEventKind::Data, move |event| data.forward(event))));

        let error = link.clone();
        link.error.set(Some(dest.on(WritableEventKind::Error, move |_| {
            if let Some((source, dest)) = error.streams() {
                source.unpipe(Some(&dest));
            }
        })));

        let close = link.clone();
        link.close.set(Some(dest.once(WritableEventKind::Close, move |_| {
            if let Some((source, dest)) = close.streams() {
                if let Some(id) = close.finish.take() {
                    dest.off(WritableEventKind::Finish, id);
                }
                source.unpipe(Some(&dest));
            }
        })));

        let finish = link.clone();
        link.finish.set(Some(dest.once(WritableEventKind::Finish, move |_| {
            if let Some((source, dest)) = finish.streams() {
                if let Some(id) = finish.close.take() {
                    dest.off(WritableEventKind::Close, id);
                }
                source.unpipe(Some(&dest));
            }
        })));

        dest.emit_pipe(self);

        if dest.writable_need_drain() {
            link.pause(self, dest);
        } else if self.readable_flowing() != Some(true) {
            self.resume();
        }
        dest.clone()
    }

    /// Disconnects piped destinations.
    ///
    /// With `None`, every destination is detached and this stream is paused. With a destination, only
    /// that one is detached, and this stream is paused if no destinations remain.
    pub fn unpipe(&self, dest: Option<&Writable>) -> &Self {
        match dest {
            None => {
                let dests = std::mem::take(&mut *self.pipes_mut());
                if dests.is_empty() {
                    return self;
                }
                debug!(count = dests.len(), "unpiping all destinations");
                self.pause();
                for dest in dests {
                    dest.emit_unpipe(self);
                }
            }
            Some(dest) => {
                let remaining = {
                    let mut pipes = self.pipes_mut();
                    let Some(index) = pipes.iter().position(|d| d.ptr_eq(dest)) else {
                        return self;
                    };
                    pipes.remove(index);
                    pipes.len()
                };
                debug!(remaining, "unpiping destination");
                if remaining == 0 {
                    self.pause();
                }
                dest.emit_unpipe(self);
            }
        }
        self
    }
}
