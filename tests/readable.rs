use bytes::Bytes;
use freshet::{
    options::{ReadableOptions, MAX_HIGH_WATER_MARK},
    Chunk, Completion, ManualScheduler, Readable, ReadableEventKind, Source, StreamError,
};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

fn idle_source() -> impl Source {
    |_: usize, _: &Readable| {}
}

fn count(readable: &Readable, kind: ReadableEventKind) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    readable.on(kind, move |_| c.set(c.get() + 1));
    count
}

fn text(chunk: &Chunk) -> String {
    String::from_utf8(chunk.as_bytes().unwrap().to_vec()).unwrap()
}

fn collect_data(readable: &Readable) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    readable.on_data(move |chunk| s.borrow_mut().push(text(chunk)));
    seen
}

#[test]
fn push_signals_backpressure_at_high_water_mark() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        idle_source(),
        ReadableOptions::default().high_water_mark(10),
        scheduler.clone(),
    );

    let accepted: Vec<bool> = (0..5).map(|_| readable.push(b"12345").unwrap()).collect();
    assert_eq!(accepted, [true, false, false, false, false]);
    assert_eq!(readable.readable_length(), 25);

    scheduler.run_until_idle();
    assert_eq!(readable.readable_length(), 25);
}

#[test]
fn flowing_mode_delivers_in_order_then_ends_once() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::from_items(["a", "b", "c"], ReadableOptions::default(), scheduler.clone());
    let ends = count(&readable, ReadableEventKind::End);
    let closes = count(&readable, ReadableEventKind::Close);
    let seen = collect_data(&readable);
    assert_eq!(readable.readable_flowing(), Some(true));

    scheduler.run_until_idle();
    assert_eq!(*seen.borrow(), ["a", "b", "c"]);
    assert_eq!(ends.get(), 1);
    assert!(readable.readable_ended());
    assert!(readable.destroyed());
    assert_eq!(closes.get(), 1);
}

#[test]
fn read_returns_exact_sizes() {
    let scheduler = ManualScheduler::new();
    let requests = Rc::new(RefCell::new(Vec::new()));
    let r = requests.clone();
    let readable = Readable::new(
        move |size: usize, _: &Readable| r.borrow_mut().push(size),
        ReadableOptions::default().high_water_mark(16),
        scheduler.clone(),
    );
    readable.push("hello").unwrap();
    readable.push(" world").unwrap();

    assert_eq!(text(&readable.read(Some(5)).unwrap()), "hello");
    assert_eq!(*requests.borrow(), [16]);
    assert_eq!(readable.readable_length(), 6);

    // Not enough buffered, and the stream hasn't ended.
    assert!(readable.read(Some(7)).is_none());
    assert_eq!(readable.readable_length(), 6);

    readable.push_eof();
    assert_eq!(text(&readable.read(Some(7)).unwrap()), " world");
    assert_eq!(readable.readable_length(), 0);
}

#[test]
fn read_all_concatenates_in_paused_mode() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    readable.push("ab").unwrap();
    readable.push(Bytes::from_static(b"cd")).unwrap();
    readable.push(vec![b'e']).unwrap();

    assert_eq!(text(&readable.read(None).unwrap()), "abcde");
    assert_eq!(readable.readable_length(), 0);
}

#[test]
fn large_read_grows_high_water_mark() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        idle_source(),
        ReadableOptions::default().high_water_mark(16),
        scheduler.clone(),
    );

    readable.read(Some(100));
    assert_eq!(readable.readable_high_water_mark(), 128);

    // Smaller requests never shrink it.
    readable.read(Some(20));
    assert_eq!(readable.readable_high_water_mark(), 128);

    readable.read(Some(MAX_HIGH_WATER_MARK + 1));
    assert_eq!(readable.readable_high_water_mark(), MAX_HIGH_WATER_MARK);
}

#[test]
fn end_waits_for_buffer_to_empty() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    let ends = count(&readable, ReadableEventKind::End);

    readable.push("a").unwrap();
    readable.push_eof();
    scheduler.run_until_idle();
    assert_eq!(ends.get(), 0);
    assert!(!readable.readable_ended());

    assert_eq!(text(&readable.read(None).unwrap()), "a");
    assert_eq!(ends.get(), 0);
    scheduler.run_until_idle();
    assert_eq!(ends.get(), 1);

    assert!(readable.read(None).is_none());
    scheduler.run_until_idle();
    assert_eq!(ends.get(), 1);
}

#[test]
fn push_after_eof_is_rejected() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    readable.push_eof();
    assert!(matches!(readable.push("late"), Err(StreamError::PushAfterEof)));
}

#[test]
fn objects_are_rejected_in_byte_mode() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    assert!(matches!(
        readable.push(Chunk::object(1u8)),
        Err(StreamError::InvalidChunk(_))
    ));
    assert_eq!(readable.readable_length(), 0);
}

#[test]
fn readable_notification_is_coalesced() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    let notified = count(&readable, ReadableEventKind::Readable);
    assert_eq!(readable.readable_flowing(), Some(false));

    readable.push("a").unwrap();
    readable.push("b").unwrap();
    readable.push("c").unwrap();
    assert_eq!(notified.get(), 0);

    scheduler.run_until_idle();
    assert_eq!(notified.get(), 1);
    assert_eq!(text(&readable.read(None).unwrap()), "abc");
}

#[test]
fn readable_listener_reads_everything() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::from_items(["x", "y", "z"], ReadableOptions::default(), scheduler.clone());
    let seen = Rc::new(RefCell::new(String::new()));
    let (s, r) = (seen.clone(), readable.clone());
    readable.on_readable(move || {
        while let Some(chunk) = r.read(None) {
            s.borrow_mut().push_str(&text(&chunk));
        }
    });
    let ends = count(&readable, ReadableEventKind::End);

    scheduler.run_until_idle();
    assert_eq!(*seen.borrow(), "xyz");
    assert_eq!(ends.get(), 1);
}

#[test]
fn pause_and_resume() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    let pauses = count(&readable, ReadableEventKind::Pause);
    let resumes = count(&readable, ReadableEventKind::Resume);
    let seen = collect_data(&readable);
    scheduler.run_until_idle();
    assert_eq!(resumes.get(), 1);

    readable.push("a").unwrap();
    assert_eq!(*seen.borrow(), ["a"]);

    readable.pause();
    assert!(readable.is_paused());
    assert_eq!(pauses.get(), 1);
    readable.pause();
    assert_eq!(pauses.get(), 1);

    readable.push("b").unwrap();
    readable.push("c").unwrap();
    assert_eq!(*seen.borrow(), ["a"]);
    assert_eq!(readable.readable_length(), 2);

    readable.resume();
    assert!(!readable.is_paused());
    assert_eq!(*seen.borrow(), ["a"]);
    scheduler.run_until_idle();
    assert_eq!(*seen.borrow(), ["a", "b", "c"]);
    assert_eq!(resumes.get(), 2);
}

#[test]
fn pause_before_flowing_is_silent() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    let pauses = count(&readable, ReadableEventKind::Pause);
    assert_eq!(readable.readable_flowing(), None);

    readable.pause();
    scheduler.run_until_idle();
    assert_eq!(pauses.get(), 0);
    assert_eq!(readable.readable_flowing(), Some(false));
    assert!(readable.is_paused());
}

#[test]
fn explicit_pause_survives_data_listener() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    readable.pause();
    let seen = collect_data(&readable);
    readable.push("a").unwrap();
    scheduler.run_until_idle();
    assert!(seen.borrow().is_empty());
    assert_eq!(readable.readable_flowing(), Some(false));
}

#[test]
fn unshift_returns_data_to_the_front() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    readable.push("world").unwrap();
    readable.unshift("hello ").unwrap();
    assert_eq!(text(&readable.read(None).unwrap()), "hello world");
}

#[test]
fn unshift_after_end_is_rejected() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        idle_source(),
        ReadableOptions::default().auto_destroy(false),
        scheduler.clone(),
    );
    readable.push_eof();
    readable.read(Some(0));
    scheduler.run_until_idle();
    assert!(readable.readable_ended());
    assert!(matches!(
        readable.unshift("late"),
        Err(StreamError::UnshiftAfterEnd)
    ));
}

#[test]
fn object_mode_counts_items() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::objects(), scheduler.clone());
    assert_eq!(readable.readable_high_water_mark(), 16);

    readable.push(Chunk::object(1u32)).unwrap();
    readable.push(Chunk::object(2u32)).unwrap();
    readable.push("text stays text").unwrap();
    assert_eq!(readable.readable_length(), 3);

    assert_eq!(readable.read(None).unwrap().downcast_ref::<u32>(), Some(&1));
    assert_eq!(readable.read(Some(5)).unwrap().downcast_ref::<u32>(), Some(&2));
    assert_eq!(readable.read(None).unwrap().as_text(), Some("text stays text"));
    assert_eq!(readable.readable_length(), 0);
}

#[test]
fn construct_gates_reads() {
    let scheduler = ManualScheduler::new();
    let pending: Rc<RefCell<Option<Completion>>> = Rc::default();
    let reads = Rc::new(Cell::new(0));

    struct Gated {
        pending: Rc<RefCell<Option<Completion>>>,
        reads: Rc<Cell<usize>>,
    }

    impl Source for Gated {
        fn read(&mut self, _: usize, stream: &Readable) {
            self.reads.set(self.reads.get() + 1);
            if self.reads.get() == 1 {
                stream.push("ready").unwrap();
            } else {
                stream.push_eof();
            }
        }

        fn construct(&mut self, done: Completion) {
            *self.pending.borrow_mut() = Some(done);
        }
    }

    let readable = Readable::new(
        Gated {
            pending: pending.clone(),
            reads: reads.clone(),
        },
        ReadableOptions::default(),
        scheduler.clone(),
    );
    let seen = collect_data(&readable);
    scheduler.run_until_idle();
    assert_eq!(reads.get(), 0);
    assert!(seen.borrow().is_empty());

    let done = pending.borrow_mut().take().unwrap();
    done.complete(Ok(()));
    scheduler.run_until_idle();
    assert_eq!(reads.get(), 2);
    assert_eq!(*seen.borrow(), ["ready"]);
    assert!(readable.readable_ended());
}

#[test]
fn failed_construct_destroys() {
    let scheduler = ManualScheduler::new();

    struct Broken;

    impl Source for Broken {
        fn read(&mut self, _: usize, _: &Readable) {
            unreachable!("reads are gated on construction");
        }

        fn construct(&mut self, done: Completion) {
            done.complete(Err(StreamError::PrematureClose));
        }
    }

    let readable = Readable::new(Broken, ReadableOptions::default(), scheduler.clone());
    let errors = count(&readable, ReadableEventKind::Error);
    assert!(readable.destroyed());
    scheduler.run_until_idle();
    assert_eq!(errors.get(), 1);
}

#[test]
fn destroy_emits_error_then_close() {
    let scheduler = ManualScheduler::new();
    let torn_down = Rc::new(RefCell::new(None));

    struct Tracked(Rc<RefCell<Option<String>>>);

    impl Source for Tracked {
        fn read(&mut self, _: usize, _: &Readable) {}

        fn destroy(&mut self, error: Option<&StreamError>) {
            *self.0.borrow_mut() = Some(error.map_or(String::new(), ToString::to_string));
        }
    }

    let readable = Readable::new(
        Tracked(torn_down.clone()),
        ReadableOptions::default(),
        scheduler.clone(),
    );
    let order = Rc::new(RefCell::new(Vec::new()));
    let o = order.clone();
    readable.on_error(move |e| o.borrow_mut().push(format!("error: {e}")));
    let o = order.clone();
    readable.on_close(move || o.borrow_mut().push("close".to_string()));

    readable.push("buffered").unwrap();
    readable.destroy(Some(StreamError::PrematureClose));
    readable.destroy(None);
    assert_eq!(torn_down.borrow().as_deref(), Some("premature close"));
    assert!(order.borrow().is_empty());

    scheduler.run_until_idle();
    assert_eq!(*order.borrow(), ["error: premature close", "close"]);
    assert!(readable.errored().is_some());

    // Pushes are ignored once destroyed.
    assert!(!readable.push("more").unwrap());
}

#[test]
fn emit_close_can_be_disabled() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        idle_source(),
        ReadableOptions::default().emit_close(false),
        scheduler.clone(),
    );
    let closes = count(&readable, ReadableEventKind::Close);
    readable.destroy(None);
    scheduler.run_until_idle();
    assert_eq!(closes.get(), 0);
}

#[test]
fn removing_last_readable_listener_resumes_data_flow() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(idle_source(), ReadableOptions::default(), scheduler.clone());
    let id = readable.on_readable(|| {});
    let seen = collect_data(&readable);
    readable.push("a").unwrap();
    scheduler.run_until_idle();
    assert!(seen.borrow().is_empty());

    assert!(readable.off(ReadableEventKind::Readable, id));
    scheduler.run_until_idle();
    assert_eq!(*seen.borrow(), ["a"]);
    assert_eq!(readable.readable_flowing(), Some(true));
}

#[test]
fn synchronous_source_fills_to_high_water_mark() {
    let scheduler = ManualScheduler::new();
    let pulls = Rc::new(Cell::new(0));
    let p = pulls.clone();
    let readable = Readable::new(
        move |_: usize, stream: &Readable| {
            p.set(p.get() + 1);
            stream.push("0123").unwrap();
        },
        ReadableOptions::default().high_water_mark(10),
        scheduler.clone(),
    );
    readable.read(Some(0));
    scheduler.run_until_idle();
    // Pulls stop once the buffer reaches the mark.
    assert_eq!(readable.readable_length(), 12);
    assert_eq!(pulls.get(), 3);
}
