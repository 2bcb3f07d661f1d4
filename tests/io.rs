use freshet::{
    io::{collect, concat, Reader, Writer},
    options::{ReadableOptions, WritableOptions},
    Chunk, Completion, Encoding, ManualScheduler, Readable, ReadableEventKind, StreamError,
    Writable, WritableEventKind,
};
use futures::StreamExt;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{ErrorKind, Read, Write},
    rc::Rc,
};

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = SmallRng::from_entropy();
    (0..len).map(|_| rng.gen()).collect()
}

#[test]
fn sync_reader_writer() {
    let scheduler = ManualScheduler::new();
    let values = random_bytes(1_000_000);

    let received = Rc::new(RefCell::new(Vec::new()));
    let r = received.clone();
    let writable = Writable::new(
        move |chunk: Chunk, _: Encoding, done: Completion| {
            r.borrow_mut().extend_from_slice(chunk.as_bytes().unwrap());
            done.complete(Ok(()))
        },
        WritableOptions::default(),
        scheduler.clone(),
    );
    let mut write = Writer::new(writable);
    write.write_all(&values).unwrap();
    scheduler.run_until_idle();
    write.flush().unwrap();
    assert_eq!(seahash::hash(&values), seahash::hash(&received.borrow()));

    let chunks: Vec<Vec<u8>> = values.chunks(4096).map(<[u8]>::to_vec).collect();
    let mut read = Reader::new(Readable::from_items(
        chunks,
        ReadableOptions::default(),
        scheduler.clone(),
    ));
    let mut read_back = Vec::new();
    read.read_to_end(&mut read_back).unwrap();
    assert_eq!(seahash::hash(&values), seahash::hash(&read_back));
}

#[test]
fn reader_would_block_until_data_arrives() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        |_: usize, _: &Readable| {},
        ReadableOptions::default(),
        scheduler.clone(),
    );
    let mut read = Reader::new(readable.clone());
    let mut buf = [0u8; 8];

    assert_eq!(read.read(&mut buf).unwrap_err().kind(), ErrorKind::WouldBlock);

    readable.push("hi").unwrap();
    assert_eq!(read.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"hi");

    readable.push_eof();
    assert_eq!(read.read(&mut buf).unwrap(), 0);
}

#[test]
fn writer_would_block_under_backpressure() {
    let scheduler = ManualScheduler::new();
    let parked = Rc::new(RefCell::new(VecDeque::new()));
    let p = parked.clone();
    let writable = Writable::new(
        move |_: Chunk, _: Encoding, done: Completion| p.borrow_mut().push_back(done),
        WritableOptions::default().high_water_mark(4),
        scheduler.clone(),
    );
    let mut write = Writer::new(writable.clone());

    assert_eq!(write.write(b"abcd").unwrap(), 4);
    assert_eq!(write.write(b"e").unwrap_err().kind(), ErrorKind::WouldBlock);
    assert_eq!(write.flush().unwrap_err().kind(), ErrorKind::WouldBlock);

    let done = parked.borrow_mut().pop_front().unwrap();
    done.complete(Ok(()));
    write.flush().unwrap();
    assert_eq!(write.write(b"e").unwrap(), 1);

    writable.end().unwrap();
    assert_eq!(write.write(b"f").unwrap_err().kind(), ErrorKind::BrokenPipe);
}

#[test]
fn collect_gathers_every_chunk() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::from_items(["a", "b", "c"], ReadableOptions::default(), scheduler.clone());

    let chunks = scheduler.run_until(collect(&readable)).unwrap();
    assert_eq!(&concat(&chunks).unwrap()[..], b"abc");
    assert!(readable.readable_ended());
}

#[test]
fn chunk_stream_yields_then_ends() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        |_: usize, _: &Readable| {},
        ReadableOptions::default(),
        scheduler.clone(),
    );
    let mut chunks = readable.chunks();

    readable.push("x").unwrap();
    let first = scheduler.run_until(chunks.next()).unwrap().unwrap();
    assert_eq!(first, Chunk::from(b"x"));

    readable.push_eof();
    assert!(scheduler.run_until(chunks.next()).is_none());

    drop(chunks);
    assert_eq!(readable.listener_count(ReadableEventKind::End), 0);
}

#[test]
fn chunk_stream_reports_premature_close() {
    let scheduler = ManualScheduler::new();
    let readable = Readable::new(
        |_: usize, _: &Readable| {},
        ReadableOptions::default(),
        scheduler.clone(),
    );
    readable.push("partial").unwrap();
    readable.destroy(None);

    assert!(matches!(
        scheduler.run_until(collect(&readable)),
        Err(StreamError::PrematureClose)
    ));
}

#[test]
fn finished_resolves_after_finish() {
    let scheduler = ManualScheduler::new();
    let writable = Writable::new(
        |_: Chunk, _: Encoding, done: Completion| done.complete(Ok(())),
        WritableOptions::default(),
        scheduler.clone(),
    );
    writable.write("a").unwrap();
    writable.end().unwrap();

    scheduler.run_until(writable.finished()).unwrap();
    assert!(writable.writable_finished());

    // Already finished.
    scheduler.run_until(writable.finished()).unwrap();
}

#[test]
fn finished_reports_failures() {
    let scheduler = ManualScheduler::new();
    let new_writable = || {
        Writable::new(
            |_: Chunk, _: Encoding, done: Completion| done.complete(Ok(())),
            WritableOptions::default(),
            scheduler.clone(),
        )
    };

    let closed = new_writable();
    closed.destroy(None);
    assert!(matches!(
        scheduler.run_until(closed.finished()),
        Err(StreamError::PrematureClose)
    ));

    let failed = new_writable();
    failed.destroy(Some(StreamError::WriteAfterEnd));
    assert!(matches!(
        scheduler.run_until(failed.finished()),
        Err(StreamError::WriteAfterEnd)
    ));

    let dropped = new_writable();
    drop(dropped.finished());
    assert_eq!(dropped.listener_count(WritableEventKind::Finish), 0);
    assert_eq!(dropped.listener_count(WritableEventKind::Close), 0);
}

#[test]
fn concat_rejects_objects() {
    assert!(matches!(
        concat(&[Chunk::from(b"a"), Chunk::object(1u8)]),
        Err(StreamError::InvalidChunk(_))
    ));
}
