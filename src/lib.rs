#![cfg_attr(docsrs, feature(doc_cfg))]
//! Freshet provides flow-controlled readable and writable streams of bytes or objects.
//!
//! A [`Readable`] buffers what its [`Source`] produces and hands it to consumers on request or while
//! flowing. A [`Writable`] serializes writes into its [`Sink`]. Both signal backpressure once their
//! buffered size reaches a high-water-mark, and [`Readable::pipe`] connects the two so that a slow
//! writable pauses a fast readable.
//!
//! Streams are single-threaded. Work that must run after the current call returns, such as `end`,
//! `finish`, `error`, and `close` notifications, is handed to a [`Scheduler`].

mod chunk;
mod completion;
mod duplex;
mod pipe;
mod readable;
mod transform;
mod writable;

pub mod chunk_buffer;
pub mod error;
pub mod io;
pub mod notifier;
pub mod options;
pub mod scheduler;

pub use chunk::{Chunk, Encoding};
pub use completion::Completion;
pub use duplex::Duplex;
pub use error::{StreamError, StreamResult};
pub use pipe::PipeOptions;
pub use readable::{Readable, ReadableEvent, ReadableEventKind, Source};
pub use scheduler::{ManualScheduler, Scheduler};
pub use transform::{Transform, TransformDone, Transformer};
pub use writable::{Sink, Writable, WritableEvent, WritableEventKind, WriteCallback};
