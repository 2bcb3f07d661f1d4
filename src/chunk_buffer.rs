//! An ordered queue of chunks supporting byte-precise, zero-copy consumption.

use crate::chunk::Chunk;
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

/// An ordered queue of chunks.
///
/// Only the head chunk is ever modified: a partial [`consume`](Self::consume) replaces it with the
/// unconsumed remainder. Every other chunk is stored exactly as it was pushed.
#[derive(Clone, Debug, Default)]
pub struct ChunkBuffer {
    chunks: VecDeque<Chunk>,
}

impl ChunkBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of chunks in the buffer.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the buffer holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Appends a chunk.
    pub fn push(&mut self, chunk: Chunk) {
        self.chunks.push_back(chunk);
    }

    /// Prepends a chunk.
    pub fn unshift(&mut self, chunk: Chunk) {
        self.chunks.push_front(chunk);
    }

    /// Removes and returns the head chunk, or `None` if the buffer is empty.
    pub fn shift(&mut self) -> Option<Chunk> {
        self.chunks.pop_front()
    }

    /// Returns the head chunk without removing it.
    pub fn first(&self) -> Option<&Chunk> {
        self.chunks.front()
    }

    /// Removes every chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Copies every chunk into one allocation of `total` bytes and empties the buffer.
    ///
    /// # Panics
    /// If the buffer contains a chunk that is not bytes.
    pub fn concatenate(&mut self, total: usize) -> Bytes {
        let mut out = BytesMut::with_capacity(total);
        for chunk in self.chunks.drain(..) {
            out.extend_from_slice(byte_chunk(&chunk));
        }
        debug_assert_eq!(out.len(), total, "buffered byte count mismatch");
        out.freeze()
    }

    /// Removes exactly `n` bytes from the front of the buffer.
    ///
    /// If `n` is smaller than the head chunk, the returned bytes share the head's allocation and the head
    /// is replaced by its remainder. If `n` spans several chunks, the bytes are copied into a new
    /// allocation of exactly `n` bytes.
    ///
    /// Returns `None` if the buffer is empty.
    ///
    /// # Panics
    /// If `n` exceeds the number of buffered bytes, or a consumed chunk is not bytes.
    pub fn consume(&mut self, n: usize) -> Option<Bytes> {
        let head_len = byte_chunk(self.chunks.front()?).len();
        if n == head_len {
            return self.shift().map(|chunk| byte_chunk(&chunk).clone());
        }
        if n < head_len {
            return Some(self.split_head(n));
        }

        let mut out = BytesMut::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let head = self
                .chunks
                .front()
                .expect("attempted to consume more than the buffered length");
            let len = byte_chunk(head).len();
            if remaining >= len {
                if let Some(chunk) = self.chunks.pop_front() {
                    out.extend_from_slice(byte_chunk(&chunk));
                }
                remaining -= len;
            } else {
                let prefix = self.split_head(remaining);
                out.extend_from_slice(&prefix);
                remaining = 0;
            }
        }
        Some(out.freeze())
    }

    fn split_head(&mut self, n: usize) -> Bytes {
        match self.chunks.front_mut() {
            Some(Chunk::Bytes(head)) => head.split_to(n),
            _ => panic!("attempted to split a chunk that is not bytes"),
        }
    }
}

fn byte_chunk(chunk: &Chunk) -> &Bytes {
    chunk
        .as_bytes()
        .expect("byte operations require byte chunks")
}
