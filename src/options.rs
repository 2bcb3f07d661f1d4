//! Construction options.

use crate::chunk::Encoding;

/// The default high-water-mark for byte streams.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// The default high-water-mark for object-mode streams, counted in objects.
pub const DEFAULT_OBJECT_HIGH_WATER_MARK: usize = 16;

/// The largest high-water-mark a read request can grow a readable stream to.
pub const MAX_HIGH_WATER_MARK: usize = 1 << 30;

fn default_high_water_mark(object_mode: bool) -> usize {
    if object_mode {
        DEFAULT_OBJECT_HIGH_WATER_MARK
    } else {
        DEFAULT_HIGH_WATER_MARK
    }
}

/// Options for a readable stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadableOptions {
    /// Buffered size at which `push` starts signaling backpressure.
    ///
    /// `None` selects [`DEFAULT_HIGH_WATER_MARK`], or [`DEFAULT_OBJECT_HIGH_WATER_MARK`] in object mode.
    pub high_water_mark: Option<usize>,
    /// Treat every chunk as one opaque item.
    pub object_mode: bool,
    /// Encoding of pushed text that doesn't specify one.
    pub default_encoding: Encoding,
    /// Emit `close` after the stream is destroyed.
    pub emit_close: bool,
    /// Destroy the stream after `end`.
    pub auto_destroy: bool,
}

impl Default for ReadableOptions {
    fn default() -> Self {
        Self {
            high_water_mark: None,
            object_mode: false,
            default_encoding: Encoding::Utf8,
            emit_close: true,
            auto_destroy: true,
        }
    }
}

impl ReadableOptions {
    /// Options for an object-mode stream.
    pub fn objects() -> Self {
        Self::default().object_mode(true)
    }

    pub fn high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = Some(high_water_mark);
        self
    }

    pub fn object_mode(mut self, object_mode: bool) -> Self {
        self.object_mode = object_mode;
        self
    }

    pub fn default_encoding(mut self, encoding: Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    pub fn emit_close(mut self, emit_close: bool) -> Self {
        self.emit_close = emit_close;
        self
    }

    pub fn auto_destroy(mut self, auto_destroy: bool) -> Self {
        self.auto_destroy = auto_destroy;
        self
    }

    pub(crate) fn resolved_high_water_mark(&self) -> usize {
        self.high_water_mark
            .unwrap_or_else(|| default_high_water_mark(self.object_mode))
    }
}

/// Options for a writable stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WritableOptions {
    /// Pending size at which `write` starts signaling backpressure.
    ///
    /// `None` selects [`DEFAULT_HIGH_WATER_MARK`], or [`DEFAULT_OBJECT_HIGH_WATER_MARK`] in object mode.
    pub high_water_mark: Option<usize>,
    /// Treat every chunk as one opaque item.
    pub object_mode: bool,
    /// Encoding of written text that doesn't specify one.
    pub default_encoding: Encoding,
    /// Convert text to bytes before it reaches the sink.
    pub decode_strings: bool,
    /// Emit `close` after the stream is destroyed.
    pub emit_close: bool,
    /// Destroy the stream after `finish`, or when the sink fails.
    pub auto_destroy: bool,
}

impl Default for WritableOptions {
    fn default() -> Self {
        Self {
            high_water_mark: None,
            object_mode: false,
            default_encoding: Encoding::Utf8,
            decode_strings: true,
            emit_close: true,
            auto_destroy: true,
        }
    }
}

impl WritableOptions {
    /// Options for an object-mode stream.
    pub fn objects() -> Self {
        Self::default().object_mode(true)
    }

    pub fn high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = Some(high_water_mark);
        self
    }

    pub fn object_mode(mut self, object_mode: bool) -> Self {
        self.object_mode = object_mode;
        self
    }

    pub fn default_encoding(mut self, encoding: Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    pub fn decode_strings(mut self, decode_strings: bool) -> Self {
        self.decode_strings = decode_strings;
        self
    }

    pub fn emit_close(mut self, emit_close: bool) -> Self {
        self.emit_close = emit_close;
        self
    }

    pub fn auto_destroy(mut self, auto_destroy: bool) -> Self {
        self.auto_destroy = auto_destroy;
        self
    }

    pub(crate) fn resolved_high_water_mark(&self) -> usize {
        self.high_water_mark
            .unwrap_or_else(|| default_high_water_mark(self.object_mode))
    }
}

/// Options for a stream with both a readable and a writable side.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DuplexOptions {
    pub readable: ReadableOptions,
    pub writable: WritableOptions,
    /// Keep the writable side open after the readable side ends.
    pub allow_half_open: bool,
}

impl Default for DuplexOptions {
    fn default() -> Self {
        Self {
            readable: ReadableOptions::default(),
            writable: WritableOptions::default(),
            allow_half_open: true,
        }
    }
}

impl DuplexOptions {
    /// Options for a stream that is object-mode on both sides.
    pub fn objects() -> Self {
        Self {
            readable: ReadableOptions::objects(),
            writable: WritableOptions::objects(),
            allow_half_open: true,
        }
    }

    /// Sets the same high-water-mark on both sides.
    pub fn high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.readable.high_water_mark = Some(high_water_mark);
        self.writable.high_water_mark = Some(high_water_mark);
        self
    }

    pub fn allow_half_open(mut self, allow_half_open: bool) -> Self {
        self.allow_half_open = allow_half_open;
        self
    }
}
