//! Units of streamed data.

use crate::error::{StreamError, StreamResult};
use base64::Engine as _;
use bytes::Bytes;
use std::{any::Any, fmt, rc::Rc, str::FromStr};

/// Character encodings understood when converting text chunks to bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Utf16Le,
    Hex,
    Base64,
    /// Raw bytes; the chunk is not text.
    Buffer,
}

impl Encoding {
    /// The canonical name of the encoding.
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin1",
            Self::Utf16Le => "utf16le",
            Self::Hex => "hex",
            Self::Base64 => "base64",
            Self::Buffer => "buffer",
        }
    }

    /// Converts `text` to bytes according to this encoding.
    pub fn encode(self, text: &str) -> StreamResult<Bytes> {
        match self {
            Self::Utf8 | Self::Buffer => Ok(Bytes::copy_from_slice(text.as_bytes())),
            // Only the low byte of each code point survives, as with single-byte encodings.
            Self::Ascii | Self::Latin1 => Ok(text.chars().map(|c| c as u32 as u8).collect()),
            Self::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Self::Hex => hex::decode(text).map(Bytes::from).map_err(|e| StreamError::Decode {
                encoding: self,
                reason: e.to_string(),
            }),
            Self::Base64 => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map(Bytes::from)
                .map_err(|e| StreamError::Decode {
                    encoding: self,
                    reason: e.to_string(),
                }),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "ascii" => Ok(Self::Ascii),
            "latin1" | "binary" => Ok(Self::Latin1),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Self::Utf16Le),
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            "buffer" => Ok(Self::Buffer),
            _ => Err(StreamError::UnknownEncoding(s.to_string())),
        }
    }
}

/// One unit of streamed data.
///
/// Byte-mode streams carry [`Chunk::Bytes`]; text is converted to bytes once, when it enters a stream.
/// Object-mode streams carry any variant as a single opaque item.
#[derive(Clone)]
pub enum Chunk {
    /// A byte range. Sub-ranges share the original allocation.
    Bytes(Bytes),
    /// Text, with an optional encoding. `None` uses the stream's default encoding.
    Text(String, Option<Encoding>),
    /// An opaque value, only accepted in object mode.
    Object(Rc<dyn Any>),
}

impl Chunk {
    /// Wraps an arbitrary value as an object-mode chunk.
    pub fn object<T: Any>(value: T) -> Self {
        Self::Object(Rc::new(value))
    }

    /// The size of the chunk in bytes. Objects have size 1.
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Text(text, _) => text.len(),
            Self::Object(_) => 1,
        }
    }

    /// Returns `true` if the chunk holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bytes, if this is a byte chunk.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the text, if this is a text chunk.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text, _) => Some(text),
            _ => None,
        }
    }

    /// Returns a reference to the wrapped object, if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// Resolves a chunk entering a byte-mode stream into bytes.
    pub(crate) fn into_bytes(self, default_encoding: Encoding) -> StreamResult<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text, encoding) => encoding.unwrap_or(default_encoding).encode(&text),
            Self::Object(_) => Err(StreamError::InvalidChunk(
                "objects are only accepted in object mode",
            )),
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Self::Text(text, encoding) => f.debug_tuple("Text").field(text).field(encoding).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Text(a, ea), Self::Text(b, eb)) => a == b && ea == eb,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<&'static [u8]> for Chunk {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Chunk {
    fn from(bytes: &'static [u8; N]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string(), None)
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Self::Text(text, None)
    }
}
