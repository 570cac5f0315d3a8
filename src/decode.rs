//! Incremental UTF-8 decoding for chunked byte streams.
//!
//! Network reads split the body at arbitrary byte offsets, so a multi-byte
//! character may straddle two chunks. [`Utf8Decoder`] keeps the incomplete
//! tail of one chunk and prepends it to the next. A tail still pending when
//! the stream ends flushes as U+FFFD.

use thiserror::Error;

/// Errors raised while decoding a byte stream as UTF-8.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid UTF-8 sequence of {len} byte(s) at offset {offset}")]
    Invalid { offset: usize, len: usize },
}

/// Stream-aware UTF-8 decoder.
///
/// # Example
/// ```
/// use streamtext::decode::Utf8Decoder;
///
/// let mut decoder = Utf8Decoder::new();
/// let bytes = "é".as_bytes();
/// assert_eq!(decoder.decode(&bytes[..1]).unwrap(), "");
/// assert_eq!(decoder.decode(&bytes[1..]).unwrap(), "é");
/// assert_eq!(decoder.finish(), "");
///
/// decoder.decode(&bytes[..1]).unwrap();
/// assert_eq!(decoder.finish(), "\u{FFFD}");
/// ```
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Leading bytes of a character whose remainder has not arrived yet (at most 3).
    pending: Vec<u8>,
    /// Bytes consumed so far, excluding `pending`.
    offset: usize,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning every complete character it finishes.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let joined;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => {
                self.offset += bytes.len();
                Ok(text.to_owned())
            }
            Err(e) => {
                let valid = e.valid_up_to();
                if let Some(len) = e.error_len() {
                    return Err(DecodeError::Invalid {
                        offset: self.offset + valid,
                        len,
                    });
                }
                // Truncated sequence at the end of the chunk
                self.pending = bytes[valid..].to_vec();
                self.offset += valid;
                Ok(String::from_utf8_lossy(&bytes[..valid]).into_owned())
            }
        }
    }

    /// Flush the decoder at end of stream and return its trailing text.
    ///
    /// A truncated sequence left over from the last chunk becomes a single
    /// U+FFFD. An empty string means nothing was pending.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = std::mem::take(&mut self.pending);
        self.offset += tail.len();
        String::from_utf8_lossy(&tail).into_owned()
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"hello").unwrap(), "hello");
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decode_split_multibyte() {
        let bytes = "a€b".as_bytes(); // € is 3 bytes
        let mut decoder = Utf8Decoder::new();

        assert_eq!(decoder.decode(&bytes[..2]).unwrap(), "a");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&bytes[2..3]).unwrap(), "");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.decode(&bytes[3..]).unwrap(), "€b");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decode_four_byte_char_byte_by_byte() {
        let bytes = "🦀".as_bytes();
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.decode(std::slice::from_ref(b)).unwrap());
        }
        assert_eq!(out, "🦀");
    }

    #[test]
    fn test_decode_invalid_reports_offset() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"abc").unwrap();
        let err = decoder.decode(&[b'd', 0xff, b'e']).unwrap_err();
        assert_eq!(err, DecodeError::Invalid { offset: 4, len: 1 });
    }

    #[test]
    fn test_finish_flushes_dangling_bytes_as_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&"hi€".as_bytes()[..4]).unwrap(), "hi");
        assert_eq!(decoder.pending_len(), 2);

        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.finish(), "");
    }
}
