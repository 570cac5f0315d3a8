//! Byte sources the assembler can read from.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

/// Boxed error produced by a byte source while reading.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A pinned, boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Anything that can hand over a readable byte body.
///
/// Returning `None` means there is no body to read, like an HTTP response
/// without content. The assembler treats that as an empty result rather
/// than a failure.
pub trait StreamSource {
    fn into_body(self) -> Option<ByteStream>;
}

impl StreamSource for ByteStream {
    fn into_body(self) -> Option<ByteStream> {
        Some(self)
    }
}

impl StreamSource for reqwest::Response {
    fn into_body(self) -> Option<ByteStream> {
        Some(byte_stream(self.bytes_stream()))
    }
}

impl<T: StreamSource> StreamSource for Option<T> {
    fn into_body(self) -> Option<ByteStream> {
        self.and_then(StreamSource::into_body)
    }
}

/// Box any fallible chunk stream into a [`ByteStream`].
pub fn byte_stream<S, B, E>(stream: S) -> ByteStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Into<Bytes> + 'static,
    E: Into<BoxError> + 'static,
{
    Box::pin(stream.map(|chunk| chunk.map(Into::into).map_err(Into::into)))
}

/// Build a [`ByteStream`] that yields the given chunks in order.
///
/// # Example
/// ```
/// use streamtext::source::from_chunks;
///
/// let body = from_chunks(["data: \"a\"\n", "data: \"b\"\n"]);
/// ```
pub fn from_chunks<I, B>(chunks: I) -> ByteStream
where
    I: IntoIterator<Item = B>,
    I::IntoIter: Send + 'static,
    B: Into<Bytes> + 'static,
{
    Box::pin(stream::iter(
        chunks.into_iter().map(|chunk| Ok::<Bytes, BoxError>(chunk.into())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_chunks_preserves_order() {
        let mut body = from_chunks(vec![b"ab".to_vec(), b"cd".to_vec()]).into_body().unwrap();
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"ab"));
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"cd"));
        assert!(body.next().await.is_none());
    }

    #[test]
    fn test_missing_body() {
        let source: Option<ByteStream> = None;
        assert!(source.into_body().is_none());
    }

    #[tokio::test]
    async fn test_byte_stream_maps_errors() {
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(std::io::Error::other("reset")),
        ]);
        let mut body = byte_stream(failing);
        assert!(body.next().await.unwrap().is_ok());
        let err = body.next().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "reset");
    }
}
