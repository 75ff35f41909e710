//! Body codec: symmetric read/write of response bodies

use std::fmt;
use std::io;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::Result;

/// Read size for streamed replay bodies
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Streamed body chunks
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Representation the caller asked the response body to be delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Raw bytes
    #[serde(rename = "arraybuffer")]
    ArrayBuffer,
    /// UTF-8 text
    Text,
    /// Parsed JSON, falling back to text when the payload does not parse
    #[default]
    Json,
    /// Byte stream
    Stream,
}

impl ResponseType {
    /// Whether replay serves the recorded bytes rather than text
    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(self, Self::ArrayBuffer | Self::Stream)
    }
}

/// Response body in one of its four representations
pub enum Body {
    /// Binary buffer
    Bytes(Bytes),
    /// Text
    Text(String),
    /// Byte stream
    Stream(ByteStream),
    /// Structured value
    Json(Value),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl Body {
    /// Decode a fully received live payload into the requested representation
    #[must_use]
    pub fn decode(payload: Bytes, response_type: ResponseType) -> Self {
        match response_type {
            ResponseType::ArrayBuffer => Self::Bytes(payload),
            ResponseType::Stream => {
                Self::Stream(stream::once(async move { Ok::<_, io::Error>(payload) }).boxed())
            }
            ResponseType::Text => Self::Text(String::from_utf8_lossy(&payload).into_owned()),
            ResponseType::Json => match serde_json::from_slice(&payload) {
                Ok(value) => Self::Json(value),
                Err(_) => Self::Text(String::from_utf8_lossy(&payload).into_owned()),
            },
        }
    }

    /// Text content, if this is a text body
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Buffer content, if this is a binary body
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Structured content, if this is a JSON body
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Collect the body into bytes, draining streams
    ///
    /// # Errors
    ///
    /// Returns error if a stream chunk fails or JSON cannot be serialized
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text) => Ok(Bytes::from(text)),
            Self::Json(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
            Self::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }
}

/// Persist a body as a single content artifact.
///
/// Returns the body to hand back to the caller. Streams are drained to disk
/// completely, so the caller receives a fresh stream over the written file.
///
/// # Errors
///
/// Returns error if writing fails or a stream chunk fails
pub async fn write_body(path: &Path, body: Body) -> Result<Body> {
    match body {
        Body::Bytes(bytes) => {
            fs::write(path, &bytes).await?;
            Ok(Body::Bytes(bytes))
        }
        Body::Text(text) => {
            fs::write(path, text.as_bytes()).await?;
            Ok(Body::Text(text))
        }
        Body::Json(value) => {
            fs::write(path, serde_json::to_string(&value)?).await?;
            Ok(Body::Json(value))
        }
        Body::Stream(mut chunks) => {
            let mut file = fs::File::create(path).await?;
            while let Some(chunk) = chunks.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            drop(file);

            Ok(Body::Stream(open_stream(path).await?))
        }
    }
}

/// Read a content artifact back in the requested representation.
///
/// Anything other than a stream or buffer is served as text, even when the
/// caller asked for JSON.
///
/// # Errors
///
/// Returns error if the artifact cannot be read
pub async fn read_body(path: &Path, response_type: ResponseType) -> Result<Body> {
    match response_type {
        ResponseType::Stream => Ok(Body::Stream(open_stream(path).await?)),
        ResponseType::ArrayBuffer => Ok(Body::Bytes(Bytes::from(fs::read(path).await?))),
        ResponseType::Text | ResponseType::Json => {
            let raw = fs::read(path).await?;
            let text = match String::from_utf8(raw) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            Ok(Body::Text(text))
        }
    }
}

/// Open a file as a chunked byte stream
///
/// # Errors
///
/// Returns error if the file cannot be opened
pub async fn open_stream(path: &Path) -> io::Result<ByteStream> {
    let file = fs::File::open(path).await?;

    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = BytesMut::with_capacity(STREAM_CHUNK_SIZE);
        let read = file.read_buf(&mut buf).await?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some((buf.freeze(), file)))
        }
    });

    Ok(chunks.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const BINARY: &[u8] = b"%PDF-1.4\n\xff\xfe\x00\x01binary";

    #[tokio::test]
    async fn test_write_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");

        let body = write_body(&path, Body::Text("pong 0\n".to_string())).await.unwrap();

        assert_eq!(body.as_text(), Some("pong 0\n"));
        assert_eq!(std::fs::read(&path).unwrap(), b"pong 0\n");
    }

    #[tokio::test]
    async fn test_write_json_is_compact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");

        write_body(&path, Body::Json(json!({"error": "Internal Server Error"})))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"error":"Internal Server Error"}"#
        );
    }

    #[tokio::test]
    async fn test_write_stream_drains_and_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");

        let chunks: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"first ")),
            Ok(Bytes::from_static(b"second")),
        ])
        .boxed();
        let body = write_body(&path, Body::Stream(chunks)).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"first second");
        assert!(matches!(body, Body::Stream(_)));
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"first second"));
    }

    #[tokio::test]
    async fn test_write_stream_error_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");

        let chunks: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ])
        .boxed();

        assert!(write_body(&path, Body::Stream(chunks)).await.is_err());
    }

    #[tokio::test]
    async fn test_read_binary_representations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");
        write_body(&path, Body::Bytes(Bytes::from_static(BINARY)))
            .await
            .unwrap();

        let buffer = read_body(&path, ResponseType::ArrayBuffer).await.unwrap();
        assert_eq!(buffer.as_bytes().unwrap().as_ref(), BINARY);

        let streamed = read_body(&path, ResponseType::Stream).await.unwrap();
        assert_eq!(streamed.into_bytes().await.unwrap().as_ref(), BINARY);
    }

    #[tokio::test]
    async fn test_read_json_falls_back_to_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");
        write_body(&path, Body::Json(json!({"ok": true}))).await.unwrap();

        let body = read_body(&path, ResponseType::Json).await.unwrap();
        assert_eq!(body.as_text(), Some(r#"{"ok":true}"#));
        assert!(body.as_json().is_none());
    }

    #[tokio::test]
    async fn test_read_binary_as_text_is_lossy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");
        std::fs::write(&path, BINARY).unwrap();

        let body = read_body(&path, ResponseType::Text).await.unwrap();
        assert_eq!(body.as_text().unwrap(), String::from_utf8_lossy(BINARY));
    }

    #[tokio::test]
    async fn test_read_missing_artifact_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing");

        assert!(read_body(&path, ResponseType::Text).await.is_err());
        assert!(read_body(&path, ResponseType::Stream).await.is_err());
    }

    #[tokio::test]
    async fn test_stream_chunks_large_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.content");
        let payload = vec![7u8; STREAM_CHUNK_SIZE * 2 + 10];
        std::fs::write(&path, &payload).unwrap();

        let chunks: Vec<Bytes> = open_stream(&path).await.unwrap().try_collect().await.unwrap();
        assert!(chunks.len() >= 3);
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn test_decode_live_payload() {
        let json = Body::decode(Bytes::from_static(br#"{"a":1}"#), ResponseType::Json);
        assert_eq!(json.as_json(), Some(&json!({"a": 1})));

        let text = Body::decode(Bytes::from_static(b"pong 0\n"), ResponseType::Json);
        assert_eq!(text.as_text(), Some("pong 0\n"));

        let bytes = Body::decode(Bytes::from_static(BINARY), ResponseType::ArrayBuffer);
        assert_eq!(bytes.as_bytes().unwrap().as_ref(), BINARY);
    }

    #[test]
    fn test_response_type_binary() {
        assert!(ResponseType::Stream.is_binary());
        assert!(ResponseType::ArrayBuffer.is_binary());
        assert!(!ResponseType::Text.is_binary());
        assert!(!ResponseType::Json.is_binary());
        assert_eq!(ResponseType::default(), ResponseType::Json);
    }
}
