//! HTTP/1.x message snapshots and their wire format.
//!
//! # Responsibilities
//! - Parse request and response heads with `httparse`
//! - Frame bodies (Content-Length, chunked, none) without over-reading
//! - Serialize messages back to HTTP/1.1 wire bytes
//!
//! # Design Decisions
//! - Header names are normalized to lowercase by `http::HeaderMap`; values and
//!   per-name order are preserved
//! - A response without Content-Length or chunked encoding has no body; the
//!   stream that follows belongs to the upgraded protocol
//! - Chunked bodies are decoded on read and re-framed as one chunk on write

use std::io;

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::prebuffered::Prebuffered;
use crate::http::upgrade::header_contains;

/// Maximum size of a request or response head.
pub const MAX_HEAD_LEN: usize = 16 * 1024;

/// Maximum size of a decoded request or response body.
pub const MAX_BODY_LEN: usize = 1024 * 1024;

const MAX_HEADERS: usize = 100;
const MAX_CHUNK_LINE: usize = 4 * 1024;

/// Errors raised while reading an HTTP message off a stream.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("message head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("message body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl From<httparse::Error> for MessageError {
    fn from(e: httparse::Error) -> Self {
        MessageError::Malformed(e.to_string())
    }
}

/// Snapshot of a client request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    /// Parse a request head from `buf`; `None` while incomplete.
    ///
    /// Returns the head length and a request with an empty body.
    pub fn parse_head(buf: &[u8]) -> Result<Option<(usize, Self)>, MessageError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let len = match req.parse(buf)? {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(len) => len,
        };
        let method = req
            .method
            .ok_or_else(|| MessageError::Malformed("missing method".into()))?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| MessageError::Malformed(e.to_string()))?;
        let target = req
            .path
            .ok_or_else(|| MessageError::Malformed("missing request target".into()))?;
        let uri: Uri = target
            .parse()
            .map_err(|e: http::uri::InvalidUri| MessageError::Malformed(e.to_string()))?;
        Ok(Some((
            len,
            Self {
                method,
                uri,
                version: version_from_minor(req.version),
                headers: collect_headers(req.headers)?,
                body: Bytes::new(),
            },
        )))
    }

    /// Read one complete request (head and body) from `reader`.
    pub async fn read<S>(reader: &mut Prebuffered<S>) -> Result<Self, MessageError>
    where
        S: AsyncRead + Unpin,
    {
        let mut request = read_head(reader, Self::parse_head).await?;
        let framing = if header_contains(&request.headers, TRANSFER_ENCODING, "chunked") {
            Framing::Chunked
        } else {
            content_length(&request.headers)?.map_or(Framing::Empty, Framing::Length)
        };
        request.body = read_body(reader, framing).await?;
        Ok(request)
    }

    /// The same request addressed to an origin server: an absolute-form
    /// target becomes its path and query, and the authority moves into
    /// `Host` when the request had none.
    pub fn to_origin_form(&self) -> Request {
        let mut request = self.clone();
        if let Some(authority) = self.uri.authority() {
            if !request.headers.contains_key(HOST) {
                if let Ok(value) = HeaderValue::from_str(authority.as_str()) {
                    request.headers.insert(HOST, value);
                }
            }
            request.uri = self
                .uri
                .path_and_query()
                .map(|pq| Uri::from(pq.clone()))
                .unwrap_or_else(|| Uri::from_static("/"));
        }
        request
    }

    /// Serialize to HTTP/1.1 wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256 + self.body.len());
        out.extend_from_slice(self.method.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.uri.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(version_str(self.version).as_bytes());
        out.extend_from_slice(b"\r\n");
        write_headers(&mut out, &self.headers);
        if !self.body.is_empty()
            && !self.headers.contains_key(CONTENT_LENGTH)
            && !self.headers.contains_key(TRANSFER_ENCODING)
        {
            out.extend_from_slice(format!("content-length: {}\r\n", self.body.len()).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        write_body(&mut out, &self.headers, &self.body);
        out
    }

    /// Write the serialized request and flush.
    pub async fn write_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await
    }
}

/// Snapshot of a destination response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub reason: Option<String>,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Answers a HEAD request, so Content-Length describes a body that was
    /// never sent.
    head_response: bool,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            head_response: false,
        }
    }

    /// Reason phrase as received, or the canonical one.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .or(self.status.canonical_reason())
            .unwrap_or("")
    }

    /// Parse a response head from `buf`; `None` while incomplete.
    pub fn parse_head(buf: &[u8]) -> Result<Option<(usize, Self)>, MessageError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut res = httparse::Response::new(&mut headers);
        let len = match res.parse(buf)? {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(len) => len,
        };
        let code = res
            .code
            .ok_or_else(|| MessageError::Malformed("missing status code".into()))?;
        let status =
            StatusCode::from_u16(code).map_err(|e| MessageError::Malformed(e.to_string()))?;
        let reason = res.reason.filter(|r| !r.is_empty()).map(ToOwned::to_owned);
        Ok(Some((
            len,
            Self {
                status,
                reason,
                version: version_from_minor(res.version),
                headers: collect_headers(res.headers)?,
                body: Bytes::new(),
                head_response: false,
            },
        )))
    }

    /// Read one complete response from `reader`.
    ///
    /// `method` is the method of the request being answered; it decides
    /// whether a body may follow. Bytes after the framed response stay in
    /// `reader`.
    pub async fn read<S>(reader: &mut Prebuffered<S>, method: &Method) -> Result<Self, MessageError>
    where
        S: AsyncRead + Unpin,
    {
        let mut response = read_head(reader, Self::parse_head).await?;
        response.head_response = *method == Method::HEAD;
        let framing = response_framing(method, response.status, &response.headers)?;
        response.body = read_body(reader, framing).await?;
        Ok(response)
    }

    /// Serialize to HTTP/1.1 wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256 + self.body.len());
        out.extend_from_slice(
            format!(
                "{} {} {}\r\n",
                version_str(self.version),
                self.status.as_u16(),
                self.reason()
            )
            .as_bytes(),
        );
        let mut headers = self.headers.clone();
        // A bodiless response's Content-Length is passed through untouched.
        let may_carry_body = !self.head_response && !status_forbids_body(self.status);
        if may_carry_body
            && headers.contains_key(CONTENT_LENGTH)
            && !header_contains(&headers, TRANSFER_ENCODING, "chunked")
        {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        write_headers(&mut out, &headers);
        out.extend_from_slice(b"\r\n");
        write_body(&mut out, &headers, &self.body);
        out
    }

    /// Write the serialized response and flush.
    pub async fn write_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await
    }
}

/// How a message body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Empty,
    Length(u64),
    Chunked,
}

/// Body framing for a response to `method` per HTTP/1.1 rules.
///
/// Without Content-Length or chunked encoding the response has no body.
pub fn response_framing(
    method: &Method,
    status: StatusCode,
    headers: &HeaderMap,
) -> Result<Framing, MessageError> {
    if *method == Method::HEAD || status_forbids_body(status) {
        return Ok(Framing::Empty);
    }
    if header_contains(headers, TRANSFER_ENCODING, "chunked") {
        return Ok(Framing::Chunked);
    }
    Ok(content_length(headers)?.map_or(Framing::Empty, Framing::Length))
}

fn status_forbids_body(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

fn content_length(headers: &HeaderMap) -> Result<Option<u64>, MessageError> {
    let mut found: Option<u64> = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| MessageError::Malformed("invalid content-length".into()))?;
        if found.is_some_and(|prev| prev != parsed) {
            return Err(MessageError::Malformed("conflicting content-length".into()));
        }
        found = Some(parsed);
    }
    Ok(found)
}

async fn read_head<S, T, F>(reader: &mut Prebuffered<S>, parse: F) -> Result<T, MessageError>
where
    S: AsyncRead + Unpin,
    F: Fn(&[u8]) -> Result<Option<(usize, T)>, MessageError>,
{
    loop {
        if let Some((len, head)) = parse(reader.buffer())? {
            reader.discard(len);
            return Ok(head);
        }
        if reader.buffer().len() >= MAX_HEAD_LEN {
            return Err(MessageError::HeadTooLarge { limit: MAX_HEAD_LEN });
        }
        if reader.buffer_more(MAX_HEAD_LEN).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before message head was complete",
            )
            .into());
        }
    }
}

async fn read_body<S>(reader: &mut Prebuffered<S>, framing: Framing) -> Result<Bytes, MessageError>
where
    S: AsyncRead + Unpin,
{
    match framing {
        Framing::Empty => Ok(Bytes::new()),
        Framing::Length(len) => {
            let len = usize::try_from(len)
                .ok()
                .filter(|len| *len <= MAX_BODY_LEN)
                .ok_or(MessageError::BodyTooLarge { limit: MAX_BODY_LEN })?;
            reader.fill_to(len).await?;
            Ok(reader.take(len))
        }
        Framing::Chunked => read_chunked(reader).await,
    }
}

async fn read_chunked<S>(reader: &mut Prebuffered<S>) -> Result<Bytes, MessageError>
where
    S: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let line = read_line(reader).await?;
        let size = line.split(|b| *b == b';').next().unwrap_or_default();
        let size = std::str::from_utf8(size)
            .ok()
            .and_then(|s| usize::from_str_radix(s.trim(), 16).ok())
            .ok_or_else(|| MessageError::Malformed("invalid chunk size".into()))?;
        if size == 0 {
            // Trailers are read and dropped.
            while !read_line(reader).await?.is_empty() {}
            return Ok(body.freeze());
        }
        let framed = size
            .checked_add(2)
            .ok_or_else(|| MessageError::Malformed("chunk size too large".into()))?;
        if size > MAX_BODY_LEN - body.len() {
            return Err(MessageError::BodyTooLarge { limit: MAX_BODY_LEN });
        }
        reader.fill_to(framed).await?;
        body.extend_from_slice(&reader.take(size));
        if reader.take(2).as_ref() != b"\r\n" {
            return Err(MessageError::Malformed("chunk not terminated by CRLF".into()));
        }
    }
}

/// Read one CRLF-terminated line, returned without the terminator.
async fn read_line<S>(reader: &mut Prebuffered<S>) -> Result<Bytes, MessageError>
where
    S: AsyncRead + Unpin,
{
    loop {
        if let Some(pos) = reader.buffer().windows(2).position(|w| w == b"\r\n") {
            let line = reader.take(pos);
            reader.discard(2);
            return Ok(line);
        }
        if reader.buffer().len() >= MAX_CHUNK_LINE {
            return Err(MessageError::Malformed("chunk line too long".into()));
        }
        let limit = reader.buffer().len() + MAX_CHUNK_LINE;
        if reader.buffer_more(limit).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside chunked body",
            )
            .into());
        }
    }
}

fn collect_headers(raw: &[httparse::Header<'_>]) -> Result<HeaderMap, MessageError> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for h in raw {
        let name = HeaderName::from_bytes(h.name.as_bytes())
            .map_err(|e| MessageError::Malformed(e.to_string()))?;
        let value =
            HeaderValue::from_bytes(h.value).map_err(|e| MessageError::Malformed(e.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn write_headers(out: &mut Vec<u8>, headers: &HeaderMap) {
    for (name, value) in headers {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}

fn write_body(out: &mut Vec<u8>, headers: &HeaderMap, body: &Bytes) {
    if header_contains(headers, TRANSFER_ENCODING, "chunked") {
        if !body.is_empty() {
            out.extend_from_slice(format!("{:x}\r\n", body.len()).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"0\r\n\r\n");
    } else {
        out.extend_from_slice(body);
    }
}

fn version_from_minor(minor: Option<u8>) -> Version {
    match minor {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    }
}

fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else {
        "HTTP/1.1"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn absolute_form_becomes_origin_form() {
        let raw = b"GET http://example.com:8080/chat?room=1 HTTP/1.1\r\nUpgrade: websocket\r\n\r\n";
        let (_, request) = Request::parse_head(raw).unwrap().unwrap();
        let origin = request.to_origin_form();
        assert_eq!(origin.uri, "/chat?room=1");
        assert_eq!(origin.headers.get(HOST).unwrap(), "example.com:8080");

        let raw = b"GET /chat HTTP/1.1\r\nHost: a.test\r\n\r\n";
        let (_, request) = Request::parse_head(raw).unwrap().unwrap();
        assert_eq!(request.to_origin_form().to_bytes(), request.to_bytes());
    }

    fn reader(data: &[u8]) -> Prebuffered<Cursor<Vec<u8>>> {
        Prebuffered::new(Cursor::new(data.to_vec()))
    }

    #[tokio::test]
    async fn request_round_trip_preserves_headers_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("example.com"));
        headers.append("x-multi", HeaderValue::from_static("one"));
        headers.append("x-multi", HeaderValue::from_static("two"));
        headers.insert("content-length", HeaderValue::from_static("5"));
        let original = Request {
            method: Method::POST,
            uri: "/chat?room=1".parse().unwrap(),
            version: Version::HTTP_11,
            headers,
            body: Bytes::from_static(b"hello"),
        };

        let wire = original.to_bytes();
        let parsed = Request::read(&mut reader(&wire)).await.unwrap();

        assert_eq!(parsed.method, original.method);
        assert_eq!(parsed.uri, original.uri);
        assert_eq!(parsed.headers, original.headers);
        assert_eq!(parsed.body, original.body);
        let multi: Vec<_> = parsed.headers.get_all("x-multi").iter().collect();
        assert_eq!(multi, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn header_names_are_normalized() {
        let wire = b"GET / HTTP/1.1\r\nSec-WebSocket-Key: abc\r\n\r\n";
        let parsed = Request::read(&mut reader(wire)).await.unwrap();
        assert!(parsed.to_bytes().windows(18).any(|w| w == b"sec-websocket-key:"));
    }

    #[tokio::test]
    async fn switching_protocols_has_no_body_and_keeps_leftover() {
        let wire = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n\x81\x02hi";
        let mut r = reader(wire);
        let response = Response::read(&mut r, &Method::GET).await.unwrap();
        assert_eq!(response.status, StatusCode::SWITCHING_PROTOCOLS);
        assert!(response.body.is_empty());
        assert_eq!(r.buffer(), b"\x81\x02hi");
    }

    #[tokio::test]
    async fn content_length_body_is_read_exactly() {
        let wire = b"HTTP/1.1 403 Forbidden\r\nContent-Length: 4\r\n\r\nnopeEXTRA";
        let mut r = reader(wire);
        let response = Response::read(&mut r, &Method::GET).await.unwrap();
        assert_eq!(&response.body[..], b"nope");
        assert_eq!(r.buffer(), b"EXTRA");
    }

    #[tokio::test]
    async fn no_length_means_no_body() {
        let wire = b"HTTP/1.1 400 Bad Request\r\nX-A: b\r\n\r\ntrailing";
        let mut r = reader(wire);
        let response = Response::read(&mut r, &Method::GET).await.unwrap();
        assert!(response.body.is_empty());
        assert_eq!(r.buffer(), b"trailing");
    }

    #[tokio::test]
    async fn head_request_ignores_content_length() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n";
        let response = Response::read(&mut reader(wire), &Method::HEAD).await.unwrap();
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn chunked_body_is_decoded_and_reframed() {
        let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2;ext=1\r\nde\r\n0\r\nX-Trailer: 1\r\n\r\nNEXT";
        let mut r = reader(wire);
        let response = Response::read(&mut r, &Method::GET).await.unwrap();
        assert_eq!(&response.body[..], b"abcde");
        assert_eq!(r.buffer(), b"NEXT");

        let out = response.to_bytes();
        assert!(out.ends_with(b"\r\n\r\n5\r\nabcde\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn truncated_head_is_an_error() {
        let wire = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: web";
        let err = Response::read(&mut reader(wire), &Method::GET).await.unwrap_err();
        match err {
            MessageError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        assert!(Response::read(&mut reader(wire), &Method::GET).await.is_err());
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let wire = b"NOT HTTP AT ALL\r\n\r\n";
        let err = Response::read(&mut reader(wire), &Method::GET).await.unwrap_err();
        assert!(matches!(err, MessageError::Malformed(_)));
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let mut wire = b"HTTP/1.1 200 OK\r\n".to_vec();
        while wire.len() < MAX_HEAD_LEN + 10 {
            wire.extend_from_slice(b"X-Pad: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n");
        }
        let err = Response::read(&mut reader(&wire), &Method::GET).await.unwrap_err();
        assert!(matches!(err, MessageError::HeadTooLarge { .. } | MessageError::Malformed(_)));
    }

    #[test]
    fn response_serialization_keeps_reason_and_headers() {
        let mut response = Response::new(StatusCode::SWITCHING_PROTOCOLS);
        response.headers.insert("upgrade", HeaderValue::from_static("websocket"));
        response.headers.insert("connection", HeaderValue::from_static("Upgrade"));
        let out = String::from_utf8(response.to_bytes()).unwrap();
        assert_eq!(
            out,
            "HTTP/1.1 101 Switching Protocols\r\nupgrade: websocket\r\nconnection: Upgrade\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn chunk_size_overflow_is_malformed() {
        let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nabc\r\n0\r\n\r\n";
        let err = Response::read(&mut reader(wire), &Method::GET).await.unwrap_err();
        assert!(matches!(err, MessageError::Malformed(_)), "{err}");
    }

    #[tokio::test]
    async fn declared_length_over_limit_is_rejected_before_reading() {
        let wire = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\nabc", MAX_BODY_LEN + 1);
        let err = Response::read(&mut reader(wire.as_bytes()), &Method::GET)
            .await
            .unwrap_err();
        assert!(matches!(err, MessageError::BodyTooLarge { limit: MAX_BODY_LEN }));

        let wire = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", u64::MAX);
        let err = Request::read(&mut reader(wire.as_bytes())).await.unwrap_err();
        assert!(matches!(err, MessageError::BodyTooLarge { .. }));
    }

    #[tokio::test]
    async fn chunked_body_over_limit_is_rejected() {
        let chunk = vec![b'a'; 64 * 1024];
        let mut wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        for _ in 0..(MAX_BODY_LEN / chunk.len() + 1) {
            wire.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            wire.extend_from_slice(&chunk);
            wire.extend_from_slice(b"\r\n");
        }
        wire.extend_from_slice(b"0\r\n\r\n");
        let err = Response::read(&mut reader(&wire), &Method::GET).await.unwrap_err();
        assert!(matches!(err, MessageError::BodyTooLarge { limit: MAX_BODY_LEN }));
    }

    #[tokio::test]
    async fn bodiless_responses_keep_their_content_length() {
        let wire = b"HTTP/1.1 304 Not Modified\r\ncontent-length: 100\r\n\r\n";
        let response = Response::read(&mut reader(wire), &Method::GET).await.unwrap();
        assert_eq!(response.to_bytes(), wire);

        let wire = b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n";
        let response = Response::read(&mut reader(wire), &Method::HEAD).await.unwrap();
        assert_eq!(response.to_bytes(), wire);
    }

    #[test]
    fn content_length_tracks_rewritten_body() {
        let mut response = Response::new(StatusCode::FORBIDDEN);
        response.headers.insert("content-length", HeaderValue::from_static("99"));
        response.body = Bytes::from_static(b"denied");
        let out = String::from_utf8(response.to_bytes()).unwrap();
        assert!(out.contains("content-length: 6\r\n"));
        assert!(out.ends_with("\r\n\r\ndenied"));
    }
}
