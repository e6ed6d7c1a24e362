// src/core/protocol/resp_frame.rs

//! The RESP frames exchanged with cache nodes, and a `tokio_util` codec for them.
//!
//! Only the client side is needed here: commands go out as arrays of bulk strings,
//! replies of any frame type come back.

use crate::core::ClusterJoinError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const CRLF: &[u8] = b"\r\n";

// Replies from cache nodes are small; anything larger is a protocol error.
const MAX_REPLY_ELEMENTS: usize = 64 * 1024;
const MAX_BULK_LEN: usize = 64 * 1024 * 1024;
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// Builds a command frame from its words, e.g. `["CLUSTER", "MEET", ip, port]`.
    pub fn command<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RespFrame::Array(
            words
                .into_iter()
                .map(|w| RespFrame::BulkString(Bytes::from(w.into())))
                .collect(),
        )
    }

    /// Returns the text of a simple or bulk string reply.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RespFrame::SimpleString(s) => Some(s.clone()),
            RespFrame::BulkString(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }
}

/// Why a buffer could not be turned into a frame.
enum Parse {
    Incomplete,
    Invalid(String),
}

type ParseResult<T> = Result<T, Parse>;

#[derive(Debug, Default)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = ClusterJoinError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RespFrame::SimpleString(s) => put_line(dst, b'+', s.as_bytes()),
            RespFrame::Error(s) => put_line(dst, b'-', s.as_bytes()),
            RespFrame::Integer(i) => put_line(dst, b':', i.to_string().as_bytes()),
            RespFrame::BulkString(b) => {
                put_line(dst, b'$', b.len().to_string().as_bytes());
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => dst.extend_from_slice(b"$-1\r\n"),
            RespFrame::Array(items) => {
                put_line(dst, b'*', items.len().to_string().as_bytes());
                for item in items {
                    self.encode(item, dst)?;
                }
            }
        }
        Ok(())
    }
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = ClusterJoinError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let mut pos = 0;
        match parse_frame(src, &mut pos, 0) {
            Ok(frame) => {
                src.advance(pos);
                Ok(Some(frame))
            }
            Err(Parse::Incomplete) => Ok(None),
            Err(Parse::Invalid(reason)) => Err(ClusterJoinError::CacheCluster(format!(
                "malformed reply from cache node: {reason}"
            ))),
        }
    }
}

fn put_line(dst: &mut BytesMut, prefix: u8, body: &[u8]) {
    dst.extend_from_slice(&[prefix]);
    dst.extend_from_slice(body);
    dst.extend_from_slice(CRLF);
}

/// Reads the line starting at `*pos` (without its CRLF) and moves past it.
fn read_line<'a>(buf: &'a [u8], pos: &mut usize) -> ParseResult<&'a [u8]> {
    let rest = &buf[*pos..];
    let end = rest
        .windows(CRLF.len())
        .position(|w| w == CRLF)
        .ok_or(Parse::Incomplete)?;
    *pos += end + CRLF.len();
    Ok(&rest[..end])
}

fn read_int(buf: &[u8], pos: &mut usize) -> ParseResult<i64> {
    let line = read_line(buf, pos)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Parse::Invalid(format!("bad integer {:?}", String::from_utf8_lossy(line))))
}

fn parse_frame(buf: &[u8], pos: &mut usize, depth: usize) -> ParseResult<RespFrame> {
    if depth > MAX_DEPTH {
        return Err(Parse::Invalid("nesting too deep".to_string()));
    }
    let Some(&prefix) = buf.get(*pos) else {
        return Err(Parse::Incomplete);
    };
    *pos += 1;

    match prefix {
        b'+' => Ok(RespFrame::SimpleString(
            String::from_utf8_lossy(read_line(buf, pos)?).into_owned(),
        )),
        b'-' => Ok(RespFrame::Error(
            String::from_utf8_lossy(read_line(buf, pos)?).into_owned(),
        )),
        b':' => Ok(RespFrame::Integer(read_int(buf, pos)?)),
        b'$' => {
            let len = read_int(buf, pos)?;
            if len < 0 {
                return Ok(RespFrame::Null);
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(Parse::Invalid(format!("bulk string of {len} bytes")));
            }
            if buf.len() < *pos + len + CRLF.len() {
                return Err(Parse::Incomplete);
            }
            if &buf[*pos + len..*pos + len + CRLF.len()] != CRLF {
                return Err(Parse::Invalid("bulk string not terminated".to_string()));
            }
            let data = Bytes::copy_from_slice(&buf[*pos..*pos + len]);
            *pos += len + CRLF.len();
            Ok(RespFrame::BulkString(data))
        }
        b'*' => {
            let len = read_int(buf, pos)?;
            if len < 0 {
                return Ok(RespFrame::Null);
            }
            let len = len as usize;
            if len > MAX_REPLY_ELEMENTS {
                return Err(Parse::Invalid(format!("array of {len} elements")));
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(parse_frame(buf, pos, depth + 1)?);
            }
            Ok(RespFrame::Array(items))
        }
        other => Err(Parse::Invalid(format!("unknown type byte {other:#04x}"))),
    }
}
