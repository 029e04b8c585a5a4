//! Length-prefixed wire framing.
//!
//! One frame is a 4-byte big-endian unsigned payload length followed by
//! exactly that many bytes of UTF-8 JSON.  The codec moves raw payload
//! bytes only; JSON parsing happens above it.
//!
//! A zero-byte read on the length header is a clean end-of-stream and
//! surfaces as stream exhaustion, not an error.  A partial header or
//! partial payload at EOF is [`FrameError::Truncated`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Largest accepted payload, 32 MiB.  Part of the wire contract, not
/// configurable.
pub const MAX_FRAME_LEN: usize = 32 * 1024 * 1024;

const HEADER_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame length {len} exceeds {MAX_FRAME_LEN}")]
    FrameTooLarge { len: usize },
    #[error("stream ended mid-frame")]
    Truncated,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        FrameCodec
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&src[..HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FrameError::FrameTooLarge { len });
        }
        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }
        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            // Bytes left over that can never complete a frame.
            None if !src.is_empty() => Err(FrameError::Truncated),
            None => Ok(None),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(FrameError::FrameTooLarge { len: payload.len() });
        }
        dst.reserve(HEADER_LEN + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}
