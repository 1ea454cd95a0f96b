//! Varint-framed message coding.
//!
//! Every message on the wire is a single frame: an unsigned LEB128 varint
//! length (32-bit domain) followed by exactly that many bytes of serialized
//! payload. Decoding is a match-condition predicate over the front of a
//! growable buffer, safe to re-run as more bytes arrive.

use std::any::Any;

use bytes::BytesMut;

use crate::error::RpcError;

/// Longest legal encoding of the 32-bit varint length prefix.
const MAX_LEN_PREFIX: usize = 5;

/// Object-safe view of an IDL message, as the runtime needs it.
///
/// Blanket-implemented for every prost message that also declares its
/// required fields through [`Initialized`], so payload types plug in with a
/// one-line impl.
pub trait RpcMessage: Send + Sync + 'static {
    /// Reset every field to its default.
    fn clear(&mut self);

    /// Merge one serialized payload into `self`, tolerating unknown
    /// fields. Required-field validation is deferred to
    /// [`is_initialized`](RpcMessage::is_initialized).
    fn merge(&mut self, buf: &[u8]) -> Result<(), RpcError>;

    /// Serialized payload size in bytes.
    fn encoded_len(&self) -> usize;

    /// Append the serialized payload (no length prefix) to `buf`.
    fn encode_raw(&self, buf: &mut BytesMut);

    /// Whether every required field is present.
    fn is_initialized(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Required-field validation for a message type.
///
/// The default impl declares every field optional; types with required
/// fields override it.
pub trait Initialized {
    fn is_initialized(&self) -> bool {
        true
    }
}

impl<M> RpcMessage for M
where
    M: prost::Message + Initialized + Default + 'static,
{
    #[inline]
    fn clear(&mut self) {
        prost::Message::clear(self);
    }

    #[inline]
    fn merge(&mut self, buf: &[u8]) -> Result<(), RpcError> {
        Ok(prost::Message::merge(self, buf)?)
    }

    #[inline]
    fn encoded_len(&self) -> usize {
        prost::Message::encoded_len(self)
    }

    #[inline]
    fn encode_raw(&self, buf: &mut BytesMut) {
        prost::Message::encode_raw(self, buf);
    }

    #[inline]
    fn is_initialized(&self) -> bool {
        Initialized::is_initialized(self)
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Result of one attempt to decode a frame from the front of a buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeStatus {
    /// Not enough bytes for a whole frame; nothing was consumed.
    Incomplete,
    /// One frame parsed; exactly this many bytes were consumed.
    Complete(usize),
}

/// Frame one message into `out`: varint length prefix, then payload.
pub fn encode(msg: &dyn RpcMessage, out: &mut BytesMut) {
    let len = msg.encoded_len();
    out.reserve(MAX_LEN_PREFIX + len);
    prost::encoding::encode_varint(len as u64, out);
    msg.encode_raw(out);
}

/// Match-condition predicate over the front of `buf`.
///
/// Repeatable as the buffer grows: an `Incomplete` attempt neither consumes
/// bytes nor leaves a partial parse behind in `msg`. A complete frame is
/// parsed into a cleared `msg`.
pub fn try_decode(buf: &[u8], msg: &mut dyn RpcMessage) -> Result<DecodeStatus, RpcError> {
    let (payload_len, prefix_len) = match try_decode_len(buf)? {
        None => return Ok(DecodeStatus::Incomplete),
        Some(v) => v,
    };
    if buf.len() - prefix_len < payload_len {
        return Ok(DecodeStatus::Incomplete);
    }
    msg.clear();
    msg.merge(&buf[prefix_len..prefix_len + payload_len])?;
    Ok(DecodeStatus::Complete(prefix_len + payload_len))
}

/// Parse the varint32 length prefix at the front of `buf`.
///
/// `Ok(None)` means the prefix itself is still incomplete. A prefix longer
/// than [`MAX_LEN_PREFIX`] bytes, or one exceeding the 32-bit domain, is
/// framing corruption.
fn try_decode_len(buf: &[u8]) -> Result<Option<(usize, usize)>, RpcError> {
    let mut value: u64 = 0;
    for (i, b) in buf.iter().copied().take(MAX_LEN_PREFIX).enumerate() {
        value |= u64::from(b & 0x7f) << (7 * i);
        if b & 0x80 == 0 {
            if value > u64::from(u32::MAX) {
                return Err(RpcError::Decode("length prefix exceeds 32 bits".to_string()));
            }
            return Ok(Some((value as usize, i + 1)));
        }
    }
    if buf.len() >= MAX_LEN_PREFIX {
        return Err(RpcError::Decode("malformed length prefix".to_string()));
    }
    Ok(None)
}
