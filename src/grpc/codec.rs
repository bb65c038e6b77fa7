//! gRPC length-prefixed message framing.
//!
//! Wire format of one message:
//! - 1 byte: compression flag (only `0` is supported)
//! - 4 bytes: message length, big-endian
//! - N bytes: message payload

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Flag byte plus length.
pub const GRPC_PREFIX_LENGTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrpcCodecError {
    #[error("unable to read compressed gRPC response message (flag {0:#04x})")]
    CompressionUnsupported(u8),

    #[error("gRPC message of {0} bytes does not fit a 32-bit length prefix")]
    MessageTooLarge(usize),

    #[error("gRPC message of {length} bytes exceeds the {limit} byte limit")]
    MessageLengthExceeded { length: usize, limit: usize },
}

/// Frame one message.
pub fn encode_message(message: &[u8]) -> Result<Bytes, GrpcCodecError> {
    let length = u32::try_from(message.len())
        .map_err(|_| GrpcCodecError::MessageTooLarge(message.len()))?;
    let mut frame = BytesMut::with_capacity(GRPC_PREFIX_LENGTH + message.len());
    frame.put_u8(0);
    frame.put_u32(length);
    frame.put_slice(message);
    Ok(frame.freeze())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    ExpectingCompressionFlag,
    ExpectingMessageLength,
    ExpectingMessage(u32),
}

/// Incremental decoder for one direction of one stream.
///
/// Frames may be split at any byte, and several may arrive in one chunk.
#[derive(Debug)]
pub struct GrpcMessageDecoder {
    buffer: BytesMut,
    state: DecodeState,
    max_message_len: Option<usize>,
}

impl GrpcMessageDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            state: DecodeState::ExpectingCompressionFlag,
            max_message_len: None,
        }
    }

    /// Reject any frame whose length prefix is above `limit` before buffering it.
    pub fn with_max_message_len(limit: Option<usize>) -> Self {
        Self {
            max_message_len: limit,
            ..Self::new()
        }
    }

    /// Feed a chunk and emit every complete message through `on_message`.
    ///
    /// A message's end-of-stream flag is set only when `end_stream` is set
    /// and nothing is left buffered after it. Returns the number of messages
    /// emitted. On a non-zero compression flag or an oversized length prefix
    /// the buffer is discarded and the decoder starts over with the next chunk.
    pub fn decode<F>(
        &mut self,
        chunk: &[u8],
        end_stream: bool,
        mut on_message: F,
    ) -> Result<usize, GrpcCodecError>
    where
        F: FnMut(Bytes, bool),
    {
        self.buffer.extend_from_slice(chunk);
        let mut emitted = 0;

        loop {
            match self.state {
                DecodeState::ExpectingCompressionFlag => {
                    let Some(&flag) = self.buffer.first() else {
                        break;
                    };
                    if flag != 0 {
                        self.reset();
                        return Err(GrpcCodecError::CompressionUnsupported(flag));
                    }
                    self.buffer.advance(1);
                    self.state = DecodeState::ExpectingMessageLength;
                }
                DecodeState::ExpectingMessageLength => {
                    if self.buffer.len() < 4 {
                        break;
                    }
                    let length = self.buffer.get_u32();
                    if let Some(limit) = self.max_message_len {
                        if length as usize > limit {
                            self.reset();
                            return Err(GrpcCodecError::MessageLengthExceeded {
                                length: length as usize,
                                limit,
                            });
                        }
                    }
                    self.state = DecodeState::ExpectingMessage(length);
                }
                DecodeState::ExpectingMessage(length) => {
                    let length = length as usize;
                    if self.buffer.len() < length {
                        break;
                    }
                    let message = self.buffer.split_to(length).freeze();
                    self.state = DecodeState::ExpectingCompressionFlag;
                    emitted += 1;
                    on_message(message, end_stream && self.buffer.is_empty());
                }
            }
        }

        if end_stream && !self.is_idle() {
            tracing::debug!(
                buffered = self.buffer.len(),
                "gRPC stream ended inside a message frame"
            );
        }
        Ok(emitted)
    }

    /// Bytes waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// True between frames with nothing buffered.
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty() && self.state == DecodeState::ExpectingCompressionFlag
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecodeState::ExpectingCompressionFlag;
    }
}

impl Default for GrpcMessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}
