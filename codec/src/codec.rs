//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::{CodecError, CodecResult, Frame, FrameHeader, HEADER_LEN};
use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Where the decoder is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Waiting for the 8 byte header
    Header,
    /// Header accepted, waiting for `length` payload bytes
    Payload(FrameHeader),
}

/// Length-prefixed frame codec
///
/// Wire layout is `length (u32 LE) ∥ type_id (u32 LE) ∥ payload`. Decoding is a
/// two pass process: the header is validated as soon as its 8 bytes are buffered,
/// then the payload is collected. A header announcing more than
/// [`max_payload_size`](FrameCodec::max_payload_size) bytes fails immediately,
/// before any of the payload is buffered.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use gridlink_codec::{Frame, FrameCodec};
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = FrameCodec::new().with_max_payload_size(Some(4096));
/// let mut buffer = BytesMut::new();
/// codec.encode(Frame::new(1, &b"ping"[..]), &mut buffer).unwrap();
///
/// let frame = codec.decode(&mut buffer).unwrap().unwrap();
/// assert_eq!(frame.type_id(), 1);
/// assert_eq!(frame.payload().as_ref(), b"ping");
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload_size: Option<u32>,
    decoder_state: DecoderState,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Create a codec without a payload size limit
    pub fn new() -> Self {
        Self {
            max_payload_size: None,
            decoder_state: DecoderState::Header,
        }
    }

    /// Set the maximum accepted payload size
    ///
    /// `None` and `Some(0)` both disable the limit.
    pub fn with_max_payload_size(mut self, max: Option<u32>) -> Self {
        self.max_payload_size = max.filter(|max| *max > 0);
        self
    }

    /// The maximum accepted payload size, if any
    pub fn max_payload_size(&self) -> Option<u32> {
        self.max_payload_size
    }

    /// Decode and validate a fixed-size header
    ///
    /// Only the first [`HEADER_LEN`] bytes of `src` are inspected.
    pub fn decode_header(&self, src: &[u8]) -> CodecResult<FrameHeader> {
        if src.len() < HEADER_LEN {
            return Err(CodecError::IncompleteHeader {
                available: src.len(),
            });
        }

        let header = FrameHeader {
            length: LittleEndian::read_u32(&src[0..4]),
            type_id: LittleEndian::read_u32(&src[4..8]),
        };

        match self.max_payload_size {
            Some(max) if header.length > max => {
                warn!(
                    length = header.length,
                    max,
                    type_id = header.type_id,
                    "Rejecting oversize frame header"
                );
                Err(CodecError::PayloadTooLarge {
                    length: header.length,
                    max,
                })
            }
            _ => Ok(header),
        }
    }
}

/// Encode a single frame into a freshly allocated buffer
///
/// ```
/// let bytes = gridlink_codec::encode_frame(7, b"efgh").unwrap();
/// assert_eq!(&bytes[..], &[4, 0, 0, 0, 7, 0, 0, 0, b'e', b'f', b'g', b'h']);
/// ```
pub fn encode_frame(type_id: u32, payload: &[u8]) -> CodecResult<Bytes> {
    let mut dst = BytesMut::with_capacity(HEADER_LEN + payload.len());
    put_frame(type_id, payload, &mut dst)?;
    Ok(dst.freeze())
}

fn put_frame(type_id: u32, payload: &[u8], dst: &mut BytesMut) -> CodecResult<()> {
    let length = u32::try_from(payload.len()).map_err(|_| CodecError::PayloadOverflow {
        length: payload.len(),
    })?;

    let mut header = [0u8; HEADER_LEN];
    LittleEndian::write_u32(&mut header[0..4], length);
    LittleEndian::write_u32(&mut header[4..8], type_id);

    dst.reserve(HEADER_LEN + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        loop {
            match self.decoder_state {
                DecoderState::Header => {
                    if src.len() < HEADER_LEN {
                        src.reserve(HEADER_LEN - src.len());
                        return Ok(None);
                    }
                    let header = self.decode_header(&src[..HEADER_LEN])?;
                    src.advance(HEADER_LEN);
                    trace!(
                        length = header.length,
                        type_id = header.type_id,
                        "Decoded frame header"
                    );

                    // Zero length frames are complete without a second pass.
                    if header.length == 0 {
                        return Ok(Some(Frame::empty(header.type_id)));
                    }
                    self.decoder_state = DecoderState::Payload(header);
                }
                DecoderState::Payload(header) => {
                    let length = header.length as usize;
                    if src.len() < length {
                        src.reserve(length - src.len());
                        return Ok(None);
                    }
                    let payload = src.split_to(length).freeze();
                    self.decoder_state = DecoderState::Header;
                    return Ok(Some(Frame::new(header.type_id, payload)));
                }
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_frame(item.type_id(), item.payload(), dst)
    }
}

impl Encoder<&Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_frame(item.type_id(), item.payload(), dst)
    }
}
