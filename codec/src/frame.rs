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

use bytes::Bytes;
use std::fmt;

/// Size in bytes of the fixed frame header (`length: u32` + `type_id: u32`)
pub const HEADER_LEN: usize = 8;

/// Decoded fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Number of payload bytes following the header
    pub length: u32,
    /// Application defined message type
    pub type_id: u32,
}

/// One length-prefixed record of the wire protocol
///
/// The length field is not stored; it is always derived from the payload so a
/// `Frame` can never disagree with its own header.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    type_id: u32,
    payload: Bytes,
}

impl Frame {
    /// Create a frame from a type id and a payload
    pub fn new(type_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            payload: payload.into(),
        }
    }

    /// Create a frame with an empty payload
    pub fn empty(type_id: u32) -> Self {
        Self::new(type_id, Bytes::new())
    }

    /// Message type of this frame
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Payload bytes of this frame
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Split the frame into its type id and payload
    pub fn into_parts(self) -> (u32, Bytes) {
        (self.type_id, self.payload)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("type_id", &self.type_id)
            .field("length", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame(type={}, len={})", self.type_id, self.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let frame = Frame::new(7, &b"efgh"[..]);
        assert_eq!(frame.type_id(), 7);
        assert_eq!(frame.len(), 4);
        assert!(!frame.is_empty());
        assert_eq!(frame.payload().as_ref(), b"efgh");
        assert_eq!(frame.to_string(), "frame(type=7, len=4)");
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::empty(3);
        assert!(frame.is_empty());
        let (type_id, payload) = frame.into_parts();
        assert_eq!(type_id, 3);
        assert!(payload.is_empty());
    }
}
