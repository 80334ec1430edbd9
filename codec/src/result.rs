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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while framing or unframing messages.
///
/// Every decode error is fatal to the stream it came from. The codec never tries to
/// resynchronize after a bad header, so callers should drop the connection.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer than [`HEADER_LEN`](crate::HEADER_LEN) bytes were supplied to a header decode.
    #[error("Incomplete frame header: {available} of 8 bytes available")]
    IncompleteHeader {
        /// Number of bytes that were available
        available: usize,
    },

    /// The header announced a payload larger than the configured maximum.
    #[error("Frame payload of {length} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge {
        /// Payload length announced by the header
        length: u32,
        /// Configured maximum payload length
        max: u32,
    },

    /// A payload handed to the encoder does not fit in the 32-bit length field.
    #[error("Frame payload of {length} bytes does not fit in a u32 length field")]
    PayloadOverflow {
        /// Actual payload length
        length: usize,
    },
}

impl CodecError {
    /// Check whether the error came from the transport rather than the frame contents
    pub fn is_io(&self) -> bool {
        matches!(self, CodecError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::PayloadTooLarge {
            length: 5000,
            max: 4096,
        };
        assert_eq!(
            err.to_string(),
            "Frame payload of 5000 bytes exceeds maximum of 4096 bytes"
        );

        let err = CodecError::IncompleteHeader { available: 3 };
        assert_eq!(
            err.to_string(),
            "Incomplete frame header: 3 of 8 bytes available"
        );
    }

    #[test]
    fn test_io_classification() {
        let err = CodecError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(err.is_io());
        assert!(!CodecError::PayloadOverflow { length: 0 }.is_io());
    }
}
