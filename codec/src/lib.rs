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

//! # Gridlink Frame Codec
//!
//! Length-prefixed binary framing for Tokio streams. Every message on the wire
//! is a fixed 8 byte header followed by an opaque payload:
//!
//! ```text
//! +----------------+----------------+------------------------+
//! | length: u32 LE | type_id: u32 LE| payload: `length` bytes |
//! +----------------+----------------+------------------------+
//! ```
//!
//! There is no checksum, version byte or compression. A stream that produces a
//! bad header is unrecoverable; the codec makes no attempt to resynchronize.
//!
//! ## Core Components
//!
//! - [`Frame`]: a decoded record (`type_id` + payload)
//! - [`FrameCodec`]: implements [`Decoder`](tokio_util::codec::Decoder) and
//!   [`Encoder`](tokio_util::codec::Encoder) so it can drive a `FramedRead` /
//!   `FramedWrite` directly
//! - [`encode_frame`]: one-shot encoding into a [`Bytes`](bytes::Bytes) buffer
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use gridlink_codec::FrameCodec;
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//!
//! # async fn example(stream: TcpStream) -> Result<(), gridlink_codec::CodecError> {
//! let codec = FrameCodec::new().with_max_payload_size(Some(4096));
//! let mut frames = FramedRead::new(stream, codec);
//! while let Some(frame) = frames.next().await {
//!     let frame = frame?;
//!     println!("type {} carried {} bytes", frame.type_id(), frame.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod codec;
mod frame;
mod result;

pub use self::codec::{FrameCodec, encode_frame};
pub use self::frame::{Frame, FrameHeader, HEADER_LEN};
pub use self::result::{CodecError, CodecResult};
