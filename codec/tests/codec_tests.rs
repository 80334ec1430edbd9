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

//! Stream-level tests for the frame codec

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use gridlink_codec::{CodecError, Frame, FrameCodec, HEADER_LEN, encode_frame};
use proptest::prelude::*;
use tokio::io::{AsyncWriteExt, duplex};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite};

#[tokio::test]
async fn test_coalesced_frames_decode_independently() {
    // Two frames glued together and delivered in a single read.
    let mut wire = encode_frame(0, b"abcd").unwrap().to_vec();
    wire.extend_from_slice(&encode_frame(7, b"efgh").unwrap());

    let mut frames = FramedRead::new(&wire[..], FrameCodec::new());

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first.type_id(), 0);
    assert_eq!(first.payload().as_ref(), b"abcd");

    let second = frames.next().await.unwrap().unwrap();
    assert_eq!(second.type_id(), 7);
    assert_eq!(second.payload().as_ref(), b"efgh");

    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn test_frames_split_across_many_reads() {
    let (mut writer, reader) = duplex(64);
    let mut frames = FramedRead::new(reader, FrameCodec::new());

    let mut wire = encode_frame(3, b"hello, gridlink").unwrap().to_vec();
    wire.extend_from_slice(&encode_frame(4, b"").unwrap());
    wire.extend_from_slice(&encode_frame(5, b"tail").unwrap());

    let feeder = tokio::spawn(async move {
        for byte in wire {
            writer.write_all(&[byte]).await.unwrap();
            tokio::task::yield_now().await;
        }
    });

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(frames.next().await.unwrap().unwrap());
    }
    feeder.await.unwrap();

    assert_eq!(received[0], Frame::new(3, &b"hello, gridlink"[..]));
    assert_eq!(received[1], Frame::empty(4));
    assert_eq!(received[2], Frame::new(5, &b"tail"[..]));
}

#[tokio::test]
async fn test_oversize_frame_ends_stream_with_error() {
    let wire = encode_frame(1, &[0u8; 64]).unwrap();
    let codec = FrameCodec::new().with_max_payload_size(Some(32));
    let mut frames = FramedRead::new(&wire[..], codec);

    match frames.next().await {
        Some(Err(CodecError::PayloadTooLarge { length, max })) => {
            assert_eq!(length, 64);
            assert_eq!(max, 32);
        }
        other => panic!("expected PayloadTooLarge, got {:?}", other),
    }
}

#[tokio::test]
async fn test_truncated_stream_is_an_error() {
    let wire = encode_frame(1, b"abcdef").unwrap();
    let mut frames = FramedRead::new(&wire[..HEADER_LEN + 3], FrameCodec::new());
    assert!(matches!(frames.next().await, Some(Err(CodecError::Io(_)))));
}

#[tokio::test]
async fn test_framed_write_produces_wire_format() {
    let mut out = Vec::new();
    {
        let mut sink = FramedWrite::new(&mut out, FrameCodec::new());
        sink.send(Frame::new(9, &b"zinc"[..])).await.unwrap();
    }
    assert_eq!(out, encode_frame(9, b"zinc").unwrap().to_vec());
}

proptest! {
    #[test]
    fn prop_round_trip_within_limit(
        type_id in any::<u32>(),
        payload in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let mut codec = FrameCodec::new().with_max_payload_size(Some(4096));
        let mut buffer = BytesMut::from(&encode_frame(type_id, &payload).unwrap()[..]);
        let frame = codec.decode(&mut buffer).unwrap().unwrap();
        prop_assert_eq!(frame.type_id(), type_id);
        prop_assert_eq!(frame.payload().as_ref(), &payload[..]);
        prop_assert!(buffer.is_empty());
    }

    #[test]
    fn prop_oversize_header_never_panics(length in 4097u32.., type_id in any::<u32>()) {
        let mut header = length.to_le_bytes().to_vec();
        header.extend_from_slice(&type_id.to_le_bytes());
        let codec = FrameCodec::new().with_max_payload_size(Some(4096));
        let is_too_large = matches!(
            codec.decode_header(&header),
            Err(CodecError::PayloadTooLarge { .. })
        );
        prop_assert!(is_too_large);
    }
}
