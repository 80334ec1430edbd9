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

//! Benchmarks for the frame codec

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gridlink_codec::{FrameCodec, encode_frame};
use std::hint::black_box;
use tokio_util::codec::Decoder;

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for size in [0usize, 64, 1024, 4096] {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| encode_frame(black_box(42), black_box(payload)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_stream");
    for count in [1usize, 16, 256] {
        let mut wire = BytesMut::new();
        for i in 0..count {
            wire.extend_from_slice(&encode_frame(i as u32, &[0u8; 128]).unwrap());
        }
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &wire, |b, wire| {
            b.iter(|| {
                let mut codec = FrameCodec::new().with_max_payload_size(Some(4096));
                let mut buffer = wire.clone();
                let mut decoded = 0;
                while let Some(frame) = codec.decode(&mut buffer).unwrap() {
                    black_box(frame);
                    decoded += 1;
                }
                decoded
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_stream);
criterion_main!(benches);
