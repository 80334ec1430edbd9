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

//! Benchmarks for server operations

use async_trait::async_trait;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures_util::StreamExt;
use gridlink_codec::{FrameCodec, encode_frame};
use gridlink_service::{
    CallbackHandler, PropertyValue, Request, RequestHandler, Server, ServerConfig,
};
use std::hint::black_box;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::codec::FramedRead;

struct Echo;

#[async_trait]
impl RequestHandler for Echo {
    async fn handle(&self, request: &Request) {
        let _ = request
            .connection()
            .send_msg(request.type_id(), request.payload())
            .await;
    }
}

fn bench_config_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_creation");

    group.bench_function("server_config_default", |b| {
        b.iter(|| black_box(ServerConfig::default()))
    });

    group.bench_function("server_config_builder", |b| {
        b.iter(|| {
            black_box(
                ServerConfig::default()
                    .with_max_connections(5000)
                    .with_worker_pool_size(16)
                    .with_max_frame_size(8192),
            )
        })
    });

    group.bench_function("server_config_json", |b| {
        b.iter(|| {
            ServerConfig::from_json_str(black_box(
                r#"{"name":"bench","max_connections":5000,"worker_pool_size":16}"#,
            ))
        })
    });

    group.finish();
}

fn bench_property_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("property_values");

    group.bench_function("from_u64", |b| {
        b.iter(|| PropertyValue::from(black_box(42u64)))
    });

    group.bench_function("try_into_u64", |b| {
        let value = PropertyValue::UInt(42);
        b.iter(|| u64::try_from(black_box(value.clone())))
    });

    group.bench_function("from_str", |b| {
        b.iter(|| PropertyValue::from(black_box("player-1")))
    });

    group.finish();
}

fn bench_echo_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (server, stream) = rt.block_on(async {
        let mut server = Server::bind(ServerConfig::new("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();
        server.add_router(1, Echo).unwrap();
        server.start(Arc::new(CallbackHandler::default())).unwrap();
        let stream = TcpStream::connect(server.bind_address()).await.unwrap();
        (server, stream)
    });
    let (reader, writer) = stream.into_split();
    let reader = tokio::sync::Mutex::new(FramedRead::new(reader, FrameCodec::new()));
    let writer = tokio::sync::Mutex::new(writer);

    let mut group = c.benchmark_group("echo");
    for size in [16usize, 1024] {
        let frame = encode_frame(1, &vec![0xAB; size]).unwrap();
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_function(format!("round_trip_{}", size), |b| {
            b.to_async(&rt).iter(|| async {
                writer.lock().await.write_all(&frame).await.unwrap();
                black_box(reader.lock().await.next().await.unwrap().unwrap())
            })
        });
    }
    group.finish();

    rt.block_on(server.shutdown()).unwrap();
}

fn bench_broadcast(c: &mut Criterion) {
    const CLIENTS: usize = 32;

    let rt = Runtime::new().unwrap();
    let (server, clients) = rt.block_on(async {
        let server = Server::bind(ServerConfig::new("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();
        server.start(Arc::new(CallbackHandler::default())).unwrap();
        let mut clients = Vec::new();
        for _ in 0..CLIENTS {
            let stream = TcpStream::connect(server.bind_address()).await.unwrap();
            clients.push(FramedRead::new(stream, FrameCodec::new()));
        }
        while server.connection_count() < CLIENTS {
            tokio::task::yield_now().await;
        }
        (server, clients)
    });
    let clients = tokio::sync::Mutex::new(clients);
    let connections = server.connection_manager();

    let mut group = c.benchmark_group("broadcast");
    group.throughput(Throughput::Elements(CLIENTS as u64));
    group.bench_function("broadcast_32", |b| {
        b.to_async(&rt).iter(|| async {
            let result = connections.broadcast(200, b"position").await.unwrap();
            // Drain so the outbound channels never fill up
            for client in clients.lock().await.iter_mut() {
                client.next().await.unwrap().unwrap();
            }
            black_box(result)
        })
    });
    group.finish();

    rt.block_on(server.shutdown()).unwrap();
}

criterion_group!(
    benches,
    bench_config_creation,
    bench_property_values,
    bench_echo_round_trip,
    bench_broadcast
);
criterion_main!(benches);
