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

//! Scripted client for the `mmo_server` demo
//!
//! Joins the world, says hello, walks a few steps east and logs every frame
//! the server sends back.
//!
//! Run with `cargo run --example frame_client -- [address]`.

use bytes::{Buf, BufMut, BytesMut};
use futures_util::StreamExt;
use gridlink_codec::{Frame, FrameCodec, encode_frame};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{info, warn};

fn describe(frame: &Frame) -> String {
    let mut payload = &frame.payload()[..];
    match frame.type_id() {
        1 | 201 if payload.len() >= 4 => {
            let pid = payload.get_u32_le();
            let what = if frame.type_id() == 1 { "you are" } else { "offline:" };
            format!("{} player {}", what, pid)
        }
        200 if payload.len() >= 8 => {
            let pid = payload.get_u32_le();
            match payload.get_u32_le() {
                1 => format!("player {} says {:?}", pid, String::from_utf8_lossy(payload)),
                kind if payload.len() >= 16 => {
                    let x = payload.get_f32_le();
                    payload.advance(4);
                    let z = payload.get_f32_le();
                    let verb = if kind == 2 { "appeared" } else { "moved" };
                    format!("player {} {} at ({:.1}, {:.1})", pid, verb, x, z)
                }
                kind => format!("player {} broadcast kind {}", pid, kind),
            }
        }
        202 if payload.len() >= 4 => format!("{} players nearby", payload.get_u32_le()),
        _ => frame.to_string(),
    }
}

fn position(x: f32, z: f32) -> BytesMut {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_f32_le(x);
    buf.put_f32_le(0.0);
    buf.put_f32_le(z);
    buf.put_f32_le(90.0);
    buf
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let address: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8999".to_string())
        .parse()?;
    let stream = TcpStream::connect(address).await?;
    info!(%address, "Connected");

    let (reader, mut writer) = stream.into_split();
    let reader = tokio::spawn(async move {
        let mut frames = FramedRead::new(reader, FrameCodec::new());
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => info!("{}", describe(&frame)),
                Err(e) => {
                    warn!(error = %e, "Bad frame from server");
                    break;
                }
            }
        }
        info!("Server closed the connection");
    });

    writer.write_all(&encode_frame(2, b"hello, world")?).await?;
    for step in 0..5 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let x = 160.0 + step as f32 * 20.0;
        writer.write_all(&encode_frame(3, &position(x, 165.0))?).await?;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    writer.shutdown().await?;
    reader.await?;
    Ok(())
}
