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

//! A small MMO world server
//!
//! Players join, receive their id and spawn point, see who is around them,
//! move, and chat. Position updates are only sent to players in the 3x3 block
//! of AOI cells around the mover.
//!
//! Client to server:
//!
//! | Type | Name      | Payload                         |
//! |------|-----------|---------------------------------|
//! | 2    | WorldChat | UTF-8 text                      |
//! | 3    | Move      | `x, y, z, v` as little-endian f32 |
//!
//! Server to client:
//!
//! | Type | Name        | Payload                                             |
//! |------|-------------|-----------------------------------------------------|
//! | 1    | SyncPid     | `pid: u32`                                          |
//! | 200  | Broadcast   | `pid: u32, kind: u32` then text (1) or position (2, 3) |
//! | 201  | Offline     | `pid: u32`                                          |
//! | 202  | SyncPlayers | `count: u32` then `pid: u32` + position per player  |
//!
//! Run with `cargo run --example mmo_server -- [config.json]`.

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use gridlink_aoi::{AoiConfig, AoiManager};
use gridlink_service::{
    Connection, Request, RequestHandler, Server, ServerConfig, ServerHandler,
};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

const MSG_SYNC_PID: u32 = 1;
const MSG_WORLD_CHAT: u32 = 2;
const MSG_MOVE: u32 = 3;
const MSG_BROADCAST: u32 = 200;
const MSG_OFFLINE: u32 = 201;
const MSG_SYNC_PLAYERS: u32 = 202;

const BROADCAST_TALK: u32 = 1;
const BROADCAST_SPAWN: u32 = 2;
const BROADCAST_MOVE: u32 = 3;

const PLAYER_ID_KEY: &str = "playerId";

/// `x`/`z` are the ground plane, `y` is height, `v` is facing in degrees
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
    v: f32,
}

impl Position {
    fn spawn(pid: u32) -> Self {
        Self {
            x: 160.0 + (pid % 10) as f32,
            y: 0.0,
            z: 160.0 + ((pid * 7) % 10) as f32,
            v: 0.0,
        }
    }

    fn decode(mut payload: &[u8]) -> Option<Self> {
        if payload.len() < 16 {
            return None;
        }
        Some(Self {
            x: payload.get_f32_le(),
            y: payload.get_f32_le(),
            z: payload.get_f32_le(),
            v: payload.get_f32_le(),
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
        buf.put_f32_le(self.v);
    }
}

#[derive(Debug)]
struct Player {
    pid: u32,
    connection: Connection,
    position: Mutex<Position>,
}

impl Player {
    fn position(&self) -> Position {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn send(&self, type_id: u32, payload: &Bytes) {
        if let Err(e) = self.connection.send_msg(type_id, payload).await {
            debug!(pid = self.pid, error = %e, "Send to player failed");
        }
    }
}

/// Players indexed by id, plus the AOI grid they live in
#[derive(Debug)]
struct World {
    aoi: AoiManager,
    players: DashMap<u32, Arc<Player>>,
}

impl World {
    fn new(aoi: AoiManager) -> Self {
        Self {
            aoi,
            players: DashMap::new(),
        }
    }

    fn player(&self, pid: u32) -> Option<Arc<Player>> {
        self.players.get(&pid).map(|p| p.value().clone())
    }

    fn player_for(&self, connection: &Connection) -> Option<Arc<Player>> {
        let pid: u64 = connection.get_property_as(PLAYER_ID_KEY).ok()?;
        self.player(u32::try_from(pid).ok()?)
    }

    fn all_players(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|p| p.value().clone()).collect()
    }

    /// Players in the 3x3 cell block around a ground position, including the caller
    fn players_near(&self, position: Position) -> Vec<Arc<Player>> {
        self.aoi
            .occupants_near(position.x, position.z)
            .into_iter()
            .filter_map(|id| self.player(u32::try_from(id).ok()?))
            .collect()
    }

    fn join(&self, player: Arc<Player>) {
        let position = player.position();
        if self
            .aoi
            .add_occupant_at(player.pid.into(), position.x, position.z)
            .is_none()
        {
            warn!(pid = player.pid, "Spawn point is outside the world");
        }
        self.players.insert(player.pid, player);
    }

    fn leave(&self, pid: u32) -> Option<Arc<Player>> {
        let (_, player) = self.players.remove(&pid)?;
        let position = player.position();
        self.aoi.remove_occupant_at(pid.into(), position.x, position.z);
        Some(player)
    }

    /// Store a new position, moving the player between AOI cells when needed
    fn move_player(&self, player: &Player, to: Position) {
        let from = {
            let mut position = player.position.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *position, to)
        };
        self.aoi
            .relocate_occupant(player.pid.into(), (from.x, from.z), (to.x, to.z));
    }
}

fn broadcast_position(pid: u32, kind: u32, position: Position) -> Bytes {
    let mut buf = BytesMut::with_capacity(24);
    buf.put_u32_le(pid);
    buf.put_u32_le(kind);
    position.encode(&mut buf);
    buf.freeze()
}

fn broadcast_talk(pid: u32, content: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + content.len());
    buf.put_u32_le(pid);
    buf.put_u32_le(BROADCAST_TALK);
    buf.put_slice(content.as_bytes());
    buf.freeze()
}

fn sync_players(players: &[Arc<Player>]) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + players.len() * 20);
    buf.put_u32_le(players.len() as u32);
    for player in players {
        buf.put_u32_le(player.pid);
        player.position().encode(&mut buf);
    }
    buf.freeze()
}

/// Lifecycle hooks: join on connect, leave on disconnect
struct WorldHooks {
    world: Arc<World>,
}

#[async_trait]
impl ServerHandler for WorldHooks {
    async fn on_connection_start(&self, conn: &Connection) {
        let pid = conn.id().as_u32();
        let player = Arc::new(Player {
            pid,
            connection: conn.clone(),
            position: Mutex::new(Position::spawn(pid)),
        });
        let position = player.position();

        player
            .send(MSG_SYNC_PID, &Bytes::copy_from_slice(&pid.to_le_bytes()))
            .await;
        player
            .send(MSG_BROADCAST, &broadcast_position(pid, BROADCAST_SPAWN, position))
            .await;

        self.world.join(player.clone());
        conn.set_property(PLAYER_ID_KEY, u64::from(pid));

        // Show the newcomer to everyone around, then everyone around to the newcomer
        let nearby = self.world.players_near(position);
        let spawn = broadcast_position(pid, BROADCAST_SPAWN, position);
        for other in &nearby {
            other.send(MSG_BROADCAST, &spawn).await;
        }
        player.send(MSG_SYNC_PLAYERS, &sync_players(&nearby)).await;

        info!(pid, peer = %conn.peer_addr(), "Player arrived");
    }

    async fn on_connection_stop(&self, conn: &Connection) {
        let Some(player) = self.world.player_for(conn) else {
            return;
        };
        let nearby = self.world.players_near(player.position());
        let offline = Bytes::copy_from_slice(&player.pid.to_le_bytes());
        for other in nearby.iter().filter(|p| p.pid != player.pid) {
            other.send(MSG_OFFLINE, &offline).await;
        }
        self.world.leave(player.pid);
        info!(pid = player.pid, "Player offline");
    }
}

/// Message 2: broadcast a chat line to every player in the world
struct WorldChat {
    world: Arc<World>,
}

#[async_trait]
impl RequestHandler for WorldChat {
    async fn handle(&self, request: &Request) {
        let Some(player) = self.world.player_for(request.connection()) else {
            warn!(connection_id = %request.connection().id(), "Chat from unknown player");
            return;
        };
        let Ok(content) = std::str::from_utf8(request.payload()) else {
            warn!(pid = player.pid, "Chat message is not valid UTF-8");
            return;
        };

        let message = broadcast_talk(player.pid, content);
        for other in self.world.all_players() {
            other.send(MSG_BROADCAST, &message).await;
        }
    }
}

/// Message 3: update a player's position and tell the players around them
struct Move {
    world: Arc<World>,
}

#[async_trait]
impl RequestHandler for Move {
    async fn handle(&self, request: &Request) {
        let Some(player) = self.world.player_for(request.connection()) else {
            warn!(connection_id = %request.connection().id(), "Move from unknown player");
            return;
        };
        let Some(position) = Position::decode(request.payload()) else {
            warn!(pid = player.pid, len = request.payload().len(), "Malformed move");
            return;
        };
        debug!(pid = player.pid, ?position, "Player moved");

        self.world.move_player(&player, position);
        let update = broadcast_position(player.pid, BROADCAST_MOVE, position);
        for other in self.world.players_near(position) {
            other.send(MSG_BROADCAST, &update).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };
    let world = Arc::new(World::new(AoiManager::new(AoiConfig::default())?));

    let mut server = Server::bind(config).await?;
    server.add_router(
        MSG_WORLD_CHAT,
        WorldChat {
            world: world.clone(),
        },
    )?;
    server.add_router(
        MSG_MOVE,
        Move {
            world: world.clone(),
        },
    )?;
    server.start(Arc::new(WorldHooks { world }))?;
    info!(address = %server.bind_address(), "MMO world is up");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.shutdown().await?;
    Ok(())
}
