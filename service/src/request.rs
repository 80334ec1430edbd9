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

//! A decoded frame paired with the connection it arrived on

use crate::Connection;
use bytes::Bytes;
use gridlink_codec::Frame;

/// An inbound request
#[derive(Debug, Clone)]
pub struct Request {
    connection: Connection,
    frame: Frame,
}

impl Request {
    /// Pair a frame with its originating connection
    pub fn new(connection: Connection, frame: Frame) -> Self {
        Self { connection, frame }
    }

    /// The connection the frame arrived on
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Message type of the frame
    pub fn type_id(&self) -> u32 {
        self.frame.type_id()
    }

    /// Frame payload
    pub fn payload(&self) -> &Bytes {
        self.frame.payload()
    }

    /// The decoded frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}
