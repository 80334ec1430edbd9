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

//! # Gridlink AOI
//!
//! An area-of-interest grid used to answer "which entities are near this point"
//! so that position and chat updates only go to nearby participants.
//!
//! The world rectangle is divided into `count_x × count_y` cells numbered
//! row-major. A query for a position covers the cell containing it plus its
//! eight neighbours, clipped at the edges of the world:
//!
//! ```text
//!      col 0   col 1   col 2
//!    +-------+-------+-------+
//!    |   0   |   1   |   2   |   row 0
//!    +-------+-------+-------+
//!    |   3   |  [4]  |   5   |   row 1     neighbors_of(4) = all nine
//!    +-------+-------+-------+
//!    |   6   |   7   |   8   |   row 2     neighbors_of(0) = {0, 1, 3, 4}
//!    +-------+-------+-------+
//! ```
//!
//! Each cell guards its own occupant set, so the grid can be shared across tasks
//! behind an `Arc` without an outer lock.

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod config;
mod error;
mod grid;
mod manager;

pub use config::AoiConfig;
pub use error::{AoiError, AoiResult};
pub use grid::{Cell, CellId, OccupantId};
pub use manager::AoiManager;
