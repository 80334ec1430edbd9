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

//! Error types for the AOI grid

use thiserror::Error;

/// Result type for AOI operations
pub type AoiResult<T> = std::result::Result<T, AoiError>;

/// AOI configuration errors
///
/// Runtime lookups never fail; only building a grid from a bad configuration does.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AoiError {
    /// One of the axes has no cells
    #[error("Grid must have at least one cell per axis (count_x = {count_x}, count_y = {count_y})")]
    EmptyGrid {
        /// Cells along x
        count_x: usize,
        /// Cells along y
        count_y: usize,
    },

    /// Axis bounds are not finite or not increasing
    #[error("Invalid {axis} bounds: min {min} must be finite and below max {max}")]
    InvalidBounds {
        /// Axis name
        axis: &'static str,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },
}
