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

//! World bounds and grid resolution

use crate::{AoiError, AoiResult};
use serde::Deserialize;

/// AOI grid configuration
///
/// Describes the world rectangle `[min_x, max_x] × [min_y, max_y]` and how many
/// cells it is divided into along each axis. Fixed for the lifetime of an
/// [`AoiManager`](crate::AoiManager).
///
/// # Example
///
/// ```
/// use gridlink_aoi::AoiConfig;
///
/// let config = AoiConfig::new()
///     .with_x_axis(0.0, 250.0, 5)
///     .with_y_axis(0.0, 250.0, 5);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.cell_width(), 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    /// Left edge of the world
    pub min_x: f32,
    /// Right edge of the world
    pub max_x: f32,
    /// Number of cells along the x axis
    pub count_x: usize,
    /// Top edge of the world
    pub min_y: f32,
    /// Bottom edge of the world
    pub max_y: f32,
    /// Number of cells along the y axis
    pub count_y: usize,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            min_x: 85.0,
            max_x: 410.0,
            count_x: 10,
            min_y: 75.0,
            max_y: 400.0,
            count_y: 20,
        }
    }
}

impl AoiConfig {
    /// Create a configuration with the default world bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the x axis bounds and cell count
    pub fn with_x_axis(mut self, min: f32, max: f32, count: usize) -> Self {
        self.min_x = min;
        self.max_x = max;
        self.count_x = count;
        self
    }

    /// Set the y axis bounds and cell count
    pub fn with_y_axis(mut self, min: f32, max: f32, count: usize) -> Self {
        self.min_y = min;
        self.max_y = max;
        self.count_y = count;
        self
    }

    /// Width of a single cell
    pub fn cell_width(&self) -> f32 {
        (self.max_x - self.min_x) / self.count_x as f32
    }

    /// Height of a single cell
    pub fn cell_height(&self) -> f32 {
        (self.max_y - self.min_y) / self.count_y as f32
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.count_x * self.count_y
    }

    /// Validate the configuration
    pub fn validate(&self) -> AoiResult<()> {
        if self.count_x == 0 || self.count_y == 0 {
            return Err(AoiError::EmptyGrid {
                count_x: self.count_x,
                count_y: self.count_y,
            });
        }
        for (axis, min, max) in [("x", self.min_x, self.max_x), ("y", self.min_y, self.max_y)] {
            if !min.is_finite() || !max.is_finite() || max <= min {
                return Err(AoiError::InvalidBounds { axis, min, max });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AoiConfig::default();
        assert_eq!(config.count_x, 10);
        assert_eq!(config.count_y, 20);
        assert_eq!(config.cell_count(), 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = AoiConfig::new().with_x_axis(0.0, 100.0, 0);
        assert!(matches!(config.validate(), Err(AoiError::EmptyGrid { .. })));

        let config = AoiConfig::new().with_y_axis(50.0, 50.0, 4);
        assert!(matches!(
            config.validate(),
            Err(AoiError::InvalidBounds { axis: "y", .. })
        ));

        let config = AoiConfig::new().with_x_axis(f32::NAN, 10.0, 4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AoiConfig =
            serde_json::from_str(r#"{ "min_x": 0, "max_x": 250, "count_x": 5 }"#).unwrap();
        assert_eq!(config.max_x, 250.0);
        assert_eq!(config.count_x, 5);
        assert_eq!(config.count_y, 20);
    }
}
