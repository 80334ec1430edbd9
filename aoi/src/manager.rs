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

//! AOI manager implementation
//!
//! The AoiManager is responsible for:
//! - Mapping world positions to grid cells
//! - Computing the 3×3 neighbourhood of a cell
//! - Tracking which occupants sit in which cell
//! - Answering "who is near this position" queries

use crate::{AoiConfig, AoiResult, Cell, CellId, OccupantId};
use std::fmt;
use tracing::{debug, trace};

/// Area-of-interest grid
///
/// The world rectangle is split into `count_x × count_y` equal cells numbered
/// row-major (`cell_id = row * count_x + col`). Occupant membership is only ever
/// changed by explicit calls; moving an entity does not move it between cells
/// unless the caller does so (see [`relocate_occupant`](AoiManager::relocate_occupant)).
///
/// # Example
///
/// ```
/// use gridlink_aoi::{AoiConfig, AoiManager};
///
/// let config = AoiConfig::new()
///     .with_x_axis(0.0, 250.0, 5)
///     .with_y_axis(0.0, 250.0, 5);
/// let aoi = AoiManager::new(config).unwrap();
///
/// aoi.add_occupant_at(1, 10.0, 10.0);
/// aoi.add_occupant_at(2, 60.0, 60.0);
/// aoi.add_occupant_at(3, 240.0, 240.0);
///
/// let mut near = aoi.occupants_near(10.0, 10.0);
/// near.sort();
/// assert_eq!(near, vec![1, 2]);
/// ```
pub struct AoiManager {
    config: AoiConfig,
    cell_width: f32,
    cell_height: f32,
    cells: Vec<Cell>,
}

impl AoiManager {
    /// Build the grid for the given world
    pub fn new(config: AoiConfig) -> AoiResult<Self> {
        config.validate()?;

        let cell_width = config.cell_width();
        let cell_height = config.cell_height();
        let mut cells = Vec::with_capacity(config.cell_count());
        for row in 0..config.count_y {
            for col in 0..config.count_x {
                cells.push(Cell::new(
                    row * config.count_x + col,
                    config.min_x + col as f32 * cell_width,
                    config.min_x + (col + 1) as f32 * cell_width,
                    config.min_y + row as f32 * cell_height,
                    config.min_y + (row + 1) as f32 * cell_height,
                ));
            }
        }

        debug!(
            count_x = config.count_x,
            count_y = config.count_y,
            cell_width,
            cell_height,
            "AOI grid initialized"
        );

        Ok(Self {
            config,
            cell_width,
            cell_height,
            cells,
        })
    }

    /// The configuration this grid was built from
    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    /// Width of a single cell
    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }

    /// Height of a single cell
    pub fn cell_height(&self) -> f32 {
        self.cell_height
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Look up a cell by id
    pub fn cell(&self, cell_id: CellId) -> Option<&Cell> {
        self.cells.get(cell_id)
    }

    /// Map a position to the cell containing it
    ///
    /// The world is the closed rectangle `[min_x, max_x] × [min_y, max_y]`;
    /// points on the far edges belong to the last column/row. Anything outside,
    /// or not finite, has no cell.
    pub fn cell_id_for(&self, x: f32, y: f32) -> Option<CellId> {
        let c = &self.config;
        if !(c.min_x..=c.max_x).contains(&x) || !(c.min_y..=c.max_y).contains(&y) {
            return None;
        }
        let col = (((x - c.min_x) / self.cell_width) as usize).min(c.count_x - 1);
        let row = (((y - c.min_y) / self.cell_height) as usize).min(c.count_y - 1);
        Some(row * c.count_x + col)
    }

    /// The 3×3 block of cells centred on `cell_id`, clipped at the grid edges
    ///
    /// The cell itself comes first, then its left/right neighbours, then the
    /// cells above and below each of those. An unknown id has no neighbours.
    pub fn neighbors_of(&self, cell_id: CellId) -> Vec<CellId> {
        if cell_id >= self.cells.len() {
            return Vec::new();
        }
        let count_x = self.config.count_x;
        let count_y = self.config.count_y;

        let mut row_cells = Vec::with_capacity(3);
        row_cells.push(cell_id);
        let col = cell_id % count_x;
        if col > 0 {
            row_cells.push(cell_id - 1);
        }
        if col + 1 < count_x {
            row_cells.push(cell_id + 1);
        }

        let mut neighbors = Vec::with_capacity(9);
        neighbors.extend_from_slice(&row_cells);
        for id in row_cells {
            let row = id / count_x;
            if row > 0 {
                neighbors.push(id - count_x);
            }
            if row + 1 < count_y {
                neighbors.push(id + count_x);
            }
        }
        neighbors
    }

    /// Add an occupant to a cell
    ///
    /// Returns `false` if the cell does not exist or already holds the occupant.
    pub fn add_occupant(&self, cell_id: CellId, occupant: OccupantId) -> bool {
        match self.cells.get(cell_id) {
            Some(cell) => {
                trace!(cell_id, occupant, "Adding occupant");
                cell.add(occupant)
            }
            None => false,
        }
    }

    /// Remove an occupant from a cell
    ///
    /// Returns `false` if the cell does not exist or did not hold the occupant.
    pub fn remove_occupant(&self, cell_id: CellId, occupant: OccupantId) -> bool {
        match self.cells.get(cell_id) {
            Some(cell) => {
                trace!(cell_id, occupant, "Removing occupant");
                cell.remove(occupant)
            }
            None => false,
        }
    }

    /// All occupants of a single cell
    pub fn occupants_in(&self, cell_id: CellId) -> Vec<OccupantId> {
        self.cells
            .get(cell_id)
            .map(Cell::occupants)
            .unwrap_or_default()
    }

    /// All occupants in the 3×3 neighbourhood of a cell
    pub fn occupants_around(&self, cell_id: CellId) -> Vec<OccupantId> {
        let mut occupants = Vec::new();
        for id in self.neighbors_of(cell_id) {
            self.cells[id].extend_into(&mut occupants);
        }
        occupants
    }

    /// All occupants in the 3×3 neighbourhood of the cell containing `(x, y)`
    ///
    /// Positions outside the world have no neighbourhood and return nothing.
    pub fn occupants_near(&self, x: f32, y: f32) -> Vec<OccupantId> {
        self.cell_id_for(x, y)
            .map(|cell_id| self.occupants_around(cell_id))
            .unwrap_or_default()
    }

    /// Add an occupant to the cell containing `(x, y)`
    ///
    /// Returns the cell id, or `None` when the position is outside the world.
    pub fn add_occupant_at(&self, occupant: OccupantId, x: f32, y: f32) -> Option<CellId> {
        let cell_id = self.cell_id_for(x, y)?;
        self.add_occupant(cell_id, occupant);
        Some(cell_id)
    }

    /// Remove an occupant from the cell containing `(x, y)`
    pub fn remove_occupant_at(&self, occupant: OccupantId, x: f32, y: f32) -> bool {
        self.cell_id_for(x, y)
            .is_some_and(|cell_id| self.remove_occupant(cell_id, occupant))
    }

    /// Move an occupant from the cell at `from` to the cell at `to`
    ///
    /// This is the explicit remove-then-add a caller performs after a position
    /// update. Returns `true` if the occupant changed cells.
    pub fn relocate_occupant(
        &self,
        occupant: OccupantId,
        from: (f32, f32),
        to: (f32, f32),
    ) -> bool {
        let old_cell = self.cell_id_for(from.0, from.1);
        let new_cell = self.cell_id_for(to.0, to.1);
        if old_cell == new_cell {
            return false;
        }
        if let Some(cell_id) = old_cell {
            self.remove_occupant(cell_id, occupant);
        }
        if let Some(cell_id) = new_cell {
            self.add_occupant(cell_id, occupant);
        }
        debug!(occupant, ?old_cell, ?new_cell, "Occupant changed cells");
        true
    }
}

impl fmt::Debug for AoiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AoiManager")
            .field("config", &self.config)
            .field("cell_count", &self.cells.len())
            .finish()
    }
}

impl fmt::Display for AoiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(
            f,
            "AoiManager: x [{}, {}] / {}, y [{}, {}] / {}",
            c.min_x, c.max_x, c.count_x, c.min_y, c.max_y, c.count_y
        )?;
        for cell in &self.cells {
            writeln!(f, "  {}", cell)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_5x5() -> AoiManager {
        AoiManager::new(
            AoiConfig::new()
                .with_x_axis(0.0, 250.0, 5)
                .with_y_axis(0.0, 250.0, 5),
        )
        .unwrap()
    }

    fn sorted(mut ids: Vec<usize>) -> Vec<usize> {
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_cell_geometry() {
        let aoi = grid_5x5();
        assert_eq!(aoi.cell_count(), 25);
        assert_eq!(aoi.cell_width(), 50.0);
        assert_eq!(aoi.cell(6).unwrap().bounds(), (50.0, 100.0, 50.0, 100.0));
        assert!(aoi.cell(25).is_none());
    }

    #[test]
    fn test_cell_id_for() {
        let aoi = grid_5x5();
        assert_eq!(aoi.cell_id_for(10.0, 10.0), Some(0));
        assert_eq!(aoi.cell_id_for(60.0, 10.0), Some(1));
        assert_eq!(aoi.cell_id_for(10.0, 60.0), Some(5));
        assert_eq!(aoi.cell_id_for(250.0, 250.0), Some(24));
        assert_eq!(aoi.cell_id_for(-1.0, 10.0), None);
        assert_eq!(aoi.cell_id_for(10.0, 250.5), None);
        assert_eq!(aoi.cell_id_for(f32::NAN, 10.0), None);
    }

    #[test]
    fn test_neighbors_of_corner_and_center() {
        let aoi = grid_5x5();
        assert_eq!(sorted(aoi.neighbors_of(0)), vec![0, 1, 5, 6]);
        assert_eq!(sorted(aoi.neighbors_of(24)), vec![18, 19, 23, 24]);
        assert_eq!(
            sorted(aoi.neighbors_of(12)),
            vec![6, 7, 8, 11, 12, 13, 16, 17, 18]
        );
        assert_eq!(sorted(aoi.neighbors_of(2)), vec![1, 2, 3, 6, 7, 8]);
        assert!(aoi.neighbors_of(25).is_empty());
    }

    #[test]
    fn test_neighbors_on_non_square_grid() {
        // 4 columns by 2 rows: row must come from count_x, not count_y.
        let aoi = AoiManager::new(
            AoiConfig::new()
                .with_x_axis(0.0, 40.0, 4)
                .with_y_axis(0.0, 20.0, 2),
        )
        .unwrap();
        assert_eq!(sorted(aoi.neighbors_of(6)), vec![1, 2, 3, 5, 6, 7]);
        assert_eq!(sorted(aoi.neighbors_of(1)), vec![0, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn test_add_query_remove() {
        let aoi = grid_5x5();
        assert_eq!(aoi.add_occupant_at(42, 10.0, 10.0), Some(0));
        assert_eq!(aoi.occupants_near(20.0, 20.0), vec![42]);
        assert_eq!(aoi.occupants_in(0), vec![42]);

        assert!(aoi.remove_occupant_at(42, 10.0, 10.0));
        assert!(aoi.occupants_near(20.0, 20.0).is_empty());
    }

    #[test]
    fn test_invalid_ids_are_ignored() {
        let aoi = grid_5x5();
        assert!(!aoi.add_occupant(99, 1));
        assert!(!aoi.remove_occupant(99, 1));
        assert!(aoi.occupants_in(99).is_empty());
        assert_eq!(aoi.add_occupant_at(1, 500.0, 500.0), None);
        assert!(aoi.occupants_near(500.0, 500.0).is_empty());
    }

    #[test]
    fn test_no_automatic_migration() {
        let aoi = grid_5x5();
        aoi.add_occupant_at(1, 10.0, 10.0);
        // Far corner: occupant 1 stays registered in cell 0 until moved explicitly.
        assert!(aoi.occupants_near(240.0, 240.0).is_empty());
        assert!(aoi.relocate_occupant(1, (10.0, 10.0), (240.0, 240.0)));
        assert_eq!(aoi.occupants_near(240.0, 240.0), vec![1]);
        assert!(aoi.occupants_in(0).is_empty());
        assert!(!aoi.relocate_occupant(1, (240.0, 240.0), (230.0, 230.0)));
    }

    #[test]
    fn test_display_lists_cells() {
        let aoi = grid_5x5();
        let dump = aoi.to_string();
        assert!(dump.starts_with("AoiManager: x [0, 250] / 5"));
        assert_eq!(dump.lines().count(), 26);
    }
}
