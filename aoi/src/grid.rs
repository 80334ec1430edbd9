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

//! A single grid cell and its occupant set

use std::collections::HashSet;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Row-major index of a cell within the grid
pub type CellId = usize;

/// Identifier of an entity tracked by the grid
pub type OccupantId = u64;

/// One rectangular subdivision of the world
///
/// Each cell guards its own occupant set, so updates to unrelated cells never
/// contend with each other.
pub struct Cell {
    id: CellId,
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
    occupants: RwLock<HashSet<OccupantId>>,
}

impl Cell {
    pub(crate) fn new(id: CellId, min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            id,
            min_x,
            max_x,
            min_y,
            max_y,
            occupants: RwLock::new(HashSet::new()),
        }
    }

    /// Cell id
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Bounds as `(min_x, max_x, min_y, max_y)`
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (self.min_x, self.max_x, self.min_y, self.max_y)
    }

    /// Add an occupant; returns `false` if it was already present
    pub fn add(&self, occupant: OccupantId) -> bool {
        self.write().insert(occupant)
    }

    /// Remove an occupant; returns `false` if it was not present
    pub fn remove(&self, occupant: OccupantId) -> bool {
        self.write().remove(&occupant)
    }

    /// Check whether an occupant is in this cell
    pub fn contains(&self, occupant: OccupantId) -> bool {
        self.read().contains(&occupant)
    }

    /// Snapshot of the current occupants (unordered)
    pub fn occupants(&self) -> Vec<OccupantId> {
        self.read().iter().copied().collect()
    }

    pub(crate) fn extend_into(&self, out: &mut Vec<OccupantId>) {
        out.extend(self.read().iter().copied());
    }

    /// Number of occupants
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cell has no occupants
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a HashSet half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashSet<OccupantId>> {
        self.occupants.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<OccupantId>> {
        self.occupants.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("bounds", &self.bounds())
            .field("occupants", &self.len())
            .finish()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut occupants = self.occupants();
        occupants.sort_unstable();
        write!(
            f,
            "Cell {}: x [{}, {}), y [{}, {}), occupants {:?}",
            self.id, self.min_x, self.max_x, self.min_y, self.max_y, occupants
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_remove() {
        let cell = Cell::new(0, 0.0, 50.0, 0.0, 50.0);
        assert!(cell.is_empty());
        assert!(cell.add(7));
        assert!(!cell.add(7));
        assert!(cell.contains(7));
        assert_eq!(cell.len(), 1);
        assert!(cell.remove(7));
        assert!(!cell.remove(7));
        assert!(cell.is_empty());
    }

    #[test]
    fn test_display() {
        let cell = Cell::new(3, 0.0, 50.0, 0.0, 50.0);
        cell.add(2);
        cell.add(1);
        assert_eq!(
            cell.to_string(),
            "Cell 3: x [0, 50), y [0, 50), occupants [1, 2]"
        );
    }

    #[test]
    fn test_concurrent_updates() {
        let cell = Arc::new(Cell::new(0, 0.0, 1.0, 0.0, 1.0));
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let cell = cell.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        cell.add(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cell.len(), 800);
    }
}
