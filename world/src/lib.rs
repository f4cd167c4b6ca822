#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Landstream.
//!
//! The [`WorldGrid`] owns every tile state the session has ever requested
//! together with the set of tiles whose frontier has already been expanded.
//! Both tables only grow. Every mutation goes through a single lock so that
//! reservations and completions issued from concurrent fetch tasks are atomic
//! with respect to each other.

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use landstream_core::{TileIndex, TileState};
use thiserror::Error;
use tracing::{debug, trace};

/// Violations of the tile lifecycle detected by the grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// A completion targeted a tile that is not pending, or supplied a
    /// non-terminal state.
    #[error("tile {index} cannot move from {found:?} to {requested:?}")]
    InvalidState {
        /// Tile the completion targeted.
        index: TileIndex,
        /// State the grid held for the tile.
        found: TileState,
        /// State the caller attempted to record.
        requested: TileState,
    },
}

/// Shared map from tile index to tile state plus the expanded-tile set.
#[derive(Debug, Default)]
pub struct WorldGrid {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    states: HashMap<TileIndex, TileState>,
    visited: HashSet<TileIndex>,
}

impl WorldGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the tile for fetching.
    ///
    /// Returns `true` exactly once per index for the life of the grid; the
    /// caller that receives `true` owns the fetch. Every later call returns
    /// `false`.
    pub fn try_reserve(&self, index: TileIndex) -> bool {
        match self.lock().states.entry(index) {
            Entry::Vacant(slot) => {
                let _ = slot.insert(TileState::Pending);
                debug!(%index, "reserved tile");
                true
            }
            Entry::Occupied(_) => {
                trace!(%index, "tile already known");
                false
            }
        }
    }

    /// Records the terminal state of a pending tile.
    pub fn set_terminal(&self, index: TileIndex, state: TileState) -> Result<(), GridError> {
        let mut tables = self.lock();
        let found = tables
            .states
            .get(&index)
            .cloned()
            .unwrap_or(TileState::Unknown);

        if found != TileState::Pending || !state.is_terminal() {
            return Err(GridError::InvalidState {
                index,
                found,
                requested: state,
            });
        }

        let _ = tables.states.insert(index, state);
        Ok(())
    }

    /// Current state of the tile, `Unknown` if it was never reserved.
    #[must_use]
    pub fn lookup(&self, index: TileIndex) -> TileState {
        self.lock()
            .states
            .get(&index)
            .cloned()
            .unwrap_or(TileState::Unknown)
    }

    /// Marks the tile's frontier as expanded.
    ///
    /// Returns `true` only the first time it is called for an index.
    pub fn mark_visited(&self, index: TileIndex) -> bool {
        let first = self.lock().visited.insert(index);
        if first {
            debug!(%index, "first visit");
        }
        first
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Tables stay consistent across a panic: every mutation is a single insert.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Query functions that provide read-only access to the grid.
pub mod query {
    use landstream_core::{tile_label as label_for, TileIndex, TileState};

    use super::WorldGrid;

    /// Status label for the tile, e.g. `"Empty Land (0:0)"`.
    #[must_use]
    pub fn tile_label(grid: &WorldGrid, index: TileIndex) -> String {
        label_for(index, &grid.lookup(index))
    }

    /// Number of tiles that have ever been reserved.
    #[must_use]
    pub fn known_len(grid: &WorldGrid) -> usize {
        grid.lock().states.len()
    }

    /// Number of tiles whose frontier has been expanded.
    #[must_use]
    pub fn visited_len(grid: &WorldGrid) -> usize {
        grid.lock().visited.len()
    }

    /// Every known tile with its state, ordered by index.
    #[must_use]
    pub fn snapshot(grid: &WorldGrid) -> Vec<(TileIndex, TileState)> {
        let mut tiles: Vec<(TileIndex, TileState)> = grid
            .lock()
            .states
            .iter()
            .map(|(index, state)| (*index, state.clone()))
            .collect();
        tiles.sort_by_key(|(index, _)| *index);
        tiles
    }

    /// Tallies the known tiles by state.
    #[must_use]
    pub fn summary(grid: &WorldGrid) -> GridSummary {
        let tables = grid.lock();
        let mut summary = GridSummary {
            visited: tables.visited.len(),
            ..GridSummary::default()
        };
        for state in tables.states.values() {
            match state {
                TileState::Unknown => {}
                TileState::Pending => summary.pending += 1,
                TileState::UnclaimedPending => summary.unclaimed_pending += 1,
                TileState::UnclaimedEmpty => summary.unclaimed_empty += 1,
                TileState::Named(_) => summary.named += 1,
                TileState::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Per-state tile counts captured by [`summary`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct GridSummary {
        /// Tiles with a fetch still in flight.
        pub pending: usize,
        /// Tiles whose claim is not mined yet.
        pub unclaimed_pending: usize,
        /// Tiles whose claim points at no content.
        pub unclaimed_empty: usize,
        /// Tiles resolved to a name.
        pub named: usize,
        /// Tiles whose fetch failed.
        pub failed: usize,
        /// Tiles whose frontier was expanded.
        pub visited: usize,
    }

    impl GridSummary {
        /// Tiles that reached a terminal state.
        #[must_use]
        pub const fn resolved(&self) -> usize {
            self.unclaimed_pending + self.unclaimed_empty + self.named + self.failed
        }
    }
}
