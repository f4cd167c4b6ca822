#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Observer tracking system that turns per-tick positions into frontier work.
//!
//! The tracker is driven once per host tick. It derives the observer's tile,
//! moves the frontier marker whenever that tile changes and expands the
//! neighborhood of every tile the first time the observer stands in it. All
//! of this is synchronous; fetching the reserved tiles is left to the host.

use glam::Vec3;
use landstream_core::{Event, TileIndex, TileTransform};
use landstream_system_expansion::Expansion;
use landstream_world::WorldGrid;
use tracing::debug;

/// Phase of the tracker after the most recent tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackerState {
    /// The observer stayed inside the already processed tile.
    Idle,
    /// The observer crossed into a different tile during the tick.
    Transitioning,
}

/// Continuous observer position together with the tile it resides in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObserverState {
    /// Last reported world position.
    pub position: Vec3,
    /// Tile derived from `position`.
    pub tile: TileIndex,
}

/// Tracks the observer and triggers frontier expansion on tile changes.
#[derive(Clone, Debug)]
pub struct PositionTracker {
    transform: TileTransform,
    expansion: Expansion,
    observer: ObserverState,
    state: TrackerState,
}

impl PositionTracker {
    /// Creates a tracker with the observer standing at the center of `initial`.
    #[must_use]
    pub fn new(transform: TileTransform, expansion: Expansion, initial: TileIndex) -> Self {
        Self {
            observer: ObserverState {
                position: transform.to_world_position(initial),
                tile: initial,
            },
            transform,
            expansion,
            state: TrackerState::Idle,
        }
    }

    /// Observer position and tile as of the last tick.
    #[must_use]
    pub const fn observer(&self) -> ObserverState {
        self.observer
    }

    /// Tile the observer currently occupies.
    #[must_use]
    pub const fn current_tile(&self) -> TileIndex {
        self.observer.tile
    }

    /// Phase reached by the most recent tick.
    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// Transform used to derive tiles from positions.
    #[must_use]
    pub const fn transform(&self) -> &TileTransform {
        &self.transform
    }

    /// Processes one host tick.
    ///
    /// Emits [`Event::FrontierMarkerMoved`] when the observer enters a new
    /// tile. The first time any tile is occupied its neighborhood is
    /// expanded; the reserved tiles are returned so the host can fetch them.
    /// Revisited tiles expand nothing.
    pub fn tick(
        &mut self,
        position: Vec3,
        grid: &WorldGrid,
        out_events: &mut Vec<Event>,
    ) -> Vec<TileIndex> {
        let tile = self.transform.to_tile_index(position);
        self.observer.position = position;

        if tile == self.observer.tile {
            self.state = TrackerState::Idle;
        } else {
            debug!(from = %self.observer.tile, to = %tile, "observer changed tile");
            self.observer.tile = tile;
            self.state = TrackerState::Transitioning;
            out_events.push(Event::FrontierMarkerMoved {
                index: tile,
                position: self.transform.to_world_position(tile),
            });
        }

        if grid.mark_visited(tile) {
            self.expansion.expand(tile, grid)
        } else {
            Vec::new()
        }
    }
}

/// Parses the starting tile from a query string such as `"?x=12&y=-3"`.
///
/// Everything up to the first `?` is ignored, so full URLs are accepted. The
/// row may be given as `y` or `z`. Missing or malformed coordinates fall back
/// to the origin tile.
#[must_use]
pub fn initial_tile_from_query(query: &str) -> TileIndex {
    let query = query
        .split_once('?')
        .map_or(query, |(_, parameters)| parameters);

    let mut x = None;
    let mut z = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key.trim() {
            "x" => x = Some(value.trim().parse::<i32>()),
            "y" | "z" => z = Some(value.trim().parse::<i32>()),
            _ => {}
        }
    }

    match (x, z) {
        (Some(Ok(x)), Some(Ok(z))) => TileIndex::new(x, z),
        _ => TileIndex::ORIGIN,
    }
}
