use std::sync::Arc;

use anyhow::{bail, Result};
use glam::Vec3;
use landstream_core::{Event, TileState};
use landstream_system_fetch::TileFetcher;
use landstream_system_tracking::PositionTracker;
use landstream_world::{
    query::{self, GridSummary},
    WorldGrid,
};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    task::{JoinError, JoinHandle},
};
use tracing::{debug, info, warn};

/// Host-side loop state: drives the tracker, starts fetches and presents
/// notifications.
pub(crate) struct Session {
    grid: Arc<WorldGrid>,
    tracker: PositionTracker,
    fetcher: TileFetcher,
    notifications: UnboundedReceiver<Event>,
    in_flight: Vec<JoinHandle<TileState>>,
    label: String,
}

impl Session {
    pub(crate) fn new(
        grid: Arc<WorldGrid>,
        tracker: PositionTracker,
        fetcher: TileFetcher,
        notifications: UnboundedReceiver<Event>,
    ) -> Self {
        let label = query::tile_label(&grid, tracker.current_tile());
        Self {
            grid,
            tracker,
            fetcher,
            notifications,
            in_flight: Vec::new(),
            label,
        }
    }

    /// Requests the starting tile before the first tick.
    pub(crate) fn start(&mut self) {
        let tile = self.tracker.current_tile();
        info!(%tile, position = ?self.tracker.observer().position, "observer placed");
        if self.grid.try_reserve(tile) {
            self.in_flight.push(self.fetcher.start(tile));
        }
        info!("{}", self.label);
    }

    /// Processes one host tick at `position`.
    ///
    /// Fails when a finished fetch task panicked in a debug build.
    pub(crate) async fn tick(&mut self, position: Vec3) -> Result<()> {
        let mut events = Vec::new();
        let reserved = self.tracker.tick(position, &self.grid, &mut events);
        for event in &events {
            present(event);
        }

        let (finished, running) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition::<Vec<_>, _>(|handle| handle.is_finished());
        self.in_flight = running;
        for handle in finished {
            observe(handle.await)?;
        }

        self.in_flight.extend(self.fetcher.start_all(reserved));
        self.drain_notifications();
        Ok(())
    }

    /// Presents queued fetch notifications and refreshes the tile label.
    pub(crate) fn drain_notifications(&mut self) {
        while let Ok(event) = self.notifications.try_recv() {
            present(&event);
        }

        let label = query::tile_label(&self.grid, self.tracker.current_tile());
        if label != self.label {
            info!("{label}");
            self.label = label;
        }
    }

    /// Waits for every outstanding fetch and returns the final label and grid tally.
    pub(crate) async fn finish(mut self) -> Result<(String, GridSummary)> {
        for handle in std::mem::take(&mut self.in_flight) {
            observe(handle.await)?;
        }
        self.drain_notifications();
        Ok((self.label, query::summary(&self.grid)))
    }
}

/// Surfaces a fetch task that did not run to completion.
///
/// A panic is a bug in the fetch pipeline: fatal in debug builds, logged in
/// release builds where the tile has already been marked failed.
fn observe(outcome: Result<TileState, JoinError>) -> Result<()> {
    match outcome {
        Ok(_) => Ok(()),
        Err(error) if error.is_panic() && cfg!(debug_assertions) => {
            bail!("fetch task panicked: {error}")
        }
        Err(error) => {
            warn!(%error, "fetch task ended abnormally");
            Ok(())
        }
    }
}

fn present(event: &Event) {
    match event {
        Event::FetchStarted { index, position } => {
            debug!(%index, ?position, "placeholder shown");
        }
        Event::FetchFinished { index, state } => {
            debug!(%index, ?state, "placeholder removed");
        }
        Event::FrontierMarkerMoved { index, position } => {
            info!(%index, ?position, "frontier marker moved");
        }
    }
}
