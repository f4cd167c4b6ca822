use std::sync::Arc;

use landstream_core::{Event, FetchError, TileIndex, TileState, TileTransform};
use landstream_world::{GridError, WorldGrid};
use tokio::{
    sync::{mpsc::UnboundedSender, Semaphore},
    task::JoinHandle,
};
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use crate::TileContentResolver;

/// Configuration parameters required to construct the fetcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    max_in_flight: Option<usize>,
}

impl Config {
    /// Creates a configuration.
    ///
    /// `max_in_flight` bounds how many tiles resolve at the same time; `None`
    /// starts every reserved tile immediately. A bound of zero is treated as
    /// one.
    #[must_use]
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            max_in_flight: max_in_flight.map(|limit| limit.max(1)),
        }
    }

    /// Upper bound on concurrently resolving tiles, if any.
    #[must_use]
    pub const fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }
}

/// Starts one task per reserved tile and records its terminal state.
///
/// Cloning is cheap; clones share the grid, the resolver, the notification
/// channel and the in-flight bound.
#[derive(Clone)]
pub struct TileFetcher {
    grid: Arc<WorldGrid>,
    resolver: TileContentResolver,
    transform: TileTransform,
    events: UnboundedSender<Event>,
    permits: Option<Arc<Semaphore>>,
}

impl TileFetcher {
    /// Creates a fetcher that records outcomes in `grid` and publishes
    /// notifications on `events`.
    #[must_use]
    pub fn new(
        config: Config,
        grid: Arc<WorldGrid>,
        resolver: TileContentResolver,
        transform: TileTransform,
        events: UnboundedSender<Event>,
    ) -> Self {
        Self {
            grid,
            resolver,
            transform,
            events,
            permits: config
                .max_in_flight()
                .map(|limit| Arc::new(Semaphore::new(limit))),
        }
    }

    /// Starts fetching a tile previously reserved through
    /// [`WorldGrid::try_reserve`].
    ///
    /// [`Event::FetchStarted`] is published before this returns. The spawned
    /// task publishes [`Event::FetchFinished`] once the terminal state is
    /// recorded and yields that state. Must be called from within a tokio
    /// runtime.
    pub fn start(&self, index: TileIndex) -> JoinHandle<TileState> {
        self.notify(Event::FetchStarted {
            index,
            position: self.transform.to_world_position(index),
        });

        let fetcher = self.clone();
        let span = info_span!("tile_fetch", x = index.x(), z = index.z());
        tokio::spawn(async move { fetcher.run(index).await }.instrument(span))
    }

    /// Starts every tile in `indices`.
    pub fn start_all(
        &self,
        indices: impl IntoIterator<Item = TileIndex>,
    ) -> Vec<JoinHandle<TileState>> {
        indices.into_iter().map(|index| self.start(index)).collect()
    }

    async fn run(self, index: TileIndex) -> TileState {
        let mut guard = Unfinished::new(&self, index);
        let _permit = match &self.permits {
            Some(permits) => Arc::clone(permits).acquire_owned().await.ok(),
            None => None,
        };

        let state = self.resolver.resolve(index).await;
        guard.disarm();
        if let Err(error) = self.complete(index, state.clone()) {
            debug_assert!(false, "{error}");
        }
        state
    }

    /// Records `state` and publishes [`Event::FetchFinished`].
    ///
    /// The notification goes out even when the grid rejects the transition.
    fn complete(&self, index: TileIndex, state: TileState) -> Result<(), GridError> {
        match &state {
            TileState::Named(name) => info!(%index, %name, "tile resolved"),
            TileState::Failed(error) => warn!(%index, %error, "tile fetch failed"),
            other => debug!(%index, state = ?other, "tile unclaimed"),
        }

        let recorded = self.grid.set_terminal(index, state.clone());
        if let Err(error) = &recorded {
            error!(%error, "tile completion violated the grid lifecycle");
        }

        self.notify(Event::FetchFinished { index, state });
        recorded
    }

    fn notify(&self, event: Event) {
        if self.events.send(event).is_err() {
            trace!("notification receiver dropped");
        }
    }
}

/// Fails the tile when its task stops before resolving, whether by a panic in
/// a collaborator or by cancellation.
struct Unfinished<'a> {
    fetcher: &'a TileFetcher,
    index: TileIndex,
    armed: bool,
}

impl<'a> Unfinished<'a> {
    fn new(fetcher: &'a TileFetcher, index: TileIndex) -> Self {
        Self {
            fetcher,
            index,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Unfinished<'_> {
    fn drop(&mut self) {
        if self.armed {
            let state = TileState::Failed(FetchError::network(
                "fetch task ended before the tile resolved",
            ));
            let _ = self.fetcher.complete(self.index, state);
        }
    }
}
