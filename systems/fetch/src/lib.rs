#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tile fetch pipeline: claim lookup, payload download and classification.
//!
//! Each reserved tile is resolved by one independent task. The task first asks
//! a [`ClaimSource`] who owns the tile; only when the claim points at real
//! content does it download the payload from a [`ContentSource`] and hand the
//! bytes to a [`PayloadDecoder`]. Whatever happens, the task records exactly
//! one terminal state in the world grid. Failures are terminal for the
//! session and are never retried.

use async_trait::async_trait;
use landstream_core::{ClaimResponse, DecodeError, FetchError, TileIndex};

mod fetcher;
mod resolver;

pub use fetcher::{Config, TileFetcher};
pub use resolver::TileContentResolver;

/// Ownership/claim lookup keyed by tile index.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    /// Looks up the claim for `index`.
    ///
    /// Transport failures are reported as [`FetchError::Network`].
    async fn claim(&self, index: TileIndex) -> Result<ClaimResponse, FetchError>;
}

/// Content endpoint serving the binary payload of claimed tiles.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Downloads the payload of `index`, addressed by its content `hash`.
    ///
    /// Transport failures are reported as [`FetchError::Network`].
    async fn fetch(&self, index: TileIndex, hash: &str) -> Result<Vec<u8>, FetchError>;
}

/// Turns raw payload bytes into the name of the entity they describe.
pub trait PayloadDecoder: Send + Sync {
    /// Decodes `bytes`, classifying failures by [`DecodeError::kind`].
    fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError>;
}
