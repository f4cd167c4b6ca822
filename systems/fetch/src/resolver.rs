use std::sync::Arc;

use landstream_core::{ClaimDisposition, FetchError, TileIndex, TileState};
use tracing::debug;

use crate::{ClaimSource, ContentSource, PayloadDecoder};

/// Two-stage classifier that resolves a reserved tile into a terminal state.
#[derive(Clone)]
pub struct TileContentResolver {
    claims: Arc<dyn ClaimSource>,
    content: Arc<dyn ContentSource>,
    decoder: Arc<dyn PayloadDecoder>,
}

impl TileContentResolver {
    /// Creates a resolver over the provided collaborators.
    #[must_use]
    pub fn new(
        claims: Arc<dyn ClaimSource>,
        content: Arc<dyn ContentSource>,
        decoder: Arc<dyn PayloadDecoder>,
    ) -> Self {
        Self {
            claims,
            content,
            decoder,
        }
    }

    /// Resolves `index` to its terminal state.
    ///
    /// The payload is only requested when the claim carries a content hash.
    /// Every error becomes [`TileState::Failed`]; nothing is retried.
    pub async fn resolve(&self, index: TileIndex) -> TileState {
        match self.resolve_name(index).await {
            Ok(Resolution::Unclaimed(state)) => state,
            Ok(Resolution::Named(name)) => TileState::Named(name),
            Err(error) => TileState::Failed(error),
        }
    }

    async fn resolve_name(&self, index: TileIndex) -> Result<Resolution, FetchError> {
        let claim = self.claims.claim(index).await?;
        let hash = match claim.disposition()? {
            ClaimDisposition::UnclaimedPending => {
                return Ok(Resolution::Unclaimed(TileState::UnclaimedPending))
            }
            ClaimDisposition::UnclaimedEmpty => {
                return Ok(Resolution::Unclaimed(TileState::UnclaimedEmpty))
            }
            ClaimDisposition::HasContent(hash) => hash,
        };

        debug!(%index, %hash, "claim carries content");
        let bytes = self.content.fetch(index, &hash).await?;
        debug!(%index, len = bytes.len(), "downloaded tile payload");
        let name = self.decoder.decode(&bytes)?;
        Ok(Resolution::Named(name))
    }
}

enum Resolution {
    Unclaimed(TileState),
    Named(String),
}
