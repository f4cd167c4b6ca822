#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Landstream tile streamer.
//!
//! This crate defines the vocabulary that connects the authoritative world
//! grid, the pure systems that decide which tiles to request, and the
//! adapters that talk to the claim and content endpoints. Tiles are addressed
//! by a [`TileIndex`], mapped to and from world space by a [`TileTransform`],
//! and progress through the [`TileState`] lifecycle exactly once. Systems
//! report what happened through [`Event`] values that hosts forward to their
//! renderers.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Edge length of a tile, in world units, used when nothing else is configured.
pub const DEFAULT_TILE_SIZE: f32 = 40.0;

/// Label shown for tiles that carry no resolved name.
pub const EMPTY_LAND_LABEL: &str = "Empty Land";

/// Integer address of a single tile within the infinite world grid.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileIndex {
    x: i32,
    z: i32,
}

impl TileIndex {
    /// The tile containing the world origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a tile index from its column (`x`) and row (`z`).
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Column of the tile along the world x axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile along the world z axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns the tile displaced by the provided offset.
    ///
    /// Offsets saturate at the edges of the `i32` range instead of wrapping,
    /// so a neighbor of an extreme tile never aliases a tile on the far side.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }

    /// Chebyshev distance between two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileIndex) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.z)
    }
}

/// Reasons a [`TileTransform`] cannot be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum TransformError {
    /// The tile size was zero, negative or not a finite number.
    #[error("tile size must be a finite positive number, got {0}")]
    InvalidTileSize(f32),
}

/// Maps continuous world positions onto the discrete tile grid and back.
///
/// Tiles are squares of `tile_size` world units centered on multiples of
/// `tile_size`, so tile `(0, 0)` spans `(-size/2, size/2]` on both axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileTransform {
    tile_size: f32,
}

impl TileTransform {
    /// Creates a transform for tiles with the provided edge length.
    pub fn new(tile_size: f32) -> Result<Self, TransformError> {
        if tile_size.is_finite() && tile_size > 0.0 {
            Ok(Self { tile_size })
        } else {
            Err(TransformError::InvalidTileSize(tile_size))
        }
    }

    /// Edge length of a tile in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Resolves the tile that contains the provided world position.
    ///
    /// The vertical component is ignored. Non-finite coordinates collapse to
    /// the nearest representable index rather than failing.
    #[must_use]
    pub fn to_tile_index(&self, position: Vec3) -> TileIndex {
        TileIndex::new(self.axis_index(position.x), self.axis_index(position.z))
    }

    /// World position of the center of the provided tile, at ground height.
    #[must_use]
    pub fn to_world_position(&self, index: TileIndex) -> Vec3 {
        Vec3::new(
            index.x() as f32 * self.tile_size,
            0.0,
            index.z() as f32 * self.tile_size,
        )
    }

    // f32 loses the half-tile offset once coordinates pass ~2^24.
    fn axis_index(&self, coordinate: f32) -> i32 {
        let size = f64::from(self.tile_size);
        ((f64::from(coordinate) - size / 2.0) / size).ceil() as i32
    }
}

impl Default for TileTransform {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

/// Lifecycle of a single tile within the world grid.
///
/// `Unknown` moves to `Pending` when a fetch is reserved and `Pending` moves
/// to exactly one of the terminal states. Terminal states never change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TileState {
    /// The tile has never been requested.
    #[default]
    Unknown,
    /// A fetch for the tile is in flight.
    Pending,
    /// The tile is claimed but the claim has not been mined yet.
    UnclaimedPending,
    /// The claim resolves to the all-zero content hash.
    UnclaimedEmpty,
    /// The payload was fetched and decoded into a named entity.
    Named(String),
    /// Fetching or decoding failed; the tile is not retried.
    Failed(FetchError),
}

impl TileState {
    /// Reports whether the state can never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UnclaimedPending | Self::UnclaimedEmpty | Self::Named(_) | Self::Failed(_)
        )
    }

    /// Name resolved for the tile, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// Builds the status label shown for a tile, e.g. `"Genesis Plaza (3:-2)"`.
///
/// Tiles without a resolved name, including failed ones, read as
/// [`EMPTY_LAND_LABEL`].
#[must_use]
pub fn tile_label(index: TileIndex, state: &TileState) -> String {
    let name = state.name().unwrap_or(EMPTY_LAND_LABEL);
    format!("{name} ({}:{})", index.x(), index.z())
}

/// Terminal failure recorded for a tile fetch.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The claim or content round trip failed at the transport level.
    #[error("network failure: {0}")]
    Network(String),
    /// The payload bytes did not decode into a valid entity.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FetchError {
    /// Wraps any displayable transport error as a [`FetchError::Network`].
    #[must_use]
    pub fn network(error: impl fmt::Display) -> Self {
        Self::Network(error.to_string())
    }
}

/// Coarse classification of payload decoding failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// The stream ended before the payload was complete.
    Truncated,
    /// The payload parsed but did not have the expected structure.
    Structural,
    /// Any other decoding failure.
    Other,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Truncated => "truncated",
            Self::Structural => "structurally invalid",
            Self::Other => "undecodable",
        };
        f.write_str(label)
    }
}

/// Failure reported by a payload decoder.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} payload: {message}")]
pub struct DecodeError {
    kind: DecodeErrorKind,
    message: String,
}

impl DecodeError {
    /// Creates a decode error of the provided kind.
    #[must_use]
    pub fn new(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classification of the failure.
    #[must_use]
    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Human readable detail supplied by the decoder.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error object carried by a claim response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimError {
    /// Description supplied by the claim endpoint.
    #[serde(default)]
    pub message: String,
    /// Numeric error code supplied by the claim endpoint.
    #[serde(default)]
    pub code: i64,
}

/// Outcome of the ownership/claim lookup for a tile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Content hash associated with the tile, if the endpoint returned one.
    #[serde(default)]
    pub result: Option<String>,
    /// Error reported by the endpoint, if any.
    #[serde(default)]
    pub error: Option<ClaimError>,
}

/// How a claim response decides the remainder of a tile fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimDisposition {
    /// The claim exists but is not finalized; no payload is fetched.
    UnclaimedPending,
    /// The claim points at no content; no payload is fetched.
    UnclaimedEmpty,
    /// The claim carries a content hash that addresses a payload.
    HasContent(String),
}

impl ClaimResponse {
    /// Response carrying the provided hash.
    #[must_use]
    pub fn with_hash(hash: impl Into<String>) -> Self {
        Self {
            result: Some(hash.into()),
            error: None,
        }
    }

    /// Classifies the response.
    ///
    /// An endpoint error, or a response with neither hash nor error, is a
    /// failed round trip.
    pub fn disposition(&self) -> Result<ClaimDisposition, FetchError> {
        if let Some(error) = &self.error {
            return Err(FetchError::Network(format!(
                "claim endpoint error {}: {}",
                error.code, error.message
            )));
        }

        match self.result.as_deref() {
            None => Err(FetchError::Network(
                "claim response carried neither result nor error".to_owned(),
            )),
            Some("") => Ok(ClaimDisposition::UnclaimedPending),
            Some(hash) if is_empty_content_hash(hash) => Ok(ClaimDisposition::UnclaimedEmpty),
            Some(hash) => Ok(ClaimDisposition::HasContent(hash.to_owned())),
        }
    }
}

/// Reports whether `hash` is the all-zero sentinel used for unassigned content.
///
/// The sentinel appears with several lengths in the wild, so any non-empty
/// run of `'0'` characters qualifies.
#[must_use]
pub fn is_empty_content_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.bytes().all(|byte| byte == b'0')
}

/// Notifications emitted for renderers and other presentation collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A fetch for the tile began; a placeholder may be shown at `position`.
    FetchStarted {
        /// Tile being fetched.
        index: TileIndex,
        /// World position of the tile center.
        position: Vec3,
    },
    /// The fetch for the tile reached its terminal state.
    FetchFinished {
        /// Tile whose fetch completed.
        index: TileIndex,
        /// Terminal state recorded for the tile.
        state: TileState,
    },
    /// The observer entered a different tile; the boundary marker follows it.
    FrontierMarkerMoved {
        /// Tile the observer now occupies.
        index: TileIndex,
        /// World position of that tile's center.
        position: Vec3,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> TileTransform {
        TileTransform::new(40.0).expect("valid tile size")
    }

    #[test]
    fn positions_near_origin_stay_in_origin_tile() {
        let transform = transform();
        assert_eq!(
            transform.to_tile_index(Vec3::new(19.0, 0.0, 19.0)),
            TileIndex::ORIGIN
        );
        assert_eq!(
            transform.to_tile_index(Vec3::new(20.0, 0.0, 0.0)),
            TileIndex::ORIGIN
        );
        assert_eq!(
            transform.to_tile_index(Vec3::new(-19.5, 3.0, -19.5)),
            TileIndex::ORIGIN
        );
    }

    #[test]
    fn crossing_half_tile_boundary_moves_to_next_tile() {
        let transform = transform();
        assert_eq!(
            transform.to_tile_index(Vec3::new(21.0, 0.0, 19.0)),
            TileIndex::new(1, 0)
        );
        assert_eq!(
            transform.to_tile_index(Vec3::new(61.0, 0.0, 0.0)),
            TileIndex::new(2, 0)
        );
        assert_eq!(
            transform.to_tile_index(Vec3::new(-20.0, 0.0, -21.0)),
            TileIndex::new(-1, -1)
        );
    }

    #[test]
    fn world_position_maps_back_to_same_tile() {
        let transform = transform();
        for x in -6..=6 {
            for z in -6..=6 {
                let index = TileIndex::new(x * 17, z * 13);
                let position = transform.to_world_position(index);
                assert_eq!(position.y, 0.0);
                assert_eq!(transform.to_tile_index(position), index);
            }
        }
    }

    #[test]
    fn far_tiles_map_back_to_same_tile() {
        let transform = transform();
        let far = [
            100_000,
            419_430,
            1_000_000,
            5_000_000,
            10_000_000,
            100_000_000,
            i32::MAX / 40,
        ];
        for x in far {
            for index in [TileIndex::new(x, -x), TileIndex::new(-x, x)] {
                let position = transform.to_world_position(index);
                assert_eq!(transform.to_tile_index(position), index, "{index}");
            }
        }
    }

    #[test]
    fn decode_kinds_describe_the_failure() {
        let error = DecodeError::new(DecodeErrorKind::Structural, "missing name");
        assert_eq!(
            error.to_string(),
            "structurally invalid payload: missing name"
        );
        assert_eq!(DecodeErrorKind::Truncated.to_string(), "truncated");
    }

    #[test]
    fn rejects_unusable_tile_sizes() {
        assert_eq!(
            TileTransform::new(0.0),
            Err(TransformError::InvalidTileSize(0.0))
        );
        assert!(TileTransform::new(-4.0).is_err());
        assert!(TileTransform::new(f32::NAN).is_err());
        assert!(TileTransform::new(f32::INFINITY).is_err());
    }

    #[test]
    fn empty_hash_is_unmined_claim() {
        let response = ClaimResponse::with_hash("");
        assert_eq!(
            response.disposition(),
            Ok(ClaimDisposition::UnclaimedPending)
        );
    }

    #[test]
    fn zero_hash_is_empty_claim_for_every_observed_length() {
        for length in [64, 68, 70] {
            let response = ClaimResponse::with_hash("0".repeat(length));
            assert_eq!(
                response.disposition(),
                Ok(ClaimDisposition::UnclaimedEmpty),
                "length {length}"
            );
        }
    }

    #[test]
    fn other_hashes_carry_content() {
        let hash = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
        assert_eq!(
            ClaimResponse::with_hash(hash).disposition(),
            Ok(ClaimDisposition::HasContent(hash.to_owned()))
        );
        assert_eq!(
            ClaimResponse::with_hash("00000000001").disposition(),
            Ok(ClaimDisposition::HasContent("00000000001".to_owned()))
        );
    }

    #[test]
    fn endpoint_errors_and_missing_results_fail_the_claim() {
        let rejected = ClaimResponse {
            result: Some("abc".to_owned()),
            error: Some(ClaimError {
                message: "parcel lookup failed".to_owned(),
                code: -32000,
            }),
        };
        assert!(matches!(
            rejected.disposition(),
            Err(FetchError::Network(message)) if message.contains("-32000")
        ));
        assert!(matches!(
            ClaimResponse::default().disposition(),
            Err(FetchError::Network(_))
        ));
    }

    #[test]
    fn claim_response_parses_json_rpc_body() {
        let body = r#"{"jsonrpc":"2.0","id":"7","result":""}"#;
        let response: ClaimResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(response.result.as_deref(), Some(""));
        assert!(response.error.is_none());

        let body = r#"{"id":1,"error":{"message":"boom","code":-1}}"#;
        let response: ClaimResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(response.result, None);
        assert_eq!(
            response.error,
            Some(ClaimError {
                message: "boom".to_owned(),
                code: -1,
            })
        );
    }

    #[test]
    fn labels_fall_back_to_empty_land() {
        let index = TileIndex::new(3, -2);
        assert_eq!(
            tile_label(index, &TileState::Named("Genesis Plaza".to_owned())),
            "Genesis Plaza (3:-2)"
        );
        assert_eq!(
            tile_label(index, &TileState::Unknown),
            "Empty Land (3:-2)"
        );
        assert_eq!(
            tile_label(
                index,
                &TileState::Failed(FetchError::Network("timeout".to_owned()))
            ),
            "Empty Land (3:-2)"
        );
    }

    #[test]
    fn only_resolved_states_are_terminal() {
        assert!(!TileState::Unknown.is_terminal());
        assert!(!TileState::Pending.is_terminal());
        assert!(TileState::UnclaimedPending.is_terminal());
        assert!(TileState::UnclaimedEmpty.is_terminal());
        assert!(TileState::Named("plaza".to_owned()).is_terminal());
        assert!(TileState::Failed(FetchError::Decode(DecodeError::new(
            DecodeErrorKind::Other,
            "bad"
        )))
        .is_terminal());
    }

    #[test]
    fn offsets_saturate_at_grid_edges() {
        let edge = TileIndex::new(i32::MAX, i32::MIN);
        assert_eq!(edge.offset(2, -2), edge);
        assert_eq!(
            TileIndex::new(1, 1).chebyshev_distance(TileIndex::new(-1, 2)),
            2
        );
    }

    #[test]
    fn tile_index_round_trips_through_bincode() {
        let index = TileIndex::new(-12, 40);
        let bytes = bincode::serialize(&index).expect("serialize");
        let restored: TileIndex = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, index);
    }
}
