#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frontier expansion system that reserves the tiles surrounding the observer.

use landstream_core::TileIndex;
use landstream_world::WorldGrid;
use tracing::debug;

/// Outer ring radius expanded around a visited tile.
pub const DEFAULT_RADIUS: u32 = 2;

/// Largest radius accepted by [`Config::new`].
pub const MAX_RADIUS: u32 = 16;

/// Enumerates the offsets lying exactly `radius` tiles away in Chebyshev
/// distance, i.e. the square ring of side `2 * radius + 1`.
///
/// Radius zero is the center itself and yields no offsets.
#[must_use]
pub fn ring_offsets(radius: u32) -> Vec<(i32, i32)> {
    let Ok(radius) = i32::try_from(radius) else {
        return Vec::new();
    };
    if radius == 0 {
        return Vec::new();
    }

    let mut offsets = Vec::with_capacity(8 * radius as usize);
    for dz in -radius..=radius {
        for dx in -radius..=radius {
            if dx.abs().max(dz.abs()) == radius {
                offsets.push((dx, dz));
            }
        }
    }
    offsets
}

/// Configuration parameters required to construct the expansion system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    radius: u32,
}

impl Config {
    /// Creates a configuration expanding every ring up to `radius`.
    ///
    /// Radii above [`MAX_RADIUS`] are clamped.
    #[must_use]
    pub fn new(radius: u32) -> Self {
        Self {
            radius: radius.min(MAX_RADIUS),
        }
    }

    /// Outermost ring expanded around a center.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
        }
    }
}

/// Pure system that reserves the neighborhood of a tile in the world grid.
#[derive(Clone, Debug)]
pub struct Expansion {
    offsets: Vec<(i32, i32)>,
}

impl Default for Expansion {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Expansion {
    /// Creates an expansion covering rings `1..=config.radius()`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let offsets = (1..=config.radius()).flat_map(ring_offsets).collect();
        Self { offsets }
    }

    /// Offsets of every candidate neighbor, center excluded.
    #[must_use]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Candidate neighbors of `center`.
    pub fn candidates(&self, center: TileIndex) -> impl Iterator<Item = TileIndex> + '_ {
        self.offsets
            .iter()
            .map(move |&(dx, dz)| center.offset(dx, dz))
    }

    /// Reserves every candidate neighbor of `center` that the grid has not
    /// seen yet and returns the reserved tiles, which the caller must fetch.
    ///
    /// Expanding the same center twice returns nothing the second time.
    pub fn expand(&self, center: TileIndex, grid: &WorldGrid) -> Vec<TileIndex> {
        let reserved: Vec<TileIndex> = self
            .candidates(center)
            .filter(|&candidate| candidate != center && grid.try_reserve(candidate))
            .collect();
        debug!(%center, reserved = reserved.len(), "expanded frontier");
        reserved
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn rings_have_expected_sizes() {
        assert!(ring_offsets(0).is_empty());
        assert_eq!(ring_offsets(1).len(), 8);
        assert_eq!(ring_offsets(2).len(), 16);
        assert_eq!(ring_offsets(3).len(), 24);
    }

    #[test]
    fn default_expansion_covers_two_rings_without_center() {
        let expansion = Expansion::default();
        let offsets: HashSet<(i32, i32)> = expansion.offsets().iter().copied().collect();

        assert_eq!(expansion.offsets().len(), 24);
        assert_eq!(offsets.len(), 24, "offsets must be unique");
        assert!(!offsets.contains(&(0, 0)));

        let mut expected = HashSet::new();
        for dx in -2..=2 {
            for dz in -2..=2 {
                if (dx, dz) != (0, 0) {
                    let _ = expected.insert((dx, dz));
                }
            }
        }
        assert_eq!(offsets, expected);
    }

    #[test]
    fn radius_is_clamped() {
        assert_eq!(Config::new(1_000).radius(), MAX_RADIUS);
        assert!(Expansion::new(Config::new(0)).offsets().is_empty());
    }
}
