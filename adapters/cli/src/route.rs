use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Parses an observer position from `"x z"` or `"x y z"`.
///
/// Components may be separated by whitespace or commas. Returns `None` for
/// anything else, including non-finite values.
pub(crate) fn parse_position(line: &str) -> Option<Vec3> {
    let components: Vec<f32> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse::<f32>)
        .collect::<Result<_, _>>()
        .ok()?;

    let position = match components.as_slice() {
        [x, z] => Vec3::new(*x, 0.0, *z),
        [x, y, z] => Vec3::new(*x, *y, *z),
        _ => return None,
    };
    position.is_finite().then_some(position)
}

/// Seeded random walk standing in for a host that moves the observer.
///
/// The heading drifts a little every tick, so the walk wanders across tile
/// boundaries instead of jittering in place.
#[derive(Debug)]
pub(crate) struct Wander {
    rng: ChaCha8Rng,
    position: Vec3,
    heading: f32,
    step: f32,
    remaining: u32,
}

impl Wander {
    pub(crate) fn new(start: Vec3, steps: u32, step: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let heading = rng.gen_range(0.0..TAU);
        Self {
            rng,
            position: start,
            heading,
            step: step.abs(),
            remaining: steps,
        }
    }
}

impl Iterator for Wander {
    type Item = Vec3;

    fn next(&mut self) -> Option<Vec3> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        self.heading += self.rng.gen_range(-0.6..0.6);
        self.position += Vec3::new(self.heading.cos(), 0.0, self.heading.sin()) * self.step;
        Some(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_and_three_component_positions() {
        assert_eq!(parse_position("21 19"), Some(Vec3::new(21.0, 0.0, 19.0)));
        assert_eq!(
            parse_position(" 61.5, 2, -3 "),
            Some(Vec3::new(61.5, 2.0, -3.0))
        );
    }

    #[test]
    fn rejects_malformed_positions() {
        for line in ["", "12", "1 2 3 4", "north 3", "NaN 0", "inf 1"] {
            assert_eq!(parse_position(line), None, "{line:?}");
        }
    }

    #[test]
    fn walk_is_deterministic_and_bounded() {
        let first: Vec<Vec3> = Wander::new(Vec3::ZERO, 50, 12.0, 7).collect();
        let second: Vec<Vec3> = Wander::new(Vec3::ZERO, 50, 12.0, 7).collect();

        assert_eq!(first.len(), 50);
        assert_eq!(first, second);

        let mut previous = Vec3::ZERO;
        for position in first {
            assert!((position.distance(previous) - 12.0).abs() < 1e-3);
            assert_eq!(position.y, 0.0);
            previous = position;
        }
    }
}
