//! Pluggable randomness: which site each trial targets, and where the
//! agent is on each tick.

use rand::Rng;
use rewardmap_core::RewardSite;
use std::time::Duration;

/// Picks a site index in `0..len`; `len` is never zero.
pub trait SiteSampler {
    fn sample(&mut self, len: usize) -> usize;
}

impl<F: FnMut(usize) -> usize> SiteSampler for F {
    fn sample(&mut self, len: usize) -> usize {
        self(len)
    }
}

/// Independent uniform draws with replacement.
#[derive(Debug, Clone)]
pub struct UniformSampler<R> {
    rng: R,
}

impl<R: Rng> UniformSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SiteSampler for UniformSampler<R> {
    fn sample(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Source of the agent position observed on each tracking tick.
pub trait PositionSource {
    /// Called once per trial before its first tick.
    fn reset(&mut self, _target: RewardSite) {}

    fn next_position(&mut self, target: RewardSite, elapsed: Duration) -> (i32, i32);
}

impl<F: FnMut(RewardSite, Duration) -> (i32, i32)> PositionSource for F {
    fn next_position(&mut self, target: RewardSite, elapsed: Duration) -> (i32, i32) {
        self(target, elapsed)
    }
}

/// Stand-in for a tracker: starts somewhere near the target and drifts
/// one pixel down and right per tick.
#[derive(Debug, Clone)]
pub struct DriftingPosition<R> {
    rng: R,
    spread: i32,
    current: (i32, i32),
}

impl<R: Rng> DriftingPosition<R> {
    pub const DEFAULT_SPREAD: i32 = 200;

    pub fn new(rng: R) -> Self {
        Self::with_spread(rng, Self::DEFAULT_SPREAD)
    }

    pub fn with_spread(rng: R, spread: i32) -> Self {
        Self {
            rng,
            spread: spread.max(0),
            current: (0, 0),
        }
    }
}

impl<R: Rng> PositionSource for DriftingPosition<R> {
    fn reset(&mut self, target: RewardSite) {
        let (dx, dy) = if self.spread > 0 {
            (
                self.rng.random_range(-self.spread..self.spread),
                self.rng.random_range(-self.spread..self.spread),
            )
        } else {
            (0, 0)
        };
        self.current = (target.x + dx, target.y + dy);
    }

    fn next_position(&mut self, _target: RewardSite, _elapsed: Duration) -> (i32, i32) {
        self.current.0 += 1;
        self.current.1 += 1;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_sampler_stays_in_range() {
        let mut sampler = UniformSampler::new(StdRng::seed_from_u64(7));
        for len in 1..20 {
            assert!(sampler.sample(len) < len);
        }
    }

    #[test]
    fn closures_are_samplers() {
        let mut calls = 0;
        let mut sampler = |len: usize| {
            calls += 1;
            len - 1
        };
        assert_eq!(SiteSampler::sample(&mut sampler, 4), 3);
        assert_eq!(calls, 1);
    }

    #[test]
    fn drifting_position_starts_near_target_and_walks_diagonally() {
        let target = RewardSite::new(500, 400);
        let mut source = DriftingPosition::new(StdRng::seed_from_u64(1));
        source.reset(target);

        let first = source.next_position(target, Duration::ZERO);
        assert!((first.0 - target.x).abs() <= 201);
        assert!((first.1 - target.y).abs() <= 201);

        let second = source.next_position(target, Duration::from_millis(1));
        assert_eq!(second, (first.0 + 1, first.1 + 1));
    }

    #[test]
    fn zero_spread_starts_on_target() {
        let target = RewardSite::new(10, 10);
        let mut source = DriftingPosition::with_spread(StdRng::seed_from_u64(1), 0);
        source.reset(target);
        assert_eq!(source.next_position(target, Duration::ZERO), (11, 11));
    }
}
