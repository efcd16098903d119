//! Random-source seam.
//!
//! All randomness flows through an explicit [`rand::Rng`] argument so that a
//! [`ChaCha8Rng`] seeded with [`seeded`] reproduces a run exactly. [`SamplingSource`]
//! names the sampling primitives the simulation consumes.

use crate::{SimulationError, SimulationResult};
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use rand_chacha::ChaCha8Rng;
use rand_core::RngCore;

/// Sampling primitives consumed by topology generation, attack sampling and DPHI
pub trait SamplingSource {
    /// Uniform choice of one element
    fn choose_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>;

    /// `amount` distinct indices from `0..population`, in random order
    fn choose_distinct(&mut self, population: usize, amount: usize) -> SimulationResult<Vec<usize>>;

    /// Uniform real in `[low, high]`
    fn uniform_real(&mut self, low: f64, high: f64) -> SimulationResult<f64>;
}

impl<R: Rng + ?Sized> SamplingSource for R {
    fn choose_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(self)
    }

    fn choose_distinct(&mut self, population: usize, amount: usize) -> SimulationResult<Vec<usize>> {
        if amount > population {
            return Err(SimulationError::DegeneratePopulation {
                population,
                required: amount,
            });
        }
        Ok(index::sample(self, population, amount).into_vec())
    }

    fn uniform_real(&mut self, low: f64, high: f64) -> SimulationResult<f64> {
        if !(low.is_finite() && high.is_finite()) || low > high {
            return Err(SimulationError::InvalidConfig(format!(
                "invalid sampling bounds [{}, {}]",
                low, high
            )));
        }
        Ok(Uniform::new_inclusive(low, high).sample(self))
    }
}

/// Deterministic source for reproducible runs
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Source seeded from OS entropy
pub fn from_entropy() -> ChaCha8Rng {
    ChaCha8Rng::from_entropy()
}

/// Draw one independent stream seed per trial from the master source
pub fn trial_seeds<R: RngCore + ?Sized>(master: &mut R, trials: usize) -> Vec<u64> {
    (0..trials).map(|_| master.next_u64()).collect()
}
