//! Restart scheduling shared by the iterative clusterers.
//!
//! Attempt `i` is seeded with `attempt_seed(base, i)` so every attempt can be
//! replayed on its own. Attempts run until `n_init` have succeeded or
//! `max_attempts` have been made; the attempt with the lowest inertia wins,
//! ties going to the lowest attempt index.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::core::Series;
use crate::error::{ClusterError, Result};
use crate::parallel::iter_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Attempts made with random initialization, at minimum.
pub const MIN_RANDOM_ATTEMPTS: usize = 10;

/// Seed of restart attempt `attempt`.
pub fn attempt_seed(base: u64, attempt: usize) -> u64 {
    base.wrapping_add(attempt as u64)
}

/// Pick `k` distinct series uniformly at random.
pub fn sample_initial(series: &[Series], k: usize, seed: u64) -> Vec<Series> {
    let mut rng = StdRng::seed_from_u64(seed);
    sample(&mut rng, series.len(), k)
        .into_iter()
        .map(|i| series[i].clone())
        .collect()
}

/// How many attempts to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RestartPlan {
    pub n_init: usize,
    pub max_attempts: usize,
}

impl RestartPlan {
    /// Explicit initial centroids allow exactly one attempt.
    pub fn single() -> Self {
        Self {
            n_init: 1,
            max_attempts: 1,
        }
    }

    /// Random initialization absorbs empty-cluster aborts with extra attempts.
    pub fn random(n_init: usize) -> Self {
        Self {
            n_init,
            max_attempts: n_init.max(MIN_RANDOM_ATTEMPTS),
        }
    }
}

/// Winning attempt and bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct RestartOutcome<T> {
    pub best_attempt: usize,
    pub best: T,
    pub n_attempts: usize,
    pub n_successful: usize,
}

/// Run restart attempts and keep the one with the lowest inertia.
///
/// Attempts that fail with a recoverable error are discarded; any other
/// error aborts immediately. With the `parallel` feature, the attempts still
/// needed run concurrently as one wave, which tries exactly the attempts the
/// sequential loop would.
///
/// # Errors
/// * [`ClusterError::NoSuccessfulInit`] if no attempt succeeds
/// * any unrecoverable error raised by `run`
pub(crate) fn run_restarts<T, R, I>(plan: RestartPlan, run: R, inertia: I) -> Result<RestartOutcome<T>>
where
    T: Send,
    R: Fn(usize) -> Result<T> + Sync + Send,
    I: Fn(&T) -> f64,
{
    let mut best: Option<(usize, T)> = None;
    let mut next_attempt = 0;
    let mut n_successful = 0;

    while n_successful < plan.n_init && next_attempt < plan.max_attempts {
        let wave = (plan.n_init - n_successful).min(plan.max_attempts - next_attempt);
        let results: Vec<(usize, Result<T>)> = iter_maybe_parallel!(next_attempt..next_attempt + wave)
            .map(|attempt| (attempt, run(attempt)))
            .collect();
        next_attempt += wave;

        for (attempt, result) in results {
            match result {
                Ok(outcome) => {
                    n_successful += 1;
                    let value = inertia(&outcome);
                    debug!(attempt, inertia = value, "attempt finished");
                    let improves = match &best {
                        Some((_, current)) => value.total_cmp(&inertia(current)).is_lt(),
                        None => true,
                    };
                    if improves {
                        best = Some((attempt, outcome));
                    }
                }
                Err(err) if err.is_recoverable() => {
                    warn!(attempt, error = %err, "attempt discarded");
                }
                Err(err) => return Err(err),
            }
        }
    }

    match best {
        Some((best_attempt, best)) => Ok(RestartOutcome {
            best_attempt,
            best,
            n_attempts: next_attempt,
            n_successful,
        }),
        None => Err(ClusterError::NoSuccessfulInit {
            attempts: next_attempt,
        }),
    }
}
