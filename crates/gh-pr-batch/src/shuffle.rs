//! Ordering of repositories for owner-wide operations

use gh_client::Repository;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Mutex, PoisonError};

/// Reorders repositories in place before an owner-wide batch
///
/// Implementations must only permute: no repository may be added,
/// dropped, or duplicated.
pub trait Shuffler: Send + Sync {
    fn shuffle(&self, repositories: &mut [Repository]);
}

/// Uniform shuffle from the thread-local generator
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShuffler;

impl Shuffler for RandomShuffler {
    fn shuffle(&self, repositories: &mut [Repository]) {
        repositories.shuffle(&mut rand::thread_rng());
    }
}

/// Reproducible shuffle driven by a fixed seed
#[derive(Debug)]
pub struct SeededShuffler {
    rng: Mutex<StdRng>,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Shuffler for SeededShuffler {
    fn shuffle(&self, repositories: &mut [Repository]) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        repositories.shuffle(&mut *rng);
    }
}

/// Leaves the listing order untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepOrder;

impl Shuffler for KeepOrder {
    fn shuffle(&self, _repositories: &mut [Repository]) {}
}
