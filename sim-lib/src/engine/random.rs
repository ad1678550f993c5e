use std::{fmt, ops::Range, sync::Arc};

use parking_lot::Mutex;
use rand::{RngExt as _, SeedableRng as _, rngs::StdRng};

/// Source of uniform integer draws used by the engine.
///
/// Implementations must be safe to share between concurrently
/// handled requests without correlating their draws.
pub trait RandomSource: Send + Sync + 'static {
    /// Draw a uniform value within `range`, exclusive of the upper bound.
    ///
    /// Callers guarantee the range is not empty.
    fn random_range(&self, range: Range<u64>) -> u64;
}

impl<R: RandomSource> RandomSource for Arc<R> {
    #[inline(always)]
    fn random_range(&self, range: Range<u64>) -> u64 {
        (**self).random_range(range)
    }
}

/// [`RandomSource`] backed by the thread-local generator of [`rand`].
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct ThreadRandom;

impl ThreadRandom {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for ThreadRandom {
    #[inline(always)]
    fn random_range(&self, range: Range<u64>) -> u64 {
        rand::rng().random_range(range)
    }
}

/// Deterministic [`RandomSource`], reproducible for a given seed.
///
/// Concurrent callers serialize on the inner generator, so the
/// sequence of draws is shared (not duplicated) across requests.
pub struct SeededRandom {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandom")
            .field("seed", &self.seed)
            .finish()
    }
}

impl RandomSource for SeededRandom {
    fn random_range(&self, range: Range<u64>) -> u64 {
        self.rng.lock().random_range(range)
    }
}

/// Either a thread-local or a seeded source, picked at process start.
#[derive(Debug, Clone)]
pub enum ProcessRandom {
    Thread(ThreadRandom),
    Seeded(Arc<SeededRandom>),
}

impl ProcessRandom {
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::Seeded(Arc::new(SeededRandom::new(seed))),
            None => Self::Thread(ThreadRandom::new()),
        }
    }
}

impl RandomSource for ProcessRandom {
    fn random_range(&self, range: Range<u64>) -> u64 {
        match self {
            Self::Thread(random) => random.random_range(range),
            Self::Seeded(random) => random.random_range(range),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use self::scripted::ScriptedRandom;

#[cfg(any(test, feature = "test-utils"))]
mod scripted {
    use std::{collections::VecDeque, ops::Range};

    use parking_lot::Mutex;

    use super::RandomSource;

    /// Replays a fixed list of draws, in order.
    ///
    /// Panics when a value falls outside the requested range
    /// or when more draws are made than were scripted.
    #[derive(Debug, Default)]
    pub struct ScriptedRandom {
        draws: Mutex<VecDeque<u64>>,
    }

    impl ScriptedRandom {
        pub fn new(draws: impl IntoIterator<Item = u64>) -> Self {
            Self {
                draws: Mutex::new(draws.into_iter().collect()),
            }
        }

        pub fn remaining(&self) -> usize {
            self.draws.lock().len()
        }
    }

    impl RandomSource for ScriptedRandom {
        fn random_range(&self, range: Range<u64>) -> u64 {
            let Some(value) = self.draws.lock().pop_front() else {
                panic!("ScriptedRandom: no draw left for range {range:?}");
            };
            assert!(
                range.contains(&value),
                "ScriptedRandom: scripted draw {value} outside of range {range:?}"
            );
            value
        }
    }
}
