use super::{Dataset, DatasetError, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

/// Train/test partitioning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOptions {
    /// Fraction of rows held out for testing, in `(0, 1)`.
    pub test_size: f64,
    /// Seed for the shuffle. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub shuffle: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_size: 0.25,
            seed: None,
            shuffle: true,
        }
    }
}

impl SplitOptions {
    pub fn test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

/// Partitions `dataset` into `(train, test)`.
///
/// The test side gets `ceil(test_size * n)` rows and the train side the rest;
/// both must end up non-empty. Rows are permuted without replacement, then the
/// first `n_test` go to the test set.
pub fn train_test_split(dataset: &Dataset, options: &SplitOptions) -> Result<(Dataset, Dataset)> {
    let n = dataset.len();
    if !(options.test_size > 0.0 && options.test_size < 1.0) {
        return Err(DatasetError::InvalidSplit(format!(
            "test_size must lie in (0, 1), got {}",
            options.test_size
        )));
    }
    let n_test = (options.test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DatasetError::InvalidSplit(format!(
            "{n} rows with test_size {} leave an empty side",
            options.test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    if options.shuffle {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        indices.shuffle(&mut rng);
    }
    let (test_idx, train_idx) = indices.split_at(n_test);

    log::debug!("split {n} rows into {} train / {} test", train_idx.len(), n_test);
    Ok((dataset.select_rows(train_idx), dataset.select_rows(test_idx)))
}
