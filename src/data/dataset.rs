use burn::data::dataset::Dataset;

use crate::domain::sample::PairSample;

pub struct PairDataset {
    samples: Vec<PairSample>,
}

impl PairDataset {
    pub fn new(samples: Vec<PairSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Width of the target vector. JsonlLoader keeps it the same for
    /// every labelled sample, so the first one is representative.
    pub fn target_dim(&self) -> Option<usize> {
        self.samples.iter().find_map(|s| s.targets.as_ref().map(Vec::len))
    }

    pub fn into_samples(self) -> Vec<PairSample> {
        self.samples
    }
}

impl Dataset<PairSample> for PairDataset {
    fn get(&self, index: usize) -> Option<PairSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
