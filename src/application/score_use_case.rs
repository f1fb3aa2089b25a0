// ============================================================
// Layer 2 — Score Use Case
// ============================================================
// Load pairs → score them with the trained model → write
// one CSV row per pair:
//
//   id,score_0,score_1,...
//   q17,0.912301,0.004120,...

use anyhow::{Context, Result};
use std::{fs, io::Write, path::PathBuf};

use crate::data::loader::JsonlLoader;
use crate::domain::traits::{PairScorer, SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

type ScoreBackend = burn::backend::Wgpu;

pub struct ScoreUseCase<S: PairScorer> {
    scorer: S,
}

impl ScoreUseCase<Inferencer<ScoreBackend>> {
    /// Rebuild the model saved in `checkpoint_dir`.
    pub fn from_checkpoint(checkpoint_dir: impl Into<PathBuf>) -> Result<Self> {
        let ckpt   = CheckpointManager::new(checkpoint_dir)?;
        let device = burn::backend::wgpu::WgpuDevice::default();
        Ok(Self::new(Inferencer::from_checkpoint(&ckpt, device)?))
    }
}

impl<S: PairScorer> ScoreUseCase<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    /// Score every sample in `input` and write CSV to `output`
    /// (stdout when None). Returns the number of rows written.
    pub fn execute(&self, input: impl Into<PathBuf>, output: Option<PathBuf>) -> Result<usize> {
        let samples = JsonlLoader::new(input).load_all()?;
        let scores  = self.scorer.score(&samples)?;

        let ids: Vec<&str> = samples.iter().map(|s| s.id.as_str()).collect();
        let csv = render_csv(&ids, &scores);

        match output {
            Some(path) => {
                fs::write(&path, csv)
                    .with_context(|| format!("Cannot write predictions to '{}'", path.display()))?;
                tracing::info!("Wrote {} predictions to '{}'", scores.len(), path.display());
            }
            None => {
                std::io::stdout().write_all(csv.as_bytes())?;
            }
        }
        Ok(scores.len())
    }
}

fn render_csv(ids: &[&str], scores: &[Vec<f32>]) -> String {
    let width = scores.first().map_or(0, Vec::len);

    let mut out = String::from("id");
    for c in 0..width {
        out.push_str(&format!(",score_{c}"));
    }
    out.push('\n');

    for (id, row) in ids.iter().zip(scores) {
        out.push_str(id);
        for v in row {
            out.push_str(&format!(",{v:.6}"));
        }
        out.push('\n');
    }
    out
}
