// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained model from train_config.json + the best
// checkpoint and scores pairs.
//
// A pair's score is the mean of its segments' logits, squashed
// with a sigmoid when the model was trained on logits (BCE).
use anyhow::{anyhow, Context, Result};
use burn::prelude::*;

use crate::data::batcher::PairBatcher;
use crate::domain::{
    sample::{PairSample, TokenLimits},
    traits::PairScorer,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::{build_model, QaModel};

/// Average the per-segment logits: [batch, y_dim].
pub fn mean_logits<B: Backend>(logits: &[Tensor<B, 2>]) -> Result<Tensor<B, 2>> {
    let n = logits.len();
    logits
        .iter()
        .cloned()
        .reduce(|acc, l| acc + l)
        .map(|sum| sum.div_scalar(n as f64))
        .ok_or_else(|| anyhow!("Model returned no segment logits"))
}

/// [batch, width] tensor → one Vec per row.
pub fn rows<B: Backend>(t: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, width] = t.dims();
    let flat = t
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read scores: {e:?}"))?;
    Ok(flat.chunks(width.max(1)).map(<[f32]>::to_vec).collect())
}

pub struct Inferencer<B: Backend> {
    model:         QaModel<B>,
    batcher:       PairBatcher<B>,
    batch_size:    usize,
    max_seq_len:   usize,
    limits:        TokenLimits,
    apply_sigmoid: bool,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        cfg.check()?;
        let model = build_model::<B>(&cfg, &device)?;
        let model = ckpt_manager.load_model::<B, _>(model, &device)?;
        tracing::info!("Model loaded from checkpoint ({} outputs)", cfg.output_dim());

        Ok(Self {
            apply_sigmoid: model.loss().outputs_logits(),
            limits:        cfg.token_limits(),
            batcher:       PairBatcher::new(device, cfg.mask_val),
            batch_size:    cfg.batch_size.max(1),
            max_seq_len:   cfg.max_seq_len,
            model,
        })
    }

    pub fn predict(&self, samples: &[PairSample]) -> Result<Vec<Vec<f32>>> {
        for s in samples {
            s.check_ranges(&self.limits)
                .context("Sample does not fit the trained model")?;
        }

        let mut scores = Vec::with_capacity(samples.len());

        for chunk in samples.chunks(self.batch_size) {
            let items: Vec<PairSample> = chunk
                .iter()
                .cloned()
                .map(|mut s| {
                    s.truncate(self.max_seq_len);
                    s
                })
                .collect();

            let batch  = self.batcher.batch_on_device(items);
            let output = self.model.forward(batch.inputs, None)?;

            let mut logits = mean_logits(&output.logits)?;
            if self.apply_sigmoid {
                logits = burn::tensor::activation::sigmoid(logits);
            }
            scores.extend(rows(logits)?);
        }

        tracing::debug!("Scored {} samples", scores.len());
        Ok(scores)
    }
}

impl<B: Backend> PairScorer for Inferencer<B> {
    fn score(&self, samples: &[PairSample]) -> Result<Vec<Vec<f32>>> {
        self.predict(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::domain::sample::Segment;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_mean_logits() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0]], &device);
        let b = Tensor::<TestBackend, 2>::from_floats([[3.0, 6.0]], &device);
        let mean = rows(mean_logits(&[a, b]).unwrap()).unwrap();
        assert_eq!(mean, vec![vec![2.0, 4.0]]);
    }

    #[test]
    fn test_rows_splits_by_width() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], &device);
        assert_eq!(rows(t).unwrap(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_scores_from_saved_checkpoint() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let cfg    = TrainConfig {
            vocab_size:  20,
            max_seq_len: 4,
            d_model:     8,
            num_heads:   2,
            num_layers:  1,
            d_ff:        16,
            y_dim:       Some(3),
            ..TrainConfig::default()
        };
        ckpt.save_config(&cfg).unwrap();
        let model = build_model::<TestBackend>(&cfg, &device).unwrap();
        ckpt.save_model::<TestBackend, _>(&model, 1).unwrap();

        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, device).unwrap();
        let samples: Vec<PairSample> = (0..3)
            .map(|i| PairSample {
                id: format!("p{i}"),
                // Longer than max_seq_len: must be truncated, not panic
                segments: vec![Segment { tokens: vec![1, 2, 3, 4, 5, 6], token_types: vec![0; 6] }],
                features: None,
                targets:  None,
            })
            .collect();

        let scores = inferencer.score(&samples).unwrap();
        assert_eq!(scores.len(), 3);
        for row in &scores {
            assert_eq!(row.len(), 3);
            // BCE default → sigmoid applied
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }

        // vocab_size is 20: id 20 has no embedding row
        let outside = PairSample {
            id:       "bad".into(),
            segments: vec![Segment { tokens: vec![1, 20], token_types: vec![0, 0] }],
            features: None,
            targets:  None,
        };
        let err = inferencer.score(&[outside]).unwrap_err();
        assert!(format!("{err:#}").contains("token id 20"));
    }
}
