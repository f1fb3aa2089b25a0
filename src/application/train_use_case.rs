// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Load tokenised pairs          (Layer 4 - data)
//   Step 2: Truncate, range-check ids   (Layer 3 - domain)
//   Step 3: Check targets vs y_dim        (Layer 2)
//   Step 4: Split train/validation        (Layer 4 - data)
//   Step 5: Save config                   (Layer 6 - infra)
//   Step 6: Run training loop             (Layer 5 - ml)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{dataset::PairDataset, loader::JsonlLoader, splitter::split_train_val};
use crate::domain::{pooling::Pooling, sample::TokenLimits, traits::SampleSource};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    encoder::TransformerEncoderConfig,
    loss::LossFn,
    model::CrossEncoderConfig,
    trainer::{run_training, TrainSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to rebuild the model and rerun training.
// Saved next to the checkpoints as train_config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    // ── Run ───────────────────────────────────────────────────────────────────
    pub train_file:     String,
    pub checkpoint_dir: String,
    pub batch_size:     usize,
    pub epochs:         usize,
    /// Learning rate for the encoder and categorical embeddings
    pub lr:             f64,
    /// Learning rate for the classification head
    pub head_lr:        f64,
    pub train_fraction: f64,
    pub seed:           u64,

    // ── Encoder ───────────────────────────────────────────────────────────────
    pub vocab_size:      usize,
    pub type_vocab_size: usize,
    pub max_seq_len:     usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,

    // ── Head ──────────────────────────────────────────────────────────────────
    pub pooling:          Pooling,
    pub loss:             LossFn,
    pub mask_val:         i64,
    pub y_dim:            Option<usize>,
    pub feature_dims:     Option<Vec<usize>>,
    pub emb_feature_dims: Option<Vec<usize>>,
    pub clf_hid_dim:      Option<usize>,
    pub dropout:          f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_file:     "data/train.jsonl".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            batch_size:     8,
            epochs:         5,
            lr:             2e-5,
            head_lr:        1e-3,
            train_fraction: 0.9,
            seed:           42,

            vocab_size:      30522,
            type_vocab_size: 2,
            max_seq_len:     512,
            d_model:         256,
            num_heads:       8,
            num_layers:      6,
            d_ff:            1024,

            pooling:          Pooling::Cls,
            loss:             LossFn::BceWithLogits,
            mask_val:         0,
            y_dim:            Some(30),
            feature_dims:     None,
            emb_feature_dims: None,
            clf_hid_dim:      None,
            dropout:          0.1,
        }
    }
}

impl TrainConfig {
    pub fn encoder_config(&self) -> TransformerEncoderConfig {
        TransformerEncoderConfig::new(
            self.vocab_size, self.max_seq_len, self.d_model,
            self.num_heads, self.num_layers, self.d_ff,
        )
        .with_type_vocab_size(self.type_vocab_size)
        .with_dropout(self.dropout)
    }

    pub fn head_config(&self) -> CrossEncoderConfig {
        CrossEncoderConfig::new(self.pooling)
            .with_mask_val(self.mask_val)
            .with_y_dim(self.y_dim)
            .with_feature_dims(self.feature_dims.clone())
            .with_emb_feature_dims(self.emb_feature_dims.clone())
            .with_clf_hid_dim(self.clf_hid_dim)
            .with_dropout(self.dropout)
    }

    /// Logit width the model will produce
    pub fn output_dim(&self) -> usize {
        self.y_dim.unwrap_or(1)
    }

    pub fn token_limits(&self) -> TokenLimits {
        TokenLimits {
            vocab_size:      self.vocab_size,
            type_vocab_size: self.type_vocab_size,
            feature_dims:    self.feature_dims.clone(),
        }
    }

    /// Reject settings that would only fail later inside a tensor op.
    pub fn check(&self) -> Result<()> {
        if self.max_seq_len == 0 {
            bail!("max_seq_len must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.mask_val < 0 || self.mask_val as usize >= self.vocab_size {
            bail!(
                "mask_val {} is not a token id (vocabulary size {})",
                self.mask_val,
                self.vocab_size
            );
        }
        self.head_config().categorical_dims()?;
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // Fail on inconsistent settings before touching any data
        cfg.check()?;

        // ── Step 1: Load samples ──────────────────────────────────────────────
        let loader  = JsonlLoader::new(&cfg.train_file);
        let samples = loader.load_all()?;

        // ── Step 2: Ids must index the embedding tables ───────────────────────
        let limits = cfg.token_limits();
        for s in &samples {
            s.check_ranges(&limits)
                .with_context(|| format!("'{}' does not fit the model", cfg.train_file))?;
        }

        // ── Truncate to the position-embedding limit ──────────────────────────
        let mut truncated = 0usize;
        let samples: Vec<_> = samples
            .into_iter()
            .filter(|s| s.is_labelled())
            .map(|mut s| {
                if s.truncate(cfg.max_seq_len) {
                    truncated += 1;
                }
                s
            })
            .collect();
        if truncated > 0 {
            tracing::info!("Truncated {} samples to {} tokens", truncated, cfg.max_seq_len);
        }
        if samples.is_empty() {
            bail!("'{}' has no labelled samples to train on", cfg.train_file);
        }

        // ── Step 3: Target width must match the head ──────────────────────────
        let dataset = PairDataset::new(samples);
        if let Some(dim) = dataset.target_dim() {
            if dim != cfg.output_dim() {
                bail!(
                    "Samples carry {} targets but the model outputs {} (set --y-dim)",
                    dim,
                    cfg.output_dim()
                );
            }
        }

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) =
            split_train_val(dataset.into_samples(), cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );
        if train_samples.is_empty() {
            bail!("Training split is empty; lower --train-fraction or add samples");
        }

        // ── Step 5: Save config for scoring ───────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(
            cfg,
            PairDataset::new(train_samples),
            PairDataset::new(val_samples),
            &ckpt_manager,
            &metrics,
        )
    }
}
