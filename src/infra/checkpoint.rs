// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved per run:
//   1. Model weights (.mpk.gz file) — encoder, embeddings, head
//   2. latest_epoch.json            — which epoch was last saved
//   3. best_epoch.json              — epoch with the best validation
//                                     spearman; scoring loads this one
//   4. train_config.json            — architecture + hyperparameters
//
// The config is saved separately because the weights alone cannot
// rebuild the model: scoring needs d_model, pooling, y_dim, the
// categorical feature sizes, etc. before it can load a record.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     latest_epoch.json
//     best_epoch.json
//     train_config.json
//     metrics.csv            (written by MetricsLogger)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights for a given epoch and point latest_epoch.json at them.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        // The recorder adds the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Record `epoch` as the one scoring should use.
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        let path = self.dir.join("best_epoch.json");
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write best_epoch.json")?;
        tracing::debug!("Best checkpoint is now epoch {}", epoch);
        Ok(())
    }

    /// best_epoch.json when present, otherwise the latest epoch.
    pub fn scoring_epoch(&self) -> Result<usize> {
        let path = self.dir.join("best_epoch.json");
        match fs::read_to_string(&path) {
            Ok(s)  => serde_json::from_str::<usize>(&s)
                .with_context(|| format!("'{}' is not an epoch number", path.display())),
            Err(_) => self.latest_epoch(),
        }
    }

    /// Load the scoring checkpoint (see scoring_epoch) into `model`.
    ///
    /// `model` must have the same architecture as the checkpoint;
    /// build it from load_config() first.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.scoring_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Must be called before training starts so scoring can rebuild
    /// the exact architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'score'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid training config", path.display()))
    }

    /// Returns an error if training hasn't been run yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| {
                "Cannot find 'latest_epoch.json'. \
                 Have you run 'train' first?"
            })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
