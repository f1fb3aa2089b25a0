// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
// Discriminative learning rates:
//   The encoder is (in practice) pretrained and the head is
//   fresh, so the head wants a much larger step. After each
//   backward pass the head's gradients are split off with
//   model.head_gradients() and stepped with head_lr; whatever
//   remains (encoder, categorical embeddings) is stepped with lr.
//   One Adam instance serves both — its state is per parameter,
//   and the two gradient sets never overlap.
//
// Validation runs on model.valid(): the inner (non-autodiff)
// backend, where dropout is a no-op.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::{AutodiffModule, Ignored},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::PairBatcher, dataset::PairDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{mean_spearman, EpochMetrics, MetricsLogger},
};
use crate::ml::{
    encoder::TransformerEncoder,
    inferencer::{mean_logits, rows},
    loss::LossFn,
    model::CrossEncoderModel,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub type QaModel<B> = CrossEncoderModel<B, TransformerEncoder<B>, Ignored<LossFn>>;

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub epochs:          usize,
    pub best_epoch:      usize,
    pub best_spearman:   f64,
    pub last_train_loss: f64,
}

/// Build the encoder + head described by `cfg`.
pub fn build_model<B: Backend>(cfg: &TrainConfig, device: &B::Device) -> Result<QaModel<B>> {
    let encoder = cfg.encoder_config().init(device);
    Ok(cfg.head_config().init(encoder, cfg.loss, device)?)
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: PairDataset,
    val_dataset:   PairDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, metrics, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: PairDataset,
    val_dataset:   PairDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainSummary> {
    if cfg.epochs == 0 {
        bail!("epochs must be at least 1");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: QaModel<B> = build_model(cfg, &device)?;
    tracing::info!(
        "Model ready: {} layers, d_model={}, pooling={}, {} params ({} in head)",
        cfg.num_layers,
        cfg.d_model,
        cfg.pooling,
        model.num_params(),
        model.num_head_params(),
    );
    tracing::info!(
        "Training on {} samples, validating on {}",
        train_dataset.sample_count(),
        val_dataset.sample_count()
    );

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone(), cfg.mask_val))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // Validation uses the inner backend — no autodiff overhead
    let val_loader = DataLoaderBuilder::new(PairBatcher::<B::InnerBackend>::new(device.clone(), cfg.mask_val))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut summary = TrainSummary {
        epochs:          cfg.epochs,
        best_epoch:      0,
        best_spearman:   f64::NEG_INFINITY,
        last_train_loss: f64::NAN,
    };

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let Some(targets) = batch.targets else {
                tracing::warn!("Skipping training batch without targets");
                continue;
            };

            let output = model.forward(batch.inputs, Some(std::slice::from_ref(&targets)))?;
            train_loss_sum += output.loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let mut grads  = output.loss.backward();
            let head_grads = model.head_gradients(&mut grads);
            let rest_grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.head_lr, model, head_grads);
            model = optim.step(cfg.lr, model, rest_grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut val_preds:   Vec<Vec<f32>> = Vec::new();
        let mut val_targets: Vec<Vec<f32>> = Vec::new();

        for batch in val_loader.iter() {
            let Some(targets) = batch.targets else { continue };

            let output = model_valid.forward(batch.inputs, Some(std::slice::from_ref(&targets)))?;
            val_loss_sum += output.loss.into_scalar().elem::<f64>();
            val_batches  += 1;

            val_preds.extend(rows(mean_logits(&output.logits)?)?);
            val_targets.extend(rows(targets)?);
        }

        let avg_val_loss = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let spearman     = if val_preds.is_empty() { 0.0 } else { mean_spearman(&val_preds, &val_targets) };

        let m = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, spearman);
        metrics.log(&m)?;

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | spearman={:.4}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, spearman,
        );

        summary.last_train_loss = avg_train_loss;

        ckpt_manager.save_model::<B, _>(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        // score loads this epoch, not the last one
        if m.is_improvement(summary.best_spearman) {
            summary.best_spearman = spearman;
            summary.best_epoch    = epoch;
            ckpt_manager.mark_best(epoch)?;
        }
    }

    tracing::info!(
        "Training complete! Best spearman {:.4} at epoch {}",
        summary.best_spearman, summary.best_epoch
    );
    Ok(summary)
}
