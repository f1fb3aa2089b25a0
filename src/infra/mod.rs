// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any one layer:
//
//   checkpoint.rs — Saving and loading model weights with
//                   Burn's CompactRecorder, plus the run's
//                   TrainConfig as JSON so scoring can rebuild
//                   the model.
//
//   metrics.rs    — The competition metric (mean column-wise
//                   Spearman) and the per-epoch CSV logger.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Spearman metric and training metrics CSV logger
pub mod metrics;
