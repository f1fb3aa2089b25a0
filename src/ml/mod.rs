// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here.
//
//   encoder.rs    — SequenceEncoder trait + a BERT-style
//                   TransformerEncoder (token, position and
//                   token-type embeddings, self-attention blocks)
//   pooling.rs    — cls / mean / max / mean_max over hidden states
//   head.rs       — Dropout → Linear [→ ReLU → Dropout → Linear]
//   loss.rs       — BCE-with-logits and MSE
//   model.rs      — CrossEncoderModel: encoder + categorical
//                   embeddings + head, the per-segment forward
//   trainer.rs    — Adam with separate head / encoder learning rates
//   inferencer.rs — rebuilds a checkpoint and scores pairs

/// Encoder abstraction and the transformer implementation
pub mod encoder;

/// Pooling over encoder hidden states
pub mod pooling;

/// Classification head
pub mod head;

/// Loss functions
pub mod loss;

/// The cross-encoder model wrapper
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads a checkpoint and scores pairs
pub mod inferencer;
