// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a .jsonl file of tokenised pairs to tensor batches.
//
//   samples.jsonl
//       │
//       ▼
//   JsonlLoader   → parses and validates PairSamples
//       │
//       ▼
//   split_train_val → seeded train / validation split
//       │
//       ▼
//   PairDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   PairBatcher   → pads segments, stacks features/targets
//       │
//       ▼
//   DataLoader    → feeds batches to the training loop

/// Reads PairSamples from JSON Lines
pub mod loader;

/// Implements Burn's Dataset trait for pair samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
