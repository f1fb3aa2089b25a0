// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<PairSample>
// into the tensors the cross-encoder expects.
//
// Segments are batched independently:
//   segment s of every sample → tokens[s], token_types[s]
//   each of shape [batch_size, longest_in_batch]
//
// Unlike fixed-length pipelines, samples arrive unpadded, so
// padding happens here, per segment:
//   tokens      padded with mask_val (the model's padding id)
//   token_types padded with 0
//
// Features and targets are whole-pair values, so they become one
// [batch_size, n] tensor each — or None when any sample lacks them.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::PairSample;
use crate::ml::model::CrossEncoderBatch;

// ─── PairBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Sample ids, in batch order
    pub ids: Vec<String>,

    /// Model inputs
    pub inputs: CrossEncoderBatch<B>,

    /// Soft labels — shape: [batch_size, y_dim]
    pub targets: Option<Tensor<B, 2>>,
}

// ─── PairBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    /// Device used when batching outside a DataLoader
    pub device: B::Device,

    /// Token id used to pad short sequences
    pub mask_val: i64,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device, mask_val: i64) -> Self {
        Self { device, mask_val }
    }

    /// Batch on the batcher's own device.
    pub fn batch_on_device(&self, items: Vec<PairSample>) -> PairBatch<B> {
        self.stack(items, &self.device)
    }

    fn stack(&self, items: Vec<PairSample>, device: &B::Device) -> PairBatch<B> {
        let batch_size = items.len();
        let n_segments = items[0].segments.len();

        let mut tokens      = Vec::with_capacity(n_segments);
        let mut token_types = Vec::with_capacity(n_segments);

        for s in 0..n_segments {
            let seq_len = items
                .iter()
                .map(|it| it.segments[s].tokens.len())
                .max()
                .unwrap_or(0);

            let mut tok_flat:  Vec<i32> = Vec::with_capacity(batch_size * seq_len);
            let mut type_flat: Vec<i32> = Vec::with_capacity(batch_size * seq_len);
            for it in &items {
                let seg = &it.segments[s];
                let pad = seq_len - seg.tokens.len();
                tok_flat.extend(seg.tokens.iter().map(|&x| x as i32));
                tok_flat.extend(std::iter::repeat(self.mask_val as i32).take(pad));
                type_flat.extend(seg.token_types.iter().map(|&x| x as i32));
                type_flat.extend(std::iter::repeat(0).take(pad));
            }

            tokens.push(
                Tensor::<B, 1, Int>::from_ints(tok_flat.as_slice(), device)
                    .reshape([batch_size, seq_len]),
            );
            token_types.push(
                Tensor::<B, 1, Int>::from_ints(type_flat.as_slice(), device)
                    .reshape([batch_size, seq_len]),
            );
        }

        // ── Whole-pair values ─────────────────────────────────────────────────
        let features = stack_rows(&items, |it| it.features.as_ref())
            .map(|(flat, width)| {
                let flat: Vec<i32> = flat.into_iter().map(|x| x as i32).collect();
                Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
                    .reshape([batch_size, width])
            });

        let targets = stack_rows(&items, |it| it.targets.as_ref())
            .map(|(flat, width)| {
                Tensor::<B, 1>::from_floats(flat.as_slice(), device)
                    .reshape([batch_size, width])
            });

        PairBatch {
            ids: items.into_iter().map(|it| it.id).collect(),
            inputs: CrossEncoderBatch { tokens, token_types, features },
            targets,
        }
    }
}

/// Flatten one row per sample; None unless every sample has a row.
fn stack_rows<T: Copy>(
    items: &[PairSample],
    row:   impl Fn(&PairSample) -> Option<&Vec<T>>,
) -> Option<(Vec<T>, usize)> {
    let rows: Option<Vec<&Vec<T>>> = items.iter().map(row).collect();
    let rows  = rows?;
    let width = rows.first().map(|r| r.len())?;
    Some((rows.into_iter().flatten().copied().collect(), width))
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<B, PairSample, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairSample>, device: &B::Device) -> PairBatch<B> {
        self.stack(items, device)
    }
}
