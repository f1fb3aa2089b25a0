// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to sample sources through a
// trait so a different storage format (CSV, parquet, an HTTP
// feed) can be dropped in without touching the use cases.
//
// The encoder abstraction is NOT here: it carries Burn tensor
// types, so it lives in ml::encoder.

use anyhow::Result;

use crate::domain::sample::PairSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce tokenised pair samples.
///
/// Implementations:
///   - JsonlLoader → one JSON object per line
pub trait SampleSource {
    /// Load every sample, validated.
    fn load_all(&self) -> Result<Vec<PairSample>>;
}

// ─── PairScorer ───────────────────────────────────────────────────────────────
/// Any component that turns samples into per-target scores.
///
/// Implementations:
///   - Inferencer → runs the trained cross-encoder
pub trait PairScorer {
    /// One row of scores per sample, in input order.
    fn score(&self, samples: &[PairSample]) -> Result<Vec<Vec<f32>>>;
}
