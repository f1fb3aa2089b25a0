// ============================================================
// Layer 3 — PairSample Domain Type
// ============================================================
// One question/answer pair, already tokenised.
//
// A pair can be shown to the encoder as several "segments":
// e.g. [CLS] title + question [SEP] answer [SEP] as segment 0,
// and the same text with question/answer swapped as segment 1.
// The model scores each segment separately and the losses are
// averaged, so every segment gets equal weight.
//
// Categorical features (category, host, ...) belong to the pair
// as a whole, not to any single segment.
//
// Example JSONL line:
//   {"id":"q17","segments":[{"tokens":[101,7592,102],
//    "token_types":[0,0,0]}],"features":[3,11],"targets":[0.66,1.0]}

use serde::{Deserialize, Serialize};

use crate::domain::error::SampleError;

/// Embedding table sizes every id in a sample must index into.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLimits {
    pub vocab_size:      usize,
    pub type_vocab_size: usize,
    /// Cardinality of each categorical feature
    pub feature_dims:    Option<Vec<usize>>,
}

/// One tokenised view of the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub tokens:      Vec<u32>,
    pub token_types: Vec<u32>,
}

/// A question/answer pair ready for batching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSample {
    /// Identifier carried through to the prediction file
    pub id: String,

    /// Tokenised views of the pair, in a fixed order
    pub segments: Vec<Segment>,

    /// Categorical feature indices, one per configured embedding table
    #[serde(default)]
    pub features: Option<Vec<u32>>,

    /// Soft labels in [0, 1], one per target dimension
    #[serde(default)]
    pub targets: Option<Vec<f32>>,
}

impl PairSample {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_labelled(&self) -> bool {
        self.targets.is_some()
    }

    /// Cut every segment to at most `max_len` tokens.
    /// Returns true if anything was cut.
    pub fn truncate(&mut self, max_len: usize) -> bool {
        let mut cut = false;
        for seg in &mut self.segments {
            if seg.tokens.len() > max_len {
                seg.tokens.truncate(max_len);
                seg.token_types.truncate(max_len);
                cut = true;
            }
        }
        cut
    }

    /// Check the invariants the batcher relies on.
    pub fn validate(&self) -> Result<(), SampleError> {
        if self.segments.is_empty() {
            return Err(SampleError::NoSegments(self.id.clone()));
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.tokens.is_empty() {
                return Err(SampleError::EmptySegment { id: self.id.clone(), segment: i });
            }
            if seg.tokens.len() != seg.token_types.len() {
                return Err(SampleError::TokenTypeLength {
                    id:          self.id.clone(),
                    segment:     i,
                    tokens:      seg.tokens.len(),
                    token_types: seg.token_types.len(),
                });
            }
        }
        Ok(())
    }

    /// Every token, token type and feature index must fall inside its
    /// embedding table. A sample without features passes here; the
    /// model rejects it later if it needs them.
    pub fn check_ranges(&self, limits: &TokenLimits) -> Result<(), SampleError> {
        for (i, seg) in self.segments.iter().enumerate() {
            if let Some(&token) = seg.tokens.iter().find(|&&t| t as usize >= limits.vocab_size) {
                return Err(SampleError::TokenOutOfRange {
                    id:         self.id.clone(),
                    segment:    i,
                    token,
                    vocab_size: limits.vocab_size,
                });
            }
            if let Some(&token_type) = seg.token_types.iter().find(|&&t| t as usize >= limits.type_vocab_size) {
                return Err(SampleError::TokenTypeOutOfRange {
                    id:              self.id.clone(),
                    segment:         i,
                    token_type,
                    type_vocab_size: limits.type_vocab_size,
                });
            }
        }

        let dims = limits.feature_dims.as_deref().unwrap_or(&[]);
        if let Some(features) = self.features.as_ref().filter(|_| !dims.is_empty()) {
            if features.len() != dims.len() {
                return Err(SampleError::FeatureCount {
                    id:       self.id.clone(),
                    features: features.len(),
                    expected: dims.len(),
                });
            }
            for (feature, (&value, &cardinality)) in features.iter().zip(dims).enumerate() {
                if value as usize >= cardinality {
                    return Err(SampleError::FeatureOutOfRange {
                        id: self.id.clone(),
                        feature,
                        value,
                        cardinality,
                    });
                }
            }
        }
        Ok(())
    }
}
