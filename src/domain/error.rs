// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// The model wrapper checks a handful of things before handing
// work to Burn. Anything it can't check (tensor shapes inside a
// batch) still surfaces as a Burn panic.
//
// The pipeline layers wrap these in anyhow::Error.

use thiserror::Error;

/// Errors raised while building or running the cross-encoder head.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeadError {
    #[error("unknown pooling strategy '{0}' (expected cls, mean, max or mean_max)")]
    UnknownPooling(String),

    #[error(
        "categorical features need both cardinalities and embedding widths \
         of equal length (got {feature_dims:?} and {emb_dims:?})"
    )]
    FeatureConfigMismatch {
        feature_dims: Option<usize>,
        emb_dims:     Option<usize>,
    },

    #[error("categorical embeddings are configured but the batch has no feature matrix")]
    MissingFeatures,

    #[error("batch has {tokens} token segments but {token_types} token-type segments")]
    SegmentMismatch { tokens: usize, token_types: usize },

    #[error("batch has no segments")]
    EmptyBatch,

    #[error("targets were given but the list is empty")]
    EmptyTargets,
}

/// Errors raised while validating a single pair sample.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("sample '{0}' has no segments")]
    NoSegments(String),

    #[error("sample '{id}' segment {segment} is empty")]
    EmptySegment { id: String, segment: usize },

    #[error("sample '{id}' segment {segment}: {tokens} tokens but {token_types} token types")]
    TokenTypeLength {
        id:          String,
        segment:     usize,
        tokens:      usize,
        token_types: usize,
    },

    #[error("sample '{id}' segment {segment}: token id {token} is outside the vocabulary (size {vocab_size})")]
    TokenOutOfRange {
        id:         String,
        segment:    usize,
        token:      u32,
        vocab_size: usize,
    },

    #[error("sample '{id}' segment {segment}: token type {token_type} is outside 0..{type_vocab_size}")]
    TokenTypeOutOfRange {
        id:              String,
        segment:         usize,
        token_type:      u32,
        type_vocab_size: usize,
    },

    #[error("sample '{id}' has {features} categorical features, the model expects {expected}")]
    FeatureCount { id: String, features: usize, expected: usize },

    #[error("sample '{id}' feature {feature}: index {value} is outside 0..{cardinality}")]
    FeatureOutOfRange {
        id:          String,
        feature:     usize,
        value:       u32,
        cardinality: usize,
    },
}
