// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `score`
// and all their configurable flags.
//
// clap's derive macros generate the help text, the errors for
// missing args and the string → usize / f64 / Pooling conversions.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::pooling::Pooling;
use crate::ml::loss::LossFn;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the cross-encoder on tokenised question/answer pairs
    Train(TrainArgs),

    /// Score pairs with a trained checkpoint
    Score(ScoreArgs),
}

/// Loss names accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LossArg {
    /// Binary cross-entropy on logits (soft labels in [0, 1])
    Bce,
    /// Mean squared error
    Mse,
}

impl From<LossArg> for LossFn {
    fn from(l: LossArg) -> Self {
        match l {
            LossArg::Bce => LossFn::BceWithLogits,
            LossArg::Mse => LossFn::Mse,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON-lines file of tokenised, labelled pairs
    #[arg(long)]
    pub train_file: String,

    /// Directory for checkpoints, train_config.json and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Learning rate for the encoder and categorical embeddings
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// Learning rate for the classification head
    #[arg(long, default_value_t = 1e-3)]
    pub head_lr: f64,

    /// Share of samples used for training; the rest is validation
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    // ── Encoder ───────────────────────────────────────────────────────────────
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 2)]
    pub type_vocab_size: usize,

    /// Longer segments are truncated to this many tokens
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    // ── Head ──────────────────────────────────────────────────────────────────
    /// cls, mean, max or mean_max
    #[arg(long, default_value_t = Pooling::Cls)]
    pub pooling: Pooling,

    #[arg(long, value_enum, default_value_t = LossArg::Bce)]
    pub loss: LossArg,

    /// Token id used for padding
    #[arg(long, default_value_t = 0)]
    pub mask_val: i64,

    /// Number of target columns
    #[arg(long, default_value_t = 30)]
    pub y_dim: usize,

    /// Cardinality of each categorical feature, e.g. `5,63`
    #[arg(long, value_delimiter = ',')]
    pub feature_dims: Option<Vec<usize>>,

    /// Embedding width for each categorical feature, e.g. `4,16`
    #[arg(long, value_delimiter = ',')]
    pub emb_feature_dims: Option<Vec<usize>>,

    /// Adds a hidden layer (with ReLU) to the head
    #[arg(long)]
    pub clf_hid_dim: Option<usize>,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_file:       a.train_file,
            checkpoint_dir:   a.checkpoint_dir,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            head_lr:          a.head_lr,
            train_fraction:   a.train_fraction,
            seed:             a.seed,
            vocab_size:       a.vocab_size,
            type_vocab_size:  a.type_vocab_size,
            max_seq_len:      a.max_seq_len,
            d_model:          a.d_model,
            num_heads:        a.num_heads,
            num_layers:       a.num_layers,
            d_ff:             a.d_ff,
            pooling:          a.pooling,
            loss:             a.loss.into(),
            mask_val:         a.mask_val,
            y_dim:            Some(a.y_dim),
            feature_dims:     a.feature_dims,
            emb_feature_dims: a.emb_feature_dims,
            clf_hid_dim:      a.clf_hid_dim,
            dropout:          a.dropout,
        }
    }
}

/// All arguments for the `score` command
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// JSON-lines file of tokenised pairs (targets are ignored)
    #[arg(long)]
    pub input: PathBuf,

    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// CSV destination; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,
}
