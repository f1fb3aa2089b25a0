// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two things live here:
//
//   mean_spearman  — the competition metric: Spearman's rank
//                    correlation computed per target column,
//                    then averaged over columns.
//   MetricsLogger  — appends one CSV row per epoch.
//
// Spearman = Pearson correlation of the ranks. Tied values
// share the average of the ranks they span, so a column of
// predictions like [0.5, 0.5, 0.9] ranks as [1.5, 1.5, 3].
//
// A column where predictions or targets are all equal has no
// defined correlation; it is skipped rather than poisoning the
// mean with NaN.
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_loss,val_spearman
//   1,0.412300,0.398100,0.301200
//   2,0.377700,0.381000,0.352900

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// Average ranks (1-based), ties share their mean rank.
pub fn average_ranks(values: &[f32]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j hold equal values → ranks i+1..=j+1
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    if x.len() < 2 {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        cov   += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Spearman correlation of one column, None when undefined.
pub fn spearman(preds: &[f32], targets: &[f32]) -> Option<f64> {
    pearson(&average_ranks(preds), &average_ranks(targets))
}

/// Column-wise Spearman averaged over the columns where it is defined.
/// Rows are samples; 0.0 when no column has a defined correlation.
pub fn mean_spearman(preds: &[Vec<f32>], targets: &[Vec<f32>]) -> f64 {
    let n_cols = preds.first().map_or(0, Vec::len);

    let per_column: Vec<f64> = (0..n_cols)
        .filter_map(|c| {
            let p: Vec<f32> = preds.iter().map(|row| row[c]).collect();
            let t: Vec<f32> = targets.iter().map(|row| row[c]).collect();
            spearman(&p, &t)
        })
        .collect();

    if per_column.is_empty() {
        tracing::warn!("No target column has a defined Spearman correlation");
        return 0.0;
    }
    per_column.iter().sum::<f64>() / per_column.len() as f64
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean loss over all training batches
    pub train_loss: f64,

    /// Mean loss over all validation batches
    pub val_loss: f64,

    /// Mean column-wise Spearman on the validation set
    pub val_spearman: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, val_spearman: f64) -> Self {
        Self { epoch, train_loss, val_loss, val_spearman }
    }

    /// Returns true if this epoch beat the previous best Spearman
    pub fn is_improvement(&self, best_spearman: f64) -> bool {
        self.val_spearman > best_spearman
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Appending across runs keeps earlier learning curves
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,val_spearman")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_spearman,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}, spearman={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_spearman,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
