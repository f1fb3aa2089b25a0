use burn::{
    module::Ignored,
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Loss applied to one segment's logits: (logits, targets) → scalar.
///
/// The model stores its loss as `Ignored<L>`, so an implementation
/// must also be `Clone + Debug + Send + Sync`.
pub trait SegmentLoss<B: Backend> {
    /// logits, targets: [batch, y_dim] → differentiable scalar [1]
    fn compute(&self, logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1>;
}

impl<B: Backend, L: SegmentLoss<B>> SegmentLoss<B> for Ignored<L> {
    fn compute(&self, logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        self.0.compute(logits, targets)
    }
}

/// Stateless loss applied to one segment's logits.
///
/// The competition targets are soft labels in [0, 1], one column per
/// target, so the default is binary cross-entropy on logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFn {
    BceWithLogits,
    Mse,
}

impl LossFn {
    /// logits, targets: [batch, y_dim] → scalar [1]
    pub fn compute<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            LossFn::BceWithLogits => bce_with_logits(logits, targets),
            LossFn::Mse => MseLoss::new().forward(logits, targets, Reduction::Mean),
        }
    }

    /// Whether scores should be squashed with a sigmoid at inference time.
    pub fn outputs_logits(&self) -> bool {
        matches!(self, LossFn::BceWithLogits)
    }
}

impl<B: Backend> SegmentLoss<B> for LossFn {
    fn compute(&self, logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        LossFn::compute(self, logits, targets)
    }
}

// max(x, 0) - x*y + log(1 + exp(-|x|)), the stable form
fn bce_with_logits<B: Backend>(x: Tensor<B, 2>, y: Tensor<B, 2>) -> Tensor<B, 1> {
    let softplus = x.clone().abs().neg().exp().log1p();
    (x.clone().clamp_min(0.0) - x * y + softplus).mean()
}
