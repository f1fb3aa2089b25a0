// ============================================================
// Layer 5 — Pooling over encoder hidden states
// ============================================================
// [batch, seq_len, hidden] → [batch, pooled_width]
//
// Padding positions are wherever the token id equals mask_val.
// They are excluded from mean and max; cls ignores the mask.

use burn::prelude::*;

use crate::domain::pooling::Pooling;

// Large enough to lose every max against a real activation
const MAX_POOL_PENALTY: f32 = -1.0e4;

/// true where `tokens == mask_val`.
pub fn padding_mask<B: Backend>(tokens: &Tensor<B, 2, Int>, mask_val: i64) -> Tensor<B, 2, Bool> {
    tokens.clone().equal_elem(mask_val)
}

/// Reduce hidden states to one vector per example.
pub fn pool_hidden<B: Backend>(
    hidden:   Tensor<B, 3>,
    pad_mask: Tensor<B, 2, Bool>,
    pooling:  Pooling,
) -> Tensor<B, 2> {
    match pooling {
        Pooling::Cls     => cls_pool(hidden),
        Pooling::Mean    => mean_pool(hidden, pad_mask),
        Pooling::Max     => max_pool(hidden, pad_mask),
        Pooling::MeanMax => Tensor::cat(
            vec![mean_pool(hidden.clone(), pad_mask.clone()), max_pool(hidden, pad_mask)],
            1,
        ),
    }
}

fn cls_pool<B: Backend>(hidden: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, _, width] = hidden.dims();
    hidden.slice([0..batch, 0..1, 0..width]).reshape([batch, width])
}

fn mean_pool<B: Backend>(hidden: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
    let [batch, _, width] = hidden.dims();
    let keep  = pad_mask.bool_not().float().unsqueeze_dim::<3>(2); // [batch, seq, 1]
    let sum   = (hidden * keep.clone()).sum_dim(1);                // [batch, 1, width]
    // At least one token, so an all-padding row pools to zeros instead of NaN
    let count = keep.sum_dim(1).clamp_min(1.0);                    // [batch, 1, 1]
    (sum / count).reshape([batch, width])
}

fn max_pool<B: Backend>(hidden: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
    let [batch, _, width] = hidden.dims();
    let penalty = pad_mask.float().unsqueeze_dim::<3>(2).mul_scalar(MAX_POOL_PENALTY);
    (hidden + penalty).max_dim(1).reshape([batch, width])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    // batch 2, seq 3, hidden 2; row 0 has its last token padded
    fn fixture() -> (Tensor<TestBackend, 3>, Tensor<TestBackend, 2, Bool>) {
        let device = Default::default();
        let hidden = Tensor::<TestBackend, 3>::from_floats(
            [
                [[1.0, 2.0], [3.0, 6.0], [100.0, 100.0]],
                [[0.0, -1.0], [2.0, -3.0], [4.0, -5.0]],
            ],
            &device,
        );
        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[7, 8, 0], [7, 8, 9]], &device);
        (hidden, padding_mask(&tokens, 0))
    }

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_cls_takes_first_token() {
        let (hidden, mask) = fixture();
        assert_eq!(values(pool_hidden(hidden, mask, Pooling::Cls)), vec![1.0, 2.0, 0.0, -1.0]);
    }

    #[test]
    fn test_mean_skips_padding() {
        let (hidden, mask) = fixture();
        // row 0: (1+3)/2, (2+6)/2 — the 100s are padding
        assert_eq!(values(pool_hidden(hidden, mask, Pooling::Mean)), vec![2.0, 4.0, 2.0, -3.0]);
    }

    #[test]
    fn test_max_skips_padding() {
        let (hidden, mask) = fixture();
        assert_eq!(values(pool_hidden(hidden, mask, Pooling::Max)), vec![3.0, 6.0, 4.0, -1.0]);
    }

    #[test]
    fn test_mean_max_concatenates() {
        let (hidden, mask) = fixture();
        let pooled = pool_hidden(hidden, mask, Pooling::MeanMax);
        assert_eq!(pooled.dims(), [2, 4]);
        assert_eq!(values(pooled), vec![2.0, 4.0, 3.0, 6.0, 2.0, -3.0, 4.0, -1.0]);
    }

    #[test]
    fn test_mean_of_all_padding_row_is_zero() {
        let device = Default::default();
        let hidden = Tensor::<TestBackend, 3>::ones([1, 2, 3], &device);
        let tokens = Tensor::<TestBackend, 2, Int>::zeros([1, 2], &device);
        let pooled = pool_hidden(hidden, padding_mask(&tokens, 0), Pooling::Mean);
        assert_eq!(values(pooled), vec![0.0, 0.0, 0.0]);
    }
}
