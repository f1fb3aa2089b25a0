use burn::{
    module::Ignored,
    nn::{Embedding, EmbeddingConfig},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::{error::HeadError, pooling::Pooling};
use crate::ml::{
    encoder::SequenceEncoder,
    head::{ClassifierHead, ClassifierHeadConfig},
    loss::SegmentLoss,
    pooling::{padding_mask, pool_hidden},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CrossEncoderConfig {
    pub pooling: Pooling,
    /// Token id that marks padding
    #[config(default = 0)]
    pub mask_val: i64,
    /// Logit width; 1 when unset
    pub y_dim: Option<usize>,
    /// Cardinality of each categorical feature
    pub feature_dims: Option<Vec<usize>>,
    /// Embedding width for each categorical feature
    pub emb_feature_dims: Option<Vec<usize>>,
    /// Hidden width of a two-layer head; single affine layer when unset
    pub clf_hid_dim: Option<usize>,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl CrossEncoderConfig {
    /// Build the model around `encoder`; `loss` scores each segment when
    /// targets are passed to forward.
    pub fn init<B, E, L>(
        &self,
        encoder: E,
        loss:    L,
        device:  &B::Device,
    ) -> Result<CrossEncoderModel<B, E, Ignored<L>>, HeadError>
    where
        B: Backend,
        E: SequenceEncoder<B>,
        L: SegmentLoss<B> + Clone + core::fmt::Debug + Send + Sync,
    {
        let categorical  = self.categorical_dims()?;
        let y_dim        = self.y_dim.unwrap_or(1);
        let pooled_width = self.pooling.pooled_width(encoder.hidden_size());
        let emb_width: usize = categorical.iter().flatten().map(|&(_, width)| width).sum();

        let cat_embeddings = categorical.map(|dims| {
            dims.iter()
                .map(|&(cardinality, width)| EmbeddingConfig::new(cardinality, width).init(device))
                .collect::<Vec<_>>()
        });

        let head = ClassifierHeadConfig::new(pooled_width + emb_width, y_dim)
            .with_hidden_dim(self.clf_hid_dim)
            .with_dropout(self.dropout)
            .init(device);

        Ok(CrossEncoderModel {
            encoder,
            cat_embeddings,
            head,
            y_dim,
            mask_val: Ignored(self.mask_val),
            pooling:  Ignored(self.pooling),
            loss:     Ignored(loss),
        })
    }

    /// (cardinality, width) per categorical feature, or None when the
    /// model has no categorical embeddings.
    pub fn categorical_dims(&self) -> Result<Option<Vec<(usize, usize)>>, HeadError> {
        match (&self.feature_dims, &self.emb_feature_dims) {
            (None, None) => Ok(None),
            (Some(f), Some(e)) if f.len() == e.len() => {
                if f.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(f.iter().copied().zip(e.iter().copied()).collect()))
                }
            }
            (f, e) => Err(HeadError::FeatureConfigMismatch {
                feature_dims: f.as_ref().map(Vec::len),
                emb_dims:     e.as_ref().map(Vec::len),
            }),
        }
    }
}

// ─── Inputs / outputs ─────────────────────────────────────────────────────────
/// One batch of pairs, split into segments.
#[derive(Debug, Clone)]
pub struct CrossEncoderBatch<B: Backend> {
    /// Per segment: token ids [batch, seq_len]
    pub tokens: Vec<Tensor<B, 2, Int>>,
    /// Per segment: token-type ids [batch, seq_len]
    pub token_types: Vec<Tensor<B, 2, Int>>,
    /// Categorical features [batch, n_features], shared by all segments
    pub features: Option<Tensor<B, 2, Int>>,
}

pub struct CrossEncoderOutput<B: Backend> {
    /// Scalar; exactly zero when no targets were given
    pub loss:   Tensor<B, 1>,
    /// Per segment, in segment order: [batch, y_dim]
    pub logits: Vec<Tensor<B, 2>>,
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CrossEncoderModel<B: Backend, E, L> {
    pub encoder:        E,
    pub cat_embeddings: Option<Vec<Embedding<B>>>,
    pub head:           ClassifierHead<B>,
    pub y_dim:          usize,
    pub mask_val:       Ignored<i64>,
    pub pooling:        Ignored<Pooling>,
    pub loss:           L,
}

impl<B: Backend, E: SequenceEncoder<B>, L: SegmentLoss<B>> CrossEncoderModel<B, E, L> {
    /// Score every segment and, when targets are given, accumulate
    /// `loss(logits, targets[0]) / n_segments` over the segments.
    pub fn forward(
        &self,
        batch:   CrossEncoderBatch<B>,
        targets: Option<&[Tensor<B, 2>]>,
    ) -> Result<CrossEncoderOutput<B>, HeadError> {
        let CrossEncoderBatch { tokens, token_types, features } = batch;

        if tokens.is_empty() {
            return Err(HeadError::EmptyBatch);
        }
        if tokens.len() != token_types.len() {
            return Err(HeadError::SegmentMismatch {
                tokens:      tokens.len(),
                token_types: token_types.len(),
            });
        }
        let features = match (&self.cat_embeddings, features) {
            (Some(_), None)    => return Err(HeadError::MissingFeatures),
            (Some(_), Some(f)) => Some(f),
            (None, _)          => None,
        };
        let target = match targets {
            Some(t) => Some(t.first().cloned().ok_or(HeadError::EmptyTargets)?),
            None    => None,
        };

        let n_segments = tokens.len();
        let mut loss   = Tensor::<B, 1>::zeros([1], &tokens[0].device());
        let mut logits = Vec::with_capacity(n_segments);

        for (seg_tokens, seg_types) in tokens.into_iter().zip(token_types) {
            let mut h = self.pool_segment(seg_tokens, seg_types);
            if let Some(f) = &features {
                h = self.append_categorical(h, f.clone());
            }
            let seg_logits = self.head.forward(h);

            if let Some(y) = &target {
                let seg_loss = self.loss.compute(seg_logits.clone(), y.clone());
                loss = loss + seg_loss.div_scalar(n_segments as f64);
            }
            logits.push(seg_logits);
        }

        Ok(CrossEncoderOutput { loss, logits })
    }

    /// Encode one segment and pool it to [batch, pooled_width].
    pub fn pool_segment(&self, tokens: Tensor<B, 2, Int>, token_types: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let pad_mask = padding_mask(&tokens, *self.mask_val);
        let hidden   = self.encoder.encode(tokens, token_types, pad_mask.clone());
        pool_hidden(hidden, pad_mask, *self.pooling)
    }

    /// Look up column e of `features` in embedding table e and append the
    /// results to `pooled`, in table order.
    pub fn append_categorical(&self, pooled: Tensor<B, 2>, features: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let Some(embeddings) = &self.cat_embeddings else {
            return pooled;
        };
        let [batch, _] = features.dims();

        let mut parts = Vec::with_capacity(embeddings.len() + 1);
        parts.push(pooled);
        for (e, embedding) in embeddings.iter().enumerate() {
            let column    = features.clone().slice([0..batch, e..e + 1]); // [batch, 1]
            let looked_up = embedding.forward(column);                     // [batch, 1, width]
            let [_, _, width] = looked_up.dims();
            parts.push(looked_up.reshape([batch, width]));
        }
        Tensor::cat(parts, 1)
    }
}

impl<B: Backend, E, L> CrossEncoderModel<B, E, L> {
    /// The classification head alone: its parameters exclude the encoder
    /// and the categorical embeddings.
    pub fn head(&self) -> &ClassifierHead<B> {
        &self.head
    }

    pub fn num_head_params(&self) -> usize {
        self.head.num_params()
    }

    pub fn loss(&self) -> &L {
        &self.loss
    }
}

impl<B: AutodiffBackend, E, L> CrossEncoderModel<B, E, L> {
    /// Move the head's gradients out of `grads`, leaving the encoder and
    /// embedding gradients behind for a separate optimizer step.
    pub fn head_gradients(&self, grads: &mut B::Gradients) -> GradientsParams {
        GradientsParams::from_module(grads, &self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::{TransformerEncoder, TransformerEncoderConfig};
    use crate::ml::loss::LossFn;
    use burn::backend::NdArray;

    type TestBackend = NdArray;
    type TestModel<L> = CrossEncoderModel<TestBackend, TransformerEncoder<TestBackend>, Ignored<L>>;

    const HIDDEN: usize = 8;

    fn encoder(device: &<TestBackend as Backend>::Device) -> TransformerEncoder<TestBackend> {
        TransformerEncoderConfig::new(30, 8, HIDDEN, 2, 1, 16).init(device)
    }

    fn build(config: CrossEncoderConfig) -> TestModel<LossFn> {
        build_with(config, LossFn::Mse)
    }

    fn build_with<L>(config: CrossEncoderConfig, loss: L) -> TestModel<L>
    where
        L: SegmentLoss<TestBackend> + Clone + core::fmt::Debug + Send + Sync,
    {
        let device = Default::default();
        config.init(encoder(&device), loss, &device).unwrap()
    }

    /// Ignores its inputs and always returns `c`.
    #[derive(Clone, Debug)]
    struct ConstantLoss(f32);

    impl SegmentLoss<TestBackend> for ConstantLoss {
        fn compute(&self, logits: Tensor<TestBackend, 2>, _targets: Tensor<TestBackend, 2>) -> Tensor<TestBackend, 1> {
            Tensor::from_floats([self.0], &logits.device())
        }
    }

    fn batch(n_segments: usize, features: Option<Tensor<TestBackend, 2, Int>>) -> CrossEncoderBatch<TestBackend> {
        let device = Default::default();
        let tokens = (0..n_segments)
            .map(|s| {
                let s = s as i32;
                Tensor::<TestBackend, 2, Int>::from_ints(
                    [[3 + s, 4, 5, 0], [6, 7 + s, 8, 9], [10, 11, 0, 0]],
                    &device,
                )
            })
            .collect();
        let token_types = (0..n_segments)
            .map(|_| Tensor::<TestBackend, 2, Int>::from_ints([[0, 0, 1, 0], [0, 1, 1, 1], [0, 1, 0, 0]], &device))
            .collect();
        CrossEncoderBatch { tokens, token_types, features }
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    #[test]
    fn test_logit_width_matches_y_dim() {
        let model  = build(CrossEncoderConfig::new(Pooling::Mean).with_y_dim(Some(5)));
        let output = model.forward(batch(2, None), None).unwrap();
        assert_eq!(output.logits.len(), 2);
        for logits in &output.logits {
            assert_eq!(logits.dims(), [3, 5]);
        }
    }

    #[test]
    fn test_y_dim_defaults_to_one() {
        let model  = build(CrossEncoderConfig::new(Pooling::Cls));
        let output = model.forward(batch(1, None), None).unwrap();
        assert_eq!(output.logits[0].dims(), [3, 1]);
    }

    #[test]
    fn test_no_targets_gives_zero_loss_and_all_logits() {
        let model  = build(CrossEncoderConfig::new(Pooling::Max));
        let output = model.forward(batch(3, None), None).unwrap();
        assert_eq!(scalar(output.loss), 0.0);
        assert_eq!(output.logits.len(), 3);
    }

    #[test]
    fn test_features_optional_without_embeddings() {
        let device   = Default::default();
        let model    = build(CrossEncoderConfig::new(Pooling::Cls));
        let features = Tensor::<TestBackend, 2, Int>::from_ints([[1], [2], [3]], &device);
        assert!(model.forward(batch(1, None), None).is_ok());
        // A stray feature matrix is ignored
        assert!(model.forward(batch(1, Some(features)), None).is_ok());
    }

    #[test]
    fn test_missing_features_with_embeddings_is_an_error() {
        let model = build(
            CrossEncoderConfig::new(Pooling::Cls)
                .with_feature_dims(Some(vec![4]))
                .with_emb_feature_dims(Some(vec![2])),
        );
        assert_eq!(model.forward(batch(1, None), None).err(), Some(HeadError::MissingFeatures));
    }

    #[test]
    fn test_loss_is_mean_over_segments() {
        let device  = Default::default();
        let model   = build_with(CrossEncoderConfig::new(Pooling::Mean).with_y_dim(Some(2)), LossFn::BceWithLogits);
        let targets = [Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0], [0.5, 0.5], [1.0, 0.2]], &device)];

        let output = model.forward(batch(2, None), Some(&targets[..])).unwrap();

        let expected: f32 = output.logits.iter()
            .map(|l| scalar(LossFn::BceWithLogits.compute(l.clone(), targets[0].clone())) / 2.0)
            .sum();
        assert!((scalar(output.loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_identical_segments_loss_equals_single_segment_loss() {
        let device  = Default::default();
        let model   = build(CrossEncoderConfig::new(Pooling::Cls));
        let targets = [Tensor::<TestBackend, 2>::from_floats([[1.0], [0.0], [0.5]], &device)];

        let single   = batch(1, None);
        let repeated = CrossEncoderBatch {
            tokens:      vec![single.tokens[0].clone(); 4],
            token_types: vec![single.token_types[0].clone(); 4],
            features:    None,
        };

        let c     = scalar(model.forward(single, Some(&targets[..])).unwrap().loss);
        let total = scalar(model.forward(repeated, Some(&targets[..])).unwrap().loss);
        assert!((total - c).abs() < 1e-5);
    }

    #[test]
    fn test_constant_loss_totals_c_for_any_segment_count() {
        let device  = Default::default();
        let model   = build_with(CrossEncoderConfig::new(Pooling::Mean), ConstantLoss(0.75));
        let targets = [Tensor::<TestBackend, 2>::from_floats([[1.0], [0.0], [0.5]], &device)];

        for n in 1..=3 {
            let output = model.forward(batch(n, None), Some(&targets[..])).unwrap();
            assert_eq!(output.logits.len(), n);
            assert!((scalar(output.loss) - 0.75).abs() < 1e-6, "n_segments = {n}");
        }
    }

    #[test]
    fn test_constant_loss_unused_without_targets() {
        let model  = build_with(CrossEncoderConfig::new(Pooling::Cls), ConstantLoss(3.0));
        let output = model.forward(batch(2, None), None).unwrap();
        assert_eq!(scalar(output.loss), 0.0);
    }

    #[test]
    fn test_empty_targets_is_an_error() {
        let model = build(CrossEncoderConfig::new(Pooling::Cls));
        let empty: [Tensor<TestBackend, 2>; 0] = [];
        assert_eq!(model.forward(batch(1, None), Some(&empty[..])).err(), Some(HeadError::EmptyTargets));
    }

    #[test]
    fn test_segment_mismatch_and_empty_batch() {
        let model = build(CrossEncoderConfig::new(Pooling::Cls));

        let mut uneven = batch(2, None);
        uneven.token_types.pop();
        assert_eq!(
            model.forward(uneven, None).err(),
            Some(HeadError::SegmentMismatch { tokens: 2, token_types: 1 })
        );

        let empty = CrossEncoderBatch::<TestBackend> { tokens: vec![], token_types: vec![], features: None };
        assert_eq!(model.forward(empty, None).err(), Some(HeadError::EmptyBatch));
    }

    #[test]
    fn test_categorical_embeddings_appended_in_order() {
        let device = Default::default();
        let model  = build(
            CrossEncoderConfig::new(Pooling::Cls)
                .with_feature_dims(Some(vec![4, 6]))
                .with_emb_feature_dims(Some(vec![3, 5])),
        );
        let embeddings = model.cat_embeddings.as_ref().unwrap();
        assert_eq!(embeddings.len(), 2);

        let pooled   = Tensor::<TestBackend, 2>::zeros([2, HIDDEN], &device);
        let features = Tensor::<TestBackend, 2, Int>::from_ints([[1, 5], [3, 0]], &device);
        let combined = model.append_categorical(pooled, features.clone());
        assert_eq!(combined.dims(), [2, HIDDEN + 3 + 5]);

        let first  = combined.clone().slice([0..2, HIDDEN..HIDDEN + 3]);
        let second = combined.slice([0..2, HIDDEN + 3..HIDDEN + 8]);
        let expect_first  = embeddings[0].forward(features.clone().slice([0..2, 0..1])).reshape([2, 3]);
        let expect_second = embeddings[1].forward(features.slice([0..2, 1..2])).reshape([2, 5]);

        assert_eq!(first.into_data().to_vec::<f32>().unwrap(), expect_first.into_data().to_vec::<f32>().unwrap());
        assert_eq!(second.into_data().to_vec::<f32>().unwrap(), expect_second.into_data().to_vec::<f32>().unwrap());
    }

    #[test]
    fn test_head_input_width_includes_embeddings() {
        let model = build(
            CrossEncoderConfig::new(Pooling::MeanMax)
                .with_feature_dims(Some(vec![4, 6]))
                .with_emb_feature_dims(Some(vec![3, 5]))
                .with_clf_hid_dim(Some(7)),
        );
        let hidden = model.head.hidden.as_ref().unwrap();
        assert_eq!(hidden.weight.val().dims(), [HIDDEN * 2 + 8, 7]);
        assert_eq!(model.head.output.weight.val().dims(), [7, 1]);
    }

    #[test]
    fn test_forward_with_features() {
        let device   = Default::default();
        let model    = build(
            CrossEncoderConfig::new(Pooling::Mean)
                .with_y_dim(Some(3))
                .with_feature_dims(Some(vec![4]))
                .with_emb_feature_dims(Some(vec![2])),
        );
        let features = Tensor::<TestBackend, 2, Int>::from_ints([[0], [1], [3]], &device);
        let output   = model.forward(batch(2, Some(features)), None).unwrap();
        assert_eq!(output.logits[1].dims(), [3, 3]);
    }

    #[test]
    fn test_head_params_are_strict_subset() {
        let model = build(
            CrossEncoderConfig::new(Pooling::Cls)
                .with_feature_dims(Some(vec![4]))
                .with_emb_feature_dims(Some(vec![2])),
        );
        let head_params = model.num_head_params();
        assert!(head_params > 0);
        assert!(head_params < model.num_params());
        // Single affine layer over [pooled ⧺ embedding] → 1
        assert_eq!(head_params, (HIDDEN + 2) + 1);
        assert_eq!(
            model.num_params() - head_params,
            model.encoder.num_params() + 4 * 2
        );
    }

    #[test]
    fn test_feature_config_must_be_paired() {
        let device = Default::default();
        let only_dims = CrossEncoderConfig::new(Pooling::Cls).with_feature_dims(Some(vec![3]));
        assert_eq!(
            only_dims.init(encoder(&device), LossFn::Mse, &device).err(),
            Some(HeadError::FeatureConfigMismatch { feature_dims: Some(1), emb_dims: None })
        );

        let uneven = CrossEncoderConfig::new(Pooling::Cls)
            .with_feature_dims(Some(vec![3, 4]))
            .with_emb_feature_dims(Some(vec![2]));
        assert!(matches!(
            uneven.init(encoder(&device), LossFn::Mse, &device),
            Err(HeadError::FeatureConfigMismatch { feature_dims: Some(2), emb_dims: Some(1) })
        ));
    }

    #[test]
    fn test_empty_feature_lists_mean_no_embeddings() {
        let model = build(
            CrossEncoderConfig::new(Pooling::Cls)
                .with_feature_dims(Some(vec![]))
                .with_emb_feature_dims(Some(vec![])),
        );
        assert!(model.cat_embeddings.is_none());
    }
}
