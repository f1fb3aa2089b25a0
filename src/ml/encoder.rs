use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// ─── SequenceEncoder ──────────────────────────────────────────────────────────
/// Anything that turns token sequences into per-token hidden states.
///
/// The cross-encoder registers the encoder as a sub-module, so it
/// must be a Burn `Module` and its weights train with the head.
pub trait SequenceEncoder<B: Backend>: Module<B> {
    /// Width of each token's hidden state.
    fn hidden_size(&self) -> usize;

    /// tokens, token_types: [batch, seq_len]
    /// pad_mask: [batch, seq_len], true where the token is padding
    /// → hidden states [batch, seq_len, hidden_size]
    fn encode(
        &self,
        tokens:      Tensor<B, 2, Int>,
        token_types: Tensor<B, 2, Int>,
        pad_mask:    Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerEncoderConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl TransformerEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerEncoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let type_embedding     = EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        TransformerEncoder {
            token_embedding, position_embedding, type_embedding,
            layers, final_norm, dropout,
            d_model: self.d_model,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// BERT-style encoder: token + position + segment embeddings,
/// then a stack of post-norm self-attention blocks.
#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub type_embedding:     Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub dropout:            Dropout,
    pub d_model:            usize,
}

impl<B: Backend> SequenceEncoder<B> for TransformerEncoder<B> {
    fn hidden_size(&self) -> usize {
        self.d_model
    }

    fn encode(
        &self,
        tokens:      Tensor<B, 2, Int>,
        token_types: Tensor<B, 2, Int>,
        pad_mask:    Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();

        let tok_emb  = self.token_embedding.forward(tokens);
        let type_emb = self.type_embedding.forward(token_types);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb + type_emb);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        self.final_norm.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_encode_shape() {
        let device  = Default::default();
        let encoder = TransformerEncoderConfig::new(50, 16, 8, 2, 1, 16)
            .init::<TestBackend>(&device);

        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[5, 6, 7, 0], [8, 9, 0, 0]], &device);
        let types  = Tensor::<TestBackend, 2, Int>::from_ints([[0, 0, 1, 0], [0, 1, 0, 0]], &device);
        let mask   = tokens.clone().equal_elem(0);

        let hidden = encoder.encode(tokens, types, mask);
        assert_eq!(hidden.dims(), [2, 4, 8]);
        assert_eq!(encoder.hidden_size(), 8);
    }
}
