use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
};

/// Classification head configuration.
///
/// Without `hidden_dim`: Dropout → Linear(in, out)
/// With `hidden_dim`:    Dropout → Linear(in, h) → ReLU → Dropout → Linear(h, out)
#[derive(Config, Debug)]
pub struct ClassifierHeadConfig {
    pub d_input:  usize,
    pub d_output: usize,
    pub hidden_dim: Option<usize>,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl ClassifierHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierHead<B> {
        let (hidden, d_last) = match self.hidden_dim {
            Some(h) => (Some(LinearConfig::new(self.d_input, h).init(device)), h),
            None    => (None, self.d_input),
        };
        ClassifierHead {
            dropout: DropoutConfig::new(self.dropout).init(),
            hidden,
            output:  LinearConfig::new(d_last, self.d_output).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub dropout: Dropout,
    pub hidden:  Option<Linear<B>>,
    pub output:  Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    /// x: [batch, d_input] → logits [batch, d_output]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = self.dropout.forward(x);
        if let Some(hidden) = &self.hidden {
            x = burn::tensor::activation::relu(hidden.forward(x));
            x = self.dropout.forward(x);
        }
        self.output.forward(x)
    }
}
