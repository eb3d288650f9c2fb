use burn::{
    nn::{
        loss::BinaryCrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding,
        Initializer,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation::relu, TensorData},
};

use crate::data::batcher::QaBatch;
use crate::ml::attention::MultiHeadAttention;
use crate::ml::error::{ModelError, ModelResult};
use crate::ml::mask::{decoder_mask, padding_mask};

const LAYER_NORM_EPS: f64 = 1e-6;

fn xavier() -> Initializer {
    Initializer::XavierUniform { gain: 1.0 }
}

// #[derive(Config)] brings Clone + Serialize/Deserialize with it,
// plus a `new` over the required fields and `with_*` setters.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub src_vocab_size: usize,
    pub tgt_vocab_size: usize,
    pub src_seq_len:    usize,
    pub tgt_seq_len:    usize,
    pub d_model:        usize,
    #[config(default = 8)]
    pub num_heads:      usize,
    #[config(default = 6)]
    pub num_layers:     usize,
    #[config(default = 2048)]
    pub d_ff:           usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
    /// Projection width for classification. `None` projects onto
    /// the target vocabulary instead.
    pub num_classes:    Option<usize>,
}

impl TransformerConfig {
    pub fn output_dim(&self) -> usize {
        self.num_classes.unwrap_or(self.tgt_vocab_size)
    }

    /// Reject configs that would build a model with inconsistent shapes.
    pub fn validate(&self) -> ModelResult<()> {
        let sizes = [
            ("src_vocab_size", self.src_vocab_size),
            ("tgt_vocab_size", self.tgt_vocab_size),
            ("src_seq_len",    self.src_seq_len),
            ("tgt_seq_len",    self.tgt_seq_len),
            ("d_model",        self.d_model),
            ("num_layers",     self.num_layers),
            ("d_ff",           self.d_ff),
            ("output_dim",     self.output_dim()),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ModelError::InvalidConfig(format!("{name} must be positive")));
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return Err(ModelError::HeadsMismatch {
                d_model:   self.d_model,
                num_heads: self.num_heads,
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<Transformer<B>> {
        self.validate()?;

        let encoder_layers = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect::<ModelResult<Vec<_>>>()?;
        let decoder_layers = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(Transformer {
            src_embed:  self.build_embedding(self.src_vocab_size, self.src_seq_len, device),
            tgt_embed:  self.build_embedding(self.tgt_vocab_size, self.tgt_seq_len, device),
            encoder:    Encoder { layers: encoder_layers, norm: self.layer_norm(device) },
            decoder:    Decoder { layers: decoder_layers, norm: self.layer_norm(device) },
            projection: LinearConfig::new(self.d_model, self.output_dim())
                .with_initializer(xavier())
                .init(device),
        })
    }

    fn build_embedding<B: Backend>(
        &self,
        vocab_size: usize,
        max_len:    usize,
        device:     &B::Device,
    ) -> InputEmbedding<B> {
        // EmbeddingConfig gives no fan-in/out, which Xavier needs
        let weight = xavier().init_with(
            [vocab_size, self.d_model],
            Some(vocab_size),
            Some(self.d_model),
            device,
        );

        InputEmbedding {
            token:     Embedding { weight },
            positions: Tensor::from_data(
                TensorData::new(sinusoidal_table(max_len, self.d_model), [max_len, self.d_model]),
                device,
            ),
            dropout:   DropoutConfig::new(self.dropout).init(),
            d_model:   self.d_model,
            max_len,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> ModelResult<EncoderBlock<B>> {
        Ok(EncoderBlock {
            self_attn:     self.attention(device)?,
            feed_forward:  self.feed_forward(device),
            attn_residual: self.residual(device),
            ff_residual:   self.residual(device),
        })
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> ModelResult<DecoderBlock<B>> {
        Ok(DecoderBlock {
            self_attn:           self.attention(device)?,
            cross_attn:          self.attention(device)?,
            feed_forward:        self.feed_forward(device),
            self_attn_residual:  self.residual(device),
            cross_attn_residual: self.residual(device),
            ff_residual:         self.residual(device),
        })
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> ModelResult<MultiHeadAttention<B>> {
        MultiHeadAttention::new(self.d_model, self.num_heads, self.dropout, device)
    }

    fn feed_forward<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            linear1: LinearConfig::new(self.d_model, self.d_ff)
                .with_initializer(xavier())
                .init(device),
            linear2: LinearConfig::new(self.d_ff, self.d_model)
                .with_initializer(xavier())
                .init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }

    fn residual<B: Backend>(&self, device: &B::Device) -> ResidualConnection<B> {
        ResidualConnection {
            norm:    self.layer_norm(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.d_model)
            .with_epsilon(LAYER_NORM_EPS)
            .init(device)
    }
}

// ─── Input embedding ─────────────────────────────────────────────────────────

/// Token embedding scaled by √d_model plus the fixed sinusoidal table.
#[derive(Module, Debug)]
pub struct InputEmbedding<B: Backend> {
    pub token:     Embedding<B>,
    /// [max_len, d_model], built once at init. A plain tensor field is
    /// a module constant: not trained, not written to the record.
    pub positions: Tensor<B, 2>,
    pub dropout:   Dropout,
    pub d_model:   usize,
    pub max_len:   usize,
}

impl<B: Backend> InputEmbedding<B> {
    /// ids: [batch, seq_len] → [batch, seq_len, d_model]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> ModelResult<Tensor<B, 3>> {
        let [batch, seq_len] = ids.dims();
        if seq_len > self.max_len {
            return Err(ModelError::SequenceTooLong { len: seq_len, max: self.max_len });
        }

        let tokens    = self.token.forward(ids) * (self.d_model as f64).sqrt();
        let positions = self
            .positions
            .clone()
            .slice([0..seq_len, 0..self.d_model])
            .unsqueeze::<3>()
            .expand([batch, seq_len, self.d_model]);

        Ok(self.dropout.forward(tokens + positions))
    }
}

/// Row-major `[len, d_model]` table:
/// `pe[p][2i] = sin(p / 10000^(2i/d))`, `pe[p][2i+1] = cos(...)`.
pub fn sinusoidal_table(len: usize, d_model: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; len * d_model];
    for pos in 0..len {
        for i in (0..d_model).step_by(2) {
            let angle = pos as f64 / 10_000f64.powf(i as f64 / d_model as f64);
            table[pos * d_model + i] = angle.sin() as f32;
            if i + 1 < d_model {
                table[pos * d_model + i + 1] = angle.cos() as f32;
            }
        }
    }
    table
}

// ─── Position-wise blocks ────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub linear1: Linear<B>,
    pub linear2: Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> FeedForward<B> {
    /// [b, s, d_model] → [b, s, d_ff] → ReLU → [b, s, d_model]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.linear2
            .forward(self.dropout.forward(relu(self.linear1.forward(x))))
    }
}

/// Pre-norm residual: `x + dropout(sublayer(norm(x)))`.
#[derive(Module, Debug)]
pub struct ResidualConnection<B: Backend> {
    pub norm:    LayerNorm<B>,
    pub dropout: Dropout,
}

impl<B: Backend> ResidualConnection<B> {
    pub fn forward<F>(&self, x: Tensor<B, 3>, sublayer: F) -> ModelResult<Tensor<B, 3>>
    where
        F: FnOnce(Tensor<B, 3>) -> ModelResult<Tensor<B, 3>>,
    {
        let shape = x.dims();
        let out   = sublayer(self.norm.forward(x.clone()))?;

        if out.dims() != shape {
            return Err(ModelError::ShapeMismatch {
                what:     "residual sublayer output",
                expected: shape.to_vec(),
                got:      out.dims().to_vec(),
            });
        }
        Ok(x + self.dropout.forward(out))
    }
}

// ─── Encoder ─────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:     MultiHeadAttention<B>,
    pub feed_forward:  FeedForward<B>,
    pub attn_residual: ResidualConnection<B>,
    pub ff_residual:   ResidualConnection<B>,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, src_mask: Tensor<B, 4, Bool>) -> ModelResult<Tensor<B, 3>> {
        let x = self.attn_residual.forward(x, |x| {
            Ok(self.self_attn.forward(x.clone(), x.clone(), x, Some(src_mask))?.context)
        })?;
        self.ff_residual.forward(x, |x| Ok(self.feed_forward.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub layers: Vec<EncoderBlock<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, mut x: Tensor<B, 3>, src_mask: Tensor<B, 4, Bool>) -> ModelResult<Tensor<B, 3>> {
        for layer in &self.layers {
            x = layer.forward(x, src_mask.clone())?;
        }
        Ok(self.norm.forward(x))
    }
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:           MultiHeadAttention<B>,
    pub cross_attn:          MultiHeadAttention<B>,
    pub feed_forward:        FeedForward<B>,
    pub self_attn_residual:  ResidualConnection<B>,
    pub cross_attn_residual: ResidualConnection<B>,
    pub ff_residual:         ResidualConnection<B>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(
        &self,
        x:              Tensor<B, 3>,
        encoder_output: Tensor<B, 3>,
        src_mask:       Tensor<B, 4, Bool>,
        tgt_mask:       Tensor<B, 4, Bool>,
    ) -> ModelResult<Tensor<B, 3>> {
        let x = self.self_attn_residual.forward(x, |x| {
            Ok(self.self_attn.forward(x.clone(), x.clone(), x, Some(tgt_mask))?.context)
        })?;
        let x = self.cross_attn_residual.forward(x, |x| {
            Ok(self
                .cross_attn
                .forward(x, encoder_output.clone(), encoder_output, Some(src_mask))?
                .context)
        })?;
        self.ff_residual.forward(x, |x| Ok(self.feed_forward.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub layers: Vec<DecoderBlock<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> Decoder<B> {
    pub fn forward(
        &self,
        mut x:          Tensor<B, 3>,
        encoder_output: Tensor<B, 3>,
        src_mask:       Tensor<B, 4, Bool>,
        tgt_mask:       Tensor<B, 4, Bool>,
    ) -> ModelResult<Tensor<B, 3>> {
        for layer in &self.layers {
            x = layer.forward(x, encoder_output.clone(), src_mask.clone(), tgt_mask.clone())?;
        }
        Ok(self.norm.forward(x))
    }
}

// ─── Full model ──────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub src_embed:  InputEmbedding<B>,
    pub tgt_embed:  InputEmbedding<B>,
    pub encoder:    Encoder<B>,
    pub decoder:    Decoder<B>,
    pub projection: Linear<B>,
}

impl<B: Backend> Transformer<B> {
    /// input_ids: [b, src_len], input_mask: suppress mask broadcastable
    /// to [b, heads, src_len, src_len] → [b, src_len, d_model]
    pub fn encode(
        &self,
        input_ids:  Tensor<B, 2, Int>,
        input_mask: Tensor<B, 4, Bool>,
    ) -> ModelResult<Tensor<B, 3>> {
        let x = self.src_embed.forward(input_ids)?;
        self.encoder.forward(x, input_mask)
    }

    /// target_mask is normally [`decoder_mask`]: causal plus padding.
    /// Returns [b, tgt_len, d_model].
    pub fn decode(
        &self,
        encoder_output: Tensor<B, 3>,
        input_mask:     Tensor<B, 4, Bool>,
        target_ids:     Tensor<B, 2, Int>,
        target_mask:    Tensor<B, 4, Bool>,
    ) -> ModelResult<Tensor<B, 3>> {
        let x = self.tgt_embed.forward(target_ids)?;
        self.decoder.forward(x, encoder_output, input_mask, target_mask)
    }

    /// Raw logits, [b, tgt_len, output_dim]. No softmax/sigmoid here:
    /// the loss decides how logits are read.
    pub fn project(&self, decoder_hidden: Tensor<B, 3>) -> Tensor<B, 3> {
        self.projection.forward(decoder_hidden)
    }

    /// One binary logit per sample, read at the last real decoder
    /// position (the only one that has seen the whole option).
    /// Padding in `decoder_attention` must be trailing.
    pub fn classify(
        &self,
        encoder_input:     Tensor<B, 2, Int>,
        encoder_attention: Tensor<B, 2, Int>,
        decoder_input:     Tensor<B, 2, Int>,
        decoder_attention: Tensor<B, 2, Int>,
    ) -> ModelResult<Tensor<B, 1>> {
        let src_mask = padding_mask(encoder_attention);
        let tgt_mask = decoder_mask(decoder_attention.clone());

        let encoded = self.encode(encoder_input, src_mask.clone())?;
        let hidden  = self.decode(encoded, src_mask, decoder_input, tgt_mask)?;
        let logits  = self.project(hidden);

        let [batch, tgt_len, width] = logits.dims();
        if width != 1 {
            return Err(ModelError::InvalidConfig(format!(
                "classification needs a single output logit, model projects to {width}"
            )));
        }

        let last = decoder_attention.sum_dim(1).sub_scalar(1).clamp_min(0); // [batch, 1]
        Ok(logits.reshape([batch, tgt_len]).gather(1, last).reshape([batch]))
    }

    /// Binary cross-entropy on raw logits (sigmoid fused into the loss).
    /// Returns (loss, logits).
    pub fn forward_loss(&self, batch: QaBatch<B>) -> ModelResult<(Tensor<B, 1>, Tensor<B, 1>)> {
        let logits = self.classify(
            batch.encoder_input,
            batch.encoder_mask,
            batch.decoder_input,
            batch.decoder_mask,
        )?;
        let bce = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device());
        let loss = bce.forward(logits.clone(), batch.labels);
        Ok((loss, logits))
    }
}
