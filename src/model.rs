// src/model.rs
//! 1-D convolutional word classifier with channel attention
//!
//! Architecture: a wide-kernel strided stem, three residual stages of two
//! squeeze-and-excitation blocks each (16, 32, 64 channels), and a global
//! average pooling head. The SE gates re-weight the four EMG channels per
//! example; channel informativeness varies by speaker and session, so a
//! static channel weighting underperforms.
//!
//! The network carries an explicit [`Mode`]. Training mode uses batch
//! statistics and active dropout; evaluation mode uses the accumulated
//! running statistics with dropout disabled, making inference deterministic
//! for a fixed parameter state.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::sigmoid;
use candle_nn::{
    batch_norm, conv1d, linear, BatchNorm, BatchNormConfig, Conv1d, Conv1dConfig, Dropout, Linear,
    Module, ModuleT, VarBuilder, VarMap,
};

use crate::config::ModelConfig;
use crate::error::Result;

/// Number of EMG input channels.
pub const INPUT_CHANNELS: usize = 4;

/// Stem output width.
const STEM_CHANNELS: usize = 16;

/// Stem convolution kernel.
const STEM_KERNEL: usize = 7;

/// Bottleneck reduction of the squeeze-and-excitation gate.
const SE_REDUCTION: usize = 4;

/// `(in_channels, out_channels, blocks, stride)` per residual stage.
const STAGES: [(usize, usize, usize, usize); 3] =
    [(16, 16, 2, 1), (16, 32, 2, 2), (32, 64, 2, 2)];

/// Forward-pass mode of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Batch statistics and active dropout.
    Train,
    /// Running statistics, dropout disabled.
    Eval,
}

/// Squeeze-and-excitation gate: one sigmoid weight per channel computed from
/// the channel's global temporal average.
struct SeGate {
    fc1: Linear,
    fc2: Linear,
}

impl SeGate {
    fn new(channels: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let bottleneck = (channels / SE_REDUCTION).max(1);
        Ok(Self {
            fc1: linear(channels, bottleneck, vb.pp("fc1"))?,
            fc2: linear(bottleneck, channels, vb.pp("fc2"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let squeezed = xs.mean(D::Minus1)?;
        let gate = self.fc1.forward(&squeezed)?.relu()?;
        let gate = sigmoid(&self.fc2.forward(&gate)?)?;
        xs.broadcast_mul(&gate.unsqueeze(2)?)
    }
}

/// Residual block with two same-padded convolutions, an SE gate on the
/// residual branch, and a projected skip when shape changes.
struct ResidualSeBlock {
    conv1: Conv1d,
    bn1: BatchNorm,
    conv2: Conv1d,
    bn2: BatchNorm,
    se: SeGate,
    projection: Option<(Conv1d, BatchNorm)>,
    dropout: Dropout,
}

impl ResidualSeBlock {
    fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let conv1 = conv1d(
            in_channels,
            out_channels,
            3,
            Conv1dConfig {
                padding: 1,
                stride,
                ..Default::default()
            },
            vb.pp("conv1"),
        )?;
        let bn1 = batch_norm(out_channels, BatchNormConfig::default(), vb.pp("bn1"))?;
        let conv2 = conv1d(
            out_channels,
            out_channels,
            3,
            Conv1dConfig {
                padding: 1,
                ..Default::default()
            },
            vb.pp("conv2"),
        )?;
        let bn2 = batch_norm(out_channels, BatchNormConfig::default(), vb.pp("bn2"))?;
        let se = SeGate::new(out_channels, vb.pp("se"))?;

        // Skip path needs a 1x1 projection whenever channel count or stride
        // breaks the identity shape.
        let projection = if stride != 1 || in_channels != out_channels {
            let conv = conv1d(
                in_channels,
                out_channels,
                1,
                Conv1dConfig {
                    stride,
                    ..Default::default()
                },
                vb.pp("proj_conv"),
            )?;
            let bn = batch_norm(out_channels, BatchNormConfig::default(), vb.pp("proj_bn"))?;
            Some((conv, bn))
        } else {
            None
        };

        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            se,
            projection,
            dropout: Dropout::new(dropout),
        })
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let out = self.conv1.forward(xs)?;
        let out = self.bn1.forward_t(&out, train)?.relu()?;
        let out = self.conv2.forward(&out)?;
        let out = self.bn2.forward_t(&out, train)?;
        let out = self.se.forward(&out)?;

        let skip = match &self.projection {
            Some((conv, bn)) => bn.forward_t(&conv.forward(xs)?, train)?,
            None => xs.clone(),
        };

        let out = (out + skip)?.relu()?;
        self.dropout.forward(&out, train)
    }
}

/// Build one residual stage as a fixed ordered block sequence.
///
/// The first block carries the stage's stride and channel change; the
/// remaining `blocks - 1` keep shape.
fn stage(
    in_channels: usize,
    out_channels: usize,
    blocks: usize,
    stride: usize,
    dropout: f32,
    vb: VarBuilder,
) -> candle_core::Result<Vec<ResidualSeBlock>> {
    let mut sequence = Vec::with_capacity(blocks);
    sequence.push(ResidualSeBlock::new(
        in_channels,
        out_channels,
        stride,
        dropout,
        vb.pp("block0"),
    )?);
    for index in 1..blocks {
        sequence.push(ResidualSeBlock::new(
            out_channels,
            out_channels,
            1,
            dropout,
            vb.pp(format!("block{index}")),
        )?);
    }
    Ok(sequence)
}

/// Word classifier over `[batch, 4, T]` EMG windows.
pub struct WordClassifier {
    stem_conv: Conv1d,
    stem_bn: BatchNorm,
    blocks: Vec<ResidualSeBlock>,
    head_dropout: Dropout,
    head_fc: Linear,
    mode: Mode,
}

impl WordClassifier {
    /// Construct the network with freshly initialized parameters registered
    /// under `vb`.
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;

        let stem_conv = conv1d(
            INPUT_CHANNELS,
            STEM_CHANNELS,
            STEM_KERNEL,
            Conv1dConfig {
                padding: 3,
                stride: 2,
                ..Default::default()
            },
            vb.pp("stem.conv"),
        )?;
        let stem_bn = batch_norm(STEM_CHANNELS, BatchNormConfig::default(), vb.pp("stem.bn"))?;

        let mut blocks = Vec::new();
        for (index, (in_ch, out_ch, count, stride)) in STAGES.iter().enumerate() {
            blocks.extend(stage(
                *in_ch,
                *out_ch,
                *count,
                *stride,
                config.dropout,
                vb.pp(format!("stage{index}")),
            )?);
        }

        let (_, head_width, _, _) = STAGES[STAGES.len() - 1];
        let head_fc = linear(head_width, config.num_classes, vb.pp("head.fc"))?;

        Ok(Self {
            stem_conv,
            stem_bn,
            blocks,
            head_dropout: Dropout::new(config.dropout),
            head_fc,
            mode: Mode::Eval,
        })
    }

    /// Create a fresh network together with the [`VarMap`] owning its
    /// parameters.
    pub fn build(config: &ModelConfig, device: &Device) -> Result<(VarMap, Self)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = Self::new(config, vb)?;
        Ok((varmap, model))
    }

    /// Current forward-pass mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch between training and evaluation behavior. Nothing else toggles
    /// the mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Compute class logits for a `[batch, 4, T]` input.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let train = self.mode == Mode::Train;

        let out = self.stem_conv.forward(xs)?;
        let out = self.stem_bn.forward_t(&out, train)?.relu()?;

        // Pool k3/s2 with padding 1. Zero padding is exact here: the pool
        // input is post-ReLU, so no padded value can win a max.
        let out = out.pad_with_zeros(D::Minus1, 1, 1)?;
        let out = out
            .unsqueeze(2)?
            .max_pool2d_with_stride((1, 3), (1, 2))?
            .squeeze(2)?;

        let mut out = out;
        for block in &self.blocks {
            out = block.forward_t(&out, train)?;
        }

        let pooled = out.mean(D::Minus1)?;
        let pooled = self.head_dropout.forward(&pooled, train)?;
        Ok(self.head_fc.forward(&pooled)?)
    }
}
