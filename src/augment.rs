// src/augment.rs
//! Stochastic augmentation for training windows
//!
//! Three independent transforms gated by Bernoulli(0.5) draws, composed in a
//! fixed order: time shift, then additive Gaussian noise, then a global
//! scale+offset. The order matters; the transforms do not commute. Every
//! invocation re-draws all parameters, and the stored original is never
//! mutated.

use ndarray::{s, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::constants::augment::MIN_WINDOW_STD;
use crate::config::AugmentConfig;
use crate::error::Result;

/// Standard deviation over every element of a window.
pub fn window_std(window: &Array2<f32>) -> f32 {
    let mean = window.mean().unwrap_or(0.0);
    let count = window.len().max(1) as f32;
    let variance = window.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / count;
    variance.sqrt()
}

/// Augmentation pipeline over one `[channels, samples]` window.
#[derive(Debug)]
pub struct Augmentor {
    config: AugmentConfig,
}

impl Augmentor {
    /// Create an augmentor from a validated configuration.
    pub fn new(config: AugmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Apply the pipeline once, re-drawing every random parameter.
    pub fn apply<R: Rng>(&self, window: &Array2<f32>, rng: &mut R) -> Array2<f32> {
        let p = self.config.transform_probability;
        let mut out = window.clone();

        if rng.gen_bool(p) {
            let max = self.config.max_shift_samples as i64;
            let shift = if max == 0 { 0 } else { rng.gen_range(-max..=max) };
            out = Self::shifted(&out, shift);
        }
        if rng.gen_bool(p) {
            out = self.with_noise(&out, rng);
        }
        if rng.gen_bool(p) {
            let (scale_lo, scale_hi) = self.config.scale_range;
            let (offset_lo, offset_hi) = self.config.offset_range;
            let scale = if scale_lo < scale_hi { rng.gen_range(scale_lo..scale_hi) } else { scale_lo };
            let offset = if offset_lo < offset_hi { rng.gen_range(offset_lo..offset_hi) } else { offset_lo };
            out = Self::scaled(&out, scale, offset);
        }
        out
    }

    /// Shift all channels together by `shift` samples along the time axis.
    ///
    /// Positive shifts move content toward later time; vacated positions are
    /// zero-filled and nothing wraps around. A shift of 0 returns the input
    /// unchanged.
    pub fn shifted(window: &Array2<f32>, shift: i64) -> Array2<f32> {
        let (_, samples) = window.dim();
        let magnitude = shift.unsigned_abs() as usize;
        if shift == 0 {
            return window.clone();
        }
        if magnitude >= samples {
            return Array2::zeros(window.raw_dim());
        }

        let mut out = Array2::zeros(window.raw_dim());
        if shift > 0 {
            out.slice_mut(s![.., magnitude..])
                .assign(&window.slice(s![.., ..samples - magnitude]));
        } else {
            out.slice_mut(s![.., ..samples - magnitude])
                .assign(&window.slice(s![.., magnitude..]));
        }
        out
    }

    /// Add i.i.d. Gaussian noise scaled to the window's overall standard
    /// deviation.
    ///
    /// A near-zero std (below 1e-6) is replaced by 1.0 so a flat window still
    /// receives well-defined noise instead of a degenerate draw.
    pub fn with_noise<R: Rng>(&self, window: &Array2<f32>, rng: &mut R) -> Array2<f32> {
        let mut std = window_std(window);
        if std < MIN_WINDOW_STD {
            std = 1.0;
        }
        let sigma = std * self.config.noise_level;
        window.mapv(|x| {
            let n: f32 = rng.sample(StandardNormal);
            x + n * sigma
        })
    }

    /// Apply one scalar `scale` and `offset` uniformly across the window.
    pub fn scaled(window: &Array2<f32>, scale: f32, offset: f32) -> Array2<f32> {
        window.mapv(|x| x * scale + offset)
    }
}
