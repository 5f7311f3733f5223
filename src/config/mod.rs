// src/config/mod.rs
//! Configuration management for the speech classification pipeline

pub mod constants;

pub use constants::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EmgError, Result};

/// Complete pipeline configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub augment: AugmentConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

/// Signal conditioning settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignalConfig {
    #[serde(default = "defaults::sampling_rate_hz")]
    pub sampling_rate_hz: f32,

    #[serde(default = "defaults::channel_count")]
    pub channel_count: usize,

    #[serde(default = "defaults::window_samples")]
    pub window_samples: usize,

    #[serde(default = "defaults::lowcut_hz")]
    pub lowcut_hz: f32,

    #[serde(default = "defaults::highcut_hz")]
    pub highcut_hz: f32,

    #[serde(default = "defaults::filter_order")]
    pub filter_order: usize,
}

/// Stochastic augmentation settings; applied to the training split only.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AugmentConfig {
    #[serde(default = "defaults::max_shift_samples")]
    pub max_shift_samples: usize,

    #[serde(default = "defaults::noise_level")]
    pub noise_level: f32,

    #[serde(default = "defaults::scale_range")]
    pub scale_range: (f32, f32),

    #[serde(default = "defaults::offset_range")]
    pub offset_range: (f32, f32),

    #[serde(default = "defaults::transform_probability")]
    pub transform_probability: f64,
}

/// Classifier network settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "defaults::num_classes")]
    pub num_classes: usize,

    #[serde(default = "defaults::dropout")]
    pub dropout: f32,
}

/// Training loop settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrainingConfig {
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    #[serde(default = "defaults::learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "defaults::weight_decay")]
    pub weight_decay: f64,

    #[serde(default = "defaults::epochs")]
    pub epochs: usize,

    #[serde(default = "defaults::train_fraction")]
    pub train_fraction: f32,

    #[serde(default = "defaults::shuffle_seed")]
    pub shuffle_seed: u64,

    #[serde(default = "defaults::checkpoint_path")]
    pub checkpoint_path: PathBuf,
}

/// Default value providers using constants
mod defaults {
    use std::path::PathBuf;

    use super::constants::{augment, signal, training};

    pub fn sampling_rate_hz() -> f32 { signal::DEFAULT_SAMPLING_RATE_HZ }
    pub fn channel_count() -> usize { signal::DEFAULT_CHANNEL_COUNT }
    pub fn window_samples() -> usize { signal::DEFAULT_WINDOW_SAMPLES }
    pub fn lowcut_hz() -> f32 { signal::DEFAULT_LOWCUT_HZ }
    pub fn highcut_hz() -> f32 { signal::DEFAULT_HIGHCUT_HZ }
    pub fn filter_order() -> usize { signal::DEFAULT_FILTER_ORDER }

    pub fn max_shift_samples() -> usize { augment::DEFAULT_MAX_SHIFT_SAMPLES }
    pub fn noise_level() -> f32 { augment::DEFAULT_NOISE_LEVEL }
    pub fn scale_range() -> (f32, f32) { augment::DEFAULT_SCALE_RANGE }
    pub fn offset_range() -> (f32, f32) { augment::DEFAULT_OFFSET_RANGE }
    pub fn transform_probability() -> f64 { augment::DEFAULT_TRANSFORM_PROBABILITY }

    pub fn num_classes() -> usize { training::DEFAULT_NUM_CLASSES }
    pub fn dropout() -> f32 { training::DEFAULT_DROPOUT }
    pub fn batch_size() -> usize { training::DEFAULT_BATCH_SIZE }
    pub fn learning_rate() -> f64 { training::DEFAULT_LEARNING_RATE }
    pub fn weight_decay() -> f64 { training::DEFAULT_WEIGHT_DECAY }
    pub fn epochs() -> usize { training::DEFAULT_EPOCHS }
    pub fn train_fraction() -> f32 { training::DEFAULT_TRAIN_FRACTION }
    pub fn shuffle_seed() -> u64 { training::DEFAULT_SHUFFLE_SEED }
    pub fn checkpoint_path() -> PathBuf { PathBuf::from(training::DEFAULT_CHECKPOINT_PATH) }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: defaults::sampling_rate_hz(),
            channel_count: defaults::channel_count(),
            window_samples: defaults::window_samples(),
            lowcut_hz: defaults::lowcut_hz(),
            highcut_hz: defaults::highcut_hz(),
            filter_order: defaults::filter_order(),
        }
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            max_shift_samples: defaults::max_shift_samples(),
            noise_level: defaults::noise_level(),
            scale_range: defaults::scale_range(),
            offset_range: defaults::offset_range(),
            transform_probability: defaults::transform_probability(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_classes: defaults::num_classes(),
            dropout: defaults::dropout(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            learning_rate: defaults::learning_rate(),
            weight_decay: defaults::weight_decay(),
            epochs: defaults::epochs(),
            train_fraction: defaults::train_fraction(),
            shuffle_seed: defaults::shuffle_seed(),
            checkpoint_path: defaults::checkpoint_path(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section, failing fast on the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.signal.validate()?;
        self.augment.validate()?;
        self.model.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

impl SignalConfig {
    /// Nyquist frequency for the configured sampling rate.
    pub fn nyquist_hz(&self) -> f32 {
        self.sampling_rate_hz / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling_rate_hz <= 0.0 {
            return Err(config_error(
                "signal",
                format!("sampling rate must be positive, got {} Hz", self.sampling_rate_hz),
            ));
        }
        if self.lowcut_hz <= 0.0 || self.lowcut_hz >= self.highcut_hz {
            return Err(config_error(
                "signal",
                format!(
                    "invalid band-pass range: {} - {} Hz",
                    self.lowcut_hz, self.highcut_hz
                ),
            ));
        }
        if self.highcut_hz >= self.nyquist_hz() {
            return Err(config_error(
                "signal",
                format!(
                    "high cutoff {} Hz must stay below Nyquist {} Hz",
                    self.highcut_hz,
                    self.nyquist_hz()
                ),
            ));
        }
        if !(signal::MIN_FILTER_ORDER..=signal::MAX_FILTER_ORDER).contains(&self.filter_order) {
            return Err(config_error(
                "signal",
                format!(
                    "filter order must be {}-{}, got {}",
                    signal::MIN_FILTER_ORDER,
                    signal::MAX_FILTER_ORDER,
                    self.filter_order
                ),
            ));
        }
        if self.channel_count == 0 {
            return Err(config_error("signal", "channel count must be non-zero".into()));
        }
        if self.window_samples == 0 {
            return Err(config_error("signal", "window length must be non-zero".into()));
        }
        Ok(())
    }
}

impl AugmentConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.transform_probability) {
            return Err(config_error(
                "augment",
                format!("transform probability must be in [0, 1], got {}", self.transform_probability),
            ));
        }
        if self.noise_level < 0.0 {
            return Err(config_error(
                "augment",
                format!("noise level must be non-negative, got {}", self.noise_level),
            ));
        }
        if self.scale_range.0 > self.scale_range.1 {
            return Err(config_error(
                "augment",
                format!("scale range is inverted: {:?}", self.scale_range),
            ));
        }
        if self.offset_range.0 > self.offset_range.1 {
            return Err(config_error(
                "augment",
                format!("offset range is inverted: {:?}", self.offset_range),
            ));
        }
        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_classes < 2 {
            return Err(config_error(
                "model",
                format!("need at least 2 classes, got {}", self.num_classes),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(config_error(
                "model",
                format!("dropout must be in [0, 1), got {}", self.dropout),
            ));
        }
        Ok(())
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(config_error("training", "batch size must be non-zero".into()));
        }
        if self.learning_rate <= 0.0 {
            return Err(config_error(
                "training",
                format!("learning rate must be positive, got {}", self.learning_rate),
            ));
        }
        if self.weight_decay < 0.0 {
            return Err(config_error(
                "training",
                format!("weight decay must be non-negative, got {}", self.weight_decay),
            ));
        }
        if self.epochs == 0 {
            return Err(config_error("training", "epoch count must be non-zero".into()));
        }
        if !(0.0..1.0).contains(&self.train_fraction) || self.train_fraction == 0.0 {
            return Err(config_error(
                "training",
                format!("train fraction must be in (0, 1), got {}", self.train_fraction),
            ));
        }
        Ok(())
    }
}

fn config_error(component: &'static str, reason: String) -> EmgError {
    EmgError::Configuration { component, reason }
}
