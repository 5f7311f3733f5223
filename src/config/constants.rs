// src/config/constants.rs
//! Pipeline-wide configuration constants

/// Signal conditioning constants
pub mod signal {
    pub const DEFAULT_SAMPLING_RATE_HZ: f32 = 1000.0;
    pub const DEFAULT_CHANNEL_COUNT: usize = 4;
    pub const DEFAULT_WINDOW_SAMPLES: usize = 3000;
    pub const DEFAULT_LOWCUT_HZ: f32 = 20.0;
    pub const DEFAULT_HIGHCUT_HZ: f32 = 450.0;
    pub const DEFAULT_FILTER_ORDER: usize = 4;
    pub const MIN_FILTER_ORDER: usize = 1;
    pub const MAX_FILTER_ORDER: usize = 8;
}

/// Augmentation constants
pub mod augment {
    pub const DEFAULT_MAX_SHIFT_SAMPLES: usize = 100;
    pub const DEFAULT_NOISE_LEVEL: f32 = 0.02;
    pub const DEFAULT_SCALE_RANGE: (f32, f32) = (0.9, 1.1);
    pub const DEFAULT_OFFSET_RANGE: (f32, f32) = (-0.1, 0.1);
    pub const DEFAULT_TRANSFORM_PROBABILITY: f64 = 0.5;

    /// Below this the window std is treated as zero and replaced by 1.0.
    pub const MIN_WINDOW_STD: f32 = 1e-6;
}

/// Model and training constants
pub mod training {
    pub const DEFAULT_NUM_CLASSES: usize = 10;
    pub const DEFAULT_DROPOUT: f32 = 0.3;
    pub const DEFAULT_BATCH_SIZE: usize = 16;
    pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
    pub const DEFAULT_WEIGHT_DECAY: f64 = 1e-4;
    pub const DEFAULT_EPOCHS: usize = 50;
    pub const DEFAULT_TRAIN_FRACTION: f32 = 0.8;
    pub const DEFAULT_SHUFFLE_SEED: u64 = 42;
    pub const DEFAULT_CHECKPOINT_PATH: &str = "best_model.safetensors";
}
