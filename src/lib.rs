//! EMG-Speech: silent-speech word classification from textile EMG sensors
//!
//! This library turns raw 4-channel electromyography recordings of spoken
//! words into class predictions. It provides:
//!
//! - Zero-phase band-pass conditioning of each channel
//! - Stochastic augmentation (shift, noise, scale+offset) for training
//! - A sample store binding conditioned windows to word labels
//! - A residual 1-D convolutional classifier with channel attention
//! - A fixed-epoch training loop with best-checkpoint persistence
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use candle_core::Device;
//! use emg_speech::config::PipelineConfig;
//! use emg_speech::dataset::{group_rows, split, SampleSet};
//! use emg_speech::processing::BandpassFilter;
//! use emg_speech::augment::Augmentor;
//! use emg_speech::train::Trainer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let rows = Vec::new(); // produced by the ingestion collaborator
//!
//!     let (windows, labels) = group_rows(&rows)?;
//!     let filter = BandpassFilter::from_config(&config.signal)?;
//!     let windows = windows
//!         .iter()
//!         .map(|w| filter.condition_window(w))
//!         .collect::<Result<Vec<_>, _>>()?;
//!
//!     let (tw, tl, vw, vl) = split(
//!         windows,
//!         labels,
//!         config.training.train_fraction,
//!         config.training.shuffle_seed,
//!     )?;
//!     let augmentor = Augmentor::new(config.augment.clone())?;
//!     let train_set = SampleSet::new(tw, tl, config.model.num_classes, Some(augmentor))?;
//!     let val_set = SampleSet::new(vw, vl, config.model.num_classes, None)?;
//!
//!     let mut trainer = Trainer::new(&config.model, config.training.clone(), Device::Cpu)?;
//!     let summary = trainer.fit(&train_set, &val_set)?;
//!     println!("best validation accuracy: {:.4}", summary.best_accuracy);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod augment;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod processing;
pub mod train;

// Re-export commonly used types for convenience
pub use augment::Augmentor;
pub use config::PipelineConfig;
pub use dataset::{group_rows, split, SampleRow, SampleSet};
pub use error::{EmgError, Result};
pub use model::{Mode, WordClassifier};
pub use processing::BandpassFilter;
pub use train::{EpochMetrics, FitSummary, Trainer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
