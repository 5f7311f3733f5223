// src/error.rs
//! Unified error handling for the EMG speech pipeline
//!
//! Every component reports through [`EmgError`] so that ingestion, signal
//! conditioning, and training failures propagate uniformly and halt the run.
//! Data-integrity violations carry the offending `sample_id` or lengths so
//! the bad recording can be located.

use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, EmgError>;

/// Errors produced by the EMG speech pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmgError {
    /// Invalid configuration value.
    #[error("configuration error in {component}: {reason}")]
    Configuration {
        /// Component the bad value belongs to.
        component: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// One utterance carries two different labels.
    #[error("conflicting labels for sample {sample_id}: {first} vs {second}")]
    ConflictingLabels {
        /// Identifier of the offending utterance.
        sample_id: u32,
        /// Label seen first.
        first: u32,
        /// Contradicting label.
        second: u32,
    },

    /// Signal and label arrays do not pair up.
    #[error("signal/label length mismatch: {signals} windows vs {labels} labels")]
    LengthMismatch {
        /// Number of signal windows.
        signals: usize,
        /// Number of labels.
        labels: usize,
    },

    /// A raw label falls outside the closed range `[1, num_classes]`.
    #[error("label {label} outside valid range [1, {num_classes}]")]
    LabelOutOfRange {
        /// The raw 1-based label.
        label: u32,
        /// Configured class count.
        num_classes: usize,
    },

    /// Input too short for the filter to settle.
    #[error("signal of {length} samples is shorter than the filter settling length {min_length}")]
    SignalTooShort {
        /// Actual input length.
        length: usize,
        /// Minimum stable length for the configured order.
        min_length: usize,
    },

    /// A training or validation phase would divide by a zero sample count.
    #[error("empty dataset: {0}")]
    EmptyDataset(String),

    /// Tensor operation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Configuration file parse error.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Data file parse error.
    #[error("data parse error: {0}")]
    DataParse(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
