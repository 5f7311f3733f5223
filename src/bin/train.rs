// src/bin/train.rs
//! Train the word classifier from a recorded session.
//!
//! ```bash
//! cargo run --bin speech-train --release -- recordings.csv [config.toml]
//! ```
//!
//! The CSV must carry the columns
//! `sample_id, time_index, ch1, ch2, ch3, ch4, label`; rows sharing a
//! `sample_id` form one utterance.

use candle_core::Device;

use emg_speech::augment::Augmentor;
use emg_speech::config::PipelineConfig;
use emg_speech::dataset::{group_rows, split, SampleRow, SampleSet};
use emg_speech::processing::BandpassFilter;
use emg_speech::train::Trainer;
use emg_speech::{EmgError, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let data_path = args.next().ok_or_else(|| EmgError::Configuration {
        component: "cli",
        reason: "usage: speech-train <recordings.csv> [config.toml]".into(),
    })?;
    let config = match args.next() {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut reader = csv::Reader::from_path(&data_path)?;
    let rows: Vec<SampleRow> = reader
        .deserialize()
        .collect::<std::result::Result<_, csv::Error>>()?;
    tracing::info!("read {} rows from {}", rows.len(), data_path);

    let (windows, labels) = group_rows(&rows)?;
    tracing::info!("grouped {} utterance windows", windows.len());

    let filter = BandpassFilter::from_config(&config.signal)?;
    let windows = windows
        .iter()
        .map(|window| filter.condition_window(window))
        .collect::<Result<Vec<_>>>()?;

    let (train_windows, train_labels, val_windows, val_labels) = split(
        windows,
        labels,
        config.training.train_fraction,
        config.training.shuffle_seed,
    )?;
    tracing::info!(
        "split into {} training / {} validation windows",
        train_windows.len(),
        val_windows.len()
    );

    let augmentor = Augmentor::new(config.augment.clone())?;
    let train_set = SampleSet::new(
        train_windows,
        train_labels,
        config.model.num_classes,
        Some(augmentor),
    )?;
    let val_set = SampleSet::new(val_windows, val_labels, config.model.num_classes, None)?;

    let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
    let mut trainer = Trainer::new(&config.model, config.training.clone(), device)?;
    let summary = trainer.fit(&train_set, &val_set)?;

    println!("best validation accuracy: {:.4}", summary.best_accuracy);
    Ok(())
}
