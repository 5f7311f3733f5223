// src/train.rs
//! Training and evaluation loop for the word classifier
//!
//! Each epoch runs two phases: a training pass over shuffled full batches
//! (the remainder batch is dropped) and a validation pass in fixed order over
//! every held-out sample. The trainer owns the best-accuracy record; the
//! checkpoint on disk is overwritten only when validation accuracy strictly
//! improves. Training runs for the configured epoch count — no early
//! stopping, no learning-rate schedule.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::loss::cross_entropy;
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

use crate::config::{ModelConfig, TrainingConfig};
use crate::dataset::SampleSet;
use crate::error::{EmgError, Result};
use crate::model::{Mode, WordClassifier};

/// Loss and accuracy for one epoch, both splits.
#[derive(Debug, Clone)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Size-weighted mean training loss.
    pub train_loss: f32,
    /// Training accuracy in `[0, 1]`.
    pub train_accuracy: f32,
    /// Mean validation loss.
    pub val_loss: f32,
    /// Validation accuracy in `[0, 1]`.
    pub val_accuracy: f32,
    /// Best validation accuracy observed through this epoch.
    pub best_accuracy: f32,
}

/// Outcome of a full training run.
#[derive(Debug, Clone)]
pub struct FitSummary {
    /// Best validation accuracy across all epochs.
    pub best_accuracy: f32,
    /// Number of checkpoints written (one per strict improvement).
    pub checkpoints_saved: usize,
    /// Per-epoch metrics in order.
    pub history: Vec<EpochMetrics>,
}

/// Training orchestrator owning the network parameters and the best-accuracy
/// record.
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    varmap: VarMap,
    model: WordClassifier,
    best_accuracy: f32,
}

impl Trainer {
    /// Build a trainer with a freshly initialized network on `device`.
    pub fn new(
        model_config: &ModelConfig,
        config: TrainingConfig,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        let (varmap, model) = WordClassifier::build(model_config, &device)?;
        Ok(Self {
            config,
            device,
            varmap,
            model,
            best_accuracy: 0.0,
        })
    }

    /// The network being trained.
    pub fn model(&self) -> &WordClassifier {
        &self.model
    }

    /// Mutable access to the network, e.g. for setting the mode around
    /// ad-hoc inference.
    pub fn model_mut(&mut self) -> &mut WordClassifier {
        &mut self.model
    }

    /// Best validation accuracy observed so far.
    pub fn best_accuracy(&self) -> f32 {
        self.best_accuracy
    }

    /// Restore parameters from a checkpoint written by a previous run.
    ///
    /// The architecture must match; afterwards evaluation reproduces the
    /// checkpointed model's logits exactly.
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.varmap.load(path)?;
        Ok(())
    }

    /// Run the full training loop.
    ///
    /// Fails before the first epoch if either store cannot produce a single
    /// batch: metrics would otherwise divide by zero, which is invalid
    /// configuration rather than a runtime fluke.
    pub fn fit(&mut self, train_set: &SampleSet, val_set: &SampleSet) -> Result<FitSummary> {
        if train_set.len() < self.config.batch_size {
            return Err(EmgError::EmptyDataset(format!(
                "training set of {} samples yields no full batch of {}",
                train_set.len(),
                self.config.batch_size
            )));
        }
        if val_set.is_empty() {
            return Err(EmgError::EmptyDataset("validation set is empty".into()));
        }
        if val_set.is_augmenting() {
            return Err(EmgError::Configuration {
                component: "training",
                reason: "validation store must not augment".into(),
            });
        }

        let mut optimizer = AdamW::new(
            self.varmap.all_vars(),
            ParamsAdamW {
                lr: self.config.learning_rate,
                weight_decay: self.config.weight_decay,
                ..Default::default()
            },
        )?;

        let mut rng = StdRng::seed_from_u64(self.config.shuffle_seed);
        let mut indices: Vec<usize> = (0..train_set.len()).collect();
        let mut checkpoints_saved = 0;
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            self.model.set_mode(Mode::Train);
            indices.shuffle(&mut rng);

            let mut loss_sum = 0.0f32;
            let mut correct = 0usize;
            let mut seen = 0usize;

            // Full batches only; the remainder is dropped on purpose. The
            // validation pass below keeps its remainder.
            for batch_indices in indices.chunks_exact(self.config.batch_size) {
                let (inputs, targets) = train_set.batch(batch_indices, &self.device, &mut rng)?;
                let logits = self.model.forward(&inputs)?;
                let loss = cross_entropy(&logits, &targets)?;
                optimizer.backward_step(&loss)?;

                loss_sum += loss.to_scalar::<f32>()? * batch_indices.len() as f32;
                correct += count_correct(&logits, &targets)?;
                seen += batch_indices.len();
            }

            if seen == 0 {
                return Err(EmgError::EmptyDataset(
                    "training phase processed zero samples".into(),
                ));
            }
            let train_loss = loss_sum / seen as f32;
            let train_accuracy = correct as f32 / seen as f32;

            let (val_loss, val_accuracy) = self.evaluate(val_set)?;

            tracing::info!(
                "epoch {:>3}: train loss {:.4} acc {:.4} | val loss {:.4} acc {:.4}",
                epoch,
                train_loss,
                train_accuracy,
                val_loss,
                val_accuracy
            );

            if val_accuracy > self.best_accuracy {
                self.best_accuracy = val_accuracy;
                self.varmap.save(&self.config.checkpoint_path)?;
                checkpoints_saved += 1;
                tracing::info!(
                    "new best validation accuracy {:.4}, checkpoint saved to {}",
                    val_accuracy,
                    self.config.checkpoint_path.display()
                );
            }

            history.push(EpochMetrics {
                epoch,
                train_loss,
                train_accuracy,
                val_loss,
                val_accuracy,
                best_accuracy: self.best_accuracy,
            });
        }

        tracing::info!("best validation accuracy: {:.4}", self.best_accuracy);

        Ok(FitSummary {
            best_accuracy: self.best_accuracy,
            checkpoints_saved,
            history,
        })
    }

    /// Evaluate the current parameters over `set` in fixed order.
    ///
    /// Runs in [`Mode::Eval`]: running statistics, no dropout, no gradient
    /// steps. Repeated calls with unchanged parameters return identical
    /// metrics.
    pub fn evaluate(&mut self, set: &SampleSet) -> Result<(f32, f32)> {
        if set.is_empty() {
            return Err(EmgError::EmptyDataset(
                "evaluation over an empty store".into(),
            ));
        }

        self.model.set_mode(Mode::Eval);

        // The store does not augment, so retrieval never consumes randomness.
        let mut rng = StdRng::seed_from_u64(0);
        let indices: Vec<usize> = (0..set.len()).collect();

        let mut loss_sum = 0.0f32;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for batch_indices in indices.chunks(self.config.batch_size) {
            let (inputs, targets) = set.batch(batch_indices, &self.device, &mut rng)?;
            let logits = self.model.forward(&inputs)?;
            let loss = cross_entropy(&logits, &targets)?;

            loss_sum += loss.to_scalar::<f32>()? * batch_indices.len() as f32;
            correct += count_correct(&logits, &targets)?;
            seen += batch_indices.len();
        }

        Ok((loss_sum / seen as f32, correct as f32 / seen as f32))
    }
}

/// Count argmax predictions matching the target class indices.
fn count_correct(logits: &Tensor, targets: &Tensor) -> Result<usize> {
    let predictions = logits.argmax(D::Minus1)?;
    let matches = predictions
        .eq(targets)?
        .to_dtype(DType::U32)?
        .sum_all()?
        .to_scalar::<u32>()?;
    Ok(matches as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn store(count: usize, samples: usize) -> SampleSet {
        let windows = (0..count)
            .map(|i| Array2::from_elem((4, samples), i as f32))
            .collect();
        let labels = (0..count).map(|i| (i as u32 % 10) + 1).collect();
        SampleSet::new(windows, labels, 10, None).unwrap()
    }

    #[test]
    fn test_count_correct() {
        let device = Device::Cpu;
        let logits = Tensor::from_vec(
            vec![0.1f32, 2.0, 0.3, 4.0, 0.1, 0.2],
            (2, 3),
            &device,
        )
        .unwrap();
        let targets = Tensor::from_vec(vec![1u32, 2], 2, &device).unwrap();
        // Row 0 predicts class 1 (correct), row 1 predicts class 0 (wrong).
        assert_eq!(count_correct(&logits, &targets).unwrap(), 1);
    }

    #[test]
    fn test_fit_rejects_sub_batch_training_set() {
        let model_config = ModelConfig::default();
        let config = TrainingConfig {
            batch_size: 16,
            ..TrainingConfig::default()
        };
        let mut trainer = Trainer::new(&model_config, config, Device::Cpu).unwrap();
        let train = store(8, 64);
        let val = store(4, 64);
        let err = trainer.fit(&train, &val).unwrap_err();
        assert!(matches!(err, EmgError::EmptyDataset(_)));
    }

    #[test]
    fn test_fit_rejects_empty_validation_set() {
        let model_config = ModelConfig::default();
        let config = TrainingConfig {
            batch_size: 4,
            ..TrainingConfig::default()
        };
        let mut trainer = Trainer::new(&model_config, config, Device::Cpu).unwrap();
        let train = store(8, 64);
        let val = SampleSet::new(Vec::new(), Vec::new(), 10, None).unwrap();
        let err = trainer.fit(&train, &val).unwrap_err();
        assert!(matches!(err, EmgError::EmptyDataset(_)));
    }

    #[test]
    fn test_evaluate_rejects_empty_store() {
        let model_config = ModelConfig::default();
        let mut trainer =
            Trainer::new(&model_config, TrainingConfig::default(), Device::Cpu).unwrap();
        let empty = SampleSet::new(Vec::new(), Vec::new(), 10, None).unwrap();
        assert!(matches!(
            trainer.evaluate(&empty),
            Err(EmgError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let model_config = ModelConfig::default();
        let config = TrainingConfig {
            batch_size: 4,
            ..TrainingConfig::default()
        };
        let mut trainer = Trainer::new(&model_config, config, Device::Cpu).unwrap();
        let set = store(10, 128);
        let first = trainer.evaluate(&set).unwrap();
        let second = trainer.evaluate(&set).unwrap();
        assert_eq!(first, second);
    }
}
