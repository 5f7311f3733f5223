// src/dataset.rs
//! Sample store binding conditioned EMG windows to word labels
//!
//! Windows enter the store already filtered; augmentation, when enabled, is
//! applied per access and never touches the stored original. Raw labels are
//! 1-based in the tabular input and are zero-based exactly once, here, at
//! construction time.

use std::collections::BTreeMap;

use candle_core::{Device, Tensor};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::augment::Augmentor;
use crate::error::{EmgError, Result};

/// One row of the external tabular recording format.
///
/// Rows sharing a `sample_id` form one utterance window; their `label` must
/// agree.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleRow {
    pub sample_id: u32,
    pub time_index: u32,
    pub ch1: f32,
    pub ch2: f32,
    pub ch3: f32,
    pub ch4: f32,
    pub label: u32,
}

/// Group tabular rows into `[4, T]` windows plus their 1-based labels.
///
/// Rows are ordered by `time_index` within each utterance, and utterances are
/// emitted in ascending `sample_id` order. Two distinct labels under one
/// `sample_id` is a fatal data-integrity error.
pub fn group_rows(rows: &[SampleRow]) -> Result<(Vec<Array2<f32>>, Vec<u32>)> {
    let mut groups: BTreeMap<u32, (u32, Vec<(u32, [f32; 4])>)> = BTreeMap::new();

    for row in rows {
        match groups.get_mut(&row.sample_id) {
            Some((label, samples)) => {
                if *label != row.label {
                    return Err(EmgError::ConflictingLabels {
                        sample_id: row.sample_id,
                        first: *label,
                        second: row.label,
                    });
                }
                samples.push((row.time_index, [row.ch1, row.ch2, row.ch3, row.ch4]));
            }
            None => {
                groups.insert(
                    row.sample_id,
                    (row.label, vec![(row.time_index, [row.ch1, row.ch2, row.ch3, row.ch4])]),
                );
            }
        }
    }

    let mut windows = Vec::with_capacity(groups.len());
    let mut labels = Vec::with_capacity(groups.len());
    for (_, (label, mut samples)) in groups {
        samples.sort_by_key(|(time_index, _)| *time_index);
        let mut window = Array2::zeros((4, samples.len()));
        for (t, (_, channels)) in samples.iter().enumerate() {
            for (c, value) in channels.iter().enumerate() {
                window[[c, t]] = *value;
            }
        }
        windows.push(window);
        labels.push(label);
    }
    Ok((windows, labels))
}

/// Seeded shuffled partition into train and validation halves.
pub fn split(
    windows: Vec<Array2<f32>>,
    labels: Vec<u32>,
    train_fraction: f32,
    seed: u64,
) -> Result<(Vec<Array2<f32>>, Vec<u32>, Vec<Array2<f32>>, Vec<u32>)> {
    if windows.len() != labels.len() {
        return Err(EmgError::LengthMismatch {
            signals: windows.len(),
            labels: labels.len(),
        });
    }

    let mut indices: Vec<usize> = (0..windows.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let cut = ((windows.len() as f32) * train_fraction).round() as usize;
    let cut = cut.min(windows.len());

    let mut slots: Vec<Option<(Array2<f32>, u32)>> = windows
        .into_iter()
        .zip(labels)
        .map(Some)
        .collect();

    let mut take = |idx: &[usize]| -> (Vec<Array2<f32>>, Vec<u32>) {
        let mut w = Vec::with_capacity(idx.len());
        let mut l = Vec::with_capacity(idx.len());
        for &i in idx {
            let (window, label) = slots[i].take().expect("index used twice");
            w.push(window);
            l.push(label);
        }
        (w, l)
    };

    let (train_w, train_l) = take(&indices[..cut]);
    let (val_w, val_l) = take(&indices[cut..]);
    Ok((train_w, train_l, val_w, val_l))
}

/// Indexable store of labeled utterance windows.
///
/// Augmenting mode is fixed at construction; retrieval applies the pipeline
/// if and only if an [`Augmentor`] was supplied.
#[derive(Debug)]
pub struct SampleSet {
    windows: Vec<Array2<f32>>,
    classes: Vec<u32>,
    augmentor: Option<Augmentor>,
}

impl SampleSet {
    /// Build a store from windows and raw 1-based labels.
    ///
    /// Fails on mismatched array lengths, labels outside `[1, num_classes]`,
    /// or windows of differing shape. Labels are stored as zero-based class
    /// indices.
    pub fn new(
        windows: Vec<Array2<f32>>,
        labels: Vec<u32>,
        num_classes: usize,
        augmentor: Option<Augmentor>,
    ) -> Result<Self> {
        if windows.len() != labels.len() {
            return Err(EmgError::LengthMismatch {
                signals: windows.len(),
                labels: labels.len(),
            });
        }
        if let Some(first) = windows.first() {
            let dim = first.dim();
            for window in &windows {
                if window.dim() != dim {
                    return Err(EmgError::Configuration {
                        component: "dataset",
                        reason: format!(
                            "all windows must share one shape; found {:?} and {:?}",
                            dim,
                            window.dim()
                        ),
                    });
                }
            }
        }

        let mut classes = Vec::with_capacity(labels.len());
        for &label in &labels {
            if label < 1 || label as usize > num_classes {
                return Err(EmgError::LabelOutOfRange { label, num_classes });
            }
            classes.push(label - 1);
        }

        Ok(Self {
            windows,
            classes,
            augmentor,
        })
    }

    /// Number of stored windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether the store holds no windows.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Whether retrieval augments.
    pub fn is_augmenting(&self) -> bool {
        self.augmentor.is_some()
    }

    /// Zero-based class indices, aligned with window indices.
    pub fn classes(&self) -> &[u32] {
        &self.classes
    }

    /// Shape of the stored windows as `(channels, samples)`.
    pub fn window_dim(&self) -> Option<(usize, usize)> {
        self.windows.first().map(|w| w.dim())
    }

    /// Retrieve one window and its zero-based class index.
    ///
    /// In augmenting mode the returned window is a freshly transformed copy;
    /// otherwise it is a clone of the stored original.
    pub fn fetch<R: Rng>(&self, index: usize, rng: &mut R) -> (Array2<f32>, u32) {
        let window = match &self.augmentor {
            Some(augmentor) => augmentor.apply(&self.windows[index], rng),
            None => self.windows[index].clone(),
        };
        (window, self.classes[index])
    }

    /// Assemble the windows at `indices` into a `[B, 4, T]` input tensor and
    /// a `[B]` class-index tensor on `device`.
    pub fn batch<R: Rng>(
        &self,
        indices: &[usize],
        device: &Device,
        rng: &mut R,
    ) -> Result<(Tensor, Tensor)> {
        let (channels, samples) = self.window_dim().ok_or_else(|| {
            EmgError::EmptyDataset("cannot assemble a batch from an empty store".into())
        })?;

        let mut flat = Vec::with_capacity(indices.len() * channels * samples);
        let mut targets = Vec::with_capacity(indices.len());
        for &index in indices {
            let (window, class) = self.fetch(index, rng);
            flat.extend(window.iter().copied());
            targets.push(class);
        }

        let inputs = Tensor::from_vec(flat, (indices.len(), channels, samples), device)?;
        let classes = Tensor::from_vec(targets, indices.len(), device)?;
        Ok((inputs, classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AugmentConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn window_of(value: f32, samples: usize) -> Array2<f32> {
        Array2::from_elem((4, samples), value)
    }

    fn rows_for(sample_id: u32, label: u32, samples: u32) -> Vec<SampleRow> {
        (0..samples)
            .map(|t| SampleRow {
                sample_id,
                time_index: t,
                ch1: t as f32,
                ch2: 0.0,
                ch3: 0.0,
                ch4: 0.0,
                label,
            })
            .collect()
    }

    #[test]
    fn test_zero_basing_exhaustive() {
        for label in 1..=10u32 {
            let set = SampleSet::new(vec![window_of(1.0, 32)], vec![label], 10, None).unwrap();
            assert_eq!(set.classes(), &[label - 1]);
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = SampleSet::new(vec![window_of(1.0, 32)], vec![1, 2], 10, None).unwrap_err();
        assert!(matches!(err, EmgError::LengthMismatch { signals: 1, labels: 2 }));
    }

    #[test]
    fn test_label_out_of_range_rejected() {
        for bad in [0u32, 11] {
            let err = SampleSet::new(vec![window_of(1.0, 32)], vec![bad], 10, None).unwrap_err();
            assert!(matches!(err, EmgError::LabelOutOfRange { .. }));
        }
    }

    #[test]
    fn test_conflicting_labels_fatal() {
        let mut rows = rows_for(5, 2, 10);
        rows.push(SampleRow {
            sample_id: 5,
            time_index: 10,
            ch1: 0.0,
            ch2: 0.0,
            ch3: 0.0,
            ch4: 0.0,
            label: 3,
        });
        match group_rows(&rows) {
            Err(EmgError::ConflictingLabels { sample_id, first, second }) => {
                assert_eq!(sample_id, 5);
                assert_eq!(first, 2);
                assert_eq!(second, 3);
            }
            other => panic!("expected ConflictingLabels, got {other:?}"),
        }
    }

    #[test]
    fn test_group_rows_orders_by_time_index() {
        let mut rows = rows_for(1, 4, 8);
        rows.reverse();
        let (windows, labels) = group_rows(&rows).unwrap();
        assert_eq!(labels, vec![4]);
        assert_eq!(windows[0].dim(), (4, 8));
        for t in 0..8 {
            assert_eq!(windows[0][[0, t]], t as f32);
        }
    }

    #[test]
    fn test_fetch_without_augmentor_returns_original() {
        let set = SampleSet::new(vec![window_of(2.5, 16)], vec![7], 10, None).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (window, class) = set.fetch(0, &mut rng);
        assert_eq!(class, 6);
        assert!(window.iter().all(|&x| x == 2.5));
    }

    #[test]
    fn test_augmented_fetch_redraws_per_access() {
        let config = AugmentConfig {
            transform_probability: 1.0,
            ..AugmentConfig::default()
        };
        let augmentor = Augmentor::new(config).unwrap();
        let set = SampleSet::new(vec![window_of(1.0, 256)], vec![1], 10, Some(augmentor)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let (first, _) = set.fetch(0, &mut rng);
        let (second, _) = set.fetch(0, &mut rng);
        assert_ne!(first, second);
        // Seeded replay reproduces the first draw, so the stored original
        // cannot have been mutated by the accesses above.
        let mut replay = StdRng::seed_from_u64(1);
        let (replayed, _) = set.fetch(0, &mut replay);
        assert_eq!(first, replayed);
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let windows: Vec<Array2<f32>> = (0..10).map(|i| window_of(i as f32, 8)).collect();
        let labels: Vec<u32> = (0..10).map(|i| (i % 10) + 1).collect();

        let (tw, tl, vw, vl) = split(windows.clone(), labels.clone(), 0.8, 42).unwrap();
        assert_eq!(tw.len(), 8);
        assert_eq!(vw.len(), 2);
        assert_eq!(tl.len(), 8);
        assert_eq!(vl.len(), 2);

        let (tw2, _, _, _) = split(windows, labels, 0.8, 42).unwrap();
        for (a, b) in tw.iter().zip(tw2.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_batch_shapes() {
        let windows: Vec<Array2<f32>> = (0..4).map(|i| window_of(i as f32, 32)).collect();
        let set = SampleSet::new(windows, vec![1, 2, 3, 4], 10, None).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (inputs, classes) = set.batch(&[0, 2, 3], &Device::Cpu, &mut rng).unwrap();
        assert_eq!(inputs.dims(), &[3, 4, 32]);
        assert_eq!(classes.dims(), &[3]);
        assert_eq!(classes.to_vec1::<u32>().unwrap(), vec![0, 2, 3]);
    }
}
