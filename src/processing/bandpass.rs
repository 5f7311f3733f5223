// src/processing/bandpass.rs
//! Zero-phase Butterworth band-pass filtering
//!
//! The filter is a cascade of second-order high-pass sections at the low
//! cutoff and second-order low-pass sections at the high cutoff, applied
//! forward and then backward over the data. The backward pass cancels the
//! phase shift of the forward pass, so filtered features stay time-aligned
//! with the raw signal across all channels.

use ndarray::Array2;

use crate::config::SignalConfig;
use crate::error::{EmgError, Result};

/// Second-order section coefficients, normalized so `a0 == 1`.
#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    /// Butterworth low-pass section via bilinear transform, Q = 1/sqrt(2).
    fn lowpass(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate_hz;
        let cos_omega = omega.cos();
        let sin_omega = omega.sin();
        let alpha = sin_omega / (2.0 * std::f32::consts::FRAC_1_SQRT_2); // Q = 1/sqrt(2)

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_omega) / 2.0) / a0,
            b1: (1.0 - cos_omega) / a0,
            b2: ((1.0 - cos_omega) / 2.0) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Butterworth high-pass section via bilinear transform, Q = 1/sqrt(2).
    fn highpass(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate_hz;
        let cos_omega = omega.cos();
        let sin_omega = omega.sin();
        let alpha = sin_omega / (2.0 * std::f32::consts::FRAC_1_SQRT_2); // Q = 1/sqrt(2)

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 + cos_omega) / 2.0) / a0,
            b1: (-(1.0 + cos_omega)) / a0,
            b2: ((1.0 + cos_omega) / 2.0) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Filter memory for one second-order section.
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    fn step(&mut self, coeffs: &BiquadCoeffs, x0: f32) -> f32 {
        let y0 = coeffs.b0 * x0 + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;
        y0
    }
}

/// Zero-phase Butterworth band-pass filter.
///
/// Coefficients are a pure function of `(sample_rate, lowcut, highcut, order)`
/// and are computed once at construction. Each [`apply`](Self::apply) call
/// allocates fresh section memory, so the filter itself carries no state
/// between invocations.
pub struct BandpassFilter {
    sections: Vec<BiquadCoeffs>,
    order: usize,
}

impl BandpassFilter {
    /// Build a band-pass filter retaining content between `lowcut_hz` and
    /// `highcut_hz`.
    ///
    /// `order` second-order high-pass sections at the low edge are cascaded
    /// with `order` second-order low-pass sections at the high edge.
    pub fn new(sample_rate_hz: f32, lowcut_hz: f32, highcut_hz: f32, order: usize) -> Result<Self> {
        if !(1..=8).contains(&order) {
            return Err(EmgError::Configuration {
                component: "bandpass",
                reason: format!("order must be 1-8, got {order}"),
            });
        }
        if lowcut_hz <= 0.0 || lowcut_hz >= highcut_hz {
            return Err(EmgError::Configuration {
                component: "bandpass",
                reason: format!("invalid band-pass range: {lowcut_hz} - {highcut_hz} Hz"),
            });
        }
        if highcut_hz >= sample_rate_hz / 2.0 {
            return Err(EmgError::Configuration {
                component: "bandpass",
                reason: format!(
                    "high cutoff {highcut_hz} Hz at or above Nyquist {} Hz",
                    sample_rate_hz / 2.0
                ),
            });
        }

        let mut sections = Vec::with_capacity(2 * order);
        for _ in 0..order {
            sections.push(BiquadCoeffs::highpass(lowcut_hz, sample_rate_hz));
        }
        for _ in 0..order {
            sections.push(BiquadCoeffs::lowpass(highcut_hz, sample_rate_hz));
        }

        Ok(Self { sections, order })
    }

    /// Build from a validated [`SignalConfig`].
    pub fn from_config(config: &SignalConfig) -> Result<Self> {
        Self::new(
            config.sampling_rate_hz,
            config.lowcut_hz,
            config.highcut_hz,
            config.filter_order,
        )
    }

    /// Filter order (sections per band edge).
    pub fn order(&self) -> usize {
        self.order
    }

    /// Minimum input length the forward-backward pass can handle without the
    /// section transients dominating the output.
    pub fn min_length(&self) -> usize {
        3 * (2 * self.order + 1)
    }

    /// Apply the filter forward and backward over one channel.
    ///
    /// The output has exactly the length of the input and zero net phase
    /// shift. Inputs shorter than [`min_length`](Self::min_length) raise
    /// [`EmgError::SignalTooShort`] rather than returning corrupted samples.
    pub fn apply(&self, signal: &[f32]) -> Result<Vec<f32>> {
        if signal.len() < self.min_length() {
            return Err(EmgError::SignalTooShort {
                length: signal.len(),
                min_length: self.min_length(),
            });
        }

        let mut forward = self.run_cascade(signal.iter().copied());
        forward.reverse();
        let mut backward = self.run_cascade(forward.iter().copied());
        backward.reverse();
        Ok(backward)
    }

    /// Filter every channel of a `[channels, samples]` window, preserving
    /// its shape.
    pub fn condition_window(&self, window: &Array2<f32>) -> Result<Array2<f32>> {
        let mut conditioned = window.clone();
        for mut channel in conditioned.rows_mut() {
            let filtered = self.apply(channel.as_slice().ok_or_else(|| {
                EmgError::Configuration {
                    component: "bandpass",
                    reason: "window rows must be contiguous".into(),
                }
            })?)?;
            for (dst, src) in channel.iter_mut().zip(filtered) {
                *dst = src;
            }
        }
        Ok(conditioned)
    }

    fn run_cascade(&self, input: impl Iterator<Item = f32>) -> Vec<f32> {
        let mut states = vec![BiquadState::default(); self.sections.len()];
        input
            .map(|sample| {
                let mut value = sample;
                for (coeffs, state) in self.sections.iter().zip(states.iter_mut()) {
                    value = state.step(coeffs, value);
                }
                value
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, fs: f32, n: usize) -> Vec<f32> {
        (0..n).map(|i| (2.0 * PI * freq * i as f32 / fs).sin()).collect()
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BandpassFilter::new(1000.0, 20.0, 450.0, 0).is_err());
        assert!(BandpassFilter::new(1000.0, 20.0, 450.0, 9).is_err());
        assert!(BandpassFilter::new(1000.0, 450.0, 20.0, 4).is_err());
        assert!(BandpassFilter::new(1000.0, 20.0, 500.0, 4).is_err());
        assert!(BandpassFilter::new(1000.0, 0.0, 450.0, 4).is_err());
    }

    #[test]
    fn test_output_length_matches_input() {
        let filter = BandpassFilter::new(1000.0, 20.0, 450.0, 4).unwrap();
        for n in [filter.min_length(), 100, 1000, 3000] {
            let signal = sine(100.0, 1000.0, n);
            assert_eq!(filter.apply(&signal).unwrap().len(), n);
        }
    }

    #[test]
    fn test_too_short_signal_rejected() {
        let filter = BandpassFilter::new(1000.0, 20.0, 450.0, 4).unwrap();
        let short = vec![0.5; filter.min_length() - 1];
        match filter.apply(&short) {
            Err(EmgError::SignalTooShort { length, min_length }) => {
                assert_eq!(length, filter.min_length() - 1);
                assert_eq!(min_length, filter.min_length());
            }
            other => panic!("expected SignalTooShort, got {other:?}"),
        }
    }

    #[test]
    fn test_dc_rejected() {
        let filter = BandpassFilter::new(1000.0, 20.0, 450.0, 2).unwrap();
        let dc = vec![1.0; 2000];
        let out = filter.apply(&dc).unwrap();
        // Steady-state portion of a DC input must be strongly attenuated.
        let mid: f32 = out[800..1200].iter().map(|x| x.abs()).sum::<f32>() / 400.0;
        assert!(mid < 0.05, "DC leaked through: {mid}");
    }

    #[test]
    fn test_passband_tone_preserved() {
        let fs = 1000.0;
        let filter = BandpassFilter::new(fs, 20.0, 450.0, 2).unwrap();
        let tone = sine(100.0, fs, 4000);
        let out = filter.apply(&tone).unwrap();
        let rms_in: f32 = (tone[1000..3000].iter().map(|x| x * x).sum::<f32>() / 2000.0).sqrt();
        let rms_out: f32 = (out[1000..3000].iter().map(|x| x * x).sum::<f32>() / 2000.0).sqrt();
        assert!((rms_out / rms_in) > 0.9, "passband tone attenuated: {}", rms_out / rms_in);
    }

    #[test]
    fn test_zero_phase_alignment() {
        let fs = 1000.0;
        let filter = BandpassFilter::new(fs, 20.0, 450.0, 4).unwrap();
        // Gaussian-modulated passband tone with a known envelope peak.
        let n = 2000;
        let center = 1000.0f32;
        let signal: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32;
                let envelope = (-((t - center) / 80.0).powi(2)).exp();
                envelope * (2.0 * PI * 100.0 * t / fs).sin()
            })
            .collect();
        let out = filter.apply(&signal).unwrap();

        let peak_in = signal.iter().enumerate().max_by(|a, b| a.1.abs().total_cmp(&b.1.abs())).unwrap().0;
        let peak_out = out.iter().enumerate().max_by(|a, b| a.1.abs().total_cmp(&b.1.abs())).unwrap().0;
        assert!(
            (peak_in as i64 - peak_out as i64).abs() <= 3,
            "phase shift detected: {peak_in} -> {peak_out}"
        );
    }

    #[test]
    fn test_condition_window_preserves_shape() {
        let filter = BandpassFilter::new(1000.0, 20.0, 450.0, 4).unwrap();
        let window = Array2::from_shape_fn((4, 500), |(c, t)| {
            ((t as f32) * 0.1 + c as f32).sin()
        });
        let conditioned = filter.condition_window(&window).unwrap();
        assert_eq!(conditioned.dim(), (4, 500));
    }
}
