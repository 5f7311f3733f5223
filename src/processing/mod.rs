// src/processing/mod.rs
//! Signal conditioning for raw EMG windows

pub mod bandpass;

pub use bandpass::BandpassFilter;
