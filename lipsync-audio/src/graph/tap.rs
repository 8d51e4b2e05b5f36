use std::sync::{Arc, Mutex};

use cpal::SampleRate;

use crate::fetcher::Fetcher;

/// Keeps the most recent mono samples which were sent to the output.
#[derive(Debug)]
pub struct SampleTap {
    buffer: Box<[f32]>,
    write_idx: usize,
    length: usize,
}

impl SampleTap {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            buffer: vec![0.; capacity].into_boxed_slice(),
            write_idx: 0,
            length: 0,
        }
    }

    pub fn push(&mut self, data: &[f32]) {
        let capacity = self.buffer.len();

        // only the tail of `data` survives anyway
        let data = &data[data.len().saturating_sub(capacity)..];
        for &sample in data {
            self.buffer[self.write_idx] = sample;
            self.write_idx = (self.write_idx + 1) % capacity;
        }

        self.length = (self.length + data.len()).min(capacity);
    }

    /// Writes the newest `out.len()` samples into `out`, oldest first and padded with silence at the front.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let capacity = self.buffer.len();
        let amount = out.len().min(self.length);
        let padding = out.len() - amount;

        out[..padding].fill(0.);

        let start = (self.write_idx + capacity - amount) % capacity;
        for (i, sample) in out[padding..].iter_mut().enumerate() {
            *sample = self.buffer[(start + i) % capacity];
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Fetches the samples which the output device played most recently.
///
/// Created by [AudioGraph::fetcher](crate::AudioGraph::fetcher).
pub struct TapFetcher {
    tap: Arc<Mutex<SampleTap>>,
    sample_rate: SampleRate,
}

impl TapFetcher {
    pub(crate) fn new(tap: Arc<Mutex<SampleTap>>, sample_rate: SampleRate) -> Self {
        Self { tap, sample_rate }
    }
}

impl Fetcher for TapFetcher {
    fn fetch_samples(&mut self, buf: &mut [f32]) {
        self.tap.lock().unwrap().copy_latest(buf);
    }

    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tap_is_silent() {
        let tap = SampleTap::new(8);
        let mut out = [1.; 4];

        tap.copy_latest(&mut out);

        assert_eq!(out, [0.; 4]);
        assert!(tap.is_empty());
    }

    #[test]
    fn pads_missing_samples_at_the_front() {
        let mut tap = SampleTap::new(8);
        tap.push(&[1., 2.]);

        let mut out = [9.; 4];
        tap.copy_latest(&mut out);

        assert_eq!(out, [0., 0., 1., 2.]);
    }

    #[test]
    fn wraps_around() {
        let mut tap = SampleTap::new(4);
        tap.push(&[1., 2., 3.]);
        tap.push(&[4., 5., 6.]);

        let mut out = [0.; 4];
        tap.copy_latest(&mut out);

        assert_eq!(out, [3., 4., 5., 6.]);
        assert_eq!(tap.len(), 4);
    }

    #[test]
    fn push_more_than_capacity() {
        let mut tap = SampleTap::new(3);
        tap.push(&[1., 2., 3., 4., 5.]);

        let mut out = [0.; 2];
        tap.copy_latest(&mut out);

        assert_eq!(out, [4., 5.]);
    }
}
