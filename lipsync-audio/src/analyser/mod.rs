mod config;

use std::sync::Arc;

pub use config::AnalyserConfig;
use cpal::SampleRate;
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use tracing::instrument;

use crate::{config::ConfigError, fetcher::Fetcher};

/// Interface for everything which can tell the current average frequency of some audio.
pub trait FrequencyAnalyser {
    /// Returns the average of the current frequency data, nominally within `[0, 255]`.
    fn average_frequency(&mut self) -> f32;
}

/// Computes the frequency data of the samples of its fetcher.
///
/// Each call to [Analyser::byte_frequency_data] (or [Analyser::average_frequency]) fetches the
/// newest `fft_size` samples, applies a Blackman window, transforms them, smoothes the magnitudes
/// over time and maps them from decibels onto `[0, 255]`.
pub struct Analyser {
    fft: Arc<dyn RealToComplex<f32>>,
    blackman_window: Box<[f32]>,

    fft_in_raw: Box<[f32]>,
    fft_in: Vec<f32>,
    fft_out: Vec<Complex32>,
    scratch_buffer: Vec<Complex32>,

    smoothed: Box<[f32]>,
    byte_data: Box<[u8]>,

    config: AnalyserConfig,
    fetcher: Box<dyn Fetcher>,
}

impl Analyser {
    /// Creates a new instance with the given fetcher where the audio samples are fetched from.
    #[instrument(name = "Analyser::new", skip(fetcher))]
    pub fn new(fetcher: Box<dyn Fetcher>, config: AnalyserConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let fft_size = config.fft_size;
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);

        let blackman_window = blackman_window(fft_size);

        let fft_in_raw = vec![0.; fft_size].into_boxed_slice();
        let fft_in = fft.make_input_vec();
        let fft_out = fft.make_output_vec();
        let scratch_buffer = fft.make_scratch_vec();

        let smoothed = vec![0.; config.frequency_bin_count()].into_boxed_slice();
        let byte_data = vec![0; config.frequency_bin_count()].into_boxed_slice();

        Ok(Self {
            fft,
            blackman_window,
            fft_in_raw,
            fft_in,
            fft_out,
            scratch_buffer,
            smoothed,
            byte_data,
            config,
            fetcher,
        })
    }

    /// Fetches the newest samples and returns their frequency data.
    pub fn byte_frequency_data(&mut self) -> &[u8] {
        self.process();
        &self.byte_data
    }

    /// Fetches the newest samples and returns the mean of their frequency data.
    pub fn average_frequency(&mut self) -> f32 {
        let data = self.byte_frequency_data();
        let sum: u32 = data.iter().map(|&value| u32::from(value)).sum();

        sum as f32 / data.len() as f32
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.fetcher.sample_rate()
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    fn process(&mut self) {
        self.fetcher.fetch_samples(&mut self.fft_in_raw);

        for (i, &sample) in self.fft_in_raw.iter().enumerate() {
            self.fft_in[i] = sample * self.blackman_window[i];
        }

        self.fft
            .process_with_scratch(
                &mut self.fft_in,
                &mut self.fft_out,
                &mut self.scratch_buffer,
            )
            .expect("Buffers are created by the fft plan");

        let magnitude_scale = 1. / self.config.fft_size as f32;
        let tau = self.config.smoothing_time_constant;
        let min_db = self.config.min_decibels;
        let range_scale = 255. / (self.config.max_decibels - min_db);

        for (i, (smoothed, byte)) in self
            .smoothed
            .iter_mut()
            .zip(self.byte_data.iter_mut())
            .enumerate()
        {
            let magnitude = self.fft_out[i].norm() * magnitude_scale;
            *smoothed = tau * *smoothed + (1. - tau) * magnitude;

            if !smoothed.is_finite() {
                *smoothed = 0.;
            }

            *byte = to_byte(*smoothed, min_db, range_scale);
        }
    }
}

impl FrequencyAnalyser for Analyser {
    fn average_frequency(&mut self) -> f32 {
        Analyser::average_frequency(self)
    }
}

/// The classic three term Blackman window with `alpha = 0.16` over `size` samples.
///
/// The window is periodic (denominator `size`), like the one of an `AnalyserNode`. A cosine
/// window of `size + 1` samples has exactly this denominator, its last sample is dropped.
fn blackman_window(size: usize) -> Box<[f32]> {
    const ALPHA: f64 = 0.16;

    apodize::cosine_iter((1. - ALPHA) / 2., 0.5, ALPHA / 2., 0., size + 1)
        .take(size)
        .map(|val| val as f32)
        .collect::<Vec<f32>>()
        .into_boxed_slice()
}

fn to_byte(magnitude: f32, min_db: f64, range_scale: f64) -> u8 {
    if magnitude <= 0. {
        return 0;
    }

    let db = 20. * f64::from(magnitude).log10();
    (range_scale * (db - min_db)).floor().clamp(0., 255.) as u8
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use super::*;
    use crate::{fetcher::DummyFetcher, DEFAULT_SAMPLE_RATE};

    struct SineFetcher {
        amplitude: f32,
        frequency: f32,
    }

    impl Fetcher for SineFetcher {
        fn fetch_samples(&mut self, buf: &mut [f32]) {
            let rate = DEFAULT_SAMPLE_RATE.0 as f32;
            for (i, sample) in buf.iter_mut().enumerate() {
                *sample = self.amplitude * (TAU * self.frequency * i as f32 / rate).sin();
            }
        }

        fn sample_rate(&self) -> SampleRate {
            DEFAULT_SAMPLE_RATE
        }
    }

    fn sine(amplitude: f32) -> Analyser {
        let fetcher = Box::new(SineFetcher {
            amplitude,
            frequency: 1_000.,
        });

        Analyser::new(
            fetcher,
            AnalyserConfig {
                smoothing_time_constant: 0.,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn silence() {
        let mut analyser = Analyser::new(DummyFetcher::new(), AnalyserConfig::default()).unwrap();

        assert_eq!(analyser.config().fft_size, 128);
        assert_eq!(analyser.frequency_bin_count(), 64);
        assert_eq!(analyser.sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(analyser.byte_frequency_data().len(), 64);
        assert_eq!(analyser.average_frequency(), 0.);
    }

    #[test]
    fn invalid_config() {
        let result = Analyser::new(
            DummyFetcher::new(),
            AnalyserConfig {
                fft_size: 100,
                ..Default::default()
            },
        );

        assert!(result.is_err());
    }

    #[test]
    fn louder_is_higher() {
        let quiet = sine(0.01).average_frequency();
        let loud = sine(0.8).average_frequency();

        assert!(0. < quiet, "quiet: {}", quiet);
        assert!(quiet < loud, "quiet: {}, loud: {}", quiet, loud);
        assert!(loud <= 255.);
    }

    #[test]
    fn peak_is_at_the_sine_frequency() {
        let mut analyser = sine(0.01);
        let data = analyser.byte_frequency_data();

        // 1kHz with 44.1kHz and 128 samples lands between bin 2 and 3
        let peak = data
            .iter()
            .enumerate()
            .max_by_key(|&(_, value)| *value)
            .map(|(idx, _)| idx)
            .unwrap();

        assert!((2..=4).contains(&peak), "peak: {}", peak);
    }

    #[test]
    fn smoothing_rises_gradually() {
        let mut analyser = Analyser::new(
            Box::new(SineFetcher {
                amplitude: 0.5,
                frequency: 1_000.,
            }),
            AnalyserConfig::default(),
        )
        .unwrap();

        let first = analyser.average_frequency();
        let second = analyser.average_frequency();

        // the smoothed magnitudes are still climbing towards the real ones
        assert!(first < second, "first: {}, second: {}", first, second);
    }

    #[test]
    fn blackman_coefficients() {
        let size = 128;
        let window = blackman_window(size);

        assert_eq!(window.len(), size);
        for (i, &value) in window.iter().enumerate() {
            let x = std::f64::consts::TAU * i as f64 / size as f64;
            let expected = 0.42 - 0.5 * x.cos() + 0.08 * (2. * x).cos();

            assert!(
                (f64::from(value) - expected).abs() < 1e-6,
                "index {}: {} != {}",
                i,
                value,
                expected
            );
        }

        // periodic: starts at (almost) zero and peaks at the center
        assert!(window[0].abs() < 1e-6);
        assert!((window[size / 2] - 1.).abs() < 1e-6);
        let sum: f32 = window.iter().sum();
        assert!((sum - 53.76).abs() < 1e-3, "sum: {}", sum);
    }

    #[test]
    fn byte_mapping() {
        let range_scale = 255. / 70.;

        assert_eq!(to_byte(0., -100., range_scale), 0);
        // -100dB
        assert_eq!(to_byte(1e-5, -100., range_scale), 0);
        // -30dB and more
        assert_eq!(to_byte(0.04, -100., range_scale), 255);
        assert_eq!(to_byte(1., -100., range_scale), 255);
        // -65dB is exactly in the middle
        assert_eq!(to_byte(10f32.powf(-65. / 20.), -100., range_scale), 127);
    }
}
