use crate::config::ConfigError;

/// The config options for [crate::Analyser].
///
/// The defaults match the ones of an `AnalyserNode` of the Web Audio API with an fft size of `128`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyserConfig {
    /// The amount of samples which are used for each transformation.
    ///
    /// Has to be a power of two within `[32, 32768]`.
    pub fft_size: usize,

    /// Control how much the previous frequency data is blended into the new one.
    /// It has to be within the range `[0, 1]`.
    ///
    /// `0` means no smoothing at all, the closer to `1` the slower the values change.
    pub smoothing_time_constant: f32,

    /// Magnitudes at or below this value (in dB) are mapped to `0`.
    pub min_decibels: f64,

    /// Magnitudes at or above this value (in dB) are mapped to `255`.
    pub max_decibels: f64,
}

impl AnalyserConfig {
    pub const MIN_FFT_SIZE: usize = 32;
    pub const MAX_FFT_SIZE: usize = 32_768;

    /// Checks if the current config is valid or contains any mistakes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fft_size_range = Self::MIN_FFT_SIZE..=Self::MAX_FFT_SIZE;
        if !self.fft_size.is_power_of_two() || !fft_size_range.contains(&self.fft_size) {
            return Err(ConfigError::InvalidFftSize(self.fft_size));
        }

        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing_time_constant));
        }

        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::InvalidDecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }

        Ok(())
    }

    /// The amount of frequency values which are computed, which is half of the fft size.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 128,
            smoothing_time_constant: 0.8,
            min_decibels: -100.,
            max_decibels: -30.,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(AnalyserConfig::default().validate(), Ok(()));
        assert_eq!(AnalyserConfig::default().frequency_bin_count(), 64);
    }

    #[test]
    fn fft_size_bounds() {
        for fft_size in [0, 16, 127, 65_536] {
            let config = AnalyserConfig {
                fft_size,
                ..Default::default()
            };

            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidFftSize(fft_size))
            );
        }

        for fft_size in [32, 2048, 32_768] {
            let config = AnalyserConfig {
                fft_size,
                ..Default::default()
            };

            assert_eq!(config.validate(), Ok(()));
        }
    }

    #[test]
    fn smoothing_bounds() {
        let config = AnalyserConfig {
            smoothing_time_constant: 1.5,
            ..Default::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::InvalidSmoothing(1.5)));
    }

    #[test]
    fn decibel_range() {
        let config = AnalyserConfig {
            min_decibels: -30.,
            max_decibels: -30.,
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDecibelRange {
                min: -30.,
                max: -30.
            })
        );
    }
}
